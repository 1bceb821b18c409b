//! Three-stage scan: route discovery, credential discovery, screenshots.
//!
//! Each stage has its own worker pool and input queue. A target moves to
//! the next queue only when its stage succeeded; the driver drains and shuts
//! the stages down strictly in order.

pub mod queue;
pub mod stage;

use colored::*;
use std::sync::Arc;

use crate::config::PoolSizes;
use crate::modules::capture::{Capture, ChannelPattern, ChannelScan, Fingerprinter};
use crate::modules::creds::{Attacker, Phase, ProgressSink};
use crate::modules::rtsp::RtspClient;
use crate::report::ResultSink;

pub use stage::Stage;

/// Collaborators handed to every worker.
#[derive(Clone)]
pub struct PipelineDeps {
    pub attacker: Attacker,
    pub progress: Arc<dyn ProgressSink>,
    pub capture: Arc<dyn Capture>,
    pub fingerprinter: Arc<dyn Fingerprinter>,
    pub results: Arc<dyn ResultSink>,
}

pub struct Pipeline {
    pools: PoolSizes,
    deps: PipelineDeps,
}

impl Pipeline {
    pub fn new(pools: PoolSizes, deps: PipelineDeps) -> Self {
        Self { pools, deps }
    }

    /// Push every target through all three stages and wait for the last
    /// screenshot worker to exit.
    pub fn run(&self, targets: Vec<RtspClient>) {
        let screenshots = {
            let deps = self.deps.clone();
            Stage::spawn("screenshot", self.pools.screenshot, move |url: String| {
                screenshot_target(&deps, &url);
                deps.progress.advance(Phase::Screenshot);
            })
        };

        let brute = {
            let deps = self.deps.clone();
            let next = screenshots.queue();
            Stage::spawn("brute", self.pools.brute, move |mut target: RtspClient| {
                if deps.attacker.discover_credentials(&mut target) {
                    deps.progress.add_total(Phase::Screenshot, 1);
                    next.put(target.to_url());
                }
                target.disconnect();
                deps.progress.advance(Phase::Brute);
            })
        };

        let check = {
            let deps = self.deps.clone();
            let next = brute.queue();
            Stage::spawn("check", self.pools.check, move |mut target: RtspClient| {
                if deps.attacker.discover_route(&mut target) {
                    deps.progress.add_total(Phase::Brute, 1);
                    next.put(target);
                } else {
                    tracing::debug!(
                        ip = %target.ip(),
                        status = ?target.status(),
                        last_error = ?target.last_error(),
                        "No route found"
                    );
                }
                deps.progress.advance(Phase::Check);
            })
        };

        self.deps.progress.add_total(Phase::Check, targets.len() as u64);
        for target in targets {
            check.submit(target);
        }

        check.finish();
        brute.finish();
        screenshots.finish();
    }
}

fn screenshot_target(deps: &PipelineDeps, url: &str) {
    match ChannelPattern::detect(url) {
        Some(pattern) => {
            let scan = ChannelScan::new(&*deps.capture, &*deps.fingerprinter);
            for kept in scan.run(url, pattern) {
                record(deps, &kept.path, &kept.url);
            }
        }
        None => {
            if let Ok(path) = deps.capture.capture(url) {
                record(deps, &path, url);
            }
        }
    }
}

fn record(deps: &PipelineDeps, image: &std::path::Path, url: &str) {
    if let Err(e) = deps.results.append(image, url) {
        println!("{}", format!("[!] Failed to record {}: {:#}", url, e).red());
        tracing::error!(%url, error = %e, "Failed to record result");
    }
}
