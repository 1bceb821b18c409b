use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::cli::Cli;
use crate::modules::rtsp::RetryPolicy;
use crate::utils;

const DEFAULT_ROUTES: &str = include_str!("../data/routes.txt");
const DEFAULT_CREDENTIALS: &str = include_str!("../data/credentials.txt");

/// What the route and credential searches iterate over. Shared read-only by all workers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttackConfig {
    pub ports: Vec<u16>,
    pub routes: Vec<String>,
    pub credentials: Vec<String>,
}

/// Worker counts for the three stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSizes {
    pub check: usize,
    pub brute: usize,
    pub screenshot: usize,
}

impl Default for PoolSizes {
    fn default() -> Self {
        Self {
            check: 500,
            brute: 200,
            screenshot: 20,
        }
    }
}

/// Everything a run needs, resolved once from the command line.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub targets: PathBuf,
    pub attack: Arc<AttackConfig>,
    pub pools: PoolSizes,
    pub timeout: Duration,
    pub retry: RetryPolicy,
    pub debug: bool,
}

impl ScanConfig {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let routes = match &cli.routes {
            Some(path) => utils::load_routes(path).context("Failed to load routes")?,
            None => DEFAULT_ROUTES.lines().map(str::to_string).collect(),
        };
        let credentials = match &cli.credentials {
            Some(path) => utils::load_credentials(path).context("Failed to load credentials")?,
            None => DEFAULT_CREDENTIALS.lines().map(utils::clean_credential).collect(),
        };

        Ok(Self {
            targets: cli.targets.clone(),
            attack: Arc::new(AttackConfig {
                ports: cli.ports.clone(),
                routes,
                credentials,
            }),
            pools: PoolSizes {
                check: cli.check_threads.max(1),
                brute: cli.brute_threads.max(1),
                screenshot: cli.screenshot_threads.max(1),
            },
            timeout: Duration::from_secs(cli.timeout),
            retry: RetryPolicy::default(),
            debug: cli.debug,
        })
    }

    pub fn targets_path(&self) -> &Path {
        &self.targets
    }
}
