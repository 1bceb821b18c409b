use colored::*;
use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

pub const REPORT_INTERVAL: Duration = Duration::from_secs(2);

/// The three pipeline phases, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Check,
    Brute,
    Screenshot,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::Check, Phase::Brute, Phase::Screenshot];

    fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            Phase::Check => "Checking",
            Phase::Brute => "Bruting",
            Phase::Screenshot => "Screenshotting",
        }
    }
}

/// Receives progress from workers. Implementations must be cheap and thread-safe.
pub trait ProgressSink: Send + Sync {
    fn add_total(&self, phase: Phase, n: u64);
    fn advance(&self, phase: Phase);
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Counter {
    pub total: u64,
    pub completed: u64,
}

/// Per-phase totals and completions for one run.
pub struct ScanProgress {
    counters: Mutex<[Counter; 3]>,
    start_time: Instant,
}

impl Default for ScanProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanProgress {
    pub fn new() -> Self {
        Self {
            counters: Mutex::new([Counter::default(); 3]),
            start_time: Instant::now(),
        }
    }

    pub fn snapshot(&self, phase: Phase) -> Counter {
        self.counters.lock().unwrap_or_else(PoisonError::into_inner)[phase.index()]
    }

    fn render(&self) -> String {
        let counters = *self.counters.lock().unwrap_or_else(PoisonError::into_inner);
        let colors = [Color::BrightRed, Color::BrightYellow, Color::BrightGreen];
        let parts: Vec<String> = Phase::ALL
            .iter()
            .zip(colors)
            .map(|(phase, color)| {
                let c = counters[phase.index()];
                format!("{} {}/{}", phase.label().color(color), c.completed, c.total)
            })
            .collect();
        format!(
            "{} {} | {:.0}s",
            "[Progress]".cyan(),
            parts.join(" | "),
            self.start_time.elapsed().as_secs_f64()
        )
    }

    pub fn print_progress(&self) {
        print!("\r{}    ", self.render());
        let _ = std::io::stdout().flush();
    }

    pub fn print_final(&self) {
        println!();
        println!("{}", "=== Statistics ===".bold());
        for phase in Phase::ALL {
            let c = self.snapshot(phase);
            println!("  {:<16}{} of {}", format!("{}:", phase.label()), c.completed, c.total);
        }
        let found = self.snapshot(Phase::Screenshot).total;
        println!("  {:<16}{}", "Streams found:", found.to_string().green().bold());
        println!("  {:<16}{:.2}s", "Elapsed time:", self.start_time.elapsed().as_secs_f64());
    }

    /// Print a status line every `interval` until the returned handle is stopped.
    pub fn spawn_reporter(self: &Arc<Self>, interval: Duration) -> std::io::Result<ProgressReporter> {
        let (stop_tx, stop_rx) = bounded::<()>(0);
        let progress = Arc::clone(self);
        let handle = thread::Builder::new()
            .name("progress".to_string())
            .spawn(move || loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => progress.print_progress(),
                    _ => {
                        progress.print_progress();
                        break;
                    }
                }
            })?;
        Ok(ProgressReporter {
            stop: Some(stop_tx),
            handle: Some(handle),
        })
    }
}

impl ProgressSink for ScanProgress {
    fn add_total(&self, phase: Phase, n: u64) {
        self.counters.lock().unwrap_or_else(PoisonError::into_inner)[phase.index()].total += n;
    }

    fn advance(&self, phase: Phase) {
        self.counters.lock().unwrap_or_else(PoisonError::into_inner)[phase.index()].completed += 1;
    }
}

/// Background status printer; stops on `stop()` or drop.
pub struct ProgressReporter {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl ProgressReporter {
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        // Dropping the sender disconnects the channel and wakes the reporter.
        self.stop.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        self.shutdown();
    }
}
