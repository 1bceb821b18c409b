pub mod attack;
pub mod utils;

pub use attack::Attacker;
pub use utils::{Phase, ProgressSink, ScanProgress};
