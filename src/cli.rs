use clap::Parser;
use std::path::PathBuf;

fn existing_file(s: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(s);
    if path.is_file() {
        Ok(path)
    } else {
        Err(format!("file '{}' does not exist", s))
    }
}

/// RTSP stream discovery: brute-force routes and credentials, then grab screenshots
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// File with IPs, CIDR blocks or "A - B" ranges, one per line
    #[arg(short, long, value_parser = existing_file)]
    pub targets: PathBuf,

    /// Ports to try, in order
    #[arg(short, long, num_args = 1.., default_values_t = [554])]
    pub ports: Vec<u16>,

    /// Route wordlist (defaults to the built-in list)
    #[arg(short, long, value_parser = existing_file)]
    pub routes: Option<PathBuf>,

    /// Credentials wordlist of user:pass lines (defaults to the built-in list)
    #[arg(short, long, value_parser = existing_file)]
    pub credentials: Option<PathBuf>,

    /// Threads for route discovery
    #[arg(long, default_value_t = 500)]
    pub check_threads: usize,

    /// Threads for credential discovery
    #[arg(long, default_value_t = 200)]
    pub brute_threads: usize,

    /// Threads for screenshot capture
    #[arg(long, default_value_t = 20)]
    pub screenshot_threads: usize,

    /// Socket timeout in seconds
    #[arg(short = 'T', long, default_value_t = 2)]
    pub timeout: u64,

    /// Write a debug log into the report folder
    #[arg(short, long)]
    pub debug: bool,
}
