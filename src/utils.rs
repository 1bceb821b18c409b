use anyhow::{anyhow, Context, Result};
use colored::*;
use ipnetwork::IpNetwork;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::fs;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::path::Path;

use crate::error::TargetError;

static REALM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"realm="(.*?)""#).expect("valid regex"));
static NONCE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"nonce="(.*?)""#).expect("valid regex"));
/// Largest block a single targets line may expand to.
const MAX_LINE_ADDRESSES: u128 = 1 << 24;

static UNSAFE_FILENAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\-. ]").expect("valid regex"));

/// Read a text file into lines.
pub fn load_lines(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Unable to read {}", path.display()))?;
    Ok(content.lines().map(str::to_string).collect())
}

/// Route list, one route per line, used verbatim.
pub fn load_routes(path: &Path) -> Result<Vec<String>> {
    load_lines(path)
}

/// `user:pass` list with stray tabs and carriage returns stripped.
pub fn load_credentials(path: &Path) -> Result<Vec<String>> {
    Ok(load_lines(path)?
        .into_iter()
        .map(|line| clean_credential(&line))
        .collect())
}

pub fn clean_credential(line: &str) -> String {
    line.trim_matches(|c| c == '\t' || c == '\r').to_string()
}

/// Expand every line of a targets file and drop duplicates, keeping first-seen order.
pub fn load_targets(path: &Path) -> Result<Vec<IpAddr>> {
    let lines = load_lines(path)?;
    Ok(expand_targets(lines.iter().map(String::as_str)))
}

pub fn expand_targets<'a>(lines: impl IntoIterator<Item = &'a str>) -> Vec<IpAddr> {
    let mut seen = HashSet::new();
    lines
        .into_iter()
        .flat_map(parse_target_line)
        .filter(|ip| seen.insert(*ip))
        .collect()
}

/// Parse one targets line.
///
/// Accepts `1.2.3.4`, `192.168.0.0/24` and `1.2.3.4 - 5.6.7.8`.
/// Anything that is not an address yields nothing. Blocks that are too
/// large or have host bits set are reported on the console and skipped.
pub fn parse_target_line(line: &str) -> Vec<IpAddr> {
    match expand_target_line(line) {
        Ok(ips) => ips,
        Err(e @ (TargetError::BlockTooLarge(_) | TargetError::HostBitsSet)) => {
            println!("{}", format!("[!] Skipping {}: {}", line.trim(), e).yellow());
            tracing::warn!(line = %line.trim(), error = %e, "Skipping targets line");
            Vec::new()
        }
        Err(e) => {
            tracing::debug!(line = %line.trim(), error = %e, "Ignoring targets line");
            Vec::new()
        }
    }
}

/// Strict form of [`parse_target_line`].
pub fn expand_target_line(line: &str) -> Result<Vec<IpAddr>, TargetError> {
    let line = line.trim();
    if let Some((start, end)) = line.split_once('-') {
        return expand_range(start.trim(), end.trim())
            .ok_or_else(|| TargetError::InvalidAddress(line.to_string()))?;
    }
    if line.contains('/') {
        let network = line
            .parse::<IpNetwork>()
            .map_err(|_| TargetError::InvalidAddress(line.to_string()))?;
        if network.ip() != network.network() {
            return Err(TargetError::HostBitsSet);
        }
        let host_bits = match network {
            IpNetwork::V4(_) => 32 - u32::from(network.prefix()),
            IpNetwork::V6(_) => 128 - u32::from(network.prefix()),
        };
        if host_bits > MAX_LINE_ADDRESSES.trailing_zeros() {
            return Err(TargetError::BlockTooLarge(MAX_LINE_ADDRESSES));
        }
        return Ok(network.iter().collect());
    }
    line.parse::<IpAddr>()
        .map(|ip| vec![ip])
        .map_err(|_| TargetError::InvalidAddress(line.to_string()))
}

/// `None` when either end is not an address or the ends are out of order.
fn expand_range(start: &str, end: &str) -> Option<Result<Vec<IpAddr>, TargetError>> {
    let (a, b) = (start.parse::<IpAddr>().ok()?, end.parse::<IpAddr>().ok()?);
    let span = match (a, b) {
        (IpAddr::V4(a), IpAddr::V4(b)) => u128::from(u32::from(b)).checked_sub(u128::from(u32::from(a))),
        (IpAddr::V6(a), IpAddr::V6(b)) => u128::from(b).checked_sub(u128::from(a)),
        _ => None,
    }?;
    if span >= MAX_LINE_ADDRESSES {
        return Some(Err(TargetError::BlockTooLarge(MAX_LINE_ADDRESSES)));
    }
    match (a, b) {
        (IpAddr::V4(a), IpAddr::V4(b)) => Some(Ok((u32::from(a)..=u32::from(b))
            .map(|n| IpAddr::V4(Ipv4Addr::from(n)))
            .collect())),
        (IpAddr::V6(a), IpAddr::V6(b)) => Some(Ok((u128::from(a)..=u128::from(b))
            .map(|n| IpAddr::V6(Ipv6Addr::from(n)))
            .collect())),
        _ => None,
    }
}

/// Value of `var="..."` inside an RTSP response, or empty.
pub fn find_quoted(var: &str, response: &str) -> String {
    let re = match var {
        "realm" => &*REALM_RE,
        "nonce" => &*NONCE_RE,
        _ => return String::new(),
    };
    re.captures(response)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// Replace anything but letters, digits, `_`, `-`, `.` and space with `_`.
pub fn escape_chars(s: &str) -> String {
    UNSAFE_FILENAME_CHARS.replace_all(s, "_").into_owned()
}

/// Lift the soft open-files limit to the hard limit. Returns the new soft limit.
#[cfg(unix)]
pub fn raise_nofile_limit() -> Result<u64> {
    use libc::{getrlimit, rlimit, setrlimit, RLIMIT_NOFILE};

    let mut rlim = rlimit {
        rlim_cur: 0,
        rlim_max: 0,
    };
    if unsafe { getrlimit(RLIMIT_NOFILE, &mut rlim) } != 0 {
        return Err(anyhow!(
            "Failed to get current limits: {}",
            std::io::Error::last_os_error()
        ));
    }
    if rlim.rlim_cur == rlim.rlim_max {
        return Ok(rlim.rlim_cur as u64);
    }

    let raised = rlimit {
        rlim_cur: rlim.rlim_max,
        rlim_max: rlim.rlim_max,
    };
    if unsafe { setrlimit(RLIMIT_NOFILE, &raised) } != 0 {
        return Err(anyhow!(
            "Failed to set limits: {}",
            std::io::Error::last_os_error()
        ));
    }
    Ok(raised.rlim_cur as u64)
}

#[cfg(not(unix))]
pub fn raise_nofile_limit() -> Result<u64> {
    Err(anyhow!("Open file limit can only be raised on Unix"))
}
