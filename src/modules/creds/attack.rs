//! Route and credential discovery against a single target.

use std::sync::Arc;

use crate::config::AttackConfig;
use crate::error::RtspError;
use crate::modules::rtsp::packet::NO_CREDENTIALS;
use crate::modules::rtsp::client::AuthMethod;
use crate::modules::rtsp::RtspClient;

/// Path no camera serves; a positive answer means the server ignores routes.
pub const DUMMY_ROUTE: &str = "/0x8b6c42";

// 401, 403: wrong credentials, but the route is plausible.
// 200: the stream answered outright.
pub const ROUTE_OK_CODES: [&str; 6] = [
    "RTSP/1.0 200",
    "RTSP/1.0 401",
    "RTSP/1.0 403",
    "RTSP/2.0 200",
    "RTSP/2.0 401",
    "RTSP/2.0 403",
];

// 404: the credentials went through but the route is off.
pub const CREDENTIALS_OK_CODES: [&str; 4] = [
    "RTSP/1.0 200",
    "RTSP/1.0 404",
    "RTSP/2.0 200",
    "RTSP/2.0 404",
];

fn responded_with(target: &RtspClient, codes: &[&str]) -> bool {
    codes.iter().any(|code| target.response().contains(code))
}

fn indent(raw: &str) -> String {
    raw.split("\r\n").collect::<Vec<_>>().join("\n\t").trim_end().to_string()
}

/// Connect and send one DESCRIBE, overriding the target's port/route/credentials where given.
pub fn attempt_once(
    target: &mut RtspClient,
    port: Option<u16>,
    route: Option<&str>,
    credentials: Option<&str>,
) -> Result<(), RtspError> {
    let port = port.unwrap_or(target.port);

    if let Err(e) = target.connect(Some(port)) {
        tracing::debug!(url = %target, status = ?target.status(), error = %e, "Failed to connect");
        return Err(e);
    }

    let result = target.authorize(Some(port), route, credentials);
    tracing::debug!(
        "\nSent:\n\t{}\nReceived:\n\t{}",
        indent(target.packet()),
        indent(target.response())
    );

    if let Err(e) = &result {
        let url = RtspClient::url_for(
            &target.host(),
            port,
            credentials.unwrap_or(&target.credentials),
            route.unwrap_or(target.route()),
        );
        if e.is_transport() {
            tracing::debug!(%url, status = ?target.status(), error = %e, "Failed to authorize");
        } else {
            tracing::debug!(%url, error = %e, "No usable response");
        }
    }
    result
}

/// Drives the two discovery searches with the configured ports, routes and credentials.
#[derive(Debug, Clone)]
pub struct Attacker {
    config: Arc<AttackConfig>,
}

impl Attacker {
    pub fn new(config: Arc<AttackConfig>) -> Self {
        Self { config }
    }

    /// Find a port and route the server answers plausibly on.
    ///
    /// On success the target's port is fixed and the route recorded.
    pub fn discover_route(&self, target: &mut RtspClient) -> bool {
        for &port in &self.config.ports {
            let agnostic = attempt_once(target, Some(port), Some(DUMMY_ROUTE), None).is_ok()
                && responded_with(target, &ROUTE_OK_CODES);
            if agnostic {
                target.port = port;
                target.routes.push("/".to_string());
                return true;
            }

            for route in &self.config.routes {
                if attempt_once(target, Some(port), Some(route), None).is_err() {
                    break;
                }
                if responded_with(target, &ROUTE_OK_CODES) {
                    target.port = port;
                    target.routes.push(route.clone());
                    return true;
                }
            }
        }
        false
    }

    /// Find credentials for the target's fixed port and route.
    ///
    /// An already-authorized target or one that accepts no credentials succeeds as is.
    pub fn discover_credentials(&self, target: &mut RtspClient) -> bool {
        if target.is_authorized() {
            self.log_working_stream(target);
            return true;
        }

        let open = attempt_once(target, None, None, Some(NO_CREDENTIALS)).is_ok()
            && responded_with(target, &CREDENTIALS_OK_CODES);
        if open {
            self.log_working_stream(target);
            return true;
        }

        for credentials in &self.config.credentials {
            if attempt_once(target, None, None, Some(credentials)).is_err() {
                break;
            }
            if responded_with(target, &CREDENTIALS_OK_CODES) {
                target.credentials = credentials.clone();
                self.log_working_stream(target);
                return true;
            }
        }
        false
    }

    fn log_working_stream(&self, target: &RtspClient) {
        match target.auth_method() {
            AuthMethod::Digest => tracing::debug!(
                realm = target.realm(),
                nonce = target.nonce(),
                "Working stream at {} with DIGEST auth",
                target
            ),
            method => tracing::debug!("Working stream at {} with {} auth", target, method.as_str()),
        }
    }
}
