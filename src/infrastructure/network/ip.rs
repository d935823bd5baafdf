// Best-effort client IP discovery through public echo services
use crate::domain::model::HttpRequest;
use crate::domain::traits::Transport;
use serde::Deserialize;
use std::net::IpAddr;
use std::time::Duration;
use tracing::debug;

pub const IP_UNAVAILABLE: &str = "ip-unavailable";

#[derive(Debug, Deserialize)]
struct IpEcho {
    ip: Option<String>,
}

/// Extract an address from a JSON `{ "ip": ... }` or plain-text reply.
fn parse_ip(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if let Ok(echo) = serde_json::from_str::<IpEcho>(trimmed) {
        return echo.ip.filter(|ip| ip.parse::<IpAddr>().is_ok());
    }
    trimmed.parse::<IpAddr>().ok().map(|ip| ip.to_string())
}

/// Ask each service in turn, each bounded by `timeout`.
///
/// Never fails: falls back to `IP_UNAVAILABLE` when no service answers.
pub async fn lookup_client_ip(transport: &dyn Transport, services: &[String], timeout: Duration) -> String {
    for service in services {
        let request = HttpRequest::get(service, timeout);
        match tokio::time::timeout(timeout, transport.send(request)).await {
            Ok(Ok(reply)) if reply.is_success() => {
                if let Some(ip) = parse_ip(&reply.body) {
                    return ip;
                }
                debug!(service = %service, "ip service returned no address");
            }
            Ok(Ok(reply)) => {
                debug!(service = %service, status = reply.status, "ip service returned error status");
            }
            Ok(Err(e)) => {
                debug!(service = %service, error = %e, "ip service unreachable");
            }
            Err(_) => {
                debug!(service = %service, "ip service timed out");
            }
        }
    }
    IP_UNAVAILABLE.to_string()
}
