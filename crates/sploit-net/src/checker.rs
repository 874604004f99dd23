//! [`ReachabilityChecker`] over HTTP.
//!
//! A link is reachable when the backdoor on the target evaluates the probe
//! header and the response body contains the link's probe token.

use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use sploit_types::error::{Result, SploitError};
use sploit_types::link::LinkDescriptor;
use sploit_types::services::ReachabilityChecker;
use url::Url;

use crate::http::{parse_response, probe_request};

/// Largest reply read from the target before giving up on it.
const MAX_RESPONSE_BYTES: usize = 1 << 20;

/// Blocking HTTP probe bounded by the link's timeout.
pub struct HttpChecker {
    #[cfg(feature = "tls-rustls")]
    tls: crate::RustlsConnector,
}

impl HttpChecker {
    pub fn new() -> Self {
        Self {
            #[cfg(feature = "tls-rustls")]
            tls: crate::RustlsConnector::new(),
        }
    }

    fn fetch(&self, link: &LinkDescriptor, url: &Url) -> Result<Vec<u8>> {
        let host = url
            .host_str()
            .ok_or_else(|| SploitError::Connectivity(format!("{url}: missing host")))?;
        let port = link
            .port
            .or_else(|| url.port_or_known_default())
            .ok_or_else(|| SploitError::Connectivity(format!("{url}: unknown port")))?;
        let timeout = Duration::from_secs(link.timeout_secs.max(1));
        let request = probe_request(link, url);

        let stream = connect(host, port, timeout)?;
        match url.scheme() {
            "http" => exchange(stream, request.as_bytes()),
            "https" => self.fetch_tls(stream, host, request.as_bytes()),
            other => Err(SploitError::Connectivity(format!(
                "unsupported scheme '{other}'"
            ))),
        }
    }

    #[cfg(feature = "tls-rustls")]
    fn fetch_tls(&self, stream: TcpStream, host: &str, request: &[u8]) -> Result<Vec<u8>> {
        let tls = self.tls.connect(stream, host)?;
        exchange(tls, request)
    }

    #[cfg(not(feature = "tls-rustls"))]
    fn fetch_tls(&self, _stream: TcpStream, host: &str, _request: &[u8]) -> Result<Vec<u8>> {
        Err(SploitError::Connectivity(format!(
            "{host}: https targets need the tls-rustls feature"
        )))
    }
}

impl Default for HttpChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl ReachabilityChecker for HttpChecker {
    fn check(&self, link: &LinkDescriptor) -> Result<()> {
        let raw_url = link
            .url
            .as_deref()
            .ok_or_else(|| SploitError::Connectivity("TARGET is not set".to_string()))?;
        let url = Url::parse(raw_url)
            .map_err(|e| SploitError::Connectivity(format!("{raw_url}: {e}")))?;

        log::debug!("probing {url} (link {})", link.short_hash());
        let response = parse_response(&self.fetch(link, &url)?)?;

        if response.body_contains(&link.probe_token()) {
            log::debug!("{url} answered the probe");
            Ok(())
        } else {
            Err(SploitError::Connectivity(format!(
                "{url}: HTTP {} without backdoor answer",
                response.status_code
            )))
        }
    }
}

/// Connect to the first address of `host:port` that accepts within `timeout`.
fn connect(host: &str, port: u16, timeout: Duration) -> Result<TcpStream> {
    let addrs = (host, port)
        .to_socket_addrs()
        .map_err(|e| SploitError::Connectivity(format!("{host}: {e}")))?;

    let mut last_err = None;
    for addr in addrs {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => {
                stream.set_read_timeout(Some(timeout))?;
                stream.set_write_timeout(Some(timeout))?;
                return Ok(stream);
            },
            Err(e) => last_err = Some(e),
        }
    }
    Err(SploitError::Connectivity(match last_err {
        Some(e) => format!("{host}:{port}: {e}"),
        None => format!("{host}: no address"),
    }))
}

/// Send `request` and read the reply until EOF or the size cap.
fn exchange<S: Read + Write>(mut stream: S, request: &[u8]) -> Result<Vec<u8>> {
    stream
        .write_all(request)
        .and_then(|()| stream.flush())
        .map_err(|e| SploitError::Connectivity(format!("send: {e}")))?;

    let mut raw = Vec::with_capacity(4096);
    let mut buf = [0u8; 4096];
    loop {
        match stream.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                raw.extend_from_slice(&buf[..n]);
                if raw.len() >= MAX_RESPONSE_BYTES {
                    break;
                }
            },
            // Some servers reset, or drop TLS without close_notify, once the
            // reply is out.
            Err(e)
                if !raw.is_empty()
                    && matches!(
                        e.kind(),
                        std::io::ErrorKind::ConnectionReset | std::io::ErrorKind::UnexpectedEof
                    ) =>
            {
                break;
            },
            Err(e) => return Err(SploitError::Connectivity(format!("receive: {e}"))),
        }
    }
    Ok(raw)
}
