//! Networking: the HTTP reachability probe used to verify a link.
//!
//! Plain HTTP goes straight over `std::net::TcpStream`; HTTPS targets need
//! the `tls-rustls` feature.

mod checker;
mod http;
#[cfg(feature = "tls-rustls")]
mod tls_rustls;

pub use checker::HttpChecker;
pub use http::{HttpResponse, parse_response, probe_request};
#[cfg(feature = "tls-rustls")]
pub use tls_rustls::RustlsConnector;
