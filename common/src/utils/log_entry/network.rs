use std::io::Error as IoError;
use std::net::SocketAddr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NetworkEntry {
    #[error("Failed to bind port: {0}")]
    BindPortError(IoError),
    #[error("Listening on {0} over {1}")]
    Listening(SocketAddr, &'static str),
    #[error("TLS is not configured, serving plain HTTP")]
    TlsDisabled,
    #[error("Failed to load TLS configuration: {0}")]
    TlsConfigError(String),
    #[error("Rejected request body: {0}")]
    RequestRejected(String),
}

impl From<NetworkEntry> for String {
    #[inline(always)]
    fn from(value: NetworkEntry) -> Self {
        value.to_string()
    }
}
