//! Error types for the sensor listener.
//!
//! Startup failures and socket-table exhaustion are fatal; everything scoped to a
//! single connection is logged and dropped.

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Errors produced while decoding a sensor payload
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty payload")]
    Empty,

    #[error("payload is not a decimal integer: {0:?}")]
    Invalid(String),
}

/// Errors owned by the listening socket
#[derive(Error, Debug)]
pub enum ListenerError {
    #[error("socket error: {0}")]
    Socket(#[source] io::Error),

    #[error("bind error on {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("listen error: {0}")]
    Listen(#[source] io::Error),

    #[error("accept error: {0}")]
    Accept(#[source] io::Error),
}

impl ListenerError {
    /// Whether the listener has to stop.
    ///
    /// Accept failures only stop it when the process or the kernel ran out of
    /// sockets or memory; other accept failures are transient.
    pub fn is_fatal(&self) -> bool {
        match self {
            ListenerError::Socket(_) | ListenerError::Bind { .. } | ListenerError::Listen(_) => {
                true
            }
            ListenerError::Accept(e) => is_resource_exhaustion(e),
        }
    }
}

pub fn is_resource_exhaustion(err: &io::Error) -> bool {
    if err.kind() == io::ErrorKind::OutOfMemory {
        return true;
    }
    matches!(
        err.raw_os_error(),
        Some(libc::EMFILE) | Some(libc::ENFILE) | Some(libc::ENOBUFS) | Some(libc::ENOMEM)
    )
}

/// Errors scoped to one accepted connection
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("no payload within {0:?}")]
    Timeout(Duration),

    #[error("read error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Parse(#[from] ParseError),
}
