//! Traits describing lookup strategies and the failures they can report.

use std::error::Error as StdError;
use std::fmt;
use std::io::{Error as IoError, ErrorKind};

use async_trait::async_trait;
use reqwest::{Error as ReqwestError, StatusCode};

use crate::model::{Plate, Source, Verdict};

/// Broad category of a [`LookupError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// The remote answered with a non-success status.
    UpstreamHttp,
    /// DNS, connection, timeout, or abrupt close.
    Network,
    /// The remote answered successfully but the body had the wrong shape.
    MalformedResponse,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slug = match self {
            FailureKind::UpstreamHttp => "upstream-http-error",
            FailureKind::Network => "network-error",
            FailureKind::MalformedResponse => "malformed-response",
        };
        formatter.write_str(slug)
    }
}

#[derive(thiserror::Error, Debug)]
/// Errors that can occur while talking to a lookup backend.
pub enum LookupError {
    /// Remote responded with a non-success HTTP status.
    #[error("Upstream responded with HTTP {status}: {message}")]
    UpstreamHttp {
        /// HTTP status code.
        status: u16,
        /// Diagnostic from the response body, or the status reason.
        message: String,
    },
    /// Transport-level failure. Carries the lowest-level cause code available.
    #[error("{0}")]
    Network(String),
    /// Body could not be interpreted in the expected shape.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl LookupError {
    /// Category of this failure.
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            LookupError::UpstreamHttp { .. } => FailureKind::UpstreamHttp,
            LookupError::Network(_) => FailureKind::Network,
            LookupError::MalformedResponse(_) => FailureKind::MalformedResponse,
        }
    }

    /// Build an [`LookupError::UpstreamHttp`] from a status, preferring a
    /// diagnostic from the body over the canonical reason phrase.
    #[must_use]
    pub fn upstream(status: StatusCode, message: Option<String>) -> Self {
        let message = message
            .filter(|text| !text.trim().is_empty())
            .or_else(|| status.canonical_reason().map(str::to_owned))
            .unwrap_or_else(|| "unknown status".to_owned());
        LookupError::UpstreamHttp {
            status: status.as_u16(),
            message,
        }
    }

    /// Diagnostic text reported to callers as `detalle`.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            LookupError::Network(cause) => cause.clone(),
            other => other.to_string(),
        }
    }
}

impl From<ReqwestError> for LookupError {
    fn from(err: ReqwestError) -> Self {
        if let Some(status) = err.status() {
            return LookupError::upstream(status, None);
        }
        if err.is_decode() {
            return LookupError::MalformedResponse(err.to_string());
        }
        LookupError::Network(network_cause(&err))
    }
}

/// Walk the source chain looking for a concrete transport cause code.
fn network_cause(err: &ReqwestError) -> String {
    if err.is_timeout() {
        return "timeout".to_owned();
    }

    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(io_err) = cause.downcast_ref::<IoError>() {
            return io_code(io_err);
        }
        source = cause.source();
    }

    let description = err.to_string();
    if description.trim().is_empty() {
        "fetch failed".to_owned()
    } else {
        description
    }
}

fn io_code(io_err: &IoError) -> String {
    let code = match io_err.kind() {
        ErrorKind::ConnectionRefused => "ECONNREFUSED",
        ErrorKind::ConnectionReset => "ECONNRESET",
        ErrorKind::ConnectionAborted => "ECONNABORTED",
        ErrorKind::TimedOut => "ETIMEDOUT",
        ErrorKind::AddrNotAvailable => "EADDRNOTAVAIL",
        ErrorKind::BrokenPipe => "EPIPE",
        _ => return io_err.to_string(),
    };
    code.to_owned()
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
/// A strategy could not be built from the supplied configuration.
pub enum SetupError {
    /// A required setting is missing or blank.
    #[error("Missing required setting {0}")]
    MissingSetting(&'static str),
    /// A setting is present but unusable.
    #[error("Invalid value for setting {0}")]
    InvalidSetting(&'static str),
}

#[async_trait]
/// One interchangeable backend for answering a plate query.
///
/// Implementations own their network call, response interpretation, and
/// failure mapping. Timing and provenance are attached by the caller.
pub trait LookupStrategy: Send + Sync {
    /// Identifier reported as the result's `source`.
    fn source(&self) -> Source;

    /// Look the plate up against this backend.
    ///
    /// # Errors
    ///
    /// Returns a [`LookupError`] when the request fails, the backend answers
    /// with a non-success status, or the body cannot be interpreted.
    async fn verify(&self, plate: &Plate) -> Result<Verdict, LookupError>;
}
