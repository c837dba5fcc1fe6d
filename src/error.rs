//! Error types for the SharePoint services facade.

use serde::Serialize;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type SpResult<T> = Result<T, SpError>;

/// SharePoint services errors.
#[derive(Error, Debug)]
pub enum SpError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("XML parsing error: {0}")]
    XmlParse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a facade call was skipped without contacting the transport.
///
/// These are the only guarded failure paths: the call is a silent no-op and
/// the sink is left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    /// No transport is configured on the facade
    MissingTransport,
    /// A required parameter was absent or empty
    MissingRequiredParameter(&'static str),
}

impl SkipReason {
    /// Get the string code for this skip reason.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingTransport => "MISSING_TRANSPORT",
            Self::MissingRequiredParameter(_) => "MISSING_REQUIRED_PARAMETER",
        }
    }
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingTransport => f.write_str("no transport configured"),
            Self::MissingRequiredParameter(name) => {
                write!(f, "missing required parameter `{}`", name)
            }
        }
    }
}

/// A SOAP Fault found in a response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SoapFault {
    /// `faultcode` (1.1) or `Code/Value` (1.2)
    pub code: Option<String>,
    /// `faultstring` (1.1) or `Reason/Text` (1.2)
    pub reason: Option<String>,
}

impl std::fmt::Display for SoapFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] {}",
            self.code.as_deref().unwrap_or("unknown"),
            self.reason.as_deref().unwrap_or("")
        )
    }
}
