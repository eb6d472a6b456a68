use crate::constants::{HTTP_BAD_REQUEST, HTTP_INTERNAL_SERVER_ERROR};

/// Terminal conditions of a verification request.
///
/// Every variant is request-local. [`Error::http_status`] tells the transport whether the
/// caller sent something unusable (400) or the service could not complete (500).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("quote is too short to read {field} at offset {offset} (length {len})")]
    QuoteTooShort {
        field: &'static str,
        offset: usize,
        len: usize,
    },

    #[error("unsupported quote version: {0}")]
    UnsupportedQuoteVersion(u16),

    #[error("not supported certification data type: {0}")]
    UnsupportedCertificationDataType(u16),

    /// The evidence could not be taken apart: certification data, PCK chain, PCK extensions
    /// or CRL distribution points.
    #[error("invalid attestation evidence")]
    InvalidEvidence(#[source] anyhow::Error),

    #[error("failed to retrieve required {what}, source returned status: {status}")]
    CollateralNotFound { what: &'static str, status: u16 },

    #[error("failed to retrieve required {what}, source returned status: {status}")]
    CollateralUnavailable { what: &'static str, status: u16 },

    #[error("failed to retrieve required {what}")]
    CollateralTransport {
        what: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("malformed {what}")]
    MalformedCollateral {
        what: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("quote verification failed")]
    Engine(#[source] anyhow::Error),

    #[error("quote rejected: {0}")]
    QuoteRejected(String),

    #[error("invalid trusted root CA cert, check config")]
    TrustedRootCaInvalid { status: u32 },

    #[error("unrecognized QVL status: {status} (error source: {error_source:?})")]
    UnrecognizedStatus {
        status: u32,
        error_source: Option<u32>,
    },

    #[error("could not match TCB level ({cpu_svn}|{pce_svn}|{tdx_svn}) to any TCB level from TCB Info")]
    NoMatchingTcbLevel {
        cpu_svn: String,
        pce_svn: u16,
        tdx_svn: String,
    },

    #[error("could not match ISVSVN ({0}) from quote to any TCB level from Enclave Identity")]
    NoMatchingEnclaveTcbLevel(u16),

    #[error("could not match TDX module major version ({0}) to any TDX Module Identity from TCB Info")]
    NoMatchingTdxModuleIdentity(u8),

    #[error("could not match TDX module svn ({svn}) to any TCB level from TDX Module Identity {id}")]
    NoMatchingTdxModuleTcbLevel { id: String, svn: u8 },

    #[error("unsupported sgxType: {0}")]
    UnsupportedSgxType(String),

    #[error("failed to sign the report, signing service returned status: {0}")]
    SigningRejected(u16),

    #[error("failed to sign the report")]
    Signing(#[source] anyhow::Error),
}

impl Error {
    pub fn http_status(&self) -> u16 {
        match self {
            Error::InvalidRequest(_)
            | Error::QuoteTooShort { .. }
            | Error::UnsupportedQuoteVersion(_)
            | Error::UnsupportedCertificationDataType(_)
            | Error::InvalidEvidence(_)
            | Error::CollateralNotFound { .. }
            | Error::QuoteRejected(_)
            | Error::NoMatchingTcbLevel { .. }
            | Error::NoMatchingEnclaveTcbLevel(_)
            | Error::NoMatchingTdxModuleIdentity(_)
            | Error::NoMatchingTdxModuleTcbLevel { .. } => HTTP_BAD_REQUEST,
            Error::CollateralUnavailable { .. }
            | Error::CollateralTransport { .. }
            | Error::MalformedCollateral { .. }
            | Error::Engine(_)
            | Error::TrustedRootCaInvalid { .. }
            | Error::UnrecognizedStatus { .. }
            | Error::UnsupportedSgxType(_)
            | Error::SigningRejected(_)
            | Error::Signing(_) => HTTP_INTERNAL_SERVER_ERROR,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
