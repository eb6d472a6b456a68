use tracing::error;

use crate::constants::HTTP_OK;
use crate::error::{Error, Result};
use crate::types::report::IsvQuoteStatus;

/// Status codes of the quote verification library, in the order of its `Status` enum.
pub mod qvl {
    pub const STATUS_OK: u32 = 0;
    pub const STATUS_UNSUPPORTED_CERT_FORMAT: u32 = 1;
    pub const STATUS_SGX_ROOT_CA_MISSING: u32 = 2;
    pub const STATUS_SGX_ROOT_CA_INVALID: u32 = 3;
    pub const STATUS_SGX_ROOT_CA_INVALID_EXTENSIONS: u32 = 4;
    pub const STATUS_SGX_ROOT_CA_INVALID_ISSUER: u32 = 5;
    pub const STATUS_SGX_ROOT_CA_UNTRUSTED: u32 = 6;
    pub const STATUS_SGX_INTERMEDIATE_CA_MISSING: u32 = 7;
    pub const STATUS_SGX_INTERMEDIATE_CA_INVALID: u32 = 8;
    pub const STATUS_SGX_INTERMEDIATE_CA_INVALID_EXTENSIONS: u32 = 9;
    pub const STATUS_SGX_INTERMEDIATE_CA_INVALID_ISSUER: u32 = 10;
    pub const STATUS_SGX_INTERMEDIATE_CA_REVOKED: u32 = 11;
    pub const STATUS_SGX_PCK_MISSING: u32 = 12;
    pub const STATUS_SGX_PCK_INVALID: u32 = 13;
    pub const STATUS_SGX_PCK_INVALID_EXTENSIONS: u32 = 14;
    pub const STATUS_SGX_PCK_INVALID_ISSUER: u32 = 15;
    pub const STATUS_SGX_PCK_REVOKED: u32 = 16;
    pub const STATUS_TRUSTED_ROOT_CA_INVALID: u32 = 17;
    pub const STATUS_SGX_PCK_CERT_CHAIN_UNTRUSTED: u32 = 18;
    pub const STATUS_SGX_TCB_INFO_UNSUPPORTED_FORMAT: u32 = 19;
    pub const STATUS_SGX_TCB_INFO_INVALID: u32 = 20;
    pub const STATUS_TCB_INFO_INVALID_SIGNATURE: u32 = 21;
    pub const STATUS_SGX_TCB_SIGNING_CERT_MISSING: u32 = 22;
    pub const STATUS_SGX_TCB_SIGNING_CERT_INVALID: u32 = 23;
    pub const STATUS_SGX_TCB_SIGNING_CERT_INVALID_EXTENSIONS: u32 = 24;
    pub const STATUS_SGX_TCB_SIGNING_CERT_INVALID_ISSUER: u32 = 25;
    pub const STATUS_SGX_TCB_SIGNING_CERT_CHAIN_UNTRUSTED: u32 = 26;
    pub const STATUS_SGX_TCB_SIGNING_CERT_REVOKED: u32 = 27;
    pub const STATUS_SGX_CRL_UNSUPPORTED_FORMAT: u32 = 28;
    pub const STATUS_SGX_CRL_UNKNOWN_ISSUER: u32 = 29;
    pub const STATUS_SGX_CRL_INVALID: u32 = 30;
    pub const STATUS_SGX_CRL_INVALID_EXTENSIONS: u32 = 31;
    pub const STATUS_SGX_CRL_INVALID_SIGNATURE: u32 = 32;
    pub const STATUS_SGX_CA_CERT_UNSUPPORTED_FORMAT: u32 = 33;
    pub const STATUS_SGX_CA_CERT_INVALID: u32 = 34;
    pub const STATUS_TRUSTED_ROOT_CA_UNSUPPORTED_FORMAT: u32 = 35;
    pub const STATUS_MISSING_PARAMETERS: u32 = 36;
    pub const STATUS_UNSUPPORTED_QUOTE_FORMAT: u32 = 37;
    pub const STATUS_UNSUPPORTED_PCK_CERT_FORMAT: u32 = 38;
    pub const STATUS_INVALID_PCK_CERT: u32 = 39;
    pub const STATUS_UNSUPPORTED_PCK_RL_FORMAT: u32 = 40;
    pub const STATUS_INVALID_PCK_CRL: u32 = 41;
    pub const STATUS_UNSUPPORTED_TCB_INFO_FORMAT: u32 = 42;
    pub const STATUS_PCK_REVOKED: u32 = 43;
    pub const STATUS_TCB_INFO_MISMATCH: u32 = 44;
    pub const STATUS_TCB_OUT_OF_DATE: u32 = 45;
    pub const STATUS_TCB_REVOKED: u32 = 46;
    pub const STATUS_TCB_CONFIGURATION_NEEDED: u32 = 47;
    pub const STATUS_TCB_OUT_OF_DATE_CONFIGURATION_NEEDED: u32 = 48;
    pub const STATUS_TCB_NOT_SUPPORTED: u32 = 49;
    pub const STATUS_TCB_UNRECOGNIZED_STATUS: u32 = 50;
    pub const STATUS_UNSUPPORTED_QE_CERTIFICATION: u32 = 51;
    pub const STATUS_INVALID_QE_CERTIFICATION_DATA_SIZE: u32 = 52;
    pub const STATUS_UNSUPPORTED_QE_CERTIFICATION_DATA_TYPE: u32 = 53;
    pub const STATUS_PCK_CERT_MISMATCH: u32 = 54;
    pub const STATUS_INVALID_QE_REPORT_SIGNATURE: u32 = 55;
    pub const STATUS_INVALID_QE_REPORT_DATA: u32 = 56;
    pub const STATUS_INVALID_QUOTE_SIGNATURE: u32 = 57;
    pub const STATUS_SGX_QE_IDENTITY_UNSUPPORTED_FORMAT: u32 = 58;
    pub const STATUS_SGX_QE_IDENTITY_INVALID: u32 = 59;
    pub const STATUS_SGX_QE_IDENTITY_INVALID_SIGNATURE: u32 = 60;
    pub const STATUS_SGX_ENCLAVE_REPORT_UNSUPPORTED_FORMAT: u32 = 61;
    pub const STATUS_SGX_ENCLAVE_IDENTITY_UNSUPPORTED_FORMAT: u32 = 62;
    pub const STATUS_SGX_ENCLAVE_IDENTITY_INVALID: u32 = 63;
    pub const STATUS_SGX_ENCLAVE_IDENTITY_UNSUPPORTED_VERSION: u32 = 64;
    pub const STATUS_SGX_ENCLAVE_IDENTITY_OUT_OF_DATE: u32 = 65;
    pub const STATUS_SGX_ENCLAVE_REPORT_MISCSELECT_MISMATCH: u32 = 66;
    pub const STATUS_SGX_ENCLAVE_REPORT_ATTRIBUTES_MISMATCH: u32 = 67;
    pub const STATUS_SGX_ENCLAVE_REPORT_MRENCLAVE_MISMATCH: u32 = 68;
    pub const STATUS_SGX_ENCLAVE_REPORT_MRSIGNER_MISMATCH: u32 = 69;
    pub const STATUS_SGX_ENCLAVE_REPORT_ISVPRODID_MISMATCH: u32 = 70;
    pub const STATUS_SGX_ENCLAVE_REPORT_ISVSVN_OUT_OF_DATE: u32 = 71;
    pub const STATUS_UNSUPPORTED_QE_IDENTITY_FORMAT: u32 = 72;
    pub const STATUS_QE_IDENTITY_OUT_OF_DATE: u32 = 73;
    pub const STATUS_QE_IDENTITY_MISMATCH: u32 = 74;
    pub const STATUS_SGX_TCB_INFO_EXPIRED: u32 = 75;
    pub const STATUS_SGX_PCK_CERT_CHAIN_EXPIRED: u32 = 76;
    pub const STATUS_SGX_CRL_EXPIRED: u32 = 77;
    pub const STATUS_SGX_SIGNING_CERT_CHAIN_EXPIRED: u32 = 78;
    pub const STATUS_SGX_ENCLAVE_IDENTITY_EXPIRED: u32 = 79;
    pub const STATUS_TCB_SW_HARDENING_NEEDED: u32 = 80;
    pub const STATUS_TCB_CONFIGURATION_AND_SW_HARDENING_NEEDED: u32 = 81;
    pub const STATUS_SGX_ENCLAVE_REPORT_ISVSVN_REVOKED: u32 = 82;
    pub const STATUS_TDX_MODULE_MISMATCH: u32 = 83;
    pub const STATUS_TCB_TD_RELAUNCH_ADVISED: u32 = 84;
    pub const STATUS_TCB_TD_RELAUNCH_ADVISED_AND_CONFIGURATION_NEEDED: u32 = 85;
}

/// Which verification step of the engine produced the status.
pub mod error_source {
    pub const VERIFY_PCK_CERTIFICATE: u32 = 1;
    pub const VERIFY_TCB_INFO: u32 = 2;
    pub const VERIFY_ENCLAVE_IDENTITY: u32 = 3;
    pub const VERIFY_QUOTE: u32 = 4;
}

use qvl::*;

/// Statuses under which the quote was verified and gets a report.
pub fn isv_quote_status(status: u32) -> Option<IsvQuoteStatus> {
    let verdict = match status {
        STATUS_OK => IsvQuoteStatus::Ok,
        STATUS_INVALID_QUOTE_SIGNATURE => IsvQuoteStatus::SignatureInvalid,
        STATUS_SGX_INTERMEDIATE_CA_REVOKED | STATUS_SGX_PCK_REVOKED | STATUS_PCK_REVOKED | STATUS_TCB_REVOKED => {
            IsvQuoteStatus::Revoked
        }
        STATUS_TCB_OUT_OF_DATE => IsvQuoteStatus::TcbOutOfDate,
        STATUS_TCB_CONFIGURATION_NEEDED => IsvQuoteStatus::ConfigurationNeeded,
        STATUS_TCB_OUT_OF_DATE_CONFIGURATION_NEEDED => IsvQuoteStatus::TcbOutOfDateAndConfigurationNeeded,
        STATUS_TCB_SW_HARDENING_NEEDED => IsvQuoteStatus::SwHardeningNeeded,
        STATUS_TCB_CONFIGURATION_AND_SW_HARDENING_NEEDED => IsvQuoteStatus::ConfigurationAndSwHardeningNeeded,
        STATUS_TCB_TD_RELAUNCH_ADVISED => IsvQuoteStatus::TdRelaunchAdvised,
        STATUS_TCB_TD_RELAUNCH_ADVISED_AND_CONFIGURATION_NEEDED => IsvQuoteStatus::TdRelaunchAdvisedAndConfigurationNeeded,
        _ => return None,
    };
    Some(verdict)
}

const ROOT_CA_ERRORS: [u32; 3] = [
    STATUS_SGX_ROOT_CA_MISSING,
    STATUS_SGX_ROOT_CA_INVALID_EXTENSIONS,
    STATUS_SGX_ROOT_CA_INVALID_ISSUER,
];

const INTERMEDIATE_CA_ERRORS: [u32; 3] = [
    STATUS_SGX_INTERMEDIATE_CA_MISSING,
    STATUS_SGX_INTERMEDIATE_CA_INVALID_EXTENSIONS,
    STATUS_SGX_INTERMEDIATE_CA_INVALID_ISSUER,
];

const PCK_CERT_ERRORS: [u32; 5] = [
    STATUS_SGX_PCK_MISSING,
    STATUS_SGX_PCK_INVALID_EXTENSIONS,
    STATUS_SGX_PCK_INVALID_ISSUER,
    STATUS_UNSUPPORTED_PCK_CERT_FORMAT,
    STATUS_INVALID_PCK_CERT,
];

const QUOTE_ERRORS: [u32; 5] = [
    STATUS_UNSUPPORTED_QUOTE_FORMAT,
    STATUS_INVALID_QE_REPORT_SIGNATURE,
    STATUS_INVALID_QE_REPORT_DATA,
    STATUS_QE_IDENTITY_MISMATCH,
    STATUS_TDX_MODULE_MISMATCH,
];

/// Message for statuses caused by the evidence. Only statuses reported together with an
/// error source qualify.
pub fn client_error_message(status: u32, source: Option<u32>) -> Option<String> {
    let source = source?;
    let qualifier = format!(" (qvlStatus: {status}, errorSource: {source})");
    let from_pck_verification = source == error_source::VERIFY_PCK_CERTIFICATE;

    let message = if status == STATUS_UNSUPPORTED_CERT_FORMAT && from_pck_verification {
        "Some parameters may be null. Certs in PCK cert chain may not be properly encoded to PEM format \
         (including trusted root). PCK cert chain may have wrong number of certs."
            .to_string()
    } else if (ROOT_CA_ERRORS.contains(&status) && from_pck_verification) || status == STATUS_SGX_PCK_CERT_CHAIN_UNTRUSTED {
        format!("Issue with parsing root CA cert:{qualifier}")
    } else if INTERMEDIATE_CA_ERRORS.contains(&status) {
        format!("Issue with parsing intermediate CA cert:{qualifier}")
    } else if PCK_CERT_ERRORS.contains(&status) {
        format!("Issue with parsing PCK cert:{qualifier}")
    } else if QUOTE_ERRORS.contains(&status) {
        format!("Issue with parsing quote:{qualifier}")
    } else if status == STATUS_TCB_NOT_SUPPORTED {
        "No matching TCB Level found".to_string()
    } else if status == STATUS_SGX_PCK_CERT_CHAIN_EXPIRED {
        "Either of certs in PCK cert chain has expired.".to_string()
    } else {
        return None;
    };

    Some(message)
}

/// Translates an engine result into the report verdict. Every status lands in exactly one of: a verdict, a
/// rejected quote (400) or a server error (500).
pub fn translate(status: u32, source: Option<u32>) -> Result<IsvQuoteStatus> {
    if let Some(verdict) = isv_quote_status(status) {
        return Ok(verdict);
    }

    if let Some(message) = client_error_message(status, source) {
        error!("{message}");
        return Err(Error::QuoteRejected(message));
    }

    let err = if status == STATUS_TRUSTED_ROOT_CA_INVALID || status == STATUS_TRUSTED_ROOT_CA_UNSUPPORTED_FORMAT {
        Error::TrustedRootCaInvalid { status }
    } else {
        Error::UnrecognizedStatus {
            status,
            error_source: source,
        }
    };
    error!("{err}");
    Err(err)
}

/// HTTP status and verdict of an engine result, the way the endpoint reports it.
pub fn http_status_and_verdict(status: u32, source: Option<u32>) -> (u16, Option<IsvQuoteStatus>) {
    match translate(status, source) {
        Ok(verdict) => (HTTP_OK, Some(verdict)),
        Err(err) => (err.http_status(), None),
    }
}
