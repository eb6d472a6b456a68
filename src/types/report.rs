use serde::{Deserialize, Serialize};

use crate::constants::{SIGNATURE_HEADER, SIGNING_CERTIFICATE_HEADER};
use crate::error::{Error, Result};

use super::quote::QuoteType;

/// Domain verdict attached to a verified quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IsvQuoteStatus {
    Ok,
    SignatureInvalid,
    Revoked,
    TcbOutOfDate,
    ConfigurationNeeded,
    TcbOutOfDateAndConfigurationNeeded,
    SwHardeningNeeded,
    ConfigurationAndSwHardeningNeeded,
    TdRelaunchAdvised,
    TdRelaunchAdvisedAndConfigurationNeeded,
}

impl IsvQuoteStatus {
    /// Verdicts for which the quote was matched to TCB levels and the report carries
    /// advisories.
    pub fn requires_tcb_matching(&self) -> bool {
        !matches!(self, IsvQuoteStatus::SignatureInvalid | IsvQuoteStatus::Revoked)
    }

    /// Verdicts for which the report lists the components that are behind.
    pub fn reports_out_of_date_components(&self) -> bool {
        matches!(
            self,
            IsvQuoteStatus::TcbOutOfDate
                | IsvQuoteStatus::TcbOutOfDateAndConfigurationNeeded
                | IsvQuoteStatus::TdRelaunchAdvised
                | IsvQuoteStatus::TdRelaunchAdvisedAndConfigurationNeeded
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TeeType {
    SgxStandard,
    SgxScalable,
    SgxScalableWithIntegrity,
    Tdx,
}

impl TeeType {
    /// TDX quotes are always `TDX`, SGX quotes are refined by the `sgxType` PCK extension.
    pub fn for_report(quote_type: QuoteType, sgx_type: &str) -> Result<Self> {
        if quote_type == QuoteType::Tdx {
            return Ok(TeeType::Tdx);
        }
        match sgx_type {
            "Standard" => Ok(TeeType::SgxStandard),
            "Scalable" => Ok(TeeType::SgxScalable),
            "ScalableWithIntegrity" => Ok(TeeType::SgxScalableWithIntegrity),
            other => Err(Error::UnsupportedSgxType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfigurationFlag {
    DynamicPlatform,
    CachedKeys,
    SmtEnabled,
}

/// A TCB component that is behind the latest known SVN. The SVN itself is not reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TcbComponentId {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub r#type: Option<String>,
}

impl TcbComponentId {
    pub fn tdx_module() -> Self {
        TcbComponentId {
            category: Some("OS/VMM".to_string()),
            r#type: Some("TDX Module".to_string()),
        }
    }
}

/// Attestation Verification Report.
///
/// Field order is the order of the serialized report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestationReport {
    /// Decimal representation of a random 128 bit value.
    pub id: String,
    /// UTC, `YYYY-MM-DDThh:mm:ssZ`.
    pub timestamp: String,
    pub version: u32,
    pub attestation_type: String,
    pub tee_type: TeeType,
    pub isv_quote_status: IsvQuoteStatus,
    /// Base64 of the quote header and body only.
    pub isv_quote_body: String,
    pub tcb_evaluation_data_number: u32,
    pub tcb_date: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    #[serde(rename = "advisoryURL", default, skip_serializing_if = "Option::is_none")]
    pub advisory_url: Option<String>,
    #[serde(rename = "advisoryIDs", default, skip_serializing_if = "Option::is_none")]
    pub advisory_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tcb_components_out_of_date: Option<Vec<TcbComponentId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<Vec<ConfigurationFlag>>,
}

/// A report together with the headers the signing step attached to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedReport {
    pub report: AttestationReport,
    /// Signing certificate followed by its CA certificate, as configured.
    pub signing_certificate_chain: String,
    /// Base64 signature over the report.
    pub signature: String,
}

impl SignedReport {
    pub fn headers(&self) -> [(&'static str, &str); 2] {
        [
            (SIGNING_CERTIFICATE_HEADER, self.signing_certificate_chain.as_str()),
            (SIGNATURE_HEADER, self.signature.as_str()),
        ]
    }
}
