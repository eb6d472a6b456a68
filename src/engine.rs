use serde::{Deserialize, Serialize};

/// Everything the engine needs to verify one quote. All PEM and JSON inputs are passed as
/// text, CRLs either as PEM or hex encoded DER.
#[derive(Debug, Clone, Copy)]
pub struct VerifyQuoteInput<'a> {
    pub quote: &'a [u8],
    pub pck_cert: &'a str,
    /// TCB Info exactly as received, signature included.
    pub tcb_info: &'a str,
    /// QE Identity exactly as received, signature included.
    pub qe_identity: &'a str,
    /// Root CA followed by the intermediate CA.
    pub ca_chain: &'a str,
    /// Root CA followed by the TCB signing certificate.
    pub tcb_signing_chain: &'a str,
    pub pck_crl: &'a str,
    pub root_crl: &'a str,
    pub root_ca: &'a str,
    pub tcb_root_ca: &'a str,
}

/// Raw outcome of a quote verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QvlResult {
    pub status: u32,
    /// Verification step that produced `status`, when the engine reports it.
    #[serde(default)]
    pub error_source: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificationData {
    /// 5 is a PEM PCK certificate chain.
    pub cert_type: u16,
    pub data: Vec<u8>,
}

/// SGX extensions of a PCK certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PckCertificateData {
    /// Hex, as used in the PCS API.
    pub fmspc: String,
    /// `Standard`, `Scalable` or `ScalableWithIntegrity`.
    pub sgx_type: String,
    #[serde(default)]
    pub dynamic_platform: bool,
    #[serde(default)]
    pub cached_keys: bool,
    #[serde(default)]
    pub smt_enabled: bool,
    #[serde(with = "hex")]
    pub cpusvn: Vec<u8>,
    pub pcesvn: u16,
}

/// The quote verification library. It does the cryptographic work: quote signature,
/// certificate chains, CRLs and PCK certificate extensions.
///
/// Calls are synchronous and must not share state between requests.
pub trait VerificationEngine: Send + Sync {
    fn verify_quote(&self, input: &VerifyQuoteInput<'_>) -> anyhow::Result<QvlResult>;

    fn certification_data(&self, quote: &[u8]) -> anyhow::Result<CertificationData>;

    fn pck_certificate_data(&self, pck_cert: &str) -> anyhow::Result<PckCertificateData>;

    /// CRL distribution point of a certificate, e.g. `URI:https://...`.
    fn crl_distribution_point(&self, cert: &str) -> anyhow::Result<String>;
}
