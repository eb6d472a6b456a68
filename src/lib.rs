pub mod collateral;
pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod signer;
pub mod status;
pub mod types;
pub mod utils;

use std::sync::Arc;

use anyhow::{anyhow, Context};
use chrono::Utc;
use tracing::{error, info, info_span, Instrument};

use collateral::{fetch_collateral, CollateralRequest, CollateralSource, RevocationSource};
use config::VerifierConfig;
use constants::PCK_CERT_CHAIN_CERT_DATA_TYPE;
use engine::{PckCertificateData, VerificationEngine, VerifyQuoteInput};
use signer::{sign_report, SigningService};
use types::report::SignedReport;
use types::request::{AttestationEvidencePayload, EvidenceRequest};
use utils::cert::{crl_distribution_point_url, split_pck_cert_chain, PckCertChain};
use utils::quote::DecodedQuote;
use utils::report::{compose_report, ReportInput};

pub use error::{Error, Result};

/// What the quote itself says about the platform, through its embedded PCK certificate chain.
struct Evidence {
    chain: PckCertChain,
    pck: PckCertificateData,
    pck_crl_url: String,
    root_crl_url: String,
}

fn invalid_evidence(err: anyhow::Error) -> Error {
    error!("{err:#}");
    Error::InvalidEvidence(err)
}

/// Verifies DCAP quotes and produces signed attestation verification reports.
///
/// Holds no per-request state, one instance serves concurrent requests.
#[derive(Clone)]
pub struct Verifier {
    config: Arc<VerifierConfig>,
    engine: Arc<dyn VerificationEngine>,
    collateral_source: Arc<dyn CollateralSource>,
    revocation_source: Arc<dyn RevocationSource>,
    signer: Arc<dyn SigningService>,
}

impl Verifier {
    pub fn new(
        config: VerifierConfig,
        engine: Arc<dyn VerificationEngine>,
        collateral_source: Arc<dyn CollateralSource>,
        revocation_source: Arc<dyn RevocationSource>,
        signer: Arc<dyn SigningService>,
    ) -> Self {
        Verifier {
            config: Arc::new(config),
            engine,
            collateral_source,
            revocation_source,
            signer,
        }
    }

    /// Verifies the quote in `payload` against freshly fetched collateral and returns the
    /// signed report. `update` is the raw `update` query parameter.
    ///
    /// Errors carry the HTTP status to answer with, see [`Error::http_status`].
    pub async fn verify_attestation_evidence(
        &self,
        request_id: &str,
        payload: &AttestationEvidencePayload,
        update: Option<&str>,
    ) -> Result<SignedReport> {
        let span = info_span!("verify_attestation_evidence", request_id = %request_id);
        self.verify(payload, update).instrument(span).await
    }

    async fn verify(&self, payload: &AttestationEvidencePayload, update: Option<&str>) -> Result<SignedReport> {
        let request = EvidenceRequest::parse(payload, update).map_err(|err| {
            error!("{err}");
            err
        })?;
        let quote = request.quote.as_slice();

        let evidence = self.read_evidence(quote)?;
        let decoded = DecodedQuote::decode(quote).map_err(|err| {
            error!("{err}");
            err
        })?;

        let collateral = fetch_collateral(
            self.collateral_source.as_ref(),
            self.revocation_source.as_ref(),
            &CollateralRequest {
                quote_type: decoded.version.quote_type,
                fmspc: &evidence.pck.fmspc,
                update: request.update,
                pck_crl_url: &evidence.pck_crl_url,
                root_crl_url: &evidence.root_crl_url,
            },
            &self.config.trusted_root_public_key,
        )
        .await?;

        let ca_chain = evidence.chain.ca_chain();
        let tcb_signing_chain = collateral.tcb_signing_chain.chain();
        let result = self
            .engine
            .verify_quote(&VerifyQuoteInput {
                quote,
                pck_cert: &evidence.chain.pck_cert,
                tcb_info: &collateral.tcb_info_json,
                qe_identity: &collateral.qe_identity_json,
                ca_chain: &ca_chain,
                tcb_signing_chain: &tcb_signing_chain,
                pck_crl: &collateral.pck_crl,
                root_crl: &collateral.root_crl,
                root_ca: &evidence.chain.root_ca,
                tcb_root_ca: &collateral.tcb_signing_chain.root_ca,
            })
            .map_err(|err| {
                error!("quote verification failed: {err:#}");
                Error::Engine(err)
            })?;
        let isv_quote_status = status::translate(result.status, result.error_source)?;

        let report = compose_report(
            &ReportInput {
                quote,
                decoded: &decoded,
                isv_quote_status,
                pck: &evidence.pck,
                tcb_info: &collateral.tcb_info,
                qe_identity: &collateral.qe_identity,
                nonce: request.nonce.as_deref(),
            },
            rand::random::<u128>().to_string(),
            Utc::now(),
        )?;

        let signed = sign_report(self.signer.as_ref(), report, &self.config.signing_certificate_chain).await?;
        info!(isv_quote_status = ?signed.report.isv_quote_status, "report signed");
        Ok(signed)
    }

    /// Takes the certification data of the quote apart: PCK certificate chain, PCK
    /// certificate extensions and CRL distribution points. Any failure is the caller's.
    fn read_evidence(&self, quote: &[u8]) -> Result<Evidence> {
        let certification_data = self
            .engine
            .certification_data(quote)
            .context("failed to retrieve certification data from quote")
            .map_err(invalid_evidence)?;
        if certification_data.cert_type != PCK_CERT_CHAIN_CERT_DATA_TYPE {
            let err = Error::UnsupportedCertificationDataType(certification_data.cert_type);
            error!("{err}");
            return Err(err);
        }

        let chain = split_pck_cert_chain(&certification_data.data, &self.config.trusted_root_public_key)
            .map_err(invalid_evidence)?;
        let pck = self
            .engine
            .pck_certificate_data(&chain.pck_cert)
            .context("PCK certificate does not contain required extensions")
            .map_err(invalid_evidence)?;
        let pck_crl_url = self.crl_url(&chain.pck_cert)?;
        let root_crl_url = self.crl_url(&chain.root_ca)?;

        Ok(Evidence {
            chain,
            pck,
            pck_crl_url,
            root_crl_url,
        })
    }

    fn crl_url(&self, cert: &str) -> Result<String> {
        let distribution_point = self
            .engine
            .crl_distribution_point(cert)
            .context("failed to read CRL distribution point")
            .map_err(invalid_evidence)?;
        crl_distribution_point_url(&distribution_point)
            .map(str::to_string)
            .ok_or_else(|| invalid_evidence(anyhow!("CRL distribution point has no URI: {distribution_point}")))
    }
}
