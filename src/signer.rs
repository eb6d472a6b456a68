use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::constants::HTTP_OK;
use crate::error::{Error, Result};
use crate::types::report::{AttestationReport, SignedReport};

/// Body of a signing service response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignResponse {
    pub status: u16,
    /// Base64 signature, present on success.
    #[serde(default)]
    pub signature: Option<String>,
}

/// Service holding the report signing key.
#[async_trait]
pub trait SigningService: Send + Sync {
    async fn sign_report(&self, report: &AttestationReport) -> anyhow::Result<SignResponse>;
}

/// Signs `report`. Reports are never handed out unsigned.
pub async fn sign_report(
    signer: &dyn SigningService,
    report: AttestationReport,
    signing_certificate_chain: &str,
) -> Result<SignedReport> {
    let response = signer.sign_report(&report).await.map_err(|err| {
        error!("failed to sign the report: {err:#}");
        Error::Signing(err)
    })?;

    let signature = match response {
        SignResponse { status: HTTP_OK, signature: Some(signature) } => signature,
        SignResponse { status: HTTP_OK, signature: None } => {
            error!("signing service returned no signature");
            return Err(Error::Signing(anyhow::anyhow!("signature missing from signing response")));
        }
        SignResponse { status, .. } => {
            let err = Error::SigningRejected(status);
            error!("{err}");
            return Err(err);
        }
    };

    Ok(SignedReport {
        report,
        signing_certificate_chain: signing_certificate_chain.to_string(),
        signature,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use futures::executor::block_on;

    use super::*;
    use crate::constants::{SIGNATURE_HEADER, SIGNING_CERTIFICATE_HEADER};
    use crate::types::report::{IsvQuoteStatus, TeeType};

    /// Answers every request with `status` and a fixed signature.
    pub(crate) struct FixedSigner(pub u16);

    #[async_trait]
    impl SigningService for FixedSigner {
        async fn sign_report(&self, _: &AttestationReport) -> anyhow::Result<SignResponse> {
            Ok(SignResponse { status: self.0, signature: Some("c2lnbmF0dXJl".to_string()) })
        }
    }

    fn report() -> AttestationReport {
        AttestationReport {
            id: "1".to_string(),
            timestamp: "2024-03-13T10:00:00Z".to_string(),
            version: 5,
            attestation_type: "ECDSA".to_string(),
            tee_type: TeeType::SgxStandard,
            isv_quote_status: IsvQuoteStatus::Ok,
            isv_quote_body: "AA==".to_string(),
            tcb_evaluation_data_number: 16,
            tcb_date: "2024-03-13T10:00:00Z".to_string(),
            nonce: None,
            advisory_url: None,
            advisory_ids: None,
            tcb_components_out_of_date: None,
            configuration: None,
        }
    }

    #[test]
    fn signed_report_carries_headers() {
        let signed = block_on(sign_report(&FixedSigner(200), report(), "chain")).unwrap();
        assert_eq!(
            signed.headers(),
            [(SIGNING_CERTIFICATE_HEADER, "chain"), (SIGNATURE_HEADER, "c2lnbmF0dXJl")]
        );
    }

    #[test]
    fn rejected_signing_is_server_error() {
        let err = block_on(sign_report(&FixedSigner(503), report(), "chain")).unwrap_err();
        assert!(matches!(err, Error::SigningRejected(503)));
        assert_eq!(err.http_status(), 500);
    }
}
