use std::str::FromStr;

use base64ct::{Base64, Encoding};
use serde::{Deserialize, Serialize};

use crate::constants::MAX_NONCE_LEN;
use crate::error::{Error, Result};

/// Which TCB recovery stream the collateral is taken from.
///
/// `early` gives access to updated TCB Info and Enclave Identity on the day of public
/// disclosure of a TCB recovery event, `standard` roughly six weeks later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateType {
    #[default]
    Standard,
    Early,
}

impl UpdateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateType::Standard => "standard",
            UpdateType::Early => "early",
        }
    }
}

impl FromStr for UpdateType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "standard" => Ok(UpdateType::Standard),
            "early" => Ok(UpdateType::Early),
            other => Err(Error::InvalidRequest(format!(
                "provided update is not one of [early, standard]: {other}"
            ))),
        }
    }
}

/// Body of a verify attestation evidence request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestationEvidencePayload {
    /// Base64 encoded quote.
    #[serde(default)]
    pub isv_quote: Option<String>,
    /// Optional value echoed into the report, at most 32 characters.
    #[serde(default)]
    pub nonce: Option<String>,
}

/// A request that passed boundary validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvidenceRequest {
    pub quote: Vec<u8>,
    pub nonce: Option<String>,
    pub update: UpdateType,
}

impl EvidenceRequest {
    /// Validate the payload and the `update` query parameter. Nonce is checked first, then
    /// the update type, then the quote encoding.
    pub fn parse(payload: &AttestationEvidencePayload, update: Option<&str>) -> Result<Self> {
        if let Some(nonce) = &payload.nonce {
            // length in UTF-16 code units
            if nonce.encode_utf16().count() > MAX_NONCE_LEN {
                return Err(Error::InvalidRequest(format!(
                    "provided nonce is longer than {MAX_NONCE_LEN} characters: {nonce}"
                )));
            }
        }

        let update = update.map(UpdateType::from_str).transpose()?.unwrap_or_default();

        let isv_quote = payload
            .isv_quote
            .as_deref()
            .ok_or_else(|| Error::InvalidRequest("isvQuote is not provided".to_string()))?;
        let quote = Base64::decode_vec(isv_quote).map_err(|_| {
            Error::InvalidRequest(format!("isvQuote is not a base64 string: {isv_quote}"))
        })?;
        if quote.is_empty() {
            return Err(Error::InvalidRequest("isvQuote is empty".to_string()));
        }

        Ok(EvidenceRequest {
            quote,
            nonce: payload.nonce.clone().filter(|n| !n.is_empty()),
            update,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(quote: Option<&str>, nonce: Option<&str>) -> AttestationEvidencePayload {
        AttestationEvidencePayload {
            isv_quote: quote.map(str::to_string),
            nonce: nonce.map(str::to_string),
        }
    }

    #[test]
    fn parse_valid_request() {
        let request = EvidenceRequest::parse(&payload(Some("AwACAA=="), Some("abc")), Some("early")).unwrap();
        assert_eq!(request.quote, vec![3, 0, 2, 0]);
        assert_eq!(request.nonce.as_deref(), Some("abc"));
        assert_eq!(request.update, UpdateType::Early);
    }

    #[test]
    fn update_defaults_to_standard() {
        let request = EvidenceRequest::parse(&payload(Some("AwACAA=="), None), None).unwrap();
        assert_eq!(request.update, UpdateType::Standard);
        assert!(request.nonce.is_none());
    }

    #[test]
    fn reject_long_nonce() {
        let nonce = "a".repeat(33);
        let err = EvidenceRequest::parse(&payload(Some("AwACAA=="), Some(&nonce)), None).unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));

        let nonce = "a".repeat(32);
        assert!(EvidenceRequest::parse(&payload(Some("AwACAA=="), Some(&nonce)), None).is_ok());
    }

    #[test]
    fn nonce_length_counts_utf16_units() {
        // outside the BMP every character takes two units
        let nonce = "\u{1F600}".repeat(16);
        assert!(EvidenceRequest::parse(&payload(Some("AwACAA=="), Some(&nonce)), None).is_ok());

        let nonce = format!("{}a", "\u{1F600}".repeat(16));
        assert_eq!(nonce.chars().count(), 17);
        let err = EvidenceRequest::parse(&payload(Some("AwACAA=="), Some(&nonce)), None).unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));

        // BMP characters count once
        let nonce = "\u{00E9}".repeat(32);
        assert!(EvidenceRequest::parse(&payload(Some("AwACAA=="), Some(&nonce)), None).is_ok());
    }

    #[test]
    fn reject_unknown_update() {
        let err = EvidenceRequest::parse(&payload(Some("AwACAA=="), None), Some("late")).unwrap_err();
        assert_eq!(err.http_status(), 400);
    }

    #[test]
    fn reject_missing_or_non_base64_quote() {
        assert!(EvidenceRequest::parse(&payload(None, None), None).is_err());
        assert!(EvidenceRequest::parse(&payload(Some("not base64!"), None), None).is_err());
    }

    #[test]
    fn deserialize_payload() {
        let payload: AttestationEvidencePayload =
            serde_json::from_str(r#"{"isvQuote": "AwACAA==", "nonce": "n"}"#).unwrap();
        assert_eq!(payload.isv_quote.as_deref(), Some("AwACAA=="));
        assert_eq!(payload.nonce.as_deref(), Some("n"));
    }
}
