use std::{fs, path::Path};

use anyhow::{bail, Context};
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};

/// Service settings as read from the configuration file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceConfig {
    /// Attestation report signing certificate, URL encoded PEM.
    pub attestation_report_signing_certificate: String,
    /// CA certificate of the report signing certificate, URL encoded PEM.
    pub attestation_report_signing_ca_certificate: String,
    /// URL encoded, hex encoded public key of the Intel SGX Root CA. Either the raw 64 byte
    /// X||Y coordinates or the 65 byte uncompressed point.
    pub trusted_root_public_key: String,
}

impl ServiceConfig {
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("invalid service configuration")
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_json_str(&json)
    }
}

/// Settings the verifier runs with, resolved once at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifierConfig {
    /// Value of the `X-IASReport-Signing-Certificate` header.
    pub signing_certificate_chain: String,
    pub trusted_root_public_key: Vec<u8>,
}

impl TryFrom<&ServiceConfig> for VerifierConfig {
    type Error = anyhow::Error;

    fn try_from(config: &ServiceConfig) -> anyhow::Result<Self> {
        let key = percent_decode_str(config.trusted_root_public_key.trim())
            .decode_utf8()
            .context("trusted root public key is not URL encoded UTF-8")?;
        let trusted_root_public_key = hex::decode(key.as_ref()).context("trusted root public key is not hex")?;
        if !matches!(trusted_root_public_key.len(), 64 | 65) {
            bail!(
                "trusted root public key has {} bytes, expected an uncompressed P-256 point",
                trusted_root_public_key.len()
            );
        }

        Ok(VerifierConfig {
            signing_certificate_chain: format!(
                "{}{}",
                config.attestation_report_signing_certificate, config.attestation_report_signing_ca_certificate
            ),
            trusted_root_public_key,
        })
    }
}
