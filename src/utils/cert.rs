use anyhow::{anyhow, bail, Context};
use pem::{EncodeConfig, LineEnding, Pem};
use x509_cert::der::Decode;
use x509_cert::Certificate;

use crate::constants::{CRL_URI_MARKER, PEM_MARKER};

/// Embedded PCK certificate chain, each certificate re-encoded as PEM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PckCertChain {
    pub root_ca: String,
    pub intermediate_ca: String,
    pub pck_cert: String,
}

impl PckCertChain {
    /// Root and intermediate CA as the verification engine takes them.
    pub fn ca_chain(&self) -> String {
        format!("{}\n{}", self.root_ca, self.intermediate_ca)
    }
}

/// Chain that signed TCB Info and QE Identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcbSigningChain {
    pub root_ca: String,
    pub signing_cert: String,
}

impl TcbSigningChain {
    pub fn chain(&self) -> String {
        format!("{}\n{}", self.root_ca, self.signing_cert)
    }
}

struct ParsedCert {
    pem: Pem,
    cert: Certificate,
}

impl ParsedCert {
    fn is_self_issued(&self) -> bool {
        self.cert.tbs_certificate.issuer == self.cert.tbs_certificate.subject
    }

    fn is_issued_by(&self, issuer: &ParsedCert) -> bool {
        !self.is_self_issued() && self.cert.tbs_certificate.issuer == issuer.cert.tbs_certificate.subject
    }

    fn public_key(&self) -> &[u8] {
        uncompressed_point_coordinates(
            self.cert
                .tbs_certificate
                .subject_public_key_info
                .subject_public_key
                .raw_bytes(),
        )
    }

    fn to_pem(&self) -> String {
        pem::encode_config(&self.pem, EncodeConfig::new().set_line_ending(LineEnding::LF))
    }
}

/// Drops the SEC1 uncompressed point tag so keys compare as raw X||Y coordinates.
fn uncompressed_point_coordinates(key: &[u8]) -> &[u8] {
    match key {
        [0x04, coordinates @ ..] if coordinates.len() == 64 => coordinates,
        _ => key,
    }
}

/// Parses every certificate in a PEM bundle. Quotes carry the chain NUL terminated.
fn parse_certs(chain: &[u8]) -> anyhow::Result<Vec<ParsedCert>> {
    let end = chain.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
    let pems = pem::parse_many(&chain[..end]).context("invalid PEM certificate chain")?;

    let certs = pems
        .into_iter()
        .filter(|pem| pem.tag() == "CERTIFICATE")
        .map(|pem| -> anyhow::Result<ParsedCert> {
            let cert = Certificate::from_der(pem.contents()).context("invalid certificate in chain")?;
            Ok(ParsedCert { pem, cert })
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    if certs.is_empty() {
        bail!("certificate chain is empty");
    }
    Ok(certs)
}

fn find_trusted_root<'a>(certs: &'a [ParsedCert], trusted_root_public_key: &[u8]) -> anyhow::Result<&'a ParsedCert> {
    let trusted = uncompressed_point_coordinates(trusted_root_public_key);
    certs
        .iter()
        .find(|cert| cert.is_self_issued() && cert.public_key() == trusted)
        .ok_or_else(|| anyhow!("no root CA matching the trusted root public key"))
}

/// Splits the PCK certificate chain from the certification data of a quote into root CA,
/// intermediate CA and PCK certificate. The root has to carry the trusted public key.
pub fn split_pck_cert_chain(chain: &[u8], trusted_root_public_key: &[u8]) -> anyhow::Result<PckCertChain> {
    let certs = parse_certs(chain)?;
    let root = find_trusted_root(&certs, trusted_root_public_key)?;
    let intermediate = certs
        .iter()
        .find(|cert| cert.is_issued_by(root))
        .context("no intermediate CA issued by the root CA")?;
    let pck = certs
        .iter()
        .find(|cert| cert.is_issued_by(intermediate))
        .context("no PCK certificate issued by the intermediate CA")?;

    Ok(PckCertChain {
        root_ca: root.to_pem(),
        intermediate_ca: intermediate.to_pem(),
        pck_cert: pck.to_pem(),
    })
}

/// Splits the TCB Info issuer chain into root CA and TCB signing certificate.
pub fn split_tcb_signing_chain(chain: &str, trusted_root_public_key: &[u8]) -> anyhow::Result<TcbSigningChain> {
    let certs = parse_certs(chain.as_bytes())?;
    let root = find_trusted_root(&certs, trusted_root_public_key)?;
    let signing = certs
        .iter()
        .find(|cert| cert.is_issued_by(root))
        .context("no TCB signing certificate issued by the root CA")?;

    Ok(TcbSigningChain {
        root_ca: root.to_pem(),
        signing_cert: signing.to_pem(),
    })
}

/// Text following `URI:` in the CRL distribution point the engine reports.
pub fn crl_distribution_point_url(distribution_point: &str) -> Option<&str> {
    distribution_point
        .find(CRL_URI_MARKER)
        .map(|start| distribution_point[start + CRL_URI_MARKER.len()..].trim())
        .filter(|url| !url.is_empty())
}

/// PEM CRLs are handed to the engine as is, DER CRLs hex encoded.
pub fn crl_to_engine_format(crl: &[u8]) -> anyhow::Result<String> {
    if crl.starts_with(PEM_MARKER.as_bytes()) {
        String::from_utf8(crl.to_vec()).context("PEM CRL is not valid UTF-8")
    } else {
        Ok(hex::encode(crl))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const PCK_CERT_CHAIN: &str = include_str!("../../data/pck_cert_chain.pem");
    pub(crate) const INTEL_ROOT_PUBLIC_KEY: &str = "0ba9c4c0c0c86193a3fe23d6b02cda10a8bbd4e88e48b4458561a36e705525f567918e2edc88e40d860bd0cc4ee26aacc988e505a953558c453f6b0904ae7394";

    fn root_key() -> Vec<u8> {
        hex::decode(INTEL_ROOT_PUBLIC_KEY).unwrap()
    }

    /// The Platform CA and root of the fixture chain, standing in for a TCB signing chain.
    pub(crate) fn tcb_signing_chain_pem() -> String {
        let pems = pem::parse_many(PCK_CERT_CHAIN).unwrap();
        pems[1..].iter().map(pem::encode).collect()
    }

    #[test]
    fn split_pck_chain() {
        let mut chain = PCK_CERT_CHAIN.as_bytes().to_vec();
        chain.push(0);

        let split = split_pck_cert_chain(&chain, &root_key()).unwrap();
        let pems = pem::parse_many(PCK_CERT_CHAIN).unwrap();

        assert_eq!(pem::parse(&split.pck_cert).unwrap(), pems[0]);
        assert_eq!(pem::parse(&split.intermediate_ca).unwrap(), pems[1]);
        assert_eq!(pem::parse(&split.root_ca).unwrap(), pems[2]);
        assert!(!split.root_ca.contains('\r'));
        assert!(split.ca_chain().starts_with(&split.root_ca));
    }

    #[test]
    fn accept_uncompressed_trusted_key() {
        let mut key = vec![0x04];
        key.extend(root_key());
        assert!(split_pck_cert_chain(PCK_CERT_CHAIN.as_bytes(), &key).is_ok());
    }

    #[test]
    fn reject_untrusted_root() {
        let mut key = root_key();
        key[0] ^= 0xff;
        assert!(split_pck_cert_chain(PCK_CERT_CHAIN.as_bytes(), &key).is_err());
    }

    #[test]
    fn reject_incomplete_chain() {
        let chain = tcb_signing_chain_pem();
        assert!(split_pck_cert_chain(chain.as_bytes(), &root_key()).is_err());
        assert!(split_pck_cert_chain(b"not a chain", &root_key()).is_err());
    }

    #[test]
    fn split_tcb_chain() {
        let split = split_tcb_signing_chain(&tcb_signing_chain_pem(), &root_key()).unwrap();
        let pems = pem::parse_many(PCK_CERT_CHAIN).unwrap();
        assert_eq!(pem::parse(&split.signing_cert).unwrap(), pems[1]);
        assert_eq!(split.chain(), format!("{}\n{}", split.root_ca, split.signing_cert));
    }

    #[test]
    fn distribution_point_url() {
        assert_eq!(
            crl_distribution_point_url("URI:https://api.trustedservices.intel.com/sgx/certification/v4/pckcrl?ca=platform"),
            Some("https://api.trustedservices.intel.com/sgx/certification/v4/pckcrl?ca=platform")
        );
        assert_eq!(crl_distribution_point_url("https://no.marker"), None);
    }

    #[test]
    fn crl_formats() {
        let pem_crl = b"-----BEGIN X509 CRL-----\nAA==\n-----END X509 CRL-----\n";
        assert_eq!(crl_to_engine_format(pem_crl).unwrap().as_bytes(), pem_crl);
        assert_eq!(crl_to_engine_format(&[0x30, 0x82]).unwrap(), "3082");
    }
}
