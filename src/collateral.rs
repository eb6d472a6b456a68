use std::collections::HashMap;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use percent_encoding::percent_decode_str;
use tracing::{debug, error};

use crate::constants::{HTTP_NOT_FOUND, HTTP_OK, TCB_INFO_ISSUER_CHAIN_HEADER};
use crate::error::{Error, Result};
use crate::types::enclave_identity::{EnclaveIdentity, EnclaveIdentityAndSignature};
use crate::types::quote::QuoteType;
use crate::types::request::UpdateType;
use crate::types::tcb_info::{TcbInfo, TcbInfoAndSignature};
use crate::utils::cert::{crl_to_engine_format, split_tcb_signing_chain, TcbSigningChain};

const TCB_INFO: &str = "TcbInfo";
const QE_IDENTITY: &str = "QeIdentity";
const TCB_INFO_ISSUER_CHAIN: &str = "TcbInfo issuer chain";
const PCK_CRL: &str = "PCK CRL";
const ROOT_CA_CRL: &str = "Root CA CRL";

/// Response of the provisioning certification service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollateralResponse {
    pub status: u16,
    pub body: String,
    pub headers: HashMap<String, String>,
}

impl CollateralResponse {
    /// Header value, name compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrlResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Source of TCB Info and QE Identity, e.g. the PCS or a caching service in front of it.
#[async_trait]
pub trait CollateralSource: Send + Sync {
    async fn tcb_info(&self, quote_type: QuoteType, fmspc: &str, update: UpdateType) -> anyhow::Result<CollateralResponse>;

    async fn qe_identity(&self, quote_type: QuoteType, update: UpdateType) -> anyhow::Result<CollateralResponse>;
}

/// Source of CRLs, addressed by the distribution point of the certificate they cover.
#[async_trait]
pub trait RevocationSource: Send + Sync {
    async fn crl(&self, url: &str) -> anyhow::Result<CrlResponse>;
}

/// What to fetch for one quote.
#[derive(Debug, Clone, Copy)]
pub struct CollateralRequest<'a> {
    pub quote_type: QuoteType,
    pub fmspc: &'a str,
    pub update: UpdateType,
    pub pck_crl_url: &'a str,
    pub root_crl_url: &'a str,
}

/// Collateral for one request, both as received (for the engine) and parsed (for matching).
#[derive(Debug, Clone)]
pub struct Collateral {
    pub tcb_info_json: String,
    pub tcb_info: TcbInfo,
    pub tcb_signing_chain: TcbSigningChain,
    pub qe_identity_json: String,
    pub qe_identity: EnclaveIdentity,
    pub pck_crl: String,
    pub root_crl: String,
}

fn check_status(what: &'static str, status: u16) -> Result<()> {
    match status {
        HTTP_OK => Ok(()),
        HTTP_NOT_FOUND => Err(Error::CollateralNotFound { what, status }),
        _ => Err(Error::CollateralUnavailable { what, status }),
    }
}

fn received<T>(what: &'static str, response: anyhow::Result<T>) -> Result<T> {
    response.map_err(|source| Error::CollateralTransport { what, source })
}

fn malformed(what: &'static str) -> impl FnOnce(anyhow::Error) -> Error {
    move |source| Error::MalformedCollateral { what, source }
}

fn read_tcb_info(
    response: anyhow::Result<CollateralResponse>,
    trusted_root_public_key: &[u8],
) -> Result<(String, TcbInfo, TcbSigningChain)> {
    let response = received(TCB_INFO, response)?;
    check_status(TCB_INFO, response.status)?;

    let tcb_info = TcbInfoAndSignature::try_from(response.body.as_str())
        .map_err(anyhow::Error::from)
        .and_then(|tcb_info| tcb_info.tcb_info())
        .map_err(malformed(TCB_INFO))?;

    let issuer_chain = response
        .header(TCB_INFO_ISSUER_CHAIN_HEADER)
        .ok_or_else(|| anyhow!("missing {TCB_INFO_ISSUER_CHAIN_HEADER} header"))
        .and_then(|header| {
            percent_decode_str(header)
                .decode_utf8()
                .context("issuer chain is not URL encoded UTF-8")
        })
        .map_err(malformed(TCB_INFO_ISSUER_CHAIN))?;
    let tcb_signing_chain =
        split_tcb_signing_chain(&issuer_chain, trusted_root_public_key).map_err(malformed(TCB_INFO_ISSUER_CHAIN))?;

    Ok((response.body, tcb_info, tcb_signing_chain))
}

fn read_qe_identity(response: anyhow::Result<CollateralResponse>) -> Result<(String, EnclaveIdentity)> {
    let response = received(QE_IDENTITY, response)?;
    check_status(QE_IDENTITY, response.status)?;

    let qe_identity = EnclaveIdentityAndSignature::try_from(response.body.as_str())
        .map_err(anyhow::Error::from)
        .and_then(|identity| identity.enclave_identity())
        .map_err(malformed(QE_IDENTITY))?;

    Ok((response.body, qe_identity))
}

fn read_crl(what: &'static str, response: anyhow::Result<CrlResponse>) -> Result<String> {
    let response = received(what, response)?;
    check_status(what, response.status)?;
    crl_to_engine_format(&response.body).map_err(malformed(what))
}

fn read_collateral(
    tcb_info: anyhow::Result<CollateralResponse>,
    qe_identity: anyhow::Result<CollateralResponse>,
    pck_crl: anyhow::Result<CrlResponse>,
    root_crl: anyhow::Result<CrlResponse>,
    trusted_root_public_key: &[u8],
) -> Result<Collateral> {
    let (tcb_info_json, tcb_info, tcb_signing_chain) = read_tcb_info(tcb_info, trusted_root_public_key)?;
    let (qe_identity_json, qe_identity) = read_qe_identity(qe_identity)?;
    Ok(Collateral {
        tcb_info_json,
        tcb_info,
        tcb_signing_chain,
        qe_identity_json,
        qe_identity,
        pck_crl: read_crl(PCK_CRL, pck_crl)?,
        root_crl: read_crl(ROOT_CA_CRL, root_crl)?,
    })
}

/// Fetches the collateral a quote is verified against: TCB Info, QE Identity and the two
/// CRLs of its PCK certificate chain. The four requests are in flight together.
///
/// The first failure, in the order TCB Info, QE Identity, PCK CRL, Root CA CRL, fails the
/// request.
pub async fn fetch_collateral(
    collateral_source: &dyn CollateralSource,
    revocation_source: &dyn RevocationSource,
    request: &CollateralRequest<'_>,
    trusted_root_public_key: &[u8],
) -> Result<Collateral> {
    debug!(
        quote_type = %request.quote_type,
        fmspc = request.fmspc,
        update = request.update.as_str(),
        "fetching collateral"
    );

    let (tcb_info, qe_identity, pck_crl, root_crl) = futures::join!(
        collateral_source.tcb_info(request.quote_type, request.fmspc, request.update),
        collateral_source.qe_identity(request.quote_type, request.update),
        revocation_source.crl(request.pck_crl_url),
        revocation_source.crl(request.root_crl_url)
    );

    let collateral = read_collateral(tcb_info, qe_identity, pck_crl, root_crl, trusted_root_public_key);

    if let Err(err) = &collateral {
        error!("{err}");
    }
    collateral
}
