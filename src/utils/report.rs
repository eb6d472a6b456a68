use base64ct::{Base64, Encoding};
use chrono::{DateTime, Utc};
use tracing::info;

use crate::constants::{ADVISORY_URL, ATTESTATION_TYPE, REPORT_VERSION};
use crate::engine::PckCertificateData;
use crate::error::Result;
use crate::types::enclave_identity::EnclaveIdentity;
use crate::types::report::{AttestationReport, ConfigurationFlag, IsvQuoteStatus, TeeType};
use crate::types::tcb_info::TcbInfo;
use crate::types::TcbLevelInfo;

use super::advisories::{collect_advisory_ids, out_of_date_components};
use super::quote::{header_and_body, DecodedQuote};
use super::tcb_level::{match_enclave_tcb_level, match_tcb_level};
use super::tdx_module::tdx_module_tcb_level;

/// Everything a report is computed from, once the engine has given its verdict.
#[derive(Debug, Clone, Copy)]
pub struct ReportInput<'a> {
    pub quote: &'a [u8],
    pub decoded: &'a DecodedQuote,
    pub isv_quote_status: IsvQuoteStatus,
    pub pck: &'a PckCertificateData,
    pub tcb_info: &'a TcbInfo,
    pub qe_identity: &'a EnclaveIdentity,
    pub nonce: Option<&'a str>,
}

pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

fn configuration(pck: &PckCertificateData) -> Vec<ConfigurationFlag> {
    [
        (pck.dynamic_platform, ConfigurationFlag::DynamicPlatform),
        (pck.cached_keys, ConfigurationFlag::CachedKeys),
        (pck.smt_enabled, ConfigurationFlag::SmtEnabled),
    ]
    .into_iter()
    .filter_map(|(enabled, flag)| enabled.then_some(flag))
    .collect()
}

/// Builds the attestation verification report.
///
/// For verdicts where the quote was matched to TCB levels, the platform, QE and TDX module
/// levels are looked up and their advisories (and, when out of date, the stale components)
/// are attached. Failing to match any of them fails the report.
pub fn compose_report(input: &ReportInput<'_>, id: String, timestamp: DateTime<Utc>) -> Result<AttestationReport> {
    let quote_type = input.decoded.version.quote_type;

    let mut report = AttestationReport {
        id,
        timestamp: format_timestamp(&timestamp),
        version: REPORT_VERSION,
        attestation_type: ATTESTATION_TYPE.to_string(),
        tee_type: TeeType::for_report(quote_type, &input.pck.sgx_type)?,
        isv_quote_status: input.isv_quote_status,
        isv_quote_body: Base64::encode_string(header_and_body(input.quote, quote_type)),
        tcb_evaluation_data_number: input.qe_identity.tcb_evaluation_data_number,
        tcb_date: input.tcb_info.issue_date.clone(),
        nonce: input.nonce.map(str::to_string),
        advisory_url: None,
        advisory_ids: None,
        tcb_components_out_of_date: None,
        configuration: None,
    };

    if input.isv_quote_status.requires_tcb_matching() {
        let tdx_svn = input.decoded.tdx_svn.as_ref();
        let platform = match_tcb_level(input.tcb_info, &input.pck.cpusvn, input.pck.pcesvn, tdx_svn)?;
        let enclave = match_enclave_tcb_level(input.qe_identity, input.decoded.isv_svn)?;
        let module = match tdx_svn {
            Some(tdx_svn) => tdx_module_tcb_level(input.tcb_info, tdx_svn)?,
            None => None,
        };
        info!(
            platform = ?platform.tcb_status(),
            enclave = ?enclave.tcb_status(),
            module = ?module.map(TcbLevelInfo::tcb_status),
            "matched TCB levels"
        );

        let mut levels: Vec<&dyn TcbLevelInfo> = vec![platform, enclave];
        if let Some(module) = module {
            levels.push(module);
        }
        let advisory_ids = collect_advisory_ids(&levels);
        if !advisory_ids.is_empty() {
            report.advisory_url = Some(ADVISORY_URL.to_string());
            report.advisory_ids = Some(advisory_ids);
        }

        if input.isv_quote_status.reports_out_of_date_components() {
            let components = out_of_date_components(quote_type, input.tcb_info, platform, module);
            if !components.is_empty() {
                info!(?components, "selected out of date TCB components");
                report.tcb_components_out_of_date = Some(components);
            }
        }
    }

    let configuration = configuration(input.pck);
    if !configuration.is_empty() {
        report.configuration = Some(configuration);
    }

    Ok(report)
}
