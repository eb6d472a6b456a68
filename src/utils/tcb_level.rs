use tracing::{debug, error};

use crate::error::{Error, Result};
use crate::types::enclave_identity::{EnclaveIdentity, EnclaveTcbLevel};
use crate::types::quote::TdxSvn;
use crate::types::tcb_info::{TcbComponent, TcbInfo, TcbLevel};

use super::first_match;

/// `observed[i] >= reference[i].svn` for every index. Vectors of different length never match.
fn svns_at_least(observed: &[u8], reference: &[TcbComponent]) -> bool {
    observed.len() == reference.len()
        && observed
            .iter()
            .zip(reference)
            .all(|(observed, reference)| *observed >= reference.svn)
}

/// Compares the TEE_TCB_SVN of a TD against a level's TDX components.
///
/// With a TDX module major version above 0, bytes 0 and 1 belong to the TDX module and
/// are checked against the TDX Module Identity instead.
fn tdx_svns_at_least(tdx_svn: &TdxSvn, reference: Option<&Vec<TcbComponent>>) -> bool {
    let Some(reference) = reference else {
        return false;
    };
    let skip = if tdx_svn.module_major_version() > 0 { 2 } else { 0 };

    match (tdx_svn.components().get(skip..), reference.get(skip..)) {
        (Some(observed), Some(reference)) => svns_at_least(observed, reference),
        _ => false,
    }
}

fn is_platform_level_satisfied(
    level: &TcbLevel,
    cpu_svn: &[u8],
    pce_svn: u16,
    tdx_svn: Option<&TdxSvn>,
) -> bool {
    if !svns_at_least(cpu_svn, &level.tcb.sgxtcbcomponents) || pce_svn < level.tcb.pcesvn {
        return false;
    }
    match tdx_svn {
        Some(tdx_svn) => tdx_svns_at_least(tdx_svn, level.tcb.tdxtcbcomponents.as_ref()),
        None => true,
    }
}

// https://github.com/intel/SGX-TDX-DCAP-QuoteVerificationLibrary/blob/7e5b2a13ca5472de8d97dd7d7024c2ea5af9a6ba/Src/AttestationLibrary/src/Verifiers/Checks/TcbLevelCheck.cpp
/// Platform TCB level for the CPU SVN and PCE SVN of the PCK certificate and, for TDX, the
/// TEE_TCB_SVN of the quote.
pub fn match_tcb_level<'a>(
    tcb_info: &'a TcbInfo,
    cpu_svn: &[u8],
    pce_svn: u16,
    tdx_svn: Option<&TdxSvn>,
) -> Result<&'a TcbLevel> {
    let level = first_match(&tcb_info.tcb_levels, |level| {
        is_platform_level_satisfied(level, cpu_svn, pce_svn, tdx_svn)
    });

    match level {
        Some(level) => {
            debug!(tcb_date = %level.tcb_date, tcb_status = ?level.tcb_status, "matched platform TCB level");
            Ok(level)
        }
        None => {
            let err = Error::NoMatchingTcbLevel {
                cpu_svn: hex::encode(cpu_svn),
                pce_svn,
                tdx_svn: tdx_svn.map(|svn| hex::encode(svn.components())).unwrap_or_default(),
            };
            error!("{err}");
            Err(err)
        }
    }
}

/// Enclave TCB level for the ISV SVN of the QE report.
pub fn match_enclave_tcb_level(identity: &EnclaveIdentity, isv_svn: u16) -> Result<&EnclaveTcbLevel> {
    match first_match(&identity.tcb_levels, |level| level.tcb.isvsvn <= isv_svn) {
        Some(level) => {
            debug!(tcb_date = %level.tcb_date, tcb_status = ?level.tcb_status, "matched QE TCB level");
            Ok(level)
        }
        None => {
            let err = Error::NoMatchingEnclaveTcbLevel(isv_svn);
            error!("{err}");
            Err(err)
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::types::enclave_identity::{EnclaveTcb, EnclaveType};
    use crate::types::tcb_info::{Tcb, TcbStatus};

    pub(crate) fn components(svns: &[u8]) -> Vec<TcbComponent> {
        svns.iter()
            .map(|svn| TcbComponent { svn: *svn, category: None, r#type: None })
            .collect()
    }

    pub(crate) fn level(sgx: &[u8], pcesvn: u16, tdx: Option<&[u8]>, status: TcbStatus) -> TcbLevel {
        TcbLevel {
            tcb: Tcb {
                sgxtcbcomponents: components(sgx),
                pcesvn,
                tdxtcbcomponents: tdx.map(components),
            },
            tcb_date: "2024-03-13T00:00:00Z".to_string(),
            tcb_status: status,
            advisory_ids: vec![],
        }
    }

    pub(crate) fn tcb_info(levels: Vec<TcbLevel>) -> TcbInfo {
        TcbInfo {
            id: None,
            version: 3,
            issue_date: "2024-03-13T10:00:00Z".to_string(),
            next_update: "2024-04-12T10:00:00Z".to_string(),
            fmspc: "00906ED50000".to_string(),
            pce_id: "0000".to_string(),
            tcb_type: 0,
            tcb_evaluation_data_number: 16,
            tcb_levels: levels,
            tdx_module_identities: vec![],
        }
    }

    pub(crate) fn enclave_identity(levels: &[(u16, TcbStatus)]) -> EnclaveIdentity {
        EnclaveIdentity {
            id: EnclaveType::Qe,
            version: 2,
            issue_date: "2024-03-13T10:00:00Z".to_string(),
            next_update: "2024-04-12T10:00:00Z".to_string(),
            tcb_evaluation_data_number: 16,
            isvprodid: 1,
            tcb_levels: levels
                .iter()
                .map(|(isvsvn, status)| EnclaveTcbLevel {
                    tcb: EnclaveTcb { isvsvn: *isvsvn },
                    tcb_date: "2024-03-13T00:00:00Z".to_string(),
                    tcb_status: *status,
                    advisory_ids: vec![],
                })
                .collect(),
        }
    }

    #[test]
    fn platform_match_is_first_in_document_order() {
        let info = tcb_info(vec![
            level(&[5, 5], 13, None, TcbStatus::UpToDate),
            level(&[2, 2], 10, None, TcbStatus::SWHardeningNeeded),
            level(&[1, 1], 5, None, TcbStatus::OutOfDate),
        ]);

        // satisfies the second and the third level
        let matched = match_tcb_level(&info, &[3, 4], 11, None).unwrap();
        assert_eq!(matched.tcb_status, TcbStatus::SWHardeningNeeded);

        let matched = match_tcb_level(&info, &[9, 9], 13, None).unwrap();
        assert_eq!(matched.tcb_status, TcbStatus::UpToDate);
    }

    #[test]
    fn platform_match_requires_every_component_and_pce_svn() {
        let info = tcb_info(vec![level(&[2, 2], 10, None, TcbStatus::UpToDate)]);

        assert!(match_tcb_level(&info, &[2, 1], 10, None).is_err());
        assert!(match_tcb_level(&info, &[2, 2], 9, None).is_err());
        // length mismatch
        assert!(match_tcb_level(&info, &[2, 2, 2], 10, None).is_err());

        let err = match_tcb_level(&info, &[0, 0], 0, None).unwrap_err();
        assert_eq!(err.http_status(), 400);
    }

    #[test]
    fn tdx_match_skips_module_bytes_for_versioned_modules() {
        let mut reference = [0u8; 16];
        reference[0] = 9;
        reference[1] = 9;
        reference[2] = 3;
        let info = tcb_info(vec![level(&[1], 1, Some(&reference), TcbStatus::UpToDate)]);

        // module svn 1 and major version 1 are below the reference but not compared
        let mut observed = [0u8; 16];
        observed[0] = 1;
        observed[1] = 1;
        observed[2] = 3;
        assert!(match_tcb_level(&info, &[1], 1, Some(&TdxSvn(observed))).is_ok());

        observed[2] = 2;
        assert!(match_tcb_level(&info, &[1], 1, Some(&TdxSvn(observed))).is_err());
    }

    #[test]
    fn tdx_match_compares_all_bytes_without_module_version() {
        let mut reference = [0u8; 16];
        reference[0] = 4;
        let info = tcb_info(vec![level(&[1], 1, Some(&reference), TcbStatus::UpToDate)]);

        let mut observed = [0u8; 16];
        observed[0] = 3;
        assert!(match_tcb_level(&info, &[1], 1, Some(&TdxSvn(observed))).is_err());

        observed[0] = 4;
        assert!(match_tcb_level(&info, &[1], 1, Some(&TdxSvn(observed))).is_ok());
    }

    #[test]
    fn tdx_match_needs_tdx_components() {
        let info = tcb_info(vec![level(&[1], 1, None, TcbStatus::UpToDate)]);
        assert!(match_tcb_level(&info, &[1], 1, Some(&TdxSvn([0; 16]))).is_err());
    }

    #[test]
    fn enclave_match_is_first_level_at_or_below_isv_svn() {
        let identity = enclave_identity(&[
            (8, TcbStatus::UpToDate),
            (6, TcbStatus::SWHardeningNeeded),
            (0, TcbStatus::OutOfDate),
        ]);

        assert_eq!(match_enclave_tcb_level(&identity, 8).unwrap().tcb_status, TcbStatus::UpToDate);
        assert_eq!(match_enclave_tcb_level(&identity, 7).unwrap().tcb_status, TcbStatus::SWHardeningNeeded);
        assert_eq!(match_enclave_tcb_level(&identity, 1).unwrap().tcb_status, TcbStatus::OutOfDate);

        let identity = enclave_identity(&[(4, TcbStatus::UpToDate)]);
        assert!(matches!(
            match_enclave_tcb_level(&identity, 3),
            Err(Error::NoMatchingEnclaveTcbLevel(3))
        ));
    }
}
