use tracing::{debug, error};

use crate::error::{Error, Result};
use crate::types::quote::TdxSvn;
use crate::types::tcb_info::{TcbInfo, TdxModuleIdentity, TdxModuleTcbLevel};

use super::first_match;

/// `TDX_` followed by the major version as two uppercase hex digits, e.g. `TDX_01`.
pub fn tdx_module_identity_id(major_version: u8) -> String {
    format!("TDX_{:02X}", major_version)
}

pub fn match_tdx_module_identity(tcb_info: &TcbInfo, major_version: u8) -> Result<&TdxModuleIdentity> {
    let id = tdx_module_identity_id(major_version);
    tcb_info
        .tdx_module_identities
        .iter()
        .find(|identity| identity.id == id)
        .ok_or_else(|| {
            let err = Error::NoMatchingTdxModuleIdentity(major_version);
            error!("{err}");
            err
        })
}

pub fn match_tdx_module_tcb_level(identity: &TdxModuleIdentity, module_svn: u8) -> Result<&TdxModuleTcbLevel> {
    first_match(&identity.tcb_levels, |level| level.tcb.isvsvn <= module_svn).ok_or_else(|| {
        let err = Error::NoMatchingTdxModuleTcbLevel {
            id: identity.id.clone(),
            svn: module_svn,
        };
        error!("{err}");
        err
    })
}

// https://github.com/intel/SGX-TDX-DCAP-QuoteVerificationLibrary/blob/7e5b2a13ca5472de8d97dd7d7024c2ea5af9a6ba/Src/AttestationLibrary/src/Verifiers/Checks/TdxModuleCheck.cpp#L62-L97
/// TDX module TCB level of a TD.
///
/// Major version 0 has no module identity in TCB Info: no level, no status, no advisories.
pub fn tdx_module_tcb_level<'a>(tcb_info: &'a TcbInfo, tdx_svn: &TdxSvn) -> Result<Option<&'a TdxModuleTcbLevel>> {
    let major_version = tdx_svn.module_major_version();
    if major_version == 0 {
        return Ok(None);
    }

    let identity = match_tdx_module_identity(tcb_info, major_version)?;
    let level = match_tdx_module_tcb_level(identity, tdx_svn.module_svn())?;
    debug!(id = %identity.id, tcb_status = ?level.tcb_status, "matched TDX module TCB level");
    Ok(Some(level))
}
