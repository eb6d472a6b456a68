use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use super::TcbLevelInfo;

/// TCB Info document as served by the PCS, `{"tcbInfo": {...}, "signature": "..."}`.
///
/// The `tcbInfo` member is kept as raw JSON: the verification engine checks the signature
/// over the exact bytes Intel signed, so the document must never be re-serialized.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct TcbInfoAndSignature {
    #[serde(rename = "tcbInfo")]
    tcb_info_raw: Box<RawValue>,
    signature: String,
}

impl TryFrom<&str> for TcbInfoAndSignature {
    type Error = serde_json::Error;
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        serde_json::from_str(value)
    }
}

impl TcbInfoAndSignature {
    pub fn tcb_info(&self) -> anyhow::Result<TcbInfo> {
        let tcb_info: TcbInfo =
            serde_json::from_str(self.tcb_info_raw.get()).context("tcb info")?;

        if tcb_info.tcb_levels.is_empty() {
            bail!("tcb info has no tcb levels");
        }

        Ok(tcb_info)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TcbInfo {
    /// "SGX" or "TDX". Absent in version 2 documents.
    #[serde(default)]
    pub id: Option<String>,
    pub version: u32,
    /// Kept verbatim, it is echoed into the report as `tcbDate`.
    pub issue_date: String,
    pub next_update: String,
    pub fmspc: String,
    pub pce_id: String,
    pub tcb_type: u16,
    pub tcb_evaluation_data_number: u32,
    /// Sorted by the issuer from the most to the least restrictive level.
    pub tcb_levels: Vec<TcbLevel>,
    #[serde(default)]
    pub tdx_module_identities: Vec<TdxModuleIdentity>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TcbLevel {
    pub tcb: Tcb,
    pub tcb_date: String,
    pub tcb_status: TcbStatus,
    #[serde(rename = "advisoryIDs", default)]
    pub advisory_ids: Vec<String>,
}

impl TcbLevelInfo for TcbLevel {
    fn tcb_status(&self) -> TcbStatus {
        self.tcb_status
    }

    fn advisory_ids(&self) -> &[String] {
        &self.advisory_ids
    }
}

#[derive(Debug, Eq, PartialEq, Clone, Copy, Hash, Deserialize, Serialize)]
pub enum TcbStatus {
    UpToDate,
    OutOfDate,
    ConfigurationNeeded,
    SWHardeningNeeded,
    ConfigurationAndSWHardeningNeeded,
    OutOfDateConfigurationNeeded,
    Revoked,
    #[serde(rename = "TDRelaunchAdvised")]
    TdRelaunchAdvised,
    #[serde(rename = "TDRelaunchAdvisedConfigurationNeeded")]
    TdRelaunchAdvisedConfigurationNeeded,
}

/// Contains information identifying a TcbLevel.
#[derive(Deserialize, Serialize, PartialEq, Eq, Clone, Debug)]
pub struct Tcb {
    pub sgxtcbcomponents: Vec<TcbComponent>,
    pub pcesvn: u16,
    /// Only present in TDX TCB Info.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tdxtcbcomponents: Option<Vec<TcbComponent>>,
}

#[derive(Deserialize, Serialize, PartialEq, Eq, Clone, Debug)]
pub struct TcbComponent {
    pub svn: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub r#type: Option<String>,
}

impl TcbComponent {
    /// Only labelled components are reported as out of date.
    pub fn is_labelled(&self) -> bool {
        self.category.is_some() || self.r#type.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TdxModuleIdentity {
    /// `TDX_` followed by the module major version as two uppercase hex digits.
    pub id: String,
    #[serde(default)]
    pub mrsigner: String,
    #[serde(default)]
    pub attributes: String,
    #[serde(default)]
    pub attributes_mask: String,
    pub tcb_levels: Vec<TdxModuleTcbLevel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TdxModuleTcbLevel {
    pub tcb: TdxModuleTcb,
    pub tcb_date: String,
    pub tcb_status: TcbStatus,
    #[serde(rename = "advisoryIDs", default)]
    pub advisory_ids: Vec<String>,
}

impl TcbLevelInfo for TdxModuleTcbLevel {
    fn tcb_status(&self) -> TcbStatus {
        self.tcb_status
    }

    fn advisory_ids(&self) -> &[String] {
        &self.advisory_ids
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TdxModuleTcb {
    pub isvsvn: u8,
}
