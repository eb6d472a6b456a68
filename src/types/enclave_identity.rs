use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use super::{tcb_info::TcbStatus, TcbLevelInfo};

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnclaveTcb {
    pub isvsvn: u16,
}

/// QE Identity document as served by the PCS, `{"enclaveIdentity": {...}, "signature": "..."}`.
#[derive(Deserialize, Serialize, Debug)]
pub struct EnclaveIdentityAndSignature {
    #[serde(rename = "enclaveIdentity")]
    enclave_identity_raw: Box<RawValue>,
    signature: String,
}

impl TryFrom<&str> for EnclaveIdentityAndSignature {
    type Error = serde_json::Error;
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        serde_json::from_str(value)
    }
}

impl EnclaveIdentityAndSignature {
    pub fn enclave_identity(&self) -> anyhow::Result<EnclaveIdentity> {
        serde_json::from_str(self.enclave_identity_raw.get())
            .context("Failed to deserialize enclave identity")
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EnclaveIdentity {
    /// Identifier of the SGX Enclave issued by Intel.
    pub id: EnclaveType,

    /// Version of the structure.
    pub version: u16,

    /// The time the Enclave Identity Information was created. The time shall be in UTC
    /// and the encoding shall be compliant to ISO 8601 standard (YYYY-MM-DDhh:mm:ssZ)
    pub issue_date: String,

    /// The time by which next Enclave Identity information will be issued.
    pub next_update: String,

    /// A monotonically increasing sequence number changed when Intel updates the content of the TCB evaluation data set:
    /// TCB Info, QE Identity, QVE Identity. Copied verbatim into the report.
    pub tcb_evaluation_data_number: u32,

    /// Enclave Product ID.
    pub isvprodid: u16,

    /// Sorted list of supported Enclave TCB levels, most restrictive first.
    pub tcb_levels: Vec<EnclaveTcbLevel>,
}

/// Enclave TCB level
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EnclaveTcbLevel {
    /// SGX Enclave's ISV SVN
    pub tcb: EnclaveTcb,
    /// The time the TCB was evaluated.
    pub tcb_date: String,
    /// TCB level status
    pub tcb_status: TcbStatus,
    #[serde(rename = "advisoryIDs", default)]
    pub advisory_ids: Vec<String>,
}

impl TcbLevelInfo for EnclaveTcbLevel {
    fn tcb_status(&self) -> TcbStatus {
        self.tcb_status
    }

    fn advisory_ids(&self) -> &[String] {
        &self.advisory_ids
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EnclaveType {
    /// Quoting Enclave
    Qe,
    /// Quote Verification Enclave
    Qve,
    /// TDX Quoting Enclave
    #[serde(rename = "TD_QE")]
    TdQe,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_qe_identity() {
        let json = r#"{
            "enclaveIdentity": {
                "id": "TD_QE",
                "version": 2,
                "issueDate": "2024-03-13T10:00:00Z",
                "nextUpdate": "2024-04-12T10:00:00Z",
                "tcbEvaluationDataNumber": 16,
                "miscselect": "00000000",
                "miscselectMask": "FFFFFFFF",
                "attributes": "11000000000000000000000000000000",
                "attributesMask": "FBFFFFFFFFFFFFFF0000000000000000",
                "mrsigner": "DC9E2A7C6F948F17474E34A7FC43ED030F7C1563F1BABDDF6340C82E0E54A8C5",
                "isvprodid": 2,
                "tcbLevels": [
                    {"tcb": {"isvsvn": 4}, "tcbDate": "2023-08-09T00:00:00Z", "tcbStatus": "UpToDate"},
                    {"tcb": {"isvsvn": 0}, "tcbDate": "2021-11-10T00:00:00Z", "tcbStatus": "OutOfDate", "advisoryIDs": ["INTEL-SA-00615"]}
                ]
            },
            "signature": "00"
        }"#;

        let identity = EnclaveIdentityAndSignature::try_from(json)
            .unwrap()
            .enclave_identity()
            .unwrap();

        assert_eq!(identity.id, EnclaveType::TdQe);
        assert_eq!(identity.tcb_evaluation_data_number, 16);
        assert_eq!(identity.tcb_levels.len(), 2);
        assert_eq!(identity.tcb_levels[0].tcb.isvsvn, 4);
        assert!(identity.tcb_levels[0].advisory_ids.is_empty());
        assert_eq!(identity.tcb_levels[1].tcb_status(), TcbStatus::OutOfDate);
        assert_eq!(identity.tcb_levels[1].advisory_ids(), ["INTEL-SA-00615".to_string()]);
    }
}
