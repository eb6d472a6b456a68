use std::fmt;

use crate::constants::TDXSVN_LEN;

/// TEE that produced the quote.
///
/// Quote v3 is always SGX. From v4 onwards the header carries the TEE type
/// 0x00000000: SGX
/// 0x00000081: TDX
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuoteType {
    Sgx,
    Tdx,
}

impl QuoteType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuoteType::Sgx => "SGX",
            QuoteType::Tdx => "TDX",
        }
    }
}

impl fmt::Display for QuoteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Version of the quote body. Only quote v5 can carry a TD 1.5 body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuoteBodyVersion {
    V1_0,
    V1_5,
}

/// What the header says about the layout of the rest of the quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuoteVersion {
    /// Version of the quote data structure - 3, 4 or 5
    pub version: u16,
    pub quote_type: QuoteType,
    pub body_version: QuoteBodyVersion,
}

/// TEE_TCB_SVN of a TD report.
///
/// [0] TDX module SVN
/// [1] TDX module major version
/// [2..16] remaining TDX TCB component SVNs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TdxSvn(pub [u8; TDXSVN_LEN]);

impl TdxSvn {
    pub fn module_svn(&self) -> u8 {
        self.0[0]
    }

    pub fn module_major_version(&self) -> u8 {
        self.0[1]
    }

    pub fn components(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for TdxSvn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}
