// https://github.com/intel/SGX-TDX-DCAP-QuoteVerificationLibrary/blob/16b7291a7a86e486fdfcf1dfb4be885c0cc00b4e/Src/AttestationLibrary/src/QuoteVerification/QuoteConstants.h

pub const SGX_TEE_TYPE: u32 = 0x00000000;
pub const TDX_TEE_TYPE: u32 = 0x00000081;

pub const HEADER_LEN: usize = 48;

pub const ENCLAVE_REPORT_LEN: usize = 384;
pub const TD10_REPORT_LEN: usize = 584;

// Header field offsets
pub const VERSION_OFFSET: usize = 0;
pub const TEE_TYPE_OFFSET: usize = 4;

// Quote v5 only: body descriptor follows the header.
pub const BODY_TYPE_OFFSET: usize = HEADER_LEN;
pub const TD15_BODY_TYPE: u16 = 3;

// ISV SVN of the QE report carried in the signature section.
// [header][body][4 - signature length][64 - isv signature][64 - attestation key][qe report]
pub const V3_ISVSVN_OFFSET: usize = 822;
pub const V4_SGX_ISVSVN_OFFSET: usize = 828;
pub const V4_TDX10_ISVSVN_OFFSET: usize = 1028;
pub const V5_SGX_ISVSVN_OFFSET: usize = 834;
pub const V5_TDX10_ISVSVN_OFFSET: usize = 1034;
pub const V5_TDX15_ISVSVN_OFFSET: usize = 1098;

// TEE_TCB_SVN of the TD report. v5 adds a 6 byte body descriptor before the body.
pub const V4_TDXSVN_OFFSET: usize = HEADER_LEN;
pub const V5_TDXSVN_OFFSET: usize = HEADER_LEN + 6;
pub const TDXSVN_LEN: usize = 16;

/// Certification data type carrying the PCK leaf, intermediate and root certificates as PEM.
pub const PCK_CERT_CHAIN_CERT_DATA_TYPE: u16 = 5;

pub const REPORT_VERSION: u32 = 5;
pub const ATTESTATION_TYPE: &str = "ECDSA";
pub const ADVISORY_URL: &str = "https://security-center.intel.com";
pub const MAX_NONCE_LEN: usize = 32;

pub const CRL_URI_MARKER: &str = "URI:";
pub const PEM_MARKER: &str = "-----BEGIN";

pub const TCB_INFO_ISSUER_CHAIN_HEADER: &str = "tcb-info-issuer-chain";
pub const SIGNING_CERTIFICATE_HEADER: &str = "X-IASReport-Signing-Certificate";
pub const SIGNATURE_HEADER: &str = "X-IASReport-Signature";

pub const HTTP_OK: u16 = 200;
pub const HTTP_BAD_REQUEST: u16 = 400;
pub const HTTP_NOT_FOUND: u16 = 404;
pub const HTTP_INTERNAL_SERVER_ERROR: u16 = 500;
