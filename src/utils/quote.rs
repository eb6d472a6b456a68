use zerocopy::byteorder::{LittleEndian, U16, U32};
use zerocopy::FromBytes;

use crate::constants::*;
use crate::error::{Error, Result};
use crate::types::quote::{QuoteBodyVersion, QuoteType, QuoteVersion, TdxSvn};

// Structural parsing only. Nothing here says the quote is authentic, the verification
// engine does that. Every read is bounds checked since the bytes are untrusted.

fn read_u16_le(quote: &[u8], offset: usize, field: &'static str) -> Result<u16> {
    quote
        .get(offset..)
        .and_then(U16::<LittleEndian>::read_from_prefix)
        .map(|value| value.get())
        .ok_or(Error::QuoteTooShort {
            field,
            offset,
            len: quote.len(),
        })
}

fn read_u32_le(quote: &[u8], offset: usize, field: &'static str) -> Result<u32> {
    quote
        .get(offset..)
        .and_then(U32::<LittleEndian>::read_from_prefix)
        .map(|value| value.get())
        .ok_or(Error::QuoteTooShort {
            field,
            offset,
            len: quote.len(),
        })
}

/// Determines quote version and type: SGX, TDX 1.0 or TDX 1.5.
pub fn read_quote_version(quote: &[u8]) -> Result<QuoteVersion> {
    let version = read_u16_le(quote, VERSION_OFFSET, "version")?;

    let quote_type = if version >= 4 && read_u32_le(quote, TEE_TYPE_OFFSET, "tee type")? == TDX_TEE_TYPE {
        QuoteType::Tdx
    } else {
        QuoteType::Sgx
    };

    let body_version = if version == 5 && read_u16_le(quote, BODY_TYPE_OFFSET, "body type")? == TD15_BODY_TYPE {
        QuoteBodyVersion::V1_5
    } else {
        QuoteBodyVersion::V1_0
    };

    Ok(QuoteVersion {
        version,
        quote_type,
        body_version,
    })
}

/// Offset of the QE report ISV SVN for every supported quote layout.
pub fn isv_svn_offset(quote_version: &QuoteVersion) -> Result<usize> {
    use QuoteBodyVersion::*;
    use QuoteType::*;

    match (quote_version.version, quote_version.quote_type, quote_version.body_version) {
        (3, Sgx, _) => Ok(V3_ISVSVN_OFFSET),
        (4, Sgx, _) => Ok(V4_SGX_ISVSVN_OFFSET),
        (4, Tdx, _) => Ok(V4_TDX10_ISVSVN_OFFSET),
        (5, Sgx, _) => Ok(V5_SGX_ISVSVN_OFFSET),
        (5, Tdx, V1_0) => Ok(V5_TDX10_ISVSVN_OFFSET),
        (5, Tdx, V1_5) => Ok(V5_TDX15_ISVSVN_OFFSET),
        (version, _, _) => Err(Error::UnsupportedQuoteVersion(version)),
    }
}

/// Reads the ISV SVN of the quoting enclave.
pub fn read_isv_svn(quote: &[u8]) -> Result<u16> {
    let quote_version = read_quote_version(quote)?;
    let offset = isv_svn_offset(&quote_version)?;
    read_u16_le(quote, offset, "isvsvn")
}

/// Reads TEE_TCB_SVN from a TDX quote. SGX quotes have none.
pub fn read_tdx_svn(quote: &[u8]) -> Result<Option<TdxSvn>> {
    let quote_version = read_quote_version(quote)?;
    if quote_version.quote_type != QuoteType::Tdx {
        return Ok(None);
    }

    let offset = if quote_version.version == 4 {
        V4_TDXSVN_OFFSET
    } else {
        V5_TDXSVN_OFFSET
    };

    quote
        .get(offset..offset + TDXSVN_LEN)
        .and_then(|bytes| <[u8; TDXSVN_LEN]>::try_from(bytes).ok())
        .map(|svn| Some(TdxSvn(svn)))
        .ok_or(Error::QuoteTooShort {
            field: "tdxsvn",
            offset,
            len: quote.len(),
        })
}

/// Header and body of the quote, the signature section cropped off.
pub fn header_and_body(quote: &[u8], quote_type: QuoteType) -> &[u8] {
    let body_len = match quote_type {
        QuoteType::Sgx => ENCLAVE_REPORT_LEN,
        QuoteType::Tdx => TD10_REPORT_LEN,
    };
    let end = (HEADER_LEN + body_len).min(quote.len());
    &quote[..end]
}

/// The fields of a quote the service needs before matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedQuote {
    pub version: QuoteVersion,
    pub isv_svn: u16,
    pub tdx_svn: Option<TdxSvn>,
}

impl DecodedQuote {
    pub fn decode(quote: &[u8]) -> Result<Self> {
        Ok(DecodedQuote {
            version: read_quote_version(quote)?,
            isv_svn: read_isv_svn(quote)?,
            tdx_svn: read_tdx_svn(quote)?,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A zeroed quote of `len` bytes with the header fields that drive decoding filled in.
    pub(crate) fn quote_bytes(version: u16, tee_type: u32, body_type: u16, len: usize) -> Vec<u8> {
        let mut quote = vec![0u8; len];
        quote[0..2].copy_from_slice(&version.to_le_bytes());
        quote[4..8].copy_from_slice(&tee_type.to_le_bytes());
        if len >= BODY_TYPE_OFFSET + 2 {
            quote[BODY_TYPE_OFFSET..BODY_TYPE_OFFSET + 2].copy_from_slice(&body_type.to_le_bytes());
        }
        quote
    }

    pub(crate) fn with_u16(mut quote: Vec<u8>, offset: usize, value: u16) -> Vec<u8> {
        quote[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
        quote
    }

    #[test]
    fn read_isv_svn_for_every_layout() {
        let layouts = [
            (3, SGX_TEE_TYPE, 0, V3_ISVSVN_OFFSET),
            (4, SGX_TEE_TYPE, 0, V4_SGX_ISVSVN_OFFSET),
            (4, TDX_TEE_TYPE, 0, V4_TDX10_ISVSVN_OFFSET),
            (5, SGX_TEE_TYPE, 1, V5_SGX_ISVSVN_OFFSET),
            (5, TDX_TEE_TYPE, 2, V5_TDX10_ISVSVN_OFFSET),
            (5, TDX_TEE_TYPE, 3, V5_TDX15_ISVSVN_OFFSET),
        ];

        for (i, (version, tee_type, body_type, offset)) in layouts.into_iter().enumerate() {
            let svn = 0x0100 + i as u16;
            let quote = with_u16(quote_bytes(version, tee_type, body_type, 1200), offset, svn);
            assert_eq!(read_isv_svn(&quote).unwrap(), svn, "layout {version}/{tee_type}/{body_type}");
        }
    }

    #[test]
    fn detect_quote_version() {
        let quote = quote_bytes(5, TDX_TEE_TYPE, 3, 1200);
        let version = read_quote_version(&quote).unwrap();
        assert_eq!(version.version, 5);
        assert_eq!(version.quote_type, QuoteType::Tdx);
        assert_eq!(version.body_version, QuoteBodyVersion::V1_5);

        // the tee type field is not looked at for v3
        let quote = quote_bytes(3, TDX_TEE_TYPE, 0, 1200);
        assert_eq!(read_quote_version(&quote).unwrap().quote_type, QuoteType::Sgx);

        // body type is only meaningful for v5
        let quote = quote_bytes(4, TDX_TEE_TYPE, 3, 1200);
        assert_eq!(read_quote_version(&quote).unwrap().body_version, QuoteBodyVersion::V1_0);
    }

    #[test]
    fn reject_unsupported_version() {
        let quote = quote_bytes(6, SGX_TEE_TYPE, 0, 1200);
        assert!(matches!(read_isv_svn(&quote), Err(Error::UnsupportedQuoteVersion(6))));

        let quote = quote_bytes(2, SGX_TEE_TYPE, 0, 1200);
        assert!(matches!(read_isv_svn(&quote), Err(Error::UnsupportedQuoteVersion(2))));

        // a v3 header never decodes as TDX, the offset table has no entry for it either
        let v3_tdx = QuoteVersion {
            version: 3,
            quote_type: QuoteType::Tdx,
            body_version: QuoteBodyVersion::V1_0,
        };
        assert!(matches!(isv_svn_offset(&v3_tdx), Err(Error::UnsupportedQuoteVersion(3))));
    }

    #[test]
    fn reject_short_quote() {
        // exactly one byte short of the ISV SVN
        let quote = quote_bytes(4, SGX_TEE_TYPE, 0, V4_SGX_ISVSVN_OFFSET + 1);
        let err = read_isv_svn(&quote).unwrap_err();
        assert!(matches!(err, Error::QuoteTooShort { offset: V4_SGX_ISVSVN_OFFSET, .. }));
        assert_eq!(err.http_status(), 400);

        let quote = quote_bytes(4, SGX_TEE_TYPE, 0, V4_SGX_ISVSVN_OFFSET + 2);
        assert!(read_isv_svn(&quote).is_ok());

        assert!(matches!(read_quote_version(&[4]), Err(Error::QuoteTooShort { .. })));
        assert!(matches!(read_quote_version(&[4, 0, 0]), Err(Error::QuoteTooShort { .. })));
    }

    #[test]
    fn read_tdx_svn_by_version() {
        let mut quote = quote_bytes(4, TDX_TEE_TYPE, 0, 1200);
        quote[V4_TDXSVN_OFFSET] = 7;
        quote[V4_TDXSVN_OFFSET + 1] = 1;
        let svn = read_tdx_svn(&quote).unwrap().unwrap();
        assert_eq!(svn.module_svn(), 7);
        assert_eq!(svn.module_major_version(), 1);

        let mut quote = quote_bytes(5, TDX_TEE_TYPE, 2, 1200);
        quote[V5_TDXSVN_OFFSET + 1] = 2;
        assert_eq!(read_tdx_svn(&quote).unwrap().unwrap().module_major_version(), 2);

        let quote = quote_bytes(4, SGX_TEE_TYPE, 0, 1200);
        assert!(read_tdx_svn(&quote).unwrap().is_none());

        let quote = quote_bytes(4, TDX_TEE_TYPE, 0, V4_TDXSVN_OFFSET + 10);
        assert!(read_tdx_svn(&quote).is_err());
    }

    #[test]
    fn crop_header_and_body() {
        let quote = quote_bytes(4, SGX_TEE_TYPE, 0, 1200);
        assert_eq!(header_and_body(&quote, QuoteType::Sgx).len(), 432);
        assert_eq!(header_and_body(&quote, QuoteType::Tdx).len(), 632);
        assert_eq!(header_and_body(&quote[..100], QuoteType::Sgx).len(), 100);
    }
}
