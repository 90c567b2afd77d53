use crate::error::{DomainError, Error, Result};

pub type PageId = u64;

pub const ADDRESS_BITS: u32 = u64::BITS;

/// The offset section of an address. Everything above it is the page number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSplit {
    shift: u32,
}

impl PageSplit {
    pub fn new(offset_bits: i64) -> Result<Self> {
        if offset_bits < 0 || offset_bits >= ADDRESS_BITS as i64 {
            return Err(DomainError::OffsetBits {
                bits: offset_bits,
                width: ADDRESS_BITS,
            }
            .into());
        }
        Ok(PageSplit {
            shift: offset_bits as u32,
        })
    }

    pub fn offset_bits(&self) -> u32 {
        self.shift
    }

    pub fn page_of(&self, token: &str) -> Result<PageId> {
        Ok(parse_hex(token)? >> self.shift)
    }
}

/// Parses `token` as base-16 and drops the low `offset_bits` bits.
pub fn translate(token: &str, offset_bits: i64) -> Result<PageId> {
    PageSplit::new(offset_bits)?.page_of(token)
}

fn parse_hex(token: &str) -> Result<u64> {
    let bad = |reason| Error::Parse {
        token: token.to_owned(),
        reason,
    };
    let digits = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
        .unwrap_or(token);
    if digits.is_empty() {
        return Err(bad("empty address"));
    }
    // from_str_radix would let a leading '+' through
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(bad("not a base-16 number"));
    }
    u64::from_str_radix(digits, 16).map_err(|_| bad("wider than 64 bits"))
}
