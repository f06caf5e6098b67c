//! CRC-8/16/32 calculators used to guard every persisted slot.
//!
//! All three implementations are true (non-reflected, non-XOR-out) shift
//! registers, so the incremental law the block manager relies on holds
//! directly: running the same update function over `a ++ b` starting from
//! `init` is identical to resuming from the state reached after `a`. CRC-32
//! delegates to `crc32fast`, whose `Hasher::new_with_initial` /
//! `Hasher::finalize` pair is built for exactly this kind of chained use.

use crc32fast::Hasher as Crc32Hasher;

/// Which CRC (if any) guards a block's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrcKind {
    None,
    Crc8,
    Crc16,
    Crc32,
}

impl CrcKind {
    /// Trailer size in bytes for this CRC kind.
    pub const fn size(self) -> usize {
        match self {
            Self::None => 0,
            Self::Crc8 => 1,
            Self::Crc16 => 2,
            Self::Crc32 => 4,
        }
    }
}

const CRC8_POLY: u8 = 0x1D;
const CRC8_INIT: u8 = 0xFF;
const CRC16_POLY: u16 = 0x1021;
const CRC16_INIT: u16 = 0xFFFF;
/// Identity element for the CRC-32 chain; `Hasher::new_with_initial(0)`
/// reproduces the standard IEEE 802.3 initial register state internally.
const CRC32_INIT: u32 = 0;

const fn build_crc8_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut byte = 0usize;
    while byte < 256 {
        let mut reg = byte as u8;
        let mut bit = 0;
        while bit < 8 {
            reg = if reg & 0x80 != 0 {
                (reg << 1) ^ CRC8_POLY
            } else {
                reg << 1
            };
            bit += 1;
        }
        table[byte] = reg;
        byte += 1;
    }
    table
}

const fn build_crc16_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut byte = 0usize;
    while byte < 256 {
        let mut reg = (byte as u16) << 8;
        let mut bit = 0;
        while bit < 8 {
            reg = if reg & 0x8000 != 0 {
                (reg << 1) ^ CRC16_POLY
            } else {
                reg << 1
            };
            bit += 1;
        }
        table[byte] = reg;
        byte += 1;
    }
    table
}

static CRC8_TABLE: [u8; 256] = build_crc8_table();
static CRC16_TABLE: [u16; 256] = build_crc16_table();

fn crc8_extended(bytes: &[u8], initial: u8) -> u8 {
    let mut reg = initial;
    for &b in bytes {
        reg = CRC8_TABLE[(reg ^ b) as usize];
    }
    reg
}

fn crc16_extended(bytes: &[u8], initial: u16) -> u16 {
    let mut reg = initial;
    for &b in bytes {
        let idx = ((reg >> 8) ^ b as u16) & 0xFF;
        reg = (reg << 8) ^ CRC16_TABLE[idx as usize];
    }
    reg
}

fn crc32_extended(bytes: &[u8], initial: u32) -> u32 {
    let mut hasher = Crc32Hasher::new_with_initial(initial);
    hasher.update(bytes);
    hasher.finalize()
}

/// A computed CRC word, sized to the kind that produced it. Zero-extended
/// into a `u32` for uniform storage; [`CrcWord::to_le_bytes`] trims it back
/// down to the kind's trailer width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrcWord {
    kind: CrcKind,
    value: u32,
}

impl CrcWord {
    pub fn kind(self) -> CrcKind {
        self.kind
    }

    pub fn value(self) -> u32 {
        self.value
    }

    /// Little-endian encoding, trimmed to the kind's trailer size.
    pub fn to_le_bytes(self) -> Vec<u8> {
        self.value.to_le_bytes()[..self.kind.size()].to_vec()
    }

    /// Decode a little-endian trailer of the matching size back into a word.
    pub fn from_le_bytes(kind: CrcKind, bytes: &[u8]) -> Self {
        debug_assert_eq!(bytes.len(), kind.size());
        let mut buf = [0u8; 4];
        buf[..bytes.len()].copy_from_slice(bytes);
        Self {
            kind,
            value: u32::from_le_bytes(buf),
        }
    }
}

/// Compute the CRC of `bytes` from the kind's standard initial value.
/// Empty input returns the initial value unchanged.
pub fn compute(kind: CrcKind, bytes: &[u8]) -> CrcWord {
    let value = match kind {
        CrcKind::None => 0,
        CrcKind::Crc8 => crc8_extended(bytes, CRC8_INIT) as u32,
        CrcKind::Crc16 => crc16_extended(bytes, CRC16_INIT) as u32,
        CrcKind::Crc32 => crc32_extended(bytes, CRC32_INIT),
    };
    CrcWord { kind, value }
}

/// Resume a CRC computation from a prior word, feeding in more bytes.
/// `compute_extended(kind, b, compute_extended(kind, a, init)) ==
/// compute(kind, a ++ b)`.
pub fn compute_extended(kind: CrcKind, bytes: &[u8], initial: CrcWord) -> CrcWord {
    debug_assert_eq!(initial.kind, kind);
    let value = match kind {
        CrcKind::None => 0,
        CrcKind::Crc8 => crc8_extended(bytes, initial.value as u8) as u32,
        CrcKind::Crc16 => crc16_extended(bytes, initial.value as u16) as u32,
        CrcKind::Crc32 => crc32_extended(bytes, initial.value),
    };
    CrcWord { kind, value }
}

/// The initial/identity word for a given CRC kind, with no bytes folded in.
pub fn init(kind: CrcKind) -> CrcWord {
    compute(kind, &[])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_initial_value_for_every_kind() {
        for kind in [CrcKind::Crc8, CrcKind::Crc16, CrcKind::Crc32] {
            assert_eq!(compute(kind, &[]), init(kind));
        }
    }

    #[test]
    fn chaining_matches_computing_the_concatenation() {
        let a = b"non-volatile";
        let b = b"memory manager";
        let mut joined = a.to_vec();
        joined.extend_from_slice(b);

        for kind in [CrcKind::Crc8, CrcKind::Crc16, CrcKind::Crc32] {
            let whole = compute(kind, &joined);
            let partial = compute(kind, a);
            let resumed = compute_extended(kind, b, partial);
            assert_eq!(whole, resumed, "{kind:?} chaining law failed");
        }
    }

    #[test]
    fn single_bit_flip_changes_every_crc_kind() {
        let mut data = vec![0x55u8; 37];
        for kind in [CrcKind::Crc8, CrcKind::Crc16, CrcKind::Crc32] {
            let before = compute(kind, &data);
            data[12] ^= 0x01;
            let after = compute(kind, &data);
            assert_ne!(before, after, "{kind:?} missed a single-bit flip");
            data[12] ^= 0x01;
        }
    }

    #[test]
    fn trailer_round_trips_through_bytes() {
        let word = compute(CrcKind::Crc16, b"slot payload");
        let bytes = word.to_le_bytes();
        assert_eq!(bytes.len(), 2);
        assert_eq!(CrcWord::from_le_bytes(CrcKind::Crc16, &bytes), word);
    }
}
