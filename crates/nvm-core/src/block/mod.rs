//! Block configuration, registration state, and the per-type read/write
//! algorithms (Native / Redundant / Dataset) that sit on top of the shared
//! `try_read` / `write_with_crc` helpers below.

mod dataset;
mod native;
mod redundant;

use crate::crc::{self, CrcKind};
use crate::error::{Error, LayoutError};
use crate::layout;
use crate::medium::{PAGE_SIZE, SimMedium};
use crate::seqlock::VersionedSeqlockMirror;

pub use dataset::read as dataset_read;
pub use dataset::write as dataset_write;
pub use native::read as native_read;
pub use native::write as native_write;
pub use redundant::RedundantSource;
pub use redundant::read as redundant_read;
pub use redundant::write as redundant_write;

/// Unique, dense block identifier.
pub type BlockId = u8;

/// Upper bound on simultaneously registered blocks.
pub const MAX_BLOCKS: usize = 16;

/// Which redundancy strategy a block uses, and the fields specific to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockType {
    /// Single copy, no recovery beyond the ROM default.
    Native,
    /// Primary + backup copy, written primary-first.
    Redundant {
        backup_offset: u32,
        version_ctrl_offset: Option<u32>,
    },
    /// `dataset_count` round-robin version slots.
    Dataset {
        dataset_count: u8,
        active_dataset_index: u8,
    },
}

impl BlockType {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Native => "native",
            Self::Redundant { .. } => "redundant",
            Self::Dataset { .. } => "dataset",
        }
    }
}

/// Observable lifecycle state of a registered block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
    Uninitialized,
    Valid,
    Invalid,
    Recovering,
    Recovered,
}

/// Outcome recorded in a block's result slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobResult {
    Ok,
    NotOk,
    Pending,
    /// Reserved: declared in the taxonomy but never synthesized by the
    /// dispatcher today (see DESIGN.md).
    IntegrityFailed,
}

/// Static configuration supplied at registration time.
#[derive(Debug, Clone)]
pub struct BlockConfig {
    pub block_id: BlockId,
    pub block_size: u32,
    pub block_type: BlockType,
    pub crc_kind: CrcKind,
    pub priority: u8,
    pub immediate: bool,
    pub write_protected: bool,
    pub primary_offset: u32,
    pub rom_default: Option<Vec<u8>>,
}

/// A registered block: its static config plus mutable runtime state,
/// including the RAM mirror the block manager reads from / writes into.
///
/// `mirror_lock` is a secondary, seqlock-guarded snapshot of `mirror` kept
/// in sync on every submission/dispatch update, so a concurrent reader can
/// snapshot a block's current bytes without taking the controller's lock
/// (see `nvm-runtime`'s handle, which serializes controller access anyway,
/// but other embedders may not).
pub struct Block {
    pub config: BlockConfig,
    pub state: BlockState,
    pub erase_count: u32,
    pub mirror: Vec<u8>,
    pub mirror_lock: VersionedSeqlockMirror,
    pub result: JobResult,
}

impl Block {
    pub(crate) fn new(config: BlockConfig) -> Self {
        let size = config.block_size as usize;
        let mirror = vec![0u8; size];
        let mirror_lock = VersionedSeqlockMirror::new(size);
        mirror_lock.write(&mirror);
        Self {
            config,
            state: BlockState::Uninitialized,
            erase_count: 0,
            mirror,
            mirror_lock,
            result: JobResult::NotOk,
        }
    }

    pub fn block_id(&self) -> BlockId {
        self.config.block_id
    }
}

/// Validate a block's layout against the medium's capacity.
pub fn validate(config: &BlockConfig, capacity_bytes: u32) -> Result<(), LayoutError> {
    layout::resolve(config, capacity_bytes).map(|_| ())
}

/// Read the data span at `offset` and, if `crc_kind != None`, verify its CRC
/// trailer. Returns the data on success. Never mutates block state.
pub(crate) fn try_read(
    medium: &mut SimMedium,
    offset: u32,
    size: u32,
    crc_kind: CrcKind,
) -> Option<Vec<u8>> {
    let data = medium.read(offset, size as usize).ok()?;
    if crc_kind == CrcKind::None {
        return Some(data);
    }
    let crc_size = crc_kind.size();
    let trailer = medium.read(offset + size, crc_size).ok()?;
    let stored = crc::CrcWord::from_le_bytes(crc_kind, &trailer);
    let computed = crc::compute(crc_kind, &data);
    if stored == computed { Some(data) } else { None }
}

/// Erase the slot at `offset` and write `data` followed by its CRC trailer
/// in a single program operation, padded out to the next page boundary
/// (skipped entirely when `crc_kind == None`). Writing data and trailer
/// together, rather than as two separate page writes, is what lets a
/// block's data size be anything that fits the slot rather than forcing it
/// to a page multiple.
pub(crate) fn write_with_crc(
    medium: &mut SimMedium,
    block_id: BlockId,
    offset: u32,
    data: &[u8],
    crc_kind: CrcKind,
) -> Result<(), Error> {
    if medium.would_exceed_endurance(offset) {
        return Err(Error::EnduranceExhausted { block_id });
    }

    let mut payload = data.to_vec();
    if crc_kind != CrcKind::None {
        payload.extend(crc::compute(crc_kind, data).to_le_bytes());
    }
    let padded_len = payload.len().div_ceil(PAGE_SIZE as usize) * PAGE_SIZE as usize;
    payload.resize(padded_len, 0xFF);

    medium.erase(offset)?;
    medium.write(offset, &payload)?;

    Ok(())
}
