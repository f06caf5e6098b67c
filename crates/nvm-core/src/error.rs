use std::fmt;

use crate::block::BlockId;

/// Errors produced while registering blocks, submitting jobs, or servicing
/// them from the periodic dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A block config violates one of the layout invariants (alignment,
    /// overlap, oversized payload, ...).
    LayoutInvalid(LayoutError),
    /// The submission named a `block_id` that was never registered.
    NotRegistered { block_id: BlockId },
    /// A `block_id` was registered twice.
    AlreadyRegistered { block_id: BlockId },
    /// The job queue is at capacity (32 by default).
    QueueFull,
    /// A write was submitted against a `write_protected` block.
    WriteProtected { block_id: BlockId },
    /// A medium operation did not satisfy page/block alignment, or targeted
    /// bytes that were not in the erased state. The block manager always
    /// erases before writing, so this should never escape the core.
    MediumAlignmentViolation,
    /// The per-block erase counter would exceed the medium's configured
    /// endurance.
    EnduranceExhausted { block_id: BlockId },
    /// CRC mismatch on the authoritative copy. Reserved for future direct
    /// reporting; the dispatcher currently resolves this internally via the
    /// recovery cascade and surfaces `Ok`/`NotOk` instead (see DESIGN.md).
    IntegrityFailed { block_id: BlockId },
    /// The job did not complete within its timeout window and exhausted its
    /// retry budget.
    Timeout { block_id: BlockId },
    /// `set_data_index` was called with an index outside `0..dataset_count`.
    InvalidDataIndex { block_id: BlockId, index: u8 },
    /// An operation that only applies to one block type (e.g.
    /// `set_data_index` on a non-Dataset block) was used against a block of
    /// a different type.
    WrongBlockType { block_id: BlockId },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LayoutInvalid(err) => write!(f, "invalid block layout: {err}"),
            Self::NotRegistered { block_id } => write!(f, "block {block_id} is not registered"),
            Self::AlreadyRegistered { block_id } => {
                write!(f, "block {block_id} is already registered")
            }
            Self::QueueFull => write!(f, "job queue is full"),
            Self::WriteProtected { block_id } => {
                write!(f, "block {block_id} is write-protected")
            }
            Self::MediumAlignmentViolation => {
                write!(f, "medium operation violated page/block alignment")
            }
            Self::EnduranceExhausted { block_id } => {
                write!(f, "block {block_id} exhausted its erase endurance")
            }
            Self::IntegrityFailed { block_id } => {
                write!(f, "block {block_id} failed its CRC check")
            }
            Self::Timeout { block_id } => write!(f, "job for block {block_id} timed out"),
            Self::InvalidDataIndex { block_id, index } => {
                write!(f, "block {block_id} has no dataset slot {index}")
            }
            Self::WrongBlockType { block_id } => {
                write!(f, "block {block_id} does not support this operation")
            }
        }
    }
}

impl std::error::Error for Error {}

/// Reasons a block's layout can be rejected at registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    /// `primary_offset` is not a multiple of the 1024-byte slot size.
    PrimaryNotSlotAligned,
    /// `backup_offset` is not a multiple of the 1024-byte slot size.
    BackupNotSlotAligned,
    /// `data_size + crc_size`, padded up to a page boundary, does not fit
    /// within one slot.
    PayloadTooLarge,
    /// `block_size` is zero.
    EmptyBlock,
    /// A Redundant block's backup slot overlaps its primary slot.
    BackupOverlapsPrimary,
    /// A Redundant block's `version_ctrl_offset` is not a multiple of the
    /// 1024-byte slot size.
    VersionCtrlNotSlotAligned,
    /// A Redundant block's `version_ctrl_offset` overlaps its primary or
    /// backup slot.
    VersionCtrlOverlapsSlot,
    /// A Dataset block's `dataset_count` is outside `2..=4`.
    DatasetCountOutOfRange { got: u8 },
    /// A Dataset block's reserved footprint does not fit the medium.
    DatasetFootprintExceedsRegion,
    /// The layout does not fit within the configured medium capacity.
    ExceedsMediumCapacity,
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PrimaryNotSlotAligned => write!(f, "primary_offset is not slot-aligned"),
            Self::BackupNotSlotAligned => write!(f, "backup_offset is not slot-aligned"),
            Self::PayloadTooLarge => write!(f, "data_size + crc_size exceeds one slot"),
            Self::EmptyBlock => write!(f, "block_size must be nonzero"),
            Self::BackupOverlapsPrimary => write!(f, "backup_offset overlaps the primary slot"),
            Self::VersionCtrlNotSlotAligned => {
                write!(f, "version_ctrl_offset is not slot-aligned")
            }
            Self::VersionCtrlOverlapsSlot => {
                write!(f, "version_ctrl_offset overlaps the primary or backup slot")
            }
            Self::DatasetCountOutOfRange { got } => {
                write!(f, "dataset_count {got} is outside the supported 2..=4 range")
            }
            Self::DatasetFootprintExceedsRegion => {
                write!(f, "dataset_count * 1024 exceeds the reserved region")
            }
            Self::ExceedsMediumCapacity => {
                write!(f, "layout does not fit within the medium's capacity")
            }
        }
    }
}

impl std::error::Error for LayoutError {}

pub type Result<T> = std::result::Result<T, Error>;
