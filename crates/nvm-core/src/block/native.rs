//! Native block: single copy, no on-medium recovery. A failed read falls
//! back to the block's configured ROM default (if any) in the caller.

use super::{try_read, write_with_crc, BlockId};
use crate::crc::CrcKind;
use crate::error::Result;
use crate::medium::SimMedium;

/// Read the primary copy. Returns `None` if the slot is blank/corrupt; the
/// caller is responsible for falling back to `rom_default`.
pub fn read(medium: &mut SimMedium, offset: u32, size: u32, crc_kind: CrcKind) -> Option<Vec<u8>> {
    try_read(medium, offset, size, crc_kind)
}

/// Overwrite the primary copy unconditionally.
pub fn write(
    medium: &mut SimMedium,
    block_id: BlockId,
    offset: u32,
    data: &[u8],
    crc_kind: CrcKind,
) -> Result<()> {
    write_with_crc(medium, block_id, offset, data, crc_kind)
}
