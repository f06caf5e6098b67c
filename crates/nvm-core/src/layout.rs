//! Translates a block's configuration into concrete byte offsets on the
//! medium, and rejects configurations the medium contract cannot honor.

use crate::block::{BlockConfig, BlockType};
use crate::error::LayoutError;
use crate::medium::{ERASE_BLOCK_SIZE, PAGE_SIZE};

/// One block's resolved placement within a single slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub data_offset: u32,
    pub data_size: u32,
    pub crc_offset: u32,
    pub crc_size: u32,
    pub slot_size: u32,
    pub reserved_size: u32,
}

/// Maximum dataset_count, and the byte region its slots are guaranteed to
/// fit within.
const MAX_DATASET_COUNT: u8 = 4;
const DATASET_REGION_BYTES: u32 = 4096;

/// Validate and resolve the layout of a single slot at `offset`. Data and
/// CRC trailer are written together as one program operation padded to the
/// next page boundary, so `block_size` itself is never required to be a
/// page multiple — only the padded total has to fit inside the slot.
fn resolve_slot(offset: u32, block_size: u32, crc_size: u32) -> Result<Layout, LayoutError> {
    if block_size == 0 {
        return Err(LayoutError::EmptyBlock);
    }
    if offset % ERASE_BLOCK_SIZE != 0 {
        return Err(LayoutError::PrimaryNotSlotAligned);
    }
    let live_size = block_size + crc_size;
    let padded_size = live_size.div_ceil(PAGE_SIZE) * PAGE_SIZE;
    if padded_size > ERASE_BLOCK_SIZE {
        return Err(LayoutError::PayloadTooLarge);
    }
    Ok(Layout {
        data_offset: offset,
        data_size: block_size,
        crc_offset: offset + block_size,
        crc_size,
        slot_size: ERASE_BLOCK_SIZE,
        reserved_size: ERASE_BLOCK_SIZE - padded_size,
    })
}

fn slots_overlap(a: u32, b: u32) -> bool {
    let (a_end, b_end) = (a + ERASE_BLOCK_SIZE, b + ERASE_BLOCK_SIZE);
    a < b_end && b < a_end
}

/// Resolve and validate the primary-slot layout for `config`. Callers that
/// need a Redundant block's backup slot use [`resolve_backup`]; Dataset
/// blocks use [`resolve_dataset_slot`] for each version index.
pub fn resolve(config: &BlockConfig, capacity_bytes: u32) -> Result<Layout, LayoutError> {
    let crc_size = config.crc_kind.size() as u32;
    let layout = resolve_slot(config.primary_offset, config.block_size, crc_size)?;

    if config.primary_offset as u64 + layout.slot_size as u64 > capacity_bytes as u64 {
        return Err(LayoutError::ExceedsMediumCapacity);
    }

    match &config.block_type {
        BlockType::Native => {}
        BlockType::Redundant {
            backup_offset,
            version_ctrl_offset,
        } => {
            let backup = resolve_slot(*backup_offset, config.block_size, crc_size)?;
            if *backup_offset % ERASE_BLOCK_SIZE != 0 {
                return Err(LayoutError::BackupNotSlotAligned);
            }
            if slots_overlap(config.primary_offset, *backup_offset) {
                return Err(LayoutError::BackupOverlapsPrimary);
            }
            if *backup_offset as u64 + backup.slot_size as u64 > capacity_bytes as u64 {
                return Err(LayoutError::ExceedsMediumCapacity);
            }

            if let Some(offset) = version_ctrl_offset {
                if offset % ERASE_BLOCK_SIZE != 0 {
                    return Err(LayoutError::VersionCtrlNotSlotAligned);
                }
                if slots_overlap(config.primary_offset, *offset) || slots_overlap(*backup_offset, *offset) {
                    return Err(LayoutError::VersionCtrlOverlapsSlot);
                }
                if *offset as u64 + ERASE_BLOCK_SIZE as u64 > capacity_bytes as u64 {
                    return Err(LayoutError::ExceedsMediumCapacity);
                }
            }
        }
        BlockType::Dataset { dataset_count, .. } => {
            if !(2..=MAX_DATASET_COUNT).contains(dataset_count) {
                return Err(LayoutError::DatasetCountOutOfRange {
                    got: *dataset_count,
                });
            }
            let footprint = *dataset_count as u32 * ERASE_BLOCK_SIZE;
            if footprint > DATASET_REGION_BYTES {
                return Err(LayoutError::DatasetFootprintExceedsRegion);
            }
            if config.primary_offset as u64 + footprint as u64 > capacity_bytes as u64 {
                return Err(LayoutError::ExceedsMediumCapacity);
            }
        }
    }

    Ok(layout)
}

/// Resolve the layout of a Redundant block's backup slot.
pub fn resolve_backup(config: &BlockConfig, backup_offset: u32) -> Result<Layout, LayoutError> {
    resolve_slot(backup_offset, config.block_size, config.crc_kind.size() as u32)
}

/// Resolve the layout of the `index`-th version slot of a Dataset block.
/// `index` is `(primary_offset / slot_size) + index`, i.e. consecutive
/// slots starting at `primary_offset`.
pub fn resolve_dataset_slot(config: &BlockConfig, index: u8) -> Result<Layout, LayoutError> {
    let offset = config.primary_offset + index as u32 * ERASE_BLOCK_SIZE;
    resolve_slot(offset, config.block_size, config.crc_kind.size() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crc::CrcKind;

    fn native_config(block_size: u32, primary_offset: u32, crc_kind: CrcKind) -> BlockConfig {
        BlockConfig {
            block_id: 1,
            block_size,
            block_type: BlockType::Native,
            crc_kind,
            priority: 10,
            immediate: false,
            write_protected: false,
            primary_offset,
            rom_default: None,
        }
    }

    #[test]
    fn rejects_non_slot_aligned_primary() {
        let cfg = native_config(256, 100, CrcKind::Crc16);
        assert_eq!(
            resolve(&cfg, 4096),
            Err(LayoutError::PrimaryNotSlotAligned)
        );
    }

    #[test]
    fn rejects_zero_size_block() {
        let cfg = native_config(0, 0, CrcKind::None);
        assert_eq!(resolve(&cfg, 4096), Err(LayoutError::EmptyBlock));
    }

    #[test]
    fn largest_legal_native_block_is_accepted() {
        let crc_size = CrcKind::Crc16.size() as u32;
        let cfg = native_config(1024 - crc_size, 0, CrcKind::Crc16);
        let layout = resolve(&cfg, 4096).unwrap();
        assert_eq!(layout.reserved_size, 0);
    }

    #[test]
    fn arbitrary_block_size_is_accepted_once_padded_to_a_page() {
        // block_size=64 + crc16(2) = 66 live bytes, padded up to one page
        // (256); well within the 1024-byte slot.
        let cfg = native_config(64, 0, CrcKind::Crc16);
        let layout = resolve(&cfg, 4096).unwrap();
        assert_eq!(layout.reserved_size, 1024 - 256);
    }

    #[test]
    fn payload_that_overflows_the_slot_even_with_padding_is_rejected() {
        // block_size=1023 + crc16(2) pads up to 2048, which does not fit a
        // single 1024-byte slot.
        let cfg = native_config(1023, 0, CrcKind::Crc16);
        assert_eq!(resolve(&cfg, 4096), Err(LayoutError::PayloadTooLarge));
    }

    #[test]
    fn redundant_backup_cannot_overlap_primary() {
        let mut cfg = native_config(256, 0, CrcKind::Crc16);
        cfg.block_type = BlockType::Redundant {
            backup_offset: 0,
            version_ctrl_offset: None,
        };
        assert_eq!(resolve(&cfg, 4096), Err(LayoutError::BackupOverlapsPrimary));
    }

    #[test]
    fn version_ctrl_offset_must_be_slot_aligned() {
        let mut cfg = native_config(256, 0, CrcKind::Crc16);
        cfg.block_type = BlockType::Redundant {
            backup_offset: 1024,
            version_ctrl_offset: Some(100),
        };
        assert_eq!(resolve(&cfg, 4096), Err(LayoutError::VersionCtrlNotSlotAligned));
    }

    #[test]
    fn version_ctrl_offset_cannot_overlap_primary_or_backup() {
        let mut cfg = native_config(256, 0, CrcKind::Crc16);
        cfg.block_type = BlockType::Redundant {
            backup_offset: 1024,
            version_ctrl_offset: Some(1024),
        };
        assert_eq!(resolve(&cfg, 4096), Err(LayoutError::VersionCtrlOverlapsSlot));
    }

    #[test]
    fn version_ctrl_offset_in_its_own_slot_is_accepted() {
        let mut cfg = native_config(256, 0, CrcKind::Crc16);
        cfg.block_type = BlockType::Redundant {
            backup_offset: 1024,
            version_ctrl_offset: Some(2048),
        };
        assert!(resolve(&cfg, 4096).is_ok());
    }

    #[test]
    fn dataset_count_bounds_are_enforced() {
        for count in [1u8, 5u8] {
            let mut cfg = native_config(256, 0, CrcKind::Crc16);
            cfg.block_type = BlockType::Dataset {
                dataset_count: count,
                active_dataset_index: 0,
            };
            assert_eq!(
                resolve(&cfg, 8192),
                Err(LayoutError::DatasetCountOutOfRange { got: count })
            );
        }
    }
}
