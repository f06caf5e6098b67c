//! Dataset block: `dataset_count` round-robin version slots. Writes always
//! advance to the next slot before writing, so the previous generation
//! survives a power loss mid-write; reads walk backwards from the active
//! index looking for the newest valid generation.

use super::{try_read, write_with_crc, BlockId};
use crate::crc::CrcKind;
use crate::error::Result;
use crate::medium::{ERASE_BLOCK_SIZE, SimMedium};

fn slot_offset(base_offset: u32, index: u8) -> u32 {
    base_offset + index as u32 * ERASE_BLOCK_SIZE
}

/// Read starting at `active_index`, walking backwards through the ring for
/// up to `dataset_count` slots until a CRC-valid generation is found.
/// Returns the data and the index it was recovered from.
pub fn read(
    medium: &mut SimMedium,
    base_offset: u32,
    dataset_count: u8,
    active_index: u8,
    size: u32,
    crc_kind: CrcKind,
) -> Option<(Vec<u8>, u8)> {
    for step in 0..dataset_count {
        let index = (active_index + dataset_count - step) % dataset_count;
        let offset = slot_offset(base_offset, index);
        if let Some(data) = try_read(medium, offset, size, crc_kind) {
            return Some((data, index));
        }
    }
    None
}

/// Write the next slot in the ring (`active_index + 1 mod dataset_count`)
/// and return the index it was written to. The caller updates its stored
/// active index on success.
pub fn write(
    medium: &mut SimMedium,
    block_id: BlockId,
    base_offset: u32,
    dataset_count: u8,
    active_index: u8,
    data: &[u8],
    crc_kind: CrcKind,
) -> Result<u8> {
    let next_index = (active_index + 1) % dataset_count;
    let offset = slot_offset(base_offset, next_index);
    write_with_crc(medium, block_id, offset, data, crc_kind)?;
    Ok(next_index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::medium::MediumConfig;

    #[test]
    fn write_advances_the_ring_and_read_finds_latest() {
        let mut medium = SimMedium::new(MediumConfig::default());
        let mut active = 0u8;

        active = write(&mut medium, 1, 0, 3, active, &[1u8; 16], CrcKind::Crc16).unwrap();
        assert_eq!(active, 1);
        active = write(&mut medium, 1, 0, 3, active, &[2u8; 16], CrcKind::Crc16).unwrap();
        assert_eq!(active, 2);

        let (data, index) = read(&mut medium, 0, 3, active, 16, CrcKind::Crc16).unwrap();
        assert_eq!(data, vec![2u8; 16]);
        assert_eq!(index, 2);
    }

    #[test]
    fn read_falls_back_to_older_generation_when_latest_is_blank() {
        let mut medium = SimMedium::new(MediumConfig::default());
        write(&mut medium, 1, 0, 3, 0, &[5u8; 16], CrcKind::Crc16).unwrap();
        // active_index now claims slot 2, but slot 2 was never written.
        let (data, index) = read(&mut medium, 0, 3, 2, 16, CrcKind::Crc16).unwrap();
        assert_eq!(data, vec![5u8; 16]);
        assert_eq!(index, 1);
    }
}
