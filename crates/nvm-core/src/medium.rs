//! The erase-before-write byte-addressable medium abstraction.
//!
//! Mirrors real flash/EEPROM: reads are fast and unaligned, writes are
//! page-granular and only succeed against already-erased bytes, and erase is
//! block-granular and endurance-limited. Exposing this asymmetry in the
//! contract (rather than presenting a flat byte array) is deliberate: it
//! stops clients from pretending the medium is RAM.

use crate::error::Error;
use crate::hooks::HookStack;

/// Program granularity: writes must start on a page boundary and cover a
/// whole number of pages.
pub const PAGE_SIZE: u32 = 256;
/// Erase granularity, and incidentally the size of one block "slot".
pub const ERASE_BLOCK_SIZE: u32 = 1024;

const ERASED_BYTE: u8 = 0xFF;

/// Static geometry and timing parameters for a [`SimMedium`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediumConfig {
    pub capacity_bytes: u32,
    pub page_size: u32,
    pub block_size: u32,
    pub read_delay_per_byte_us: u32,
    pub write_delay_per_page_ms: u32,
    pub erase_delay_per_block_ms: u32,
    pub endurance_cycles: u32,
}

impl Default for MediumConfig {
    fn default() -> Self {
        Self {
            capacity_bytes: 4096,
            page_size: PAGE_SIZE,
            block_size: ERASE_BLOCK_SIZE,
            read_delay_per_byte_us: 50,
            write_delay_per_page_ms: 2,
            erase_delay_per_block_ms: 3,
            endurance_cycles: 100_000,
        }
    }
}

/// Running totals exposed for field diagnosis and testing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MediumDiagnostics {
    pub reads: u64,
    pub bytes_read: u64,
    pub writes: u64,
    pub bytes_written: u64,
    pub erases: u64,
    pub max_erase_count: u32,
}

/// A simulated byte-addressable non-volatile medium.
///
/// Backed by an in-memory buffer that starts fully erased (all `0xFF`), with
/// per-erase-block cycle counters enforcing the configured endurance.
pub struct SimMedium {
    config: MediumConfig,
    storage: Vec<u8>,
    erase_counts: Vec<u32>,
    diagnostics: MediumDiagnostics,
    hooks: HookStack,
}

impl SimMedium {
    pub fn new(config: MediumConfig) -> Self {
        let block_count = config.capacity_bytes.div_ceil(ERASE_BLOCK_SIZE) as usize;
        Self {
            config,
            storage: vec![ERASED_BYTE; config.capacity_bytes as usize],
            erase_counts: vec![0; block_count],
            diagnostics: MediumDiagnostics::default(),
            hooks: HookStack::new(),
        }
    }

    pub fn config(&self) -> MediumConfig {
        self.config
    }

    pub fn diagnostics(&self) -> MediumDiagnostics {
        self.diagnostics
    }

    /// Mutable access to the fault-injection hook stack.
    pub fn hooks_mut(&mut self) -> &mut HookStack {
        &mut self.hooks
    }

    fn erase_block_index(address: u32) -> usize {
        (address / ERASE_BLOCK_SIZE) as usize
    }

    /// Reads `length` bytes starting at `address`. No alignment requirement.
    pub fn read(&mut self, address: u32, length: usize) -> Result<Vec<u8>, Error> {
        let end = address as u64 + length as u64;
        if end > self.config.capacity_bytes as u64 {
            return Err(Error::MediumAlignmentViolation);
        }

        self.hooks.before_read(address, length);
        let mut bytes = self.storage[address as usize..address as usize + length].to_vec();
        self.hooks.after_read(address, &mut bytes);

        self.diagnostics.reads += 1;
        self.diagnostics.bytes_read += length as u64;
        tracing::trace!(address, length, "medium read");
        Ok(bytes)
    }

    /// Writes `bytes` at `address`. `address` must be page-aligned and
    /// `bytes.len()` a multiple of the page size; every targeted byte must
    /// currently be erased (`0xFF`). Does not erase implicitly.
    pub fn write(&mut self, address: u32, bytes: &[u8]) -> Result<(), Error> {
        if address % self.config.page_size != 0 || bytes.len() as u32 % self.config.page_size != 0
        {
            return Err(Error::MediumAlignmentViolation);
        }
        let end = address as u64 + bytes.len() as u64;
        if end > self.config.capacity_bytes as u64 {
            return Err(Error::MediumAlignmentViolation);
        }
        let start = address as usize;
        let region = &self.storage[start..start + bytes.len()];
        if region.iter().any(|&b| b != ERASED_BYTE) {
            return Err(Error::MediumAlignmentViolation);
        }

        if !self.hooks.before_write(address, bytes) {
            return Err(Error::MediumAlignmentViolation);
        }

        self.storage[start..start + bytes.len()].copy_from_slice(bytes);
        self.diagnostics.writes += 1;
        self.diagnostics.bytes_written += bytes.len() as u64;
        tracing::trace!(address, len = bytes.len(), "medium write");

        if !self.hooks.after_write(address, bytes) {
            // The bytes are already committed above; the hook only affects
            // whether the caller is told the write succeeded.
            return Err(Error::MediumAlignmentViolation);
        }
        Ok(())
    }

    /// Erases the block containing `address`, which must be block-aligned.
    /// Sets every byte in the block back to `0xFF`.
    pub fn erase(&mut self, address: u32) -> Result<(), Error> {
        if address % ERASE_BLOCK_SIZE != 0 {
            return Err(Error::MediumAlignmentViolation);
        }
        if address as u64 + ERASE_BLOCK_SIZE as u64 > self.config.capacity_bytes as u64 {
            return Err(Error::MediumAlignmentViolation);
        }

        let block = Self::erase_block_index(address);
        let next_count = self.erase_counts[block] + 1;
        if next_count > self.config.endurance_cycles {
            tracing::error!(address, "erase endurance exhausted");
            return Err(Error::MediumAlignmentViolation);
        }
        self.erase_counts[block] = next_count;

        let start = address as usize;
        let len = ERASE_BLOCK_SIZE as usize;
        self.storage[start..start + len].fill(ERASED_BYTE);

        self.diagnostics.erases += 1;
        self.diagnostics.max_erase_count = self.diagnostics.max_erase_count.max(next_count);
        tracing::debug!(address, erase_count = next_count, "medium erase");
        Ok(())
    }

    /// Erase count so far for the block containing `address`.
    pub fn erase_count(&self, address: u32) -> u32 {
        self.erase_counts[Self::erase_block_index(address)]
    }

    /// Whether one more erase of the block containing `address` would exceed
    /// the configured endurance. Callers that can attribute the operation to
    /// a specific `block_id` should check this before calling [`Self::erase`]
    /// so they can raise a richer, block-scoped error instead of the
    /// medium's generic alignment-violation signal.
    pub fn would_exceed_endurance(&self, address: u32) -> bool {
        self.erase_counts[Self::erase_block_index(address)] >= self.config.endurance_cycles
    }
}
