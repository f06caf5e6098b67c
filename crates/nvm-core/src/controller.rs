//! The top-level orchestrator: owns the medium, the registered blocks, and
//! the job queue, and drains the queue one job at a time from
//! `main_function`, the way a caller drives it from a periodic task.

use std::collections::HashMap;
use std::time::Instant;

use crate::block::{self, Block, BlockConfig, BlockId, BlockState, BlockType, JobResult, MAX_BLOCKS};
use crate::diagnostics::NvmDiagnostics;
use crate::error::{Error, Result};
use crate::layout;
use crate::medium::SimMedium;
use crate::queue::{self, DEFAULT_MAX_RETRIES, Job, JobKind, JobQueue};

/// A controller instance: one medium, one registry, one queue.
pub struct NvmController {
    medium: SimMedium,
    blocks: HashMap<BlockId, Block>,
    order: Vec<BlockId>,
    queue: JobQueue,
    max_retries: u8,
}

impl NvmController {
    pub fn new(medium: SimMedium) -> Self {
        Self {
            medium,
            blocks: HashMap::new(),
            order: Vec::new(),
            queue: JobQueue::new(),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    pub fn medium(&self) -> &SimMedium {
        &self.medium
    }

    pub fn medium_mut(&mut self) -> &mut SimMedium {
        &mut self.medium
    }

    /// Register a block, validating its layout against the medium's
    /// capacity. Rejects a `block_id` already in use.
    pub fn register_block(&mut self, config: BlockConfig) -> Result<()> {
        if self.blocks.contains_key(&config.block_id) {
            return Err(Error::AlreadyRegistered {
                block_id: config.block_id,
            });
        }
        if self.blocks.len() >= MAX_BLOCKS {
            return Err(Error::QueueFull);
        }
        layout::resolve(&config, self.medium.config().capacity_bytes).map_err(Error::LayoutInvalid)?;

        let block_id = config.block_id;
        tracing::debug!(block_id, kind = config.block_type.kind_name(), "registered block");
        self.order.push(block_id);
        self.blocks.insert(block_id, Block::new(config));
        Ok(())
    }

    fn block(&self, block_id: BlockId) -> Result<&Block> {
        self.blocks
            .get(&block_id)
            .ok_or(Error::NotRegistered { block_id })
    }

    fn block_mut(&mut self, block_id: BlockId) -> Result<&mut Block> {
        self.blocks
            .get_mut(&block_id)
            .ok_or(Error::NotRegistered { block_id })
    }

    /// Copy `data` into the block's RAM mirror and enqueue a write job.
    pub fn write_block(&mut self, block_id: BlockId, data: &[u8]) -> Result<()> {
        let block = self.block_mut(block_id)?;
        if block.config.write_protected {
            return Err(Error::WriteProtected { block_id });
        }
        if data.len() != block.config.block_size as usize {
            return Err(Error::LayoutInvalid(crate::error::LayoutError::PayloadTooLarge));
        }
        block.mirror.copy_from_slice(data);
        block.mirror_lock.write(data);
        block.result = JobResult::Pending;

        let priority = queue::effective_priority(JobKind::WriteBlock, block.config.priority, block.config.immediate);
        self.queue.enqueue(Job::new(
            JobKind::WriteBlock,
            Some(block_id),
            Some(data.to_vec()),
            priority,
        ))
    }

    /// Enqueue a read job; the mirror is updated once the job is dispatched.
    pub fn read_block(&mut self, block_id: BlockId) -> Result<()> {
        let block = self.block_mut(block_id)?;
        block.result = JobResult::Pending;
        let priority = queue::effective_priority(JobKind::ReadBlock, block.config.priority, block.config.immediate);
        self.queue
            .enqueue(Job::new(JobKind::ReadBlock, Some(block_id), None, priority))
    }

    /// Enqueue a read job for every registered block.
    pub fn read_all(&mut self) -> Result<()> {
        for block_id in self.order.clone() {
            if let Some(block) = self.blocks.get_mut(&block_id) {
                block.result = JobResult::Pending;
            }
        }
        self.queue
            .enqueue(Job::new(JobKind::ReadAll, None, None, 0))
    }

    /// Enqueue a write job for every registered block using each block's
    /// current mirror contents.
    pub fn write_all(&mut self) -> Result<()> {
        for block_id in self.order.clone() {
            if let Some(block) = self.blocks.get_mut(&block_id) {
                if !block.config.write_protected {
                    block.result = JobResult::Pending;
                }
            }
        }
        self.queue
            .enqueue(Job::new(JobKind::WriteAll, None, None, 1))
    }

    /// Switch a Dataset block's active version index without touching the
    /// medium; the next read/write uses the new index.
    pub fn set_data_index(&mut self, block_id: BlockId, index: u8) -> Result<()> {
        let block = self.block_mut(block_id)?;
        match &mut block.config.block_type {
            BlockType::Dataset {
                dataset_count,
                active_dataset_index,
            } => {
                if index >= *dataset_count {
                    return Err(Error::InvalidDataIndex { block_id, index });
                }
                *active_dataset_index = index;
                Ok(())
            }
            _ => Err(Error::WrongBlockType { block_id }),
        }
    }

    pub fn get_job_result(&self, block_id: BlockId) -> Result<JobResult> {
        Ok(self.block(block_id)?.result)
    }

    /// Current lifecycle state of a registered block (`Valid`, `Invalid`,
    /// `Recovered`, ...), last set by the most recent dispatch against it.
    pub fn get_block_state(&self, block_id: BlockId) -> Result<BlockState> {
        Ok(self.block(block_id)?.state)
    }

    /// Take a torn-read-free snapshot of a block's RAM mirror, plus the
    /// generation counter it was observed at.
    pub fn snapshot_mirror(&self, block_id: BlockId) -> Result<(Vec<u8>, u32)> {
        Ok(self.block(block_id)?.mirror_lock.read())
    }

    pub fn get_diagnostics(&self) -> NvmDiagnostics {
        let seqlock = self.blocks.values().map(|b| b.mirror_lock.diagnostics()).fold(
            crate::seqlock::SeqlockDiagnostics::default(),
            |acc, d| crate::seqlock::SeqlockDiagnostics {
                reads: acc.reads + d.reads,
                retries: acc.retries + d.retries,
                exhausted: acc.exhausted + d.exhausted,
            },
        );
        NvmDiagnostics {
            queue: self.queue.diagnostics(),
            medium: self.medium.diagnostics(),
            seqlock,
        }
    }

    /// Drain at most one job from the queue and service it against the
    /// medium. Callers drive this from their own periodic task; the
    /// controller does not spawn a background thread of its own.
    pub fn main_function(&mut self) {
        let Some(job) = self.queue.dequeue(Instant::now(), self.max_retries) else {
            return;
        };

        match job.kind {
            JobKind::ReadBlock => self.service_read(job.block_id.expect("read job carries a block_id")),
            JobKind::WriteBlock => {
                let block_id = job.block_id.expect("write job carries a block_id");
                let data = job.data.clone().expect("write job carries a payload");
                self.service_write(block_id, &data);
            }
            JobKind::ReadAll => {
                for block_id in self.order.clone() {
                    self.service_read(block_id);
                }
            }
            JobKind::WriteAll => {
                for block_id in self.order.clone() {
                    if let Some(block) = self.blocks.get(&block_id) {
                        if !block.config.write_protected {
                            let data = block.mirror.clone();
                            self.service_write(block_id, &data);
                        }
                    }
                }
            }
        }
    }

    fn service_read(&mut self, block_id: BlockId) {
        let Some(block) = self.blocks.get(&block_id) else {
            return;
        };
        let crc_kind = block.config.crc_kind;
        let size = block.config.block_size;

        let original_dataset_index = match &block.config.block_type {
            BlockType::Dataset { active_dataset_index, .. } => Some(*active_dataset_index),
            _ => None,
        };

        let outcome = match &block.config.block_type {
            BlockType::Native => {
                block::native_read(&mut self.medium, block.config.primary_offset, size, crc_kind)
                    .map(|data| (data, false, None))
            }
            BlockType::Redundant { backup_offset, .. } => block::redundant_read(
                &mut self.medium,
                block.config.primary_offset,
                *backup_offset,
                size,
                crc_kind,
            )
            .map(|(data, source)| (data, source == block::RedundantSource::Backup, None)),
            BlockType::Dataset {
                dataset_count,
                active_dataset_index,
            } => block::dataset_read(
                &mut self.medium,
                block.config.primary_offset,
                *dataset_count,
                *active_dataset_index,
                size,
                crc_kind,
            )
            .map(|(data, index)| (data, Some(index) != original_dataset_index, Some(index))),
        };

        let block = self.blocks.get_mut(&block_id).expect("checked above");
        match outcome {
            Some((data, recovered, recovered_index)) => {
                block.mirror.copy_from_slice(&data);
                block.mirror_lock.write(&data);
                block.state = if recovered { BlockState::Recovered } else { BlockState::Valid };
                block.result = JobResult::Ok;
                if let (Some(index), BlockType::Dataset { active_dataset_index, .. }) =
                    (recovered_index, &mut block.config.block_type)
                {
                    *active_dataset_index = index;
                }
            }
            None => {
                if let Some(default) = block.config.rom_default.clone() {
                    let copy_len = default.len().min(block.mirror.len());
                    block.mirror[..copy_len].copy_from_slice(&default[..copy_len]);
                    block.mirror_lock.write(&block.mirror.clone());
                    block.state = BlockState::Invalid;
                    block.result = JobResult::Ok;
                    tracing::warn!(block_id, "block unreadable, fell back to ROM default");
                } else {
                    block.state = BlockState::Invalid;
                    block.result = JobResult::NotOk;
                    tracing::error!(block_id, "block unreadable and has no ROM default");
                }
            }
        }
    }

    fn service_write(&mut self, block_id: BlockId, data: &[u8]) {
        let Some(block) = self.blocks.get(&block_id) else {
            return;
        };
        let crc_kind = block.config.crc_kind;

        let outcome: Result<Option<u8>> = match &block.config.block_type {
            BlockType::Native => {
                block::native_write(&mut self.medium, block_id, block.config.primary_offset, data, crc_kind)
                    .map(|_| None)
            }
            BlockType::Redundant {
                backup_offset,
                version_ctrl_offset,
            } => block::redundant_write(
                &mut self.medium,
                block_id,
                block.config.primary_offset,
                *backup_offset,
                *version_ctrl_offset,
                data,
                crc_kind,
            )
            .map(|_| None),
            BlockType::Dataset {
                dataset_count,
                active_dataset_index,
            } => block::dataset_write(
                &mut self.medium,
                block_id,
                block.config.primary_offset,
                *dataset_count,
                *active_dataset_index,
                data,
                crc_kind,
            )
            .map(Some),
        };

        let block = self.blocks.get_mut(&block_id).expect("checked above");
        match outcome {
            Ok(new_index) => {
                if let (Some(index), BlockType::Dataset { active_dataset_index, .. }) =
                    (new_index, &mut block.config.block_type)
                {
                    *active_dataset_index = index;
                }
                block.state = BlockState::Valid;
                block.result = JobResult::Ok;
            }
            Err(err) => {
                tracing::error!(block_id, %err, "block write failed");
                block.state = BlockState::Invalid;
                block.result = JobResult::NotOk;
            }
        }
    }
}
