//! A shareable handle around a [`NvmController`], the way `RuntimeHandle`
//! wraps the emulator's runtime: an `Arc`-backed inner struct behind a
//! lock, cloneable, safe to hand to multiple threads.

use std::sync::Arc;

use parking_lot::Mutex;

use nvm_core::block::{BlockConfig, BlockId, JobResult};
use nvm_core::controller::NvmController;
use nvm_core::diagnostics::NvmDiagnostics;
use nvm_core::medium::SimMedium;

use crate::config::{RuntimeConfig, RuntimeError};
use crate::pubsub::{EventTopic, NotificationEvent, PubSub};

struct RuntimeInner {
    controller: Mutex<NvmController>,
    pubsub: Mutex<PubSub>,
    tracked_blocks: Mutex<Vec<BlockId>>,
}

/// Owns the controller and pubsub state; `handle()` hands out clones of the
/// shared [`NvmHandle`].
pub struct NvmRuntime {
    inner: Arc<RuntimeInner>,
    poll_interval: std::time::Duration,
}

/// Cheap to clone; every clone shares the same controller and subscriber
/// table.
#[derive(Clone)]
pub struct NvmHandle {
    inner: Arc<RuntimeInner>,
}

impl NvmRuntime {
    pub fn start(config: RuntimeConfig) -> Self {
        let controller = NvmController::new(SimMedium::new(config.medium));
        Self {
            inner: Arc::new(RuntimeInner {
                controller: Mutex::new(controller),
                pubsub: Mutex::new(PubSub::new()),
                tracked_blocks: Mutex::new(Vec::new()),
            }),
            poll_interval: config.poll_interval,
        }
    }

    pub fn handle(&self) -> NvmHandle {
        NvmHandle {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Start the optional background thread that calls `poll_once` on the
    /// configured interval. Dropping the returned [`crate::driver::NvmDriver`]
    /// stops it.
    pub fn spawn_driver(&self) -> crate::driver::NvmDriver {
        crate::driver::NvmDriver::spawn(self.handle(), self.poll_interval)
    }
}

impl NvmHandle {
    pub fn register_block(&self, config: BlockConfig) -> Result<(), RuntimeError> {
        let block_id = config.block_id;
        self.inner.controller.lock().register_block(config)?;
        self.inner.tracked_blocks.lock().push(block_id);
        Ok(())
    }

    pub fn write_block(&self, block_id: BlockId, data: &[u8]) -> Result<(), RuntimeError> {
        self.inner
            .controller
            .lock()
            .write_block(block_id, data)
            .map_err(Into::into)
    }

    pub fn read_block(&self, block_id: BlockId) -> Result<(), RuntimeError> {
        self.inner
            .controller
            .lock()
            .read_block(block_id)
            .map_err(Into::into)
    }

    pub fn read_all(&self) -> Result<(), RuntimeError> {
        self.inner.controller.lock().read_all().map_err(Into::into)
    }

    pub fn write_all(&self) -> Result<(), RuntimeError> {
        self.inner.controller.lock().write_all().map_err(Into::into)
    }

    pub fn set_data_index(&self, block_id: BlockId, index: u8) -> Result<(), RuntimeError> {
        self.inner
            .controller
            .lock()
            .set_data_index(block_id, index)
            .map_err(Into::into)
    }

    pub fn get_job_result(&self, block_id: BlockId) -> Result<JobResult, RuntimeError> {
        self.inner
            .controller
            .lock()
            .get_job_result(block_id)
            .map_err(Into::into)
    }

    pub fn get_block_state(&self, block_id: BlockId) -> Result<nvm_core::block::BlockState, RuntimeError> {
        self.inner
            .controller
            .lock()
            .get_block_state(block_id)
            .map_err(Into::into)
    }

    pub fn get_diagnostics(&self) -> NvmDiagnostics {
        self.inner.controller.lock().get_diagnostics()
    }

    /// Torn-read-free snapshot of a block's RAM mirror, plus the generation
    /// counter it was observed at. Safe to call from any thread holding this
    /// handle, independent of whatever job is currently being dispatched.
    pub fn snapshot_mirror(&self, block_id: BlockId) -> Result<(Vec<u8>, u32), RuntimeError> {
        self.inner
            .controller
            .lock()
            .snapshot_mirror(block_id)
            .map_err(Into::into)
    }

    pub fn subscribe(&self, topic: EventTopic) -> crossbeam_channel::Receiver<NotificationEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.inner.pubsub.lock().subscribe(topic, tx);
        rx
    }

    /// Drain at most one job and broadcast its outcome to any subscriber
    /// watching the block it touched. Callers drive this from whatever
    /// scheduling mechanism they already have; it is never called
    /// automatically.
    pub fn poll_once(&self) {
        self.inner.controller.lock().main_function();

        let tracked = self.inner.tracked_blocks.lock().clone();
        let controller = self.inner.controller.lock();
        let mut pubsub = self.inner.pubsub.lock();
        for block_id in tracked {
            if let Ok(result) = controller.get_job_result(block_id) {
                if matches!(result, JobResult::Ok | JobResult::NotOk) {
                    pubsub.broadcast(NotificationEvent { block_id, result });
                }
            }
        }
    }
}
