//! Optional convenience thread that calls [`NvmHandle::poll_once`] on a
//! fixed interval. Nothing in this crate starts one implicitly: a caller
//! that already has its own scheduling loop should just call `poll_once`
//! from it directly instead.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Sender, bounded};

use crate::handle::NvmHandle;

enum DriverMessage {
    Stop,
}

/// Owns a background thread that polls `handle` every `interval` until
/// dropped.
pub struct NvmDriver {
    stop_tx: Sender<DriverMessage>,
    join: Option<JoinHandle<()>>,
}

impl NvmDriver {
    pub fn spawn(handle: NvmHandle, interval: Duration) -> Self {
        let (stop_tx, stop_rx) = bounded::<DriverMessage>(1);
        let join = thread::spawn(move || {
            loop {
                match stop_rx.recv_timeout(interval) {
                    Ok(DriverMessage::Stop) => break,
                    Err(crossbeam_channel::RecvTimeoutError::Timeout) => handle.poll_once(),
                    Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
                }
            }
        });
        Self {
            stop_tx,
            join: Some(join),
        }
    }
}

impl Drop for NvmDriver {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(DriverMessage::Stop);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeConfig;
    use crate::handle::NvmRuntime;
    use nvm_core::block::{BlockConfig, BlockType};
    use nvm_core::crc::CrcKind;

    #[test]
    fn driver_services_jobs_without_manual_polling() {
        let runtime = NvmRuntime::start(RuntimeConfig::default());
        let handle = runtime.handle();
        handle
            .register_block(BlockConfig {
                block_id: 1,
                block_size: 16,
                block_type: BlockType::Native,
                crc_kind: CrcKind::Crc8,
                priority: 5,
                immediate: false,
                write_protected: false,
                primary_offset: 0,
                rom_default: None,
            })
            .unwrap();

        let driver = NvmDriver::spawn(handle.clone(), Duration::from_millis(2));
        handle.write_block(1, &[1u8; 16]).unwrap();

        let deadline = std::time::Instant::now() + Duration::from_secs(1);
        loop {
            if handle.get_job_result(1).unwrap() == nvm_core::block::JobResult::Ok {
                break;
            }
            assert!(std::time::Instant::now() < deadline, "driver never serviced the job");
            thread::sleep(Duration::from_millis(5));
        }
        drop(driver);
    }
}
