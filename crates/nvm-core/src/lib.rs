//! Core, dependency-light non-volatile memory manager: a simulated
//! erase-before-write medium, CRC-guarded block layouts, a priority job
//! queue, and seqlock-guarded RAM mirrors for lock-free reads.
//!
//! This crate has no opinion on how it's driven: [`controller::NvmController`]
//! exposes `main_function` for a caller to poll from whatever scheduling
//! mechanism it already has (a timer, an RTOS task, a test harness). The
//! `nvm-runtime` crate builds a thread-driven handle on top of it.

pub mod block;
pub mod controller;
pub mod crc;
pub mod diagnostics;
pub mod error;
pub mod hooks;
pub mod layout;
pub mod medium;
pub mod queue;
pub mod seqlock;

pub use controller::NvmController;
pub use error::{Error, LayoutError, Result};

#[cfg(test)]
#[ctor::ctor]
fn init_test_logging() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into()))
        .with_test_writer()
        .try_init();
}
