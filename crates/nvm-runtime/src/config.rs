use std::time::Duration;

use nvm_core::medium::MediumConfig;

/// Configuration consumed by [`crate::handle::NvmRuntime::start`].
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub medium: MediumConfig,
    /// Poll interval used by [`crate::handle::NvmRuntime::spawn_driver`]'s
    /// convenience thread. Irrelevant if the caller drives `poll_once`
    /// itself instead.
    pub poll_interval: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            medium: MediumConfig::default(),
            poll_interval: Duration::from_millis(10),
        }
    }
}

/// Errors surfaced at the runtime layer, on top of [`nvm_core::Error`].
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("nvm core error: {0}")]
    Core(#[from] nvm_core::Error),
}
