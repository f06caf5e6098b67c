//! Thread-safe handle and notification layer on top of `nvm-core`.
//!
//! `nvm-core` never spawns a thread of its own; this crate adds the parts a
//! caller embedding NvM into a larger application typically wants: a
//! cloneable handle shared across threads, topic-keyed job notifications,
//! and an opt-in convenience thread for callers that don't already have
//! their own scheduling loop.

pub mod config;
pub mod driver;
pub mod handle;
pub mod pubsub;

pub use config::{RuntimeConfig, RuntimeError};
pub use driver::NvmDriver;
pub use handle::{NvmHandle, NvmRuntime};
pub use pubsub::{EventTopic, NotificationEvent};

#[cfg(test)]
#[ctor::ctor]
fn init_test_logging() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into()))
        .with_test_writer()
        .try_init();
}
