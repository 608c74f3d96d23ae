//! Public SDK surface for Recollect.
//!
//! This crate re-exports the memory and config crates, maps configuration onto
//! a ready-to-use `BoundedSemanticMemory`, and provides the chat-turn glue used
//! by the `recollect` REPL.

pub mod chat;
pub mod setup;

/// Re-export for convenience.
pub use recollect_rs_config as config;
/// Re-export for convenience.
pub use recollect_rs_memory as memory;

pub use chat::{ChatSession, PreparedTurn, render_prompt};
pub use setup::{build_memory, memory_options, recall_options};

#[inline]
/// Initialize logging through env_logger if the "logging" feature is enabled.
///
/// Honors `RUST_LOG`. Safe to call more than once; later calls are no-ops.
pub fn init_logging() {
    #[cfg(feature = "logging")]
    {
        let _ = env_logger::builder()
            .format_timestamp_millis()
            .parse_default_env()
            .try_init();
    }
}
