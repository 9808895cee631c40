//! Umbrella crate for Trellis.
//!
//! Pulls the workspace together for applications that embed the gated
//! action surface: [`protocol`] for tuples, messages, and view unions,
//! [`policy`] for the relationship-store client and identity accessor,
//! [`config`] for the JSON5 configuration, [`core`] for the permission
//! predicate, gates, history, and filtered retrieval, and [`actions`] for
//! the tool registry and dispatcher.

pub use trellis_actions as actions;
pub use trellis_config as config;
pub use trellis_core as core;
pub use trellis_policy as policy;
pub use trellis_protocol as protocol;

/// Wire up `env_logger` so gate decisions and policy calls are visible.
///
/// Gate denials, checker faults, and batch filtering all report through
/// `log`; without a logger installed those records go nowhere. Safe to
/// call more than once. Compiled out when the `logging` feature is off.
pub fn init_logging() {
    #[cfg(feature = "logging")]
    {
        let _ = env_logger::try_init();
    }
}
