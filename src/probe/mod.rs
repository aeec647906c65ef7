//! Probing the Raspberry Pi.
//!
//! This module gathers everything a report shows: the static
//! [`HardwareProfile`] detected once at startup and the [`StatusSnapshot`]
//! collected for every request. All access to the operating system goes
//! through the [`Host`] trait.

pub mod field;
pub mod hardware;
pub mod host;
pub mod status;

// Re-export commonly used items
pub use hardware::HardwareProfile;
pub use host::{is_privileged, CommandOutput, Host, LocalHost, ProbeConfig, ScriptedHost};
pub use status::StatusSnapshot;
