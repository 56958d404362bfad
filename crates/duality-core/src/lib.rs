//! Event scripts, playback state machine, and scheduling for the Duality
//! playback engine.
//!
//! This crate is the sequencer: it replays a validated [`EventScript`] as
//! a time-spaced sequence of projection mutations and changelog appends,
//! with pause/resume/reset control and a cancellation contract that
//! guarantees no timer outlives its playback.
//!
//! # Modules
//!
//! - [`script`] -- The validated, immutable [`EventScript`] and its
//!   grouping-key derivation.
//! - [`playback`] -- The [`Playback`] phase machine and timer driver.
//! - [`listener`] -- The [`ChangeListener`] output contract.
//! - [`config`] -- Typed configuration loaded from `duality-config.yaml`.

pub mod config;
pub mod listener;
pub mod playback;
pub mod script;

// Re-export primary types at crate root.
pub use config::{ConfigError, DualityConfig, PlaybackConfig};
pub use listener::{ChangeListener, NoOpListener};
pub use playback::{Playback, PlaybackError};
pub use script::{EventScript, ScriptError};
