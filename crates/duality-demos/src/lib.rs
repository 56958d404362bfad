//! Canonical demo content for the Duality playback engine.
//!
//! The original site ships a fixed set of demos; this crate defines them
//! as data so every host (console engine, web renderer, tests) replays
//! exactly the same scripts with exactly the same timings.
//!
//! # Modules
//!
//! - [`scripts`] -- The event scripts: order stream, aggregation
//!   changelog, live aggregation, upsert stream.
//! - [`terminal`] -- The scripted SQL terminal sessions.

pub mod scripts;
pub mod terminal;

pub use scripts::Demo;
pub use terminal::TerminalScript;
