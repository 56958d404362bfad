//! Shared type definitions for the Duality playback engine.
//!
//! This crate is the single source of truth for all types used across the
//! Duality workspace. Types defined here flow downstream to `TypeScript`
//! via `ts-rs` for the web renderer.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for entity identifiers
//! - [`enums`] -- Changelog operations, event kinds, encodings, phases
//! - [`structs`] -- Events, aggregates, changelog records, status payloads

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{ChangeOp, ChangelogMode, EventKind, PlaybackPhase, TerminalLineKind};
pub use ids::{DemoId, EventId, RecordId};
pub use structs::{
    Aggregate, ChangelogRecord, OrderEvent, PlaybackStatus, ScriptedEvent, TerminalLine,
};

#[cfg(test)]
mod tests {
    //! Integration tests for type exports and `TypeScript` binding generation.

    #[test]
    fn export_bindings() {
        // ts-rs generates TypeScript bindings when types with
        // #[ts(export)] are used. Importing them here triggers generation.
        // The actual files are written to the `bindings/` directory
        // relative to the crate root.
        use ts_rs::TS;

        // IDs
        let _ = crate::ids::EventId::export_all();
        let _ = crate::ids::RecordId::export_all();
        let _ = crate::ids::DemoId::export_all();

        // Enums
        let _ = crate::enums::ChangeOp::export_all();
        let _ = crate::enums::EventKind::export_all();
        let _ = crate::enums::ChangelogMode::export_all();
        let _ = crate::enums::PlaybackPhase::export_all();
        let _ = crate::enums::TerminalLineKind::export_all();

        // Structs
        let _ = crate::structs::OrderEvent::export_all();
        let _ = crate::structs::ScriptedEvent::export_all();
        let _ = crate::structs::Aggregate::export_all();
        let _ = crate::structs::ChangelogRecord::export_all();
        let _ = crate::structs::PlaybackStatus::export_all();
        let _ = crate::structs::TerminalLine::export_all();
    }
}
