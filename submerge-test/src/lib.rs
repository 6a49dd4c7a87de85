//! Introspection, snapshots, diagnostics, judgments.
//!
//! Not yet implemented; out of scope for the persistence engine.
