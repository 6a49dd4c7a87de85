//! Versioning, history, undo, fork-merge, provenance, etc.
//!
//! Not yet implemented; out of scope for the persistence engine.
