//! BTree planner and executor.
//!
//! Not yet implemented; out of scope for the persistence engine.
