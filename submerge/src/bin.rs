//! Placeholder entry point for the top-level client-or-server executable.
//!
//! Not yet implemented; out of scope for the persistence engine.

fn main() {}
