//! Accounts, guest users, preferences, sessions, etc.
//!
//! Not yet implemented; out of scope for the persistence engine.
