//! External system and format interop, pubsub, adaptors.
//!
//! Not yet implemented; out of scope for the persistence engine.
