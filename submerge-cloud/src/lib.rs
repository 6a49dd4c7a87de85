//! Cloud storage and replica provisioning.
//!
//! Not yet implemented; out of scope for the persistence engine.
