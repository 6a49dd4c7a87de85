//! Admin, config, system policies, logging, audit, metrics, etc.
//!
//! Not yet implemented; out of scope for the persistence engine.
