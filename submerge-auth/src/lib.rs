//! Authentication, authorization, endorsement, signatures, etc.
//!
//! Not yet implemented; out of scope for the persistence engine.
