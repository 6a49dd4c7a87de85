//! User-billing, payment, subscription, licensing, commissions.
//!
//! Not yet implemented; out of scope for the persistence engine.
