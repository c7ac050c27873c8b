//! # Middleware
//!
//! Tower middleware applied to the authenticated API router.

pub mod metrics;
