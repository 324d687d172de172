//! Registration workflow engine for business permit applications.
//!
//! The wizard gathers taxpayer, business, address and document data over a
//! fixed sequence of steps, stages uploaded files without committing them,
//! and submits one consolidated record to an external business registry.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
