//! Core domain concepts shared across all subdomains.
//!
//! - [`error::ClassificationError`]: marker-format validation errors

pub mod error;
