//! # FEETRACK Common Library
//!
//! Shared code for the feetrack services including:
//! - Error taxonomy
//! - Phone number and month-key normalizers
//! - Configuration resolution
//! - Store schema, models, and queries

pub mod config;
pub mod db;
pub mod error;
pub mod month;
pub mod phone;

pub use error::{Error, Result};
