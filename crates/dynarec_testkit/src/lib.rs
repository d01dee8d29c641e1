//! # DynaRec Testkit
//!
//! Test utilities for DynaRec.
//!
//! This crate provides:
//! - Fixture record types exercising every hook phase and validation kind
//! - Collection helpers backed by the in-memory client
//! - Property-based test generators using proptest
//! - Test logging setup
//!
//! ## Usage
//!
//! ```rust
//! use dynarec_testkit::prelude::*;
//!
//! with_memory_collection(callback_tester_schema(), |testers| {
//!     assert!(testers.all().unwrap().is_empty());
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod logging;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::logging::*;
}

pub use fixtures::*;
pub use generators::*;
pub use logging::*;
