//! # Haagenti Core
//!
//! Shared error types for the Haagenti compression crates.
//!
//! Haagenti is named after the 48th demon of the Ars Goetia, who transmutes
//! substances into more valuable forms - just as compression transforms data
//! into denser representations.
//!
//! Codec crates report configuration and lifecycle problems through the
//! single [`Error`] enum defined here, so callers can match on one type no
//! matter which algorithm produced it.
//!
//! ## Example
//!
//! ```
//! use haagenti_core::{Error, Result};
//!
//! fn check_postfix(bits: u32) -> Result<u32> {
//!     if bits > 3 {
//!         return Err(Error::out_of_range("postfix bits", bits as i64, 0, 3));
//!     }
//!     Ok(bits)
//! }
//!
//! assert!(check_postfix(2).is_ok());
//! assert_eq!(check_postfix(7).unwrap_err().category(), "out_of_range");
//! ```

pub mod error;

pub use error::{Error, Result};
