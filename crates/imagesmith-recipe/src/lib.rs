//! imagesmith recipe types
//!
//! A recipe is a YAML document listing the build actions to perform, in
//! order, against a target root filesystem. This crate only models the
//! fields the actions consume; it does not interpret them.
//!
//! # Example
//!
//! ```yaml
//! architecture: x86_64
//! actions:
//!   - action: pacstrap
//!     config-file: pacman.conf
//!     mirror-file: mirrorlist
//! ```

pub mod error;
pub mod recipe;

pub use error::*;
pub use recipe::*;
