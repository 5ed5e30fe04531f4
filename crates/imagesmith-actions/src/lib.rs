//! imagesmith build actions
//!
//! This crate provides the action contract every build step satisfies and
//! the pipeline that drives it. An action is verified before anything runs,
//! then run against a shared [`BuildContext`] in declared order.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │               Pipeline                   │
//! │  ┌─────────────────────────────────┐    │
//! │  │  Steps (action + state)         │    │
//! │  │  pacstrap | ...                 │    │
//! │  └─────────────────────────────────┘    │
//! │                  │                       │
//! │                  ▼                       │
//! │  ┌─────────────────────────────────┐    │
//! │  │  verify all, then run in order  │    │
//! │  │  - stop at first failure        │    │
//! │  │  - report progress              │    │
//! │  └─────────────────────────────────┘    │
//! │                  │                       │
//! │                  ▼                       │
//! │  ┌─────────────────────────────────┐    │
//! │  │  CommandRunner (external tools) │    │
//! │  └─────────────────────────────────┘    │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use imagesmith_actions::{actions, BuildContext};
//!
//! let ctx = BuildContext::new("/build/rootfs", loaded.recipe_dir);
//! let mut pipeline = actions::pipeline_from_recipe(&loaded.recipe);
//! pipeline.build(&ctx).await?;
//! ```

pub mod actions;
pub mod command;
pub mod context;
pub mod engine;
pub mod error;
pub mod progress;
pub mod traits;

pub use command::*;
pub use context::*;
pub use engine::*;
pub use error::*;
pub use progress::*;
pub use traits::*;
