//! # skiff-common
//!
//! Shared types for the Skiff control plane.
//!
//! This crate provides the vocabulary used across all Skiff crates:
//! - Container ID generation and validation
//! - Resource quantity parsing for configured capacity limits
//! - Common error types

#![warn(missing_docs)]

pub mod error;
pub mod id;
pub mod resource;

pub use error::{SkiffError, SkiffResult};
pub use id::ContainerId;
pub use resource::ResourceQuantity;
