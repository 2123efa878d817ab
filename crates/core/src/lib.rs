#![deny(unused)]
//! Core types, traits, and error definitions for the ticket triage engine.
//!
//! This crate provides the building blocks shared by the model gateway and
//! the classification pipeline: request/response models, the stable error
//! code taxonomy, configuration, and the provider client contract.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use traits::*;
pub use types::*;
