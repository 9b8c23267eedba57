//! Core library for the meshery-registry command line application.
//!
//! The library keeps the registry update pipeline in narrow stages: component
//! sources live under [`io`], the normalized records and definitions inside
//! [`model`], the append-only merge in [`merge`], catalog traversal in
//! [`catalog`], the diff-and-write engine with run orchestration under
//! [`sync`], and reporting in [`store`] and [`summary`].

pub mod catalog;
pub mod config;
pub mod error;
pub mod io;
pub mod logging;
pub mod merge;
pub mod model;
pub mod store;
pub mod summary;
pub mod sync;

pub use error::{RegistryError, Result};
