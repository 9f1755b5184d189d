//! Core library for the todo task manager
//!
//! This crate contains the task model, the file-backed task store,
//! due-date classification and reminder computation.

pub mod error;
pub mod task;

pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;
