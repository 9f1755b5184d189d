//! Task module
//!
//! This module contains task-related types and logic.

mod due;
mod legacy;
mod model;
mod store;

pub use due::*;
pub use legacy::{import_legacy, parse_legacy};
pub use model::*;
pub use store::{LoadOutcome, SortMode, TaskStore, SCHEMA_VERSION};
