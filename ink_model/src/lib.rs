//! # Ink Model
//!
//! The read-only half of the ink runtime: everything that describes a compiled
//! story and never changes while it runs. The engine in `ink_runtime` walks
//! these structures but never mutates them, so one loaded [`Ink`] can back any
//! number of independent story sessions.
//!
//! ## Core Components
//!
//! - **container**: Arena-backed container tree, content items and addresses
//! - **path**: Dotted path parsing and resolution against the tree
//! - **list**: List definitions, list values and the derived list catalog
//! - **json**: Loader for the compiled JSON format

pub mod container;
pub mod error;
pub mod json;
pub mod list;
pub mod path;

pub use container::*;
pub use error::*;
pub use json::*;
pub use list::*;
pub use path::*;
