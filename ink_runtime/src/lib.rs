//! # Ink Runtime
//!
//! A stepping virtual machine for compiled ink stories. A [`Story`] walks the
//! container tree from [`ink_model`] one content item at a time, keeping its
//! own evaluation stack, call frames, variables and visit counts. Text is
//! buffered until the story stops to offer choices or reaches its end.
//!
//! ## Core Components
//!
//! - **story**: The machine itself and its per-item handlers
//! - **state**: Variables, choices, visit and turn bookkeeping
//! - **operators**: Arithmetic, comparison, string and list operators
//! - **external**: Host functions callable from a story
//! - **config**: Runtime tunables, loadable from TOML
//!
//! ## Example
//!
//! ```no_run
//! use ink_runtime::Story;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let json = std::fs::read_to_string("story.ink.json")?;
//! let mut story = Story::from_json_str(&json)?;
//! story.start()?;
//! while !story.is_finished() {
//!     let output = story.run_continuous()?;
//!     print!("{}", output.text);
//!     if story.current_choices().is_empty() {
//!         break;
//!     }
//!     story.choose_index(0)?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod choice;
pub mod config;
pub mod error;
pub mod external;
pub mod mode;
pub mod operators;
pub mod output;
pub mod stack;
pub mod state;
pub mod story;
pub mod value;

pub use choice::*;
pub use config::*;
pub use error::*;
pub use external::*;
pub use mode::*;
pub use output::*;
pub use stack::*;
pub use state::*;
pub use story::*;
pub use value::*;
