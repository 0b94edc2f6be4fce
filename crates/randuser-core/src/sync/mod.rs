//! Presentation-facing state machines built on the repository.

mod detail;
mod error;
mod list;

pub use detail::{DetailResolver, DetailState};
pub use error::{DetailError, ListError};
pub use list::{ListAccumulator, ListState};
