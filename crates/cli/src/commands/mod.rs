//! CLI command implementations. Every command runs against a
//! `SessionContext` with the search table already registered.

mod query;
mod search;

pub use query::{explain, query};
pub use search::search;
