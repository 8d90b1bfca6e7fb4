//! Chirp connectors: a keyword-search HTTP API exposed as a DataFusion table.
//!
//! # Architecture
//!
//! ```text
//! predicates ──> pushdown ──> RemoteRequest ──> HttpFetcher
//!                                                   │ bytes
//!                 rows <── ScanCursor <── builder <── events
//! ```
//!
//! The `search` source owns the whole pipeline; `SearchTableProvider` plugs it
//! into DataFusion so callers can use plain SQL.

pub mod sources;

pub use sources::search::{register_search_table, SearchSourceProvider, SearchTableProvider};
