//! Persistence for the rolling metric history
//!
//! The history is a single JSON array of [`HistoryPoint`](crate::HistoryPoint)
//! records, bounded to a fixed number of entries and rewritten in full on
//! every append.
//!
//! ## Usage
//!
//! ```no_run
//! use stackwatch::storage::HistoryStore;
//!
//! let store = HistoryStore::new("./stats_history.json", 288);
//! let history = store.query_all();
//! println!("{} points", history.len());
//! ```

pub mod error;
pub mod history;

pub use error::{StorageError, StorageResult};
pub use history::HistoryStore;
