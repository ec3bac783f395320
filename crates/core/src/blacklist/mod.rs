//! Blacklist: suppresses re-grabs of releases previously known bad.

mod filter;
mod sqlite;
mod store;

pub use filter::BlacklistFilter;
pub use sqlite::SqliteBlacklistStore;
pub use store::{BlacklistEntry, BlacklistStore};
