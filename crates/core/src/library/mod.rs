//! Library persistence: typed queries and mutations over the media library.

mod sqlite;
mod store;
mod types;

pub use sqlite::SqliteLibraryStore;
pub use store::LibraryStore;
pub use types::*;
