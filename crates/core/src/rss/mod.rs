//! RSS sync: periodic fan-out over enabled indexers, matching fresh releases
//! against wanted library items.

mod matcher;
mod sync;
mod types;

pub use matcher::{match_release, WantedSets};
pub use sync::RssSync;
pub use types::RssSyncResult;
