//! Library entity types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The four media kinds the library manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Movie,
    Tv,
    Music,
    Book,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Movie => "movie",
            MediaKind::Tv => "tv",
            MediaKind::Music => "music",
            MediaKind::Book => "book",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "movie" => Some(MediaKind::Movie),
            "tv" => Some(MediaKind::Tv),
            "music" => Some(MediaKind::Music),
            "book" => Some(MediaKind::Book),
            _ => None,
        }
    }

    /// Default Newznab categories for this kind.
    pub fn default_categories(&self) -> &'static [u32] {
        match self {
            MediaKind::Movie => &[2000],
            MediaKind::Tv => &[5000],
            MediaKind::Music => &[3000],
            MediaKind::Book => &[7000],
        }
    }

    /// Category superset covering all kinds, used when an indexer has no
    /// explicit category list.
    pub fn all_categories() -> &'static [u32] {
        &[2000, 3000, 5000, 7000]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Movie {
    pub id: i64,
    pub title: String,
    pub year: Option<i32>,
    pub tmdb_id: Option<i64>,
    pub requested: bool,
    pub has_file: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TvShow {
    pub id: i64,
    pub title: String,
    pub tvdb_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode {
    pub id: i64,
    pub tv_show_id: i64,
    pub season: i32,
    pub episode: i32,
    pub title: Option<String>,
    pub requested: bool,
    pub has_file: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artist {
    pub id: i64,
    pub name: String,
    pub musicbrainz_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Album {
    pub id: i64,
    pub artist_id: i64,
    pub title: String,
    pub year: Option<i32>,
    pub requested: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    pub id: i64,
    pub album_id: i64,
    pub position: i32,
    pub title: String,
    pub media_file_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Author {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    pub id: i64,
    pub author_id: i64,
    pub title: String,
    pub openlibrary_id: Option<String>,
    pub requested: bool,
    pub has_file: bool,
}

/// A file on disk linked to a library entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaFile {
    pub id: i64,
    pub path: String,
    pub size_bytes: i64,
    pub added_at: DateTime<Utc>,
    pub owner: MediaFileOwner,
}

/// Which library entity owns a media file. Track files are linked from the
/// `tracks` side instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaFileOwner {
    Movie(i64),
    Episode(i64),
    Book(i64),
    /// Owned by a track, linked via `tracks.media_file_id` after creation.
    Track,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootFolder {
    pub id: i64,
    pub path: String,
    pub media_type: MediaKind,
}

/// A wanted episode joined with its show title for matching.
#[derive(Debug, Clone)]
pub struct WantedEpisode {
    pub episode: Episode,
    pub show_title: String,
}

/// A wanted album joined with its artist name for matching.
#[derive(Debug, Clone)]
pub struct WantedAlbum {
    pub album: Album,
    pub artist_name: String,
}

/// A wanted book joined with its author name for matching.
#[derive(Debug, Clone)]
pub struct WantedBook {
    pub book: Book,
    pub author_name: String,
}
