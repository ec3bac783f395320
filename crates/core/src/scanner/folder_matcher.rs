//! Folder-name parsing and fuzzy matching against requested library items.

use once_cell::sync::Lazy;
use regex_lite::Regex;

use crate::download::DownloadTarget;
use crate::rss::WantedSets;
use crate::title::{is_quality_token, is_year_token, levenshtein, strip_alnum};

/// What a completed job's folder name looks like.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedFolder {
    Tv {
        title: String,
        season: i32,
        episode: i32,
    },
    Music {
        artist: String,
        album: String,
    },
    Book {
        author: String,
        title: String,
    },
    Movie {
        title: String,
        year: Option<i32>,
    },
}

static TV_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(.+?)[ \-]*(?:s(\d{1,2})e(\d{1,3})|(\d{1,2})x(\d{2,3}))").unwrap()
});

static MUSIC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(.+?) - (.+?) (?:CD|LP|EP|FLAC|MP3|WEB|Vinyl|[0-9]{4})\b").unwrap()
});

static BOOK_HINT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(epub|mobi|pdf|audiobook|ebook)\b").unwrap());

static BOOK_BY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^(.+?) by (.+?)$").unwrap());

static BOOK_DASH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.+?) - (.+?)$").unwrap());

static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(19|20)\d{2}\b").unwrap());

/// Replace dot/underscore separators with spaces, keeping hyphens so the
/// `Artist - Album` convention survives.
fn clean(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| if c == '.' || c == '_' { ' ' } else { c })
        .collect();
    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn trim_separators(s: &str) -> String {
    s.trim().trim_matches('-').trim().to_string()
}

/// Extract the first pattern that hits, in order: TV, music, book, movie
/// fallback.
pub fn parse_folder_name(name: &str) -> ParsedFolder {
    let cleaned = clean(name);

    if let Some(caps) = TV_RE.captures(&cleaned) {
        let (season, episode) = if caps.get(2).is_some() {
            (caps[2].parse().unwrap_or(0), caps[3].parse().unwrap_or(0))
        } else {
            (caps[4].parse().unwrap_or(0), caps[5].parse().unwrap_or(0))
        };
        return ParsedFolder::Tv {
            title: trim_separators(&caps[1]),
            season,
            episode,
        };
    }

    if let Some(caps) = MUSIC_RE.captures(&cleaned) {
        return ParsedFolder::Music {
            artist: trim_separators(&caps[1]),
            album: trim_separators(&caps[2]),
        };
    }

    if BOOK_HINT_RE.is_match(&cleaned) {
        let stripped = trim_separators(&BOOK_HINT_RE.replace_all(&cleaned, " "));
        let stripped = clean(&stripped);
        if let Some(caps) = BOOK_BY_RE.captures(&stripped) {
            return ParsedFolder::Book {
                title: trim_separators(&caps[1]),
                author: trim_separators(&caps[2]),
            };
        }
        // Dash form carries no marker for which side is which; the author is
        // taken first, mirroring the music convention.
        if let Some(caps) = BOOK_DASH_RE.captures(&stripped) {
            return ParsedFolder::Book {
                author: trim_separators(&caps[1]),
                title: trim_separators(&caps[2]),
            };
        }
    }

    // Movie fallback: title is everything before the first quality or year
    // token.
    let mut title_words = Vec::new();
    for word in cleaned.split_whitespace() {
        let lowered = word.to_lowercase();
        if is_quality_token(&lowered) || is_year_token(&lowered) {
            break;
        }
        title_words.push(word);
    }
    let title = if title_words.is_empty() {
        cleaned.clone()
    } else {
        trim_separators(&title_words.join(" "))
    };
    let year = YEAR_RE
        .find(&cleaned)
        .and_then(|m| m.as_str().parse().ok());

    ParsedFolder::Movie { title, year }
}

/// Fuzzy string equality: containment either way, or an edit-distance ratio
/// under 0.30 (only computed for short strings).
fn fuzzy_eq(a: &str, b: &str) -> bool {
    let a = strip_alnum(a);
    let b = strip_alnum(b);
    if a.is_empty() || b.is_empty() {
        return false;
    }
    if a.contains(&b) || b.contains(&a) {
        return true;
    }
    if a.len() < 20 && b.len() < 20 {
        let distance = levenshtein(&a, &b) as f64;
        distance / (a.len().max(b.len()) as f64) < 0.30
    } else {
        false
    }
}

/// Match a completed job's folder name against the requested library items.
pub fn match_folder(name: &str, wanted: &WantedSets) -> Option<DownloadTarget> {
    match parse_folder_name(name) {
        ParsedFolder::Tv {
            title,
            season,
            episode,
        } => wanted
            .episodes
            .iter()
            .find(|w| {
                w.episode.season == season
                    && w.episode.episode == episode
                    && fuzzy_eq(&title, &w.show_title)
            })
            .map(|w| DownloadTarget::Episode {
                tv_show_id: w.episode.tv_show_id,
                episode_id: w.episode.id,
            }),
        ParsedFolder::Music { artist, album } => wanted
            .albums
            .iter()
            .find(|w| fuzzy_eq(&artist, &w.artist_name) && fuzzy_eq(&album, &w.album.title))
            .map(|w| DownloadTarget::Album {
                album_id: w.album.id,
            }),
        ParsedFolder::Book { author, title } => wanted
            .books
            .iter()
            .find(|w| fuzzy_eq(&author, &w.author_name) && fuzzy_eq(&title, &w.book.title))
            .map(|w| DownloadTarget::Book { book_id: w.book.id }),
        ParsedFolder::Movie { title, year } => wanted
            .movies
            .iter()
            .find(|movie| {
                if !fuzzy_eq(&title, &movie.title) {
                    return false;
                }
                match (year, movie.year) {
                    (Some(parsed), Some(known)) => (parsed - known).abs() <= 1,
                    _ => true,
                }
            })
            .map(|movie| DownloadTarget::Movie { movie_id: movie.id }),
    }
}
