//! Newznab feed parsing.
//!
//! Search and RSS responses share one RSS 2.0 document shape: `<item>`
//! elements carrying title/guid/link plus `enclosure` and `newznab:attr`
//! extensions.

use chrono::{DateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::types::IndexerError;

/// One `<item>` of a feed, before indexer identity is attached.
#[derive(Debug, Clone, Default)]
pub struct FeedItem {
    pub title: String,
    pub guid: String,
    pub download_url: String,
    pub size_bytes: i64,
    pub pub_date: Option<DateTime<Utc>>,
    pub categories: Vec<u32>,
}

#[derive(Default)]
struct ItemBuilder {
    title: Option<String>,
    guid_text: Option<String>,
    attr_guid: Option<String>,
    link: Option<String>,
    enclosure_url: Option<String>,
    enclosure_length: Option<i64>,
    attr_size: Option<i64>,
    pub_date: Option<String>,
    categories: Vec<u32>,
}

impl ItemBuilder {
    /// Items missing a title or a download URL are unusable and dropped.
    fn build(self) -> Option<FeedItem> {
        let title = self.title?;
        let download_url = self.enclosure_url.or(self.link)?;
        let guid = self
            .attr_guid
            .or(self.guid_text)
            .unwrap_or_else(|| download_url.clone());
        Some(FeedItem {
            title,
            guid,
            download_url,
            size_bytes: self.attr_size.or(self.enclosure_length).unwrap_or(0),
            pub_date: self
                .pub_date
                .as_deref()
                .and_then(|s| DateTime::parse_from_rfc2822(s).ok())
                .map(|dt| dt.with_timezone(&Utc)),
            categories: self.categories,
        })
    }
}

fn attribute(element: &BytesStart, key: &[u8]) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .and_then(|a| a.unescape_value().ok())
        .map(|v| v.into_owned())
}

fn handle_extension(element: &BytesStart, item: &mut ItemBuilder) {
    match element.name().as_ref() {
        b"enclosure" => {
            if let Some(url) = attribute(element, b"url") {
                item.enclosure_url = Some(url);
            }
            if let Some(length) = attribute(element, b"length") {
                item.enclosure_length = length.parse().ok();
            }
        }
        b"newznab:attr" | b"attr" => {
            let name = attribute(element, b"name");
            let value = attribute(element, b"value");
            if let (Some(name), Some(value)) = (name, value) {
                match name.as_str() {
                    "size" => item.attr_size = value.parse().ok(),
                    "category" => {
                        if let Ok(cat) = value.parse() {
                            item.categories.push(cat);
                        }
                    }
                    "guid" => item.attr_guid = Some(value),
                    _ => {}
                }
            }
        }
        _ => {}
    }
}

/// Parse a Newznab RSS document into feed items. XML-level malformation is a
/// protocol error; individual items missing essential fields are skipped.
pub fn parse_feed(xml: &str) -> Result<Vec<FeedItem>, IndexerError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut items = Vec::new();
    let mut current: Option<ItemBuilder> = None;
    let mut current_tag: Vec<u8> = Vec::new();

    loop {
        match reader.read_event() {
            Err(e) => return Err(IndexerError::Protocol(format!("malformed XML: {}", e))),
            Ok(Event::Eof) => break,
            Ok(Event::Start(e)) => {
                if e.name().as_ref() == b"item" {
                    current = Some(ItemBuilder::default());
                    current_tag.clear();
                } else {
                    current_tag = e.name().as_ref().to_vec();
                    if let Some(item) = current.as_mut() {
                        handle_extension(&e, item);
                    }
                }
            }
            Ok(Event::Empty(e)) => {
                if let Some(item) = current.as_mut() {
                    handle_extension(&e, item);
                }
            }
            Ok(Event::Text(t)) => {
                if let Some(item) = current.as_mut() {
                    let text = t
                        .unescape()
                        .map_err(|e| IndexerError::Protocol(format!("bad text node: {}", e)))?
                        .into_owned();
                    assign_text(item, &current_tag, text);
                }
            }
            Ok(Event::CData(t)) => {
                if let Some(item) = current.as_mut() {
                    let text = String::from_utf8_lossy(&t.into_inner()).into_owned();
                    assign_text(item, &current_tag, text);
                }
            }
            Ok(Event::End(e)) => {
                if e.name().as_ref() == b"item" {
                    if let Some(builder) = current.take() {
                        if let Some(item) = builder.build() {
                            items.push(item);
                        }
                    }
                }
                current_tag.clear();
            }
            Ok(_) => {}
        }
    }

    Ok(items)
}

fn assign_text(item: &mut ItemBuilder, tag: &[u8], text: String) {
    match tag {
        b"title" => item.title = Some(text),
        b"guid" => item.guid_text = Some(text),
        b"link" => item.link = Some(text),
        b"pubDate" => item.pub_date = Some(text),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:newznab="http://www.newznab.com/DTD/2010/feeds/attributes/">
  <channel>
    <title>Indexer</title>
    <item>
      <title>The.Matrix.1999.1080p.BluRay.x264-GROUP</title>
      <guid isPermaLink="true">https://indexer.example/details/abc123</guid>
      <link>https://indexer.example/get/abc123</link>
      <pubDate>Tue, 14 Jul 2026 10:30:00 +0000</pubDate>
      <enclosure url="https://indexer.example/get/abc123.nzb" length="8589934592" type="application/x-nzb"/>
      <newznab:attr name="category" value="2000"/>
      <newznab:attr name="category" value="2040"/>
      <newznab:attr name="size" value="8589934593"/>
      <newznab:attr name="guid" value="abc123"/>
    </item>
    <item>
      <title><![CDATA[Breaking.Bad.S05E07.720p.HDTV.x264]]></title>
      <link>https://indexer.example/get/def456</link>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn test_parse_feed_items() {
        let items = parse_feed(SAMPLE).unwrap();
        assert_eq!(items.len(), 2);

        let movie = &items[0];
        assert_eq!(movie.title, "The.Matrix.1999.1080p.BluRay.x264-GROUP");
        assert_eq!(movie.guid, "abc123");
        assert_eq!(movie.download_url, "https://indexer.example/get/abc123.nzb");
        // newznab size attribute wins over enclosure length
        assert_eq!(movie.size_bytes, 8589934593);
        assert_eq!(movie.categories, vec![2000, 2040]);
        assert!(movie.pub_date.is_some());

        let episode = &items[1];
        assert_eq!(episode.title, "Breaking.Bad.S05E07.720p.HDTV.x264");
        // No attr/element guid: falls back to the download URL.
        assert_eq!(episode.guid, "https://indexer.example/get/def456");
        assert_eq!(episode.size_bytes, 0);
    }

    #[test]
    fn test_parse_feed_skips_unusable_items() {
        let xml = r#"<rss><channel>
            <item><title>No download url here</title></item>
            <item><link>https://indexer.example/get/x</link></item>
        </channel></rss>"#;
        let items = parse_feed(xml).unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn test_parse_feed_malformed_is_protocol_error() {
        let result = parse_feed("<rss><channel><item></rss>");
        assert!(matches!(result, Err(IndexerError::Protocol(_))));
    }

    #[test]
    fn test_parse_feed_empty_channel() {
        let items = parse_feed("<rss><channel></channel></rss>").unwrap();
        assert!(items.is_empty());
    }
}
