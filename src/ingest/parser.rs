// src/ingest/parser.rs
use quick_xml::de::from_str;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Deserialize;
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::OffsetDateTime;

use crate::error::FetchError;
use crate::ingest::normalize_text;

/// One entry as the feed document describes it, before it becomes an `Item`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedItem {
    /// Source-provided identifier (guid / atom id, falling back to link, then title).
    pub id: String,
    pub title: String,
    pub link: String,
    /// Feed-supplied image URL, if the entry carries one.
    pub image: String,
    pub when: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedFeed {
    pub title: String,
    pub items: Vec<ParsedItem>,
}

pub trait FeedParser: Send + Sync {
    fn parse(&self, body: &[u8]) -> Result<ParsedFeed, FetchError>;
}

/// RSS 2.0 and Atom 1.0.
#[derive(Debug, Default, Clone, Copy)]
pub struct XmlFeedParser;

impl FeedParser for XmlFeedParser {
    fn parse(&self, body: &[u8]) -> Result<ParsedFeed, FetchError> {
        let text = String::from_utf8_lossy(body);
        let xml = scrub_html_entities_for_xml(&text);
        match root_element(&xml)?.as_str() {
            "rss" => parse_rss(&xml),
            "feed" => parse_atom(&xml),
            other => Err(FetchError::Parse(format!(
                "unsupported feed root element <{other}>"
            ))),
        }
    }
}

// ---- RSS 2.0 ----

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    title: Option<String>,
    #[serde(rename = "item", default)]
    item: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    guid: Option<TextNode>,
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    #[serde(rename = "enclosure", default)]
    enclosures: Vec<Enclosure>,
}

#[derive(Debug, Deserialize)]
struct Enclosure {
    #[serde(rename = "@url")]
    url: Option<String>,
    #[serde(rename = "@type")]
    kind: Option<String>,
}

// ---- Atom ----

#[derive(Debug, Deserialize)]
struct AtomFeed {
    title: Option<TextNode>,
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    id: Option<String>,
    title: Option<TextNode>,
    #[serde(rename = "link", default)]
    links: Vec<AtomLink>,
    published: Option<String>,
    updated: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
    #[serde(rename = "@type")]
    kind: Option<String>,
}

/// Element whose text we want regardless of its attributes.
#[derive(Debug, Deserialize)]
struct TextNode {
    #[serde(rename = "$text", default)]
    value: String,
}

fn root_element(xml: &str) -> Result<String, FetchError> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                let local = e.name().local_name();
                return Ok(String::from_utf8_lossy(local.as_ref()).to_ascii_lowercase());
            }
            Ok(Event::Eof) => return Err(FetchError::Parse("empty document".into())),
            Ok(_) => continue,
            Err(e) => return Err(FetchError::Parse(format!("reading root element: {e}"))),
        }
    }
}

fn parse_rss(xml: &str) -> Result<ParsedFeed, FetchError> {
    let rss: Rss = from_str(xml).map_err(|e| FetchError::Parse(format!("rss: {e}")))?;
    let items = rss
        .channel
        .item
        .into_iter()
        .map(|it| {
            let title = normalize_text(it.title.as_deref().unwrap_or_default());
            let link = trimmed(it.link);
            let guid = it.guid.map(|g| g.value.trim().to_string()).unwrap_or_default();
            let image = it
                .enclosures
                .into_iter()
                .find(|e| is_image_type(e.kind.as_deref()))
                .and_then(|e| e.url)
                .map(|u| u.trim().to_string())
                .unwrap_or_default();
            ParsedItem {
                id: source_id(&guid, &link, &title),
                when: it.pub_date.as_deref().map(parse_rfc2822).unwrap_or(0),
                title,
                link,
                image,
            }
        })
        .collect();
    Ok(ParsedFeed {
        title: normalize_text(rss.channel.title.as_deref().unwrap_or_default()),
        items,
    })
}

fn parse_atom(xml: &str) -> Result<ParsedFeed, FetchError> {
    let feed: AtomFeed = from_str(xml).map_err(|e| FetchError::Parse(format!("atom: {e}")))?;
    let items = feed
        .entries
        .into_iter()
        .map(|en| {
            let title = normalize_text(en.title.map(|t| t.value).as_deref().unwrap_or_default());
            let link = alternate_link(&en.links);
            let image = en
                .links
                .iter()
                .find(|l| l.rel.as_deref() == Some("enclosure") && is_image_type(l.kind.as_deref()))
                .and_then(|l| l.href.clone())
                .unwrap_or_default();
            let id = trimmed(en.id);
            ParsedItem {
                id: source_id(&id, &link, &title),
                when: en
                    .published
                    .or(en.updated)
                    .as_deref()
                    .map(parse_rfc3339)
                    .unwrap_or(0),
                title,
                link,
                image,
            }
        })
        .collect();
    Ok(ParsedFeed {
        title: normalize_text(feed.title.map(|t| t.value).as_deref().unwrap_or_default()),
        items,
    })
}

fn alternate_link(links: &[AtomLink]) -> String {
    links
        .iter()
        .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
        .or_else(|| links.first())
        .and_then(|l| l.href.as_deref())
        .map(|h| h.trim().to_string())
        .unwrap_or_default()
}

fn source_id(primary: &str, link: &str, title: &str) -> String {
    [primary, link, title]
        .into_iter()
        .find(|s| !s.is_empty())
        .unwrap_or_default()
        .to_string()
}

fn trimmed(s: Option<String>) -> String {
    s.map(|v| v.trim().to_string()).unwrap_or_default()
}

fn is_image_type(kind: Option<&str>) -> bool {
    kind.is_some_and(|k| k.trim().to_ascii_lowercase().starts_with("image/"))
}

fn parse_rfc2822(ts: &str) -> i64 {
    let ts = ts.trim();
    OffsetDateTime::parse(ts, &Rfc2822)
        .map(|dt| dt.unix_timestamp())
        .ok()
        // chrono also accepts the obsolete zone names ("GMT", "EST") feeds love
        .or_else(|| {
            chrono::DateTime::parse_from_rfc2822(ts)
                .ok()
                .map(|dt| dt.timestamp())
        })
        .unwrap_or(0)
}

fn parse_rfc3339(ts: &str) -> i64 {
    OffsetDateTime::parse(ts.trim(), &Rfc3339)
        .map(|dt| dt.unix_timestamp())
        .unwrap_or(0)
}

/// HTML entities that show up in feeds but are not defined in XML.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&hellip;", "...")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}
