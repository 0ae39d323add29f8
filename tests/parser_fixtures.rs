// tests/parser_fixtures.rs
use timescroll_fetcher::content_id;
use timescroll_fetcher::ingest::parser::{FeedParser, XmlFeedParser};
use timescroll_fetcher::ingest::worker::items_from_feed;

const RSS: &str = include_str!("fixtures/feed_rss.xml");
const ATOM: &str = include_str!("fixtures/feed_atom.xml");

#[test]
fn rss_fixture_parses_items_in_document_order() {
    let feed = XmlFeedParser.parse(RSS.as_bytes()).expect("rss parses");
    assert_eq!(feed.title, "Example Gardening Blog");
    assert_eq!(feed.items.len(), 2);

    let first = &feed.items[0];
    assert_eq!(first.id, "garden-post-101");
    assert_eq!(first.title, "Planting & pruning in \"early\" spring");
    assert_eq!(first.link, "https://garden.example.test/posts/early-spring");
    assert_eq!(first.image, "https://garden.example.test/img/spring.jpg");
    assert_eq!(first.when, 1_709_294_400);

    let second = &feed.items[1];
    assert_eq!(second.id, "https://garden.example.test/posts/tomatoes");
    assert_eq!(second.title, "Tomato varieties, ranked");
    assert_eq!(second.image, "", "audio enclosures are not images");
    assert_eq!(second.when, 1_709_368_200);
}

#[test]
fn atom_fixture_prefers_alternate_links_and_published_dates() {
    let feed = XmlFeedParser.parse(ATOM.as_bytes()).expect("atom parses");
    assert_eq!(feed.title, "Example Engineering Log");
    assert_eq!(feed.items.len(), 2);

    let first = &feed.items[0];
    assert_eq!(first.id, "tag:eng.example.test,2024:entry-7");
    assert_eq!(first.title, "Rewriting the queue");
    assert_eq!(first.link, "https://eng.example.test/2024/queue");
    assert_eq!(first.image, "https://eng.example.test/img/queue.png");
    assert_eq!(first.when, 1_709_111_700);

    let second = &feed.items[1];
    assert_eq!(second.id, "https://eng.example.test/2024/second");
    assert_eq!(second.link, "https://eng.example.test/2024/second");
    assert_eq!(second.when, 1_709_294_400);
}

#[test]
fn items_are_keyed_by_content_id_of_the_source_id() {
    let feed = XmlFeedParser.parse(RSS.as_bytes()).unwrap();
    let items = items_from_feed("garden", feed);

    assert_eq!(items[0].id, content_id("garden-post-101"));
    assert_eq!(items[0].id.len(), 64);
    assert!(items.iter().all(|i| i.pid == "garden"));
    assert_eq!(items[1].event, 1_709_368_200);
}

#[test]
fn content_id_is_stable_and_distinct() {
    assert_eq!(content_id("garden-post-101"), content_id("garden-post-101"));
    assert_ne!(content_id("garden-post-101"), content_id("garden-post-102"));
    assert!(content_id("x").chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
}

#[test]
fn non_feed_documents_are_parse_errors() {
    for body in ["", "not xml at all", "<html><head></head></html>"] {
        assert!(
            XmlFeedParser.parse(body.as_bytes()).is_err(),
            "{body:?} should not parse"
        );
    }
}
