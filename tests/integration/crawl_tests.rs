//! Integration tests for the crawler
//!
//! These tests use wiremock to serve a miniature copy of the book site and
//! run the full crawl cycle end-to-end against it.

use doubook_crawler::config::{Config, CrawlerConfig, OutputConfig, UserAgentConfig};
use doubook_crawler::crawler::Coordinator;
use doubook_crawler::storage::{RunStatus, SqliteStorage, Storage};
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing at the mock server
fn create_test_config(base_url: &str, db_path: &Path, debug: bool) -> Config {
    Config {
        crawler: CrawlerConfig {
            start_url: format!("{}/tag/", base_url),
            base_url: base_url.to_string(),
            allowed_domains: vec!["127.0.0.1".to_string()],
            debug,
            blocked_status_codes: vec![302, 403],
            max_concurrent_requests: 4,
            download_delay: 0,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        output: OutputConfig {
            database_path: db_path.display().to_string(),
        },
    }
}

fn tag_index(tags: &[&str]) -> String {
    let cells: String = tags
        .iter()
        .map(|tag| format!(r#"<td><a href="/tag/{tag}">{tag}</a><b>(42)</b></td>"#))
        .collect();
    format!(
        r#"<html><body><div class="article">
            <table class="tagCol"><tbody><tr>{cells}</tr></tbody></table>
        </div></body></html>"#
    )
}

fn book_item(detail_url: &str, title: &str, rating: &str) -> String {
    format!(
        r#"<li class="subject-item">
            <div class="pic"><a class="nbg" href="{detail_url}"><img src="/s.jpg"></a></div>
            <div class="info">
                <h2 class=""><a href="{detail_url}" title="{title}">{title}</a></h2>
                <div class="pub">作者 / 出版社 / 2014-5 / 39.50元</div>
                <div class="star clearfix">
                    <span class="allstar45"></span>
                    <span class="rating_nums">{rating}</span>
                    <span class="pl">(1000人评价)</span>
                </div>
            </div>
        </li>"#
    )
}

fn listing(items: &[String], next: Option<&str>) -> String {
    let paginator = match next {
        Some(href) => format!(
            r#"<div class="paginator"><span class="thispage">1</span>
               <span class="next"><link rel="next" href="{href}"/><a href="{href}">后页&gt;</a></span></div>"#
        ),
        None => r#"<div class="paginator"><span class="prev"><a href="/tag/">&lt;前页</a></span>
                   <span class="next">后页&gt;</span></div>"#
            .to_string(),
    };
    format!(
        r#"<html><body><div id="subject_list"><ul class="subject-list">{}</ul>{}</div></body></html>"#,
        items.join("\n"),
        paginator
    )
}

fn comment_item(user: &str, stars: &str, votes: u32) -> String {
    format!(
        r#"<li class="comment-item">
            <h3>
                <span class="comment-vote"><span class="vote-count">{votes}</span></span>
                <span class="comment-info">
                    <a href="/people/{user}/">{user}</a>
                    <span class="user-stars {stars} rating" title="推荐"></span>
                    <span>2014-06-01</span>
                </span>
            </h3>
            <p class="comment-content">...</p>
        </li>"#
    )
}

fn comments(items: &[String], next: Option<&str>) -> String {
    let third = match next {
        Some(href) => format!(r#"<a href="{href}">后一页</a>"#),
        None => "<span>后一页</span>".to_string(),
    };
    format!(
        r#"<html><body><div id="comments"><ul>{}</ul></div>
        <ul class="comment-paginator">
            <li class="p"><span>首页</span></li>
            <li class="p"><span>前一页</span></li>
            <li class="p">{third}</li>
        </ul></body></html>"#,
        items.join("\n")
    )
}

async fn mount_page(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

/// Mounts one tag with two listing pages and three books
async fn mount_fiction_site(server: &MockServer) {
    let base = server.uri();

    mount_page(server, "/tag/", tag_index(&["fiction"])).await;
    mount_page(
        server,
        "/tag/fiction",
        listing(
            &[
                book_item(&format!("{}/subject/101/", base), "白夜行", "9.1"),
                book_item(&format!("{}/subject/102/", base), "解忧杂货店", "8.6"),
            ],
            Some("/tag/fiction/p2"),
        ),
    )
    .await;
    mount_page(
        server,
        "/tag/fiction/p2",
        listing(
            &[book_item(&format!("{}/subject/103/", base), "嫌疑人X的献身", "8.9")],
            None,
        ),
    )
    .await;

    mount_page(
        server,
        "/subject/101/comments/",
        comments(
            &[
                comment_item("alice", "allstar50", 12),
                comment_item("bob", "allstar40", 3),
            ],
            Some("hot"),
        ),
    )
    .await;
    mount_page(
        server,
        "/subject/101/comments/hot",
        comments(&[comment_item("carol", "allstar10", 0)], None),
    )
    .await;
    mount_page(
        server,
        "/subject/102/comments/",
        comments(
            &[
                comment_item("dave", "allstar30", 1),
                comment_item("erin", "allstar00", 5),
            ],
            None,
        ),
    )
    .await;
    mount_page(server, "/subject/103/comments/", comments(&[], None)).await;
}

#[tokio::test]
async fn test_full_crawl_extracts_books_and_comments() {
    let mock_server = MockServer::start().await;
    mount_fiction_site(&mock_server).await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("crawl.db");
    let config = create_test_config(&mock_server.uri(), &db_path, false);

    let mut coordinator =
        Coordinator::new(&config, "hash", false).expect("Failed to create coordinator");
    let summary = coordinator.run().await.expect("Crawl failed");

    // tag index + 2 listings + 4 comment pages
    assert_eq!(summary.totals.pages_crawled, 7);
    assert_eq!(summary.totals.books_scraped, 3);
    assert_eq!(summary.totals.comments_scraped, 4);
    assert_eq!(summary.retries, 0);
    assert_eq!(summary.dropped_pages, 0);

    let storage = SqliteStorage::new(&db_path).unwrap();
    assert_eq!(storage.count_books().unwrap(), 3);
    assert_eq!(storage.count_comments().unwrap(), 4);
    assert_eq!(storage.count_visited_urls().unwrap(), 6);

    let book = storage.get_book(101).unwrap().expect("book 101 stored");
    assert_eq!(book.title, "白夜行");
    assert_eq!(book.author, "作者");
    assert_eq!(book.rating, 9.1);

    let thread = storage.get_comments_for_book(101).unwrap();
    let ratings: Vec<(String, u8, u32)> = thread
        .iter()
        .map(|c| (c.user.clone(), c.rating, c.vote))
        .collect();
    assert!(ratings.contains(&("alice".to_string(), 5, 12)));
    assert!(ratings.contains(&("bob".to_string(), 4, 3)));
    assert!(ratings.contains(&("carol".to_string(), 1, 0)));

    let unknown_dropped = storage.get_comments_for_book(102).unwrap();
    assert_eq!(unknown_dropped.len(), 1);
    assert_eq!(unknown_dropped[0].user, "dave");

    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.totals, summary.totals);
}

#[tokio::test]
async fn test_second_run_skips_visited_pages() {
    let mock_server = MockServer::start().await;
    mount_fiction_site(&mock_server).await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("crawl.db");
    let config = create_test_config(&mock_server.uri(), &db_path, false);

    Coordinator::new(&config, "hash", false)
        .unwrap()
        .run()
        .await
        .unwrap();

    let second = Coordinator::new(&config, "hash", false)
        .unwrap()
        .run()
        .await
        .unwrap();

    // Every page is fetched again for pagination, but nothing is extracted
    assert_eq!(second.totals.pages_crawled, 7);
    assert_eq!(second.totals.books_scraped, 0);
    assert_eq!(second.totals.comments_scraped, 0);

    let storage = SqliteStorage::new(&db_path).unwrap();
    assert_eq!(storage.count_books().unwrap(), 3);
    assert_eq!(storage.count_comments().unwrap(), 4);
    assert_eq!(storage.count_visited_urls().unwrap(), 6);
}

#[tokio::test]
async fn test_fresh_run_scrapes_again() {
    let mock_server = MockServer::start().await;
    mount_fiction_site(&mock_server).await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("crawl.db");
    let config = create_test_config(&mock_server.uri(), &db_path, false);

    Coordinator::new(&config, "hash", false)
        .unwrap()
        .run()
        .await
        .unwrap();
    let fresh = Coordinator::new(&config, "hash", true)
        .unwrap()
        .run()
        .await
        .unwrap();

    // Books are keyed by id; comments are appended
    assert_eq!(fresh.totals.books_scraped, 0);
    assert_eq!(fresh.duplicate_books, 3);
    assert_eq!(fresh.totals.comments_scraped, 4);

    let storage = SqliteStorage::new(&db_path).unwrap();
    assert_eq!(storage.count_books().unwrap(), 3);
    assert_eq!(storage.count_comments().unwrap(), 8);
}

#[tokio::test]
async fn test_blocked_pages_are_retried() {
    let mock_server = MockServer::start().await;

    // The first hit on the tag index bounces, the first hit on the listing is forbidden
    Mock::given(method("GET"))
        .and(path("/tag/"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/misc/sorry"))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/tag/fiction"))
        .respond_with(ResponseTemplate::new(403))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/misc/sorry"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>sorry</html>"))
        .expect(0)
        .mount(&mock_server)
        .await;
    mount_fiction_site(&mock_server).await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("crawl.db");
    let config = create_test_config(&mock_server.uri(), &db_path, false);

    let summary = Coordinator::new(&config, "hash", false)
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(summary.retries, 2);
    assert_eq!(summary.totals.pages_crawled, 7);
    assert_eq!(summary.totals.books_scraped, 3);
    assert_eq!(summary.totals.comments_scraped, 4);
}

#[tokio::test]
async fn test_debug_mode_follows_single_path() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();

    mount_page(&mock_server, "/tag/", tag_index(&["fiction", "history"])).await;
    for (tag, first, second) in [("fiction", 201, 202), ("history", 301, 302)] {
        mount_page(
            &mock_server,
            &format!("/tag/{}", tag),
            listing(
                &[
                    book_item(&format!("{}/subject/{}/", base, first), "甲", "7.0"),
                    book_item(&format!("{}/subject/{}/", base, second), "乙", "8.0"),
                ],
                Some(&format!("/tag/{}/p2", tag)),
            ),
        )
        .await;
        for id in [first, second] {
            mount_page(
                &mock_server,
                &format!("/subject/{}/comments/", id),
                comments(
                    &[
                        comment_item("u1", "allstar50", 1),
                        comment_item("u2", "allstar20", 2),
                    ],
                    Some("hot"),
                ),
            )
            .await;
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("crawl.db");
    let config = create_test_config(&base, &db_path, true);

    let summary = Coordinator::new(&config, "hash", false)
        .unwrap()
        .run()
        .await
        .unwrap();

    // tag index, one listing, one comment page
    assert_eq!(summary.totals.pages_crawled, 3);
    assert_eq!(summary.totals.books_scraped, 1);
    assert_eq!(summary.totals.comments_scraped, 1);

    let storage = SqliteStorage::new(&db_path).unwrap();
    assert_eq!(storage.count_visited_urls().unwrap(), 2);
}

#[tokio::test]
async fn test_missing_and_off_site_pages() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();

    mount_page(&mock_server, "/tag/", tag_index(&["poetry"])).await;
    mount_page(
        &mock_server,
        "/tag/poetry",
        listing(
            &[
                book_item(&format!("{}/subject/401/", base), "飞鸟集", "8.7"),
                book_item("http://elsewhere.example/subject/402/", "Offsite", "6.0"),
            ],
            None,
        ),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/subject/401/comments/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("crawl.db");
    let config = create_test_config(&base, &db_path, false);

    let summary = Coordinator::new(&config, "hash", false)
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(summary.totals.pages_crawled, 2);
    assert_eq!(summary.totals.books_scraped, 2);
    assert_eq!(summary.dropped_pages, 1);
    assert_eq!(summary.filtered_requests, 1);

    let storage = SqliteStorage::new(&db_path).unwrap();
    assert!(storage.get_book(402).unwrap().is_some());
    assert_eq!(
        storage.get_latest_run().unwrap().unwrap().status,
        RunStatus::Completed
    );
}

#[tokio::test]
async fn test_interrupt_during_delayed_crawl() {
    let mock_server = MockServer::start().await;

    let tags: Vec<String> = (0..30).map(|i| format!("t{}", i)).collect();
    let tag_refs: Vec<&str> = tags.iter().map(String::as_str).collect();
    mount_page(&mock_server, "/tag/", tag_index(&tag_refs)).await;
    for tag in &tags {
        mount_page(&mock_server, &format!("/tag/{}", tag), listing(&[], None)).await;
    }

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("crawl.db");
    let mut config = create_test_config(&mock_server.uri(), &db_path, false);
    config.crawler.download_delay = 200;
    config.crawler.max_concurrent_requests = 2;

    let (stop, shutdown) = watch::channel(false);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        let _ = stop.send(true);
    });

    let start = Instant::now();
    let mut coordinator = Coordinator::new(&config, "hash", false).unwrap();
    let summary = coordinator.run_until(shutdown).await.unwrap();

    // Stops promptly instead of draining the remaining tags
    assert!(start.elapsed() < Duration::from_secs(3));

    // Pages fetched between delays are parsed as they arrive
    let pages = summary.totals.pages_crawled;
    assert!(pages >= 2, "only {} pages parsed", pages);
    assert!(pages < 31);

    let storage = SqliteStorage::new(&db_path).unwrap();
    assert_eq!(storage.count_visited_urls().unwrap(), pages - 1);

    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Interrupted);
    assert_eq!(run.totals, summary.totals);
}
