mod helpers;

use helpers::{memory_pool, StaticListFetcher};
use sinkhole_dns_application::ports::{
    BlockFilterEnginePort, BlockListRepository, DomainRepository,
};
use sinkhole_dns_application::services::{EngineEvent, EventBus};
use sinkhole_dns_domain::{BlockList, DomainEntry, DomainList, UpdateRequest};
use sinkhole_dns_infrastructure::dns::block_filter::{
    BlockFilterEngine, BlockFilterSettings, ListOutcome,
};
use sinkhole_dns_infrastructure::repositories::{
    SqliteBlockListRepository, SqliteDomainRepository,
};
use sqlx::SqlitePool;
use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

const LIST_A: &str = "https://lists.example/a.txt";
const LIST_B: &str = "https://lists.example/b.txt";
const REDIRECT: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);

struct Fixture {
    engine: Arc<BlockFilterEngine>,
    domains: Arc<SqliteDomainRepository>,
    lists: Arc<SqliteBlockListRepository>,
    fetcher: Arc<StaticListFetcher>,
    events: EventBus,
    pool: SqlitePool,
    dir: TempDir,
}

async fn fixture(fetcher: StaticListFetcher) -> Fixture {
    let pool = memory_pool().await;
    let domains = Arc::new(SqliteDomainRepository::new(pool.clone()));
    let lists = Arc::new(SqliteBlockListRepository::new(pool.clone()));
    let fetcher = Arc::new(fetcher);
    let events = EventBus::new();
    let dir = TempDir::new().unwrap();

    let engine = Arc::new(BlockFilterEngine::new(
        domains.clone(),
        lists.clone(),
        fetcher.clone(),
        events.clone(),
        BlockFilterSettings {
            lists_dir: dir.path().to_path_buf(),
            show_console_progress: false,
            queue_capacity: 4,
        },
    ));

    Fixture {
        engine,
        domains,
        lists,
        fetcher,
        events,
        pool,
        dir,
    }
}

fn request(urls: &[&str]) -> UpdateRequest {
    UpdateRequest::new(urls.iter().map(|u| Arc::from(*u)).collect(), REDIRECT)
}

async fn blocked_names(domains: &SqliteDomainRepository) -> Vec<String> {
    let mut names: Vec<String> = domains
        .names_in_list(DomainList::Blocked)
        .await
        .unwrap()
        .iter()
        .map(|n| n.to_string())
        .collect();
    names.sort();
    names
}

// ── matching ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_hierarchical_match() {
    let f = fixture(StaticListFetcher::new()).await;
    f.domains
        .upsert(&DomainEntry::blocked("ads.example.com", REDIRECT))
        .await
        .unwrap();

    assert!(f.engine.is_blocked("x.ads.example.com").await.unwrap());
    assert!(f.engine.is_blocked("ads.example.com").await.unwrap());
    assert!(f.engine.is_blocked("ADS.Example.com.").await.unwrap());
    assert!(!f.engine.is_blocked("example.com").await.unwrap());
    assert!(!f.engine.is_blocked("other.com").await.unwrap());
}

#[tokio::test]
async fn test_allowed_suffix_stops_walk() {
    let f = fixture(StaticListFetcher::new()).await;
    f.domains
        .upsert(&DomainEntry::blocked("example.com", REDIRECT))
        .await
        .unwrap();
    f.domains
        .upsert(&DomainEntry::new("safe.example.com", DomainList::Allowed))
        .await
        .unwrap();

    assert!(!f.engine.is_blocked("cdn.safe.example.com").await.unwrap());
    assert!(f.engine.is_blocked("ads.example.com").await.unwrap());
}

#[tokio::test]
async fn test_cached_verdict_survives_store_change_until_invalidated() {
    let f = fixture(StaticListFetcher::new()).await;
    let entry = DomainEntry::blocked("tracker.test", REDIRECT);
    f.domains.upsert(&entry).await.unwrap();

    assert!(f.engine.is_blocked("ads.tracker.test").await.unwrap());

    let rows = f.domains.lookup("tracker.test").await.unwrap();
    f.domains.delete_by_id(rows[0].id.unwrap()).await.unwrap();
    assert!(f.engine.is_blocked("ads.tracker.test").await.unwrap());

    f.engine.invalidate("tracker.test");
    assert!(!f.engine.is_blocked("ads.tracker.test").await.unwrap());
}

#[tokio::test]
async fn test_duplicate_rows_pruned_keep_first() {
    let f = fixture(StaticListFetcher::new()).await;
    let mut first = DomainEntry::blocked("dup.example", REDIRECT);
    first.category = Some(Arc::from("first"));
    f.domains.insert_if_missing(&first).await.unwrap();

    sqlx::query("INSERT INTO domains (name, list, category) VALUES (?, 'unlisted', 'second')")
        .bind("dup.example")
        .execute(&f.pool)
        .await
        .unwrap();
    assert_eq!(f.domains.lookup("dup.example").await.unwrap().len(), 2);

    assert!(f.engine.is_blocked("dup.example").await.unwrap());

    let remaining = f.domains.lookup("dup.example").await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].category.as_deref(), Some("first"));
}

// ── ingestion ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_download_yields_single_blocked_domain() {
    let f = fixture(
        StaticListFetcher::new().with_list(LIST_A, "0.0.0.0 bad.example\n# comment\n\n"),
    )
    .await;

    f.engine.process_request(request(&[LIST_A])).await;

    assert_eq!(blocked_names(&f.domains).await, vec!["bad.example"]);
    let list = f.lists.get_by_url(LIST_A).await.unwrap().unwrap();
    assert_eq!(list.entry_count, 1);
    assert!(list.last_updated.is_some());
    assert!(f.dir.path().join(list.snapshot_file_name()).exists());
    assert!(f.engine.is_blocked("bad.example").await.unwrap());
}

#[tokio::test]
async fn test_allow_list_precedence() {
    let f = fixture(StaticListFetcher::new().with_list(
        LIST_A,
        "0.0.0.0 good.example\n0.0.0.0 bad.example\n",
    ))
    .await;
    f.domains
        .upsert(&DomainEntry::new("good.example", DomainList::Allowed))
        .await
        .unwrap();

    f.engine.process_request(request(&[LIST_A])).await;

    assert_eq!(blocked_names(&f.domains).await, vec!["bad.example"]);
    assert!(!f.engine.is_blocked("good.example").await.unwrap());
}

#[tokio::test]
async fn test_recently_updated_list_not_downloaded() {
    let f = fixture(StaticListFetcher::new().with_list(LIST_A, "bad.example\n")).await;
    let mut list = BlockList::new(LIST_A);
    list.last_updated = Some(chrono::Utc::now().timestamp() - 60);
    f.lists.upsert(&list).await.unwrap();

    let outcome = f
        .engine
        .process_list(&Arc::from(LIST_A), REDIRECT, &HashSet::new())
        .await
        .unwrap();

    assert_eq!(outcome, ListOutcome::Fresh);
    assert_eq!(f.fetcher.downloads(), 0);
}

#[tokio::test]
async fn test_disabled_list_skipped() {
    let f = fixture(StaticListFetcher::new().with_list(LIST_A, "bad.example\n")).await;
    let mut list = BlockList::new(LIST_A);
    list.enabled = false;
    f.lists.upsert(&list).await.unwrap();

    let outcome = f
        .engine
        .process_list(&Arc::from(LIST_A), REDIRECT, &HashSet::new())
        .await
        .unwrap();

    assert_eq!(outcome, ListOutcome::Disabled);
    assert_eq!(f.fetcher.downloads(), 0);
    assert!(blocked_names(&f.domains).await.is_empty());
}

#[tokio::test]
async fn test_concurrent_requests_download_once() {
    let f = fixture(StaticListFetcher::new().with_list(LIST_A, "bad.example\n")).await;
    f.fetcher.set_delay(Duration::from_millis(50));
    let url: Arc<str> = Arc::from(LIST_A);
    let allowed = HashSet::new();

    let (first, second) = tokio::join!(
        f.engine.process_list(&url, REDIRECT, &allowed),
        f.engine.process_list(&url, REDIRECT, &allowed),
    );

    let mut outcomes = vec![first.unwrap(), second.unwrap()];
    outcomes.sort_by_key(|o| matches!(o, ListOutcome::Fresh));
    assert_eq!(outcomes[0], ListOutcome::Updated { entries: 1 });
    assert_eq!(outcomes[1], ListOutcome::Fresh);
    assert_eq!(f.fetcher.downloads(), 1);
}

#[tokio::test]
async fn test_lists_with_similar_urls_keep_separate_snapshots() {
    const NESTED: &str = "https://lists.example/a/b.txt";
    const FLAT: &str = "https://lists.example/a_b.txt";
    let f = fixture(
        StaticListFetcher::new()
            .with_list(NESTED, "from-nested.example\n")
            .with_list(FLAT, "from-flat.example\n"),
    )
    .await;
    f.fetcher.set_settle(Duration::from_millis(50));
    let allowed = HashSet::new();

    let nested_url: Arc<str> = Arc::from(NESTED);
    let flat_url: Arc<str> = Arc::from(FLAT);
    let (nested, flat) = tokio::join!(
        f.engine.process_list(&nested_url, REDIRECT, &allowed),
        f.engine.process_list(&flat_url, REDIRECT, &allowed),
    );

    assert_eq!(nested.unwrap(), ListOutcome::Updated { entries: 1 });
    assert_eq!(flat.unwrap(), ListOutcome::Updated { entries: 1 });
    assert_eq!(
        blocked_names(&f.domains).await,
        vec!["from-flat.example", "from-nested.example"]
    );

    for (url, body) in [(NESTED, "from-nested.example\n"), (FLAT, "from-flat.example\n")] {
        let list = f.lists.get_by_url(url).await.unwrap().unwrap();
        let snapshot = f.dir.path().join(list.snapshot_file_name());
        assert_eq!(std::fs::read_to_string(snapshot).unwrap(), body);
    }
}

#[tokio::test]
async fn test_failed_download_keeps_previous_state_and_siblings_continue() {
    let f = fixture(
        StaticListFetcher::new()
            .with_list(LIST_A, "old.example\n")
            .with_list(LIST_B, "other.example\n"),
    )
    .await;

    f.engine.process_request(request(&[LIST_A])).await;
    let before = f.lists.get_by_url(LIST_A).await.unwrap().unwrap();

    // Force A past the staleness window and make it fail.
    let mut stale = before.clone();
    stale.last_updated = Some(0);
    f.lists.upsert(&stale).await.unwrap();
    f.fetcher.remove_list(LIST_A);

    f.engine.process_request(request(&[LIST_A, LIST_B])).await;

    let after = f.lists.get_by_url(LIST_A).await.unwrap().unwrap();
    assert_eq!(after.entry_count, before.entry_count);
    assert_eq!(after.last_updated, Some(0));
    let snapshot = f.dir.path().join(after.snapshot_file_name());
    assert_eq!(std::fs::read_to_string(snapshot).unwrap(), "old.example\n");
    assert_eq!(
        blocked_names(&f.domains).await,
        vec!["old.example", "other.example"]
    );
}

#[tokio::test]
async fn test_consumer_processes_queue_and_publishes_counts() {
    let f = fixture(StaticListFetcher::new().with_list(LIST_A, "a.example\nb.example\n")).await;
    f.domains
        .upsert(&DomainEntry::new("c.example", DomainList::Allowed))
        .await
        .unwrap();
    let mut rx = f.events.subscribe();
    let cancel = CancellationToken::new();

    let handle = f.engine.clone().start(cancel.clone()).unwrap();
    assert!(f.engine.clone().start(cancel.clone()).is_none());

    f.engine.enqueue(request(&[LIST_A])).await.unwrap();

    let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        event,
        EngineEvent::BlockListCountChanged {
            blocked: 2,
            allowed: 1
        }
    );
    let counters = f.engine.counters();
    assert_eq!(counters.blocked_domains, 2);
    assert_eq!(counters.allowed_domains, 1);
    assert!(f.engine.running_downloads().is_empty());

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_blocked_request_counter() {
    let f = fixture(StaticListFetcher::new()).await;
    f.engine.record_blocked_request();
    f.engine.record_blocked_request();
    assert_eq!(f.engine.counters().blocked_requests, 2);
}
