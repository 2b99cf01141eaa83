//! Usage-log scenarios through the public API.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use futures::future::join_all;
use genlog_core::row::parse_table;
use genlog_core::{ImageFormat, LogEntry, LogTable};
use genlog_fetch::RetryStrategy;
use genlog_store::{LogError, MemoryLogStore, append, append_with_retry};

const FOLDER: &str = "shared-drive-folder";
const TABLE: &str = "usage_log.csv";
const HEADER: &str = "Timestamp,User,ImageFile,Prompt\n";

fn table() -> LogTable {
    LogTable::in_container(FOLDER)
}

#[tokio::test]
async fn sato_on_the_moon_is_byte_exact() {
    let store = MemoryLogStore::new();
    let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let entry = LogEntry::for_artifact(ts, "sato", ImageFormat::Png, "cat, \"on the moon\"");
    assert_eq!(entry.artifact_name(), "20240101_000000_sato.png");

    append(&entry, &table(), &store).await.unwrap();

    assert_eq!(
        store.text_of(FOLDER, TABLE).unwrap(),
        "Timestamp,User,ImageFile,Prompt\n2024-01-01T00:00:00Z,sato,20240101_000000_sato.png,\"cat, \"\"on the moon\"\"\"\n"
    );
    assert_eq!(store.mime_type_of(FOLDER, TABLE).as_deref(), Some("text/csv"));
}

#[tokio::test]
async fn awkward_prompt_round_trips_through_the_table() {
    let store = MemoryLogStore::new();
    let ts = Utc.with_ymd_and_hms(2024, 6, 30, 23, 59, 59).unwrap();
    let prompt = "a \"quoted\" fox,\njumping over\r\nthe fence";
    let entry = LogEntry::new(ts, "tanaka", "20240630_235959_tanaka.png", prompt);

    append(&entry, &table(), &store).await.unwrap();
    append(&entry, &table(), &store).await.unwrap();

    let rows = parse_table(&store.text_of(FOLDER, TABLE).unwrap()).unwrap();
    assert_eq!(rows, vec![entry.clone(), entry]);
}

#[tokio::test]
async fn racing_first_writers_report_duplicate_table() {
    let store = MemoryLogStore::new();
    store.concurrent_create_after_next_create(FOLDER, TABLE, HEADER.as_bytes());

    let ts = Utc.with_ymd_and_hms(2024, 2, 2, 2, 2, 2).unwrap();
    let entry = LogEntry::new(ts, "ito", "a.png", "first");
    let err = append_with_retry(&entry, &table(), &store, &RetryStrategy::new(5))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        LogError::DuplicateTable {
            name: TABLE.to_string(),
            count: 2
        }
    );
    assert_eq!(store.calls().creates, 1);

    // The row landed in the table this call created.
    let tables = store.contents_of(FOLDER, TABLE);
    let ours = String::from_utf8(tables[0].clone()).unwrap();
    assert_eq!(parse_table(&ours).unwrap().len(), 1);
}

#[tokio::test]
async fn concurrent_appends_lose_no_rows() {
    const WRITERS: u32 = 8;

    let store = Arc::new(MemoryLogStore::new().with_latency(Duration::from_millis(5)));
    store.seed(FOLDER, TABLE, HEADER.as_bytes());
    let strategy = RetryStrategy::new(WRITERS + 2)
        .with_base_delay(Duration::from_millis(1))
        .with_exponential_backoff(false);

    let tasks = (0..WRITERS).map(|i| {
        let store = Arc::clone(&store);
        let strategy = strategy.clone();
        tokio::spawn(async move {
            let ts = Utc.with_ymd_and_hms(2024, 3, 3, 3, 3, i).unwrap();
            let entry = LogEntry::new(ts, format!("user{i}"), format!("{i}.png"), format!("prompt {i}"));
            append_with_retry(&entry, &LogTable::in_container(FOLDER), &*store, &strategy).await
        })
    });

    for result in join_all(tasks).await {
        result.unwrap().unwrap();
    }

    let rows = parse_table(&store.text_of(FOLDER, TABLE).unwrap()).unwrap();
    assert_eq!(rows.len(), WRITERS as usize);

    let mut users: Vec<&str> = rows.iter().map(LogEntry::user).collect();
    users.sort_unstable();
    users.dedup();
    assert_eq!(users.len(), WRITERS as usize);
    assert!(store.calls().updates > WRITERS as usize, "expected some conflicts");
}

#[tokio::test]
async fn header_is_written_once() {
    let store = MemoryLogStore::new();
    for i in 0..3 {
        let ts = Utc.with_ymd_and_hms(2024, 4, 4, 4, 4, i).unwrap();
        append(&LogEntry::new(ts, "kato", "k.png", "x"), &table(), &store)
            .await
            .unwrap();
    }

    let text = store.text_of(FOLDER, TABLE).unwrap();
    assert_eq!(text.matches("Timestamp,User,ImageFile,Prompt").count(), 1);
    assert_eq!(text.lines().count(), 4);
}
