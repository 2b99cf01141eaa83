//! Integration tests for log row encoding.

use chrono::{TimeZone, Utc};
use genlog_core::row::{new_table_content, parse_row, parse_table, serialize_row};
use genlog_core::{LineTerminator, LogEntry};

fn moon_entry() -> LogEntry {
    LogEntry::new(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        "sato",
        "20240101_000000_sato.png",
        "cat, \"on the moon\"",
    )
}

#[test]
fn test_new_table_matches_reference_bytes() {
    let content = new_table_content(&moon_entry(), LineTerminator::Lf).unwrap();
    assert_eq!(
        content,
        "Timestamp,User,ImageFile,Prompt\n\
         2024-01-01T00:00:00Z,sato,20240101_000000_sato.png,\"cat, \"\"on the moon\"\"\"\n"
    );
}

#[test]
fn test_prompt_with_comma_quote_and_newline_roundtrips() {
    let prompts = [
        "a, b",
        "say \"cheese\"",
        "first line\nsecond line",
        "windows\r\nline",
        "all of them: \"x\", y\nz",
        "",
        "  padded  ",
    ];

    for prompt in prompts {
        let entry = LogEntry::new(Utc::now(), "kim", "x.png", prompt);
        let row = serialize_row(&entry, LineTerminator::Lf).unwrap();
        assert_eq!(parse_row(&row).unwrap(), entry, "round-trip failed for {prompt:?}");

        let row = serialize_row(&entry, LineTerminator::CrLf).unwrap();
        assert_eq!(parse_row(&row).unwrap(), entry, "CRLF round-trip failed for {prompt:?}");
    }
}

#[test]
fn test_table_without_header_still_parses() {
    let text = "2024-01-01T00:00:00Z,sato,a.png,cat\n2024-01-01T00:00:01Z,kim,b.png,dog\n";
    let entries = parse_table(text).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1].user(), "kim");
}
