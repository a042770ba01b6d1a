use std::fs::{self, OpenOptions};
use std::io::Write;

use serde::{Deserialize, Serialize};
use tempfile::TempDir;

use drafter_audit::log;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Cycle {
    status: String,
    #[serde(default)]
    tag: Option<String>,
    notes: String,
}

fn cycle(status: &str, tag: Option<&str>) -> Cycle {
    Cycle {
        status: status.to_string(),
        tag: tag.map(str::to_string),
        notes: String::new(),
    }
}

#[test]
fn missing_log_reads_as_empty() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nope.jsonl");
    assert!(log::latest::<Cycle>(&path).unwrap().is_none());
    assert!(log::find::<Cycle>(&path, "x").unwrap().is_none());
    assert!(log::entries::<Cycle>(&path).unwrap().is_empty());
}

#[test]
fn record_writes_one_flat_line_per_call() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("state/audit.jsonl");

    let stamp = log::record(&path, &cycle("planned", None)).unwrap();
    log::record(&path, &cycle("committed", Some("drafter-20240101-000000"))).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(first["timestamp"], serde_json::json!(stamp));
    assert_eq!(first["status"], serde_json::json!("planned"));
    assert!(first.get("record").is_none(), "record fields are flattened");
}

#[test]
fn latest_returns_final_line() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("audit.jsonl");
    for status in ["no_changes", "planned", "pushed"] {
        log::record(&path, &cycle(status, None)).unwrap();
    }
    let latest = log::latest::<Cycle>(&path).unwrap().unwrap();
    assert_eq!(latest.record.status, "pushed");
}

#[test]
fn latest_handles_lines_longer_than_the_tail_window() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("audit.jsonl");
    log::record(&path, &cycle("first", None)).unwrap();
    let mut big = cycle("big", None);
    big.notes = "n".repeat(10_000);
    log::record(&path, &big).unwrap();

    let latest = log::latest::<Cycle>(&path).unwrap().unwrap();
    assert_eq!(latest.record.status, "big");
    assert_eq!(latest.record.notes.len(), 10_000);
}

#[test]
fn latest_ignores_trailing_blank_lines_and_single_line_files() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("audit.jsonl");
    log::record(&path, &cycle("only", None)).unwrap();
    OpenOptions::new()
        .append(true)
        .open(&path)
        .unwrap()
        .write_all(b"\n\n")
        .unwrap();
    assert_eq!(log::latest::<Cycle>(&path).unwrap().unwrap().record.status, "only");
}

#[test]
fn malformed_final_line_yields_none_but_scans_skip_it() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("audit.jsonl");
    log::record(&path, &cycle("good", Some("t1"))).unwrap();
    OpenOptions::new()
        .append(true)
        .open(&path)
        .unwrap()
        .write_all(b"{not json\n")
        .unwrap();

    assert!(log::latest::<Cycle>(&path).unwrap().is_none());
    assert_eq!(log::entries::<Cycle>(&path).unwrap().len(), 1);
    assert!(log::find::<Cycle>(&path, "t1").unwrap().is_some());
}

#[test]
fn find_matches_tag_or_timestamp_and_returns_first() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("audit.jsonl");
    let stamp = log::record(&path, &cycle("planned", None)).unwrap();
    log::record(&path, &cycle("committed", Some("drafter-a"))).unwrap();
    log::record(&path, &cycle("pushed", Some("drafter-a"))).unwrap();

    let by_tag = log::find::<Cycle>(&path, "drafter-a").unwrap().unwrap();
    assert_eq!(by_tag.record.status, "committed");

    let by_time = log::find::<Cycle>(&path, &stamp).unwrap().unwrap();
    assert_eq!(by_time.record.status, "planned");

    assert!(log::find::<Cycle>(&path, "drafter-b").unwrap().is_none());
}

#[test]
fn scans_skip_lines_that_are_not_utf8() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("audit.jsonl");
    log::record(&path, &cycle("committed", Some("t1"))).unwrap();
    OpenOptions::new()
        .append(true)
        .open(&path)
        .unwrap()
        .write_all(b"{\"bad\xff\xfe\"}\n")
        .unwrap();
    log::record(&path, &cycle("pushed", Some("t2"))).unwrap();

    let found = log::find::<Cycle>(&path, "t2").unwrap().unwrap();
    assert_eq!(found.record.status, "pushed");

    let all = log::entries::<Cycle>(&path).unwrap();
    let tags: Vec<_> = all.iter().filter_map(|e| e.record.tag.as_deref()).collect();
    assert_eq!(tags, ["t1", "t2"]);
}
