#![allow(dead_code)]

use std::path::PathBuf;

use tempfile::TempDir;
use usagegraph_core::{DailyAggregate, TokenUsage, UsageEvent, aggregate_events};
use usagegraph_db::Db;

pub struct TestDb {
    pub _dir: TempDir,
    pub db: Db,
    pub path: PathBuf,
}

pub fn setup_db() -> TestDb {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("test.sqlite");
    let mut db = Db::open(&path).expect("open db");
    db.migrate().expect("migrate db");
    TestDb {
        _dir: dir,
        db,
        path,
    }
}

pub fn make_event(date: &str, source: &str, model: &str, input: u64, cost: f64) -> UsageEvent {
    UsageEvent {
        date: date.to_string(),
        source: source.to_string(),
        model: model.to_string(),
        tokens: TokenUsage {
            input,
            output: input / 10,
            cache_read: 0,
            cache_write: 0,
            reasoning: 0,
        },
        cost,
        messages: 1,
    }
}

pub fn days_from(events: &[UsageEvent]) -> Vec<DailyAggregate> {
    aggregate_events(events)
}
