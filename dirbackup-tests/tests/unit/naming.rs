//! Unit tests for backup naming

use chrono::{Duration, NaiveDate};
use dirbackup::naming::BackupName;
use test_utils::base_time;

#[test]
fn test_name_embeds_timestamp() {
    let name = BackupName::generate("app", base_time());
    assert_eq!(name.as_str(), "app-2026-10-14T02-00-00");
}

#[test]
fn test_dots_replaced() {
    let name = BackupName::generate("example.com", base_time());
    assert_eq!(name.to_string(), "example_com-2026-10-14T02-00-00");
}

#[test]
fn test_names_sort_chronologically() {
    let times = [
        base_time(),
        base_time() + Duration::seconds(59),
        base_time() + Duration::days(1),
        NaiveDate::from_ymd_opt(2027, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap(),
    ];

    let names: Vec<BackupName> = times.iter().map(|t| BackupName::generate("db", *t)).collect();
    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(names, sorted);
}

#[test]
fn test_suffix_keeps_prefix() {
    let name = BackupName::generate("db", base_time());
    assert_eq!(name.with_suffix(2).as_str(), "db-2026-10-14T02-00-00-2");
}
