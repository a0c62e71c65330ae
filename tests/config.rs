use assert_matches::assert_matches;
use camino::Utf8PathBuf;
use chrono::NaiveDate;

use covid_charts::config::{ConfigLoader, FreshnessPolicy};
use covid_charts::error::CovidError;

fn write_config(dir: &tempfile::TempDir, content: &str) -> String {
    let path = dir.path().join("covid-charts.json");
    std::fs::write(&path, content).unwrap();
    path.to_string_lossy().to_string()
}

#[test]
fn calendar_day_policy_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        &dir,
        r#"{"cache_dir": "/var/tmp/covid", "freshness": "calendar-day", "start_date": "2020-04-01"}"#,
    );

    let resolved = ConfigLoader::resolve(Some(path.as_str())).unwrap();
    assert_eq!(resolved.cache_dir, Utf8PathBuf::from("/var/tmp/covid"));
    assert_eq!(resolved.freshness, FreshnessPolicy::CalendarDay);
    assert_eq!(
        resolved.start_date,
        NaiveDate::from_ymd_opt(2020, 4, 1).unwrap()
    );
}

#[test]
fn custom_window_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, r#"{"cache_dir": "cache", "freshness": {"window_hours": 12}}"#);

    let resolved = ConfigLoader::resolve(Some(path.as_str())).unwrap();
    assert_eq!(resolved.freshness, FreshnessPolicy::Window { hours: 12 });
}

#[test]
fn unknown_freshness_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, r#"{"cache_dir": "cache", "freshness": "weekly"}"#);

    let err = ConfigLoader::resolve(Some(path.as_str())).unwrap_err();
    assert_matches!(err, CovidError::InvalidFreshness(ref value) if value == "weekly");
}

#[test]
fn bad_start_date_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, r#"{"cache_dir": "cache", "start_date": "3/1/20"}"#);

    let err = ConfigLoader::resolve(Some(path.as_str())).unwrap_err();
    assert_matches!(err, CovidError::InvalidStartDate(_));
}

#[test]
fn explicit_missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.json");

    let err = ConfigLoader::resolve(path.to_str()).unwrap_err();
    assert_matches!(err, CovidError::ConfigRead(_));
}

#[test]
fn malformed_json_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "{ not json");

    let err = ConfigLoader::resolve(Some(path.as_str())).unwrap_err();
    assert_matches!(err, CovidError::ConfigParse(_));
}
