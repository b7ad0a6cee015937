//! Download matching tests against a scripted job listing.

mod common;

use common::{fast_settings, names, ScriptedForm};
use foldbatch::{DownloadMatcher, FoldError};

#[tokio::test]
async fn test_downloads_only_manifest_rows() {
    let dir = tempfile::tempdir().unwrap();
    let form = ScriptedForm::listing(&["A", "B", "C"]);
    let settings = fast_settings();

    let report = DownloadMatcher::new(&form, &settings, dir.path())
        .run(&names(&["A", "C"]))
        .await
        .unwrap();

    assert_eq!(form.state().downloads, vec!["A", "C"]);
    assert_eq!(report.artifacts.len(), 2);
    assert_eq!(report.unlisted, vec!["B"]);
    assert!(report.missing.is_empty());
    assert!(report.success());

    let a = std::fs::read_to_string(dir.path().join("A.zip")).unwrap();
    assert_eq!(a, "archive:A");
    assert!(dir.path().join("C.zip").exists());
    assert!(!dir.path().join("B.zip").exists());
    assert_eq!(report.artifacts[0].local_path, dir.path().join("A.zip"));
    assert_eq!(report.artifacts[0].bytes, "archive:A".len() as u64);
}

#[tokio::test]
async fn test_names_match_exactly_after_trim() {
    let dir = tempfile::tempdir().unwrap();
    let form = ScriptedForm::listing(&["fold_1", "Fold_1", "fold_10"]);
    let settings = fast_settings();

    let report = DownloadMatcher::new(&form, &settings, dir.path())
        .run(&names(&["fold_1"]))
        .await
        .unwrap();

    assert_eq!(form.state().downloads, vec!["fold_1"]);
    assert_eq!(report.listed, vec!["fold_1", "Fold_1", "fold_10"]);
}

#[tokio::test]
async fn test_first_row_wins_for_duplicate_names() {
    let dir = tempfile::tempdir().unwrap();
    let form = ScriptedForm::listing(&["A", "A", "B"]);
    let settings = fast_settings();

    let report = DownloadMatcher::new(&form, &settings, dir.path())
        .run(&names(&["A", "B"]))
        .await
        .unwrap();

    assert_eq!(form.state().downloads, vec!["A", "B"]);
    assert_eq!(report.duplicates, vec!["A"]);
}

#[tokio::test]
async fn test_reports_manifest_names_not_listed() {
    let dir = tempfile::tempdir().unwrap();
    let form = ScriptedForm::listing(&["A"]);
    let settings = fast_settings();

    let report = DownloadMatcher::new(&form, &settings, dir.path())
        .run(&names(&["A", "Z", "Y", "Z"]))
        .await
        .unwrap();

    assert_eq!(report.missing, vec!["Z", "Y"]);
    assert!(report.success());
}

#[tokio::test]
async fn test_unsafe_name_is_not_written() {
    let dir = tempfile::tempdir().unwrap();
    let form = ScriptedForm::listing(&["../escape", "ok"]);
    let settings = fast_settings();

    let report = DownloadMatcher::new(&form, &settings, dir.path())
        .run(&names(&["../escape", "ok"]))
        .await
        .unwrap();

    assert_eq!(form.state().downloads, vec!["ok"]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].task_name, "../escape");
    assert!(!report.success());
}

#[tokio::test]
async fn test_existing_archive_is_overwritten() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("A.zip"), "stale archive from an earlier run").unwrap();
    let form = ScriptedForm::listing(&["A"]);
    let settings = fast_settings();

    DownloadMatcher::new(&form, &settings, dir.path())
        .run(&names(&["A"]))
        .await
        .unwrap();

    let a = std::fs::read_to_string(dir.path().join("A.zip")).unwrap();
    assert_eq!(a, "archive:A");
}

#[tokio::test]
async fn test_creates_output_dir() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("nested").join("downloads");
    let form = ScriptedForm::listing(&["A"]);
    let settings = fast_settings();

    let matcher = DownloadMatcher::new(&form, &settings, &out);
    assert_eq!(matcher.artifact_path("A"), out.join("A.zip"));
    matcher.run(&names(&["A"])).await.unwrap();

    assert!(out.join("A.zip").exists());
}

#[tokio::test]
async fn test_filters_applied_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let form = ScriptedForm::with(|s| {
        s.rows = vec!["A".into()];
        s.missing_chips.insert("Examples".into());
    });
    let settings = fast_settings();

    DownloadMatcher::new(&form, &settings, dir.path())
        .run(&names(&["A"]))
        .await
        .unwrap();

    assert_eq!(
        form.state().filters_clicked,
        vec!["Saved draft", "In progress", "Failed"]
    );
}

#[tokio::test]
async fn test_missing_table_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let form = ScriptedForm::with(|s| {
        s.missing.insert(common::Role::JobTable);
    });
    let settings = fast_settings();

    let err = DownloadMatcher::new(&form, &settings, dir.path())
        .run(&names(&["A"]))
        .await
        .unwrap_err();

    assert!(matches!(err, FoldError::Precondition(_)));
    assert!(form.state().downloads.is_empty());
}

#[tokio::test]
async fn test_missing_download_link_is_row_failure() {
    let dir = tempfile::tempdir().unwrap();
    let form = ScriptedForm::with(|s| {
        s.rows = vec!["A".into(), "B".into()];
        s.missing.insert(common::Role::DownloadItem);
    });
    let settings = fast_settings();

    let report = DownloadMatcher::new(&form, &settings, dir.path())
        .run(&names(&["A", "B"]))
        .await
        .unwrap();

    assert!(report.artifacts.is_empty());
    let failed: Vec<&str> = report.failures.iter().map(|f| f.task_name.as_str()).collect();
    assert_eq!(failed, vec!["A", "B"]);
}

#[tokio::test]
async fn test_failed_row_query_is_an_error_not_an_empty_listing() {
    let dir = tempfile::tempdir().unwrap();
    let form = ScriptedForm::with(|s| {
        s.rows = vec!["A".into()];
        s.listing_fails = true;
    });
    let settings = fast_settings();

    let err = DownloadMatcher::new(&form, &settings, dir.path())
        .run(&names(&["A"]))
        .await
        .unwrap_err();

    assert!(matches!(err, FoldError::Script(_)));
    assert!(form.state().downloads.is_empty());
}

#[tokio::test]
async fn test_row_handles_released_after_run() {
    let dir = tempfile::tempdir().unwrap();
    let form = ScriptedForm::listing(&["A", "B"]);
    let settings = fast_settings();

    DownloadMatcher::new(&form, &settings, dir.path())
        .run(&names(&["A"]))
        .await
        .unwrap();

    let state = form.state();
    assert_eq!(state.handle_releases, 1);
}
