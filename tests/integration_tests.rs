// Integration tests for the public API surface: configuration, errors and
// link extraction. PDFs are built in memory, so no fixtures are needed.

mod common;

use attachment_harvester::{
    discover_documents, ExtractedLink, HarvestConfig, HarvestError, LinkKind, PdfAnalyzer,
    RetryPolicy,
};
use common::{pdf_bytes, Annot};
use std::path::PathBuf;
use std::time::Duration;

// ── HarvestConfig ────────────────────────────────────────────────────────────

#[test]
fn default_config_uses_per_document_folders() {
    let cfg = HarvestConfig::default();
    assert!(cfg.per_document_subfolders);
    assert!(!cfg.suppress_401_failures);
    assert_eq!(cfg.request_timeout, Duration::from_secs(15));
    assert_eq!(cfg.max_folder_name_len, 80);
    assert_eq!(cfg.retry, RetryPolicy::default());
    assert_eq!(cfg.retry.max_attempts, 1);
    cfg.validate().unwrap();
}

#[test]
fn toml_overrides_only_the_given_keys() {
    let cfg = HarvestConfig::from_toml_str(
        r#"
        source_dir = "./Transmittals"
        per_document_subfolders = false
        request_timeout_secs = 2.5

        [retry]
        max_attempts = 3
        "#,
    )
    .unwrap();

    assert_eq!(cfg.source_dir, PathBuf::from("./Transmittals"));
    assert_eq!(cfg.dest_dir, PathBuf::from("./attachments"));
    assert!(!cfg.per_document_subfolders);
    assert_eq!(cfg.request_timeout, Duration::from_millis(2500));
    assert_eq!(cfg.retry.max_attempts, 3);
    assert_eq!(cfg.retry.backoff_base_secs, 1.8);
}

#[test]
fn toml_file_is_loaded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("harvest.toml");
    std::fs::write(&path, "suppress_401_failures = true\n").unwrap();

    let cfg = HarvestConfig::from_toml_file(&path).unwrap();
    assert!(cfg.suppress_401_failures);
}

#[test]
fn invalid_settings_are_rejected() {
    for text in [
        "request_timeout_secs = 0",
        "max_folder_name_len = 0",
        "[retry]\nmax_attempts = 0",
        "request_timeout_secs = -1",
        "request_timeout_secs = 1e30",
        "request_timeout_secs = 1e12",
        "request_timeout_secs = nan",
        "unknown_type = [",
    ] {
        let err = HarvestConfig::from_toml_str(text).unwrap_err();
        assert!(matches!(err, HarvestError::Config(_)), "{text}: {err:?}");
    }
}

#[test]
fn backoff_grows_with_each_attempt() {
    let policy = RetryPolicy::default();
    assert!((policy.backoff(1).as_secs_f64() - 1.1).abs() < 1e-9);
    assert!(policy.backoff(2) > policy.backoff(1));
    assert!(policy.backoff(3) > policy.backoff(2));

    assert!(RetryPolicy::is_retryable_status(503));
    assert!(RetryPolicy::is_retryable_status(429));
    assert!(!RetryPolicy::is_retryable_status(404));
    assert!(!RetryPolicy::is_retryable_status(401));
}

#[test]
fn huge_backoff_base_saturates_instead_of_panicking() {
    let cfg =
        HarvestConfig::from_toml_str("[retry]\nmax_attempts = 3\nbackoff_base_secs = 1e20")
            .unwrap();
    assert_eq!(cfg.retry.backoff(2), RetryPolicy::MAX_BACKOFF);
    assert_eq!(cfg.retry.backoff(3), RetryPolicy::MAX_BACKOFF);
    assert_eq!(cfg.retry.backoff(u32::MAX), RetryPolicy::MAX_BACKOFF);
}

// ── Link extraction ──────────────────────────────────────────────────────────

#[test]
fn links_come_back_in_page_then_annotation_order() {
    let bytes = pdf_bytes(&[
        vec![
            Annot::uri("https://a.example/1.pdf"),
            Annot::GoTo,
            Annot::InlineUri("mailto:pm@site.example".into()),
        ],
        vec![
            Annot::Widget("https://form.example/submit".into()),
            Annot::uri("https://a.example/2.pdf"),
        ],
        vec![],
    ]);

    let analyzer = PdfAnalyzer::from_bytes(&bytes).unwrap();
    assert_eq!(analyzer.page_count(), 3);
    assert_eq!(
        analyzer.extract_uris(),
        vec![
            "https://a.example/1.pdf",
            "mailto:pm@site.example",
            "https://a.example/2.pdf",
        ]
    );
    assert_eq!(analyzer.link_count(), 3);
    assert_eq!(analyzer.downloadable_link_count(), 2);

    let indices: Vec<usize> = analyzer.extract_links().iter().map(|l| l.index).collect();
    assert_eq!(indices, vec![0, 1, 2]);
}

#[test]
fn document_without_annotations_has_no_links() {
    let analyzer = PdfAnalyzer::from_bytes(&pdf_bytes(&[vec![]])).unwrap();
    assert!(analyzer.extract_links().is_empty());
}

#[test]
fn link_classification_is_case_insensitive() {
    assert_eq!(LinkKind::classify("MAILTO:a@b.c"), LinkKind::Mailto);
    assert_eq!(LinkKind::classify("HTTPS://x.example/a"), LinkKind::Http);
    assert_eq!(LinkKind::classify("ftp://x.example/a"), LinkKind::NonHttp);
    assert_eq!(LinkKind::classify("www.example.com"), LinkKind::NonHttp);
    assert!(ExtractedLink::new(0, "http://x.example").kind().is_downloadable());
}

// ── Errors ───────────────────────────────────────────────────────────────────

#[test]
fn garbage_bytes_are_a_document_open_error() {
    let err = PdfAnalyzer::from_bytes(b"definitely not a pdf").unwrap_err();
    assert!(matches!(err, HarvestError::DocumentOpen { .. }), "{err:?}");
    assert!(err.to_string().starts_with("cannot open PDF"));
}

#[test]
fn error_messages_name_the_folder() {
    let err = HarvestError::NoDocuments(PathBuf::from("/data/Submittals"));
    assert_eq!(err.to_string(), "no PDF files found in '/data/Submittals'");

    let err = HarvestError::Discovery {
        path: PathBuf::from("/data/missing"),
        reason: "folder does not exist".into(),
    };
    assert_eq!(
        err.to_string(),
        "cannot scan source folder '/data/missing': folder does not exist"
    );

    let err = HarvestError::Config("bad".into());
    assert_eq!(err.to_string(), "invalid configuration: bad");
}

#[test]
fn discovery_reports_missing_source_folder() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("Submittals");
    match discover_documents(&missing).unwrap_err() {
        HarvestError::Discovery { path, .. } => assert_eq!(path, missing),
        other => panic!("unexpected error: {other:?}"),
    }
}
