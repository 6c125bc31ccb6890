use std::path::PathBuf;

use stripe_sync::RunOpts;
use stripe_sync_source::SourceOpts;

#[test]
fn test_source_opts_creation() {
    let opts = SourceOpts::new("sk_test_123", "subscription");

    assert_eq!(opts.secret_key, "sk_test_123");
    assert_eq!(opts.resource_name, "subscription");
    assert_eq!(opts.batch_size, 10);
    assert_eq!(opts.max_retries, 3);
    assert!(opts.snapshot);
    assert!(!opts.strict_event_types);
    assert!(opts.validate().is_ok());
}

#[test]
fn test_source_opts_debug_hides_secret() {
    let opts = SourceOpts::new("sk_live_very_secret", "invoice");
    let debug = format!("{opts:?}");

    assert!(!debug.contains("sk_live_very_secret"));
    assert!(debug.contains("invoice"));
}

#[test]
fn test_run_opts_creation() {
    let opts = RunOpts {
        position: Some(r#"{"mode":"cdc","watermark":1,"cursor":"","index":0}"#.to_string()),
        checkpoint_dir: PathBuf::from("/tmp/checkpoints"),
        output: Some(PathBuf::from("out.jsonl")),
        checkpoint_every: 5,
        timeout: Some("1h".to_string()),
        max_records: Some(100),
        poll_interval: "30s".to_string(),
    };

    let limits = opts.limits().unwrap();
    assert_eq!(limits.checkpoint_every, 5);
    assert_eq!(limits.max_records, Some(100));
    assert_eq!(limits.timeout, Some(std::time::Duration::from_secs(3600)));
    assert_eq!(
        opts.poll_interval().unwrap(),
        std::time::Duration::from_secs(30)
    );
}

#[test]
fn test_invalid_resource_is_reported() {
    let mut opts = SourceOpts::new("", "widget");
    opts.batch_size = 0;

    let err = opts.validate().unwrap_err().to_string();
    assert!(err.contains("secret key"), "{err}");
    assert!(err.contains("unknown resource 'widget'"), "{err}");
    assert!(err.contains("batch size"), "{err}");
}
