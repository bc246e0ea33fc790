use evcal_engine::config::schema::{LogFormat, Target};
use evcal_engine::config::{ConfigError, ConfigLoader};
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

fn yaml(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[tokio::test]
async fn targets_are_told_apart_by_their_fields() {
    let file = yaml(
        r##"
targets:
  - query: "#VRChat イベント"
    max_posts: 20
  - query: "#VRChat_event"
  - list_url: "/i/lists/1234"
"##,
    );

    let config = ConfigLoader::load_from(file.path()).await.unwrap();

    assert_eq!(
        config.targets,
        vec![
            Target::Search {
                query: "#VRChat イベント".into(),
                max_posts: Some(20),
            },
            Target::Search {
                query: "#VRChat_event".into(),
                max_posts: None,
            },
            Target::List {
                list_url: "/i/lists/1234".into(),
                max_members: None,
            },
        ]
    );
}

#[tokio::test]
async fn partial_sections_keep_remaining_defaults() {
    let file = yaml(
        r#"
scraping:
  max_scrolls: 5
  skip_login: true
pacing:
  enabled: false
dedup:
  name_similarity: 0.9
publish:
  timezone: null
logging:
  format: json
paths:
  raw_dir: /tmp/evcal/raw
"#,
    );

    let config = ConfigLoader::load_from(file.path()).await.unwrap();

    assert_eq!(config.scraping.max_scrolls, 5);
    assert!(config.scraping.skip_login);
    assert_eq!(config.scraping.default_max_posts, 100);
    assert_eq!(config.scraping.login_step_timeout_ms, 15000);
    assert!(!config.pacing.enabled);
    assert_eq!(config.dedup.name_similarity, 0.9);
    assert!(config.dedup.same_day_required);
    assert_eq!(config.publish.timezone, None);
    assert_eq!(config.publish.calendar_name, "VRChat Events");
    assert_eq!(config.logging.format, LogFormat::Json);
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.paths.raw_dir, PathBuf::from("/tmp/evcal/raw"));
    assert_eq!(
        config.paths.validated_dir,
        PathBuf::from("data/validated_events")
    );
    assert_eq!(config.resolver.attribute_min_attempt_ms, 500);
    assert_eq!(config.resolver.text_min_attempt_ms, 1000);
}

#[tokio::test]
async fn empty_file_means_defaults() {
    let file = yaml("\n");

    let config = ConfigLoader::load_from(file.path()).await.unwrap();

    assert!(config.targets.is_empty());
    assert_eq!(config.site.base_url, "https://x.com");
    assert!(config.browser.headless);
    assert_eq!(config.browser.locale, "ja-JP");
    assert_eq!(config.recurrence.horizon_days, 60);
}

#[tokio::test]
async fn invalid_yaml_is_a_parse_error() {
    let file = yaml("targets: [\n  - query: broken");

    let err = ConfigLoader::load_from(file.path()).await.unwrap_err();

    assert!(matches!(err, ConfigError::Parse { .. }));
}

#[tokio::test]
async fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.yaml");

    let err = ConfigLoader::load(Some(&path)).await.unwrap_err();

    match err {
        ConfigError::Io { path: reported, .. } => assert_eq!(reported, path),
        other => panic!("expected Io error, got {other:?}"),
    }
}

#[tokio::test]
async fn credentials_come_from_config() {
    let file = yaml(
        r#"
credentials:
  username: eventbot
"#,
    );

    let config = ConfigLoader::load_from(file.path()).await.unwrap();

    assert_eq!(config.credentials.username.as_deref(), Some("eventbot"));
    assert_eq!(config.credentials.password, None);
}
