#![forbid(unsafe_code)]

//! Settings files on disk feeding a live engine.

use pretty_assertions::assert_eq;
use tempfile::tempdir;
use vimnav_core::host::{ScrollBehavior, TabCommand};
use vimnav_core::{Action, KeyPress, KeySequence, Settings};
use vimnav_harness::{Driver, FakePage, HostCall, TraceEvent};
use vimnav_runtime::config::{ConfigError, SETTINGS_ENV, load_settings_file};
use vimnav_runtime::{KeyDisposition, RuntimeConfig};

const TOML: &str = r#"
smoothScroll = false
scrollStepSize = 64
hintCharacters = "hjkl"
disabledActions = ["reload"]

[keyMappings]
closeTab = "cx"
"#;

#[test]
fn toml_file_drives_the_engine() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("vimnav.toml");
    std::fs::write(&path, TOML).unwrap();

    let config = RuntimeConfig::from_env_with(|key| {
        (key == SETTINGS_ENV).then(|| path.display().to_string())
    });
    let settings = config.load_settings().unwrap();
    assert_eq!(settings.hint_characters, "hjkl");
    assert_eq!(settings.key_mappings.get(Action::CloseTab), Some(&KeySequence::parse("cx")));

    let mut d = Driver::new(settings, "https://example.com/", FakePage::demo(2));
    d.take_trace();
    d.type_keys("jcx");
    assert_eq!(d.press(KeyPress::char('r')), KeyDisposition::PassThrough);

    let calls: Vec<HostCall> = d
        .take_trace()
        .into_iter()
        .filter_map(|record| match record.event {
            TraceEvent::Call(call) => Some(call),
            _ => None,
        })
        .collect();
    assert_eq!(
        calls,
        [
            HostCall::ScrollBy {
                dx: 0.0,
                dy: 64.0,
                behavior: ScrollBehavior::Instant,
            },
            HostCall::Send {
                command: TabCommand::Close,
            },
        ]
    );
}

#[test]
fn json_file_with_junk_values_falls_back() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(
        &path,
        r#"{ "scrollStepSize": "fast", "hintCharacters": "x", "excludedUrls": ["*://intranet/*", 7] }"#,
    )
    .unwrap();

    let settings = load_settings_file(&path).unwrap();
    let defaults = Settings::default();
    assert_eq!(settings.scroll_step_size, defaults.scroll_step_size);
    assert_eq!(settings.hint_characters, defaults.hint_characters);
    assert_eq!(settings.excluded_urls, ["*://intranet/*"]);

    let d = Driver::new(settings, "https://intranet/wiki", FakePage::demo(1));
    assert!(d.engine().is_disabled());
}

#[test]
fn unreadable_and_malformed_files_are_errors() {
    let dir = tempdir().unwrap();

    let broken = dir.path().join("broken.toml");
    std::fs::write(&broken, "scrollStepSize = [").unwrap();
    assert!(matches!(load_settings_file(&broken), Err(ConfigError::Toml(_))));

    let missing = dir.path().join("missing.json");
    let err = RuntimeConfig::default()
        .with_settings_path(&missing)
        .load_settings()
        .unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}
