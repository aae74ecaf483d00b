//! Settings loading.
//!
//! Layers, lowest first: compiled defaults, the JSON settings file, then
//! `GOMER_*` environment variables. [`read_layers`] stops there so a caller
//! can put its own layer (command-line flags) on top and validate once;
//! [`load_settings_from_path`] validates straight away.
//!
//! File values merge key by key into the defaults: nested objects recurse,
//! anything else (arrays included) replaces, and `null` keeps the default.

use std::io;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::{Result, SettingsError};
use crate::types::GomerSettings;

/// Accepted range for every `*_TIMEOUT_MS` override: one hour at most.
const TIMEOUT_MS: RangeInclusive<u64> = 1..=3_600_000;

/// `~/.gomer/settings.json`, falling back to the temp dir without `HOME`.
pub fn settings_path() -> PathBuf {
    std::env::var_os("HOME")
        .map_or_else(std::env::temp_dir, PathBuf::from)
        .join(".gomer")
        .join("settings.json")
}

/// Load and validate settings from [`settings_path`].
pub fn load_settings() -> Result<GomerSettings> {
    load_settings_from_path(&settings_path())
}

/// Load and validate settings from `path`. A missing file means defaults.
pub fn load_settings_from_path(path: &Path) -> Result<GomerSettings> {
    let settings = read_layers(path)?;
    settings.validate()?;
    Ok(settings)
}

/// Defaults, the file at `path` if it exists, then the environment.
///
/// Not validated: the result may still carry a bad value that a higher
/// layer is about to replace.
pub fn read_layers(path: &Path) -> Result<GomerSettings> {
    let mut settings = read_file_layer(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

fn read_file_layer(path: &Path) -> Result<GomerSettings> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no settings file, using defaults");
            return Ok(GomerSettings::default());
        }
        Err(source) => {
            return Err(SettingsError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    debug!(path = %path.display(), "merging settings file");
    let parse_err = |source: serde_json::Error| SettingsError::Parse {
        path: path.to_path_buf(),
        source,
    };
    let overlay: Value = serde_json::from_str(&content).map_err(parse_err)?;
    let mut merged = serde_json::to_value(GomerSettings::default()).map_err(parse_err)?;
    merge_json(&mut merged, overlay);
    serde_json::from_value(merged).map_err(parse_err)
}

/// Merge `overlay` into `base` in place.
pub fn merge_json(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (_, Value::Null) => {}
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(slot) => merge_json(slot, value),
                    None if value.is_null() => {}
                    None => {
                        let _ = base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Apply `GOMER_*` overrides from the process environment.
pub fn apply_env_overrides(settings: &mut GomerSettings) {
    apply_overrides(settings, |key| std::env::var(key).ok());
}

/// Apply `GOMER_*` overrides from an arbitrary lookup.
///
/// Empty values count as unset. A value that does not parse is skipped with
/// a warning and the lower layer's value stays.
pub fn apply_overrides<F>(settings: &mut GomerSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let read = |key: &str| lookup(key).filter(|v| !v.is_empty());
    let parsed = |key: &'static str, parse: fn(&str) -> Option<u64>| -> Option<u64> {
        let raw = read(key)?;
        let value = parse(&raw);
        if value.is_none() {
            warn!(key, value = %raw, "ignoring unparsable override");
        }
        value
    };

    if let Some(origin) = read("GOMER_ORIGIN") {
        settings.server.origin = origin;
    }
    if let Some(path) = read("GOMER_CONN_PATH") {
        settings.server.conn_path = path;
    }
    if let Some(ms) = parsed("GOMER_CONNECT_TIMEOUT_MS", parse_timeout_ms) {
        settings.server.connect_timeout_ms = ms;
    }
    if let Some(ms) = parsed("GOMER_REQUEST_TIMEOUT_MS", parse_timeout_ms) {
        settings.server.request_timeout_ms = ms;
    }
    if let Some(ms) = parsed("GOMER_RESULT_TIMEOUT_MS", parse_timeout_ms) {
        settings.server.result_timeout_ms = ms;
    }
    if let Some(level) = read("GOMER_LOG_LEVEL") {
        settings.logging.level = level;
    }
    if let Some(raw) = read("GOMER_LOG_JSON") {
        match parse_flag(&raw) {
            Some(json) => settings.logging.json = json,
            None => warn!(key = "GOMER_LOG_JSON", value = %raw, "ignoring unparsable override"),
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    let is = |words: [&str; 4]| words.iter().any(|w| raw.trim().eq_ignore_ascii_case(w));
    if is(["true", "1", "yes", "on"]) {
        Some(true)
    } else if is(["false", "0", "no", "off"]) {
        Some(false)
    } else {
        None
    }
}

fn parse_timeout_ms(raw: &str) -> Option<u64> {
    raw.trim()
        .parse()
        .ok()
        .filter(|ms| TIMEOUT_MS.contains(ms))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::json;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn write_settings(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[test]
    fn merge_recurses_into_objects() {
        let mut base = json!({"server": {"origin": "a", "connPath": "/conn"}});
        merge_json(&mut base, json!({"server": {"origin": "b"}}));
        assert_eq!(base, json!({"server": {"origin": "b", "connPath": "/conn"}}));
    }

    #[test]
    fn merge_null_keeps_base() {
        let mut base = json!({"a": 1, "b": {"c": 2}});
        merge_json(&mut base, json!({"a": null, "b": null, "d": null}));
        assert_eq!(base, json!({"a": 1, "b": {"c": 2}}));
    }

    #[test]
    fn merge_replaces_arrays_and_mismatched_shapes() {
        let mut base = json!({"items": [1, 2, 3], "a": {"nested": true}});
        merge_json(&mut base, json!({"items": [4], "a": 42}));
        assert_eq!(base, json!({"items": [4], "a": 42}));
    }

    #[test]
    fn missing_file_is_defaults() {
        let settings = read_file_layer(Path::new("/nonexistent/settings.json")).unwrap();
        assert_eq!(settings, GomerSettings::default());
    }

    #[test]
    fn partial_file_overrides_only_named_keys() {
        let (_dir, path) = write_settings(
            r#"{"server": {"origin": "https://play.example.com"}, "logging": {"json": true}}"#,
        );

        let settings = read_file_layer(&path).unwrap();
        assert_eq!(settings.server.origin, "https://play.example.com");
        assert_eq!(settings.server.conn_path, "/conn");
        assert!(settings.logging.json);
        assert_eq!(settings.logging.level, "warn");
    }

    #[test]
    fn invalid_json_names_the_file() {
        let (_dir, path) = write_settings("not valid json");

        let err = read_file_layer(&path).unwrap_err();
        assert!(matches!(&err, SettingsError::Parse { path: p, .. } if *p == path));
    }

    #[test]
    fn wrong_type_in_file_is_parse_error() {
        let (_dir, path) = write_settings(r#"{"server": {"connectTimeoutMs": "soon"}}"#);
        assert!(matches!(
            read_file_layer(&path),
            Err(SettingsError::Parse { .. })
        ));
    }

    #[test]
    fn directory_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            read_file_layer(dir.path()),
            Err(SettingsError::Read { .. })
        ));
    }

    #[test]
    fn layers_are_not_validated_but_load_is() {
        let (_dir, path) = write_settings(r#"{"server": {"origin": "localhost:8080"}}"#);

        let mut settings = read_file_layer(&path).unwrap();
        apply_overrides(&mut settings, env(&[]));
        assert_eq!(settings.server.origin, "localhost:8080");
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::Invalid {
                key: "server.origin",
                ..
            })
        ));

        // A higher layer can still repair it.
        settings.server.origin = "http://127.0.0.1:8080".into();
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn overrides_apply() {
        let mut settings = GomerSettings::default();
        apply_overrides(
            &mut settings,
            env(&[
                ("GOMER_ORIGIN", "http://10.0.0.2:8080"),
                ("GOMER_CONN_PATH", "/ws"),
                ("GOMER_CONNECT_TIMEOUT_MS", "2500"),
                ("GOMER_RESULT_TIMEOUT_MS", " 60000 "),
                ("GOMER_LOG_LEVEL", "gomer_bridge=debug"),
                ("GOMER_LOG_JSON", "Yes"),
            ]),
        );
        assert_eq!(settings.server.origin, "http://10.0.0.2:8080");
        assert_eq!(settings.server.conn_path, "/ws");
        assert_eq!(settings.server.connect_timeout_ms, 2500);
        assert_eq!(settings.server.result_timeout_ms, 60_000);
        assert_eq!(settings.logging.level, "gomer_bridge=debug");
        assert!(settings.logging.json);
    }

    #[test]
    fn unparsable_overrides_keep_lower_layer() {
        let mut settings = GomerSettings::default();
        apply_overrides(
            &mut settings,
            env(&[
                ("GOMER_CONNECT_TIMEOUT_MS", "soon"),
                ("GOMER_REQUEST_TIMEOUT_MS", "0"),
                ("GOMER_RESULT_TIMEOUT_MS", "3600001"),
                ("GOMER_LOG_JSON", "maybe"),
                ("GOMER_ORIGIN", ""),
            ]),
        );
        assert_eq!(settings, GomerSettings::default());
    }

    #[test]
    fn flag_words() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag("on"), Some(true));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag(" Off "), Some(false));
        assert_eq!(parse_flag("2"), None);
    }

    #[test]
    fn timeout_bounds() {
        assert_eq!(parse_timeout_ms("1"), Some(1));
        assert_eq!(parse_timeout_ms("3600000"), Some(3_600_000));
        assert_eq!(parse_timeout_ms("0"), None);
        assert_eq!(parse_timeout_ms("-1"), None);
    }
}
