//! # gomer-settings
//!
//! Layered configuration for the gomer bridge.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`GomerSettings::default()`]
//! 2. **User file**: `~/.gomer/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `GOMER_*` overrides (highest priority)
//!
//! [`read_layers`] returns the merge unvalidated so the binary can apply its
//! command-line flags on top before calling [`GomerSettings::validate`].

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, apply_overrides, load_settings, load_settings_from_path, merge_json,
    read_layers, settings_path,
};
pub use types::{GomerSettings, LoggingSettings, ServerSettings};
