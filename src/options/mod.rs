//! Session options with TOML preset support.
//!
//! Server settings, isosurface styles for each kind of representation and
//! load switches live here. Options serialize to/from TOML so a viewer can
//! keep named presets in a directory.

mod api;
mod image;
mod loading;
mod segments;
mod volume;

use std::path::Path;

pub use api::ApiOptions;
pub use image::ImageOptions;
pub use loading::LoadingOptions;
use schemars::JsonSchema;
pub use segments::SegmentOptions;
use serde::{Deserialize, Serialize};
pub use volume::VolumeOptions;

use crate::error::VolsegError;

/// Top-level options container. All sub-structs use `#[serde(default)]` so
/// partial TOML files (e.g. only overriding `[api]`) work.
#[derive(
    Debug, Clone, Serialize, Deserialize, PartialEq, Default, JsonSchema,
)]
#[serde(default)]
pub struct Options {
    /// Volume server connection.
    pub api: ApiOptions,
    /// Density volume isosurface.
    pub volume: VolumeOptions,
    /// Segment rendering and mesh detail.
    pub segments: SegmentOptions,
    /// Image mode.
    pub image: ImageOptions,
    /// Load sequencing.
    pub loading: LoadingOptions,
}

impl Options {
    /// Generate JSON Schema describing the user-facing options.
    #[must_use]
    pub fn json_schema() -> schemars::Schema {
        schemars::schema_for!(Options)
    }

    /// Load options from a TOML file. Missing fields use defaults.
    pub fn load(path: &Path) -> Result<Self, VolsegError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse options from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, VolsegError> {
        toml::from_str(content)
            .map_err(|e| VolsegError::OptionsParse(e.to_string()))
    }

    /// Save options to a TOML file (pretty-printed).
    pub fn save(&self, path: &Path) -> Result<(), VolsegError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| VolsegError::OptionsParse(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// List available preset names (TOML file stems) in a directory.
    #[must_use]
    pub fn list_presets(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .into_iter()
            .flatten()
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "toml"))
            .filter_map(|path| {
                path.file_stem().and_then(|s| s.to_str()).map(str::to_owned)
            })
            .collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::IsoValue;

    #[test]
    fn default_round_trips_through_toml() {
        let opts = Options::default();
        let toml_str = toml::to_string_pretty(&opts).unwrap();
        let parsed: Options = toml::from_str(&toml_str).unwrap();
        assert_eq!(opts, parsed);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let toml_str = r#"
[api]
base_url = "https://example.org/v1"

[segments]
preferred_detail = 2
"#;
        let opts = Options::from_toml(toml_str).unwrap();
        assert_eq!(opts.api.base_url, "https://example.org/v1");
        assert_eq!(opts.api.max_voxels, 100_000_000);
        assert_eq!(opts.segments.preferred_detail, Some(2));
        assert_eq!(opts.segments.background_segments, vec![13, 15]);
        assert_eq!(opts.volume.iso_value, IsoValue::Relative(2.73));
        assert!(opts.loading.volume_requires_lattice);
    }

    #[test]
    fn iso_value_in_toml() {
        let toml_str = r#"
[volume]
iso_value = { kind = "absolute", value = 1.5 }
"#;
        let opts = Options::from_toml(toml_str).unwrap();
        assert_eq!(opts.volume.iso_value, IsoValue::Absolute(1.5));
    }

    #[test]
    fn bad_toml_is_an_options_error() {
        assert!(matches!(
            Options::from_toml("[api]\nmax_voxels = \"many\""),
            Err(VolsegError::OptionsParse(_))
        ));
    }

    #[test]
    fn default_request_uses_box() {
        let request = Options::default().api.volume_request();
        assert_eq!(request.max_voxels, 100_000_000);
        assert_eq!(request.region.unwrap().min, [-1000.0; 3]);
    }

    #[test]
    fn save_load_and_list_presets() {
        let dir = std::env::temp_dir()
            .join(format!("volseg-presets-{}", std::process::id()));
        let mut opts = Options::default();
        opts.segments.alpha = 0.5;
        opts.save(&dir.join("faded.toml")).unwrap();
        std::fs::write(dir.join("notes.txt"), "x").unwrap();

        assert_eq!(Options::list_presets(&dir), vec!["faded"]);
        assert_eq!(Options::load(&dir.join("faded.toml")).unwrap(), opts);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn schema_has_expected_properties() {
        let schema_value =
            serde_json::to_value(Options::json_schema()).unwrap();
        let props = schema_value["properties"].as_object().unwrap();
        for section in ["api", "volume", "segments", "image", "loading"] {
            assert!(props.contains_key(section), "missing {section}");
        }
        let api = &props["api"]["properties"];
        assert!(api.get("base_url").is_some());
        assert!(api.get("box_min").is_none());
    }
}
