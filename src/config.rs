//! Project settings from `settings.yaml`.
//!
//! Controls the section layout of composed output and the project-wide
//! default output path. A missing file or missing keys fall back to
//! defaults, so a freshly scaffolded project works with an empty file.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::component::ComponentKind;
use crate::error::{Error, Result};

pub const SETTINGS_FILE: &str = "settings.yaml";
pub const DEFAULT_OUTPUT: &str = "PLUQQY.md";

/// One section of the composed output: which kind appears under which
/// markdown header. Kinds missing from the layout are skipped entirely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    #[serde(rename = "type")]
    pub kind: ComponentKind,
    pub header: String,
}

impl Section {
    pub fn new(kind: ComponentKind, header: impl Into<String>) -> Self {
        Section {
            kind,
            header: header.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(rename = "outputPath", default = "default_output_path")]
    pub output_path: String,
    #[serde(default = "default_sections")]
    pub sections: Vec<Section>,
}

fn default_output_path() -> String {
    DEFAULT_OUTPUT.to_string()
}

fn default_sections() -> Vec<Section> {
    vec![
        Section::new(ComponentKind::Rules, "## Rules"),
        Section::new(ComponentKind::Context, "## Contexts"),
        Section::new(ComponentKind::Prompt, "## Prompts"),
    ]
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            output_path: default_output_path(),
            sections: default_sections(),
        }
    }
}

impl Settings {
    /// Load from `<root>/settings.yaml`; a missing file yields defaults.
    pub fn load(root: &Path) -> Result<Settings> {
        let path = root.join(SETTINGS_FILE);
        if !path.exists() {
            return Ok(Settings::default());
        }
        let raw = std::fs::read_to_string(&path).map_err(|e| Error::io("read", &path, e))?;
        if raw.trim().is_empty() {
            return Ok(Settings::default());
        }
        serde_yaml::from_str(&raw).map_err(|e| Error::malformed(&path, e.to_string()))
    }

    /// Display position of a kind: its index in the configured layout, or
    /// past the end (in declaration order) when the layout omits it.
    pub fn kind_position(&self, kind: ComponentKind) -> usize {
        self.sections
            .iter()
            .position(|s| s.kind == kind)
            .unwrap_or_else(|| {
                self.sections.len()
                    + ComponentKind::ALL
                        .iter()
                        .position(|k| *k == kind)
                        .unwrap_or(0)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_when_missing() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::load(dir.path()).unwrap();
        assert_eq!(settings.output_path, "PLUQQY.md");
        assert_eq!(settings.sections.len(), 3);
        assert_eq!(settings.sections[0].kind, ComponentKind::Rules);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(SETTINGS_FILE), "outputPath: out/AGENT.md\n").unwrap();
        let settings = Settings::load(dir.path()).unwrap();
        assert_eq!(settings.output_path, "out/AGENT.md");
        assert_eq!(settings.sections.len(), 3);
    }

    #[test]
    fn test_explicit_layout() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILE),
            "sections:\n  - type: prompts\n    header: \"## Prompts\"\n",
        )
        .unwrap();
        let settings = Settings::load(dir.path()).unwrap();
        assert_eq!(settings.sections.len(), 1);
        assert_eq!(settings.kind_position(ComponentKind::Prompt), 0);
        // Kinds missing from the layout sort after configured ones.
        assert!(settings.kind_position(ComponentKind::Context) > 0);
        assert!(
            settings.kind_position(ComponentKind::Context)
                < settings.kind_position(ComponentKind::Rules)
        );
    }

    #[test]
    fn test_malformed_settings_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(SETTINGS_FILE), "sections: {not: [valid\n").unwrap();
        assert!(Settings::load(dir.path()).is_err());
    }
}
