//! Project initialization.
//!
//! `pluqqy init` creates the two-tree layout, the settings and tag
//! registry files, and a starter component so the list view has
//! something to show.

use colored::Colorize;
use std::fs;
use std::path::Path;

use crate::config::SETTINGS_FILE;
use crate::error::{Error, Result};
use crate::store::TAGS_FILE;

const DEFAULT_SETTINGS: &str = "\
# pluqqy project settings
outputPath: PLUQQY.md
sections:
  - type: rules
    header: \"## Rules\"
  - type: contexts
    header: \"## Contexts\"
  - type: prompts
    header: \"## Prompts\"
";

const STARTER_PROMPT: &str = "\
---
tags: [example]
---
# Example Prompt

Replace this with a reusable prompt fragment, then add it to a pipeline.
";

/// Initialize a pluqqy project in `root`. Existing files are left alone,
/// so rerunning on a live project is safe.
pub fn init_project(root: &Path) -> Result<()> {
    println!("\n{}", "Initializing pluqqy project...".cyan().bold());
    println!("   Directory: {}\n", root.display());

    for sub in [
        "components/contexts",
        "components/prompts",
        "components/rules",
        "pipelines",
        "archive/components/contexts",
        "archive/components/prompts",
        "archive/components/rules",
        "archive/pipelines",
    ] {
        create_dir_if_missing(&root.join(sub))?;
    }

    write_file_if_missing(&root.join(SETTINGS_FILE), DEFAULT_SETTINGS, SETTINGS_FILE)?;
    write_file_if_missing(&root.join(TAGS_FILE), "[]\n", TAGS_FILE)?;
    write_file_if_missing(
        &root.join("components/prompts/example-prompt.md"),
        STARTER_PROMPT,
        "components/prompts/example-prompt.md",
    )?;

    println!("\n{}", "Project ready.".green().bold());
    println!("Run {} here to open the editor.\n", "pluqqy".cyan());
    Ok(())
}

fn create_dir_if_missing(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path).map_err(|e| Error::io("create dir", path, e))?;
        println!("   {} {}", "Creating".green(), path.display());
    }
    Ok(())
}

fn write_file_if_missing(path: &Path, content: &str, display_name: &str) -> Result<()> {
    if path.exists() {
        println!("   {} {} (already exists)", "Skipping".yellow(), display_name);
    } else {
        fs::write(path, content).map_err(|e| Error::io("write", path, e))?;
        println!("   {} {}", "Creating".green(), display_name);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;
    use tempfile::TempDir;

    #[test]
    fn test_init_creates_layout() {
        let dir = TempDir::new().unwrap();
        init_project(dir.path()).unwrap();
        assert!(Store::is_project(dir.path()));
        assert!(dir.path().join("archive/pipelines").is_dir());
        assert!(dir.path().join(SETTINGS_FILE).is_file());
        assert!(dir.path().join(TAGS_FILE).is_file());
    }

    #[test]
    fn test_init_is_idempotent() {
        let dir = TempDir::new().unwrap();
        init_project(dir.path()).unwrap();
        std::fs::write(dir.path().join(SETTINGS_FILE), "outputPath: MINE.md\n").unwrap();
        init_project(dir.path()).unwrap();
        let kept = std::fs::read_to_string(dir.path().join(SETTINGS_FILE)).unwrap();
        assert_eq!(kept, "outputPath: MINE.md\n");
    }
}
