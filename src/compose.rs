//! Composer: assemble a pipeline into its output artifact.
//!
//! Grouping follows the configured section layout; within a section,
//! components keep their pipeline-sequence order. Bodies are included
//! verbatim after front-matter stripping. The result depends only on the
//! bytes of the layout and of each referenced component.

use std::fmt::Write as _;

use crate::config::{Section, Settings};
use crate::error::{Error, Result};
use crate::pipeline::{resolve_ref, Pipeline};
use crate::store::Store;

/// Fixed character-per-token estimate. The real tokenizer lives
/// downstream; these counts are a sizing aid, not an authority.
pub const CHARS_PER_TOKEN: usize = 4;

/// Estimated token count for a piece of text.
pub fn estimate_tokens(text: &str) -> usize {
    (text.len() + CHARS_PER_TOKEN - 1) / CHARS_PER_TOKEN
}

/// Named size band for an estimated token count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenStatus {
    Good,
    Warning,
    Danger,
}

impl TokenStatus {
    pub fn for_tokens(tokens: usize) -> TokenStatus {
        if tokens < 10_000 {
            TokenStatus::Good
        } else if tokens < 50_000 {
            TokenStatus::Warning
        } else {
            TokenStatus::Danger
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TokenStatus::Good => "good",
            TokenStatus::Warning => "warning",
            TokenStatus::Danger => "danger",
        }
    }
}

/// Where a pipeline entry landed in the composed output. `seq_index` is
/// the entry's position in the pipeline sequence, so duplicates get one
/// span each (the Nth occurrence is the Nth span with that path).
#[derive(Debug, Clone)]
pub struct ComponentSpan {
    pub seq_index: usize,
    /// Zero-based line of the body's first line in the output.
    pub start_line: usize,
    /// Zero-based line of the first non-heading, non-blank body line;
    /// falls back to `start_line` for heading-only bodies.
    pub content_line: usize,
}

/// Compose and also report where each entry landed, for preview
/// centering. Unresolvable or unreadable references produce no span and
/// no output; the reconciliation scan owns reporting those.
pub fn compose_indexed(
    store: &Store,
    pipeline: &Pipeline,
    sections: &[Section],
) -> Result<(String, Vec<ComponentSpan>)> {
    // Section headers and stripped bodies become blocks joined by blank
    // lines; a body block remembers which sequence entry produced it.
    let mut blocks: Vec<(String, Option<usize>)> = Vec::new();

    for section in sections {
        let mut bodies = Vec::new();
        for (seq_index, c) in pipeline.components.iter().enumerate() {
            if c.kind != section.kind {
                continue;
            }
            let Some(rel) = resolve_ref(pipeline.archived, &c.path) else {
                continue;
            };
            if let Ok(component) = store.read_component(&rel) {
                bodies.push((seq_index, component.content.trim_end().to_string()));
            }
        }
        if bodies.is_empty() {
            continue;
        }
        blocks.push((section.header.clone(), None));
        for (seq_index, body) in bodies {
            blocks.push((body, Some(seq_index)));
        }
    }

    let mut out = String::new();
    let mut spans = Vec::new();
    let mut line = 0usize;
    for (i, (text, seq)) in blocks.iter().enumerate() {
        if i > 0 {
            out.push_str("\n\n");
        }
        if let Some(seq_index) = seq {
            let content_line = line
                + text
                    .lines()
                    .position(|l| !l.trim().is_empty() && !l.trim_start().starts_with('#'))
                    .unwrap_or(0);
            spans.push(ComponentSpan {
                seq_index: *seq_index,
                start_line: line,
                content_line,
            });
        }
        let _ = write!(out, "{}", text);
        line += text.lines().count().max(1) + 1;
    }
    if !out.is_empty() {
        out.push('\n');
    }
    Ok((out, spans))
}

/// Pure composition: the output artifact for a pipeline under a layout.
/// An empty pipeline (or one whose sections are all empty) composes to
/// the empty string, with no section headers.
pub fn compose(store: &Store, pipeline: &Pipeline, sections: &[Section]) -> Result<String> {
    Ok(compose_indexed(store, pipeline, sections)?.0)
}

/// "Set" a pipeline: compose it and atomically write the artifact to the
/// pipeline's output path (or the project default). Returns the
/// project-relative path written.
pub fn set_pipeline(store: &Store, settings: &Settings, pipeline: &Pipeline) -> Result<String> {
    let output_rel = pipeline
        .output_path
        .clone()
        .unwrap_or_else(|| settings.output_path.clone());
    if output_rel.trim().is_empty() {
        return Err(Error::Validation("output path is empty".to_string()));
    }
    let artifact = compose(store, pipeline, &settings.sections)?;
    store.write_atomic(&output_rel, &artifact)?;
    Ok(output_rel)
}
