//! Component model: reusable markdown fragments with front-matter.
//!
//! A component is a single `.md` file under `components/<kind>/` (or its
//! archive mirror). The optional front-matter block carries `tags:` and an
//! explicit `name:`; the display name falls back to the first `#` heading,
//! then to the humanized filename.

use chrono::{DateTime, Local};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

lazy_static! {
    static ref HEADING: Regex = Regex::new(r"(?m)^#\s+(.+?)\s*$").expect("static regex");
    static ref NON_ALNUM: Regex = Regex::new(r"[^a-z0-9]+").expect("static regex");
}

/// The three component kinds. Determines the subdirectory a component
/// lives in and which section of the composed output it lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ComponentKind {
    Context,
    Prompt,
    Rules,
}

impl ComponentKind {
    /// Declaration order; also the grouping order for kinds missing from
    /// the configured section layout.
    pub const ALL: [ComponentKind; 3] = [
        ComponentKind::Context,
        ComponentKind::Prompt,
        ComponentKind::Rules,
    ];

    /// Subdirectory name under `components/`.
    pub fn dir_name(self) -> &'static str {
        match self {
            ComponentKind::Context => "contexts",
            ComponentKind::Prompt => "prompts",
            ComponentKind::Rules => "rules",
        }
    }

    /// Human label for list views.
    pub fn label(self) -> &'static str {
        match self {
            ComponentKind::Context => "Context",
            ComponentKind::Prompt => "Prompt",
            ComponentKind::Rules => "Rules",
        }
    }

    pub fn parse(s: &str) -> Option<ComponentKind> {
        match s.trim().to_lowercase().as_str() {
            "context" | "contexts" => Some(ComponentKind::Context),
            "prompt" | "prompts" => Some(ComponentKind::Prompt),
            "rule" | "rules" => Some(ComponentKind::Rules),
            _ => None,
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

impl Serialize for ComponentKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.dir_name())
    }
}

impl<'de> Deserialize<'de> for ComponentKind {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ComponentKind::parse(&s).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "unknown component type {:?} (expected contexts, prompts or rules)",
                s
            ))
        })
    }
}

/// Front-matter keys we understand. Unknown keys are dropped on rewrite;
/// the tag set and explicit name survive round trips.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrontMatter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// A component loaded from disk.
#[derive(Debug, Clone)]
pub struct Component {
    pub kind: ComponentKind,
    /// Project-root-relative path, e.g. `components/prompts/foo.md`.
    pub path: String,
    pub display_name: String,
    /// Markdown body after front-matter stripping.
    pub content: String,
    pub tags: Vec<String>,
    pub archived: bool,
    pub last_modified: Option<DateTime<Local>>,
    pub token_count: usize,
}

impl Component {
    /// Filename slug without the `.md` extension.
    pub fn slug(&self) -> &str {
        file_stem(&self.path)
    }
}

/// Final path segment without extension.
pub fn file_stem(path: &str) -> &str {
    let name = path.rsplit('/').next().unwrap_or(path);
    name.strip_suffix(".md")
        .or_else(|| name.strip_suffix(".yaml"))
        .unwrap_or(name)
}

/// Split raw file contents into (front-matter yaml, body). The fence must
/// open on the very first line; anything else is all body.
pub fn split_front_matter(raw: &str) -> (Option<&str>, &str) {
    let rest = match raw.strip_prefix("---\n").or_else(|| raw.strip_prefix("---\r\n")) {
        Some(rest) => rest,
        None => return (None, raw),
    };
    for close in ["\n---\n", "\n---\r\n"] {
        if let Some(end) = rest.find(close) {
            return (Some(&rest[..end]), &rest[end + close.len()..]);
        }
    }
    // Closing fence at EOF without trailing newline.
    if let Some(yaml) = rest.strip_suffix("\n---") {
        return (Some(yaml), "");
    }
    (None, raw)
}

/// Parse raw file contents into front-matter and body. A fence that fails
/// to parse as YAML is an error; a missing fence is an empty front-matter.
pub fn parse_front_matter(raw: &str) -> Result<(FrontMatter, &str), String> {
    match split_front_matter(raw) {
        (Some(yaml), body) => {
            let mut fm: FrontMatter =
                serde_yaml::from_str(yaml).map_err(|e| format!("front-matter: {}", e))?;
            fm.tags = normalize_tag_set(&fm.tags);
            Ok((fm, body))
        }
        (None, body) => Ok((FrontMatter::default(), body)),
    }
}

/// Render a component file: front-matter fence (only when there is
/// something to say) followed by the body verbatim.
pub fn render_component(front: &FrontMatter, body: &str) -> String {
    if front.name.is_none() && front.tags.is_empty() {
        return body.to_string();
    }
    let mut out = String::from("---\n");
    if let Some(name) = &front.name {
        out.push_str(&format!("name: {}\n", yaml_scalar(name)));
    }
    if !front.tags.is_empty() {
        out.push_str(&format!("tags: [{}]\n", front.tags.join(", ")));
    }
    out.push_str("---\n");
    out.push_str(body);
    out
}

/// Quote a YAML scalar only when it needs it.
fn yaml_scalar(s: &str) -> String {
    let plain = !s.is_empty()
        && !s.contains([':', '#', '\'', '"', '\n', '[', ']', '{', '}'])
        && !s.starts_with([' ', '-', '&', '*', '!', '|', '>', '%', '@']);
    if plain {
        s.to_string()
    } else {
        serde_yaml::to_string(s)
            .map(|y| y.trim_end().to_string())
            .unwrap_or_else(|_| format!("{:?}", s))
    }
}

/// Derive the display name: explicit `name:`, then first `#` heading,
/// then the humanized filename slug.
pub fn display_name(front: &FrontMatter, body: &str, path: &str) -> String {
    if let Some(name) = &front.name {
        let trimmed = name.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    if let Some(caps) = HEADING.captures(body) {
        return caps[1].to_string();
    }
    humanize(file_stem(path))
}

/// Filename form of a display name: lowercased, every run of
/// non-alphanumerics collapsed to a single dash, dashes trimmed.
pub fn slugify(name: &str) -> String {
    let lower = name.to_lowercase();
    NON_ALNUM
        .replace_all(&lower, "-")
        .trim_matches('-')
        .to_string()
}

/// Tag names share the slug alphabet.
pub fn normalize_tag(name: &str) -> String {
    slugify(name)
}

/// Normalize and dedupe while preserving first-seen order (tags are a set
/// with stable ordering on write).
pub fn normalize_tag_set(tags: &[String]) -> Vec<String> {
    let mut seen = Vec::new();
    for tag in tags {
        let norm = normalize_tag(tag);
        if !norm.is_empty() && !seen.contains(&norm) {
            seen.push(norm);
        }
    }
    seen
}

/// `bar-baz` -> `Bar Baz`, for components with no heading and no name key.
pub fn humanize(slug: &str) -> String {
    slug.split('-')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Build an in-memory component from raw file contents.
pub fn from_raw(
    kind: ComponentKind,
    path: String,
    raw: &str,
    archived: bool,
    last_modified: Option<DateTime<Local>>,
) -> Result<Component, String> {
    let (front, body) = parse_front_matter(raw)?;
    let display_name = display_name(&front, body, &path);
    let token_count = crate::compose::estimate_tokens(body);
    Ok(Component {
        kind,
        display_name,
        content: body.to_string(),
        tags: front.tags,
        archived,
        last_modified,
        token_count,
        path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_kind_parse() {
        assert_eq!(ComponentKind::parse("prompts"), Some(ComponentKind::Prompt));
        assert_eq!(ComponentKind::parse("prompt"), Some(ComponentKind::Prompt));
        assert_eq!(ComponentKind::parse("CONTEXTS"), Some(ComponentKind::Context));
        assert_eq!(ComponentKind::parse("rules"), Some(ComponentKind::Rules));
        assert_eq!(ComponentKind::parse("widgets"), None);
    }

    #[test]
    fn test_split_front_matter() {
        let raw = "---\ntags: [ui]\n---\n# Title\n\nbody\n";
        let (yaml, body) = split_front_matter(raw);
        assert_eq!(yaml, Some("tags: [ui]"));
        assert_eq!(body, "# Title\n\nbody\n");
    }

    #[test]
    fn test_split_no_front_matter() {
        let raw = "# Title\n\nbody\n";
        let (yaml, body) = split_front_matter(raw);
        assert_eq!(yaml, None);
        assert_eq!(body, raw);
    }

    #[test]
    fn test_split_unterminated_fence_is_body() {
        let raw = "---\ntags: [ui]\nno close";
        let (yaml, body) = split_front_matter(raw);
        assert_eq!(yaml, None);
        assert_eq!(body, raw);
    }

    #[test]
    fn test_parse_normalizes_tags() {
        let raw = "---\ntags: [UI, Api Stuff, ui]\n---\nbody";
        let (fm, body) = parse_front_matter(raw).unwrap();
        assert_eq!(fm.tags, vec!["ui", "api-stuff"]);
        assert_eq!(body, "body");
    }

    #[test]
    fn test_render_round_trip() {
        let fm = FrontMatter {
            name: Some("My Component".to_string()),
            tags: vec!["ui".to_string(), "api".to_string()],
        };
        let rendered = render_component(&fm, "# Heading\n\nbody\n");
        let (parsed, body) = parse_front_matter(&rendered).unwrap();
        assert_eq!(parsed.name.as_deref(), Some("My Component"));
        assert_eq!(parsed.tags, fm.tags);
        assert_eq!(body, "# Heading\n\nbody\n");
    }

    #[test]
    fn test_render_bodyless_front_matter() {
        let fm = FrontMatter::default();
        assert_eq!(render_component(&fm, "just body\n"), "just body\n");
    }

    #[test]
    fn test_display_name_precedence() {
        let with_name = FrontMatter {
            name: Some("Explicit".to_string()),
            tags: vec![],
        };
        assert_eq!(
            display_name(&with_name, "# Heading\n", "components/prompts/x.md"),
            "Explicit"
        );
        let no_name = FrontMatter::default();
        assert_eq!(
            display_name(&no_name, "# From Heading\n\nbody", "components/prompts/x.md"),
            "From Heading"
        );
        assert_eq!(
            display_name(&no_name, "no heading here", "components/prompts/bar-baz.md"),
            "Bar Baz"
        );
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Bar Baz"), "bar-baz");
        assert_eq!(slugify("  Hello,   World!  "), "hello-world");
        assert_eq!(slugify("already-a-slug"), "already-a-slug");
        assert_eq!(slugify("___"), "");
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("components/prompts/foo.md"), "foo");
        assert_eq!(file_stem("pipelines/alpha.yaml"), "alpha");
    }

    proptest! {
        #[test]
        fn prop_slugify_idempotent(s in ".{0,64}") {
            let once = slugify(&s);
            prop_assert_eq!(slugify(&once), once.clone());
        }

        #[test]
        fn prop_slug_alphabet(s in ".{0,64}") {
            let slug = slugify(&s);
            prop_assert!(slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
            prop_assert!(!slug.starts_with('-') && !slug.ends_with('-'));
        }

        #[test]
        fn prop_front_matter_tag_set_round_trips(tags in proptest::collection::vec("[a-z][a-z0-9-]{0,10}", 0..5)) {
            let fm = FrontMatter { name: None, tags: normalize_tag_set(&tags) };
            let rendered = render_component(&fm, "body\n");
            let (parsed, _) = parse_front_matter(&rendered).unwrap();
            prop_assert_eq!(parsed.tags, fm.tags);
        }
    }
}
