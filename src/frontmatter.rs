//! Front-matter header parsing and rendering.
//!
//! A managed document starts with a small header block:
//!
//! ```text
//! ---
//! title: Weekly review
//! tags: work,planning
//! notebook: Journal
//! ---
//! Body text...
//! ```
//!
//! [`extract_front_matter`] splits a document into its [`Metadata`] and body;
//! [`render_front_matter`] produces the header for a new or freshly opened
//! note. Documents without a header are not an error: they simply yield
//! empty metadata and the full text as content.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::error::{Result, SyncError};

const FENCE: &str = "---";

// Anchored: only a header at the very start of the text counts.
static HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^---[ \t]*\r?\n((?:[^\n]*\n)+?)---[ \t]*(?:\r?\n|$)").unwrap()
});

/// Key/value pairs read from a header block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Metadata {
    pub title: Option<String>,
    pub tags: Vec<String>,
    pub notebook: Option<String>,
    /// Keys other than `title`, `tags` and `notebook`, kept verbatim.
    pub extra: BTreeMap<String, String>,
}

impl Metadata {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.tags.is_empty() && self.notebook.is_none() && self.extra.is_empty()
    }
}

/// Result of splitting a document into header and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted<'a> {
    pub metadata: Metadata,
    pub content: &'a str,
}

/// The three fields a publish needs, with absent keys resolved to empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrontMatter {
    pub title: String,
    pub tags: Vec<String>,
    pub notebook: String,
}

impl From<&Metadata> for FrontMatter {
    fn from(metadata: &Metadata) -> Self {
        Self {
            title: metadata.title.clone().unwrap_or_default(),
            tags: metadata.tags.clone(),
            notebook: metadata.notebook.clone().unwrap_or_default(),
        }
    }
}

impl FrontMatter {
    pub fn render(&self) -> String {
        render_front_matter(&self.title, &self.tags, &self.notebook)
    }
}

/// Split `text` into header metadata and body content.
///
/// Returns [`SyncError::FrontMatter`] when a header block is present but one
/// of its non-blank lines has no `:` separator or an empty key. A fenced
/// block holding only blank lines is not a header.
pub fn extract_front_matter(text: &str) -> Result<Extracted<'_>> {
    if !text.starts_with(FENCE) {
        return Ok(Extracted {
            metadata: Metadata::default(),
            content: text,
        });
    }

    let Some(caps) = HEADER_RE.captures(text) else {
        return Ok(Extracted {
            metadata: Metadata::default(),
            content: text,
        });
    };

    let whole = caps.get(0).map(|m| m.end()).unwrap_or(0);
    let block = caps.get(1).map(|m| m.as_str()).unwrap_or_default();

    // a fenced block without any key lines is body text, not a header
    if block.lines().all(|line| line.trim().is_empty()) {
        return Ok(Extracted {
            metadata: Metadata::default(),
            content: text,
        });
    }

    let mut metadata = Metadata::default();
    for (idx, line) in block.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        // +1 for the opening fence, +1 for 1-based numbering
        let malformed = |problem| SyncError::FrontMatter {
            line: idx + 2,
            text: line.trim_end().to_string(),
            problem,
        };
        let (key, value) = line
            .split_once(':')
            .ok_or_else(|| malformed("has no ':' separator"))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(malformed("has an empty key"));
        }
        let value = value.trim();
        match key {
            "title" => metadata.title = Some(value.to_string()),
            "notebook" => metadata.notebook = Some(value.to_string()),
            "tags" => metadata.tags = split_tags(value),
            _ => {
                metadata.extra.insert(key.to_string(), value.to_string());
            }
        }
    }

    Ok(Extracted {
        metadata,
        content: &text[whole..],
    })
}

/// Render a header block with all three keys in fixed order.
pub fn render_front_matter<S: AsRef<str>>(title: &str, tags: &[S], notebook: &str) -> String {
    let tags: Vec<&str> = tags.iter().map(|t| t.as_ref()).collect();
    format!(
        "{FENCE}\ntitle: {}\ntags: {}\nnotebook: {}\n{FENCE}\n",
        title,
        tags.join(","),
        notebook
    )
}

fn split_tags(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_header_and_strips_it_from_content() {
        let text = "---\ntitle: A\ntags: x, y\nnotebook: Work\n---\nHello";
        let extracted = extract_front_matter(text).unwrap();
        assert_eq!(extracted.metadata.title.as_deref(), Some("A"));
        assert_eq!(extracted.metadata.tags, vec!["x", "y"]);
        assert_eq!(extracted.metadata.notebook.as_deref(), Some("Work"));
        assert_eq!(extracted.content, "Hello");
    }

    #[test]
    fn text_without_fence_is_returned_unchanged() {
        for text in ["", "Hello", "# Title\n---\nnot a header\n---\n", " ---\ntitle: x\n---\n"] {
            let extracted = extract_front_matter(text).unwrap();
            assert!(extracted.metadata.is_empty());
            assert_eq!(extracted.content, text);
        }
    }

    #[test]
    fn unterminated_header_is_treated_as_body() {
        let text = "---\ntitle: A\nno closing fence";
        let extracted = extract_front_matter(text).unwrap();
        assert!(extracted.metadata.is_empty());
        assert_eq!(extracted.content, text);
    }

    #[test]
    fn value_keeps_everything_after_first_colon() {
        let text = "---\ntitle: Meeting: 10:30\n---\n";
        let extracted = extract_front_matter(text).unwrap();
        assert_eq!(extracted.metadata.title.as_deref(), Some("Meeting: 10:30"));
        assert_eq!(extracted.content, "");
    }

    #[test]
    fn line_without_separator_is_an_error() {
        let text = "---\ntitle: A\njust words\n---\nBody";
        match extract_front_matter(text) {
            Err(SyncError::FrontMatter { line, text, .. }) => {
                assert_eq!(line, 3);
                assert_eq!(text, "just words");
            }
            other => panic!("expected front matter error, got {other:?}"),
        }
    }

    #[test]
    fn fenced_block_without_keys_is_body() {
        let text = "---\n\n---\nBody";
        let extracted = extract_front_matter(text).unwrap();
        assert!(extracted.metadata.is_empty());
        assert_eq!(extracted.content, text);
    }

    #[test]
    fn empty_key_is_an_error() {
        let text = "---\ntitle: A\n: orphan\n---\nBody";
        let err = extract_front_matter(text).unwrap_err();
        assert!(matches!(err, SyncError::FrontMatter { line: 3, .. }));
        assert!(err.to_string().contains("empty key"));
    }

    #[test]
    fn unknown_keys_are_kept_as_scalars() {
        let text = "---\ntitle: A\nauthor: someone, else\n---\n";
        let extracted = extract_front_matter(text).unwrap();
        assert_eq!(
            extracted.metadata.extra.get("author").map(String::as_str),
            Some("someone, else")
        );
    }

    #[test]
    fn empty_tags_value_yields_no_tags() {
        let text = "---\ntitle: \ntags: \nnotebook: \n---\n";
        let extracted = extract_front_matter(text).unwrap();
        assert!(extracted.metadata.tags.is_empty());
        assert_eq!(extracted.metadata.title.as_deref(), Some(""));
    }

    #[test]
    fn render_emits_keys_in_fixed_order() {
        let header = render_front_matter("A", &["x", "y"], "Work");
        assert_eq!(header, "---\ntitle: A\ntags: x,y\nnotebook: Work\n---\n");
    }

    #[test]
    fn default_front_matter_renders_blank_header() {
        assert_eq!(
            FrontMatter::default().render(),
            "---\ntitle: \ntags: \nnotebook: \n---\n"
        );
    }

    #[test]
    fn render_then_extract_round_trips() {
        let tags = vec!["zeta".to_string(), "alpha".to_string(), "mid dle".to_string()];
        let text = format!("{}Body line\n", render_front_matter("Plans", &tags, "Journal"));
        let extracted = extract_front_matter(&text).unwrap();
        let fm = FrontMatter::from(&extracted.metadata);
        assert_eq!(fm.title, "Plans");
        assert_eq!(fm.tags, tags);
        assert_eq!(fm.notebook, "Journal");
        assert_eq!(extracted.content, "Body line\n");
    }

    #[test]
    fn crlf_header_is_recognized() {
        let text = "---\r\ntitle: A\r\ntags: x\r\n---\r\nBody";
        let extracted = extract_front_matter(text).unwrap();
        assert_eq!(extracted.metadata.title.as_deref(), Some("A"));
        assert_eq!(extracted.metadata.tags, vec!["x"]);
        assert_eq!(extracted.content, "Body");
    }
}
