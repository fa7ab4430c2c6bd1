//! Conversion between document bodies and the service's note markup.
//!
//! The real markdown converter lives outside this crate and plugs in via
//! [`ContentCodec`]. [`PlainTextCodec`] is a minimal line-preserving
//! implementation, good enough for plain-text notes and for tests.
//!
//! Resource references (`<en-media/>` elements) are spliced into the markup
//! at the codec's [`insertion_point`](ContentCodec::insertion_point), which
//! by default sits right before the closing `</en-note>` marker.

use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::{Result, SyncError};
use crate::models::Attachment;

pub const NOTE_OPEN: &str = "<en-note>";
pub const NOTE_CLOSE: &str = "</en-note>";

const PROLOG: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8"?>"#,
    r#"<!DOCTYPE en-note SYSTEM "http://xml.evernote.com/pub/enml2.dtd">"#
);

/// Bidirectional converter between body text and note markup.
pub trait ContentCodec: Send + Sync {
    /// Convert a document body into service markup.
    fn to_markup(&self, markdown: &str) -> Result<String>;

    /// Convert service markup back into a document body.
    fn to_markdown(&self, markup: &str) -> Result<String>;

    /// Byte offset in `markup` where resource references belong.
    ///
    /// The default is the start of the last closing note marker; markup
    /// without one cannot carry references.
    fn insertion_point(&self, markup: &str) -> Result<usize> {
        markup
            .rfind(NOTE_CLOSE)
            .ok_or_else(|| SyncError::Markup(format!("missing closing {NOTE_CLOSE} marker")))
    }
}

/// Render the reference element for one attachment.
pub fn media_reference(attachment: &Attachment) -> String {
    format!(
        r#"<en-media type="{}" hash="{}"/>"#,
        escape(attachment.mime.as_str()),
        attachment.hash_hex()
    )
}

/// Splice one reference per attachment into `markup`, in iteration order.
///
/// With no attachments the markup is returned untouched.
pub fn embed_resource_references<'a, I>(
    codec: &dyn ContentCodec,
    markup: &str,
    attachments: I,
) -> Result<String>
where
    I: IntoIterator<Item = &'a Attachment>,
{
    let references: String = attachments.into_iter().map(media_reference).collect();
    if references.is_empty() {
        return Ok(markup.to_string());
    }

    let at = codec.insertion_point(markup)?;
    let mut out = String::with_capacity(markup.len() + references.len());
    out.push_str(&markup[..at]);
    out.push_str(&references);
    out.push_str(&markup[at..]);
    Ok(out)
}

/// One `<div>` per body line; empty lines become `<div><br/></div>`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextCodec;

impl ContentCodec for PlainTextCodec {
    fn to_markup(&self, markdown: &str) -> Result<String> {
        let mut out = String::with_capacity(PROLOG.len() + markdown.len() + 64);
        out.push_str(PROLOG);
        out.push_str(NOTE_OPEN);
        for line in markdown.split('\n') {
            if line.is_empty() {
                out.push_str("<div><br/></div>");
            } else {
                out.push_str("<div>");
                out.push_str(&escape(line));
                out.push_str("</div>");
            }
        }
        out.push_str(NOTE_CLOSE);
        Ok(out)
    }

    fn to_markdown(&self, markup: &str) -> Result<String> {
        let mut reader = Reader::from_str(markup);
        reader.config_mut().trim_text(false);

        let mut lines: Vec<String> = Vec::new();
        let mut current = String::new();
        let mut depth = 0usize;

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) if e.name().as_ref() == b"div" => {
                    if depth == 0 {
                        current.clear();
                    }
                    depth += 1;
                }
                Ok(Event::End(e)) if e.name().as_ref() == b"div" => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        lines.push(std::mem::take(&mut current));
                    }
                }
                Ok(Event::Text(text)) => {
                    let text = text
                        .unescape()
                        .map_err(|e| SyncError::Markup(e.to_string()))?;
                    if depth > 0 {
                        current.push_str(&text);
                    } else if !text.trim().is_empty() {
                        lines.push(text.trim().to_string());
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => return Err(SyncError::Markup(e.to_string())),
            }
        }

        Ok(lines.join("\n"))
    }
}
