//! Text sanitization and markdown rendering used before anything user-supplied
//! is stored or displayed.

use std::sync::OnceLock;

use pulldown_cmark::{CowStr, Event, Options, Parser, Tag, html};
use regex::Regex;

pub trait Sanitizer {
    /// Returns `raw` with executable and markup content removed.
    fn sanitize(&self, raw: &str) -> String;
}

pub trait MarkdownRenderer {
    /// Renders markdown to an HTML fragment that is safe to display as-is.
    fn render(&self, source: &str) -> String;
}

/// Strips tags, and the bodies of `script`/`style` elements, until nothing
/// tag-shaped remains. The result is plain text and is not escaped; pass it
/// through [`escape_html`] before embedding it in markup.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlSanitizer;

impl Sanitizer for HtmlSanitizer {
    fn sanitize(&self, raw: &str) -> String {
        let (blocks, tags) = patterns();
        let mut current = raw.to_string();
        loop {
            let without_blocks = blocks.replace_all(&current, "");
            let next = tags.replace_all(&without_blocks, "").into_owned();
            if next == current {
                return next;
            }
            current = next;
        }
    }
}

fn patterns() -> &'static (Regex, Regex) {
    static PATTERNS: OnceLock<(Regex, Regex)> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let blocks = Regex::new(r"(?is)<(script|style|iframe|object)\b[^>]*>.*?</\s*(script|style|iframe|object)\s*>")
            .expect("static pattern compiles");
        let tags = Regex::new(r"(?s)<!--.*?-->|</?[A-Za-z!/][^<>]*>")
            .expect("static pattern compiles");
        (blocks, tags)
    })
}

/// CommonMark renderer. Raw HTML in the source is shown as text and links with
/// script-capable schemes are neutralized.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommonMarkRenderer;

impl MarkdownRenderer for CommonMarkRenderer {
    fn render(&self, source: &str) -> String {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_TASKLISTS);

        let events = Parser::new_ext(source, options).map(|event| match event {
            Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
            Event::Start(Tag::Link {
                link_type,
                dest_url,
                title,
                id,
            }) => Event::Start(Tag::Link {
                link_type,
                dest_url: safe_url(dest_url),
                title,
                id,
            }),
            Event::Start(Tag::Image {
                link_type,
                dest_url,
                title,
                id,
            }) => Event::Start(Tag::Image {
                link_type,
                dest_url: safe_url(dest_url),
                title,
                id,
            }),
            other => other,
        });

        let mut out = String::with_capacity(source.len() * 3 / 2);
        html::push_html(&mut out, events);
        out
    }
}

fn safe_url(url: CowStr<'_>) -> CowStr<'_> {
    let scheme = url
        .trim_start()
        .split(':')
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    let has_scheme = url.contains(':');
    if has_scheme && matches!(scheme.as_str(), "javascript" | "vbscript" | "data") {
        CowStr::Borrowed("#")
    } else {
        url
    }
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}
