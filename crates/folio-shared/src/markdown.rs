//! Markdown to HTML rendering.
//!
//! Callers depend on [`MarkdownRenderer`] so the engine can be swapped
//! without touching the HTTP layer.

use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag};

pub trait MarkdownRenderer: Send + Sync {
    fn render(&self, source: &str) -> String;
}

/// CommonMark renderer with the GitHub-flavoured extensions blog posts
/// tend to use. Raw HTML blocks are emitted as escaped text, and link or
/// image destinations outside [`is_safe_url`] are blanked.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommonMarkRenderer;

impl CommonMarkRenderer {
    fn options() -> Options {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options
    }
}

impl MarkdownRenderer for CommonMarkRenderer {
    fn render(&self, source: &str) -> String {
        let parser = Parser::new_ext(source, Self::options()).map(|event| match event {
            Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
            Event::Start(Tag::Link {
                link_type,
                dest_url,
                title,
                id,
            }) if !is_safe_url(&dest_url) => Event::Start(Tag::Link {
                link_type,
                dest_url: CowStr::Borrowed("#"),
                title,
                id,
            }),
            Event::Start(Tag::Image {
                link_type,
                dest_url,
                title,
                id,
            }) if !is_safe_url(&dest_url) => Event::Start(Tag::Image {
                link_type,
                dest_url: CowStr::Borrowed(""),
                title,
                id,
            }),
            other => other,
        });

        let mut out = String::with_capacity(source.len() + source.len() / 2);
        html::push_html(&mut out, parser);
        out
    }
}

/// Relative references and `http`, `https` and `mailto` URLs. Any other
/// scheme (`javascript:`, `data:`, `vbscript:` ...) is refused.
pub fn is_safe_url(dest: &str) -> bool {
    let dest = dest.trim_start();
    match dest.find([':', '/', '?', '#']) {
        Some(i) if dest[i..].starts_with(':') => {
            let scheme = dest[..i].to_ascii_lowercase();
            matches!(scheme.as_str(), "http" | "https" | "mailto")
        }
        _ => true,
    }
}
