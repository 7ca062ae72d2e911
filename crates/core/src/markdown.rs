// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Bramble Authors

//! Markdown-derived note metadata: title, hashtags, image references.

use pulldown_cmark::{Event, Parser, Tag, TagEnd};

/// Extract the note title from the first heading in the content.
pub fn derive_title(content: &str) -> Option<String> {
    let mut in_heading = false;
    let mut buf = String::new();
    for event in Parser::new(content) {
        match event {
            Event::Start(Tag::Heading { .. }) => in_heading = true,
            Event::End(TagEnd::Heading(_)) => {
                let title = buf.trim();
                if !title.is_empty() {
                    return Some(title.to_string());
                }
                buf.clear();
                in_heading = false;
            }
            Event::Text(text) if in_heading => buf.push_str(&text),
            Event::Code(code) if in_heading => buf.push_str(&code),
            _ => {}
        }
    }
    None
}

/// Extract `#hashtag` tokens from the content.
///
/// A tag starts with `#` at a word boundary and runs over alphanumerics,
/// `-` and `_`. Heading markers (`# `, `##`) produce no tag because nothing
/// taggable follows the `#`; all-digit tokens like `#123` are treated as
/// references, not tags. The result is sorted and deduplicated.
pub fn extract_tags(content: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    let mut prev: Option<char> = None;
    let mut chars = content.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '#' && prev.map_or(true, char::is_whitespace) {
            let mut tag = String::new();
            while let Some(&next) = chars.peek() {
                if next.is_alphanumeric() || next == '-' || next == '_' {
                    tag.push(next);
                    chars.next();
                } else {
                    break;
                }
            }
            prev = tag.chars().last().or(Some('#'));
            if !tag.is_empty() && !tag.chars().all(|ch| ch.is_ascii_digit()) {
                tags.push(tag);
            }
            continue;
        }
        prev = Some(c);
    }
    tags.sort();
    tags.dedup();
    tags
}

/// Collect the filenames of locally referenced images (non-URL destinations).
pub fn referenced_images(content: &str) -> Vec<String> {
    let mut images: Vec<String> = Vec::new();
    for event in Parser::new(content) {
        if let Event::Start(Tag::Image { dest_url, .. }) = event {
            let dest = dest_url.to_string();
            if !dest.is_empty() && !dest.contains("://") {
                images.push(dest);
            }
        }
    }
    images.sort();
    images.dedup();
    images
}

#[cfg(test)]
#[path = "markdown_tests.rs"]
mod tests;
