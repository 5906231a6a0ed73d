// Content analyzer - derives tags, title and file name from note content
// Pure functions, no storage access

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::codec::BlockCodec;
use crate::models::Block;

pub const TITLE_MAX_CHARS: usize = 50;
pub const TAG_MARKER: char = '#';

/// Characters no filesystem we sync to accepts in a file name
const DISALLOWED: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

static TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<u>(#[\p{L}\p{N}]+)</u>").expect("valid regex"));
static MARKUP_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));
static CONTROL_RUNS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\x00-\x1F\x7F-\x{9F}]+").expect("valid regex"));
static ENTITY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[a-zA-Z]+);").expect("valid regex"));

// ============================================
// TAGS
// ============================================

/// Distinct tags in first-seen order (`<u>#tag</u>` -> `#tag`)
pub fn extract_tags(text: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for caps in TAG_PATTERN.captures_iter(text) {
        let tag = &caps[1];
        if !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    }
    tags
}

/// Remove every tag token, wrapper included
pub fn strip_tags(text: &str) -> String {
    TAG_PATTERN.replace_all(text, "").into_owned()
}

// ============================================
// TITLE
// ============================================

fn flatten_blocks<'a>(blocks: &'a [Block], out: &mut Vec<&'a Block>) {
    for block in blocks {
        if block.is_leaf() {
            out.push(block);
        } else {
            flatten_blocks(&block.inner_blocks, out);
        }
    }
}

fn decode_entities(text: &str) -> String {
    ENTITY_PATTERN
        .replace_all(text, |caps: &Captures| {
            let entity = &caps[1];
            let decoded = if let Some(hex) = entity.strip_prefix("#x").or_else(|| entity.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = entity.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                match entity {
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    "nbsp" => Some('\u{A0}'),
                    _ => None,
                }
            };
            decoded.map_or_else(|| caps[0].to_string(), |c| c.to_string())
        })
        .into_owned()
}

/// Visible text of one leaf, ready to be a title candidate
fn title_candidate(codec: &dyn BlockCodec, block: &Block) -> String {
    let html = codec.render(block);
    let text = strip_tags(&html);
    let text = MARKUP_PATTERN.replace_all(&text, "");
    let truncated: String = text.trim().chars().take(TITLE_MAX_CHARS).collect();
    truncated.trim().to_string()
}

/// First non-empty line of text in the tree, or the second one when
/// `skip_first` is set. Empty string when the note has no text.
pub fn derive_title(codec: &dyn BlockCodec, blocks: &[Block], skip_first: bool) -> String {
    let mut leaves = Vec::new();
    flatten_blocks(blocks, &mut leaves);

    let mut skip = skip_first;
    for block in leaves {
        let candidate = title_candidate(codec, block);
        if candidate.is_empty() {
            continue;
        }
        if skip {
            skip = false;
            continue;
        }
        return decode_entities(&candidate);
    }
    String::new()
}

// ============================================
// FILE NAMES
// ============================================

/// Percent-encode characters file systems reject plus the tag marker, and
/// collapse control character runs into one space.
pub fn sanitize_file_name(name: &str) -> String {
    let mut encoded = String::with_capacity(name.len());
    for c in name.chars() {
        if DISALLOWED.contains(&c) || c == TAG_MARKER {
            encoded.push_str(&urlencoding::encode(c.encode_utf8(&mut [0; 4])));
        } else {
            encoded.push(c);
        }
    }
    CONTROL_RUNS.replace_all(&encoded, " ").into_owned()
}

/// File stem for a note: sanitized title followed by its tags.
/// `None` while the content has no title yet.
pub fn derive_file_name(title: &str, tags: &[String]) -> Option<String> {
    if title.is_empty() {
        return None;
    }
    let mut name = sanitize_file_name(title);
    if !tags.is_empty() {
        name.push(' ');
        name.push_str(&tags.join(" "));
    }
    Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::HtmlBlockCodec;

    #[test]
    fn extracts_and_strips_tags() {
        let text = "<u>#alpha</u> text <u>#Beta1</u>";
        assert_eq!(extract_tags(text), vec!["#alpha", "#Beta1"]);
        assert_eq!(strip_tags(text), " text ");
    }

    #[test]
    fn tags_are_deduplicated_and_unicode_aware() {
        let text = "<u>#café</u> <u>#日本</u> <u>#café</u> <u>#no space</u> #bare";
        assert_eq!(extract_tags(text), vec!["#café", "#日本"]);
        assert!(extract_tags("").is_empty());
    }

    #[test]
    fn title_skips_empty_blocks() {
        let blocks = vec![Block::paragraph(""), Block::paragraph("Hello world")];
        assert_eq!(derive_title(&HtmlBlockCodec, &blocks, false), "Hello world");

        let empty = vec![Block::paragraph(""), Block::paragraph("   ")];
        assert_eq!(derive_title(&HtmlBlockCodec, &empty, false), "");
        assert_eq!(derive_title(&HtmlBlockCodec, &[], false), "");
    }

    #[test]
    fn title_strips_markup_and_tags() {
        let blocks = vec![Block::paragraph("<u>#todo</u> <strong>Buy</strong> milk")];
        assert_eq!(derive_title(&HtmlBlockCodec, &blocks, false), "Buy milk");

        let tag_only = vec![Block::paragraph("<u>#todo</u>")];
        assert_eq!(derive_title(&HtmlBlockCodec, &tag_only, false), "");
    }

    #[test]
    fn title_is_truncated_and_decoded() {
        let long = "a".repeat(60);
        let blocks = vec![Block::paragraph(&long)];
        assert_eq!(derive_title(&HtmlBlockCodec, &blocks, false), "a".repeat(50));

        let blocks = vec![Block::paragraph("Tom &amp; Jerry &#8211; &#x41;")];
        assert_eq!(derive_title(&HtmlBlockCodec, &blocks, false), "Tom & Jerry \u{2013} A");
    }

    #[test]
    fn title_walks_nested_blocks_in_order() {
        let blocks = vec![
            Block::container(
                "core/group",
                vec![Block::paragraph(""), Block::paragraph("Inner")],
            ),
            Block::paragraph("Outer"),
        ];
        assert_eq!(derive_title(&HtmlBlockCodec, &blocks, false), "Inner");
        assert_eq!(derive_title(&HtmlBlockCodec, &blocks, true), "Outer");
    }

    #[test]
    fn skip_first_is_consumed_once() {
        let blocks = vec![
            Block::paragraph("First"),
            Block::paragraph(""),
            Block::paragraph("Second"),
            Block::paragraph("Third"),
        ];
        assert_eq!(derive_title(&HtmlBlockCodec, &blocks, true), "Second");
        assert_eq!(derive_title(&HtmlBlockCodec, &blocks[..1], true), "");
    }

    #[test]
    fn sanitizes_disallowed_characters() {
        assert_eq!(sanitize_file_name(r#"a/b\c:d*e?f"g<h>i|j#k"#), "a%2Fb%5Cc%3Ad%2Ae%3Ff%22g%3Ch%3Ei%7Cj%23k");
        assert_eq!(sanitize_file_name("line\u{0}\u{1}\u{1F}break\u{85}end"), "line break end");
        assert_eq!(sanitize_file_name("Plain title"), "Plain title");
    }

    #[test]
    fn file_name_appends_tags() {
        let tags = vec!["#work".to_string(), "#urgent".to_string()];
        assert_eq!(derive_file_name("Fix #3", &tags).as_deref(), Some("Fix %233 #work #urgent"));
        assert_eq!(derive_file_name("Plain", &[]).as_deref(), Some("Plain"));
        assert_eq!(derive_file_name("", &tags), None);
    }
}
