// Block codec - the editor's serialized format
// Blocks are delimited by HTML comments: <!-- wp:name {attrs} -->inner<!-- /wp:name -->

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use crate::models::block::{Block, FREEFORM};

const CORE_NAMESPACE: &str = "core/";

static DELIMITER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<!--\s+(/)?wp:([a-z][a-z0-9_-]*(?:/[a-z][a-z0-9_-]*)?)\s+(\{.*?\}\s+)?(/)?-->")
        .expect("valid regex")
});

/// Serialization capability supplied by the editor. Pure and synchronous.
pub trait BlockCodec: Send + Sync {
    fn serialize(&self, blocks: &[Block]) -> String;
    fn parse(&self, text: &str) -> Vec<Block>;

    /// Inline markup of a leaf block
    fn render(&self, block: &Block) -> String {
        block.inner_html.clone()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlBlockCodec;

fn delimiter_name(name: &str) -> &str {
    name.strip_prefix(CORE_NAMESPACE).unwrap_or(name)
}

fn block_name(delimiter: &str) -> String {
    if delimiter.contains('/') {
        delimiter.to_string()
    } else {
        format!("{CORE_NAMESPACE}{delimiter}")
    }
}

fn serialize_block(block: &Block, out: &mut String) {
    if block.name == FREEFORM {
        out.push_str(&block.inner_html);
        return;
    }

    let name = delimiter_name(&block.name);
    let attrs = if block.attributes.is_empty() {
        String::new()
    } else {
        format!("{} ", Value::Object(block.attributes.clone()))
    };

    if block.is_leaf() && block.inner_html.is_empty() {
        out.push_str(&format!("<!-- wp:{name} {attrs}/-->"));
        return;
    }

    out.push_str(&format!("<!-- wp:{name} {attrs}-->\n"));
    if block.is_leaf() {
        out.push_str(&block.inner_html);
    } else {
        for (i, child) in block.inner_blocks.iter().enumerate() {
            if i > 0 {
                out.push_str("\n\n");
            }
            serialize_block(child, out);
        }
    }
    out.push_str(&format!("\n<!-- /wp:{name} -->"));
}

struct Frame {
    name: String,
    attributes: Map<String, Value>,
    content_start: usize,
    children: Vec<Block>,
}

impl Frame {
    fn close(self, text: &str, content_end: usize) -> Block {
        if self.children.is_empty() {
            let raw = &text[self.content_start..content_end];
            let raw = raw.strip_prefix('\n').unwrap_or(raw);
            let raw = raw.strip_suffix('\n').unwrap_or(raw);
            Block {
                name: self.name,
                attributes: self.attributes,
                inner_html: raw.to_string(),
                inner_blocks: Vec::new(),
            }
        } else {
            Block {
                name: self.name,
                attributes: self.attributes,
                inner_html: String::new(),
                inner_blocks: self.children,
            }
        }
    }
}

fn parse_attributes(raw: Option<&str>) -> Map<String, Value> {
    raw.and_then(|json| serde_json::from_str::<Map<String, Value>>(json.trim()).ok())
        .unwrap_or_default()
}

fn push_block(stack: &mut [Frame], output: &mut Vec<Block>, block: Block) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(block),
        None => output.push(block),
    }
}

fn push_freeform(output: &mut Vec<Block>, text: &str) {
    let text = text.trim();
    if !text.is_empty() {
        output.push(Block::new(FREEFORM, text));
    }
}

impl BlockCodec for HtmlBlockCodec {
    fn serialize(&self, blocks: &[Block]) -> String {
        let mut out = String::new();
        for (i, block) in blocks.iter().enumerate() {
            if i > 0 {
                out.push_str("\n\n");
            }
            serialize_block(block, &mut out);
        }
        out
    }

    fn parse(&self, text: &str) -> Vec<Block> {
        let mut output = Vec::new();
        let mut stack: Vec<Frame> = Vec::new();
        let mut last_end = 0;

        for caps in DELIMITER.captures_iter(text) {
            let Some(whole) = caps.get(0) else { continue };
            if stack.is_empty() {
                push_freeform(&mut output, &text[last_end..whole.start()]);
            }
            last_end = whole.end();

            let is_closer = caps.get(1).is_some();
            let is_void = caps.get(4).is_some();
            let name = block_name(&caps[2]);

            if is_closer {
                if let Some(frame) = stack.pop() {
                    let block = frame.close(text, whole.start());
                    push_block(&mut stack, &mut output, block);
                }
                continue;
            }

            let attributes = parse_attributes(caps.get(3).map(|m| m.as_str()));
            if is_void {
                let mut block = Block::new(name, "");
                block.attributes = attributes;
                push_block(&mut stack, &mut output, block);
            } else {
                stack.push(Frame {
                    name,
                    attributes,
                    content_start: whole.end(),
                    children: Vec::new(),
                });
            }
        }

        // Unterminated blocks swallow the rest of the document
        while let Some(frame) = stack.pop() {
            let block = frame.close(text, text.len());
            push_block(&mut stack, &mut output, block);
            last_end = text.len();
        }
        push_freeform(&mut output, &text[last_end..]);

        output
    }
}
