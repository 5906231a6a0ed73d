// Block model - the editor's document tree
// Leaves carry inline markup, containers carry child blocks

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const PARAGRAPH: &str = "core/paragraph";
pub const FREEFORM: &str = "core/freeform";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub name: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attributes: Map<String, Value>,
    #[serde(default)]
    pub inner_html: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inner_blocks: Vec<Block>,
}

impl Block {
    pub fn new(name: impl Into<String>, inner_html: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Map::new(),
            inner_html: inner_html.into(),
            inner_blocks: Vec::new(),
        }
    }

    /// Paragraph wrapping already-rendered inline markup
    pub fn paragraph(markup: &str) -> Self {
        Self::new(PARAGRAPH, format!("<p>{markup}</p>"))
    }

    pub fn container(name: impl Into<String>, inner_blocks: Vec<Block>) -> Self {
        Self {
            name: name.into(),
            attributes: Map::new(),
            inner_html: String::new(),
            inner_blocks,
        }
    }

    pub fn with_attribute(mut self, key: &str, value: Value) -> Self {
        self.attributes.insert(key.to_string(), value);
        self
    }

    pub fn is_leaf(&self) -> bool {
        self.inner_blocks.is_empty()
    }
}
