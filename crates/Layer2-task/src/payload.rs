//! Aggregated interpreter payload

use serde::{Deserialize, Serialize};

/// Separator placed between blocks and in place of line breaks
pub const BLOCK_SEPARATOR: &str = ";";

/// Python blocks collected from one document, in source order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedPayload {
    blocks: Vec<String>,
}

impl AggregatedPayload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_blocks<I, S>(blocks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut payload = Self::new();
        for block in blocks {
            payload.push(block);
        }
        payload
    }

    /// Append one block. Blank blocks are dropped: an empty statement between
    /// two separators is a Python syntax error.
    pub fn push(&mut self, body: impl Into<String>) {
        let body = body.into();
        if !body.trim().is_empty() {
            self.blocks.push(body);
        }
    }

    pub fn blocks(&self) -> &[String] {
        &self.blocks
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Single-line form: line breaks become `;`, double quotes become single
    /// quotes, blocks are joined with `;`.
    pub fn inline(&self) -> String {
        self.blocks
            .iter()
            .map(|block| normalize(block))
            .collect::<Vec<_>>()
            .join(BLOCK_SEPARATOR)
    }

    /// Script form: blocks verbatim, one after another
    pub fn script(&self) -> String {
        let mut script = self.blocks.join("\n");
        if !script.is_empty() {
            script.push('\n');
        }
        script
    }
}

impl std::fmt::Display for AggregatedPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.inline())
    }
}

fn normalize(block: &str) -> String {
    block
        .replace("\r\n", BLOCK_SEPARATOR)
        .replace(['\n', '\r'], BLOCK_SEPARATOR)
        .replace('"', "'")
}
