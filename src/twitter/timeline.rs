//! Timeline instructions: flattening them into entries and finding the
//! pagination cursor.

use log::debug;
use serde::Deserialize;
use serde_json::Value;

use super::normalize::TweetRecord;

/// One page of a timeline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimelinePage {
    pub tweets: Vec<TweetRecord>,
    /// Cursor for the next (older) page, when the response carried one
    pub next_cursor: Option<String>,
}

/// A timeline instruction, tagged by its `type` field.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum Instruction {
    TimelineAddEntries {
        #[serde(default)]
        entries: Vec<Value>,
    },
    TimelineAddToModule {
        #[serde(default, rename = "moduleItems")]
        module_items: Vec<Value>,
    },
    TimelineReplaceEntry {
        entry: Value,
    },
    #[serde(other)]
    Other,
}

impl Instruction {
    /// Parses a raw instruction. Malformed instructions yield `None`.
    pub fn parse(raw: &Value) -> Option<Self> {
        match Instruction::deserialize(raw) {
            Ok(instruction) => Some(instruction),
            Err(e) => {
                debug!("Skipping malformed timeline instruction: {}", e);
                None
            }
        }
    }
}

/// Flattens instructions into their entries, in order.
///
/// `TimelineAddEntries` always contributes its `entries`; `TimelineAddToModule`
/// contributes its `moduleItems` only when `include_module_items` is set.
/// Every other instruction is ignored.
pub fn collect_entries(instructions: &[Value], include_module_items: bool) -> Vec<Value> {
    let mut entries = Vec::new();
    for instruction in instructions.iter().filter_map(Instruction::parse) {
        match instruction {
            Instruction::TimelineAddEntries { entries: added } => entries.extend(added),
            Instruction::TimelineAddToModule { module_items } if include_module_items => {
                entries.extend(module_items)
            }
            _ => {}
        }
    }
    entries
}

/// Finds the bottom cursor of a timeline response. The last one seen wins.
pub fn bottom_cursor(instructions: &[Value]) -> Option<String> {
    let mut cursor = None;
    for instruction in instructions.iter().filter_map(Instruction::parse) {
        let found = match &instruction {
            Instruction::TimelineAddEntries { entries } => {
                entries.iter().filter_map(bottom_cursor_value).last()
            }
            Instruction::TimelineReplaceEntry { entry } => bottom_cursor_value(entry),
            _ => None,
        };
        if found.is_some() {
            cursor = found;
        }
    }
    cursor
}

fn bottom_cursor_value(entry: &Value) -> Option<String> {
    let content = entry.get("content")?;
    let is_bottom = content.get("cursorType").and_then(Value::as_str) == Some("Bottom")
        || entry
            .get("entryId")
            .and_then(Value::as_str)
            .is_some_and(|id| id.starts_with("cursor-bottom-"));
    if !is_bottom {
        return None;
    }
    content
        .get("value")
        .and_then(Value::as_str)
        .map(str::to_string)
}
