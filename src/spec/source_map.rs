//! Line and column lookup for YAML documents.
//!
//! `serde_yaml` does not keep positions once a document is turned into a
//! `serde_json::Value`, so block-style YAML is scanned line by line and every
//! mapping key and sequence item is recorded under its JSON pointer. Flow
//! collections and multi-line scalars are treated as leaves.

use super::push_pointer;
use super::types::SourcePosition;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct SourceMap {
    positions: HashMap<String, SourcePosition>,
}

#[derive(Debug, PartialEq, Eq)]
enum FrameKind {
    Root,
    Key,
    Item,
}

#[derive(Debug)]
struct Frame {
    indent: isize,
    kind: FrameKind,
    pointer: String,
    items_seen: usize,
}

impl SourceMap {
    pub fn from_yaml(text: &str) -> Self {
        let mut positions = HashMap::new();
        let mut stack = vec![root_frame()];
        // Lines indented deeper than this belong to a scalar value.
        let mut skip_deeper: Option<usize> = None;

        for (n, raw) in text.lines().enumerate() {
            let line_no = n + 1;
            let line = raw.trim_end();
            let indent = line.len() - line.trim_start_matches(' ').len();
            let content = &line[indent..];
            if content.is_empty() || content.starts_with('#') {
                continue;
            }
            if let Some(limit) = skip_deeper {
                if indent > limit {
                    continue;
                }
                skip_deeper = None;
            }
            if indent == 0 && (content.starts_with("---") || content.starts_with("...")) {
                stack.truncate(1);
                continue;
            }

            let mut col = indent;
            let mut rest = content;

            if rest == "-" || rest.starts_with("- ") {
                while let Some(top) = stack.last() {
                    let pops = top.indent > col as isize
                        || (top.indent == col as isize && top.kind == FrameKind::Item);
                    if pops && top.kind != FrameKind::Root {
                        stack.pop();
                    } else {
                        break;
                    }
                }
                let Some(parent) = stack.last_mut() else {
                    continue;
                };
                let index = parent.items_seen;
                parent.items_seen += 1;
                let pointer = push_pointer(&parent.pointer, &index.to_string());
                positions.insert(
                    pointer.clone(),
                    SourcePosition {
                        line: line_no,
                        column: col + 1,
                    },
                );
                stack.push(Frame {
                    indent: col as isize,
                    kind: FrameKind::Item,
                    pointer,
                    items_seen: 0,
                });

                let after_dash = &rest[1..];
                let trimmed = after_dash.trim_start_matches(' ');
                let dash_col = col;
                col += 1 + (after_dash.len() - trimmed.len());
                rest = trimmed;
                if rest.is_empty() || rest.starts_with('#') {
                    continue;
                }
                if parse_key(rest).is_none() {
                    skip_deeper = Some(dash_col);
                    continue;
                }
            }

            let Some((key, value)) = parse_key(rest) else {
                continue;
            };
            while let Some(top) = stack.last() {
                if top.indent >= col as isize && top.kind != FrameKind::Root {
                    stack.pop();
                } else {
                    break;
                }
            }
            let parent_pointer = stack.last().map(|f| f.pointer.as_str()).unwrap_or("");
            let pointer = push_pointer(parent_pointer, &key);
            positions.insert(
                pointer.clone(),
                SourcePosition {
                    line: line_no,
                    column: col + 1,
                },
            );
            stack.push(Frame {
                indent: col as isize,
                kind: FrameKind::Key,
                pointer,
                items_seen: 0,
            });
            if !opens_block(value) {
                skip_deeper = Some(col);
            }
        }

        SourceMap { positions }
    }

    pub fn position(&self, pointer: &str) -> Option<SourcePosition> {
        self.positions.get(pointer).copied()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

fn root_frame() -> Frame {
    Frame {
        indent: -1,
        kind: FrameKind::Root,
        pointer: String::new(),
        items_seen: 0,
    }
}

/// True when the value after `key:` leaves room for nested block content.
fn opens_block(value: &str) -> bool {
    let value = value.trim();
    value.is_empty()
        || value.starts_with('#')
        || (value.starts_with('&') && !value.contains(' '))
        || value.starts_with("!!")
}

/// Splits `key: value` into the unquoted key and the remainder after the colon.
fn parse_key(s: &str) -> Option<(String, &str)> {
    let (key, after) = match s.chars().next()? {
        '"' => {
            let end = closing_double_quote(s)?;
            let key = s[1..end].replace("\\\"", "\"").replace("\\\\", "\\");
            (key, s[end + 1..].trim_start())
        }
        '\'' => {
            let end = closing_single_quote(s)?;
            (s[1..end].replace("''", "'"), s[end + 1..].trim_start())
        }
        '[' | '{' | '&' | '*' | '!' | '|' | '>' | '%' | '@' | '`' | '?' => return None,
        _ => {
            let idx = plain_key_end(s)?;
            let key = s[..idx].trim_end();
            if key.is_empty() {
                return None;
            }
            (key.to_string(), &s[idx..])
        }
    };
    let value = after.strip_prefix(':')?;
    if !(value.is_empty() || value.starts_with(' ')) {
        return None;
    }
    Some((key, value))
}

fn plain_key_end(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        if *b == b'#' && i > 0 && bytes[i - 1] == b' ' {
            return None;
        }
        if *b == b':' && (i + 1 == bytes.len() || bytes[i + 1] == b' ') {
            return Some(i);
        }
    }
    None
}

fn closing_double_quote(s: &str) -> Option<usize> {
    let mut escaped = false;
    for (i, c) in s.char_indices().skip(1) {
        match c {
            '\\' if !escaped => escaped = true,
            '"' if !escaped => return Some(i),
            _ => escaped = false,
        }
    }
    None
}

fn closing_single_quote(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut i = 1;
    while i < bytes.len() {
        if bytes[i] == b'\'' {
            if bytes.get(i + 1) == Some(&b'\'') {
                i += 2;
                continue;
            }
            return Some(i);
        }
        i += 1;
    }
    None
}
