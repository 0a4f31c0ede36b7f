//! Directive tokenizer
//!
//! Turns one block's interior into a multi-valued directive map. The grammar
//! is line oriented: `#` starts a comment unless escaped, a trailing `\`
//! continues the value on the next line, and blank lines terminate whatever
//! is being accumulated. Nested `<Name>...</Name>` sub-blocks are re-scanned
//! into the same map; nested context is intentionally not distinguished from
//! top-level context, matching the permissive lookup of the tool that wrote
//! these files.

use std::collections::HashMap;

/// Lower-cased directive name to its values, repeats appended in order
pub type DirectiveMap = HashMap<String, Vec<String>>;

/// Line-scanning state: either between directives or accumulating a
/// continued value
enum ScanState {
    Idle,
    Accumulating { name: String, value: String },
}

/// Tokenize a block interior into a directive map
pub fn tokenize(text: &str) -> DirectiveMap {
    let mut map = DirectiveMap::new();
    collect(text, &mut map);
    map
}

fn collect(text: &str, map: &mut DirectiveMap) {
    scan_lines(text, map);
    for interior in nested_interiors(text) {
        collect(interior, map);
    }
}

fn scan_lines(text: &str, map: &mut DirectiveMap) {
    let mut state = ScanState::Idle;

    for raw_line in text.lines() {
        let line = strip_comment(raw_line);
        let line = line.trim();

        state = match state {
            ScanState::Idle => {
                if line.is_empty() || !starts_directive(line) {
                    ScanState::Idle
                } else {
                    let (name, rest) = split_directive(line);
                    step(map, name, rest.to_string())
                }
            }
            ScanState::Accumulating { name, mut value } => {
                if line.is_empty() {
                    // blank line force-commits the pending directive
                    commit(map, &name, value);
                    ScanState::Idle
                } else {
                    value.push(' ');
                    value.push_str(line);
                    step(map, name, value)
                }
            }
        };
    }

    // unterminated continuation at end-of-text commits what accumulated
    if let ScanState::Accumulating { name, value } = state {
        commit(map, &name, value);
    }
}

/// Commit the value unless it still carries the continuation marker
fn step(map: &mut DirectiveMap, name: String, mut value: String) -> ScanState {
    if value.ends_with('\\') {
        value.pop();
        let value = value.trim_end().to_string();
        ScanState::Accumulating { name, value }
    } else {
        commit(map, &name, value);
        ScanState::Idle
    }
}

fn commit(map: &mut DirectiveMap, name: &str, value: String) {
    map.entry(name.to_ascii_lowercase()).or_default().push(value);
}

/// A directive line opens with a plain word; tag lines and leftovers do not
fn starts_directive(line: &str) -> bool {
    line.chars()
        .next()
        .map(|c| c.is_ascii_alphabetic())
        .unwrap_or(false)
}

fn split_directive(line: &str) -> (String, &str) {
    match line.split_once(char::is_whitespace) {
        Some((name, rest)) => (name.to_string(), rest.trim_start()),
        None => (line.to_string(), ""),
    }
}

/// Cut the line at the first unescaped `#`
fn strip_comment(line: &str) -> &str {
    let bytes = line.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'#' => return &line[..i],
            _ => i += 1,
        }
    }
    line
}

/// Interiors of the outermost nested `<Name ...>...</Name>` pairs, in order.
/// Deeper nesting is reached through recursion in `collect`.
fn nested_interiors(text: &str) -> Vec<&str> {
    let lower = text.to_ascii_lowercase();
    let bytes = lower.as_bytes();
    let mut interiors = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let Some(lt) = lower[i..].find('<').map(|p| p + i) else {
            break;
        };

        match parse_open_tag(bytes, lt) {
            Some((name_start, name_end, open_end)) => {
                let name = &lower[name_start..name_end];
                match find_close_tag(&lower, name, open_end + 1) {
                    Some((close_start, close_end)) => {
                        interiors.push(&text[open_end + 1..close_start]);
                        i = close_end;
                    }
                    None => {
                        // unmatched open tag: skip past it and keep scanning
                        i = open_end + 1;
                    }
                }
            }
            None => i = lt + 1,
        }
    }

    interiors
}

/// Parse `<Name ...>` at `lt`; returns (name_start, name_end, index of `>`)
fn parse_open_tag(bytes: &[u8], lt: usize) -> Option<(usize, usize, usize)> {
    let mut i = lt + 1;
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    if i >= bytes.len() || !bytes[i].is_ascii_alphabetic() {
        return None;
    }
    let name_start = i;
    while i < bytes.len() && bytes[i].is_ascii_alphanumeric() {
        i += 1;
    }
    let name_end = i;
    while i < bytes.len() && bytes[i] != b'>' && bytes[i] != b'<' {
        i += 1;
    }
    if i < bytes.len() && bytes[i] == b'>' {
        Some((name_start, name_end, i))
    } else {
        None
    }
}

/// Find `</name>` (whitespace tolerated) in the lower-cased text from `from`;
/// returns (start of `<`, index past `>`)
fn find_close_tag(lower: &str, name: &str, from: usize) -> Option<(usize, usize)> {
    let bytes = lower.as_bytes();
    let mut i = from;

    while i < bytes.len() {
        let lt = lower[i..].find('<').map(|p| p + i)?;
        let mut j = lt + 1;
        while j < bytes.len() && bytes[j].is_ascii_whitespace() {
            j += 1;
        }
        if j < bytes.len() && bytes[j] == b'/' {
            j += 1;
            while j < bytes.len() && bytes[j].is_ascii_whitespace() {
                j += 1;
            }
            if lower[j..].starts_with(name) {
                let mut k = j + name.len();
                while k < bytes.len() && bytes[k].is_ascii_whitespace() {
                    k += 1;
                }
                if k < bytes.len() && bytes[k] == b'>' {
                    return Some((lt, k + 1));
                }
            }
        }
        i = lt + 1;
    }

    None
}
