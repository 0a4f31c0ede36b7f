//! Top-level block extraction
//!
//! Finds `<VirtualHost ...>` blocks in a full file and records each one's
//! byte span, so mutation can splice a single block without disturbing the
//! bytes around it. Matching is an explicit forward scan, not a regular
//! expression: one block's closing tag must never be matched across an
//! unrelated later block.

const TAG: &str = "virtualhost";

/// One extracted top-level block with its source span
#[derive(Debug, Clone)]
pub struct Block {
    /// The opening tag as written, attributes included
    pub open_tag: String,
    /// Text between the opening tag's `>` and the closing tag's `<`
    pub interior: String,
    /// Exact source text of the whole block
    pub raw: String,
    /// Byte offset of `<` of the opening tag
    pub start: usize,
    /// Byte offset just past `>` of the closing tag
    pub end: usize,
}

/// Extract all well-formed top-level `<VirtualHost>` blocks, in file order.
/// A block with no matching close is skipped without affecting later blocks.
pub fn extract_blocks(text: &str) -> Vec<Block> {
    let lower = text.to_ascii_lowercase();
    let mut blocks = Vec::new();
    let mut i = 0;

    while let Some((start, open_end)) = find_open_tag(&lower, i) {
        let close = find_close_tag(&lower, open_end + 1);
        let next_open = find_open_tag(&lower, open_end + 1);

        // a close tag only belongs to this block if no new block opens first;
        // otherwise the block is unterminated and must not swallow its
        // neighbor
        let owned_close = close.filter(|(close_start, _)| {
            next_open.map(|(s, _)| *close_start < s).unwrap_or(true)
        });

        match owned_close {
            Some((close_start, close_end)) => {
                blocks.push(Block {
                    open_tag: text[start..=open_end].to_string(),
                    interior: text[open_end + 1..close_start].to_string(),
                    raw: text[start..close_end].to_string(),
                    start,
                    end: close_end,
                });
                i = close_end;
            }
            None => {
                tracing::warn!("unterminated VirtualHost block at byte {}, skipping", start);
                i = open_end + 1;
            }
        }
    }

    blocks
}

/// Find `<VirtualHost ...>` from `from`; returns (index of `<`, index of `>`)
fn find_open_tag(lower: &str, from: usize) -> Option<(usize, usize)> {
    let bytes = lower.as_bytes();
    let mut i = from;

    while i < bytes.len() {
        let lt = lower[i..].find('<').map(|p| p + i)?;
        let mut j = lt + 1;
        while j < bytes.len() && bytes[j].is_ascii_whitespace() {
            j += 1;
        }
        if lower[j..].starts_with(TAG) {
            let after = j + TAG.len();
            // tag name must end here; attributes or `>` may follow
            let boundary = bytes
                .get(after)
                .map(|b| b.is_ascii_whitespace() || *b == b'>')
                .unwrap_or(false);
            if boundary {
                if let Some(gt) = lower[after..].find('>').map(|p| p + after) {
                    return Some((lt, gt));
                }
            }
        }
        i = lt + 1;
    }

    None
}

/// Find `</VirtualHost>` from `from`; returns (index of `<`, index past `>`)
fn find_close_tag(lower: &str, from: usize) -> Option<(usize, usize)> {
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
            if lower[j..].starts_with(TAG) {
                let mut k = j + TAG.len();
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_block() {
        let text = "<VirtualHost *:80>\nServerName a.com\n</VirtualHost>\n";
        let blocks = extract_blocks(text);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].open_tag, "<VirtualHost *:80>");
        assert!(blocks[0].interior.contains("ServerName a.com"));
        assert_eq!(&text[blocks[0].start..blocks[0].end], blocks[0].raw);
    }

    #[test]
    fn test_two_blocks_do_not_bleed() {
        let text = concat!(
            "<VirtualHost *:80>\nServerName a.com\n</VirtualHost>\n",
            "# comment between\n",
            "<VirtualHost *:80>\nServerName b.com\n</VirtualHost>\n",
        );
        let blocks = extract_blocks(text);
        assert_eq!(blocks.len(), 2);
        assert!(blocks[0].raw.contains("a.com"));
        assert!(!blocks[0].raw.contains("b.com"));
        assert!(blocks[1].raw.contains("b.com"));
    }

    #[test]
    fn test_case_insensitive_and_spaced_tags() {
        let text = "< virtualhost *:443 >\nServerName a.com\n</ VIRTUALHOST >\n";
        let blocks = extract_blocks(text);
        assert_eq!(blocks.len(), 1);
    }

    #[test]
    fn test_unclosed_block_skipped() {
        let text = concat!(
            "<VirtualHost *:80>\nServerName broken.com\n",
            "<VirtualHost *:80>\nServerName ok.com\n</VirtualHost>\n",
        );
        let blocks = extract_blocks(text);
        // the unterminated block is dropped; the well-formed one survives
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].raw.contains("ok.com"));
        assert!(!blocks[0].raw.contains("broken.com"));
    }

    #[test]
    fn test_no_blocks() {
        assert!(extract_blocks("# nothing here\n").is_empty());
        assert!(extract_blocks("").is_empty());
    }

    #[test]
    fn test_attributes_not_parsed() {
        let text = "<VirtualHost 10.0.0.1:8080 [::1]:8080>\nServerName a.com\n</VirtualHost>";
        let blocks = extract_blocks(text);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].open_tag, "<VirtualHost 10.0.0.1:8080 [::1]:8080>");
    }

    #[test]
    fn test_nested_other_blocks_stay_inside() {
        let text = r#"<VirtualHost *:80>
ServerName a.com
<IfModule mod_ssl.c>
SSLEngine on
</IfModule>
</VirtualHost>"#;
        let blocks = extract_blocks(text);
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].interior.contains("</IfModule>"));
    }
}
