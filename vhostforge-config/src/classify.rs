//! Domain relationship classification
//!
//! Decides which records are subordinate ("child") entries of another record
//! in the same resolved set. This is a relational pass over the whole set;
//! it must run after the HTTP and TLS files are merged, never per file.

use std::collections::HashSet;
use vhostforge_core::SiteRecord;

/// Re-evaluate `is_subordinate` / `parent_domain` across the full set.
///
/// A record is subordinate iff its name has more than two labels and a
/// record whose domain equals the last two labels exists in the set. Set
/// membership exactly; no substring or suffix heuristics.
pub fn classify_relationships(records: &mut [SiteRecord]) {
    let names: HashSet<&str> = records.iter().map(|r| r.domain.as_str()).collect();

    let parents: Vec<Option<String>> = records
        .iter()
        .map(|r| candidate_parent(&r.domain).filter(|p| names.contains(p.as_str())))
        .collect();

    for (record, parent) in records.iter_mut().zip(parents) {
        match parent {
            Some(parent) => {
                record.is_subordinate = true;
                record.parent_domain = Some(parent);
            }
            None => {
                record.is_subordinate = false;
                record.parent_domain = None;
            }
        }
    }
}

/// Last two labels of a name with more than two labels
fn candidate_parent(domain: &str) -> Option<String> {
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() > 2 {
        Some(labels[labels.len() - 2..].join("."))
    } else {
        None
    }
}
