// Header folding for spreadsheet exports.
//
// Form tools repeat a header when a question appears in several sections,
// and exporters then suffix the copies. All functions here are pure over
// header lists so they can be tested without a data source.
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static DUPLICATE_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[_.\s]+\d+$").expect("valid suffix pattern"));

/// Make header names unique by appending `_1`, `_2`, ... to repeats.
///
/// The first occurrence keeps its name; order is preserved.
pub fn dedupe_headers(headers: &[String]) -> Vec<String> {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    headers
        .iter()
        .map(|h| match seen.get_mut(h.as_str()) {
            Some(n) => {
                *n += 1;
                format!("{}_{}", h, n)
            }
            None => {
                seen.insert(h.as_str(), 0);
                h.clone()
            }
        })
        .collect()
}

/// Trim a header and replace `-` with `_`.
pub fn clean_header(header: &str) -> String {
    header.trim().replace('-', "_")
}

/// Header with any trailing duplicate-disambiguation suffix removed.
///
/// `Action_2`, `Action.1` and `Action 3` all fold to `Action`; `Q1` stays `Q1`.
/// A suffix-only header such as `_1` (a repeated blank header) folds to `""`.
pub fn base_name(header: &str) -> &str {
    let trimmed = header.trim();
    match DUPLICATE_SUFFIX.find(trimmed) {
        Some(m) => &trimmed[..m.start()],
        None => trimmed,
    }
}

/// A set of working headers that fold into one base name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeGroup {
    pub base: String,
    pub members: Vec<usize>,
}

/// Group working headers by base name, in order of first appearance.
pub fn group_by_base(headers: &[String]) -> Vec<MergeGroup> {
    let mut groups: Vec<MergeGroup> = Vec::new();
    let mut by_base: HashMap<&str, usize> = HashMap::new();
    for (idx, h) in headers.iter().enumerate() {
        let base = base_name(h);
        match by_base.get(base) {
            Some(&g) => groups[g].members.push(idx),
            None => {
                by_base.insert(base, groups.len());
                groups.push(MergeGroup {
                    base: base.to_string(),
                    members: vec![idx],
                });
            }
        }
    }
    groups
}

/// Collapse every multi-member group into its base-name column.
///
/// Each merged column sits at its first member's position and, per row,
/// takes the first value that is non-blank after trimming, scanning the
/// members in header order. Single-member groups keep their header as is.
/// Returns the folded headers, the folded rows and the number of groups merged.
pub fn merge_duplicate_columns(
    headers: &[String],
    rows: &[Vec<String>],
) -> (Vec<String>, Vec<Vec<String>>, usize) {
    let groups = group_by_base(headers);
    let merged = groups.iter().filter(|g| g.members.len() > 1).count();

    let out_headers: Vec<String> = groups
        .iter()
        .map(|g| {
            if g.members.len() > 1 {
                g.base.clone()
            } else {
                headers[g.members[0]].clone()
            }
        })
        .collect();

    let out_rows = rows
        .iter()
        .map(|row| {
            groups
                .iter()
                .map(|g| {
                    g.members
                        .iter()
                        .filter_map(|&i| row.get(i))
                        .find(|v| !v.trim().is_empty())
                        .cloned()
                        .unwrap_or_default()
                })
                .collect()
        })
        .collect();

    (out_headers, out_rows, merged)
}
