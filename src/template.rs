//! Conditional SQL Templates
//!
//! Stored SQL may carry optional fragments delimited by `/*[` and `]*/`.
//! A fragment is included (delimiters stripped) only when every bind
//! variable it references has a non-null entry in the bind map; otherwise
//! the whole fragment is removed. Combined with the validator's null
//! binding for omitted optionals, this lets one stored statement serve
//! any combination of supplied filters:
//!
//! ```sql
//! SELECT id, status FROM cases
//! WHERE 1 = 1
//! /*[ AND status = :status]*/
//! /*[ AND opened_at >= :since]*/
//! ```
//!
//! Rendering is pure text substitution over the statement, no SQL parsing.
//! It must happen before the statement reaches the driver: the delimiters
//! parse as ordinary bracket comments, so an unrendered block would be
//! silently discarded along with its filter.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

use crate::validate::BindMap;

static BLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)/\*\[(.+?)\]\*/").expect("block regex must compile"));
static BIND_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r":([a-zA-Z_][a-zA-Z0-9_]*)").expect("bind regex must compile"));

/// Render conditional blocks in `sql` against the bind map
///
/// Blocks are independent of each other; text outside blocks passes through
/// untouched. The result is trimmed of leading and trailing whitespace.
#[must_use]
pub fn render(sql: &str, bind: &BindMap) -> String {
    BLOCK_RE
        .replace_all(sql, |caps: &regex::Captures<'_>| {
            let content = &caps[1];
            let vars: HashSet<&str> = BIND_RE
                .captures_iter(content)
                .map(|c| {
                    let (_, [name]) = c.extract();
                    name
                })
                .collect();

            let all_present = !vars.is_empty()
                && vars
                    .iter()
                    .all(|v| matches!(bind.get(*v), Some(value) if !value.is_null()));

            if all_present {
                content.to_string()
            } else {
                String::new()
            }
        })
        .trim()
        .to_string()
}
