//! Plain-text layout engine for notification email bodies.
//!
//! Two pure, deterministic operations: greedy word wrap ([`wrap`]) and
//! the aligned changed-lines table ([`format_table`]). Both are
//! stateless; the table formatter validates its input contract and
//! fails loudly instead of emitting a malformed table.

use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Input-contract violations of the table formatter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    /// No rows were supplied. Checked explicitly so the column-width
    /// aggregation never runs over an empty set.
    #[error("cannot format a table with no rows")]
    EmptyInput,

    /// The available width cannot fit the indent and counts column,
    /// leaving no room for the path column.
    #[error("available width {available} leaves no room for paths (indent {indent}, counts column {counts})")]
    Overflow {
        available: usize,
        indent: usize,
        counts: usize,
    },
}

// ---------------------------------------------------------------------------
// Word wrap
// ---------------------------------------------------------------------------

/// Greedily wrap `text` into lines of at most `width` characters.
///
/// A single token longer than `width` is emitted whole on its own line;
/// tokens are never split. Whitespace between tokens collapses to a
/// single space.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for token in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(token);
        } else if current.len() + 1 + token.len() <= width {
            current.push(' ');
            current.push_str(token);
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(token);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

// ---------------------------------------------------------------------------
// Changed-lines table
// ---------------------------------------------------------------------------

/// How many decimal digits a count needs.
fn digit_width(value: u32) -> usize {
    value.to_string().len()
}

/// Truncate `path` in the middle so it renders at exactly `width`
/// characters, keeping the leading and trailing parts around a literal
/// `" ... "` marker.
///
/// `left` is the floor of `(width - 5) / 2`; the remainder goes to the
/// right half, so the result is exact for odd and even widths alike.
fn truncate_middle(path: &str, width: usize) -> String {
    let left = (width - 5) / 2;
    let right = (width - 5) - left;
    let chars: Vec<char> = path.chars().collect();
    let head: String = chars[..left].iter().collect();
    let tail: String = chars[chars.len() - right..].iter().collect();
    format!("{head} ... {tail}")
}

/// Render an aligned table of per-file change counts.
///
/// `rows` maps file path to `(deleted, inserted)` line counts. Output
/// rows are sorted by path ascending, one line per file:
///
/// ```text
///   a/b.py                -3/+10
///   longpat ... /name.py  -0/+ 1
/// ```
///
/// Every rendered line is `indent` + a path field padded to a common
/// width + a counts field `  -<deleted>/+<inserted>` whose numeric
/// columns are sized by the widest count, so all lines share one total
/// length. Paths longer than the path column are truncated in the
/// middle with a `" ... "` marker.
///
/// Fails with [`LayoutError::EmptyInput`] on an empty `rows`, and with
/// [`LayoutError::Overflow`] if `available_width` cannot fit the indent
/// and counts column.
pub fn format_table(
    rows: &BTreeMap<String, (u32, u32)>,
    available_width: usize,
    indent: &str,
) -> Result<Vec<String>, LayoutError> {
    if rows.is_empty() {
        return Err(LayoutError::EmptyInput);
    }

    let max_path_length = rows.keys().map(|p| p.chars().count()).max().unwrap_or(0);
    let deleted_width = rows
        .values()
        .map(|&(deleted, _)| deleted)
        .max()
        .map(digit_width)
        .unwrap_or(1);
    let inserted_width = rows
        .values()
        .map(|&(_, inserted)| inserted)
        .max()
        .map(digit_width)
        .unwrap_or(1);

    // Two-space lead-in, "-", deleted digits, "/+", inserted digits.
    let counts_len = 2 + 1 + deleted_width + 2 + inserted_width;

    let path_width = available_width
        .checked_sub(indent.len() + counts_len)
        .map(|budget| budget.min(max_path_length))
        .unwrap_or(0);
    // A column that needs the middle-ellipsis marker must at least fit
    // `x ... y`, so truncation below 7 columns is also an overflow.
    if path_width == 0 || (max_path_length > path_width && path_width < 7) {
        return Err(LayoutError::Overflow {
            available: available_width,
            indent: indent.len(),
            counts: counts_len,
        });
    }

    // BTreeMap iteration is already path-ascending.
    let mut lines = Vec::with_capacity(rows.len());
    for (path, &(deleted, inserted)) in rows {
        let field = if path.chars().count() > path_width {
            truncate_middle(path, path_width)
        } else {
            format!("{path:<path_width$}")
        };
        lines.push(format!(
            "{indent}{field}  -{deleted:>deleted_width$}/+{inserted:>inserted_width$}"
        ));
    }
    Ok(lines)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
