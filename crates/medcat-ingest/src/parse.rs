//! Cell value parsers.
//!
//! Every function here is total: any input, including a missing cell, maps to
//! a value and nothing panics or errors. Re-parsing the same input always
//! yields the same output.

const PLACEHOLDERS: &[&str] = &["", "n/a", "na", "-"];
const TRUTHY: &[&str] = &["yes", "y", "true", "1"];

fn is_placeholder(lowered: &str) -> bool {
    PLACEHOLDERS.contains(&lowered)
}

/// `yes`/`y`/`true`/`1` (any case) are `true`; everything else is `false`.
#[must_use]
pub fn parse_bool(raw: Option<&str>) -> bool {
    raw.is_some_and(|s| TRUTHY.contains(&s.trim().to_lowercase().as_str()))
}

/// Parse a count out of noisy spreadsheet text.
///
/// Thousands separators, apostrophes and whitespace are stripped before an
/// integer parse, then a float parse (truncated toward zero). If both fail the
/// longest run of digits is used. Placeholders and text without digits give
/// `None`, as does anything outside the `i64` range.
#[must_use]
pub fn parse_int(raw: Option<&str>) -> Option<i64> {
    let lowered = raw?.trim().to_lowercase();
    if is_placeholder(&lowered) {
        return None;
    }

    let cleaned: String = lowered
        .chars()
        .filter(|c| !(c.is_whitespace() || matches!(c, '\'' | ',' | '\u{2019}')))
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    if let Ok(value) = cleaned.parse::<i64>() {
        return Some(value);
    }
    if let Ok(value) = cleaned.parse::<f64>() {
        if value.is_finite() && value.abs() < 9.0e18 {
            #[allow(clippy::cast_possible_truncation)]
            let truncated = value.trunc() as i64;
            return Some(truncated);
        }
    }
    longest_digit_run(&cleaned)
}

fn longest_digit_run(s: &str) -> Option<i64> {
    let mut best: &str = "";
    let mut start: Option<usize> = None;

    for (idx, c) in s.char_indices().chain(std::iter::once((s.len(), ' '))) {
        match (c.is_ascii_digit(), start) {
            (true, None) => start = Some(idx),
            (false, Some(begin)) => {
                if idx - begin > best.len() {
                    best = &s[begin..idx];
                }
                start = None;
            }
            _ => {}
        }
    }

    if best.is_empty() {
        None
    } else {
        best.parse::<i64>().ok()
    }
}

/// Split on `/`, `,` and `;`, trimming and dropping empty segments.
#[must_use]
pub fn parse_list(raw: Option<&str>) -> Vec<String> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    if is_placeholder(&raw.trim().to_lowercase()) {
        return Vec::new();
    }
    raw.split(['/', ',', ';'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Trimmed text, empty for a missing cell.
#[must_use]
pub fn clean_text(raw: Option<&str>) -> String {
    raw.map(str::trim).unwrap_or_default().to_string()
}
