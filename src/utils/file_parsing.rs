#[inline]
pub fn strip_surrounding_quotes(s: &str) -> &str {
    let b = s.as_bytes();
    if b.len() >= 2 && b[0] == b'"' && b[b.len() - 1] == b'"' {
        return &s[1..s.len() - 1];
    }
    s
}

/// Splits one CSV record on commas that are outside double quotes.
///
/// Cells are trimmed and unquoted. A trailing comma yields a trailing empty cell,
/// so a short row is detected by the caller instead of being silently padded.
pub fn split_csv_record(line: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut cur = String::new();
    let mut in_quotes = false;

    for ch in line.trim_end_matches(['\r', '\n']).chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                cur.push(ch);
            }
            ',' if !in_quotes => {
                out.push(strip_surrounding_quotes(cur.trim()).to_string());
                cur.clear();
            }
            _ => cur.push(ch),
        }
    }
    out.push(strip_surrounding_quotes(cur.trim()).to_string());
    out
}

/// Parses a numeric cell. Empty cells and `nan` are rejected.
pub fn parse_number(cell: &str) -> Option<f64> {
    let value: f64 = cell.trim().parse().ok()?;
    value.is_finite().then_some(value)
}

/// Parses a binary class label written either as an integer or as `0.0`/`1.0`.
pub fn parse_binary_label(cell: &str) -> Option<usize> {
    let value = parse_number(cell)?;
    if value == 0.0 {
        Some(0)
    } else if value == 1.0 {
        Some(1)
    } else {
        None
    }
}
