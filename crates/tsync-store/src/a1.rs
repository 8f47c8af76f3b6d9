//! A1-notation helpers for row-range writes (`A3:C3`).

/// Spreadsheet column letters for a 1-based column number (1 => A, 27 => AA).
/// Column 0 has no letter and returns an empty string.
pub fn column_letter(n: usize) -> String {
    let mut n = n;
    let mut out: Vec<u8> = Vec::new();
    while n > 0 {
        let r = (n - 1) % 26;
        out.push(b'A' + r as u8);
        n = (n - 1) / 26;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// Range covering one row from column A through column `width`.
///
/// A zero width still names column A so the range stays well-formed.
pub fn row_range(row: usize, width: usize) -> String {
    let last = column_letter(width.max(1));
    format!("A{row}:{last}{row}")
}

/// Whole-column span `A:<last>` for writes whose rows are chosen by the store.
pub fn column_span(width: usize) -> String {
    format!("A:{}", column_letter(width.max(1)))
}
