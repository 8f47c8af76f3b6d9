use std::collections::BTreeMap;

use crate::{DuplicatePolicy, DuplicateSide, RawRow, ReconcileError};

/// Row position of the first data row; the header occupies row 1.
pub const FIRST_DATA_ROW: usize = 2;

/// Match key -> 1-based target row position.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeyIndex {
    entries: BTreeMap<String, usize>,
    /// Keys that occurred on more than one row, sorted, each listed once.
    duplicates: Vec<String>,
}

impl KeyIndex {
    pub fn get(&self, key: &str) -> Option<usize> {
        self.entries.get(key).copied()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn duplicates(&self) -> &[String] {
        &self.duplicates
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// Position of `column` in `header`.
pub fn header_position(header: &[String], column: &str) -> Option<usize> {
    header.iter().position(|c| c == column)
}

/// Build the key index over the data rows of a target table.
///
/// `rows` are the rows *below* the header; `rows[0]` is table row 2.
/// - key column absent from the header => empty index
/// - cell beyond the row's end => blank
/// - blank (after trim) keys are never indexed
/// - repeats resolve per `policy`; `Reject` fails on the first repeat
pub fn build_key_index(
    header: &[String],
    rows: &[RawRow],
    key_column: &str,
    policy: DuplicatePolicy,
) -> Result<KeyIndex, ReconcileError> {
    let mut index = KeyIndex::default();

    let Some(kcol) = header_position(header, key_column) else {
        return Ok(index);
    };

    for (offset, row) in rows.iter().enumerate() {
        let pos = offset + FIRST_DATA_ROW;
        let key = row.get(kcol).map(|c| c.trim()).unwrap_or("");
        if key.is_empty() {
            continue;
        }

        if index.entries.contains_key(key) {
            if !index.duplicates.iter().any(|d| d == key) {
                index.duplicates.push(key.to_string());
            }
            match policy {
                DuplicatePolicy::KeepLast => {
                    index.entries.insert(key.to_string(), pos);
                }
                DuplicatePolicy::KeepFirst => {}
                DuplicatePolicy::Reject => {
                    return Err(ReconcileError::DuplicateKey {
                        side: DuplicateSide::Target,
                        key: key.to_string(),
                    });
                }
            }
        } else {
            index.entries.insert(key.to_string(), pos);
        }
    }

    index.duplicates.sort();
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> Vec<String> {
        vec!["ID".into(), "Name".into()]
    }

    fn rows(v: &[&[&str]]) -> Vec<RawRow> {
        v.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn positions_start_at_two() {
        let r = rows(&[&["1", "Ann"], &["2", "Bob"]]);
        let idx = build_key_index(&header(), &r, "ID", DuplicatePolicy::KeepLast).unwrap();
        assert_eq!(idx.get("1"), Some(2));
        assert_eq!(idx.get("2"), Some(3));
        assert_eq!(idx.len(), 2);
    }

    #[test]
    fn keys_are_trimmed_and_blanks_skipped() {
        let r = rows(&[&["  7 ", "x"], &["   ", "y"], &[], &["", "z"]]);
        let idx = build_key_index(&header(), &r, "ID", DuplicatePolicy::KeepLast).unwrap();
        assert_eq!(idx.get("7"), Some(2));
        assert_eq!(idx.len(), 1);
    }

    #[test]
    fn short_row_reads_blank_key() {
        let h: Vec<String> = vec!["Name".into(), "ID".into()];
        let r = rows(&[&["Ann"], &["Bob", "9"]]);
        let idx = build_key_index(&h, &r, "ID", DuplicatePolicy::KeepLast).unwrap();
        assert_eq!(idx.len(), 1);
        assert_eq!(idx.get("9"), Some(3));
    }

    #[test]
    fn missing_key_column_gives_empty_index() {
        let r = rows(&[&["1", "Ann"]]);
        let idx = build_key_index(&header(), &r, "Code", DuplicatePolicy::KeepLast).unwrap();
        assert!(idx.is_empty());
    }

    #[test]
    fn duplicate_policies() {
        let r = rows(&[&["1", "a"], &["1", "b"], &["1", "c"]]);

        let last = build_key_index(&header(), &r, "ID", DuplicatePolicy::KeepLast).unwrap();
        assert_eq!(last.get("1"), Some(4));
        assert_eq!(last.duplicates(), &["1".to_string()]);

        let first = build_key_index(&header(), &r, "ID", DuplicatePolicy::KeepFirst).unwrap();
        assert_eq!(first.get("1"), Some(2));

        let err = build_key_index(&header(), &r, "ID", DuplicatePolicy::Reject).unwrap_err();
        assert_eq!(
            err,
            ReconcileError::DuplicateKey {
                side: DuplicateSide::Target,
                key: "1".into()
            }
        );
    }
}
