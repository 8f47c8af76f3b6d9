//! Unused-key guard.
//!
//! GREEN when:
//! - A config that only uses known keys is clean.
//! - A misspelled key is reported under Warn and fails under Fail.
//! - List elements under a consumed prefix count as consumed.

use tsync_config::{load_layered_yaml_from_strings, report_unused_keys, UnusedKeyPolicy};

const CLEAN: &str = r#"
store:
  root: ./wb
target:
  table: Customers
  key_column: ID
  sync_columns: [Name, Score]
policy:
  target_duplicates: keep_last
log:
  enabled: false
  table: audit
"#;

#[test]
fn known_keys_are_clean() {
    let cfg = load_layered_yaml_from_strings(&[CLEAN]).unwrap();
    let report = report_unused_keys(&cfg.config_json, UnusedKeyPolicy::Fail).unwrap();
    assert!(report.is_clean());
    assert!(report.consumed_prefixes.contains(&"/target/sync_columns".to_string()));
}

#[test]
fn misspelled_key_warns_or_fails() {
    let typo = "target:\n  key_colum: ID\n";
    let cfg = load_layered_yaml_from_strings(&[CLEAN, typo]).unwrap();

    let report = report_unused_keys(&cfg.config_json, UnusedKeyPolicy::Warn).unwrap();
    assert_eq!(report.unused_leaf_pointers, vec!["/target/key_colum"]);

    let err = report_unused_keys(&cfg.config_json, UnusedKeyPolicy::Fail).unwrap_err();
    assert!(err.to_string().contains("CONFIG_UNUSED_KEYS"));
    assert!(err.to_string().contains("/target/key_colum"));
}
