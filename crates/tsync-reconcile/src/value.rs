use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Integral floats below this magnitude render without a fractional part.
const INTEGRAL_RENDER_LIMIT: f64 = 1e15;

/// One scalar cell as read from an upload or a record-oriented table view.
///
/// Spreadsheet-ish sources mix numbers, strings and blanks in one column.
/// Every comparison goes through [`CellValue::canonical`] so the coercion
/// rules live in exactly one place.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Text(String),
    #[default]
    Empty,
}

impl CellValue {
    pub fn text(s: impl Into<String>) -> Self {
        CellValue::Text(s.into())
    }

    /// Canonical trimmed string form used for keys and change detection.
    ///
    /// - `Empty` => `""`
    /// - `Text` => trimmed
    /// - `Number` => `""` for NaN/inf, `"25"` for `25.0`, shortest round-trip otherwise
    pub fn canonical(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.trim().to_string(),
            CellValue::Number(n) => canonical_number(*n),
        }
    }

    /// True when the canonical form is blank.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Number(n) => !n.is_finite(),
        }
    }

    /// Infer a typed cell from raw text (CSV field, user input).
    ///
    /// Blank => `Empty`. Plain decimal text becomes `Number` only when the
    /// number renders back to exactly the same text, so `canonical()` of the
    /// result always equals `raw.trim()`. Anything else => `Text` with the
    /// original (untrimmed) content kept: `"2.0"`, `"1.10"` and 17-digit IDs
    /// stay text.
    pub fn infer(raw: &str) -> Self {
        let t = raw.trim();
        if t.is_empty() {
            return CellValue::Empty;
        }
        if looks_numeric(t) {
            if let Ok(n) = t.parse::<f64>() {
                if canonical_number(n) == t {
                    return CellValue::Number(n);
                }
            }
        }
        CellValue::Text(raw.to_string())
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<&Value> for CellValue {
    fn from(v: &Value) -> Self {
        match v {
            Value::Null => CellValue::Empty,
            Value::Bool(b) => CellValue::Text(b.to_string()),
            Value::Number(n) => number_from_json(n),
            Value::String(s) => CellValue::Text(s.clone()),
            // Nested values are kept verbatim as JSON text.
            other => CellValue::Text(other.to_string()),
        }
    }
}

/// Large JSON integers do not survive `f64`; keep their digits as text.
fn number_from_json(n: &serde_json::Number) -> CellValue {
    let text = n.to_string();
    match n.as_f64() {
        Some(f) if n.is_f64() || canonical_number(f) == text => CellValue::Number(f),
        _ => CellValue::Text(text),
    }
}

fn canonical_number(n: f64) -> String {
    if !n.is_finite() {
        return String::new();
    }
    if n.fract() == 0.0 && n.abs() < INTEGRAL_RENDER_LIMIT {
        // Avoid "-0".
        let i = n as i64;
        return i.to_string();
    }
    n.to_string()
}

/// `f64::from_str` accepts "inf", "NaN", "1e5" and friends. Only plain decimal
/// notation counts as a number for inference.
fn looks_numeric(t: &str) -> bool {
    let body = t.strip_prefix(['-', '+']).unwrap_or(t);
    !body.is_empty()
        && body.chars().all(|c| c.is_ascii_digit() || c == '.')
        && body.chars().filter(|c| *c == '.').count() <= 1
        && body.chars().any(|c| c.is_ascii_digit())
        && !has_significant_leading_zero(body)
}

/// "007" is an identifier, not the number 7.
fn has_significant_leading_zero(body: &str) -> bool {
    body.len() > 1 && body.starts_with('0') && !body.starts_with("0.")
}
