//! Cell values held by tables and exchanged with transformation functions.

use std::cmp::Ordering;
use std::fmt;

use serde_json::Value as JsonValue;

/// A single table cell.
///
/// Files only ever produce [`CellValue::Text`] and [`CellValue::Missing`]; an
/// empty field is missing, which is distinct from an explicit empty string.
/// Functions may produce any variant.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Missing,
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    List(Vec<CellValue>),
}

impl CellValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Build a cell from a raw delimited field.
    pub fn from_field(raw: &str) -> Self {
        if raw.is_empty() {
            Self::Missing
        } else {
            Self::Text(raw.to_string())
        }
    }

    pub fn is_missing(&self) -> bool {
        match self {
            Self::Missing => true,
            Self::Float(v) => v.is_nan(),
            _ => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Render the value as output text. Missing renders empty, never as a token.
    pub fn render(&self) -> String {
        match self {
            Self::Missing => String::new(),
            Self::Text(s) => s.clone(),
            Self::Integer(v) => v.to_string(),
            Self::Float(v) if !v.is_finite() => String::new(),
            Self::Float(v) => format_numeric(*v),
            Self::Boolean(b) => b.to_string(),
            Self::List(items) => items
                .iter()
                .map(Self::render)
                .collect::<Vec<_>>()
                .join(","),
        }
    }

    /// Render the value, substituting `na_value` when it is missing.
    pub fn render_or(&self, na_value: &str) -> String {
        if self.is_missing() {
            na_value.to_string()
        } else {
            self.render()
        }
    }

    /// Coerce to text, element-wise for lists. Missing stays missing.
    pub fn to_text(&self) -> Self {
        match self {
            Self::List(items) => Self::List(items.iter().map(Self::to_text).collect()),
            other if other.is_missing() => Self::Missing,
            other => Self::Text(other.render()),
        }
    }

    /// Key used for joins and grouping; missing cells have no key.
    pub fn key(&self) -> Option<String> {
        if self.is_missing() {
            None
        } else {
            Some(self.render())
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(v) => Some(*v as f64),
            Self::Float(v) if v.is_finite() => Some(*v),
            Self::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            Self::Text(s) => parse_f64(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(*v),
            Self::Text(s) => parse_i64(s),
            _ => None,
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Missing => false,
            Self::Text(s) => !s.is_empty(),
            Self::Integer(v) => *v != 0,
            Self::Float(v) => *v != 0.0 && !v.is_nan(),
            Self::Boolean(b) => *b,
            Self::List(items) => !items.is_empty(),
        }
    }

    /// Order two values numerically when both are numeric, textually otherwise.
    pub fn compare(&self, other: &Self) -> Ordering {
        match (self.as_f64(), other.as_f64()) {
            (Some(left), Some(right)) => left.partial_cmp(&right).unwrap_or(Ordering::Equal),
            _ => self.render().cmp(&other.render()),
        }
    }

    pub fn from_json(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => Self::Missing,
            JsonValue::Bool(b) => Self::Boolean(*b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(v) => Self::Integer(v),
                None => n.as_f64().map_or(Self::Missing, Self::Float),
            },
            JsonValue::String(s) => Self::Text(s.clone()),
            JsonValue::Array(items) => Self::List(items.iter().map(Self::from_json).collect()),
            JsonValue::Object(_) => Self::Text(value.to_string()),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Formats a floating-point number as a string without trailing zeros.
pub fn format_numeric(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        return format!("{}", v as i64);
    }
    let s = format!("{v}");
    let trimmed = s.trim_end_matches('0').trim_end_matches('.');
    if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Parses a string as `f64`, returning `None` for invalid or empty strings.
pub fn parse_f64(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parses a string as `i64`, returning `None` for invalid or empty strings.
pub fn parse_i64(value: &str) -> Option<i64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<i64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_field_is_missing() {
        assert_eq!(CellValue::from_field(""), CellValue::Missing);
        assert_eq!(CellValue::from_field("x"), CellValue::text("x"));
    }

    #[test]
    fn render_never_emits_placeholder_tokens() {
        assert_eq!(CellValue::Missing.render(), "");
        assert_eq!(CellValue::Float(f64::NAN).render(), "");
        assert_eq!(CellValue::Float(2.50).render(), "2.5");
        assert_eq!(CellValue::Float(3.0).render(), "3");
        assert_eq!(CellValue::Boolean(false).render(), "false");
        assert_eq!(CellValue::Missing.render_or("NA"), "NA");
    }

    #[test]
    fn text_coercion_keeps_missing() {
        let list = CellValue::List(vec![CellValue::Integer(1), CellValue::Missing]);
        assert_eq!(
            list.to_text(),
            CellValue::List(vec![CellValue::text("1"), CellValue::Missing])
        );
        assert_eq!(CellValue::Float(1.5).to_text(), CellValue::text("1.5"));
    }

    #[test]
    fn compare_prefers_numeric_order() {
        assert_eq!(
            CellValue::text("10").compare(&CellValue::text("9")),
            Ordering::Greater
        );
        assert_eq!(
            CellValue::text("b").compare(&CellValue::text("a")),
            Ordering::Greater
        );
    }

    #[test]
    fn json_numbers_keep_integer_precision() {
        let value: JsonValue = serde_json::json!(12);
        assert_eq!(CellValue::from_json(&value), CellValue::Integer(12));
        let value: JsonValue = serde_json::json!(1.25);
        assert_eq!(CellValue::from_json(&value), CellValue::Float(1.25));
    }
}
