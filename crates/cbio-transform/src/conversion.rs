//! Optional per-column type conversion applied after the column function.

use cbio_model::{CellValue, Conversion};
use chrono::{DateTime, NaiveDate, NaiveDateTime};

const DATETIME_OUTPUT: &str = "%Y-%m-%d %H:%M:%S";

const DATETIME_INPUTS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
];

const DATE_INPUTS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%Y%m%d"];

/// Convert `value`; `Err` carries a message for the warning log.
pub fn convert(value: &CellValue, to: Conversion) -> Result<CellValue, String> {
    let failed = || format!("Could not convert '{value}' to {to:?}");
    match to {
        Conversion::Str => Ok(CellValue::Text(value.render())),
        Conversion::Int => match value {
            CellValue::Integer(v) => Ok(CellValue::Integer(*v)),
            CellValue::Float(v) if v.is_finite() => Ok(CellValue::Integer(v.trunc() as i64)),
            CellValue::Boolean(b) => Ok(CellValue::Integer(i64::from(*b))),
            CellValue::Text(_) => value.as_i64().map(CellValue::Integer).ok_or_else(failed),
            _ => Err(failed()),
        },
        Conversion::Float => match value {
            CellValue::List(_) | CellValue::Missing => Err(failed()),
            other => other.as_f64().map(CellValue::Float).ok_or_else(failed),
        },
        Conversion::Bool => match value {
            CellValue::Boolean(b) => Ok(CellValue::Boolean(*b)),
            CellValue::Integer(v) => Ok(CellValue::Boolean(*v != 0)),
            CellValue::Float(v) if v.is_finite() => Ok(CellValue::Boolean(*v != 0.0)),
            CellValue::Text(text) => parse_bool(text).map(CellValue::Boolean).ok_or_else(failed),
            _ => Err(failed()),
        },
        Conversion::Datetime => match value {
            CellValue::Text(text) => parse_datetime(text)
                .map(|parsed| CellValue::Text(parsed.format(DATETIME_OUTPUT).to_string()))
                .ok_or_else(failed),
            _ => Err(failed()),
        },
    }
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_lowercase().as_str() {
        "true" | "yes" | "y" | "1" => Some(true),
        "false" | "no" | "n" | "0" => Some(false),
        _ => None,
    }
}

fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.naive_local());
    }
    DATETIME_INPUTS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            DATE_INPUTS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_conversion() {
        assert_eq!(
            convert(&CellValue::text(" 42 "), Conversion::Int),
            Ok(CellValue::Integer(42))
        );
        assert_eq!(
            convert(&CellValue::Float(3.9), Conversion::Int),
            Ok(CellValue::Integer(3))
        );
        assert!(convert(&CellValue::text("3.5"), Conversion::Int).is_err());
    }

    #[test]
    fn float_and_str_conversion() {
        assert_eq!(
            convert(&CellValue::text("2.50"), Conversion::Float).map(|v| v.render()),
            Ok("2.5".to_string())
        );
        assert_eq!(
            convert(&CellValue::Integer(7), Conversion::Str),
            Ok(CellValue::text("7"))
        );
    }

    #[test]
    fn bool_tokens() {
        assert_eq!(
            convert(&CellValue::text("Yes"), Conversion::Bool),
            Ok(CellValue::Boolean(true))
        );
        assert_eq!(
            convert(&CellValue::text("0"), Conversion::Bool),
            Ok(CellValue::Boolean(false))
        );
        assert!(convert(&CellValue::text("maybe"), Conversion::Bool).is_err());
    }

    #[test]
    fn datetime_normalizes_format() {
        assert_eq!(
            convert(&CellValue::text("2021-03-04"), Conversion::Datetime),
            Ok(CellValue::text("2021-03-04 00:00:00"))
        );
        assert_eq!(
            convert(&CellValue::text("2021-03-04T10:20:30"), Conversion::Datetime),
            Ok(CellValue::text("2021-03-04 10:20:30"))
        );
        assert!(convert(&CellValue::text("yesterday"), Conversion::Datetime).is_err());
    }
}
