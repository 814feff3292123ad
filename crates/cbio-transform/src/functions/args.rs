//! Keyword argument accessors for built-in functions.

use cbio_model::{CellValue, FunctionArgs, ImportError, Result};
use serde_json::Value;

/// String argument, rendering scalars that are not strings.
pub fn string_arg(args: &FunctionArgs, key: &str) -> Option<String> {
    match args.get(key)? {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(CellValue::from_json(other).render()),
    }
}

pub fn string_or(args: &FunctionArgs, key: &str, default: &str) -> String {
    string_arg(args, key).unwrap_or_else(|| default.to_string())
}

pub fn required_string(function: &str, args: &FunctionArgs, key: &str) -> Result<String> {
    string_arg(args, key).ok_or_else(|| {
        ImportError::configuration(format!("{function}: argument {key} is required"))
    })
}

pub fn usize_or(function: &str, args: &FunctionArgs, key: &str, default: usize) -> Result<usize> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Number(number)) => number
            .as_u64()
            .and_then(|value| usize::try_from(value).ok())
            .ok_or_else(|| {
                ImportError::configuration(format!(
                    "{function}: argument {key} must be a non-negative integer"
                ))
            }),
        Some(Value::String(text)) => text.trim().parse().map_err(|_| {
            ImportError::configuration(format!(
                "{function}: argument {key} must be a non-negative integer"
            ))
        }),
        Some(_) => Err(ImportError::configuration(format!(
            "{function}: argument {key} must be a non-negative integer"
        ))),
    }
}

/// Render every entry of `template_dict` for placeholder substitution.
pub fn template_entries(args: &FunctionArgs) -> Vec<(String, String)> {
    match args.get("template_dict") {
        Some(Value::Object(map)) => map
            .iter()
            .map(|(key, value)| (key.clone(), CellValue::from_json(value).render()))
            .collect(),
        _ => Vec::new(),
    }
}

/// Present a value as a list; scalars become a one-element list.
pub fn as_list(value: CellValue) -> Vec<CellValue> {
    match value {
        CellValue::List(items) => items,
        other => vec![other],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> FunctionArgs {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn numeric_arguments_accept_strings() {
        let args = args(json!({"zfill": "3", "bad": -1}));
        assert_eq!(usize_or("increment", &args, "zfill", 5).expect("zfill"), 3);
        assert_eq!(usize_or("increment", &args, "absent", 5).expect("default"), 5);
        assert!(usize_or("increment", &args, "bad", 5).is_err());
    }

    #[test]
    fn string_arguments_render_scalars() {
        let args = args(json!({"prefix": 7, "compare": "alive"}));
        assert_eq!(string_arg(&args, "prefix").as_deref(), Some("7"));
        assert_eq!(string_or(&args, "missing", "x"), "x");
        assert!(required_string("is_unique", &args, "context").is_err());
    }
}
