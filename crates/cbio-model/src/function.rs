//! Function references attached to columns and preprocessing stages.

use serde::Deserialize;
use serde_json::{Map, Value};

/// Keyword arguments passed alongside a function reference.
pub type FunctionArgs = Map<String, Value>;

/// `{name, ...args}` block naming a transform, filter or aggregate function.
///
/// Every key other than `name` is forwarded to the function as an argument.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FunctionSpec {
    pub name: String,
    #[serde(flatten)]
    pub args: FunctionArgs,
}

impl FunctionSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: FunctionArgs::new(),
        }
    }

    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extra_keys_become_arguments() {
        let spec: FunctionSpec = serde_json::from_value(serde_json::json!({
            "name": "anonymize",
            "mapper_filename": "ids.csv",
            "zfill": 3
        }))
        .expect("function spec");
        assert_eq!(spec.name, "anonymize");
        assert_eq!(spec.args.len(), 2);
        assert_eq!(spec.args["zfill"], 3);
    }
}
