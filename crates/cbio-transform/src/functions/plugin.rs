//! Lua function-definition file.
//!
//! The script returns a table with up to three slot tables, `transforms`,
//! `filters` and `aggregates`, each mapping names to functions or to nested
//! namespace tables. Functions are called as `f(value, args)`.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use cbio_model::{CellValue, FunctionArgs, ImportError, Result};
use mlua::{Function, Lua, Table, Value as LuaValue};
use serde_json::Value as JsonValue;
use tracing::info;

use super::resolver::FunctionKind;

const SLOTS: [&str; 3] = ["transforms", "filters", "aggregates"];

pub struct Plugin {
    path: PathBuf,
    lua: Lua,
    exports: Table,
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugin").field("path", &self.path).finish()
    }
}

fn load_error(path: &Path, err: impl fmt::Display) -> ImportError {
    ImportError::configuration(format!(
        "Invalid function definition file {}: {err}",
        path.display()
    ))
}

impl Plugin {
    /// Run the script and validate its slot table.
    ///
    /// A path that is not a file is reported as a missing function file; any
    /// read, parse or runtime failure is a configuration error.
    ///
    /// `math.random` is seeded with `seed` before the script runs.
    pub fn load(path: &Path, seed: u64) -> Result<Self> {
        if !path.is_file() {
            return Err(ImportError::function_file_missing(format!(
                "Function definition file {} does not exist",
                path.display()
            )));
        }
        let source = fs::read_to_string(path).map_err(|err| load_error(path, err))?;
        let lua = Lua::new();
        let math: Table = lua.globals().get("math").map_err(|err| load_error(path, err))?;
        let randomseed: Function = math
            .get("randomseed")
            .map_err(|err| load_error(path, err))?;
        randomseed
            .call::<()>(seed as i64)
            .map_err(|err| load_error(path, err))?;

        let exports: Table = lua
            .load(source.as_str())
            .set_name(path.display().to_string())
            .eval()
            .map_err(|err| load_error(path, err))?;
        for pair in exports.pairs::<LuaValue, LuaValue>() {
            let (key, value) = pair.map_err(|err| load_error(path, err))?;
            let key = match key {
                LuaValue::String(key) => key.to_string_lossy(),
                other => return Err(load_error(path, format!("unexpected key {other:?}"))),
            };
            if !SLOTS.contains(&key.as_str()) {
                return Err(load_error(
                    path,
                    format!("unknown slot {key}, expected one of {SLOTS:?}"),
                ));
            }
            if !matches!(value, LuaValue::Table(_)) {
                return Err(load_error(path, format!("slot {key} must be a table")));
            }
        }
        info!(path = %path.display(), "loaded function definitions");
        Ok(Self {
            path: path.to_path_buf(),
            lua,
            exports,
        })
    }

    /// Find `name` (possibly dotted) in the slot for `kind`.
    pub fn lookup(&self, kind: FunctionKind, name: &str) -> Result<Option<Function>> {
        let slot: LuaValue = self
            .exports
            .get(kind.slot())
            .map_err(|err| load_error(&self.path, err))?;
        let mut current = slot;
        for part in name.split('.') {
            let LuaValue::Table(table) = current else {
                return Ok(None);
            };
            current = table.get(part).map_err(|err| load_error(&self.path, err))?;
        }
        match current {
            LuaValue::Function(function) => Ok(Some(function)),
            _ => Ok(None),
        }
    }

    pub fn call(
        &self,
        name: &str,
        function: &Function,
        value: &CellValue,
        args: &FunctionArgs,
    ) -> Result<CellValue> {
        let call_error =
            |err: mlua::Error| ImportError::validation(format!("function {name} failed: {err}"));
        let value = cell_to_lua(&self.lua, value).map_err(call_error)?;
        let args = args_to_lua(&self.lua, args).map_err(call_error)?;
        let out: LuaValue = function.call((value, args)).map_err(call_error)?;
        lua_to_cell(name, out)
    }
}

fn cell_to_lua(lua: &Lua, value: &CellValue) -> mlua::Result<LuaValue> {
    Ok(match value {
        missing if missing.is_missing() => LuaValue::Nil,
        CellValue::Text(text) => LuaValue::String(lua.create_string(text)?),
        CellValue::Integer(value) => LuaValue::Integer(*value),
        CellValue::Float(value) => LuaValue::Number(*value),
        CellValue::Boolean(value) => LuaValue::Boolean(*value),
        CellValue::List(items) => {
            let table = lua.create_table()?;
            for (idx, item) in items.iter().enumerate() {
                table.raw_set(idx + 1, cell_to_lua(lua, item)?)?;
            }
            LuaValue::Table(table)
        }
        CellValue::Missing => LuaValue::Nil,
    })
}

fn json_to_lua(lua: &Lua, value: &JsonValue) -> mlua::Result<LuaValue> {
    Ok(match value {
        JsonValue::Null => LuaValue::Nil,
        JsonValue::Bool(value) => LuaValue::Boolean(*value),
        JsonValue::Number(number) => match number.as_i64() {
            Some(value) => LuaValue::Integer(value),
            None => LuaValue::Number(number.as_f64().unwrap_or(f64::NAN)),
        },
        JsonValue::String(text) => LuaValue::String(lua.create_string(text)?),
        JsonValue::Array(items) => {
            let table = lua.create_table()?;
            for (idx, item) in items.iter().enumerate() {
                table.raw_set(idx + 1, json_to_lua(lua, item)?)?;
            }
            LuaValue::Table(table)
        }
        JsonValue::Object(map) => LuaValue::Table(args_to_lua(lua, map)?),
    })
}

fn args_to_lua(lua: &Lua, args: &FunctionArgs) -> mlua::Result<Table> {
    let table = lua.create_table()?;
    for (key, value) in args {
        table.raw_set(key.as_str(), json_to_lua(lua, value)?)?;
    }
    Ok(table)
}

fn lua_to_cell(name: &str, value: LuaValue) -> Result<CellValue> {
    Ok(match value {
        LuaValue::Nil => CellValue::Missing,
        LuaValue::Boolean(value) => CellValue::Boolean(value),
        LuaValue::Integer(value) => CellValue::Integer(value),
        LuaValue::Number(value) => CellValue::Float(value),
        LuaValue::String(text) => CellValue::Text(text.to_string_lossy()),
        LuaValue::Table(table) => {
            let mut items = Vec::new();
            for item in table.sequence_values::<LuaValue>() {
                let item = item.map_err(|err| {
                    ImportError::validation(format!("function {name} returned a bad list: {err}"))
                })?;
                items.push(lua_to_cell(name, item)?);
            }
            CellValue::List(items)
        }
        other => {
            return Err(ImportError::validation(format!(
                "function {name} returned unsupported {}",
                other.type_name()
            )));
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("functions.lua");
        fs::write(&path, contents).expect("write script");
        (dir, path)
    }

    #[test]
    fn calls_transform_with_value_and_args() {
        let (_dir, path) = script(
            r#"
            return {
              transforms = {
                shout = function(value, args) return string.upper(value) .. args.suffix end,
                site = { code = function(value) return "S-" .. value end },
              },
              aggregates = {
                total = function(values) local n = 0 for _, v in ipairs(values) do n = n + tonumber(v) end return n end,
              },
            }
            "#,
        );
        let plugin = Plugin::load(&path, 42).expect("load plugin");
        let mut args = FunctionArgs::new();
        args.insert("suffix".into(), "!".into());

        let shout = plugin
            .lookup(FunctionKind::Transform, "shout")
            .expect("lookup")
            .expect("shout");
        let out = plugin
            .call("shout", &shout, &CellValue::text("hi"), &args)
            .expect("call");
        assert_eq!(out, CellValue::text("HI!"));

        let nested = plugin
            .lookup(FunctionKind::Transform, "site.code")
            .expect("lookup");
        assert!(nested.is_some());

        let total = plugin
            .lookup(FunctionKind::Aggregate, "total")
            .expect("lookup")
            .expect("total");
        let values = CellValue::List(vec![CellValue::text("1"), CellValue::text("2")]);
        let out = plugin
            .call("total", &total, &values, &FunctionArgs::new())
            .expect("call");
        assert_eq!(out, CellValue::Integer(3));

        assert!(
            plugin
                .lookup(FunctionKind::Filter, "shout")
                .expect("lookup")
                .is_none()
        );
    }

    #[test]
    fn rejects_unknown_slots() {
        let (_dir, path) = script("return { helpers = {} }");
        let err = Plugin::load(&path, 1).unwrap_err();
        assert!(matches!(err, ImportError::Configuration(_)));
    }

    #[test]
    fn absent_file_is_reported_as_missing() {
        let dir = tempfile::tempdir().expect("temp dir");
        let err = Plugin::load(&dir.path().join("absent.lua"), 1).unwrap_err();
        assert!(matches!(err, ImportError::FunctionFileMissing(_)));
    }

    #[test]
    fn syntax_errors_are_configuration_errors() {
        let (_dir, path) = script("this is not lua ((((");
        assert!(matches!(
            Plugin::load(&path, 1),
            Err(ImportError::Configuration(_))
        ));
    }

    #[test]
    fn rejects_non_table_slot() {
        let (_dir, path) = script("return { transforms = 3 }");
        assert!(matches!(
            Plugin::load(&path, 1),
            Err(ImportError::Configuration(_))
        ));
    }

    #[test]
    fn random_sequence_follows_seed() {
        let source = "return { transforms = { roll = function() return math.random(1, 1000000) end } }";
        let (_a, first) = script(source);
        let (_b, second) = script(source);
        let roll = |path: &Path| {
            let plugin = Plugin::load(path, 7).expect("load");
            let function = plugin
                .lookup(FunctionKind::Transform, "roll")
                .expect("lookup")
                .expect("roll");
            plugin
                .call("roll", &function, &CellValue::Missing, &FunctionArgs::new())
                .expect("call")
        };
        assert_eq!(roll(&first), roll(&second));
    }

    #[test]
    fn runtime_errors_are_validation_errors() {
        let (_dir, path) = script("return { filters = { boom = function() error('nope') end } }");
        let plugin = Plugin::load(&path, 1).expect("load");
        let boom = plugin
            .lookup(FunctionKind::Filter, "boom")
            .expect("lookup")
            .expect("boom");
        let err = plugin
            .call("boom", &boom, &CellValue::Missing, &FunctionArgs::new())
            .unwrap_err();
        assert!(matches!(err, ImportError::Validation(_)));
    }
}
