//! Built-in function registry.
//!
//! Transforms receive one value (a list when several source columns are read),
//! aggregates receive the list of values of one group, filters return a value
//! whose truthiness decides whether the row is kept.

use std::collections::HashSet;
use std::path::Path;

use cbio_model::{CellValue, FunctionArgs, ImportError, Result, format_placeholders};
use rand::RngCore;
use uuid::Uuid;

use super::FunctionState;
use super::args::{as_list, required_string, string_or, template_entries, usize_or};

pub type BuiltinFn = fn(&mut FunctionState, CellValue, &FunctionArgs) -> Result<CellValue>;

/// Names served by [`lookup`].
pub const BUILTIN_NAMES: &[&str] = &[
    "template_string",
    "os_status_alive_deceased",
    "anonymize",
    "deanonymize",
    "gen_simple_patient_id",
    "ret_simple_patient_id",
    "gen_simple_sample_id",
    "ret_simple_sample_id",
    "is_unique",
    "select_first",
    "concat_paths",
    "template_string_list",
    "anonymize_list",
    "deanonymize_list",
    "len",
    "count",
    "min",
    "max",
    "sum",
    "mean",
    "unique",
];

const DEFAULT_MAPPING_FILE: &str = "anonym_mappings.csv";
const PATIENT_MAPPING_FILE: &str = "patient_mappings.csv";
const SAMPLE_MAPPING_FILE: &str = "sample_mappings.csv";

pub fn lookup(name: &str) -> Option<BuiltinFn> {
    let function: BuiltinFn = match name {
        "template_string" => template_string,
        "os_status_alive_deceased" => os_status_alive_deceased,
        "anonymize" => anonymize,
        "deanonymize" => deanonymize,
        "gen_simple_patient_id" => gen_simple_patient_id,
        "ret_simple_patient_id" => ret_simple_patient_id,
        "gen_simple_sample_id" => gen_simple_sample_id,
        "ret_simple_sample_id" => ret_simple_sample_id,
        "is_unique" => is_unique,
        "select_first" => select_first,
        "concat_paths" => concat_paths,
        "template_string_list" => template_string_list,
        "anonymize_list" => anonymize_list,
        "deanonymize_list" => deanonymize_list,
        "len" => len,
        "count" => count,
        "min" => min,
        "max" => max,
        "sum" => sum,
        "mean" => mean,
        "unique" => unique,
        _ => return None,
    };
    Some(function)
}

/// Built-in namespaces reachable through dotted names.
pub fn lookup_namespaced(namespace: &str, symbol: &str) -> Option<BuiltinFn> {
    let function: BuiltinFn = match (namespace, symbol) {
        ("uuid", "uuid4") => uuid4,
        ("uuid", "uuid5") => uuid5,
        ("text", "upper") => upper,
        ("text", "lower") => lower,
        ("text", "strip") => strip,
        _ => return None,
    };
    Some(function)
}

pub fn is_builtin_namespace(namespace: &str) -> bool {
    matches!(namespace, "uuid" | "text")
}

fn template_string(_: &mut FunctionState, value: CellValue, args: &FunctionArgs) -> Result<CellValue> {
    let template = string_or(args, "string", "{value}");
    let entries = template_entries(args);
    let rendered = value.render();
    format_placeholders(&template, |name| {
        if name == "value" {
            return Some(rendered.clone());
        }
        entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.clone())
    })
    .map(CellValue::Text)
    .map_err(|placeholder| {
        ImportError::configuration(format!(
            "template_string: no value for placeholder {placeholder} in {template:?}"
        ))
    })
}

fn os_status_alive_deceased(
    _: &mut FunctionState,
    value: CellValue,
    args: &FunctionArgs,
) -> Result<CellValue> {
    let compare = string_or(args, "compare", "alive");
    let status = if value.render().to_lowercase() == compare {
        "0:LIVING"
    } else {
        "1:DECEASED"
    };
    Ok(CellValue::text(status))
}

/// Generate (or reuse) the pseudonymous id of `value` in a mapping file.
fn anonymize(state: &mut FunctionState, value: CellValue, args: &FunctionArgs) -> Result<CellValue> {
    let Some(original) = value.key() else {
        return Ok(CellValue::Missing);
    };
    let file_name = string_or(args, "mapper_filename", DEFAULT_MAPPING_FILE);
    if let Some(existing) = state.mapping(&file_name)?.lookup(&original) {
        return Ok(CellValue::text(existing));
    }
    let generator = string_or(args, "generator", "increment");
    let generated = match generator.as_str() {
        "increment" => {
            let prefix = string_or(args, "prefix", "");
            let width = usize_or("anonymize", args, "zfill", 5)?;
            let number = state.mapping(&file_name)?.next_counter();
            format!("{prefix}{number:0width$}")
        }
        "uuid.uuid4" => seeded_uuid4(state).to_string(),
        "uuid.uuid5" => namespaced_uuid5(args, &original)?.to_string(),
        other => {
            return Err(ImportError::resolution(format!(
                "anonymize: unknown id generator {other}"
            )));
        }
    };
    state.mapping(&file_name)?.record(&generated, &original)?;
    Ok(CellValue::Text(generated))
}

fn deanonymize(state: &mut FunctionState, value: CellValue, args: &FunctionArgs) -> Result<CellValue> {
    let file_name = string_or(args, "mapper_filename", DEFAULT_MAPPING_FILE);
    let original = value.render();
    match state.mapping(&file_name)?.lookup(&original) {
        Some(generated) => Ok(CellValue::text(generated)),
        None => Err(ImportError::validation(format!(
            "Unknown anonymized ID (reading {file_name}): {original}"
        ))),
    }
}

fn simple_id_args(args: &FunctionArgs, default_file: &str, prefix: &str) -> FunctionArgs {
    let mut forwarded = FunctionArgs::new();
    forwarded.insert(
        "mapper_filename".into(),
        string_or(args, "mapper_filename", default_file).into(),
    );
    forwarded.insert("generator".into(), "increment".into());
    forwarded.insert("prefix".into(), prefix.into());
    forwarded
}

fn gen_simple_patient_id(
    state: &mut FunctionState,
    value: CellValue,
    args: &FunctionArgs,
) -> Result<CellValue> {
    anonymize(state, value, &simple_id_args(args, PATIENT_MAPPING_FILE, "P"))
}

fn ret_simple_patient_id(
    state: &mut FunctionState,
    value: CellValue,
    args: &FunctionArgs,
) -> Result<CellValue> {
    deanonymize(state, value, &simple_id_args(args, PATIENT_MAPPING_FILE, "P"))
}

fn gen_simple_sample_id(
    state: &mut FunctionState,
    value: CellValue,
    args: &FunctionArgs,
) -> Result<CellValue> {
    anonymize(state, value, &simple_id_args(args, SAMPLE_MAPPING_FILE, "S"))
}

fn ret_simple_sample_id(
    state: &mut FunctionState,
    value: CellValue,
    args: &FunctionArgs,
) -> Result<CellValue> {
    deanonymize(state, value, &simple_id_args(args, SAMPLE_MAPPING_FILE, "S"))
}

fn is_unique(state: &mut FunctionState, value: CellValue, args: &FunctionArgs) -> Result<CellValue> {
    let context = required_string("is_unique", args, "context")?;
    Ok(CellValue::Boolean(
        state.first_occurrence(&context, value.render()),
    ))
}

fn select_first(_: &mut FunctionState, value: CellValue, _: &FunctionArgs) -> Result<CellValue> {
    Ok(as_list(value).into_iter().next().unwrap_or_default())
}

fn concat_paths(_: &mut FunctionState, value: CellValue, args: &FunctionArgs) -> Result<CellValue> {
    let delimiter = string_or(args, "delimiter", ",");
    let prefix = string_or(args, "prefix_remove", "");
    let mut paths = Vec::new();
    for item in as_list(value) {
        let Some(path) = item.key() else {
            continue;
        };
        let relative = Path::new(&path).strip_prefix(&prefix).map_err(|_| {
            ImportError::validation(format!("concat_paths: {path} is not under {prefix}"))
        })?;
        paths.push(relative.to_string_lossy().replace('\\', "/"));
    }
    Ok(CellValue::Text(paths.join(&delimiter)))
}

fn template_string_list(
    state: &mut FunctionState,
    value: CellValue,
    args: &FunctionArgs,
) -> Result<CellValue> {
    template_string(state, CellValue::List(as_list(value)), args)
}

fn joined_list(value: CellValue) -> CellValue {
    let joined = as_list(value)
        .iter()
        .map(CellValue::render)
        .collect::<Vec<_>>()
        .join("~");
    CellValue::Text(joined)
}

fn anonymize_list(
    state: &mut FunctionState,
    value: CellValue,
    args: &FunctionArgs,
) -> Result<CellValue> {
    anonymize(state, joined_list(value), args)
}

fn deanonymize_list(
    state: &mut FunctionState,
    value: CellValue,
    args: &FunctionArgs,
) -> Result<CellValue> {
    deanonymize(state, joined_list(value), args)
}

fn len(_: &mut FunctionState, value: CellValue, _: &FunctionArgs) -> Result<CellValue> {
    Ok(CellValue::Integer(as_list(value).len() as i64))
}

fn count(_: &mut FunctionState, value: CellValue, _: &FunctionArgs) -> Result<CellValue> {
    let present = as_list(value).iter().filter(|item| !item.is_missing()).count();
    Ok(CellValue::Integer(present as i64))
}

fn present(value: CellValue) -> Vec<CellValue> {
    as_list(value)
        .into_iter()
        .filter(|item| !item.is_missing())
        .collect()
}

/// Extreme value; numeric order when every value is numeric, text order otherwise.
fn extreme(value: CellValue, keep_greater: bool) -> CellValue {
    let items = present(value);
    let numeric = items.iter().all(|item| item.as_f64().is_some());
    let ordering = |left: &CellValue, right: &CellValue| {
        if numeric {
            left.compare(right)
        } else {
            left.render().cmp(&right.render())
        }
    };
    let picked = if keep_greater {
        items.into_iter().reduce(|best, item| {
            if ordering(&item, &best).is_gt() { item } else { best }
        })
    } else {
        items.into_iter().reduce(|best, item| {
            if ordering(&item, &best).is_lt() { item } else { best }
        })
    };
    picked.unwrap_or_default()
}

fn min(_: &mut FunctionState, value: CellValue, _: &FunctionArgs) -> Result<CellValue> {
    Ok(extreme(value, false))
}

fn max(_: &mut FunctionState, value: CellValue, _: &FunctionArgs) -> Result<CellValue> {
    Ok(extreme(value, true))
}

fn numbers(function: &str, value: CellValue) -> Result<Vec<CellValue>> {
    let items = present(value);
    if let Some(bad) = items.iter().find(|item| item.as_f64().is_none()) {
        return Err(ImportError::validation(format!(
            "{function}: value {bad} is not numeric"
        )));
    }
    Ok(items)
}

fn sum(_: &mut FunctionState, value: CellValue, _: &FunctionArgs) -> Result<CellValue> {
    let items = numbers("sum", value)?;
    let integers: Option<Vec<i64>> = items.iter().map(CellValue::as_i64).collect();
    Ok(match integers {
        Some(values) => CellValue::Integer(values.iter().sum()),
        None => CellValue::Float(items.iter().filter_map(CellValue::as_f64).sum()),
    })
}

fn mean(_: &mut FunctionState, value: CellValue, _: &FunctionArgs) -> Result<CellValue> {
    let items = numbers("mean", value)?;
    if items.is_empty() {
        return Ok(CellValue::Missing);
    }
    let total: f64 = items.iter().filter_map(CellValue::as_f64).sum();
    Ok(CellValue::Float(total / items.len() as f64))
}

fn unique(_: &mut FunctionState, value: CellValue, _: &FunctionArgs) -> Result<CellValue> {
    let mut seen = HashSet::new();
    let distinct = present(value)
        .into_iter()
        .filter(|item| seen.insert(item.render()))
        .collect();
    Ok(CellValue::List(distinct))
}

fn seeded_uuid4(state: &mut FunctionState) -> Uuid {
    let mut bytes = [0u8; 16];
    state.rng().fill_bytes(&mut bytes);
    uuid::Builder::from_random_bytes(bytes).into_uuid()
}

fn namespaced_uuid5(args: &FunctionArgs, name: &str) -> Result<Uuid> {
    let namespace = required_string("uuid5", args, "namespace")?;
    let namespace = Uuid::parse_str(&namespace).map_err(|err| {
        ImportError::configuration(format!("uuid5: invalid namespace {namespace}: {err}"))
    })?;
    Ok(Uuid::new_v5(&namespace, name.as_bytes()))
}

fn uuid4(state: &mut FunctionState, _: CellValue, _: &FunctionArgs) -> Result<CellValue> {
    Ok(CellValue::Text(seeded_uuid4(state).to_string()))
}

fn uuid5(_: &mut FunctionState, value: CellValue, args: &FunctionArgs) -> Result<CellValue> {
    Ok(CellValue::Text(
        namespaced_uuid5(args, &value.render())?.to_string(),
    ))
}

fn map_text(value: CellValue, apply: fn(&str) -> String) -> CellValue {
    match value {
        CellValue::List(items) => {
            CellValue::List(items.into_iter().map(|item| map_text(item, apply)).collect())
        }
        other if other.is_missing() => CellValue::Missing,
        other => CellValue::Text(apply(&other.render())),
    }
}

fn upper(_: &mut FunctionState, value: CellValue, _: &FunctionArgs) -> Result<CellValue> {
    Ok(map_text(value, str::to_uppercase))
}

fn lower(_: &mut FunctionState, value: CellValue, _: &FunctionArgs) -> Result<CellValue> {
    Ok(map_text(value, str::to_lowercase))
}

fn strip(_: &mut FunctionState, value: CellValue, _: &FunctionArgs) -> Result<CellValue> {
    Ok(map_text(value, |text| text.trim().to_string()))
}
