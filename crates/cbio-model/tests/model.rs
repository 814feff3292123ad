//! Tests for cbio-model types.

use cbio_model::{
    CellValue, EntitySection, ImportError, PreprocessStage, format_numeric, format_placeholders,
    parse_column_values,
};
use proptest::prelude::*;
use serde_json::json;

#[test]
fn full_section_round_trip_from_yaml_shaped_json() {
    let section = EntitySection::from_value(&json!({
        "file": "patients.tsv",
        "delimiter": ",",
        "columns": [
            {"id": "patient_id", "source_id": "ID", "function": {"name": "gen_simple_patient_id"}},
            {"id": "os_status", "source_id": "STATUS", "function": {"name": "os_status_alive_deceased", "compare": "alive"}},
            {"id": "age", "data_type": "NUMBER", "convert": "int"}
        ],
        "preprocess": [
            {"task": "filter", "source_id": "STATUS", "one_of": ["alive", "dead"]},
            {"task": "derive", "new_column": "N", "source_ids": ["ID"], "function": {"name": "len"}}
        ]
    }))
    .expect("section");

    let columns = section.descriptors().expect("descriptors");
    let headers: Vec<String> = columns.iter().map(|column| column.output_name()).collect();
    assert_eq!(headers, ["PATIENT_ID", "OS_STATUS", "AGE"]);
    assert_eq!(
        columns[1].function.as_ref().map(|function| function.args["compare"].clone()),
        Some(json!("alive"))
    );
    let stages = section.stages();
    assert!(matches!(stages[1], PreprocessStage::Create(_)));
    assert_eq!(section.delimiter.as_deref(), Some(","));
}

#[test]
fn invalid_columns_block_is_configuration_error() {
    let err = parse_column_values(&json!({"id": "not a list"})).unwrap_err();
    assert!(matches!(err, ImportError::Configuration(_)));
}

proptest! {
    #[test]
    fn brace_free_templates_are_unchanged(text in "[A-Za-z0-9 _:/.-]{0,40}") {
        let out = format_placeholders(&text, |_| None);
        prop_assert_eq!(out, Ok(text));
    }

    #[test]
    fn whole_numbers_render_without_fraction(value in -1_000_000i64..1_000_000) {
        prop_assert_eq!(format_numeric(value as f64), value.to_string());
        prop_assert_eq!(CellValue::Integer(value).render(), value.to_string());
    }

    #[test]
    fn non_empty_fields_are_never_missing(field in "[^\t\n]{1,20}") {
        let cell = CellValue::from_field(&field);
        prop_assert!(!cell.is_missing());
        prop_assert_eq!(cell.key(), Some(field));
    }
}
