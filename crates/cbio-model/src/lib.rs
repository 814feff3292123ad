pub mod column;
pub mod error;
pub mod function;
pub mod preprocess;
pub mod study;
pub mod text;
pub mod value;

pub use column::{
    ColumnDescriptor, ColumnSource, ColumnSpec, Conversion, DataType, parse_column_values,
    parse_columns,
};
pub use error::{ImportError, Result};
pub use function::{FunctionArgs, FunctionSpec};
pub use preprocess::{
    AggregateSpec, CompareOp, DeriveSpec, FilterRule, FilterSpec, GroupSpec, JoinKind, JoinSpec,
    OneOrMany, OperatorSpec, PreprocessStage,
};
pub use study::{CancerTypeSpec, ColorChoice, EntitySection, ResourceSpec, TableSource};
pub use text::format_placeholders;
pub use value::{CellValue, format_numeric, parse_f64, parse_i64};
