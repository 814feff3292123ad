pub mod csv_table;
pub mod table;

pub use csv_table::{
    DEFAULT_DELIMITER, load_source, parse_delimiter, read_table, resolve_source_path,
};
pub use table::Table;
