use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use cbio_core::{FileKind, StudyReport, WrittenFile};

pub fn print_summary(report: &StudyReport) {
    println!("Study: {}", report.study_id);
    println!("Output: {}", report.output_dir.display());
    println!("{}", summary_table(report));
}

fn summary_table(report: &StudyReport) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Entity"),
        header_cell("File"),
        header_cell("Kind"),
        header_cell("Rows"),
    ]);
    apply_summary_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Center);
    align_column(&mut table, 3, CellAlignment::Right);

    table.add_row(file_row("study", &report.study_manifest));
    let mut total_rows = 0usize;
    for entity in &report.entities {
        for file in &entity.files {
            total_rows += file.rows.unwrap_or_default();
            table.add_row(file_row(entity.section, file));
        }
    }
    for section in &report.skipped {
        table.add_row(vec![
            dim_cell(section),
            dim_cell("not defined"),
            dim_cell("-"),
            dim_cell("-"),
        ]);
    }
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        Cell::new(format!("{} files", report.file_count()))
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        dim_cell("-"),
        Cell::new(total_rows).add_attribute(Attribute::Bold),
    ]);
    table
}

fn file_row(section: &str, file: &WrittenFile) -> Vec<Cell> {
    vec![
        Cell::new(section)
            .fg(Color::Blue)
            .add_attribute(Attribute::Bold),
        Cell::new(file.file_name()),
        kind_cell(file.kind),
        match file.rows {
            Some(rows) => Cell::new(rows),
            None => dim_cell("-"),
        },
    ]
}

fn kind_cell(kind: FileKind) -> Cell {
    match kind {
        FileKind::Manifest => dim_cell(kind),
        FileKind::Data => Cell::new(kind).fg(Color::Green),
    }
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
