// fhir2omop/src/output.rs
//
// Terminal rendering of tabular results.

use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};

use fhir2omop_core::domain::table::DataTable;
use fhir2omop_core::ports::connector::QueryResult;

const MAX_CELL: usize = 60;

fn new_table(headers: &[String]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(headers);
    table
}

fn clip(cell: &str) -> String {
    if cell.chars().count() > MAX_CELL {
        let head: String = cell.chars().take(MAX_CELL - 1).collect();
        format!("{}…", head)
    } else {
        cell.to_string()
    }
}

/// Prints the first `limit` rows and a footer with the total.
pub fn print_data_table(data: &DataTable, limit: usize) {
    let mut table = new_table(&data.headers);
    for row in data.rows.iter().take(limit) {
        table.add_row(row.iter().map(|c| clip(c)));
    }
    println!("{table}");
    println!(
        "   {} row(s) × {} column(s){}",
        data.row_count(),
        data.column_count(),
        if data.row_count() > limit {
            format!(", first {} shown", limit)
        } else {
            String::new()
        }
    );
}

pub fn print_query_result(result: &QueryResult) {
    if result.columns.is_empty() {
        println!("   (no rows)");
        return;
    }
    print_data_table(&result.to_table(), usize::MAX);
}
