use crate::error::Result;
use crate::types::{DashboardView, DisplayTable};
use crate::util::format_int;
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tabled::{builder::Builder, settings::Style, Table, Tabled};

/// Serialize a display table as UTF-8 CSV: header row, comma delimiter,
/// quotes only where a field needs them.
pub fn write_csv_table<W: Write>(writer: W, table: &DisplayTable) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(&table.headers)?;
    for r in &table.rows {
        wtr.write_record(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn to_csv_bytes(table: &DisplayTable) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    write_csv_table(&mut buf, table)?;
    Ok(buf)
}

pub fn write_csv(path: &Path, table: &DisplayTable) -> Result<()> {
    let file = std::fs::File::create(path)?;
    write_csv_table(file, table)
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}

pub fn preview_display_table(table: &DisplayTable, max_rows: usize) {
    if table.rows.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let mut builder = Builder::default();
    builder.push_record(table.headers.iter().cloned());
    for r in table.rows.iter().take(max_rows) {
        builder.push_record(r.iter().cloned());
    }
    let table_str = builder.build().with(Style::markdown()).to_string();
    println!("{}", table_str);
    if table.rows.len() > max_rows {
        println!("({} more rows)", format_int(table.rows.len() - max_rows));
    }
    println!();
}

/// Print one cycle's view the way the dashboard lays it out.
pub fn print_view(view: &DashboardView, max_rows: usize) {
    println!("{}\n", view.title);
    preview_table_rows(&view.kpis, view.kpis.len());

    if !view.summary.indicator_rates.is_empty() {
        println!("Indicator compliance ({} rows)\n", format_int(view.summary.total_count));
        preview_table_rows(
            &view.summary.indicator_rates,
            view.summary.indicator_rates.len(),
        );
    }

    for (column, counts) in &view.breakdowns {
        println!("{} overview\n", column);
        preview_table_rows(counts, counts.len());
    }

    println!("Detailed records\n");
    preview_display_table(&view.table, max_rows);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_export_quotes_embedded_delimiters_and_newlines() {
        let table = DisplayTable {
            headers: vec!["College Name".into(), "Notes".into()],
            rows: vec![
                vec!["GC A, Lahore".into(), "line one\nline two".into()],
                vec!["GC \"B\"".into(), String::new()],
            ],
        };
        let bytes = to_csv_bytes(&table).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "College Name,Notes\n\"GC A, Lahore\",\"line one\nline two\"\n\"GC \"\"B\"\"\",\n"
        );
    }

    #[test]
    fn csv_export_is_stable() {
        let table = DisplayTable {
            headers: vec!["A".into()],
            rows: vec![vec!["ü".into()]],
        };
        assert_eq!(to_csv_bytes(&table).unwrap(), to_csv_bytes(&table).unwrap());
        assert_eq!(to_csv_bytes(&table).unwrap(), "A\nü\n".as_bytes());
    }

    #[test]
    fn header_only_export_for_empty_table() {
        let table = DisplayTable {
            headers: vec!["A".into(), "B".into()],
            rows: vec![],
        };
        assert_eq!(to_csv_bytes(&table).unwrap(), b"A,B\n");
    }
}
