use crate::config::DashboardConfig;
use crate::error::{DashError, Result};
use crate::indicators::coerce_indicators;
use crate::schema::{clean_header, dedupe_headers, merge_duplicate_columns};
use crate::types::{Dataset, NormalizedRow, RawTable, Value};
use crate::util::parse_f64_safe;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub total_rows: usize,
    pub renamed_headers: usize,
    pub merged_groups: usize,
    pub added_columns: Vec<String>,
    pub unparsed_numbers: usize,
}

/// Turn a raw table into a typed `Dataset`.
///
/// Duplicate headers are suffixed then folded by base name, guaranteed
/// columns are added as all-missing, numeric columns are parsed leniently
/// and indicator columns are coerced to booleans. Only an empty source is
/// an error; every other anomaly is absorbed and counted in the report.
pub fn normalize(raw: &RawTable, config: &DashboardConfig) -> Result<(Dataset, LoadReport)> {
    if raw.rows.is_empty() {
        return Err(DashError::EmptySource);
    }

    let working = dedupe_headers(&raw.headers);
    let renamed_headers = working
        .iter()
        .zip(&raw.headers)
        .filter(|(w, h)| w != h)
        .count();
    let working: Vec<String> = working.iter().map(|h| clean_header(h)).collect();

    let (mut columns, text_rows, merged_groups) = merge_duplicate_columns(&working, &raw.rows);

    let mut added_columns = Vec::new();
    for col in config.guaranteed_columns() {
        if !columns.contains(&col) {
            debug!(column = %col, "adding missing column as all-missing");
            columns.push(col.clone());
            added_columns.push(col);
        }
    }

    let numeric: Vec<usize> = config
        .numeric_columns
        .iter()
        .filter_map(|c| columns.iter().position(|h| h == c))
        .collect();

    let mut unparsed_numbers = 0usize;
    let rows: Vec<NormalizedRow> = text_rows
        .iter()
        .map(|text| {
            let cells = (0..columns.len())
                .map(|idx| {
                    let cell = text.get(idx).map(String::as_str);
                    if numeric.contains(&idx) {
                        match parse_f64_safe(cell) {
                            Some(v) => Value::Number(v),
                            None => {
                                if cell.is_some_and(|c| !c.trim().is_empty()) {
                                    unparsed_numbers += 1;
                                }
                                Value::Missing
                            }
                        }
                    } else {
                        cell.map(Value::from_text).unwrap_or(Value::Missing)
                    }
                })
                .collect();
            NormalizedRow { cells }
        })
        .collect();

    let mut dataset = Dataset { columns, rows };
    coerce_indicators(&mut dataset, &config.indicators);

    if unparsed_numbers > 0 {
        debug!(cells = unparsed_numbers, "non-numeric cells treated as missing");
    }

    let report = LoadReport {
        total_rows: raw.rows.len(),
        renamed_headers,
        merged_groups,
        added_columns,
        unparsed_numbers,
    };
    Ok((dataset, report))
}
