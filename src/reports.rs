use crate::config::{DashboardConfig, KpiMetric, KpiSpec, COMPLIANCE_COLUMN};
use crate::error::Result;
use crate::filter::{self, FilterSpec};
use crate::indicators::row_compliance;
use crate::types::{
    AggregateResult, DashboardView, Dataset, DisplayTable, IndicatorRate, IndicatorSet, KpiCard,
    KpiScope, NormalizedRow, ValueCount,
};
use crate::util::{format_int, format_number, format_percent, percent_round};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::info;

/// Counts, indicator rates and per-row compliance over `rows`.
///
/// Group counts cover every value seen in the full dataset for each
/// group-by column, so a category filtered out still reports zero.
pub fn aggregate(
    dataset: &Dataset,
    rows: &[&NormalizedRow],
    indicators: &IndicatorSet,
    group_by: &[String],
) -> Result<AggregateResult> {
    let mut group_counts: BTreeMap<String, BTreeMap<String, usize>> = BTreeMap::new();
    for col in group_by {
        let idx = dataset.require_column(col)?;
        let mut counts: BTreeMap<String, usize> = dataset
            .rows
            .iter()
            .map(|r| r.get(idx))
            .filter(|v| !v.is_missing())
            .map(|v| (v.display_text(), 0))
            .collect();
        for r in rows {
            let v = r.get(idx);
            if !v.is_missing() {
                *counts.entry(v.display_text()).or_insert(0) += 1;
            }
        }
        group_counts.insert(col.clone(), counts);
    }

    let indicator_rates = indicators
        .iter()
        .map(|ind| {
            let yes = rows
                .iter()
                .filter(|r| dataset.value(r, &ind.question).as_bool())
                .count();
            IndicatorRate {
                label: ind.label.clone(),
                question: ind.question.clone(),
                rate: percent_round(yes, rows.len()),
            }
        })
        .collect();

    let per_row_compliance = rows
        .iter()
        .map(|r| row_compliance(dataset, r, indicators))
        .collect();

    Ok(AggregateResult {
        total_count: rows.len(),
        group_counts,
        indicator_rates,
        per_row_compliance,
    })
}

/// Compute KPI cards, each over the row set its scope names.
///
/// `Unfiltered` cards always see the whole dataset; `Filtered` cards see
/// only `filtered`.
pub fn kpi_cards(
    dataset: &Dataset,
    filtered: &[&NormalizedRow],
    kpis: &[KpiSpec],
) -> Result<Vec<KpiCard>> {
    let all = dataset.all_rows();
    kpis.iter()
        .map(|spec| {
            let rows: &[&NormalizedRow] = match spec.scope {
                KpiScope::Unfiltered => &all,
                KpiScope::Filtered => filtered,
            };
            let (value, display) = metric_value(dataset, rows, &spec.metric)?;
            Ok(KpiCard {
                label: spec.label.clone(),
                value,
                display,
                scope: spec.scope,
            })
        })
        .collect()
}

fn metric_value(
    dataset: &Dataset,
    rows: &[&NormalizedRow],
    metric: &KpiMetric,
) -> Result<(f64, String)> {
    let count = |n: usize| (n as f64, format_int(n));
    match metric {
        KpiMetric::Total => Ok(count(rows.len())),
        KpiMetric::Equals { column, value } => {
            let idx = dataset.require_column(column)?;
            Ok(count(
                rows.iter()
                    .filter(|r| r.get(idx).display_text() == *value)
                    .count(),
            ))
        }
        KpiMetric::Contains { column, needle } => {
            let idx = dataset.require_column(column)?;
            let needle = needle.to_lowercase();
            Ok(count(
                rows.iter()
                    .filter(|r| r.get(idx).display_text().to_lowercase().contains(&needle))
                    .count(),
            ))
        }
        KpiMetric::Distinct { column } => {
            let idx = dataset.require_column(column)?;
            let distinct: HashSet<String> = rows
                .iter()
                .map(|r| r.get(idx))
                .filter(|v| !v.is_missing())
                .map(|v| v.display_text())
                .collect();
            Ok(count(distinct.len()))
        }
        KpiMetric::Sum {
            column,
            where_column,
            contains,
            prefix,
        } => {
            let idx = dataset.require_column(column)?;
            let gate = match (where_column, contains) {
                (Some(w), Some(c)) => Some((dataset.require_column(w)?, c.to_lowercase())),
                _ => None,
            };
            let total: f64 = rows
                .iter()
                .filter(|r| match &gate {
                    Some((w, c)) => r.get(*w).display_text().to_lowercase().contains(c.as_str()),
                    None => true,
                })
                .filter_map(|r| r.get(idx).as_number())
                .sum();
            let display = format!(
                "{}{}",
                prefix.as_deref().unwrap_or(""),
                format_number(total.trunc(), 0)
            );
            Ok((total, display))
        }
    }
}

/// Non-blank values of `column` with their counts, most frequent first.
pub fn value_counts(
    dataset: &Dataset,
    rows: &[&NormalizedRow],
    column: &str,
) -> Result<Vec<ValueCount>> {
    let idx = dataset.require_column(column)?;
    let mut map: HashMap<String, usize> = HashMap::new();
    for r in rows {
        let v = r.get(idx);
        if !v.is_missing() {
            *map.entry(v.display_text()).or_default() += 1;
        }
    }
    let mut out: Vec<ValueCount> = map
        .into_iter()
        .map(|(value, count)| ValueCount { value, count })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
    Ok(out)
}

enum TableColumn {
    Data(usize, String),
    Compliance,
}

impl TableColumn {
    fn header(&self) -> &str {
        match self {
            TableColumn::Data(_, name) => name,
            TableColumn::Compliance => COMPLIANCE_COLUMN,
        }
    }
}

/// Display-trimmed table for the detail view and the CSV export.
///
/// Uses the configured detail columns (each must exist) or every column,
/// appends the compliance percentage when indicators are configured, strips
/// excluded columns and, when there are rows, drops columns that are blank
/// in all of them.
pub fn display_table(
    dataset: &Dataset,
    rows: &[&NormalizedRow],
    config: &DashboardConfig,
) -> Result<DisplayTable> {
    let mut columns: Vec<TableColumn> = Vec::new();
    if config.detail_columns.is_empty() {
        columns.extend(
            dataset
                .columns
                .iter()
                .enumerate()
                .map(|(i, c)| TableColumn::Data(i, c.clone())),
        );
        if !config.indicators.is_empty() {
            columns.push(TableColumn::Compliance);
        }
    } else {
        for name in &config.detail_columns {
            if name == COMPLIANCE_COLUMN {
                columns.push(TableColumn::Compliance);
            } else {
                columns.push(TableColumn::Data(dataset.require_column(name)?, name.clone()));
            }
        }
    }
    columns.retain(|c| !config.excluded_columns.iter().any(|e| e == c.header()));

    let mut cells: Vec<Vec<String>> = rows
        .iter()
        .map(|r| {
            columns
                .iter()
                .map(|c| match c {
                    TableColumn::Data(idx, _) => r.get(*idx).display_text(),
                    TableColumn::Compliance => {
                        format_percent(row_compliance(dataset, r, &config.indicators) as f64)
                    }
                })
                .collect()
        })
        .collect();

    let mut keep: Vec<bool> = vec![true; columns.len()];
    if !cells.is_empty() {
        for (i, k) in keep.iter_mut().enumerate() {
            *k = cells.iter().any(|row| !row[i].trim().is_empty());
        }
    }
    let headers = columns
        .iter()
        .zip(&keep)
        .filter(|(_, k)| **k)
        .map(|(c, _)| c.header().to_string())
        .collect();
    for row in &mut cells {
        let mut i = 0;
        row.retain(|_| {
            let k = keep[i];
            i += 1;
            k
        });
    }

    Ok(DisplayTable {
        headers,
        rows: cells,
    })
}

/// Run one full render cycle over an already loaded dataset.
pub fn build_view(
    dataset: &Dataset,
    filters: &FilterSpec,
    config: &DashboardConfig,
) -> Result<DashboardView> {
    let filtered = filter::apply(dataset, filters, &config.indicators)?;
    let kpis = kpi_cards(dataset, &filtered, &config.kpis)?;
    let summary = aggregate(dataset, &filtered, &config.indicators, &config.group_by)?;
    let mut breakdowns = BTreeMap::new();
    for col in &config.breakdown_columns {
        breakdowns.insert(col.clone(), value_counts(dataset, &filtered, col)?);
    }
    let table = display_table(dataset, &filtered, config)?;
    info!(
        total = dataset.len(),
        visible = filtered.len(),
        "built dashboard view"
    );
    Ok(DashboardView {
        title: config.title.clone(),
        kpis,
        summary,
        breakdowns,
        table,
    })
}
