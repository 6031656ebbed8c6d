use crate::error::{DashError, Result};
use crate::util::format_plain;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tabled::Tabled;

/// Header row plus text cells exactly as the data source returned them.
///
/// Duplicate header names are allowed here; the loader folds them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new<H, R, C>(headers: H, rows: R) -> Self
    where
        H: IntoIterator,
        H::Item: Into<String>,
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        RawTable {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: rows
                .into_iter()
                .map(|r| r.into_iter().map(Into::into).collect())
                .collect(),
        }
    }
}

/// A typed cell after normalization.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Missing,
    Bool(bool),
    Number(f64),
    Text(String),
}

static MISSING: Value = Value::Missing;

impl Value {
    /// Trimmed text, or `Missing` when nothing is left after trimming.
    pub fn from_text(raw: &str) -> Value {
        let t = raw.trim();
        if t.is_empty() {
            Value::Missing
        } else {
            Value::Text(t.to_string())
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    pub fn as_bool(&self) -> bool {
        matches!(self, Value::Bool(true))
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Text used for display, exact-match filtering and search.
    pub fn display_text(&self) -> String {
        match self {
            Value::Missing => String::new(),
            Value::Bool(true) => "Yes".to_string(),
            Value::Bool(false) => "No".to_string(),
            Value::Number(n) => format_plain(*n),
            Value::Text(s) => s.clone(),
        }
    }
}

/// Cells aligned to the owning `Dataset`'s columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedRow {
    pub cells: Vec<Value>,
}

impl NormalizedRow {
    pub fn get(&self, idx: usize) -> &Value {
        self.cells.get(idx).unwrap_or(&MISSING)
    }
}

/// Canonical schema plus typed rows for one render cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Dataset {
    pub columns: Vec<String>,
    pub rows: Vec<NormalizedRow>,
}

impl Dataset {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Named lookup that fails loudly instead of reading the wrong column.
    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| DashError::MissingColumn(name.to_string()))
    }

    pub fn value<'a>(&self, row: &'a NormalizedRow, name: &str) -> &'a Value {
        match self.column_index(name) {
            Some(idx) => row.get(idx),
            None => &MISSING,
        }
    }

    pub fn all_rows(&self) -> Vec<&NormalizedRow> {
        self.rows.iter().collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A yes/no survey question and the short label shown on its card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Indicator {
    pub question: String,
    pub label: String,
}

impl Indicator {
    pub fn new(question: impl Into<String>, label: impl Into<String>) -> Self {
        Indicator {
            question: question.into(),
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndicatorSet(pub Vec<Indicator>);

impl IndicatorSet {
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        IndicatorSet(pairs.into_iter().map(|(q, l)| Indicator::new(q, l)).collect())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Indicator> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct IndicatorRate {
    #[serde(rename = "Indicator")]
    #[tabled(rename = "Indicator")]
    pub label: String,
    #[serde(rename = "Question")]
    #[tabled(skip)]
    pub question: String,
    #[serde(rename = "Rate")]
    #[tabled(rename = "Yes %")]
    pub rate: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregateResult {
    pub total_count: usize,
    pub group_counts: BTreeMap<String, BTreeMap<String, usize>>,
    pub indicator_rates: Vec<IndicatorRate>,
    pub per_row_compliance: Vec<u32>,
}

impl AggregateResult {
    pub fn rate(&self, label: &str) -> Option<u32> {
        self.indicator_rates
            .iter()
            .find(|r| r.label == label)
            .map(|r| r.rate)
    }

    pub fn group_count(&self, column: &str, value: &str) -> usize {
        self.group_counts
            .get(column)
            .and_then(|m| m.get(value))
            .copied()
            .unwrap_or(0)
    }
}

/// Which row set a KPI card is computed against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KpiScope {
    #[default]
    Unfiltered,
    Filtered,
}

impl fmt::Display for KpiScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KpiScope::Unfiltered => write!(f, "all rows"),
            KpiScope::Filtered => write!(f, "filtered"),
        }
    }
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct KpiCard {
    #[serde(rename = "Label")]
    #[tabled(rename = "KPI")]
    pub label: String,
    #[serde(rename = "Value")]
    #[tabled(skip)]
    pub value: f64,
    #[serde(rename = "Display")]
    #[tabled(rename = "Value")]
    pub display: String,
    #[serde(rename = "Scope")]
    #[tabled(rename = "Scope")]
    pub scope: KpiScope,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq, Eq)]
pub struct ValueCount {
    #[serde(rename = "Value")]
    #[tabled(rename = "Value")]
    pub value: String,
    #[serde(rename = "Count")]
    #[tabled(rename = "Count")]
    pub count: usize,
}

/// Display-ready table: what the detail preview and the CSV export consume.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DisplayTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Everything the rendering collaborator needs for one cycle.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub title: String,
    pub kpis: Vec<KpiCard>,
    pub summary: AggregateResult,
    pub breakdowns: BTreeMap<String, Vec<ValueCount>>,
    pub table: DisplayTable,
}
