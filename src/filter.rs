use crate::error::Result;
use crate::indicators::row_compliance;
use crate::types::{Dataset, IndicatorSet, NormalizedRow};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// The option that lifts a categorical restriction.
pub const ALL: &str = "All";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceFilter {
    AtMost(u32),
    Above(u32),
}

impl ComplianceFilter {
    pub fn accepts(&self, pct: u32) -> bool {
        match *self {
            ComplianceFilter::AtMost(t) => pct <= t,
            ComplianceFilter::Above(t) => pct > t,
        }
    }
}

impl fmt::Display for ComplianceFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComplianceFilter::AtMost(t) => write!(f, "<= {}%", t),
            ComplianceFilter::Above(t) => write!(f, "> {}%", t),
        }
    }
}

/// User-chosen filter criteria for one render cycle.
///
/// Owned by the caller and carried across refreshes; the pipeline never
/// keeps its own copy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub categorical: BTreeMap<String, BTreeSet<String>>,
    pub search: Option<String>,
    pub compliance: Option<ComplianceFilter>,
}

impl FilterSpec {
    /// Replace the accepted values for `column`.
    pub fn select<I, S>(&mut self, column: &str, values: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categorical
            .insert(column.to_string(), values.into_iter().map(Into::into).collect());
        self
    }

    pub fn search(&mut self, needle: impl Into<String>) -> &mut Self {
        self.search = Some(needle.into());
        self
    }

    pub fn compliance(&mut self, filter: ComplianceFilter) -> &mut Self {
        self.compliance = Some(filter);
        self
    }

    pub fn clear(&mut self) {
        *self = FilterSpec::default();
    }

    pub fn is_unrestricted(&self) -> bool {
        self.active_categorical().next().is_none()
            && self.search_needle().is_none()
            && self.compliance.is_none()
    }

    fn active_categorical(&self) -> impl Iterator<Item = (&String, &BTreeSet<String>)> {
        self.categorical
            .iter()
            .filter(|(_, v)| !v.is_empty() && !v.contains(ALL))
    }

    /// Lowercased needle, matched as typed; only an empty string disables it.
    fn search_needle(&self) -> Option<String> {
        self.search
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }
}

/// Keep the rows of `dataset` that satisfy every part of `spec`.
///
/// Relative order is preserved and the input is untouched. Filtering on a
/// column the dataset does not have is an error rather than an empty result.
pub fn apply<'a>(
    dataset: &'a Dataset,
    spec: &FilterSpec,
    indicators: &IndicatorSet,
) -> Result<Vec<&'a NormalizedRow>> {
    let categorical: Vec<(usize, &BTreeSet<String>)> = spec
        .active_categorical()
        .map(|(col, accepted)| dataset.require_column(col).map(|idx| (idx, accepted)))
        .collect::<Result<_>>()?;
    let needle = spec.search_needle();

    let rows = dataset
        .rows
        .iter()
        .filter(|row| {
            categorical
                .iter()
                .all(|(idx, accepted)| accepted.contains(&row.get(*idx).display_text()))
        })
        .filter(|row| match &needle {
            Some(n) => row
                .cells
                .iter()
                .any(|c| c.display_text().to_lowercase().contains(n.as_str())),
            None => true,
        })
        .filter(|row| match spec.compliance {
            Some(cf) => cf.accepts(row_compliance(dataset, row, indicators)),
            None => true,
        })
        .collect();
    Ok(rows)
}

/// Choices for a categorical filter: `All`, then either the fixed list or
/// the sorted distinct values observed in the column.
pub fn filter_options(dataset: &Dataset, column: &str, custom: Option<&[String]>) -> Vec<String> {
    let mut opts = vec![ALL.to_string()];
    match custom {
        Some(list) => opts.extend(list.iter().cloned()),
        None => {
            if let Some(idx) = dataset.column_index(column) {
                let distinct: BTreeSet<String> = dataset
                    .rows
                    .iter()
                    .map(|r| r.get(idx))
                    .filter(|v| !v.is_missing())
                    .map(|v| v.display_text())
                    .collect();
                opts.extend(distinct);
            }
        }
    }
    opts
}
