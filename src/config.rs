use crate::error::Result;
use crate::types::{IndicatorSet, KpiScope};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Name of the computed per-row compliance column in display tables.
pub const COMPLIANCE_COLUMN: &str = "Compliance %";

/// How one KPI card derives its number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum KpiMetric {
    /// Number of rows in scope.
    Total,
    /// Rows whose cell text equals `value` exactly.
    Equals { column: String, value: String },
    /// Rows whose cell text contains `needle`, case-insensitively.
    Contains { column: String, needle: String },
    /// Distinct non-missing values of a column.
    Distinct { column: String },
    /// Sum of a numeric column, optionally over rows where `where_column`
    /// contains `contains`.
    Sum {
        column: String,
        #[serde(default)]
        where_column: Option<String>,
        #[serde(default)]
        contains: Option<String>,
        #[serde(default)]
        prefix: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KpiSpec {
    pub label: String,
    #[serde(default)]
    pub scope: KpiScope,
    pub metric: KpiMetric,
}

impl KpiSpec {
    fn new(label: &str, scope: KpiScope, metric: KpiMetric) -> Self {
        KpiSpec {
            label: label.to_string(),
            scope,
            metric,
        }
    }
}

/// Everything that varies between dashboards built on the same pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub title: String,
    pub indicators: IndicatorSet,
    /// Columns that must exist after normalization; added as all-missing.
    pub required_columns: Vec<String>,
    /// Columns parsed leniently into numbers.
    pub numeric_columns: Vec<String>,
    /// Columns offered as categorical filters, in display order.
    pub filter_columns: Vec<String>,
    /// Fixed option lists that replace the observed values for a filter.
    pub custom_filter_options: BTreeMap<String, Vec<String>>,
    /// Columns counted into `AggregateResult::group_counts`.
    pub group_by: Vec<String>,
    /// Columns rendered as value-count charts.
    pub breakdown_columns: Vec<String>,
    /// Detail table columns; empty means every column.
    pub detail_columns: Vec<String>,
    /// Columns never shown or exported.
    pub excluded_columns: Vec<String>,
    pub compliance_threshold: u32,
    pub kpis: Vec<KpiSpec>,
    /// Auto-refresh interval; zero disables it.
    pub refresh_secs: u64,
    pub export_file: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        DashboardConfig {
            title: "Monitoring Dashboard".to_string(),
            indicators: IndicatorSet::default(),
            required_columns: Vec::new(),
            numeric_columns: Vec::new(),
            filter_columns: Vec::new(),
            custom_filter_options: BTreeMap::new(),
            group_by: Vec::new(),
            breakdown_columns: Vec::new(),
            detail_columns: Vec::new(),
            excluded_columns: vec!["Timestamp".to_string(), "Email Address".to_string()],
            compliance_threshold: 50,
            kpis: vec![KpiSpec::new("Total Rows", KpiScope::Unfiltered, KpiMetric::Total)],
            refresh_secs: 300,
            export_file: "monitoring_filtered.csv".to_string(),
        }
    }
}

fn owned(v: &[&str]) -> Vec<String> {
    v.iter().map(|s| s.to_string()).collect()
}

fn equals(column: &str, value: &str) -> KpiMetric {
    KpiMetric::Equals {
        column: column.to_string(),
        value: value.to_string(),
    }
}

fn contains(column: &str, needle: &str) -> KpiMetric {
    KpiMetric::Contains {
        column: column.to_string(),
        needle: needle.to_string(),
    }
}

impl DashboardConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Facility readiness survey: yes/no indicators, KPI cards over all rows.
    pub fn college_facility() -> Self {
        let indicators = IndicatorSet::from_pairs([
            ("Classrooms cleaned, ventilated, and furniture arranged?", "Classrooms cleaned, ventilated?"),
            ("Toilets cleaned, functional, and with water supply?", "Toilets cleaned, functional?"),
            ("Drinking water availability and quality check?", "Drinking water availability?"),
            ("Electricity and lighting functional in classrooms and labs?", "Electricity and lighting functional?"),
            ("Campus grounds cleaned (lawns, courtyards, pathways)?", "Campus grounds cleaned?"),
            ("Boundary wall and gates secured (no open or broken sections)?", "Boundary wall and gates secured?"),
            ("Science labs ready with basic equipment and chemicals?", "Science labs readiness?"),
            ("IT/Computer labs functional (systems, internet, power)?", "IT/Computer labs functional?"),
            ("Library operational clean and open for students?", "Library operational?"),
            ("Biometric Attendance Device installed and functional?", "Biometric Attendance functional?"),
            ("Principal and administration staff presence on reopening day?", "Staff Presence?"),
            ("Students attendance registers available and ready?", "Student Attendance Registers Ready?"),
        ]);
        let u = KpiScope::Unfiltered;
        DashboardConfig {
            title: "Special Monitoring Drive of Govt. Colleges".to_string(),
            indicators,
            filter_columns: owned(&["District", "College Gender", "College Type"]),
            group_by: owned(&["District", "College Gender", "College Type"]),
            detail_columns: owned(&[
                "College Name",
                "District",
                "College Gender",
                "College Type",
                COMPLIANCE_COLUMN,
                "Monitoring Officer",
            ]),
            kpis: vec![
                KpiSpec::new("Total Colleges Visited", u, KpiMetric::Total),
                KpiSpec::new("General Colleges", u, equals("College Type", "General")),
                KpiSpec::new("Commerce Colleges", u, equals("College Type", "Commerce")),
                KpiSpec::new("Male Colleges", u, equals("College Gender", "Male")),
                KpiSpec::new("Female Colleges", u, equals("College Gender", "Female")),
            ],
            export_file: "college_facility_filtered.csv".to_string(),
            ..DashboardConfig::default()
        }
    }

    /// Action report: merged duplicate columns, KPI cards over filtered rows.
    pub fn action_report() -> Self {
        let f = KpiScope::Filtered;
        let mut custom_filter_options = BTreeMap::new();
        custom_filter_options.insert(
            "Reason".to_string(),
            owned(&[
                "Habitual Absentiesm",
                "Proxy Attendance",
                "Staff absent during monitoring visit",
            ]),
        );
        DashboardConfig {
            title: "Colleges Monitoring Dashboard".to_string(),
            required_columns: owned(&["Scale", "Reason", "Category"]),
            numeric_columns: owned(&["Scale", "Salary Deducted"]),
            filter_columns: owned(&[
                "District",
                "College Name",
                "College Gender",
                "College Type",
                "Category",
                "Action",
                "Reason",
                "Action By",
            ]),
            custom_filter_options,
            group_by: owned(&["District", "Category", "Action", "Reason"]),
            breakdown_columns: owned(&["Action"]),
            kpis: vec![
                KpiSpec::new("Total Actions", f, KpiMetric::Total),
                KpiSpec::new(
                    "Colleges",
                    f,
                    KpiMetric::Distinct {
                        column: "College Name".to_string(),
                    },
                ),
                KpiSpec::new(
                    "Salary Deduction",
                    f,
                    KpiMetric::Sum {
                        column: "Salary Deducted".to_string(),
                        where_column: Some("Action".to_string()),
                        contains: Some("Salary".to_string()),
                        prefix: Some("PKR ".to_string()),
                    },
                ),
                KpiSpec::new("Facility Updates", f, contains("Category", "Facility")),
                KpiSpec::new("Warnings Issued", f, contains("Action", "Warning")),
                KpiSpec::new("Proxy Attendance Cases", f, contains("Reason", "Proxy Attendance")),
                KpiSpec::new("Explanation Called", f, contains("Action", "Explanation")),
                KpiSpec::new(
                    "Habitual Absenteeism Action",
                    f,
                    contains("Reason", "Habitual Absentiesm"),
                ),
            ],
            export_file: "monitoring_filtered.csv".to_string(),
            ..DashboardConfig::default()
        }
    }

    /// Columns the loader must guarantee, including indicator and numeric ones.
    pub fn guaranteed_columns(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        let all = self
            .required_columns
            .iter()
            .chain(self.numeric_columns.iter())
            .chain(self.indicators.iter().map(|i| &i.question));
        for c in all {
            if !out.contains(c) {
                out.push(c.clone());
            }
        }
        out
    }
}
