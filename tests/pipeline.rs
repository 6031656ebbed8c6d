use std::io::Write;

use monitoring_report::config::{KpiMetric, KpiSpec};
use monitoring_report::loader::normalize;
use monitoring_report::output::to_csv_bytes;
use monitoring_report::reports::{aggregate, build_view, kpi_cards};
use monitoring_report::types::{KpiScope, Value};
use monitoring_report::{
    filter, ComplianceFilter, CsvSource, DashError, DashboardConfig, DataSource, FilterSpec,
    IndicatorSet, RawTable,
};

fn two_row_config() -> DashboardConfig {
    DashboardConfig {
        indicators: IndicatorSet::from_pairs([("Q1", "I1"), ("Q2", "I2")]),
        ..DashboardConfig::default()
    }
}

#[test]
fn end_to_end_two_rows() {
    let raw = RawTable::new(
        ["District", "Type", "Q1", "Q2"],
        [["X", "General", "Yes", "No"], ["Y", "Commerce", "No", "No"]],
    );
    let cfg = two_row_config();
    let (ds, _) = normalize(&raw, &cfg).unwrap();
    let rows = ds.all_rows();
    let agg = aggregate(&ds, &rows, &cfg.indicators, &[]).unwrap();

    assert_eq!(agg.total_count, 2);
    assert_eq!(agg.rate("I1"), Some(50));
    assert_eq!(agg.rate("I2"), Some(0));
    assert_eq!(agg.per_row_compliance, vec![50, 0]);
}

#[test]
fn empty_filtered_set_has_zero_rates() {
    let raw = RawTable::new(["District", "Q1", "Q2"], [["X", "Yes", "Yes"]]);
    let cfg = two_row_config();
    let (ds, _) = normalize(&raw, &cfg).unwrap();
    let mut spec = FilterSpec::default();
    spec.select("District", ["Nowhere"]);

    let view = build_view(&ds, &spec, &cfg).unwrap();
    assert_eq!(view.summary.total_count, 0);
    assert_eq!(view.summary.indicator_rates.len(), 2);
    assert!(view.summary.indicator_rates.iter().all(|r| r.rate == 0));
    assert!(view.summary.per_row_compliance.is_empty());
}

#[test]
fn kpi_cards_use_full_dataset_while_rates_use_filtered_rows() {
    let mut rows = Vec::new();
    for i in 0..10 {
        let district = if i < 3 { "Lahore" } else { "Multan" };
        let kind = if i < 6 { "General" } else { "Commerce" };
        let q1 = if i == 0 { "Yes" } else { "No" };
        rows.push(vec![district, kind, q1]);
    }
    // 6 General overall; Lahore holds 2 General and 1 Commerce.
    rows[2][1] = "Commerce";
    rows[6][1] = "General";

    let raw = RawTable::new(["District", "College Type", "Q1"], rows);
    let cfg = DashboardConfig {
        indicators: IndicatorSet::from_pairs([("Q1", "Classrooms")]),
        group_by: vec!["College Type".into()],
        kpis: vec![
            KpiSpec {
                label: "General Colleges".into(),
                scope: KpiScope::Unfiltered,
                metric: KpiMetric::Equals {
                    column: "College Type".into(),
                    value: "General".into(),
                },
            },
            KpiSpec {
                label: "Visible Colleges".into(),
                scope: KpiScope::Filtered,
                metric: KpiMetric::Total,
            },
        ],
        ..DashboardConfig::default()
    };
    let (ds, _) = normalize(&raw, &cfg).unwrap();
    let mut spec = FilterSpec::default();
    spec.select("District", ["Lahore"]);

    let view = build_view(&ds, &spec, &cfg).unwrap();
    assert_eq!(view.kpis[0].label, "General Colleges");
    assert_eq!(view.kpis[0].value, 6.0);
    assert_eq!(view.kpis[0].display, "6");
    assert_eq!(view.kpis[1].value, 3.0);
    assert_eq!(view.summary.total_count, 3);
    assert_eq!(view.summary.group_count("College Type", "General"), 2);
    assert_eq!(view.summary.group_count("College Type", "Commerce"), 1);
    // One yes out of three filtered rows.
    assert_eq!(view.summary.rate("Classrooms"), Some(33));

    let filtered = filter::apply(&ds, &spec, &cfg.indicators).unwrap();
    let cards = kpi_cards(&ds, &filtered, &cfg.kpis).unwrap();
    assert_eq!(cards, view.kpis);
}

#[test]
fn compliance_filter_splits_at_threshold() {
    let raw = RawTable::new(
        ["Name", "Q1", "Q2"],
        [["a", "Yes", "No"], ["b", "Yes", "Yes"], ["c", "No", "No"]],
    );
    let cfg = two_row_config();
    let (ds, _) = normalize(&raw, &cfg).unwrap();

    let mut above = FilterSpec::default();
    above.compliance(ComplianceFilter::Above(50));
    let mut at_most = FilterSpec::default();
    at_most.compliance(ComplianceFilter::AtMost(50));

    let names = |spec: &FilterSpec| -> Vec<String> {
        filter::apply(&ds, spec, &cfg.indicators)
            .unwrap()
            .iter()
            .map(|r| ds.value(r, "Name").display_text())
            .collect()
    };
    assert_eq!(names(&above), vec!["b"]);
    assert_eq!(names(&at_most), vec!["a", "c"]);
}

#[test]
fn duplicate_action_columns_merge_through_csv_source() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "Timestamp,Email Address,District,College Name,Action,Action,Action,Salary Deducted"
    )
    .unwrap();
    writeln!(file, "1/1,a@x.pk,Lahore,GC A,,Warning,,").unwrap();
    writeln!(file, "1/2,b@x.pk,Multan,\"GC B, Multan\",Salary deduction,,,\"2,500\"").unwrap();

    let cfg = DashboardConfig::action_report();
    let raw = CsvSource::new(file.path()).fetch().unwrap();
    let (ds, report) = normalize(&raw, &cfg).unwrap();
    assert_eq!(report.merged_groups, 1);
    assert_eq!(ds.value(&ds.rows[0], "Action"), &Value::Text("Warning".into()));
    assert_eq!(ds.value(&ds.rows[1], "Salary Deducted"), &Value::Number(2500.0));

    let view = build_view(&ds, &FilterSpec::default(), &cfg).unwrap();
    let salary = view.kpis.iter().find(|k| k.label == "Salary Deduction").unwrap();
    assert_eq!(salary.display, "PKR 2,500");
    let warnings = view.kpis.iter().find(|k| k.label == "Warnings Issued").unwrap();
    assert_eq!(warnings.value, 1.0);
    assert_eq!(view.breakdowns["Action"].len(), 2);

    let csv = String::from_utf8(to_csv_bytes(&view.table).unwrap()).unwrap();
    assert_eq!(
        csv,
        "District,College Name,Action,Salary Deducted\nLahore,GC A,Warning,\nMultan,\"GC B, Multan\",Salary deduction,2500\n"
    );
}

#[test]
fn facility_preset_renders_compliance_column() {
    let cfg = DashboardConfig::college_facility();
    let mut headers: Vec<String> = vec![
        "Timestamp".into(),
        "Email Address".into(),
        "District".into(),
        "College Gender".into(),
        "College Type".into(),
        "College Name".into(),
    ];
    headers.extend(cfg.indicators.iter().map(|i| i.question.clone()));
    headers.push("Monitoring Officer".into());
    let mut first: Vec<&str> = vec!["t", "e", "X", "Male", "General", "GC A"];
    first.extend(std::iter::repeat("Yes").take(6));
    first.extend(std::iter::repeat("No").take(6));
    let mut second: Vec<&str> = vec!["t", "e", "Y", "Female", "Commerce", "GC B"];
    second.extend(std::iter::repeat("yes").take(12));

    let raw = RawTable::new(headers, [first, second]);
    let (ds, _) = normalize(&raw, &cfg).unwrap();
    let view = build_view(&ds, &FilterSpec::default(), &cfg).unwrap();

    assert_eq!(
        view.table.headers,
        vec!["College Name", "District", "College Gender", "College Type", "Compliance %"]
    );
    assert_eq!(view.table.rows[0][4], "50%");
    assert_eq!(view.table.rows[1][4], "100%");
    assert_eq!(view.summary.rate("Staff Presence?"), Some(50));
    assert_eq!(view.kpis.iter().map(|k| k.value).collect::<Vec<_>>(), vec![2.0, 1.0, 1.0, 1.0, 1.0]);
}

#[test]
fn facility_preset_reports_absent_lookup_column() {
    let cfg = DashboardConfig::college_facility();
    let mut headers: Vec<String> = vec![
        "District".into(),
        "College Gender".into(),
        "College Name".into(),
        "Monitoring Officer".into(),
    ];
    headers.extend(cfg.indicators.iter().map(|i| i.question.clone()));
    let mut row: Vec<&str> = vec!["X", "Male", "GC A", "Officer"];
    row.extend(std::iter::repeat("Yes").take(12));

    let raw = RawTable::new(headers, [row]);
    let (ds, report) = normalize(&raw, &cfg).unwrap();
    assert!(report.added_columns.is_empty());
    assert!(ds.column_index("College Type").is_none());

    let err = build_view(&ds, &FilterSpec::default(), &cfg).unwrap_err();
    assert!(matches!(err, DashError::MissingColumn(ref c) if c == "College Type"));
}

#[test]
fn empty_source_stops_the_cycle() {
    let raw = RawTable::new(["District"], Vec::<Vec<String>>::new());
    let err = normalize(&raw, &DashboardConfig::default()).unwrap_err();
    assert_eq!(err.to_string(), "no data found in the data source");
}
