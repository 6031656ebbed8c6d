// Yes/no indicator coercion and per-row compliance.
use crate::types::{Dataset, IndicatorSet, NormalizedRow, Value};
use crate::util::percent_round;

/// True only for `yes`, ignoring surrounding whitespace and case.
///
/// Anything else (blank, `no`, `N/A`, free text) is false.
pub fn is_yes(text: &str) -> bool {
    text.trim().eq_ignore_ascii_case("yes")
}

pub fn coerce_value(value: &Value) -> Value {
    let yes = match value {
        Value::Text(s) => is_yes(s),
        Value::Bool(b) => *b,
        Value::Missing | Value::Number(_) => false,
    };
    Value::Bool(yes)
}

/// Rewrite every indicator column of `dataset` to `Value::Bool`.
///
/// Indicator questions absent from the schema are skipped; the loader adds
/// them as all-missing beforehand, so they coerce to false there.
pub fn coerce_indicators(dataset: &mut Dataset, indicators: &IndicatorSet) {
    let idxs: Vec<usize> = indicators
        .iter()
        .filter_map(|i| dataset.column_index(&i.question))
        .collect();
    for row in &mut dataset.rows {
        for &idx in &idxs {
            if idx >= row.cells.len() {
                row.cells.resize(idx + 1, Value::Missing);
            }
            row.cells[idx] = coerce_value(&row.cells[idx]);
        }
    }
}

/// Mean of the row's indicator booleans as a 0..=100 integer percentage.
pub fn row_compliance(dataset: &Dataset, row: &NormalizedRow, indicators: &IndicatorSet) -> u32 {
    let yes = indicators
        .iter()
        .filter(|i| dataset.value(row, &i.question).as_bool())
        .count();
    percent_round(yes, indicators.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yes_variants_are_true() {
        for s in ["Yes", "yes", " YES "] {
            assert!(is_yes(s), "{s:?}");
        }
    }

    #[test]
    fn everything_else_is_false() {
        for s in ["No", "", "N/A", "yes please"] {
            assert!(!is_yes(s), "{s:?}");
        }
        assert_eq!(coerce_value(&Value::Missing), Value::Bool(false));
        assert_eq!(coerce_value(&Value::Number(1.0)), Value::Bool(false));
    }

    #[test]
    fn compliance_is_mean_of_indicators() {
        let indicators = IndicatorSet::from_pairs([("Q1", "I1"), ("Q2", "I2")]);
        let mut ds = Dataset {
            columns: vec!["Q1".into(), "Q2".into()],
            rows: vec![
                NormalizedRow { cells: vec![Value::from_text("Yes"), Value::from_text("No")] },
                NormalizedRow { cells: vec![Value::from_text("yes")] },
                NormalizedRow { cells: vec![Value::from_text("yes"), Value::from_text(" yes")] },
            ],
        };
        coerce_indicators(&mut ds, &indicators);
        let pct: Vec<u32> = ds
            .rows
            .iter()
            .map(|r| row_compliance(&ds, r, &indicators))
            .collect();
        assert_eq!(pct, vec![50, 50, 100]);
        assert_eq!(ds.rows[1].cells[1], Value::Bool(false));
    }

    #[test]
    fn no_indicators_means_zero_compliance() {
        let ds = Dataset {
            columns: vec!["A".into()],
            rows: vec![NormalizedRow { cells: vec![Value::from_text("x")] }],
        };
        assert_eq!(row_compliance(&ds, &ds.rows[0], &IndicatorSet::default()), 0);
    }
}
