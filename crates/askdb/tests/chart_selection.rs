use askdb::models::{CellValue, ChartKind, Column, DisplayArtifact, ResultSet, SemanticType};
use askdb::viz::{ChartStrategy, ColorEncoding, classify, render, select};

fn numeric(name: &str, rows: usize) -> Column {
    Column::new(
        name,
        None,
        (0..rows)
            .map(|row| CellValue::Real(row as f64 * 1.5))
            .collect(),
    )
}

fn temporal(name: &str, rows: usize) -> Column {
    Column::new(
        name,
        None,
        (0..rows)
            .map(|row| CellValue::Text(format!("2024-03-{:02}", row + 1)))
            .collect(),
    )
}

fn categorical(name: &str, rows: usize) -> Column {
    Column::new(
        name,
        None,
        (0..rows)
            .map(|row| CellValue::Text(format!("group-{}", row % 3)))
            .collect(),
    )
}

fn result_set(columns: Vec<Column>) -> ResultSet {
    ResultSet::new(columns).expect("result set should build")
}

fn strategy_for(result_set: &ResultSet) -> ChartStrategy {
    select(&classify(result_set), result_set).strategy
}

/// Every combination of up to four columns drawn from the three kinds.
fn layouts(rows: usize) -> Vec<ResultSet> {
    let mut layouts = Vec::new();
    for width in 0..=4_u32 {
        for code in 0..3_usize.pow(width) {
            let mut digits = code;
            let columns = (0..width)
                .map(|index| {
                    let name = format!("c{index}");
                    let kind = digits % 3;
                    digits /= 3;
                    match kind {
                        0 => numeric(&name, rows),
                        1 => temporal(&name, rows),
                        _ => categorical(&name, rows),
                    }
                })
                .collect();
            layouts.push(result_set(columns));
        }
    }
    layouts
}

#[test]
fn classify_returns_one_profile_per_column_in_order() {
    for rows in [0, 1, 5] {
        for layout in layouts(rows) {
            let profiles = classify(&layout);
            assert_eq!(profiles.len(), layout.columns().len());
            for (index, (profile, column)) in profiles.iter().zip(layout.columns()).enumerate() {
                assert_eq!(profile.index, index);
                assert_eq!(profile.name, column.name);
            }
        }
    }
}

#[test]
fn select_is_total_and_renders_every_layout() {
    for rows in [0, 1, 5] {
        for layout in layouts(rows) {
            let spec = select(&classify(&layout), &layout);
            let artifact = render(&spec).expect("selected specs always render");
            match (spec.strategy.kind(), artifact) {
                (Some(kind), DisplayArtifact::Chart { chart, .. }) => assert_eq!(kind, chart),
                (None, DisplayArtifact::Text { .. }) => {}
                (kind, artifact) => panic!("{kind:?} rendered as {artifact:?}"),
            }
        }
    }
}

#[test]
fn empty_result_sets_never_chart() {
    for layout in layouts(0) {
        assert_eq!(
            strategy_for(&layout),
            ChartStrategy::None {
                reason: "no rows".to_string()
            }
        );
    }
}

#[test]
fn three_numeric_and_a_category_is_a_bubble() {
    let data = result_set(vec![
        numeric("a", 4),
        numeric("b", 4),
        numeric("c", 4),
        categorical("d", 4),
    ]);
    let spec = select(&classify(&data), &data);

    let ChartStrategy::Bubble {
        x,
        y,
        size,
        color,
        tooltip,
    } = &spec.strategy
    else {
        panic!("expected bubble, got {:?}", spec.strategy);
    };
    assert_eq!((x.as_str(), y.as_str(), size.as_str()), ("a", "b", "c"));
    assert_eq!(
        color,
        &Some(ColorEncoding {
            column: "d".to_string(),
            cardinality: 3,
        })
    );
    assert_eq!(tooltip.len(), 4);
    assert_eq!(spec.data.column_names(), vec!["a", "b", "c", "d"]);
}

#[test]
fn two_numeric_without_time_is_a_scatter() {
    let data = result_set(vec![categorical("label", 3), numeric("a", 3), numeric("b", 3)]);
    let spec = select(&classify(&data), &data);

    assert_eq!(
        spec.strategy,
        ChartStrategy::Scatter {
            x: "a".to_string(),
            y: "b".to_string(),
        }
    );
    assert_eq!(spec.data.column_names(), vec!["a", "b"]);
}

#[test]
fn numeric_with_time_is_a_time_series_despite_extra_columns() {
    let cases = [
        vec![numeric("a", 3), temporal("t", 3)],
        vec![temporal("t", 3), numeric("a", 3), temporal("t2", 3)],
        vec![categorical("region", 3), temporal("t", 3), numeric("a", 3)],
        vec![temporal("t", 3), numeric("a", 3), numeric("b", 3)],
    ];

    for columns in cases {
        let data = result_set(columns);
        assert_eq!(
            strategy_for(&data),
            ChartStrategy::TimeSeries {
                time: "t".to_string(),
                value: "a".to_string(),
            }
        );
    }
}

#[test]
fn category_and_value_is_a_bar_in_either_order() {
    for columns in [
        vec![categorical("region", 3), numeric("total", 3)],
        vec![numeric("total", 3), categorical("region", 3)],
    ] {
        let data = result_set(columns);
        assert_eq!(
            strategy_for(&data),
            ChartStrategy::Bar {
                category: "region".to_string(),
                value: "total".to_string(),
            }
        );
    }
}

#[test]
fn one_numeric_among_many_is_a_histogram() {
    let data = result_set(vec![
        categorical("a", 3),
        numeric("value", 3),
        categorical("b", 3),
        categorical("c", 3),
    ]);
    let spec = select(&classify(&data), &data);

    assert_eq!(
        spec.strategy,
        ChartStrategy::Histogram {
            value: "value".to_string()
        }
    );
    assert_eq!(spec.data.column_names(), vec!["value"]);
}

#[test]
fn mixed_columns_fall_back_to_categorical() {
    let data = result_set(vec![
        Column::new(
            "mixed",
            Some(SemanticType::Numeric),
            vec![CellValue::Integer(1), CellValue::Text("two".to_string())],
        ),
        numeric("value", 2),
    ]);
    let profiles = classify(&data);

    assert_eq!(profiles[0].semantic_type, SemanticType::Categorical);
    assert!(profiles[0].ambiguous);
    assert_eq!(
        select(&profiles, &data).strategy.kind(),
        Some(ChartKind::Bar)
    );
}

#[test]
fn categorical_only_results_explain_why_there_is_no_chart() {
    let data = result_set(vec![categorical("a", 3), categorical("b", 3)]);
    let spec = select(&classify(&data), &data);

    assert_eq!(
        render(&spec).expect("none always renders"),
        DisplayArtifact::info("no suitable data for an automatic chart")
    );
}
