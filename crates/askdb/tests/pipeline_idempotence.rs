use askdb::models::{CellValue, Column, ResultSet};
use askdb::viz::{ResultPipeline, run};

fn mixed_result_set() -> ResultSet {
    ResultSet::new(vec![
        Column::new(
            "region",
            None,
            vec![
                CellValue::Text("north".to_string()),
                CellValue::Text("south".to_string()),
                CellValue::Null,
            ],
        ),
        Column::new(
            "units",
            None,
            vec![
                CellValue::Integer(3),
                CellValue::Integer(9),
                CellValue::Integer(4),
            ],
        ),
        Column::new(
            "revenue",
            None,
            vec![
                CellValue::Real(30.5),
                CellValue::Real(90.0),
                CellValue::Real(41.25),
            ],
        ),
        Column::new(
            "margin",
            None,
            vec![CellValue::Real(0.2), CellValue::Null, CellValue::Real(0.4)],
        ),
    ])
    .expect("result set should build")
}

#[test]
fn running_twice_yields_identical_output() {
    let input = mixed_result_set();
    let pipeline = ResultPipeline::default();

    let first = pipeline.run(&input);
    let second = pipeline.run(&input);

    assert_eq!(first, second);
    assert_eq!(first.to_json(), second.to_json());
    assert_eq!(input, mixed_result_set());
}

#[test]
fn free_function_matches_the_default_pipeline() {
    let input = mixed_result_set();
    assert_eq!(run(&input), ResultPipeline::default().run(&input));
}

#[test]
fn cardinality_lookups_do_not_leak_between_runs() {
    let input = mixed_result_set();
    let first = run(&input);

    let other = ResultSet::new(vec![
        Column::new(
            "region",
            None,
            (0..5)
                .map(|row| CellValue::Text(format!("r{row}")))
                .collect(),
        ),
        Column::new("a", None, (0..5).map(CellValue::Integer).collect()),
        Column::new("b", None, (0..5).map(CellValue::Integer).collect()),
        Column::new("c", None, (0..5).map(CellValue::Integer).collect()),
    ])
    .expect("result set should build");
    let _ = run(&other);

    assert_eq!(run(&input).to_json(), first.to_json());
}
