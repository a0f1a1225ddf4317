use cairn_columnar::{Aggregate, Dataset, JoinType, Value, coalesce, col, lit, when};

fn patients() -> Dataset {
    Dataset::from_rows(
        "patient",
        vec!["id", "gender"],
        vec![
            vec![Value::from("p1"), Value::from("female")],
            vec![Value::from("p2"), Value::from("male")],
            vec![Value::from("p3"), Value::Null],
        ],
    )
}

fn names() -> Dataset {
    // One singular name per patient; p3 has none.
    Dataset::from_rows(
        "name",
        vec!["pid", "family"],
        vec![
            vec![Value::from("p1"), Value::from("Abbott")],
            vec![Value::from("p2"), Value::from("Baker")],
        ],
    )
}

#[test]
fn select_and_with_column() {
    let table = patients()
        .with_column("is_female", col("gender").eq(lit("female")))
        .select(&["id", "is_female"])
        .collect()
        .unwrap();
    assert_eq!(table.columns, vec!["id", "is_female"]);
    assert_eq!(
        table.column_values("is_female"),
        vec![&Value::Boolean(true), &Value::Boolean(false), &Value::Null]
    );
}

#[test]
fn left_outer_join_with_singular_right_keeps_row_count() {
    // The composition property: joining a singular-per-subject right side
    // never multiplies rows.
    let joined = patients().join(&names(), col("id"), col("pid"), JoinType::LeftOuter);
    let table = joined.collect().unwrap();
    assert_eq!(table.len(), 3);
    // Unmatched left rows are padded with nulls.
    let family = table.column_values("family");
    assert_eq!(family[2], &Value::Null);
}

#[test]
fn inner_join_drops_unmatched_and_null_keys() {
    let with_null_key = Dataset::from_rows(
        "t",
        vec!["k"],
        vec![vec![Value::from("p1")], vec![Value::Null]],
    );
    let table = with_null_key
        .join(&names(), col("k"), col("pid"), JoinType::Inner)
        .collect()
        .unwrap();
    assert_eq!(table.len(), 1);
}

#[test]
fn join_rejects_duplicate_column_names() {
    let err = patients()
        .join(&patients(), col("id"), col("id"), JoinType::Inner)
        .schema()
        .unwrap_err();
    assert!(err.to_string().contains("duplicate column"));
}

#[test]
fn explode_with_position_is_outer() {
    let dataset = Dataset::from_rows(
        "obs",
        vec!["id", "codes"],
        vec![
            vec![
                Value::from("o1"),
                Value::Array(vec![Value::from("a"), Value::from("b")]),
            ],
            vec![Value::from("o2"), Value::Null],
        ],
    );
    let table = dataset
        .explode_with_position(col("codes"), "code", "pos")
        .collect()
        .unwrap();
    assert_eq!(table.len(), 3);
    assert_eq!(
        table.column_values("pos"),
        vec![&Value::Integer(0), &Value::Integer(1), &Value::Null]
    );
}

#[test]
fn aggregate_max_coalesced_gives_one_row_per_key() {
    let dataset = Dataset::from_rows(
        "matches",
        vec!["id", "hit"],
        vec![
            vec![Value::from("p1"), Value::Boolean(false)],
            vec![Value::from("p1"), Value::Boolean(true)],
            vec![Value::from("p2"), Value::Null],
        ],
    );
    let table = dataset
        .aggregate(
            vec![("id", col("id"))],
            vec![("result", Aggregate::Max(col("hit")))],
        )
        .with_column("result", coalesce(vec![col("result"), lit(false)]))
        .collect()
        .unwrap();
    assert_eq!(table.len(), 2);
    assert_eq!(
        table.column_values("result"),
        vec![&Value::Boolean(true), &Value::Boolean(false)]
    );
}

#[test]
fn row_index_ranks_within_partition_nulls_last() {
    let dataset = Dataset::from_rows(
        "t",
        vec!["id", "eid"],
        vec![
            vec![Value::from("p1"), Value::Array(vec![Value::Integer(1)])],
            vec![Value::from("p1"), Value::Array(vec![Value::Integer(0)])],
            vec![Value::from("p1"), Value::Null],
            vec![Value::from("p2"), Value::Array(vec![Value::Integer(0)])],
        ],
    );
    let table = dataset
        .with_row_index(col("id"), col("eid"), "rank")
        .collect()
        .unwrap();
    assert_eq!(
        table.column_values("rank"),
        vec![
            &Value::Integer(1),
            &Value::Integer(0),
            &Value::Integer(2),
            &Value::Integer(0)
        ]
    );
}

#[test]
fn order_by_element_identity_is_lexicographic() {
    let dataset = Dataset::from_rows(
        "t",
        vec!["eid", "v"],
        vec![
            vec![
                Value::Array(vec![Value::Integer(1), Value::Integer(0)]),
                Value::from("third"),
            ],
            vec![Value::Array(vec![Value::Integer(0)]), Value::from("first")],
            vec![
                Value::Array(vec![Value::Integer(0), Value::Integer(1)]),
                Value::from("second"),
            ],
        ],
    );
    let table = dataset.order_by(vec![col("eid")]).collect().unwrap();
    assert_eq!(
        table.column_values("v"),
        vec![
            &Value::String("first".to_string()),
            &Value::String("second".to_string()),
            &Value::String("third".to_string())
        ]
    );
}

#[test]
fn when_otherwise_and_filter() {
    let table = patients()
        .with_column(
            "label",
            when(col("gender").eq(lit("female")), lit("F")).otherwise(lit("other")),
        )
        .filter(col("label").eq(lit("F")))
        .collect()
        .unwrap();
    assert_eq!(table.len(), 1);
    assert_eq!(table.column_values("id"), vec![&Value::String("p1".to_string())]);
}

#[test]
fn union_requires_identical_schemas() {
    let err = patients().union_all(&names()).schema().unwrap_err();
    assert!(err.to_string().contains("schema mismatch"));
}

#[test]
fn map_value_runs_at_collect_time() {
    use std::sync::Arc;
    let dataset = patients().with_column(
        "upper",
        col("gender").map_value(
            "uppercase",
            Arc::new(|v| match v.as_str() {
                Some(s) => Ok(Value::from(s.to_uppercase())),
                None => Ok(Value::Null),
            }),
        ),
    );
    let table = dataset.collect().unwrap();
    assert_eq!(
        table.column_values("upper")[0],
        &Value::String("FEMALE".to_string())
    );
}
