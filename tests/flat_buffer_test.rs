//! End-to-end tests for the packed row store

use photonflat::config::SliceConfig;
use photonflat::error::Result;
use photonflat::{row, Column, FlatBuffer, Fields, Kind, OwnedRow, Pool, RowData, Schema, Value};
use proptest::prelude::*;

fn mixed_schema() -> (Schema, Fields) {
    let schema = Schema::new(vec![
        Column::new("id", Kind::BigInt),
        Column::new("flag", Kind::Boolean),
        Column::new("name", Kind::Varchar),
        Column::new("score", Kind::Real),
        Column::array("tags", Kind::Varchar),
        Column::array("counts", Kind::Integer),
    ]);
    let fields = Fields::plain(&schema);
    (schema, fields)
}

type Input = (
    Option<i64>,
    Option<bool>,
    Option<String>,
    Option<f32>,
    Option<Vec<Option<String>>>,
    Option<Vec<Option<i32>>>,
);

fn to_row(input: &Input) -> OwnedRow {
    let (id, flag, name, score, tags, counts) = input.clone();
    row![id, flag, name, score, tags, counts]
}

fn input_strategy() -> impl Strategy<Value = Input> {
    (
        proptest::option::of(any::<i64>()),
        proptest::option::of(any::<bool>()),
        proptest::option::of("[a-z]{0,12}"),
        proptest::option::of(-1.0e6f32..1.0e6),
        proptest::option::of(proptest::collection::vec(
            proptest::option::of("[a-z]{0,6}"),
            0..5,
        )),
        proptest::option::of(proptest::collection::vec(
            proptest::option::of(any::<i32>()),
            0..5,
        )),
    )
}

proptest! {
    #[test]
    fn rows_read_back_as_written(inputs in proptest::collection::vec(input_strategy(), 1..40)) {
        let pool = Pool::new();
        let (schema, fields) = mixed_schema();
        let mut flat = FlatBuffer::new(&pool, schema, fields).unwrap();
        for input in &inputs {
            flat.add(&to_row(input)).unwrap();
        }

        prop_assert_eq!(flat.len(), inputs.len());
        for (id, input) in inputs.iter().enumerate() {
            prop_assert_eq!(flat.crow(id).unwrap(), to_row(input));
        }
    }

    #[test]
    fn image_preserves_rows(inputs in proptest::collection::vec(input_strategy(), 0..20)) {
        let pool = Pool::new();
        let (schema, fields) = mixed_schema();
        let mut flat = FlatBuffer::new(&pool, schema, fields).unwrap();
        for input in &inputs {
            flat.add(&to_row(input)).unwrap();
        }

        let image = flat.serialize().unwrap();
        let (schema, fields) = mixed_schema();
        let restored = FlatBuffer::deserialize(&pool, schema, fields, &image).unwrap();
        prop_assert_eq!(restored.len(), flat.len());
        for id in flat.iter() {
            prop_assert_eq!(restored.crow(id).unwrap(), flat.crow(id).unwrap());
            prop_assert_eq!(
                restored.hash(id, &[0, 1, 2, 3, 4, 5]).unwrap(),
                flat.hash(id, &[0, 1, 2, 3, 4, 5]).unwrap()
            );
        }
    }

    #[test]
    fn equal_rows_hash_equal(a in input_strategy(), b in input_strategy()) {
        let pool = Pool::new();
        let (schema, fields) = mixed_schema();
        let mut flat = FlatBuffer::new(&pool, schema, fields).unwrap();
        flat.add(&to_row(&a)).unwrap();
        flat.add(&to_row(&a)).unwrap();
        flat.add(&to_row(&b)).unwrap();

        let cols = [0, 1, 2, 3, 4, 5];
        prop_assert!(flat.equal(0, 1, &cols).unwrap());
        prop_assert_eq!(flat.hash(0, &cols).unwrap(), flat.hash(1, &cols).unwrap());
        if flat.equal(0, 2, &cols).unwrap() {
            prop_assert_eq!(flat.hash(0, &cols).unwrap(), flat.hash(2, &cols).unwrap());
        }
    }
}

#[test]
fn test_growth_from_tiny_arenas() -> Result<()> {
    let pool = Pool::new();
    let schema = Schema::new(vec![
        Column::new("n", Kind::Int128),
        Column::new("label", Kind::Varchar),
    ]);
    let fields = Fields::plain(&schema);
    let config = SliceConfig {
        initial_capacity: 64,
        ..SliceConfig::default()
    };
    let mut flat = FlatBuffer::with_config(&pool, schema, fields, &config)?;
    let before = flat.memory_usage();

    for i in 0..5_000i128 {
        flat.add(&row![i * 1_000_003, format!("label-{}", i)])?;
    }
    assert!(flat.memory_usage() > before);
    assert!(pool.stats().extended > 0);

    for i in (0..5_000usize).step_by(499) {
        let row = flat.row(i)?;
        assert_eq!(row.read_int128(0), i as i128 * 1_000_003);
        assert_eq!(row.read_string(1), format!("label-{}", i).as_bytes());
    }
    Ok(())
}

#[test]
fn test_nested_begin_is_rejected() -> Result<()> {
    let pool = Pool::new();
    let (schema, fields) = mixed_schema();
    let mut flat = FlatBuffer::new(&pool, schema, fields)?;
    flat.begin_row()?;
    assert!(flat.begin_row().is_err());
    assert!(flat.add(&row![1i64, true, "a", 1.5f32, vec!["x"], vec![1i32]]).is_err());
    flat.abandon_row()?;
    assert!(flat.commit_row().is_err());
    assert!(flat.is_empty());
    Ok(())
}

#[test]
fn test_rollback_restores_previous_state() -> Result<()> {
    let pool = Pool::new();
    let (schema, fields) = mixed_schema();
    let mut flat = FlatBuffer::new(&pool, schema, fields)?;
    flat.add(&row![1i64, true, "keep", 1.0f32, vec!["x"], vec![1i32]])?;
    let image = flat.serialize()?;

    flat.add(&row![2i64, false, "drop", 2.0f32, vec!["y", "z"], vec![2i32, 3]])?;
    assert!(flat.rollback() > 0);
    assert_eq!(flat.rollback(), 0);
    assert_eq!(flat.serialize()?, image);

    let nulls: Vec<Value> = vec![Value::Null; 6];
    flat.add(&OwnedRow::new(nulls))?;
    assert!((0..6).all(|col| flat.row(1).map(|r| r.is_null(col)).unwrap_or(false)));
    Ok(())
}
