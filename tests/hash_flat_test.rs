//! End-to-end tests for hash aggregation

use photonflat::aggregate::{builtin, AggregatorRegistry};
use photonflat::config::EngineConfig;
use photonflat::error::Result;
use photonflat::{row, Column, Field, Fields, HashFlat, Kind, Pool, Schema, Update, Value};
use proptest::prelude::*;

/// key BIGINT, total SUM(BIGINT), n COUNT(BIGINT)
fn sum_count() -> (Schema, Fields) {
    let schema = Schema::new(vec![
        Column::new("key", Kind::BigInt),
        Column::new("total", Kind::BigInt),
        Column::new("n", Kind::BigInt),
    ]);
    let fields = Fields::new(vec![
        Field::plain(Kind::BigInt),
        Field::aggregate(builtin::sum(Kind::BigInt).unwrap()),
        Field::aggregate(builtin::count(Kind::BigInt).unwrap()),
    ]);
    (schema, fields)
}

/// First-seen-ordered reference groups
fn reference(rows: &[(Option<i64>, i64)]) -> Vec<(Option<i64>, i64, i64)> {
    let mut groups: Vec<(Option<i64>, i64, i64)> = Vec::new();
    for &(key, value) in rows {
        match groups.iter_mut().find(|g| g.0 == key) {
            Some(group) => {
                group.1 += value;
                group.2 += 1;
            }
            None => groups.push((key, value, 1)),
        }
    }
    groups
}

fn rows_strategy() -> impl Strategy<Value = Vec<(Option<i64>, i64)>> {
    proptest::collection::vec(
        (proptest::option::of(0i64..6), -1000i64..1000),
        0..60,
    )
}

proptest! {
    #[test]
    fn groups_match_reference(rows in rows_strategy()) {
        let (schema, fields) = sum_count();
        let mut hash = HashFlat::new(&Pool::new(), schema, fields).unwrap();
        for &(key, value) in &rows {
            hash.update(&row![key, value, value]).unwrap();
        }

        let expected = reference(&rows);
        prop_assert_eq!(hash.len(), expected.len());
        for (id, (key, total, n)) in expected.into_iter().enumerate() {
            prop_assert_eq!(hash.crow(id).unwrap(), row![key, total, n]);
        }
    }

    #[test]
    fn mixing_halves_equals_whole(rows in rows_strategy(), split in 0usize..60) {
        let pool = Pool::new();
        let split = split.min(rows.len());
        let (schema, fields) = sum_count();

        let mut whole = HashFlat::new(&pool, schema.clone(), fields.clone()).unwrap();
        let mut left = HashFlat::new(&pool, schema.clone(), fields.clone()).unwrap();
        let mut right = HashFlat::new(&pool, schema, fields).unwrap();
        for (i, &(key, value)) in rows.iter().enumerate() {
            whole.update(&row![key, value, value]).unwrap();
            let half = if i < split { &mut left } else { &mut right };
            half.update(&row![key, value, value]).unwrap();
        }

        left.mix(&right).unwrap();
        prop_assert_eq!(left.len(), whole.len());
        for id in whole.iter() {
            prop_assert_eq!(left.crow(id).unwrap(), whole.crow(id).unwrap());
        }
    }

    #[test]
    fn key_paths_agree(keys in proptest::collection::vec(
        (proptest::option::of(-3i32..3), proptest::option::of(-2i8..2)),
        1..40,
    )) {
        let schema = Schema::new(vec![
            Column::new("a", Kind::Integer),
            Column::new("b", Kind::TinyInt),
            Column::new("n", Kind::Integer),
        ]);
        let fields = Fields::new(vec![
            Field::plain(Kind::Integer),
            Field::plain(Kind::TinyInt),
            Field::aggregate(builtin::count(Kind::Integer).unwrap()),
        ]);
        let mut hash = HashFlat::new(&Pool::new(), schema, fields).unwrap();
        prop_assert!(hash.key_layout().is_contiguous());
        for &(a, b) in &keys {
            hash.update(&row![a, b, 1i32]).unwrap();
        }

        let mut distinct = keys.clone();
        distinct.sort();
        distinct.dedup();
        prop_assert_eq!(hash.len(), distinct.len());

        for id in hash.iter() {
            prop_assert_eq!(hash.hash(id).unwrap(), hash.generic_hash(id).unwrap());
            for other in hash.iter() {
                prop_assert_eq!(hash.equal(id, other).unwrap(), hash.generic_equal(id, other).unwrap());
            }
        }
    }
}

#[test]
fn test_grouping_example() -> Result<()> {
    let schema = Schema::new(vec![
        Column::new("k", Kind::BigInt),
        Column::new("v", Kind::BigInt),
    ]);
    let fields = Fields::new(vec![
        Field::plain(Kind::BigInt),
        Field::aggregate(builtin::sum(Kind::BigInt)?),
    ]);
    let mut hash = HashFlat::new(&Pool::new(), schema, fields)?;

    let updates = [
        hash.update(&row![1i64, 5i64])?,
        hash.update(&row![1i64, 7i64])?,
        hash.update(&row![2i64, 2i64])?,
    ];
    assert_eq!(
        updates,
        [Update::Created(0), Update::Merged(0), Update::Created(1)]
    );
    assert_eq!(hash.crow(0)?, row![1i64, 12i64]);
    assert_eq!(hash.crow(1)?, row![2i64, 2i64]);
    Ok(())
}

#[test]
fn test_registry_aggregates_over_varchar_keys() -> Result<()> {
    let registry = AggregatorRegistry::with_builtins();
    let schema = Schema::new(vec![
        Column::new("region", Kind::Varchar),
        Column::new("lo", Kind::Double),
        Column::new("hi", Kind::Double),
        Column::new("mean", Kind::Double),
    ]);
    let fields = Fields::new(vec![
        Field::plain(Kind::Varchar),
        Field::aggregate(registry.spec("min", Kind::Double)?),
        Field::aggregate(registry.spec("max", Kind::Double)?),
        Field::aggregate(registry.spec("avg", Kind::Double)?),
    ]);
    let mut hash = HashFlat::new(&Pool::new(), schema, fields)?;
    assert!(!hash.key_layout().is_contiguous());

    for (region, x) in [("east", 1.0), ("west", 10.0), ("east", 3.0), ("west", 20.0)] {
        hash.update(&row![region, x, x, x])?;
    }
    hash.update(&row![None::<&str>, 0.5f64, 0.5f64, 0.5f64])?;

    assert_eq!(hash.len(), 3);
    assert_eq!(hash.crow(0)?, row!["east", 1.0f64, 3.0f64, 2.0f64]);
    assert_eq!(hash.crow(1)?, row!["west", 10.0f64, 20.0f64, 15.0f64]);
    assert_eq!(hash.crow(2)?.get(0), Some(&Value::Null));
    Ok(())
}

#[test]
fn test_many_groups_with_small_config() -> Result<()> {
    let config = EngineConfig::from_toml_str(
        r#"
        [slice]
        initial_capacity = 64

        [hash]
        expected_groups = 4
        "#,
    )?;
    let (schema, fields) = sum_count();
    let pool = Pool::new();
    let mut hash = HashFlat::with_config(&pool, schema, fields, &config)?;

    for i in 0..20_000i64 {
        hash.update(&row![i % 2_500, 1i64, 1i64])?;
    }
    assert_eq!(hash.len(), 2_500);
    for id in (0..2_500).step_by(311) {
        assert_eq!(hash.crow(id)?, row![id as i64, 8i64, 8i64]);
    }
    assert!(pool.stats().extended > 0);
    Ok(())
}

#[test]
fn test_sketch_state_moves_between_stores() -> Result<()> {
    let pool = Pool::new();
    let (schema, fields) = sum_count();
    let mut source = HashFlat::new(&pool, schema.clone(), fields.clone())?;
    for value in [3i64, 4, 5] {
        source.update(&row![9i64, value, value])?;
    }
    let state = source.serialize_sketches(0)?;

    let mut target = HashFlat::new(&pool, schema, fields)?;
    target.update(&row![9i64, 0i64, 0i64])?;
    target.load_sketches(0, &state)?;
    target.update(&row![9i64, 10i64, 10i64])?;
    assert_eq!(target.crow(0)?, row![9i64, 22i64, 4i64]);
    Ok(())
}
