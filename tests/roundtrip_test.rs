#![allow(missing_docs)]

use std::collections::{BTreeMap, HashMap, VecDeque};

use bytes::Bytes;
use graphcode::{
    format, Arena, Float, Graphcode, GraphRecord, Kind, Result, TypeRegistry, Value,
};

#[derive(Debug, Clone, PartialEq, GraphRecord)]
struct Point {
    x: i32,
    y: i32,
}

#[derive(Debug, Clone, PartialEq, GraphRecord)]
struct Level {
    id: u32,
    name: String,
    ratio: f64,
    spawn: Point,
    waypoints: Vec<Point>,
    tags: BTreeMap<String, u16>,
    blob: Bytes,
    parent: Option<u64>,
}

fn sample_level() -> Level {
    Level {
        id: 42,
        name: "Dungeon_01".into(),
        ratio: 0.75,
        spawn: Point { x: -3, y: 9 },
        waypoints: (0..16).map(|i| Point { x: i, y: i * i }).collect(),
        tags: [("boss".to_string(), 1), ("loot".to_string(), 12)]
            .into_iter()
            .collect(),
        blob: Bytes::from_static(&[0xAA, 0x00, 0xFF]),
        parent: None,
    }
}

fn roundtrip<T>(value: &T) -> Result<T>
where
    T: graphcode::Encode + graphcode::Decode,
{
    let bytes = Graphcode::serialize(&Arena::new(), value)?;
    Ok(Graphcode::deserialize::<T>(&bytes, &TypeRegistry::new())?.root)
}

#[test]
fn test_record_roundtrip() -> Result<()> {
    let level = sample_level();
    assert_eq!(roundtrip(&level)?, level);
    Ok(())
}

#[test]
fn test_primitive_roots() -> Result<()> {
    assert_eq!(roundtrip(&0u8)?, 0u8);
    assert_eq!(roundtrip(&i64::MIN)?, i64::MIN);
    assert_eq!(roundtrip(&u64::MAX)?, u64::MAX);
    assert_eq!(roundtrip(&-1i128)?, -1i128);
    assert!(roundtrip(&true)?);
    assert_eq!(roundtrip(&1.5f32)?, 1.5f32);
    assert_eq!(roundtrip(&"aoeu".to_string())?, "aoeu");
    roundtrip(&())?;
    Ok(())
}

#[test]
fn test_collections_roundtrip() -> Result<()> {
    let nested: Vec<Vec<String>> = vec![vec![], vec!["a".into()], vec!["b".into(), "c".into()]];
    assert_eq!(roundtrip(&nested)?, nested);

    let deque: VecDeque<i16> = (-5..5).collect();
    assert_eq!(roundtrip(&deque)?, deque);

    let map: HashMap<u32, Option<String>> =
        [(1, Some("one".to_string())), (2, None)].into_iter().collect();
    assert_eq!(roundtrip(&map)?, map);

    // Non-string keys are plain values too.
    let by_point: BTreeMap<i64, Vec<f64>> =
        [(-1, vec![0.5]), (7, vec![])].into_iter().collect();
    assert_eq!(roundtrip(&by_point)?, by_point);
    Ok(())
}

#[test]
fn test_boxed_and_optional_records() -> Result<()> {
    let boxed = Box::new(Point { x: 1, y: 2 });
    assert_eq!(roundtrip(&boxed)?, boxed);

    let maybe: Vec<Option<Point>> = vec![None, Some(Point { x: 0, y: 0 }), None];
    assert_eq!(roundtrip(&maybe)?, maybe);
    Ok(())
}

fn scenario() -> Vec<Value> {
    vec![
        Value::Integer(152_352_050_802),
        Value::String("aoeu".into()),
        Value::Bytes(Bytes::new()),
        Value::Float(Float::F64(std::f64::consts::PI)),
        Value::Bytes(Bytes::from_static(&[4, 255])),
        Value::Mapping(vec![]),
        Value::Integer(-1),
        Value::Sequence(vec![]),
        Value::Nil,
        Value::Boolean(true),
    ]
}

#[test]
fn test_scenario_through_scalar_codec() -> Result<()> {
    let original = Value::Sequence(scenario());
    let decoded = format::from_bytes(&format::to_bytes(&original)?)?;
    assert_eq!(decoded, original);
    Ok(())
}

#[test]
fn test_scenario_through_graph() -> Result<()> {
    let original = scenario();
    let decoded: Vec<Value> = roundtrip(&original)?;

    assert_eq!(decoded.len(), original.len());
    for (got, want) in decoded.iter().zip(&original) {
        assert_eq!(got.kind(), want.kind());
        assert_eq!(got, want);
    }
    // Present-but-empty containers stay present.
    assert_eq!(decoded[2].kind(), Kind::Bytes);
    assert_eq!(decoded[5], Value::Mapping(vec![]));
    assert_eq!(decoded[7], Value::Sequence(vec![]));
    Ok(())
}

#[test]
fn test_float_precision_is_preserved() -> Result<()> {
    let values = vec![
        Value::Float(Float::F32(0.1)),
        Value::Float(Float::F64(0.1)),
    ];
    let decoded: Vec<Value> = roundtrip(&values)?;
    assert_eq!(decoded, values);

    // A double can still be requested from a single-precision slot.
    let bytes = Graphcode::serialize(&Arena::new(), &0.25f32)?;
    let widened = Graphcode::deserialize::<f64>(&bytes, &TypeRegistry::new())?.root;
    assert_eq!(widened, 0.25);
    Ok(())
}

#[test]
fn test_records_are_not_shared() -> Result<()> {
    // Value-typed records have no identity: the same value written twice
    // is indexed twice.
    let p = Point { x: 5, y: 6 };
    let pair = vec![p.clone(), p];
    let once = Graphcode::index(&Arena::new(), &vec![Point { x: 5, y: 6 }])?;
    let twice = Graphcode::index(&Arena::new(), &pair)?;
    assert_eq!(twice.len() - 1, 2 * (once.len() - 1));
    Ok(())
}

#[test]
fn test_hash_map_bytes_do_not_depend_on_insertion_order() -> Result<()> {
    let keys: Vec<u32> = (0..64).collect();
    let forward: HashMap<u32, String> = keys.iter().map(|k| (*k, k.to_string())).collect();
    let mut backward = HashMap::new();
    for k in keys.iter().rev() {
        backward.insert(*k, k.to_string());
    }

    let arena = Arena::new();
    assert_eq!(
        Graphcode::serialize(&arena, &forward)?,
        Graphcode::serialize(&arena, &backward)?
    );
    Ok(())
}
