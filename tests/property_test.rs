#![allow(missing_docs)]

use bytes::Bytes;
use graphcode::{format, Arena, Config, Float, Graphcode, IdPolicy, TypeRegistry, Value};
use proptest::prelude::*;

fn arb_scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Nil),
        any::<bool>().prop_map(Value::Boolean),
        any::<i64>().prop_map(|n| Value::Integer(i128::from(n))),
        any::<u64>().prop_map(|n| Value::Integer(i128::from(n))),
        (-1.0e9f32..1.0e9f32).prop_map(|f| Value::Float(Float::F32(f))),
        (-1.0e12f64..1.0e12f64).prop_map(|f| Value::Float(Float::F64(f))),
        ".{0,24}".prop_map(Value::String),
        prop::collection::vec(any::<u8>(), 0..32).prop_map(|b| Value::Bytes(Bytes::from(b))),
    ]
}

fn arb_value() -> impl Strategy<Value = Value> {
    arb_scalar().prop_recursive(4, 64, 8, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..8).prop_map(Value::Sequence),
            prop::collection::vec((inner.clone(), inner), 0..6).prop_map(Value::Mapping),
        ]
    })
}

proptest! {
    #[test]
    fn prop_graph_roundtrip(value in arb_value()) {
        let bytes = Graphcode::serialize(&Arena::new(), &value).expect("serialize");
        let decoded = Graphcode::deserialize::<Value>(&bytes, &TypeRegistry::new()).expect("deserialize");
        prop_assert_eq!(decoded.root, value);
    }

    #[test]
    fn prop_policies_agree(value in arb_value()) {
        let config = Config::default().with_id_policy(IdPolicy::ReferenceCount);
        let bytes = Graphcode::serialize_with_config(&Arena::new(), &value, &config).expect("serialize");
        let decoded = Graphcode::deserialize::<Value>(&bytes, &TypeRegistry::new()).expect("deserialize");
        prop_assert_eq!(decoded.root, value);
    }

    #[test]
    fn prop_codec_roundtrip(value in arb_value()) {
        let bytes = format::to_bytes(&value).expect("encode");
        prop_assert_eq!(format::from_bytes(&bytes).expect("decode"), value);
    }

    #[test]
    fn prop_truncation_never_panics(value in arb_value(), cut in 0usize..64) {
        let bytes = Graphcode::serialize(&Arena::new(), &value).expect("serialize");
        let cut = cut.min(bytes.len());
        // Any prefix either decodes or fails cleanly.
        let _ = Graphcode::deserialize::<Value>(&bytes[..bytes.len() - cut], &TypeRegistry::new());
    }
}
