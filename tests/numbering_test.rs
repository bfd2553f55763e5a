#![allow(missing_docs)]

use graphcode::graph::{linearize, write_order, Slot};
use graphcode::{
    Arena, Config, Graphcode, GraphObject, GraphReader, Handle, IdPolicy, Result, TypeRegistry,
    Value,
};

#[derive(Debug, Default, GraphObject)]
struct Cell {
    value: i64,
    left: Option<Handle<Cell>>,
    right: Option<Handle<Cell>>,
}

/// A diamond with a back edge: root -> {l, r} -> shared -> root.
fn diamond() -> (Arena, Handle<Cell>) {
    let mut arena = Arena::new();
    let shared = arena.insert(Cell {
        value: 3,
        ..Default::default()
    });
    let l = arena.insert(Cell {
        value: 1,
        left: Some(shared),
        right: None,
    });
    let r = arena.insert(Cell {
        value: 2,
        left: None,
        right: Some(shared),
    });
    let root = arena.insert(Cell {
        value: 0,
        left: Some(l),
        right: Some(r),
    });
    arena.get_mut(shared).expect("shared").left = Some(root);
    (arena, root)
}

fn references(value: &Value) -> Vec<u64> {
    match value {
        Value::Reference(n) => vec![*n],
        Value::Sequence(items) => items.iter().flat_map(references).collect(),
        Value::Mapping(pairs) => pairs
            .iter()
            .flat_map(|(k, v)| references(k).into_iter().chain(references(v)))
            .collect(),
        _ => vec![],
    }
}

#[test]
fn test_children_get_larger_ids_than_parent() -> Result<()> {
    let (arena, root) = diamond();
    let table = Graphcode::index(&arena, &root)?;

    assert_eq!(table.root().map(|id| id.as_u32()), Some(0));
    for (id, slot) in table.slots().iter().enumerate() {
        assert!(!matches!(slot, Slot::Placeholder));
        for child in slot.children() {
            // Only back edges to an already-registered object point upwards.
            if child.as_usize() < id {
                assert!(matches!(table.slots()[child.as_usize()], Slot::Mapping(_)));
            }
        }
    }
    Ok(())
}

#[test]
fn test_reference_equals_position_under_default_policy() -> Result<()> {
    let (arena, root) = diamond();
    let table = Graphcode::index(&arena, &root)?;
    let n = table.len() as u64;

    let order = write_order(&table, IdPolicy::DiscoveryOrder)?;
    for (position, id) in order.iter().enumerate() {
        // reference = tableSize - id - 1
        assert_eq!(position as u64, n - u64::from(id.as_u32()) - 1);
    }

    let slots = linearize(&table, IdPolicy::DiscoveryOrder)?;
    for (position, slot) in slots.iter().enumerate() {
        let id = order[position];
        let expected: Vec<u64> = table
            .get(id)
            .expect("slot")
            .children()
            .map(|child| n - u64::from(child.as_u32()) - 1)
            .collect();
        assert_eq!(references(slot), expected);
    }
    Ok(())
}

#[test]
fn test_root_is_last_slot_in_stream() -> Result<()> {
    let (arena, root) = diamond();
    for policy in [IdPolicy::DiscoveryOrder, IdPolicy::ReferenceCount] {
        let config = Config::default().with_id_policy(policy);
        let bytes = Graphcode::serialize_with_config(&arena, &root, &config)?;
        let reader = GraphReader::from_bytes(&bytes)?;

        let table = Graphcode::index(&arena, &root)?;
        assert_eq!(reader.len(), table.len());

        // The last slot is the root object: a mapping with a `value` of 0.
        let last = reader.slots().last().expect("root slot");
        assert!(matches!(last, Value::Mapping(_)));
        for slot in reader.slots() {
            for target in references(slot) {
                assert!(target < reader.len() as u64, "{policy:?}: dangling {target}");
            }
        }
    }
    Ok(())
}

#[test]
fn test_reference_count_policy_prefers_shared_slots() -> Result<()> {
    let mut arena = Arena::new();
    let hub = arena.insert(Cell {
        value: 99,
        ..Default::default()
    });
    let spokes: Vec<Handle<Cell>> = (0..5)
        .map(|i| {
            arena.insert(Cell {
                value: i,
                left: Some(hub),
                right: None,
            })
        })
        .collect();

    let table = Graphcode::index(&arena, &spokes)?;
    let counts = table.incoming_references();
    let order = write_order(&table, IdPolicy::ReferenceCount)?;

    // The root stays last; everything before it is sorted by fan-in.
    assert_eq!(order.last().map(|id| id.as_u32()), Some(0));
    let fan_in: Vec<usize> = order[..order.len() - 1]
        .iter()
        .map(|id| counts[id.as_usize()])
        .collect();
    assert!(fan_in.windows(2).all(|w| w[0] >= w[1]));
    assert_eq!(fan_in.first().copied(), counts.iter().copied().max());

    // Both policies decode to the same graph.
    for policy in [IdPolicy::DiscoveryOrder, IdPolicy::ReferenceCount] {
        let config = Config::default().with_id_policy(policy);
        let bytes = Graphcode::serialize_with_config(&arena, &spokes, &config)?;
        let decoded = Graphcode::deserialize::<Vec<Handle<Cell>>>(&bytes, &TypeRegistry::new())?;
        assert_eq!(decoded.arena.len(), 6);
        let hubs: Vec<_> = decoded
            .root
            .iter()
            .map(|s| decoded.arena.get(*s).and_then(|c| c.left))
            .collect();
        assert!(hubs.iter().all(|h| h.is_some() && *h == hubs[0]));
    }
    Ok(())
}

#[test]
fn test_identity_map_is_idempotent() -> Result<()> {
    let mut arena = Arena::new();
    let handles: Vec<Handle<Cell>> = (0..4)
        .map(|i| {
            arena.insert(Cell {
                value: i,
                ..Default::default()
            })
        })
        .collect();
    // Each identity appears three times.
    let repeated: Vec<Handle<Cell>> = handles.iter().cycle().take(12).copied().collect();

    let table = Graphcode::index(&arena, &repeated)?;

    // Per object: one mapping plus three key/value pairs of scalar leaves.
    let per_object = 1 + 3 * 2;
    assert_eq!(table.len(), 1 + handles.len() * per_object);
    let mappings = table
        .slots()
        .iter()
        .filter(|s| matches!(s, Slot::Mapping(_)))
        .count();
    assert_eq!(mappings, handles.len());
    Ok(())
}
