#![allow(missing_docs)]

use graphcode::{
    Arena, Graphcode, GraphObject, GraphRecord, GraphcodeError, Handle, ObjectRef, Polymorphic,
    Result, TypeRegistry,
};

#[derive(Debug, Default, PartialEq, GraphObject)]
#[graphcode(type_id = "test.Circle")]
struct Circle {
    radius: f64,
}

#[derive(Debug, Default, PartialEq, GraphObject)]
#[graphcode(type_id = "test.Label")]
struct Label {
    text: String,
}

#[derive(Debug, Default, GraphObject)]
#[graphcode(type_id = "test.Group")]
struct Group {
    members: Vec<ObjectRef>,
    owner: Option<Handle<Group>>,
}

#[derive(Debug, Default, GraphObject)]
struct Anonymous {
    value: u8,
}

fn shapes() -> (Arena, Vec<ObjectRef>) {
    let mut arena = Arena::new();
    let circle = arena.insert(Circle { radius: 2.5 }).erase();
    let label = arena.insert(Label {
        text: "hello".into(),
    });
    let group = arena.insert(Group::default());
    if let Some(g) = arena.get_mut(group) {
        g.owner = Some(group);
        g.members = vec![circle, label.erase()];
    }
    (arena, vec![circle, label.erase(), group.erase()])
}

fn full_registry() -> Result<TypeRegistry> {
    TypeRegistry::new()
        .with::<Circle>()?
        .with::<Label>()?
        .with::<Group>()
}

#[test]
fn test_heterogeneous_sequence_keeps_concrete_types() -> Result<()> {
    let (arena, items) = shapes();
    let bytes = Graphcode::serialize(&arena, &items)?;
    let decoded = Graphcode::deserialize::<Vec<ObjectRef>>(&bytes, &full_registry()?)?;
    let out = &decoded.arena;

    assert_eq!(decoded.root.len(), 3);
    assert_eq!(out.get_as::<Circle>(decoded.root[0]), Some(&Circle { radius: 2.5 }));
    assert_eq!(out.get_as::<Label>(decoded.root[1]).map(|l| l.text.as_str()), Some("hello"));

    let group = decoded.root[2].downcast::<Group>().expect("group");
    let g = out.get(group).expect("group object");
    assert_eq!(g.owner, Some(group));
    // The group's members are the same objects as the sequence's elements.
    assert_eq!(g.members, vec![decoded.root[0], decoded.root[1]]);
    assert_eq!(out.len(), 3);
    Ok(())
}

#[test]
fn test_missing_candidate_fails_when_encountered() -> Result<()> {
    let (arena, items) = shapes();
    let bytes = Graphcode::serialize(&arena, &items)?;

    let partial = TypeRegistry::new().with::<Circle>()?.with::<Group>()?;
    match Graphcode::deserialize::<Vec<ObjectRef>>(&bytes, &partial) {
        Err(GraphcodeError::UnknownTypeIdentifier(id)) => assert_eq!(id, "test.Label"),
        other => panic!("expected UnknownTypeIdentifier, got {other:?}"),
    }

    // A stream that never reaches a Label decodes fine without it.
    let circles_only = vec![items[0]];
    let bytes = Graphcode::serialize(&arena, &circles_only)?;
    let decoded = Graphcode::deserialize::<Vec<ObjectRef>>(&bytes, &partial)?;
    assert!(decoded.root[0].is::<Circle>());
    Ok(())
}

#[test]
fn test_typed_handle_checks_descriptor() -> Result<()> {
    let mut arena = Arena::new();
    let circle = arena.insert(Circle { radius: 1.0 });
    let bytes = Graphcode::serialize(&arena, &circle.erase())?;

    // Statically typed slots need no registry.
    let decoded = Graphcode::deserialize::<Handle<Circle>>(&bytes, &TypeRegistry::new())?;
    assert_eq!(decoded.arena.get(decoded.root).map(|c| c.radius), Some(1.0));

    let err = Graphcode::deserialize::<Handle<Label>>(&bytes, &TypeRegistry::new())
        .expect_err("descriptor mismatch");
    match err {
        GraphcodeError::IdentifiableTypeMismatch { identifier, expected } => {
            assert_eq!(identifier, "test.Circle");
            assert!(expected.contains("test.Label"), "{expected}");
        }
        other => panic!("expected IdentifiableTypeMismatch, got {other:?}"),
    }
    Ok(())
}

#[test]
fn test_unidentifiable_type_in_polymorphic_slot() {
    let mut arena = Arena::new();
    let anon = arena.insert(Anonymous { value: 1 });

    // Fine behind a typed handle.
    assert!(Graphcode::serialize(&arena, &anon).is_ok());

    match Graphcode::serialize(&arena, &vec![anon.erase()]) {
        Err(GraphcodeError::UnidentifiableType(name)) => assert!(name.contains("Anonymous")),
        other => panic!("expected UnidentifiableType, got {other:?}"),
    }
    assert!(matches!(
        TypeRegistry::new().register::<Anonymous>(),
        Err(GraphcodeError::UnidentifiableType(_))
    ));
}

#[derive(Debug, Default, GraphObject)]
#[graphcode(type_id = "test.Circle")]
struct Impostor {
    radius: f64,
}

#[test]
fn test_duplicate_identifier_is_rejected() -> Result<()> {
    let mut registry = TypeRegistry::new();
    registry.register::<Circle>()?;
    // Registering the same type again is harmless.
    registry.register::<Circle>()?;
    assert_eq!(registry.len(), 1);

    match registry.register::<Impostor>() {
        Err(GraphcodeError::DuplicateTypeIdentifier { identifier, existing }) => {
            assert_eq!(identifier, "test.Circle");
            assert!(existing.contains("Circle"));
        }
        other => panic!("expected DuplicateTypeIdentifier, got {other:?}"),
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, GraphRecord)]
#[graphcode(type_id = "test.Point")]
struct Point {
    x: i32,
    y: i32,
}

#[derive(Debug, Clone, PartialEq, GraphRecord)]
#[graphcode(type_id = "test.Tag")]
struct Tag {
    name: String,
    weight: Option<u8>,
}

#[derive(Debug, PartialEq, GraphRecord)]
struct Untagged {
    name: String,
}

fn mixed_registry() -> Result<TypeRegistry> {
    full_registry()?.with_record::<Point>()?.with_record::<Tag>()
}

#[test]
fn test_records_and_objects_share_a_polymorphic_sequence() -> Result<()> {
    let mut arena = Arena::new();
    let circle = arena.insert(Circle { radius: 3.0 });
    let items = vec![
        Polymorphic::record(Point { x: 1, y: -2 }),
        Polymorphic::from(circle),
        Polymorphic::record(Tag {
            name: "red".into(),
            weight: Some(3),
        }),
        // The same object a second time is still a single object.
        Polymorphic::from(circle),
    ];

    let bytes = Graphcode::serialize(&arena, &items)?;
    let decoded = Graphcode::deserialize::<Vec<Polymorphic>>(&bytes, &mixed_registry()?)?;
    let root = &decoded.root;

    assert_eq!(root.len(), 4);
    assert_eq!(root[0].record_ref::<Point>(), Some(&Point { x: 1, y: -2 }));
    assert_eq!(
        root[2].record_ref::<Tag>(),
        Some(&Tag {
            name: "red".into(),
            weight: Some(3)
        })
    );
    assert!(root[0].record_ref::<Tag>().is_none());

    let first = root[1].as_object().expect("object");
    assert_eq!(root[3].as_object(), Some(first));
    assert_eq!(decoded.arena.get_as::<Circle>(first), Some(&Circle { radius: 3.0 }));
    assert_eq!(decoded.arena.len(), 1);
    Ok(())
}

#[test]
fn test_boxed_record_downcasts() -> Result<()> {
    let bytes = Graphcode::serialize(&Arena::new(), &Polymorphic::record(Point { x: 4, y: 5 }))?;
    let decoded = Graphcode::deserialize::<Polymorphic>(&bytes, &mixed_registry()?)?;

    let Polymorphic::Record(record) = decoded.root else {
        panic!("expected a record");
    };
    assert!(record.is::<Point>());
    assert_eq!(record.type_identifier().as_deref(), Some("test.Point"));
    assert!(record.type_name().contains("Point"));
    assert_eq!(record.downcast::<Point>(), Some(Point { x: 4, y: 5 }));
    Ok(())
}

#[test]
fn test_record_descriptors_are_checked() -> Result<()> {
    let bytes = Graphcode::serialize(&Arena::new(), &Point { x: 0, y: 0 })?;

    // A typed record slot reads its own descriptor.
    let decoded = Graphcode::deserialize::<Point>(&bytes, &TypeRegistry::new())?;
    assert_eq!(decoded.root, Point { x: 0, y: 0 });

    // A different record type refuses it.
    match Graphcode::deserialize::<Tag>(&bytes, &TypeRegistry::new()) {
        Err(GraphcodeError::IdentifiableTypeMismatch { identifier, .. }) => {
            assert_eq!(identifier, "test.Point")
        }
        other => panic!("expected IdentifiableTypeMismatch, got {other:?}"),
    }

    // An object-only slot refuses an identifier registered as a record.
    match Graphcode::deserialize::<ObjectRef>(&bytes, &mixed_registry()?) {
        Err(GraphcodeError::IdentifiableTypeMismatch { identifier, .. }) => {
            assert_eq!(identifier, "test.Point")
        }
        other => panic!("expected IdentifiableTypeMismatch, got {other:?}"),
    }
    Ok(())
}

#[test]
fn test_untagged_record_cannot_be_polymorphic() {
    match Graphcode::serialize(&Arena::new(), &Polymorphic::record(Untagged { name: "x".into() }))
    {
        Err(GraphcodeError::UnidentifiableType(name)) => assert!(name.contains("Untagged")),
        other => panic!("expected UnidentifiableType, got {other:?}"),
    }
    assert!(matches!(
        TypeRegistry::new().register_record::<Untagged>(),
        Err(GraphcodeError::UnidentifiableType(_))
    ));
}

#[derive(Debug, Default, GraphObject)]
#[graphcode(type_id = "test.Point")]
struct PointObject {
    x: i32,
}

#[test]
fn test_records_and_objects_share_identifiers() -> Result<()> {
    let mut registry = TypeRegistry::new();
    registry.register_record::<Point>()?;
    registry.register_record::<Point>()?;
    assert_eq!(registry.len(), 1);

    assert!(matches!(
        registry.register::<PointObject>(),
        Err(GraphcodeError::DuplicateTypeIdentifier { .. })
    ));
    Ok(())
}

// --- Generic identifiers ---

trait Named {
    const NAME: &'static str;
}

impl Named for i64 {
    const NAME: &'static str = "i64";
}

impl Named for f32 {
    const NAME: &'static str = "f32";
}

fn box_identifier<T: Named>() -> String {
    format!("test.Box<{}>", T::NAME)
}

#[derive(Debug, Default, PartialEq, GraphObject)]
#[graphcode(type_id_fn = "box_identifier::<T>")]
struct Crate<T: Named> {
    contents: Vec<T>,
}

#[derive(Debug, PartialEq, GraphRecord)]
#[graphcode(type_id_fn = "box_identifier::<T>")]
struct Pair<T: Named> {
    left: T,
    right: T,
}

#[test]
fn test_generic_types_register_per_instantiation() -> Result<()> {
    let registry = TypeRegistry::new()
        .with::<Crate<i64>>()?
        .with::<Crate<f32>>()?;
    assert_eq!(registry.len(), 2);
    assert!(registry.contains("test.Box<i64>"));
    assert!(registry.contains("test.Box<f32>"));

    let mut arena = Arena::new();
    let ints = arena.insert(Crate {
        contents: vec![1i64, 2, 3],
    });
    let floats = arena.insert(Crate {
        contents: vec![0.5f32],
    });
    let items = vec![floats.erase(), ints.erase()];

    let bytes = Graphcode::serialize(&arena, &items)?;
    let decoded = Graphcode::deserialize::<Vec<ObjectRef>>(&bytes, &registry)?;
    let out = &decoded.arena;
    assert_eq!(
        out.get_as::<Crate<f32>>(decoded.root[0]).map(|c| c.contents.clone()),
        Some(vec![0.5])
    );
    assert_eq!(
        out.get_as::<Crate<i64>>(decoded.root[1]).map(|c| c.contents.clone()),
        Some(vec![1, 2, 3])
    );
    Ok(())
}

#[test]
fn test_generic_record_descriptor_names_its_parameter() -> Result<()> {
    let bytes = Graphcode::serialize(&Arena::new(), &Pair { left: 1i64, right: 2 })?;
    assert_eq!(
        Graphcode::deserialize::<Pair<i64>>(&bytes, &TypeRegistry::new())?.root,
        Pair { left: 1, right: 2 }
    );
    match Graphcode::deserialize::<Pair<f32>>(&bytes, &TypeRegistry::new()) {
        Err(GraphcodeError::IdentifiableTypeMismatch { identifier, .. }) => {
            assert_eq!(identifier, "test.Box<i64>")
        }
        other => panic!("expected IdentifiableTypeMismatch, got {other:?}"),
    }
    Ok(())
}
