#![allow(missing_docs)]

use graphcode::{Arena, Graphcode, GraphObject, Handle, Result, TypeRegistry};

#[derive(Debug, Default, GraphObject)]
struct Node {
    label: String,
    next: Option<Handle<Node>>,
}

#[derive(Debug, Default, GraphObject)]
struct Folder {
    name: String,
    /// Non-owning back-reference to the containing folder.
    parent: Option<Handle<Folder>>,
    children: Vec<Handle<Folder>>,
}

fn node(label: &str) -> Node {
    Node {
        label: label.into(),
        next: None,
    }
}

#[test]
fn test_self_reference_keeps_identity() -> Result<()> {
    let mut arena = Arena::new();
    let me = arena.insert(node("me"));
    if let Some(n) = arena.get_mut(me) {
        n.next = Some(me);
    }

    let bytes = Graphcode::serialize(&arena, &me)?;
    let decoded = Graphcode::deserialize::<Handle<Node>>(&bytes, &TypeRegistry::new())?;

    let root = decoded.root;
    let loaded = decoded.arena.get(root).expect("root object");
    assert_eq!(loaded.label, "me");
    assert_eq!(loaded.next, Some(root));
    assert_eq!(decoded.arena.len(), 1);
    Ok(())
}

#[test]
fn test_mutual_cycle() -> Result<()> {
    let mut arena = Arena::new();
    let a = arena.insert(node("a"));
    let b = arena.insert(node("b"));
    arena.get_mut(a).expect("a").next = Some(b);
    arena.get_mut(b).expect("b").next = Some(a);

    let bytes = Graphcode::serialize(&arena, &a)?;
    let decoded = Graphcode::deserialize::<Handle<Node>>(&bytes, &TypeRegistry::new())?;

    let a2 = decoded.root;
    let b2 = decoded.arena.get(a2).and_then(|n| n.next).expect("a.next");
    assert_ne!(a2, b2);
    assert_eq!(decoded.arena.get(b2).expect("b").label, "b");
    assert_eq!(decoded.arena.get(b2).and_then(|n| n.next), Some(a2));
    assert_eq!(decoded.arena.len(), 2);
    Ok(())
}

#[test]
fn test_shared_object_is_written_once() -> Result<()> {
    let mut arena = Arena::new();
    let shared = arena.insert(node("shared"));
    let roots = vec![shared, shared, shared];

    let table = Graphcode::index(&arena, &roots)?;
    // Sequence + one object (mapping, two keys, label value, nil next).
    assert_eq!(table.len(), 1 + 5);

    let bytes = Graphcode::serialize(&arena, &roots)?;
    let decoded = Graphcode::deserialize::<Vec<Handle<Node>>>(&bytes, &TypeRegistry::new())?;
    assert_eq!(decoded.arena.len(), 1);
    assert!(decoded.root.iter().all(|h| *h == decoded.root[0]));
    Ok(())
}

#[test]
fn test_tree_with_back_references() -> Result<()> {
    let mut arena = Arena::new();
    let root = arena.insert(Folder {
        name: "/".into(),
        ..Default::default()
    });
    let mut expected = Vec::new();
    for i in 0..4 {
        let child = arena.insert(Folder {
            name: format!("dir{i}"),
            parent: Some(root),
            children: vec![],
        });
        arena.get_mut(root).expect("root").children.push(child);
        expected.push(format!("dir{i}"));
    }

    let bytes = Graphcode::serialize(&arena, &root)?;
    let decoded = Graphcode::deserialize::<Handle<Folder>>(&bytes, &TypeRegistry::new())?;
    let out = &decoded.arena;

    let root2 = out.get(decoded.root).expect("root");
    assert_eq!(root2.parent, None);
    let names: Vec<_> = root2
        .children
        .iter()
        .map(|c| out.get(*c).expect("child").name.clone())
        .collect();
    assert_eq!(names, expected);
    for child in &root2.children {
        assert_eq!(out.get(*child).expect("child").parent, Some(decoded.root));
    }
    Ok(())
}

#[test]
fn test_long_chain_at_default_config() -> Result<()> {
    const NODES: usize = 1000;

    let mut arena = Arena::new();
    let mut head = arena.insert(node("0"));
    for i in 1..NODES {
        head = arena.insert(Node {
            label: i.to_string(),
            next: Some(head),
        });
    }

    // Runs on the default test thread: chains of objects must not grow the call stack.
    let bytes = Graphcode::serialize(&arena, &head)?;
    let decoded = Graphcode::deserialize::<Handle<Node>>(&bytes, &TypeRegistry::new())?;
    assert_eq!(decoded.arena.len(), NODES);

    let mut cursor = Some(decoded.root);
    let mut labels = Vec::new();
    while let Some(h) = cursor {
        let n = decoded.arena.get(h).expect("node");
        labels.push(n.label.clone());
        cursor = n.next;
    }
    assert_eq!(labels.len(), NODES);
    assert_eq!(labels.first().map(String::as_str), Some("999"));
    assert_eq!(labels.last().map(String::as_str), Some("0"));
    Ok(())
}

#[test]
fn test_long_cycle_at_default_config() -> Result<()> {
    let mut arena = Arena::new();
    let first = arena.insert(node("0"));
    let mut head = first;
    for i in 1..1000 {
        head = arena.insert(Node {
            label: i.to_string(),
            next: Some(head),
        });
    }
    arena.get_mut(first).expect("first").next = Some(head);

    let bytes = Graphcode::serialize(&arena, &head)?;
    let decoded = Graphcode::deserialize::<Handle<Node>>(&bytes, &TypeRegistry::new())?;
    assert_eq!(decoded.arena.len(), 1000);

    let mut cursor = decoded.root;
    for _ in 0..1000 {
        cursor = decoded.arena.get(cursor).and_then(|n| n.next).expect("next");
    }
    assert_eq!(cursor, decoded.root);
    Ok(())
}

#[test]
fn test_handles_are_arena_positions() {
    let mut arena = Arena::new();
    let handles: Vec<_> = (0..1000).map(|i| arena.insert(node(&i.to_string()))).collect();
    for (i, h) in handles.iter().enumerate() {
        assert_eq!(h.index(), i);
        assert_eq!(arena.object_ref(i), Some(h.erase()));
    }
    assert_eq!(arena.len(), 1000);
}
