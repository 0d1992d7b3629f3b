use alloc::sync::Arc;
use alloc::vec::Vec;

use evo_meta::{ClassDef, FieldType, Value};

use super::{both_modes, engine, get, instance, round_trip};
use crate::{CodecError, Config, Engine};

fn node() -> Arc<ClassDef> {
    ClassDef::builder("Node")
        .field("label", FieldType::STRING)
        .field("next", FieldType::object("Node"))
        .build()
}

fn items(value: &Value) -> Vec<Value> {
    match value {
        Value::List(items) => items.borrow().clone(),
        other => panic!("expected a list, got {other:?}"),
    }
}

#[test]
fn shared_object_stays_shared() {
    let node = node();
    for config in both_modes() {
        let engine = engine(config, &[(&node, 40)]);
        let shared = instance(&node, &[("label", Value::str("s"))]);
        let back = round_trip(&engine, &Value::list([shared.clone(), shared]));

        let items = items(&back);
        assert!(items[0].ptr_eq(&items[1]));
        assert_eq!(get(&node, &items[0], "label"), Value::str("s"));
    }
}

#[test]
fn cycles_are_preserved() {
    let node = node();
    for config in both_modes() {
        let engine = engine(config, &[(&node, 40)]);
        let a = instance(&node, &[("label", Value::str("a"))]);
        let b = instance(&node, &[("label", Value::str("b")), ("next", a.clone())]);
        node.set(a.as_object().unwrap(), "next", b).unwrap();

        let back = round_trip(&engine, &a);
        let next = get(&node, &back, "next");
        assert_eq!(get(&node, &next, "label"), Value::str("b"));
        assert!(get(&node, &next, "next").ptr_eq(&back));
    }
}

#[test]
fn self_containing_list() {
    let engine = Engine::builder().build().unwrap();
    let list = Value::list([Value::I32(1)]);
    if let Value::List(items) = &list {
        items.borrow_mut().push(list.clone());
    }

    let back = round_trip(&engine, &list);
    let items = items(&back);
    assert_eq!(items[0], Value::I32(1));
    assert!(items[1].ptr_eq(&back));
}

#[test]
fn untracked_references_are_copied() {
    let node = node();
    let config = Config::default().with_ref_tracking(false);
    let engine = engine(config, &[(&node, 40)]);
    let shared = instance(&node, &[("label", Value::str("s"))]);

    let back = round_trip(&engine, &Value::list([shared.clone(), shared]));
    let items = items(&back);
    assert!(!items[0].ptr_eq(&items[1]));
    assert_eq!(get(&node, &items[0], "label"), get(&node, &items[1], "label"));
}

#[test]
fn untracked_cycle_hits_the_depth_limit() {
    let node = node();
    let config = Config::default().with_ref_tracking(false).with_max_depth(32);
    let engine = engine(config, &[(&node, 40)]);
    let a = instance(&node, &[]);
    node.set(a.as_object().unwrap(), "next", a.clone()).unwrap();

    assert!(matches!(engine.serialize(&a), Err(CodecError::DepthExceeded(32))));
}

#[test]
fn deep_nesting_is_bounded() {
    let mut value = Value::I32(0);
    for _ in 0..10 {
        value = Value::list([value]);
    }
    let shallow = Engine::builder()
        .config(Config::default().with_max_depth(4))
        .build()
        .unwrap();
    assert!(matches!(shallow.serialize(&value), Err(CodecError::DepthExceeded(4))));

    let deep = Engine::builder().build().unwrap();
    assert_eq!(round_trip(&deep, &value), value);
}
