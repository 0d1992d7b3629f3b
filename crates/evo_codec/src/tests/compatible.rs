use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;

use evo_meta::{ClassDef, DynamicObject, EnumDef, FieldType, Value, new_object};

use super::{engine, get, instance, round_trip};
use crate::tags::END_TAG;
use crate::{Config, Engine};

fn point() -> Arc<ClassDef> {
    ClassDef::builder("Point")
        .field("x", FieldType::I32)
        .field("y", FieldType::I32)
        .build()
}

#[test]
fn every_field_kind_round_trips() {
    let point = point();
    let color = EnumDef::new("Color", &["Red", "Green", "Blue"]);
    let sample = ClassDef::builder("Sample")
        .field("id", FieldType::I32)
        .field("ok", FieldType::BOOL)
        .field("name", FieldType::STRING)
        .field("count", FieldType::I64)
        .field("ratio", FieldType::F64)
        .field("maybe", FieldType::boxed(evo_meta::PrimitiveKind::I32))
        .field("color", FieldType::enumeration("Color"))
        .field("origin", FieldType::object("Point"))
        .field("description_text", FieldType::STRING)
        .field("tags", FieldType::list(FieldType::STRING))
        .field("ids", FieldType::set(FieldType::I64))
        .field("scores", FieldType::map(FieldType::STRING, FieldType::I32))
        .field("extra", FieldType::Any)
        .build();
    let engine = Engine::builder()
        .register_class(sample.clone(), 40)
        .register_class(point.clone(), 41)
        .register_enum(color.clone(), 42)
        .build()
        .unwrap();

    let origin = instance(&point, &[("x", Value::I32(-3)), ("y", Value::I32(9))]);
    let value = instance(
        &sample,
        &[
            ("id", Value::I32(7)),
            ("ok", Value::Bool(true)),
            ("name", Value::str("sample")),
            ("count", Value::I64(i64::MIN)),
            ("ratio", Value::F64(0.25)),
            ("color", Value::Enum(color.value("Blue").unwrap())),
            ("origin", origin),
            ("description_text", Value::str("a longer name")),
            ("tags", Value::list([Value::str("a"), Value::Null, Value::str("c")])),
            ("ids", Value::set([Value::I64(1), Value::I64(1 << 40)])),
            ("scores", Value::map([(Value::str("math"), Value::I32(90))])),
            ("extra", Value::F32(1.5)),
        ],
    );

    let back = round_trip(&engine, &value);
    for name in [
        "id", "ok", "name", "count", "ratio", "maybe", "color", "description_text", "tags", "ids",
        "scores", "extra",
    ] {
        assert_eq!(get(&sample, &back, name), get(&sample, &value, name), "field `{name}`");
    }
    let origin = get(&sample, &back, "origin");
    assert_eq!(get(&point, &origin, "x"), Value::I32(-3));
    assert_eq!(get(&point, &origin, "y"), Value::I32(9));
}

fn user_v1() -> Arc<ClassDef> {
    ClassDef::builder("User")
        .field("id", FieldType::I64)
        .field("name", FieldType::STRING)
        .build()
}

fn user_v2() -> Arc<ClassDef> {
    ClassDef::builder("User")
        .field("id", FieldType::I64)
        .field("name", FieldType::STRING)
        .field("email", FieldType::STRING)
        .field("age", FieldType::I32)
        .field("home", FieldType::object("Point"))
        .field("history", FieldType::list(FieldType::I64))
        .field("labels", FieldType::map(FieldType::STRING, FieldType::Any))
        .field("attachment", FieldType::Any)
        .build()
}

#[test]
fn newer_writer_older_reader() {
    let (v1, v2, point) = (user_v1(), user_v2(), point());
    let writer = engine(Config::default(), &[(&v2, 40), (&point, 41)]);
    let reader = engine(Config::default(), &[(&v1, 40), (&point, 41)]);

    let value = instance(
        &v2,
        &[
            ("id", Value::I64(12)),
            ("name", Value::str("ada")),
            ("email", Value::str("ada@example.com")),
            ("age", Value::I32(36)),
            ("home", instance(&point, &[("x", Value::I32(1))])),
            ("history", Value::list([Value::I64(3), Value::I64(4)])),
            ("labels", Value::map([(Value::str("k"), Value::list([Value::I8(1)]))])),
            ("attachment", instance(&point, &[("y", Value::I32(2))])),
        ],
    );
    let bytes = writer.serialize(&value).unwrap();
    let back = reader.deserialize(&bytes).unwrap();

    assert_eq!(get(&v1, &back, "id"), Value::I64(12));
    assert_eq!(get(&v1, &back, "name"), Value::str("ada"));
}

#[test]
fn older_writer_newer_reader() {
    let (v1, v2, point) = (user_v1(), user_v2(), point());
    let writer = engine(Config::default(), &[(&v1, 40)]);
    let reader = engine(Config::default(), &[(&v2, 40), (&point, 41)]);

    let value = instance(&v1, &[("id", Value::I64(5)), ("name", Value::str("bob"))]);
    let back = reader.deserialize(&writer.serialize(&value).unwrap()).unwrap();

    assert_eq!(get(&v2, &back, "id"), Value::I64(5));
    assert_eq!(get(&v2, &back, "name"), Value::str("bob"));
    assert_eq!(get(&v2, &back, "email"), Value::Null);
    assert_eq!(get(&v2, &back, "age"), Value::I32(0));
    assert_eq!(get(&v2, &back, "home"), Value::Null);
    assert_eq!(get(&v2, &back, "history"), Value::Null);
}

#[test]
fn nested_class_evolves_independently() {
    let outer = ClassDef::builder("Outer")
        .field("p", FieldType::object("Point"))
        .field("tail", FieldType::STRING)
        .build();
    let point_v2 = ClassDef::builder("Point")
        .field("x", FieldType::I32)
        .field("y", FieldType::I32)
        .field("z", FieldType::F64)
        .build();
    let point_v1 = point();
    let writer = engine(Config::default(), &[(&outer, 40), (&point_v2, 41)]);
    let reader = engine(Config::default(), &[(&outer, 40), (&point_v1, 41)]);

    let p = instance(&point_v2, &[("x", Value::I32(1)), ("y", Value::I32(2)), ("z", Value::F64(3.0))]);
    let value = instance(&outer, &[("p", p), ("tail", Value::str("end"))]);
    let back = reader.deserialize(&writer.serialize(&value).unwrap()).unwrap();

    let p = get(&outer, &back, "p");
    assert_eq!(get(&point_v1, &p, "x"), Value::I32(1));
    assert_eq!(get(&point_v1, &p, "y"), Value::I32(2));
    assert_eq!(get(&outer, &back, "tail"), Value::str("end"));
}

#[test]
fn changed_field_type_is_skipped() {
    let v1 = ClassDef::builder("Score").field("score", FieldType::I32).build();
    let v2 = ClassDef::builder("Score").field("score", FieldType::STRING).build();
    let writer = engine(Config::default(), &[(&v1, 40)]);
    let reader = engine(Config::default(), &[(&v2, 40)]);

    let value = instance(&v1, &[("score", Value::I32(7))]);
    let back = reader.deserialize(&writer.serialize(&value).unwrap()).unwrap();
    assert_eq!(get(&v2, &back, "score"), Value::Null);
}

#[test]
fn retyped_container_field_is_dropped() {
    let v1 = ClassDef::builder("Basket")
        .field("items", FieldType::list(FieldType::I32))
        .field("owner", FieldType::STRING)
        .build();
    let v2 = ClassDef::builder("Basket")
        .field("items", FieldType::map(FieldType::STRING, FieldType::I32))
        .field("owner", FieldType::STRING)
        .build();
    let writer = engine(Config::default(), &[(&v1, 40)]);
    let reader = engine(Config::default(), &[(&v2, 40)]);

    let value = instance(
        &v1,
        &[("items", Value::list([Value::I32(1)])), ("owner", Value::str("ann"))],
    );
    let back = reader.deserialize(&writer.serialize(&value).unwrap()).unwrap();
    assert_eq!(get(&v2, &back, "items"), Value::Null);
    assert_eq!(get(&v2, &back, "owner"), Value::str("ann"));

    // Same name, still a collection: kept.
    let v3 = ClassDef::builder("Basket")
        .field("items", FieldType::set(FieldType::Any))
        .build();
    let reader = engine(Config::default(), &[(&v3, 40)]);
    let back = reader.deserialize(&writer.serialize(&value).unwrap()).unwrap();
    assert_eq!(get(&v3, &back, "items"), Value::list([Value::I32(1)]));
}

#[test]
fn shadowed_fields_keep_their_values() {
    let base = ClassDef::builder("Base")
        .field("id", FieldType::I32)
        .non_final()
        .build();
    let derived = ClassDef::builder("Derived")
        .extends(base.clone())
        .field("id", FieldType::I64)
        .field("name", FieldType::STRING)
        .build();
    let engine = engine(Config::default(), &[(&base, 40), (&derived, 41)]);

    let slots = vec![Value::I32(1), Value::I64(2), Value::str("d")];
    let value = Value::Object(new_object(DynamicObject::with_slots("Derived".into(), slots.clone())));
    let back = round_trip(&engine, &value);

    let obj = back.as_object().unwrap().borrow();
    let obj = obj.as_any().downcast_ref::<DynamicObject>().unwrap();
    assert_eq!(obj.slots(), &slots[..]);
}

#[test]
fn empty_class_writes_only_the_sentinel() {
    let empty = ClassDef::builder("Empty").build();
    let engine = engine(Config::default(), &[(&empty, 40)]);

    let bytes = engine.serialize(&instance(&empty, &[])).unwrap();
    // header, reference flag, class id, end tag
    assert_eq!(bytes.len(), 1 + 1 + 1 + 8);
    assert_eq!(bytes[3..], END_TAG.to_le_bytes());

    let back = engine.deserialize(&bytes).unwrap();
    assert_eq!(back.as_object().unwrap().borrow().class_name(), "Empty");
}

#[test]
fn declaration_order_does_not_change_bytes() {
    let fields: Vec<(&str, FieldType, Value)> = vec![
        ("a", FieldType::I32, Value::I32(1)),
        ("bb", FieldType::I32, Value::I32(2)),
        ("ccc", FieldType::I64, Value::I64(3)),
        ("flag", FieldType::BOOL, Value::Bool(true)),
        ("label", FieldType::STRING, Value::str("l")),
        ("a_rather_long_name", FieldType::STRING, Value::str("long")),
        ("items", FieldType::list(FieldType::I32), Value::list([Value::I32(4)])),
        ("lookup", FieldType::map(FieldType::STRING, FieldType::I64), Value::map([])),
        ("anything", FieldType::Any, Value::str("any")),
    ];

    let encode = |order: &[usize], config: Config| -> Vec<u8> {
        let def = order
            .iter()
            .fold(ClassDef::builder("Shuffled"), |b, &i| b.field(fields[i].0, fields[i].1.clone()))
            .build();
        let values: Vec<(&str, Value)> = fields.iter().map(|(n, _, v)| (*n, v.clone())).collect();
        engine(config, &[(&def, 40)]).serialize(&instance(&def, &values)).unwrap()
    };

    let mut rng = fastrand::Rng::with_seed(0x5eed);
    for config in super::both_modes() {
        let mut order: Vec<usize> = (0..fields.len()).collect();
        let baseline = encode(&order, config.clone());
        for _ in 0..8 {
            rng.shuffle(&mut order);
            assert_eq!(encode(&order, config.clone()), baseline, "order {order:?}");
        }
    }
}

#[test]
fn strings_survive_unicode() {
    let note = ClassDef::builder("Note").field("text", FieldType::STRING).build();
    let engine = engine(Config::default(), &[(&note, 40)]);
    let text = String::from("grüße, 世界");
    let back = round_trip(&engine, &instance(&note, &[("text", Value::Str(text.clone()))]));
    assert_eq!(get(&note, &back, "text"), Value::Str(text));
}
