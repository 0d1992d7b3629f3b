use alloc::vec::Vec;

use evo_buffer::Writer;
use evo_meta::{ClassDef, FieldType, Value};

use super::{engine, instance};
use crate::refs::{REF_FLAG, REF_VALUE_FLAG};
use crate::tags::{END_TAG, write_tag};
use crate::{CodecError, Config, Engine};

fn framed(engine: &Engine, body: impl FnOnce(&mut Writer)) -> Vec<u8> {
    let mut w = Writer::new();
    w.write_u8(engine.config().header());
    body(&mut w);
    w.into_vec()
}

#[test]
fn invalid_tier_flag() {
    let empty = ClassDef::builder("Empty").build();
    let engine = engine(Config::default(), &[(&empty, 40)]);
    let bytes = framed(&engine, |w| {
        w.write_i8(REF_VALUE_FLAG);
        w.write_var_u32(40);
        // end flag bits without the end tag
        w.write_i64(0b110);
    });
    assert!(matches!(
        engine.deserialize(&bytes),
        Err(CodecError::CorruptedTag { tag: 0b110, .. })
    ));
}

#[test]
fn unknown_field_of_unknown_class() {
    let empty = ClassDef::builder("Empty").build();
    let engine = engine(Config::default(), &[(&empty, 40)]);
    let bytes = framed(&engine, |w| {
        w.write_i8(REF_VALUE_FLAG);
        w.write_var_u32(40);
        // small tag with class id 50, which nobody registered
        write_tag(w, (1 << 8) | (50 << 2) | 0b01);
        write_tag(w, END_TAG);
    });
    assert!(matches!(engine.deserialize(&bytes), Err(CodecError::UnknownClassId(50))));
}

#[test]
fn bad_field_kind() {
    let empty = ClassDef::builder("Empty").build();
    let engine = engine(Config::default(), &[(&empty, 40)]);
    let bytes = framed(&engine, |w| {
        w.write_i8(REF_VALUE_FLAG);
        w.write_var_u32(40);
        write_tag(w, 0b100);
        w.write_i8(REF_VALUE_FLAG);
        w.write_u8(9);
    });
    assert!(matches!(engine.deserialize(&bytes), Err(CodecError::FieldKindMismatch(9))));
}

#[test]
fn flags_and_ids() {
    let engine = Engine::builder().build().unwrap();

    let bytes = framed(&engine, |w| w.write_i8(5));
    assert!(matches!(engine.deserialize(&bytes), Err(CodecError::InvalidRefFlag(5))));

    let bytes = framed(&engine, |w| {
        w.write_i8(REF_FLAG);
        w.write_var_u32(3);
    });
    assert!(matches!(engine.deserialize(&bytes), Err(CodecError::UnresolvedRef(3))));

    let bytes = framed(&engine, |w| {
        w.write_i8(REF_VALUE_FLAG);
        w.write_var_u32(99);
    });
    assert!(matches!(engine.deserialize(&bytes), Err(CodecError::UnknownClassId(99))));
}

#[test]
fn truncated_input() {
    let point = ClassDef::builder("Point")
        .field("x", FieldType::I32)
        .field("label", FieldType::STRING)
        .build();
    let engine = engine(Config::default(), &[(&point, 40)]);
    let bytes = engine
        .serialize(&instance(&point, &[("label", Value::str("abc"))]))
        .unwrap();

    for len in 1..bytes.len() {
        assert!(
            matches!(engine.deserialize(&bytes[..len]), Err(CodecError::Buffer(_))),
            "prefix of {len} bytes"
        );
    }
}

#[test]
fn oversized_length_does_not_allocate() {
    let engine = Engine::builder().build().unwrap();
    let bytes = framed(&engine, |w| {
        w.write_i8(REF_VALUE_FLAG);
        w.write_var_u32(evo_meta::registry::class_id::LIST);
        w.write_var_u32(u32::MAX);
    });
    assert!(matches!(engine.deserialize(&bytes), Err(CodecError::Buffer(_))));
}
