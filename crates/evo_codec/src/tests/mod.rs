//! Scenarios spanning the engine, both object codecs and the reference
//! tables.

use alloc::sync::Arc;

use evo_meta::{ClassDef, Value};

use crate::{Config, Engine, Mode};

mod compatible;
mod corruption;
mod references;

fn engine(config: Config, classes: &[(&Arc<ClassDef>, u32)]) -> Engine {
    classes
        .iter()
        .fold(Engine::builder().config(config), |builder, (def, id)| {
            builder.register_class(Arc::clone(def), *id)
        })
        .build()
        .unwrap()
}

fn exact() -> Config {
    Config::default().with_mode(Mode::SchemaConsistent)
}

fn both_modes() -> [Config; 2] {
    [Config::default(), exact()]
}

fn instance(def: &ClassDef, fields: &[(&str, Value)]) -> Value {
    let obj = def.instantiate().unwrap();
    for (name, value) in fields {
        def.set(&obj, name, value.clone()).unwrap();
    }
    Value::Object(obj)
}

fn get(def: &ClassDef, value: &Value, name: &str) -> Value {
    def.get(value.as_object().expect("an object"), name).unwrap()
}

fn round_trip(engine: &Engine, value: &Value) -> Value {
    let bytes = engine.serialize(value).unwrap();
    engine.deserialize(&bytes).unwrap()
}
