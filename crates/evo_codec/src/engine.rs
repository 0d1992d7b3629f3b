use alloc::sync::Arc;
use alloc::vec::Vec;

use evo_buffer::Writer;
use evo_meta::registry::TypeRegistry;
use evo_meta::{ClassDef, EnumDef, MetaError, Value};
use log::debug;

use crate::binding::{read_any, write_any};
use crate::object::ObjectCodec;
use crate::{ClassResolver, CodecError, Config, ReadContext, WriteContext};

// -----------------------------------------------------------------------------
// EngineBuilder

/// Collects the configuration and user types of an [`Engine`].
///
/// Registration errors are kept until [`build`](Self::build).
#[derive(Debug, Default)]
pub struct EngineBuilder {
    config: Config,
    registry: TypeRegistry,
    error: Option<MetaError>,
}

impl EngineBuilder {
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Register a class under `id`, which must be at least
    /// [`FIRST_USER_ID`](evo_meta::registry::class_id::FIRST_USER_ID).
    pub fn register_class(mut self, def: Arc<ClassDef>, id: u32) -> Self {
        if self.error.is_none() {
            self.error = self.registry.register_class(def, id).err();
        }
        self
    }

    pub fn register_enum(mut self, def: Arc<EnumDef>, id: u32) -> Self {
        if self.error.is_none() {
            self.error = self.registry.register_enum(def, id).err();
        }
        self
    }

    /// Build the codecs of all registered classes.
    pub fn build(self) -> Result<Engine, CodecError> {
        if let Some(err) = self.error {
            return Err(err.into());
        }
        Engine::new(self.registry, self.config)
    }
}

// -----------------------------------------------------------------------------
// Engine

/// Serializes and deserializes [`Value`] graphs.
///
/// Immutable once built and shareable across threads. Every call works on
/// its own [`WriteContext`] or [`ReadContext`].
///
/// The payload starts with one header byte, see [`Config::header`], followed
/// by the root value with its reference flag and class id.
#[derive(Debug)]
pub struct Engine {
    resolver: ClassResolver,
}

impl Engine {
    #[inline]
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    pub fn new(registry: TypeRegistry, config: Config) -> Result<Self, CodecError> {
        debug!("building engine: {config:?}");
        Ok(Self {
            resolver: ClassResolver::new(registry, config)?,
        })
    }

    #[inline]
    pub fn config(&self) -> &Config {
        self.resolver.config()
    }

    #[inline]
    pub fn registry(&self) -> &TypeRegistry {
        self.resolver.registry()
    }

    #[inline]
    pub fn resolver(&self) -> &ClassResolver {
        &self.resolver
    }

    /// Codec of the registered class `name`.
    pub fn object_codec(&self, name: &str) -> Result<&Arc<ObjectCodec>, CodecError> {
        self.resolver.object_codec(name)
    }

    /// A fresh context writing to `writer`, without header.
    pub fn write_context<'a>(&'a self, writer: &'a mut Writer) -> WriteContext<'a> {
        WriteContext::new(writer, &self.resolver)
    }

    /// A fresh context reading `bytes`, without header.
    pub fn read_context<'a>(&'a self, bytes: &'a [u8]) -> ReadContext<'a> {
        ReadContext::new(bytes, &self.resolver)
    }

    pub fn serialize(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        let mut writer = Writer::new();
        self.serialize_into(&mut writer, value)?;
        Ok(writer.into_vec())
    }

    /// Append the header and `value` to `writer`.
    pub fn serialize_into(&self, writer: &mut Writer, value: &Value) -> Result<(), CodecError> {
        writer.write_u8(self.config().header());
        let mut ctx = self.write_context(writer);
        write_any(&mut ctx, value)
    }

    pub fn deserialize(&self, bytes: &[u8]) -> Result<Value, CodecError> {
        let mut ctx = self.read_context(bytes);
        let expected = self.config().header();
        let actual = ctx.reader.read_u8()?;
        if actual != expected {
            return Err(CodecError::HeaderMismatch { expected, actual });
        }
        read_any(&mut ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evo_meta::FieldType;
    use evo_meta::registry::class_id::FIRST_USER_ID;

    #[test]
    fn engine_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Engine>();
    }

    #[test]
    fn registration_errors_surface_on_build() {
        let a = ClassDef::builder("A").field("x", FieldType::I32).build();
        let err = Engine::builder().register_class(a, FIRST_USER_ID - 1).build().unwrap_err();
        assert!(matches!(err, CodecError::Meta(MetaError::ReservedId(_))));
    }

    #[test]
    fn scalar_roots() {
        let engine = Engine::builder().build().unwrap();
        for value in [
            Value::Null,
            Value::I32(-7),
            Value::F64(0.5),
            Value::str("root"),
            Value::list([Value::I64(1), Value::Null, Value::str("x")]),
        ] {
            let bytes = engine.serialize(&value).unwrap();
            assert_eq!(bytes[0], engine.config().header());
            assert_eq!(engine.deserialize(&bytes).unwrap(), value);
        }
    }

    #[test]
    fn header_mismatch() {
        let writer = Engine::builder().build().unwrap();
        let reader = Engine::builder()
            .config(Config::default().with_ref_tracking(false))
            .build()
            .unwrap();
        let bytes = writer.serialize(&Value::I32(1)).unwrap();
        assert!(matches!(
            reader.deserialize(&bytes),
            Err(CodecError::HeaderMismatch { .. })
        ));
    }

    #[test]
    fn empty_input() {
        let engine = Engine::builder().build().unwrap();
        assert!(matches!(engine.deserialize(&[]), Err(CodecError::Buffer(_))));
    }
}
