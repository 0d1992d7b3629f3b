use alloc::sync::Arc;
use core::fmt;

use evo_meta::registry::{TypeRegistry, UserType, class_id};
use evo_meta::{FieldType, PrimitiveKind, Value};
use evo_utils::hash::{NoOpHashMap, new_noop_map};
use log::debug;

use crate::object::ObjectCodec;
use crate::serializer::{
    CollectionSerializer, EnumSerializer, MapSerializer, PrimitiveSerializer, Serializer,
    StringSerializer,
};
use crate::{CodecError, Config};

// -----------------------------------------------------------------------------
// ClassInfo

/// A class id bound to its type and serializer.
#[derive(Clone)]
pub struct ClassInfo {
    pub id: u32,
    pub ty: FieldType,
    pub serializer: Arc<dyn Serializer>,
    object: Option<Arc<ObjectCodec>>,
}

impl ClassInfo {
    fn new(id: u32, ty: FieldType, serializer: impl Serializer + 'static) -> Self {
        Self {
            id,
            ty,
            serializer: Arc::new(serializer),
            object: None,
        }
    }

    /// Codec of a registered class, `None` for built-in types and enums.
    #[inline]
    pub fn object_codec(&self) -> Option<&Arc<ObjectCodec>> {
        self.object.as_ref()
    }
}

impl fmt::Debug for ClassInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassInfo")
            .field("id", &self.id)
            .field("ty", &self.ty)
            .finish_non_exhaustive()
    }
}

// -----------------------------------------------------------------------------
// ClassResolver

/// Every class id an engine knows, built once and read-only afterwards.
///
/// Ids below [`class_id::FIRST_USER_ID`] are built-in: primitives, their
/// boxed forms, strings and the three container kinds.
pub struct ClassResolver {
    config: Config,
    registry: TypeRegistry,
    infos: NoOpHashMap<u32, ClassInfo>,
}

impl ClassResolver {
    pub fn new(registry: TypeRegistry, config: Config) -> Result<Self, CodecError> {
        let mut infos = new_noop_map();
        let mut insert = |info: ClassInfo| {
            infos.insert(info.id, info);
        };

        for kind in PrimitiveKind::ALL {
            let id = kind.type_id();
            insert(ClassInfo::new(id, FieldType::Primitive(kind), PrimitiveSerializer(kind)));
            insert(ClassInfo::new(
                id + class_id::BOXED_OFFSET,
                FieldType::Boxed(kind),
                PrimitiveSerializer(kind),
            ));
        }
        insert(ClassInfo::new(class_id::STRING, FieldType::String, StringSerializer));
        insert(ClassInfo::new(
            class_id::LIST,
            FieldType::list(FieldType::Any),
            CollectionSerializer::LIST,
        ));
        insert(ClassInfo::new(
            class_id::SET,
            FieldType::set(FieldType::Any),
            CollectionSerializer::SET,
        ));
        insert(ClassInfo::new(
            class_id::MAP,
            FieldType::map(FieldType::Any, FieldType::Any),
            MapSerializer,
        ));

        for (id, user) in registry.iter() {
            let info = match user {
                UserType::Enum(def) => ClassInfo::new(
                    id,
                    FieldType::Enum(def.name().clone()),
                    EnumSerializer::new(def.clone()),
                ),
                UserType::Class(def) => {
                    let codec = Arc::new(ObjectCodec::new(def.clone(), &registry, &config)?);
                    ClassInfo {
                        id,
                        ty: FieldType::Struct(def.name().clone()),
                        serializer: codec.clone(),
                        object: Some(codec),
                    }
                }
            };
            insert(info);
        }
        debug!("class resolver ready with {} class ids", infos.len());

        Ok(Self {
            config,
            registry,
            infos,
        })
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn info(&self, id: u32) -> Result<&ClassInfo, CodecError> {
        self.infos.get(&id).ok_or(CodecError::UnknownClassId(id))
    }

    pub fn info_by_name(&self, name: &str) -> Result<&ClassInfo, CodecError> {
        match self.registry.id_of_name(name) {
            Some(id) => self.info(id),
            None => Err(CodecError::UnregisteredClass(name.into())),
        }
    }

    /// Info of the container kind of `ty`.
    pub fn container_info(&self, ty: &FieldType) -> Result<&ClassInfo, CodecError> {
        let id = match ty {
            FieldType::List(_) => class_id::LIST,
            FieldType::Set(_) => class_id::SET,
            FieldType::Map(..) => class_id::MAP,
            _ => {
                return Err(CodecError::TypeMismatch {
                    expected: ty.type_name(),
                    found: "container",
                });
            }
        };
        self.info(id)
    }

    /// Info of the runtime class of `value`. Scalars resolve to their boxed
    /// form, objects to their registered class.
    pub fn info_of_value(&self, value: &Value) -> Result<&ClassInfo, CodecError> {
        let boxed = |kind: PrimitiveKind| self.info(kind.type_id() + class_id::BOXED_OFFSET);
        match value {
            Value::Null => Err(CodecError::mismatch("non-null value", value)),
            Value::Bool(_) => boxed(PrimitiveKind::Bool),
            Value::I8(_) => boxed(PrimitiveKind::I8),
            Value::I16(_) => boxed(PrimitiveKind::I16),
            Value::I32(_) => boxed(PrimitiveKind::I32),
            Value::I64(_) => boxed(PrimitiveKind::I64),
            Value::F32(_) => boxed(PrimitiveKind::F32),
            Value::F64(_) => boxed(PrimitiveKind::F64),
            Value::Str(_) => self.info(class_id::STRING),
            Value::List(_) => self.info(class_id::LIST),
            Value::Set(_) => self.info(class_id::SET),
            Value::Map(_) => self.info(class_id::MAP),
            Value::Enum(v) => self.info_by_name(&v.enum_name),
            Value::Object(obj) => {
                let obj = obj.try_borrow().map_err(|_| CodecError::ObjectBorrowed)?;
                self.info_by_name(obj.class_name())
            }
        }
    }

    /// Codec of the registered class `name`.
    pub fn object_codec(&self, name: &str) -> Result<&Arc<ObjectCodec>, CodecError> {
        self.info_by_name(name)?
            .object_codec()
            .ok_or_else(|| CodecError::UnregisteredClass(name.into()))
    }
}

impl fmt::Debug for ClassResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassResolver")
            .field("config", &self.config)
            .field("class_ids", &self.infos.len())
            .finish()
    }
}
