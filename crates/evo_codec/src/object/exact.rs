use alloc::sync::Arc;
use alloc::vec::Vec;

use evo_meta::registry::TypeRegistry;
use evo_meta::{ClassDef, Descriptor, Value};
use md5::{Digest, Md5};

use super::{Layout, Target};
use crate::binding::{read_routed, write_routed};
use crate::grouper::DescriptorGrouper;
use crate::refs::RefSlot;
use crate::{CodecError, Config, ReadContext, WriteContext};

// -----------------------------------------------------------------------------
// Version hash

/// Fingerprint of a field list, in the order given.
///
/// Digests the name, type name and declaring class of every field, each
/// terminated by a zero byte, and keeps the first four bytes of the MD5 sum.
///
/// # Examples
///
/// ```
/// use evo_codec::object::class_version_hash;
/// use evo_meta::{Descriptor, FieldType};
///
/// let a = [Descriptor::new("Point", "x", FieldType::I32)];
/// let b = [Descriptor::new("Point", "x", FieldType::I64)];
/// assert_eq!(class_version_hash(&a), class_version_hash(&a));
/// assert_ne!(class_version_hash(&a), class_version_hash(&b));
/// ```
pub fn class_version_hash(descriptors: &[Descriptor]) -> i32 {
    let mut md5 = Md5::new();
    for d in descriptors {
        md5.update(d.name().as_bytes());
        md5.update([0_u8]);
        md5.update(d.ty().type_name().as_bytes());
        md5.update([0_u8]);
        md5.update(d.declaring_class().as_bytes());
        md5.update([0_u8]);
    }
    let digest = md5.finalize();
    i32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]])
}

// -----------------------------------------------------------------------------
// ExactCodec

/// Writes field values back to back in canonical order, optionally preceded
/// by the class version hash. Both sides must share the class layout.
#[derive(Debug)]
pub struct ExactCodec {
    pub(super) layout: Layout,
    version_hash: i32,
    check_version: bool,
}

impl ExactCodec {
    pub(super) fn new(
        def: Arc<ClassDef>,
        descriptors: Vec<Descriptor>,
        registry: &TypeRegistry,
        config: &Config,
    ) -> Result<Self, CodecError> {
        let ordered = DescriptorGrouper::new(descriptors, registry, config.compress_int, config.compress_long).sorted();
        let version_hash = class_version_hash(&ordered);
        Ok(Self {
            layout: Layout::new(def, ordered, registry)?,
            version_hash,
            check_version: config.check_class_version,
        })
    }

    #[inline]
    pub fn version_hash(&self) -> i32 {
        self.version_hash
    }

    /// Fields in wire order.
    pub fn descriptors(&self) -> impl Iterator<Item = &Descriptor> {
        self.layout.fields.iter().map(|f| &f.descriptor)
    }

    pub(super) fn write(&self, ctx: &mut WriteContext<'_>, value: &Value) -> Result<(), CodecError> {
        let values = self.layout.values_of(value)?;
        if self.check_version {
            ctx.writer.write_i32(self.version_hash);
        }
        for (field, value) in self.layout.fields.iter().zip(values.iter()) {
            write_routed(ctx, &field.route, value)?;
        }
        Ok(())
    }

    pub(super) fn read(&self, ctx: &mut ReadContext<'_>, slot: RefSlot) -> Result<Value, CodecError> {
        let mut target = self.layout.begin_read(ctx, slot)?;
        self.read_fields(ctx, &mut target)?;
        self.layout.finish(ctx, target, slot)
    }

    pub(super) fn read_fields(&self, ctx: &mut ReadContext<'_>, target: &mut Target) -> Result<(), CodecError> {
        if self.check_version {
            let actual = ctx.reader.read_i32()?;
            if actual != self.version_hash {
                return Err(CodecError::VersionMismatch {
                    class: self.layout.def.name().clone(),
                    expected: self.version_hash,
                    actual,
                });
            }
        }
        for (pos, field) in self.layout.fields.iter().enumerate() {
            let value = read_routed(ctx, &field.route)?;
            self.layout.assign(target, pos, value)?;
        }
        Ok(())
    }
}
