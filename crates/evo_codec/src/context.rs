use alloc::boxed::Box;

use evo_buffer::{Reader, Writer};
use evo_meta::Value;

use crate::refs::{RefResolver, RefSlot, new_resolver};
use crate::{ClassResolver, CodecError, Config, Generics};

// -----------------------------------------------------------------------------
// WriteContext

/// State of one serialization call.
///
/// Created by [`Engine::write_context`](crate::Engine::write_context), owns the
/// reference table and generics stack, borrows the output buffer.
pub struct WriteContext<'a> {
    pub writer: &'a mut Writer,
    pub refs: Box<dyn RefResolver>,
    pub generics: Generics,
    resolver: &'a ClassResolver,
    depth: u32,
}

impl<'a> WriteContext<'a> {
    pub fn new(writer: &'a mut Writer, resolver: &'a ClassResolver) -> Self {
        Self {
            writer,
            refs: new_resolver(resolver.config().ref_tracking),
            generics: Generics::new(),
            resolver,
            depth: 0,
        }
    }

    #[inline]
    pub fn resolver(&self) -> &'a ClassResolver {
        self.resolver
    }

    #[inline]
    pub fn config(&self) -> &'a Config {
        self.resolver.config()
    }

    /// Writes the reference flag of `value`, see
    /// [`RefResolver::write_ref_or_null`].
    #[inline]
    pub fn write_ref_or_null(&mut self, value: &Value) -> bool {
        self.refs.write_ref_or_null(self.writer, value)
    }

    #[inline]
    pub(crate) fn enter(&mut self) -> Result<(), CodecError> {
        self.depth += 1;
        if self.depth > self.config().max_depth {
            return Err(CodecError::DepthExceeded(self.config().max_depth));
        }
        Ok(())
    }

    #[inline]
    pub(crate) fn leave(&mut self) {
        self.depth -= 1;
    }

    /// Forget the reference table and generics of the previous call.
    pub fn reset(&mut self) {
        self.refs.reset();
        self.generics.clear();
        self.depth = 0;
    }
}

// -----------------------------------------------------------------------------
// ReadContext

/// State of one deserialization call.
pub struct ReadContext<'a> {
    pub reader: Reader<'a>,
    pub refs: Box<dyn RefResolver>,
    pub generics: Generics,
    resolver: &'a ClassResolver,
    depth: u32,
}

impl<'a> ReadContext<'a> {
    pub fn new(bytes: &'a [u8], resolver: &'a ClassResolver) -> Self {
        Self {
            reader: Reader::new(bytes),
            refs: new_resolver(resolver.config().ref_tracking),
            generics: Generics::new(),
            resolver,
            depth: 0,
        }
    }

    #[inline]
    pub fn resolver(&self) -> &'a ClassResolver {
        self.resolver
    }

    #[inline]
    pub fn config(&self) -> &'a Config {
        self.resolver.config()
    }

    /// Bind a freshly created value to its reserved reference id.
    #[inline]
    pub fn bind(&mut self, slot: RefSlot, value: &Value) {
        self.refs.set_read_object(slot, value);
    }

    #[inline]
    pub(crate) fn enter(&mut self) -> Result<(), CodecError> {
        self.depth += 1;
        if self.depth > self.config().max_depth {
            return Err(CodecError::DepthExceeded(self.config().max_depth));
        }
        Ok(())
    }

    #[inline]
    pub(crate) fn leave(&mut self) {
        self.depth -= 1;
    }
}
