/// Which object codec registered classes use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Mode {
    /// Fields in canonical order behind a class version hash.
    SchemaConsistent,
    /// Tagged fields, tolerant to added and removed fields.
    #[default]
    Compatible,
}

/// Engine configuration.
///
/// Reader and writer must agree on every flag except `max_depth` and
/// `unknown_enum_as_null`, the payload header records the others and a
/// mismatch is rejected.
///
/// # Examples
///
/// ```
/// use evo_codec::{Config, Mode};
///
/// let config = Config::default()
///     .with_mode(Mode::SchemaConsistent)
///     .with_ref_tracking(false);
///
/// assert!(config.check_class_version);
/// assert_eq!(config.max_depth, 128);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Config {
    pub mode: Mode,
    /// Preserve shared and cyclic references.
    pub ref_tracking: bool,
    /// Prefix exact-codec objects with the class version hash.
    pub check_class_version: bool,
    /// Write `i32` as zig-zag varints.
    pub compress_int: bool,
    /// Write `i64` as zig-zag varints.
    pub compress_long: bool,
    /// Read unknown enum ordinals as null instead of failing.
    pub unknown_enum_as_null: bool,
    pub max_depth: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: Mode::Compatible,
            ref_tracking: true,
            check_class_version: true,
            compress_int: true,
            compress_long: true,
            unknown_enum_as_null: false,
            max_depth: 128,
        }
    }
}

impl Config {
    #[inline]
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    #[inline]
    pub fn with_ref_tracking(mut self, enable: bool) -> Self {
        self.ref_tracking = enable;
        self
    }

    #[inline]
    pub fn with_class_version_check(mut self, enable: bool) -> Self {
        self.check_class_version = enable;
        self
    }

    /// Set both `compress_int` and `compress_long`.
    #[inline]
    pub fn with_number_compression(mut self, enable: bool) -> Self {
        self.compress_int = enable;
        self.compress_long = enable;
        self
    }

    #[inline]
    pub fn with_unknown_enum_as_null(mut self, enable: bool) -> Self {
        self.unknown_enum_as_null = enable;
        self
    }

    #[inline]
    pub fn with_max_depth(mut self, depth: u32) -> Self {
        self.max_depth = depth;
        self
    }

    const REF_TRACKING: u8 = 1;
    const COMPATIBLE: u8 = 1 << 1;
    const COMPRESS_INT: u8 = 1 << 2;
    const COMPRESS_LONG: u8 = 1 << 3;
    const CLASS_VERSION: u8 = 1 << 4;

    /// Flags written in the first byte of every payload.
    pub fn header(&self) -> u8 {
        let mut header = 0;
        if self.ref_tracking {
            header |= Self::REF_TRACKING;
        }
        if self.mode == Mode::Compatible {
            header |= Self::COMPATIBLE;
        } else if self.check_class_version {
            header |= Self::CLASS_VERSION;
        }
        if self.compress_int {
            header |= Self::COMPRESS_INT;
        }
        if self.compress_long {
            header |= Self::COMPRESS_LONG;
        }
        header
    }
}
