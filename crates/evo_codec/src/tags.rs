//! Field tags of the compatible codec.
//!
//! Every field gets an `i64` tag. The low bits select a tier, the rest holds
//! either the packed field name plus a small class id, or a hash of the
//! qualified field name:
//!
//! | tier | low bits | width | payload |
//! |---|---|---|---|
//! | [`Tier::SmallEmbed`] | `01` | 4 bytes | name (<= 4 chars) `<< 8`, class id (<= 63) `<< 2` |
//! | [`Tier::WideEmbed`] | `011` | 8 bytes | name (<= 9 chars) `<< 10`, class id `<< 3` |
//! | [`Tier::HashEmbed`] | `111` | 8 bytes | name hash `<< 10`, class id `<< 3` |
//! | [`Tier::HashSeparate`] | `00` | 8 bytes | name hash `<< 2` |
//! | end of fields | `10` | 8 bytes | [`END_TAG`] |
//!
//! Only monomorphic fields with a class id below [`MAX_EMBED_CLASS_ID`]
//! embed their class, the others describe their value out of band.

use alloc::vec::Vec;

use evo_buffer::{BufferError, Reader, Writer};
use evo_meta::{Descriptor, FieldType};
use evo_meta::registry::{TypeRegistry, class_id::NO_CLASS_ID};
use evo_utils::hash::{HashMap, new_map};
use md5::{Digest, Md5};

use crate::CodecError;

// -----------------------------------------------------------------------------
// Constants

pub const SMALL_EMBED_FLAG: i64 = 0b01;
pub const WIDE_EMBED_FLAG: i64 = 0b011;
pub const HASH_EMBED_FLAG: i64 = 0b111;
pub const HASH_SEPARATE_FLAG: i64 = 0b00;
pub const END_FLAG: i64 = 0b10;

/// Written after the last field of every object, in every class version.
pub const END_TAG: i64 = (i64::MAX & !0b11) | END_FLAG;

/// Embedded class ids must be smaller than this.
pub const MAX_EMBED_CLASS_ID: u32 = 127;

/// Largest class id that fits a 4-byte tag.
pub const MAX_SMALL_CLASS_ID: u32 = 63;

const SMALL_NAME_CHARS: usize = 4;
const WIDE_NAME_CHARS: usize = 9;

/// Kind byte written before the value of a separately typed field.
pub mod field_kind {
    /// Runtime class id, then the payload.
    pub const OBJECT: u8 = 0;
    /// Element class id, container class id, then the payload.
    pub const COLLECTION_ELEMENT_FINAL: u8 = 1;
    /// Key class id, container class id, then the payload.
    pub const MAP_KEY_FINAL: u8 = 2;
    /// Value class id, container class id, then the payload.
    pub const MAP_VALUE_FINAL: u8 = 3;
    /// Key and value class ids, container class id, then the payload.
    pub const MAP_KV_FINAL: u8 = 4;
}

// -----------------------------------------------------------------------------
// Tier

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    SmallEmbed,
    WideEmbed,
    HashEmbed,
    HashSeparate,
}

impl Tier {
    /// Wire order.
    pub const ALL: [Tier; 4] = [
        Self::SmallEmbed,
        Self::WideEmbed,
        Self::HashEmbed,
        Self::HashSeparate,
    ];

    /// Tier of a tag read from the wire, `None` for the end-of-fields flag.
    ///
    /// # Examples
    ///
    /// ```
    /// use evo_codec::tags::{END_TAG, Tier};
    ///
    /// assert_eq!(Tier::of_tag(0b0101), Some(Tier::SmallEmbed));
    /// assert_eq!(Tier::of_tag(0b1011), Some(Tier::WideEmbed));
    /// assert_eq!(Tier::of_tag(0b1111), Some(Tier::HashEmbed));
    /// assert_eq!(Tier::of_tag(0b1100), Some(Tier::HashSeparate));
    /// assert_eq!(Tier::of_tag(END_TAG), None);
    /// ```
    pub const fn of_tag(tag: i64) -> Option<Tier> {
        match tag & 0b11 {
            0b01 => Some(Self::SmallEmbed),
            0b00 => Some(Self::HashSeparate),
            0b11 if tag & 0b111 == WIDE_EMBED_FLAG => Some(Self::WideEmbed),
            0b11 => Some(Self::HashEmbed),
            _ => None,
        }
    }

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Class id embedded in a tag of this tier.
    #[inline]
    pub const fn embedded_class_id(self, tag: i64) -> u32 {
        match self {
            Self::SmallEmbed => ((tag & 0xff) >> 2) as u32,
            Self::WideEmbed | Self::HashEmbed => ((tag & 0x3ff) >> 3) as u32,
            Self::HashSeparate => NO_CLASS_ID,
        }
    }
}

// -----------------------------------------------------------------------------
// Encoding

/// 6-bit code of a name character, `None` for characters outside
/// `[0-9A-Za-z_]`. Code 0 is unused.
#[inline]
const fn char_code(c: u8) -> Option<u64> {
    Some(match c {
        b'0'..=b'9' => (c - b'0') as u64 + 1,
        b'A'..=b'Z' => (c - b'A') as u64 + 11,
        b'a'..=b'z' => (c - b'a') as u64 + 37,
        b'_' => 63,
        _ => return None,
    })
}

/// Packs a name of at most nine characters, first character in the highest
/// bits. Returns the packed bits and the character count.
///
/// # Examples
///
/// ```
/// use evo_codec::tags::pack_name;
///
/// assert_eq!(pack_name("a"), Some((37, 1)));
/// assert_eq!(pack_name("ab"), Some((37 << 6 | 38, 2)));
/// assert!(pack_name("user_name").is_some()); // 9 chars fit
/// assert_eq!(pack_name("user_names"), None);
/// assert_eq!(pack_name("größe"), None);
/// ```
pub fn pack_name(name: &str) -> Option<(u64, usize)> {
    let bytes = name.as_bytes();
    if bytes.is_empty() || bytes.len() > WIDE_NAME_CHARS {
        return None;
    }
    let mut packed = 0_u64;
    for &c in bytes {
        packed = (packed << 6) | char_code(c)?;
    }
    Some((packed, bytes.len()))
}

/// First eight bytes (little-endian) of the MD5 digest of `text`.
pub fn name_hash(text: &str) -> i64 {
    let digest = Md5::digest(text.as_bytes());
    let mut bytes = [0_u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    i64::from_le_bytes(bytes)
}

#[inline]
const fn small_tag(packed: u64, class_id: u32) -> i64 {
    let tag = ((packed as u32) << 8) | (class_id << 2) | SMALL_EMBED_FLAG as u32;
    // Sign extension keeps 4-byte tags ordered the way they read back.
    tag as i32 as i64
}

#[inline]
const fn wide_tag(bits: u64, class_id: u32, flag: i64) -> i64 {
    ((bits << 10) | ((class_id as u64) << 3) | flag as u64) as i64
}

#[inline]
const fn separate_tag(hash: i64) -> i64 {
    ((hash as u64) << 2) as i64
}

/// Writes a tag with the width of its tier.
#[inline]
pub fn write_tag(writer: &mut Writer, tag: i64) {
    match Tier::of_tag(tag) {
        Some(Tier::SmallEmbed) => writer.write_i32(tag as i32),
        _ => writer.write_i64(tag),
    }
}

/// Reads one tag. The low bits of the first four bytes tell whether four
/// more follow.
pub fn read_tag(reader: &mut Reader<'_>) -> Result<i64, BufferError> {
    let low = reader.read_i32()?;
    if low as i64 & 0b11 == SMALL_EMBED_FLAG {
        return Ok(low as i64);
    }
    let high = reader.read_i32()?;
    Ok(((high as i64) << 32) | (low as u32 as i64))
}

// -----------------------------------------------------------------------------
// FieldTags

/// A field with its tag.
#[derive(Debug, Clone)]
pub struct TaggedField {
    pub tag: i64,
    pub tier: Tier,
    /// [`NO_CLASS_ID`] for [`Tier::HashSeparate`].
    pub class_id: u32,
    /// [`field_kind`] byte written ahead of a [`Tier::HashSeparate`] value,
    /// [`field_kind::OBJECT`] for embedded tiers.
    pub kind: u8,
    /// Position in wire order over all tiers.
    pub index: usize,
    pub descriptor: Descriptor,
}

/// Kind byte of a separately typed field, chosen from its declared type.
///
/// Containers whose element, key or value type is monomorphic get a kind
/// that carries those class ids, everything else is [`field_kind::OBJECT`].
pub fn separate_kind(ty: &FieldType, registry: &TypeRegistry) -> u8 {
    let is_final = |t: &FieldType| registry.is_monomorphic(t) && registry.class_id_of(t).is_some();
    match ty {
        FieldType::List(elem) | FieldType::Set(elem) if is_final(elem) => field_kind::COLLECTION_ELEMENT_FINAL,
        FieldType::Map(key, val) => match (is_final(key), is_final(val)) {
            (true, true) => field_kind::MAP_KV_FINAL,
            (true, false) => field_kind::MAP_KEY_FINAL,
            (false, true) => field_kind::MAP_VALUE_FINAL,
            (false, false) => field_kind::OBJECT,
        },
        _ => field_kind::OBJECT,
    }
}

/// Tags of all fields of a class, per tier and sorted ascending.
///
/// # Examples
///
/// ```
/// use evo_codec::tags::{FieldTags, Tier};
/// use evo_meta::{Descriptor, FieldType, TypeRegistry};
///
/// let fields = vec![
///     Descriptor::new("User", "id", FieldType::I64),
///     Descriptor::new("User", "nickname", FieldType::STRING),
///     Descriptor::new("User", "registered_at", FieldType::I64),
///     Descriptor::new("User", "tags", FieldType::list(FieldType::STRING)),
/// ];
/// let tags = FieldTags::build("User", fields, &TypeRegistry::new()).unwrap();
///
/// assert_eq!(tags.tier(Tier::SmallEmbed).len(), 1); // id
/// assert_eq!(tags.tier(Tier::WideEmbed).len(), 1); // nickname
/// assert_eq!(tags.tier(Tier::HashEmbed).len(), 1); // registered_at
/// assert_eq!(tags.tier(Tier::HashSeparate).len(), 1); // tags
/// ```
#[derive(Debug, Clone, Default)]
pub struct FieldTags {
    tiers: [Vec<TaggedField>; 4],
}

impl FieldTags {
    pub fn build(
        class: &str,
        descriptors: Vec<Descriptor>,
        registry: &TypeRegistry,
    ) -> Result<Self, CodecError> {
        let shadowed: Vec<bool> = {
            let mut name_counts: HashMap<&str, usize> = new_map();
            for d in &descriptors {
                *name_counts.entry(&**d.name()).or_default() += 1;
            }
            descriptors
                .iter()
                .map(|d| name_counts.get(&**d.name()).is_some_and(|&n| n > 1))
                .collect()
        };

        let mut tags = Self::default();
        for (descriptor, shadowed) in descriptors.into_iter().zip(shadowed) {
            let embed_id = registry
                .class_id_of(descriptor.ty())
                .filter(|&id| id < MAX_EMBED_CLASS_ID && registry.is_monomorphic(descriptor.ty()));
            let packed = if shadowed {
                None
            } else {
                pack_name(descriptor.name())
            };

            let (tier, tag, class_id) = match (embed_id, packed) {
                (Some(id), Some((bits, len))) if len <= SMALL_NAME_CHARS && id <= MAX_SMALL_CLASS_ID => {
                    (Tier::SmallEmbed, small_tag(bits, id), id)
                }
                (Some(id), Some((bits, _))) => (Tier::WideEmbed, wide_tag(bits, id, WIDE_EMBED_FLAG), id),
                (Some(id), None) => {
                    let hash = name_hash(&descriptor.qualified_name());
                    (Tier::HashEmbed, wide_tag(hash as u64, id, HASH_EMBED_FLAG), id)
                }
                (None, _) => {
                    let hash = name_hash(&descriptor.qualified_name());
                    (Tier::HashSeparate, separate_tag(hash), NO_CLASS_ID)
                }
            };

            #[cfg(all(feature = "debug", debug_assertions))]
            {
                debug_assert_eq!(Tier::of_tag(tag), Some(tier));
                debug_assert_eq!(tier.embedded_class_id(tag), class_id);
            }

            let kind = match tier {
                Tier::HashSeparate => separate_kind(descriptor.ty(), registry),
                _ => field_kind::OBJECT,
            };
            tags.tiers[tier.index()].push(TaggedField {
                tag,
                tier,
                class_id,
                kind,
                index: 0,
                descriptor,
            });
        }

        for tier in tags.tiers.iter_mut() {
            tier.sort_by_key(|f| f.tag);
            if let Some(pair) = tier.windows(2).find(|w| w[0].tag == w[1].tag) {
                return Err(CodecError::TagCollision {
                    class: class.into(),
                    first: pair[0].descriptor.qualified_name(),
                    second: pair[1].descriptor.qualified_name(),
                    tag: pair[0].tag,
                });
            }
        }
        for (index, field) in tags.tiers.iter_mut().flatten().enumerate() {
            field.index = index;
        }
        Ok(tags)
    }

    #[inline]
    pub fn tier(&self, tier: Tier) -> &[TaggedField] {
        &self.tiers[tier.index()]
    }

    /// All fields in wire order.
    pub fn iter(&self) -> impl Iterator<Item = &TaggedField> {
        self.tiers.iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.tiers.iter().map(Vec::len).sum()
    }
}
