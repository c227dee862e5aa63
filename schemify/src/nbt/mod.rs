//! Write-only model of Minecraft's Named Binary Tag format.

mod gzip;
mod varint;
mod writer;

pub use gzip::GzipCodec;
pub use varint::{encode_var_int_array, var_int_len};
pub use writer::{NbtWriter, to_bytes};

/// Tag type identifiers as they appear on the wire.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum TagKind {
    End = 0,
    Byte = 1,
    Short = 2,
    Int = 3,
    Long = 4,
    Float = 5,
    Double = 6,
    ByteArray = 7,
    String = 8,
    List = 9,
    Compound = 10,
    IntArray = 11,
}

impl TagKind {
    #[inline]
    pub const fn id(self) -> u8 {
        self as u8
    }

    /// Whether a [`TagValue`] of this kind can exist. `End` only appears as a terminator (and as
    /// the element kind of an empty list), and floating point kinds are never produced.
    pub const fn is_value_kind(self) -> bool {
        !matches!(self, TagKind::End | TagKind::Float | TagKind::Double)
    }
}

/// A single NBT value. Built once per export and handed to [`NbtWriter`].
#[derive(Clone, Debug, PartialEq)]
pub enum TagValue {
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    String(String),
    ByteArray(Vec<i8>),
    IntArray(Vec<i32>),
    List(TagKind, Vec<TagValue>),
    Compound(Compound),
}

impl TagValue {
    pub fn kind(&self) -> TagKind {
        match self {
            TagValue::Byte(_) => TagKind::Byte,
            TagValue::Short(_) => TagKind::Short,
            TagValue::Int(_) => TagKind::Int,
            TagValue::Long(_) => TagKind::Long,
            TagValue::String(_) => TagKind::String,
            TagValue::ByteArray(_) => TagKind::ByteArray,
            TagValue::IntArray(_) => TagKind::IntArray,
            TagValue::List(..) => TagKind::List,
            TagValue::Compound(_) => TagKind::Compound,
        }
    }

    /// An empty list that still declares its element kind, e.g. `BlockEntities`.
    pub fn empty_list(element: TagKind) -> Self {
        TagValue::List(element, Vec::new())
    }

    pub fn as_compound(&self) -> Option<&Compound> {
        match self {
            TagValue::Compound(compound) => Some(compound),
            _ => None,
        }
    }
}

impl From<Compound> for TagValue {
    fn from(compound: Compound) -> Self {
        TagValue::Compound(compound)
    }
}

impl From<&str> for TagValue {
    fn from(s: &str) -> Self {
        TagValue::String(s.to_owned())
    }
}

/// Named children of a compound tag, kept in insertion order so output is reproducible.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Compound(Vec<(String, TagValue)>);

impl Compound {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Set `name` to `value`. An existing entry keeps its position.
    pub fn insert<S: Into<String>, V: Into<TagValue>>(&mut self, name: S, value: V) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == name) {
            Some((_, existing)) => *existing = value,
            None => self.0.push((name, value)),
        }
    }

    /// Build from entries whose names are already known to be distinct, skipping the
    /// duplicate scan [`Compound::insert()`] does.
    pub fn from_unique(entries: Vec<(String, TagValue)>) -> Self {
        debug_assert!({
            let mut names: Vec<&str> = entries.iter().map(|(k, _)| k.as_str()).collect();
            names.sort_unstable();
            names.windows(2).all(|w| w[0] != w[1])
        });
        Self(entries)
    }

    /// Builder form of [`Compound::insert()`].
    pub fn with<S: Into<String>, V: Into<TagValue>>(mut self, name: S, value: V) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&TagValue> {
        self.0.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TagValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }
}

impl<S: Into<String>> FromIterator<(S, TagValue)> for Compound {
    fn from_iter<I: IntoIterator<Item = (S, TagValue)>>(iter: I) -> Self {
        let mut compound = Compound::new();
        for (name, value) in iter {
            compound.insert(name, value);
        }
        compound
    }
}
