use std::io::Write;

use byteorder::{BigEndian, WriteBytesExt};

use super::{TagKind, TagValue};
use crate::error::{Error, Result};

/// Serializes [`TagValue`] trees as big-endian binary NBT.
pub struct NbtWriter<W: Write> {
    out: W,
}

impl<W: Write> NbtWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Write a complete NBT document. The root must be a compound; an empty `name` gives the
    /// anonymous root used by most schematic formats.
    pub fn write_root(&mut self, name: &str, root: &TagValue) -> Result<()> {
        if root.kind() != TagKind::Compound {
            return Err(Error::RootNotCompound { kind: root.kind() });
        }
        self.write_named(name, root)
    }

    /// Write the tag id, the length-prefixed name, then the payload.
    pub fn write_named(&mut self, name: &str, value: &TagValue) -> Result<()> {
        self.out.write_u8(value.kind().id())?;
        self.write_string(name)?;
        self.write_payload(value)
    }

    fn write_payload(&mut self, value: &TagValue) -> Result<()> {
        match value {
            TagValue::Byte(v) => self.out.write_i8(*v)?,
            TagValue::Short(v) => self.out.write_i16::<BigEndian>(*v)?,
            TagValue::Int(v) => self.out.write_i32::<BigEndian>(*v)?,
            TagValue::Long(v) => self.out.write_i64::<BigEndian>(*v)?,
            TagValue::String(v) => self.write_string(v)?,
            TagValue::ByteArray(v) => {
                self.out.write_i32::<BigEndian>(v.len() as i32)?;
                for &b in v {
                    self.out.write_i8(b)?;
                }
            }
            TagValue::IntArray(v) => {
                self.out.write_i32::<BigEndian>(v.len() as i32)?;
                for &i in v {
                    self.out.write_i32::<BigEndian>(i)?;
                }
            }
            TagValue::List(element, items) => {
                check_list(*element, items)?;
                self.out.write_u8(element.id())?;
                self.out.write_i32::<BigEndian>(items.len() as i32)?;
                // Elements carry neither tag id nor name
                for item in items {
                    self.write_payload(item)?;
                }
            }
            TagValue::Compound(compound) => {
                for (name, child) in compound.iter() {
                    self.write_named(name, child)?;
                }
                self.out.write_u8(TagKind::End.id())?;
            }
        }
        Ok(())
    }

    fn write_string(&mut self, s: &str) -> Result<()> {
        let len = u16::try_from(s.len()).map_err(|_| Error::StringTooLong { len: s.len() })?;
        self.out.write_u16::<BigEndian>(len)?;
        self.out.write_all(s.as_bytes())?;
        Ok(())
    }
}

/// A list must declare a serializable element kind, and every element must be of that kind.
/// `End` is only accepted as the declared kind of an empty list.
fn check_list(element: TagKind, items: &[TagValue]) -> Result<()> {
    if !element.is_value_kind() && !(element == TagKind::End && items.is_empty()) {
        return Err(Error::UnsupportedTagKind { kind: element });
    }
    for (index, item) in items.iter().enumerate() {
        if item.kind() != element {
            return Err(Error::InvalidListElement {
                expected: element,
                found: item.kind(),
                index,
            });
        }
    }
    Ok(())
}

/// Serialize `root` into a fresh buffer.
pub fn to_bytes(root: &TagValue, root_name: &str) -> Result<Vec<u8>> {
    let mut writer = NbtWriter::new(Vec::new());
    writer.write_root(root_name, root)?;
    Ok(writer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nbt::Compound;

    #[test]
    fn test_scalar_layout() {
        let root = Compound::new()
            .with("b", TagValue::Byte(-1))
            .with("s", TagValue::Short(0x0102))
            .with("i", TagValue::Int(0x01020304))
            .with("l", TagValue::Long(0x0102030405060708));
        let bytes = to_bytes(&root.into(), "").unwrap();
        #[rustfmt::skip]
        let expected: Vec<u8> = vec![
            10, 0, 0,
            1, 0, 1, b'b', 0xFF,
            2, 0, 1, b's', 0x01, 0x02,
            3, 0, 1, b'i', 0x01, 0x02, 0x03, 0x04,
            4, 0, 1, b'l', 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08,
            0,
        ];
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_arrays_and_strings() {
        let root = Compound::new()
            .with("n", TagValue::from("é"))
            .with("ba", TagValue::ByteArray(vec![1, -2]))
            .with("ia", TagValue::IntArray(vec![-1]));
        let bytes = to_bytes(&root.into(), "root").unwrap();
        #[rustfmt::skip]
        let expected: Vec<u8> = vec![
            10, 0, 4, b'r', b'o', b'o', b't',
            8, 0, 1, b'n', 0, 2, 0xC3, 0xA9,
            7, 0, 2, b'b', b'a', 0, 0, 0, 2, 0x01, 0xFE,
            11, 0, 2, b'i', b'a', 0, 0, 0, 1, 0xFF, 0xFF, 0xFF, 0xFF,
            0,
        ];
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_list_payloads_have_no_headers() {
        let root = Compound::new()
            .with(
                "shorts",
                TagValue::List(TagKind::Short, vec![TagValue::Short(1), TagValue::Short(2)]),
            )
            .with("entities", TagValue::empty_list(TagKind::Compound))
            .with(
                "nested",
                TagValue::List(TagKind::Compound, vec![Compound::new().into()]),
            );
        let bytes = to_bytes(&root.into(), "").unwrap();
        #[rustfmt::skip]
        let expected: Vec<u8> = vec![
            10, 0, 0,
            9, 0, 6, b's', b'h', b'o', b'r', b't', b's', 2, 0, 0, 0, 2, 0, 1, 0, 2,
            9, 0, 8, b'e', b'n', b't', b'i', b't', b'i', b'e', b's', 10, 0, 0, 0, 0,
            9, 0, 6, b'n', b'e', b's', b't', b'e', b'd', 10, 0, 0, 0, 1, 0,
            0,
        ];
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_nested_named_empty_child() {
        let inner = Compound::new().with("Version", TagValue::Int(3));
        let root = Compound::new().with("", inner);
        let bytes = to_bytes(&root.into(), "").unwrap();
        assert_eq!(
            bytes,
            vec![10, 0, 0, 10, 0, 0, 3, 0, 7, b'V', b'e', b'r', b's', b'i', b'o', b'n', 0, 0, 0, 3, 0, 0]
        );
    }

    #[test]
    fn test_deterministic_output() {
        let root: TagValue = Compound::new()
            .with("Palette", Compound::new().with("minecraft:air", TagValue::Int(0)))
            .with("Data", TagValue::ByteArray(vec![0, 1, 2]))
            .into();
        assert_eq!(to_bytes(&root, "").unwrap(), to_bytes(&root, "").unwrap());
    }

    #[test]
    fn test_heterogeneous_list_rejected() {
        let root: TagValue = Compound::new()
            .with(
                "mixed",
                TagValue::List(TagKind::Int, vec![TagValue::Int(1), TagValue::Short(2)]),
            )
            .into();
        assert!(matches!(
            to_bytes(&root, ""),
            Err(Error::InvalidListElement {
                expected: TagKind::Int,
                found: TagKind::Short,
                index: 1
            })
        ));
    }

    #[test]
    fn test_unsupported_list_kind_rejected() {
        let root: TagValue = Compound::new()
            .with("floats", TagValue::empty_list(TagKind::Float))
            .into();
        assert!(matches!(
            to_bytes(&root, ""),
            Err(Error::UnsupportedTagKind {
                kind: TagKind::Float
            })
        ));
        let end_list: TagValue = Compound::new()
            .with("empty", TagValue::empty_list(TagKind::End))
            .into();
        assert!(to_bytes(&end_list, "").is_ok());
    }

    #[test]
    fn test_root_must_be_compound() {
        assert!(matches!(
            to_bytes(&TagValue::Int(1), ""),
            Err(Error::RootNotCompound { kind: TagKind::Int })
        ));
    }
}
