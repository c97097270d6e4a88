// SPDX-License-Identifier: MIT OR Apache-2.0
//! Binary structure layout cached inside structure nodes.
//!
//! The layout lets a saved graph rebuild the ports of a Pack/Unpack node when
//! the structure type itself cannot be resolved. Byte format (little endian):
//!
//! ```text
//! empty layout: zero bytes
//! otherwise:
//!     u8        version = 1
//!     i32       field count
//!     per field:
//!         [u8; 11]  name, UTF-8, truncated or zero padded
//!         tag       value type (see `variant`)
//! ```

use crate::port::PortType;
use crate::variant::{self, VariantError};
use bincode::Options;
use serde::{Deserialize, Serialize};

/// Current layout format version
pub const LAYOUT_VERSION: u8 = 1;

/// Fixed width of a field name in the encoded layout
pub const FIELD_NAME_SLOT: usize = 11;

/// Smallest possible encoded field: a name slot and a one byte tag
const MIN_FIELD_BYTES: usize = FIELD_NAME_SLOT + 1;

/// Bincode configuration shared by the layout and variant codecs
pub(crate) fn codec() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
        .allow_trailing_bytes()
}

/// Error while encoding or decoding a layout
#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    /// First byte is not a supported version
    #[error("Unsupported layout version: {0}")]
    UnsupportedVersion(u8),

    /// Field count is negative or larger than the data can hold
    #[error("Invalid field count: {0}")]
    InvalidFieldCount(i64),

    /// Field name is not valid UTF-8
    #[error("Field name at index {0} is not valid UTF-8")]
    InvalidName(usize),

    /// Value type tag could not be read or written
    #[error(transparent)]
    Variant(#[from] VariantError),

    /// Input ended early or could not be written
    #[error("Layout encoding failed: {0}")]
    Encoding(#[from] bincode::Error),
}

/// One structure field: name and value type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldLayoutEntry {
    /// Field name
    pub name: String,
    /// Field value type
    pub value_type: PortType,
}

impl FieldLayoutEntry {
    /// Create a new field entry
    pub fn new(name: impl Into<String>, value_type: PortType) -> Self {
        Self {
            name: name.into(),
            value_type,
        }
    }
}

/// Ordered field layout of a structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructureLayout {
    /// Format version the layout was read with
    pub version: u8,
    /// Fields in declaration order
    pub fields: Vec<FieldLayoutEntry>,
}

impl StructureLayout {
    /// Create a layout with the current version
    pub fn new(fields: Vec<FieldLayoutEntry>) -> Self {
        Self {
            version: LAYOUT_VERSION,
            fields,
        }
    }

    /// Encode this layout
    pub fn encode(&self) -> Result<Vec<u8>, LayoutError> {
        encode(&self.fields)
    }

    /// True when the layout has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Default for StructureLayout {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

/// True when `bytes` hold a layout this version can decode
pub fn is_recognized(bytes: &[u8]) -> bool {
    bytes.first() == Some(&LAYOUT_VERSION)
}

/// Encode an ordered field list.
///
/// An empty list encodes to zero bytes.
pub fn encode(fields: &[FieldLayoutEntry]) -> Result<Vec<u8>, LayoutError> {
    if fields.is_empty() {
        return Ok(Vec::new());
    }
    let count = i32::try_from(fields.len())
        .map_err(|_| LayoutError::InvalidFieldCount(fields.len() as i64))?;

    let mut bytes = Vec::with_capacity(5 + fields.len() * (MIN_FIELD_BYTES + 1));
    codec().serialize_into(&mut bytes, &LAYOUT_VERSION)?;
    codec().serialize_into(&mut bytes, &count)?;
    for field in fields {
        codec().serialize_into(&mut bytes, &name_slot(&field.name))?;
        variant::write_variant_type(&mut bytes, &field.value_type)?;
    }
    Ok(bytes)
}

/// Decode a layout.
///
/// Zero bytes decode to an empty layout. Anything else must start with
/// [`LAYOUT_VERSION`].
pub fn decode(bytes: &[u8]) -> Result<StructureLayout, LayoutError> {
    if bytes.is_empty() {
        return Ok(StructureLayout::default());
    }

    let mut reader = bytes;
    let version: u8 = codec().deserialize_from(&mut reader)?;
    if version != LAYOUT_VERSION {
        return Err(LayoutError::UnsupportedVersion(version));
    }
    let count: i32 = codec().deserialize_from(&mut reader)?;
    let count = usize::try_from(count).map_err(|_| LayoutError::InvalidFieldCount(count.into()))?;
    if count > reader.len() / MIN_FIELD_BYTES {
        return Err(LayoutError::InvalidFieldCount(count as i64));
    }

    let mut fields = Vec::with_capacity(count);
    for index in 0..count {
        let slot: [u8; FIELD_NAME_SLOT] = codec().deserialize_from(&mut reader)?;
        let name = read_name_slot(&slot).ok_or(LayoutError::InvalidName(index))?;
        let value_type = variant::read_variant_type(&mut reader)?;
        fields.push(FieldLayoutEntry { name, value_type });
    }

    Ok(StructureLayout { version, fields })
}

/// Truncate `name` to the slot width on a character boundary and zero pad it
fn name_slot(name: &str) -> [u8; FIELD_NAME_SLOT] {
    let mut end = name.len().min(FIELD_NAME_SLOT);
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    let mut slot = [0u8; FIELD_NAME_SLOT];
    slot[..end].copy_from_slice(&name.as_bytes()[..end]);
    slot
}

fn read_name_slot(slot: &[u8; FIELD_NAME_SLOT]) -> Option<String> {
    let len = slot.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    String::from_utf8(slot[..len].to_vec()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn xy() -> Vec<FieldLayoutEntry> {
        vec![
            FieldLayoutEntry::new("x", PortType::Float),
            FieldLayoutEntry::new("y", PortType::Float),
        ]
    }

    #[test]
    fn test_roundtrip() {
        let fields = vec![
            FieldLayoutEntry::new("Position", PortType::Vector3),
            FieldLayoutEntry::new("Tint", PortType::Color),
            FieldLayoutEntry::new("Owner", PortType::Object("Game.Actor".into())),
            FieldLayoutEntry::new("exactly11ch", PortType::Structure("Game.Inner".into())),
        ];
        let bytes = encode(&fields).unwrap();
        let layout = decode(&bytes).unwrap();
        assert_eq!(layout.version, LAYOUT_VERSION);
        assert_eq!(layout.fields, fields);
    }

    #[test]
    fn test_byte_layout() {
        let bytes = encode(&xy()).unwrap();
        // version + count + 2 * (name slot + tag)
        assert_eq!(bytes.len(), 1 + 4 + 2 * (FIELD_NAME_SLOT + 1));
        assert_eq!(bytes[0], LAYOUT_VERSION);
        assert_eq!(&bytes[1..5], &2i32.to_le_bytes());
        assert_eq!(bytes[5], b'x');
        assert!(bytes[6..5 + FIELD_NAME_SLOT].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_empty_layout() {
        assert!(encode(&[]).unwrap().is_empty());
        assert!(decode(&[]).unwrap().is_empty());
        assert!(StructureLayout::default().encode().unwrap().is_empty());

        // A header with zero fields is a distinct encoding of the same layout
        let mut header = vec![LAYOUT_VERSION];
        header.extend_from_slice(&0i32.to_le_bytes());
        assert!(decode(&header).unwrap().is_empty());
    }

    #[test]
    fn test_long_names_truncate() {
        let fields = vec![FieldLayoutEntry::new("abcdefghijklmnop", PortType::Int)];
        let layout = decode(&encode(&fields).unwrap()).unwrap();
        assert_eq!(layout.fields[0].name, "abcdefghijk");
        assert_eq!(layout.fields[0].name.len(), FIELD_NAME_SLOT);
        assert_eq!(layout.fields[0].value_type, PortType::Int);
    }

    #[test]
    fn test_truncation_keeps_utf8_valid() {
        // 'é' is two bytes and straddles the slot boundary
        let fields = vec![FieldLayoutEntry::new("abcdefghijé", PortType::Bool)];
        let layout = decode(&encode(&fields).unwrap()).unwrap();
        assert_eq!(layout.fields[0].name, "abcdefghij");
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(matches!(decode(&[2, 0, 0, 0, 0]), Err(LayoutError::UnsupportedVersion(2))));
        assert!(!is_recognized(&[2]));
        assert!(!is_recognized(&[]));

        let mut negative = vec![LAYOUT_VERSION];
        negative.extend_from_slice(&(-1i32).to_le_bytes());
        assert!(matches!(decode(&negative), Err(LayoutError::InvalidFieldCount(-1))));

        let mut huge = vec![LAYOUT_VERSION];
        huge.extend_from_slice(&i32::MAX.to_le_bytes());
        assert!(matches!(decode(&huge), Err(LayoutError::InvalidFieldCount(_))));

        let bytes = encode(&xy()).unwrap();
        assert!(decode(&bytes[..bytes.len() - 1]).is_err());
    }
}
