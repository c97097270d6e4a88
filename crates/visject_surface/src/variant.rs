// SPDX-License-Identifier: MIT OR Apache-2.0
//! Compact variant type tags.
//!
//! A value type is written as a one byte tag. Reflected types (objects,
//! structures, enums) follow the tag with their fully qualified name.

use crate::layout::codec;
use crate::port::PortType;
use bincode::Options;
use std::io::{Read, Write};

/// Upper bound for a serialized type name, including its length prefix
const MAX_TYPE_NAME_BYTES: u64 = 1024;

/// Error while reading or writing a variant type tag
#[derive(Debug, thiserror::Error)]
pub enum VariantError {
    /// Tag byte does not name a known type
    #[error("Unknown variant type tag: {0}")]
    UnknownTag(u8),

    /// Underlying encoding error
    #[error("Variant type encoding failed: {0}")]
    Encoding(#[from] bincode::Error),
}

mod tag {
    pub const NULL: u8 = 0;
    pub const VOID: u8 = 1;
    pub const BOOL: u8 = 2;
    pub const INT: u8 = 3;
    pub const UINT: u8 = 4;
    pub const INT64: u8 = 5;
    pub const UINT64: u8 = 6;
    pub const FLOAT: u8 = 7;
    pub const DOUBLE: u8 = 8;
    pub const STRING: u8 = 10;
    pub const OBJECT: u8 = 11;
    pub const STRUCTURE: u8 = 12;
    pub const ENUM: u8 = 15;
    pub const FLOAT2: u8 = 16;
    pub const FLOAT3: u8 = 17;
    pub const FLOAT4: u8 = 18;
    pub const COLOR: u8 = 19;
    pub const BOUNDING_BOX: u8 = 21;
    pub const QUATERNION: u8 = 23;
    pub const TRANSFORM: u8 = 24;
    pub const INT16: u8 = 35;
    pub const UINT16: u8 = 36;
    pub const DOUBLE2: u8 = 37;
    pub const DOUBLE3: u8 = 38;
    pub const DOUBLE4: u8 = 39;
    pub const CHAR: u8 = 40;
    pub const BYTE: u8 = 41;
    pub const SBYTE: u8 = 42;
    pub const VECTOR2: u8 = 43;
    pub const VECTOR3: u8 = 44;
    pub const VECTOR4: u8 = 45;
}

fn tag_of(ty: &PortType) -> u8 {
    match ty {
        PortType::Null => tag::NULL,
        PortType::Void => tag::VOID,
        PortType::Bool => tag::BOOL,
        PortType::Char => tag::CHAR,
        PortType::Byte => tag::BYTE,
        PortType::SByte => tag::SBYTE,
        PortType::Int16 => tag::INT16,
        PortType::UInt16 => tag::UINT16,
        PortType::Int => tag::INT,
        PortType::UInt => tag::UINT,
        PortType::Int64 => tag::INT64,
        PortType::UInt64 => tag::UINT64,
        PortType::Float => tag::FLOAT,
        PortType::Double => tag::DOUBLE,
        PortType::Float2 => tag::FLOAT2,
        PortType::Float3 => tag::FLOAT3,
        PortType::Float4 => tag::FLOAT4,
        PortType::Double2 => tag::DOUBLE2,
        PortType::Double3 => tag::DOUBLE3,
        PortType::Double4 => tag::DOUBLE4,
        PortType::Vector2 => tag::VECTOR2,
        PortType::Vector3 => tag::VECTOR3,
        PortType::Vector4 => tag::VECTOR4,
        PortType::Color => tag::COLOR,
        PortType::Quaternion => tag::QUATERNION,
        PortType::Transform => tag::TRANSFORM,
        PortType::BoundingBox => tag::BOUNDING_BOX,
        PortType::String => tag::STRING,
        PortType::Object(_) => tag::OBJECT,
        PortType::Structure(_) => tag::STRUCTURE,
        PortType::Enum(_) => tag::ENUM,
    }
}

/// Write the tag (and type name, for reflected types) of `ty`
pub fn write_variant_type<W: Write>(writer: &mut W, ty: &PortType) -> Result<(), VariantError> {
    codec().serialize_into(&mut *writer, &tag_of(ty))?;
    if let PortType::Object(name) | PortType::Structure(name) | PortType::Enum(name) = ty {
        codec().serialize_into(&mut *writer, name)?;
    }
    Ok(())
}

/// Read a type previously written with [`write_variant_type`]
pub fn read_variant_type<R: Read>(reader: &mut R) -> Result<PortType, VariantError> {
    let tag: u8 = codec().deserialize_from(&mut *reader)?;
    let ty = match tag {
        tag::NULL => PortType::Null,
        tag::VOID => PortType::Void,
        tag::BOOL => PortType::Bool,
        tag::CHAR => PortType::Char,
        tag::BYTE => PortType::Byte,
        tag::SBYTE => PortType::SByte,
        tag::INT16 => PortType::Int16,
        tag::UINT16 => PortType::UInt16,
        tag::INT => PortType::Int,
        tag::UINT => PortType::UInt,
        tag::INT64 => PortType::Int64,
        tag::UINT64 => PortType::UInt64,
        tag::FLOAT => PortType::Float,
        tag::DOUBLE => PortType::Double,
        tag::FLOAT2 => PortType::Float2,
        tag::FLOAT3 => PortType::Float3,
        tag::FLOAT4 => PortType::Float4,
        tag::DOUBLE2 => PortType::Double2,
        tag::DOUBLE3 => PortType::Double3,
        tag::DOUBLE4 => PortType::Double4,
        tag::VECTOR2 => PortType::Vector2,
        tag::VECTOR3 => PortType::Vector3,
        tag::VECTOR4 => PortType::Vector4,
        tag::COLOR => PortType::Color,
        tag::QUATERNION => PortType::Quaternion,
        tag::TRANSFORM => PortType::Transform,
        tag::BOUNDING_BOX => PortType::BoundingBox,
        tag::STRING => PortType::String,
        tag::OBJECT => PortType::Object(read_type_name(reader)?),
        tag::STRUCTURE => PortType::Structure(read_type_name(reader)?),
        tag::ENUM => PortType::Enum(read_type_name(reader)?),
        unknown => return Err(VariantError::UnknownTag(unknown)),
    };
    Ok(ty)
}

fn read_type_name<R: Read>(reader: &mut R) -> Result<String, VariantError> {
    Ok(codec()
        .with_limit(MAX_TYPE_NAME_BYTES)
        .deserialize_from(&mut *reader)?)
}
