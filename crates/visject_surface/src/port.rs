// SPDX-License-Identifier: MIT OR Apache-2.0
//! Port ("box") definitions and the value types that flow through them.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortId(pub Uuid);

impl PortId {
    /// Create a new random port ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PortId {
    fn default() -> Self {
        Self::new()
    }
}

/// Port direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortDirection {
    /// Input port
    Input,
    /// Output port
    Output,
}

bitflags! {
    /// Kinds of values a generic (untyped) port accepts.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ConnectionsHint: u16 {
        /// Scalar values (bool, integers, floating point)
        const SCALAR = 1 << 0;
        /// Vector values (2 to 4 components, colors)
        const VECTOR = 1 << 1;
        /// Any scalar or vector value
        const NUMERIC = Self::SCALAR.bits() | Self::VECTOR.bits();
        /// Structure values
        const STRUCTURE = 1 << 2;
        /// Object references
        const OBJECT = 1 << 3;
        /// Anything at all
        const ANYTHING = 1 << 15;
    }
}

impl ConnectionsHint {
    /// Check whether a value of type `ty` matches this hint.
    ///
    /// An empty hint places no restriction.
    pub fn accepts(&self, ty: &PortType) -> bool {
        if self.is_empty() || self.contains(Self::ANYTHING) {
            return true;
        }
        (self.contains(Self::SCALAR) && ty.is_scalar())
            || (self.contains(Self::VECTOR) && ty.is_vector())
            || (self.contains(Self::STRUCTURE) && matches!(ty, PortType::Structure(_)))
            || (self.contains(Self::OBJECT) && matches!(ty, PortType::Object(_)))
    }
}

/// Value type carried by a port.
///
/// Built-in kinds are closed; reflected types are referenced by their fully
/// qualified name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortType {
    /// No type (generic port not yet typed, or undefined output)
    Null,
    /// No value
    Void,
    /// Boolean
    Bool,
    /// UTF-16 character
    Char,
    /// Unsigned 8-bit integer
    Byte,
    /// Signed 8-bit integer
    SByte,
    /// Signed 16-bit integer
    Int16,
    /// Unsigned 16-bit integer
    UInt16,
    /// Signed 32-bit integer
    Int,
    /// Unsigned 32-bit integer
    UInt,
    /// Signed 64-bit integer
    Int64,
    /// Unsigned 64-bit integer
    UInt64,
    /// 32-bit float
    Float,
    /// 64-bit float
    Double,
    /// 2-component float vector
    Float2,
    /// 3-component float vector
    Float3,
    /// 4-component float vector
    Float4,
    /// 2-component double vector
    Double2,
    /// 3-component double vector
    Double3,
    /// 4-component double vector
    Double4,
    /// 2-component real vector (precision depends on engine build)
    Vector2,
    /// 3-component real vector
    Vector3,
    /// 4-component real vector
    Vector4,
    /// RGBA color
    Color,
    /// Rotation quaternion
    Quaternion,
    /// Translation, orientation and scale
    Transform,
    /// Axis-aligned bounding box
    BoundingBox,
    /// String
    String,
    /// Reference to a scripting object
    Object(String),
    /// Reflected value structure
    Structure(String),
    /// Reflected enumeration
    Enum(String),
}

const BUILTIN_NAMES: &[(PortType, &str)] = &[
    (PortType::Void, "System.Void"),
    (PortType::Bool, "System.Boolean"),
    (PortType::Char, "System.Char"),
    (PortType::Byte, "System.Byte"),
    (PortType::SByte, "System.SByte"),
    (PortType::Int16, "System.Int16"),
    (PortType::UInt16, "System.UInt16"),
    (PortType::Int, "System.Int32"),
    (PortType::UInt, "System.UInt32"),
    (PortType::Int64, "System.Int64"),
    (PortType::UInt64, "System.UInt64"),
    (PortType::Float, "System.Single"),
    (PortType::Double, "System.Double"),
    (PortType::String, "System.String"),
    (PortType::Float2, "Engine.Float2"),
    (PortType::Float3, "Engine.Float3"),
    (PortType::Float4, "Engine.Float4"),
    (PortType::Double2, "Engine.Double2"),
    (PortType::Double3, "Engine.Double3"),
    (PortType::Double4, "Engine.Double4"),
    (PortType::Vector2, "Engine.Vector2"),
    (PortType::Vector3, "Engine.Vector3"),
    (PortType::Vector4, "Engine.Vector4"),
    (PortType::Color, "Engine.Color"),
    (PortType::Quaternion, "Engine.Quaternion"),
    (PortType::Transform, "Engine.Transform"),
    (PortType::BoundingBox, "Engine.BoundingBox"),
];

impl PortType {
    /// Look up a built-in type by its fully qualified name
    pub fn from_type_name(type_name: &str) -> Option<Self> {
        BUILTIN_NAMES
            .iter()
            .find(|(_, name)| *name == type_name)
            .map(|(ty, _)| ty.clone())
    }

    /// Fully qualified type name (empty for [`PortType::Null`])
    pub fn type_name(&self) -> &str {
        match self {
            Self::Null => "",
            Self::Object(name) | Self::Structure(name) | Self::Enum(name) => name,
            builtin => BUILTIN_NAMES
                .iter()
                .find(|(ty, _)| ty == builtin)
                .map_or("", |(_, name)| name),
        }
    }

    /// Short type name, without namespace
    pub fn name(&self) -> &str {
        short_name(self.type_name())
    }

    /// Number of scalar components this type decomposes into.
    ///
    /// 0 means the type is not numeric.
    pub fn component_count(&self) -> u32 {
        match self {
            Self::Bool
            | Self::Char
            | Self::Byte
            | Self::SByte
            | Self::Int16
            | Self::UInt16
            | Self::Int
            | Self::UInt
            | Self::Int64
            | Self::UInt64
            | Self::Float
            | Self::Double => 1,
            Self::Float2 | Self::Double2 | Self::Vector2 => 2,
            Self::Float3 | Self::Double3 | Self::Vector3 => 3,
            Self::Float4 | Self::Double4 | Self::Vector4 | Self::Color => 4,
            _ => 0,
        }
    }

    /// True for [`PortType::Null`]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// True for single-component numeric types
    pub fn is_scalar(&self) -> bool {
        self.component_count() == 1
    }

    /// True for 2-4 component vectors and colors
    pub fn is_vector(&self) -> bool {
        self.component_count() > 1
    }

    /// Check whether a value of type `source` may flow into a port of this type.
    ///
    /// `hint` restricts what a generic ([`PortType::Null`]) port accepts.
    pub fn can_cast_from(&self, source: &PortType, hint: ConnectionsHint) -> bool {
        if source.is_null() || matches!(source, Self::Void) || matches!(self, Self::Void) {
            return false;
        }
        if self == source {
            return true;
        }
        if self.is_null() {
            return hint.accepts(source);
        }

        // Numeric conversions, scalar splat, vector resize and color conversions
        matches!(
            (self.component_count(), source.component_count()),
            (1, 1) | (2..=4, 1..=4)
        )
    }
}

/// Strip the namespace (and nesting) from a fully qualified type name
pub fn short_name(type_name: &str) -> &str {
    type_name
        .rsplit(['.', '+'])
        .next()
        .unwrap_or(type_name)
}

/// A port on a node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Port {
    /// Unique port ID
    pub id: PortId,
    /// Box index on the owning node, stable across saves
    pub box_id: u32,
    /// Port name
    pub name: String,
    /// Port direction
    pub direction: PortDirection,
    /// Current data type
    pub port_type: PortType,
    /// Default value (for inputs)
    pub default_value: Option<PortValue>,
    /// Whether multiple connections are allowed
    pub multi_connect: bool,
}

impl Port {
    /// Create a new port
    pub fn new(
        id: PortId,
        box_id: u32,
        name: impl Into<String>,
        port_type: PortType,
        direction: PortDirection,
    ) -> Self {
        let multi_connect = direction == PortDirection::Output;
        Self {
            id,
            box_id,
            name: name.into(),
            direction,
            port_type,
            default_value: None,
            multi_connect,
        }
    }

    /// Create a new input port
    pub fn input(box_id: u32, name: impl Into<String>, port_type: PortType) -> Self {
        Self::new(PortId::new(), box_id, name, port_type, PortDirection::Input)
    }

    /// Create a new output port
    pub fn output(box_id: u32, name: impl Into<String>, port_type: PortType) -> Self {
        Self::new(PortId::new(), box_id, name, port_type, PortDirection::Output)
    }

    /// Set the default value
    pub fn with_default(mut self, value: PortValue) -> Self {
        self.default_value = Some(value);
        self
    }

    /// Copy of this port with a fresh ID, used when instancing archetype templates
    pub fn instantiate(&self) -> Self {
        Self {
            id: PortId::new(),
            ..self.clone()
        }
    }

    /// Check if a connection from this output to `input` is valid.
    ///
    /// `hint` is the connections hint of the node owning `input`.
    pub fn can_connect(&self, input: &Port, hint: ConnectionsHint) -> bool {
        if self.direction != PortDirection::Output || input.direction != PortDirection::Input {
            return false;
        }
        input.port_type.can_cast_from(&self.port_type, hint)
    }
}

/// Value that can be stored in a port
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PortValue {
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i32),
    /// Float
    Float(f32),
    /// 2D vector
    Float2([f32; 2]),
    /// 3D vector
    Float3([f32; 3]),
    /// 4D vector
    Float4([f32; 4]),
    /// String
    String(String),
}
