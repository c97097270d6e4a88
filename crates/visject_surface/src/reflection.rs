// SPDX-License-Identifier: MIT OR Apache-2.0
//! Reflected type information used to shape structure nodes.
//!
//! The surface never inspects types itself. It asks a [`TypeIntrospector`] to
//! resolve a type name and to list the public instance fields of the result.
//! [`TypeRegistry`] is the default implementation, filled by explicit
//! registration or from a RON document.

use crate::layout::FieldLayoutEntry;
use crate::port::{short_name, PortType};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Kind of a reflected member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MemberKind {
    /// Data field
    #[default]
    Field,
    /// Accessor property
    Property,
    /// Method
    Method,
}

/// A member of a reflected type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberDescriptor {
    /// Member name
    pub name: String,
    /// Value type (return type for methods)
    pub value_type: PortType,
    /// Member kind
    #[serde(default)]
    pub kind: MemberKind,
    /// Visible outside the declaring type
    #[serde(default = "default_true")]
    pub is_public: bool,
    /// Belongs to the type rather than to instances
    #[serde(default)]
    pub is_static: bool,
}

fn default_true() -> bool {
    true
}

impl MemberDescriptor {
    /// Public instance field
    pub fn field(name: impl Into<String>, value_type: PortType) -> Self {
        Self {
            name: name.into(),
            value_type,
            kind: MemberKind::Field,
            is_public: true,
            is_static: false,
        }
    }

    /// Mark the member as private
    pub fn private(mut self) -> Self {
        self.is_public = false;
        self
    }

    /// Mark the member as static
    pub fn static_member(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Change the member kind
    pub fn with_kind(mut self, kind: MemberKind) -> Self {
        self.kind = kind;
        self
    }

    fn is_public_instance_field(&self) -> bool {
        self.kind == MemberKind::Field && self.is_public && !self.is_static
    }
}

/// Reflected description of a type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDescriptor {
    /// Fully qualified type name
    pub full_name: String,
    /// Documentation shown in tooltips
    #[serde(default)]
    pub description: Option<String>,
    /// Members in declaration order
    #[serde(default)]
    pub members: Vec<MemberDescriptor>,
}

impl TypeDescriptor {
    /// Create a descriptor without members
    pub fn new(full_name: impl Into<String>) -> Self {
        Self {
            full_name: full_name.into(),
            description: None,
            members: Vec::new(),
        }
    }

    /// Set the documentation text
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Append a member
    pub fn with_member(mut self, member: MemberDescriptor) -> Self {
        self.members.push(member);
        self
    }

    /// Append a public instance field
    pub fn with_field(self, name: impl Into<String>, value_type: PortType) -> Self {
        self.with_member(MemberDescriptor::field(name, value_type))
    }

    /// Short type name
    pub fn name(&self) -> &str {
        short_name(&self.full_name)
    }

    /// Port type carrying values of this type
    pub fn port_type(&self) -> PortType {
        PortType::from_type_name(&self.full_name)
            .unwrap_or_else(|| PortType::Structure(self.full_name.clone()))
    }

    /// Human readable description for tooltips
    pub fn describe(&self) -> String {
        match &self.description {
            Some(text) if !text.is_empty() => format!("{}\n{}", self.full_name, text),
            _ => self.full_name.clone(),
        }
    }

    /// Public instance fields in declaration order
    pub fn public_instance_fields(&self) -> impl Iterator<Item = FieldLayoutEntry> + '_ {
        self.members
            .iter()
            .filter(|m| m.is_public_instance_field())
            .map(|m| FieldLayoutEntry::new(m.name.clone(), m.value_type.clone()))
    }
}

/// Source of reflected type information
pub trait TypeIntrospector {
    /// Resolve a fully qualified type name
    fn resolve(&self, type_name: &str) -> Option<&TypeDescriptor>;

    /// Public instance fields of `ty`, in declaration order
    fn fields(&self, ty: &TypeDescriptor) -> Vec<FieldLayoutEntry> {
        ty.public_instance_fields().collect()
    }
}

/// Error when building a type registry
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Type name registered twice
    #[error("Type already registered: {0}")]
    Duplicate(String),

    /// Registry document could not be parsed
    #[error("Invalid type registry: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Registry file could not be read
    #[error("Failed to read type registry: {0}")]
    Io(#[from] std::io::Error),
}

/// Set of currently loaded reflectable types
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: IndexMap<String, TypeDescriptor>,
}

impl TypeRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-filled with the engine math types
    pub fn with_engine_types() -> Self {
        let mut registry = Self::new();
        for ty in engine_types() {
            registry.types.insert(ty.full_name.clone(), ty);
        }
        registry
    }

    /// Register a type
    pub fn register(&mut self, ty: TypeDescriptor) -> Result<(), RegistryError> {
        if self.types.contains_key(&ty.full_name) {
            return Err(RegistryError::Duplicate(ty.full_name));
        }
        tracing::trace!("Registered type {}", ty.full_name);
        self.types.insert(ty.full_name.clone(), ty);
        Ok(())
    }

    /// Remove a type, as when the module declaring it unloads
    pub fn unregister(&mut self, type_name: &str) -> Option<TypeDescriptor> {
        self.types.shift_remove(type_name)
    }

    /// All registered types in registration order
    pub fn types(&self) -> impl Iterator<Item = &TypeDescriptor> {
        self.types.values()
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// True when no types are registered
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Register every type listed in a RON document
    pub fn extend_from_ron(&mut self, s: &str) -> Result<usize, RegistryError> {
        let types: Vec<TypeDescriptor> = ron::from_str(s)?;
        let count = types.len();
        for ty in types {
            self.register(ty)?;
        }
        Ok(count)
    }

    /// Register every type listed in a RON file
    pub fn extend_from_file(&mut self, path: &Path) -> Result<usize, RegistryError> {
        let contents = std::fs::read_to_string(path)?;
        self.extend_from_ron(&contents)
    }
}

impl TypeIntrospector for TypeRegistry {
    fn resolve(&self, type_name: &str) -> Option<&TypeDescriptor> {
        if type_name.is_empty() {
            return None;
        }
        self.types.get(type_name)
    }
}

fn vector_type(ty: &PortType, component: &PortType, names: &[&str]) -> TypeDescriptor {
    names
        .iter()
        .fold(TypeDescriptor::new(ty.type_name()), |desc, name| {
            desc.with_field(*name, component.clone())
        })
}

fn engine_types() -> Vec<TypeDescriptor> {
    vec![
        vector_type(&PortType::Float2, &PortType::Float, &["X", "Y"]),
        vector_type(&PortType::Float3, &PortType::Float, &["X", "Y", "Z"]),
        vector_type(&PortType::Float4, &PortType::Float, &["X", "Y", "Z", "W"]),
        vector_type(&PortType::Double2, &PortType::Double, &["X", "Y"]),
        vector_type(&PortType::Double3, &PortType::Double, &["X", "Y", "Z"]),
        vector_type(&PortType::Double4, &PortType::Double, &["X", "Y", "Z", "W"]),
        vector_type(&PortType::Color, &PortType::Float, &["R", "G", "B", "A"]),
        vector_type(&PortType::Quaternion, &PortType::Float, &["X", "Y", "Z", "W"]),
        TypeDescriptor::new(PortType::Transform.type_name())
            .with_field("Translation", PortType::Vector3)
            .with_field("Orientation", PortType::Quaternion)
            .with_field("Scale", PortType::Float3),
        TypeDescriptor::new(PortType::BoundingBox.type_name())
            .with_field("Minimum", PortType::Vector3)
            .with_field("Maximum", PortType::Vector3),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_instance_fields_only() {
        let ty = TypeDescriptor::new("Game.Payload")
            .with_field("x", PortType::Float)
            .with_member(MemberDescriptor::field("secret", PortType::Int).private())
            .with_member(MemberDescriptor::field("Count", PortType::Int).static_member())
            .with_member(
                MemberDescriptor::field("Length", PortType::Float).with_kind(MemberKind::Property),
            )
            .with_field("y", PortType::Float);

        let mut registry = TypeRegistry::new();
        registry.register(ty).unwrap();

        let resolved = registry.resolve("Game.Payload").unwrap();
        let names: Vec<_> = registry.fields(resolved).into_iter().map(|f| f.name).collect();
        assert_eq!(names, ["x", "y"]);
        assert_eq!(resolved.name(), "Payload");
        assert_eq!(resolved.port_type(), PortType::Structure("Game.Payload".into()));
    }

    #[test]
    fn test_duplicate_and_unregister() {
        let mut registry = TypeRegistry::new();
        registry.register(TypeDescriptor::new("Game.A")).unwrap();
        assert!(matches!(
            registry.register(TypeDescriptor::new("Game.A")),
            Err(RegistryError::Duplicate(_))
        ));
        assert!(registry.unregister("Game.A").is_some());
        assert!(registry.resolve("Game.A").is_none());
        assert!(registry.resolve("").is_none());
    }

    #[test]
    fn test_engine_types_resolve_to_builtins() {
        let registry = TypeRegistry::with_engine_types();
        let float3 = registry.resolve("Engine.Float3").unwrap();
        assert_eq!(float3.port_type(), PortType::Float3);
        assert_eq!(registry.fields(float3).len(), 3);
    }

    #[test]
    fn test_load_from_ron() {
        let doc = r#"[
            (
                full_name: "Game.Hit",
                description: Some("Result of a ray cast"),
                members: [
                    (name: "Point", value_type: Vector3),
                    (name: "Distance", value_type: Float),
                    (name: "cache", value_type: Int, is_public: false),
                ],
            ),
        ]"#;
        let mut registry = TypeRegistry::new();
        assert_eq!(registry.extend_from_ron(doc).unwrap(), 1);

        let hit = registry.resolve("Game.Hit").unwrap();
        assert_eq!(hit.describe(), "Game.Hit\nResult of a ray cast");
        assert_eq!(registry.fields(hit).len(), 2);
    }
}
