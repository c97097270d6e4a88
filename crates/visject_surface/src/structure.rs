// SPDX-License-Identifier: MIT OR Apache-2.0
//! Structure Pack/Unpack nodes.
//!
//! A structure node has one aggregate port (box 0) carrying the whole
//! structure and one port per public field (boxes 1..=N). Ports are built from
//! the live type when it resolves, otherwise from the layout cached in the
//! node's values the last time it did.

use crate::layout::{self, FieldLayoutEntry};
use crate::node::Node;
use crate::port::Port;
use crate::reflection::TypeIntrospector;
use crate::style::SurfaceStyle;

/// Box index of the aggregate structure port
pub const AGGREGATE_BOX: u32 = 0;

/// Highest number of field ports a structure node carries
pub const MAX_FIELD_BOXES: u32 = 32;

/// Services needed to load nodes
#[derive(Clone, Copy)]
pub struct LoadContext<'a> {
    /// Resolves structure types
    pub types: &'a dyn TypeIntrospector,
    /// Node sizing metrics
    pub style: &'a SurfaceStyle,
}

impl<'a> LoadContext<'a> {
    /// Create a load context
    pub fn new(types: &'a dyn TypeIntrospector, style: &'a SurfaceStyle) -> Self {
        Self { types, style }
    }
}

/// How a structure node obtained its ports during load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructureLoad {
    /// Type resolved; ports match its fields and the cache was refreshed
    Resolved {
        /// Number of public instance fields
        fields: usize,
    },
    /// Type missing; ports rebuilt from the cached layout
    FromCache {
        /// Number of cached fields
        fields: usize,
    },
    /// Type missing and no usable cache; ports left as they were
    Unresolved,
}

/// Make the node's field ports match `fields`.
///
/// Ports already present at a field's box index are kept as they are, so
/// their connections survive a reload. Field ports past the end of `fields`
/// are removed. Field ports are outputs when unpacking and inputs when
/// packing.
pub fn sync_ports(
    node: &mut Node,
    unpacking: bool,
    fields: &[FieldLayoutEntry],
    style: &SurfaceStyle,
) {
    if fields.len() > MAX_FIELD_BOXES as usize {
        tracing::warn!(
            "Structure node {:?} has {} fields, only {} get ports",
            node.id,
            fields.len(),
            MAX_FIELD_BOXES
        );
    }

    let mut last_box = AGGREGATE_BOX;
    for (box_id, field) in (AGGREGATE_BOX + 1..=MAX_FIELD_BOXES).zip(fields) {
        last_box = box_id;
        if node.get_box(box_id).is_some() {
            continue;
        }
        let port = if unpacking {
            Port::output(box_id, field.name.clone(), field.value_type.clone())
        } else {
            Port::input(box_id, field.name.clone(), field.value_type.clone())
        };
        tracing::trace!("Adding box {} '{}' to {:?}", box_id, field.name, node.id);
        node.add_box(port);
    }

    for box_id in last_box + 1..=MAX_FIELD_BOXES {
        if let Some(stale) = node.remove_box(box_id) {
            tracing::trace!("Removed stale box {} '{}' from {:?}", box_id, stale.name, node.id);
        }
    }

    node.resize_to_fit(style);
}

/// Run the load lifecycle of a structure node.
///
/// Resolves the declared type, updates title and tooltip, rebuilds the field
/// ports and refreshes the cached layout. When the type is missing the cached
/// layout is used instead. Never fails: an unusable cache leaves the ports
/// untouched. The node is resized in every case.
pub fn load(node: &mut Node, unpacking: bool, ctx: &LoadContext<'_>) -> StructureLoad {
    let prefix = if unpacking { "Unpack " } else { "Pack " };
    let Some(state) = node.values.structure() else {
        node.resize_to_fit(ctx.style);
        return StructureLoad::Unresolved;
    };
    let type_name = state.type_name.clone();

    let outcome = match ctx.types.resolve(&type_name) {
        Some(ty) => {
            node.title = format!("{prefix}{}", ty.name());
            node.tooltip = Some(ty.describe());
            node.set_box_type(AGGREGATE_BOX, ty.port_type());

            let fields = ctx.types.fields(ty);
            sync_ports(node, unpacking, &fields, ctx.style);

            let cached_layout = layout::encode(&fields).unwrap_or_else(|err| {
                tracing::warn!("Failed to cache layout of {}: {}", type_name, err);
                Vec::new()
            });
            if let Some(state) = node.values.structure_mut() {
                state.cached_layout = cached_layout;
            }
            tracing::debug!("Resolved {} with {} fields", type_name, fields.len());
            StructureLoad::Resolved {
                fields: fields.len(),
            }
        }
        None => {
            node.title = format!("{prefix}{type_name}");
            node.tooltip = Some(type_name.clone());
            load_cached(node, unpacking, &type_name, ctx)
        }
    };

    node.resize_to_fit(ctx.style);
    outcome
}

fn load_cached(
    node: &mut Node,
    unpacking: bool,
    type_name: &str,
    ctx: &LoadContext<'_>,
) -> StructureLoad {
    let decoded = match node.values.structure() {
        Some(state) if layout::is_recognized(&state.cached_layout) => {
            layout::decode(&state.cached_layout)
        }
        _ => {
            tracing::debug!("Type {} not found and no cached layout", type_name);
            return StructureLoad::Unresolved;
        }
    };

    match decoded {
        Ok(cached) => {
            sync_ports(node, unpacking, &cached.fields, ctx.style);
            tracing::debug!(
                "Type {} not found, restored {} fields from cache",
                type_name,
                cached.fields.len()
            );
            StructureLoad::FromCache {
                fields: cached.fields.len(),
            }
        }
        Err(err) => {
            tracing::debug!("Ignoring cached layout of {}: {}", type_name, err);
            StructureLoad::Unresolved
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{NodeArchetype, NodeKind, NodeValues, StructureNodeState};
    use crate::port::{PortDirection, PortId, PortType};
    use crate::reflection::{TypeDescriptor, TypeRegistry};

    fn structure_arch(unpacking: bool, type_name: &str) -> NodeArchetype {
        let (kind, aggregate) = if unpacking {
            (NodeKind::UnpackStructure, Port::input(AGGREGATE_BOX, "", PortType::Null))
        } else {
            (NodeKind::PackStructure, Port::output(AGGREGATE_BOX, "", PortType::Null))
        };
        NodeArchetype::fixed(26, "Pack Structure", "", [180.0, 20.0], vec![aggregate])
            .with_kind(kind)
            .with_values(NodeValues::Structure(StructureNodeState::new(type_name)))
    }

    fn fields(names: &[&str]) -> Vec<FieldLayoutEntry> {
        names
            .iter()
            .map(|name| FieldLayoutEntry::new(*name, PortType::Float))
            .collect()
    }

    fn box_ids(node: &Node) -> Vec<(u32, PortId)> {
        let mut ids: Vec<_> = node.ports().map(|p| (p.box_id, p.id)).collect();
        ids.sort_by_key(|(box_id, _)| *box_id);
        ids
    }

    fn point_registry() -> TypeRegistry {
        let mut types = TypeRegistry::new();
        types
            .register(
                TypeDescriptor::new("Game.Point")
                    .with_description("A 2D point")
                    .with_field("x", PortType::Float)
                    .with_field("y", PortType::Float),
            )
            .unwrap();
        types
    }

    #[test]
    fn test_sync_is_idempotent() {
        let style = SurfaceStyle::default();
        let mut node = Node::new(&structure_arch(false, "Game.Point"));
        sync_ports(&mut node, false, &fields(&["a", "b"]), &style);
        let first = box_ids(&node);
        sync_ports(&mut node, false, &fields(&["a", "b"]), &style);
        assert_eq!(box_ids(&node), first);
        assert_eq!(first.len(), 3);
    }

    #[test]
    fn test_sync_preserves_existing_ports() {
        let style = SurfaceStyle::default();
        let mut node = Node::new(&structure_arch(false, "Game.Point"));
        sync_ports(&mut node, false, &fields(&["A", "B", "C"]), &style);
        let before = box_ids(&node);

        sync_ports(&mut node, false, &fields(&["A", "B", "C", "D"]), &style);
        let after = box_ids(&node);
        assert_eq!(&after[..before.len()], &before[..]);
        assert_eq!(after.len(), before.len() + 1);
        assert_eq!(node.get_box(4).unwrap().name, "D");
    }

    #[test]
    fn test_sync_prunes_removed_fields() {
        let style = SurfaceStyle::default();
        let mut node = Node::new(&structure_arch(true, "Game.Point"));
        sync_ports(&mut node, true, &fields(&["A", "B", "C"]), &style);
        let a = node.get_box(1).unwrap().id;

        sync_ports(&mut node, true, &fields(&["A"]), &style);
        assert_eq!(node.get_box(1).unwrap().id, a);
        assert!(node.get_box(2).is_none());
        assert!(node.get_box(3).is_none());
        assert!(node.get_box(AGGREGATE_BOX).is_some());

        sync_ports(&mut node, true, &[], &style);
        assert_eq!(node.ports().count(), 1);
    }

    #[test]
    fn test_sync_direction_and_cap() {
        let style = SurfaceStyle::default();
        let names: Vec<String> = (0..40).map(|i| format!("f{i}")).collect();
        let many: Vec<_> = names
            .iter()
            .map(|name| FieldLayoutEntry::new(name.clone(), PortType::Int))
            .collect();

        let mut node = Node::new(&structure_arch(true, "Game.Big"));
        sync_ports(&mut node, true, &many, &style);
        assert_eq!(node.outputs.len(), MAX_FIELD_BOXES as usize);
        assert!(node
            .outputs
            .iter()
            .all(|p| p.direction == PortDirection::Output));
        assert_eq!(node.inputs.len(), 1);
    }

    #[test]
    fn test_load_resolved_pack() {
        let types = point_registry();
        let style = SurfaceStyle::default();
        let ctx = LoadContext::new(&types, &style);
        let mut node = Node::new(&structure_arch(false, "Game.Point"));

        assert_eq!(load(&mut node, false, &ctx), StructureLoad::Resolved { fields: 2 });
        assert_eq!(node.title, "Pack Point");
        assert_eq!(node.tooltip.as_deref(), Some("Game.Point\nA 2D point"));

        let aggregate = node.get_box(AGGREGATE_BOX).unwrap();
        assert_eq!(aggregate.direction, PortDirection::Output);
        assert_eq!(aggregate.port_type, PortType::Structure("Game.Point".into()));

        let names: Vec<_> = node.inputs.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["x", "y"]);

        let cached = &node.values.structure().unwrap().cached_layout;
        assert_eq!(layout::decode(cached).unwrap().fields, fields(&["x", "y"]));
        assert_eq!(node.size[1], style.header_height + 2.0 * style.box_row_height);
    }

    #[test]
    fn test_load_empty_type_clears_cache() {
        let mut types = TypeRegistry::new();
        types.register(TypeDescriptor::new("Game.Empty")).unwrap();
        let style = SurfaceStyle::default();
        let ctx = LoadContext::new(&types, &style);

        let mut node = Node::new(&structure_arch(true, "Game.Empty"));
        let stale = layout::encode(&fields(&["old"])).unwrap();
        node.values.structure_mut().unwrap().cached_layout = stale;
        sync_ports(&mut node, true, &fields(&["old"]), &style);

        assert_eq!(load(&mut node, true, &ctx), StructureLoad::Resolved { fields: 0 });
        assert_eq!(node.title, "Unpack Empty");
        assert!(node.values.structure().unwrap().cached_layout.is_empty());
        assert_eq!(node.ports().count(), 1);
    }

    #[test]
    fn test_load_falls_back_to_cache() {
        let style = SurfaceStyle::default();
        let mut node = Node::new(&structure_arch(true, "Game.Point"));
        {
            let types = point_registry();
            load(&mut node, true, &LoadContext::new(&types, &style));
        }
        let cached = node.values.clone();

        // Fresh node from the saved values, type no longer loaded
        let types = TypeRegistry::new();
        let ctx = LoadContext::new(&types, &style);
        let mut restored =
            Node::new(&structure_arch(true, "Game.Point")).with_values(cached.clone());

        assert_eq!(load(&mut restored, true, &ctx), StructureLoad::FromCache { fields: 2 });
        assert_eq!(restored.title, "Unpack Game.Point");
        assert_eq!(restored.tooltip.as_deref(), Some("Game.Point"));
        assert_eq!(restored.outputs.len(), 2);
        assert_eq!(restored.get_box(2).unwrap().name, "y");
        assert_eq!(restored.get_box(AGGREGATE_BOX).unwrap().port_type, PortType::Null);
        // Cache is only rewritten by a successful resolve
        assert_eq!(restored.values, cached);
    }

    #[test]
    fn test_load_ignores_unusable_cache() {
        let types = TypeRegistry::new();
        let style = SurfaceStyle::default();
        let ctx = LoadContext::new(&types, &style);

        for cache in [vec![], vec![2, 1, 0, 0, 0], vec![1, 5, 0]] {
            let mut node = Node::new(&structure_arch(false, "Game.Gone"));
            node.values.structure_mut().unwrap().cached_layout = cache.clone();
            assert_eq!(load(&mut node, false, &ctx), StructureLoad::Unresolved);
            assert_eq!(node.title, "Pack Game.Gone");
            assert_eq!(node.ports().count(), 1);
            assert_eq!(node.values.structure().unwrap().cached_layout, cache);
        }
    }
}
