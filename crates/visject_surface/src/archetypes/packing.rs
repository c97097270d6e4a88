// SPDX-License-Identifier: MIT OR Apache-2.0
//! Packing group: building vectors and structures from components, and
//! breaking them apart again.
//!
//! Type IDs are saved in graphs and must never change.

use crate::append::{APPEND_FIRST_BOX, APPEND_OUTPUT_BOX, APPEND_SECOND_BOX};
use crate::node::{NodeArchetype, NodeFlags, NodeKind, NodeRegistry, NodeValues, StructureNodeState};
use crate::port::{ConnectionsHint, Port, PortType, PortValue};
use crate::reflection::TypeRegistry;
use crate::structure::AGGREGATE_BOX;

/// Pack Float2
pub const PACK_FLOAT2: u16 = 20;
/// Pack Float3
pub const PACK_FLOAT3: u16 = 21;
/// Pack Float4
pub const PACK_FLOAT4: u16 = 22;
/// Pack Rotation
pub const PACK_ROTATION: u16 = 23;
/// Pack Transform
pub const PACK_TRANSFORM: u16 = 24;
/// Pack Box
pub const PACK_BOX: u16 = 25;
/// Pack Structure
pub const PACK_STRUCTURE: u16 = 26;
/// Unpack Float2
pub const UNPACK_FLOAT2: u16 = 30;
/// Unpack Float3
pub const UNPACK_FLOAT3: u16 = 31;
/// Unpack Float4
pub const UNPACK_FLOAT4: u16 = 32;
/// Unpack Rotation
pub const UNPACK_ROTATION: u16 = 33;
/// Unpack Transform
pub const UNPACK_TRANSFORM: u16 = 34;
/// Unpack Box
pub const UNPACK_BOX: u16 = 35;
/// Unpack Structure
pub const UNPACK_STRUCTURE: u16 = 36;
/// Mask X (first of the single component masks, 40-43)
pub const MASK_X: u16 = 40;
/// Mask XY (first of the two component masks, 44-47)
pub const MASK_XY: u16 = 44;
/// Mask XYZ
pub const MASK_XYZ: u16 = 70;
/// Append
pub const APPEND: u16 = 100;

const STRUCTURE_FLAGS: NodeFlags = NodeFlags::VISUAL_SCRIPT_GRAPH
    .union(NodeFlags::ANIM_GRAPH)
    .union(NodeFlags::NO_SPAWN_VIA_GUI);

/// Create the registry holding every Packing archetype
pub fn create_packing_registry() -> NodeRegistry {
    let mut registry = NodeRegistry::new();
    for arch in nodes() {
        registry.register(arch);
    }
    registry
}

/// Every Packing archetype, in declaration order
pub fn nodes() -> Vec<NodeArchetype> {
    let mut nodes = Vec::new();

    // ========================================================================
    // Packing
    // ========================================================================

    let xyzw = ["X", "Y", "Z", "W"];
    let euler = ["Pitch", "Yaw", "Roll"];
    nodes.push(pack_components(PACK_FLOAT2, "Float2", PortType::Float2, &xyzw[..2], 40.0));
    nodes.push(pack_components(PACK_FLOAT3, "Float3", PortType::Float3, &xyzw[..3], 60.0));
    nodes.push(pack_components(PACK_FLOAT4, "Float4", PortType::Float4, &xyzw, 80.0));
    nodes.push(pack_components(PACK_ROTATION, "Rotation", PortType::Quaternion, &euler, 60.0));

    nodes.push(NodeArchetype::fixed(
        PACK_TRANSFORM,
        "Pack Transform",
        "Pack components to Transform",
        [150.0, 80.0],
        vec![
            Port::output(0, "Value", PortType::Transform),
            Port::input(1, "Translation", PortType::Vector3),
            Port::input(2, "Orientation", PortType::Quaternion),
            Port::input(3, "Scale", PortType::Float3),
        ],
    ));

    nodes.push(NodeArchetype::fixed(
        PACK_BOX,
        "Pack Box",
        "Pack components to BoundingBox",
        [150.0, 40.0],
        vec![
            Port::output(0, "Value", PortType::BoundingBox),
            Port::input(1, "Minimum", PortType::Vector3),
            Port::input(2, "Maximum", PortType::Vector3),
        ],
    ));

    nodes.push(
        NodeArchetype::fixed(
            PACK_STRUCTURE,
            "Pack Structure",
            "Makes the structure data from the components.",
            [180.0, 20.0],
            vec![Port::output(AGGREGATE_BOX, "", PortType::Null)],
        )
        .with_kind(NodeKind::PackStructure)
        .with_flags(STRUCTURE_FLAGS)
        .with_values(NodeValues::Structure(StructureNodeState::default())),
    );

    // ========================================================================
    // Unpacking
    // ========================================================================

    nodes.push(unpack_components(
        UNPACK_FLOAT2,
        "Float2",
        PortType::Float2,
        &xyzw[..2],
        [150.0, 40.0],
    ));
    nodes.push(unpack_components(
        UNPACK_FLOAT3,
        "Float3",
        PortType::Float3,
        &xyzw[..3],
        [150.0, 60.0],
    ));
    nodes.push(unpack_components(
        UNPACK_FLOAT4,
        "Float4",
        PortType::Float4,
        &xyzw,
        [150.0, 80.0],
    ));
    nodes.push(unpack_components(
        UNPACK_ROTATION,
        "Rotation",
        PortType::Quaternion,
        &euler,
        [170.0, 60.0],
    ));

    nodes.push(NodeArchetype::fixed(
        UNPACK_TRANSFORM,
        "Unpack Transform",
        "Unpack components from Transform",
        [170.0, 60.0],
        vec![
            Port::input(0, "Value", PortType::Transform),
            Port::output(1, "Translation", PortType::Vector3),
            Port::output(2, "Orientation", PortType::Quaternion),
            Port::output(3, "Scale", PortType::Float3),
        ],
    ));

    nodes.push(NodeArchetype::fixed(
        UNPACK_BOX,
        "Unpack Box",
        "Unpack components from BoundingBox",
        [170.0, 40.0],
        vec![
            Port::input(0, "Value", PortType::BoundingBox),
            Port::output(1, "Minimum", PortType::Vector3),
            Port::output(2, "Maximum", PortType::Vector3),
        ],
    ));

    nodes.push(
        NodeArchetype::fixed(
            UNPACK_STRUCTURE,
            "Unpack Structure",
            "Breaks the structure data to allow extracting components from it.",
            [180.0, 20.0],
            vec![Port::input(AGGREGATE_BOX, "", PortType::Null)],
        )
        .with_kind(NodeKind::UnpackStructure)
        .with_flags(STRUCTURE_FLAGS)
        .with_values(NodeValues::Structure(StructureNodeState::default())),
    );

    // ========================================================================
    // Masking
    // ========================================================================

    for (offset, component) in ["X", "Y", "Z", "W"].into_iter().enumerate() {
        nodes.push(mask(MASK_X + offset as u16, component, PortType::Float));
    }
    for (offset, components) in ["XY", "XZ", "YZ", "ZW"].into_iter().enumerate() {
        nodes.push(mask(MASK_XY + offset as u16, components, PortType::Float2));
    }
    nodes.push(mask(MASK_XYZ, "XYZ", PortType::Float3));

    // ========================================================================
    // Append
    // ========================================================================

    nodes.push(
        NodeArchetype::fixed(
            APPEND,
            "Append",
            "Appends vector or scalar value into vector",
            [140.0, 50.0],
            vec![
                Port::input(APPEND_FIRST_BOX, "", PortType::Null),
                Port::input(APPEND_SECOND_BOX, "", PortType::Null),
                Port::output(APPEND_OUTPUT_BOX, "", PortType::Float4),
            ],
        )
        .with_kind(NodeKind::Append)
        .with_hints(ConnectionsHint::NUMERIC),
    );

    nodes
}

/// Pack and Unpack archetypes bound to every reflected structure in `types`,
/// as listed in the spawn menu of visual script graphs
pub fn structure_archetypes(types: &TypeRegistry) -> Vec<NodeArchetype> {
    let registry = create_packing_registry();
    let (Some(pack), Some(unpack)) =
        (registry.get(PACK_STRUCTURE), registry.get(UNPACK_STRUCTURE))
    else {
        return Vec::new();
    };

    types
        .types()
        .filter(|ty| matches!(ty.port_type(), PortType::Structure(_)))
        .flat_map(|ty| {
            [(pack, "Pack "), (unpack, "Unpack ")].map(|(arch, prefix)| {
                let mut bound = arch.for_structure(ty.full_name.clone());
                bound.title = format!("{prefix}{}", ty.name());
                bound.flags.remove(NodeFlags::NO_SPAWN_VIA_GUI);
                bound
            })
        })
        .collect()
}

fn pack_components(
    type_id: u16,
    target: &str,
    output: PortType,
    components: &[&str],
    height: f32,
) -> NodeArchetype {
    let mut elements = vec![Port::output(0, "Value", output)];
    elements.extend(components.iter().zip(1u32..).map(|(name, box_id)| {
        Port::input(box_id, *name, PortType::Float).with_default(PortValue::Float(0.0))
    }));
    NodeArchetype::fixed(
        type_id,
        format!("Pack {target}"),
        format!("Pack components to {target}"),
        [150.0, height],
        elements,
    )
}

fn unpack_components(
    type_id: u16,
    source: &str,
    input: PortType,
    components: &[&str],
    size: [f32; 2],
) -> NodeArchetype {
    let mut elements = vec![Port::input(0, "Value", input)];
    elements.extend(
        components
            .iter()
            .zip(1u32..)
            .map(|(name, box_id)| Port::output(box_id, *name, PortType::Float)),
    );
    NodeArchetype::fixed(
        type_id,
        format!("Unpack {source}"),
        format!("Unpack components from {source}"),
        size,
        elements,
    )
}

fn mask(type_id: u16, components: &str, output: PortType) -> NodeArchetype {
    let what = if components.len() == 1 { "component" } else { "components" };
    NodeArchetype::fixed(
        type_id,
        format!("Mask {components}"),
        format!("Unpack {components} {what} from Vector"),
        [110.0, 30.0],
        vec![
            Port::input(0, "Value", PortType::Null),
            Port::output(1, components, output),
        ],
    )
    .with_hints(ConnectionsHint::VECTOR)
}
