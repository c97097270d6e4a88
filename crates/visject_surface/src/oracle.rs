// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connection checks against archetypes, without a node instance.
//!
//! The editor asks these while dragging a link or searching for a node to
//! auto-wire, across every archetype in the registry. They only read the
//! archetype defaults and the type registry.

use crate::node::{GraphKind, NodeArchetype, NodeKind, NodeRegistry};
use crate::port::{Port, PortDirection, PortType};
use crate::reflection::{TypeDescriptor, TypeIntrospector};

/// Nominal ports of an archetype, as `(name, type)` pairs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IoDescription {
    /// Input ports
    pub inputs: Vec<(String, PortType)>,
    /// Output ports
    pub outputs: Vec<(String, PortType)>,
}

/// Can a value of `output_type` connect to some input of a new `arch` node?
pub fn is_input_compatible(
    arch: &NodeArchetype,
    output_type: &PortType,
    types: &dyn TypeIntrospector,
) -> bool {
    let hint = arch.connections_hints;
    match arch.kind {
        NodeKind::PackStructure => resolve_default(arch, types).is_some_and(|ty| {
            types
                .fields(ty)
                .iter()
                .any(|field| field.value_type.can_cast_from(output_type, hint))
        }),
        NodeKind::UnpackStructure => resolve_default(arch, types)
            .is_some_and(|ty| ty.port_type().can_cast_from(output_type, hint)),
        NodeKind::Fixed | NodeKind::Append => elements(arch, PortDirection::Input)
            .any(|port| port.port_type.can_cast_from(output_type, hint)),
    }
}

/// Can some output of a new `arch` node connect to an input of `input_type`?
pub fn is_output_compatible(
    arch: &NodeArchetype,
    input_type: &PortType,
    types: &dyn TypeIntrospector,
) -> bool {
    let hint = arch.connections_hints;
    match arch.kind {
        NodeKind::PackStructure => resolve_default(arch, types)
            .is_some_and(|ty| input_type.can_cast_from(&ty.port_type(), hint)),
        NodeKind::UnpackStructure => resolve_default(arch, types).is_some_and(|ty| {
            types
                .fields(ty)
                .iter()
                .any(|field| input_type.can_cast_from(&field.value_type, hint))
        }),
        NodeKind::Fixed | NodeKind::Append => elements(arch, PortDirection::Output)
            .any(|port| input_type.can_cast_from(&port.port_type, hint)),
    }
}

/// Nominal inputs and outputs of a new `arch` node.
///
/// `None` for a structure archetype whose type does not resolve: no
/// structural information is available, which differs from having no ports.
pub fn input_output_description(
    arch: &NodeArchetype,
    types: &dyn TypeIntrospector,
) -> Option<IoDescription> {
    let pairs = |ports: Vec<&Port>| {
        ports
            .into_iter()
            .map(|p| (p.name.clone(), p.port_type.clone()))
            .collect::<Vec<_>>()
    };

    match arch.kind {
        NodeKind::PackStructure | NodeKind::UnpackStructure => {
            let ty = resolve_default(arch, types)?;
            let fields = types
                .fields(ty)
                .into_iter()
                .map(|field| (field.name, field.value_type))
                .collect();
            let aggregate = vec![(ty.name().to_string(), ty.port_type())];
            Some(if arch.kind.is_unpacking() {
                IoDescription {
                    inputs: aggregate,
                    outputs: fields,
                }
            } else {
                IoDescription {
                    inputs: fields,
                    outputs: aggregate,
                }
            })
        }
        NodeKind::Fixed | NodeKind::Append => Some(IoDescription {
            inputs: pairs(elements(arch, PortDirection::Input).collect()),
            outputs: pairs(elements(arch, PortDirection::Output).collect()),
        }),
    }
}

fn resolve_default<'t>(
    arch: &NodeArchetype,
    types: &'t dyn TypeIntrospector,
) -> Option<&'t TypeDescriptor> {
    types.resolve(arch.default_type_name()?)
}

fn elements(arch: &NodeArchetype, direction: PortDirection) -> impl Iterator<Item = &Port> {
    arch.elements.iter().filter(move |p| p.direction == direction)
}

impl NodeRegistry {
    /// Archetypes a graph of `kind` can spawn to accept a value of `output_type`
    pub fn suggest_for_output<'a>(
        &'a self,
        kind: GraphKind,
        output_type: &'a PortType,
        types: &'a dyn TypeIntrospector,
    ) -> impl Iterator<Item = &'a NodeArchetype> {
        self.spawnable(kind)
            .filter(move |arch| is_input_compatible(arch, output_type, types))
    }

    /// Archetypes a graph of `kind` can spawn to feed an input of `input_type`
    pub fn suggest_for_input<'a>(
        &'a self,
        kind: GraphKind,
        input_type: &'a PortType,
        types: &'a dyn TypeIntrospector,
    ) -> impl Iterator<Item = &'a NodeArchetype> {
        self.spawnable(kind)
            .filter(move |arch| is_output_compatible(arch, input_type, types))
    }
}
