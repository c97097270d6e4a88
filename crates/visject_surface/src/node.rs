// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node archetypes and node instances.

use crate::port::{ConnectionsHint, Port, PortDirection, PortId, PortType};
use crate::style::SurfaceStyle;
use bitflags::bitflags;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    /// Create a new random node ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

bitflags! {
    /// Graphs a node may appear in, plus spawn behaviour
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct NodeFlags: u32 {
        /// Material graphs
        const MATERIAL_GRAPH = 1 << 0;
        /// Particle emitter graphs
        const PARTICLE_EMITTER_GRAPH = 1 << 1;
        /// Animation graphs
        const ANIM_GRAPH = 1 << 2;
        /// Visual script graphs
        const VISUAL_SCRIPT_GRAPH = 1 << 3;
        /// Every graph kind
        const ALL_GRAPHS = Self::MATERIAL_GRAPH.bits()
            | Self::PARTICLE_EMITTER_GRAPH.bits()
            | Self::ANIM_GRAPH.bits()
            | Self::VISUAL_SCRIPT_GRAPH.bits();
        /// Hidden from the spawn menu; created by other editor actions
        const NO_SPAWN_VIA_GUI = 1 << 8;
    }
}

/// Kind of graph hosting nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GraphKind {
    /// Material graph
    Material,
    /// Particle emitter graph
    ParticleEmitter,
    /// Animation graph
    Anim,
    /// Visual script graph
    VisualScript,
}

impl GraphKind {
    /// Flag an archetype must carry to be hosted by this graph kind
    pub fn flag(self) -> NodeFlags {
        match self {
            Self::Material => NodeFlags::MATERIAL_GRAPH,
            Self::ParticleEmitter => NodeFlags::PARTICLE_EMITTER_GRAPH,
            Self::Anim => NodeFlags::ANIM_GRAPH,
            Self::VisualScript => NodeFlags::VISUAL_SCRIPT_GRAPH,
        }
    }
}

/// Behaviour shared by all nodes of an archetype
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    /// Ports fixed by the archetype
    Fixed,
    /// Builds a structure from one input per field
    PackStructure,
    /// Breaks a structure into one output per field
    UnpackStructure,
    /// Concatenates two numeric values into a vector
    Append,
}

impl NodeKind {
    /// True for the structure Pack/Unpack kinds
    pub fn is_structure(self) -> bool {
        matches!(self, Self::PackStructure | Self::UnpackStructure)
    }

    /// True when field ports are outputs
    pub fn is_unpacking(self) -> bool {
        self == Self::UnpackStructure
    }
}

/// Persisted values of a structure node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureNodeState {
    /// Fully qualified name of the structure type
    pub type_name: String,
    /// Encoded field layout from the last successful resolve
    #[serde(default)]
    pub cached_layout: Vec<u8>,
}

impl StructureNodeState {
    /// State for a structure type with no cached layout yet
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            cached_layout: Vec::new(),
        }
    }
}

/// Values persisted with a node, by archetype schema
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum NodeValues {
    /// Nothing beyond port defaults
    #[default]
    Empty,
    /// Structure Pack/Unpack state
    Structure(StructureNodeState),
}

impl NodeValues {
    /// Structure state, if this is a structure node
    pub fn structure(&self) -> Option<&StructureNodeState> {
        match self {
            Self::Structure(state) => Some(state),
            Self::Empty => None,
        }
    }

    /// Mutable structure state, if this is a structure node
    pub fn structure_mut(&mut self) -> Option<&mut StructureNodeState> {
        match self {
            Self::Structure(state) => Some(state),
            Self::Empty => None,
        }
    }
}

/// Static declaration of a node kind
#[derive(Debug, Clone)]
pub struct NodeArchetype {
    /// Stable numeric identifier, saved in graphs
    pub type_id: u16,
    /// Display title
    pub title: String,
    /// Description
    pub description: String,
    /// Hosting graphs and spawn behaviour
    pub flags: NodeFlags,
    /// Minimum visual size
    pub size: [f32; 2],
    /// What generic ports of this node accept
    pub connections_hints: ConnectionsHint,
    /// Behaviour
    pub kind: NodeKind,
    /// Default persisted values
    pub default_values: NodeValues,
    /// Port templates
    pub elements: Vec<Port>,
}

impl NodeArchetype {
    /// Archetype with fixed ports and no extra values
    pub fn fixed(
        type_id: u16,
        title: impl Into<String>,
        description: impl Into<String>,
        size: [f32; 2],
        elements: Vec<Port>,
    ) -> Self {
        Self {
            type_id,
            title: title.into(),
            description: description.into(),
            flags: NodeFlags::ALL_GRAPHS,
            size,
            connections_hints: ConnectionsHint::empty(),
            kind: NodeKind::Fixed,
            default_values: NodeValues::Empty,
            elements,
        }
    }

    /// Set the connections hint
    pub fn with_hints(mut self, hints: ConnectionsHint) -> Self {
        self.connections_hints = hints;
        self
    }

    /// Set the flags
    pub fn with_flags(mut self, flags: NodeFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Set the node kind
    pub fn with_kind(mut self, kind: NodeKind) -> Self {
        self.kind = kind;
        self
    }

    /// Set the default values
    pub fn with_values(mut self, values: NodeValues) -> Self {
        self.default_values = values;
        self
    }

    /// Declared structure type name, for structure archetypes
    pub fn default_type_name(&self) -> Option<&str> {
        self.default_values
            .structure()
            .map(|state| state.type_name.as_str())
    }

    /// Copy of a structure archetype bound to a specific type, as offered in
    /// the spawn menu for each reflected structure
    pub fn for_structure(&self, type_name: impl Into<String>) -> Self {
        let mut arch = self.clone();
        arch.default_values = NodeValues::Structure(StructureNodeState::new(type_name));
        arch
    }

    /// Check whether a graph of `kind` can host this archetype
    pub fn is_hosted_by(&self, kind: GraphKind) -> bool {
        self.flags.contains(kind.flag())
    }
}

/// A node instance in the graph
#[derive(Debug, Clone)]
pub struct Node {
    /// Unique instance ID
    pub id: NodeId,
    /// Archetype type ID
    pub type_id: u16,
    /// Behaviour copied from the archetype
    pub kind: NodeKind,
    /// Display title
    pub title: String,
    /// Tooltip text
    pub tooltip: Option<String>,
    /// Position in the graph UI
    pub position: [f32; 2],
    /// Current visual size
    pub size: [f32; 2],
    /// Minimum visual size from the archetype
    pub min_size: [f32; 2],
    /// What generic ports of this node accept
    pub connections_hints: ConnectionsHint,
    /// Persisted values
    pub values: NodeValues,
    /// Input ports
    pub inputs: Vec<Port>,
    /// Output ports
    pub outputs: Vec<Port>,
}

impl Node {
    /// Create a new node from an archetype
    pub fn new(arch: &NodeArchetype) -> Self {
        let mut node = Self {
            id: NodeId::new(),
            type_id: arch.type_id,
            kind: arch.kind,
            title: arch.title.clone(),
            tooltip: None,
            position: [0.0, 0.0],
            size: arch.size,
            min_size: arch.size,
            connections_hints: arch.connections_hints,
            values: arch.default_values.clone(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        };
        for element in &arch.elements {
            node.add_box(element.instantiate());
        }
        node
    }

    /// Set the ID, when restoring a saved node
    pub fn with_id(mut self, id: NodeId) -> Self {
        self.id = id;
        self
    }

    /// Set the position
    pub fn with_position(mut self, x: f32, y: f32) -> Self {
        self.position = [x, y];
        self
    }

    /// Set the persisted values
    pub fn with_values(mut self, values: NodeValues) -> Self {
        self.values = values;
        self
    }

    /// Get a port by ID
    pub fn port(&self, port_id: &PortId) -> Option<&Port> {
        self.ports().find(|p| p.id == *port_id)
    }

    /// Get all ports
    pub fn ports(&self) -> impl Iterator<Item = &Port> {
        self.inputs.iter().chain(self.outputs.iter())
    }

    /// Get a port by box index
    pub fn get_box(&self, box_id: u32) -> Option<&Port> {
        self.ports().find(|p| p.box_id == box_id)
    }

    /// Get a mutable port by box index
    pub fn get_box_mut(&mut self, box_id: u32) -> Option<&mut Port> {
        self.inputs
            .iter_mut()
            .chain(self.outputs.iter_mut())
            .find(|p| p.box_id == box_id)
    }

    /// Add a port, keeping each side ordered by box index
    pub fn add_box(&mut self, port: Port) {
        let side = match port.direction {
            PortDirection::Input => &mut self.inputs,
            PortDirection::Output => &mut self.outputs,
        };
        let at = side.partition_point(|p| p.box_id < port.box_id);
        side.insert(at, port);
    }

    /// Remove a port by box index
    pub fn remove_box(&mut self, box_id: u32) -> Option<Port> {
        if let Some(at) = self.inputs.iter().position(|p| p.box_id == box_id) {
            return Some(self.inputs.remove(at));
        }
        let at = self.outputs.iter().position(|p| p.box_id == box_id)?;
        Some(self.outputs.remove(at))
    }

    /// Set the current type of a port
    pub fn set_box_type(&mut self, box_id: u32, port_type: PortType) {
        if let Some(port) = self.get_box_mut(box_id) {
            port.port_type = port_type;
        }
    }

    /// Recompute the visual size so the title and every port fit
    pub fn resize_to_fit(&mut self, style: &SurfaceStyle) {
        let label_width = |ports: &[Port]| {
            ports
                .iter()
                .map(|p| style.text_width(&p.name))
                .fold(0.0f32, f32::max)
        };
        let rows = self.inputs.len().max(self.outputs.len()) as f32;

        let title_width = style.text_width(&self.title) + style.box_padding;
        let mut ports_width = label_width(&self.inputs) + label_width(&self.outputs);
        if !self.inputs.is_empty() {
            ports_width += style.box_padding;
        }
        if !self.outputs.is_empty() {
            ports_width += style.box_padding;
        }
        if !self.inputs.is_empty() && !self.outputs.is_empty() {
            ports_width += style.column_gap;
        }

        self.size = [
            self.min_size[0].max(title_width).max(ports_width),
            self.min_size[1].max(style.header_height + rows * style.box_row_height),
        ];
    }
}

/// Registry of available node archetypes
pub struct NodeRegistry {
    /// Registered archetypes by type ID
    archetypes: IndexMap<u16, NodeArchetype>,
}

impl NodeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            archetypes: IndexMap::new(),
        }
    }

    /// Register an archetype, replacing any with the same type ID
    pub fn register(&mut self, arch: NodeArchetype) {
        if self.archetypes.contains_key(&arch.type_id) {
            tracing::warn!("Replacing node archetype {}", arch.type_id);
        }
        self.archetypes.insert(arch.type_id, arch);
    }

    /// Get an archetype by type ID
    pub fn get(&self, type_id: u16) -> Option<&NodeArchetype> {
        self.archetypes.get(&type_id)
    }

    /// Get all registered archetypes
    pub fn archetypes(&self) -> impl Iterator<Item = &NodeArchetype> {
        self.archetypes.values()
    }

    /// Archetypes offered in the spawn menu of a graph kind
    pub fn spawnable(&self, kind: GraphKind) -> impl Iterator<Item = &NodeArchetype> {
        self.archetypes.values().filter(move |arch| {
            arch.is_hosted_by(kind) && !arch.flags.contains(NodeFlags::NO_SPAWN_VIA_GUI)
        })
    }

    /// Create a node from a type ID
    pub fn create_node(&self, type_id: u16) -> Option<Node> {
        self.get(type_id).map(Node::new)
    }

    /// Number of registered archetypes
    pub fn len(&self) -> usize {
        self.archetypes.len()
    }

    /// True when nothing is registered
    pub fn is_empty(&self) -> bool {
        self.archetypes.is_empty()
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
