// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph data structure containing nodes and connections.

use crate::append::{self, APPEND_FIRST_BOX, APPEND_OUTPUT_BOX, APPEND_SECOND_BOX};
use crate::connection::{Connection, ConnectionId, Endpoint};
use crate::node::{Node, NodeId, NodeKind};
use crate::port::{PortId, PortType};
use crate::structure::{self, LoadContext, StructureLoad};
use indexmap::IndexMap;

/// A node graph
#[derive(Debug, Clone)]
pub struct Graph {
    /// Graph name
    pub name: String,
    /// Nodes in the graph
    nodes: IndexMap<NodeId, Node>,
    /// Connections between nodes
    connections: IndexMap<ConnectionId, Connection>,
}

impl Graph {
    /// Create a new empty graph
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: IndexMap::new(),
            connections: IndexMap::new(),
        }
    }

    /// Add a node to the graph
    pub fn add_node(&mut self, node: Node) -> NodeId {
        let id = node.id;
        self.nodes.insert(id, node);
        id
    }

    /// Remove a node and its connections
    pub fn remove_node(&mut self, node_id: NodeId) -> Option<Node> {
        let affected: Vec<NodeId> = self
            .connections_for_node(node_id)
            .filter(|c| c.from.node == node_id)
            .map(|c| c.to.node)
            .collect();
        self.connections.retain(|_, c| !c.involves_node(node_id));
        let node = self.nodes.shift_remove(&node_id);
        for target in affected {
            self.refresh_append(target);
        }
        node
    }

    /// Get a node by ID
    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(&node_id)
    }

    /// Get all nodes
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Get all node IDs
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Run the load lifecycle of one node.
    ///
    /// Structure nodes rebuild their field ports; Append nodes retype their
    /// output. Connections left pointing at removed ports are dropped.
    pub fn load_node(&mut self, node_id: NodeId, ctx: &LoadContext<'_>) -> Option<StructureLoad> {
        let node = self.nodes.get_mut(&node_id)?;
        let outcome = if node.kind.is_structure() {
            let unpacking = node.kind.is_unpacking();
            Some(structure::load(node, unpacking, ctx))
        } else {
            node.resize_to_fit(ctx.style);
            None
        };
        for target in self.prune_dangling() {
            self.refresh_append(target);
        }
        self.refresh_append(node_id);
        outcome
    }

    /// Run the load lifecycle of every node, in insertion order
    pub fn load_all(&mut self, ctx: &LoadContext<'_>) {
        let ids: Vec<NodeId> = self.node_ids().collect();
        for id in ids {
            self.load_node(id, ctx);
        }
    }

    /// Add a connection from an output port to an input port
    pub fn connect(
        &mut self,
        from_node: NodeId,
        from_port: PortId,
        to_node: NodeId,
        to_port: PortId,
    ) -> Result<ConnectionId, ConnectionError> {
        // Validate nodes exist
        let source_node = self
            .nodes
            .get(&from_node)
            .ok_or(ConnectionError::NodeNotFound(from_node))?;
        let target_node = self
            .nodes
            .get(&to_node)
            .ok_or(ConnectionError::NodeNotFound(to_node))?;

        // Validate ports exist
        let source_port = source_node
            .port(&from_port)
            .ok_or(ConnectionError::PortNotFound(from_port))?;
        let target_port = target_node
            .port(&to_port)
            .ok_or(ConnectionError::PortNotFound(to_port))?;

        // Prevent self-loops
        if from_node == to_node {
            return Err(ConnectionError::SelfLoop);
        }

        if !source_port.can_connect(target_port, target_node.connections_hints) {
            return Err(ConnectionError::IncompatiblePorts {
                from: source_port.port_type.clone(),
                to: target_port.port_type.clone(),
            });
        }

        if !target_port.multi_connect && self.connections_to(to_port).next().is_some() {
            return Err(ConnectionError::PortAlreadyConnected(to_port));
        }

        let connection = Connection::new(
            Endpoint::new(from_node, from_port),
            Endpoint::new(to_node, to_port),
        );
        let id = connection.id;
        self.connections.insert(id, connection);
        self.refresh_append(to_node);
        Ok(id)
    }

    /// Connect two ports identified by box index
    pub fn connect_boxes(
        &mut self,
        from_node: NodeId,
        from_box: u32,
        to_node: NodeId,
        to_box: u32,
    ) -> Result<ConnectionId, ConnectionError> {
        let from_port = self.box_port(from_node, from_box)?;
        let to_port = self.box_port(to_node, to_box)?;
        self.connect(from_node, from_port, to_node, to_port)
    }

    fn box_port(&self, node_id: NodeId, box_id: u32) -> Result<PortId, ConnectionError> {
        let node = self
            .nodes
            .get(&node_id)
            .ok_or(ConnectionError::NodeNotFound(node_id))?;
        node.get_box(box_id)
            .map(|p| p.id)
            .ok_or(ConnectionError::BoxNotFound(node_id, box_id))
    }

    /// Remove a connection
    pub fn disconnect(&mut self, connection_id: ConnectionId) -> Option<Connection> {
        let connection = self.connections.shift_remove(&connection_id)?;
        self.refresh_append(connection.to.node);
        Some(connection)
    }

    /// Get a connection by ID
    pub fn connection(&self, connection_id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&connection_id)
    }

    /// Get all connections
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    /// Get connections to a specific port
    pub fn connections_to(&self, port_id: PortId) -> impl Iterator<Item = &Connection> {
        self.connections.values().filter(move |c| c.to.port == port_id)
    }

    /// Get connections involving a node
    pub fn connections_for_node(&self, node_id: NodeId) -> impl Iterator<Item = &Connection> {
        self.connections.values().filter(move |c| c.involves_node(node_id))
    }

    /// Get the number of connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Drop connections whose ports no longer exist, returning the nodes
    /// that lost an input
    fn prune_dangling(&mut self) -> Vec<NodeId> {
        let nodes = &self.nodes;
        let exists = |end: &Endpoint| {
            nodes.get(&end.node).is_some_and(|n| n.port(&end.port).is_some())
        };
        let mut targets = Vec::new();
        self.connections.retain(|_, c| {
            let keep = exists(&c.from) && exists(&c.to);
            if !keep {
                targets.push(c.to.node);
            }
            keep
        });
        if !targets.is_empty() {
            tracing::debug!("Dropped {} connections to removed ports", targets.len());
        }
        targets
    }

    /// Type of the output feeding an input port, if connected
    fn incoming_type(&self, port_id: PortId) -> Option<PortType> {
        let link = self.connections_to(port_id).next()?;
        let source = self.nodes.get(&link.from.node)?.port(&link.from.port)?;
        Some(source.port_type.clone())
    }

    /// Retype the output of an Append node from its connected inputs
    fn refresh_append(&mut self, node_id: NodeId) {
        let Some(node) = self.nodes.get(&node_id) else {
            return;
        };
        if node.kind != NodeKind::Append {
            return;
        }
        let input_type = |box_id| {
            node.get_box(box_id)
                .and_then(|port| self.incoming_type(port.id))
        };
        let first = input_type(APPEND_FIRST_BOX);
        let second = input_type(APPEND_SECOND_BOX);
        let output = append::append_output_type(first.as_ref(), second.as_ref());

        if let Some(node) = self.nodes.get_mut(&node_id) {
            node.set_box_type(APPEND_OUTPUT_BOX, output);
        }
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new("Untitled")
    }
}

/// Error when creating a connection
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// Node not found
    #[error("Node not found: {0:?}")]
    NodeNotFound(NodeId),

    /// Port not found
    #[error("Port not found: {0:?}")]
    PortNotFound(PortId),

    /// No port at this box index
    #[error("Node {0:?} has no box {1}")]
    BoxNotFound(NodeId, u32),

    /// Incompatible port types
    #[error("Cannot connect {from:?} to {to:?}")]
    IncompatiblePorts {
        /// Output type
        from: PortType,
        /// Input type
        to: PortType,
    },

    /// Port is already connected
    #[error("Port already connected: {0:?}")]
    PortAlreadyConnected(PortId),

    /// Self-loop not allowed
    #[error("Self-loop not allowed")]
    SelfLoop,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archetypes::packing::{
        self, APPEND, PACK_FLOAT2, PACK_STRUCTURE, UNPACK_FLOAT3, UNPACK_STRUCTURE,
    };
    use crate::node::{NodeRegistry, NodeValues, StructureNodeState};
    use crate::reflection::{TypeDescriptor, TypeRegistry};
    use crate::style::SurfaceStyle;

    fn setup() -> (NodeRegistry, TypeRegistry, SurfaceStyle) {
        let mut types = TypeRegistry::new();
        types
            .register(
                TypeDescriptor::new("Game.Pair")
                    .with_field("A", PortType::Float)
                    .with_field("B", PortType::Float),
            )
            .unwrap();
        (packing::create_packing_registry(), types, SurfaceStyle::default())
    }

    #[test]
    fn test_connect_validation() {
        let (registry, _, _) = setup();
        let mut graph = Graph::new("Test");
        let pack = graph.add_node(registry.create_node(PACK_FLOAT2).unwrap());
        let unpack = graph.add_node(registry.create_node(UNPACK_FLOAT3).unwrap());
        let other = graph.add_node(registry.create_node(PACK_FLOAT2).unwrap());

        graph.connect_boxes(pack, 0, unpack, 0).unwrap();
        assert!(matches!(
            graph.connect_boxes(other, 0, unpack, 0),
            Err(ConnectionError::PortAlreadyConnected(_))
        ));
        assert!(matches!(
            graph.connect_boxes(unpack, 1, unpack, 0),
            Err(ConnectionError::SelfLoop)
        ));
        assert!(matches!(
            graph.connect_boxes(pack, 0, other, 1),
            Err(ConnectionError::IncompatiblePorts { .. })
        ));
        assert!(matches!(
            graph.connect_boxes(pack, 9, other, 1),
            Err(ConnectionError::BoxNotFound(_, 9))
        ));
        assert_eq!(graph.connection_count(), 1);

        graph.remove_node(pack);
        assert_eq!(graph.connection_count(), 0);
    }

    #[test]
    fn test_append_output_follows_connections() {
        let (registry, _, _) = setup();
        let mut graph = Graph::new("Test");
        let float2 = graph.add_node(registry.create_node(PACK_FLOAT2).unwrap());
        let float3 = graph.add_node(registry.create_node(UNPACK_FLOAT3).unwrap());
        let append = graph.add_node(registry.create_node(APPEND).unwrap());
        let output = |graph: &Graph| {
            graph.node(append).unwrap().get_box(APPEND_OUTPUT_BOX).unwrap().port_type.clone()
        };

        let first = graph.connect_boxes(float2, 0, append, APPEND_FIRST_BOX).unwrap();
        assert_eq!(output(&graph), PortType::Null);

        graph.connect_boxes(float3, 1, append, APPEND_SECOND_BOX).unwrap();
        assert_eq!(output(&graph), PortType::Float3);

        graph.disconnect(first);
        assert_eq!(output(&graph), PortType::Null);

        graph.connect_boxes(float2, 0, append, APPEND_FIRST_BOX).unwrap();
        assert_eq!(output(&graph), PortType::Float3);
        graph.remove_node(float3);
        assert_eq!(output(&graph), PortType::Null);
    }

    #[test]
    fn test_reload_drops_links_to_removed_fields() {
        let (registry, mut types, style) = setup();
        let mut graph = Graph::new("Test");

        let arch = registry.get(PACK_STRUCTURE).unwrap();
        let values = NodeValues::Structure(StructureNodeState::new("Game.Pair"));
        let pack = graph.add_node(Node::new(arch).with_values(values));
        let source = graph.add_node(registry.create_node(UNPACK_FLOAT3).unwrap());
        graph.load_all(&LoadContext::new(&types, &style));

        let keep = graph.connect_boxes(source, 1, pack, 1).unwrap();
        graph.connect_boxes(source, 2, pack, 2).unwrap();
        assert_eq!(graph.connection_count(), 2);

        types.unregister("Game.Pair");
        types
            .register(TypeDescriptor::new("Game.Pair").with_field("A", PortType::Float))
            .unwrap();
        let outcome = graph.load_node(pack, &LoadContext::new(&types, &style));

        assert_eq!(outcome, Some(StructureLoad::Resolved { fields: 1 }));
        assert_eq!(graph.connection_count(), 1);
        assert!(graph.connection(keep).is_some());
    }

    #[test]
    fn test_reload_retypes_append_fed_by_removed_field() {
        let (registry, mut types, style) = setup();
        let mut graph = Graph::new("Test");

        let arch = registry.get(UNPACK_STRUCTURE).unwrap();
        let values = NodeValues::Structure(StructureNodeState::new("Game.Pair"));
        let unpack = graph.add_node(Node::new(arch).with_values(values));
        let float2 = graph.add_node(registry.create_node(PACK_FLOAT2).unwrap());
        let append = graph.add_node(registry.create_node(APPEND).unwrap());
        graph.load_all(&LoadContext::new(&types, &style));

        graph.connect_boxes(float2, 0, append, APPEND_FIRST_BOX).unwrap();
        graph.connect_boxes(unpack, 2, append, APPEND_SECOND_BOX).unwrap();
        let output = |graph: &Graph| {
            graph.node(append).unwrap().get_box(APPEND_OUTPUT_BOX).unwrap().port_type.clone()
        };
        assert_eq!(output(&graph), PortType::Float3);

        types.unregister("Game.Pair");
        types
            .register(TypeDescriptor::new("Game.Pair").with_field("A", PortType::Float))
            .unwrap();
        graph.load_node(unpack, &LoadContext::new(&types, &style));

        assert_eq!(graph.connection_count(), 1);
        assert_eq!(output(&graph), PortType::Null);
    }
}
