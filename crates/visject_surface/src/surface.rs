// SPDX-License-Identifier: MIT OR Apache-2.0
//! Saved surface format.
//!
//! Ports are not saved. Loading recreates each node from its archetype, runs
//! the load lifecycle (which rebuilds dynamic ports from live types or cached
//! layouts) and then restores connections by box index.

use crate::graph::Graph;
use crate::node::{Node, NodeId, NodeRegistry, NodeValues};
use crate::structure::LoadContext;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Current surface format version
pub const SURFACE_FORMAT_VERSION: u32 = 1;

/// A saved node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Node ID
    pub id: NodeId,
    /// Archetype type ID
    pub type_id: u16,
    /// Position in the graph UI
    pub position: [f32; 2],
    /// Persisted values
    #[serde(default)]
    pub values: NodeValues,
}

/// A saved connection, by box index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    /// Output node
    pub from_node: NodeId,
    /// Output box index
    pub from_box: u32,
    /// Input node
    pub to_node: NodeId,
    /// Input box index
    pub to_box: u32,
}

/// Saved form of a graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceData {
    /// Format version
    pub version: u32,
    /// Graph name
    pub name: String,
    /// Nodes
    pub nodes: Vec<NodeRecord>,
    /// Connections
    pub links: Vec<LinkRecord>,
}

/// Error when saving or loading a surface
#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
    /// Surface could not be serialized
    #[error("Failed to serialize surface: {0}")]
    Serialize(#[from] ron::Error),

    /// Surface document is malformed
    #[error("Invalid surface document: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Surface file could not be read or written
    #[error("Surface I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Saved node refers to an archetype that is not registered
    #[error("Node {node:?} uses unknown archetype {type_id}")]
    UnknownArchetype {
        /// Node ID
        node: NodeId,
        /// Missing archetype type ID
        type_id: u16,
    },

    /// Saved with a newer format
    #[error("Unsupported surface format version {0}")]
    UnsupportedVersion(u32),
}

impl SurfaceData {
    /// Serialize to RON format
    pub fn to_ron(&self) -> Result<String, SurfaceError> {
        Ok(ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?)
    }

    /// Deserialize from RON format
    pub fn from_ron(s: &str) -> Result<Self, SurfaceError> {
        let data: Self = ron::from_str(s)?;
        if data.version > SURFACE_FORMAT_VERSION {
            return Err(SurfaceError::UnsupportedVersion(data.version));
        }
        Ok(data)
    }

    /// Save surface to file
    pub fn save(&self, path: &Path) -> Result<(), SurfaceError> {
        std::fs::write(path, self.to_ron()?)?;
        Ok(())
    }

    /// Load surface from file
    pub fn load(path: &Path) -> Result<Self, SurfaceError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron(&contents)
    }

    /// Rebuild the graph.
    ///
    /// Links whose boxes no longer exist, or whose types no longer match, are
    /// skipped with a warning.
    pub fn instantiate(
        &self,
        registry: &NodeRegistry,
        ctx: &LoadContext<'_>,
    ) -> Result<Graph, SurfaceError> {
        let mut graph = Graph::new(self.name.clone());
        for record in &self.nodes {
            let arch = registry
                .get(record.type_id)
                .ok_or(SurfaceError::UnknownArchetype {
                    node: record.id,
                    type_id: record.type_id,
                })?;
            let mut node = Node::new(arch)
                .with_id(record.id)
                .with_position(record.position[0], record.position[1]);
            if record.values != NodeValues::Empty {
                node = node.with_values(record.values.clone());
            }
            graph.add_node(node);
        }

        graph.load_all(ctx);

        for link in &self.links {
            let relinked =
                graph.connect_boxes(link.from_node, link.from_box, link.to_node, link.to_box);
            if let Err(err) = relinked {
                tracing::warn!(
                    "Skipping saved connection {:?}:{} -> {:?}:{}: {}",
                    link.from_node,
                    link.from_box,
                    link.to_node,
                    link.to_box,
                    err
                );
            }
        }

        tracing::debug!(
            "Loaded surface '{}' with {} nodes and {} connections",
            graph.name,
            graph.node_count(),
            graph.connection_count()
        );
        Ok(graph)
    }
}

impl Graph {
    /// Saved form of this graph
    pub fn to_surface(&self) -> SurfaceData {
        let nodes = self
            .nodes()
            .map(|node| NodeRecord {
                id: node.id,
                type_id: node.type_id,
                position: node.position,
                values: node.values.clone(),
            })
            .collect();

        let box_of = |node_id: NodeId, port_id| {
            self.node(node_id)
                .and_then(|node| node.port(&port_id))
                .map(|port| port.box_id)
        };
        let links = self
            .connections()
            .filter_map(|c| {
                Some(LinkRecord {
                    from_node: c.from.node,
                    from_box: box_of(c.from.node, c.from.port)?,
                    to_node: c.to.node,
                    to_box: box_of(c.to.node, c.to.port)?,
                })
            })
            .collect();

        SurfaceData {
            version: SURFACE_FORMAT_VERSION,
            name: self.name.clone(),
            nodes,
            links,
        }
    }
}
