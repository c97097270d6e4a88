// SPDX-License-Identifier: MIT OR Apache-2.0
//! Visual scripting surface model.
//!
//! This crate provides the editor-side graph model for reflected types:
//! - Typed ports with cast rules and generic connection hints
//! - Structure Pack/Unpack nodes whose ports follow a reflected type
//! - A compact binary field layout cached on each structure node
//! - A compatibility oracle for the spawn menu
//! - Saved surfaces that reload without the originating module
//!
//! ## Architecture
//!
//! Archetypes declare node kinds and are registered in a [`NodeRegistry`].
//! Nodes live in a [`Graph`], which validates connections and drives the load
//! lifecycle. Reflection is reached through the [`TypeIntrospector`] trait so
//! hosts can plug in their own type database.

pub mod append;
pub mod archetypes;
pub mod connection;
pub mod graph;
pub mod layout;
pub mod node;
pub mod oracle;
pub mod port;
pub mod reflection;
pub mod structure;
pub mod style;
pub mod surface;
pub mod variant;

pub use connection::{Connection, ConnectionId, Endpoint};
pub use graph::{ConnectionError, Graph};
pub use layout::{FieldLayoutEntry, StructureLayout};
pub use node::{
    GraphKind, Node, NodeArchetype, NodeFlags, NodeId, NodeKind, NodeRegistry, NodeValues,
    StructureNodeState,
};
pub use port::{ConnectionsHint, Port, PortDirection, PortId, PortType, PortValue};
pub use reflection::{TypeDescriptor, TypeIntrospector, TypeRegistry};
pub use structure::{LoadContext, StructureLoad};
pub use style::SurfaceStyle;
pub use surface::{SurfaceData, SurfaceError};
