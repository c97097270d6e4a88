// SPDX-License-Identifier: MIT OR Apache-2.0
//! Visject surface inspector.
//!
//! Loads a saved surface, runs the node load lifecycle against the engine
//! types plus an optional type database, and logs the resulting node and
//! port layout.

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use visject_surface::archetypes::packing;
use visject_surface::reflection::RegistryError;
use visject_surface::{
    Graph, LoadContext, NodeArchetype, SurfaceData, SurfaceError, SurfaceStyle, TypeRegistry,
};

/// Error reported by the inspector
#[derive(Debug, thiserror::Error)]
enum InspectError {
    #[error(transparent)]
    Surface(#[from] SurfaceError),

    #[error("Failed to load types: {0}")]
    Registry(#[from] RegistryError),

    #[error("Failed to load style: {0}")]
    Style(#[from] std::io::Error),
}

/// Inspect a saved Visject surface
#[derive(Debug, Parser)]
#[command(name = "visject-inspect", version, about)]
struct Options {
    /// Saved surface (RON)
    surface: PathBuf,

    /// Extra reflected types (RON list of type descriptors)
    #[arg(long)]
    types: Option<PathBuf>,

    /// Node sizing metrics (RON)
    #[arg(long)]
    style: Option<PathBuf>,
}

/// Loaded surface plus the structure nodes the loaded types make available
struct Inspection {
    graph: Graph,
    spawnable: Vec<NodeArchetype>,
}

fn run(options: &Options) -> Result<Inspection, InspectError> {
    let style = match &options.style {
        Some(path) => SurfaceStyle::load(path)?,
        None => SurfaceStyle::default(),
    };

    let mut types = TypeRegistry::with_engine_types();
    if let Some(path) = &options.types {
        let count = types.extend_from_file(path)?;
        tracing::info!("Loaded {count} types from {}", path.display());
    }

    let registry = packing::create_packing_registry();
    let data = SurfaceData::load(&options.surface)?;
    let ctx = LoadContext::new(&types, &style);
    let graph = data.instantiate(&registry, &ctx)?;

    Ok(Inspection {
        graph,
        spawnable: packing::structure_archetypes(&types),
    })
}

fn report(inspection: &Inspection) {
    let graph = &inspection.graph;
    tracing::info!(
        "Surface '{}': {} nodes, {} connections",
        graph.name,
        graph.node_count(),
        graph.connection_count()
    );
    for node in graph.nodes() {
        tracing::info!(
            "[{}] {} ({:.0}x{:.0})",
            node.type_id,
            node.title,
            node.size[0],
            node.size[1]
        );
        if let Some(tooltip) = &node.tooltip {
            tracing::debug!("  {}", tooltip.replace('\n', " | "));
        }
        for port in node.ports() {
            tracing::info!(
                "  #{:<2} {:?} {} : {}",
                port.box_id,
                port.direction,
                port.name,
                port.port_type.type_name()
            );
        }
    }

    for arch in &inspection.spawnable {
        tracing::info!(
            "Spawnable [{}] {} ({})",
            arch.type_id,
            arch.title,
            arch.default_type_name().unwrap_or_default()
        );
    }
}

fn main() {
    let options = Options::parse();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new("visject_inspect=info,visject_surface=info")
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run(&options) {
        Ok(inspection) => report(&inspection),
        Err(e) => {
            tracing::error!("{e}");
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_all_options() {
        let options = Options::try_parse_from([
            "visject-inspect",
            "--types",
            "t.ron",
            "graph.ron",
            "--style",
            "s.ron",
        ])
        .unwrap();
        assert_eq!(options.surface, PathBuf::from("graph.ron"));
        assert_eq!(options.types, Some(PathBuf::from("t.ron")));
        assert_eq!(options.style, Some(PathBuf::from("s.ron")));
    }

    #[test]
    fn test_optional_files_default_to_none() {
        let options = Options::try_parse_from(["visject-inspect", "graph.ron"]).unwrap();
        assert_eq!(options.types, None);
        assert_eq!(options.style, None);
    }

    #[test]
    fn test_parse_errors() {
        assert!(Options::try_parse_from(["visject-inspect"]).is_err());
        assert!(Options::try_parse_from(["visject-inspect", "a.ron", "b.ron"]).is_err());
        assert!(Options::try_parse_from(["visject-inspect", "a.ron", "--types"]).is_err());
        assert!(Options::try_parse_from(["visject-inspect", "a.ron", "--verbose"]).is_err());
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Options::command().debug_assert();
    }
}
