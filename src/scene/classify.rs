//! Splits a loaded model into material tiers by the name of each mesh's direct parent group.

use crate::config::Palette;
use crate::scene::{MeshMaterial, NodeId, NodeKind, SceneGraph};

/// Distinct group names in first-encountered order. Entry 0 is the base collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionRegistry {
    names: Vec<String>,
}

impl CollectionRegistry {
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut registry = Self::default();
        for name in names {
            registry.insert(name.into());
        }
        registry
    }

    fn insert(&mut self, name: String) {
        if !self.names.contains(&name) {
            self.names.push(name);
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn base(&self) -> Option<&str> {
        self.names.first().map(String::as_str)
    }

    pub fn is_context(&self, name: &str) -> bool {
        self.names.iter().skip(1).any(|entry| entry == name)
    }

    pub fn tier_for_parent(&self, parent_name: Option<&str>) -> MaterialTier {
        match parent_name {
            Some(name) if self.base() == Some(name) => MaterialTier::Base,
            Some(name) if self.is_context(name) => MaterialTier::Context,
            _ => MaterialTier::Site,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialTier {
    /// Left as authored.
    Base,
    /// Flat `color2`.
    Context,
    /// Flat `color3`.
    Site,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassificationReport {
    pub base: usize,
    pub context: usize,
    pub site: usize,
    /// Number of meshes whose material was different before this pass.
    pub changed: usize,
}

impl ClassificationReport {
    pub fn total(&self) -> usize {
        self.base + self.context + self.site
    }
}

/// Collects every group name under `root` in depth-first order.
pub fn classify(graph: &SceneGraph, root: NodeId) -> CollectionRegistry {
    let mut registry = CollectionRegistry::default();
    for id in graph.descendants(root) {
        if let Some(node) = graph.get(id) {
            if node.kind == NodeKind::Group {
                registry.insert(node.name.clone());
            }
        }
    }
    if registry.is_empty() {
        log::debug!("Model has no groups; every mesh falls into the site tier");
    }
    registry
}

pub fn tier_of(graph: &SceneGraph, registry: &CollectionRegistry, mesh: NodeId) -> MaterialTier {
    registry.tier_for_parent(graph.parent_name(mesh))
}

/// Recolors every mesh reachable from `root` (including `root` itself) according to its tier.
pub fn apply_materials(
    graph: &mut SceneGraph,
    root: NodeId,
    registry: &CollectionRegistry,
    palette: &Palette,
) -> ClassificationReport {
    let meshes: Vec<NodeId> = graph
        .descendants(root)
        .filter(|id| {
            graph
                .get(*id)
                .map(|node| node.kind == NodeKind::Mesh)
                .unwrap_or(false)
        })
        .collect();

    let mut report = ClassificationReport::default();
    for id in meshes {
        let tier = tier_of(graph, registry, id);
        let target = match tier {
            MaterialTier::Base => {
                report.base += 1;
                continue;
            }
            MaterialTier::Context => {
                report.context += 1;
                MeshMaterial::Flat(palette.color2)
            }
            MaterialTier::Site => {
                report.site += 1;
                MeshMaterial::Flat(palette.color3)
            }
        };
        let Some(mesh) = graph.get_mut(id).and_then(|node| node.mesh.as_mut()) else {
            continue;
        };
        if mesh.material != target {
            mesh.material = target;
            report.changed += 1;
        }
    }
    log::debug!(
        "Applied materials: base={} context={} site={} changed={}",
        report.base,
        report.context,
        report.site,
        report.changed
    );
    report
}
