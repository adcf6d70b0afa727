pub mod classify;
pub mod sun;

use crate::config::Rgb;
use glam::{Quat, Vec3};

/// Stable index of a node inside a [`SceneGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Group,
    Mesh,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    /// Applies `local` inside the space described by `self`.
    pub fn then(&self, local: &Transform) -> Transform {
        Transform {
            translation: self.translation + self.rotation * (self.scale * local.translation),
            rotation: self.rotation * local.rotation,
            scale: self.scale * local.scale,
        }
    }

    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.translation + self.rotation * (self.scale * point)
    }
}

/// Material as it came out of the asset file.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthoredMaterial {
    pub name: Option<String>,
    pub base_color_rgba: [f32; 4],
}

impl Default for AuthoredMaterial {
    fn default() -> Self {
        Self {
            name: None,
            base_color_rgba: [1.0, 1.0, 1.0, 1.0],
        }
    }
}

/// Material currently bound to a mesh.
#[derive(Debug, Clone, PartialEq)]
pub enum MeshMaterial {
    Authored(AuthoredMaterial),
    Flat(Rgb),
}

impl MeshMaterial {
    /// Linear RGBA as a shader would consume it.
    pub fn linear_rgba(&self) -> [f32; 4] {
        match self {
            MeshMaterial::Authored(material) => material.base_color_rgba,
            MeshMaterial::Flat(color) => {
                let [r, g, b] = color.to_linear_f32();
                [r, g, b, 1.0]
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl Bounds {
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn extent(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    pub fn corners(&self) -> [Vec3; 8] {
        let (lo, hi) = (self.min, self.max);
        [
            Vec3::new(lo.x, lo.y, lo.z),
            Vec3::new(hi.x, lo.y, lo.z),
            Vec3::new(lo.x, hi.y, lo.z),
            Vec3::new(hi.x, hi.y, lo.z),
            Vec3::new(lo.x, lo.y, hi.z),
            Vec3::new(hi.x, lo.y, hi.z),
            Vec3::new(lo.x, hi.y, hi.z),
            Vec3::new(hi.x, hi.y, hi.z),
        ]
    }

    pub fn union(&self, other: &Bounds) -> Bounds {
        Bounds {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeshData {
    pub authored: AuthoredMaterial,
    pub material: MeshMaterial,
    pub bounds: Option<Bounds>,
}

impl MeshData {
    pub fn new(authored: AuthoredMaterial, bounds: Option<Bounds>) -> Self {
        Self {
            material: MeshMaterial::Authored(authored.clone()),
            authored,
            bounds,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    pub kind: NodeKind,
    pub transform: Transform,
    pub mesh: Option<MeshData>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl SceneNode {
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// Arena-backed node tree. Parents are looked up by index and never own anything; removed
/// subtrees leave empty slots so outstanding ids can't alias new nodes.
#[derive(Debug, Clone)]
pub struct SceneGraph {
    nodes: Vec<Option<SceneNode>>,
    root: NodeId,
}

impl SceneGraph {
    pub fn new(root_name: &str, root_kind: NodeKind) -> Self {
        let root = SceneNode {
            name: root_name.to_string(),
            kind: root_kind,
            transform: Transform::default(),
            mesh: root_kind_mesh(root_kind),
            parent: None,
            children: Vec::new(),
        };
        Self {
            nodes: vec![Some(root)],
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn get(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id.0).and_then(|slot| slot.as_ref())
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.nodes.get_mut(id.0).and_then(|slot| slot.as_mut())
    }

    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn add_group(&mut self, parent: NodeId, name: &str) -> NodeId {
        self.push_node(Some(parent), name, NodeKind::Group, None)
    }

    pub fn add_mesh(&mut self, parent: NodeId, name: &str, mesh: MeshData) -> NodeId {
        self.push_node(Some(parent), name, NodeKind::Mesh, Some(mesh))
    }

    pub fn add_other(&mut self, parent: NodeId, name: &str) -> NodeId {
        self.push_node(Some(parent), name, NodeKind::Other, None)
    }

    /// Creates a mesh that belongs to no parent. It is never reached from the root.
    pub fn add_detached_mesh(&mut self, name: &str, mesh: MeshData) -> NodeId {
        self.push_node(None, name, NodeKind::Mesh, Some(mesh))
    }

    fn push_node(
        &mut self,
        parent: Option<NodeId>,
        name: &str,
        kind: NodeKind,
        mesh: Option<MeshData>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        let parent = parent.filter(|parent| self.get(*parent).is_some());
        self.nodes.push(Some(SceneNode {
            name: name.to_string(),
            kind,
            transform: Transform::default(),
            mesh,
            parent,
            children: Vec::new(),
        }));
        if let Some(parent) = parent {
            if let Some(node) = self.get_mut(parent) {
                node.children.push(id);
            }
        }
        id
    }

    pub fn parent_name(&self, id: NodeId) -> Option<&str> {
        let parent = self.get(id)?.parent?;
        self.get(parent).map(|node| node.name.as_str())
    }

    /// Depth-first pre-order walk from `start`, children in insertion order.
    pub fn descendants(&self, start: NodeId) -> Descendants<'_> {
        let stack = if self.get(start).is_some() {
            vec![start]
        } else {
            Vec::new()
        };
        Descendants { graph: self, stack }
    }

    /// Copies every node of `other` under `parent`, returning the id of `other`'s root in `self`.
    pub fn graft(&mut self, parent: NodeId, other: SceneGraph) -> Option<NodeId> {
        self.get(parent)?;
        let base = self.nodes.len();
        let remap = |id: NodeId| NodeId(id.0 + base);
        let other_root = remap(other.root);
        for slot in other.nodes {
            self.nodes.push(slot.map(|mut node| {
                node.parent = node.parent.map(remap);
                node.children = node.children.into_iter().map(remap).collect();
                node
            }));
        }
        if let Some(root) = self.get_mut(other_root) {
            root.parent = Some(parent);
        }
        if let Some(node) = self.get_mut(parent) {
            node.children.push(other_root);
        }
        Some(other_root)
    }

    /// Unlinks `id` from its parent and frees it and everything under it.
    pub fn remove_subtree(&mut self, id: NodeId) -> usize {
        if id == self.root {
            return 0;
        }
        let Some(parent) = self.get(id).map(|node| node.parent) else {
            return 0;
        };
        if let Some(parent) = parent.and_then(|parent| self.get_mut(parent)) {
            parent.children.retain(|child| *child != id);
        }
        let doomed: Vec<NodeId> = self.descendants(id).collect();
        for node in &doomed {
            self.nodes[node.0] = None;
        }
        doomed.len()
    }

    /// World transform of a node, composed from its ancestors.
    pub fn world_transform(&self, id: NodeId) -> Transform {
        let mut chain = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let Some(node) = self.get(current) else {
                break;
            };
            chain.push(node.transform);
            cursor = node.parent;
        }
        chain
            .into_iter()
            .rev()
            .fold(Transform::default(), |world, local| world.then(&local))
    }

    pub fn mesh_bounds(&self, start: NodeId) -> Option<Bounds> {
        self.descendants(start)
            .filter_map(|id| {
                let node = self.get(id)?;
                let bounds = node.mesh.as_ref()?.bounds?;
                let world = self.world_transform(id);
                bounds
                    .corners()
                    .into_iter()
                    .map(|corner| world.transform_point(corner))
                    .map(|point| Bounds {
                        min: point,
                        max: point,
                    })
                    .reduce(|acc, point| acc.union(&point))
            })
            .reduce(|acc, bounds| acc.union(&bounds))
    }
}

fn root_kind_mesh(kind: NodeKind) -> Option<MeshData> {
    match kind {
        NodeKind::Mesh => Some(MeshData::new(AuthoredMaterial::default(), None)),
        _ => None,
    }
}

pub struct Descendants<'a> {
    graph: &'a SceneGraph,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        if let Some(node) = self.graph.get(id) {
            self.stack.extend(node.children.iter().rev().copied());
        }
        Some(id)
    }
}
