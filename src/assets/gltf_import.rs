use crate::assets::LoadError;
use crate::scene::{AuthoredMaterial, Bounds, MeshData, NodeId, NodeKind, SceneGraph, Transform};
use glam::{Quat, Vec3};

/// Required extensions that only touch vertex payloads, which are never read here.
const PAYLOAD_ONLY_EXTENSIONS: &[&str] = &["KHR_draco_mesh_compression"];

/// Decodes a `.glb`/`.gltf` into a node tree.
///
/// Only the hierarchy, names, base colors and position bounds are read, so external buffers do
/// not need to be resolved. Node kinds:
/// - the glTF scene becomes a `Group`
/// - a node without a mesh is a `Group` when it has children, `Other` otherwise
/// - a node with one primitive and no children is a `Mesh`
/// - a node with several primitives (or a mesh plus children) is a `Group` holding one `Mesh`
///   per primitive followed by its child nodes
pub fn decode_model(path: &str, bytes: &[u8]) -> Result<SceneGraph, LoadError> {
    let document = parse_document(bytes).map_err(|source| LoadError::Decode {
        path: path.to_string(),
        source,
    })?;
    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .ok_or_else(|| LoadError::EmptyAsset {
            path: path.to_string(),
        })?;

    let scene_name = scene.name().unwrap_or("Scene");
    let mut graph = SceneGraph::new(scene_name, NodeKind::Group);
    let root = graph.root();
    for node in scene.nodes() {
        import_node(&mut graph, root, &node);
    }
    log::debug!(
        "Decoded {} ({} nodes from scene '{}')",
        path,
        graph.len(),
        scene_name
    );
    Ok(graph)
}

/// Parses and validates the JSON chunk, tolerating compressed vertex payloads.
fn parse_document(bytes: &[u8]) -> Result<gltf::Document, gltf::Error> {
    let glb;
    let json: &[u8] = if bytes.starts_with(b"glTF") {
        glb = gltf::Glb::from_slice(bytes)?;
        &glb.json
    } else {
        bytes
    };
    let mut root = gltf::json::Root::from_slice(json).map_err(gltf::Error::Deserialize)?;
    root.extensions_required
        .retain(|name| !PAYLOAD_ONLY_EXTENSIONS.contains(&name.as_str()));
    gltf::Document::from_json(root)
}

fn import_node(graph: &mut SceneGraph, parent: NodeId, node: &gltf::Node<'_>) {
    let name = node
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("Node_{}", node.index()));
    let has_children = node.children().next().is_some();
    let transform = node_transform(node);

    let id = match node.mesh() {
        Some(mesh) => {
            let primitives: Vec<gltf::Primitive<'_>> = mesh.primitives().collect();
            if primitives.len() == 1 && !has_children {
                graph.add_mesh(parent, &name, mesh_data(&primitives[0]))
            } else {
                let group = graph.add_group(parent, &name);
                let mesh_name = mesh
                    .name()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("Mesh_{}", mesh.index()));
                for primitive in &primitives {
                    graph.add_mesh(group, &mesh_name, mesh_data(primitive));
                }
                group
            }
        }
        None if has_children => graph.add_group(parent, &name),
        None => graph.add_other(parent, &name),
    };
    if let Some(created) = graph.get_mut(id) {
        created.transform = transform;
    }

    for child in node.children() {
        import_node(graph, id, &child);
    }
}

fn node_transform(node: &gltf::Node<'_>) -> Transform {
    let (translation, rotation, scale) = node.transform().decomposed();
    Transform {
        translation: Vec3::from_array(translation),
        rotation: Quat::from_array(rotation),
        scale: Vec3::from_array(scale),
    }
}

fn mesh_data(primitive: &gltf::Primitive<'_>) -> MeshData {
    let material = primitive.material();
    let authored = AuthoredMaterial {
        name: material.name().map(str::to_string),
        base_color_rgba: material.pbr_metallic_roughness().base_color_factor(),
    };
    MeshData::new(authored, position_bounds(primitive))
}

fn position_bounds(primitive: &gltf::Primitive<'_>) -> Option<Bounds> {
    let accessor = primitive.get(&gltf::Semantic::Positions)?;
    let min: [f32; 3] = serde_json::from_value(accessor.min()?).ok()?;
    let max: [f32; 3] = serde_json::from_value(accessor.max()?).ok()?;
    Some(Bounds {
        min: Vec3::from_array(min),
        max: Vec3::from_array(max),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TILE: &str = r#"{
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [ { "name": "Tile", "nodes": [0, 3] } ],
        "nodes": [
            { "name": "Context", "children": [1, 2] },
            { "name": "Tower", "mesh": 0, "translation": [1.0, 0.0, 0.0] },
            { "name": "Marker" },
            { "name": "Site", "mesh": 1 }
        ],
        "materials": [
            { "name": "Glass", "pbrMetallicRoughness": { "baseColorFactor": [0.1, 0.2, 0.3, 1.0] } },
            { "name": "Grass" }
        ],
        "buffers": [ { "byteLength": 36 } ],
        "bufferViews": [ { "buffer": 0, "byteLength": 36 } ],
        "accessors": [
            {
                "bufferView": 0,
                "componentType": 5126,
                "count": 3,
                "type": "VEC3",
                "min": [-1.0, 0.0, -2.0],
                "max": [1.0, 3.0, 2.0]
            }
        ],
        "meshes": [
            { "name": "TowerMesh", "primitives": [ { "attributes": { "POSITION": 0 }, "material": 0 } ] },
            { "name": "SiteMesh", "primitives": [
                { "attributes": { "POSITION": 0 }, "material": 0 },
                { "attributes": { "POSITION": 0 }, "material": 1 }
            ] }
        ]
    }"#;

    fn kinds(graph: &SceneGraph) -> Vec<(String, NodeKind, Option<String>)> {
        graph
            .descendants(graph.root())
            .filter_map(|id| {
                let node = graph.get(id)?;
                Some((
                    node.name.clone(),
                    node.kind,
                    graph.parent_name(id).map(str::to_string),
                ))
            })
            .collect()
    }

    #[test]
    fn maps_nodes_to_documented_kinds() {
        let graph = decode_model("tile.gltf", TILE.as_bytes()).unwrap();
        let expected = vec![
            ("Tile".to_string(), NodeKind::Group, None),
            ("Context".to_string(), NodeKind::Group, Some("Tile".to_string())),
            ("Tower".to_string(), NodeKind::Mesh, Some("Context".to_string())),
            ("Marker".to_string(), NodeKind::Other, Some("Context".to_string())),
            ("Site".to_string(), NodeKind::Group, Some("Tile".to_string())),
            ("SiteMesh".to_string(), NodeKind::Mesh, Some("Site".to_string())),
            ("SiteMesh".to_string(), NodeKind::Mesh, Some("Site".to_string())),
        ];
        assert_eq!(kinds(&graph), expected);
    }

    #[test]
    fn reads_materials_bounds_and_transforms() {
        let graph = decode_model("tile.gltf", TILE.as_bytes()).unwrap();
        let tower = graph
            .descendants(graph.root())
            .find(|id| graph.get(*id).map(|node| node.name == "Tower").unwrap_or(false))
            .unwrap();
        let node = graph.get(tower).unwrap();
        let mesh = node.mesh.as_ref().unwrap();

        assert_eq!(mesh.authored.name.as_deref(), Some("Glass"));
        assert_eq!(mesh.authored.base_color_rgba, [0.1, 0.2, 0.3, 1.0]);
        let bounds = mesh.bounds.unwrap();
        assert_eq!(bounds.min, Vec3::new(-1.0, 0.0, -2.0));
        assert_eq!(bounds.max, Vec3::new(1.0, 3.0, 2.0));
        assert_eq!(node.transform.translation, Vec3::new(1.0, 0.0, 0.0));
    }

    const DRACO_TILE: &str = r#"{
        "asset": { "version": "2.0" },
        "extensionsUsed": ["KHR_draco_mesh_compression"],
        "extensionsRequired": ["KHR_draco_mesh_compression"],
        "scene": 0,
        "scenes": [ { "name": "Tile", "nodes": [0] } ],
        "nodes": [
            { "name": "Context", "children": [1] },
            { "name": "Tower", "mesh": 0 }
        ],
        "buffers": [ { "byteLength": 64 } ],
        "bufferViews": [ { "buffer": 0, "byteLength": 64 } ],
        "accessors": [
            {
                "componentType": 5126,
                "count": 3,
                "type": "VEC3",
                "min": [0.0, 0.0, 0.0],
                "max": [2.0, 4.0, 2.0]
            }
        ],
        "meshes": [
            { "name": "TowerMesh", "primitives": [ {
                "attributes": { "POSITION": 0 },
                "extensions": {
                    "KHR_draco_mesh_compression": { "bufferView": 0, "attributes": { "POSITION": 0 } }
                }
            } ] }
        ]
    }"#;

    #[test]
    fn draco_compressed_tiles_decode() {
        let graph = decode_model("tile.gltf", DRACO_TILE.as_bytes()).unwrap();
        let expected = vec![
            ("Tile".to_string(), NodeKind::Group, None),
            ("Context".to_string(), NodeKind::Group, Some("Tile".to_string())),
            ("Tower".to_string(), NodeKind::Mesh, Some("Context".to_string())),
        ];
        assert_eq!(kinds(&graph), expected);

        let tower = graph
            .descendants(graph.root())
            .find(|id| graph.get(*id).map(|node| node.name == "Tower").unwrap_or(false))
            .unwrap();
        let bounds = graph.get(tower).unwrap().mesh.as_ref().unwrap().bounds.unwrap();
        assert_eq!(bounds.max, Vec3::new(2.0, 4.0, 2.0));
    }

    #[test]
    fn other_required_extensions_are_still_rejected() {
        let unknown = DRACO_TILE.replace(
            r#""extensionsRequired": ["KHR_draco_mesh_compression"]"#,
            r#""extensionsRequired": ["KHR_draco_mesh_compression", "EXT_not_supported"]"#,
        );
        let err = decode_model("tile.gltf", unknown.as_bytes()).unwrap_err();
        assert!(matches!(err, LoadError::Decode { .. }));
    }

    #[test]
    fn rejects_garbage_and_scene_less_assets() {
        let err = decode_model("junk.glb", b"\x00\x01junk").unwrap_err();
        assert!(err.is_decode_failure());
        assert!(matches!(err, LoadError::Decode { .. }));

        let empty = r#"{ "asset": { "version": "2.0" } }"#;
        let err = decode_model("empty.gltf", empty.as_bytes()).unwrap_err();
        assert!(matches!(err, LoadError::EmptyAsset { .. }));
    }
}
