use crate::assets::{AttachOutcome, LoadTicket, LoadedModel, ModelSlot};
use crate::config::{Palette, SettingsStore, ViewerConfig};
use crate::render::{AmbientLight, CameraController, OrbitControls, Projection, RenderContext};
use crate::scene::classify::{apply_materials, classify, ClassificationReport, CollectionRegistry};
use crate::scene::sun::SunRig;
use crate::scene::{AuthoredMaterial, Bounds, MeshData, NodeKind, SceneGraph};
use glam::Vec3;

const FLOOR_HALF_SIZE: f32 = 5.0;
const FLOOR_COLOR: [f32; 4] = [0x44 as f32 / 255.0, 0x44 as f32 / 255.0, 0x44 as f32 / 255.0, 1.0];

/// The live scene: floor, sun, camera and the slot the loaded model lands in.
pub struct Stage {
    pub graph: SceneGraph,
    pub camera: CameraController,
    pub orbit: OrbitControls,
    pub sun: SunRig,
    pub ambient: AmbientLight,
    pub render: RenderContext,
    models: ModelSlot,
    model_name: Option<String>,
    registry: CollectionRegistry,
    report: ClassificationReport,
}

impl Stage {
    pub fn new(config: &ViewerConfig, render: RenderContext) -> Self {
        let mut graph = SceneGraph::new("World", NodeKind::Other);
        let root = graph.root();
        graph.add_mesh(
            root,
            "Floor",
            MeshData::new(
                AuthoredMaterial {
                    name: Some("Floor".to_string()),
                    base_color_rgba: FLOOR_COLOR,
                },
                Some(Bounds {
                    min: Vec3::new(-FLOOR_HALF_SIZE, 0.0, -FLOOR_HALF_SIZE),
                    max: Vec3::new(FLOOR_HALF_SIZE, 0.0, FLOOR_HALF_SIZE),
                }),
            ),
        );
        let sun = SunRig::spawn(&mut graph, root);

        let mut camera = CameraController::new(
            Vec3::from_array(config.camera_position),
            Vec3::from_array(config.camera_target),
            config.movement_speed,
        );
        camera.projection = Projection {
            fov_y_deg: config.fov_deg,
            ..Projection::default()
        };

        Self {
            graph,
            camera,
            orbit: OrbitControls::default(),
            sun,
            ambient: AmbientLight::default(),
            render,
            models: ModelSlot::new(root, config.model_scale),
            model_name: None,
            registry: CollectionRegistry::default(),
            report: ClassificationReport::default(),
        }
    }

    /// Issues a ticket for a new load. Any load already in flight can no longer attach.
    pub fn begin_load(&mut self) -> LoadTicket {
        self.models.begin()
    }

    pub fn is_current(&self, ticket: LoadTicket) -> bool {
        self.models.is_current(ticket)
    }

    /// Attaches a finished load and re-reads its collections. Materials are applied on the next
    /// frame through the settings dirty flag.
    pub fn attach_model(
        &mut self,
        ticket: LoadTicket,
        model: LoadedModel,
        settings: &mut SettingsStore,
    ) -> AttachOutcome {
        let outcome = self.models.attach(&mut self.graph, ticket, model.graph);
        match outcome {
            AttachOutcome::Attached { root, replaced } => {
                self.registry = classify(&self.graph, root);
                self.report = ClassificationReport::default();
                self.model_name = Some(model.name);
                settings.request_material_pass();
                log::info!(
                    "Attached {} from {} ({} collections{})",
                    self.model_name.as_deref().unwrap_or("model"),
                    model.path,
                    self.registry.names().len(),
                    if replaced { ", replaced previous model" } else { "" }
                );
            }
            AttachOutcome::Stale => {
                log::info!("Discarded superseded load of {}", model.path);
            }
            AttachOutcome::AlreadyAttached => {
                log::debug!("Load of {} was already attached", model.path);
            }
        }
        outcome
    }

    /// Recolors the attached model. Returns `None` while no model is attached.
    pub fn apply_palette(&mut self, palette: &Palette) -> Option<ClassificationReport> {
        let root = self.models.model_root()?;
        self.report = apply_materials(&mut self.graph, root, &self.registry, palette);
        log::debug!(
            "Material pass: {} base, {} context, {} site ({} changed)",
            self.report.base,
            self.report.context,
            self.report.site,
            self.report.changed
        );
        Some(self.report)
    }

    pub fn registry(&self) -> &CollectionRegistry {
        &self.registry
    }

    pub fn report(&self) -> ClassificationReport {
        self.report
    }

    pub fn model_name(&self) -> Option<&str> {
        self.model_name.as_deref()
    }

    pub fn model_bounds(&self) -> Option<Bounds> {
        self.graph.mesh_bounds(self.models.model_root()?)
    }

    /// Points the camera at the attached model.
    pub fn frame_model(&mut self) -> bool {
        match self.model_bounds() {
            Some(bounds) => {
                self.camera.frame_bounds(&bounds);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::scene::MeshMaterial;
    use winit::dpi::PhysicalSize;

    pub(crate) fn tiled_model() -> LoadedModel {
        let mut graph = SceneGraph::new("Tile", NodeKind::Group);
        let root = graph.root();
        let base = graph.add_group(root, "Base");
        graph.add_mesh(base, "Terrain", MeshData::new(AuthoredMaterial::default(), None));
        let context = graph.add_group(root, "Ctx1");
        graph.add_mesh(
            context,
            "Tower",
            MeshData::new(
                AuthoredMaterial::default(),
                Some(Bounds {
                    min: Vec3::new(-1.0, 0.0, -1.0),
                    max: Vec3::new(1.0, 4.0, 1.0),
                }),
            ),
        );
        LoadedModel {
            name: "tile.glb".to_string(),
            path: "models/tile.glb".to_string(),
            graph,
        }
    }

    pub(crate) fn stage() -> Stage {
        Stage::new(
            &ViewerConfig::default(),
            RenderContext::headless(PhysicalSize::new(640, 480), 1.0),
        )
    }

    fn settings() -> SettingsStore {
        SettingsStore::new(ViewerConfig::default().initial_settings())
    }

    #[test]
    fn new_stage_has_floor_and_sun() {
        let stage = stage();
        let names: Vec<&str> = stage
            .graph
            .descendants(stage.graph.root())
            .filter_map(|id| stage.graph.get(id).map(|node| node.name.as_str()))
            .collect();
        assert_eq!(names, vec!["World", "Floor", "Sun"]);
        assert_eq!(stage.camera.position, Vec3::new(2.0, 2.0, 5.0));
        assert_eq!(stage.camera.projection.fov_y_deg, 75.0);
    }

    #[test]
    fn attach_classifies_and_requests_material_pass() {
        let mut stage = stage();
        let mut settings = settings();
        settings.take_changes();

        let ticket = stage.begin_load();
        let outcome = stage.attach_model(ticket, tiled_model(), &mut settings);
        assert!(matches!(outcome, AttachOutcome::Attached { replaced: false, .. }));
        assert_eq!(stage.registry().names(), ["Tile", "Base", "Ctx1"]);
        assert!(settings.take_changes().materials);

        let report = stage.apply_palette(&settings.snapshot().palette).unwrap();
        // The scene root is entry 0, so Base and Ctx1 both land in the context tier.
        assert_eq!(report.total(), 2);
        assert_eq!(report.context, 2);
    }

    #[test]
    fn palette_without_model_is_noop() {
        let mut stage = stage();
        assert_eq!(stage.apply_palette(&Palette::default()), None);
        let floor = stage
            .graph
            .descendants(stage.graph.root())
            .find_map(|id| stage.graph.get(id).filter(|node| node.name == "Floor"))
            .and_then(|node| node.mesh.as_ref())
            .map(|mesh| mesh.material.clone());
        assert!(matches!(floor, Some(MeshMaterial::Authored(_))));
    }

    #[test]
    fn frame_model_targets_scaled_bounds() {
        let mut stage = stage();
        let mut settings = settings();
        assert!(!stage.frame_model());

        let ticket = stage.begin_load();
        stage.attach_model(ticket, tiled_model(), &mut settings);
        assert!(stage.frame_model());
        // Tower spans y 0..4 at scale 0.05.
        assert!((stage.camera.target.y - 0.1).abs() < 1e-5);
    }
}
