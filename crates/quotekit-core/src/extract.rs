use crate::error::GeometryParseError;
use crate::geom::{cubic_meters_to_cubic_inches, TriMesh};
use crate::model::{Component, MaterialAnnotations};
use crate::names::canonical_name;
use crate::report::Warning;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// Label decoration stripped, with everything after it, to form the
    /// canonical component name.
    pub suffix_marker: String,
    /// Name given to the component of a standalone single-body file.
    pub standalone_name: String,
    /// The only material the annotation heuristic can hint at.
    pub hinted_material: String,
    /// Vertex weld tolerance as a fraction of the body's bounding-box diagonal.
    pub weld_tolerance_factor: f64,
    /// Tessellation chord tolerance as a fraction of the shell's diagonal.
    pub tessellation_tolerance_factor: f64,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            suffix_marker: "_Default<As Machined>".to_string(),
            standalone_name: "Component".to_string(),
            hinted_material: "Steel".to_string(),
            weld_tolerance_factor: 1e-9,
            tessellation_tolerance_factor: 0.001,
        }
    }
}

/// A labelled solid body. Assembly occurrences of the same part share one mesh.
#[derive(Debug, Clone)]
pub struct Body {
    pub label: String,
    pub mesh: Rc<TriMesh>,
}

/// Parsed geometry, in meters.
#[derive(Debug, Clone)]
pub enum Scene {
    Assembly(Vec<Body>),
    Standalone(TriMesh),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractStats {
    pub bodies_total: usize,
    pub empty_bodies: usize,
    pub non_watertight: usize,
    pub reoriented_faces: usize,
    pub merged_duplicates: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Extraction {
    pub components: Vec<Component>,
    pub stats: ExtractStats,
    pub warnings: Vec<Warning>,
}

/// Volume of one body, in cubic inches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyVolume {
    pub cubic_inches: f64,
    pub watertight: bool,
    pub reoriented_faces: usize,
}

/// Best-effort volume: open meshes are measured anyway after their winding is
/// repaired.
pub fn measure_volume(mesh: &TriMesh) -> BodyVolume {
    let watertight = mesh.is_watertight();
    let mut fixed = mesh.clone();
    let reoriented_faces = fixed.fix_normals();
    BodyVolume {
        cubic_inches: cubic_meters_to_cubic_inches(fixed.volume()),
        watertight,
        reoriented_faces,
    }
}

pub struct Extractor {
    cfg: ExtractConfig,
}

impl Extractor {
    pub fn new(cfg: ExtractConfig) -> Self {
        Self { cfg }
    }

    pub fn extract(
        &self,
        scene: &Scene,
        annotations: &MaterialAnnotations,
    ) -> Result<Extraction, GeometryParseError> {
        let mut stats = ExtractStats::default();
        let mut warnings = Vec::new();
        let mut components: Vec<Component> = Vec::new();
        let mut by_name: HashMap<String, usize> = HashMap::new();

        let bodies: Vec<(&str, &TriMesh)> = match scene {
            Scene::Assembly(bodies) => bodies
                .iter()
                .map(|b| (b.label.as_str(), b.mesh.as_ref()))
                .collect(),
            Scene::Standalone(mesh) => vec![(self.cfg.standalone_name.as_str(), mesh)],
        };

        for (label, mesh) in bodies {
            stats.bodies_total += 1;
            if mesh.is_empty() {
                stats.empty_bodies += 1;
                log::debug!("skipping empty body {label:?}");
                warnings.push(Warning {
                    code: "empty_body_skipped".to_string(),
                    message: format!("Body {label:?} has no triangles and was skipped."),
                });
                continue;
            }

            let name = canonical_name(label, &self.cfg.suffix_marker);
            if let Some(&idx) = by_name.get(&name) {
                // Same canonical name: another instance of an already-measured part.
                components[idx].quantity += 1;
                stats.merged_duplicates += 1;
                continue;
            }

            let measured = measure_volume(mesh);
            stats.reoriented_faces += measured.reoriented_faces;
            if !measured.watertight {
                stats.non_watertight += 1;
                log::warn!(
                    "mesh for {name:?} is not watertight ({} boundary edges); volume may be inexact",
                    mesh.boundary_edge_count()
                );
                warnings.push(Warning {
                    code: "mesh_not_watertight".to_string(),
                    message: format!("Mesh for {name:?} is not watertight; its volume may be inexact."),
                });
            }

            log::debug!(
                "body {name:?}: {} vertices, {} faces, {} in³",
                mesh.vertex_count(),
                mesh.face_count(),
                measured.cubic_inches
            );

            by_name.insert(name.clone(), components.len());
            components.push(Component {
                material_hint: annotations.hint_for(&name, &self.cfg.hinted_material),
                name,
                volume: measured.cubic_inches,
                vertex_count: mesh.vertex_count(),
                face_count: mesh.face_count(),
                quantity: 1,
            });
        }

        if components.is_empty() {
            return Err(GeometryParseError::NoSolids);
        }

        log::info!(
            "extracted {} components from {} bodies ({} merged, {} empty, {} not watertight)",
            components.len(),
            stats.bodies_total,
            stats.merged_duplicates,
            stats.empty_bodies,
            stats.non_watertight
        );

        Ok(Extraction {
            components,
            stats,
            warnings,
        })
    }
}
