use quotekit_core::error::GeometryParseError;
use quotekit_core::extract::{Body, ExtractConfig, Extraction, Extractor, Scene};
use quotekit_core::model::{MaterialAnnotations, Units};
use std::io::Read;
use std::path::Path;
use std::rc::Rc;
use truck_stepio::r#in::Table;

pub mod annotations;
pub mod entities;
pub mod structure;
mod tessellate;

use annotations::scan_material_annotations;
use entities::scan_entities;
use structure::{analyze_structure, ModelStructure};

/// Geometry and side information read from one STEP document.
#[derive(Debug, Clone)]
pub struct LoadedStep {
    pub scene: Scene,
    pub annotations: MaterialAnnotations,
    pub units: Units,
}

pub fn import_step(path: &Path, cfg: &ExtractConfig) -> Result<Extraction, GeometryParseError> {
    let file = std::fs::File::open(path)?;
    extract_components(file, cfg)
}

/// Reads a STEP stream to the end and extracts its components. Invalid UTF-8
/// is replaced rather than rejected; STEP text is ASCII apart from strings.
pub fn extract_components<R: Read>(
    mut reader: R,
    cfg: &ExtractConfig,
) -> Result<Extraction, GeometryParseError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    extract_from_str(&String::from_utf8_lossy(&bytes), cfg)
}

pub fn extract_from_str(raw: &str, cfg: &ExtractConfig) -> Result<Extraction, GeometryParseError> {
    let loaded = load_scene(raw, cfg)?;
    Extractor::new(cfg.clone()).extract(&loaded.scene, &loaded.annotations)
}

/// Parses and tessellates a STEP document into a scene in meters.
pub fn load_scene(raw: &str, cfg: &ExtractConfig) -> Result<LoadedStep, GeometryParseError> {
    let exchange =
        ruststep::parser::parse(raw).map_err(|e| GeometryParseError::Syntax(e.to_string()))?;
    let data = exchange
        .data
        .first()
        .ok_or(GeometryParseError::NoDataSection)?;
    let table = Table::from_data_section(data);

    let entities = scan_entities(raw);
    let annotations = scan_material_annotations(&entities);
    let structure = analyze_structure(&entities);

    if structure.solids.is_empty() {
        return Err(GeometryParseError::NoSolids);
    }
    let mut solids = tessellate::tessellate_solids(&table, &structure.solids, cfg)?;

    let scale = structure.units.meters_per_unit();
    if scale != 1.0 {
        for (_, mesh) in &mut solids {
            mesh.scale(scale);
        }
    }

    log::info!(
        "parsed STEP: {} entities, {} solids, units {:?}",
        entities.len(),
        solids.len(),
        structure.units
    );

    Ok(LoadedStep {
        scene: build_scene(solids, &structure),
        annotations,
        units: structure.units,
    })
}

fn build_scene(
    mut solids: Vec<(u64, quotekit_core::geom::TriMesh)>,
    structure: &ModelStructure,
) -> Scene {
    if solids.len() == 1 && !structure.has_assembly {
        if let Some((_, mesh)) = solids.pop() {
            return Scene::Standalone(mesh);
        }
    }

    let mut bodies = Vec::new();
    for (n, (solid_id, mesh)) in solids.into_iter().enumerate() {
        let info = structure.solids.get(&solid_id);
        let label = info
            .and_then(|s| s.label.clone())
            .unwrap_or_else(|| format!("Body {}", n + 1));
        let occurrences = info.map_or(1, |s| s.occurrences.max(1));
        let mesh = Rc::new(mesh);
        for _ in 0..occurrences {
            bodies.push(Body {
                label: label.clone(),
                mesh: Rc::clone(&mesh),
            });
        }
    }
    Scene::Assembly(bodies)
}
