use quotekit_core::extract::{ExtractConfig, Scene};
use quotekit_core::model::Units;
use quotekit_import_step::{extract_components, extract_from_str, load_scene};
use truck_modeling::*;
use truck_stepio::out::{CompleteStepDisplay, StepModel};

fn cube(origin: Point3, side: f64) -> Solid {
    let v = builder::vertex(origin);
    let edge = builder::tsweep(&v, Vector3::new(side, 0.0, 0.0));
    let face = builder::tsweep(&edge, Vector3::new(0.0, side, 0.0));
    builder::tsweep(&face, Vector3::new(0.0, 0.0, side))
}

/// 10 mm block with a 5 mm cavity in the middle.
fn hollow_block() -> Solid {
    let mut shells = cube(Point3::new(0.0, 0.0, 0.0), 10.0).into_boundaries();
    let mut cavity = cube(Point3::new(2.5, 2.5, 2.5), 5.0)
        .into_boundaries()
        .remove(0);
    for face in cavity.face_iter_mut() {
        face.invert();
    }
    shells.push(cavity);
    Solid::new(shells)
}

fn step_text(solid: &Solid) -> String {
    let compressed = solid.compress();
    CompleteStepDisplay::new(StepModel::from(&compressed), Default::default()).to_string()
}

#[test]
fn millimeter_cube_is_one_standalone_component() {
    let raw = step_text(&cube(Point3::new(0.0, 0.0, 0.0), 10.0));
    let cfg = ExtractConfig::default();

    let loaded = load_scene(&raw, &cfg).expect("load");
    assert_eq!(Units::Millimeters, loaded.units);
    assert!(matches!(loaded.scene, Scene::Standalone(_)));

    let extraction = extract_from_str(&raw, &cfg).expect("extract");
    assert_eq!(1, extraction.components.len());
    let part = &extraction.components[0];
    assert_eq!("Component", part.name);
    assert_eq!(1, part.quantity);
    assert!((part.volume - 0.0610237).abs() < 1e-6, "got {}", part.volume);
    assert!(extraction.warnings.is_empty());
}

#[test]
fn meter_units_are_scaled() {
    let raw = step_text(&cube(Point3::new(0.0, 0.0, 0.0), 1.0))
        .replace("SI_UNIT(.MILLI.,.METRE.)", "SI_UNIT($,.METRE.)");

    let loaded = load_scene(&raw, &ExtractConfig::default()).expect("load");
    assert_eq!(Units::Meters, loaded.units);

    let extraction = extract_components(raw.as_bytes(), &ExtractConfig::default()).expect("extract");
    let volume = extraction.components[0].volume;
    assert!((volume - 61023.7440947).abs() < 1e-3, "got {volume}");
}

#[test]
fn cavity_is_subtracted_from_its_solid() {
    let raw = step_text(&hollow_block());
    assert!(raw.contains("BREP_WITH_VOIDS"));

    let extraction = extract_from_str(&raw, &ExtractConfig::default()).expect("extract");
    assert_eq!(1, extraction.components.len());
    let part = &extraction.components[0];
    assert_eq!("Component", part.name);
    assert!((part.volume - 0.0533958).abs() < 1e-6, "got {}", part.volume);
    assert_eq!(0, extraction.stats.reoriented_faces);
}
