use nalgebra::Point3;
use quotekit_core::error::GeometryParseError;
use quotekit_core::extract::{Body, ExtractConfig, Extractor, Scene};
use quotekit_core::geom::TriMesh;
use quotekit_core::model::{DescriptiveItem, MaterialAnnotations};
use std::rc::Rc;

fn cube(side: f64) -> TriMesh {
    let s = side;
    let vertices = vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(s, 0.0, 0.0),
        Point3::new(s, s, 0.0),
        Point3::new(0.0, s, 0.0),
        Point3::new(0.0, 0.0, s),
        Point3::new(s, 0.0, s),
        Point3::new(s, s, s),
        Point3::new(0.0, s, s),
    ];
    let faces = vec![
        [0, 2, 1],
        [0, 3, 2],
        [4, 5, 6],
        [4, 6, 7],
        [0, 1, 5],
        [0, 5, 4],
        [3, 7, 6],
        [3, 6, 2],
        [0, 4, 7],
        [0, 7, 3],
        [1, 2, 6],
        [1, 6, 5],
    ];
    TriMesh::new(vertices, faces)
}

fn body(label: &str, mesh: TriMesh) -> Body {
    Body {
        label: label.to_string(),
        mesh: Rc::new(mesh),
    }
}

fn extractor() -> Extractor {
    Extractor::new(ExtractConfig::default())
}

#[test]
fn duplicates_keep_first_volume_and_count_quantity() {
    let scene = Scene::Assembly(vec![
        body("Plate_Default<As Machined>", cube(0.1)),
        body("Pin", cube(0.01)),
        body("Plate_Default<As Machined>_2", cube(0.2)),
        body("Plate_Default<As Machined>-3", cube(0.3)),
    ]);

    let out = extractor()
        .extract(&scene, &MaterialAnnotations::default())
        .expect("extraction");

    assert_eq!(2, out.components.len());
    assert_eq!("Plate", out.components[0].name);
    assert_eq!(3, out.components[0].quantity);
    let first = cube(0.1).volume() * (1.0 / 0.0254f64).powi(3);
    assert!((out.components[0].volume - first).abs() < 1e-6);
    assert_eq!("Pin", out.components[1].name);
    assert_eq!(1, out.components[1].quantity);
    assert_eq!(2, out.stats.merged_duplicates);
}

#[test]
fn quantities_sum_to_non_empty_bodies() {
    let scene = Scene::Assembly(vec![
        body("A", cube(0.1)),
        body("B", cube(0.1)),
        body("A", cube(0.1)),
        body("Empty", TriMesh::default()),
        body("C", cube(0.1)),
        body("B", cube(0.1)),
    ]);

    let out = extractor()
        .extract(&scene, &MaterialAnnotations::default())
        .expect("extraction");

    let total: u32 = out.components.iter().map(|c| c.quantity).sum();
    assert_eq!(5, total);
    assert_eq!(1, out.stats.empty_bodies);
    assert_eq!(6, out.stats.bodies_total);
    let names: Vec<&str> = out.components.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(vec!["A", "B", "C"], names);
    assert!(out.warnings.iter().any(|w| w.code == "empty_body_skipped"));
}

#[test]
fn standalone_body_is_named_component() {
    let out = extractor()
        .extract(&Scene::Standalone(cube(1.0)), &MaterialAnnotations::default())
        .expect("extraction");

    assert_eq!(1, out.components.len());
    let c = &out.components[0];
    assert_eq!("Component", c.name);
    assert_eq!(1, c.quantity);
    assert_eq!(8, c.vertex_count);
    assert_eq!(12, c.face_count);
    assert!((c.volume - 61023.7440947).abs() < 1e-6);
}

#[test]
fn open_mesh_warns_instead_of_failing() {
    let mut open = cube(1.0);
    open.faces.pop();
    let out = extractor()
        .extract(&Scene::Assembly(vec![body("Shell", open)]), &MaterialAnnotations::default())
        .expect("extraction");

    assert_eq!(1, out.stats.non_watertight);
    assert!(out.warnings.iter().any(|w| w.code == "mesh_not_watertight"));
    assert!(out.components[0].volume > 0.0);
}

#[test]
fn inverted_body_reports_positive_volume() {
    let mut inverted = cube(1.0);
    for face in &mut inverted.faces {
        face.swap(1, 2);
    }
    let out = extractor()
        .extract(&Scene::Standalone(inverted), &MaterialAnnotations::default())
        .expect("extraction");
    assert!((out.components[0].volume - 61023.7440947).abs() < 1e-6);
    assert_eq!(12, out.stats.reoriented_faces);
}

#[test]
fn empty_scene_is_a_parse_error() {
    let err = extractor()
        .extract(
            &Scene::Assembly(vec![body("Nothing", TriMesh::default())]),
            &MaterialAnnotations::default(),
        )
        .unwrap_err();
    assert!(matches!(err, GeometryParseError::NoSolids));

    let err = extractor()
        .extract(&Scene::Assembly(Vec::new()), &MaterialAnnotations::default())
        .unwrap_err();
    assert!(matches!(err, GeometryParseError::NoSolids));
}

#[test]
fn steel_annotation_becomes_a_hint() {
    let scene = Scene::Assembly(vec![body("Frame", cube(0.1)), body("Cover", cube(0.1))]);

    let flagged = MaterialAnnotations {
        items: vec![DescriptiveItem {
            name: "Frame".to_string(),
            value: "Steel".to_string(),
        }],
    };
    let out = extractor().extract(&scene, &flagged).expect("extraction");
    assert_eq!(Some("Steel".to_string()), out.components[0].material_hint);
    assert_eq!(None, out.components[1].material_hint);

    let file_wide = MaterialAnnotations {
        items: vec![DescriptiveItem {
            name: "Steel".to_string(),
            value: "AISI 1020".to_string(),
        }],
    };
    let out = extractor().extract(&scene, &file_wide).expect("extraction");
    assert!(out
        .components
        .iter()
        .all(|c| c.material_hint.as_deref() == Some("Steel")));
}
