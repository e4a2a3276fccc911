use crate::structure::SolidInfo;
use quotekit_core::error::GeometryParseError;
use quotekit_core::extract::ExtractConfig;
use quotekit_core::geom::{BBox3, TriMesh};
use std::collections::BTreeMap;
use truck_meshalgo::prelude::*;
use truck_stepio::r#in::Table;

type Triangle = [nalgebra::Point3<f64>; 3];

/// Triangulates every solid, in entity id order. The outer shell and any void
/// shells of a solid go into one welded mesh in file units, so cavities
/// subtract from the volume.
pub(crate) fn tessellate_solids(
    table: &Table,
    solids: &BTreeMap<u64, SolidInfo>,
    cfg: &ExtractConfig,
) -> Result<Vec<(u64, TriMesh)>, GeometryParseError> {
    let owned = solids.len() + solids.values().map(|s| s.voids.len()).sum::<usize>();
    if table.shell.len() > owned {
        log::debug!(
            "{} closed shells are not bounding any solid; ignored",
            table.shell.len() - owned
        );
    }

    let mut out = Vec::with_capacity(solids.len());
    for (&id, solid) in solids {
        let mut triangles = tessellate_shell(table, solid.outer, cfg)?;
        for void in &solid.voids {
            let mut cavity = tessellate_shell(table, void.shell, cfg)?;
            if void.reversed {
                for tri in &mut cavity {
                    tri.swap(1, 2);
                }
            }
            triangles.append(&mut cavity);
        }

        let weld = weld_tolerance(&triangles, cfg.weld_tolerance_factor);
        let mesh = TriMesh::from_triangles(triangles, weld);
        log::debug!(
            "solid #{id}: {} vertices, {} faces, {} voids",
            mesh.vertex_count(),
            mesh.face_count(),
            solid.voids.len()
        );
        out.push((id, mesh));
    }

    Ok(out)
}

fn tessellate_shell(
    table: &Table,
    shell_id: u64,
    cfg: &ExtractConfig,
) -> Result<Vec<Triangle>, GeometryParseError> {
    let shell_holder = table
        .shell
        .get(&shell_id)
        .ok_or_else(|| GeometryParseError::Topology {
            shell: shell_id,
            message: "closed shell record not found".to_string(),
        })?;
    let compressed =
        table
            .to_compressed_shell(shell_holder)
            .map_err(|e| GeometryParseError::Topology {
                shell: shell_id,
                message: e.to_string(),
            })?;

    // Two passes so the chord tolerance follows the model size.
    let coarse = compressed.robust_triangulation(0.01).to_polygon();
    let mut tol = coarse.bounding_box().diameter() * cfg.tessellation_tolerance_factor;
    if !tol.is_normal() {
        tol = 0.01;
    }
    let poly_shell = compressed.robust_triangulation(tol);

    let mut triangles: Vec<Triangle> = Vec::new();
    for face in &poly_shell.faces {
        let Some(surface) = face.surface.as_ref() else {
            log::debug!("shell #{shell_id}: face without a tessellated surface");
            continue;
        };
        let mesh = match face.orientation {
            true => surface.clone(),
            false => surface.inverse(),
        };
        push_triangles(&mesh, &mut triangles);
    }
    log::debug!("shell #{shell_id}: {} triangles (tolerance {tol:.3e})", triangles.len());

    Ok(triangles)
}

fn push_triangles(mesh: &PolygonMesh, out: &mut Vec<Triangle>) {
    let positions = mesh.positions();
    let point = |i: usize| {
        let p = positions[i];
        nalgebra::Point3::new(p.x, p.y, p.z)
    };

    for tri in mesh.tri_faces() {
        out.push([point(tri[0].pos), point(tri[1].pos), point(tri[2].pos)]);
    }
    for quad in mesh.quad_faces() {
        out.push([point(quad[0].pos), point(quad[1].pos), point(quad[2].pos)]);
        out.push([point(quad[0].pos), point(quad[2].pos), point(quad[3].pos)]);
    }
    // Fan-triangulate anything larger.
    for poly in mesh.other_faces() {
        for i in 1..poly.len().saturating_sub(1) {
            out.push([point(poly[0].pos), point(poly[i].pos), point(poly[i + 1].pos)]);
        }
    }
}

fn weld_tolerance(triangles: &[Triangle], factor: f64) -> f64 {
    let mut bbox = BBox3::empty();
    for p in triangles.iter().flatten() {
        bbox.include_point(p);
    }
    if bbox.is_empty() {
        return 0.0;
    }
    bbox.diag() * factor
}
