use nalgebra::{Point3, Vector3};
use std::collections::{HashMap, VecDeque};

/// Cubic inches in one cubic meter, `(1 / 0.0254)^3`.
pub fn cubic_inches_per_cubic_meter() -> f64 {
    (1.0 / 0.0254_f64).powi(3)
}

/// Converts a volume in cubic meters to cubic inches, rounded to 7 decimals.
pub fn cubic_meters_to_cubic_inches(volume: f64) -> f64 {
    round_to(volume.abs() * cubic_inches_per_cubic_meter(), 7)
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox3 {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
}

impl BBox3 {
    pub fn new(min: Point3<f64>, max: Point3<f64>) -> Self {
        Self { min, max }
    }

    pub fn empty() -> Self {
        Self {
            min: Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn include_point(&mut self, point: &Point3<f64>) {
        self.min = self.min.inf(point);
        self.max = self.max.sup(point);
    }

    pub fn diag(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        (self.max - self.min).norm()
    }
}

/// Indexed triangle mesh of one solid body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriMesh {
    pub vertices: Vec<Point3<f64>>,
    pub faces: Vec<[usize; 3]>,
}

impl TriMesh {
    pub fn new(vertices: Vec<Point3<f64>>, faces: Vec<[usize; 3]>) -> Self {
        Self { vertices, faces }
    }

    /// Builds an indexed mesh from a triangle soup, merging vertices that fall
    /// in the same `weld_tolerance` grid cell. Triangles collapsed by the weld
    /// are dropped. A non-positive tolerance disables welding.
    pub fn from_triangles<I>(triangles: I, weld_tolerance: f64) -> Self
    where
        I: IntoIterator<Item = [Point3<f64>; 3]>,
    {
        let inv = if weld_tolerance.is_normal() && weld_tolerance > 0.0 {
            1.0 / weld_tolerance
        } else {
            0.0
        };

        let mut mesh = TriMesh::default();
        let mut index: HashMap<[i64; 3], usize> = HashMap::new();

        for tri in triangles {
            let mut face = [0usize; 3];
            for (slot, p) in face.iter_mut().zip(tri) {
                *slot = if inv > 0.0 {
                    let key = [
                        (p.x * inv).round() as i64,
                        (p.y * inv).round() as i64,
                        (p.z * inv).round() as i64,
                    ];
                    *index.entry(key).or_insert_with(|| {
                        mesh.vertices.push(p);
                        mesh.vertices.len() - 1
                    })
                } else {
                    mesh.vertices.push(p);
                    mesh.vertices.len() - 1
                };
            }
            if face[0] == face[1] || face[1] == face[2] || face[0] == face[2] {
                continue;
            }
            mesh.faces.push(face);
        }

        mesh
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn bbox(&self) -> BBox3 {
        let mut bbox = BBox3::empty();
        for v in &self.vertices {
            bbox.include_point(v);
        }
        bbox
    }

    pub fn scale(&mut self, factor: f64) {
        for v in &mut self.vertices {
            *v = Point3::from(v.coords * factor);
        }
    }

    fn edge_faces(&self) -> HashMap<(usize, usize), Vec<usize>> {
        let mut edges: HashMap<(usize, usize), Vec<usize>> = HashMap::new();
        for (f, face) in self.faces.iter().enumerate() {
            for i in 0..3 {
                let key = edge_key(face[i], face[(i + 1) % 3]);
                edges.entry(key).or_default().push(f);
            }
        }
        edges
    }

    /// Edges used by exactly one triangle.
    pub fn boundary_edge_count(&self) -> usize {
        self.edge_faces().values().filter(|f| f.len() == 1).count()
    }

    /// Closed two-manifold: every edge is shared by exactly two triangles.
    pub fn is_watertight(&self) -> bool {
        !self.faces.is_empty() && self.edge_faces().values().all(|f| f.len() == 2)
    }

    /// Makes triangle winding consistent across each edge-connected patch, then
    /// flips the whole mesh if its signed volume is negative. Patches are never
    /// flipped on their own, so inward-wound cavity shells keep subtracting.
    /// Returns how many triangles ended up with a different winding than before.
    pub fn fix_normals(&mut self) -> usize {
        let before = self.faces.clone();
        let edge_faces = self.edge_faces();
        let mut visited = vec![false; self.faces.len()];

        for seed in 0..self.faces.len() {
            if visited[seed] {
                continue;
            }
            visited[seed] = true;
            let mut queue = VecDeque::from([seed]);

            while let Some(f) = queue.pop_front() {
                let face = self.faces[f];
                for i in 0..3 {
                    let (a, b) = (face[i], face[(i + 1) % 3]);
                    let Some(neighbours) = edge_faces.get(&edge_key(a, b)) else {
                        continue;
                    };
                    for &g in neighbours {
                        if visited[g] {
                            continue;
                        }
                        // A consistently wound neighbour walks the shared edge as b -> a.
                        if has_directed_edge(&self.faces[g], a, b) {
                            flip(&mut self.faces[g]);
                        }
                        visited[g] = true;
                        queue.push_back(g);
                    }
                }
            }
        }

        if self.signed_volume() < 0.0 {
            self.faces.iter_mut().for_each(flip);
        }

        before
            .iter()
            .zip(&self.faces)
            .filter(|(a, b)| a != b)
            .count()
    }

    fn face_signed_volume(&self, f: usize) -> f64 {
        let [a, b, c] = self.faces[f];
        let pa: Vector3<f64> = self.vertices[a].coords;
        let pb: Vector3<f64> = self.vertices[b].coords;
        let pc: Vector3<f64> = self.vertices[c].coords;
        pa.dot(&pb.cross(&pc)) / 6.0
    }

    /// Divergence-theorem volume; positive for outward winding.
    pub fn signed_volume(&self) -> f64 {
        (0..self.faces.len()).map(|f| self.face_signed_volume(f)).sum()
    }

    pub fn volume(&self) -> f64 {
        self.signed_volume().abs()
    }
}

fn edge_key(a: usize, b: usize) -> (usize, usize) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

fn has_directed_edge(face: &[usize; 3], a: usize, b: usize) -> bool {
    (0..3).any(|i| face[i] == a && face[(i + 1) % 3] == b)
}

fn flip(face: &mut [usize; 3]) {
    face.swap(1, 2);
}
