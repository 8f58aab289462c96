//! Procedural mesh generation.
//!
//! Generates the four primitive shapes of the scene: a subdivided box, a flat
//! grid, a geodesic sphere and a (possibly tapered) cylinder. Shapes are built
//! with 32-bit indices and a full vertex (position, normal, tangent, uv); the
//! renderer narrows them when packing a [`MeshGeometry`](crate::MeshGeometry).
//!
//! All shapes are centred on the origin, wound clockwise when viewed from the
//! front in a left-handed, y-up frame.

use std::f32::consts::{PI, TAU};

use glam::{Vec2, Vec3};

use crate::error::{ResourceError, ResourceResult};

/// Upper bound on midpoint subdivisions for the box and geosphere.
pub const MAX_SUBDIVISIONS: u32 = 6;

/// A generated vertex.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GeometryVertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub tangent_u: Vec3,
    pub tex_coord: Vec2,
}

impl GeometryVertex {
    pub fn new(position: Vec3, normal: Vec3, tangent_u: Vec3, tex_coord: Vec2) -> Self {
        Self {
            position,
            normal,
            tangent_u,
            tex_coord,
        }
    }

    /// Midpoint of an edge. Normal and tangent are renormalized.
    fn midpoint(a: &Self, b: &Self) -> Self {
        Self {
            position: (a.position + b.position) * 0.5,
            normal: ((a.normal + b.normal) * 0.5).normalize_or_zero(),
            tangent_u: ((a.tangent_u + b.tangent_u) * 0.5).normalize_or_zero(),
            tex_coord: (a.tex_coord + b.tex_coord) * 0.5,
        }
    }
}

/// Vertex and index lists of one generated shape.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<GeometryVertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Splits every triangle into four through its edge midpoints.
    ///
    /// Vertices are not shared between triangles afterwards.
    fn subdivide(&mut self) {
        let input = std::mem::take(self);
        let triangles = input.triangle_count();
        self.vertices.reserve(triangles * 6);
        self.indices.reserve(triangles * 12);

        //       v1
        //       *
        //      / \
        //  m0 *---* m1
        //    / \ / \
        //   *---*---*
        //  v0   m2   v2
        for (i, tri) in input.indices.chunks_exact(3).enumerate() {
            let v0 = input.vertices[tri[0] as usize];
            let v1 = input.vertices[tri[1] as usize];
            let v2 = input.vertices[tri[2] as usize];

            let m0 = GeometryVertex::midpoint(&v0, &v1);
            let m1 = GeometryVertex::midpoint(&v1, &v2);
            let m2 = GeometryVertex::midpoint(&v0, &v2);

            self.vertices.extend_from_slice(&[v0, v1, v2, m0, m1, m2]);

            let base = (i * 6) as u32;
            self.indices.extend_from_slice(&[
                base,
                base + 3,
                base + 5,
                base + 3,
                base + 4,
                base + 5,
                base + 5,
                base + 4,
                base + 2,
                base + 3,
                base + 1,
                base + 4,
            ]);
        }
    }
}

/// Axis-aligned box of the given extents, with `subdivisions` midpoint passes
/// (capped at [`MAX_SUBDIVISIONS`]).
pub fn create_box(width: f32, height: f32, depth: f32, subdivisions: u32) -> MeshData {
    let w = 0.5 * width;
    let h = 0.5 * height;
    let d = 0.5 * depth;

    let v = |px, py, pz, nx, ny, nz, tx, ty, tz, u, v| {
        GeometryVertex::new(
            Vec3::new(px, py, pz),
            Vec3::new(nx, ny, nz),
            Vec3::new(tx, ty, tz),
            Vec2::new(u, v),
        )
    };

    let vertices = vec![
        // front
        v(-w, -h, -d, 0.0, 0.0, -1.0, 1.0, 0.0, 0.0, 0.0, 1.0),
        v(-w, h, -d, 0.0, 0.0, -1.0, 1.0, 0.0, 0.0, 0.0, 0.0),
        v(w, h, -d, 0.0, 0.0, -1.0, 1.0, 0.0, 0.0, 1.0, 0.0),
        v(w, -h, -d, 0.0, 0.0, -1.0, 1.0, 0.0, 0.0, 1.0, 1.0),
        // back
        v(-w, -h, d, 0.0, 0.0, 1.0, -1.0, 0.0, 0.0, 1.0, 1.0),
        v(w, -h, d, 0.0, 0.0, 1.0, -1.0, 0.0, 0.0, 0.0, 1.0),
        v(w, h, d, 0.0, 0.0, 1.0, -1.0, 0.0, 0.0, 0.0, 0.0),
        v(-w, h, d, 0.0, 0.0, 1.0, -1.0, 0.0, 0.0, 1.0, 0.0),
        // top
        v(-w, h, -d, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0),
        v(-w, h, d, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0),
        v(w, h, d, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0),
        v(w, h, -d, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0),
        // bottom
        v(-w, -h, -d, 0.0, -1.0, 0.0, -1.0, 0.0, 0.0, 1.0, 1.0),
        v(w, -h, -d, 0.0, -1.0, 0.0, -1.0, 0.0, 0.0, 0.0, 1.0),
        v(w, -h, d, 0.0, -1.0, 0.0, -1.0, 0.0, 0.0, 0.0, 0.0),
        v(-w, -h, d, 0.0, -1.0, 0.0, -1.0, 0.0, 0.0, 1.0, 0.0),
        // left
        v(-w, -h, d, -1.0, 0.0, 0.0, 0.0, 0.0, -1.0, 0.0, 1.0),
        v(-w, h, d, -1.0, 0.0, 0.0, 0.0, 0.0, -1.0, 0.0, 0.0),
        v(-w, h, -d, -1.0, 0.0, 0.0, 0.0, 0.0, -1.0, 1.0, 0.0),
        v(-w, -h, -d, -1.0, 0.0, 0.0, 0.0, 0.0, -1.0, 1.0, 1.0),
        // right
        v(w, -h, -d, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 1.0),
        v(w, h, -d, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0),
        v(w, h, d, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 0.0),
        v(w, -h, d, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0),
    ];

    let indices = (0..6u32)
        .flat_map(|face| {
            let b = face * 4;
            [b, b + 1, b + 2, b, b + 2, b + 3]
        })
        .collect();

    let mut mesh = MeshData { vertices, indices };
    for _ in 0..subdivisions.min(MAX_SUBDIVISIONS) {
        mesh.subdivide();
    }
    mesh
}

/// Flat `width` x `depth` grid in the xz plane with `m` rows and `n` columns
/// of vertices.
///
/// # Errors
///
/// Returns [`ResourceError::InvalidParameters`] if `m` or `n` is below 2.
pub fn create_grid(width: f32, depth: f32, m: u32, n: u32) -> ResourceResult<MeshData> {
    if m < 2 || n < 2 {
        return Err(ResourceError::InvalidParameters(format!(
            "grid needs at least 2x2 vertices, got {}x{}",
            m, n
        )));
    }

    let half_width = 0.5 * width;
    let half_depth = 0.5 * depth;
    let dx = width / (n - 1) as f32;
    let dz = depth / (m - 1) as f32;
    let du = 1.0 / (n - 1) as f32;
    let dv = 1.0 / (m - 1) as f32;

    let mut vertices = Vec::with_capacity((m * n) as usize);
    for i in 0..m {
        let z = half_depth - i as f32 * dz;
        for j in 0..n {
            let x = -half_width + j as f32 * dx;
            vertices.push(GeometryVertex::new(
                Vec3::new(x, 0.0, z),
                Vec3::Y,
                Vec3::X,
                Vec2::new(j as f32 * du, i as f32 * dv),
            ));
        }
    }

    let mut indices = Vec::with_capacity(((m - 1) * (n - 1) * 6) as usize);
    for i in 0..m - 1 {
        for j in 0..n - 1 {
            let row = i * n;
            let next = (i + 1) * n;
            indices.extend_from_slice(&[
                row + j,
                row + j + 1,
                next + j,
                next + j,
                row + j + 1,
                next + j + 1,
            ]);
        }
    }

    Ok(MeshData { vertices, indices })
}

/// Sphere built by subdividing an icosahedron and projecting onto `radius`.
pub fn create_geosphere(radius: f32, subdivisions: u32) -> MeshData {
    const X: f32 = 0.525_731;
    const Z: f32 = 0.850_651;

    let positions = [
        Vec3::new(-X, 0.0, Z),
        Vec3::new(X, 0.0, Z),
        Vec3::new(-X, 0.0, -Z),
        Vec3::new(X, 0.0, -Z),
        Vec3::new(0.0, Z, X),
        Vec3::new(0.0, Z, -X),
        Vec3::new(0.0, -Z, X),
        Vec3::new(0.0, -Z, -X),
        Vec3::new(Z, X, 0.0),
        Vec3::new(-Z, X, 0.0),
        Vec3::new(Z, -X, 0.0),
        Vec3::new(-Z, -X, 0.0),
    ];

    let indices = vec![
        1, 4, 0, 4, 9, 0, 4, 5, 9, 8, 5, 4, 1, 8, 4, //
        1, 10, 8, 10, 3, 8, 8, 3, 5, 3, 2, 5, 3, 7, 2, //
        3, 10, 7, 10, 6, 7, 6, 11, 7, 6, 0, 11, 6, 1, 0, //
        10, 1, 6, 11, 0, 9, 2, 11, 9, 5, 2, 9, 11, 2, 7,
    ];

    let mut mesh = MeshData {
        vertices: positions
            .iter()
            .map(|&p| GeometryVertex {
                position: p,
                ..Default::default()
            })
            .collect(),
        indices,
    };

    for _ in 0..subdivisions.min(MAX_SUBDIVISIONS) {
        mesh.subdivide();
    }

    for vertex in &mut mesh.vertices {
        let normal = vertex.position.normalize();
        let position = normal * radius;

        let mut theta = position.z.atan2(position.x);
        if theta < 0.0 {
            theta += TAU;
        }
        let phi = (position.y / radius).clamp(-1.0, 1.0).acos();

        vertex.position = position;
        vertex.normal = normal;
        vertex.tex_coord = Vec2::new(theta / TAU, phi / PI);
        vertex.tangent_u = Vec3::new(
            -radius * phi.sin() * theta.sin(),
            0.0,
            radius * phi.sin() * theta.cos(),
        )
        .normalize_or_zero();
    }

    mesh
}

/// Cylinder along +y, centred on the origin, with caps.
///
/// `top_radius` may differ from `bottom_radius` for a cone frustum.
///
/// # Errors
///
/// Returns [`ResourceError::InvalidParameters`] if there are fewer than 3
/// slices or no stacks.
pub fn create_cylinder(
    bottom_radius: f32,
    top_radius: f32,
    height: f32,
    slice_count: u32,
    stack_count: u32,
) -> ResourceResult<MeshData> {
    if slice_count < 3 || stack_count < 1 {
        return Err(ResourceError::InvalidParameters(format!(
            "cylinder needs >= 3 slices and >= 1 stack, got {} and {}",
            slice_count, stack_count
        )));
    }

    let mut mesh = MeshData::default();

    let stack_height = height / stack_count as f32;
    let radius_step = (top_radius - bottom_radius) / stack_count as f32;
    let d_theta = TAU / slice_count as f32;
    let ring_count = stack_count + 1;

    for i in 0..ring_count {
        let y = -0.5 * height + i as f32 * stack_height;
        let r = bottom_radius + i as f32 * radius_step;

        // The first and last vertex of a ring coincide with different uvs
        for j in 0..=slice_count {
            let (s, c) = (j as f32 * d_theta).sin_cos();

            let tangent_u = Vec3::new(-s, 0.0, c);
            let dr = bottom_radius - top_radius;
            let bitangent = Vec3::new(dr * c, -height, dr * s);

            mesh.vertices.push(GeometryVertex::new(
                Vec3::new(r * c, y, r * s),
                tangent_u.cross(bitangent).normalize(),
                tangent_u,
                Vec2::new(
                    j as f32 / slice_count as f32,
                    1.0 - i as f32 / stack_count as f32,
                ),
            ));
        }
    }

    let ring_vertex_count = slice_count + 1;
    for i in 0..stack_count {
        for j in 0..slice_count {
            let a = i * ring_vertex_count + j;
            let b = (i + 1) * ring_vertex_count + j;
            mesh.indices
                .extend_from_slice(&[a, b, b + 1, a, b + 1, a + 1]);
        }
    }

    build_cylinder_cap(&mut mesh, top_radius, 0.5 * height, slice_count, height, true);
    build_cylinder_cap(&mut mesh, bottom_radius, -0.5 * height, slice_count, height, false);

    Ok(mesh)
}

fn build_cylinder_cap(
    mesh: &mut MeshData,
    radius: f32,
    y: f32,
    slice_count: u32,
    height: f32,
    top: bool,
) {
    let base_index = mesh.vertices.len() as u32;
    let d_theta = TAU / slice_count as f32;
    let normal = if top { Vec3::Y } else { Vec3::NEG_Y };

    // Cap ring duplicates the side ring because the normals differ
    for i in 0..=slice_count {
        let (s, c) = (i as f32 * d_theta).sin_cos();
        let x = radius * c;
        let z = radius * s;
        mesh.vertices.push(GeometryVertex::new(
            Vec3::new(x, y, z),
            normal,
            Vec3::X,
            Vec2::new(x / height + 0.5, z / height + 0.5),
        ));
    }

    mesh.vertices.push(GeometryVertex::new(
        Vec3::new(0.0, y, 0.0),
        normal,
        Vec3::X,
        Vec2::new(0.5, 0.5),
    ));
    let center = mesh.vertices.len() as u32 - 1;

    for i in 0..slice_count {
        let (a, b) = (base_index + i, base_index + i + 1);
        if top {
            mesh.indices.extend_from_slice(&[center, b, a]);
        } else {
            mesh.indices.extend_from_slice(&[center, a, b]);
        }
    }
}
