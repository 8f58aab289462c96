//! The fixed shapes scene: a box on a grid flanked by two rows of columns,
//! each topped with a sphere and lit by a point light.

use glam::{Mat4, Vec3};
use shapes_resources::geometry::{create_box, create_cylinder, create_geosphere, create_grid};
use shapes_resources::{MeshGeometry, ResourceError, ResourceResult, shapes_materials};
use shapes_rhi::PrimitiveTopology;
use tracing::info;

use crate::light::Light;
use crate::registry::SceneRegistry;
use crate::transform::Transform;

/// Column pairs along the z axis.
pub const COLUMN_ROWS: usize = 5;

pub const SHAPE_MESH_NAME: &str = "shapeGeo";

const COLUMN_X: f32 = 5.0;
const COLUMN_Z_START: f32 = -10.0;
const COLUMN_Z_STEP: f32 = 5.0;
const CYLINDER_Y: f32 = 1.5;
const SPHERE_Y: f32 = 3.5;

const LIGHT_FALLOFF_END: f32 = 50.0;
const LIGHT_SPOT_POWER: f32 = 0.3;

/// Packs the four shapes into one mesh.
pub fn build_shape_geometry() -> ResourceResult<MeshGeometry> {
    let mut geo = MeshGeometry::new(SHAPE_MESH_NAME);
    geo.push_submesh("box", &create_box(1.5, 0.5, 1.5, 3))?;
    geo.push_submesh("grid", &create_grid(20.0, 30.0, 60, 40)?)?;
    geo.push_submesh("sphere", &create_geosphere(0.5, 3))?;
    geo.push_submesh("cylinder", &create_cylinder(0.5, 0.3, 3.0, 20, 20)?)?;
    Ok(geo)
}

fn column_z(row: usize) -> f32 {
    COLUMN_Z_START + row as f32 * COLUMN_Z_STEP
}

/// Sphere centres, left then right per row. Each one hosts a point light.
pub fn sphere_positions() -> Vec<Vec3> {
    (0..COLUMN_ROWS)
        .flat_map(|row| {
            let z = column_z(row);
            [
                Vec3::new(-COLUMN_X, SPHERE_Y, z),
                Vec3::new(COLUMN_X, SPHERE_Y, z),
            ]
        })
        .collect()
}

/// Builds the 22-item, 4-material scene for a ring of `frame_count` slots.
///
/// Draw order: box, grid, then per row the left and right cylinders followed
/// by the left and right spheres.
pub fn build_shapes_scene(frame_count: usize) -> ResourceResult<SceneRegistry> {
    let mut registry = SceneRegistry::new(frame_count);

    let geo = build_shape_geometry()?;
    let box_mesh = geo.require_submesh("box")?;
    let grid_mesh = geo.require_submesh("grid")?;
    let sphere_mesh = geo.require_submesh("sphere")?;
    let cylinder_mesh = geo.require_submesh("cylinder")?;
    let mesh = registry.add_mesh(geo);

    let materials: Vec<_> = shapes_materials()
        .into_iter()
        .map(|m| registry.add_material(m))
        .collect();
    let &[box_mat, grid_mat, cylinder_mat, sphere_mat] = materials.as_slice() else {
        return Err(ResourceError::InvalidParameters(format!(
            "shapes scene needs four materials, got {}",
            materials.len()
        )));
    };

    let triangles = PrimitiveTopology::TriangleList;

    let box_world = Transform::new()
        .with_scale(Vec3::splat(2.0))
        .with_position(Vec3::new(0.0, 0.5, 0.0))
        .matrix();
    registry.add_render_item("box", box_world, mesh, box_mesh, box_mat, triangles);
    registry.add_render_item("grid", Mat4::IDENTITY, mesh, grid_mesh, grid_mat, triangles);

    for row in 0..COLUMN_ROWS {
        let z = column_z(row);
        let at = |x: f32, y: f32| Transform::from_position(Vec3::new(x, y, z)).matrix();

        registry.add_render_item(
            format!("cylinder_left_{row}"),
            at(-COLUMN_X, CYLINDER_Y),
            mesh,
            cylinder_mesh,
            cylinder_mat,
            triangles,
        );
        registry.add_render_item(
            format!("cylinder_right_{row}"),
            at(COLUMN_X, CYLINDER_Y),
            mesh,
            cylinder_mesh,
            cylinder_mat,
            triangles,
        );
        registry.add_render_item(
            format!("sphere_left_{row}"),
            at(-COLUMN_X, SPHERE_Y),
            mesh,
            sphere_mesh,
            sphere_mat,
            triangles,
        );
        registry.add_render_item(
            format!("sphere_right_{row}"),
            at(COLUMN_X, SPHERE_Y),
            mesh,
            sphere_mesh,
            sphere_mat,
            triangles,
        );
    }

    registry.set_lights(
        sphere_positions()
            .into_iter()
            .map(|p| Light::pointed_at_origin(p, LIGHT_FALLOFF_END, LIGHT_SPOT_POWER))
            .collect(),
    );

    info!(
        "Shapes scene: {} render items, {} materials, {} lights, {} frame resources",
        registry.object_count(),
        registry.material_count(),
        registry.lights().len(),
        frame_count
    );

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shapes_resources::SubmeshGeometry;

    #[test]
    fn test_scene_counts() {
        let scene = build_shapes_scene(3).unwrap();
        assert_eq!(scene.object_count(), 22);
        assert_eq!(scene.material_count(), 4);
        assert_eq!(scene.lights().len(), 10);
        assert_eq!(scene.frame_count(), 3);
    }

    #[test]
    fn test_every_item_draws_a_real_submesh() {
        let scene = build_shapes_scene(3).unwrap();
        let geo = build_shape_geometry().unwrap();
        let known: Vec<SubmeshGeometry> = geo.submeshes().map(|(_, s)| *s).collect();
        for item in scene.items() {
            assert!(item.submesh().index_count > 0);
            assert!(known.contains(item.submesh()));
        }
    }

    #[test]
    fn test_every_item_starts_fully_dirty() {
        let scene = build_shapes_scene(3).unwrap();
        assert!(scene.items().iter().all(|item| item.dirty_frames() == 3));
        assert!(scene.materials().iter().all(|m| m.dirty_frames() == 3));
    }

    #[test]
    fn test_object_indices_are_insertion_order() {
        let scene = build_shapes_scene(3).unwrap();
        for (i, item) in scene.items().iter().enumerate() {
            assert_eq!(item.object_index(), i);
        }
        assert_eq!(scene.lookup_item("box").map(|id| id.index()), Some(0));
        assert_eq!(scene.lookup_item("grid").map(|id| id.index()), Some(1));
        assert_eq!(
            scene.lookup_item("cylinder_left_0").map(|id| id.index()),
            Some(2)
        );
        assert_eq!(
            scene.lookup_item("sphere_right_4").map(|id| id.index()),
            Some(21)
        );
    }

    #[test]
    fn test_box_world_scales_before_translating() {
        let scene = build_shapes_scene(3).unwrap();
        let world = scene.items()[0].world();
        let expected = Mat4::from_translation(Vec3::new(0.0, 0.5, 0.0))
            * Mat4::from_scale(Vec3::splat(2.0));
        assert!(world.abs_diff_eq(expected, 1e-6));
    }

    #[test]
    fn test_column_materials() {
        let scene = build_shapes_scene(3).unwrap();
        let cylinder = scene.lookup_material("cylinder").unwrap();
        let sphere = scene.lookup_material("sphere").unwrap();
        for row in 0..COLUMN_ROWS {
            for side in ["left", "right"] {
                let cyl = scene.lookup_item(&format!("cylinder_{side}_{row}")).unwrap();
                let sph = scene.lookup_item(&format!("sphere_{side}_{row}")).unwrap();
                assert_eq!(scene.item(cyl).unwrap().material(), cylinder);
                assert_eq!(scene.item(sph).unwrap().material(), sphere);
            }
        }
    }

    #[test]
    fn test_lights_sit_on_spheres() {
        let scene = build_shapes_scene(3).unwrap();
        for light in scene.lights() {
            assert_eq!(light.position.y, SPHERE_Y);
            assert_eq!(light.falloff_end, LIGHT_FALLOFF_END);
            assert!((light.direction + light.position.normalize()).length() < 1e-6);
        }
    }
}
