//! Packing of the four scene shapes into one mesh.

use shapes_resources::geometry::{create_box, create_cylinder, create_geosphere, create_grid};
use shapes_resources::{MeshGeometry, SubmeshGeometry};

fn build() -> MeshGeometry {
    let mut geo = MeshGeometry::new("shapeGeo");
    geo.push_submesh("box", &create_box(1.5, 0.5, 1.5, 3))
        .expect("box");
    geo.push_submesh("grid", &create_grid(20.0, 30.0, 60, 40).expect("grid"))
        .expect("grid");
    geo.push_submesh("sphere", &create_geosphere(0.5, 3))
        .expect("sphere");
    geo.push_submesh(
        "cylinder",
        &create_cylinder(0.5, 0.3, 3.0, 20, 20).expect("cylinder"),
    )
    .expect("cylinder");
    geo
}

#[test]
fn test_scene_shapes_fit_sixteen_bit_indices() {
    let geo = build();
    assert_eq!(geo.vertices().len(), 1152 + 2400 + 1920 + 485);
    assert!(geo.vertices().len() <= usize::from(u16::MAX) + 1);
}

#[test]
fn test_submesh_ranges_are_contiguous() {
    let geo = build();
    let ranges: Vec<SubmeshGeometry> = geo.submeshes().map(|(_, s)| *s).collect();

    let mut next_index = 0;
    for range in &ranges {
        assert_eq!(range.start_index, next_index);
        next_index += range.index_count;
    }
    assert_eq!(next_index as usize, geo.indices().len());

    assert_eq!(ranges[0].base_vertex, 0);
    assert!(ranges.windows(2).all(|w| w[0].base_vertex < w[1].base_vertex));
}

#[test]
fn test_every_index_hits_its_own_shape() {
    let geo = build();
    let bases: Vec<i32> = geo.submeshes().map(|(_, s)| s.base_vertex).collect();

    for (i, (_, sub)) in geo.submeshes().enumerate() {
        let end = bases
            .get(i + 1)
            .copied()
            .unwrap_or(geo.vertices().len() as i32);
        let range = sub.start_index as usize..(sub.start_index + sub.index_count) as usize;
        for &index in &geo.indices()[range] {
            let vertex = sub.base_vertex + i32::from(index);
            assert!(vertex >= sub.base_vertex && vertex < end);
        }
    }
}
