//! Integration tests for decicrate-simplification
//!
//! These run whole decimation sessions on synthetic meshes and check the
//! properties callers rely on: face targets, boundary and seam preservation,
//! determinism and the geometry-only fallback.

use decicrate_core::{Error, Point3f, TriangleMesh};
use decicrate_simplification::*;
use std::collections::HashMap;
use std::time::Duration;

/// Regular grid of `size` x `size` vertices with spacing 1, optionally bumped
fn create_grid(size: usize, bump: f32) -> TriangleMesh {
    let mut vertices = Vec::with_capacity(size * size);
    for y in 0..size {
        for x in 0..size {
            let fx = x as f32 / (size - 1) as f32 * std::f32::consts::PI;
            let fy = y as f32 / (size - 1) as f32 * std::f32::consts::PI;
            vertices.push(Point3f::new(x as f32, y as f32, fx.sin() * fy.sin() * bump));
        }
    }
    let mut faces = Vec::new();
    for y in 0..(size - 1) {
        for x in 0..(size - 1) {
            let tl = y * size + x;
            let tr = tl + 1;
            let bl = (y + 1) * size + x;
            let br = bl + 1;
            faces.push([tl, bl, tr]);
            faces.push([tr, bl, br]);
        }
    }
    TriangleMesh::from_vertices_and_faces(vertices, faces)
}

/// Latitude-longitude unit sphere with `2 * slices * (stacks - 1)` faces
fn create_uv_sphere(slices: usize, stacks: usize) -> TriangleMesh {
    let mut vertices = vec![Point3f::new(0.0, 0.0, 1.0)];
    for i in 1..stacks {
        let phi = std::f32::consts::PI * i as f32 / stacks as f32;
        for j in 0..slices {
            let theta = 2.0 * std::f32::consts::PI * j as f32 / slices as f32;
            vertices.push(Point3f::new(
                phi.sin() * theta.cos(),
                phi.sin() * theta.sin(),
                phi.cos(),
            ));
        }
    }
    let south = vertices.len();
    vertices.push(Point3f::new(0.0, 0.0, -1.0));

    let ring = |i: usize, j: usize| 1 + (i - 1) * slices + j % slices;
    let mut faces = Vec::new();
    for j in 0..slices {
        faces.push([0, ring(1, j), ring(1, j + 1)]);
    }
    for i in 1..(stacks - 1) {
        for j in 0..slices {
            faces.push([ring(i, j), ring(i + 1, j), ring(i + 1, j + 1)]);
            faces.push([ring(i, j), ring(i + 1, j + 1), ring(i, j + 1)]);
        }
    }
    for j in 0..slices {
        faces.push([south, ring(stacks - 1, j + 1), ring(stacks - 1, j)]);
    }
    TriangleMesh::from_vertices_and_faces(vertices, faces)
}

/// Number of faces on every undirected edge
fn edge_face_counts(mesh: &TriangleMesh) -> HashMap<(usize, usize), usize> {
    let mut counts = HashMap::new();
    for f in &mesh.faces {
        for k in 0..3 {
            let (a, b) = (f[k], f[(k + 1) % 3]);
            *counts.entry((a.min(b), a.max(b))).or_insert(0) += 1;
        }
    }
    counts
}

fn boundary_positions(mesh: &TriangleMesh) -> Vec<Point3f> {
    let mut out: Vec<usize> = edge_face_counts(mesh)
        .into_iter()
        .filter(|&(_, n)| n == 1)
        .flat_map(|((a, b), _)| [a, b])
        .collect();
    out.sort_unstable();
    out.dedup();
    out.into_iter().map(|v| mesh.vertices[v]).collect()
}

#[test]
fn test_unit_grid_to_two_triangles() {
    let mesh = create_grid(3, 0.0);
    let outcome = decimate(&mesh, &DecimationParams::new().with_target_faces(2)).unwrap();

    assert_eq!(outcome.mesh.face_count(), 2);
    assert_eq!(outcome.mesh.vertex_count(), 4);
    assert!(!outcome.report.underfilled);

    // The survivors are the four corners of the square
    let mut corners: Vec<(i32, i32)> = outcome
        .mesh
        .vertices
        .iter()
        .map(|p| (p.x as i32, p.y as i32))
        .collect();
    corners.sort_unstable();
    assert_eq!(corners, vec![(0, 0), (0, 2), (2, 0), (2, 2)]);
}

#[test]
fn test_sphere_half_reduction_stays_closed() {
    let sphere = create_uv_sphere(25, 21);
    assert_eq!(sphere.face_count(), 1000);

    let outcome = decimate(&sphere, &DecimationParams::new().with_reduction(0.5)).unwrap();
    let faces = outcome.mesh.face_count();
    assert_eq!(outcome.report.target_faces, 500);
    assert!((490..=510).contains(&faces), "got {} faces", faces);
    assert!(edge_face_counts(&outcome.mesh).values().all(|&n| n == 2));
    assert!(outcome.mesh.validate().is_ok());
}

#[test]
fn test_target_equal_to_face_count_is_identity() {
    let mesh = create_grid(3, 0.0);
    let outcome = decimate(&mesh, &DecimationParams::new().with_target_faces(8)).unwrap();
    assert_eq!(outcome.report.collapses_performed, 0);
    assert!(!outcome.report.was_decimated());
    assert_eq!(outcome.mesh, mesh);
}

#[test]
fn test_target_equal_to_face_count_skips_flips() {
    // Two slivers sharing a long diagonal; the flip pass would swap it
    let mesh = TriangleMesh::from_vertices_and_faces(
        vec![
            Point3f::new(-2.0, 0.0, 0.0),
            Point3f::new(2.0, 0.0, 0.0),
            Point3f::new(0.0, 0.5, 0.0),
            Point3f::new(0.0, -0.5, 0.0),
        ],
        vec![[0, 1, 2], [1, 0, 3]],
    );
    let outcome = decimate(&mesh, &DecimationParams::new().with_target_faces(2)).unwrap();
    assert_eq!(outcome.report.collapses_performed, 0);
    assert_eq!(outcome.report.flips, 0);
    assert_eq!(outcome.mesh, mesh);

    let larger = decimate(&mesh, &DecimationParams::new().with_target_faces(10)).unwrap();
    assert_eq!(larger.mesh, mesh);
}

#[test]
fn test_fraction_target_is_floored() {
    let mesh = create_grid(3, 0.0);
    let outcome = decimate(&mesh, &DecimationParams::new().with_reduction(0.9)).unwrap();
    assert_eq!(outcome.report.target_faces, MIN_TARGET_FACES);
    assert!(outcome.mesh.face_count() <= MIN_TARGET_FACES);
}

#[test]
fn test_boundary_vertices_keep_positions() {
    let mesh = create_grid(8, 1.5);
    let before = boundary_positions(&mesh);
    let outcome = decimate(&mesh, &DecimationParams::new().with_reduction(0.6)).unwrap();
    assert!(outcome.mesh.face_count() < mesh.face_count());

    for p in boundary_positions(&outcome.mesh) {
        assert!(before.contains(&p), "boundary vertex moved to {:?}", p);
    }
}

#[test]
fn test_decimation_is_deterministic() {
    let mesh = create_grid(10, 2.0);
    let params = DecimationParams::new().with_reduction(0.7);
    let first = decimate(&mesh, &params).unwrap();
    let second = decimate(&mesh, &params).unwrap();
    assert_eq!(first.mesh, second.mesh);
    // Timing is the only field allowed to differ
    let untimed = |report: &DecimationReport| DecimationReport {
        elapsed: Duration::ZERO,
        ..report.clone()
    };
    assert_eq!(untimed(&first.report), untimed(&second.report));
}

#[test]
fn test_corrupt_texture_falls_back_to_geometry() {
    let mut mesh = create_grid(5, 1.0);
    let tex = mesh.vertices.iter().map(|p| [p.x / 4.0, p.y / 4.0]).collect();
    let mut face_tex = mesh.faces.clone();
    face_tex[3] = [0, 999, 2];
    mesh.set_texture(tex, face_tex);

    let outcome = decimate(&mesh, &DecimationParams::new().with_reduction(0.5)).unwrap();
    assert!(outcome.report.fallback_used);
    assert!(outcome.report.had_texture);
    assert_eq!(outcome.report.strategy, "geometry");
    assert!(!outcome.mesh.has_texture());
    assert!(outcome.mesh.face_count() < mesh.face_count());
}

#[test]
fn test_texture_seam_is_preserved() {
    // Two charts meeting along x = 3: the left half maps u into [0, 0.25],
    // the right half into [0.75, 1]
    let size = 7;
    let mut mesh = create_grid(size, 0.5);
    let mut tex = Vec::new();
    let mut left_index = vec![0; mesh.vertices.len()];
    let mut right_index = vec![0; mesh.vertices.len()];
    for (i, p) in mesh.vertices.iter().enumerate() {
        let v = p.y / 6.0;
        if p.x <= 3.0 {
            left_index[i] = tex.len();
            tex.push([p.x / 12.0, v]);
        }
        if p.x >= 3.0 {
            right_index[i] = tex.len();
            tex.push([0.5 + p.x / 12.0, v]);
        }
    }
    let face_tex: Vec<[usize; 3]> = mesh
        .faces
        .iter()
        .map(|f| {
            let left = f.iter().all(|&v| mesh.vertices[v].x <= 3.0);
            f.map(|v| if left { left_index[v] } else { right_index[v] })
        })
        .collect();
    mesh.set_texture(tex, face_tex);

    let outcome = decimate(&mesh, &DecimationParams::new().with_reduction(0.5)).unwrap();
    assert!(!outcome.report.fallback_used);
    assert_eq!(outcome.report.strategy, "textured");

    let out = &outcome.mesh;
    assert!(out.has_texture());
    let coords = out.tex_coords.as_ref().unwrap();
    let rows = out.face_tex.as_ref().unwrap();

    let mut seam_corners = 0;
    for (f, row) in out.faces.iter().zip(rows.iter()) {
        for (&v, &t) in f.iter().zip(row.iter()) {
            assert!(t < coords.len());
            if out.vertices[v].x == 3.0 {
                seam_corners += 1;
                let u = coords[t][0];
                assert!(u == 0.25 || u == 0.75, "seam corner has u = {}", u);
            }
        }
    }
    assert!(seam_corners > 0);
}

#[test]
fn test_unreachable_target_is_underfilled() {
    let tetra = TriangleMesh::from_vertices_and_faces(
        vec![
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(1.0, 0.0, 0.0),
            Point3f::new(0.5, 1.0, 0.0),
            Point3f::new(0.5, 0.5, 1.0),
        ],
        vec![[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]],
    );
    let outcome = decimate(&tetra, &DecimationParams::new().with_target_faces(1)).unwrap();
    assert!(outcome.report.underfilled);
    assert_eq!(outcome.mesh.face_count(), 4);
}

#[test]
fn test_invalid_parameters_rejected() {
    let mesh = create_grid(3, 0.0);
    let err = decimate(&mesh, &DecimationParams::new().with_quality_threshold(1.5)).unwrap_err();
    assert!(matches!(err, Error::InvalidParameters(_)));
}

#[test]
fn test_cleanup_merges_split_vertices() {
    // Two squares sharing an edge whose vertices are duplicated
    let mesh = TriangleMesh::from_vertices_and_faces(
        vec![
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(1.0, 0.0, 0.0),
            Point3f::new(1.0, 1.0, 0.0),
            Point3f::new(0.0, 1.0, 0.0),
            Point3f::new(1.0, 0.0, 0.0),
            Point3f::new(2.0, 0.0, 0.0),
            Point3f::new(2.0, 1.0, 0.0),
            Point3f::new(1.0, 1.0, 0.0),
        ],
        vec![[0, 1, 2], [0, 2, 3], [4, 5, 6], [4, 6, 7]],
    );
    let outcome = decimate(&mesh, &DecimationParams::new().with_target_faces(4)).unwrap();
    let clean = outcome.report.clean.unwrap();
    assert_eq!(clean.merged_vertices, 2);
    assert_eq!(outcome.mesh.vertex_count(), 6);
}

#[test]
fn test_obj_round_trip_after_decimation() {
    let mesh = create_grid(6, 1.0);
    let outcome = decimate(&mesh, &DecimationParams::new().with_reduction(0.5)).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("decimated.obj");
    decicrate_io::write_mesh(&outcome.mesh, &path).unwrap();
    let loaded = decicrate_io::read_mesh(&path).unwrap();

    assert_eq!(loaded.vertex_count(), outcome.mesh.vertex_count());
    assert_eq!(loaded.face_count(), outcome.mesh.face_count());
    for (a, b) in loaded.vertices.iter().zip(outcome.mesh.vertices.iter()) {
        assert!((a - b).norm() < 1e-5);
    }
}
