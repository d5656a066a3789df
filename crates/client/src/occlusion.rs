//! Static level geometry for line-of-sight checks.
//!
//! Holds parry3d shapes with their world transforms. Immutable during a
//! frame; queried by occlusion raycasts and the forward obstruction probe.

use glam::Vec3;
use parry3d::math::{Isometry, Point, Real, Vector};
use parry3d::query::Ray;
use parry3d::shape::SharedShape;

use crate::render::LineOfSight;

#[derive(Clone)]
struct Blocker {
    shape: SharedShape,
    transform: Isometry<Real>,
}

/// Collection of occluding shapes.
#[derive(Clone, Default)]
pub struct StaticGeometry {
    blockers: Vec<Blocker>,
}

impl StaticGeometry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an axis-aligned box. Returns its index.
    pub fn add_box(&mut self, center: Vec3, half_extents: Vec3) -> usize {
        let shape = SharedShape::cuboid(half_extents.x, half_extents.y, half_extents.z);
        let transform = Isometry::translation(center.x, center.y, center.z);
        self.blockers.push(Blocker { shape, transform });
        self.blockers.len() - 1
    }

    /// Add a triangle mesh in world space. `None` if the mesh is invalid
    /// (no triangles, out-of-range indices).
    pub fn add_triangle_mesh(&mut self, vertices: &[Vec3], indices: &[[u32; 3]]) -> Option<usize> {
        if indices.is_empty()
            || indices
                .iter()
                .flatten()
                .any(|&i| i as usize >= vertices.len())
        {
            return None;
        }
        let points: Vec<Point<Real>> = vertices
            .iter()
            .map(|v| Point::new(v.x, v.y, v.z))
            .collect();
        let shape = SharedShape::trimesh(points, indices.to_vec()).ok()?;
        self.blockers.push(Blocker {
            shape,
            transform: Isometry::identity(),
        });
        Some(self.blockers.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.blockers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blockers.is_empty()
    }

    pub fn clear(&mut self) {
        self.blockers.clear();
    }
}

impl LineOfSight for StaticGeometry {
    fn cast_ray(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<f32> {
        let dir = direction.try_normalize()?;
        if !(max_distance > 0.0) {
            return None;
        }
        let ray = Ray::new(
            Point::new(origin.x, origin.y, origin.z),
            Vector::new(dir.x, dir.y, dir.z),
        );

        self.blockers
            .iter()
            .filter_map(|b| b.shape.cast_ray(&b.transform, &ray, max_distance, true))
            .filter(|toi| *toi <= max_distance)
            .min_by(|a, b| a.total_cmp(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wall() -> StaticGeometry {
        let mut geo = StaticGeometry::new();
        geo.add_box(Vec3::new(0.0, 1.0, -10.0), Vec3::new(5.0, 2.0, 0.5));
        geo
    }

    #[test]
    fn test_ray_hits_wall() {
        let geo = wall();
        let toi = geo.cast_ray(Vec3::new(0.0, 1.0, 0.0), Vec3::NEG_Z, 50.0).unwrap();
        assert!((toi - 9.5).abs() < 1e-3);
        assert!(geo.cast_ray(Vec3::new(0.0, 1.0, 0.0), Vec3::Z, 50.0).is_none());
        assert!(geo.cast_ray(Vec3::new(0.0, 1.0, 0.0), Vec3::NEG_Z, 5.0).is_none());
    }

    #[test]
    fn test_line_of_sight() {
        let geo = wall();
        let eye = Vec3::new(0.0, 1.7, 0.0);
        assert!(!geo.is_clear(eye, Vec3::new(0.0, 1.0, -20.0)));
        assert!(geo.is_clear(eye, Vec3::new(0.0, 1.0, -5.0)));
        // Over the top of the wall
        assert!(geo.is_clear(Vec3::new(0.0, 4.0, 0.0), Vec3::new(0.0, 4.0, -20.0)));
        assert!(geo.is_clear(eye, eye));
    }

    #[test]
    fn test_nearest_hit_wins() {
        let mut geo = wall();
        geo.add_box(Vec3::new(0.0, 1.0, -4.0), Vec3::splat(0.5));
        let toi = geo.cast_ray(Vec3::new(0.0, 1.0, 0.0), Vec3::NEG_Z, 50.0).unwrap();
        assert!((toi - 3.5).abs() < 1e-3);
        assert_eq!(geo.len(), 2);
    }

    #[test]
    fn test_triangle_mesh() {
        let mut geo = StaticGeometry::new();
        let floor = [
            Vec3::new(-10.0, 0.0, -10.0),
            Vec3::new(10.0, 0.0, -10.0),
            Vec3::new(10.0, 0.0, 10.0),
            Vec3::new(-10.0, 0.0, 10.0),
        ];
        assert!(geo.add_triangle_mesh(&floor, &[[0, 2, 1], [0, 3, 2]]).is_some());
        let toi = geo.cast_ray(Vec3::new(0.0, 2.0, 0.0), Vec3::NEG_Y, 10.0).unwrap();
        assert!((toi - 2.0).abs() < 1e-3);

        assert!(geo.add_triangle_mesh(&floor, &[[0, 1, 9]]).is_none());
        assert!(geo.add_triangle_mesh(&floor, &[]).is_none());
    }
}
