//! Axis-aligned bounding volumes used to auto-frame the camera

use cgmath::{InnerSpace, Matrix4, Vector3, Vector4};

/// Axis-aligned bounding box in world space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vector3<f32>,
    pub max: Vector3<f32>,
}

impl Aabb {
    pub fn new(min: Vector3<f32>, max: Vector3<f32>) -> Self {
        Self { min, max }
    }

    /// Box enclosing a flat `[x, y, z, x, y, z, ...]` position buffer after applying `transform`.
    ///
    /// Returns `None` for an empty buffer.
    pub fn from_positions(positions: &[f32], transform: &Matrix4<f32>) -> Option<Self> {
        let mut points = positions.chunks_exact(3).map(|p| {
            let world = transform * Vector4::new(p[0], p[1], p[2], 1.0);
            Vector3::new(world.x, world.y, world.z)
        });

        let first = points.next()?;
        let mut aabb = Self::new(first, first);
        for point in points {
            aabb.expand(point);
        }
        Some(aabb)
    }

    pub fn expand(&mut self, point: Vector3<f32>) {
        self.min.x = self.min.x.min(point.x);
        self.min.y = self.min.y.min(point.y);
        self.min.z = self.min.z.min(point.z);
        self.max.x = self.max.x.max(point.x);
        self.max.y = self.max.y.max(point.y);
        self.max.z = self.max.z.max(point.z);
    }

    pub fn union(mut self, other: &Aabb) -> Self {
        self.expand(other.min);
        self.expand(other.max);
        self
    }

    pub fn center(&self) -> Vector3<f32> {
        (self.min + self.max) * 0.5
    }

    /// Edge lengths along each axis
    pub fn extent(&self) -> Vector3<f32> {
        self.max - self.min
    }

    /// Length of the box diagonal, the bounding-sphere-equivalent size used for framing
    pub fn size(&self) -> f32 {
        self.extent().magnitude()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::SquareMatrix;

    #[test]
    fn test_aabb_from_positions() {
        let positions = [0.0, 0.0, 0.0, 1.0, 1.0, 1.0, -1.0, -1.0, -1.0];
        let aabb = Aabb::from_positions(&positions, &Matrix4::identity()).unwrap();

        assert_eq!(aabb.min, Vector3::new(-1.0, -1.0, -1.0));
        assert_eq!(aabb.max, Vector3::new(1.0, 1.0, 1.0));
        assert_eq!(aabb.center(), Vector3::new(0.0, 0.0, 0.0));
        assert!((aabb.size() - 12.0f32.sqrt()).abs() < 1e-6);
    }

    #[test]
    fn test_aabb_applies_transform() {
        let positions = [0.0, 0.0, 0.0, 2.0, 2.0, 2.0];
        let transform = Matrix4::from_translation(Vector3::new(0.0, -0.5, 0.0));
        let aabb = Aabb::from_positions(&positions, &transform).unwrap();

        assert_eq!(aabb.min.y, -0.5);
        assert_eq!(aabb.max.y, 1.5);
    }

    #[test]
    fn test_empty_positions_have_no_bounds() {
        assert!(Aabb::from_positions(&[], &Matrix4::identity()).is_none());
    }
}
