use glam::Vec3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    pub fn at(&self, distance: f32) -> Vec3 {
        self.origin + self.direction * distance
    }

    /// Intersection with the plane through `point` with `normal`. Rays running
    /// parallel to the plane never hit; hits behind the origin are reported.
    pub fn hit_test_plane(&self, point: Vec3, normal: Vec3) -> Option<Vec3> {
        let denominator = self.direction.dot(normal);
        if denominator.abs() < f32::EPSILON {
            return None;
        }
        let distance = (point - self.origin).dot(normal) / denominator;
        Some(self.at(distance))
    }
}
