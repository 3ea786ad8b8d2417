pub mod bounds;
pub mod ray;

pub use bounds::Aabb;
pub use ray::Ray;
