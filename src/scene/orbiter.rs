use std::f32::consts::{PI, TAU};

use glam::{Mat4, Vec2, Vec3};

use super::camera::Camera;
use super::component::{Attribute, Component, ComponentType};
use crate::signal::ChangeSignal;

/// Converts latitude/longitude in degrees into a unit direction.
pub fn lat_lon_to_xyz(lat: f32, lon: f32) -> Vec3 {
    let (lat, lon) = (lat.to_radians(), lon.to_radians());
    Vec3::new(lat.cos() * lon.sin(), lat.sin(), lat.cos() * lon.cos())
}

/// Inverse of [`lat_lon_to_xyz`]; `direction` need not be normalised.
pub fn xyz_to_lat_lon(direction: Vec3) -> (f32, f32) {
    let d = direction.normalize_or_zero();
    if d == Vec3::ZERO {
        return (0.0, 0.0);
    }
    (d.y.clamp(-1.0, 1.0).asin().to_degrees(), d.x.atan2(d.z).to_degrees())
}

/// Moves `t` of the way from `from` to `to` (radians) along the shorter arc.
pub fn interpolate_angle(from: f32, to: f32, t: f32) -> f32 {
    let delta = (to - from + PI).rem_euclid(TAU) - PI;
    from + delta * t
}

fn wrap_degrees(angle: f32) -> f32 {
    (angle + 180.0).rem_euclid(360.0) - 180.0
}

/// Clamps into `min..=max`. Inverted bounds resolve to `max` instead of
/// panicking like `f32::clamp`.
fn bounded(value: f32, min: f32, max: f32) -> f32 {
    value.max(min).min(max)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OrbiterAttr {
    Target(Vec3),
    Position(Vec3),
    Lat(f32),
    Lon(f32),
    Distance(f32),
    Easing(f32),
    MinDistance(f32),
    MaxDistance(f32),
    MinLat(f32),
    MaxLat(f32),
    MinLon(f32),
    MaxLon(f32),
    Zoom(bool),
    Pan(bool),
    Drag(bool),
    ZoomSlowdown(f32),
    DragSlowdown(f32),
    Enabled(bool),
    AutoUpdate(bool),
}

impl Attribute for OrbiterAttr {
    fn name(&self) -> &'static str {
        match self {
            OrbiterAttr::Target(_) => "target",
            OrbiterAttr::Position(_) => "position",
            OrbiterAttr::Lat(_) => "lat",
            OrbiterAttr::Lon(_) => "lon",
            OrbiterAttr::Distance(_) => "distance",
            OrbiterAttr::Easing(_) => "easing",
            OrbiterAttr::MinDistance(_) => "min_distance",
            OrbiterAttr::MaxDistance(_) => "max_distance",
            OrbiterAttr::MinLat(_) => "min_lat",
            OrbiterAttr::MaxLat(_) => "max_lat",
            OrbiterAttr::MinLon(_) => "min_lon",
            OrbiterAttr::MaxLon(_) => "max_lon",
            OrbiterAttr::Zoom(_) => "zoom",
            OrbiterAttr::Pan(_) => "pan",
            OrbiterAttr::Drag(_) => "drag",
            OrbiterAttr::ZoomSlowdown(_) => "zoom_slowdown",
            OrbiterAttr::DragSlowdown(_) => "drag_slowdown",
            OrbiterAttr::Enabled(_) => "enabled",
            OrbiterAttr::AutoUpdate(_) => "auto_update",
        }
    }
}

/// Pointer input in viewport pixels. Two-finger touch arrives as `shift`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OrbiterEvent {
    PointerDown { x: f32, y: f32, shift: bool },
    PointerMove { x: f32, y: f32, shift: bool },
    PointerUp,
    Wheel { delta_y: f32 },
    Resize { width: f32, height: f32 },
}

#[derive(Debug, Clone, Copy)]
struct PanState {
    click_window: Vec2,
    click_target: Vec3,
    plane_point: Vec3,
}

/// Orbit camera rig.
///
/// Input only moves the target spherical coordinates (`lat`, `lon`,
/// `distance`); the current values chase them by `easing` on every tick.
/// Easing is applied per tick and is not scaled by frame time.
#[derive(Debug)]
pub struct Orbiter {
    target: Vec3,
    position: Vec3,
    lat: f32,
    lon: f32,
    distance: f32,
    current_lat: f32,
    current_lon: f32,
    current_distance: f32,
    easing: f32,
    min_distance: f32,
    max_distance: f32,
    min_lat: f32,
    max_lat: f32,
    min_lon: f32,
    max_lon: f32,
    zoom: bool,
    pan: bool,
    drag: bool,
    zoom_slowdown: f32,
    drag_slowdown: f32,
    enabled: bool,
    auto_update: bool,
    matrix: Mat4,
    viewport: Vec2,
    dragging: bool,
    drag_pos: Vec2,
    pan_state: Option<PanState>,
    entity: Option<hecs::Entity>,
    pub changed: ChangeSignal,
}

impl Default for Orbiter {
    fn default() -> Self {
        Self::new(std::iter::empty())
    }
}

impl Orbiter {
    pub fn new(attrs: impl IntoIterator<Item = OrbiterAttr>) -> Self {
        let mut orbiter = Self {
            target: Vec3::ZERO,
            position: Vec3::new(0.0, 0.0, 5.0),
            lat: 0.0,
            lon: 0.0,
            distance: 1.0,
            current_lat: 0.0,
            current_lon: 0.0,
            current_distance: 1.0,
            easing: 0.1,
            min_distance: 0.1,
            max_distance: 10.0,
            min_lat: -89.5,
            max_lat: 89.5,
            min_lon: f32::NEG_INFINITY,
            max_lon: f32::INFINITY,
            zoom: true,
            pan: true,
            drag: true,
            zoom_slowdown: 400.0,
            drag_slowdown: 4.0,
            enabled: true,
            auto_update: true,
            matrix: Mat4::IDENTITY,
            viewport: Vec2::ZERO,
            dragging: false,
            drag_pos: Vec2::ZERO,
            pan_state: None,
            entity: None,
            changed: ChangeSignal::new(),
        };
        orbiter.rederive_from_pose(None, None);
        orbiter.set(attrs);
        orbiter
    }

    /// Applies every attribute, then re-derives the spherical offset when the
    /// target or position changed, then notifies in argument order.
    pub fn set(&mut self, attrs: impl IntoIterator<Item = OrbiterAttr>) {
        let mut names = Vec::new();
        let mut pose_changed = false;
        let mut min_distance = None;
        let mut max_distance = None;

        for attr in attrs {
            names.push(attr.name());
            match attr {
                OrbiterAttr::Target(v) => {
                    self.target = v;
                    pose_changed = true;
                }
                OrbiterAttr::Position(v) => {
                    self.position = v;
                    pose_changed = true;
                }
                OrbiterAttr::Lat(v) => self.lat = v,
                OrbiterAttr::Lon(v) => self.lon = v,
                OrbiterAttr::Distance(v) => self.distance = v,
                OrbiterAttr::Easing(v) => self.easing = v,
                OrbiterAttr::MinDistance(v) => {
                    self.min_distance = v;
                    min_distance = Some(v);
                }
                OrbiterAttr::MaxDistance(v) => {
                    self.max_distance = v;
                    max_distance = Some(v);
                }
                OrbiterAttr::MinLat(v) => self.min_lat = v,
                OrbiterAttr::MaxLat(v) => self.max_lat = v,
                OrbiterAttr::MinLon(v) => self.min_lon = v,
                OrbiterAttr::MaxLon(v) => self.max_lon = v,
                OrbiterAttr::Zoom(v) => self.zoom = v,
                OrbiterAttr::Pan(v) => self.pan = v,
                OrbiterAttr::Drag(v) => self.drag = v,
                OrbiterAttr::ZoomSlowdown(v) => self.zoom_slowdown = v,
                OrbiterAttr::DragSlowdown(v) => self.drag_slowdown = v,
                OrbiterAttr::Enabled(v) => self.enabled = v,
                OrbiterAttr::AutoUpdate(v) => self.auto_update = v,
            }
        }

        if pose_changed {
            self.rederive_from_pose(min_distance, max_distance);
        }
        self.warn_inverted_bounds();

        for name in names {
            self.changed.dispatch(name);
        }
    }

    fn rederive_from_pose(&mut self, min_distance: Option<f32>, max_distance: Option<f32>) {
        let offset = self.position - self.target;
        let distance = offset.length();
        let (lat, lon) = xyz_to_lat_lon(offset);

        self.lat = lat;
        self.lon = lon;
        self.current_lat = lat;
        self.current_lon = lon;
        self.distance = distance;
        self.current_distance = distance;
        self.min_distance = min_distance.unwrap_or(distance / 10.0);
        self.max_distance = max_distance.unwrap_or(distance * 10.0);
    }

    fn warn_inverted_bounds(&self) {
        if self.min_distance > self.max_distance {
            log::warn!(
                "Orbiter distance bounds are inverted ({} > {}), clamping to the maximum",
                self.min_distance,
                self.max_distance
            );
        }
        if self.min_lat > self.max_lat {
            log::warn!(
                "Orbiter latitude bounds are inverted ({} > {}), clamping to the maximum",
                self.min_lat,
                self.max_lat
            );
        }
        if self.min_lon > self.max_lon {
            log::warn!(
                "Orbiter longitude bounds are inverted ({} > {}), clamping to the maximum",
                self.min_lon,
                self.max_lon
            );
        }
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    /// Eye position derived by the last [`update_matrix`](Self::update_matrix).
    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn lat(&self) -> f32 {
        self.lat
    }

    pub fn lon(&self) -> f32 {
        self.lon
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    pub fn current_lat(&self) -> f32 {
        self.current_lat
    }

    pub fn current_lon(&self) -> f32 {
        self.current_lon
    }

    pub fn current_distance(&self) -> f32 {
        self.current_distance
    }

    pub fn distance_bounds(&self) -> (f32, f32) {
        (self.min_distance, self.max_distance)
    }

    pub fn matrix(&self) -> Mat4 {
        self.matrix
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn auto_update(&self) -> bool {
        self.auto_update
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn entity(&self) -> Option<hecs::Entity> {
        self.entity
    }

    /// Eases the current spherical coordinates one step towards the target
    /// ones and rebuilds the look-at matrix. With a camera the result is the
    /// camera's world matrix, otherwise it is the view matrix.
    pub fn update_matrix(&mut self, has_camera: bool) -> Mat4 {
        self.lat = bounded(self.lat, self.min_lat, self.max_lat);
        self.lon = bounded(self.lon, self.min_lon, self.max_lon) % 360.0;
        self.distance = bounded(self.distance, self.min_distance, self.max_distance);

        self.current_lat = self.ease_angle(self.current_lat, self.lat);
        self.current_lon = self.ease_angle(self.current_lon, self.lon);
        self.current_distance += (self.distance - self.current_distance) * self.easing;

        self.position = lat_lon_to_xyz(self.current_lat, self.current_lon) * self.current_distance
            + self.target;

        let look_at = Mat4::look_at_rh(self.position, self.target, Vec3::Y);
        self.matrix = if has_camera { look_at.inverse() } else { look_at };
        self.matrix
    }

    fn ease_angle(&self, current: f32, target: f32) -> f32 {
        let from = current.to_radians().rem_euclid(TAU);
        let to = target.to_radians().rem_euclid(TAU);
        wrap_degrees(interpolate_angle(from, to, self.easing).to_degrees())
    }

    /// Feeds one input event. Panning needs the camera of the owning entity;
    /// without it a shift-drag orbits like a plain drag.
    pub fn handle_event(&mut self, event: OrbiterEvent, camera: Option<&Camera>) {
        if let OrbiterEvent::Resize { width, height } = event {
            self.viewport = Vec2::new(width, height);
            return;
        }
        if !self.enabled {
            return;
        }

        match event {
            OrbiterEvent::PointerDown { x, y, shift } => self.pointer_down(x, y, shift, camera),
            OrbiterEvent::PointerMove { x, y, shift } => self.pointer_move(x, y, shift, camera),
            OrbiterEvent::PointerUp => {
                self.dragging = false;
                self.pan_state = None;
            }
            OrbiterEvent::Wheel { delta_y } => {
                if self.zoom {
                    self.distance *= 1.0 + delta_y / self.zoom_slowdown;
                    self.distance = bounded(self.distance, self.min_distance, self.max_distance);
                }
            }
            OrbiterEvent::Resize { .. } => {}
        }
    }

    fn pointer_down(&mut self, x: f32, y: f32, shift: bool, camera: Option<&Camera>) {
        self.dragging = true;
        self.drag_pos = Vec2::new(x, y);
        self.pan_state = match camera {
            Some(camera) if shift && self.pan && self.has_viewport() => Some(PanState {
                click_window: Vec2::new(x, y),
                click_target: self.target,
                plane_point: camera.view_matrix().transform_point3(self.target),
            }),
            _ => None,
        };
    }

    fn pointer_move(&mut self, x: f32, y: f32, shift: bool, camera: Option<&Camera>) {
        if !self.dragging {
            return;
        }

        if let (Some(camera), Some(pan), true) = (camera, self.pan_state, shift) {
            if let Some(target) = self.pan_target(camera, pan, Vec2::new(x, y)) {
                self.target = target;
                self.changed.dispatch("target");
            }
        } else if self.drag {
            let delta = Vec2::new(x, y) - self.drag_pos;
            self.drag_pos = Vec2::new(x, y);
            self.lat += delta.y / self.drag_slowdown;
            self.lon -= delta.x / self.drag_slowdown;
        }
    }

    fn pan_target(&self, camera: &Camera, pan: PanState, drag_window: Vec2) -> Option<Vec3> {
        let (w, h) = (self.viewport.x, self.viewport.y);
        let click_ray = camera.view_ray(pan.click_window.x, pan.click_window.y, w, h);
        let drag_ray = camera.view_ray(drag_window.x, drag_window.y, w, h);
        let click_plane = click_ray.hit_test_plane(pan.plane_point, Vec3::Z)?;
        let drag_plane = drag_ray.hit_test_plane(pan.plane_point, Vec3::Z)?;

        let inverse_view = camera.view_matrix().inverse();
        let diff = inverse_view.transform_point3(drag_plane) - inverse_view.transform_point3(click_plane);
        Some(pan.click_target - diff)
    }

    fn has_viewport(&self) -> bool {
        self.viewport.x > 0.0 && self.viewport.y > 0.0
    }
}

impl Component for Orbiter {
    const TYPE: ComponentType = ComponentType::Orbiter;

    fn init(&mut self, entity: hecs::Entity) {
        self.entity = Some(entity);
    }

    fn dispose(&mut self) {
        self.dragging = false;
        self.pan_state = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_place_camera_on_positive_z() {
        let orbiter = Orbiter::default();
        assert!((orbiter.distance() - 5.0).abs() < 1e-6);
        assert!(orbiter.lat().abs() < 1e-6);
        assert!(orbiter.lon().abs() < 1e-6);
        assert_eq!(orbiter.distance_bounds(), (0.5, 50.0));
    }

    #[test]
    fn shorter_arc_crosses_zero() {
        let eased = interpolate_angle(350f32.to_radians(), 10f32.to_radians(), 0.5);
        assert!((wrap_degrees(eased.to_degrees())).abs() < 1e-3);
    }

    #[test]
    fn drag_moves_only_target_angles() {
        let mut orbiter = Orbiter::default();
        orbiter.handle_event(OrbiterEvent::PointerDown { x: 10.0, y: 10.0, shift: false }, None);
        orbiter.handle_event(OrbiterEvent::PointerMove { x: 18.0, y: 30.0, shift: false }, None);

        assert!((orbiter.lat() - 5.0).abs() < 1e-5);
        assert!((orbiter.lon() + 2.0).abs() < 1e-5);
        assert!(orbiter.current_lat().abs() < 1e-6);
    }

    #[test]
    fn wheel_zoom_is_clamped() {
        let mut orbiter = Orbiter::default();
        orbiter.handle_event(OrbiterEvent::Wheel { delta_y: 1.0e6 }, None);
        assert!((orbiter.distance() - 50.0).abs() < 1e-4);
    }

    #[test]
    fn inverted_bounds_do_not_panic() {
        let mut orbiter = Orbiter::new([
            OrbiterAttr::MinDistance(60.0),
            OrbiterAttr::MinLat(10.0),
            OrbiterAttr::MaxLat(-10.0),
        ]);
        orbiter.handle_event(OrbiterEvent::Wheel { delta_y: 10.0 }, None);
        assert_eq!(orbiter.distance(), 50.0);

        orbiter.update_matrix(false);
        assert_eq!(orbiter.lat(), -10.0);
        assert_eq!(orbiter.distance(), 50.0);
    }

    #[test]
    fn disabled_orbiter_ignores_input() {
        let mut orbiter = Orbiter::new([OrbiterAttr::Enabled(false)]);
        orbiter.handle_event(OrbiterEvent::Wheel { delta_y: 200.0 }, None);
        assert!((orbiter.distance() - 5.0).abs() < 1e-6);
    }

    #[test]
    fn camera_matrix_looks_at_target() {
        let mut orbiter = Orbiter::new([OrbiterAttr::Easing(1.0)]);
        let world = orbiter.update_matrix(true);
        let forward = world.transform_vector3(Vec3::NEG_Z);
        assert!(forward.abs_diff_eq(Vec3::NEG_Z, 1e-5));
        assert!(orbiter.position().abs_diff_eq(Vec3::new(0.0, 0.0, 5.0), 1e-4));
    }
}
