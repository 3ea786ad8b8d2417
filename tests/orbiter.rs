//! Orbit camera rig driven through the Scene.

use glam::Vec3;
use retained_scene::scene::orbiter::{lat_lon_to_xyz, xyz_to_lat_lon};
use retained_scene::scene::{AnyComponent, Camera, Orbiter, OrbiterAttr, OrbiterEvent, Transform};
use retained_scene::Scene;

fn spawn_rig(scene: &mut Scene, camera: Option<Camera>, attrs: Vec<OrbiterAttr>) -> hecs::Entity {
    let mut components = Vec::new();
    if let Some(camera) = camera {
        components.push(AnyComponent::from(camera));
    }
    components.push(AnyComponent::from(Orbiter::new(attrs)));
    scene
        .spawn(components, None, std::iter::empty::<String>())
        .unwrap()
}

#[test]
fn spherical_coordinates_round_trip() {
    for lat in [-80.0f32, -30.0, 0.0, 45.0, 80.0] {
        for lon in [-170.0f32, -90.0, 0.0, 60.0, 179.0] {
            let direction = lat_lon_to_xyz(lat, lon);
            assert!((direction.length() - 1.0).abs() < 1e-5);
            let (back_lat, back_lon) = xyz_to_lat_lon(direction * 3.0);
            assert!((back_lat - lat).abs() < 1e-3, "lat {} -> {}", lat, back_lat);
            assert!((back_lon - lon).abs() < 1e-3, "lon {} -> {}", lon, back_lon);
        }
    }
    assert!(lat_lon_to_xyz(0.0, 90.0).abs_diff_eq(Vec3::X, 1e-6));
    assert!(lat_lon_to_xyz(90.0, 0.0).abs_diff_eq(Vec3::Y, 1e-6));
}

#[test]
fn camera_rig_places_camera_and_view_matrix() {
    let mut scene = Scene::new();
    let rig = spawn_rig(
        &mut scene,
        Some(Camera::default()),
        vec![
            OrbiterAttr::Target(Vec3::new(1.0, 0.0, 0.0)),
            OrbiterAttr::Position(Vec3::new(1.0, 0.0, 10.0)),
        ],
    );
    scene.update(1.0 / 60.0);

    let position = scene.get::<Transform>(rig).unwrap().position();
    assert!(position.abs_diff_eq(Vec3::new(1.0, 0.0, 10.0), 1e-4));

    let world = scene.world_matrix(rig).unwrap();
    let forward = world.transform_vector3(Vec3::NEG_Z);
    assert!(forward.abs_diff_eq(Vec3::NEG_Z, 1e-4));

    let view = scene.get::<Camera>(rig).unwrap().view_matrix();
    assert!(view.abs_diff_eq(world.inverse(), 1e-4));
}

#[test]
fn easing_steps_per_tick_regardless_of_frame_time() {
    let mut eased = Vec::new();
    for dt in [1.0 / 120.0, 0.5] {
        let mut scene = Scene::new();
        let rig = spawn_rig(&mut scene, None, vec![OrbiterAttr::Easing(0.25)]);
        scene
            .get_mut::<Orbiter>(rig)
            .unwrap()
            .set([OrbiterAttr::Lat(40.0)]);
        scene.update(dt);
        eased.push(scene.get::<Orbiter>(rig).unwrap().current_lat());
    }
    assert!((eased[0] - 10.0).abs() < 1e-3);
    assert!((eased[0] - eased[1]).abs() < 1e-6);
}

#[test]
fn orthographic_camera_zoom_follows_distance() {
    let mut scene = Scene::new();
    let rig = spawn_rig(
        &mut scene,
        Some(Camera::orthographic(4.0, 3.0, 0.1, 100.0)),
        vec![OrbiterAttr::Position(Vec3::new(0.0, 0.0, 8.0))],
    );
    scene.update(1.0 / 60.0);
    assert!((scene.get::<Camera>(rig).unwrap().zoom() - 8.0).abs() < 1e-5);
}

#[test]
fn shift_drag_pans_the_target_with_a_camera() {
    let mut scene = Scene::new();
    let rig = spawn_rig(
        &mut scene,
        Some(Camera::default()),
        vec![OrbiterAttr::Position(Vec3::new(0.0, 0.0, 10.0))],
    );
    scene.update(1.0 / 60.0);

    for event in [
        OrbiterEvent::Resize { width: 800.0, height: 600.0 },
        OrbiterEvent::PointerDown { x: 400.0, y: 300.0, shift: true },
        OrbiterEvent::PointerMove { x: 500.0, y: 300.0, shift: true },
        OrbiterEvent::PointerUp,
    ] {
        scene.handle_orbiter_event(rig, event).unwrap();
    }

    let orbiter = scene.get::<Orbiter>(rig).unwrap();
    assert!(orbiter.target().x < -0.1);
    assert!(orbiter.target().y.abs() < 1e-3);
    assert!(orbiter.lat().abs() < 1e-4);
    assert!(orbiter.lon().abs() < 1e-4);
    assert!(!orbiter.is_dragging());
}

#[test]
fn shift_drag_orbits_without_a_camera() {
    let mut scene = Scene::new();
    let rig = spawn_rig(&mut scene, None, vec![]);

    for event in [
        OrbiterEvent::Resize { width: 800.0, height: 600.0 },
        OrbiterEvent::PointerDown { x: 400.0, y: 300.0, shift: true },
        OrbiterEvent::PointerMove { x: 440.0, y: 300.0, shift: true },
    ] {
        scene.handle_orbiter_event(rig, event).unwrap();
    }

    let orbiter = scene.get::<Orbiter>(rig).unwrap();
    assert_eq!(orbiter.target(), Vec3::ZERO);
    assert!((orbiter.lon() + 10.0).abs() < 1e-4);
}

#[test]
fn orbiter_reproduces_an_arbitrary_position() {
    let target = Vec3::new(1.0, 2.0, 3.0);
    let position = Vec3::new(4.0, -1.0, 7.0);
    let mut orbiter = Orbiter::new([
        OrbiterAttr::Easing(1.0),
        OrbiterAttr::Target(target),
        OrbiterAttr::Position(position),
    ]);
    assert!((orbiter.distance() - (position - target).length()).abs() < 1e-5);

    orbiter.update_matrix(false);
    assert!(
        orbiter.position().abs_diff_eq(position, 1e-4),
        "{:?} != {:?}",
        orbiter.position(),
        position
    );
    assert_eq!(orbiter.target(), target);
}

#[test]
fn distance_is_clamped_on_every_tick() {
    let mut orbiter = Orbiter::new([OrbiterAttr::Easing(1.0)]);
    assert_eq!(orbiter.distance_bounds(), (0.5, 50.0));

    orbiter.set([OrbiterAttr::Distance(1000.0)]);
    orbiter.update_matrix(false);
    assert_eq!(orbiter.distance(), 50.0);
    assert!((orbiter.current_distance() - 50.0).abs() < 1e-4);
    assert!((orbiter.position().length() - 50.0).abs() < 1e-3);

    orbiter.set([OrbiterAttr::Distance(0.01)]);
    orbiter.update_matrix(false);
    assert!((orbiter.current_distance() - 0.5).abs() < 1e-5);
}
