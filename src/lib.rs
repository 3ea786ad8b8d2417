//! Retained-mode scene graph with glTF import.
//!
//! Entities live in a [`Scene`] backed by a `hecs` world. Every entity owns a
//! [`Transform`](scene::Transform) that links it into the hierarchy; other
//! components attach behaviour (geometry, materials, skins, animation,
//! cameras and the orbit camera rig). [`SceneLoader`] builds scenes from
//! glTF 2.0 documents through the [`io::AssetSource`] and
//! [`asset::GpuContext`] collaborators.

pub mod asset;
pub mod error;
pub mod io;
pub mod math;
pub mod scene;
pub mod settings;
pub mod signal;

pub use error::{CycleError, GpuError, ImportError, IoError, SceneError};
pub use scene::{ImportedScene, Scene, SceneLoader};
pub use settings::{ImportSettings, PruneMode};
pub use signal::{ChangeSignal, SubscriptionId};

/// Installs `env_logger` with an `Info` default, overridable via `RUST_LOG`.
/// Calling it more than once is harmless.
pub fn init_logging() {
    let _ = env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .try_init();
}
