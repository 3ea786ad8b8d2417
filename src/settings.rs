use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::asset::Filter;

/// What the importer does with subtrees that hold no geometry and no joints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PruneMode {
    /// Leave them alone and report nothing.
    Keep,
    /// Report them in `ImportedScene::pruned`.
    #[default]
    Flag,
    /// Report them and remove them from the registry.
    Remove,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportSettings {
    #[serde(default)]
    pub prune: PruneMode,
    #[serde(default = "ImportSettings::default_true")]
    pub resize_npot_textures: bool,
    #[serde(default = "ImportSettings::default_anisotropy")]
    pub anisotropy: u8,
    #[serde(default = "ImportSettings::default_true")]
    pub cast_shadows: bool,
    #[serde(default = "ImportSettings::default_true")]
    pub receive_shadows: bool,
    #[serde(default = "ImportSettings::default_min_filter")]
    pub default_min_filter: Filter,
    #[serde(default = "ImportSettings::default_true")]
    pub parallel_loads: bool,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            prune: PruneMode::default(),
            resize_npot_textures: true,
            anisotropy: Self::default_anisotropy(),
            cast_shadows: true,
            receive_shadows: true,
            default_min_filter: Self::default_min_filter(),
            parallel_loads: true,
        }
    }
}

impl ImportSettings {
    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Self {
        use std::fs;

        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<ImportSettings>(&contents) {
                Ok(settings) => {
                    info!("Loaded import settings from {:?}", path);
                    settings.validate()
                }
                Err(err) => {
                    warn!(
                        "Failed to parse {:?} ({}). Falling back to default import settings.",
                        path, err
                    );
                    ImportSettings::default()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!(
                    "Import settings file {:?} not found. Using default settings.",
                    path
                );
                ImportSettings::default()
            }
            Err(err) => {
                warn!(
                    "Failed to read {:?} ({}). Falling back to default import settings.",
                    path, err
                );
                ImportSettings::default()
            }
        }
    }

    fn validate(mut self) -> Self {
        if self.anisotropy == 0 {
            warn!("Anisotropy must be at least 1. Using 1 instead.");
            self.anisotropy = 1;
        }

        self
    }

    const fn default_true() -> bool {
        true
    }

    const fn default_anisotropy() -> u8 {
        16
    }

    const fn default_min_filter() -> Filter {
        Filter::LinearMipmapLinear
    }
}
