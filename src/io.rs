use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::asset::DecodedImage;
use crate::error::IoError;

/// Load-by-URI collaborator used by the importer.
///
/// Each call is one unit of suspension: the importer fans a stage's loads out
/// across threads and waits for all of them before the next stage starts.
pub trait AssetSource: Sync {
    fn load_binary(&self, uri: &str) -> Result<Vec<u8>, IoError>;

    fn load_json(&self, uri: &str) -> Result<serde_json::Value, IoError> {
        let bytes = self.load_binary(uri)?;
        serde_json::from_slice(&bytes).map_err(|err| IoError::Decode {
            uri: uri.to_string(),
            message: err.to_string(),
        })
    }

    fn load_image(&self, uri: &str) -> Result<DecodedImage, IoError> {
        let bytes = self.load_binary(uri)?;
        DecodedImage::from_encoded(&bytes).map_err(|err| IoError::Decode {
            uri: uri.to_string(),
            message: err.to_string(),
        })
    }
}

/// Decodes `data:[<mediatype>][;base64],<payload>` URIs. Returns `None` for
/// any other URI.
pub fn decode_data_uri(uri: &str) -> Option<Result<Vec<u8>, IoError>> {
    let rest = uri.strip_prefix("data:")?;
    let Some((header, payload)) = rest.split_once(',') else {
        return Some(Err(IoError::DataUri(truncated(uri))));
    };

    if !header.ends_with(";base64") {
        return Some(Ok(payload.as_bytes().to_vec()));
    }

    Some(base64::decode(payload).map_err(|err| IoError::DataUri(format!("{}: {}", truncated(uri), err))))
}

fn truncated(uri: &str) -> String {
    uri.chars().take(48).collect()
}

/// Resolves `uri` against the directory of `document_uri`. Data URIs,
/// absolute paths and URLs are returned unchanged.
pub fn resolve_relative(document_uri: &str, uri: &str) -> String {
    if uri.starts_with("data:") || uri.starts_with('/') || uri.contains("://") {
        return uri.to_string();
    }

    match document_uri.rfind('/') {
        Some(split) => format!("{}/{}", &document_uri[..split], uri),
        None => uri.to_string(),
    }
}

/// Reads from the local filesystem, relative to a base directory.
#[derive(Debug, Clone)]
pub struct FileSource {
    base: PathBuf,
}

impl FileSource {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    fn path_for(&self, uri: &str) -> PathBuf {
        let path = Path::new(uri);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base.join(path)
        }
    }
}

impl AssetSource for FileSource {
    fn load_binary(&self, uri: &str) -> Result<Vec<u8>, IoError> {
        if let Some(decoded) = decode_data_uri(uri) {
            return decoded;
        }

        let path = self.path_for(uri);
        log::debug!("Reading {:?}", path);
        std::fs::read(&path).map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                IoError::NotFound(uri.to_string())
            } else {
                IoError::Read {
                    uri: uri.to_string(),
                    source: err,
                }
            }
        })
    }
}

/// In-memory resources keyed by URI.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    files: HashMap<String, Vec<u8>>,
    images: HashMap<String, DecodedImage>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, uri: impl Into<String>, bytes: Vec<u8>) -> &mut Self {
        self.files.insert(uri.into(), bytes);
        self
    }

    pub fn insert_json(&mut self, uri: impl Into<String>, value: &serde_json::Value) -> &mut Self {
        self.insert(uri, value.to_string().into_bytes())
    }

    /// Registers already-decoded pixels, bypassing image decoding.
    pub fn insert_image(&mut self, uri: impl Into<String>, image: DecodedImage) -> &mut Self {
        self.images.insert(uri.into(), image);
        self
    }
}

impl AssetSource for MemorySource {
    fn load_binary(&self, uri: &str) -> Result<Vec<u8>, IoError> {
        if let Some(decoded) = decode_data_uri(uri) {
            return decoded;
        }
        self.files
            .get(uri)
            .cloned()
            .ok_or_else(|| IoError::NotFound(uri.to_string()))
    }

    fn load_image(&self, uri: &str) -> Result<DecodedImage, IoError> {
        if let Some(image) = self.images.get(uri) {
            return Ok(image.clone());
        }
        let bytes = self.load_binary(uri)?;
        DecodedImage::from_encoded(&bytes).map_err(|err| IoError::Decode {
            uri: uri.to_string(),
            message: err.to_string(),
        })
    }
}
