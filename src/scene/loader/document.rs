//! Document parsing on top of `gltf::json`.
//!
//! The document is deserialized without validation so malformed enum values
//! survive as `Checked::Invalid` and each stage decides whether to skip or
//! abort.

use std::borrow::Cow;

use gltf::json::validation::Checked;
use gltf::json::{self, accessor::GenericComponentType};
use serde_json::Value;

use crate::error::ImportError;

pub(crate) type Document = json::Root;

/// Collections without which nothing can be imported, in the order they
/// are checked.
const REQUIRED: [&str; 2] = ["nodes", "buffers"];

/// Parses a `.gltf` JSON file or a `.glb` container. The second value is the
/// GLB binary chunk, if any.
pub(crate) fn parse(bytes: &[u8]) -> Result<(Document, Option<Cow<'_, [u8]>>), ImportError> {
    let (json, bin) = if bytes.starts_with(b"glTF") {
        let glb = gltf::Glb::from_slice(bytes)
            .map_err(|err| ImportError::InvalidBinary(err.to_string()))?;
        (glb.json, glb.bin)
    } else {
        (Cow::Borrowed(bytes), None)
    };

    let value: Value = serde_json::from_slice(&json)?;
    for collection in REQUIRED {
        if value.get(collection).is_none() {
            return Err(ImportError::MissingCollection(collection));
        }
    }
    Ok((serde_json::from_value(value)?, bin))
}

/// Document sizes are `u64`; anything beyond the address space saturates so
/// the range checks downstream reject it.
pub(crate) fn to_usize(value: u64) -> usize {
    usize::try_from(value).unwrap_or(usize::MAX)
}

/// Scalars per element, or `None` for an unrecognised accessor `type`.
pub(crate) fn element_size(accessor: &json::Accessor) -> Option<usize> {
    match &accessor.type_ {
        Checked::Valid(kind) => Some(kind.multiplicity()),
        Checked::Invalid => None,
    }
}

/// Raw component type code, or `None` when the document's value is not a
/// glTF component type.
pub(crate) fn component_code(accessor: &json::Accessor) -> Option<u32> {
    match &accessor.component_type {
        Checked::Valid(GenericComponentType(kind)) => Some(kind.as_gl_enum()),
        Checked::Invalid => None,
    }
}

/// Accessor `min`/`max` arrays as floats.
pub(crate) fn number_list(value: Option<&Value>) -> Option<Vec<f32>> {
    value?
        .as_array()?
        .iter()
        .map(|number| number.as_f64().map(|n| n as f32))
        .collect()
}

#[cfg(test)]
pub(crate) fn from_json(json: Value) -> Document {
    serde_json::from_value(json).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_collections_are_reported_in_order() {
        let err = parse(br#"{ "asset": { "version": "2.0" } }"#).unwrap_err();
        assert!(matches!(err, ImportError::MissingCollection("nodes")));

        let err = parse(br#"{ "asset": { "version": "2.0" }, "nodes": [] }"#).unwrap_err();
        assert!(matches!(err, ImportError::MissingCollection("buffers")));
    }

    #[test]
    fn accessor_types_and_unknown_component_types_survive_parsing() {
        let document = from_json(serde_json::json!({
            "asset": { "version": "2.0" },
            "accessors": [
                { "componentType": 5126, "count": 2, "type": "MAT3", "min": [0, 1.5] },
                { "componentType": 1234, "count": 1, "type": "VEC9" }
            ]
        }));
        assert_eq!(element_size(&document.accessors[0]), Some(9));
        assert_eq!(component_code(&document.accessors[0]), Some(5126));
        assert_eq!(number_list(document.accessors[0].min.as_ref()), Some(vec![0.0, 1.5]));

        assert_eq!(element_size(&document.accessors[1]), None);
        assert_eq!(component_code(&document.accessors[1]), None);
    }

    #[test]
    fn truncated_container_is_rejected() {
        let mut bytes = b"glTF".to_vec();
        bytes.extend_from_slice(&2u32.to_le_bytes());
        bytes.extend_from_slice(&64u32.to_le_bytes());
        assert!(matches!(parse(&bytes), Err(ImportError::InvalidBinary(_))));
    }
}
