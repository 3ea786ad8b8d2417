//! Stages 1 to 4: buffers, images, buffer views and accessors.

use std::ops::Range;

use gltf::json;
use gltf::json::buffer::Target;
use gltf::json::validation::Checked;
use rayon::prelude::*;

use super::document::{component_code, element_size, number_list, to_usize, Document};
use crate::asset::{BufferHandle, DecodedImage, GpuContext};
use crate::error::{ImportError, IoError};
use crate::io::{resolve_relative, AssetSource};
use crate::scene::geometry::{GpuStream, ScalarKind, TypedArray};

/// Runs `load` over `items`, either on the rayon pool or in order. Either way
/// every load finishes before the first error is returned.
pub(crate) fn fan_out<T, R, F>(parallel: bool, items: &[T], load: F) -> Result<Vec<R>, IoError>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> Result<R, IoError> + Sync,
{
    let results: Vec<Result<R, IoError>> = if parallel {
        items.par_iter().map(&load).collect()
    } else {
        items.iter().map(&load).collect()
    };
    results.into_iter().collect()
}

pub(crate) fn load_buffers(
    document: &Document,
    document_uri: &str,
    embedded: Option<&[u8]>,
    source: &dyn AssetSource,
    parallel: bool,
) -> Result<Vec<Vec<u8>>, ImportError> {
    let defs = &document.buffers;

    let mut uris = Vec::with_capacity(defs.len());
    for (index, def) in defs.iter().enumerate() {
        match (&def.uri, embedded) {
            (Some(uri), _) => uris.push(Some(resolve_relative(document_uri, uri))),
            (None, Some(_)) => uris.push(None),
            (None, None) => return Err(ImportError::MissingBufferSource(index)),
        }
    }

    let mut buffers = fan_out(parallel, &uris, |uri| match uri {
        Some(uri) => source.load_binary(uri),
        None => Ok(embedded.map(<[u8]>::to_vec).unwrap_or_default()),
    })?;

    for (index, (buffer, def)) in buffers.iter_mut().zip(defs).enumerate() {
        let declared = to_usize(def.byte_length.0);
        if buffer.len() < declared {
            log::warn!(
                "Buffer {} holds {} bytes but declares {}",
                index,
                buffer.len(),
                declared
            );
        }
        // The BIN chunk is padded to 4 bytes.
        if def.uri.is_none() && buffer.len() > declared {
            buffer.truncate(declared);
        }
    }

    log::info!("Loaded {} buffers", buffers.len());
    Ok(buffers)
}

/// Loads every image addressed by URI. Images stored in a buffer view stay
/// `None` until [`decode_embedded_images`] runs.
pub(crate) fn load_images(
    document: &Document,
    document_uri: &str,
    source: &dyn AssetSource,
    parallel: bool,
) -> Result<Vec<Option<DecodedImage>>, ImportError> {
    let uris: Vec<Option<String>> = document
        .images
        .iter()
        .map(|image| image.uri.as_ref().map(|uri| resolve_relative(document_uri, uri)))
        .collect();

    let images = fan_out(parallel, &uris, |uri| match uri {
        Some(uri) => source.load_image(uri).map(Some),
        None => Ok(None),
    })?;
    Ok(images)
}

#[derive(Debug)]
pub(crate) struct View {
    pub buffer: usize,
    pub range: Range<usize>,
    pub stride: Option<usize>,
    pub gpu: Option<BufferHandle>,
}

pub(crate) fn materialize_views(
    document: &Document,
    buffers: &[Vec<u8>],
    gpu: &mut dyn GpuContext,
) -> Result<Vec<View>, ImportError> {
    document
        .buffer_views
        .iter()
        .enumerate()
        .map(|(index, def)| materialize_view(index, def, buffers, gpu))
        .collect()
}

fn materialize_view(
    index: usize,
    def: &json::buffer::View,
    buffers: &[Vec<u8>],
    gpu: &mut dyn GpuContext,
) -> Result<View, ImportError> {
    let buffer_index = def.buffer.value();
    let buffer = buffers.get(buffer_index).ok_or(ImportError::MissingReference {
        kind: "buffer",
        index: buffer_index,
    })?;
    let start = def.byte_offset.as_ref().map_or(0, |offset| to_usize(offset.0));
    let end = start.checked_add(to_usize(def.byte_length.0));
    let range = match end {
        Some(end) if end <= buffer.len() => start..end,
        _ => {
            return Err(ImportError::ViewOutOfRange {
                view: index,
                buffer: buffer_index,
                start,
                end: end.unwrap_or(usize::MAX),
                len: buffer.len(),
            })
        }
    };

    let bytes = &buffer[range.clone()];
    let gpu = match &def.target {
        Some(Checked::Valid(Target::ElementArrayBuffer)) => Some(gpu.create_index_buffer(bytes)?),
        Some(Checked::Valid(Target::ArrayBuffer)) => Some(gpu.create_vertex_buffer(bytes)?),
        Some(Checked::Invalid) => {
            log::warn!("Buffer view {} has an unknown target, keeping it on the CPU", index);
            None
        }
        None => None,
    };

    Ok(View {
        buffer: buffer_index,
        range,
        stride: def.byte_stride.as_ref().map(|stride| stride.0),
        gpu,
    })
}

pub(crate) fn decode_embedded_images(
    defs: &[json::Image],
    images: &mut [Option<DecodedImage>],
    views: &[View],
    buffers: &[Vec<u8>],
) -> Result<(), ImportError> {
    for (index, (def, slot)) in defs.iter().zip(images.iter_mut()).enumerate() {
        if slot.is_some() {
            continue;
        }
        let Some(view_index) = def.buffer_view.map(|view| view.value()) else {
            log::warn!("Image {} has neither uri nor bufferView", index);
            continue;
        };
        let view = views.get(view_index).ok_or(ImportError::MissingReference {
            kind: "buffer view",
            index: view_index,
        })?;
        let bytes = &buffers[view.buffer][view.range.clone()];
        let image = DecodedImage::from_encoded(bytes).map_err(|err| IoError::Decode {
            uri: format!(
                "image {} ({})",
                index,
                def.mime_type.as_ref().map_or("unknown type", |mime| mime.0.as_str())
            ),
            message: err.to_string(),
        })?;
        *slot = Some(image);
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub(crate) struct Accessor {
    pub count: usize,
    /// Scalars per element.
    pub size: usize,
    pub gpu: Option<GpuStream>,
    pub data: Option<TypedArray>,
    pub min: Option<Vec<f32>>,
    pub max: Option<Vec<f32>>,
}

impl Accessor {
    pub fn floats(&self) -> Option<Vec<f32>> {
        self.data.as_ref().map(TypedArray::to_f32)
    }
}

pub(crate) fn materialize_accessors(
    document: &Document,
    views: &[View],
    buffers: &[Vec<u8>],
) -> Result<Vec<Accessor>, ImportError> {
    document
        .accessors
        .iter()
        .enumerate()
        .map(|(index, def)| materialize_accessor(index, def, views, buffers))
        .collect()
}

fn materialize_accessor(
    index: usize,
    def: &json::Accessor,
    views: &[View],
    buffers: &[Vec<u8>],
) -> Result<Accessor, ImportError> {
    let size = element_size(def).unwrap_or_else(|| {
        log::warn!("Accessor {} has an unknown type, treating it as SCALAR", index);
        1
    });
    let code = component_code(def);
    let kind = code.and_then(ScalarKind::from_gl);
    let count = to_usize(def.count.0);
    let byte_offset = def.byte_offset.as_ref().map_or(0, |offset| to_usize(offset.0));

    let mut accessor = Accessor {
        count,
        size,
        gpu: None,
        data: None,
        min: number_list(def.min.as_ref()),
        max: number_list(def.max.as_ref()),
    };

    let Some(view_index) = def.buffer_view.map(|view| view.value()) else {
        if let Some(kind) = kind {
            accessor.data = Some(zeroed(index, kind, count, size)?);
        }
        return Ok(accessor);
    };
    let view = views.get(view_index).ok_or(ImportError::MissingReference {
        kind: "buffer view",
        index: view_index,
    })?;
    let out_of_range = || ImportError::AccessorOutOfRange {
        accessor: index,
        view: view_index,
    };

    if let Some(buffer) = view.gpu {
        accessor.gpu = Some(GpuStream {
            buffer,
            byte_offset,
            component_type: code.unwrap_or_default(),
            stride: view.stride,
        });
    }

    match kind {
        Some(kind) => {
            let bytes = buffers[view.buffer][view.range.clone()]
                .get(byte_offset..)
                .ok_or_else(out_of_range)?;
            let element = kind.size_bytes() * size;
            let stride = view.stride.filter(|&stride| stride > 0).unwrap_or(element);
            let span = match count.checked_sub(1) {
                None => Some(0),
                Some(last) => last
                    .checked_mul(stride)
                    .and_then(|offset| offset.checked_add(element)),
            };
            match span {
                Some(span) if span <= bytes.len() => {}
                _ => return Err(out_of_range()),
            }
            accessor.data = Some(read_elements(bytes, kind, count, size, stride));
        }
        None if accessor.gpu.is_none() => log::warn!(
            "Accessor {} has an unsupported component type, skipping its data",
            index
        ),
        None => log::warn!(
            "Accessor {} has an unsupported component type, keeping only its GPU stream",
            index
        ),
    }

    Ok(accessor)
}

/// Zero-filled data for an accessor without a buffer view. The allocation is
/// fallible since `count` comes straight from the document.
fn zeroed(
    index: usize,
    kind: ScalarKind,
    count: usize,
    size: usize,
) -> Result<TypedArray, ImportError> {
    fn filled<T: Clone>(len: usize, zero: T) -> Option<Vec<T>> {
        let mut values = Vec::new();
        values.try_reserve_exact(len).ok()?;
        values.resize(len, zero);
        Some(values)
    }

    let too_large = || ImportError::AccessorTooLarge {
        accessor: index,
        count,
    };
    let len = count.checked_mul(size).ok_or_else(too_large)?;
    let data = match kind {
        ScalarKind::UnsignedShort => filled(len, 0u16).map(TypedArray::U16),
        ScalarKind::UnsignedInt => filled(len, 0u32).map(TypedArray::U32),
        ScalarKind::Float => filled(len, 0f32).map(TypedArray::F32),
    };
    data.ok_or_else(too_large)
}

/// Reads `count` elements of `size` scalars each, `stride` bytes apart.
fn read_elements(
    bytes: &[u8],
    kind: ScalarKind,
    count: usize,
    size: usize,
    stride: usize,
) -> TypedArray {
    fn collect<T: bytemuck::Pod>(
        bytes: &[u8],
        count: usize,
        size: usize,
        stride: usize,
    ) -> Vec<T> {
        let width = std::mem::size_of::<T>();
        let mut out = Vec::with_capacity(count * size);
        for element in 0..count {
            let base = element * stride;
            for component in 0..size {
                let at = base + component * width;
                out.push(bytemuck::pod_read_unaligned(&bytes[at..at + width]));
            }
        }
        out
    }

    match kind {
        ScalarKind::UnsignedShort => TypedArray::U16(collect(bytes, count, size, stride)),
        ScalarKind::UnsignedInt => TypedArray::U32(collect(bytes, count, size, stride)),
        ScalarKind::Float => TypedArray::F32(collect(bytes, count, size, stride)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::HeadlessGpu;

    fn document(mut value: serde_json::Value) -> Document {
        value["asset"] = serde_json::json!({ "version": "2.0" });
        super::super::document::from_json(value)
    }

    #[test]
    fn interleaved_views_are_deinterleaved() {
        // Two vertices of (position.x, position.y, u) with a 12 byte stride.
        let floats: [f32; 6] = [1.0, 2.0, 9.0, 3.0, 4.0, 9.0];
        let buffers = vec![bytemuck::cast_slice::<f32, u8>(&floats).to_vec()];
        let doc = document(serde_json::json!({
            "buffers": [{ "byteLength": 24 }],
            "bufferViews": [{ "buffer": 0, "byteLength": 24, "byteStride": 12 }],
            "accessors": [{ "bufferView": 0, "componentType": 5126, "count": 2, "type": "VEC2" }]
        }));

        let mut gpu = HeadlessGpu::new();
        let views = materialize_views(&doc, &buffers, &mut gpu).unwrap();
        let accessors = materialize_accessors(&doc, &views, &buffers).unwrap();
        assert_eq!(accessors[0].data, Some(TypedArray::F32(vec![1.0, 2.0, 3.0, 4.0])));
        assert_eq!(gpu.buffer_count(), 0);
    }

    #[test]
    fn targeted_views_become_gpu_streams() {
        let indices: [u16; 4] = [0, 1, 2, 0];
        let buffers = vec![bytemuck::cast_slice::<u16, u8>(&indices).to_vec()];
        let doc = document(serde_json::json!({
            "buffers": [{ "byteLength": 8 }],
            "bufferViews": [{ "buffer": 0, "byteLength": 8, "target": 34963 }],
            "accessors": [{ "bufferView": 0, "byteOffset": 2, "componentType": 5123, "count": 3, "type": "SCALAR" }]
        }));

        let mut gpu = HeadlessGpu::new();
        let views = materialize_views(&doc, &buffers, &mut gpu).unwrap();
        let accessors = materialize_accessors(&doc, &views, &buffers).unwrap();
        let stream = accessors[0].gpu.unwrap();
        assert_eq!(stream.byte_offset, 2);
        assert_eq!(stream.component_type, 5123);
        assert_eq!(accessors[0].data, Some(TypedArray::U16(vec![1, 2, 0])));
        assert_eq!(gpu.buffer_count(), 1);
    }

    #[test]
    fn accessor_without_view_is_zero_filled() {
        let doc = document(serde_json::json!({
            "buffers": [],
            "accessors": [{ "componentType": 5126, "count": 2, "type": "VEC3" }]
        }));
        let accessors = materialize_accessors(&doc, &[], &[]).unwrap();
        assert_eq!(accessors[0].data, Some(TypedArray::F32(vec![0.0; 6])));
    }

    #[test]
    fn unknown_component_type_is_skipped() {
        let buffers = vec![vec![0u8; 4]];
        let doc = document(serde_json::json!({
            "buffers": [{ "byteLength": 4 }],
            "bufferViews": [{ "buffer": 0, "byteLength": 4 }],
            "accessors": [{ "bufferView": 0, "componentType": 5121, "count": 4, "type": "SCALAR" }]
        }));
        let mut gpu = HeadlessGpu::new();
        let views = materialize_views(&doc, &buffers, &mut gpu).unwrap();
        let accessors = materialize_accessors(&doc, &views, &buffers).unwrap();
        assert!(accessors[0].data.is_none());
        assert!(accessors[0].gpu.is_none());
    }

    #[test]
    fn unknown_component_type_keeps_its_gpu_stream() {
        let buffers = vec![vec![0u8; 4]];
        let doc = document(serde_json::json!({
            "buffers": [{ "byteLength": 4 }],
            "bufferViews": [{ "buffer": 0, "byteLength": 4, "target": 34962 }],
            "accessors": [{ "bufferView": 0, "componentType": 5121, "count": 4, "type": "SCALAR" }]
        }));
        let mut gpu = HeadlessGpu::new();
        let views = materialize_views(&doc, &buffers, &mut gpu).unwrap();
        let accessors = materialize_accessors(&doc, &views, &buffers).unwrap();
        assert!(accessors[0].data.is_none());
        assert_eq!(accessors[0].gpu.map(|stream| stream.component_type), Some(5121));
        assert_eq!(gpu.buffer_count(), 1);
    }

    #[test]
    fn view_past_buffer_end_is_rejected() {
        let buffers = vec![vec![0u8; 4]];
        let doc = document(serde_json::json!({
            "buffers": [{ "byteLength": 4 }],
            "bufferViews": [{ "buffer": 0, "byteOffset": 2, "byteLength": 4 }]
        }));
        let mut gpu = HeadlessGpu::new();
        let err = materialize_views(&doc, &buffers, &mut gpu).unwrap_err();
        assert!(matches!(err, ImportError::ViewOutOfRange { view: 0, end: 6, .. }));
    }

    #[test]
    fn overflowing_view_range_is_rejected() {
        let buffers = vec![vec![0u8; 4]];
        let doc = document(serde_json::json!({
            "buffers": [{ "byteLength": 4 }],
            "bufferViews": [{ "buffer": 0, "byteOffset": 2, "byteLength": u64::MAX }]
        }));
        let mut gpu = HeadlessGpu::new();
        let err = materialize_views(&doc, &buffers, &mut gpu).unwrap_err();
        assert!(matches!(err, ImportError::ViewOutOfRange { view: 0, .. }));
    }

    #[test]
    fn huge_accessor_count_is_an_error() {
        let buffers = vec![vec![0u8; 12]];
        let doc = document(serde_json::json!({
            "buffers": [{ "byteLength": 12 }],
            "bufferViews": [{ "buffer": 0, "byteLength": 12 }],
            "accessors": [
                { "bufferView": 0, "componentType": 5126, "count": 4611686018427387904u64, "type": "VEC3" },
                { "componentType": 5126, "count": 4611686018427387904u64, "type": "VEC3" }
            ]
        }));
        let mut gpu = HeadlessGpu::new();
        let views = materialize_views(&doc, &buffers, &mut gpu).unwrap();

        let err = materialize_accessor(0, &doc.accessors[0], &views, &buffers).unwrap_err();
        assert!(matches!(err, ImportError::AccessorOutOfRange { accessor: 0, view: 0 }));

        let err = materialize_accessor(1, &doc.accessors[1], &views, &buffers).unwrap_err();
        assert!(matches!(err, ImportError::AccessorTooLarge { accessor: 1, .. }));
    }

    #[test]
    fn missing_buffer_uri_without_bin_chunk_is_fatal() {
        let doc = document(serde_json::json!({ "buffers": [{ "byteLength": 4 }] }));
        let source = crate::io::MemorySource::new();
        let err = load_buffers(&doc, "scene.gltf", None, &source, false).unwrap_err();
        assert!(matches!(err, ImportError::MissingBufferSource(0)));
    }
}
