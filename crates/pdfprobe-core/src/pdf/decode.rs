//! Decoding of image XObjects into standalone image files.

use std::io::Cursor;

use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use lopdf::{Dictionary, Document, Object, Stream};
use tracing::{debug, trace};

use super::{DecodedImage, Result};
use crate::error::PdfError;

/// Filters lopdf can undo, leaving plain samples behind.
const SAMPLE_FILTERS: &[&[u8]] = &[b"FlateDecode", b"LZWDecode", b"ASCII85Decode"];

/// How samples map to pixel colors.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ColorModel {
    /// Samples are color components: 1 gray, 3 RGB or 4 CMYK.
    Direct(usize),
    /// One sample per pixel, indexing a table of `base`-component colors.
    Indexed {
        base: usize,
        hival: usize,
        lookup: Vec<u8>,
    },
}

impl ColorModel {
    fn samples_per_pixel(&self) -> usize {
        match self {
            ColorModel::Direct(components) => *components,
            ColorModel::Indexed { .. } => 1,
        }
    }
}

/// Sample format of an image we can re-encode.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SampleLayout {
    model: ColorModel,
    bits: u8,
    /// `/Decode [1 0]`: sample values run from white to black.
    invert: bool,
}

/// Decode an image XObject found on `page`.
///
/// Raw samples (unfiltered, Flate, LZW or ASCII85) in a known color space
/// are re-encoded as PNG. Everything else is returned as stored, with an
/// extension named after its last filter: JPEG, JPEG 2000 and JBIG2 data
/// already form a file, while CCITT fax data and chained codecs are kept
/// as is. Corrupt sample data is an error.
pub fn decode_image(doc: &Document, stream: &Stream, page: u32) -> Result<DecodedImage> {
    let dict = &stream.dict;
    let width = dimension(dict, b"Width", page)?;
    let height = dimension(dict, b"Height", page)?;
    let filters = filter_names(doc, dict);

    trace!(
        "Image object on page {}: {}x{}, filters={:?}",
        page,
        width,
        height,
        filters
            .iter()
            .map(|f| String::from_utf8_lossy(f))
            .collect::<Vec<_>>()
    );

    let stored = || DecodedImage {
        data: stream.content.clone(),
        width,
        height,
        ext: stored_ext(&filters),
    };

    if !filters.iter().all(|f| SAMPLE_FILTERS.contains(&f.as_slice())) {
        return Ok(stored());
    }

    let Some(layout) = sample_layout(doc, dict) else {
        debug!(
            "Keeping image on page {} as stored: unsupported sample layout",
            page
        );
        return Ok(stored());
    };

    let samples = if filters.is_empty() {
        stream.content.clone()
    } else {
        stream
            .decompressed_content()
            .map_err(|e| PdfError::ImageExtraction {
                page,
                reason: format!("failed to decompress image: {}", e),
            })?
    };

    let image = layout
        .to_image(&samples, width, height)
        .ok_or_else(|| PdfError::ImageExtraction {
            page,
            reason: format!(
                "image data too short for {}x{} at {} bits per component",
                width, height, layout.bits
            ),
        })?;

    let mut data = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut data), ImageFormat::Png)
        .map_err(|e| PdfError::ImageExtraction {
            page,
            reason: format!("failed to encode PNG: {}", e),
        })?;

    Ok(DecodedImage {
        data,
        width,
        height,
        ext: "png".to_string(),
    })
}

fn dimension(dict: &Dictionary, key: &[u8], page: u32) -> Result<u32> {
    dict.get(key)
        .ok()
        .and_then(|o| o.as_i64().ok())
        .and_then(|v| u32::try_from(v).ok())
        .filter(|v| *v > 0)
        .ok_or_else(|| PdfError::ImageExtraction {
            page,
            reason: format!("image has no valid /{}", String::from_utf8_lossy(key)),
        })
}

fn filter_names(doc: &Document, dict: &Dictionary) -> Vec<Vec<u8>> {
    let Some(filter) = dict.get(b"Filter").ok() else {
        return Vec::new();
    };

    match doc.dereference(filter).map(|(_, o)| o) {
        Ok(Object::Name(name)) => vec![name.clone()],
        Ok(Object::Array(arr)) => arr
            .iter()
            .filter_map(|o| o.as_name().ok())
            .map(|n| n.to_vec())
            .collect(),
        _ => Vec::new(),
    }
}

/// Extension for image bytes returned as stored in the PDF.
fn stored_ext(filters: &[Vec<u8>]) -> String {
    let Some(last) = filters.last() else {
        return "raw".to_string();
    };

    match last.as_slice() {
        b"DCTDecode" | b"DCT" => "jpeg".to_string(),
        b"JPXDecode" => "jpx".to_string(),
        b"JBIG2Decode" => "jb2".to_string(),
        b"CCITTFaxDecode" | b"CCF" => "ccitt".to_string(),
        other => {
            let stem = other.strip_suffix(b"Decode").unwrap_or(other);
            if stem.is_empty() {
                "bin".to_string()
            } else {
                String::from_utf8_lossy(stem).to_lowercase()
            }
        }
    }
}

fn sample_layout(doc: &Document, dict: &Dictionary) -> Option<SampleLayout> {
    let is_mask = dict
        .get(b"ImageMask")
        .ok()
        .and_then(|o| o.as_bool().ok())
        .unwrap_or(false);

    let bits = if is_mask {
        1
    } else {
        dict.get(b"BitsPerComponent")
            .ok()
            .and_then(|o| o.as_i64().ok())
            .unwrap_or(8)
    };
    let bits = u8::try_from(bits)
        .ok()
        .filter(|b| matches!(b, 1 | 2 | 4 | 8 | 16))?;

    let model = if is_mask {
        ColorModel::Direct(1)
    } else {
        color_model(doc, dict.get(b"ColorSpace").ok()?)?
    };

    let indexed = matches!(model, ColorModel::Indexed { .. });
    if indexed && bits == 16 {
        return None;
    }

    let invert = !indexed
        && dict
            .get(b"Decode")
            .and_then(Object::as_array)
            .ok()
            .and_then(|d| Some((d.first()?.as_float().ok()?, d.get(1)?.as_float().ok()?)))
            .is_some_and(|(low, high)| low > high);

    Some(SampleLayout {
        model,
        bits,
        invert,
    })
}

fn color_model(doc: &Document, space: &Object) -> Option<ColorModel> {
    let (_, space) = doc.dereference(space).ok()?;

    if let Object::Array(arr) = space {
        if matches!(arr.first()?.as_name().ok()?, b"Indexed" | b"I") {
            let base = direct_components(doc, arr.get(1)?)?;
            let hival = usize::try_from(arr.get(2)?.as_i64().ok()?).ok()?;
            let lookup = lookup_table(doc, arr.get(3)?)?;
            return Some(ColorModel::Indexed {
                base,
                hival,
                lookup,
            });
        }
    }

    direct_components(doc, space).map(ColorModel::Direct)
}

/// Components per pixel for the color spaces we can re-encode.
fn direct_components(doc: &Document, space: &Object) -> Option<usize> {
    let (_, space) = doc.dereference(space).ok()?;

    match space {
        Object::Name(name) => named_components(name),
        Object::Array(arr) => match arr.first()?.as_name().ok()? {
            b"ICCBased" => {
                let (_, profile) = doc.dereference(arr.get(1)?).ok()?;
                let n = profile
                    .as_stream()
                    .ok()?
                    .dict
                    .get(b"N")
                    .ok()?
                    .as_i64()
                    .ok()?;
                match n {
                    1 | 3 | 4 => Some(n as usize),
                    _ => None,
                }
            }
            other => named_components(other),
        },
        _ => None,
    }
}

fn named_components(name: &[u8]) -> Option<usize> {
    match name {
        b"DeviceGray" | b"G" | b"CalGray" => Some(1),
        b"DeviceRGB" | b"RGB" | b"CalRGB" => Some(3),
        b"DeviceCMYK" | b"CMYK" => Some(4),
        _ => None,
    }
}

/// Palette bytes of an indexed color space, given inline or as a stream.
fn lookup_table(doc: &Document, lookup: &Object) -> Option<Vec<u8>> {
    match doc.dereference(lookup).ok()?.1 {
        Object::String(bytes, _) => Some(bytes.clone()),
        Object::Stream(stream) if stream.dict.get(b"Filter").is_ok() => {
            stream.decompressed_content().ok()
        }
        Object::Stream(stream) => Some(stream.content.clone()),
        _ => None,
    }
}

impl SampleLayout {
    /// Turn packed samples into an image; `None` if the data is too short.
    fn to_image(&self, data: &[u8], width: u32, height: u32) -> Option<DynamicImage> {
        let direct = matches!(self.model, ColorModel::Direct(_));
        let mut samples = unpack_samples(
            data,
            width as usize,
            height as usize,
            self.model.samples_per_pixel(),
            self.bits,
            direct,
        )?;

        if self.invert {
            for sample in &mut samples {
                *sample = 255 - *sample;
            }
        }

        match &self.model {
            ColorModel::Direct(components) => pixels_to_image(samples, width, height, *components),
            ColorModel::Indexed {
                base,
                hival,
                lookup,
            } => {
                let pixels = expand_palette(&samples, *base, *hival, lookup);
                pixels_to_image(pixels, width, height, *base)
            }
        }
    }
}

/// Unpack rows of `bits`-wide samples into one byte per sample.
///
/// Rows start on a byte boundary. With `scale`, sub-byte values are
/// stretched to 0..=255; otherwise they are kept as palette indices.
fn unpack_samples(
    data: &[u8],
    width: usize,
    height: usize,
    components: usize,
    bits: u8,
    scale: bool,
) -> Option<Vec<u8>> {
    let per_row = width.checked_mul(components)?;
    let row_bytes = per_row.checked_mul(usize::from(bits))?.div_ceil(8);
    if row_bytes == 0 || data.len() < row_bytes.checked_mul(height)? {
        return None;
    }

    let mut out = Vec::with_capacity(per_row * height);
    for row in data.chunks_exact(row_bytes).take(height) {
        match bits {
            8 => out.extend_from_slice(&row[..per_row]),
            // Keep the most significant byte
            16 => out.extend(row.chunks_exact(2).take(per_row).map(|s| s[0])),
            1 | 2 | 4 => {
                let bits = usize::from(bits);
                let max = (1u16 << bits) - 1;
                let per_byte = 8 / bits;
                for i in 0..per_row {
                    let shift = 8 - bits * (i % per_byte + 1);
                    let value = (u16::from(row[i / per_byte]) >> shift) & max;
                    out.push(if scale { (value * 255 / max) as u8 } else { value as u8 });
                }
            }
            _ => return None,
        }
    }

    Some(out)
}

fn expand_palette(indices: &[u8], base: usize, hival: usize, lookup: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(indices.len() * base);
    for &index in indices {
        let start = usize::from(index).min(hival) * base;
        out.extend((start..start + base).map(|i| lookup.get(i).copied().unwrap_or(0)));
    }
    out
}

fn pixels_to_image(
    mut samples: Vec<u8>,
    width: u32,
    height: u32,
    components: usize,
) -> Option<DynamicImage> {
    let expected = (width as usize)
        .checked_mul(height as usize)?
        .checked_mul(components)?;
    if samples.len() < expected {
        return None;
    }
    samples.truncate(expected);

    match components {
        1 => GrayImage::from_raw(width, height, samples).map(DynamicImage::ImageLuma8),
        3 => RgbImage::from_raw(width, height, samples).map(DynamicImage::ImageRgb8),
        4 => {
            let rgb: Vec<u8> = samples
                .chunks_exact(4)
                .flat_map(|px| {
                    let k = 255 - u16::from(px[3]);
                    [px[0], px[1], px[2]].map(|c| ((255 - u16::from(c)) * k / 255) as u8)
                })
                .collect();
            RgbImage::from_raw(width, height, rgb).map(DynamicImage::ImageRgb8)
        }
        _ => None,
    }
}
