//! Single-band GeoTIFF reading and writing.
//!
//! Uses the `tiff` crate directly. Band 1 is the first sample of each pixel
//! for interleaved files and the first plane for planar ones;
//! georeferencing (pixel scale, tie point, GeoKey directory, GeoDouble
//! params) is read into [`GeoReference`] and written back on output.
//! GeoAsciiParams are not carried, so keys that point into them are dropped.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;

use num_traits::ToPrimitive;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::Gray32Float;
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;
use tracing::debug;

use landsat_common::{GeoReference, Grid, PreprocessError, PreprocessResult};

const MODEL_PIXEL_SCALE_TAG: u16 = 33550;
const MODEL_TIEPOINT_TAG: u16 = 33922;
const GEO_KEY_DIRECTORY_TAG: u16 = 34735;
const GEO_DOUBLE_PARAMS_TAG: u16 = 34736;

/// Tags are looked up by their decoded variant, which is a named variant
/// when the `tiff` crate knows the code and `Tag::Unknown` otherwise.
fn geotiff_tag(code: u16) -> Tag {
    Tag::from_u16_exhaustive(code)
}

/// Read band 1 of a TIFF file into a grid.
///
/// The file handle is released before this function returns.
pub fn read_band<P: AsRef<Path>>(path: P) -> PreprocessResult<Grid> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| {
        PreprocessError::raster_read(format!("cannot open {}: {}", path.display(), e))
    })?;

    decode_band(BufReader::new(file))
        .map_err(|e| PreprocessError::raster_read(format!("{}: {}", path.display(), e)))
}

/// Write a grid as a single-band 32-bit float TIFF, replacing any existing file.
pub fn write_band<P: AsRef<Path>>(path: P, grid: &Grid) -> PreprocessResult<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| {
        PreprocessError::raster_write(format!("cannot create {}: {}", path.display(), e))
    })?;

    let mut writer = BufWriter::new(file);
    encode_band(grid, &mut writer)
        .and_then(|()| writer.flush().map_err(|e| e.to_string()))
        .map_err(|e| PreprocessError::raster_write(format!("{}: {}", path.display(), e)))
}

/// Internal: decode band 1 from any `Read + Seek` source
fn decode_band<R: Read + Seek>(reader: R) -> Result<Grid, String> {
    let mut decoder = Decoder::new(reader).map_err(|e| format!("TIFF decode error: {}", e))?;

    let (width, height) = decoder
        .dimensions()
        .map_err(|e| format!("cannot read dimensions: {}", e))?;
    let rows = height as usize;
    let cols = width as usize;

    // SamplesPerPixel defaults to 1 when the tag is absent.
    let samples = decoder
        .get_tag_u32(Tag::SamplesPerPixel)
        .map(|n| n.max(1) as usize)
        .unwrap_or(1);

    let layout = match decoder.get_tag_u32(Tag::PlanarConfiguration) {
        Ok(2) if samples > 1 => SampleLayout::Planar,
        _ => SampleLayout::Chunky { samples },
    };
    let pixels = rows * cols;

    let georef = read_georeference(&mut decoder);

    let result = decoder
        .read_image()
        .map_err(|e| format!("cannot read image data: {}", e))?;

    let data = match result {
        DecodingResult::U8(buf) => layout.band_one(&buf, pixels),
        DecodingResult::U16(buf) => layout.band_one(&buf, pixels),
        DecodingResult::U32(buf) => layout.band_one(&buf, pixels),
        DecodingResult::U64(buf) => layout.band_one(&buf, pixels),
        DecodingResult::I8(buf) => layout.band_one(&buf, pixels),
        DecodingResult::I16(buf) => layout.band_one(&buf, pixels),
        DecodingResult::I32(buf) => layout.band_one(&buf, pixels),
        DecodingResult::I64(buf) => layout.band_one(&buf, pixels),
        DecodingResult::F32(buf) => layout.band_one(&buf, pixels),
        DecodingResult::F64(buf) => layout.band_one(&buf, pixels),
        #[allow(unreachable_patterns)]
        _ => return Err("unsupported TIFF sample format".to_string()),
    };

    if data.len() != rows * cols {
        return Err(format!(
            "expected {} samples for {}x{} band, decoded {}",
            rows * cols,
            rows,
            cols,
            data.len()
        ));
    }

    debug!(rows, cols, samples, ?layout, georeferenced = georef.is_some(), "Decoded band 1");

    Grid::new(rows, cols, data)
        .map(|grid| grid.with_georeference(georef))
        .map_err(|e| e.to_string())
}

/// How the samples of a multi-band pixel are arranged in the decoded buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SampleLayout {
    /// PlanarConfiguration 1: the samples of one pixel are adjacent.
    Chunky { samples: usize },
    /// PlanarConfiguration 2: band 1 is stored as the first plane.
    Planar,
}

impl SampleLayout {
    /// Band 1 of `buf`, widened to f64.
    fn band_one<T: ToPrimitive>(self, buf: &[T], pixels: usize) -> Vec<f64> {
        let widen = |v: &T| v.to_f64().unwrap_or(f64::NAN);
        match self {
            SampleLayout::Chunky { samples } => buf.iter().step_by(samples).map(widen).collect(),
            SampleLayout::Planar => buf.iter().take(pixels).map(widen).collect(),
        }
    }
}

/// Attempt to read GeoTIFF tags. Missing or malformed tags yield None.
fn read_georeference<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<GeoReference> {
    let pixel_scale = decoder
        .get_tag_f64_vec(geotiff_tag(MODEL_PIXEL_SCALE_TAG))
        .ok()?;
    let tie_point = decoder
        .get_tag_f64_vec(geotiff_tag(MODEL_TIEPOINT_TAG))
        .ok()?;

    let geo_key_directory = decoder
        .get_tag_u16_vec(geotiff_tag(GEO_KEY_DIRECTORY_TAG))
        .ok();
    let geo_double_params = decoder
        .get_tag_f64_vec(geotiff_tag(GEO_DOUBLE_PARAMS_TAG))
        .ok();

    Some(GeoReference {
        pixel_scale,
        tie_point,
        geo_key_directory,
        geo_double_params,
    })
}

/// Drop GeoKey entries that reference a params tag we will not write.
///
/// The directory is a 4-short header `[version, revision, minor, count]`
/// followed by `count` entries of `[key_id, tag_location, count, value]`.
/// Returns None when the directory is malformed or no keys survive.
pub(crate) fn retain_writable_geo_keys(keys: &[u16], has_double_params: bool) -> Option<Vec<u16>> {
    if keys.len() < 4 {
        return None;
    }
    let (header, entries) = keys.split_at(4);
    let declared = header[3] as usize;
    if entries.len() < declared * 4 {
        return None;
    }

    let kept: Vec<&[u16]> = entries
        .chunks_exact(4)
        .take(declared)
        .filter(|entry| match entry[1] {
            0 => true,
            GEO_DOUBLE_PARAMS_TAG => has_double_params,
            _ => false,
        })
        .collect();

    if kept.is_empty() {
        return None;
    }

    let mut out = Vec::with_capacity(4 + kept.len() * 4);
    out.extend_from_slice(&header[..3]);
    out.push(kept.len() as u16);
    for entry in kept {
        out.extend_from_slice(entry);
    }
    Some(out)
}

/// Internal: encode a grid as 32-bit float TIFF into any `Write + Seek` sink
fn encode_band<W: Write + Seek>(grid: &Grid, writer: W) -> Result<(), String> {
    let mut encoder =
        TiffEncoder::new(writer).map_err(|e| format!("TIFF encoder error: {}", e))?;

    let (rows, cols) = grid.shape();
    let data: Vec<f32> = grid.data().iter().map(|&v| v as f32).collect();

    let mut image = encoder
        .new_image::<Gray32Float>(cols as u32, rows as u32)
        .map_err(|e| format!("cannot create TIFF image: {}", e))?;

    if let Some(georef) = grid.georeference() {
        image
            .encoder()
            .write_tag(geotiff_tag(MODEL_PIXEL_SCALE_TAG), georef.pixel_scale.as_slice())
            .map_err(|e| format!("cannot write scale tag: {}", e))?;

        image
            .encoder()
            .write_tag(geotiff_tag(MODEL_TIEPOINT_TAG), georef.tie_point.as_slice())
            .map_err(|e| format!("cannot write tiepoint tag: {}", e))?;

        let has_double_params = georef.geo_double_params.is_some();
        if let Some(keys) = georef
            .geo_key_directory
            .as_deref()
            .and_then(|keys| retain_writable_geo_keys(keys, has_double_params))
        {
            image
                .encoder()
                .write_tag(geotiff_tag(GEO_KEY_DIRECTORY_TAG), keys.as_slice())
                .map_err(|e| format!("cannot write geokey tag: {}", e))?;

            if let Some(params) = &georef.geo_double_params {
                image
                    .encoder()
                    .write_tag(geotiff_tag(GEO_DOUBLE_PARAMS_TAG), params.as_slice())
                    .map_err(|e| format!("cannot write geo double params tag: {}", e))?;
            }
        }
    }

    image
        .write_data(&data)
        .map_err(|e| format!("cannot write image data: {}", e))?;

    Ok(())
}
