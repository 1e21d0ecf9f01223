//! Test data generators for synthetic Landsat digital-number rasters.
//!
//! These generators create predictable, verifiable test data patterns
//! that can be used across the test suite.

use std::fs::File;
use std::path::Path;

use tiff::encoder::{colortype, TiffEncoder};
use tiff::tags::Tag;

/// The 2x2 digital-number grid used for hand-checked reflectance values.
pub const HAND_CHECK_DN: [[u8; 2]; 2] = [[0, 100], [200, 255]];

/// Creates a DN grid whose values sweep 0..=255 in row-major order.
///
/// Cell value is `(row * width + col) % 256`, so every 8-bit value appears
/// once per 256 cells.
///
/// # Example
///
/// ```
/// use test_utils::create_dn_grid;
///
/// let grid = create_dn_grid(16, 20);
/// assert_eq!(grid.len(), 320);
/// assert_eq!(grid[0], 0);
/// assert_eq!(grid[255], 255);
/// assert_eq!(grid[256], 0);
/// ```
pub fn create_dn_grid(width: usize, height: usize) -> Vec<u8> {
    (0..width * height).map(|i| (i % 256) as u8).collect()
}

/// Creates a DN grid alternating between the sensor's minimum and maximum.
pub fn create_extreme_dn_grid(width: usize, height: usize) -> Vec<u8> {
    (0..width * height)
        .map(|i| if i % 2 == 0 { u8::MIN } else { u8::MAX })
        .collect()
}

/// Creates a 16-bit DN grid with values spread over the full u16 range.
pub fn create_dn_grid_u16(width: usize, height: usize) -> Vec<u16> {
    let n = (width * height).max(1);
    (0..width * height)
        .map(|i| ((i as u64 * u16::MAX as u64) / (n as u64 - 1).max(1)) as u16)
        .collect()
}

/// Write an 8-bit single-band TIFF.
pub fn write_gray8_tiff(path: &Path, width: u32, height: u32, data: &[u8]) {
    let file = File::create(path).expect("Failed to create TIFF file");
    let mut encoder = TiffEncoder::new(file).expect("Failed to create TIFF encoder");
    encoder
        .write_image::<colortype::Gray8>(width, height, data)
        .expect("Failed to write TIFF image");
}

/// Write a 16-bit single-band TIFF.
pub fn write_gray16_tiff(path: &Path, width: u32, height: u32, data: &[u16]) {
    let file = File::create(path).expect("Failed to create TIFF file");
    let mut encoder = TiffEncoder::new(file).expect("Failed to create TIFF encoder");
    encoder
        .write_image::<colortype::Gray16>(width, height, data)
        .expect("Failed to write TIFF image");
}

/// Write an 8-bit three-sample TIFF. `data` is interleaved RGB.
pub fn write_rgb8_tiff(path: &Path, width: u32, height: u32, data: &[u8]) {
    let file = File::create(path).expect("Failed to create TIFF file");
    let mut encoder = TiffEncoder::new(file).expect("Failed to create TIFF encoder");
    encoder
        .write_image::<colortype::RGB8>(width, height, data)
        .expect("Failed to write TIFF image");
}

/// Write an 8-bit single-band GeoTIFF with a 30 m UTM-style georeference.
///
/// Tags written: ModelPixelScale, ModelTiepoint and a GeoKey directory that
/// names EPSG:32617 (WGS 84 / UTM zone 17N, which covers Toronto).
pub fn write_georeferenced_gray8_tiff(path: &Path, width: u32, height: u32, data: &[u8]) {
    let file = File::create(path).expect("Failed to create TIFF file");
    let mut encoder = TiffEncoder::new(file).expect("Failed to create TIFF encoder");
    let mut image = encoder
        .new_image::<colortype::Gray8>(width, height)
        .expect("Failed to create TIFF image");

    let scale = [30.0f64, 30.0, 0.0];
    let tiepoint = [0.0f64, 0.0, 0.0, 609000.0, 4838000.0, 0.0];
    image
        .encoder()
        .write_tag(Tag::Unknown(33550), &scale[..])
        .expect("Failed to write pixel scale tag");
    image
        .encoder()
        .write_tag(Tag::Unknown(33922), &tiepoint[..])
        .expect("Failed to write tiepoint tag");
    image
        .encoder()
        .write_tag(Tag::Unknown(34735), &SAMPLE_GEO_KEYS[..])
        .expect("Failed to write geokey tag");

    image.write_data(data).expect("Failed to write TIFF data");
}

/// GeoKey directory for a projected EPSG:32617 raster, with one key that
/// points into GeoAsciiParams (GTCitationGeoKey).
pub const SAMPLE_GEO_KEYS: [u16; 16] = [
    1, 1, 0, 3, // version 1.1.0, 3 keys
    1024, 0, 1, 1, // GTModelTypeGeoKey = ModelTypeProjected
    1026, 34737, 12, 0, // GTCitationGeoKey -> GeoAsciiParams
    3072, 0, 1, 32617, // ProjectedCSTypeGeoKey = EPSG:32617
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dn_grid_wraps() {
        let grid = create_dn_grid(300, 1);
        assert_eq!(grid[255], 255);
        assert_eq!(grid[256], 0);
        assert_eq!(grid[299], 43);
    }

    #[test]
    fn test_extreme_grid_only_holds_min_and_max() {
        let grid = create_extreme_dn_grid(5, 5);
        assert!(grid.iter().all(|&v| v == 0 || v == 255));
        assert_eq!(grid[0], 0);
        assert_eq!(grid[1], 255);
    }

    #[test]
    fn test_u16_grid_spans_range() {
        let grid = create_dn_grid_u16(10, 10);
        assert_eq!(grid[0], 0);
        assert_eq!(grid[99], u16::MAX);
    }

    #[test]
    fn test_write_gray8_tiff_creates_file() {
        let dir = crate::temp_test_dir();
        let path = dir.path().join("band.tif");
        write_gray8_tiff(&path, 4, 3, &create_dn_grid(4, 3));
        assert!(path.metadata().unwrap().len() > 12);
    }
}
