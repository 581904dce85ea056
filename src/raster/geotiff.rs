//! GeoTIFF-backed [`RasterSource`] using the `tiff` crate.
//!
//! Georeferencing comes from `ModelPixelScale` + `ModelTiepoint` (or `ModelTransformation`),
//! the CRS from the `GeoKeyDirectory`, and `GDAL_NODATA` values are mapped to NaN.

use std::{
    fs::File,
    io::{BufReader, Read, Seek},
    path::{Path, PathBuf},
};

use ndarray::Array3;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::tags::Tag;
use tracing::{debug, warn};

use crate::raster::{Affine, Crs, RasterSource};
use crate::{Error, Result};

const GT_MODEL_TYPE_KEY: u16 = 1024;
const GEOGRAPHIC_TYPE_KEY: u16 = 2048;
const PROJECTED_CS_TYPE_KEY: u16 = 3072;
const MODEL_TYPE_PROJECTED: u16 = 1;
const MODEL_TYPE_GEOGRAPHIC: u16 = 2;

/// A GeoTIFF on disk. Metadata is read on open; pixels are decoded on [`RasterSource::read`].
#[derive(Debug, Clone)]
pub struct GeoTiffRaster {
    path: PathBuf,
    rows: usize,
    cols: usize,
    band_count: usize,
    transform: Option<Affine>,
    crs: Option<Crs>,
    nodata: Option<f64>,
}

impl GeoTiffRaster {
    /// Open a GeoTIFF and read its georeferencing tags.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut decoder = open_decoder(&path)?;

        let (width, height) = decoder.dimensions()?;
        let band_count = samples_per_pixel(&mut decoder)?;
        let transform = read_transform(&mut decoder);
        let crs = read_crs(&mut decoder);
        let nodata = read_nodata(&mut decoder);

        if transform.is_none() { warn!(path = %path.display(), "GeoTIFF has no model transform tags") }
        if crs.is_none() { warn!(path = %path.display(), "GeoTIFF has no recognised CRS keys") }
        debug!(path = %path.display(), width, height, band_count, ?crs, "opened GeoTIFF");

        Ok(Self {
            path,
            rows: height as usize,
            cols: width as usize,
            band_count,
            transform,
            crs,
            nodata,
        })
    }

    #[inline] pub fn path(&self) -> &Path { &self.path }

    #[inline] pub fn nodata(&self) -> Option<f64> { self.nodata }
}

impl RasterSource for GeoTiffRaster {
    #[inline] fn band_count(&self) -> usize { self.band_count }

    #[inline] fn shape(&self) -> (usize, usize) { (self.rows, self.cols) }

    fn read(&self) -> Result<Array3<f64>> {
        let mut decoder = open_decoder(&self.path)?;
        let samples: Vec<f64> = match decoder.read_image()? {
            DecodingResult::U8(v) => v.into_iter().map(f64::from).collect(),
            DecodingResult::U16(v) => v.into_iter().map(f64::from).collect(),
            DecodingResult::U32(v) => v.into_iter().map(f64::from).collect(),
            DecodingResult::I8(v) => v.into_iter().map(f64::from).collect(),
            DecodingResult::I16(v) => v.into_iter().map(f64::from).collect(),
            DecodingResult::I32(v) => v.into_iter().map(f64::from).collect(),
            DecodingResult::F32(v) => v.into_iter().map(f64::from).collect(),
            DecodingResult::F64(v) => v,
            DecodingResult::U64(v) => v.into_iter().map(|x| x as f64).collect(),
            DecodingResult::I64(v) => v.into_iter().map(|x| x as f64).collect(),
        };

        let pixels = self.rows * self.cols;
        if pixels == 0 || samples.len() != pixels * self.band_count {
            return Err(Error::Configuration(format!(
                "{}: decoded {} samples for {}x{}x{} raster",
                self.path.display(), samples.len(), self.band_count, self.rows, self.cols
            )));
        }

        // Samples are pixel-interleaved: (row, col, band).
        let nodata = self.nodata;
        let band_count = self.band_count;
        let cols = self.cols;
        Ok(Array3::from_shape_fn((band_count, self.rows, cols), |(b, r, c)| {
            let v = samples[(r * cols + c) * band_count + b];
            match nodata {
                Some(nd) if v == nd => f64::NAN,
                _ => v,
            }
        }))
    }

    #[inline] fn transform(&self) -> Option<Affine> { self.transform }

    #[inline] fn crs(&self) -> Option<Crs> { self.crs }
}

fn open_decoder(path: &Path) -> Result<Decoder<BufReader<File>>> {
    let file = File::open(path)?;
    Ok(Decoder::new(BufReader::new(file))?.with_limits(Limits::unlimited()))
}

fn samples_per_pixel<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<usize> {
    use tiff::ColorType;
    #[allow(unreachable_patterns)]
    Ok(match decoder.colortype()? {
        ColorType::Gray(_) | ColorType::Palette(_) => 1,
        ColorType::GrayA(_) => 2,
        ColorType::RGB(_) | ColorType::YCbCr(_) => 3,
        ColorType::RGBA(_) | ColorType::CMYK(_) => 4,
        other => return Err(Error::config(format!("unsupported TIFF colour type {other:?}"))),
    })
}

/// Affine transform from `ModelTransformation`, or `ModelPixelScale` + `ModelTiepoint`.
fn read_transform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<Affine> {
    if let Ok(m) = decoder.get_tag_f64_vec(Tag::ModelTransformationTag) {
        if m.len() >= 8 {
            return Some(Affine { a: m[0], b: m[1], c: m[3], d: m[4], e: m[5], f: m[7] });
        }
    }

    let scale = decoder.get_tag_f64_vec(Tag::ModelPixelScaleTag).ok()?;
    let tie = decoder.get_tag_f64_vec(Tag::ModelTiepointTag).ok()?;
    if scale.len() < 2 || tie.len() < 6 { return None }

    // Tiepoint maps raster (i, j) to model (x, y).
    let (i, j, x, y) = (tie[0], tie[1], tie[3], tie[4]);
    Some(Affine {
        a: scale[0],
        b: 0.0,
        c: x - i * scale[0],
        d: 0.0,
        e: -scale[1],
        f: y + j * scale[1],
    })
}

/// EPSG code from the GeoKey directory, classified by the model type key.
fn read_crs<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<Crs> {
    let keys = decoder.get_tag_u16_vec(Tag::GeoKeyDirectoryTag).ok()?;
    let geo_key = |id: u16| -> Option<u16> {
        keys.get(4..)?.chunks_exact(4)
            .find(|entry| entry[0] == id && entry[1] == 0)
            .map(|entry| entry[3])
    };

    match geo_key(GT_MODEL_TYPE_KEY) {
        Some(MODEL_TYPE_PROJECTED) => geo_key(PROJECTED_CS_TYPE_KEY).map(|c| Crs::Projected(c as u32)),
        Some(MODEL_TYPE_GEOGRAPHIC) => geo_key(GEOGRAPHIC_TYPE_KEY).map(|c| Crs::Geographic(c as u32)),
        _ => geo_key(PROJECTED_CS_TYPE_KEY)
            .or_else(|| geo_key(GEOGRAPHIC_TYPE_KEY))
            .map(|c| Crs::from_epsg(c as u32)),
    }
}

fn read_nodata<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<f64> {
    let value = decoder.find_tag(Tag::GdalNodata).ok()??;
    value.into_string().ok()?.trim_matches(char::from(0)).trim().parse().ok()
}
