use std::path::*;
use fitrs::*;
use thiserror::Error;
use crate::image::*;

pub const FIT_EXTS: &[&str] = &["fit", "fits", "fts"];

/// Header tag marking a structured exposure file.
pub const PLANES_KEY: &str = "PLANES";
pub const PLANES_VALUE: &str = "IMAGE,MASK,VARIANCE";

pub fn is_fits_ext(ext: &str) -> bool {
    FIT_EXTS.iter().any(|e| ext.eq_ignore_ascii_case(e))
}

/// Removes one trailing FITS extension. Names without one pass unchanged.
pub fn strip_fits_extension(name: &str) -> &str {
    if let Some((stem, ext)) = name.rsplit_once('.') {
        if !stem.is_empty() && is_fits_ext(ext) {
            return stem;
        }
    }
    name
}

/*****************************************************************************/

/* Load errors */

#[derive(Error, Debug)]
pub enum LoadError {
    /// File opened as FITS but does not carry a structured exposure.
    /// The only error a caller may recover from.
    #[error("{}: not a structured exposure file: {reason}", .path.display())]
    Format { path: PathBuf, reason: String },

    #[error("{}: {message}", .path.display())]
    Io { path: PathBuf, message: String },
}

impl LoadError {
    fn format(path: &Path, reason: &str) -> LoadError {
        LoadError::Format {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    fn io(path: &Path, error: std::io::Error) -> LoadError {
        LoadError::Io {
            path: path.to_path_buf(),
            message: error.to_string(),
        }
    }
}

/*****************************************************************************/

/* FITS header helpers */

fn get_f64_fits_value(h: &Hdu, key: &str) -> Option<f64> {
    h.value(key)
        .and_then(|v| {
            match v {
                HeaderValue::IntegerNumber(v) => Some(*v as f64),
                HeaderValue::RealFloatingNumber(v) => Some(*v),
                _ => None,
            }
        })
}

fn get_str_fits_value<'a>(h: &'a Hdu, key: &str) -> Option<&'a str> {
    h.value(key)
        .and_then(|v| {
            match v {
                HeaderValue::CharacterString(v) => Some(v.as_str()),
                _ => None,
            }
        })
}

fn wcs_from_hdu(h: &Hdu) -> Option<Wcs> {
    let crpix1 = get_f64_fits_value(h, "CRPIX1")?;
    let crpix2 = get_f64_fits_value(h, "CRPIX2")?;
    let crval1 = get_f64_fits_value(h, "CRVAL1")?;
    let crval2 = get_f64_fits_value(h, "CRVAL2")?;

    let cd = if let (Some(cd1_1), Some(cd2_2)) = (
        get_f64_fits_value(h, "CD1_1"),
        get_f64_fits_value(h, "CD2_2"),
    ) {
        [
            [cd1_1, get_f64_fits_value(h, "CD1_2").unwrap_or(0.0)],
            [get_f64_fits_value(h, "CD2_1").unwrap_or(0.0), cd2_2],
        ]
    } else if let (Some(cdelt1), Some(cdelt2)) = (
        get_f64_fits_value(h, "CDELT1"),
        get_f64_fits_value(h, "CDELT2"),
    ) {
        [[cdelt1, 0.0], [0.0, cdelt2]]
    } else {
        return None;
    };

    let ctype1 = get_str_fits_value(h, "CTYPE1").unwrap_or("RA---TAN");
    let ctype2 = get_str_fits_value(h, "CTYPE2").unwrap_or("DEC--TAN");

    Some(Wcs {
        crpix: (crpix1, crpix2),
        crval: (crval1, crval2),
        cd,
        ctype: (ctype1.to_string(), ctype2.to_string()),
    })
}

// fitrs can not format an exact 0.0 real header value; integer zero
// reads back the same
fn real_header_value(value: f64) -> HeaderValue {
    if value == 0.0 {
        HeaderValue::IntegerNumber(0)
    } else {
        HeaderValue::RealFloatingNumber(value)
    }
}

fn insert_wcs(hdu: &mut Hdu, wcs: &Wcs) {
    hdu.insert("CRPIX1", real_header_value(wcs.crpix.0));
    hdu.insert("CRPIX2", real_header_value(wcs.crpix.1));
    hdu.insert("CRVAL1", real_header_value(wcs.crval.0));
    hdu.insert("CRVAL2", real_header_value(wcs.crval.1));
    hdu.insert("CD1_1", real_header_value(wcs.cd[0][0]));
    hdu.insert("CD1_2", real_header_value(wcs.cd[0][1]));
    hdu.insert("CD2_1", real_header_value(wcs.cd[1][0]));
    hdu.insert("CD2_2", real_header_value(wcs.cd[1][1]));
    hdu.insert("CTYPE1", HeaderValue::CharacterString(wcs.ctype.0.clone()));
    hdu.insert("CTYPE2", HeaderValue::CharacterString(wcs.ctype.1.clone()));
}

/*****************************************************************************/

/* Structured exposure files */

// One FITS HDU with an f32 cube of shape [width, height, 3]. The pages
// are image, mask and variance, in that order, tagged by the PLANES key.

pub fn load_exposure(file_name: &Path) -> Result<Exposure, LoadError> {
    let fits = Fits::open(file_name)
        .map_err(|e| LoadError::io(file_name, e))?;

    for h in fits.iter() {
        match get_str_fits_value(&h, PLANES_KEY) {
            Some(v) if v.trim() == PLANES_VALUE => (),
            _ => continue,
        }

        let data = h.read_data();
        let cube = match data {
            FitsData::FloatingPoint32(d)
            if d.shape.len() == 3 && d.shape[2] == 3 => d,
            _ => return Err(LoadError::format(
                file_name,
                "tagged HDU is not a 3-plane f32 cube"
            )),
        };

        let width = cube.shape[0];
        let height = cube.shape[1];
        let page_size = width * height;
        if cube.data.len() != 3 * page_size {
            return Err(LoadError::format(file_name, "plane data is truncated"));
        }

        let image = Plane::from_vec(
            width,
            height,
            cube.data[..page_size].to_vec()
        );
        let mask = Plane::from_vec(
            width,
            height,
            cube.data[page_size..2*page_size]
                .iter()
                .map(|v| *v as u16)
                .collect()
        );
        let variance = Plane::from_vec(
            width,
            height,
            cube.data[2*page_size..].to_vec()
        );

        return Ok(Exposure {
            image,
            mask,
            variance,
            wcs: wcs_from_hdu(&h),
            filter: get_str_fits_value(&h, "FILTER").map(|v| v.trim().to_string()),
        });
    }

    Err(LoadError::format(file_name, "no HDU carries the PLANES tag"))
}

pub fn save_exposure(exposure: &Exposure, file_name: &Path) -> anyhow::Result<()> {
    assert!(!exposure.image.is_empty());

    let data: Vec<f32> = exposure.image
        .iter()
        .copied()
        .chain(exposure.mask.iter().map(|v| *v as f32))
        .chain(exposure.variance.iter().copied())
        .collect();

    let dims = [exposure.width(), exposure.height(), 3];
    let mut prim_hdu = Hdu::new(&dims, data);
    prim_hdu.insert(
        PLANES_KEY,
        HeaderValue::CharacterString(PLANES_VALUE.to_string())
    );
    if let Some(wcs) = &exposure.wcs {
        insert_wcs(&mut prim_hdu, wcs);
    }
    if let Some(filter) = &exposure.filter {
        prim_hdu.insert("FILTER", HeaderValue::CharacterString(filter.clone()));
    }

    Fits::create(file_name, prim_hdu)?;
    Ok(())
}

/*****************************************************************************/

/* Bare image files */

// Plain FITS with a single 2D intensity HDU. Pixel values are taken at
// face value, integer BLANK pixels become 0 and are flagged BAD.

pub fn load_fallback_exposure(file_name: &Path) -> anyhow::Result<Exposure> {
    let fits = Fits::open(file_name)?;

    let is_mono_shape = |shape: &Vec<usize>| -> bool {
        shape.len() == 2 ||
        (shape.len() == 3 && shape[2] == 1)
    };

    let mut exposure: Option<Exposure> = None;
    let mut primary_wcs: Option<Wcs> = None;
    let mut primary_filter: Option<String> = None;

    for (idx, h) in fits.iter().enumerate() {
        if idx == 0 {
            primary_wcs = wcs_from_hdu(&h);
            primary_filter = get_str_fits_value(&h, "FILTER")
                .map(|v| v.trim().to_string());
        }

        let data = h.read_data();
        match data {
            FitsData::FloatingPoint32(d) if is_mono_shape(&d.shape) =>
                exposure = read_bare_data(
                    d.shape[0],
                    d.shape[1],
                    &d.data,
                    |v| v
                ),

            FitsData::FloatingPoint64(d) if is_mono_shape(&d.shape) =>
                exposure = read_bare_data(
                    d.shape[0],
                    d.shape[1],
                    &d.data,
                    |v| v as f32
                ),

            FitsData::IntegersI32(d) if is_mono_shape(&d.shape) =>
                exposure = read_bare_data_int(
                    d.shape[0],
                    d.shape[1],
                    &d.data,
                    |v| v as f32
                ),

            FitsData::IntegersU32(d) if is_mono_shape(&d.shape) =>
                exposure = read_bare_data_int(
                    d.shape[0],
                    d.shape[1],
                    &d.data,
                    |v| v as f32
                ),

            _ => (),
        }

        if let Some(exposure) = &mut exposure {
            exposure.wcs = wcs_from_hdu(&h).or(primary_wcs.take());
            exposure.filter = get_str_fits_value(&h, "FILTER")
                .map(|v| v.trim().to_string())
                .or(primary_filter.take());
            break;
        }
    }

    match exposure {
        Some(exposure) => Ok(exposure),
        None => anyhow::bail!(
            "No image data found in `{}`",
            file_name.display()
        ),
    }
}

fn read_bare_data<T: Copy>(
    width:  usize,
    height: usize,
    data:   &[T],
    cvt:    fn (T) -> f32
) -> Option<Exposure> {
    if data.len() != width * height {
        return None;
    }
    let mut image = Plane::new(width, height);
    for (d, s) in image.iter_mut().zip(data) {
        *d = cvt(*s);
    }
    Some(Exposure::from_image(image))
}

fn read_bare_data_int<T: Copy>(
    width:  usize,
    height: usize,
    data:   &[Option<T>],
    cvt:    fn (T) -> f32
) -> Option<Exposure> {
    if data.len() != width * height {
        return None;
    }
    let mut image = Plane::new(width, height);
    let mut mask = Plane::new(width, height);
    for ((d, m), s) in image.iter_mut().zip(mask.iter_mut()).zip(data) {
        if let Some(s) = s {
            *d = cvt(*s);
        } else {
            *d = 0.0;
            *m = MaskBits::BAD.bits();
        }
    }
    let mut exposure = Exposure::from_image(image);
    exposure.mask = mask;
    Some(exposure)
}

pub fn save_bare_image(
    image:     &Plane<f32>,
    wcs:       Option<&Wcs>,
    file_name: &Path
) -> anyhow::Result<()> {
    assert!(!image.is_empty());

    let dims = [image.width(), image.height()];
    let data: Vec<f32> = image.iter().copied().collect();
    let mut prim_hdu = Hdu::new(&dims, data);
    if let Some(wcs) = wcs {
        insert_wcs(&mut prim_hdu, wcs);
    }

    Fits::create(file_name, prim_hdu)?;
    Ok(())
}
