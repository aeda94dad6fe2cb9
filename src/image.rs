use bitflags::bitflags;

/*****************************************************************************/

/* Image plane */

pub trait PlaneDefValue {
    const DEF_VALUE: Self;
}

impl PlaneDefValue for f32 {
    const DEF_VALUE: Self = 0.0;
}

impl PlaneDefValue for u16 {
    const DEF_VALUE: Self = 0;
}

/// Rectangular pixel plane stored in row-major order.
#[derive(Clone)]
pub struct Plane<T: Copy + PlaneDefValue> {
    data: Vec<T>,
    width: usize,
    height: usize,
}

impl<T: Copy + PlaneDefValue> Plane<T> {
    pub fn new(width: usize, height: usize) -> Plane<T> {
        Plane {
            data: vec![T::DEF_VALUE; width * height],
            width,
            height,
        }
    }

    pub fn from_vec(width: usize, height: usize, data: Vec<T>) -> Plane<T> {
        assert!(data.len() == width * height);
        Plane { data, width, height }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn fill(&mut self, value: T) {
        for v in self.data.iter_mut() {
            *v = value;
        }
    }

    #[inline(always)]
    pub fn get(&self, x: usize, y: usize) -> Option<T> {
        if x < self.width && y < self.height {
            Some(self.data[y * self.width + x])
        } else {
            None
        }
    }

    #[inline(always)]
    pub fn set(&mut self, x: usize, y: usize, value: T) {
        if x >= self.width || y >= self.height {
            panic!("Internal error: x={}, y={}", x, y);
        }
        self.data[y * self.width + x] = value;
    }

    pub fn iter(&self) -> std::slice::Iter<T> {
        self.data.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<T> {
        self.data.iter_mut()
    }
}

/*****************************************************************************/

/* Mask plane */

bitflags! {
    /// Per-pixel status bits of the mask plane.
    pub struct MaskBits: u16 {
        const BAD      = 0b0000_0001;
        const SAT      = 0b0000_0010;
        const INTRP    = 0b0000_0100;
        const CR       = 0b0000_1000;
        const EDGE     = 0b0001_0000;
        const DETECTED = 0b0010_0000;

        /// Bits that survive a mask reset.
        const RETAINED =
            Self::BAD.bits |
            Self::SAT.bits |
            Self::INTRP.bits |
            Self::EDGE.bits;
    }
}

/*****************************************************************************/

/* World coordinate system */

/// Linear sky solution taken from FITS headers (CRPIXn, CRVALn, CDn_m).
#[derive(Clone, Debug)]
pub struct Wcs {
    pub crpix: (f64, f64),
    pub crval: (f64, f64),
    pub cd: [[f64; 2]; 2],
    pub ctype: (String, String),
}

impl Wcs {
    /// Pixel coordinates to sky coordinates (degrees), linear part only.
    pub fn pixel_to_sky(&self, x: f64, y: f64) -> (f64, f64) {
        let dx = x - self.crpix.0;
        let dy = y - self.crpix.1;
        (
            self.crval.0 + self.cd[0][0] * dx + self.cd[0][1] * dy,
            self.crval.1 + self.cd[1][0] * dx + self.cd[1][1] * dy,
        )
    }
}

/*****************************************************************************/

/* Exposure */

/// Intensity, mask and variance planes of equal shape plus optional
/// sky solution and filter name.
pub struct Exposure {
    pub image: Plane<f32>,
    pub mask: Plane<u16>,
    pub variance: Plane<f32>,
    pub wcs: Option<Wcs>,
    pub filter: Option<String>,
}

impl Exposure {
    pub fn new(width: usize, height: usize) -> Exposure {
        Exposure {
            image: Plane::new(width, height),
            mask: Plane::new(width, height),
            variance: Plane::new(width, height),
            wcs: None,
            filter: None,
        }
    }

    /// Wraps a bare intensity plane. Mask and variance start zeroed.
    pub fn from_image(image: Plane<f32>) -> Exposure {
        let width = image.width();
        let height = image.height();
        Exposure {
            image,
            mask: Plane::new(width, height),
            variance: Plane::new(width, height),
            wcs: None,
            filter: None,
        }
    }

    pub fn width(&self) -> usize {
        self.image.width()
    }

    pub fn height(&self) -> usize {
        self.image.height()
    }

    /// Clears every mask bit not present in `keep`.
    pub fn reset_mask(&mut self, keep: MaskBits) {
        for m in self.mask.iter_mut() {
            *m &= keep.bits();
        }
    }
}
