use crate::{config::*, image::*, image_formats::*, image_prep::*, log_utils::*, repo::*};

/*****************************************************************************/

/* Results of the external processing task */

/// Photometric zero point determined by the external task.
pub struct Calib {
    pub flux_mag0: f64,
    pub flux_mag0_err: f64,
}

/// One measured source.
pub struct SourceRecord {
    pub id: i64,
    pub x: f64,
    pub y: f64,
    pub flux: f64,
}

pub struct ProcessResult {
    pub exposure: Exposure,
    pub calib: Option<Calib>,
    pub sources: Vec<SourceRecord>,
}

/*****************************************************************************/

/* Source id generation */

/// Generates source ids of the form `(exposure_id << reserved_bits) | n`
/// with n starting at 1.
pub struct IdFactory {
    exposure_id: i64,
    reserved_bits: u32,
    counter: i64,
}

impl IdFactory {
    pub fn make_source(exposure_id: i64, reserved_bits: u32) -> IdFactory {
        IdFactory {
            exposure_id,
            reserved_bits,
            counter: 0,
        }
    }

    pub fn next_id(&mut self) -> i64 {
        self.counter += 1;
        (self.exposure_id << self.reserved_bits) | self.counter
    }
}

/// Id factory for one data reference. The repo reserves a fixed number
/// of high bits for the exposure id; sources get the remaining low bits.
pub fn make_id_factory(data_ref: &DataRef) -> IdFactory {
    IdFactory::make_source(
        data_ref.exposure_id(),
        64 - data_ref.exposure_id_bits()
    )
}

/*****************************************************************************/

/* The external image processing task */

pub trait ProcessImage {
    fn process(
        &self,
        data_ref:   &DataRef,
        exposure:   Exposure,
        id_factory: &mut IdFactory
    ) -> anyhow::Result<ProcessResult>;
}

/// Stand-in processor. Hands the prepared exposure back untouched,
/// with no calibration and no sources.
pub struct PassThroughProcessor;

impl ProcessImage for PassThroughProcessor {
    fn process(
        &self,
        _data_ref:   &DataRef,
        exposure:    Exposure,
        _id_factory: &mut IdFactory
    ) -> anyhow::Result<ProcessResult> {
        Ok(ProcessResult {
            exposure,
            calib: None,
            sources: Vec::new(),
        })
    }
}

/*****************************************************************************/

/* Per-file orchestration */

pub struct ProcessFileTask<'a> {
    config: &'a FrozenConfig,
}

impl<'a> ProcessFileTask<'a> {
    pub fn new(config: &'a FrozenConfig) -> ProcessFileTask<'a> {
        ProcessFileTask { config }
    }

    /// Loads one exposure, prepares its planes and hands it to `processor`.
    pub fn run(
        &self,
        data_ref:  &DataRef,
        processor: &dyn ProcessImage
    ) -> anyhow::Result<ProcessResult> {
        log::info!("processing {}", data_ref.data_id);
        let total_log = TimeLogger::start();

        let load_log = TimeLogger::start();
        let mut exposure = self.fetch_exposure(data_ref)?;
        load_log.log("loading exposure");

        exposure.reset_mask(MaskBits::RETAINED);

        if exposure.wcs.is_none() {
            log::warn!("{} carries no usable WCS", data_ref.data_id);
        }

        if let Some(filter) = exposure.filter.take() {
            let canonical = canonical_filter(&filter).to_string();
            if canonical != filter {
                log::info!("filter {} canonicalized to {}", filter, canonical);
            }
            exposure.filter = Some(canonical);
        }

        if self.config.do_variance {
            synthesize_variance(&mut exposure, self.config);
        }

        if self.config.do_mask {
            synthesize_mask(&mut exposure, self.config);
        }

        let mut id_factory = make_id_factory(data_ref);
        let process_log = TimeLogger::start();
        let result = processor.process(data_ref, exposure, &mut id_factory)?;
        process_log.log("processing image");

        total_log.log("file total");
        Ok(result)
    }

    /// Loads the exposure behind a data reference. A file that is valid
    /// FITS but not a structured exposure is retried as a bare image when
    /// the fallback is enabled; any other failure aborts the run.
    fn fetch_exposure(&self, data_ref: &DataRef) -> anyhow::Result<Exposure> {
        let path = prefer_parent_copy(&data_ref.path);
        log::info!("loading {}", path.display());
        match load_exposure(&path) {
            Ok(exposure) =>
                Ok(exposure),
            Err(e @ LoadError::Format { .. }) if self.config.do_fallback => {
                log::info!("{}; reading as a bare image", e);
                load_fallback_exposure(&path)
            }
            Err(e) =>
                Err(e.into()),
        }
    }
}
