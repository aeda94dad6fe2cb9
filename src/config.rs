use std::io::Write;
use serde::*;

/// How the variance plane is synthesized when `do_variance` is on.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Debug)]
#[serde(rename_all = "camelCase")]
pub enum VarianceMode {
    /// variance = image/gain + noise^2
    GainAndNoise,
    /// variance = sky estimate (noise^2 or clipped image variance) + image/gain
    SkyEstimate,
}

#[derive(Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ProcessFileConfig {
    pub do_calibrate: bool,
    pub do_detection: bool,
    pub do_measurement: bool,
    pub do_astrometry: bool,
    pub do_photo_cal: bool,
    pub do_variance: bool,
    pub do_mask: bool,
    pub do_fallback: bool,
    pub variance_mode: VarianceMode,
    pub gain: f64,
    pub noise: f64,
    pub is_background_subtracted: bool,
    pub saturation: f64,
    pub low: f64,
}

impl ProcessFileConfig {
    pub fn new() -> Self {
        Self {
            do_calibrate: false,
            do_detection: false,
            do_measurement: false,
            do_astrometry: true,
            do_photo_cal: true,
            do_variance: false,
            do_mask: false,
            do_fallback: true,
            variance_mode: VarianceMode::GainAndNoise,
            gain: 0.0,
            noise: 10.0,
            is_background_subtracted: false,
            saturation: 60000.0,
            low: 0.0,
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.gain.is_finite() {
            anyhow::bail!("gain must be finite, got {}", self.gain);
        }
        if !self.noise.is_finite() {
            anyhow::bail!("noise must be finite, got {}", self.noise);
        }
        if !self.saturation.is_finite() || !self.low.is_finite() {
            anyhow::bail!(
                "low and saturation must be finite, got low={}, saturation={}",
                self.low,
                self.saturation
            );
        }
        if self.gain < 0.0 {
            anyhow::bail!("gain must not be negative, got {}", self.gain);
        }
        if self.noise < 0.0 {
            anyhow::bail!("noise must not be negative, got {}", self.noise);
        }
        if self.low >= self.saturation {
            anyhow::bail!(
                "low must be less than saturation, got low={}, saturation={}",
                self.low,
                self.saturation
            );
        }
        Ok(())
    }

    /// Validates and seals the config. Nothing can change it afterwards.
    pub fn freeze(self) -> anyhow::Result<FrozenConfig> {
        self.validate()?;
        Ok(FrozenConfig(self))
    }

    pub fn save_to_stream<W: Write>(&self, stream: &mut W) -> anyhow::Result<()> {
        let json_str = serde_json::to_string_pretty(self)?;
        writeln!(stream, "{}", json_str)?;
        Ok(())
    }

    /// Camera-specific defaults applied before command-line overrides.
    /// Without reference astrometry data the astrometry step can not run,
    /// and photometric calibration depends on it.
    pub fn apply_camera_overrides(&mut self) {
        if !astrometry_data_available(std::env::var_os("ASTROMETRY_NET_DATA_DIR").as_deref()) {
            log::warn!("no astrometry data available, disabling doAstrometry and doPhotoCal");
            self.do_astrometry = false;
            self.do_photo_cal = false;
        }
    }
}

pub fn astrometry_data_available(data_dir: Option<&std::ffi::OsStr>) -> bool {
    match data_dir {
        None => false,
        Some(dir) => {
            let base = std::path::Path::new(dir)
                .file_name()
                .map(|v| v.to_string_lossy().into_owned())
                .unwrap_or_default();
            !base.is_empty() && base != "None"
        }
    }
}

/// Validated, read-only view of `ProcessFileConfig`.
pub struct FrozenConfig(ProcessFileConfig);

impl std::ops::Deref for FrozenConfig {
    type Target = ProcessFileConfig;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
