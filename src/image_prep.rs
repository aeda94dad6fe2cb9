use itertools::*;
use crate::{calc::*, config::*, image::*};

/*****************************************************************************/

/* Variance plane synthesis */

pub fn synthesize_variance(exposure: &mut Exposure, config: &ProcessFileConfig) {
    match config.variance_mode {
        VarianceMode::GainAndNoise =>
            variance_from_gain_and_noise(exposure, config),
        VarianceMode::SkyEstimate =>
            variance_from_sky_estimate(exposure, config),
    }
}

fn variance_from_gain_and_noise(exposure: &mut Exposure, config: &ProcessFileConfig) {
    log::info!(
        "synthesizing variance: mode=gainAndNoise, gain={}, noise={}",
        config.gain,
        config.noise
    );
    let gain = config.gain as f32;
    let noise2 = (config.noise * config.noise) as f32;
    if gain > 0.0 {
        for (v, im) in izip!(exposure.variance.iter_mut(), exposure.image.iter()) {
            *v = *im / gain;
        }
    }
    for v in exposure.variance.iter_mut() {
        *v += noise2;
    }
}

fn variance_from_sky_estimate(exposure: &mut Exposure, config: &ProcessFileConfig) {
    let noise2 = (config.noise * config.noise) as f32;
    let base = if !config.is_background_subtracted {
        noise2
    } else {
        let mut values: Vec<_> = exposure.image
            .iter()
            .map(|v| ClipValue::new(*v as f64))
            .collect();
        kappa_sigma_clip(&mut values, 3.0, 5)
            .map(|stats| stats.variance as f32)
            .unwrap_or(noise2)
    };
    log::info!(
        "synthesizing variance: mode=skyEstimate, base={}, gain={}",
        base,
        config.gain
    );
    exposure.variance.fill(base);
    let gain = config.gain as f32;
    if gain > 0.0 {
        for (v, im) in izip!(exposure.variance.iter_mut(), exposure.image.iter()) {
            *v += *im / gain;
        }
    }
}

/*****************************************************************************/

/* Mask plane synthesis */

pub struct MaskCounts {
    pub low: usize,
    pub saturated: usize,
}

/// Flags pixels below `low` as BAD and above `saturation` as SAT.
/// Bits already present in the mask are kept.
pub fn synthesize_mask(exposure: &mut Exposure, config: &ProcessFileConfig) -> MaskCounts {
    let low = config.low as f32;
    let saturation = config.saturation as f32;
    let mut counts = MaskCounts { low: 0, saturated: 0 };
    for (m, im) in izip!(exposure.mask.iter_mut(), exposure.image.iter()) {
        if *im < low {
            *m |= MaskBits::BAD.bits();
            counts.low += 1;
        }
        if *im > saturation {
            *m |= MaskBits::SAT.bits();
            counts.saturated += 1;
        }
    }
    log::info!(
        "flagged {} pixels below {} and {} pixels above {}",
        counts.low,
        config.low,
        counts.saturated,
        config.saturation
    );
    counts
}
