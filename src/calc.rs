#[derive(Debug)]
pub struct ClipValue {
    pub value: f64,
    pub used: bool, // for internal use
}

impl ClipValue {
    pub fn new(value: f64) -> ClipValue {
        ClipValue { value, used: true }
    }
}

pub struct ClipStats {
    pub mean: f64,
    pub variance: f64,
    pub discarded: u64,
}

fn mean_and_std_dev(values: &[ClipValue]) -> Option<(f64, f64)> {
    let mut sum = 0_f64;
    let mut cnt = 0_usize;
    for v in values.iter() {
        if !v.used { continue; }
        sum += v.value;
        cnt += 1;
    }
    if cnt == 0 { return None; }
    let mean = sum / cnt as f64;
    let dev = values.iter()
        .filter(|v| v.used)
        .fold(0_f64, |acc, v| acc + (v.value - mean) * (v.value - mean));
    Some((mean, f64::sqrt(dev / cnt as f64)))
}

/// Iterative kappa-sigma rejection over `values`. Values outside
/// mean±kappa·sigma are discarded and the statistics recomputed, up to
/// `repeats` times or until nothing changes.
pub fn kappa_sigma_clip(
    values:  &mut [ClipValue],
    kappa:   f64,
    repeats: u32,
) -> Option<ClipStats> {
    if values.is_empty() { return None; }

    for v in values.iter_mut() { v.used = true; }

    if values.len() > 1 {
        for _ in 0..repeats {
            let (mean, std_dev) = mean_and_std_dev(values)?;
            let min = mean - kappa * std_dev;
            let max = mean + kappa * std_dev;
            let mut changed = false;
            for v in values.iter_mut() {
                if !v.used { continue; }
                if v.value < min || v.value > max {
                    v.used = false;
                    changed = true;
                }
            }
            if !changed { break; }
        }
    }

    let (mean, std_dev) = mean_and_std_dev(values)?;
    let discarded = values.iter().filter(|v| !v.used).count() as u64;
    Some(ClipStats { mean, variance: std_dev * std_dev, discarded })
}
