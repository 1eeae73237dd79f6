//! Scale interpolation over an instance's lifetime.

use blaster_media_model::BlastConfig;

/// Scale of an instance that is `age` frames old.
///
/// Linear from `start_scale` at age 0 to `end_scale` at `animation_duration`,
/// then held at `end_scale`.
pub fn scale_factor(age: u64, config: &BlastConfig) -> f64 {
    let duration = config.animation_duration;
    let age = age as f64;
    if duration > 0.0 && age < duration {
        let t = age / duration;
        config.start_scale + (config.end_scale - config.start_scale) * t
    } else {
        config.end_scale
    }
}
