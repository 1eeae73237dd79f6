//! Per-frame position updates.

use blaster_media_model::{MotionConfig, Point2D};

use crate::state::ActiveInstance;

/// Move every instance by one frame of the enabled motions.
///
/// Directional drift is applied first, then radial movement along the unit
/// vector from `center` to the (already drifted) position. An instance
/// sitting exactly on the centre has no radial direction and is left alone.
pub fn apply_motion(instances: &mut [ActiveInstance], motion: &MotionConfig, center: Point2D) {
    if !motion.any() || motion.speed == 0.0 {
        return;
    }
    for instance in instances {
        step(&mut instance.position, motion, center);
    }
}

fn step(position: &mut Point2D, motion: &MotionConfig, center: Point2D) {
    let speed = motion.speed;
    if motion.up {
        position.y -= speed;
    }
    if motion.down {
        position.y += speed;
    }
    if motion.left {
        position.x -= speed;
    }
    if motion.right {
        position.x += speed;
    }

    if motion.inward || motion.outward {
        let distance = position.distance_to(&center);
        if distance > 0.0 {
            let ux = (position.x - center.x) / distance;
            let uy = (position.y - center.y) / distance;
            if motion.inward {
                position.x -= ux * speed;
                position.y -= uy * speed;
            }
            if motion.outward {
                position.x += ux * speed;
                position.y += uy * speed;
            }
        }
    }
}
