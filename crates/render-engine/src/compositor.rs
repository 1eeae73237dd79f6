//! Frame compositor: draws the active instances onto a surface.
//!
//! The same function renders the live preview and the recording buffer, so
//! both always show identical content for a given simulation state.

use blaster_animation_core::{scale_factor, SimulationState};
use blaster_media_model::{BackgroundColor, BlastConfig, MediaRegistry};

use crate::surface::Surface;

/// Counts from one render pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub drawn: usize,
    /// Instances whose media was unregistered, undecoded, or zero-sized.
    pub skipped: usize,
}

/// Clear to `background`, then draw every active instance in admission order.
///
/// Each instance is drawn centred on its position at `native size * scale`,
/// where the scale comes from the instance's age and the current blast
/// configuration. GIF frames are picked from the global timeline.
pub fn render_frame<S: Surface + ?Sized>(
    surface: &mut S,
    state: &SimulationState,
    registry: &MediaRegistry,
    blast: &BlastConfig,
    background: BackgroundColor,
) -> RenderStats {
    surface.clear(background.rgba());

    let frame = state.frame();
    let timeline_secs = state.timeline_secs();
    let mut stats = RenderStats::default();

    for instance in state.active() {
        let Some(item) = registry.get(instance.media) else {
            stats.skipped += 1;
            continue;
        };
        let (native_w, native_h) = item.dimensions();
        if native_w == 0 || native_h == 0 {
            stats.skipped += 1;
            continue;
        }
        let Some(picture) = item.frame_at(timeline_secs) else {
            stats.skipped += 1;
            continue;
        };

        let scale = scale_factor(instance.age(frame), blast);
        surface.draw_image(
            picture,
            instance.position,
            f64::from(native_w) * scale,
            f64::from(native_h) * scale,
        );
        stats.drawn += 1;
    }

    stats
}
