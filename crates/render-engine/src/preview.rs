//! Real-time preview loop.

use tokio::time::MissedTickBehavior;

use crate::compositor::RenderStats;
use crate::session::BlasterSession;

/// Run the preview at the session's frame rate for up to `frames` ticks.
///
/// `on_frame` sees the session after each rendered frame. The loop ends
/// early if the session leaves `Idle`. Returns the number of frames drawn.
pub async fn run_preview<F>(session: &mut BlasterSession, frames: u64, mut on_frame: F) -> u64
where
    F: FnMut(&BlasterSession, RenderStats),
{
    let mut ticker = tokio::time::interval(session.simulation().clock().frame_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut rendered = 0;
    while rendered < frames {
        ticker.tick().await;
        let Some(stats) = session.preview_tick() else {
            tracing::debug!(rendered, "Preview suspended");
            break;
        };
        rendered += 1;
        on_frame(session, stats);
    }
    rendered
}
