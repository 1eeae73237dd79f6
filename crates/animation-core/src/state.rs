//! Simulation state: the frame counter and the active instances.

use blaster_common::clock::FrameClock;
use blaster_media_model::{MediaId, MediaKind, Point2D};

/// One on-screen occurrence of a media item.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveInstance {
    /// The registered item this instance shows.
    pub media: MediaId,

    /// Kind of the item at spawn time.
    pub kind: MediaKind,

    /// Frame on which the instance was admitted.
    pub spawn_frame: u64,

    /// Current centre in canvas pixels.
    pub position: Point2D,

    /// `end_scale` captured at spawn.
    pub scale_at_end: f64,
}

impl ActiveInstance {
    /// Frames elapsed since admission.
    pub fn age(&self, frame: u64) -> u64 {
        frame.saturating_sub(self.spawn_frame)
    }
}

/// Everything that evolves with the frame counter.
///
/// `restart` returns it to a clean timeline so that an export started after
/// any amount of preview activity renders the same frames.
#[derive(Debug, Clone)]
pub struct SimulationState {
    clock: FrameClock,
    pub(crate) last_spawn_frame: Option<u64>,
    pub(crate) next_index: usize,
    pub(crate) active: Vec<ActiveInstance>,
}

impl SimulationState {
    pub fn new(fps: u32) -> Self {
        Self {
            clock: FrameClock::new(fps),
            last_spawn_frame: None,
            next_index: 0,
            active: Vec::new(),
        }
    }

    /// Reset frame counter, active set, and round-robin index.
    pub fn restart(&mut self) {
        self.clock.reset();
        self.last_spawn_frame = None;
        self.next_index = 0;
        self.active.clear();
    }

    /// Advance the global frame counter by exactly one tick.
    pub fn advance(&mut self) -> u64 {
        self.clock.advance()
    }

    pub fn frame(&self) -> u64 {
        self.clock.frame()
    }

    pub fn fps(&self) -> u32 {
        self.clock.fps()
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    /// Current position on the global timeline in seconds.
    pub fn timeline_secs(&self) -> f64 {
        self.clock.timeline_secs()
    }

    pub fn last_spawn_frame(&self) -> Option<u64> {
        self.last_spawn_frame
    }

    /// Index into the registry of the next item to admit.
    pub fn next_index(&self) -> usize {
        self.next_index
    }

    pub fn active(&self) -> &[ActiveInstance] {
        &self.active
    }

    pub fn active_mut(&mut self) -> &mut [ActiveInstance] {
        &mut self.active
    }

    /// Drop every instance showing `media`. Returns how many were dropped.
    pub fn prune_media(&mut self, media: MediaId) -> usize {
        let before = self.active.len();
        self.active.retain(|instance| instance.media != media);
        before - self.active.len()
    }
}

impl Default for SimulationState {
    fn default() -> Self {
        Self::new(30)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance(media: u64, spawn_frame: u64) -> ActiveInstance {
        ActiveInstance {
            media: MediaId(media),
            kind: MediaKind::Image,
            spawn_frame,
            position: Point2D::default(),
            scale_at_end: 1.0,
        }
    }

    #[test]
    fn test_restart_clears_everything() {
        let mut state = SimulationState::new(30);
        for _ in 0..17 {
            state.advance();
        }
        state.last_spawn_frame = Some(15);
        state.next_index = 3;
        state.active.push(instance(1, 15));

        state.restart();

        assert_eq!(state.frame(), 0);
        assert_eq!(state.next_index(), 0);
        assert_eq!(state.last_spawn_frame(), None);
        assert!(state.active().is_empty());
    }

    #[test]
    fn test_prune_media() {
        let mut state = SimulationState::new(30);
        state.active.push(instance(1, 0));
        state.active.push(instance(2, 5));
        state.active.push(instance(1, 10));

        assert_eq!(state.prune_media(MediaId(1)), 2);
        assert_eq!(state.active().len(), 1);
        assert_eq!(state.active()[0].media, MediaId(2));
    }

    #[test]
    fn test_age_saturates() {
        let inst = instance(1, 10);
        assert_eq!(inst.age(25), 15);
        assert_eq!(inst.age(5), 0);
    }
}
