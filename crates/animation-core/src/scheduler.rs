//! Frame-indexed admission and retirement of active instances.
//!
//! Each tick the scheduler first admits at most one new instance (round-robin
//! over the registry) and then retires every instance whose age reached the
//! configured lifetime. Spawn positions are drawn from a seeded RNG so that
//! two runs from a restart with the same inputs place every instance
//! identically.

use blaster_media_model::{BlastConfig, MediaId, MediaRegistry, Point2D};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::state::{ActiveInstance, SimulationState};

/// What happened during one scheduler tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Item admitted this tick, if any.
    pub admitted: Option<MediaId>,

    /// Items whose instances retired this tick, one entry per instance.
    pub retired: Vec<MediaId>,
}

/// Round-robin spawn scheduler.
#[derive(Debug, Clone)]
pub struct SpawnScheduler {
    seed: u64,
    rng: StdRng,
}

impl SpawnScheduler {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Restart the random sequence from the configured seed.
    pub fn reseed(&mut self) {
        self.rng = StdRng::seed_from_u64(self.seed);
    }

    /// Run admission then retirement for the state's current frame.
    pub fn step(
        &mut self,
        state: &mut SimulationState,
        registry: &mut MediaRegistry,
        config: &BlastConfig,
        center: Point2D,
    ) -> TickReport {
        let admitted = self.admit(state, registry, config, center);
        let retired = retire(state, registry, config);
        TickReport { admitted, retired }
    }

    fn admit(
        &mut self,
        state: &mut SimulationState,
        registry: &MediaRegistry,
        config: &BlastConfig,
        center: Point2D,
    ) -> Option<MediaId> {
        let frame = state.frame();
        let due = match state.last_spawn_frame {
            None => true,
            Some(last) => frame.saturating_sub(last) as f64 >= config.spawn_interval,
        };
        if !due || registry.is_empty() {
            return None;
        }

        let index = state.next_index % registry.len();
        let item = registry.at(index)?;
        let position = Point2D::new(
            center.x + self.offset(config.spread_radius),
            center.y + self.offset(config.spread_radius),
        );

        state.active.push(ActiveInstance {
            media: item.id,
            kind: item.kind,
            spawn_frame: frame,
            position,
            scale_at_end: config.end_scale,
        });
        state.last_spawn_frame = Some(frame);
        state.next_index = (index + 1) % registry.len();

        tracing::trace!(frame, media = %item.id, x = position.x, y = position.y, "Instance admitted");
        Some(item.id)
    }

    fn offset(&mut self, spread: f64) -> f64 {
        if spread > 0.0 {
            self.rng.gen_range(-spread..=spread)
        } else {
            0.0
        }
    }
}

impl Default for SpawnScheduler {
    fn default() -> Self {
        Self::new(0)
    }
}

fn retire(
    state: &mut SimulationState,
    registry: &mut MediaRegistry,
    config: &BlastConfig,
) -> Vec<MediaId> {
    let frame = state.frame();
    let mut retired = Vec::new();
    state.active.retain(|instance| {
        if instance.age(frame) as f64 >= config.lifetime {
            retired.push(instance.media);
            false
        } else {
            true
        }
    });

    for id in &retired {
        if let Some(video) = registry.get_mut(*id).and_then(|item| item.video_mut()) {
            video.pause();
        }
        tracing::trace!(frame, media = %id, "Instance retired");
    }
    retired
}

#[cfg(test)]
mod tests {
    use super::*;
    use blaster_media_model::{MediaHandle, MediaKind, SeekCompletion, VideoSource};
    use image::RgbaImage;

    /// Playback state only; frames are irrelevant to scheduling.
    struct StubVideo {
        time: f64,
        paused: bool,
    }

    impl VideoSource for StubVideo {
        fn width(&self) -> u32 {
            16
        }

        fn height(&self) -> u32 {
            9
        }

        fn duration_secs(&self) -> f64 {
            2.0
        }

        fn current_time(&self) -> f64 {
            self.time
        }

        fn seek(&mut self, secs: f64) -> SeekCompletion {
            self.time = secs;
            SeekCompletion::ready()
        }

        fn poll(&mut self) {}

        fn current_frame(&self) -> Option<&RgbaImage> {
            None
        }

        fn play(&mut self) {
            self.paused = false;
        }

        fn pause(&mut self) {
            self.paused = true;
        }

        fn is_paused(&self) -> bool {
            self.paused
        }

        fn release(&mut self) {
            self.paused = true;
        }
    }

    fn registry_with(names: &[&str]) -> (MediaRegistry, Vec<MediaId>) {
        let mut registry = MediaRegistry::new();
        let ids = names
            .iter()
            .map(|name| {
                registry.add(
                    MediaKind::Image,
                    *name,
                    MediaHandle::Still(RgbaImage::new(10, 10)),
                )
            })
            .collect();
        (registry, ids)
    }

    fn config(interval: f64, lifetime: f64) -> BlastConfig {
        BlastConfig {
            spawn_interval: interval,
            lifetime,
            ..BlastConfig::default()
        }
    }

    /// Run ticks for frames `0..=last`, collecting reports keyed by frame.
    fn run(
        scheduler: &mut SpawnScheduler,
        state: &mut SimulationState,
        registry: &mut MediaRegistry,
        config: &BlastConfig,
        last: u64,
    ) -> Vec<(u64, TickReport)> {
        let mut reports = Vec::new();
        loop {
            let report = scheduler.step(state, registry, config, Point2D::new(540.0, 540.0));
            reports.push((state.frame(), report));
            if state.frame() == last {
                break;
            }
            state.advance();
        }
        reports
    }

    #[test]
    fn test_round_robin_admission_and_retirement() {
        let (mut registry, ids) = registry_with(&["a", "b"]);
        let (a, b) = (ids[0], ids[1]);
        let mut scheduler = SpawnScheduler::new(1);
        let mut state = SimulationState::new(30);

        let reports = run(&mut scheduler, &mut state, &mut registry, &config(5.0, 20.0), 20);

        let admissions: Vec<(u64, MediaId)> = reports
            .iter()
            .filter_map(|(frame, r)| r.admitted.map(|id| (*frame, id)))
            .collect();
        assert_eq!(&admissions[..3], &[(0, a), (5, b), (10, a)]);

        let first_retirement = reports
            .iter()
            .find(|(_, r)| !r.retired.is_empty())
            .unwrap();
        assert_eq!(first_retirement.0, 20);
        assert_eq!(first_retirement.1.retired, vec![a]);
    }

    #[test]
    fn test_instance_lives_exactly_lifetime_frames() {
        let (mut registry, _) = registry_with(&["a"]);
        let mut scheduler = SpawnScheduler::new(0);
        let mut state = SimulationState::new(30);
        let cfg = config(1_000.0, 3.0);

        run(&mut scheduler, &mut state, &mut registry, &cfg, 2);
        assert_eq!(state.active().len(), 1);

        state.advance();
        scheduler.step(&mut state, &mut registry, &cfg, Point2D::default());
        assert!(state.active().is_empty());
    }

    #[test]
    fn test_empty_registry_admits_nothing() {
        let mut registry = MediaRegistry::new();
        let mut scheduler = SpawnScheduler::new(0);
        let mut state = SimulationState::new(30);

        let reports = run(&mut scheduler, &mut state, &mut registry, &config(1.0, 10.0), 10);
        assert!(reports.iter().all(|(_, r)| r.admitted.is_none()));
        assert!(state.active().is_empty());
        assert_eq!(state.last_spawn_frame(), None);
    }

    #[test]
    fn test_registry_emptied_while_active() {
        let (mut registry, ids) = registry_with(&["a"]);
        let mut scheduler = SpawnScheduler::new(0);
        let mut state = SimulationState::new(30);
        let cfg = config(2.0, 6.0);

        run(&mut scheduler, &mut state, &mut registry, &cfg, 3);
        assert_eq!(state.active().len(), 2);

        registry.remove(ids[0]);
        for _ in 0..3 {
            state.advance();
            let report = scheduler.step(&mut state, &mut registry, &cfg, Point2D::default());
            assert!(report.admitted.is_none());
        }
        // Spawned at 0 and 2; at frame 6 only the first has aged out.
        assert_eq!(state.active().len(), 1);
    }

    #[test]
    fn test_index_wraps_after_removal() {
        let (mut registry, ids) = registry_with(&["a", "b", "c"]);
        let mut scheduler = SpawnScheduler::new(0);
        let mut state = SimulationState::new(30);
        let cfg = config(1.0, 100.0);

        run(&mut scheduler, &mut state, &mut registry, &cfg, 1);
        assert_eq!(state.next_index(), 2);

        registry.remove(ids[2]);
        state.advance();
        let report = scheduler.step(&mut state, &mut registry, &cfg, Point2D::default());
        assert_eq!(report.admitted, Some(ids[0]));
    }

    #[test]
    fn test_spread_is_bounded_and_seeded() {
        let (mut registry, _) = registry_with(&["a"]);
        let cfg = BlastConfig {
            spawn_interval: 1.0,
            spread_radius: 50.0,
            ..BlastConfig::default()
        };
        let center = Point2D::new(540.0, 960.0);

        let positions = |seed: u64, registry: &mut MediaRegistry| {
            let mut scheduler = SpawnScheduler::new(seed);
            let mut state = SimulationState::new(30);
            for _ in 0..20 {
                scheduler.step(&mut state, registry, &cfg, center);
                state.advance();
            }
            state
                .active()
                .iter()
                .map(|i| i.position)
                .collect::<Vec<_>>()
        };

        let first = positions(7, &mut registry);
        let second = positions(7, &mut registry);
        assert_eq!(first, second);
        for p in &first {
            assert!((p.x - center.x).abs() <= 50.0);
            assert!((p.y - center.y).abs() <= 50.0);
        }
    }

    #[test]
    fn test_reseed_replays_positions() {
        let (mut registry, _) = registry_with(&["a"]);
        let cfg = BlastConfig {
            spawn_interval: 1.0,
            spread_radius: 100.0,
            ..BlastConfig::default()
        };
        let mut scheduler = SpawnScheduler::new(42);
        let mut state = SimulationState::new(30);

        scheduler.step(&mut state, &mut registry, &cfg, Point2D::default());
        let first = state.active()[0].position;

        state.restart();
        scheduler.reseed();
        scheduler.step(&mut state, &mut registry, &cfg, Point2D::default());
        assert_eq!(state.active()[0].position, first);
    }

    #[test]
    fn test_scale_at_end_captured_at_spawn() {
        let (mut registry, _) = registry_with(&["a"]);
        let mut scheduler = SpawnScheduler::new(0);
        let mut state = SimulationState::new(30);
        let mut cfg = config(1.0, 100.0);
        cfg.end_scale = 0.9;

        scheduler.step(&mut state, &mut registry, &cfg, Point2D::default());
        cfg.end_scale = 0.1;
        state.advance();
        scheduler.step(&mut state, &mut registry, &cfg, Point2D::default());

        assert_eq!(state.active()[0].scale_at_end, 0.9);
        assert_eq!(state.active()[1].scale_at_end, 0.1);
    }

    #[test]
    fn test_retiring_video_instance_pauses_video() {
        let mut registry = MediaRegistry::new();
        let video = registry.add(
            MediaKind::Video,
            "clip.mp4",
            MediaHandle::Video(Box::new(StubVideo {
                time: 0.0,
                paused: true,
            })),
        );
        let mut scheduler = SpawnScheduler::new(0);
        let mut state = SimulationState::new(30);
        let cfg = config(1_000.0, 4.0);

        scheduler.step(&mut state, &mut registry, &cfg, Point2D::default());
        assert_eq!(state.active().len(), 1);
        registry
            .get_mut(video)
            .and_then(|item| item.video_mut())
            .unwrap()
            .play();

        for _ in 0..3 {
            state.advance();
            scheduler.step(&mut state, &mut registry, &cfg, Point2D::default());
            let playing = registry.get(video).unwrap().video().unwrap();
            assert!(!playing.is_paused(), "paused early at frame {}", state.frame());
        }

        state.advance();
        let report = scheduler.step(&mut state, &mut registry, &cfg, Point2D::default());
        assert_eq!(report.retired, vec![video]);
        assert!(state.active().is_empty());
        assert!(registry.get(video).unwrap().video().unwrap().is_paused());
    }
}
