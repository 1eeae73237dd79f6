mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use blaster_animation_core::ActiveInstance;
use blaster_media_model::{MediaHandle, MediaId, MediaKind, MediaRegistry, Point2D};
use blaster_render_engine::{sync_video_sources, SeekStats};

use common::{still, FakeVideo};

const TIMEOUT: Duration = Duration::from_millis(100);

fn instance(media: MediaId, kind: MediaKind) -> ActiveInstance {
    ActiveInstance {
        media,
        kind,
        spawn_frame: 0,
        position: Point2D::new(540.0, 540.0),
        scale_at_end: 0.4,
    }
}

#[tokio::test(start_paused = true)]
async fn each_distinct_video_is_seeked_once() {
    let mut registry = MediaRegistry::new();
    let (video_a, seeks_a) = FakeVideo::new(2.0);
    let (video_b, seeks_b) = FakeVideo::new(2.0);
    let a = registry.add(MediaKind::Video, "a.mp4", MediaHandle::Video(Box::new(video_a)));
    let b = registry.add(MediaKind::Video, "b.mp4", MediaHandle::Video(Box::new(video_b)));
    let img = registry.add(MediaKind::Image, "c.png", still(4, 4, [1, 1, 1, 255]));

    let active = vec![
        instance(a, MediaKind::Video),
        instance(a, MediaKind::Video),
        instance(b, MediaKind::Video),
        instance(a, MediaKind::Video),
        instance(img, MediaKind::Image),
        instance(b, MediaKind::Video),
    ];

    let stats = sync_video_sources(&mut registry, &active, 0.5, TIMEOUT).await;
    assert_eq!(stats.issued, 2);
    assert_eq!(stats.timed_out, 0);
    assert_eq!(seeks_a.load(Ordering::SeqCst), 1);
    assert_eq!(seeks_b.load(Ordering::SeqCst), 1);

    for video in [a, b] {
        let current = registry.get(video).unwrap().video().unwrap().current_time();
        assert!((current - 0.5).abs() < 1e-12);
    }
}

#[tokio::test(start_paused = true)]
async fn positions_within_tolerance_are_not_reseeked() {
    let mut registry = MediaRegistry::new();
    let (video, seeks) = FakeVideo::new(2.0);
    let id = registry.add(MediaKind::Video, "a.mp4", MediaHandle::Video(Box::new(video)));
    let active = vec![instance(id, MediaKind::Video)];

    sync_video_sources(&mut registry, &active, 0.5, TIMEOUT).await;
    // Same spot, looped past the end, and a sub-millisecond offset.
    for timeline in [0.5, 2.5, 0.5005] {
        let stats = sync_video_sources(&mut registry, &active, timeline, TIMEOUT).await;
        assert_eq!(stats.issued, 0, "timeline {timeline}");
    }
    assert_eq!(seeks.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn zero_duration_video_stays_at_start() {
    let mut registry = MediaRegistry::new();
    let (video, seeks) = FakeVideo::new(0.0);
    let id = registry.add(MediaKind::Video, "still.mp4", MediaHandle::Video(Box::new(video)));

    let stats =
        sync_video_sources(&mut registry, &[instance(id, MediaKind::Video)], 5.0, TIMEOUT).await;
    assert_eq!(stats.issued, 0);
    assert_eq!(seeks.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn slow_seeks_time_out_against_one_deadline() {
    let mut registry = MediaRegistry::new();
    let (slow_a, _) = FakeVideo::hanging(2.0);
    let (slow_b, _) = FakeVideo::hanging(2.0);
    let (fast, _) = FakeVideo::new(2.0);
    let a = registry.add(MediaKind::Video, "a.mp4", MediaHandle::Video(Box::new(slow_a)));
    let b = registry.add(MediaKind::Video, "b.mp4", MediaHandle::Video(Box::new(slow_b)));
    let c = registry.add(MediaKind::Video, "c.mp4", MediaHandle::Video(Box::new(fast)));
    let active = vec![
        instance(a, MediaKind::Video),
        instance(b, MediaKind::Video),
        instance(c, MediaKind::Video),
    ];

    let start = tokio::time::Instant::now();
    let stats = sync_video_sources(&mut registry, &active, 1.0, TIMEOUT).await;
    let waited = start.elapsed();

    assert_eq!(
        stats,
        SeekStats {
            issued: 3,
            timed_out: 2,
            abandoned: 0,
        }
    );
    assert!(waited >= TIMEOUT);
    assert!(waited < TIMEOUT * 2, "waited {waited:?}");
}

#[tokio::test(start_paused = true)]
async fn unregistered_media_is_ignored() {
    let mut registry = MediaRegistry::new();
    let (video, _) = FakeVideo::new(2.0);
    let id = registry.add(MediaKind::Video, "a.mp4", MediaHandle::Video(Box::new(video)));
    registry.remove(id);

    let stats =
        sync_video_sources(&mut registry, &[instance(id, MediaKind::Video)], 1.0, TIMEOUT).await;
    assert_eq!(stats, SeekStats::default());
}
