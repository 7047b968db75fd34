//! Timing behavior of step-by-step track playback: the progress/finish law,
//! stop/resume without skipped or repeated points, and destruction.

use mapshim::prelude::*;
use mapshim::provider::amap::Amap;
use mapshim::StepPhase;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

fn test_options() -> ServiceOptions {
    ServiceOptions {
        key: "test-key".to_string(),
        ..Default::default()
    }
}

async fn ready_service() -> AmapService {
    let mut service = ProviderService::new(Amap, test_options());
    service
        .init_map("map-container", MapConfig::default())
        .await
        .expect("init_map");
    service
}

fn path_of(n: usize) -> Vec<LngLat> {
    (0..n).map(|i| LngLat::new(i as f64, i as f64)).collect()
}

#[tokio::test]
async fn test_full_playback_progress_law() {
    let mut service = ready_service().await;

    let fractions = Arc::new(Mutex::new(Vec::new()));
    let finishes = Arc::new(AtomicUsize::new(0));
    let fractions_clone = fractions.clone();
    let finishes_clone = finishes.clone();

    let path = path_of(4);
    let controller = service
        .create_track_step_by_step(
            &path,
            StepTrackOptions {
                interval: Duration::from_millis(25),
                on_progress: Some(Box::new(move |index, position, fraction| {
                    assert_eq!(position, LngLat::new(index as f64, index as f64));
                    fractions_clone.lock().unwrap().push(fraction);
                })),
                on_finish: Some(Box::new(move || {
                    finishes_clone.fetch_add(1, Ordering::SeqCst);
                })),
            },
        )
        .unwrap();

    assert_eq!(controller.phase(), StepPhase::Idle);
    controller.start();
    tokio::time::sleep(Duration::from_millis(200)).await;

    // A path of length n yields exactly n-1 progress reports, strictly
    // increasing and culminating at 1.0, then a single finish.
    let fractions = fractions.lock().unwrap().clone();
    assert_eq!(fractions.len(), 3);
    assert!(fractions.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(*fractions.last().unwrap(), 1.0);
    assert_eq!(finishes.load(Ordering::SeqCst), 1);
    assert_eq!(controller.phase(), StepPhase::Finished);

    // Visual end state: full polyline, end marker shown, cursor dot hidden
    let step_track = &service.registry().step_tracks()[0];
    assert_eq!(step_track.polyline.path().len(), 4);
    assert!(step_track.end_marker.is_visible());
    assert!(!step_track.current_marker.is_visible());
}

#[tokio::test]
async fn test_stop_and_resume_without_skip_or_repeat() {
    let mut service = ready_service().await;

    let indices = Arc::new(Mutex::new(Vec::new()));
    let indices_clone = indices.clone();

    let controller = service
        .create_track_step_by_step(
            &path_of(5),
            StepTrackOptions {
                interval: Duration::from_millis(40),
                on_progress: Some(Box::new(move |index, _position, _fraction| {
                    indices_clone.lock().unwrap().push(index);
                })),
                ..Default::default()
            },
        )
        .unwrap();

    controller.start();
    tokio::time::sleep(Duration::from_millis(100)).await;
    controller.stop();
    assert_eq!(controller.phase(), StepPhase::Idle);

    let paused_at = indices.lock().unwrap().len();
    assert!(paused_at > 0 && paused_at < 4, "paused mid-run");

    // Stopped means stopped: no ticks arrive while Idle
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(indices.lock().unwrap().len(), paused_at);

    controller.start();
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(controller.phase(), StepPhase::Finished);

    // Every index from 1 to n-1 exactly once, in order
    assert_eq!(*indices.lock().unwrap(), vec![1, 2, 3, 4]);
}

#[tokio::test]
async fn test_stop_from_progress_callback() {
    let mut service = ready_service().await;

    let controller_slot: Arc<Mutex<Option<StepTrackController>>> = Arc::new(Mutex::new(None));
    let slot_clone = controller_slot.clone();
    let calls = Arc::new(AtomicUsize::new(0));
    let calls_clone = calls.clone();

    let controller = service
        .create_track_step_by_step(
            &path_of(6),
            StepTrackOptions {
                interval: Duration::from_millis(20),
                on_progress: Some(Box::new(move |_index, _position, _fraction| {
                    calls_clone.fetch_add(1, Ordering::SeqCst);
                    // Reentrant cancellation from inside the tick
                    if let Some(controller) = slot_clone.lock().unwrap().as_ref() {
                        controller.stop();
                    }
                })),
                ..Default::default()
            },
        )
        .unwrap();
    *controller_slot.lock().unwrap() = Some(controller.clone());

    controller.start();
    tokio::time::sleep(Duration::from_millis(120)).await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(controller.phase(), StepPhase::Idle);
    assert_eq!(controller.index(), 1);
}

#[tokio::test]
async fn test_clear_step_tracks_destroys_running_controllers() {
    let mut service = ready_service().await;
    let map = service.map().unwrap();

    let first = service
        .create_track_step_by_step(
            &path_of(3),
            StepTrackOptions {
                interval: Duration::from_millis(30),
                ..Default::default()
            },
        )
        .unwrap();
    let second = service
        .create_track_step_by_step(
            &path_of(3),
            StepTrackOptions {
                interval: Duration::from_millis(30),
                ..Default::default()
            },
        )
        .unwrap();
    first.start();

    assert_eq!(map.overlays().len(), 8);
    service.clear_step_tracks();

    assert_eq!(first.phase(), StepPhase::Destroyed);
    assert_eq!(second.phase(), StepPhase::Destroyed);
    assert!(map.overlays().is_empty());
    assert!(service.registry().step_tracks().is_empty());
}

#[tokio::test]
async fn test_finished_controller_replays_from_start() {
    let mut service = ready_service().await;

    let controller = service
        .create_track_step_by_step(
            &path_of(2),
            StepTrackOptions {
                interval: Duration::from_millis(20),
                ..Default::default()
            },
        )
        .unwrap();

    controller.start();
    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(controller.phase(), StepPhase::Finished);

    controller.start();
    assert_eq!(controller.phase(), StepPhase::Running);
    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(controller.phase(), StepPhase::Finished);
}
