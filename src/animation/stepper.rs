//! Step-by-step track playback
//!
//! A [`StepTrackController`] reveals a path one point per timer tick and
//! reports progress to the host. It owns its four overlays and the single
//! timer task outright; the map reference is captured at construction so
//! destruction stays well-defined even if the owning service is torn down
//! independently.

use crate::core::geo::LngLat;
use crate::provider::{MapHandle, OverlayHandle};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Progress callback: `(index, position, fraction)` with
/// `fraction = index / (path length - 1)`.
pub type ProgressHandler = Box<dyn Fn(usize, LngLat, f64) + Send + Sync>;

/// Invoked once when the final point has been revealed.
pub type FinishHandler = Box<dyn Fn() + Send + Sync>;

/// Playback configuration.
pub struct StepTrackOptions {
    /// Delay between ticks. 500ms when not specified.
    pub interval: Duration,
    pub on_progress: Option<ProgressHandler>,
    pub on_finish: Option<FinishHandler>,
}

impl Default for StepTrackOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(500),
            on_progress: None,
            on_finish: None,
        }
    }
}

/// Playback lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepPhase {
    /// Constructed or stopped; no timer armed.
    Idle,
    /// Timer armed, advancing one path index per tick.
    Running,
    /// All points revealed, timer cleared.
    Finished,
    /// Overlays detached, terminal.
    Destroyed,
}

struct StepState {
    phase: StepPhase,
    index: usize,
    timer: Option<JoinHandle<()>>,
}

struct StepShared {
    map: Arc<dyn MapHandle>,
    polyline: Arc<dyn OverlayHandle>,
    start_marker: Arc<dyn OverlayHandle>,
    end_marker: Arc<dyn OverlayHandle>,
    current_marker: Arc<dyn OverlayHandle>,
    path: Vec<LngLat>,
    interval: Duration,
    on_progress: Option<ProgressHandler>,
    on_finish: Option<FinishHandler>,
    state: Mutex<StepState>,
}

enum Tick {
    Advanced { index: usize, position: LngLat },
    Finished { index: usize, position: LngLat },
    Halt,
}

/// Handle to one track playback. Clones share the same underlying state.
#[derive(Clone)]
pub struct StepTrackController {
    shared: Arc<StepShared>,
}

impl StepTrackController {
    /// `path` must contain at least two points; the caller (the map service)
    /// has already created the overlays and attached them to `map`.
    pub(crate) fn new(
        map: Arc<dyn MapHandle>,
        polyline: Arc<dyn OverlayHandle>,
        start_marker: Arc<dyn OverlayHandle>,
        end_marker: Arc<dyn OverlayHandle>,
        current_marker: Arc<dyn OverlayHandle>,
        path: Vec<LngLat>,
        options: StepTrackOptions,
    ) -> Self {
        Self {
            shared: Arc::new(StepShared {
                map,
                polyline,
                start_marker,
                end_marker,
                current_marker,
                path,
                interval: options.interval,
                on_progress: options.on_progress,
                on_finish: options.on_finish,
                state: Mutex::new(StepState {
                    phase: StepPhase::Idle,
                    index: 0,
                    timer: None,
                }),
            }),
        }
    }

    pub fn phase(&self) -> StepPhase {
        self.shared.state.lock().unwrap().phase
    }

    /// Index of the most recently revealed point.
    pub fn index(&self) -> usize {
        self.shared.state.lock().unwrap().index
    }

    /// Arms the timer. A no-op while already Running or after destruction;
    /// starting a Finished controller replays the animation from the first
    /// point.
    pub fn start(&self) {
        let mut state = self.shared.state.lock().unwrap();
        match state.phase {
            StepPhase::Running | StepPhase::Destroyed => return,
            StepPhase::Finished => {
                state.index = 0;
                self.shared.polyline.set_path(&self.shared.path[..1]);
                self.shared.current_marker.set_position(self.shared.path[0]);
                self.shared.current_marker.show();
                self.shared.end_marker.hide();
            }
            StepPhase::Idle => {}
        }
        state.phase = StepPhase::Running;
        let shared = self.shared.clone();
        state.timer = Some(tokio::spawn(async move {
            StepTrackController::run(shared).await;
        }));
    }

    /// Clears the pending timer, preserving visual progress. Playback resumes
    /// from the same index on the next `start`.
    pub fn stop(&self) {
        let timer = {
            let mut state = self.shared.state.lock().unwrap();
            if state.phase != StepPhase::Running {
                return;
            }
            state.phase = StepPhase::Idle;
            state.timer.take()
        };
        if let Some(timer) = timer {
            timer.abort();
        }
    }

    /// Stops the timer and detaches all four owned overlays. Terminal.
    pub fn destroy(&self) {
        let timer = {
            let mut state = self.shared.state.lock().unwrap();
            if state.phase == StepPhase::Destroyed {
                return;
            }
            state.phase = StepPhase::Destroyed;
            state.timer.take()
        };
        if let Some(timer) = timer {
            timer.abort();
        }

        self.shared.map.remove_overlay(&self.shared.polyline);
        self.shared.map.remove_overlay(&self.shared.start_marker);
        self.shared.map.remove_overlay(&self.shared.end_marker);
        self.shared.map.remove_overlay(&self.shared.current_marker);
    }

    async fn run(shared: Arc<StepShared>) {
        loop {
            tokio::time::sleep(shared.interval).await;
            match Self::tick(&shared) {
                Tick::Advanced { index, position } => {
                    Self::report_progress(&shared, index, position);
                    // A progress callback may have stopped or destroyed us
                    if shared.state.lock().unwrap().phase != StepPhase::Running {
                        return;
                    }
                }
                Tick::Finished { index, position } => {
                    Self::report_progress(&shared, index, position);
                    if let Some(on_finish) = &shared.on_finish {
                        on_finish();
                    }
                    return;
                }
                Tick::Halt => return,
            }
        }
    }

    /// Advances the revealed index by one. State is mutated under the lock;
    /// overlay updates and callbacks happen after it is released so reentrant
    /// `stop`/`destroy` calls cannot deadlock.
    fn tick(shared: &StepShared) -> Tick {
        let last = shared.path.len() - 1;
        let (index, finished) = {
            let mut state = shared.state.lock().unwrap();
            if state.phase != StepPhase::Running {
                return Tick::Halt;
            }
            state.index += 1;
            let index = state.index;
            let finished = index >= last;
            if finished {
                state.index = last;
                state.phase = StepPhase::Finished;
                state.timer = None;
            }
            (index.min(last), finished)
        };

        let position = shared.path[index];
        shared.polyline.set_path(&shared.path[..=index]);

        if finished {
            shared.end_marker.show();
            shared.current_marker.hide();
            Tick::Finished { index, position }
        } else {
            shared.current_marker.set_position(position);
            Tick::Advanced { index, position }
        }
    }

    fn report_progress(shared: &StepShared, index: usize, position: LngLat) {
        if let Some(on_progress) = &shared.on_progress {
            let fraction = index as f64 / (shared.path.len() - 1) as f64;
            on_progress(index, position, fraction);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{MapConfig, MarkerOptions, PolylineOptions};
    use crate::provider::headless::{HeadlessMap, HeadlessOverlay};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn build_controller(
        path: Vec<LngLat>,
        options: StepTrackOptions,
    ) -> (StepTrackController, Arc<dyn MapHandle>) {
        let map: Arc<dyn MapHandle> = HeadlessMap::new(&MapConfig::default(), Vec::new());
        let polyline: Arc<dyn OverlayHandle> = HeadlessOverlay::from_polyline(&PolylineOptions {
            path: path[..1].to_vec(),
            ..Default::default()
        });
        let start: Arc<dyn OverlayHandle> = HeadlessOverlay::from_marker(&MarkerOptions::at(path[0]));
        let end: Arc<dyn OverlayHandle> =
            HeadlessOverlay::from_marker(&MarkerOptions::at(*path.last().unwrap()));
        let current: Arc<dyn OverlayHandle> = HeadlessOverlay::from_marker(&MarkerOptions::at(path[0]));
        end.hide();
        for overlay in [&polyline, &start, &end, &current] {
            map.add_overlay(overlay.clone());
        }
        let controller = StepTrackController::new(
            map.clone(),
            polyline,
            start,
            end,
            current,
            path,
            options,
        );
        (controller, map)
    }

    #[tokio::test]
    async fn test_start_is_reentrant() {
        let (controller, _map) = build_controller(
            vec![LngLat::new(0.0, 0.0), LngLat::new(1.0, 1.0)],
            StepTrackOptions {
                interval: Duration::from_millis(50),
                ..Default::default()
            },
        );
        controller.start();
        controller.start();
        assert_eq!(controller.phase(), StepPhase::Running);
        controller.destroy();
    }

    #[tokio::test]
    async fn test_two_point_path_ticks_once() {
        let progress_calls = Arc::new(AtomicUsize::new(0));
        let finish_calls = Arc::new(AtomicUsize::new(0));
        let progress_clone = progress_calls.clone();
        let finish_clone = finish_calls.clone();

        let (controller, _map) = build_controller(
            vec![LngLat::new(0.0, 0.0), LngLat::new(1.0, 1.0)],
            StepTrackOptions {
                interval: Duration::from_millis(20),
                on_progress: Some(Box::new(move |index, _position, fraction| {
                    assert_eq!(index, 1);
                    assert_eq!(fraction, 1.0);
                    progress_clone.fetch_add(1, Ordering::SeqCst);
                })),
                on_finish: Some(Box::new(move || {
                    finish_clone.fetch_add(1, Ordering::SeqCst);
                })),
            },
        );

        controller.start();
        tokio::time::sleep(Duration::from_millis(80)).await;

        assert_eq!(progress_calls.load(Ordering::SeqCst), 1);
        assert_eq!(finish_calls.load(Ordering::SeqCst), 1);
        assert_eq!(controller.phase(), StepPhase::Finished);
    }

    #[tokio::test]
    async fn test_destroy_detaches_overlays() {
        let (controller, map) = build_controller(
            vec![LngLat::new(0.0, 0.0), LngLat::new(1.0, 1.0), LngLat::new(2.0, 2.0)],
            StepTrackOptions {
                interval: Duration::from_millis(30),
                ..Default::default()
            },
        );
        assert_eq!(map.overlays().len(), 4);

        controller.start();
        controller.destroy();
        assert_eq!(controller.phase(), StepPhase::Destroyed);
        assert!(map.overlays().is_empty());

        // Terminal: restarting does nothing
        controller.start();
        assert_eq!(controller.phase(), StepPhase::Destroyed);
    }
}
