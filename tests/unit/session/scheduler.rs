use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use super::*;
use crate::foundation::core::{PixelBuffer, Rgb};
use crate::render::evaluator::RenderJob;
use crate::render::spec::AntiAliasing;
use crate::session::display::MemoryDisplay;

type Log = Arc<Mutex<Vec<u32>>>;

struct FakeJob {
    buffer: PixelBuffer,
    elapsed: f64,
    fail: bool,
    log: Log,
}

impl RenderJob for FakeJob {
    fn execute(&mut self) -> SurferResult<f64> {
        self.log.lock().unwrap().push(self.buffer.width);
        if self.fail {
            return Err(SurferError::validation("evaluator blew up"));
        }
        self.buffer.data.fill(0xFF00_0000 | self.buffer.width);
        Ok(self.elapsed)
    }

    fn into_pixels(self: Box<Self>) -> PixelBuffer {
        self.buffer
    }
}

/// Records the side length of every executed pass.
struct FakeEvaluator {
    elapsed: f64,
    fail_at: Option<u32>,
    log: Log,
    formula: Option<String>,
}

impl FakeEvaluator {
    fn new(elapsed: f64) -> (Self, Log) {
        let log = Log::default();
        let ev = Self {
            elapsed,
            fail_at: None,
            log: log.clone(),
            formula: None,
        };
        (ev, log)
    }
}

impl SurfaceEvaluator for FakeEvaluator {
    fn configure(&mut self, scene: &SceneState) -> SurferResult<()> {
        let formula = scene.formula().unwrap_or_default();
        if formula.contains("??") {
            return Err(SurferError::formula("unexpected character '?'"));
        }
        self.formula = Some(formula.to_owned());
        Ok(())
    }

    fn snapshot(
        &mut self,
        _aa: AntiAliasing,
        buffer: PixelBuffer,
    ) -> SurferResult<Box<dyn RenderJob>> {
        Ok(Box::new(FakeJob {
            fail: self.fail_at == Some(buffer.width),
            buffer,
            elapsed: self.elapsed,
            log: self.log.clone(),
        }))
    }

    fn current_formula(&self) -> Option<&str> {
        self.formula.as_deref()
    }

    fn current_parameters(&self) -> BTreeMap<String, f64> {
        BTreeMap::new()
    }
}

fn scene() -> SceneState {
    let mut s = SceneState::new();
    s.set_formula("x^2+y^2+z^2-1");
    s.set_front_color(Some(Rgb::WHITE));
    s.set_back_color(Some(Rgb::WHITE));
    s.take_invalidations();
    s
}

fn executed(log: &Log) -> Vec<u32> {
    log.lock().unwrap().clone()
}

#[test]
fn chain_runs_every_tier_and_ends_idle() {
    let (ev, log) = FakeEvaluator::new(0.05);
    let mut sched = ProgressiveScheduler::new(Box::new(ev), SchedulerOpts::default()).unwrap();
    let mut scene = scene();
    let mut display = MemoryDisplay::new(200, 120);

    assert_eq!(sched.state(), SchedulerState::Idle);
    assert!(sched.trigger(&mut scene, &display).unwrap());
    assert_eq!(sched.state(), SchedulerState::Running(Tier::Low));
    assert_eq!(sched.generation(), 1);

    sched.run_until_idle(&mut scene, &mut display).unwrap();
    assert_eq!(sched.state(), SchedulerState::Idle);
    assert!(!sched.is_busy());

    // low = 100 is not below 200 / 2, so medium is a placeholder
    assert_eq!(executed(&log), vec![100, 200, 200]);
    let reports = sched.take_reports();
    let tiers: Vec<_> = reports.iter().map(|r| r.tier).collect();
    assert_eq!(tiers, Tier::ALL.to_vec());
    assert!(reports[1].noop);
    assert_eq!(reports[1].resolution, 0);
    assert!(reports.iter().filter(|r| !r.noop).all(|r| r.published));

    let frame = display.frame().unwrap();
    assert_eq!(frame.width, 200);
    assert_eq!(frame.data[0], 0xFF00_0000 | 200);
    assert_eq!(sched.publisher().last_generation(), Some(1));
    assert_eq!(sched.evaluator().current_formula(), Some("x^2+y^2+z^2-1"));
}

#[test]
fn low_pass_measurement_sizes_the_next_chain() {
    let (ev, log) = FakeEvaluator::new(0.05);
    let opts = SchedulerOpts {
        initial_seconds_per_pixel: 1e-9,
        ..SchedulerOpts::default()
    };
    let mut sched = ProgressiveScheduler::new(Box::new(ev), opts).unwrap();
    let mut scene = scene();
    let mut display = MemoryDisplay::new(200, 200);

    sched.trigger(&mut scene, &display).unwrap();
    sched.run_until_idle(&mut scene, &mut display).unwrap();
    assert_eq!(executed(&log)[0], 200);
    assert!((sched.seconds_per_pixel() - 1.25e-6).abs() < 1e-12);

    display.set_layout_bounds(Some(crate::foundation::core::Rect::new(0.0, 0.0, 800.0, 800.0)));
    sched.trigger(&mut scene, &display).unwrap();
    sched.run_until_idle(&mut scene, &mut display).unwrap();
    assert_eq!(executed(&log)[3..], [163, 481, 800, 800]);
}

#[test]
fn detached_invalid_or_suppressed_scene_does_not_start_a_chain() {
    let (ev, log) = FakeEvaluator::new(0.01);
    let mut sched = ProgressiveScheduler::new(Box::new(ev), SchedulerOpts::default()).unwrap();

    let mut ready = scene();
    assert!(!sched.trigger(&mut ready, &MemoryDisplay::detached()).unwrap());
    assert!(!sched.trigger(&mut ready, &MemoryDisplay::new(0, 0)).unwrap());

    let mut empty = SceneState::new();
    assert!(!sched.trigger(&mut empty, &MemoryDisplay::new(100, 100)).unwrap());

    ready.begin_bulk_update();
    assert!(!sched.trigger(&mut ready, &MemoryDisplay::new(100, 100)).unwrap());
    ready.end_bulk_update();

    assert_eq!(sched.generation(), 0);
    assert!(executed(&log).is_empty());
}

#[test]
fn formula_error_marks_scene_invalid_without_starting() {
    let (ev, log) = FakeEvaluator::new(0.01);
    let mut sched = ProgressiveScheduler::new(Box::new(ev), SchedulerOpts::default()).unwrap();
    let mut scene = scene();
    scene.set_formula("x^2 ?? 1");
    let mut display = MemoryDisplay::new(100, 100);

    assert!(!sched.trigger(&mut scene, &display).unwrap());
    assert!(!scene.is_valid());
    assert!(scene.error_message().contains("unexpected character"));
    sched.run_until_idle(&mut scene, &mut display).unwrap();
    assert!(executed(&log).is_empty());
    assert_eq!(display.blit_count(), 0);
}

#[test]
fn failed_pass_abandons_chain_and_keeps_scene_valid() {
    let (mut ev, log) = FakeEvaluator::new(0.01);
    ev.fail_at = Some(200);
    let mut sched = ProgressiveScheduler::new(Box::new(ev), SchedulerOpts::default()).unwrap();
    let mut scene = scene();
    let mut display = MemoryDisplay::new(200, 200);

    sched.trigger(&mut scene, &display).unwrap();
    sched.run_until_idle(&mut scene, &mut display).unwrap();

    assert_eq!(executed(&log), vec![100, 200]);
    assert!(scene.is_valid());
    assert!(scene.error_message().contains("evaluator blew up"));
    assert_eq!(display.frame().unwrap().width, 100);
    assert_eq!(sched.state(), SchedulerState::Idle);
}

#[test]
fn newer_trigger_replaces_the_pending_chain() {
    let (ev, log) = FakeEvaluator::new(0.01);
    let mut sched = ProgressiveScheduler::new(Box::new(ev), SchedulerOpts::default()).unwrap();
    let mut scene = scene();
    let mut display = MemoryDisplay::new(200, 200);

    sched.trigger(&mut scene, &display).unwrap();
    sched.trigger(&mut scene, &display).unwrap();
    sched.run_until_idle(&mut scene, &mut display).unwrap();

    assert_eq!(sched.generation(), 2);
    assert_eq!(executed(&log), vec![100, 200, 200]);
    assert!(sched.take_reports().iter().all(|r| r.generation == 2));
}

#[test]
fn consecutive_chains_publish_in_generation_order() {
    let (ev, _log) = FakeEvaluator::new(0.01);
    let mut sched = ProgressiveScheduler::new(Box::new(ev), SchedulerOpts::default()).unwrap();
    let mut scene = scene();
    let mut display = MemoryDisplay::new(200, 200);

    sched.trigger(&mut scene, &display).unwrap();
    sched.run_until_idle(&mut scene, &mut display).unwrap();
    assert_eq!(sched.publisher().last_generation(), Some(1));
    sched.take_reports();

    sched.trigger(&mut scene, &display).unwrap();
    sched.run_until_idle(&mut scene, &mut display).unwrap();
    assert_eq!(sched.publisher().last_generation(), Some(2));
    let reports = sched.take_reports();
    assert!(reports.iter().all(|r| r.generation == 2));
    assert!(reports.iter().filter(|r| !r.noop).all(|r| r.published));
}

#[test]
fn cancel_stops_the_chain() {
    let (ev, log) = FakeEvaluator::new(0.01);
    let mut sched = ProgressiveScheduler::new(Box::new(ev), SchedulerOpts::default()).unwrap();
    let mut scene = scene();
    let mut display = MemoryDisplay::new(200, 200);

    sched.trigger(&mut scene, &display).unwrap();
    sched.cancel();
    assert_eq!(sched.state(), SchedulerState::Cancelled);
    sched.run_until_idle(&mut scene, &mut display).unwrap();

    // the low pass was cancelled before its snapshot could be taken
    assert!(executed(&log).is_empty());
    assert_eq!(display.blit_count(), 0);
    assert_eq!(sched.state(), SchedulerState::Cancelled);
}

#[test]
fn drain_shutdown_finishes_the_chain() {
    let (ev, log) = FakeEvaluator::new(0.01);
    let mut sched = ProgressiveScheduler::new(Box::new(ev), SchedulerOpts::default()).unwrap();
    let mut scene = scene();
    let mut display = MemoryDisplay::new(200, 200);

    sched.trigger(&mut scene, &display).unwrap();
    sched
        .shutdown(ShutdownMode::Drain, &mut scene, &mut display)
        .unwrap();
    assert_eq!(executed(&log), vec![100, 200, 200]);
    assert_eq!(display.frame().unwrap().width, 200);

    let err = sched.trigger(&mut scene, &display).unwrap_err();
    assert!(matches!(err, SurferError::Worker(_)));
}

#[test]
fn cancel_shutdown_publishes_nothing_further() {
    let (ev, _log) = FakeEvaluator::new(0.01);
    let mut sched = ProgressiveScheduler::new(Box::new(ev), SchedulerOpts::default()).unwrap();
    let mut scene = scene();
    let mut display = MemoryDisplay::new(200, 200);

    sched.trigger(&mut scene, &display).unwrap();
    sched
        .shutdown(ShutdownMode::Cancel, &mut scene, &mut display)
        .unwrap();
    assert_eq!(display.blit_count(), 0);
    assert!(!sched.is_busy());
    // a second shutdown is a no-op
    sched
        .shutdown(ShutdownMode::Cancel, &mut scene, &mut display)
        .unwrap();
}

#[test]
fn invalid_opts_are_rejected() {
    let (ev, _log) = FakeEvaluator::new(0.01);
    let opts = SchedulerOpts {
        target_fps: 0.0,
        ..SchedulerOpts::default()
    };
    assert!(ProgressiveScheduler::new(Box::new(ev), opts).is_err());
}
