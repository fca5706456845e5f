use std::collections::BTreeMap;

use super::*;
use crate::render::spec::{AntiAliasing, AntiAliasingMode, AntiAliasingPattern, Tier};

#[derive(Clone, Copy)]
enum Behaviour {
    Fill(u32),
    Fail,
    Panic,
    Shrink,
}

struct StubJob {
    buffer: PixelBuffer,
    behaviour: Behaviour,
}

impl RenderJob for StubJob {
    fn execute(&mut self) -> SurferResult<f64> {
        match self.behaviour {
            Behaviour::Fill(px) => {
                self.buffer.data.fill(px);
                Ok(0.25)
            }
            Behaviour::Fail => Err(SurferError::validation("bad input")),
            Behaviour::Panic => panic!("kaboom"),
            Behaviour::Shrink => {
                self.buffer = PixelBuffer::square(1);
                Ok(0.0)
            }
        }
    }

    fn into_pixels(self: Box<Self>) -> PixelBuffer {
        self.buffer
    }
}

struct StubEvaluator {
    behaviour: Behaviour,
    configured: usize,
    reject: bool,
}

impl StubEvaluator {
    fn new(behaviour: Behaviour) -> Self {
        Self {
            behaviour,
            configured: 0,
            reject: false,
        }
    }
}

impl SurfaceEvaluator for StubEvaluator {
    fn configure(&mut self, _scene: &SceneState) -> SurferResult<()> {
        if self.reject {
            return Err(SurferError::formula("undefined parameter 'q'"));
        }
        self.configured += 1;
        Ok(())
    }

    fn snapshot(
        &mut self,
        _aa: AntiAliasing,
        buffer: PixelBuffer,
    ) -> SurferResult<Box<dyn RenderJob>> {
        Ok(Box::new(StubJob {
            buffer,
            behaviour: self.behaviour,
        }))
    }

    fn current_formula(&self) -> Option<&str> {
        None
    }

    fn current_parameters(&self) -> BTreeMap<String, f64> {
        BTreeMap::new()
    }
}

fn spec(resolution: u32) -> RenderSpec {
    RenderSpec {
        tier: Tier::Low,
        resolution,
        aa: AntiAliasing::new(
            AntiAliasingMode::AdaptiveSupersampling,
            AntiAliasingPattern::Quincunx,
        ),
    }
}

#[test]
fn capture_allocates_square_buffer_and_render_returns_it() {
    let mut ev = StubEvaluator::new(Behaviour::Fill(0xFF00_FF00));
    let scene = SceneState::new();
    let pass = capture_snapshot(&mut ev, &scene, spec(7)).unwrap();
    assert_eq!(ev.configured, 1);

    let out = render(pass).unwrap();
    assert_eq!((out.pixels.width, out.pixels.height), (7, 7));
    assert_eq!(out.pixels.data.len(), 49);
    assert!(out.pixels.data.iter().all(|&p| p == 0xFF00_FF00));
    assert_eq!(out.elapsed_seconds, 0.25);
}

#[test]
fn formula_errors_surface_from_capture() {
    let mut ev = StubEvaluator::new(Behaviour::Fill(0));
    ev.reject = true;
    let err = capture_snapshot(&mut ev, &SceneState::new(), spec(4)).unwrap_err();
    assert!(matches!(err, SurferError::Formula(_)));
}

#[test]
fn zero_resolution_is_rejected() {
    let mut ev = StubEvaluator::new(Behaviour::Fill(0));
    assert!(capture_snapshot(&mut ev, &SceneState::new(), spec(0)).is_err());
    assert_eq!(ev.configured, 0);
}

#[test]
fn job_failures_become_pass_execution_errors() {
    for (behaviour, needle) in [
        (Behaviour::Fail, "bad input"),
        (Behaviour::Panic, "kaboom"),
        (Behaviour::Shrink, "1x1"),
    ] {
        let mut ev = StubEvaluator::new(behaviour);
        let pass = capture_snapshot(&mut ev, &SceneState::new(), spec(3)).unwrap();
        let err = render(pass).unwrap_err();
        assert!(
            matches!(err, SurferError::PassExecution(ref m) if m.contains(needle)),
            "{err}"
        );
    }
}
