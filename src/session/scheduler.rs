use std::collections::VecDeque;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::foundation::error::{SurferError, SurferResult};
use crate::render::adapter::{PassOutput, capture_snapshot};
use crate::render::evaluator::SurfaceEvaluator;
use crate::render::spec::Tier;
use crate::scene::state::SceneState;
use crate::session::display::{DisplayPublisher, DisplaySurface, max_render_size};
use crate::session::plan::{PassKind, SchedulerOpts, ThroughputEstimate, plan_chain};
use crate::session::worker::{CancelToken, PassTicket, RenderWorker, WorkerEvent};

/// Observable scheduler state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    /// No chain is active.
    Idle,
    /// A chain is active; the tier is the one running or about to run.
    Running(Tier),
    /// The last chain was cancelled and nothing replaced it.
    Cancelled,
}

/// How [`ProgressiveScheduler::shutdown`] treats outstanding work.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShutdownMode {
    /// Run the active chain to completion first.
    Drain,
    /// Drop pending passes; a pass already computing finishes but is not published.
    Cancel,
}

/// What happened to one pass.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PassReport {
    /// Chain the pass belonged to.
    pub generation: u64,
    /// Quality tier.
    pub tier: Tier,
    /// Side length in pixels, 0 for a placeholder pass.
    pub resolution: u32,
    /// Evaluator wall time.
    pub elapsed_seconds: f64,
    /// Measured (or, for a placeholder, reported) cost per pixel.
    pub seconds_per_pixel: f64,
    /// Whether the frame reached the display.
    pub published: bool,
    /// Placeholder pass that computed nothing.
    pub noop: bool,
}

#[derive(Debug)]
struct ActiveChain {
    generation: u64,
    cancel: CancelToken,
    remaining: VecDeque<PassKind>,
    tier: Tier,
}

/// Progressive multi-resolution scheduler.
///
/// Each [`trigger`](Self::trigger) replaces the active chain with a fresh low → medium → high →
/// ultra sequence. Passes run one at a time on a single background worker. Scene snapshots are
/// captured and frames are published only on the thread that calls [`pump`](Self::pump) (or its
/// blocking variants), which must be the thread owning the scene and the display.
pub struct ProgressiveScheduler {
    opts: SchedulerOpts,
    evaluator: Box<dyn SurfaceEvaluator>,
    estimate: ThroughputEstimate,
    worker: RenderWorker,
    publisher: DisplayPublisher,
    generation: u64,
    chain: Option<ActiveChain>,
    in_flight: Option<PassTicket>,
    cancelled: bool,
    reports: Vec<PassReport>,
}

impl std::fmt::Debug for ProgressiveScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressiveScheduler")
            .field("state", &self.state())
            .field("generation", &self.generation)
            .field("seconds_per_pixel", &self.estimate.seconds_per_pixel())
            .finish_non_exhaustive()
    }
}

impl ProgressiveScheduler {
    /// Validate `opts` and start the worker thread.
    pub fn new(evaluator: Box<dyn SurfaceEvaluator>, opts: SchedulerOpts) -> SurferResult<Self> {
        opts.validate()?;
        Ok(Self {
            estimate: ThroughputEstimate::new(opts.initial_seconds_per_pixel),
            opts,
            evaluator,
            worker: RenderWorker::spawn()?,
            publisher: DisplayPublisher::default(),
            generation: 0,
            chain: None,
            in_flight: None,
            cancelled: false,
            reports: Vec::new(),
        })
    }

    /// Options in effect.
    pub fn opts(&self) -> &SchedulerOpts {
        &self.opts
    }

    /// Current throughput estimate.
    pub fn seconds_per_pixel(&self) -> f64 {
        self.estimate.seconds_per_pixel()
    }

    /// Generation of the most recently started chain (0 before the first).
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Current state.
    pub fn state(&self) -> SchedulerState {
        match &self.chain {
            Some(chain) => SchedulerState::Running(chain.tier),
            None if self.cancelled => SchedulerState::Cancelled,
            None => SchedulerState::Idle,
        }
    }

    /// `true` while a chain is active or a pass is still on the worker.
    pub fn is_busy(&self) -> bool {
        self.chain.is_some() || self.in_flight.is_some()
    }

    /// Publisher bookkeeping (render size, last generation).
    pub fn publisher(&self) -> &DisplayPublisher {
        &self.publisher
    }

    /// The evaluator, e.g. to read back its current formula.
    pub fn evaluator(&self) -> &dyn SurfaceEvaluator {
        self.evaluator.as_ref()
    }

    /// Drain accumulated pass reports.
    pub fn take_reports(&mut self) -> Vec<PassReport> {
        std::mem::take(&mut self.reports)
    }

    /// Start a new chain for the current scene.
    ///
    /// Nothing happens (returns `Ok(false)`) when the display is not attached, the scene is
    /// invalid or a bulk update is in progress. A formula that fails to compile marks the scene
    /// invalid and also returns `Ok(false)`. Otherwise the previous chain is cancelled and a new
    /// one is queued behind any pass still on the worker.
    #[tracing::instrument(level = "debug", skip_all, fields(generation = self.generation + 1))]
    pub fn trigger(
        &mut self,
        scene: &mut SceneState,
        display: &dyn DisplaySurface,
    ) -> SurferResult<bool> {
        if !self.worker.is_running() {
            return Err(SurferError::worker("scheduler is shut down"));
        }
        let Some(bounds) = display.layout_bounds() else {
            tracing::debug!("display not attached");
            return Ok(false);
        };
        if !scene.is_valid() || scene.is_repaint_suppressed() {
            tracing::debug!(
                valid = scene.is_valid(),
                suppressed = scene.is_repaint_suppressed(),
                "repaint gated"
            );
            return Ok(false);
        }
        let max_size = max_render_size(bounds);
        if max_size == 0 {
            tracing::debug!("display area is empty");
            return Ok(false);
        }
        if let Err(e) = self.evaluator.configure(scene) {
            surface_error(scene, &e);
            return Ok(false);
        }

        self.cancel_chain();
        let plan = plan_chain(max_size, &self.opts, self.estimate.seconds_per_pixel());
        self.generation += 1;
        tracing::debug!(
            max_size,
            low_res = plan.low_res,
            seconds_per_pixel = self.estimate.seconds_per_pixel(),
            "chain planned"
        );
        self.chain = Some(ActiveChain {
            generation: self.generation,
            cancel: CancelToken::default(),
            remaining: plan.passes.into_iter().collect(),
            tier: Tier::Low,
        });
        self.cancelled = false;
        self.dispatch(scene);
        Ok(true)
    }

    /// Cancel the active chain. A pass already computing finishes; its result is still published
    /// unless a newer frame is on screen, but nothing further is scheduled.
    pub fn cancel(&mut self) {
        if self.cancel_chain() {
            self.cancelled = true;
        }
    }

    fn cancel_chain(&mut self) -> bool {
        let Some(chain) = self.chain.take() else {
            return false;
        };
        chain.cancel.cancel();
        tracing::debug!(
            generation = chain.generation,
            dropped = chain.remaining.len(),
            "chain cancelled"
        );
        true
    }

    /// Handle every event that is already waiting. Never blocks. Returns the number handled.
    pub fn pump(&mut self, scene: &mut SceneState, display: &mut dyn DisplaySurface) -> usize {
        let mut n = 0;
        while let Some(ev) = self.worker.try_event() {
            self.handle(ev, scene, display);
            n += 1;
        }
        n
    }

    /// Wait up to `timeout` for the next event, then handle it and everything else waiting.
    pub fn wait_and_pump(
        &mut self,
        scene: &mut SceneState,
        display: &mut dyn DisplaySurface,
        timeout: Duration,
    ) -> SurferResult<usize> {
        let Some(ev) = self.worker.event_timeout(timeout)? else {
            return Ok(0);
        };
        self.handle(ev, scene, display);
        Ok(1 + self.pump(scene, display))
    }

    /// Block until no chain is active and the worker is idle.
    pub fn run_until_idle(
        &mut self,
        scene: &mut SceneState,
        display: &mut dyn DisplaySurface,
    ) -> SurferResult<()> {
        while self.is_busy() {
            let ev = self.worker.event()?;
            self.handle(ev, scene, display);
        }
        Ok(())
    }

    /// Stop the worker and join it.
    pub fn shutdown(
        &mut self,
        mode: ShutdownMode,
        scene: &mut SceneState,
        display: &mut dyn DisplaySurface,
    ) -> SurferResult<()> {
        if mode == ShutdownMode::Drain {
            self.run_until_idle(scene, display)?;
        }
        self.cancel();
        self.in_flight = None;
        self.worker.stop()
    }

    fn handle(&mut self, ev: WorkerEvent, scene: &mut SceneState, display: &mut dyn DisplaySurface) {
        match ev {
            WorkerEvent::CaptureRequest { ticket, gate } => {
                if !self.is_current(&ticket) {
                    tracing::debug!(generation = ticket.generation, "refusing stale capture");
                    drop(gate);
                    return;
                }
                match capture_snapshot(self.evaluator.as_mut(), scene, ticket.spec) {
                    Ok(pass) => {
                        if !gate.deliver(pass) {
                            tracing::warn!("render worker dropped a capture gate");
                        }
                    }
                    Err(e) => {
                        drop(gate);
                        surface_error(scene, &e);
                        self.cancel_chain();
                    }
                }
            }
            WorkerEvent::Skipped { ticket } => {
                tracing::debug!(
                    generation = ticket.generation,
                    tier = ?ticket.spec.tier,
                    "pass skipped"
                );
                self.in_flight = None;
                self.dispatch(scene);
            }
            WorkerEvent::Completed { ticket, result } => {
                self.in_flight = None;
                match result {
                    Ok(out) => self.complete(ticket, out, display),
                    Err(e) => {
                        tracing::warn!(error = %e, tier = ?ticket.spec.tier, "pass failed");
                        scene.set_error_message(e.to_string());
                        if self.is_current(&ticket) {
                            self.chain = None;
                        }
                    }
                }
                self.dispatch(scene);
            }
            WorkerEvent::Stopped => {
                self.in_flight = None;
                self.chain = None;
            }
        }
    }

    fn complete(&mut self, ticket: PassTicket, out: PassOutput, display: &mut dyn DisplaySurface) {
        let resolution = out.spec.resolution;
        let seconds_per_pixel = if ticket.spec.tier == Tier::Low {
            self.estimate.record(out.elapsed_seconds, resolution)
        } else {
            let px = f64::from(resolution) * f64::from(resolution);
            out.elapsed_seconds / px.max(1.0)
        };

        let published = self.publisher.publish(display, ticket.generation, &out.pixels);
        tracing::debug!(
            generation = ticket.generation,
            tier = ?ticket.spec.tier,
            resolution,
            elapsed = out.elapsed_seconds,
            published,
            "pass completed"
        );
        self.reports.push(PassReport {
            generation: ticket.generation,
            tier: ticket.spec.tier,
            resolution,
            elapsed_seconds: out.elapsed_seconds,
            seconds_per_pixel,
            published,
            noop: false,
        });
    }

    fn is_current(&self, ticket: &PassTicket) -> bool {
        !ticket.cancel.is_cancelled()
            && self
                .chain
                .as_ref()
                .is_some_and(|c| c.generation == ticket.generation)
    }

    /// Start the next pass of the active chain if the worker is free.
    fn dispatch(&mut self, scene: &mut SceneState) {
        if self.in_flight.is_some() {
            return;
        }
        loop {
            let Some(chain) = self.chain.as_mut() else {
                return;
            };
            let Some(pass) = chain.remaining.pop_front() else {
                tracing::debug!(generation = chain.generation, "chain finished");
                self.chain = None;
                return;
            };
            chain.tier = pass.tier();
            match pass {
                PassKind::Noop {
                    tier,
                    seconds_per_pixel,
                } => {
                    tracing::debug!(generation = chain.generation, ?tier, "placeholder pass");
                    self.reports.push(PassReport {
                        generation: chain.generation,
                        tier,
                        resolution: 0,
                        elapsed_seconds: 0.0,
                        seconds_per_pixel,
                        published: false,
                        noop: true,
                    });
                }
                PassKind::Compute(spec) => {
                    let ticket = PassTicket {
                        generation: chain.generation,
                        spec,
                        cancel: chain.cancel.clone(),
                    };
                    if let Err(e) = self.worker.submit(ticket.clone()) {
                        surface_error(scene, &e);
                        self.chain = None;
                        return;
                    }
                    tracing::debug!(
                        generation = ticket.generation,
                        tier = ?spec.tier,
                        resolution = spec.resolution,
                        "pass started"
                    );
                    self.in_flight = Some(ticket);
                    return;
                }
            }
        }
    }
}

fn surface_error(scene: &mut SceneState, e: &SurferError) {
    tracing::warn!(error = %e, "render error");
    if e.invalidates_scene() {
        scene.mark_invalid(e);
    } else {
        scene.set_error_message(e.to_string());
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/scheduler.rs"]
mod tests;
