//! The single background render thread and its one-shot capture gates.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::foundation::error::{SurferError, SurferResult};
use crate::render::adapter::{self, CapturedPass, PassOutput};
use crate::render::spec::RenderSpec;

/// Shared cancellation flag of one chain.
#[derive(Clone, Debug, Default)]
pub(crate) struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub(crate) fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Identity of one submitted pass.
#[derive(Clone, Debug)]
pub(crate) struct PassTicket {
    pub(crate) generation: u64,
    pub(crate) spec: RenderSpec,
    pub(crate) cancel: CancelToken,
}

/// Control-thread end of a one-shot handoff. Delivering consumes it; dropping it tells the
/// waiting worker to skip the pass.
#[derive(Debug)]
pub(crate) struct HandoffGate(mpsc::SyncSender<CapturedPass>);

impl HandoffGate {
    /// Returns `false` when the worker stopped waiting.
    pub(crate) fn deliver(self, pass: CapturedPass) -> bool {
        self.0.send(pass).is_ok()
    }
}

pub(crate) enum WorkerCommand {
    Run(PassTicket),
    Stop,
}

#[derive(Debug)]
pub(crate) enum WorkerEvent {
    /// The worker is blocked until `gate` is delivered or dropped.
    CaptureRequest {
        ticket: PassTicket,
        gate: HandoffGate,
    },
    /// The pass was cancelled or its capture refused; nothing ran.
    Skipped { ticket: PassTicket },
    Completed {
        ticket: PassTicket,
        result: SurferResult<PassOutput>,
    },
    Stopped,
}

/// Owner of the worker thread.
pub(crate) struct RenderWorker {
    commands: mpsc::Sender<WorkerCommand>,
    events: mpsc::Receiver<WorkerEvent>,
    handle: Option<JoinHandle<()>>,
}

impl RenderWorker {
    pub(crate) fn spawn() -> SurferResult<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel::<WorkerCommand>();
        let (ev_tx, ev_rx) = mpsc::channel::<WorkerEvent>();
        let handle = std::thread::Builder::new()
            .name("surfer-render".to_owned())
            .spawn(move || worker_loop(cmd_rx, ev_tx))
            .map_err(|e| SurferError::worker(format!("failed to spawn render worker: {e}")))?;
        Ok(Self {
            commands: cmd_tx,
            events: ev_rx,
            handle: Some(handle),
        })
    }

    pub(crate) fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    pub(crate) fn submit(&self, ticket: PassTicket) -> SurferResult<()> {
        self.commands
            .send(WorkerCommand::Run(ticket))
            .map_err(|_| SurferError::worker("render worker is not accepting passes"))
    }

    pub(crate) fn try_event(&self) -> Option<WorkerEvent> {
        self.events.try_recv().ok()
    }

    pub(crate) fn event_timeout(&self, timeout: Duration) -> SurferResult<Option<WorkerEvent>> {
        match self.events.recv_timeout(timeout) {
            Ok(ev) => Ok(Some(ev)),
            Err(mpsc::RecvTimeoutError::Timeout) => Ok(None),
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                Err(SurferError::worker("render worker exited unexpectedly"))
            }
        }
    }

    pub(crate) fn event(&self) -> SurferResult<WorkerEvent> {
        self.events
            .recv()
            .map_err(|_| SurferError::worker("render worker exited unexpectedly"))
    }

    /// Stop the thread and join it. Pending captures are refused and results discarded, so a
    /// worker waiting on a gate never deadlocks.
    pub(crate) fn stop(&mut self) -> SurferResult<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        let _ = self.commands.send(WorkerCommand::Stop);
        loop {
            match self.events.recv() {
                Ok(WorkerEvent::CaptureRequest { gate, .. }) => drop(gate),
                Ok(WorkerEvent::Stopped) | Err(_) => break,
                Ok(_) => {}
            }
        }
        handle
            .join()
            .map_err(|_| SurferError::worker("render worker panicked"))
    }
}

impl Drop for RenderWorker {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

fn worker_loop(commands: mpsc::Receiver<WorkerCommand>, events: mpsc::Sender<WorkerEvent>) {
    while let Ok(cmd) = commands.recv() {
        let ticket = match cmd {
            WorkerCommand::Run(ticket) => ticket,
            WorkerCommand::Stop => break,
        };
        let event = run_pass(ticket, &events);
        let Some(event) = event else {
            break;
        };
        if events.send(event).is_err() {
            break;
        }
    }
    let _ = events.send(WorkerEvent::Stopped);
}

/// `None` when the control side is gone.
fn run_pass(ticket: PassTicket, events: &mpsc::Sender<WorkerEvent>) -> Option<WorkerEvent> {
    if ticket.cancel.is_cancelled() {
        return Some(WorkerEvent::Skipped { ticket });
    }
    // fresh gate per pass
    let (gate_tx, gate_rx) = mpsc::sync_channel::<CapturedPass>(1);
    events
        .send(WorkerEvent::CaptureRequest {
            ticket: ticket.clone(),
            gate: HandoffGate(gate_tx),
        })
        .ok()?;
    let Ok(pass) = gate_rx.recv() else {
        return Some(WorkerEvent::Skipped { ticket });
    };
    let result = adapter::render(pass);
    Some(WorkerEvent::Completed { ticket, result })
}

#[cfg(test)]
#[path = "../../tests/unit/session/worker.rs"]
mod tests;
