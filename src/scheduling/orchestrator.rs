//! Ties the registry, triggers, the problem and the driver together.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use parking_lot::{Mutex, MutexGuard, RwLock};
use tracing::{info, warn};

use crate::config::ScenarioConfig;
use crate::devices::ProblemPart;
use crate::ea::{
    AlgorithmParameters, CancellationToken, Chromosome, EvolutionaryAlgorithm, Problem, StoppingRule,
    VariableEncoding,
};
use crate::error::SchedulerError;
use crate::random::RandomStream;
use crate::scheduling::events::{EventSink, RunSummary, SchedulerEvent};
use crate::scheduling::registry::{PartRegistry, PartSnapshot};
use crate::scheduling::time::TimeSource;
use crate::scheduling::trigger::{RescheduleTrigger, TriggerReason};
use crate::signals::SignalSnapshot;
use crate::sim::{FitnessWeights, HouseholdProblem, Schedule, SimulationTiming};

/// Everything a run needs besides parts and signals.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerSettings {
    pub algorithm: AlgorithmParameters,
    pub stopping: Vec<StoppingRule>,
    pub encoding: VariableEncoding,
    pub seed: u64,
    pub step_size_secs: i64,
    pub horizon_secs: i64,
    pub reschedule_interval_secs: i64,
    pub keep_prediction: bool,
    pub fitness: FitnessWeights,
}

impl SchedulerSettings {
    pub fn from_config(cfg: &ScenarioConfig) -> Self {
        Self {
            algorithm: cfg.optimization.clone(),
            stopping: cfg.stopping.rules.clone(),
            encoding: cfg.scheduling.encoding,
            seed: cfg.scheduling.seed,
            step_size_secs: cfg.scheduling.step_size_secs,
            horizon_secs: cfg.scheduling.horizon_secs,
            reschedule_interval_secs: cfg.scheduling.reschedule_interval_secs,
            keep_prediction: cfg.scheduling.keep_prediction,
            fitness: cfg.fitness,
        }
    }
}

/// Schedules the registered household whenever a trigger fires.
///
/// At most one run is in flight. A trigger arriving during a run is
/// queued and served right after it, against a fresh snapshot. Every run
/// publishes exactly one [`Schedule`] per registered device (empty for
/// devices that failed) followed by a [`RunSummary`].
pub struct Scheduler<T: TimeSource, S: EventSink> {
    settings: SchedulerSettings,
    algorithm: EvolutionaryAlgorithm,
    registry: PartRegistry,
    signals: RwLock<Arc<SignalSnapshot>>,
    time: T,
    sink: S,
    /// Held for the whole duration of a run.
    trigger: Mutex<RescheduleTrigger>,
    pending: AtomicBool,
    cancel: Mutex<CancellationToken>,
}

impl<T: TimeSource, S: EventSink> Scheduler<T, S> {
    /// # Errors
    ///
    /// Fails on invalid operator or stopping-rule settings, or when the
    /// worker pool cannot be built.
    pub fn new(settings: SchedulerSettings, time: T, sink: S) -> Result<Self, SchedulerError> {
        let algorithm = EvolutionaryAlgorithm::new(settings.algorithm.clone(), settings.stopping.clone())?;
        Ok(Self {
            trigger: Mutex::new(RescheduleTrigger::new(settings.reschedule_interval_secs)),
            settings,
            algorithm,
            registry: PartRegistry::new(),
            signals: RwLock::new(Arc::new(SignalSnapshot::new())),
            time,
            sink,
            pending: AtomicBool::new(false),
            cancel: Mutex::new(CancellationToken::new()),
        })
    }

    pub fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }

    /// Publishes the latest state of one device. Never blocks on a run.
    pub fn publish(&self, part: ProblemPart) {
        self.registry.publish(part);
    }

    pub fn registry(&self) -> &PartRegistry {
        &self.registry
    }

    /// Replaces the price and limit signals used from the next run on.
    pub fn update_signals(&self, signals: SignalSnapshot) {
        *self.signals.write() = Arc::new(signals);
    }

    /// Asks the current run to stop after its generation; it still
    /// publishes the best solution found so far.
    pub fn cancel_run(&self) {
        self.cancel.lock().cancel();
    }

    pub fn is_running(&self) -> bool {
        self.trigger.is_locked()
    }

    pub fn last_run(&self) -> Option<i64> {
        self.trigger.lock().last_run()
    }

    /// Runs if a trigger is due.
    ///
    /// Returns the summary of the last run performed, or `None` when
    /// nothing was due or another run is in flight.
    pub fn poll(&self) -> Result<Option<RunSummary>, SchedulerError> {
        let Some(mut trigger) = self.trigger.try_lock() else {
            if self.registry.is_forced() {
                self.pending.store(true, Ordering::SeqCst);
                return self.serve_pending();
            }
            return Ok(None);
        };
        let forced = self.registry.take_forced();
        let summary = match trigger.due(self.time.now(), forced) {
            Some(reason) => Some(self.run_once(&mut trigger, reason)?),
            None => None,
        };
        self.drain_pending(trigger, summary)
    }

    /// Runs now regardless of the triggers, blocking until the run is
    /// complete. Queues the request if another run is in flight.
    pub fn request_run(&self) -> Result<Option<RunSummary>, SchedulerError> {
        match self.trigger.try_lock() {
            Some(mut trigger) => {
                let summary = self.run_once(&mut trigger, TriggerReason::Manual)?;
                self.drain_pending(trigger, Some(summary))
            }
            None => {
                self.pending.store(true, Ordering::SeqCst);
                self.serve_pending()
            }
        }
    }

    /// Serves a queued request if the trigger is free. Whoever holds it
    /// checks `pending` again after releasing it.
    fn serve_pending(&self) -> Result<Option<RunSummary>, SchedulerError> {
        match self.trigger.try_lock() {
            Some(trigger) => self.drain_pending(trigger, None),
            None => Ok(None),
        }
    }

    /// Runs queued requests until none is left, releasing the trigger only
    /// once `pending` is clear or another caller has taken it over.
    fn drain_pending<'a>(
        &'a self,
        mut trigger: MutexGuard<'a, RescheduleTrigger>,
        mut summary: Option<RunSummary>,
    ) -> Result<Option<RunSummary>, SchedulerError> {
        loop {
            while self.pending.swap(false, Ordering::SeqCst) {
                self.registry.take_forced();
                summary = Some(self.run_once(&mut trigger, TriggerReason::Queued)?);
            }
            drop(trigger);
            // A request may have been queued between the last swap and the unlock.
            if !self.pending.load(Ordering::SeqCst) {
                return Ok(summary);
            }
            match self.trigger.try_lock() {
                Some(next) => trigger = next,
                None => return Ok(summary),
            }
        }
    }

    fn fresh_cancellation(&self) -> CancellationToken {
        let token = CancellationToken::new();
        *self.cancel.lock() = token.clone();
        token
    }

    fn run_once(&self, trigger: &mut RescheduleTrigger, reason: TriggerReason) -> Result<RunSummary, SchedulerError> {
        let started = Instant::now();
        let now = self.time.now();
        trigger.mark_run(now);

        let snapshot = self.registry.snapshot();
        if snapshot.is_empty() {
            return Err(SchedulerError::NothingToSchedule);
        }
        let s = &self.settings;
        let horizon_end = now + s.horizon_secs;
        let parts: Vec<ProblemPart> = snapshot
            .values()
            .map(|p| {
                let mut part = ProblemPart::clone(p);
                part.recalculate_encoding(now, horizon_end);
                part
            })
            .collect();
        let timing = SimulationTiming::new(now, s.step_size_secs, horizon_end)?;
        let stream = RandomStream::new(s.seed).fork(now as u64);
        let signals = Arc::clone(&self.signals.read());
        let problem = HouseholdProblem::new(parts, s.encoding, signals, timing, s.fitness, stream.fork(0))?
            .with_keep_prediction(s.keep_prediction);

        let (chromosome, generations, evaluations, stop_reason) = if problem.layout().is_empty() {
            // Nothing controllable: one plain simulation is the answer.
            let empty = match s.encoding {
                VariableEncoding::Binary => Chromosome::Binary(Vec::new()),
                VariableEncoding::Real => Chromosome::Real(Vec::new()),
            };
            (empty, 0, 0, None)
        } else {
            let cancel = self.fresh_cancellation();
            let mut rng = stream.fork(1).rng();
            let result = self.algorithm.run(&problem, &mut rng, &cancel)?;
            (
                result.best.chromosome,
                result.generations,
                result.evaluations,
                Some(result.stop_reason),
            )
        };

        let outcome = match problem.schedules_for(&chromosome) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "final evaluation failed, publishing empty schedules");
                self.publish_empty(&snapshot);
                return Err(e.into());
            }
        };

        for schedule in outcome.schedules.iter().filter(|schedule| schedule.failed) {
            warn!(device = %schedule.device_id, "device failed, publishing empty schedule");
        }
        for schedule in outcome.schedules {
            self.sink.publish(SchedulerEvent::Schedule(schedule));
        }

        let summary = RunSummary {
            reference_time: now,
            trigger: reason,
            generations,
            evaluations,
            objectives: outcome.objectives,
            fitness: outcome.objectives.fitness(&s.fitness),
            failed_devices: outcome.failed_devices,
            stop_reason,
            runtime_ms: started.elapsed().as_millis() as u64,
        };
        info!(
            reference_time = now,
            trigger = %reason,
            devices = snapshot.len(),
            generations,
            evaluations,
            fitness = summary.fitness,
            failed = summary.failed_devices.len(),
            stop_reason = ?stop_reason,
            "scheduling run finished"
        );
        self.sink.publish(SchedulerEvent::Summary(summary.clone()));
        Ok(summary)
    }

    fn publish_empty(&self, snapshot: &PartSnapshot) {
        for part in snapshot.values() {
            let schedule = Schedule::empty(part.device_id().clone(), part.device_type());
            self.sink.publish(SchedulerEvent::Schedule(schedule));
        }
    }
}
