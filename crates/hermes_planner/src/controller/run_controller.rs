use std::{collections::VecDeque, sync::Arc, time::Duration};

use tokio::{
    sync::{broadcast, mpsc, watch},
    task::JoinHandle,
    time::{Instant, timeout_at},
};
use tracing::{debug, error, info, warn};

use crate::{
    config::resolver::{ConfigurationResolver, DEFAULT_TERMINATION_BUDGET},
    error::RunError,
    executor::{execution_gate::ExecutionGate, session_handle::SessionHandle},
    problem::{fact_change::FactChange, problem_snapshot::ProblemSnapshot},
    solver::{
        best_solution_event::BestSolutionEvent,
        session::{SessionBuilder, SessionEvent, SessionOutcome},
    },
};

use super::{
    controller_handle::ControllerHandle,
    controller_state::{Command, ControllerState, ControllerStatus, StateTransition},
    publisher::RoutePublisher,
};

const TRANSITION_CAPACITY: usize = 64;

/// Owns the problem facts and the current session, and decides when sessions
/// start, restart and stop.
///
/// All decisions happen on one task: commands from [`ControllerHandle`]s and
/// session events are consumed from channels in arrival order. On a fact change
/// while solving, the running session is stopped and a new one is seeded with
/// the best plan found so far, reconciled against the new facts. Within a
/// session only strictly improving solutions reach the publisher; the first
/// solution of a restarted session is the reseeded plan under the new facts
/// and becomes the baseline for the ones after it.
pub struct RunController {
    resolver: ConfigurationResolver,
    builder: SessionBuilder,
    gate: ExecutionGate,
    publisher: Arc<dyn RoutePublisher>,

    commands: mpsc::UnboundedReceiver<Command>,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
    status: watch::Sender<ControllerStatus>,
    transitions: broadcast::Sender<StateTransition>,

    state: ControllerState,
    problem: ProblemSnapshot,
    pending: VecDeque<FactChange>,
    session: Option<SessionHandle>,
    generation: u64,
    stop_timeout: Duration,
    best: Option<BestSolutionEvent>,
    last_error: Option<RunError>,
}

impl RunController {
    pub fn new(
        resolver: ConfigurationResolver,
        builder: SessionBuilder,
        gate: ExecutionGate,
        publisher: Arc<dyn RoutePublisher>,
    ) -> (Self, ControllerHandle) {
        let (commands_tx, commands) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (status, status_rx) = watch::channel(ControllerStatus::default());
        let (transitions, _) = broadcast::channel(TRANSITION_CAPACITY);

        let handle = ControllerHandle::new(commands_tx, status_rx, transitions.clone());

        let controller = Self {
            resolver,
            builder,
            gate,
            publisher,
            commands,
            events_tx,
            events_rx,
            status,
            transitions,
            state: ControllerState::NoProblem,
            problem: ProblemSnapshot::default(),
            pending: VecDeque::new(),
            session: None,
            generation: 0,
            stop_timeout: DEFAULT_TERMINATION_BUDGET,
            best: None,
            last_error: None,
        };

        (controller, handle)
    }

    /// Creates the controller and runs it on its own task.
    pub fn spawn(
        resolver: ConfigurationResolver,
        builder: SessionBuilder,
        gate: ExecutionGate,
        publisher: Arc<dyn RoutePublisher>,
    ) -> (ControllerHandle, JoinHandle<()>) {
        let (controller, handle) = Self::new(resolver, builder, gate, publisher);
        (handle, tokio::spawn(controller.run()))
    }

    /// Runs until every [`ControllerHandle`] is dropped.
    pub async fn run(mut self) {
        info!("Run controller started");

        loop {
            tokio::select! {
                biased;

                Some(event) = self.events_rx.recv() => self.on_session_event(event).await,
                command = self.commands.recv() => match command {
                    Some(command) => self.on_command(command).await,
                    None => break,
                },
            }
        }

        self.stop_session().await;
        info!("Run controller stopped");
    }

    async fn on_command(&mut self, command: Command) {
        match command {
            Command::Apply(change) => self.on_fact_change(change).await,
            Command::Shutdown => self.shutdown().await,
            Command::Reset => self.reset().await,
            Command::Clear => self.clear().await,
        }
    }

    async fn on_fact_change(&mut self, change: FactChange) {
        match self.state {
            ControllerState::Seeding | ControllerState::Restarting => {
                debug!(%change, state = %self.state, "Queueing fact change until the session runs");
                self.pending.push_back(change);
                self.publish_status();
            }
            ControllerState::NoProblem => {
                if self.problem.apply(&change) {
                    self.publish_status();
                    self.start_if_solvable();
                }
            }
            ControllerState::Stopped => {
                if self.problem.apply(&change) {
                    self.publish_status();
                }
            }
            ControllerState::Solving => {
                if self.problem.apply(&change) {
                    self.on_facts_changed().await;
                } else {
                    debug!(%change, "Fact change left the problem unchanged");
                }
            }
        }
    }

    /// Reacts to changed facts while a session is solving.
    async fn on_facts_changed(&mut self) {
        if !self.problem.is_solvable() {
            info!(
                visits = self.problem.visits().len(),
                "Problem is no longer solvable, stopping"
            );
            self.stop_session().await;
            self.transition(ControllerState::Stopped);
            self.best = None;
            self.transition(ControllerState::NoProblem);
            return;
        }

        self.transition(ControllerState::Restarting);
        self.stop_session().await;
        self.start_session();
    }

    async fn on_session_event(&mut self, event: SessionEvent) {
        if !self.is_current(event.generation()) {
            debug!(generation = event.generation(), "Discarding event of a superseded session");
            return;
        }

        match event {
            SessionEvent::Started { generation } => {
                if matches!(
                    self.state,
                    ControllerState::Seeding | ControllerState::Restarting
                ) {
                    debug!(generation, "Session acknowledged start");
                    self.transition(ControllerState::Solving);
                    self.apply_pending().await;
                }
            }
            SessionEvent::BestSolution(event) => self.on_best_solution(event),
            SessionEvent::Finished {
                generation,
                outcome,
            } => self.on_session_finished(generation, outcome),
        }
    }

    /// Forwards a solution if it is strictly better than the best one of the
    /// same generation. The first solution of a new generation scores the
    /// reseeded plan against the changed facts, so it is forwarded as the new
    /// baseline instead of being compared with a score of different facts.
    fn on_best_solution(&mut self, event: BestSolutionEvent) {
        if let Some(best) = &self.best
            && best.generation == event.generation
            && !event.score.is_better_than(&best.score)
        {
            debug!(
                generation = event.generation,
                score = %event.score,
                best = %best.score,
                "Suppressing non-improving solution"
            );
            return;
        }

        // Status first, so a listener that sees the event also sees it as the best.
        self.best = Some(event);
        self.publish_status();
        if let Some(best) = &self.best {
            self.publisher.publish(best);
        }
    }

    /// A session ended without being asked to stop.
    fn on_session_finished(&mut self, generation: u64, outcome: SessionOutcome) {
        self.session = None;

        match outcome {
            SessionOutcome::StartFailed(source) => {
                self.record_error(RunError::SessionStart { generation, source })
            }
            SessionOutcome::Failed(source) => {
                self.record_error(RunError::SessionFailed { generation, source })
            }
            SessionOutcome::Stopped => debug!(generation, "Session stopped on its own"),
        }

        self.best = None;
        self.transition(ControllerState::NoProblem);

        // Queued changes may make the problem solvable again; a failure alone never retries.
        let mut changed = false;
        while let Some(change) = self.pending.pop_front() {
            changed |= self.problem.apply(&change);
        }
        self.publish_status();
        if changed {
            self.start_if_solvable();
        }
    }

    async fn apply_pending(&mut self) {
        if self.pending.is_empty() {
            return;
        }

        let mut changed = false;
        while let Some(change) = self.pending.pop_front() {
            changed |= self.problem.apply(&change);
        }
        debug!(changed, "Applied queued fact changes");

        if changed {
            self.on_facts_changed().await;
        } else {
            self.publish_status();
        }
    }

    async fn shutdown(&mut self) {
        info!(state = %self.state, "Shutdown requested");
        self.stop_session().await;
        while let Some(change) = self.pending.pop_front() {
            self.problem.apply(&change);
        }
        self.transition(ControllerState::Stopped);
        self.publish_status();
    }

    async fn reset(&mut self) {
        info!(state = %self.state, "Reset requested");
        self.stop_session().await;
        while let Some(change) = self.pending.pop_front() {
            self.problem.apply(&change);
        }
        self.best = None;
        self.last_error = None;
        self.transition(ControllerState::NoProblem);
        self.publish_status();
        self.start_if_solvable();
    }

    async fn clear(&mut self) {
        info!(state = %self.state, "Clearing all problem facts");
        self.stop_session().await;
        self.pending.clear();
        self.problem = ProblemSnapshot::default();
        self.best = None;
        if self.state != ControllerState::NoProblem {
            self.transition(ControllerState::Stopped);
        }
        self.transition(ControllerState::NoProblem);
        self.publish_status();
    }

    fn start_if_solvable(&mut self) {
        if self.state == ControllerState::NoProblem && self.problem.is_solvable() {
            self.transition(ControllerState::Seeding);
            self.start_session();
        }
    }

    /// Resolves the configuration, builds a session over the current facts and
    /// submits it. The best plan so far, if any, seeds the new session.
    fn start_session(&mut self) {
        let config = match self.resolver.resolve() {
            Ok(config) => config,
            Err(err) => {
                error!("Failed to resolve solver configuration: {err}");
                self.record_error(RunError::Config(err.to_string()));
                self.best = None;
                self.transition(ControllerState::NoProblem);
                return;
            }
        };

        self.generation += 1;
        let seed = self
            .best
            .as_ref()
            .map(|best| best.route_plan.reconcile(&self.problem));

        info!(
            generation = self.generation,
            source = %config.source_location,
            budget_secs = config.termination_budget.as_secs(),
            seeded = seed.is_some(),
            "Submitting session"
        );

        let session = self
            .builder
            .build(&config, self.problem.clone(), seed, self.generation);
        self.stop_timeout = config.termination_budget;
        self.session = Some(self.gate.submit(session, self.events_tx.clone()));
        self.publish_status();
    }

    /// Cancels the current session and waits for it to finish, at most
    /// `stop_timeout`. Solutions it still reports while stopping are handled
    /// like any other. Past the timeout the session is abandoned: it keeps the
    /// execution slot until it notices the stop and its late events are
    /// discarded.
    async fn stop_session(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };

        let generation = session.generation();
        session.cancel();
        debug!(generation, "Waiting for session to stop");

        let deadline = Instant::now() + self.stop_timeout;
        loop {
            match timeout_at(deadline, self.events_rx.recv()).await {
                Ok(Some(SessionEvent::Finished {
                    generation: finished,
                    outcome,
                })) if finished == generation => {
                    if let SessionOutcome::Failed(source) = outcome {
                        self.record_error(RunError::SessionFailed { generation, source });
                    }
                    debug!(generation, "Session stopped");
                    break;
                }
                Ok(Some(SessionEvent::BestSolution(event))) if event.generation == generation => {
                    self.on_best_solution(event);
                }
                Ok(Some(event)) => {
                    debug!(generation = event.generation(), "Discarding event of a superseded session");
                }
                Ok(None) => break,
                Err(_) => {
                    self.record_error(RunError::StopTimeout {
                        generation,
                        waited: self.stop_timeout,
                    });
                    break;
                }
            }
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| session.generation() == generation)
    }

    fn record_error(&mut self, error: RunError) {
        warn!(%error, state = %self.state, "Run error");
        self.last_error = Some(error);
        self.publish_status();
    }

    fn transition(&mut self, to: ControllerState) {
        let from = self.state;
        if from == to {
            return;
        }

        info!(%from, %to, generation = self.generation, "Run controller transition");
        self.state = to;
        let _ = self.transitions.send(StateTransition {
            from,
            to,
            generation: self.generation,
        });
        self.publish_status();
    }

    fn publish_status(&self) {
        self.status.send_replace(ControllerStatus {
            state: self.state,
            generation: self.generation,
            best_score: self.best.as_ref().map(|best| best.score),
            visits: self.problem.visits().len(),
            vehicles: self.problem.vehicles().len(),
            pending_changes: self.pending.len(),
            last_error: self.last_error.clone(),
        });
    }
}
