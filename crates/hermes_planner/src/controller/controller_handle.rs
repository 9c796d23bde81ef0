use tokio::sync::{broadcast, mpsc, watch};

use crate::{
    error::RunError,
    problem::{
        fact_change::FactChange,
        location::Location,
        vehicle::{Vehicle, VehicleId},
        visit::{Visit, VisitId},
    },
};

use super::controller_state::{Command, ControllerState, ControllerStatus, StateTransition};

/// Caller side of the run controller. Every call is a non-blocking send;
/// changes are applied in the order they were sent.
#[derive(Clone)]
pub struct ControllerHandle {
    commands: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<ControllerStatus>,
    transitions: broadcast::Sender<StateTransition>,
}

impl ControllerHandle {
    pub(crate) fn new(
        commands: mpsc::UnboundedSender<Command>,
        status: watch::Receiver<ControllerStatus>,
        transitions: broadcast::Sender<StateTransition>,
    ) -> Self {
        Self {
            commands,
            status,
            transitions,
        }
    }

    pub fn apply(&self, change: FactChange) -> Result<(), RunError> {
        self.send(Command::Apply(change))
    }

    pub fn add_visit(&self, visit: Visit) -> Result<(), RunError> {
        self.apply(FactChange::AddVisit { visit })
    }

    pub fn remove_visit(&self, visit_id: VisitId) -> Result<(), RunError> {
        self.apply(FactChange::RemoveVisit { visit_id })
    }

    pub fn add_vehicle(&self, vehicle: Vehicle) -> Result<(), RunError> {
        self.apply(FactChange::AddVehicle { vehicle })
    }

    pub fn remove_vehicle(&self, vehicle_id: VehicleId) -> Result<(), RunError> {
        self.apply(FactChange::RemoveVehicle { vehicle_id })
    }

    pub fn set_depot(&self, location: Location) -> Result<(), RunError> {
        self.apply(FactChange::SetDepot { location })
    }

    /// Stops the running session. The controller stays stopped until [`Self::reset`].
    pub fn shutdown(&self) -> Result<(), RunError> {
        self.send(Command::Shutdown)
    }

    /// Forgets the best solution and starts over with the current facts.
    pub fn reset(&self) -> Result<(), RunError> {
        self.send(Command::Reset)
    }

    /// Removes every fact.
    pub fn clear(&self) -> Result<(), RunError> {
        self.send(Command::Clear)
    }

    pub fn status(&self) -> ControllerStatus {
        self.status.borrow().clone()
    }

    pub fn state(&self) -> ControllerState {
        self.status.borrow().state
    }

    pub fn subscribe_status(&self) -> watch::Receiver<ControllerStatus> {
        self.status.clone()
    }

    pub fn subscribe_transitions(&self) -> broadcast::Receiver<StateTransition> {
        self.transitions.subscribe()
    }

    pub async fn wait_for_state(&self, target: ControllerState) -> Result<ControllerStatus, RunError> {
        let mut status = self.status.clone();
        status
            .wait_for(|status| status.state == target)
            .await
            .map(|status| status.clone())
            .map_err(|_| RunError::ControllerClosed)
    }

    fn send(&self, command: Command) -> Result<(), RunError> {
        self.commands
            .send(command)
            .map_err(|_| RunError::ControllerClosed)
    }
}
