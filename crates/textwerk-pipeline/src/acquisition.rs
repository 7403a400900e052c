// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Acquisition controller: capability check, then the chooser, then a single
// image handed on together with the generation it belongs to.

use std::sync::{Arc, Mutex};

use textwerk_bridge::Chooser;
use textwerk_core::error::{Result, TextwerkError};
use textwerk_core::human_errors::humanize_error;
use textwerk_core::types::{
    AcquisitionSource, Capability, ImageHandle, PipelineState, StatusMessage,
};
use tracing::{error, info, instrument, warn};

use crate::gate::CapabilityGate;
use crate::state::{lock, Generation, PipelineMachine};

/// An image obtained by one acquisition. Only this crate can mint one, so the
/// generation it carries is always genuine.
#[derive(Debug, Clone)]
pub struct AcquiredImage {
    pub(crate) generation: Generation,
    pub(crate) image: ImageHandle,
}

impl AcquiredImage {
    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn image(&self) -> &ImageHandle {
        &self.image
    }
}

/// How an acquisition ended.
#[derive(Debug, Clone)]
pub enum Acquisition {
    Image(AcquiredImage),
    /// The user dismissed the chooser.
    Cancelled,
    /// The capability was refused; the chooser was never opened.
    Denied(Capability),
    /// A newer acquisition started while this one was in flight.
    Superseded,
}

pub struct AcquisitionController {
    gate: CapabilityGate,
    chooser: Arc<dyn Chooser>,
}

impl AcquisitionController {
    pub fn new(gate: CapabilityGate, chooser: Arc<dyn Chooser>) -> Self {
        Self { gate, chooser }
    }

    /// Run one acquisition from `source`.
    ///
    /// Starting discards whatever the machine held. Device errors raise an
    /// alert, return the machine to `Idle` and are returned as `Err`.
    #[instrument(skip(self, machine))]
    pub async fn acquire(
        &self,
        machine: &Mutex<PipelineMachine>,
        source: AcquisitionSource,
    ) -> Result<Acquisition> {
        let generation = lock(machine).begin_acquisition();
        info!(%generation, "acquisition requested");

        let capability = source.required_capability();
        if !self.gate.ensure(capability).await {
            let human = humanize_error(&TextwerkError::CapabilityDenied(capability));
            let applied =
                lock(machine).fail_acquisition(generation, StatusMessage::failure(human.message));
            if !applied {
                return Ok(Acquisition::Superseded);
            }
            info!(%capability, "acquisition stopped: capability denied");
            return Ok(Acquisition::Denied(capability));
        }

        let opened = lock(machine).transition(generation, PipelineState::Acquiring);
        if !opened {
            return Ok(Acquisition::Superseded);
        }

        let chosen = match source {
            AcquisitionSource::Capture => self.chooser.capture().await,
            AcquisitionSource::Library => self.chooser.select_from_library().await,
        };

        let chosen = match chosen {
            Ok(Some(image)) if image.provenance() != source.provenance() => Err(TextwerkError::Device(
                format!("chooser returned a {:?} image for {:?}", image.provenance(), source),
            )),
            other => other,
        };

        match chosen {
            Ok(Some(image)) => {
                if !lock(machine).is_current(generation) {
                    return Ok(Acquisition::Superseded);
                }
                info!(locator = image.locator(), "image acquired");
                Ok(Acquisition::Image(AcquiredImage { generation, image }))
            }
            Ok(None) => {
                let applied = lock(machine).abort_acquisition(generation, None);
                if !applied {
                    return Ok(Acquisition::Superseded);
                }
                info!("acquisition cancelled");
                Ok(Acquisition::Cancelled)
            }
            Err(err) => {
                let applied = lock(machine).abort_acquisition(generation, Some(humanize_error(&err)));
                if !applied {
                    warn!(error = %err, "device error from superseded acquisition ignored");
                    return Ok(Acquisition::Superseded);
                }
                error!(error = %err, "acquisition failed");
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use textwerk_bridge::mock::{ScriptedCapabilities, ScriptedChooser};
    use textwerk_core::types::{CapabilityStatus, Provenance};

    fn controller(caps: ScriptedCapabilities, chooser: Arc<ScriptedChooser>) -> AcquisitionController {
        AcquisitionController::new(CapabilityGate::new(Arc::new(caps)), chooser)
    }

    #[tokio::test]
    async fn image_leaves_machine_acquiring() {
        let chooser = Arc::new(
            ScriptedChooser::new().then_image(ImageHandle::new("/tmp/a.jpg", Provenance::Captured)),
        );
        let machine = Mutex::new(PipelineMachine::new());
        let outcome = controller(ScriptedCapabilities::granting_all(), chooser)
            .acquire(&machine, AcquisitionSource::Capture)
            .await
            .unwrap();

        let Acquisition::Image(acquired) = outcome else {
            panic!("expected an image, got {outcome:?}");
        };
        assert_eq!(acquired.image().locator(), "/tmp/a.jpg");
        assert_eq!(acquired.generation(), lock(&machine).generation());
        assert_eq!(lock(&machine).state(), PipelineState::Acquiring);
    }

    #[tokio::test]
    async fn denial_skips_chooser() {
        let chooser = Arc::new(ScriptedChooser::new());
        let machine = Mutex::new(PipelineMachine::new());
        let caps = ScriptedCapabilities::new().with_status(Capability::Capture, CapabilityStatus::Denied);
        let outcome = controller(caps, chooser.clone())
            .acquire(&machine, AcquisitionSource::Capture)
            .await
            .unwrap();

        assert!(matches!(outcome, Acquisition::Denied(Capability::Capture)));
        assert_eq!(chooser.calls(), 0);
        let snapshot = lock(&machine).snapshot();
        assert_eq!(snapshot.state, PipelineState::AcquisitionFailed);
        assert!(snapshot.status.is_some());
        assert!(snapshot.alert.is_none());
    }

    #[tokio::test]
    async fn cancel_returns_to_idle_without_alert() {
        let chooser = Arc::new(ScriptedChooser::new().then_cancel());
        let machine = Mutex::new(PipelineMachine::new());
        let outcome = controller(ScriptedCapabilities::granting_all(), chooser)
            .acquire(&machine, AcquisitionSource::Library)
            .await
            .unwrap();

        assert!(matches!(outcome, Acquisition::Cancelled));
        let snapshot = lock(&machine).snapshot();
        assert_eq!(snapshot.state, PipelineState::Idle);
        assert!(snapshot.alert.is_none());
    }

    #[tokio::test]
    async fn device_error_raises_alert() {
        let chooser = Arc::new(ScriptedChooser::new().then_error("camera busy"));
        let machine = Mutex::new(PipelineMachine::new());
        let err = controller(ScriptedCapabilities::granting_all(), chooser)
            .acquire(&machine, AcquisitionSource::Capture)
            .await
            .unwrap_err();

        assert!(matches!(err, TextwerkError::Device(_)));
        let snapshot = lock(&machine).snapshot();
        assert_eq!(snapshot.state, PipelineState::Idle);
        assert!(snapshot.alert.is_some());
    }

    #[tokio::test]
    async fn wrong_provenance_is_a_device_error() {
        let chooser = Arc::new(
            ScriptedChooser::new().then_image(ImageHandle::new("/tmp/b.jpg", Provenance::Selected)),
        );
        let machine = Mutex::new(PipelineMachine::new());
        let err = controller(ScriptedCapabilities::granting_all(), chooser)
            .acquire(&machine, AcquisitionSource::Capture)
            .await
            .unwrap_err();
        assert!(matches!(err, TextwerkError::Device(_)));
    }
}
