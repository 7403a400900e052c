// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Capability gate. Resolves one capability to a yes/no answer, prompting the
// user only while the platform reports it undecided.

use std::sync::Arc;

use textwerk_bridge::CapabilityService;
use textwerk_core::types::{Capability, CapabilityStatus};
use tracing::{debug, info, instrument, warn};

#[derive(Clone)]
pub struct CapabilityGate {
    service: Arc<dyn CapabilityService>,
}

impl CapabilityGate {
    pub fn new(service: Arc<dyn CapabilityService>) -> Self {
        Self { service }
    }

    /// `true` when `capability` may be used now.
    ///
    /// An already granted capability is never re-prompted. A service error is
    /// logged and treated as a denial.
    #[instrument(skip(self), fields(%capability))]
    pub async fn ensure(&self, capability: Capability) -> bool {
        let status = match self.service.check(capability).await {
            Ok(status) => status,
            Err(err) => {
                warn!(error = %err, "capability check failed; treating as denied");
                return false;
            }
        };

        match status {
            CapabilityStatus::Granted => true,
            CapabilityStatus::Denied => {
                debug!("capability previously denied");
                false
            }
            CapabilityStatus::Undecided => {
                match self
                    .service
                    .request(capability, capability.default_rationale())
                    .await
                {
                    Ok(answer) => {
                        info!(?answer, "capability prompt answered");
                        answer.is_granted()
                    }
                    Err(err) => {
                        warn!(error = %err, "capability prompt failed; treating as denied");
                        false
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use textwerk_bridge::mock::ScriptedCapabilities;
    use textwerk_bridge::stub::StubBridge;

    #[tokio::test]
    async fn granted_is_not_reprompted() {
        let caps = Arc::new(ScriptedCapabilities::granting_all());
        let gate = CapabilityGate::new(caps.clone());
        assert!(gate.ensure(Capability::Capture).await);
        assert!(gate.ensure(Capability::Capture).await);
        assert_eq!(caps.prompt_count(Capability::Capture), 0);
    }

    #[tokio::test]
    async fn undecided_prompts_once_then_remembers() {
        let caps = Arc::new(ScriptedCapabilities::new());
        let gate = CapabilityGate::new(caps.clone());
        assert!(gate.ensure(Capability::MediaRead).await);
        assert!(gate.ensure(Capability::MediaRead).await);
        assert_eq!(caps.prompt_count(Capability::MediaRead), 1);
    }

    #[tokio::test]
    async fn prompt_refusal_is_denial() {
        let caps = Arc::new(
            ScriptedCapabilities::new().answering(Capability::Positioning, CapabilityStatus::Denied),
        );
        let gate = CapabilityGate::new(caps.clone());
        assert!(!gate.ensure(Capability::Positioning).await);
        // Now denied; not asked again.
        assert!(!gate.ensure(Capability::Positioning).await);
        assert_eq!(caps.prompt_count(Capability::Positioning), 1);
    }

    #[tokio::test]
    async fn denied_is_not_prompted() {
        let caps = Arc::new(
            ScriptedCapabilities::new().with_status(Capability::MediaWrite, CapabilityStatus::Denied),
        );
        let gate = CapabilityGate::new(caps.clone());
        assert!(!gate.ensure(Capability::MediaWrite).await);
        assert_eq!(caps.prompt_count(Capability::MediaWrite), 0);
    }

    #[tokio::test]
    async fn stub_platform_denies_everything() {
        let gate = CapabilityGate::new(Arc::new(StubBridge));
        assert!(!gate.ensure(Capability::Capture).await);
        assert!(!gate.ensure(Capability::MediaRead).await);
    }
}
