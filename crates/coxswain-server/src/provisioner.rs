//! Built-in work handler.
//!
//! Stands in for a real provisioning backend: it sleeps for the configured
//! latency and reports success, echoing the confirmed generation into the
//! resource's status bag. A `properties.provisioningError` string makes the
//! work fail with that message, which exercises the failure path end to end.

use async_trait::async_trait;
use serde_json::{Map, json};
use std::time::Duration;

use coxswain_core::ErrorDetails;
use coxswain_reconcile::{WorkHandler, WorkItem, WorkResult};

pub struct DelayProvisioner {
    delay: Duration,
}

impl DelayProvisioner {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl WorkHandler for DelayProvisioner {
    async fn execute(&self, item: WorkItem) -> WorkResult {
        tokio::time::sleep(self.delay).await;

        if let Some(message) = item
            .resource
            .properties
            .get("provisioningError")
            .and_then(|v| v.as_str())
        {
            tracing::warn!(id = %item.resource.id, verb = %item.verb, "provisioning failed");
            return WorkResult::failed(ErrorDetails::new("ProvisioningFailed", message));
        }

        tracing::debug!(id = %item.resource.id, verb = %item.verb, "provisioning complete");
        let mut status = Map::new();
        status.insert(
            "observedGeneration".into(),
            json!(item.resource.system_data.generation),
        );
        WorkResult::succeeded(Some(status))
    }
}
