use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures_util::future::join_all;
use tokio::task::JoinHandle;
use tokio::time::{timeout, MissedTickBehavior};

use super::*;
use crate::backend::{BackendEndpoint, BackendSelector};
use crate::errors::OperationError;
use crate::ops::{home_directory, DecodedResult, OperationName, OperationTemplate};
use crate::transport::Transport;
use crate::utils;

const MAX_PROBE_RESPONSE_SIZE: usize = 64 * 1024;

#[derive(Clone, Debug)]
pub struct HealthMonitorOptions {
    // The user whose home directory is looked up by the probe.
    pub default_user: String,
    pub interval: Duration,
    pub probe_timeout: Duration,
}

impl Default for HealthMonitorOptions {
    fn default() -> Self {
        HealthMonitorOptions {
            default_user: "hdfs".to_owned(),
            interval: Duration::from_secs(5),
            probe_timeout: Duration::from_secs(5),
        }
    }
}

/// Periodically probes every backend and keeps the last snapshot of each.
pub struct HealthMonitor {
    template: OperationTemplate,
    endpoints: Vec<BackendEndpoint>,
    transport: Arc<dyn Transport>,
    opts: HealthMonitorOptions,
    snapshots: DashMap<String, BackendStatusSnapshot>,
}

impl HealthMonitor {
    pub fn new(
        selector: Arc<BackendSelector>,
        transport: Arc<dyn Transport>,
        opts: HealthMonitorOptions,
    ) -> Self {
        let endpoints = selector.endpoints().to_vec();
        let snapshots = DashMap::new();
        for endpoint in &endpoints {
            snapshots.insert(
                endpoint.to_string(),
                BackendStatusSnapshot::unknown(endpoint.clone()),
            );
        }
        HealthMonitor {
            template: OperationTemplate::new(OperationName::GetHomeDirectory, selector),
            endpoints,
            transport,
            opts,
            snapshots,
        }
    }

    /// Starts the probing loop on the current runtime.
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(self.clone().run())
    }

    pub async fn run(self: Arc<Self>) {
        let mut interval = tokio::time::interval(self.opts.interval);
        // A slow cycle postpones the next one instead of overlapping it.
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            self.run_cycle().await;
        }
    }

    /// Probes all backends concurrently and records the outcomes.
    pub async fn run_cycle(&self) {
        let snapshots = join_all(self.endpoints.iter().map(|ep| self.probe(ep))).await;
        for snapshot in snapshots {
            self.record(snapshot);
        }
    }

    /// A copy of the current snapshots, keyed by endpoint.
    pub fn get_report(&self) -> BTreeMap<String, BackendStatusSnapshot> {
        self.snapshots
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect()
    }

    pub async fn probe(&self, endpoint: &BackendEndpoint) -> BackendStatusSnapshot {
        let res = timeout(self.opts.probe_timeout, self.check(endpoint)).await;
        let (status, error_message) = match res {
            Ok(Ok(())) => (ServiceStatus::Ok, None),
            Ok(Err(err)) if err.is_unreachable() => {
                (ServiceStatus::Unreachable, Some(err.to_string()))
            }
            Ok(Err(err)) => (
                ServiceStatus::Failed,
                Some(format!("The request has failed: {}", err)),
            ),
            Err(_) => (
                ServiceStatus::Unreachable,
                Some(format!("No response within {:?}", self.opts.probe_timeout)),
            ),
        };

        if !status.successful() {
            log::error!(
                "Backend {} is {}: {}",
                endpoint,
                status,
                error_message.as_deref().unwrap_or_default()
            );
        }

        BackendStatusSnapshot {
            endpoint: endpoint.clone(),
            status,
            observed_at: utils::now(),
            error_message,
        }
    }

    async fn check(&self, endpoint: &BackendEndpoint) -> Result<(), OperationError> {
        let user = &self.opts.default_user;
        let req = self
            .template
            .build_request_for(endpoint.clone(), user, "", None, None, None)?;
        let res = self.transport.execute(req).await?;
        let (status, content_type, body) = res.read_to_end(MAX_PROBE_RESPONSE_SIZE).await?;
        let path = match self
            .template
            .decode_response(status, content_type.as_deref(), &body)?
        {
            DecodedResult::HomeDirectory(path) => path,
            res => {
                return Err(OperationError::Decode(format!(
                    "unexpected result: {:?}",
                    res
                )))
            }
        };

        let expected = home_directory(user);
        let expected = expected.trim_end_matches('/');
        if path.trim_end_matches('/') != expected {
            return Err(OperationError::Decode(format!(
                "expected home directory {}, got {}",
                expected, path
            )));
        }
        Ok(())
    }

    // Replaces the snapshot of an endpoint, keeping `observed_at` strictly increasing.
    fn record(&self, mut snapshot: BackendStatusSnapshot) {
        let key = snapshot.endpoint.to_string();
        match self.snapshots.get_mut(&key) {
            Some(mut prev) => {
                if utils::micros_between(&prev.observed_at, &snapshot.observed_at) <= 0 {
                    snapshot.observed_at = prev.observed_at + chrono::Duration::microseconds(1);
                }
                *prev = snapshot;
            }
            None => {
                self.snapshots.insert(key, snapshot);
            }
        }
    }
}
