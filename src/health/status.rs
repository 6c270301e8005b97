use serde::{Deserialize, Serialize};
use strum::Display;

use crate::backend::BackendEndpoint;
use crate::utils;

#[derive(Serialize, Deserialize, Display, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServiceStatus {
    #[serde(rename = "OK")]
    #[strum(serialize = "OK")]
    Ok,
    // Connection refused, DNS failure or timeout.
    #[serde(rename = "UNREACHABLE")]
    #[strum(serialize = "UNREACHABLE")]
    Unreachable,
    // A response was received but it was not the expected one.
    #[serde(rename = "FAILED")]
    #[strum(serialize = "FAILED")]
    Failed,
    // Not probed yet.
    #[serde(rename = "UNKNOWN")]
    #[strum(serialize = "UNKNOWN")]
    Unknown,
}

impl ServiceStatus {
    pub fn successful(&self) -> bool {
        *self == ServiceStatus::Ok
    }

    pub fn display_text(&self) -> &'static str {
        match self {
            ServiceStatus::Ok => "OK",
            ServiceStatus::Unreachable => "UNREACHABLE",
            ServiceStatus::Failed => "FAILED",
            ServiceStatus::Unknown => "?",
        }
    }
}

/// The last observed state of one backend.
#[derive(Serialize, Clone, Debug)]
pub struct BackendStatusSnapshot {
    #[serde(serialize_with = "serialize_endpoint")]
    pub endpoint: BackendEndpoint,
    pub status: ServiceStatus,
    #[serde(rename = "observedAt")]
    pub observed_at: utils::DateTime,
    #[serde(rename = "errorMessage", skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

fn serialize_endpoint<S: serde::Serializer>(
    endpoint: &BackendEndpoint,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(endpoint)
}

impl BackendStatusSnapshot {
    pub fn unknown(endpoint: BackendEndpoint) -> Self {
        BackendStatusSnapshot {
            endpoint,
            status: ServiceStatus::Unknown,
            observed_at: utils::now(),
            error_message: None,
        }
    }
}
