use std::time::Duration;

use anyhow::{ensure, Context};
use lazy_static::lazy_static;

use super::{check_valid_keys, KV, KVS};
use crate::auth::{self, UserEntry};
use crate::backend::BackendEndpoint;
use crate::health::HealthMonitorOptions;
use crate::ops::ParameterLimits;
use crate::transport::HttpTransportOptions;

pub(self) const PROXY_BACKEND_URIS: &str = "backend_uris";
pub(self) const PROXY_DEFAULT_USER: &str = "default_user";
pub(self) const PROXY_REPLICATION_MIN: &str = "replication_min";
pub(self) const PROXY_REPLICATION_MAX: &str = "replication_max";
pub(self) const PROXY_BLOCK_SIZE_MIN: &str = "block_size_min";
pub(self) const PROXY_PROBE_INTERVAL: &str = "probe_interval";
pub(self) const PROXY_CONNECT_TIMEOUT: &str = "connect_timeout";
pub(self) const PROXY_REQUEST_TIMEOUT: &str = "request_timeout";
pub(self) const PROXY_DOWNLOAD_DEADLINE: &str = "download_deadline";
pub(self) const PROXY_MAX_CONNECTIONS: &str = "max_connections";
pub(self) const PROXY_MAX_CONNECTIONS_PER_BACKEND: &str = "max_connections_per_backend";
pub(self) const PROXY_LISTEN_ADDRESS: &str = "listen_address";
pub(self) const PROXY_USERS: &str = "users";

pub const ENV_PROXY_BACKEND_URIS: &str = "WEBHDFS_PROXY_BACKEND_URIS";
pub const ENV_PROXY_DEFAULT_USER: &str = "WEBHDFS_PROXY_DEFAULT_USER";
pub const ENV_PROXY_REPLICATION_MIN: &str = "WEBHDFS_PROXY_REPLICATION_MIN";
pub const ENV_PROXY_REPLICATION_MAX: &str = "WEBHDFS_PROXY_REPLICATION_MAX";
pub const ENV_PROXY_BLOCK_SIZE_MIN: &str = "WEBHDFS_PROXY_BLOCK_SIZE_MIN";
pub const ENV_PROXY_PROBE_INTERVAL: &str = "WEBHDFS_PROXY_PROBE_INTERVAL";
pub const ENV_PROXY_CONNECT_TIMEOUT: &str = "WEBHDFS_PROXY_CONNECT_TIMEOUT";
pub const ENV_PROXY_REQUEST_TIMEOUT: &str = "WEBHDFS_PROXY_REQUEST_TIMEOUT";
pub const ENV_PROXY_DOWNLOAD_DEADLINE: &str = "WEBHDFS_PROXY_DOWNLOAD_DEADLINE";
pub const ENV_PROXY_MAX_CONNECTIONS: &str = "WEBHDFS_PROXY_MAX_CONNECTIONS";
pub const ENV_PROXY_MAX_CONNECTIONS_PER_BACKEND: &str =
    "WEBHDFS_PROXY_MAX_CONNECTIONS_PER_BACKEND";
pub const ENV_PROXY_LISTEN_ADDRESS: &str = "WEBHDFS_PROXY_LISTEN_ADDRESS";
pub const ENV_PROXY_USERS: &str = "WEBHDFS_PROXY_USERS";

fn kv(key: &str, value: &str) -> KV {
    KV {
        key: key.to_owned(),
        value: value.to_owned(),
    }
}

lazy_static! {
    pub static ref DEFAULT_KVS: KVS = KVS(vec![
        kv(PROXY_BACKEND_URIS, ""),
        kv(PROXY_DEFAULT_USER, "hdfs"),
        kv(PROXY_REPLICATION_MIN, "1"),
        kv(PROXY_REPLICATION_MAX, "10"),
        kv(PROXY_BLOCK_SIZE_MIN, "1048576"),
        kv(PROXY_PROBE_INTERVAL, "5s"),
        kv(PROXY_CONNECT_TIMEOUT, "5s"),
        kv(PROXY_REQUEST_TIMEOUT, "5s"),
        kv(PROXY_DOWNLOAD_DEADLINE, "28s"),
        kv(PROXY_MAX_CONNECTIONS, "100"),
        kv(PROXY_MAX_CONNECTIONS_PER_BACKEND, "40"),
        kv(PROXY_LISTEN_ADDRESS, "127.0.0.1:8080"),
        kv(PROXY_USERS, ""),
    ]);
}

#[derive(Clone, Debug)]
pub struct Config {
    pub backend_uris: Vec<BackendEndpoint>,
    // User whose home directory is looked up by the health probe.
    pub default_user: String,
    pub replication_min: u16,
    pub replication_max: u16,
    pub block_size_min: u64,
    pub probe_interval: Duration,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub download_deadline: Duration,
    pub max_connections: usize,
    pub max_connections_per_backend: usize,
    pub listen_address: String,
    pub users: Vec<UserEntry>,
}

impl Config {
    /// Loads the config from defaults overridden by `WEBHDFS_PROXY_*` environment variables.
    pub fn from_env() -> anyhow::Result<Config> {
        lookup_config(&DEFAULT_KVS)
    }

    pub fn parameter_limits(&self) -> ParameterLimits {
        ParameterLimits {
            replication_min: self.replication_min,
            replication_max: self.replication_max,
            block_size_min: self.block_size_min,
        }
    }

    pub fn transport_options(&self) -> HttpTransportOptions {
        HttpTransportOptions {
            connect_timeout: self.connect_timeout,
            request_timeout: self.request_timeout,
            download_deadline: self.download_deadline,
            max_connections: self.max_connections,
            max_connections_per_backend: self.max_connections_per_backend,
        }
    }

    pub fn monitor_options(&self) -> HealthMonitorOptions {
        HealthMonitorOptions {
            default_user: self.default_user.clone(),
            interval: self.probe_interval,
            probe_timeout: self.request_timeout,
        }
    }
}

pub fn lookup_config(kvs: &KVS) -> anyhow::Result<Config> {
    check_valid_keys(kvs, &DEFAULT_KVS)?;

    let backend_uris = std::env::var(ENV_PROXY_BACKEND_URIS)
        .unwrap_or_else(|_| kvs.get(PROXY_BACKEND_URIS).to_owned());
    let backend_uris = backend_uris
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(BackendEndpoint::parse)
        .collect::<anyhow::Result<Vec<_>>>()
        .context("invalid value for backend uris")?;
    ensure!(
        !backend_uris.is_empty(),
        "at least one backend uri is required ({})",
        ENV_PROXY_BACKEND_URIS
    );

    let default_user = std::env::var(ENV_PROXY_DEFAULT_USER)
        .unwrap_or_else(|_| kvs.get(PROXY_DEFAULT_USER).to_owned());
    ensure!(!default_user.is_empty(), "the default user cannot be empty");

    let replication_min = std::env::var(ENV_PROXY_REPLICATION_MIN)
        .unwrap_or_else(|_| kvs.get(PROXY_REPLICATION_MIN).to_owned());
    let replication_min = replication_min.parse::<u16>()?;

    let replication_max = std::env::var(ENV_PROXY_REPLICATION_MAX)
        .unwrap_or_else(|_| kvs.get(PROXY_REPLICATION_MAX).to_owned());
    let replication_max = replication_max.parse::<u16>()?;
    ensure!(
        replication_min >= 1 && replication_min <= replication_max,
        "invalid replication range [{}, {}]",
        replication_min,
        replication_max
    );

    let block_size_min = std::env::var(ENV_PROXY_BLOCK_SIZE_MIN)
        .unwrap_or_else(|_| kvs.get(PROXY_BLOCK_SIZE_MIN).to_owned());
    let block_size_min = block_size_min.parse::<u64>()?;

    let probe_interval = std::env::var(ENV_PROXY_PROBE_INTERVAL)
        .unwrap_or_else(|_| kvs.get(PROXY_PROBE_INTERVAL).to_owned());
    let probe_interval = humantime::parse_duration(&probe_interval)?;
    ensure!(
        probe_interval > Duration::ZERO,
        "the probe interval must be positive"
    );

    let connect_timeout = std::env::var(ENV_PROXY_CONNECT_TIMEOUT)
        .unwrap_or_else(|_| kvs.get(PROXY_CONNECT_TIMEOUT).to_owned());
    let connect_timeout = humantime::parse_duration(&connect_timeout)?;

    let request_timeout = std::env::var(ENV_PROXY_REQUEST_TIMEOUT)
        .unwrap_or_else(|_| kvs.get(PROXY_REQUEST_TIMEOUT).to_owned());
    let request_timeout = humantime::parse_duration(&request_timeout)?;
    ensure!(
        request_timeout > Duration::ZERO,
        "the request timeout must be positive"
    );

    let download_deadline = std::env::var(ENV_PROXY_DOWNLOAD_DEADLINE)
        .unwrap_or_else(|_| kvs.get(PROXY_DOWNLOAD_DEADLINE).to_owned());
    let download_deadline = humantime::parse_duration(&download_deadline)?;

    let max_connections = std::env::var(ENV_PROXY_MAX_CONNECTIONS)
        .unwrap_or_else(|_| kvs.get(PROXY_MAX_CONNECTIONS).to_owned());
    let max_connections = max_connections.parse::<usize>()?;
    ensure!(max_connections > 0, "max connections should be at least 1");

    let max_connections_per_backend = std::env::var(ENV_PROXY_MAX_CONNECTIONS_PER_BACKEND)
        .unwrap_or_else(|_| kvs.get(PROXY_MAX_CONNECTIONS_PER_BACKEND).to_owned());
    let max_connections_per_backend = max_connections_per_backend.parse::<usize>()?;
    ensure!(
        max_connections_per_backend > 0,
        "max connections per backend should be at least 1"
    );

    let listen_address = std::env::var(ENV_PROXY_LISTEN_ADDRESS)
        .unwrap_or_else(|_| kvs.get(PROXY_LISTEN_ADDRESS).to_owned());

    let users = std::env::var(ENV_PROXY_USERS).unwrap_or_else(|_| kvs.get(PROXY_USERS).to_owned());
    let users = auth::parse_users(&users)?;

    Ok(Config {
        backend_uris,
        default_user,
        replication_min,
        replication_max,
        block_size_min,
        probe_interval,
        connect_timeout,
        request_timeout,
        download_deadline,
        max_connections,
        max_connections_per_backend,
        listen_address,
        users,
    })
}
