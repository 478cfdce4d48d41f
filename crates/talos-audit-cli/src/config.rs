//! # Service Configuration
//!
//! Entirely environment-variable driven, matching the rest of the service's
//! preference for explicit structs over configuration-file reflection.
//! Every field has a documented default; only `database_url` is required,
//! and only when `storage_type = postgres`.

use std::net::SocketAddr;

/// Which [`talos_audit_core::store::AuditStore`] adapter to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Memory,
    Postgres,
}

impl Default for StorageKind {
    fn default() -> Self {
        StorageKind::Memory
    }
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub kind: StorageKind,
    pub database_url: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig { kind: StorageKind::Memory, database_url: None }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig { bind_addr: "0.0.0.0:8080".parse().expect("valid default bind address") }
    }
}

#[derive(Debug, Clone)]
pub struct BroadcastConfig {
    pub queue_capacity: usize,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        BroadcastConfig { queue_capacity: talos_audit_core::broadcaster::DEFAULT_QUEUE_CAPACITY }
    }
}

#[derive(Debug, Clone)]
pub struct ListConfig {
    pub default_limit: usize,
}

impl Default for ListConfig {
    fn default() -> Self {
        ListConfig { default_limit: 50 }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ServiceConfig {
    pub storage: StorageConfig,
    pub server: ServerConfig,
    pub broadcast: BroadcastConfig,
    pub list: ListConfig,
}

impl ServiceConfig {
    /// Builds configuration from the `TALOS_*` environment variables,
    /// falling back to the documented defaults for anything unset.
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = ServiceConfig::default();

        if let Ok(storage_type) = std::env::var("TALOS_STORAGE_TYPE") {
            config.storage.kind = match storage_type.as_str() {
                "memory" => StorageKind::Memory,
                "postgres" => StorageKind::Postgres,
                other => anyhow::bail!("unknown TALOS_STORAGE_TYPE: {other}"),
            };
        }
        config.storage.database_url = std::env::var("TALOS_DATABASE_URL").ok();
        if config.storage.kind == StorageKind::Postgres && config.storage.database_url.is_none() {
            anyhow::bail!("TALOS_DATABASE_URL is required when TALOS_STORAGE_TYPE=postgres");
        }

        if let Ok(bind_addr) = std::env::var("TALOS_BIND_ADDR") {
            config.server.bind_addr = bind_addr.parse()?;
        }

        if let Ok(capacity) = std::env::var("TALOS_BROADCAST_QUEUE_CAPACITY") {
            config.broadcast.queue_capacity = capacity.parse()?;
        }

        if let Ok(limit) = std::env::var("TALOS_LIST_DEFAULT_LIMIT") {
            config.list.default_limit = limit.parse()?;
        }

        Ok(config)
    }
}
