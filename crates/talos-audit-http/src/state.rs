use std::sync::Arc;
use talos_audit_core::AuditService;

/// Shared application state threaded through every handler via
/// `axum::extract::State`. Constructed once in the composition root
/// (`talos-audit-cli::bootstrap`); no global or lazily-initialized
/// singleton anywhere in this crate.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<AuditService>,
    pub version: &'static str,
    pub git_sha: &'static str,
    pub default_list_limit: usize,
}
