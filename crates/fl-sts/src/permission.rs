//! Caller admission.

use std::collections::HashSet;
use std::sync::Arc;

use fl_core::config::StsConfig;

use crate::context::Operation;

/// Decides whether a caller may invoke an STS operation.
pub trait PermissionGate: Send + Sync {
    /// Returns true if `principal` may run `operation`.
    fn permits(&self, principal: Option<&str>, operation: Operation) -> bool;
}

/// Admits every caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl PermissionGate for AllowAll {
    fn permits(&self, _principal: Option<&str>, _operation: Operation) -> bool {
        true
    }
}

/// Admits the listed principals only. Anonymous callers are refused.
#[derive(Debug, Clone, Default)]
pub struct PrincipalAllowList {
    principals: HashSet<String>,
}

impl PrincipalAllowList {
    /// Creates a gate admitting `principals`.
    pub fn new<I, S>(principals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            principals: principals.into_iter().map(Into::into).collect(),
        }
    }
}

impl PermissionGate for PrincipalAllowList {
    fn permits(&self, principal: Option<&str>, _operation: Operation) -> bool {
        principal.is_some_and(|p| self.principals.contains(p))
    }
}

/// Returns the gate described by `allowed_principals`.
#[must_use]
pub fn gate_from_config(config: &StsConfig) -> Arc<dyn PermissionGate> {
    match &config.allowed_principals {
        Some(principals) => Arc::new(PrincipalAllowList::new(principals.iter().cloned())),
        None => Arc::new(AllowAll),
    }
}
