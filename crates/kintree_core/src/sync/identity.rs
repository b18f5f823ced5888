//! Injected identity capability.
//!
//! Cloud-sync features are gated by an opaque signed-in signal. Core
//! never talks to an identity service directly; hosts inject whatever
//! provider they use, and the default is strictly local.

use std::fmt::Debug;

/// Capability interface reporting sign-in state.
pub trait IdentityProvider: Debug + Send + Sync {
    /// Opaque signed-in signal; `true` enables cloud-sync features.
    fn is_signed_in(&self) -> bool;

    /// Optional display label for the signed-in account.
    fn account_label(&self) -> Option<String> {
        None
    }
}

/// Default provider for local-only usage: never signed in.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalOnlyIdentity;

impl IdentityProvider for LocalOnlyIdentity {
    fn is_signed_in(&self) -> bool {
        false
    }
}
