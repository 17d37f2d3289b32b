use serde::Serialize;

use super::domain::{OrderStatus, Role};
use super::lifecycle::{rule, Capability};

/// Result of checking an actor against a requested transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authorization {
    Allowed,
    Denied(DenialReason),
}

/// Why a transition request was refused. Neither kind is worth retrying as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DenialReason {
    #[error("order cannot move from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
    #[error("role {role} may not move an order from {from} to {to}")]
    Unauthorized {
        role: Role,
        from: OrderStatus,
        to: OrderStatus,
    },
}

impl DenialReason {
    pub const fn kind(&self) -> &'static str {
        match self {
            DenialReason::InvalidTransition { .. } => "invalid_transition",
            DenialReason::Unauthorized { .. } => "unauthorized",
        }
    }
}

impl Role {
    /// Admin holds every capability.
    pub fn has_capability(self, capability: Capability) -> bool {
        self == Role::Admin || capability.granted_to().contains(&self)
    }
}

/// Check `role` may move an order from `current` to `requested`.
///
/// The structural check runs first, so terminal orders are refused as invalid
/// transitions even for admins.
pub fn authorize(role: Role, current: OrderStatus, requested: OrderStatus) -> Authorization {
    let Some(rule) = rule(current, requested) else {
        return Authorization::Denied(DenialReason::InvalidTransition {
            from: current,
            to: requested,
        });
    };

    if role.has_capability(rule.capability) {
        Authorization::Allowed
    } else {
        Authorization::Denied(DenialReason::Unauthorized {
            role,
            from: current,
            to: requested,
        })
    }
}
