//! Order status state machine.
//!
//! The transition table below is the single source of truth for which status
//! changes exist and which capability each one requires. Role checks live in
//! [`super::authorization`].

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::authorization::{authorize, Authorization, DenialReason};
use super::domain::{Actor, Order, OrderStatus, Role, UserId};

/// What an actor must be able to do to fire a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Approve or reject a pending request.
    Review,
    /// Move an approved order through the kitchen.
    Fulfill,
}

impl Capability {
    /// Roles holding the capability. Admin is granted everything separately.
    pub const fn granted_to(self) -> &'static [Role] {
        match self {
            Capability::Review => &[Role::Supervisor, Role::Provider],
            Capability::Fulfill => &[Role::Provider],
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Capability::Review => "review",
            Capability::Fulfill => "fulfill",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TransitionRule {
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub capability: Capability,
}

/// Every permitted status change and the capability it requires.
///
/// The last row sends a prepared order back to approved so the kitchen can
/// redo it. It is a fulfilment action and leaves `approved_by` as it was.
pub const TRANSITIONS: [TransitionRule; 5] = [
    TransitionRule {
        from: OrderStatus::Pending,
        to: OrderStatus::Approved,
        capability: Capability::Review,
    },
    TransitionRule {
        from: OrderStatus::Pending,
        to: OrderStatus::Rejected,
        capability: Capability::Review,
    },
    TransitionRule {
        from: OrderStatus::Approved,
        to: OrderStatus::Prepared,
        capability: Capability::Fulfill,
    },
    TransitionRule {
        from: OrderStatus::Prepared,
        to: OrderStatus::Delivered,
        capability: Capability::Fulfill,
    },
    TransitionRule {
        from: OrderStatus::Prepared,
        to: OrderStatus::Approved,
        capability: Capability::Fulfill,
    },
];

/// Every new order starts here regardless of who placed it.
pub const INITIAL_STATUS: OrderStatus = OrderStatus::Pending;

pub fn rule(from: OrderStatus, to: OrderStatus) -> Option<&'static TransitionRule> {
    TRANSITIONS
        .iter()
        .find(|rule| rule.from == from && rule.to == to)
}

pub fn next_statuses(from: OrderStatus) -> Vec<OrderStatus> {
    TRANSITIONS
        .iter()
        .filter(|rule| rule.from == from)
        .map(|rule| rule.to)
        .collect()
}

/// Outcome of evaluating a requested status against the current order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionPlan {
    /// Requested status equals the current non-terminal status.
    Unchanged,
    Apply(Order),
}

/// Decide what a request to move `order` to `requested` does.
///
/// Re-requesting the current status of a live order is a no-op so duplicate UI
/// actions succeed; on a terminal order it is an invalid transition like any
/// other.
pub fn plan_transition(
    order: &Order,
    requested: OrderStatus,
    actor: &Actor,
    now: DateTime<Utc>,
) -> Result<TransitionPlan, DenialReason> {
    if order.status == requested && !order.status.is_terminal() {
        return Ok(TransitionPlan::Unchanged);
    }

    match authorize(actor.role, order.status, requested) {
        Authorization::Allowed => Ok(TransitionPlan::Apply(apply_transition(
            order,
            requested,
            &actor.user_id,
            now,
        ))),
        Authorization::Denied(reason) => Err(reason),
    }
}

/// Produce the order after moving it to `to`.
///
/// Leaving `pending` records the acting user in `approved_by`. The
/// `prepared -> approved` revert keeps the original approver.
pub fn apply_transition(
    order: &Order,
    to: OrderStatus,
    actor_id: &UserId,
    now: DateTime<Utc>,
) -> Order {
    let mut next = order.clone();
    if order.status == OrderStatus::Pending {
        next.approved_by = Some(actor_id.clone());
    }
    next.status = to;
    next.updated_at = now;
    next
}
