use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::domain::{ResidentUnitId, Slip, SlipId, SlipStatus};

/// Caller-facing lifecycle operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlipAction {
    Send,
    Pay,
    Expire,
    Cancel,
}

impl SlipAction {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Send => "send",
            Self::Pay => "pay",
            Self::Expire => "expire",
            Self::Cancel => "cancel",
        }
    }
}

/// Edges of the slip state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlipTransition {
    Send,
    PayFromSubmitted,
    Expire,
    VoidFromPending,
    VoidFromSubmitted,
    VoidFromOverdue,
}

/// Cancellation tries each void edge in this order.
const CANCEL_SEQUENCE: [SlipTransition; 3] = [
    SlipTransition::VoidFromPending,
    SlipTransition::VoidFromSubmitted,
    SlipTransition::VoidFromOverdue,
];

impl SlipTransition {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Send => "send",
            Self::PayFromSubmitted => "pay_from_submitted",
            Self::Expire => "expire",
            Self::VoidFromPending => "void_from_pending",
            Self::VoidFromSubmitted => "void_from_submitted",
            Self::VoidFromOverdue => "void_from_overdue",
        }
    }

    pub const fn target(self) -> SlipStatus {
        match self {
            Self::Send => SlipStatus::Submitted,
            Self::PayFromSubmitted => SlipStatus::Paid,
            Self::Expire => SlipStatus::Overdue,
            Self::VoidFromPending | Self::VoidFromSubmitted | Self::VoidFromOverdue => {
                SlipStatus::Cancelled
            }
        }
    }

    pub const fn permits(self, from: SlipStatus) -> bool {
        matches!(
            (self, from),
            (Self::Send, SlipStatus::Pending)
                | (Self::PayFromSubmitted, SlipStatus::Submitted)
                | (Self::Expire, SlipStatus::Pending | SlipStatus::Submitted)
                | (Self::VoidFromPending, SlipStatus::Pending)
                | (Self::VoidFromSubmitted, SlipStatus::Submitted)
                | (Self::VoidFromOverdue, SlipStatus::Overdue)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    #[error("slip in state {from} cannot be cancelled")]
    CancellationNotAllowed { from: SlipStatus },
    #[error("transition '{transition}' is not allowed from state {from}")]
    TransitionNotAllowed {
        transition: &'static str,
        from: SlipStatus,
    },
}

impl LifecycleError {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::CancellationNotAllowed { .. } => "cancellation_not_allowed",
            Self::TransitionNotAllowed { .. } => "transition_not_allowed",
        }
    }
}

/// Resolves the edge an action takes from `current`.
///
/// `Ok(None)` means the action is a silent no-op (paying a slip that was never sent).
pub fn resolve(
    current: SlipStatus,
    action: SlipAction,
) -> Result<Option<SlipTransition>, LifecycleError> {
    match action {
        SlipAction::Send => guarded(SlipTransition::Send, current).map(Some),
        SlipAction::Pay => Ok(SlipTransition::PayFromSubmitted
            .permits(current)
            .then_some(SlipTransition::PayFromSubmitted)),
        SlipAction::Expire => guarded(SlipTransition::Expire, current).map(Some),
        SlipAction::Cancel => CANCEL_SEQUENCE
            .into_iter()
            .find(|transition| transition.permits(current))
            .map(Some)
            .ok_or(LifecycleError::CancellationNotAllowed { from: current }),
    }
}

/// Pure state function: the status a slip ends up in after `action`.
pub fn transition(current: SlipStatus, action: SlipAction) -> Result<SlipStatus, LifecycleError> {
    Ok(resolve(current, action)?.map_or(current, SlipTransition::target))
}

fn guarded(transition: SlipTransition, from: SlipStatus) -> Result<SlipTransition, LifecycleError> {
    if transition.permits(from) {
        Ok(transition)
    } else {
        Err(LifecycleError::TransitionNotAllowed {
            transition: transition.name(),
            from,
        })
    }
}

/// Domain events emitted by generation and lifecycle transitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SlipEvent {
    Generated {
        slip_id: SlipId,
        resident_unit: ResidentUnitId,
        amount_cents: i64,
        due_date: NaiveDate,
    },
    StatusChanged {
        slip_id: SlipId,
        from: SlipStatus,
        to: SlipStatus,
        at: NaiveDateTime,
    },
}

impl SlipEvent {
    pub fn generated(slip: &Slip) -> Self {
        Self::Generated {
            slip_id: slip.id,
            resident_unit: slip.resident_unit.clone(),
            amount_cents: slip.amount_cents,
            due_date: slip.due_date,
        }
    }

    pub fn slip_id(&self) -> SlipId {
        match self {
            Self::Generated { slip_id, .. } | Self::StatusChanged { slip_id, .. } => *slip_id,
        }
    }
}

impl Slip {
    /// Applies `action` at instant `at`, returning the events to dispatch.
    /// An empty list means the slip was left untouched.
    pub fn apply(
        &mut self,
        action: SlipAction,
        at: NaiveDateTime,
    ) -> Result<Vec<SlipEvent>, LifecycleError> {
        let Some(edge) = resolve(self.status, action)? else {
            return Ok(Vec::new());
        };

        let from = self.status;
        self.status = edge.target();
        if edge == SlipTransition::PayFromSubmitted {
            self.paid_at = Some(at);
        }

        debug!(slip_id = %self.id, transition = edge.name(), %from, to = %self.status, "slip transitioned");

        Ok(vec![SlipEvent::StatusChanged {
            slip_id: self.id,
            from,
            to: self.status,
            at,
        }])
    }
}
