use glam::Vec2;
use time::Duration;

use crate::growth::{Action, Stage, StageChange};

/// Where a grant of EXP came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExpSource {
    Action(Action),
    Passive,
    Manual,
}

/// Why a manual check-in was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CheckinDenial {
    CapReached,
    Cooldown(Duration),
}

/// Notifications for the host, drained once per frame.
#[derive(Clone, Debug, PartialEq)]
pub enum SimEvent {
    StageChanged { from: Stage, to: Stage },
    ExpGranted { source: ExpSource, exp: u32 },
    /// Activity contribution was withdrawn from the ledger.
    ExpWithdrawn { exp: u32 },
    ActionIneffective(Action),
    CheckinDenied(CheckinDenial),
    /// A pointer press and release that never became a drag.
    Tapped { pet_id: String },
    DragFinished { pet_id: String, velocity: Vec2 },
    /// Whether the host window should capture pointer input. Sent only on change.
    PointerCapture(bool),
    BuddyAdded { pet_id: String },
    BuddyRemoved { pet_id: String },
    BuddyLimitReached,
    /// The main pet was tapped, toggling the care panel.
    PanelToggled,
}

impl From<StageChange> for SimEvent {
    fn from(change: StageChange) -> Self {
        SimEvent::StageChanged {
            from: change.from,
            to: change.to,
        }
    }
}
