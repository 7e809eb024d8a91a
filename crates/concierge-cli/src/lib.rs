//! # concierge-cli — Case Lifecycle Toolchain
//!
//! Provides the `concierge` command-line interface over the lifecycle
//! validator in `concierge-state`.
//!
//! ## Subcommands
//!
//! - `concierge check` — Validate one proposed transition.
//! - `concierge normalize` — Coerce a stored value to a member.
//! - `concierge graph` — Print both transition tables.
//! - `concierge replay` — Validate every step of a status journal.
//!
//! ```bash
//! concierge check case PAYMENT_PENDING SUBMITTED
//! concierge normalize stage legacy_paid
//! concierge graph --format yaml
//! concierge replay journal.yaml
//! ```

pub mod check;
pub mod graph;
pub mod replay;

use clap::ValueEnum;
use concierge_state::TransitionKind;

/// Which state machine a command operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Machine {
    /// The case lifecycle.
    Case,
    /// The stage payment/execution lifecycle.
    Stage,
}

impl From<Machine> for TransitionKind {
    fn from(machine: Machine) -> Self {
        match machine {
            Machine::Case => TransitionKind::Case,
            Machine::Stage => TransitionKind::Stage,
        }
    }
}
