//! # Check & Normalize Subcommands
//!
//! `concierge check <case|stage> <CURRENT> <NEXT>` runs the validator on
//! one pair of raw values and exits 0 when the change is legal, 1 when it
//! is not. `concierge normalize <case|stage> <VALUE>` prints the member a
//! stored value resolves to.
//!
//! An empty argument (`""`) stands for an absent value.

use anyhow::Result;
use clap::Args;

use concierge_state::{
    normalize_case_status, normalize_stage_status, validate_case_transition,
    validate_stage_transition, IllegalTransition,
};

use crate::Machine;

/// Arguments for the `concierge check` subcommand.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// State machine to check against.
    #[arg(value_enum)]
    pub machine: Machine,

    /// Stored status value.
    pub current: String,

    /// Proposed status value.
    pub next: String,
}

/// Arguments for the `concierge normalize` subcommand.
#[derive(Args, Debug)]
pub struct NormalizeArgs {
    /// State machine whose enumeration to normalize into.
    #[arg(value_enum)]
    pub machine: Machine,

    /// Stored value to coerce.
    pub value: String,
}

/// Validate a raw `(current, next)` pair for the given machine.
pub fn check(machine: Machine, current: &str, next: &str) -> Result<(), IllegalTransition> {
    match machine {
        Machine::Case => validate_case_transition(Some(current), Some(next)),
        Machine::Stage => validate_stage_transition(Some(current), Some(next)),
    }
}

/// Canonical name of the member `value` normalizes to.
pub fn normalize(machine: Machine, value: &str) -> &'static str {
    match machine {
        Machine::Case => normalize_case_status(Some(value)).as_str(),
        Machine::Stage => normalize_stage_status(Some(value)).as_str(),
    }
}

/// Execute the check subcommand.
pub fn run_check(args: &CheckArgs) -> Result<u8> {
    tracing::debug!(machine = ?args.machine, current = %args.current, next = %args.next, "checking transition");
    match check(args.machine, &args.current, &args.next) {
        Ok(()) => {
            println!("OK: {} -> {}", display(&args.current), display(&args.next));
            Ok(0)
        }
        Err(err) => {
            eprintln!("{err}");
            Ok(1)
        }
    }
}

/// Execute the normalize subcommand.
pub fn run_normalize(args: &NormalizeArgs) -> Result<u8> {
    let normalized = normalize(args.machine, &args.value);
    if normalized != args.value {
        tracing::info!(value = %args.value, normalized, "value coerced to initial status");
    }
    println!("{normalized}");
    Ok(0)
}

fn display(value: &str) -> &str {
    if value.is_empty() {
        "(none)"
    } else {
        value
    }
}
