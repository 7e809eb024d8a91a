//! # Replay Subcommand
//!
//! Validates a recorded status history. A journal lists the values a case
//! took, in order, and one history per stage. Opening the next stage is
//! not a stage transition, so each stage is replayed from its own start:
//!
//! ```yaml
//! case: [SUBMITTED, UNDER_REVIEW, AWAITING_CLIENT_APPROVAL, PAYMENT_PENDING, IN_PROGRESS]
//! stages:
//!   - [PENDING, AWAITING_PAYMENT, PAYMENT_SUBMITTED, PAID, IN_PROGRESS, COMPLETE]
//!   - [PENDING, AWAITING_PAYMENT]
//! ```
//!
//! Each consecutive pair goes through the same validator the service uses.
//! Files ending in `.yaml` or `.yml` are read as YAML, anything else as
//! JSON.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use serde::Deserialize;

use concierge_core::ConciergeError;
use concierge_state::{
    validate_case_transition, validate_stage_transition, IllegalTransition, TransitionKind,
    TransitionRecord, TransitionSubject,
};

/// Arguments for the `concierge replay` subcommand.
#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Path to a JSON or YAML status journal.
    pub file: PathBuf,
}

/// Ordered status histories for one case.
#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
pub struct Journal {
    #[serde(default)]
    pub case: Vec<String>,
    /// One history per stage, first stage first.
    #[serde(default)]
    pub stages: Vec<Vec<String>>,
}

impl Journal {
    /// Rebuild the histories from a case's transition log.
    ///
    /// Each history starts at the `from` of its first record. A stage with
    /// no recorded transitions gets an empty history.
    pub fn from_transitions(log: &[TransitionRecord]) -> Self {
        let mut journal = Self::default();
        for record in log {
            let history = match record.subject {
                TransitionSubject::Case => &mut journal.case,
                TransitionSubject::Stage { index } => {
                    let slot = index.max(1) as usize;
                    if journal.stages.len() < slot {
                        journal.stages.resize_with(slot, Vec::new);
                    }
                    &mut journal.stages[slot - 1]
                }
            };
            if history.is_empty() {
                history.push(record.from.clone());
            }
            history.push(record.to.clone());
        }
        journal
    }
}

/// The first rejected step of a journal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayFailure {
    /// 1-based stage the step belongs to; `None` for the case history.
    pub stage: Option<usize>,
    /// Position of the rejected value in its history (1-based, since
    /// step 0 is the starting value).
    pub step: usize,
    pub error: IllegalTransition,
}

impl std::fmt::Display for ReplayFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.stage {
            Some(stage) => write!(f, "stage {stage} step {}: {}", self.step, self.error),
            None => write!(f, "case step {}: {}", self.step, self.error),
        }
    }
}

/// Summary of a successful replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplaySummary {
    pub case_steps: usize,
    /// Stage steps summed over every stage.
    pub stage_steps: usize,
    pub stages: usize,
}

/// Parse a journal, choosing the format from the file extension.
pub fn load_journal(path: &Path) -> Result<Journal, ConciergeError> {
    let content = std::fs::read_to_string(path)?;
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    if is_yaml {
        serde_yaml::from_str(&content).map_err(|e| ConciergeError::Serialization(e.to_string()))
    } else {
        Ok(serde_json::from_str(&content)?)
    }
}

fn replay_history(
    kind: TransitionKind,
    stage: Option<usize>,
    history: &[String],
) -> Result<usize, ReplayFailure> {
    for (i, pair) in history.windows(2).enumerate() {
        let (current, next) = (Some(pair[0].as_str()), Some(pair[1].as_str()));
        let result = match kind {
            TransitionKind::Case => validate_case_transition(current, next),
            TransitionKind::Stage => validate_stage_transition(current, next),
        };
        result.map_err(|error| ReplayFailure {
            stage,
            step: i + 1,
            error,
        })?;
    }
    Ok(history.len().saturating_sub(1))
}

/// Validate every consecutive pair: the case history first, then each
/// stage in order.
pub fn replay(journal: &Journal) -> Result<ReplaySummary, ReplayFailure> {
    let case_steps = replay_history(TransitionKind::Case, None, &journal.case)?;
    let mut stage_steps = 0;
    for (i, history) in journal.stages.iter().enumerate() {
        stage_steps += replay_history(TransitionKind::Stage, Some(i + 1), history)?;
    }
    Ok(ReplaySummary {
        case_steps,
        stage_steps,
        stages: journal.stages.len(),
    })
}

/// Execute the replay subcommand.
pub fn run_replay(args: &ReplayArgs) -> Result<u8> {
    let journal = load_journal(&args.file)
        .with_context(|| format!("failed to read journal {}", args.file.display()))?;
    tracing::debug!(
        case = journal.case.len(),
        stages = journal.stages.len(),
        "replaying journal"
    );

    match replay(&journal) {
        Ok(summary) => {
            println!(
                "OK: {} case step(s), {} stage step(s) across {} stage(s)",
                summary.case_steps, summary.stage_steps, summary.stages
            );
            Ok(0)
        }
        Err(failure) => {
            eprintln!("{failure}");
            Ok(1)
        }
    }
}
