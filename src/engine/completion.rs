//! Completion detection.
//!
//! # Strategies
//! - Prompt (request/response): resolve on a terminal frame, or on any
//!   content once the grace period has passed
//! - Quiet (long-form): resolve on a terminal frame, or once content has
//!   arrived and no new fragment shows up for the quiet window
//!
//! Both are bounded by a ceiling and resolve early if the connection closes.
//!
//! # Design Decisions
//! - One `select!` races turn changes, the strategy timer and the ceiling
//! - Waking is driven by the turn's watch channel, never by polling
//! - No cancellation: a started wait ends only by resolving or disconnecting

use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{sleep_until, Instant};

use crate::config::CompletionConfig;
use crate::engine::turn::Turn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionStrategy {
    Prompt { grace: Duration, ceiling: Duration },
    Quiet { window: Duration, ceiling: Duration },
}

impl CompletionStrategy {
    /// Strategy for synchronous request/response callers.
    pub fn prompt(config: &CompletionConfig) -> Self {
        Self::Prompt {
            grace: Duration::from_millis(config.grace_ms),
            ceiling: Duration::from_secs(config.prompt_ceiling_secs),
        }
    }

    /// Strategy for the unsolicited greeting that follows a connect.
    pub fn greeting(config: &CompletionConfig) -> Self {
        Self::Prompt {
            grace: Duration::from_millis(config.grace_ms),
            ceiling: Duration::from_secs(config.greeting_ceiling_secs),
        }
    }

    /// Strategy for large, slowly produced replies.
    pub fn long_form(config: &CompletionConfig) -> Self {
        Self::Quiet {
            window: Duration::from_millis(config.quiet_window_ms),
            ceiling: Duration::from_secs(config.long_form_ceiling_secs),
        }
    }

    pub fn ceiling(&self) -> Duration {
        match self {
            Self::Prompt { ceiling, .. } | Self::Quiet { ceiling, .. } => *ceiling,
        }
    }
}

/// Why a wait resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionReason {
    /// `done`, `message` or `response` closed the turn.
    Terminal,
    /// Prompt strategy saw content after the grace period.
    Content,
    /// Quiet window elapsed after the last fragment.
    Inactivity,
    /// Hard ceiling reached.
    Ceiling,
    /// Connection closed while waiting.
    Disconnected,
}

impl CompletionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Terminal => "terminal",
            Self::Content => "content",
            Self::Inactivity => "inactivity",
            Self::Ceiling => "ceiling",
            Self::Disconnected => "disconnected",
        }
    }
}

/// Result of waiting on a turn.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    /// Accumulated text, possibly empty.
    pub text: String,
    pub reason: CompletionReason,
    /// Remote error reported during the turn, if any.
    pub remote_error: Option<String>,
    pub elapsed: Duration,
}

enum Decision {
    Resolve(CompletionReason),
    /// Keep waiting; re-evaluate at this instant if nothing changes first.
    WaitUntil(Option<Instant>),
}

fn evaluate(
    turn: &Turn,
    strategy: CompletionStrategy,
    started: Instant,
    ceiling_at: Instant,
    now: Instant,
) -> Decision {
    if turn.is_closed() {
        return Decision::Resolve(CompletionReason::Disconnected);
    }
    if turn.is_finished() {
        return Decision::Resolve(CompletionReason::Terminal);
    }
    if now >= ceiling_at {
        return Decision::Resolve(CompletionReason::Ceiling);
    }

    match strategy {
        CompletionStrategy::Prompt { grace, .. } => {
            let grace_end = started + grace;
            if now < grace_end {
                Decision::WaitUntil(Some(grace_end))
            } else if !turn.text().is_empty() {
                Decision::Resolve(CompletionReason::Content)
            } else {
                Decision::WaitUntil(None)
            }
        }
        CompletionStrategy::Quiet { window, .. } => {
            if turn.fragments() == 0 {
                return Decision::WaitUntil(None);
            }
            let quiet_at = turn.last_activity() + window;
            if now >= quiet_at {
                Decision::Resolve(CompletionReason::Inactivity)
            } else {
                Decision::WaitUntil(Some(quiet_at))
            }
        }
    }
}

/// Wait until the turn observed through `rx` completes under `strategy`.
pub async fn await_completion(
    rx: &mut watch::Receiver<Turn>,
    strategy: CompletionStrategy,
) -> TurnOutcome {
    let started = Instant::now();
    let ceiling_at = started + strategy.ceiling();

    loop {
        let decision = {
            let turn = rx.borrow_and_update();
            evaluate(&turn, strategy, started, ceiling_at, Instant::now())
        };

        let wake_at = match decision {
            Decision::Resolve(reason) => return outcome(rx, reason, started),
            Decision::WaitUntil(at) => at.map_or(ceiling_at, |at| at.min(ceiling_at)),
        };

        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    return outcome(rx, CompletionReason::Disconnected, started);
                }
            }
            _ = sleep_until(wake_at) => {}
        }
    }
}

fn outcome(rx: &watch::Receiver<Turn>, reason: CompletionReason, started: Instant) -> TurnOutcome {
    let turn = rx.borrow();
    TurnOutcome {
        text: turn.text().to_string(),
        reason,
        remote_error: turn.remote_error().map(str::to_string),
        elapsed: started.elapsed(),
    }
}
