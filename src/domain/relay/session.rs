//! Relay session state machine.
//!
//! ```text
//! Idle -> Estimating -> Rebuilding -> FinalQuoting -> Signing -> Submitting -> Confirming
//!            ^              |              |
//!            +--- Restart --+--------------+
//! ```
//!
//! Every non-terminal state can be aborted. Cancellation is accepted up to and
//! including `Submitting`; once the transaction is on its way to the ledger the
//! session can only observe the outcome.
use std::fmt;

use log::debug;
use solana_sdk::pubkey::Pubkey;

use crate::{
    models::{ConfirmationOutcome, FeeQuote, RelayError, SubmissionHandle},
    utils::generate_session_id,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalState {
    Confirmed { slot: Option<u64> },
    Failed(String),
    TimedOut,
    Aborted(String),
    Cancelled,
}

impl From<ConfirmationOutcome> for TerminalState {
    fn from(outcome: ConfirmationOutcome) -> Self {
        match outcome {
            ConfirmationOutcome::Confirmed { slot } => TerminalState::Confirmed { slot },
            ConfirmationOutcome::Failed(reason) => TerminalState::Failed(reason),
            ConfirmationOutcome::TimedOut => TerminalState::TimedOut,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayState {
    Idle,
    Estimating,
    Rebuilding,
    FinalQuoting,
    Signing,
    Submitting,
    Confirming,
    Terminal(TerminalState),
}

impl RelayState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RelayState::Terminal(_))
    }
}

impl fmt::Display for RelayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelayState::Idle => write!(f, "idle"),
            RelayState::Estimating => write!(f, "estimating"),
            RelayState::Rebuilding => write!(f, "rebuilding"),
            RelayState::FinalQuoting => write!(f, "final_quoting"),
            RelayState::Signing => write!(f, "signing"),
            RelayState::Submitting => write!(f, "submitting"),
            RelayState::Confirming => write!(f, "confirming"),
            RelayState::Terminal(terminal) => write!(f, "terminal({:?})", terminal),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayEvent {
    Start,
    Round1Quoted,
    Rebuilt,
    Round2Quoted,
    Signed,
    Submitted,
    ConfirmationObserved(ConfirmationOutcome),
    Restart,
    Abort(String),
    Cancel,
}

impl fmt::Display for RelayEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelayEvent::Start => write!(f, "start"),
            RelayEvent::Round1Quoted => write!(f, "round1_quoted"),
            RelayEvent::Rebuilt => write!(f, "rebuilt"),
            RelayEvent::Round2Quoted => write!(f, "round2_quoted"),
            RelayEvent::Signed => write!(f, "signed"),
            RelayEvent::Submitted => write!(f, "submitted"),
            RelayEvent::ConfirmationObserved(_) => write!(f, "confirmation_observed"),
            RelayEvent::Restart => write!(f, "restart"),
            RelayEvent::Abort(_) => write!(f, "abort"),
            RelayEvent::Cancel => write!(f, "cancel"),
        }
    }
}

/// Computes the state that follows `state` on `event`.
pub fn transition(state: &RelayState, event: &RelayEvent) -> Result<RelayState, RelayError> {
    use RelayEvent as E;
    use RelayState as S;

    let next = match (state, event) {
        (S::Terminal(_), _) => None,

        (S::Idle, E::Start) => Some(S::Estimating),
        (S::Estimating, E::Round1Quoted) => Some(S::Rebuilding),
        (S::Rebuilding, E::Rebuilt) => Some(S::FinalQuoting),
        (S::FinalQuoting, E::Round2Quoted) => Some(S::Signing),
        (S::Signing, E::Signed) => Some(S::Submitting),
        (S::Submitting, E::Submitted) => Some(S::Confirming),
        (S::Confirming, E::ConfirmationObserved(outcome)) => {
            Some(S::Terminal(outcome.clone().into()))
        }

        (S::Estimating | S::Rebuilding | S::FinalQuoting, E::Restart) => Some(S::Estimating),

        (S::Confirming, E::Cancel) => None,
        (_, E::Cancel) => Some(S::Terminal(TerminalState::Cancelled)),
        (_, E::Abort(reason)) => Some(S::Terminal(TerminalState::Aborted(reason.clone()))),

        _ => None,
    };

    next.ok_or_else(|| RelayError::InvalidTransition {
        state: state.to_string(),
        event: event.to_string(),
    })
}

/// The in-memory state of one sponsored send.
///
/// Owned by a single flow; nothing is persisted.
#[derive(Debug, Clone)]
pub struct RelaySession {
    id: String,
    initiator: Pubkey,
    state: RelayState,
    attempt: u8,
    quote: Option<FeeQuote>,
    initiator_index: Option<usize>,
    submission: Option<SubmissionHandle>,
}

impl RelaySession {
    pub fn new(initiator: Pubkey) -> Self {
        Self {
            id: generate_session_id(),
            initiator,
            state: RelayState::Idle,
            attempt: 0,
            quote: None,
            initiator_index: None,
            submission: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn initiator(&self) -> &Pubkey {
        &self.initiator
    }

    pub fn state(&self) -> &RelayState {
        &self.state
    }

    /// Negotiation attempts started so far.
    pub fn attempt(&self) -> u8 {
        self.attempt
    }

    pub fn quote(&self) -> Option<&FeeQuote> {
        self.quote.as_ref()
    }

    pub fn initiator_index(&self) -> Option<usize> {
        self.initiator_index
    }

    pub fn submission(&self) -> Option<&SubmissionHandle> {
        self.submission.as_ref()
    }

    pub fn apply(&mut self, event: RelayEvent) -> Result<&RelayState, RelayError> {
        let next = transition(&self.state, &event)?;
        debug!("Session {}: {} --{}--> {}", self.id, self.state, event, next);
        if next == RelayState::Estimating {
            self.attempt = self.attempt.saturating_add(1);
            self.quote = None;
        }
        self.state = next;
        Ok(&self.state)
    }

    /// Records the authoritative quote. Earlier quotes are replaced.
    pub fn record_quote(&mut self, quote: FeeQuote) {
        self.quote = Some(quote);
    }

    pub fn record_initiator_index(&mut self, index: usize) {
        self.initiator_index = Some(index);
    }

    pub fn record_submission(&mut self, handle: SubmissionHandle) {
        self.submission = Some(handle);
    }

    /// Moves to `Aborted` unless the session already ended.
    pub fn abort(&mut self, error: &RelayError) {
        if self.state.is_terminal() {
            return;
        }
        let event = match error {
            RelayError::Cancelled if self.state != RelayState::Confirming => RelayEvent::Cancel,
            other => RelayEvent::Abort(other.to_string()),
        };
        if let Err(e) = self.apply(event) {
            debug!("Session {}: {}", self.id, e);
        }
    }
}
