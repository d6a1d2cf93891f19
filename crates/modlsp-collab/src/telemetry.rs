//! The telemetry-store collaborator (spec §6.4) and the prompt decision
//! state machine (spec §9c): increment-only counters plus a one-line
//! prompt-state file with the grammar `<state> <attempts>
//! <telemetry-start-epoch> <sample-token>`.

use std::time::SystemTime;
use std::time::UNIX_EPOCH;

const SEVEN_DAYS_SECS: u64 = 7 * 24 * 60 * 60;
const MAX_ATTEMPTS: u32 = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TelemetryState {
    Pending,
    Failed,
    Yes,
    No,
    /// `-`: telemetry isn't ready to prompt yet (no sample window assigned).
    NotReady,
}

impl TelemetryState {
    fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Failed => "failed",
            Self::Yes => "yes",
            Self::No => "no",
            Self::NotReady => "-",
        }
    }

    fn parse(token: &str) -> Option<Self> {
        match token {
            "pending" => Some(Self::Pending),
            "failed" => Some(Self::Failed),
            "yes" => Some(Self::Yes),
            "no" => Some(Self::No),
            "-" => Some(Self::NotReady),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TelemetryDecision {
    Prompt,
    Skip,
}

/// One parsed (or freshly minted) line of the prompt-state file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TelemetryPromptState {
    pub state: TelemetryState,
    pub attempts: u32,
    pub start_epoch: u64,
    pub sample_token: u32,
}

impl TelemetryPromptState {
    /// Parse one line of the prompt-state file. Any line that doesn't match
    /// the current 4-field grammar -- including the older 2-field form --
    /// is treated as a fresh `failed` state rather than rejected outright,
    /// per spec §9c.
    #[must_use]
    pub fn parse(line: &str, now_epoch: u64, fresh_token: u32) -> Self {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if let [state, attempts, start_epoch, sample_token] = fields[..] {
            if let (Some(state), Ok(attempts), Ok(start_epoch), Ok(sample_token)) = (
                TelemetryState::parse(state),
                attempts.parse(),
                start_epoch.parse(),
                sample_token.parse(),
            ) {
                return Self { state, attempts, start_epoch, sample_token };
            }
        }
        Self {
            state: TelemetryState::Failed,
            attempts: 1,
            start_epoch: now_epoch,
            sample_token: fresh_token,
        }
    }

    #[must_use]
    pub fn to_line(self) -> String {
        format!(
            "{} {} {} {}",
            self.state.as_str(),
            self.attempts,
            self.start_epoch,
            self.sample_token
        )
    }

    /// spec §6.4/§9c's prompt decision: `state in {pending, failed} and
    /// attempts < 5 and started at least 7 days ago and sample_token <=
    /// samples_per_mille`.
    #[must_use]
    pub fn decide(&self, now_epoch: u64, samples_per_mille: u32) -> TelemetryDecision {
        let eligible_state = matches!(self.state, TelemetryState::Pending | TelemetryState::Failed);
        let under_attempt_cap = self.attempts < MAX_ATTEMPTS;
        let aged_enough = now_epoch.saturating_sub(self.start_epoch) >= SEVEN_DAYS_SECS;
        let sampled_in = self.sample_token <= samples_per_mille;

        if eligible_state && under_attempt_cap && aged_enough && sampled_in {
            TelemetryDecision::Prompt
        } else {
            TelemetryDecision::Skip
        }
    }

    #[must_use]
    pub fn record_attempt(self) -> Self {
        Self { state: TelemetryState::Failed, attempts: self.attempts + 1, ..self }
    }
}

/// Seconds since the Unix epoch, used as this process's notion of "now" when
/// no stored value is available yet.
#[must_use]
pub fn now_epoch() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

pub trait TelemetryStore: Send + Sync {
    fn increment(&self, counter: &str);
    fn load_prompt_state(&self) -> Option<TelemetryPromptState>;
    fn save_prompt_state(&self, state: TelemetryPromptState);
}

/// Discards everything. The default when no telemetry backend is wired up.
pub struct NoopTelemetryStore;

impl TelemetryStore for NoopTelemetryStore {
    fn increment(&self, _counter: &str) {}
    fn load_prompt_state(&self) -> Option<TelemetryPromptState> {
        None
    }
    fn save_prompt_state(&self, _state: TelemetryPromptState) {}
}
