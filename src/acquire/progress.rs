use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::records::StreamerRecord;

/// Identity of one acquisition run. Strictly increasing per acquirer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RunId(pub u64);

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run#{}", self.0)
    }
}

/// Immutable progress snapshot. Every transition returns a new value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AcquisitionProgress {
    pub succeeded: usize,
    pub total_planned: usize,
    /// Failed at least once and not yet recovered or abandoned.
    pub failed_pending: usize,
    /// Still to resolve in the current retry round.
    pub retrying_now: usize,
    pub abandoned: usize,
    /// 0 during the first pass, then the retry round number.
    pub round: u32,
}

impl AcquisitionProgress {
    pub fn planned(total_planned: usize) -> Self {
        Self {
            total_planned,
            ..Self::default()
        }
    }

    pub fn is_idle(&self) -> bool {
        *self == Self::default()
    }

    pub fn ratio(&self) -> f64 {
        if self.total_planned == 0 {
            0.0
        } else {
            (self.succeeded as f64 / self.total_planned as f64).clamp(0.0, 1.0)
        }
    }

    pub(crate) fn first_pass_success(self) -> Self {
        Self {
            succeeded: self.succeeded + 1,
            ..self
        }
    }

    pub(crate) fn first_pass_failure(self) -> Self {
        Self {
            failed_pending: self.failed_pending + 1,
            ..self
        }
    }

    pub(crate) fn begin_round(self, round: u32, retrying: usize) -> Self {
        Self {
            round,
            retrying_now: retrying,
            ..self
        }
    }

    pub(crate) fn retry_success(self) -> Self {
        Self {
            succeeded: self.succeeded + 1,
            failed_pending: self.failed_pending.saturating_sub(1),
            retrying_now: self.retrying_now.saturating_sub(1),
            ..self
        }
    }

    pub(crate) fn retry_abandoned(self) -> Self {
        Self {
            failed_pending: self.failed_pending.saturating_sub(1),
            retrying_now: self.retrying_now.saturating_sub(1),
            abandoned: self.abandoned + 1,
            ..self
        }
    }
}

/// Published after every state change of a run. Progress and records travel
/// together so observers never see one without the other.
#[derive(Debug, Clone)]
pub struct AcquisitionUpdate {
    pub run: RunId,
    pub progress: AcquisitionProgress,
    pub records: Arc<Vec<StreamerRecord>>,
}

pub type UpdateSender = mpsc::UnboundedSender<AcquisitionUpdate>;
pub type UpdateReceiver = mpsc::UnboundedReceiver<AcquisitionUpdate>;

pub fn update_channel() -> (UpdateSender, UpdateReceiver) {
    mpsc::unbounded_channel()
}

/// Consumer-side filter that drops late updates from superseded runs.
#[derive(Debug, Default)]
pub struct RunTracker {
    current: Option<RunId>,
}

impl RunTracker {
    pub fn current(&self) -> Option<RunId> {
        self.current
    }

    /// Mark `run` as active before its first update arrives.
    pub fn begin(&mut self, run: RunId) {
        if self.current.map(|current| run > current).unwrap_or(true) {
            self.current = Some(run);
        }
    }

    pub fn accept(&mut self, update: AcquisitionUpdate) -> Option<AcquisitionUpdate> {
        match self.current {
            Some(current) if update.run < current => None,
            _ => {
                self.current = Some(update.run);
                Some(update)
            }
        }
    }
}
