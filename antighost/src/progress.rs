//! Progress reporting for anti-ghosting runs.

use std::fmt;
use std::sync::Arc;

/// Progress information for one composite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Current step (0-based) within the stage.
    pub current: usize,
    /// Total number of steps in the stage.
    pub total: usize,
    pub stage: Stage,
}

/// Stage of an anti-ghosting run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Stage {
    Idle,
    /// Comparing grid cells of the reference and donor.
    Classifying,
    /// Merging gradient fields under a classifier mask.
    Blending,
    /// Merging under a user-painted mask.
    ManualBlending,
    /// Poisson reconstruction, one step per channel.
    Solving,
    Rebalancing,
    Done,
}

/// Optional shared callback receiving [`Progress`] updates.
#[derive(Clone, Default)]
pub struct ProgressCallback(Option<Arc<dyn Fn(Progress) + Send + Sync>>);

impl ProgressCallback {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Progress) + Send + Sync + 'static,
    {
        Self(Some(Arc::new(f)))
    }

    pub fn none() -> Self {
        Self(None)
    }

    pub fn is_some(&self) -> bool {
        self.0.is_some()
    }

    /// Report progress if a callback is set.
    pub fn report(&self, stage: Stage, current: usize, total: usize) {
        if let Some(f) = self.0.as_ref() {
            f(Progress {
                current,
                total,
                stage,
            });
        }
    }
}

impl fmt::Debug for ProgressCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            None => write!(f, "ProgressCallback::None"),
            Some(_) => write!(f, "ProgressCallback::Some(...)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_report_reaches_callback() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let callback = ProgressCallback::new(move |p| sink.lock().unwrap().push(p));
        callback.report(Stage::Solving, 1, 3);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![Progress {
                current: 1,
                total: 3,
                stage: Stage::Solving
            }]
        );
    }

    #[test]
    fn test_none_callback_is_silent() {
        let callback = ProgressCallback::none();
        assert!(!callback.is_some());
        callback.report(Stage::Done, 0, 0);
        assert_eq!(format!("{callback:?}"), "ProgressCallback::None");
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::ManualBlending.to_string(), "manual_blending");
        assert_eq!(Stage::Classifying.to_string(), "classifying");
    }
}
