use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entitlement::UsageState;

/// Everything the service remembers about one browser session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionState {
    pub usage: UsageState,
    pub evaluation: Option<EvaluationRecord>,
    pub optimization: Option<OptimizationRecord>,
    pub email: Option<String>,
}

/// The last successful résumé evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub resume_text: String,
    pub target_position: String,
    pub candidate_name: Option<String>,
    pub analysis: String,
    pub created_at: DateTime<Utc>,
}

/// The last job-tailored rewrite, derived from the current evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizationRecord {
    pub job_analysis: String,
    pub optimized_resume: String,
    pub created_at: DateTime<Utc>,
}

impl SessionState {
    /// Stores a new evaluation. Any optimization built on the previous one is dropped.
    pub fn set_evaluation(&mut self, record: EvaluationRecord) {
        self.evaluation = Some(record);
        self.optimization = None;
    }

    /// "Evaluate again": forget the evaluation and everything derived from it.
    pub fn clear_evaluation(&mut self) {
        self.evaluation = None;
        self.optimization = None;
    }
}
