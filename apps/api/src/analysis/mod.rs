// Résumé analysis pipeline: evaluation, job-posting analysis and rewrite.
// All LLM calls go through llm_client; prompts live in analysis::prompts.

use crate::errors::AppError;

pub mod handlers;
pub mod prompts;
pub mod service;

/// Suggested target positions offered to the client. Any non-blank label is accepted.
pub const TARGET_POSITIONS: [&str; 4] = [
    "FrontEnd Developer",
    "BackEnd Developer",
    "FullStack Developer",
    "Data Analytics Developer",
];

/// One call the pipeline makes to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Evaluate,
    JobPosting,
    Rewrite,
}

impl Operation {
    pub fn max_tokens(self) -> u32 {
        match self {
            Operation::Evaluate | Operation::JobPosting => 1500,
            Operation::Rewrite => 2500,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Operation::Evaluate => "evaluation",
            Operation::JobPosting => "job posting analysis",
            Operation::Rewrite => "resume rewrite",
        }
    }
}

/// Inputs of an analysis. Built once, never mutated after the builder calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub resume_text: String,
    pub target_position: String,
    pub job_posting: Option<String>,
    pub prior_analysis: Option<String>,
}

impl AnalysisRequest {
    pub fn new(resume_text: impl Into<String>, target_position: impl Into<String>) -> Result<Self, AppError> {
        let resume_text = resume_text.into();
        let target_position = target_position.into();

        if resume_text.trim().is_empty() {
            return Err(AppError::Validation(
                "Please submit your resume file or input resume text".to_string(),
            ));
        }
        if target_position.trim().is_empty() {
            return Err(AppError::Validation("target_position cannot be empty".to_string()));
        }

        Ok(Self {
            resume_text: resume_text.trim().to_string(),
            target_position: target_position.trim().to_string(),
            job_posting: None,
            prior_analysis: None,
        })
    }

    pub fn with_job_posting(mut self, job_posting: impl Into<String>) -> Self {
        self.job_posting = Some(job_posting.into());
        self
    }

    pub fn with_prior_analysis(mut self, analysis: impl Into<String>) -> Self {
        self.prior_analysis = Some(analysis.into());
        self
    }
}
