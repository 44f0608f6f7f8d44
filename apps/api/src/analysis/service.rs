//! Analysis pipeline steps over the LLM client.
//!
//! Flow for optimization: analyze job posting → rewrite résumé using the job
//! analysis and the prior evaluation as feedback.

use serde::Serialize;
use tracing::info;

use crate::analysis::prompts::{evaluation_prompt, job_posting_prompt, rewrite_prompt};
use crate::analysis::{AnalysisRequest, Operation};
use crate::errors::AppError;
use crate::llm_client::{ChatPrompt, LlmClient};

#[derive(Debug, Clone, Serialize)]
pub struct Optimization {
    pub job_analysis: String,
    pub optimized_resume: String,
}

async fn run(
    llm: &LlmClient,
    credential: &str,
    operation: Operation,
    prompt: &ChatPrompt,
) -> Result<String, AppError> {
    let text = llm.complete(credential, prompt, operation.max_tokens()).await?;
    info!("{} complete ({} chars)", operation.label(), text.len());
    Ok(text)
}

/// Evaluates the résumé against the target position.
pub async fn evaluate(
    llm: &LlmClient,
    credential: &str,
    request: &AnalysisRequest,
) -> Result<String, AppError> {
    info!("Evaluating resume for position '{}'", request.target_position);
    run(llm, credential, Operation::Evaluate, &evaluation_prompt(request)).await
}

/// Extracts requirements and keywords from a job posting.
pub async fn analyze_job_posting(
    llm: &LlmClient,
    credential: &str,
    job_posting: &str,
) -> Result<String, AppError> {
    if job_posting.trim().is_empty() {
        return Err(AppError::Validation(
            "Please upload a job posting or paste the job description".to_string(),
        ));
    }
    run(llm, credential, Operation::JobPosting, &job_posting_prompt(job_posting)).await
}

/// Rewrites the résumé for a job. Both the job analysis and the evaluation
/// feedback are required.
pub async fn rewrite(
    llm: &LlmClient,
    credential: &str,
    resume_text: &str,
    job_analysis: &str,
    evaluation_feedback: &str,
) -> Result<String, AppError> {
    if job_analysis.trim().is_empty() {
        return Err(AppError::Validation("A job analysis is required for the rewrite".to_string()));
    }
    if evaluation_feedback.trim().is_empty() {
        return Err(AppError::Validation(
            "Evaluation feedback is required for the rewrite".to_string(),
        ));
    }
    let prompt = rewrite_prompt(resume_text, job_analysis, evaluation_feedback);
    run(llm, credential, Operation::Rewrite, &prompt).await
}

/// Full optimization: job-posting analysis, then rewrite.
pub async fn optimize(
    llm: &LlmClient,
    credential: &str,
    request: &AnalysisRequest,
) -> Result<Optimization, AppError> {
    let job_posting = request
        .job_posting
        .as_deref()
        .ok_or_else(|| AppError::Validation("A job posting is required".to_string()))?;
    let feedback = request
        .prior_analysis
        .as_deref()
        .ok_or_else(|| AppError::Validation("Evaluate your resume before optimizing it".to_string()))?;

    let job_analysis = analyze_job_posting(llm, credential, job_posting).await?;
    let optimized_resume = rewrite(llm, credential, &request.resume_text, &job_analysis, feedback).await?;

    Ok(Optimization {
        job_analysis,
        optimized_resume,
    })
}
