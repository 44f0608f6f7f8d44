// All LLM prompt constants for the analysis pipeline.
// Reuses cross-cutting fragments from llm_client::prompts.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::llm_client::prompts::DOCUMENT_ONLY_INSTRUCTION;
use crate::llm_client::ChatPrompt;

use super::AnalysisRequest;

// ────────────────────────────────────────────────────────────────────────────
// Résumé evaluation
// ────────────────────────────────────────────────────────────────────────────

pub const EVALUATION_SYSTEM: &str = "You act as an assistant like a senior professional \
    to evaluate the candidate's resume with insightful analysis and advice.";

/// Evaluation prompt template. Replace `{target_position}` and `{resume_text}` before sending.
pub const EVALUATION_PROMPT_TEMPLATE: &str = "You are a senior HR analyst assistant. \
Taking account of the resume submitted by the candidate, analyze the resume to validate \
whether the candidate qualifies for the requirements of the position: {target_position}.

RESUME:
{resume_text}

Please provide:
1. An overall assessment score (1-100)
2. A detailed analysis with suggestions for improvement
3. The candidate's major strengths, together with personalised advice on their future professional path";

// ────────────────────────────────────────────────────────────────────────────
// Job posting analysis
// ────────────────────────────────────────────────────────────────────────────

pub const JOB_POSTING_SYSTEM: &str = "You act as an expert HR analyst who understands \
    job requirements and can extract key information for resume optimization.";

/// Job posting prompt template. Replace `{job_description}` before sending.
pub const JOB_POSTING_PROMPT_TEMPLATE: &str = "You are a senior HR analyst. \
Analyze the following job posting and extract:
1. Key required skills and technologies
2. Preferred qualifications
3. Soft skills and personality traits
4. Experience level requirements
5. Main responsibilities and duties
6. Keywords that should appear in a tailored resume

JOB POSTING:
{job_description}

Please provide a structured analysis that can be used to optimize a resume for this position.";

// ────────────────────────────────────────────────────────────────────────────
// Résumé rewrite
// ────────────────────────────────────────────────────────────────────────────

pub const REWRITE_SYSTEM: &str = "You are an expert resume writer who creates ATS-optimized, \
    compelling resumes that match job requirements perfectly.";

/// Rewrite prompt template. Replace `{resume_text}`, `{job_analysis}`,
/// `{evaluation_feedback}` and `{document_only_instruction}` before sending.
pub const REWRITE_PROMPT_TEMPLATE: &str = "You are a professional resume writer with expertise \
in ATS optimization and job matching.

Based on the following information, rewrite the candidate's resume to better match the job requirements.

ORIGINAL RESUME:
{resume_text}

JOB REQUIREMENTS ANALYSIS:
{job_analysis}

EVALUATION FEEDBACK:
{evaluation_feedback}

{document_only_instruction}

The output should be a clean, professional resume with:
1. Contact information section
2. Professional summary/objective
3. Work experience with bullet points
4. Education section
5. Skills section
6. Any relevant additional sections (certifications, projects, etc.)

Optimize the resume by:
- Using keywords from job requirements
- Highlighting relevant experience and skills
- Improving ATS compatibility
- Quantifying achievements where possible
- Tailoring content to the specific role

Output the resume content ready for immediate use and submission.";

// ────────────────────────────────────────────────────────────────────────────
// Builders
// ────────────────────────────────────────────────────────────────────────────

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(\w+)\}").expect("placeholder regex"));

/// Fills `{name}` placeholders in one pass over the template. Substituted text
/// is never rescanned; unknown names are left as written.
fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| {
            values
                .iter()
                .find(|(name, _)| *name == &caps[1])
                .map_or_else(|| caps[0].to_string(), |(_, value)| value.to_string())
        })
        .into_owned()
}

pub fn evaluation_prompt(request: &AnalysisRequest) -> ChatPrompt {
    ChatPrompt {
        system: EVALUATION_SYSTEM.to_string(),
        user: fill_template(
            EVALUATION_PROMPT_TEMPLATE,
            &[
                ("target_position", &request.target_position),
                ("resume_text", &request.resume_text),
            ],
        ),
    }
}

pub fn job_posting_prompt(job_description: &str) -> ChatPrompt {
    ChatPrompt {
        system: JOB_POSTING_SYSTEM.to_string(),
        user: fill_template(JOB_POSTING_PROMPT_TEMPLATE, &[("job_description", job_description)]),
    }
}

/// Rewrite prompt for a request that already carries the job analysis and the
/// prior evaluation.
pub fn rewrite_prompt(resume_text: &str, job_analysis: &str, evaluation_feedback: &str) -> ChatPrompt {
    ChatPrompt {
        system: REWRITE_SYSTEM.to_string(),
        user: fill_template(
            REWRITE_PROMPT_TEMPLATE,
            &[
                ("resume_text", resume_text),
                ("job_analysis", job_analysis),
                ("evaluation_feedback", evaluation_feedback),
                ("document_only_instruction", DOCUMENT_ONLY_INSTRUCTION),
            ],
        ),
    }
}
