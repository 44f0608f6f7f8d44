// Shared prompt fragments.
// Each operation defines its own templates in analysis/prompts.rs; this file
// holds the cross-cutting pieces.

/// Appended to prompts whose output is rendered straight into a document.
pub const DOCUMENT_ONLY_INSTRUCTION: &str = "\
IMPORTANT: Provide ONLY the complete, polished content in standard format. Do NOT include:
- Explanatory text or commentary
- Analysis or evaluation remarks
- Suggestions or recommendations
- Meta-commentary about the changes made";
