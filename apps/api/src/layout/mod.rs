// Text measurement and line breaking for generated PDFs.
// Wrapping is pure and CPU-bound; callers run whole documents inside
// tokio::task::spawn_blocking.

pub mod font_metrics;
pub mod wrap;

pub use font_metrics::{get_metrics, report_page_config, Font, PageConfig};
pub use wrap::wrap_text;
