//! A top-down flow layout over `printpdf`.
//!
//! Paragraphs are word-wrapped with the static Helvetica metrics and placed
//! line by line; a new page starts whenever the next line would cross the
//! bottom margin. Text must already be sanitized to printable ASCII.

use printpdf::{
    Color, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference, Rgb,
};

use tracing::debug;

use super::RenderError;
use crate::layout::{get_metrics, wrap_text, Font, PageConfig};

const PT_TO_MM: f32 = 0.352_778;
const LINE_HEIGHT: f32 = 1.2;

pub const BLACK: (f32, f32, f32) = (0.0, 0.0, 0.0);
pub const DARK_BLUE: (f32, f32, f32) = (0.0, 0.0, 0.545);
pub const GREY: (f32, f32, f32) = (0.5, 0.5, 0.5);

#[derive(Debug, Clone, Copy)]
pub struct TextStyle {
    pub font: Font,
    pub size_pt: f32,
    pub color: (f32, f32, f32),
    pub centered: bool,
    pub space_before_pt: f32,
    pub space_after_pt: f32,
}

impl TextStyle {
    pub const fn body(size_pt: f32) -> Self {
        TextStyle {
            font: Font::Helvetica,
            size_pt,
            color: BLACK,
            centered: false,
            space_before_pt: 0.0,
            space_after_pt: 0.0,
        }
    }
}

pub struct PdfCanvas {
    doc: PdfDocumentReference,
    config: PageConfig,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    layer: PdfLayerReference,
    /// Distance from the top edge of the current page to the next line's top.
    cursor_pt: f32,
    pages: usize,
}

fn mm(pt: f32) -> Mm {
    Mm(pt * PT_TO_MM)
}

fn pdf_err(e: impl std::fmt::Display) -> RenderError {
    RenderError::Pdf(e.to_string())
}

impl PdfCanvas {
    /// Starts a document with one empty page. `title` goes into the document metadata.
    pub fn new(title: &str, config: PageConfig) -> Result<Self, RenderError> {
        let (doc, page, layer) =
            PdfDocument::new(title, mm(config.width_pt), mm(config.height_pt), "Layer 1");
        let regular = doc.add_builtin_font(Font::Helvetica.builtin()).map_err(pdf_err)?;
        let bold = doc.add_builtin_font(Font::HelveticaBold.builtin()).map_err(pdf_err)?;
        let layer = doc.get_page(page).get_layer(layer);

        Ok(Self {
            doc,
            config,
            regular,
            bold,
            layer,
            cursor_pt: config.margin_top_pt,
            pages: 1,
        })
    }

    #[cfg(test)]
    pub fn page_count(&self) -> usize {
        self.pages
    }

    /// Vertical gap. Gaps never carry over to a fresh page.
    pub fn space(&mut self, pt: f32) {
        if self.cursor_pt > self.config.margin_top_pt {
            self.cursor_pt += pt;
        }
    }

    /// Places `text` in `style`. Line breaks in `text` are kept; each line is
    /// word-wrapped to the text width.
    pub fn paragraph(&mut self, text: &str, style: &TextStyle) {
        let metrics = get_metrics(style.font);
        let max_width = self.config.text_width_pt();
        let leading = style.size_pt * LINE_HEIGHT;

        self.space(style.space_before_pt);
        for source_line in text.lines() {
            for line in wrap_text(source_line, metrics, style.size_pt, max_width) {
                if self.cursor_pt + leading > self.config.height_pt - self.config.margin_bottom_pt {
                    self.new_page();
                }

                let width = metrics.width_pt(&line, style.size_pt);
                let x = if style.centered {
                    self.config.margin_left_pt + (max_width - width).max(0.0) / 2.0
                } else {
                    self.config.margin_left_pt
                };
                let baseline = self.config.height_pt - self.cursor_pt - style.size_pt;

                let (r, g, b) = style.color;
                self.layer.set_fill_color(Color::Rgb(Rgb::new(r, g, b, None)));
                let font = match style.font {
                    Font::Helvetica => &self.regular,
                    Font::HelveticaBold => &self.bold,
                };
                self.layer.use_text(line, style.size_pt, mm(x), mm(baseline), font);
                self.cursor_pt += leading;
            }
        }
        self.space(style.space_after_pt);
    }

    fn new_page(&mut self) {
        let (page, layer) = self.doc.add_page(
            mm(self.config.width_pt),
            mm(self.config.height_pt),
            "Layer 1",
        );
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.cursor_pt = self.config.margin_top_pt;
        self.pages += 1;
    }

    pub fn finish(self) -> Result<Vec<u8>, RenderError> {
        debug!("Saving PDF with {} page(s)", self.pages);
        self.doc.save_to_bytes().map_err(pdf_err)
    }
}
