//! Rendering Engine Seam
//!
//! The PDF parser/rasterizer is an external collaborator. This module
//! describes what the core needs from it as the [`Engine`] trait and hosts
//! the process-wide [`EngineLifecycle`] that initializes and tears the engine
//! down as documents come and go.
//!
//! # Design
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                 EngineLifecycle<E>                      │
//! │   acquire() ──► refcount 0→1 ──► E::init_library()      │
//! │   drop(lease) ► refcount 1→0 ──► E::destroy_library()   │
//! └─────────────────────────────────────────────────────────┘
//!                          │ EngineLease (one per document)
//!                          ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │   Engine: documents, pages, forms, outline, links, text │
//! │   ├── MupdfEngine  (feature "mupdf")                    │
//! │   └── FakeEngine   (feature "test-utils")               │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! Every engine call is synchronous and runs on the caller's thread.

mod lifecycle;

#[cfg(feature = "mupdf")]
mod mupdf;

#[cfg(any(test, feature = "test-utils"))]
pub mod fake;

pub use lifecycle::{EngineLease, EngineLifecycle, LifecycleStats};

#[cfg(feature = "mupdf")]
pub use self::mupdf::MupdfEngine;

use crate::geometry::{self, Point, PointF, RectF, SizeF, Viewport};
use crate::render::{Bitmap, ChannelOrder};
use crate::source::DocumentSource;
use crate::text::CharBox;

/// Engine error codes, as reported for a failed document load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Success,
    Unknown,
    File,
    Format,
    Password,
    Security,
    Page,
}

impl ErrorCode {
    /// Fixed human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::Success => "No error.",
            ErrorCode::File => "File not found or could not be opened.",
            ErrorCode::Format => "File not in PDF format or corrupted.",
            ErrorCode::Password => "Incorrect password.",
            ErrorCode::Security => "Unsupported security scheme.",
            ErrorCode::Page => "Page not found or content error.",
            ErrorCode::Unknown => "Unknown error.",
        }
    }
}

/// Options for a rasterization call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderFlags {
    /// Draw annotation appearances along with page content
    pub annotations: bool,
}

impl RenderFlags {
    pub fn with_annotations(annotations: bool) -> Self {
        Self { annotations }
    }
}

/// Callback invoked when form JavaScript raises a modal alert
///
/// Arguments are title, message, button type and icon type; the return value
/// is the pressed button.
pub type AlertHandler = fn(&str, &str, i32, i32) -> i32;

/// Alert handler that only logs
pub fn no_op_alert(_title: &str, _message: &str, _button: i32, _icon: i32) -> i32 {
    tracing::error!("Form_Alert called.");
    0
}

/// Settings handed to the engine when a form-fill environment is created
#[derive(Clone, Copy)]
pub struct FormCallbacks {
    /// Widget highlight color as 0xRRGGBB
    pub highlight_color: u32,
    /// Widget highlight opacity (0-255)
    pub highlight_alpha: u8,
    pub alert: AlertHandler,
}

impl std::fmt::Debug for FormCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormCallbacks")
            .field("highlight_color", &format_args!("{:#08X}", self.highlight_color))
            .field("highlight_alpha", &self.highlight_alpha)
            .finish_non_exhaustive()
    }
}

impl Default for FormCallbacks {
    fn default() -> Self {
        Self {
            highlight_color: 0xFFFFFF,
            highlight_alpha: 100,
            alert: no_op_alert,
        }
    }
}

/// One node of the document outline as reported by the engine
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OutlineItem {
    pub title: String,
    /// Zero-based destination page, if the item has a destination
    pub dest_page: Option<i32>,
    pub children: Vec<OutlineItem>,
}

/// A link annotation as reported by the engine
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LinkInfo {
    /// Annotation rectangle in page space
    pub rect: Option<RectF>,
    /// URI of the link action, if the link has one
    pub uri: Option<String>,
    /// Zero-based destination page for internal links
    pub dest_page: Option<i32>,
}

/// One character of a page's extracted text stream
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextChar {
    /// Unicode scalar value
    pub unicode: u32,
    /// Glyph box in page space
    pub bounds: CharBox,
    /// Line the character belongs to (monotonic within a page)
    pub line: u32,
    /// Inserted by extraction (line breaks) rather than drawn on the page
    pub generated: bool,
}

/// The external PDF engine
///
/// Implementations own the native objects behind the associated types.
/// Dropping a `Document`, `Page` or `Form` value releases the native object.
pub trait Engine: Send + Sync + 'static {
    type Document;
    type Page;
    type Form;

    /// Short backend name for logs
    fn name(&self) -> &'static str;

    /// One-time global initialization (refcount 0→1)
    fn init_library(&self);

    /// Global teardown (refcount 1→0)
    fn destroy_library(&self);

    /// Load a document, reading the source in blocks
    fn load_document(
        &self,
        source: &DocumentSource,
        password: Option<&str>,
    ) -> Result<Self::Document, ErrorCode>;

    fn page_count(&self, doc: &Self::Document) -> i32;

    /// Page size in points without loading the page
    fn page_size_by_index(&self, doc: &Self::Document, index: i32) -> Option<SizeF>;

    /// Info dictionary entry (`Title`, `Author`, ...)
    fn meta_text(&self, doc: &Self::Document, tag: &str) -> Option<String>;

    fn load_page(&self, doc: &Self::Document, index: i32) -> Option<Self::Page>;

    /// Page size in points
    fn page_size(&self, page: &Self::Page) -> SizeF;

    /// Rasterize page content into `bitmap`, mapped onto `viewport`
    fn render_page(
        &self,
        page: &Self::Page,
        bitmap: &mut Bitmap<'_>,
        viewport: &Viewport,
        flags: RenderFlags,
    ) -> Result<(), ErrorCode>;

    fn init_form_environment(
        &self,
        doc: &Self::Document,
        callbacks: &FormCallbacks,
    ) -> Option<Self::Form>;

    /// Run document JavaScript, then the document open action
    fn do_document_actions(&self, form: &mut Self::Form);

    fn on_after_load_page(&self, form: &mut Self::Form, page: &Self::Page);

    fn do_page_open_action(&self, form: &mut Self::Form, page: &Self::Page);

    /// Draw form widget appearances on top of `bitmap`
    fn draw_form_fields(
        &self,
        form: &Self::Form,
        page: &Self::Page,
        bitmap: &mut Bitmap<'_>,
        viewport: &Viewport,
        flags: RenderFlags,
    ) -> Result<(), ErrorCode>;

    /// Channel order `draw_form_fields` expects its bitmap in
    fn form_channel_order(&self) -> ChannelOrder {
        ChannelOrder::Rgba
    }

    fn outline(&self, doc: &Self::Document) -> Vec<OutlineItem>;

    fn page_links(&self, page: &Self::Page) -> Vec<LinkInfo>;

    /// Character stream of a page; `None` when the text page cannot be built
    fn extract_text(&self, page: &Self::Page) -> Option<Vec<TextChar>>;

    fn page_to_device(&self, page: &Self::Page, viewport: &Viewport, point: PointF) -> Point {
        geometry::page_to_device(self.page_size(page), viewport, point)
    }

    fn device_to_page(&self, page: &Self::Page, viewport: &Viewport, point: Point) -> PointF {
        geometry::device_to_page(self.page_size(page), viewport, point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_descriptions() {
        assert_eq!(ErrorCode::Success.description(), "No error.");
        assert_eq!(ErrorCode::Password.description(), "Incorrect password.");
        assert_eq!(
            ErrorCode::Security.description(),
            "Unsupported security scheme."
        );
    }

    #[test]
    fn test_default_form_callbacks() {
        let callbacks = FormCallbacks::default();
        assert_eq!(callbacks.highlight_color, 0xFFFFFF);
        assert_eq!(callbacks.highlight_alpha, 100);
        assert_eq!((callbacks.alert)("title", "message", 0, 0), 0);
    }
}
