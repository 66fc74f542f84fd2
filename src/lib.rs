//! PDF Core Library
//!
//! Handle-based access to PDF documents backed by an external rendering
//! engine. Callers open documents, load page and text-page handles from
//! them, rasterize pages into their own pixel surfaces and walk bookmarks,
//! links and text geometry.
//!
//! # Modules
//!
//! - `engine`: The engine seam, its lifecycle manager and backends
//! - `registry`: `PdfCore`, the per-caller registry of open documents
//! - `render`: Surface binding, background fills and form overlays
//! - `host`: Integer-handle boundary for host runtimes
//!
//! # Usage
//!
//! ```rust,ignore
//! use pdf_core::{Config, DocumentSource, EngineLifecycle, MupdfEngine, PdfCore};
//!
//! let lifecycle = EngineLifecycle::shared(MupdfEngine::new());
//! let mut core = PdfCore::new(lifecycle, Config::default());
//!
//! let doc = core.open_document(DocumentSource::from_slice(&bytes), None)?;
//! let page = core.load_page(doc, 0)?;
//! let width = core.page_width_pixels(page, 144);
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod handle;
pub mod host;
pub mod registry;
pub mod render;
pub mod source;
pub mod text;

mod document;
mod navigation;
mod page;

pub use registry::PdfCore;
pub use config::{Config, FormConfig, RenderConfig};
pub use document::DocumentMeta;
pub use engine::{
    Engine, EngineLease, EngineLifecycle, ErrorCode, LifecycleStats, LinkInfo, OutlineItem,
    RenderFlags, TextChar,
};
pub use error::{CoreError, ErrorKind, Result};
pub use geometry::{IRect, Point, PointF, RectF, Rotation, Size, SizeF, Viewport};
pub use handle::{BookmarkHandle, DocumentHandle, Handle, LinkHandle, PageHandle, TextPageHandle};
pub use host::HostBridge;
pub use navigation::{Bookmark, Link};
pub use render::{OwnedSurface, PixelFormat, RenderOutcome, RenderRequest, RenderTarget, SkipReason};
pub use source::DocumentSource;
pub use text::{CharBox, TextPage};

#[cfg(feature = "mupdf")]
pub use engine::MupdfEngine;

#[cfg(any(test, feature = "test-utils"))]
pub use engine::fake::{FakeDocument, FakeEngine, FakePage};
