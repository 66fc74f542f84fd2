//! MuPDF backend
//!
//! Pages are run through a draw device into a pixmap covering only the
//! visible part of the caller's viewport, then blended onto the target
//! bitmap. Content and annotations go in one pass, form widgets in another.
//! MuPDF
//! works in a y-down page space; everything handed back to the core is
//! converted to PDF user space (origin bottom-left).

use mupdf::{Colorspace, Device, Document, MetadataName, Page, Pixmap, TextPageOptions};
use tracing::{debug, error, warn};

use super::{
    Engine, ErrorCode, FormCallbacks, LinkInfo, OutlineItem, RenderFlags, TextChar,
};
use crate::geometry::{Matrix, RectF, SizeF, Viewport};
use crate::render::Bitmap;
use crate::source::DocumentSource;
use crate::text::CharBox;

const PDF_MIME: &str = "application/pdf";

/// Engine backed by the `mupdf` crate
#[derive(Debug, Default)]
pub struct MupdfEngine;

impl MupdfEngine {
    pub fn new() -> Self {
        Self
    }
}

/// Loaded page plus its bounds in MuPDF space
pub struct MupdfPage {
    page: Page,
    x0: f64,
    y0: f64,
    size: SizeF,
}

impl MupdfPage {
    fn new(page: Page) -> Option<Self> {
        let bounds = page
            .bounds()
            .map_err(|e| error!("cannot read page bounds: {}", e))
            .ok()?;
        Some(Self {
            page,
            x0: bounds.x0 as f64,
            y0: bounds.y0 as f64,
            size: SizeF::new(
                (bounds.x1 - bounds.x0) as f64,
                (bounds.y1 - bounds.y0) as f64,
            ),
        })
    }

    /// Maps MuPDF page space onto PDF user space
    fn flip(&self) -> Matrix {
        Matrix::new(1.0, 0.0, 0.0, -1.0, -self.x0, self.size.height + self.y0)
    }

    fn to_user_y(&self, y: f32) -> f64 {
        self.size.height - (y as f64 - self.y0)
    }

    fn to_user_x(&self, x: f32) -> f64 {
        x as f64 - self.x0
    }
}

/// MuPDF has no separate form-fill environment; widgets are drawn in their
/// own pass and scripts are not run.
pub struct MupdfForm {
    callbacks: FormCallbacks,
}

/// Which part of a page a rasterization pass draws
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layer {
    /// Page content, plus non-widget annotations when set
    Content { annotations: bool },
    /// Form widgets only, over a transparent background
    Widgets,
}

fn page_error(what: &'static str) -> impl Fn(mupdf::Error) -> ErrorCode {
    move |e| {
        error!("{} failed: {}", what, e);
        ErrorCode::Page
    }
}

impl MupdfEngine {
    /// Draw one layer of `page` into the part of `bitmap` covered by
    /// `viewport`
    ///
    /// Only the visible part of the viewport is rasterized, so the pixmap is
    /// never larger than the bitmap however far the page is zoomed.
    fn rasterize(
        &self,
        page: &MupdfPage,
        bitmap: &mut Bitmap<'_>,
        viewport: &Viewport,
        layer: Layer,
    ) -> Result<(), ErrorCode> {
        if page.size.is_empty() {
            return Ok(());
        }
        let Some(visible) = viewport.visible_in(bitmap.width(), bitmap.height()) else {
            return Ok(());
        };

        let ctm = page
            .flip()
            .then(&Matrix::display(page.size, viewport))
            .then(&Matrix::translate(-visible.left as f64, -visible.top as f64));
        let ctm = mupdf::Matrix::new(
            ctm.a as f32,
            ctm.b as f32,
            ctm.c as f32,
            ctm.d as f32,
            ctm.e as f32,
            ctm.f as f32,
        );

        let width = (visible.right - visible.left) as u32;
        let height = (visible.bottom - visible.top) as u32;
        let mut pixmap = Pixmap::new_with_w_h(
            &Colorspace::device_rgb(),
            width as i32,
            height as i32,
            true,
        )
        .map_err(page_error("pixmap allocation"))?;
        pixmap.clear().map_err(page_error("pixmap clear"))?;

        {
            let device = Device::from_pixmap(&pixmap).map_err(page_error("draw device"))?;
            match layer {
                Layer::Content { annotations } => {
                    page.page
                        .run_contents(&device, &ctm)
                        .map_err(page_error("content rasterization"))?;
                    if annotations {
                        page.page
                            .run_annotations(&device, &ctm)
                            .map_err(page_error("annotation rasterization"))?;
                    }
                }
                Layer::Widgets => page
                    .page
                    .run_widgets(&device, &ctm)
                    .map_err(page_error("widget rasterization"))?,
            }
        }

        if pixmap.n() as usize != 4 {
            error!("unexpected pixmap component count {}", pixmap.n());
            return Err(ErrorCode::Unknown);
        }
        bitmap.composite_premultiplied(
            pixmap.samples(),
            width,
            height,
            width as usize * 4,
            visible.left,
            visible.top,
        );
        Ok(())
    }
}

// MuPDF `fz_error_type` codes
const FZ_ERROR_GENERIC: i32 = 1;
const FZ_ERROR_SYSTEM: i32 = 2;
const FZ_ERROR_UNSUPPORTED: i32 = 6;
const FZ_ERROR_FORMAT: i32 = 7;
const FZ_ERROR_SYNTAX: i32 = 8;

fn classify_open_error(err: &mupdf::Error) -> ErrorCode {
    match err {
        mupdf::Error::Io(_) => ErrorCode::File,
        mupdf::Error::MuPdf(e) => classify_error_code(e.code),
        _ => ErrorCode::Unknown,
    }
}

fn classify_error_code(code: i32) -> ErrorCode {
    match code {
        FZ_ERROR_SYSTEM => ErrorCode::File,
        FZ_ERROR_UNSUPPORTED => ErrorCode::Security,
        FZ_ERROR_GENERIC | FZ_ERROR_FORMAT | FZ_ERROR_SYNTAX => ErrorCode::Format,
        _ => ErrorCode::Unknown,
    }
}

fn metadata_name(tag: &str) -> Option<MetadataName> {
    Some(match tag {
        "Title" => MetadataName::Title,
        "Author" => MetadataName::Author,
        "Subject" => MetadataName::Subject,
        "Keywords" => MetadataName::Keywords,
        "Creator" => MetadataName::Creator,
        "Producer" => MetadataName::Producer,
        "CreationDate" => MetadataName::CreationDate,
        "ModDate" => MetadataName::ModDate,
        _ => return None,
    })
}

fn is_external(uri: &str) -> bool {
    uri.contains("://") || uri.starts_with("mailto:")
}

fn convert_outlines(outlines: &[mupdf::Outline]) -> Vec<OutlineItem> {
    outlines
        .iter()
        .map(|outline| OutlineItem {
            title: outline.title.clone(),
            dest_page: outline.page.map(|p| p as i32),
            children: convert_outlines(&outline.down),
        })
        .collect()
}

impl Engine for MupdfEngine {
    type Document = Document;
    type Page = MupdfPage;
    type Form = MupdfForm;

    fn name(&self) -> &'static str {
        "mupdf"
    }

    fn init_library(&self) {
        // Contexts are created per thread by the mupdf crate
        debug!("MuPDF library ready");
    }

    fn destroy_library(&self) {
        debug!("MuPDF library released");
    }

    fn load_document(
        &self,
        source: &DocumentSource,
        password: Option<&str>,
    ) -> Result<Self::Document, ErrorCode> {
        let data = source.read_all().map_err(|e| {
            error!("cannot read document source: {}", e);
            ErrorCode::File
        })?;

        let mut doc = Document::from_bytes(&data, PDF_MIME).map_err(|e| {
            let code = classify_open_error(&e);
            error!("cannot open document: {} ({:?})", e, code);
            code
        })?;

        let needs_password = doc.needs_password().map_err(|e| {
            error!("cannot query document security: {}", e);
            ErrorCode::Security
        })?;
        if needs_password {
            let authenticated = doc
                .authenticate(password.unwrap_or_default())
                .map_err(|e| {
                    error!("authentication failed: {}", e);
                    ErrorCode::Security
                })?;
            if !authenticated {
                return Err(ErrorCode::Password);
            }
        }
        Ok(doc)
    }

    fn page_count(&self, doc: &Self::Document) -> i32 {
        doc.page_count().unwrap_or_else(|e| {
            error!("cannot count pages: {}", e);
            0
        })
    }

    fn page_size_by_index(&self, doc: &Self::Document, index: i32) -> Option<SizeF> {
        self.load_page(doc, index).map(|page| page.size)
    }

    fn meta_text(&self, doc: &Self::Document, tag: &str) -> Option<String> {
        let name = metadata_name(tag)?;
        doc.metadata(name).ok().filter(|s| !s.is_empty())
    }

    fn load_page(&self, doc: &Self::Document, index: i32) -> Option<Self::Page> {
        if index < 0 {
            return None;
        }
        let page = doc
            .load_page(index)
            .map_err(|e| warn!("cannot load page {}: {}", index, e))
            .ok()?;
        MupdfPage::new(page)
    }

    fn page_size(&self, page: &Self::Page) -> SizeF {
        page.size
    }

    fn render_page(
        &self,
        page: &Self::Page,
        bitmap: &mut Bitmap<'_>,
        viewport: &Viewport,
        flags: RenderFlags,
    ) -> Result<(), ErrorCode> {
        self.rasterize(
            page,
            bitmap,
            viewport,
            Layer::Content {
                annotations: flags.annotations,
            },
        )
    }

    fn init_form_environment(
        &self,
        _doc: &Self::Document,
        callbacks: &FormCallbacks,
    ) -> Option<Self::Form> {
        debug!("Form environment created with {:?}", callbacks);
        Some(MupdfForm {
            callbacks: *callbacks,
        })
    }

    fn do_document_actions(&self, _form: &mut Self::Form) {
        debug!("Document scripts are not executed by the MuPDF backend");
    }

    fn on_after_load_page(&self, _form: &mut Self::Form, _page: &Self::Page) {}

    fn do_page_open_action(&self, _form: &mut Self::Form, _page: &Self::Page) {}

    fn draw_form_fields(
        &self,
        form: &Self::Form,
        page: &Self::Page,
        bitmap: &mut Bitmap<'_>,
        viewport: &Viewport,
        _flags: RenderFlags,
    ) -> Result<(), ErrorCode> {
        if form.callbacks.highlight_alpha > 0 {
            debug!("Widget highlight is not supported by the MuPDF backend");
        }
        self.rasterize(page, bitmap, viewport, Layer::Widgets)
    }

    fn outline(&self, doc: &Self::Document) -> Vec<OutlineItem> {
        match doc.outlines() {
            Ok(outlines) => convert_outlines(&outlines),
            Err(e) => {
                warn!("cannot read outline: {}", e);
                Vec::new()
            }
        }
    }

    fn page_links(&self, page: &Self::Page) -> Vec<LinkInfo> {
        let links = match page.page.links() {
            Ok(links) => links,
            Err(e) => {
                warn!("cannot read page links: {}", e);
                return Vec::new();
            }
        };

        links
            .map(|link| {
                let rect = RectF::new(
                    page.to_user_x(link.bounds.x0),
                    page.to_user_y(link.bounds.y0),
                    page.to_user_x(link.bounds.x1),
                    page.to_user_y(link.bounds.y1),
                );
                if is_external(&link.uri) {
                    LinkInfo {
                        rect: Some(rect),
                        uri: Some(link.uri),
                        dest_page: None,
                    }
                } else {
                    LinkInfo {
                        rect: Some(rect),
                        uri: None,
                        dest_page: Some(link.page as i32),
                    }
                }
            })
            .collect()
    }

    fn extract_text(&self, page: &Self::Page) -> Option<Vec<TextChar>> {
        let text_page = page
            .page
            .to_text_page(TextPageOptions::empty())
            .map_err(|e| error!("cannot build text page: {}", e))
            .ok()?;

        let mut chars = Vec::new();
        let mut line_no = 0u32;
        for block in text_page.blocks() {
            for line in block.lines() {
                if !chars.is_empty() {
                    // Line break between consecutive lines
                    let previous: &TextChar = &chars[chars.len() - 1];
                    chars.push(TextChar {
                        unicode: '\n' as u32,
                        bounds: previous.bounds,
                        line: previous.line,
                        generated: true,
                    });
                }

                for ch in line.chars() {
                    let Some(c) = ch.char() else {
                        continue;
                    };
                    let quad = ch.quad();
                    let left = quad.ul.x.min(quad.ll.x);
                    let right = quad.ur.x.max(quad.lr.x);
                    let top = quad.ul.y.min(quad.ur.y);
                    let bottom = quad.ll.y.max(quad.lr.y);

                    chars.push(TextChar {
                        unicode: c as u32,
                        bounds: CharBox::new(
                            page.to_user_x(left),
                            page.to_user_x(right),
                            page.to_user_y(bottom),
                            page.to_user_y(top),
                        ),
                        line: line_no,
                        generated: false,
                    });
                }
                line_no += 1;
            }
        }
        Some(chars)
    }
}
