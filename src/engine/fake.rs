//! Deterministic in-process engine
//!
//! Documents are described in Rust ([`FakeDocument`], [`FakePage`]) and
//! registered with the engine, which hands back the byte string that opens
//! them. Rendering paints flat rectangles through the same display transform
//! a real engine uses, so pixel positions in tests are predictable.
//!
//! The fake draws form widgets in BGRA order and refuses bitmaps in any other
//! order, which makes the channel swap around form drawing observable.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::{
    Engine, ErrorCode, FormCallbacks, LinkInfo, OutlineItem, RenderFlags, TextChar,
};
use crate::geometry::{Matrix, RectF, SizeF, Viewport};
use crate::render::{Bitmap, ChannelOrder, Color};
use crate::source::DocumentSource;
use crate::text::CharBox;

/// Glyph advance used by [`FakePage::text`]
const GLYPH_WIDTH: f64 = 10.0;
const LINE_HEIGHT: f64 = 12.0;

/// A page description
#[derive(Debug, Clone, PartialEq)]
pub struct FakePage {
    pub width: f64,
    pub height: f64,
    /// Page-space rectangles painted as content
    pub content: Vec<(RectF, Color)>,
    /// Painted only when annotations are requested
    pub annotations: Vec<(RectF, Color)>,
    /// Painted by form field drawing
    pub widgets: Vec<(RectF, Color)>,
    pub links: Vec<LinkInfo>,
    /// `None` makes text extraction fail
    pub chars: Option<Vec<TextChar>>,
}

impl FakePage {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            content: Vec::new(),
            annotations: Vec::new(),
            widgets: Vec::new(),
            links: Vec::new(),
            chars: Some(Vec::new()),
        }
    }

    pub fn content(mut self, rect: RectF, color: Color) -> Self {
        self.content.push((rect, color));
        self
    }

    pub fn annotation(mut self, rect: RectF, color: Color) -> Self {
        self.annotations.push((rect, color));
        self
    }

    pub fn widget(mut self, rect: RectF, color: Color) -> Self {
        self.widgets.push((rect, color));
        self
    }

    pub fn link(mut self, link: LinkInfo) -> Self {
        self.links.push(link);
        self
    }

    /// Lay `text` out from the top-left corner, one glyph box per character
    ///
    /// Each `\n` starts a new line and is recorded as a generated character.
    pub fn text(mut self, text: &str) -> Self {
        let mut chars = Vec::new();
        for (line, content) in text.split('\n').enumerate() {
            let top = self.height - line as f64 * LINE_HEIGHT;
            if line > 0 {
                chars.push(TextChar {
                    unicode: '\n' as u32,
                    bounds: CharBox::default(),
                    line: line as u32 - 1,
                    generated: true,
                });
            }
            for (column, ch) in content.chars().enumerate() {
                let left = column as f64 * GLYPH_WIDTH;
                chars.push(TextChar {
                    unicode: ch as u32,
                    bounds: CharBox::new(left, left + GLYPH_WIDTH, top - LINE_HEIGHT, top),
                    line: line as u32,
                    generated: false,
                });
            }
        }
        self.chars = Some(chars);
        self
    }

    pub fn without_text(mut self) -> Self {
        self.chars = None;
        self
    }

    fn size(&self) -> SizeF {
        SizeF::new(self.width, self.height)
    }
}

/// A document description
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FakeDocument {
    pub pages: Vec<FakePage>,
    pub password: Option<String>,
    pub unsupported_security: bool,
    pub outline: Vec<OutlineItem>,
    pub meta: HashMap<String, String>,
}

impl FakeDocument {
    pub fn new(pages: Vec<FakePage>) -> Self {
        Self {
            pages,
            ..Self::default()
        }
    }

    /// `count` US Letter pages
    pub fn with_pages(count: usize) -> Self {
        Self::new(vec![FakePage::new(612.0, 792.0); count])
    }

    pub fn password(mut self, password: &str) -> Self {
        self.password = Some(password.to_string());
        self
    }

    pub fn unsupported_security(mut self) -> Self {
        self.unsupported_security = true;
        self
    }

    pub fn outline(mut self, outline: Vec<OutlineItem>) -> Self {
        self.outline = outline;
        self
    }

    pub fn meta(mut self, tag: &str, value: &str) -> Self {
        self.meta.insert(tag.to_string(), value.to_string());
        self
    }
}

/// A loaded page
#[derive(Debug, Clone)]
pub struct FakeLoadedPage {
    pub index: i32,
    pub page: FakePage,
}

/// A form-fill environment
#[derive(Debug, Clone)]
pub struct FakeForm {
    pub callbacks: FormCallbacks,
    pub document_actions: usize,
}

#[derive(Debug, Default)]
struct Counters {
    init: usize,
    destroy: usize,
    load: usize,
    page_load: usize,
}

/// In-process engine for tests and benchmarks
#[derive(Default)]
pub struct FakeEngine {
    documents: Mutex<HashMap<Vec<u8>, Arc<FakeDocument>>>,
    counters: Mutex<Counters>,
    events: Mutex<Vec<String>>,
    form_unavailable: AtomicBool,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `doc` openable; returns the bytes that open it
    pub fn register(&self, doc: FakeDocument) -> Vec<u8> {
        let mut documents = self.documents.lock();
        let bytes = format!("%PDF-1.7 fake document {}", documents.len()).into_bytes();
        documents.insert(bytes.clone(), Arc::new(doc));
        bytes
    }

    /// Make form environment creation fail from now on
    pub fn set_form_unavailable(&self, unavailable: bool) {
        self.form_unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn init_calls(&self) -> usize {
        self.counters.lock().init
    }

    pub fn destroy_calls(&self) -> usize {
        self.counters.lock().destroy
    }

    pub fn load_calls(&self) -> usize {
        self.counters.lock().load
    }

    pub fn page_load_calls(&self) -> usize {
        self.counters.lock().page_load
    }

    /// Form-related calls in the order they happened
    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    fn record(&self, event: String) {
        self.events.lock().push(event);
    }

    fn paint(
        bitmap: &mut Bitmap<'_>,
        page: &FakePage,
        viewport: &Viewport,
        rects: &[(RectF, Color)],
    ) {
        let matrix = Matrix::display(page.size(), viewport);
        for (rect, color) in rects {
            let (x0, y0) = matrix.transform(rect.left, rect.top);
            let (x1, y1) = matrix.transform(rect.right, rect.bottom);
            let left = x0.min(x1).round() as i32;
            let top = y0.min(y1).round() as i32;
            let right = x0.max(x1).round() as i32;
            let bottom = y0.max(y1).round() as i32;
            bitmap.fill_rect(left, top, right - left, bottom - top, *color);
        }
    }
}

impl Engine for FakeEngine {
    type Document = Arc<FakeDocument>;
    type Page = FakeLoadedPage;
    type Form = FakeForm;

    fn name(&self) -> &'static str {
        "fake"
    }

    fn init_library(&self) {
        self.counters.lock().init += 1;
    }

    fn destroy_library(&self) {
        self.counters.lock().destroy += 1;
    }

    fn load_document(
        &self,
        source: &DocumentSource,
        password: Option<&str>,
    ) -> Result<Self::Document, ErrorCode> {
        self.counters.lock().load += 1;

        let bytes = source.read_all().map_err(|_| ErrorCode::File)?;
        let doc = self
            .documents
            .lock()
            .get(&bytes[..])
            .cloned()
            .ok_or(ErrorCode::Format)?;

        if doc.unsupported_security {
            return Err(ErrorCode::Security);
        }
        if let Some(expected) = &doc.password {
            if password != Some(expected.as_str()) {
                return Err(ErrorCode::Password);
            }
        }
        Ok(doc)
    }

    fn page_count(&self, doc: &Self::Document) -> i32 {
        doc.pages.len() as i32
    }

    fn page_size_by_index(&self, doc: &Self::Document, index: i32) -> Option<SizeF> {
        let index = usize::try_from(index).ok()?;
        doc.pages.get(index).map(FakePage::size)
    }

    fn meta_text(&self, doc: &Self::Document, tag: &str) -> Option<String> {
        doc.meta.get(tag).cloned()
    }

    fn load_page(&self, doc: &Self::Document, index: i32) -> Option<Self::Page> {
        self.counters.lock().page_load += 1;
        let page = doc.pages.get(usize::try_from(index).ok()?)?;
        Some(FakeLoadedPage {
            index,
            page: page.clone(),
        })
    }

    fn page_size(&self, page: &Self::Page) -> SizeF {
        page.page.size()
    }

    fn render_page(
        &self,
        page: &Self::Page,
        bitmap: &mut Bitmap<'_>,
        viewport: &Viewport,
        flags: RenderFlags,
    ) -> Result<(), ErrorCode> {
        Self::paint(bitmap, &page.page, viewport, &page.page.content);
        if flags.annotations {
            Self::paint(bitmap, &page.page, viewport, &page.page.annotations);
        }
        Ok(())
    }

    fn init_form_environment(
        &self,
        _doc: &Self::Document,
        callbacks: &FormCallbacks,
    ) -> Option<Self::Form> {
        if self.form_unavailable.load(Ordering::SeqCst) {
            self.record("init_form_failed".to_string());
            return None;
        }
        self.record("init_form".to_string());
        Some(FakeForm {
            callbacks: *callbacks,
            document_actions: 0,
        })
    }

    fn do_document_actions(&self, form: &mut Self::Form) {
        form.document_actions += 1;
        self.record("document_actions".to_string());
    }

    fn on_after_load_page(&self, _form: &mut Self::Form, page: &Self::Page) {
        self.record(format!("after_load_page:{}", page.index));
    }

    fn do_page_open_action(&self, _form: &mut Self::Form, page: &Self::Page) {
        self.record(format!("page_open_action:{}", page.index));
    }

    fn draw_form_fields(
        &self,
        _form: &Self::Form,
        page: &Self::Page,
        bitmap: &mut Bitmap<'_>,
        viewport: &Viewport,
        _flags: RenderFlags,
    ) -> Result<(), ErrorCode> {
        if bitmap.order() != ChannelOrder::Bgra {
            self.record("draw_form_fields_wrong_order".to_string());
            return Err(ErrorCode::Unknown);
        }
        Self::paint(bitmap, &page.page, viewport, &page.page.widgets);
        self.record(format!("draw_form_fields:{}", page.index));
        Ok(())
    }

    fn form_channel_order(&self) -> ChannelOrder {
        ChannelOrder::Bgra
    }

    fn outline(&self, doc: &Self::Document) -> Vec<OutlineItem> {
        doc.outline.clone()
    }

    fn page_links(&self, page: &Self::Page) -> Vec<LinkInfo> {
        page.page.links.clone()
    }

    fn extract_text(&self, page: &Self::Page) -> Option<Vec<TextChar>> {
        page.page.chars.clone()
    }
}
