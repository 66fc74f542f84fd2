//! Integer-handle boundary
//!
//! Hosts that cannot hold typed handles (managed runtimes, FFI callers) talk
//! to [`HostBridge`]. It maps non-zero `u64` ids to typed [`Handle`]s and
//! answers every query with a neutral value (`-1`, empty string, `None`,
//! `{0, 0}`) when an id is unknown or stale.

use std::collections::HashMap;
use std::fs::File;

use crate::engine::Engine;
use crate::error::{CoreError, Result};
use crate::geometry::{Point, PointF, RectF, Rotation, Size, Viewport};
use crate::handle::{BookmarkHandle, DocumentHandle, Handle, LinkHandle, PageHandle, TextPageHandle};
use crate::registry::PdfCore;
use crate::render::{RenderOutcome, RenderRequest, RenderTarget, SkipReason};

/// Host-facing facade over a [`PdfCore`]
pub struct HostBridge<E: Engine> {
    core: PdfCore<E>,
    ids: HashMap<u64, Handle>,
    reverse: HashMap<Handle, u64>,
    next_id: u64,
}

impl<E: Engine> HostBridge<E> {
    pub fn new(core: PdfCore<E>) -> Self {
        Self {
            core,
            ids: HashMap::new(),
            reverse: HashMap::new(),
            next_id: 1,
        }
    }

    pub fn core(&self) -> &PdfCore<E> {
        &self.core
    }

    pub fn core_mut(&mut self) -> &mut PdfCore<E> {
        &mut self.core
    }

    /// Number of live ids
    pub fn handle_count(&self) -> usize {
        self.ids.len()
    }

    /// Typed handle behind an id
    pub fn resolve(&self, id: u64) -> Option<Handle> {
        self.ids.get(&id).copied()
    }

    fn register(&mut self, handle: impl Into<Handle>) -> u64 {
        let handle = handle.into();
        if let Some(id) = self.reverse.get(&handle) {
            return *id;
        }
        let id = self.next_id;
        self.next_id += 1;
        self.ids.insert(id, handle);
        self.reverse.insert(handle, id);
        id
    }

    /// Drop ids whose objects no longer exist
    fn forget_stale(&mut self) {
        let core = &self.core;
        let reverse = &mut self.reverse;
        self.ids.retain(|_, handle| {
            let live = core.contains(*handle);
            if !live {
                reverse.remove(handle);
            }
            live
        });
    }

    fn document(&self, id: u64) -> Option<DocumentHandle> {
        match self.resolve(id) {
            Some(Handle::Document(doc)) => Some(doc),
            _ => {
                tracing::warn!("Id {} is not a document", id);
                None
            }
        }
    }

    fn page(&self, id: u64) -> Option<PageHandle> {
        match self.resolve(id) {
            Some(Handle::Page(page)) => Some(page),
            _ => {
                tracing::warn!("Id {} is not a page", id);
                None
            }
        }
    }

    fn text_page(&self, id: u64) -> Option<TextPageHandle> {
        match self.resolve(id) {
            Some(Handle::TextPage(text)) => Some(text),
            _ => {
                tracing::warn!("Id {} is not a text page", id);
                None
            }
        }
    }

    fn bookmark(&self, id: u64) -> Option<BookmarkHandle> {
        match self.resolve(id) {
            Some(Handle::Bookmark(bookmark)) => Some(bookmark),
            _ => None,
        }
    }

    fn link(&self, id: u64) -> Option<LinkHandle> {
        match self.resolve(id) {
            Some(Handle::Link(link)) => Some(link),
            _ => None,
        }
    }

    fn unknown(id: u64) -> CoreError {
        CoreError::InvalidHandle(format!("id {}", id))
    }

    // Documents

    pub fn open_document_file(&mut self, file: File, password: Option<&str>) -> Result<u64> {
        let doc = self.core.open_file(file, password)?;
        Ok(self.register(doc))
    }

    pub fn open_mem_document(&mut self, bytes: &[u8], password: Option<&str>) -> Result<u64> {
        let doc = self.core.open_memory(bytes, password)?;
        Ok(self.register(doc))
    }

    pub fn close_document(&mut self, doc: u64) -> bool {
        let Some(handle) = self.document(doc) else {
            return false;
        };
        let closed = self.core.close_document(handle);
        self.forget_stale();
        closed
    }

    pub fn get_page_count(&self, doc: u64) -> i32 {
        self.document(doc)
            .and_then(|doc| self.core.page_count(doc))
            .unwrap_or(-1)
    }

    pub fn get_document_meta_text(&self, doc: u64, tag: &str) -> String {
        match self.document(doc) {
            Some(doc) => self.core.meta_text(doc, tag),
            None => String::new(),
        }
    }

    // Pages

    pub fn load_page(&mut self, doc: u64, index: i32) -> Result<u64> {
        let handle = self.document(doc).ok_or_else(|| Self::unknown(doc))?;
        let page = self.core.load_page(handle, index)?;
        Ok(self.register(page))
    }

    /// Load `from..=to`; stops at the first page that fails
    ///
    /// Pages loaded before the failure are closed again, since their ids
    /// never reach the caller.
    pub fn load_pages(&mut self, doc: u64, from: i32, to: i32) -> Result<Vec<u64>> {
        if to < from {
            return Ok(Vec::new());
        }
        let mut ids = Vec::new();
        for index in from..=to {
            match self.load_page(doc, index) {
                Ok(id) => ids.push(id),
                Err(e) => {
                    self.close_pages(&ids);
                    return Err(e);
                }
            }
        }
        Ok(ids)
    }

    pub fn close_page(&mut self, page: u64) -> bool {
        let Some(handle) = self.page(page) else {
            return false;
        };
        let closed = self.core.close_page(handle);
        self.forget_stale();
        closed
    }

    pub fn close_pages(&mut self, pages: &[u64]) {
        for page in pages {
            self.close_page(*page);
        }
    }

    pub fn get_page_width_pixel(&self, page: u64, dpi: i32) -> i32 {
        self.page(page)
            .and_then(|page| self.core.page_width_pixels(page, dpi))
            .unwrap_or(-1)
    }

    pub fn get_page_height_pixel(&self, page: u64, dpi: i32) -> i32 {
        self.page(page)
            .and_then(|page| self.core.page_height_pixels(page, dpi))
            .unwrap_or(-1)
    }

    pub fn get_page_width_point(&self, page: u64) -> i32 {
        self.page(page)
            .and_then(|page| self.core.page_width_points(page))
            .unwrap_or(-1)
    }

    pub fn get_page_height_point(&self, page: u64) -> i32 {
        self.page(page)
            .and_then(|page| self.core.page_height_points(page))
            .unwrap_or(-1)
    }

    pub fn get_page_size_by_index(&self, doc: u64, index: i32, dpi: i32) -> Size {
        match self.document(doc) {
            Some(doc) => self.core.page_size_by_index(doc, index, dpi),
            None => Size::default(),
        }
    }

    // Rendering

    pub fn render_page<T>(&self, page: u64, target: &mut T, request: &RenderRequest) -> RenderOutcome
    where
        T: RenderTarget + ?Sized,
    {
        match self.page(page) {
            Some(page) => self.core.render_page(page, target, request),
            None => RenderOutcome::Skipped(SkipReason::InvalidHandle),
        }
    }

    pub fn render_page_with_forms<T>(
        &mut self,
        doc: u64,
        page: u64,
        target: &mut T,
        request: &RenderRequest,
    ) -> RenderOutcome
    where
        T: RenderTarget + ?Sized,
    {
        match (self.document(doc), self.page(page)) {
            (Some(doc), Some(page)) => self.core.render_page_with_forms(doc, page, target, request),
            _ => RenderOutcome::Skipped(SkipReason::InvalidHandle),
        }
    }

    // Bookmarks

    /// First top-level bookmark (`parent == None`) or first child of `parent`
    pub fn get_first_child_bookmark(&mut self, doc: u64, parent: Option<u64>) -> Option<u64> {
        let doc = self.document(doc)?;
        let parent = match parent {
            Some(id) => Some(self.bookmark(id)?),
            None => None,
        };
        let child = self.core.first_child_bookmark(doc, parent)?;
        Some(self.register(child))
    }

    pub fn get_sibling_bookmark(&mut self, doc: u64, bookmark: u64) -> Option<u64> {
        let doc = self.document(doc)?;
        let bookmark = self.bookmark(bookmark)?;
        let sibling = self.core.next_sibling_bookmark(doc, bookmark)?;
        Some(self.register(sibling))
    }

    pub fn get_bookmark_title(&self, bookmark: u64) -> String {
        match self.bookmark(bookmark) {
            Some(bookmark) => self.core.bookmark_title(bookmark),
            None => String::new(),
        }
    }

    pub fn get_bookmark_dest_index(&self, doc: u64, bookmark: u64) -> i32 {
        match (self.document(doc), self.bookmark(bookmark)) {
            (Some(doc), Some(bookmark)) => self.core.bookmark_dest_index(doc, bookmark),
            _ => -1,
        }
    }

    // Links

    pub fn get_page_links(&mut self, page: u64) -> Vec<u64> {
        let Some(page) = self.page(page) else {
            return Vec::new();
        };
        self.core
            .page_link_handles(page)
            .into_iter()
            .map(|link| self.register(link))
            .collect()
    }

    pub fn get_dest_page_index(&self, doc: u64, link: u64) -> Option<i32> {
        let doc = self.document(doc)?;
        self.core.link_dest_page_index(doc, self.link(link)?)
    }

    pub fn get_link_uri(&self, doc: u64, link: u64) -> String {
        match (self.document(doc), self.link(link)) {
            (Some(doc), Some(link)) => self.core.link_uri(doc, link),
            _ => String::new(),
        }
    }

    pub fn get_link_rect(&self, link: u64) -> Option<RectF> {
        self.core.link_rect(self.link(link)?)
    }

    // Coordinates

    #[allow(clippy::too_many_arguments)]
    pub fn page_coords_to_device(
        &self,
        page: u64,
        start_x: i32,
        start_y: i32,
        size_x: i32,
        size_y: i32,
        rotate: i32,
        page_x: f64,
        page_y: f64,
    ) -> Option<Point> {
        let viewport = Viewport::new(start_x, start_y, size_x, size_y)
            .with_rotation(Rotation::from_quarter_turns(rotate));
        self.core
            .page_to_device(self.page(page)?, &viewport, PointF::new(page_x, page_y))
    }

    #[allow(clippy::too_many_arguments)]
    pub fn device_coords_to_page(
        &self,
        page: u64,
        start_x: i32,
        start_y: i32,
        size_x: i32,
        size_y: i32,
        rotate: i32,
        device_x: i32,
        device_y: i32,
    ) -> Option<PointF> {
        let viewport = Viewport::new(start_x, start_y, size_x, size_y)
            .with_rotation(Rotation::from_quarter_turns(rotate));
        self.core
            .device_to_page(self.page(page)?, &viewport, Point::new(device_x, device_y))
    }

    // Text

    pub fn load_text_page(&mut self, doc: u64, page: u64) -> Result<u64> {
        let doc = self.document(doc).ok_or_else(|| Self::unknown(doc))?;
        let page_handle = self.page(page).ok_or_else(|| Self::unknown(page))?;
        let text = self.core.load_text_page(doc, page_handle)?;
        Ok(self.register(text))
    }

    /// Text pages for the page range `from..=to`
    pub fn load_text_pages(&mut self, doc: u64, from: i32, to: i32) -> Result<Vec<u64>> {
        let handle = self.document(doc).ok_or_else(|| Self::unknown(doc))?;
        if to < from {
            return Ok(Vec::new());
        }
        let mut ids = Vec::new();
        for index in from..=to {
            match self.core.load_text_pages(handle, index, index) {
                Ok(texts) => ids.extend(texts.into_iter().map(|text| self.register(text))),
                Err(e) => {
                    self.close_text_pages(&ids);
                    return Err(e);
                }
            }
        }
        Ok(ids)
    }

    pub fn close_text_page(&mut self, text: u64) -> bool {
        let Some(handle) = self.text_page(text) else {
            return false;
        };
        let closed = self.core.close_text_page(handle);
        self.forget_stale();
        closed
    }

    pub fn close_text_pages(&mut self, texts: &[u64]) {
        for text in texts {
            self.close_text_page(*text);
        }
    }

    pub fn text_count_chars(&self, text: u64) -> i32 {
        self.text_page(text)
            .and_then(|text| self.core.text_page(text))
            .map(|page| page.count_chars() as i32)
            .unwrap_or(-1)
    }

    pub fn text_get_unicode(&self, text: u64, index: i32) -> Option<u32> {
        self.core.text_page(self.text_page(text)?)?.unicode(index)
    }

    /// Character box as `[left, right, bottom, top]`
    pub fn text_get_char_box(&self, text: u64, index: i32) -> Option<[f64; 4]> {
        let bounds = self.core.text_page(self.text_page(text)?)?.char_box(index)?;
        Some([bounds.left, bounds.right, bounds.bottom, bounds.top])
    }

    pub fn text_get_char_index(
        &self,
        text: u64,
        x: f64,
        y: f64,
        x_tolerance: f64,
        y_tolerance: f64,
    ) -> i32 {
        self.text_page(text)
            .and_then(|text| self.core.text_page(text))
            .and_then(|page| page.char_index_at_pos(x, y, x_tolerance, y_tolerance))
            .map(|index| index as i32)
            .unwrap_or(-1)
    }

    /// UTF-16 text of a character range plus a terminating NUL; returns the
    /// number of units written
    pub fn text_get_text(&self, text: u64, start: i32, count: i32, out: &mut [u16]) -> i32 {
        self.text_page(text)
            .and_then(|text| self.core.text_page(text))
            .map(|page| page.text_range(start, count, out) as i32)
            .unwrap_or(-1)
    }

    /// Text inside a page-space rectangle; returns the full required length
    /// even when `out` is too small
    pub fn text_get_bounded_text(&self, text: u64, rect: RectF, out: Option<&mut [u16]>) -> i32 {
        self.text_page(text)
            .and_then(|text| self.core.text_page(text))
            .map(|page| page.bounded_text(rect, out) as i32)
            .unwrap_or(-1)
    }

    pub fn text_count_rects(&mut self, text: u64, start: i32, count: i32) -> i32 {
        let Some(handle) = self.text_page(text) else {
            return -1;
        };
        self.core
            .text_page_mut(handle)
            .map(|page| page.count_rects(start, count) as i32)
            .unwrap_or(-1)
    }

    pub fn text_get_rect(&self, text: u64, index: i32) -> Option<RectF> {
        self.core.text_page(self.text_page(text)?)?.rect(index)
    }
}
