//! Page and text-page handle sets
//!
//! Pages and text pages are children of a document. Batch loads go in index
//! order and stop at the first failure; handles produced before the failing
//! index stay valid until they are closed or their document is.

use crate::engine::Engine;
use crate::error::{CoreError, Result};
use crate::geometry::{points_to_pixels, Size, SizeF};
use crate::handle::{DocumentHandle, PageHandle, TextPageHandle};
use crate::registry::{invalid, PageEntry, PdfCore, TextPageEntry};
use crate::text::TextPage;

impl<E: Engine> PdfCore<E> {
    /// Load page `index` (zero-based) as a new handle
    pub fn load_page(&mut self, doc: DocumentHandle, index: i32) -> Result<PageHandle> {
        let engine = self.lifecycle.engine();
        let entry = self.documents.get_mut(doc.0).ok_or_else(|| invalid(doc))?;

        let native = engine.load_page(&entry.native, index).ok_or_else(|| {
            tracing::error!("cannot load page {} of document {}", index, doc.0);
            CoreError::PageLoad { index }
        })?;

        let slot = entry.pages.insert(PageEntry {
            native,
            index,
            form_opened: false,
            links: None,
        });
        Ok(PageHandle {
            document: doc,
            slot,
        })
    }

    /// Load the inclusive range `from..=to`
    ///
    /// An empty range (`to < from`) loads nothing.
    pub fn load_pages(
        &mut self,
        doc: DocumentHandle,
        from: i32,
        to: i32,
    ) -> Result<Vec<PageHandle>> {
        if to < from {
            return Ok(Vec::new());
        }
        (from..=to).map(|index| self.load_page(doc, index)).collect()
    }

    /// Handle for page `index`, reusing an already loaded one
    pub fn open_page(&mut self, doc: DocumentHandle, index: i32) -> Result<PageHandle> {
        let entry = self.documents.get(doc.0).ok_or_else(|| invalid(doc))?;
        let cached = entry
            .pages
            .iter()
            .find(|(_, page)| page.index == index)
            .map(|(slot, _)| slot);

        match cached {
            Some(slot) => Ok(PageHandle {
                document: doc,
                slot,
            }),
            None => self.load_page(doc, index),
        }
    }

    /// Release a page along with text pages and links taken from it
    pub fn close_page(&mut self, page: PageHandle) -> bool {
        let Some(entry) = self.documents.get_mut(page.document.0) else {
            tracing::warn!("close_page on page of closed document {}", page.document.0);
            return false;
        };
        if entry.pages.remove(page.slot).is_none() {
            tracing::warn!("close_page on stale page {}", page.slot);
            return false;
        }
        entry.text_pages.remove_where(|text| text.page == Some(page.slot));
        entry.links.remove_where(|link| link.page == page.slot);
        true
    }

    pub fn close_pages(&mut self, pages: &[PageHandle]) {
        for page in pages {
            self.close_page(*page);
        }
    }

    /// Zero-based index the page was loaded from
    pub fn page_index(&self, page: PageHandle) -> Option<i32> {
        self.page(page).map(|entry| entry.index)
    }

    /// Page size in points
    pub fn page_size(&self, page: PageHandle) -> Option<SizeF> {
        let entry = self.page(page)?;
        Some(self.engine().page_size(&entry.native))
    }

    pub fn page_width_points(&self, page: PageHandle) -> Option<i32> {
        self.page_size(page).map(|size| size.width as i32)
    }

    pub fn page_height_points(&self, page: PageHandle) -> Option<i32> {
        self.page_size(page).map(|size| size.height as i32)
    }

    pub fn page_width_pixels(&self, page: PageHandle, dpi: i32) -> Option<i32> {
        self.page_size(page)
            .map(|size| points_to_pixels(size.width, dpi))
    }

    pub fn page_height_pixels(&self, page: PageHandle, dpi: i32) -> Option<i32> {
        self.page_size(page)
            .map(|size| points_to_pixels(size.height, dpi))
    }

    /// Pixel size of page `index` at `dpi` without loading it; `{0, 0}` when
    /// the engine cannot tell
    pub fn page_size_by_index(&self, doc: DocumentHandle, index: i32, dpi: i32) -> Size {
        let Some(entry) = self.document(doc) else {
            return Size::default();
        };
        match self.engine().page_size_by_index(&entry.native, index) {
            Some(size) => size.to_pixels(dpi),
            None => {
                tracing::warn!("Page size for index {} not available", index);
                Size::default()
            }
        }
    }

    /// Build the text index of a loaded page
    pub fn load_text_page(&mut self, doc: DocumentHandle, page: PageHandle) -> Result<TextPageHandle> {
        if page.document != doc {
            return Err(invalid(page));
        }
        let engine = self.lifecycle.engine();
        let entry = self.documents.get_mut(doc.0).ok_or_else(|| invalid(doc))?;
        let page_entry = entry.pages.get(page.slot).ok_or_else(|| invalid(page))?;

        let chars = engine.extract_text(&page_entry.native).ok_or_else(|| {
            tracing::error!("cannot load text page for page {}", page_entry.index);
            CoreError::TextPageLoad
        })?;
        let page_index = page_entry.index;

        let slot = entry.text_pages.insert(TextPageEntry {
            page: Some(page.slot),
            page_index,
            text: TextPage::new(chars),
        });
        Ok(TextPageHandle {
            document: doc,
            slot,
        })
    }

    /// Build text indices for the inclusive page range `from..=to`
    ///
    /// Pages are loaded only for the duration of the extraction.
    pub fn load_text_pages(
        &mut self,
        doc: DocumentHandle,
        from: i32,
        to: i32,
    ) -> Result<Vec<TextPageHandle>> {
        if to < from {
            return Ok(Vec::new());
        }
        let engine = self.lifecycle.engine();
        let entry = self.documents.get_mut(doc.0).ok_or_else(|| invalid(doc))?;

        (from..=to)
            .map(|index| -> Result<TextPageHandle> {
                let chars = engine
                    .load_page(&entry.native, index)
                    .and_then(|native| engine.extract_text(&native))
                    .ok_or_else(|| {
                        tracing::error!("cannot load text page for page {}", index);
                        CoreError::TextPageLoad
                    })?;

                let slot = entry.text_pages.insert(TextPageEntry {
                    page: None,
                    page_index: index,
                    text: TextPage::new(chars),
                });
                Ok(TextPageHandle {
                    document: doc,
                    slot,
                })
            })
            .collect()
    }

    pub fn close_text_page(&mut self, text: TextPageHandle) -> bool {
        let removed = self
            .documents
            .get_mut(text.document.0)
            .and_then(|entry| entry.text_pages.remove(text.slot));
        if removed.is_none() {
            tracing::warn!("close_text_page on stale text page {}", text.slot);
        }
        removed.is_some()
    }

    pub fn close_text_pages(&mut self, texts: &[TextPageHandle]) {
        for text in texts {
            self.close_text_page(*text);
        }
    }

    pub fn text_page(&self, text: TextPageHandle) -> Option<&TextPage> {
        self.text_entry(text).map(|entry| &entry.text)
    }

    pub fn text_page_mut(&mut self, text: TextPageHandle) -> Option<&mut TextPage> {
        self.text_entry_mut(text).map(|entry| &mut entry.text)
    }

    /// Page index a text page was extracted from
    pub fn text_page_index(&self, text: TextPageHandle) -> Option<i32> {
        self.text_entry(text).map(|entry| entry.page_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::engine::fake::{FakeDocument, FakeEngine, FakePage};
    use crate::engine::EngineLifecycle;
    use crate::error::ErrorKind;

    fn open(doc: FakeDocument) -> (PdfCore<FakeEngine>, DocumentHandle) {
        let engine = FakeEngine::new();
        let bytes = engine.register(doc);
        let mut core = PdfCore::new(EngineLifecycle::shared(engine), Config::default());
        let handle = core.open_memory(&bytes, None).unwrap();
        (core, handle)
    }

    #[test]
    fn test_load_pages_empty_range_does_not_load() {
        let (mut core, doc) = open(FakeDocument::with_pages(3));
        assert!(core.load_pages(doc, 2, 1).unwrap().is_empty());
        assert_eq!(core.lifecycle().engine().page_load_calls(), 0);
    }

    #[test]
    fn test_load_pages_fail_fast_keeps_earlier_pages() {
        let (mut core, doc) = open(FakeDocument::with_pages(2));
        let err = core.load_pages(doc, 0, 3).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PageLoadFailure);
        assert_eq!(err.to_string(), "cannot load page");

        // Pages 0 and 1 were loaded before index 2 failed
        let entry = core.documents.get(doc.0).unwrap();
        assert_eq!(entry.pages.len(), 2);
        assert_eq!(core.lifecycle().engine().page_load_calls(), 3);
    }

    #[test]
    fn test_page_sizes() {
        let (mut core, doc) = open(FakeDocument::new(vec![FakePage::new(612.5, 792.0)]));
        let page = core.load_page(doc, 0).unwrap();

        assert_eq!(core.page_width_points(page), Some(612));
        assert_eq!(core.page_width_pixels(page, 72), Some(612));
        assert_eq!(core.page_height_pixels(page, 144), Some(1584));
        assert_eq!(core.page_size_by_index(doc, 0, 144), Size::new(1225, 1584));
        assert_eq!(core.page_size_by_index(doc, 9, 144), Size::new(0, 0));
    }

    #[test]
    fn test_open_page_reuses_handle() {
        let (mut core, doc) = open(FakeDocument::with_pages(2));
        let first = core.open_page(doc, 1).unwrap();
        let again = core.open_page(doc, 1).unwrap();
        assert_eq!(first, again);
        assert_eq!(core.lifecycle().engine().page_load_calls(), 1);
    }

    #[test]
    fn test_close_page_drops_children() {
        let (mut core, doc) = open(FakeDocument::with_pages(1));
        let page = core.load_page(doc, 0).unwrap();
        let text = core.load_text_page(doc, page).unwrap();
        assert!(core.text_page(text).is_some());

        assert!(core.close_page(page));
        assert!(!core.close_page(page));
        assert!(core.text_page(text).is_none());
        assert!(core.page_size(page).is_none());
    }

    #[test]
    fn test_document_close_invalidates_children() {
        let (mut core, doc) = open(FakeDocument::with_pages(2));
        let page = core.load_page(doc, 0).unwrap();
        let texts = core.load_text_pages(doc, 0, 1).unwrap();

        core.close_document(doc);
        assert!(core.page_size(page).is_none());
        assert!(core.text_page(texts[1]).is_none());
        assert!(matches!(
            core.load_page(doc, 0),
            Err(CoreError::InvalidHandle(_))
        ));
    }

    #[test]
    fn test_load_text_page_rejects_foreign_page() {
        let engine = FakeEngine::new();
        let bytes = engine.register(FakeDocument::with_pages(1));
        let mut core = PdfCore::new(EngineLifecycle::shared(engine), Config::default());
        let a = core.open_memory(&bytes, None).unwrap();
        let b = core.open_memory(&bytes, None).unwrap();
        let page_of_a = core.load_page(a, 0).unwrap();

        let err = core.load_text_page(b, page_of_a).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidHandle);
    }

    #[test]
    fn test_text_page_failure() {
        let (mut core, doc) = open(FakeDocument::new(vec![FakePage::new(100.0, 100.0).without_text()]));
        let page = core.load_page(doc, 0).unwrap();
        let err = core.load_text_page(doc, page).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TextPageLoadFailure);
    }
}
