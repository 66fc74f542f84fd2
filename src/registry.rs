//! Document registry
//!
//! `PdfCore` owns every open document together with its child objects.
//! Each document entry holds its pages, text pages, link snapshots, lazily
//! flattened outline and optional form environment in generation-checked
//! arenas, plus the engine lease that keeps the engine initialized.
//!
//! Field order of [`DocumentEntry`] is drop order: children go first, then
//! the form environment, then the native document, and the lease last so the
//! engine is torn down only after everything it owns is gone.

use std::cell::OnceCell;
use std::sync::Arc;

use crate::config::Config;
use crate::engine::{Engine, EngineLease, EngineLifecycle, LinkInfo, OutlineItem};
use crate::error::{CoreError, Result};
use crate::handle::{Arena, DocumentHandle, Handle, PageHandle, Slot, TextPageHandle};
use crate::source::DocumentSource;
use crate::text::TextPage;

pub(crate) struct PageEntry<E: Engine> {
    pub native: E::Page,
    pub index: i32,
    /// Page-level form open actions already replayed
    pub form_opened: bool,
    /// Link snapshot from the first enumeration
    pub links: Option<Vec<Slot>>,
}

pub(crate) struct TextPageEntry {
    /// Page the text came from, when it was loaded through a page handle
    pub page: Option<Slot>,
    pub page_index: i32,
    pub text: TextPage,
}

pub(crate) struct LinkEntry {
    pub page: Slot,
    pub info: LinkInfo,
}

pub(crate) struct OutlineNode {
    pub title: String,
    pub dest_page: Option<i32>,
    pub first_child: Option<u32>,
    pub next_sibling: Option<u32>,
}

/// Outline tree flattened into first-child / next-sibling links
#[derive(Default)]
pub(crate) struct Outline {
    pub first_root: Option<u32>,
    pub nodes: Vec<OutlineNode>,
}

impl Outline {
    pub fn build(items: &[OutlineItem]) -> Self {
        let mut outline = Outline::default();
        outline.first_root = outline.push_siblings(items);
        outline
    }

    /// Append `items` as a sibling chain, returning the first node
    fn push_siblings(&mut self, items: &[OutlineItem]) -> Option<u32> {
        let mut first = None;
        let mut previous: Option<u32> = None;

        for item in items {
            let id = self.nodes.len() as u32;
            self.nodes.push(OutlineNode {
                title: item.title.clone(),
                dest_page: item.dest_page,
                first_child: None,
                next_sibling: None,
            });
            let first_child = self.push_siblings(&item.children);
            self.nodes[id as usize].first_child = first_child;

            match previous {
                Some(prev) => self.nodes[prev as usize].next_sibling = Some(id),
                None => first = Some(id),
            }
            previous = Some(id);
        }
        first
    }

    pub fn node(&self, id: u32) -> Option<&OutlineNode> {
        self.nodes.get(id as usize)
    }
}

pub(crate) struct DocumentEntry<E: Engine> {
    pub links: Arena<LinkEntry>,
    pub text_pages: Arena<TextPageEntry>,
    pub pages: Arena<PageEntry<E>>,
    pub outline: OnceCell<Outline>,
    pub form: Option<E::Form>,
    pub native: E::Document,
    pub source_size: u64,
    _lease: EngineLease<E>,
}

/// Registry of open documents
///
/// Handle state is unsynchronized: one `PdfCore` serves one caller (or a
/// caller that serializes access). Several cores may share one
/// [`EngineLifecycle`].
pub struct PdfCore<E: Engine> {
    pub(crate) lifecycle: Arc<EngineLifecycle<E>>,
    pub(crate) config: Config,
    pub(crate) documents: Arena<DocumentEntry<E>>,
}

impl<E: Engine> PdfCore<E> {
    pub fn new(lifecycle: Arc<EngineLifecycle<E>>, config: Config) -> Self {
        Self {
            lifecycle,
            config,
            documents: Arena::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn lifecycle(&self) -> &Arc<EngineLifecycle<E>> {
        &self.lifecycle
    }

    pub(crate) fn engine(&self) -> &E {
        self.lifecycle.engine()
    }

    /// Open a document from a byte source
    ///
    /// A zero-length source fails before the engine is touched. Any engine
    /// failure releases the engine reference taken for this document before
    /// the error is returned.
    pub fn open_document(
        &mut self,
        source: DocumentSource,
        password: Option<&str>,
    ) -> Result<DocumentHandle> {
        let source_size = source.len();
        if source_size == 0 {
            tracing::warn!("Refusing to open empty document source");
            return Err(CoreError::EmptySource);
        }

        let lease = self.lifecycle.acquire();
        let native = match lease.load_document(&source, password) {
            Ok(native) => native,
            Err(code) => {
                drop(lease);
                let err = CoreError::from_open_failure(code);
                tracing::warn!("Failed to open document ({} bytes): {}", source_size, err);
                return Err(err);
            }
        };

        let slot = self.documents.insert(DocumentEntry {
            links: Arena::new(),
            text_pages: Arena::new(),
            pages: Arena::new(),
            outline: OnceCell::new(),
            form: None,
            native,
            source_size,
            _lease: lease,
        });

        tracing::debug!("Opened document {} ({} bytes)", slot, source_size);
        Ok(DocumentHandle(slot))
    }

    /// Open a copy of an in-memory buffer
    pub fn open_memory(&mut self, bytes: &[u8], password: Option<&str>) -> Result<DocumentHandle> {
        self.open_document(DocumentSource::from_slice(bytes), password)
    }

    /// Open a file read in blocks at arbitrary offsets
    pub fn open_file(
        &mut self,
        file: std::fs::File,
        password: Option<&str>,
    ) -> Result<DocumentHandle> {
        self.open_document(DocumentSource::from_file(file)?, password)
    }

    /// Close a document and everything loaded from it
    ///
    /// Returns false for a handle that is already closed.
    pub fn close_document(&mut self, doc: DocumentHandle) -> bool {
        match self.documents.remove(doc.0) {
            Some(entry) => {
                tracing::debug!(
                    "Closing document {} ({} pages, {} text pages open)",
                    doc.0,
                    entry.pages.len(),
                    entry.text_pages.len()
                );
                drop(entry);
                true
            }
            None => {
                tracing::warn!("close_document on stale handle {}", doc.0);
                false
            }
        }
    }

    pub fn is_open(&self, doc: DocumentHandle) -> bool {
        self.documents.contains(doc.0)
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    /// Number of pages, or `None` for a closed document
    pub fn page_count(&self, doc: DocumentHandle) -> Option<i32> {
        let entry = self.document(doc)?;
        Some(self.engine().page_count(&entry.native))
    }

    /// Size of the source the document was opened from
    pub fn source_size(&self, doc: DocumentHandle) -> Option<u64> {
        self.document(doc).map(|entry| entry.source_size)
    }

    /// True when the handle refers to a live object
    pub fn contains(&self, handle: Handle) -> bool {
        let Some(entry) = self.documents.get(handle.document().0) else {
            return false;
        };
        match handle {
            Handle::Document(_) => true,
            Handle::Page(page) => entry.pages.contains(page.slot),
            Handle::TextPage(text) => entry.text_pages.contains(text.slot),
            Handle::Link(link) => entry.links.contains(link.slot),
            Handle::Bookmark(bookmark) => entry
                .outline
                .get()
                .is_some_and(|outline| outline.node(bookmark.node).is_some()),
        }
    }

    pub(crate) fn document(&self, doc: DocumentHandle) -> Option<&DocumentEntry<E>> {
        let entry = self.documents.get(doc.0);
        if entry.is_none() {
            tracing::warn!("Stale document handle {}", doc.0);
        }
        entry
    }

    pub(crate) fn document_mut(&mut self, doc: DocumentHandle) -> Option<&mut DocumentEntry<E>> {
        let entry = self.documents.get_mut(doc.0);
        if entry.is_none() {
            tracing::warn!("Stale document handle {}", doc.0);
        }
        entry
    }

    pub(crate) fn page(&self, page: PageHandle) -> Option<&PageEntry<E>> {
        let entry = self
            .documents
            .get(page.document.0)
            .and_then(|doc| doc.pages.get(page.slot));
        if entry.is_none() {
            tracing::warn!("Stale {}", Handle::from(page));
        }
        entry
    }

    pub(crate) fn text_entry(&self, text: TextPageHandle) -> Option<&TextPageEntry> {
        let entry = self
            .documents
            .get(text.document.0)
            .and_then(|doc| doc.text_pages.get(text.slot));
        if entry.is_none() {
            tracing::warn!("Stale {}", Handle::from(text));
        }
        entry
    }

    pub(crate) fn text_entry_mut(&mut self, text: TextPageHandle) -> Option<&mut TextPageEntry> {
        let entry = self
            .documents
            .get_mut(text.document.0)
            .and_then(|doc| doc.text_pages.get_mut(text.slot));
        if entry.is_none() {
            tracing::warn!("Stale {}", Handle::from(text));
        }
        entry
    }

    /// Outline of a document, flattened on first use
    pub(crate) fn outline(&self, doc: DocumentHandle) -> Option<&Outline> {
        let entry = self.document(doc)?;
        Some(
            entry
                .outline
                .get_or_init(|| Outline::build(&self.engine().outline(&entry.native))),
        )
    }
}

pub(crate) fn invalid(handle: impl Into<Handle>) -> CoreError {
    CoreError::InvalidHandle(handle.into().to_string())
}
