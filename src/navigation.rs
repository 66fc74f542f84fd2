//! Bookmarks, links and coordinate transforms
//!
//! Read-only traversal over the document outline and the link annotations of
//! loaded pages. Stale handles yield neutral answers (`None`, `-1`, empty
//! string) and a warning in the log.

use serde::{Deserialize, Serialize};

use crate::engine::Engine;
use crate::geometry::{IRect, Point, PointF, RectF, Viewport};
use crate::handle::{BookmarkHandle, DocumentHandle, LinkHandle, PageHandle};
use crate::registry::{LinkEntry, PdfCore};

/// Outline entry with its subtree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bookmark {
    pub title: String,
    /// Zero-based destination page
    pub page_index: Option<i32>,
    pub children: Vec<Bookmark>,
}

/// Resolved link annotation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub bounds: Option<RectF>,
    pub uri: Option<String>,
    pub dest_page_index: Option<i32>,
}

impl<E: Engine> PdfCore<E> {
    /// First top-level bookmark (`parent == None`) or first child of `parent`
    pub fn first_child_bookmark(
        &self,
        doc: DocumentHandle,
        parent: Option<BookmarkHandle>,
    ) -> Option<BookmarkHandle> {
        let outline = self.outline(doc)?;
        let node = match parent {
            None => outline.first_root?,
            Some(parent) if parent.document == doc => outline.node(parent.node)?.first_child?,
            Some(parent) => {
                tracing::warn!("Bookmark {} does not belong to document {}", parent.node, doc.0);
                return None;
            }
        };
        Some(BookmarkHandle {
            document: doc,
            node,
        })
    }

    pub fn next_sibling_bookmark(
        &self,
        doc: DocumentHandle,
        bookmark: BookmarkHandle,
    ) -> Option<BookmarkHandle> {
        if bookmark.document != doc {
            return None;
        }
        let node = self.outline(doc)?.node(bookmark.node)?.next_sibling?;
        Some(BookmarkHandle {
            document: doc,
            node,
        })
    }

    pub fn bookmark_title(&self, bookmark: BookmarkHandle) -> String {
        self.outline(bookmark.document)
            .and_then(|outline| outline.node(bookmark.node))
            .map(|node| node.title.clone())
            .unwrap_or_default()
    }

    /// Destination page of a bookmark, `-1` without a destination
    pub fn bookmark_dest_index(&self, doc: DocumentHandle, bookmark: BookmarkHandle) -> i32 {
        if bookmark.document != doc {
            return -1;
        }
        self.outline(doc)
            .and_then(|outline| outline.node(bookmark.node))
            .and_then(|node| node.dest_page)
            .unwrap_or(-1)
    }

    /// Whole outline as a tree
    pub fn table_of_contents(&self, doc: DocumentHandle) -> Vec<Bookmark> {
        let mut roots = Vec::new();
        let mut current = self.first_child_bookmark(doc, None);
        while let Some(bookmark) = current {
            roots.push(self.bookmark_subtree(doc, bookmark));
            current = self.next_sibling_bookmark(doc, bookmark);
        }
        roots
    }

    fn bookmark_subtree(&self, doc: DocumentHandle, bookmark: BookmarkHandle) -> Bookmark {
        let mut children = Vec::new();
        let mut child = self.first_child_bookmark(doc, Some(bookmark));
        while let Some(handle) = child {
            children.push(self.bookmark_subtree(doc, handle));
            child = self.next_sibling_bookmark(doc, handle);
        }

        let dest = self.bookmark_dest_index(doc, bookmark);
        Bookmark {
            title: self.bookmark_title(bookmark),
            page_index: (dest >= 0).then_some(dest),
            children,
        }
    }

    /// Link annotations of a page, in page order
    ///
    /// The first call takes a snapshot; later calls return the same handles.
    pub fn page_link_handles(&mut self, page: PageHandle) -> Vec<LinkHandle> {
        let engine = self.lifecycle.engine();
        let Some(entry) = self.documents.get_mut(page.document.0) else {
            tracing::warn!("Link enumeration on page of closed document {}", page.document.0);
            return Vec::new();
        };
        let Some(page_entry) = entry.pages.get_mut(page.slot) else {
            tracing::warn!("Link enumeration on stale page {}", page.slot);
            return Vec::new();
        };

        let slots = page_entry.links.get_or_insert_with(|| {
            engine
                .page_links(&page_entry.native)
                .into_iter()
                .map(|info| {
                    entry.links.insert(LinkEntry {
                        page: page.slot,
                        info,
                    })
                })
                .collect()
        });

        slots
            .iter()
            .map(|slot| LinkHandle {
                document: page.document,
                slot: *slot,
            })
            .collect()
    }

    fn link_entry(&self, link: LinkHandle) -> Option<&LinkEntry> {
        let entry = self
            .documents
            .get(link.document.0)
            .and_then(|doc| doc.links.get(link.slot));
        if entry.is_none() {
            tracing::warn!("Stale link handle {}", link.slot);
        }
        entry
    }

    /// Destination page of an internal link
    pub fn link_dest_page_index(&self, doc: DocumentHandle, link: LinkHandle) -> Option<i32> {
        if link.document != doc {
            return None;
        }
        self.link_entry(link)?.info.dest_page
    }

    /// URI of a link action; empty when the link has none
    pub fn link_uri(&self, doc: DocumentHandle, link: LinkHandle) -> String {
        if link.document != doc {
            return String::new();
        }
        self.link_entry(link)
            .and_then(|entry| entry.info.uri.clone())
            .unwrap_or_default()
    }

    pub fn link_rect(&self, link: LinkHandle) -> Option<RectF> {
        self.link_entry(link)?.info.rect
    }

    /// Links of a page with everything resolved
    pub fn page_links(&mut self, page: PageHandle) -> Vec<Link> {
        self.page_link_handles(page)
            .into_iter()
            .filter_map(|handle| self.link_entry(handle))
            .map(|entry| Link {
                bounds: entry.info.rect,
                uri: entry.info.uri.clone(),
                dest_page_index: entry.info.dest_page,
            })
            .collect()
    }

    pub fn page_to_device(
        &self,
        page: PageHandle,
        viewport: &Viewport,
        point: PointF,
    ) -> Option<Point> {
        let entry = self.page(page)?;
        Some(self.engine().page_to_device(&entry.native, viewport, point))
    }

    pub fn device_to_page(
        &self,
        page: PageHandle,
        viewport: &Viewport,
        point: Point,
    ) -> Option<PointF> {
        let entry = self.page(page)?;
        Some(self.engine().device_to_page(&entry.native, viewport, point))
    }

    /// Device rectangle covering a page-space rectangle
    pub fn map_rect_to_device(
        &self,
        page: PageHandle,
        viewport: &Viewport,
        rect: RectF,
    ) -> Option<IRect> {
        let top_left = self.page_to_device(page, viewport, PointF::new(rect.left, rect.top))?;
        let bottom_right =
            self.page_to_device(page, viewport, PointF::new(rect.right, rect.bottom))?;
        Some(IRect::new(
            top_left.x.min(bottom_right.x),
            top_left.y.min(bottom_right.y),
            top_left.x.max(bottom_right.x),
            top_left.y.max(bottom_right.y),
        ))
    }
}
