//! Typed handles and generation-checked arenas
//!
//! Every object a caller can name (documents, pages, text pages, bookmarks,
//! links) lives in an [`Arena`] slot. A handle stores the slot index plus the
//! generation the slot had when the object was inserted; removing the object
//! bumps the generation, so a handle that outlives its object fails lookup
//! instead of reaching a recycled entry.
//!
//! Child handles carry their parent [`DocumentHandle`]. Closing a document
//! drops its whole entry (including the child arenas), and because the
//! document slot's generation changes, every child handle becomes stale at
//! once.

use std::fmt;

/// Index plus generation into an [`Arena`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Slot {
    index: u32,
    generation: u32,
}

impl Slot {
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

enum Entry<T> {
    Occupied { generation: u32, value: T },
    Vacant { generation: u32, next_free: Option<u32> },
}

/// Slot storage with generation checks and slot reuse
pub struct Arena<T> {
    entries: Vec<Entry<T>>,
    free_head: Option<u32>,
    len: usize,
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            free_head: None,
            len: 0,
        }
    }

    /// Store a value and return its slot
    pub fn insert(&mut self, value: T) -> Slot {
        self.len += 1;

        if let Some(index) = self.free_head {
            let entry = &mut self.entries[index as usize];
            let (generation, next_free) = match entry {
                Entry::Vacant {
                    generation,
                    next_free,
                } => (*generation, *next_free),
                Entry::Occupied { .. } => unreachable!("free list points at an occupied slot"),
            };
            *entry = Entry::Occupied { generation, value };
            self.free_head = next_free;
            return Slot { index, generation };
        }

        let index = self.entries.len() as u32;
        self.entries.push(Entry::Occupied {
            generation: 0,
            value,
        });
        Slot {
            index,
            generation: 0,
        }
    }

    pub fn get(&self, slot: Slot) -> Option<&T> {
        match self.entries.get(slot.index as usize)? {
            Entry::Occupied { generation, value } if *generation == slot.generation => Some(value),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, slot: Slot) -> Option<&mut T> {
        match self.entries.get_mut(slot.index as usize)? {
            Entry::Occupied { generation, value } if *generation == slot.generation => Some(value),
            _ => None,
        }
    }

    pub fn contains(&self, slot: Slot) -> bool {
        self.get(slot).is_some()
    }

    /// Take the value out; the slot's generation moves on
    pub fn remove(&mut self, slot: Slot) -> Option<T> {
        let entry = self.entries.get_mut(slot.index as usize)?;
        match entry {
            Entry::Occupied { generation, .. } if *generation == slot.generation => {}
            _ => return None,
        }

        let vacant = Entry::Vacant {
            generation: slot.generation.wrapping_add(1),
            next_free: self.free_head,
        };
        let old = std::mem::replace(entry, vacant);
        self.free_head = Some(slot.index);
        self.len -= 1;

        match old {
            Entry::Occupied { value, .. } => Some(value),
            Entry::Vacant { .. } => None,
        }
    }

    /// Remove every value matching the predicate, returning how many went
    pub fn remove_where<F>(&mut self, mut predicate: F) -> usize
    where
        F: FnMut(&T) -> bool,
    {
        let doomed: Vec<Slot> = self
            .iter()
            .filter(|(_, value)| predicate(*value))
            .map(|(slot, _)| slot)
            .collect();
        for slot in &doomed {
            self.remove(*slot);
        }
        doomed.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Live entries in slot order
    pub fn iter(&self) -> impl Iterator<Item = (Slot, &T)> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| match entry {
                Entry::Occupied { generation, value } => Some((
                    Slot {
                        index: index as u32,
                        generation: *generation,
                    },
                    value,
                )),
                Entry::Vacant { .. } => None,
            })
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// An open document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentHandle(pub(crate) Slot);

/// A loaded page of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageHandle {
    pub(crate) document: DocumentHandle,
    pub(crate) slot: Slot,
}

/// Extracted text of a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextPageHandle {
    pub(crate) document: DocumentHandle,
    pub(crate) slot: Slot,
}

/// A node of the document outline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BookmarkHandle {
    pub(crate) document: DocumentHandle,
    pub(crate) node: u32,
}

/// A link annotation captured by a page link enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkHandle {
    pub(crate) document: DocumentHandle,
    pub(crate) slot: Slot,
}

impl PageHandle {
    pub fn document(&self) -> DocumentHandle {
        self.document
    }
}

impl TextPageHandle {
    pub fn document(&self) -> DocumentHandle {
        self.document
    }
}

impl BookmarkHandle {
    pub fn document(&self) -> DocumentHandle {
        self.document
    }
}

impl LinkHandle {
    pub fn document(&self) -> DocumentHandle {
        self.document
    }
}

/// Any handle, tagged with its kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Handle {
    Document(DocumentHandle),
    Page(PageHandle),
    TextPage(TextPageHandle),
    Bookmark(BookmarkHandle),
    Link(LinkHandle),
}

impl Handle {
    /// Owning document (a document owns itself)
    pub fn document(&self) -> DocumentHandle {
        match self {
            Handle::Document(doc) => *doc,
            Handle::Page(page) => page.document,
            Handle::TextPage(text) => text.document,
            Handle::Bookmark(bookmark) => bookmark.document,
            Handle::Link(link) => link.document,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Handle::Document(_) => "document",
            Handle::Page(_) => "page",
            Handle::TextPage(_) => "text page",
            Handle::Bookmark(_) => "bookmark",
            Handle::Link(_) => "link",
        }
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handle::Document(doc) => write!(f, "document {}", doc.0),
            Handle::Page(page) => write!(f, "page {} of document {}", page.slot, page.document.0),
            Handle::TextPage(text) => {
                write!(f, "text page {} of document {}", text.slot, text.document.0)
            }
            Handle::Bookmark(bookmark) => write!(
                f,
                "bookmark {} of document {}",
                bookmark.node, bookmark.document.0
            ),
            Handle::Link(link) => write!(f, "link {} of document {}", link.slot, link.document.0),
        }
    }
}

macro_rules! impl_from_handle {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for Handle {
                fn from(handle: $ty) -> Self {
                    Handle::$variant(handle)
                }
            }
        )*
    };
}

impl_from_handle!(
    Document(DocumentHandle),
    Page(PageHandle),
    TextPage(TextPageHandle),
    Bookmark(BookmarkHandle),
    Link(LinkHandle),
);
