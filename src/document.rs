//! Document-level metadata queries

use serde::{Deserialize, Serialize};

use crate::engine::Engine;
use crate::handle::DocumentHandle;
use crate::registry::PdfCore;

/// Standard info dictionary entries (empty when absent)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMeta {
    pub title: String,
    pub author: String,
    pub subject: String,
    pub keywords: String,
    pub creator: String,
    pub producer: String,
    pub creation_date: String,
    pub mod_date: String,
}

impl<E: Engine> PdfCore<E> {
    /// Info dictionary entry for `tag`; empty string when absent
    pub fn meta_text(&self, doc: DocumentHandle, tag: &str) -> String {
        self.document(doc)
            .and_then(|entry| self.engine().meta_text(&entry.native, tag))
            .unwrap_or_default()
    }

    pub fn document_meta(&self, doc: DocumentHandle) -> DocumentMeta {
        DocumentMeta {
            title: self.meta_text(doc, "Title"),
            author: self.meta_text(doc, "Author"),
            subject: self.meta_text(doc, "Subject"),
            keywords: self.meta_text(doc, "Keywords"),
            creator: self.meta_text(doc, "Creator"),
            producer: self.meta_text(doc, "Producer"),
            creation_date: self.meta_text(doc, "CreationDate"),
            mod_date: self.meta_text(doc, "ModDate"),
        }
    }
}
