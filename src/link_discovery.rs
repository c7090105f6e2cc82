use crate::pdf_utils;
use lopdf::{Dictionary, Document, Object, ObjectId};

/// Collects hyperlink targets from the link annotations of a PDF document.
///
/// Only `/Link` annotations whose action is a `/URI` action contribute; internal
/// page jumps (`/GoTo`, `/Dest`), launch actions and every other annotation
/// type are ignored.
pub struct LinkDiscovery<'a> {
    document: &'a Document,
}

impl<'a> LinkDiscovery<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self { document }
    }

    /// Return every URI target in page order, then in `/Annots` order within
    /// each page.
    pub fn collect_uris(&self) -> Vec<String> {
        // get_pages() is keyed by 1-based page number, so iteration is in page order.
        self.document
            .get_pages()
            .values()
            .flat_map(|page_id| self.page_uris(*page_id))
            .collect()
    }

    /// URI targets on a single page.
    fn page_uris(&self, page_id: ObjectId) -> Vec<String> {
        let page_dict = match self.document.get_dictionary(page_id) {
            Ok(dict) => dict,
            Err(_) => return Vec::new(),
        };

        let annots_val = match page_dict.get(b"Annots") {
            Ok(val) => val,
            Err(_) => return Vec::new(),
        };

        let annots = match pdf_utils::resolve_array(self.document, annots_val) {
            Some(array) => array,
            None => return Vec::new(),
        };

        annots
            .iter()
            .filter_map(|item| self.annotation_uri(item))
            .collect()
    }

    /// The URI target of one annotation, if it is a URI link.
    fn annotation_uri(&self, item: &Object) -> Option<String> {
        let annot = pdf_utils::resolve_dict(self.document, item)?;
        if !pdf_utils::has_name(annot, b"Subtype", b"Link") {
            return None;
        }

        let action = pdf_utils::resolve_dict(self.document, annot.get(b"A").ok()?)?;
        Self::uri_action_target(action)
    }

    /// Read `/URI` from an action dictionary whose `/S` is `/URI`.
    fn uri_action_target(action: &Dictionary) -> Option<String> {
        if !pdf_utils::has_name(action, b"S", b"URI") {
            return None;
        }
        pdf_utils::extract_string_from_dict(action, b"URI")
            .map(|uri| uri.trim().to_string())
            .filter(|uri| !uri.is_empty())
    }
}
