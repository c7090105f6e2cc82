use crate::link_discovery::LinkDiscovery;
use crate::{ExtractedLink, LinkKind};

/// Hyperlink extraction for PdfAnalyzer.
impl super::PdfAnalyzer {
    /// Every URI target in the document, in page order and then annotation
    /// order. Annotations without a URI target (internal jumps, launch
    /// actions, widgets, …) are excluded.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use attachment_harvester::PdfAnalyzer;
    ///
    /// let analyzer = PdfAnalyzer::from_path("Submittals/A.pdf").unwrap();
    /// for link in analyzer.extract_links() {
    ///     println!("#{} {}", link.index, link.uri);
    /// }
    /// ```
    pub fn extract_links(&self) -> Vec<ExtractedLink> {
        ExtractedLink::from_uris(self.extract_uris())
    }

    /// The raw URI strings, without link indexes.
    pub fn extract_uris(&self) -> Vec<String> {
        LinkDiscovery::new(self.document()).collect_uris()
    }

    /// Number of URI links in the document.
    pub fn link_count(&self) -> usize {
        self.extract_uris().len()
    }

    /// Number of links the harvester would try to download (`http(s)` only).
    pub fn downloadable_link_count(&self) -> usize {
        self.extract_uris()
            .iter()
            .filter(|uri| LinkKind::classify(uri).is_downloadable())
            .count()
    }
}
