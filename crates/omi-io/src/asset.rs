//! In-memory asset: host document plus its property graph

use omi_document::Document;
use omi_property::PropertyGraph;

/// Document and the properties decoded from it
///
/// The document keeps its raw extension blocks after a read. On write, every
/// registered extension's blocks are rebuilt from `properties`, so the graph
/// is the source of truth for those extensions.
#[derive(Debug, Default)]
pub struct Asset {
    /// Host document
    pub document: Document,
    /// Properties attached to the document's entities
    pub properties: PropertyGraph,
}

impl Asset {
    /// Wrap a document with an empty graph
    #[inline]
    #[must_use]
    pub fn new(document: Document) -> Self {
        Self {
            document,
            properties: PropertyGraph::new(),
        }
    }
}
