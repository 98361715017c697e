//! Capability trait for records that can be written to a search index.

use crate::identifier::RecordIdentifier;

/// What the reindex core needs to know about a record.
///
/// The record store owns the data; the core only reads identity,
/// eligibility and routing.
pub trait Indexable: Send + Sync {
    /// Document id in the search index.
    fn search_id(&self) -> String;

    /// Whether the record should currently be present in the index.
    ///
    /// Ineligible records are deleted from the index on a full dispatch.
    fn is_eligible_for_index(&self) -> bool {
        true
    }

    /// Shard routing key, if the index uses custom routing.
    fn search_routing(&self) -> Option<String> {
        None
    }

    /// Identifier carrying both id and routing.
    fn identifier(&self) -> RecordIdentifier {
        RecordIdentifier {
            id: self.search_id(),
            routing: self.search_routing(),
        }
    }
}

/// A bare identifier is a delete-only placeholder: never eligible, routed
/// wherever its routing key says.
impl Indexable for RecordIdentifier {
    fn search_id(&self) -> String {
        self.id.clone()
    }

    fn is_eligible_for_index(&self) -> bool {
        false
    }

    fn search_routing(&self) -> Option<String> {
        self.routing.clone()
    }
}
