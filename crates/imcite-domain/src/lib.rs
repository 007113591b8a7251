//! imcite-domain: domain models for the imcite citation graph engine
//!
//! Pure data types shared by the graph assembly engine and its consumers:
//! - Canonical entities (Paper, Author, Institution, Authorship)
//! - Directed paper relationships with provenance tags
//! - External identifier namespaces and normalization
//! - Canonical partial records produced by source adapters
//! - Author name normalization for fuzzy matching

pub mod author;
pub mod authorship;
pub mod ids;
pub mod institution;
pub mod paper;
pub mod records;
pub mod relationship;

pub use author::Author;
pub use authorship::Authorship;
pub use ids::{ExternalId, IdNamespace, ShortUid};
pub use institution::Institution;
pub use paper::{OpenAccessStatus, Paper, RelationshipTag};
pub use records::{AuthorRecord, AuthorshipRecord, InstitutionRecord, PaperRecord};
pub use relationship::{PaperRelationship, RelationshipKey, RelationshipType};
