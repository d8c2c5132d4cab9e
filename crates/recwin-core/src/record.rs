//! The record abstraction held by the window.

use std::fmt;
use std::hash::Hash;

/// An item produced by a paginated source.
///
/// Identity is stable for the lifetime of a query; content may be swapped for
/// a fuller version later (see [`ListEngine::replace_record`]).
///
/// [`ListEngine::replace_record`]: crate::engine::ListEngine::replace_record
pub trait Record {
    /// Stable unique identifier.
    type Id: Clone + Eq + Hash + fmt::Debug;

    /// Identifier of this record.
    fn id(&self) -> Self::Id;

    /// Text whose display width drives the height estimate.
    ///
    /// `expanded` asks for the full body when the row is shown expanded.
    /// Returning `None` makes the height oracle fall back to its default tier.
    fn content(&self, expanded: bool) -> Option<&str>;
}
