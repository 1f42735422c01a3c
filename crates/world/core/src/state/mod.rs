//! Runtime state documents and the template/override merge.

mod document;
mod merge;

pub use document::{PatchError, RuntimeStateDocument, StateField, StatePatch};
pub use merge::{EffectiveState, merge_state};
