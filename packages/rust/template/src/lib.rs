//! HTML document transformation and template composition.
//!
//! This crate provides:
//! - [`dom`] — a small mutable-DOM toolkit over `markup5ever_rcdom`
//! - [`transform`] — rewrites a raw law document and extracts its named fragments
//! - [`compose`] — splices fragments into a per-jurisdiction template skeleton

pub mod compose;
pub mod dom;
pub mod transform;

// Downstream crates hold parsed documents without depending on rcdom.
pub use markup5ever_rcdom::Handle;

pub use compose::{Replacement, Replacements, SkeletonSource, compose, load_skeleton};
pub use transform::{DocumentFragments, extract_fragments};
