//! Projection handlers for each aggregate type.

mod cards;
mod students;

pub use cards::CardProjection;
pub use students::StudentProjection;
