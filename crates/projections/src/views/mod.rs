//! Read model views.

mod cards;
mod students;

pub use cards::{CardRow, CardsView};
pub use students::{StudentRow, StudentsView};
