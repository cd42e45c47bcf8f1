//! Entities used by the demo command.

mod book;

pub use book::Book;
