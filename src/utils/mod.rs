pub mod date;
pub mod fuzzy;
pub mod matching;

pub use date::*;
pub use matching::*;
