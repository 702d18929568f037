pub mod directory;
pub mod entry;
pub mod form;
pub mod term;
pub mod user;
pub mod view;

pub use directory::*;
pub use entry::*;
pub use form::*;
pub use term::*;
pub use user::*;
pub use view::*;
