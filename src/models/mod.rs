// Core data models for advfilter
// These structs represent the record source, its records and the viewer

pub mod form;
pub mod entry;
pub mod user;
pub mod viewer;

pub use form::*;
pub use entry::*;
pub use user::*;
pub use viewer::*;
