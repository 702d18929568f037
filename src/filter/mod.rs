//! Advanced filter trees: storage shape, per-request preparation, SQL
//! compilation and in-memory evaluation

pub mod augment;
pub mod compile;
pub mod evaluate;
pub mod merge_tags;
pub mod normalize;
pub mod pipeline;
pub mod prune;
pub mod tree;

pub use augment::{augment, AugmentContext, Directory};
pub use compile::compile;
pub use evaluate::evaluate;
pub use normalize::{normalize, normalize_str};
pub use pipeline::{apply_view_filter, field_visibility, load_view_forms, prepare_tree, FieldOutput};
pub use prune::prune;
pub use tree::{lock_filter, Condition, FilterGroup, FilterNode, Mode, NodeValue, Operator};
