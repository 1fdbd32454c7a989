mod fallback;
pub mod grouping;
mod source;

pub use fallback::fallback_items;
pub use grouping::{
    filter_by_search, parent_display_code, partition_parents_and_children, CatalogPartition,
    UNKNOWN_PARENT,
};
pub use source::{CatalogOrigin, CatalogSource};
