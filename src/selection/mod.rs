// Stream selection - ranking of renditions offered by the API

pub mod format_selector;

pub use format_selector::{parse_resolution, FormatSelector, QualityOption, SelectionError};
