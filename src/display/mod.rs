//! Terminal output for the CLI: themed messages, result tables and
//! progress bars fed by engine events.

pub mod progress;
pub mod tables;
pub mod theme;

pub use progress::{create_progress_bar, create_spinner, track_embedding_batches};
pub use tables::{
    TableBuilder, clusters_table, duplicates_table, index_stats_table, search_results_table,
};
pub use theme::{THEME, Theme};
