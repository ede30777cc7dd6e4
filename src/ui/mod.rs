pub mod progress;
pub mod table;
mod terminal;

pub use progress::run_acquisition_progress;
pub use table::{render_table, summary_line};
