pub mod icons;
pub mod output;
pub mod progress;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{diagnostic, header, path_status, section, status, success, warn};
pub use progress::Spinner;
pub use table::{languages_table, summary_table, TableBuilder};
pub use theme::{theme, Theme};
