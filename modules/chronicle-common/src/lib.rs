pub mod config;
pub mod error;
pub mod telemetry;
pub mod types;
pub mod util;

pub use config::Config;
pub use error::ChronicleError;
pub use types::*;
pub use util::{format_year, slugify, title_key, truncate_to_char_boundary};
