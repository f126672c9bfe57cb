pub mod constants;
pub mod config_loader;
pub mod format;

pub use constants::*;
pub use config_loader::{load_from_file, load_from_file_sync, LoadConfigError};
pub use format::{
    derive_external_symbol, external_url, format_currency, format_decimal, format_signed_percent,
};
