//! kanikoflow の設定
//!
//! YAML の run configuration、Go 形式の duration 文字列、
//! ビルドセッション単位の [`RunContext`] を扱います。

pub mod duration;
pub mod error;
pub mod loader;
pub mod model;
pub mod run_context;

pub use duration::{DurationError, format_duration, parse_duration};
pub use error::{ConfigError, Result};
pub use loader::{CONFIG_ENV, find_config_file, load_config};
pub use model::*;
pub use run_context::{InsecureRegistries, RunContext};
