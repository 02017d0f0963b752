pub mod config;
pub mod operator;
pub mod path;

#[cfg(test)]
mod tests;

pub use config::StorageConfig;
pub use operator::{create_operator, remove_dir};
pub use path::{recording_dir, thumbnail_path, validate_path};
