//! Error type for the fallible parts of the renderer.
//!
//! Most runtime failures (missing textures, incomplete framebuffers) are
//! logged and degrade instead of returning an error. `RenderError` covers
//! setup paths where the caller has to decide what to do: device creation,
//! program compilation, model import, config loading.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("failed to load image '{path}': {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("'{path}' has {channels} channels, expected 1, 3 or 4")]
    UnsupportedChannels { path: PathBuf, channels: u8 },
    #[error("failed to import '{path}': {message}")]
    Import { path: PathBuf, message: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
    #[error("graphics device error: {0}")]
    Device(String),
    #[error("surface error: {0}")]
    Surface(String),
    #[error("shader '{label}' failed to compile: {message}")]
    Shader { label: String, message: String },
}
