//! Image scoring pipeline components.
//!
//! - **prompt**: Pick and read the text prompt
//! - **discovery**: Find image files in the target directory
//! - **validate**: Size and magic-byte checks before decoding
//! - **decode**: Load and decode images with a timeout
//! - **scorer**: Orchestrates one batch and collects a `ScoreReport`

pub mod decode;
pub mod discovery;
pub mod prompt;
pub mod scorer;
pub mod validate;

pub use decode::{DecodedImage, ImageDecoder};
pub use discovery::{DiscoveredFile, FileDiscovery};
pub use prompt::{choose_prompt_file, list_prompt_files, read_prompt};
pub use scorer::BatchScorer;
pub use validate::Validator;
