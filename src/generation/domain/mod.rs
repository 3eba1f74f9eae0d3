//! Domain types shared by every image generation backend.

mod error;
mod image;
mod request;

pub use error::InvalidImageError;
pub use image::{ImageData, ImageFormat};
pub use request::GenerationRequest;
