//! Repository implementations for database access.

mod image;

pub use image::ImageRepository;
