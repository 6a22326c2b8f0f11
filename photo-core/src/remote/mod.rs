//! External collaborators: the photo-storage backend and the media host.

pub mod client;
pub use client::{AuthClient, Credentials, HttpClient, ResourceClient};

pub mod media;
pub use media::{CloudinaryUploader, MediaUploader};

#[cfg(test)]
pub mod fake;
