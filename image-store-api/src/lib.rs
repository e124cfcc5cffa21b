//! Interface for content-addressed image stores.
//!
//! This crate defines the contract between an image store engine and its
//! callers: the [`ImageStore`] trait, the [`StoreError`] taxonomy, and the
//! [`Digest`] primitive used to address blobs and manifests.

mod digest;
mod error;
mod store;

pub use digest::Digest;
pub use digest::Digester;
pub use error::StoreError;
pub use error::StoreResult;
pub use store::BlobStream;
pub use store::ImageStore;
pub use store::ManifestPayload;
pub use store::Reader;
