//! Blob storage on OpenStack Swift.
//!
//! [`BlobService`] is the operation set a host attachment framework calls;
//! [`SwiftStorageService`] implements it on top of a [`crate::swift::ObjectClient`].
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    SwiftStorageService                        │
//! ├──────────────────────────────────────────────────────────────┤
//! │ upload / update_metadata  →  PUT / HEAD + POST               │
//! │ download / download_chunk →  GET (+ Range)                   │
//! │ delete / delete_prefixed  →  DELETE / list + bulk-delete     │
//! │ url / url_for_direct_upload → HMAC-SHA1 temporary URLs       │
//! └──────────────────────────────────────────────────────────────┘
//! ```

mod capability;
mod checksum;
mod chunking;
mod config;
mod disposition;
mod error;
mod mime;
mod payload;
mod range;
mod service;

#[cfg(test)]
mod service_props;

pub use capability::{BlobRecord, ContentTypeReconciler, reconcile_identified_content_type};
pub use checksum::Checksum;
pub use config::{StorageConfig, StorageProvider};
pub use disposition::{ContentDisposition, Disposition};
pub use error::StorageError;
pub use mime::{DEFAULT_CONTENT_TYPE, ExtensionSniffer, MimeSniffer, SNIFF_LEN};
pub(crate) use payload::Body;
pub use payload::{Payload, PayloadStream};
pub use range::ByteRange;
pub use service::{
    BlobService, BlobStream, DirectUploadHeaders, DirectUploadOptions, SwiftStorageService,
    UploadOptions, UrlOptions,
};
