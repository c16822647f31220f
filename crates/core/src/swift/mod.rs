//! OpenStack Swift object store client.
//!
//! [`ObjectClient`] is the seam between the storage service and the wire:
//! [`HttpSwiftClient`] talks to a real cluster, [`MemorySwiftClient`] keeps
//! objects in process and honours the same temporary URL signatures.

mod client;
mod endpoint;
mod error;
mod http;
mod memory;
mod temp_url;

pub use client::{
    BulkDeleteReport, MetadataUpdate, ObjectBody, ObjectClient, ObjectInfo, ObjectStream,
    PutObject,
};
pub use endpoint::ObjectEndpoint;
pub use error::ClientError;
pub use http::HttpSwiftClient;
pub use memory::{MemorySwiftClient, SignedResponse};
pub use temp_url::{TempUrlMethod, TempUrlParams, TempUrlSigner};

#[cfg(test)]
pub(crate) use client::MockObjectClient;
