//! Swift-backed blob storage.
//!
//! # Modules
//!
//! - `storage` - The blob service, its options and errors
//! - `swift` - OpenStack Swift object client and temporary URL signing

pub mod storage;
pub mod swift;
