//! Property-based tests for the storage service.
//!
//! - Checksum encodings agree with each other and with stored ETags
//! - Inclusive and exclusive ranges covering the same bytes read the same bytes
//! - Re-chunked downloads preserve content and chunk sizes
//! - Upload then download returns the payload unchanged

use std::sync::Arc;

use bytes::Bytes;
use futures::{TryStreamExt, stream};
use proptest::prelude::*;

use super::chunking::rechunk;
use super::{BlobService, ByteRange, Checksum, Payload, SwiftStorageService, UploadOptions};
use crate::swift::{MemorySwiftClient, ObjectEndpoint, TempUrlSigner};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime")
}

fn service(chunk_size: usize) -> SwiftStorageService {
    let endpoint = ObjectEndpoint::new("https://swift.example.com/v1/AUTH_test", "attachments")
        .expect("endpoint");
    let signer = TempUrlSigner::new("secret").expect("signer");
    let client = Arc::new(MemorySwiftClient::new(endpoint, signer.clone()));
    SwiftStorageService::new(client, signer).with_chunk_size(chunk_size)
}

/// Payload with an offset pair inside it.
fn payload_and_range() -> impl Strategy<Value = (Vec<u8>, u64, u64)> {
    prop::collection::vec(any::<u8>(), 1..2048).prop_flat_map(|data| {
        let len = data.len() as u64;
        (Just(data), 0..len).prop_flat_map(move |(data, start)| {
            (Just(data), Just(start), start..len)
        })
    })
}

proptest! {
    #[test]
    fn prop_checksum_base64_and_hex_agree(data in prop::collection::vec(any::<u8>(), 0..512)) {
        let checksum = Checksum::compute(&data);
        let parsed = Checksum::from_base64(&checksum.to_base64()).expect("own encoding");

        prop_assert_eq!(parsed, checksum);
        prop_assert_eq!(parsed.to_hex(), checksum.to_hex());
        let quoted = format!("\"{}\"", checksum.to_hex());
        prop_assert!(checksum.matches_etag(&quoted));
    }

    #[test]
    fn prop_inclusive_and_exclusive_ranges_agree(
        (data, start, last) in payload_and_range()
    ) {
        let data = Bytes::from(data);
        let inclusive = ByteRange::from(start..=last);
        let exclusive = ByteRange::from(start..last + 1);

        prop_assert_eq!(inclusive, exclusive);
        let expected = &data[usize::try_from(start).expect("fits")..=usize::try_from(last).expect("fits")];
        prop_assert_eq!(&inclusive.slice(&data)[..], expected);
    }

    #[test]
    fn prop_rechunk_preserves_content(
        parts in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..64), 0..16),
        chunk_size in 1usize..32,
    ) {
        let expected: Vec<u8> = parts.concat();
        let source = stream::iter(
            parts
                .into_iter()
                .map(|part| Ok::<_, std::io::Error>(Bytes::from(part)))
                .collect::<Vec<_>>(),
        );

        let chunks: Vec<Bytes> = runtime()
            .block_on(rechunk(source, chunk_size).try_collect())
            .expect("no errors");

        if let Some((last, full)) = chunks.split_last() {
            prop_assert!(full.iter().all(|chunk| chunk.len() == chunk_size));
            prop_assert!(!last.is_empty() && last.len() <= chunk_size);
        }
        prop_assert_eq!(chunks.concat(), expected);
    }

    #[test]
    fn prop_upload_download_round_trip(
        data in prop::collection::vec(any::<u8>(), 0..40_000),
        chunk_size in 1usize..20_000,
    ) {
        let service = service(chunk_size);
        let checksum = Checksum::compute(&data).to_base64();

        let (downloaded, streamed) = runtime().block_on(async {
            service
                .upload(
                    "blob",
                    Payload::from_bytes(data.clone()),
                    UploadOptions::default().with_checksum(checksum),
                )
                .await
                .expect("upload");
            let downloaded = service.download("blob").await.expect("download");
            let streamed: Vec<Bytes> = service
                .download_stream("blob")
                .await
                .expect("stream")
                .try_collect()
                .await
                .expect("chunks");
            (downloaded, streamed)
        });

        prop_assert_eq!(&downloaded[..], &data[..]);
        prop_assert_eq!(streamed.concat(), data);
    }

    #[test]
    fn prop_download_chunk_matches_slice((data, start, last) in payload_and_range()) {
        let service = service(1024);
        let chunk = runtime().block_on(async {
            service
                .upload("blob", Payload::from_bytes(data.clone()), UploadOptions::default())
                .await
                .expect("upload");
            service
                .download_chunk("blob", (start..=last).into())
                .await
                .expect("chunk")
        });

        let expected = &data[usize::try_from(start).expect("fits")..=usize::try_from(last).expect("fits")];
        prop_assert_eq!(&chunk[..], expected);
    }
}
