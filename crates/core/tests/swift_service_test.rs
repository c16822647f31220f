//! Integration tests for the Swift storage service against the in-memory store.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::TryStreamExt;
use swiftblob_core::storage::{
    BlobRecord, BlobService, ByteRange, Checksum, ContentDisposition, DirectUploadHeaders,
    DirectUploadOptions, Disposition, Payload, StorageError, SwiftStorageService, UploadOptions,
    UrlOptions, reconcile_identified_content_type,
};
use swiftblob_core::swift::{ClientError, MemorySwiftClient, ObjectEndpoint, TempUrlSigner};
use uuid::Uuid;

const STORAGE_URL: &str = "https://swift.example.com/v1/AUTH_test";
const TEMP_URL_KEY: &str = "secret";

/// Service and the store behind it, with small download chunks.
fn setup() -> (SwiftStorageService, Arc<MemorySwiftClient>) {
    let endpoint = ObjectEndpoint::new(STORAGE_URL, "attachments").expect("valid endpoint");
    let signer = TempUrlSigner::new(TEMP_URL_KEY).expect("valid key");
    let client = Arc::new(MemorySwiftClient::new(endpoint, signer.clone()));
    let service = SwiftStorageService::new(client.clone(), signer).with_chunk_size(64 * 1024);
    (service, client)
}

fn unique_key() -> String {
    format!("{}/avatar.png", Uuid::new_v4())
}

/// Deterministic payload spanning several transport and download chunks.
fn large_payload() -> Vec<u8> {
    (0..300_000u32).map(|i| (i % 251) as u8).collect()
}

async fn upload(service: &SwiftStorageService, key: &str, data: &[u8]) {
    service
        .upload(key, Payload::from_bytes(data.to_vec()), UploadOptions::default())
        .await
        .expect("Failed to upload");
}

#[tokio::test]
async fn test_round_trip_small_payload() {
    let (service, _client) = setup();
    let key = unique_key();

    upload(&service, &key, b"Some random string!").await;

    let data = service.download(&key).await.expect("Failed to download");
    assert_eq!(data, Bytes::from_static(b"Some random string!"));
}

#[tokio::test]
async fn test_round_trip_across_chunks() {
    let (service, _client) = setup();
    let key = unique_key();
    let payload = large_payload();

    service
        .upload(
            &key,
            Payload::from_reader(std::io::Cursor::new(payload.clone())),
            UploadOptions::default().with_checksum(Checksum::compute(&payload).to_base64()),
        )
        .await
        .expect("Failed to upload");

    let data = service.download(&key).await.expect("Failed to download");
    assert_eq!(&data[..], &payload[..]);

    let chunks: Vec<Bytes> = service
        .download_stream(&key)
        .await
        .expect("Failed to open stream")
        .try_collect()
        .await
        .expect("Failed to stream");
    assert_eq!(chunks.len(), 5);
    assert!(chunks[..4].iter().all(|chunk| chunk.len() == 64 * 1024));
    assert_eq!(chunks.concat(), payload);

    let mut streamed = Vec::new();
    service
        .download_to(&key, &mut |chunk: Bytes| streamed.extend_from_slice(&chunk))
        .await
        .expect("Failed to stream into sink");
    assert_eq!(streamed, payload);
}

#[tokio::test]
async fn test_reupload_overwrites() {
    let (service, _client) = setup();
    let key = unique_key();

    upload(&service, &key, b"first").await;
    upload(&service, &key, b"second").await;

    let data = service.download(&key).await.expect("Failed to download");
    assert_eq!(data, Bytes::from_static(b"second"));
}

#[tokio::test]
async fn test_missing_key() {
    let (service, _client) = setup();
    let key = unique_key();

    assert!(!service.exists(&key).await.expect("Failed to check existence"));
    assert!(!service.delete(&key).await.expect("Delete of a missing key is not an error"));

    let err = service.download(&key).await.unwrap_err();
    assert!(matches!(err, StorageError::FileNotFound { key: ref k } if *k == key));

    let err = service.download_stream(&key).await.err().expect("stream should fail");
    assert!(err.is_not_found());

    let err = service.download_chunk(&key, (0..=3).into()).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_delete_existing_key() {
    let (service, _client) = setup();
    let key = unique_key();
    upload(&service, &key, b"data").await;

    assert!(service.exists(&key).await.expect("Failed to check existence"));
    assert!(service.delete(&key).await.expect("Failed to delete"));
    assert!(!service.exists(&key).await.expect("Failed to check existence"));
}

#[tokio::test]
async fn test_upload_with_matching_checksum() {
    let (service, client) = setup();
    let key = unique_key();

    service
        .upload(
            &key,
            Payload::from_bytes("Some random string!"),
            UploadOptions::default().with_checksum("tYyS4lb/tRhMA002OWOQsg=="),
        )
        .await
        .expect("Failed to upload");

    let info = swiftblob_core::swift::ObjectClient::head_object(client.as_ref(), &key)
        .await
        .expect("Failed to stat");
    assert_eq!(
        info.etag.as_deref(),
        Some("b58c92e256ffb5184c034d36396390b2")
    );
}

#[tokio::test]
async fn test_upload_with_mismatched_checksum() {
    let (service, _client) = setup();
    let key = unique_key();

    let err = service
        .upload(
            &key,
            Payload::from_bytes("Some random string!"),
            UploadOptions::default().with_checksum(Checksum::compute(b"other data").to_base64()),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, StorageError::Integrity { .. }));
    assert!(!service.exists(&key).await.expect("Failed to check existence"));
}

#[tokio::test]
async fn test_download_chunk_inclusive_and_exclusive() {
    let (service, _client) = setup();
    let key = unique_key();
    let payload = b"a text file with some content";
    upload(&service, &key, payload).await;

    let exclusive = service
        .download_chunk(&key, (19..21).into())
        .await
        .expect("Failed to read range");
    let inclusive = service
        .download_chunk(&key, (19..=20).into())
        .await
        .expect("Failed to read range");

    assert_eq!(&exclusive[..], &payload[19..21]);
    assert_eq!(exclusive, Bytes::from_static(b"me"));
    assert_eq!(exclusive, inclusive);
}

#[tokio::test]
async fn test_download_chunk_past_end() {
    let (service, _client) = setup();
    let key = unique_key();
    upload(&service, &key, b"abcdef").await;

    let tail = service
        .download_chunk(&key, (4..100).into())
        .await
        .expect("Failed to read range");
    assert_eq!(tail, Bytes::from_static(b"ef"));

    let open = service
        .download_chunk(&key, ByteRange::from(2..))
        .await
        .expect("Failed to read range");
    assert_eq!(open, Bytes::from_static(b"cdef"));
}

#[tokio::test]
async fn test_delete_prefixed() {
    let (service, _client) = setup();
    let root = Uuid::new_v4();
    let keys = [
        format!("{root}/a/a"),
        format!("{root}/a/b"),
        format!("{root}/b/a"),
    ];
    for key in &keys {
        upload(&service, key, b"data").await;
    }

    let removed = service
        .delete_prefixed(&format!("{root}/a/"))
        .await
        .expect("Failed to delete prefix");

    assert_eq!(removed, 2);
    assert!(!service.exists(&keys[0]).await.expect("exists"));
    assert!(!service.exists(&keys[1]).await.expect("exists"));
    assert!(service.exists(&keys[2]).await.expect("exists"));
}

#[tokio::test]
async fn test_delete_prefixed_without_matches() {
    let (service, client) = setup();
    upload(&service, "kept/a", b"data").await;

    let removed = service
        .delete_prefixed("missing/")
        .await
        .expect("Empty prefix is a no-op");
    assert_eq!(removed, 0);
    assert_eq!(client.len().await, 1);
}

#[tokio::test]
async fn test_direct_upload() {
    let (service, client) = setup();
    let key = unique_key();
    let data = Bytes::from_static(b"Some random string!");
    let checksum = Checksum::compute(&data).to_base64();

    let url = service
        .url_for_direct_upload(
            &key,
            &DirectUploadOptions::new(Duration::from_secs(300))
                .with_content_length(data.len() as u64),
        )
        .expect("Failed to sign upload URL");
    let headers = service
        .headers_for_direct_upload(&key, DirectUploadHeaders::new("text/plain", checksum))
        .expect("Failed to build headers");

    assert!(url.starts_with(&format!("{STORAGE_URL}/attachments/{key}?temp_url_sig=")));
    assert_eq!(headers["ETag"], "b58c92e256ffb5184c034d36396390b2");

    client
        .put_signed(&url, &headers, data.clone())
        .await
        .expect("Store should accept the signed upload");

    let downloaded = service.download(&key).await.expect("Failed to download");
    assert_eq!(downloaded, data);
}

#[tokio::test]
async fn test_direct_upload_with_wrong_body() {
    let (service, client) = setup();
    let key = unique_key();

    let url = service
        .url_for_direct_upload(&key, &DirectUploadOptions::new(Duration::from_secs(300)))
        .expect("Failed to sign upload URL");
    let headers = service
        .headers_for_direct_upload(
            &key,
            DirectUploadHeaders::new("text/plain", Checksum::compute(b"expected").to_base64()),
        )
        .expect("Failed to build headers");

    let err = client
        .put_signed(&url, &headers, Bytes::from_static(b"tampered"))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::ChecksumMismatch));
    assert!(!service.exists(&key).await.expect("exists"));
}

#[tokio::test]
async fn test_download_url_is_not_an_upload_url() {
    let (service, client) = setup();
    let key = unique_key();

    let url = service
        .url(&key, &UrlOptions::new(Duration::from_secs(300)))
        .expect("Failed to sign URL");
    let err = client
        .put_signed(&url, &HashMap::new(), Bytes::from_static(b"data"))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Unauthorized(_)));
}

#[tokio::test]
async fn test_url_disposition() {
    let (service, client) = setup();
    let key = unique_key();
    upload(&service, &key, b"png").await;

    let inline = service
        .url(
            &key,
            &UrlOptions::new(Duration::from_secs(300)).with_filename("avatar.png"),
        )
        .expect("Failed to sign URL");
    let response = client.head_signed(&inline).await.expect("Failed to fetch");
    assert_eq!(
        response.content_disposition.as_deref(),
        Some(ContentDisposition::inline("avatar.png").header_value().as_str())
    );

    let attachment = service
        .url(
            &key,
            &UrlOptions::new(Duration::from_secs(300))
                .with_disposition(Disposition::Attachment)
                .with_filename("avatar.png"),
        )
        .expect("Failed to sign URL");
    assert!(!attachment.contains("&inline"));
    let response = client.head_signed(&attachment).await.expect("Failed to fetch");
    assert_eq!(
        response.content_disposition.as_deref(),
        Some(ContentDisposition::attachment("avatar.png").header_value().as_str())
    );
}

#[tokio::test]
async fn test_url_content_type_has_no_effect() {
    let (service, client) = setup();
    let key = unique_key();
    service
        .upload(
            &key,
            Payload::from_bytes("png"),
            UploadOptions::default().with_content_type("image/png"),
        )
        .await
        .expect("Failed to upload");

    let url = service
        .url(
            &key,
            &UrlOptions::new(Duration::from_secs(300)).with_content_type("text/plain"),
        )
        .expect("Failed to sign URL");
    let response = client.head_signed(&url).await.expect("Failed to fetch");
    assert_eq!(response.content_type, "image/png");
}

#[tokio::test]
async fn test_update_metadata() {
    let (service, client) = setup();
    let key = unique_key();
    upload(&service, &key, b"Some random string!").await;

    service
        .update_metadata(&key, "text/plain", None)
        .await
        .expect("Failed to update metadata");

    let url = service
        .url(&key, &UrlOptions::new(Duration::from_secs(300)))
        .expect("Failed to sign URL");
    let response = client.head_signed(&url).await.expect("Failed to fetch");
    assert_eq!(response.content_type, "text/plain");
    assert_eq!(response.content_length, 19);

    let data = service.download(&key).await.expect("Failed to download");
    assert_eq!(data, Bytes::from_static(b"Some random string!"));
}

#[tokio::test]
async fn test_update_metadata_disposition() {
    let (service, client) = setup();
    let key = unique_key();
    upload(&service, &key, b"data").await;

    service
        .update_metadata(
            &key,
            "text/plain",
            Some(ContentDisposition::attachment("notes.txt")),
        )
        .await
        .expect("Failed to update metadata");

    let url = service
        .url_for_direct_upload(&key, &DirectUploadOptions::new(Duration::from_secs(60)))
        .expect("Failed to sign URL");
    let response = client.head_signed(&url).await.expect("Failed to fetch");
    assert_eq!(
        response.content_disposition.as_deref(),
        Some("attachment; filename=\"notes.txt\"; filename*=UTF-8''notes.txt")
    );
}

#[tokio::test]
async fn test_update_metadata_missing_key() {
    let (service, _client) = setup();
    let err = service
        .update_metadata(&unique_key(), "text/plain", None)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_reconciler_capability() {
    let (service, client) = setup();
    let key = unique_key();
    upload(&service, &key, b"a,b\n1,2\n").await;

    let record = BlobRecord {
        key: key.clone(),
        content_type: Some("text/csv".to_string()),
        identified: true,
    };
    let updated = reconcile_identified_content_type(&service, &record)
        .await
        .expect("Failed to reconcile");
    assert!(updated);

    let url = service
        .url(&key, &UrlOptions::new(Duration::from_secs(300)))
        .expect("Failed to sign URL");
    let response = client.head_signed(&url).await.expect("Failed to fetch");
    assert_eq!(response.content_type, "text/csv");
}
