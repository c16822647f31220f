//! Subcommands, one per blob service operation.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, bail};
use bytes::Bytes;
use clap::{Args, Subcommand};
use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::info;

use swiftblob_core::storage::{
    BlobService, ByteRange, Checksum, ContentDisposition, ContentTypeReconciler as _,
    DirectUploadHeaders, DirectUploadOptions, Disposition, Payload, UploadOptions, UrlOptions,
};

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Upload a local file.
    Upload {
        /// Object key.
        key: String,
        /// File to upload.
        path: PathBuf,
        /// Base64 MD5 the store verifies the upload against.
        #[arg(long, conflicts_with = "verify")]
        checksum: Option<String>,
        /// Compute the checksum from the file before uploading.
        #[arg(long)]
        verify: bool,
        /// Content type; guessed from the filename when absent.
        #[arg(long)]
        content_type: Option<String>,
        #[command(flatten)]
        disposition: DispositionArgs,
    },
    /// Download a blob to a file, or to stdout.
    Download {
        /// Object key.
        key: String,
        /// Destination file.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Print part of a blob to stdout.
    DownloadChunk {
        /// Object key.
        key: String,
        /// First byte.
        start: u64,
        /// One past the last byte, or the last byte with `--inclusive`.
        end: u64,
        /// Treat `end` as inclusive.
        #[arg(long)]
        inclusive: bool,
    },
    /// Delete a blob.
    Delete {
        /// Object key.
        key: String,
    },
    /// Delete every blob under a prefix.
    DeletePrefixed {
        /// Key prefix.
        prefix: String,
    },
    /// Exit with status 0 if the blob exists, 1 otherwise.
    Exists {
        /// Object key.
        key: String,
    },
    /// Print a signed download URL.
    Url {
        /// Object key.
        key: String,
        /// URL lifetime in seconds.
        #[arg(long, default_value_t = 300)]
        expires_in: u64,
        /// `inline` or `attachment`.
        #[arg(long, default_value = "inline")]
        disposition: Disposition,
        /// Filename reported to the browser.
        #[arg(long)]
        filename: Option<String>,
        /// Requested content type (Swift serves the stored one).
        #[arg(long)]
        content_type: Option<String>,
    },
    /// Print a signed upload URL and the headers the upload must carry.
    DirectUpload {
        /// Object key.
        key: String,
        /// Content type of the upload.
        #[arg(long)]
        content_type: String,
        /// Base64 MD5 of the upload.
        #[arg(long)]
        checksum: String,
        /// Size of the upload.
        #[arg(long)]
        content_length: Option<u64>,
        /// URL lifetime in seconds.
        #[arg(long, default_value_t = 300)]
        expires_in: u64,
        #[command(flatten)]
        disposition: DispositionArgs,
    },
    /// Replace content type and disposition of a stored blob.
    UpdateMetadata {
        /// Object key.
        key: String,
        /// New content type.
        #[arg(long)]
        content_type: String,
        #[command(flatten)]
        disposition: DispositionArgs,
    },
    /// Replace only the content type of a stored blob.
    ChangeContentType {
        /// Object key.
        key: String,
        /// New content type.
        content_type: String,
    },
}

/// `Content-Disposition` stored with a blob.
#[derive(Debug, Args)]
pub struct DispositionArgs {
    /// `inline` or `attachment`.
    #[arg(long, requires = "filename")]
    disposition: Option<Disposition>,
    /// Filename presented to the user.
    #[arg(long)]
    filename: Option<String>,
}

impl DispositionArgs {
    fn content_disposition(&self) -> Option<ContentDisposition> {
        match (self.disposition, &self.filename) {
            (Some(disposition), Some(filename)) => {
                Some(ContentDisposition::new(disposition, filename.clone()))
            }
            _ => None,
        }
    }
}

impl Command {
    /// Run the command against `service`.
    pub async fn run<S: BlobService>(self, service: &S) -> anyhow::Result<()> {
        match self {
            Self::Upload {
                key,
                path,
                checksum,
                verify,
                content_type,
                disposition,
            } => {
                let (mut payload, checksum) = if verify {
                    let data = tokio::fs::read(&path)
                        .await
                        .with_context(|| format!("reading {}", path.display()))?;
                    let checksum = Checksum::compute(&data).to_base64();
                    (Payload::from_bytes(data), Some(checksum))
                } else {
                    let file = tokio::fs::File::open(&path)
                        .await
                        .with_context(|| format!("opening {}", path.display()))?;
                    (Payload::from_reader(file), checksum)
                };
                if let Some(name) = path.file_name().and_then(|name| name.to_str()) {
                    payload = payload.with_filename(name);
                }
                let options = UploadOptions {
                    checksum,
                    content_type,
                    disposition: disposition.content_disposition(),
                };

                service.upload(&key, payload, options).await?;
                println!("{key}");
            }
            Self::Download { key, output } => {
                let mut stream = service.download_stream(&key).await?;
                let mut written = 0usize;
                match output {
                    Some(path) => {
                        let mut file = tokio::fs::File::create(&path)
                            .await
                            .with_context(|| format!("creating {}", path.display()))?;
                        while let Some(chunk) = stream.next().await {
                            let chunk = chunk?;
                            file.write_all(&chunk).await?;
                            written += chunk.len();
                        }
                        file.flush().await?;
                    }
                    None => {
                        let mut stdout = tokio::io::stdout();
                        while let Some(chunk) = stream.next().await {
                            let chunk = chunk?;
                            stdout.write_all(&chunk).await?;
                            written += chunk.len();
                        }
                        stdout.flush().await?;
                    }
                }
                info!(key = %key, size = written, "download complete");
            }
            Self::DownloadChunk {
                key,
                start,
                end,
                inclusive,
            } => {
                let range = if inclusive {
                    ByteRange::from(start..=end)
                } else {
                    ByteRange::from(start..end)
                };
                write_stdout(service.download_chunk(&key, range).await?).await?;
            }
            Self::Delete { key } => {
                if !service.delete(&key).await? {
                    println!("{key} did not exist");
                }
            }
            Self::DeletePrefixed { prefix } => {
                let count = service.delete_prefixed(&prefix).await?;
                println!("deleted {count} objects");
            }
            Self::Exists { key } => {
                if !service.exists(&key).await? {
                    std::process::exit(1);
                }
            }
            Self::Url {
                key,
                expires_in,
                disposition,
                filename,
                content_type,
            } => {
                let options = UrlOptions {
                    expires_in: Duration::from_secs(expires_in),
                    disposition,
                    filename,
                    content_type,
                };
                println!("{}", service.url(&key, &options)?);
            }
            Self::DirectUpload {
                key,
                content_type,
                checksum,
                content_length,
                expires_in,
                disposition,
            } => {
                let options = DirectUploadOptions {
                    expires_in: Duration::from_secs(expires_in),
                    content_type: Some(content_type.clone()),
                    content_length,
                    checksum: Some(checksum.clone()),
                };
                let url = service.url_for_direct_upload(&key, &options)?;
                let headers = service.headers_for_direct_upload(
                    &key,
                    DirectUploadHeaders {
                        content_type,
                        checksum,
                        content_length,
                        disposition: disposition.content_disposition(),
                    },
                )?;

                println!("PUT {url}");
                let mut headers: Vec<_> = headers.into_iter().collect();
                headers.sort();
                for (name, value) in headers {
                    println!("{name}: {value}");
                }
            }
            Self::UpdateMetadata {
                key,
                content_type,
                disposition,
            } => {
                service
                    .update_metadata(&key, &content_type, disposition.content_disposition())
                    .await?;
            }
            Self::ChangeContentType { key, content_type } => {
                let Some(reconciler) = service.content_type_reconciler() else {
                    bail!("this store cannot change content types in place");
                };
                if !reconciler.change_content_type(&key, &content_type).await? {
                    bail!("{key} does not exist");
                }
            }
        }
        Ok(())
    }
}

async fn write_stdout(data: Bytes) -> anyhow::Result<()> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(&data).await?;
    stdout.flush().await?;
    Ok(())
}
