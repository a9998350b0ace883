//! S3-backed object store.
//!
//! The AWS SDK is async; this store owns a small multi-thread runtime and
//! blocks on every call, keeping the rest of the workspace free of async.
//! `block_on` is safe from any caller thread, including batch-runner workers.

use crate::error::StoreError;
use crate::ObjectStore;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use std::fs;
use std::path::{Path, PathBuf};
use tokio::runtime::Runtime;
use tracing::{debug, info};

pub struct S3Store {
    bucket: String,
    client: Client,
    runtime: Runtime,
}

impl S3Store {
    /// Build a client from the default AWS config chain and verify the
    /// bucket is reachable before returning.
    pub fn open(bucket: &str) -> Result<Self, StoreError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()?;
        let client = runtime.block_on(async {
            let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
            Client::new(&config)
        });
        let store = Self {
            bucket: bucket.to_string(),
            client,
            runtime,
        };
        store
            .runtime
            .block_on(store.client.head_bucket().bucket(&store.bucket).send())
            .map_err(|err| StoreError::Bucket {
                bucket: bucket.to_string(),
                reason: err.to_string(),
            })?;
        info!("Opened S3 bucket: {}", bucket);
        Ok(store)
    }
}

impl ObjectStore for S3Store {
    fn name(&self) -> String {
        format!("s3://{}", self.bucket)
    }

    fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        self.runtime.block_on(async {
            let mut keys = Vec::new();
            let mut continuation: Option<String> = None;
            loop {
                let mut request = self
                    .client
                    .list_objects_v2()
                    .bucket(&self.bucket)
                    .prefix(prefix);
                if let Some(token) = continuation.take() {
                    request = request.continuation_token(token);
                }
                let output = request.send().await.map_err(|err| StoreError::Backend {
                    key: prefix.to_string(),
                    reason: err.to_string(),
                })?;
                keys.extend(
                    output
                        .contents()
                        .iter()
                        .filter_map(|object| object.key().map(str::to_string)),
                );
                match output.next_continuation_token() {
                    Some(token) => continuation = Some(token.to_string()),
                    None => break,
                }
            }
            debug!("Listed {} keys under prefix '{}'", keys.len(), prefix);
            Ok(keys)
        })
    }

    fn get_object(&self, key: &str, dest_dir: &Path) -> Result<PathBuf, StoreError> {
        let file_name = key.rsplit('/').next().unwrap_or(key);
        let dest_path = dest_dir.join(file_name);
        info!("Downloading s3://{}/{} to {}", self.bucket, key, dest_path.display());
        self.runtime.block_on(async {
            let output = self
                .client
                .get_object()
                .bucket(&self.bucket)
                .key(key)
                .send()
                .await
                .map_err(|err| {
                    let service_error = err.to_string();
                    if service_error.contains("NoSuchKey") {
                        StoreError::NotFound(key.to_string())
                    } else {
                        StoreError::Backend {
                            key: key.to_string(),
                            reason: service_error,
                        }
                    }
                })?;
            let bytes = output
                .body
                .collect()
                .await
                .map_err(|err| StoreError::Backend {
                    key: key.to_string(),
                    reason: err.to_string(),
                })?
                .into_bytes();
            fs::create_dir_all(dest_dir)?;
            fs::write(&dest_path, &bytes)?;
            Ok(dest_path)
        })
    }

    fn put_object(&self, local_path: &Path, key: &str) -> Result<(), StoreError> {
        info!("Uploading {} to s3://{}/{}", local_path.display(), self.bucket, key);
        self.runtime.block_on(async {
            let body = ByteStream::from_path(local_path)
                .await
                .map_err(|err| StoreError::Backend {
                    key: key.to_string(),
                    reason: err.to_string(),
                })?;
            self.client
                .put_object()
                .bucket(&self.bucket)
                .key(key)
                .body(body)
                .send()
                .await
                .map_err(|err| StoreError::Backend {
                    key: key.to_string(),
                    reason: err.to_string(),
                })?;
            Ok(())
        })
    }
}
