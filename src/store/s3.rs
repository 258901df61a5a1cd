//! S3-compatible store backed by `aws-sdk-s3`.
//!
//! Works with AWS S3, MinIO, Ceph RGW, Cloudflare R2 and anything else that
//! speaks the S3 API.

use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::types::{Delete, Object, ObjectIdentifier};
use chrono::{DateTime, Utc};
use std::fmt::Display;
use std::future::Future;
use tracing::{debug, error, info, instrument};

use super::{DeletionFailure, ListEntry, ObjectRecord, ObjectStore, StoreError, StoreResult};

/// Maximum number of keys S3 accepts in one `DeleteObjects` request
pub const MAX_KEYS_PER_DELETE: usize = 1000;

/// Connection settings for [`S3Store`]
#[derive(Clone)]
pub struct S3StoreConfig {
    /// Endpoint URL including scheme, e.g. `http://localhost:9000`
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    /// Address buckets as `endpoint/bucket` instead of `bucket.endpoint`
    pub force_path_style: bool,
}

impl std::fmt::Debug for S3StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3StoreConfig")
            .field("endpoint", &self.endpoint)
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("region", &self.region)
            .field("force_path_style", &self.force_path_style)
            .finish()
    }
}

pub struct S3Store {
    client: aws_sdk_s3::Client,
}

impl S3Store {
    /// Build a client from explicit credentials and endpoint.
    ///
    /// No network call happens here.
    pub fn new(config: &S3StoreConfig) -> StoreResult<Self> {
        if config.endpoint.is_empty() {
            return Err(StoreError::Config("endpoint must not be empty".to_string()));
        }

        info!(endpoint = %config.endpoint, region = %config.region, "Initializing S3 store");

        let credentials = Credentials::new(
            config.access_key.clone(),
            config.secret_key.clone(),
            None, // session token
            None, // expiry
            "s3bc",
        );

        let s3_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .endpoint_url(&config.endpoint)
            .force_path_style(config.force_path_style)
            .build();

        Ok(Self {
            client: aws_sdk_s3::Client::from_conf(s3_config),
        })
    }

    async fn delete_chunk(&self, bucket: &str, keys: &[String]) -> Vec<DeletionFailure> {
        let mut objects = Vec::with_capacity(keys.len());
        for key in keys {
            match ObjectIdentifier::builder().key(key).build() {
                Ok(id) => objects.push(id),
                Err(e) => return fail_all(keys, &e.to_string()),
            }
        }

        let delete = match Delete::builder().set_objects(Some(objects)).quiet(true).build() {
            Ok(delete) => delete,
            Err(e) => return fail_all(keys, &e.to_string()),
        };

        match self
            .client
            .delete_objects()
            .bucket(bucket)
            .delete(delete)
            .send()
            .await
        {
            Ok(output) => output
                .errors()
                .iter()
                .map(|err| DeletionFailure {
                    key: err.key().unwrap_or("<unknown>").to_string(),
                    cause: format!(
                        "{}: {}",
                        err.code().unwrap_or("Unknown"),
                        err.message().unwrap_or("no message")
                    ),
                })
                .collect(),
            Err(e) => {
                error!(error = %e, bucket, keys = keys.len(), "DeleteObjects request failed");
                fail_all(keys, &e.to_string())
            }
        }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    #[instrument(skip(self))]
    async fn bucket_exists(&self, bucket: &str) -> StoreResult<bool> {
        match self.client.head_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(true),
            Err(e) => {
                let not_found = e.as_service_error().is_some_and(|se| se.is_not_found())
                    || e.raw_response().map(|r| r.status().as_u16()) == Some(404);
                if not_found {
                    Ok(false)
                } else {
                    Err(StoreError::S3(e.to_string()))
                }
            }
        }
    }

    #[instrument(skip(self))]
    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        recursive: bool,
    ) -> StoreResult<Vec<ListEntry>> {
        let mut request = self.client.list_objects_v2().bucket(bucket);
        if !prefix.is_empty() {
            request = request.prefix(prefix);
        }
        if !recursive {
            request = request.delimiter("/");
        }

        let mut pages = request.into_paginator().send();
        let mut listing = Listing::default();

        while let Some(page) = pages.next().await {
            let page = page.map(|output| {
                debug!(objects = output.contents().len(), "Received listing page");
                output.contents().iter().map(to_record).collect()
            });
            if !listing.push_page(page)? {
                break;
            }
        }

        Ok(listing.entries)
    }

    #[instrument(skip(self, keys), fields(keys = keys.len()))]
    async fn delete_objects(&self, bucket: &str, keys: &[String]) -> Vec<DeletionFailure> {
        delete_in_batches(keys, move |chunk| self.delete_chunk(bucket, chunk)).await
    }

    fn backend_name(&self) -> &'static str {
        "s3"
    }
}

/// Entries gathered from a paged listing
#[derive(Debug, Default)]
struct Listing {
    entries: Vec<ListEntry>,
    pages: usize,
}

impl Listing {
    /// Add one page. Returns `Ok(false)` when paging has to stop.
    ///
    /// A failed first page fails the whole listing. A later failure can't be
    /// resumed without a continuation token, so it becomes a single error
    /// entry and the pages already read are kept.
    fn push_page<E: Display>(&mut self, page: Result<Vec<ListEntry>, E>) -> StoreResult<bool> {
        match page {
            Ok(records) => {
                self.entries.extend(records);
                self.pages += 1;
                Ok(true)
            }
            Err(e) if self.pages == 0 => Err(StoreError::S3(e.to_string())),
            Err(e) => {
                error!(error = %e, pages = self.pages, "Listing stopped after a failed page");
                self.entries.push(Err(StoreError::S3(e.to_string())));
                Ok(false)
            }
        }
    }
}

/// Send `keys` in requests of at most [`MAX_KEYS_PER_DELETE`] keys, one after
/// another, and merge the failures of every request.
async fn delete_in_batches<'a, F, Fut>(keys: &'a [String], mut send: F) -> Vec<DeletionFailure>
where
    F: FnMut(&'a [String]) -> Fut,
    Fut: Future<Output = Vec<DeletionFailure>>,
{
    let mut failures = Vec::new();
    for chunk in keys.chunks(MAX_KEYS_PER_DELETE) {
        failures.extend(send(chunk).await);
    }
    failures
}

fn to_record(object: &Object) -> ListEntry {
    let key = object
        .key()
        .ok_or_else(|| StoreError::InvalidEntry("object without key".to_string()))?;

    let modified = object
        .last_modified()
        .ok_or_else(|| StoreError::InvalidEntry(format!("{}: missing last-modified", key)))?;

    let last_modified = DateTime::<Utc>::from_timestamp(modified.secs(), modified.subsec_nanos())
        .ok_or_else(|| StoreError::InvalidEntry(format!("{}: last-modified out of range", key)))?;

    let size_bytes = object.size().unwrap_or(0).max(0) as u64;

    Ok(ObjectRecord::new(key, last_modified, size_bytes))
}

fn fail_all(keys: &[String], cause: &str) -> Vec<DeletionFailure> {
    keys.iter()
        .map(|key| DeletionFailure {
            key: key.clone(),
            cause: cause.to_string(),
        })
        .collect()
}
