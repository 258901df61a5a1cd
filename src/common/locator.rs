use serde::Serialize;
use url::Url;

use super::errors::CleanupError;

/// The only scheme accepted in a bucket locator
pub const SCHEME: &str = "s3";

/// Target of a cleanup run, parsed from `s3://bucket[/prefix]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketLocator {
    pub bucket: String,
    /// Key prefix exactly as written after `bucket/`; empty means the whole bucket
    pub prefix: String,
}

impl BucketLocator {
    /// Parse a locator.
    ///
    /// The URL parser only validates the scheme and bucket. The prefix is the
    /// raw text after `s3://bucket/`, so keys containing spaces, `%`, `?` or
    /// `#` are matched literally instead of being encoded or cut off.
    pub fn parse(raw: &str) -> Result<Self, CleanupError> {
        let raw = raw.trim();
        let url = Url::parse(raw).map_err(|e| {
            CleanupError::validation(format!("failed to parse s3 URL '{}': {}", raw, e))
        })?;

        if url.scheme() != SCHEME {
            return Err(CleanupError::validation(format!(
                "url should start with {}:// (got '{}')",
                SCHEME, raw
            )));
        }

        let bucket = url.host_str().unwrap_or_default();
        if bucket.is_empty() {
            return Err(CleanupError::validation(format!(
                "no bucket name in '{}'",
                raw
            )));
        }

        let rest = raw.split_once("://").map(|(_, rest)| rest).unwrap_or_default();
        let (authority, prefix) = rest.split_once('/').unwrap_or((rest, ""));
        if authority != bucket {
            return Err(CleanupError::validation(format!(
                "'{}' is not a plain bucket name in '{}'",
                authority, raw
            )));
        }

        Ok(Self {
            bucket: bucket.to_string(),
            prefix: prefix.trim_start_matches('/').to_string(),
        })
    }
}

impl std::fmt::Display for BucketLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.prefix.is_empty() {
            write!(f, "{}://{}", SCHEME, self.bucket)
        } else {
            write!(f, "{}://{}/{}", SCHEME, self.bucket, self.prefix)
        }
    }
}

impl std::str::FromStr for BucketLocator {
    type Err = CleanupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
