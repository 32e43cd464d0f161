//! Object store client for uploaded résumé and vacancy documents.
//!
//! Documents live under `resumes/<key>` and `vacancies/<key>` in a single
//! bucket. Callers hold locations of the form `<endpoint>/<bucket>/<key>`;
//! the read path parses the key back out of the location. No retry here —
//! retry policy belongs to the caller.

use std::time::Duration;

use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use bytes::Bytes;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

/// Bounds every S3 round trip so a stuck request cannot stall the
/// scheduler tick indefinitely.
const S3_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("S3 error: {0}")]
    S3(String),

    #[error("S3 request timed out after {}s", S3_TIMEOUT.as_secs())]
    Timeout,
}

/// Opaque put/get of binary blobs by key, over S3 / MinIO.
#[derive(Clone)]
pub struct ObjectStore {
    client: S3Client,
    bucket: String,
    endpoint: String,
}

impl ObjectStore {
    pub fn new(client: S3Client, bucket: String, endpoint: String) -> Self {
        Self {
            client,
            bucket,
            endpoint,
        }
    }

    /// Uploads a blob and returns its location (`<endpoint>/<bucket>/<key>`).
    pub async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .send();

        tokio::time::timeout(S3_TIMEOUT, request)
            .await
            .map_err(|_| StorageError::Timeout)?
            .map_err(|e| StorageError::S3(e.into_service_error().to_string()))?;

        info!("Uploaded document to s3://{}/{}", self.bucket, key);
        Ok(location_for(&self.endpoint, &self.bucket, key))
    }

    /// Downloads the blob behind a location produced by [`ObjectStore::put`].
    pub async fn get(&self, location: &str) -> Result<Bytes, StorageError> {
        let key = key_from_location(&self.endpoint, &self.bucket, location);

        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send();

        let response = tokio::time::timeout(S3_TIMEOUT, request)
            .await
            .map_err(|_| StorageError::Timeout)?
            .map_err(|e| {
                let service_error = e.into_service_error();
                if service_error.is_no_such_key() {
                    StorageError::NotFound(key.to_string())
                } else {
                    StorageError::S3(service_error.to_string())
                }
            })?;

        let data = tokio::time::timeout(S3_TIMEOUT, response.body.collect())
            .await
            .map_err(|_| StorageError::Timeout)?
            .map_err(|e| StorageError::S3(e.to_string()))?;

        Ok(data.into_bytes())
    }
}

/// Builds a unique object key under the given prefix, keeping the original
/// filename for readability.
pub fn document_key(prefix: &str, filename: &str) -> String {
    let safe: String = filename
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' {
            c
        } else {
            '_'
        })
        .collect();
    format!("{prefix}/{}-{safe}", Uuid::new_v4())
}

fn location_for(endpoint: &str, bucket: &str, key: &str) -> String {
    format!("{}/{bucket}/{key}", endpoint.trim_end_matches('/'))
}

/// Extracts the object key from a location. Locations that do not carry the
/// expected `<endpoint>/<bucket>/` prefix are treated as bare keys.
fn key_from_location<'a>(endpoint: &str, bucket: &str, location: &'a str) -> &'a str {
    let prefix = format!("{}/{bucket}/", endpoint.trim_end_matches('/'));
    location.strip_prefix(&prefix).unwrap_or(location)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_round_trip() {
        let location = location_for("http://localhost:9000", "prospect", "resumes/abc-cv.pdf");
        assert_eq!(location, "http://localhost:9000/prospect/resumes/abc-cv.pdf");
        assert_eq!(
            key_from_location("http://localhost:9000", "prospect", &location),
            "resumes/abc-cv.pdf"
        );
    }

    #[test]
    fn test_key_from_location_trailing_slash_endpoint() {
        assert_eq!(
            key_from_location("http://localhost:9000/", "prospect", "http://localhost:9000/prospect/vacancies/x.pdf"),
            "vacancies/x.pdf"
        );
    }

    #[test]
    fn test_key_from_location_bare_key_fallback() {
        assert_eq!(
            key_from_location("http://localhost:9000", "prospect", "resumes/bare.pdf"),
            "resumes/bare.pdf"
        );
    }

    #[test]
    fn test_document_key_sanitizes_filename() {
        let key = document_key("resumes", "my cv (final).pdf");
        assert!(key.starts_with("resumes/"));
        assert!(key.ends_with("-my_cv__final_.pdf"));
        assert!(!key.contains(' '));
    }
}
