//! Request and response documents.
//!
//! An execution stores at most one request and one response. The manager does
//! not care about their shape; a [`Document`] only has to turn itself into
//! bytes and back.

use serde::Serialize;
use serde::de::DeserializeOwned;

use jobscope_shared::errors::{JobscopeError, JobscopeResult};

/// A value that can be persisted as a request or response artifact.
pub trait Document: Sized {
    fn to_bytes(&self) -> JobscopeResult<Vec<u8>>;

    fn from_bytes(bytes: &[u8]) -> JobscopeResult<Self>;
}

/// Any serde type, stored as JSON.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JsonDocument<T>(pub T);

impl<T> JsonDocument<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Document for JsonDocument<T>
where
    T: Serialize + DeserializeOwned,
{
    fn to_bytes(&self) -> JobscopeResult<Vec<u8>> {
        serde_json::to_vec_pretty(&self.0)
            .map_err(|e| JobscopeError::ArtifactStore(format!("failed to encode document: {}", e)))
    }

    fn from_bytes(bytes: &[u8]) -> JobscopeResult<Self> {
        serde_json::from_slice(bytes)
            .map(JsonDocument)
            .map_err(|e| JobscopeError::ArtifactStore(format!("failed to decode document: {}", e)))
    }
}

/// Opaque bytes, stored as-is.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawDocument(pub Vec<u8>);

impl Document for RawDocument {
    fn to_bytes(&self) -> JobscopeResult<Vec<u8>> {
        Ok(self.0.clone())
    }

    fn from_bytes(bytes: &[u8]) -> JobscopeResult<Self> {
        Ok(RawDocument(bytes.to_vec()))
    }
}
