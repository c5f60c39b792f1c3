use serde::Serialize;

/// Response payload for /upload.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub pages: usize,
    pub chunks: usize,
    /// Generation of the index that now answers chat requests.
    pub generation: u64,
}
