use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("Image generation failed: {0}")]
pub struct ImageGenerationError(pub String);

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("Failed to upload image to storage: {0}")]
pub struct UploadError(pub String);

/// Restyles a captured photo according to a text instruction.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(
        &self,
        image: &[u8],
        mime_type: &str,
        prompt: &str,
    ) -> Result<GeneratedImage, ImageGenerationError>;
}

/// Stores a final composite and returns a public download URL.
#[async_trait]
pub trait ImageUploader: Send + Sync {
    async fn upload(&self, data_url: &str) -> Result<String, UploadError>;
}
