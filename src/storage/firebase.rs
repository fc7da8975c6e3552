use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use rand::Rng;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::booth::traits::{ImageUploader, UploadError};
use crate::config::Config;
use crate::utils::data_url::parse_image_data_url;
use crate::utils::http::{get_http_client, summarize_error_body};
use crate::utils::timing::log_service_timing;

const UPLOAD_PREFIX: &str = "uploads";
const SUFFIX_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StorageObject {
    name: String,
    #[serde(default)]
    download_tokens: Option<String>,
}

/// Firebase Storage REST uploader for finished composites.
#[derive(Clone)]
pub struct FirebaseStorageClient {
    base_url: String,
    bucket: String,
    api_key: Option<String>,
}

impl FirebaseStorageClient {
    pub fn new(base_url: &str, bucket: &str, api_key: Option<&str>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            bucket: bucket.trim().to_string(),
            api_key: api_key
                .map(str::trim)
                .filter(|key| !key.is_empty())
                .map(str::to_string),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.firebase_storage_base_url,
            &config.firebase_storage_bucket,
            Some(config.firebase_api_key.as_str()),
        )
    }

    fn upload_url(&self, object_name: &str) -> Result<String, UploadError> {
        let mut params = vec![("uploadType", "media"), ("name", object_name)];
        if let Some(key) = self.api_key.as_deref() {
            params.push(("key", key));
        }
        let query = serde_urlencoded::to_string(&params)
            .map_err(|err| UploadError(format!("invalid upload query: {}", err)))?;
        Ok(format!(
            "{}/v0/b/{}/o?{}",
            self.base_url,
            encode_path_segment(&self.bucket),
            query
        ))
    }

    fn download_url(&self, object_name: &str, token: Option<&str>) -> String {
        let mut url = format!(
            "{}/v0/b/{}/o/{}?alt=media",
            self.base_url,
            encode_path_segment(&self.bucket),
            encode_path_segment(object_name)
        );
        if let Some(token) = token.map(str::trim).filter(|token| !token.is_empty()) {
            url.push_str("&token=");
            url.push_str(&encode_path_segment(token));
        }
        url
    }

    async fn put_object(
        &self,
        object_name: &str,
        mime_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, UploadError> {
        let response = get_http_client()
            .post(self.upload_url(object_name)?)
            .header(reqwest::header::CONTENT_TYPE, mime_type)
            .body(bytes)
            .send()
            .await
            .map_err(|err| UploadError(format!("request failed: {}", err.without_url())))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let (message, body_summary) = summarize_error_body(&body);
            warn!(
                "Storage upload failed with status {}: {}",
                status, body_summary
            );
            return Err(UploadError(format!(
                "storage returned status {}: {}",
                status,
                message.unwrap_or(body_summary)
            )));
        }

        let object = response
            .json::<StorageObject>()
            .await
            .map_err(|err| UploadError(format!("unexpected storage response: {}", err)))?;
        let token = object
            .download_tokens
            .as_deref()
            .and_then(|tokens| tokens.split(',').next());
        Ok(self.download_url(&object.name, token))
    }
}

#[async_trait]
impl ImageUploader for FirebaseStorageClient {
    async fn upload(&self, data_url: &str) -> Result<String, UploadError> {
        let image = parse_image_data_url(data_url).map_err(|err| UploadError(err.to_string()))?;
        let object_name = object_name_for(&image.mime_type, unix_millis(), &mut rand::thread_rng());
        let metadata = json!({ "object": object_name, "bytes": image.bytes.len() });

        let download_url = log_service_timing(
            "firebase_storage",
            &self.bucket,
            "upload_composite",
            Some(metadata),
            || self.put_object(&object_name, &image.mime_type, image.bytes),
        )
        .await?;

        info!("Uploaded composite to {}", object_name);
        Ok(download_url)
    }
}

fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default()
}

fn extension_for_mime(mime_type: &str) -> &str {
    match mime_type.split('/').nth(1).unwrap_or("jpeg") {
        "jpeg" | "jpg" => "jpg",
        other => other,
    }
}

/// `uploads/<millis>-<6 base36 chars>.<ext>`
pub fn object_name_for<R: Rng + ?Sized>(mime_type: &str, millis: u128, rng: &mut R) -> String {
    let suffix: String = (0..6)
        .map(|_| SUFFIX_ALPHABET[rng.gen_range(0..SUFFIX_ALPHABET.len())] as char)
        .collect();
    format!(
        "{}/{}-{}.{}",
        UPLOAD_PREFIX,
        millis,
        suffix,
        extension_for_mime(mime_type)
    )
}

fn encode_path_segment(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        // form encoding turns spaces into '+', paths need %20
        .replace('+', "%20")
}
