use base64::{engine::general_purpose, Engine as _};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DataUrlError {
    #[error("Invalid data URL: missing data URI prefix")]
    MissingPrefix,
    #[error("Invalid data URL: missing payload")]
    MissingPayload,
    #[error("Invalid data URL: only base64 payloads are supported")]
    NotBase64,
    #[error("Unsupported MIME type: {0}")]
    UnsupportedMime(String),
    #[error("Failed to decode base64 data: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Decodes `data:image/<subtype>;base64,<payload>`.
pub fn parse_image_data_url(data_url: &str) -> Result<DataUrl, DataUrlError> {
    let trimmed = data_url.trim();
    let Some(rest) = trimmed.strip_prefix("data:") else {
        return Err(DataUrlError::MissingPrefix);
    };

    let (header, payload) = rest.split_once(',').ok_or(DataUrlError::MissingPayload)?;
    let mut header_parts = header.split(';');
    let mime_type = header_parts.next().unwrap_or_default().trim().to_ascii_lowercase();
    if !header_parts.any(|part| part.trim().eq_ignore_ascii_case("base64")) {
        return Err(DataUrlError::NotBase64);
    }
    if !mime_type.starts_with("image/") {
        return Err(DataUrlError::UnsupportedMime(mime_type));
    }
    if payload.trim().is_empty() {
        return Err(DataUrlError::MissingPayload);
    }

    let bytes = general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|err| DataUrlError::Decode(err.to_string()))?;

    Ok(DataUrl { mime_type, bytes })
}

pub fn to_data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        mime_type,
        general_purpose::STANDARD.encode(bytes)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_jpeg_data_url() {
        let parsed = parse_image_data_url("data:image/JPEG;base64,/9j/4A==").unwrap();
        assert_eq!(parsed.mime_type, "image/jpeg");
        assert_eq!(parsed.bytes, vec![0xff, 0xd8, 0xff, 0xe0]);
    }

    #[test]
    fn rejects_malformed_inputs() {
        assert_eq!(
            parse_image_data_url("image/png;base64,AAAA"),
            Err(DataUrlError::MissingPrefix)
        );
        assert_eq!(
            parse_image_data_url("data:image/png;base64"),
            Err(DataUrlError::MissingPayload)
        );
        assert_eq!(
            parse_image_data_url("data:image/png,AAAA"),
            Err(DataUrlError::NotBase64)
        );
        assert_eq!(
            parse_image_data_url("data:text/plain;base64,AAAA"),
            Err(DataUrlError::UnsupportedMime("text/plain".to_string()))
        );
        assert!(matches!(
            parse_image_data_url("data:image/png;base64,@@@"),
            Err(DataUrlError::Decode(_))
        ));
    }

    #[test]
    fn encodes_back_to_data_url() {
        let url = to_data_url("image/png", b"ABC");
        assert_eq!(url, "data:image/png;base64,QUJD");
        assert_eq!(parse_image_data_url(&url).unwrap().bytes, b"ABC".to_vec());
    }
}
