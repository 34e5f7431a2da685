//! HTTP request body builder.
//!
//! Turns the body and file attachments of a [`TestRequest`] into something
//! reqwest can send.

use reqwest::multipart::{Form, Part};

use apiprobe_domain::{FileAttachment, RequestBody, TestRequest};

/// Error type for body building operations.
#[derive(Debug, thiserror::Error)]
pub enum BodyBuildError {
    /// An attached file could not be read.
    #[error("failed to read file {path}: {message}")]
    FileRead {
        /// Path of the file.
        path: String,
        /// I/O error text.
        message: String,
    },

    /// A MIME type was rejected.
    #[error("invalid MIME type '{mime}': {message}")]
    InvalidMime {
        /// The rejected MIME type.
        mime: String,
        /// Parser message.
        message: String,
    },

    /// The body could not be encoded.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result of building a body.
pub enum BuiltBody {
    /// No body.
    None,
    /// Encoded body with its content type.
    Bytes {
        /// Encoded content.
        content: Vec<u8>,
        /// Content type to announce.
        content_type: &'static str,
    },
    /// Multipart form data; reqwest sets the content type with the boundary.
    Multipart(Form),
}

impl BuiltBody {
    /// Get the Content-Type header value, if the body dictates one.
    #[must_use]
    pub const fn content_type(&self) -> Option<&'static str> {
        match self {
            Self::Bytes { content_type, .. } => Some(content_type),
            Self::None | Self::Multipart(_) => None,
        }
    }

    /// Check if this is a multipart form.
    #[must_use]
    pub const fn is_multipart(&self) -> bool {
        matches!(self, Self::Multipart(_))
    }

    /// Check if this body is empty.
    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

/// Builds the body for `request`.
///
/// File attachments switch the body to multipart: form fields become text
/// parts and a JSON body becomes a `json` text part.
///
/// # Errors
///
/// Returns an error when a file cannot be read or the body cannot be encoded.
pub async fn build_body(request: &TestRequest) -> Result<BuiltBody, BodyBuildError> {
    if !request.files.is_empty() {
        return build_multipart_form(request).await.map(BuiltBody::Multipart);
    }

    match &request.body {
        RequestBody::None => Ok(BuiltBody::None),
        RequestBody::Json(value) => {
            let content = serde_json::to_vec(value)
                .map_err(|e| BodyBuildError::Serialization(e.to_string()))?;
            Ok(BuiltBody::Bytes {
                content,
                content_type: "application/json",
            })
        }
        RequestBody::Form(fields) => {
            let encoded = serde_urlencoded::to_string(fields)
                .map_err(|e| BodyBuildError::Serialization(e.to_string()))?;
            Ok(BuiltBody::Bytes {
                content: encoded.into_bytes(),
                content_type: "application/x-www-form-urlencoded",
            })
        }
    }
}

async fn build_multipart_form(request: &TestRequest) -> Result<Form, BodyBuildError> {
    let mut form = Form::new();

    match &request.body {
        RequestBody::None => {}
        RequestBody::Form(fields) => {
            for (name, value) in fields {
                form = form.text(name.clone(), value.clone());
            }
        }
        RequestBody::Json(value) => {
            let json = serde_json::to_string(value)
                .map_err(|e| BodyBuildError::Serialization(e.to_string()))?;
            form = form.text("json", json);
        }
    }

    for (name, file) in &request.files {
        form = form.part(name.clone(), file_part(file).await?);
    }
    Ok(form)
}

async fn file_part(file: &FileAttachment) -> Result<Part, BodyBuildError> {
    let content = tokio::fs::read(&file.path)
        .await
        .map_err(|e| BodyBuildError::FileRead {
            path: file.path.display().to_string(),
            message: e.to_string(),
        })?;

    let file_name = file.effective_file_name();
    let mime = file.mime_type.clone().unwrap_or_else(|| {
        mime_guess::from_path(&file_name)
            .first_or_octet_stream()
            .to_string()
    });

    Part::bytes(content)
        .file_name(file_name)
        .mime_str(&mime)
        .map_err(|e| BodyBuildError::InvalidMime {
            mime,
            message: e.to_string(),
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::io::Write;

    use apiprobe_domain::HttpMethod;
    use pretty_assertions::assert_eq;

    fn post() -> TestRequest {
        TestRequest::new(HttpMethod::Post, "http://api.test/upload")
    }

    #[tokio::test]
    async fn test_build_json_body() {
        let request = post().with_body(RequestBody::Json(serde_json::json!({"key": "value"})));

        match build_body(&request).await.unwrap() {
            BuiltBody::Bytes {
                content,
                content_type,
            } => {
                assert_eq!(content_type, "application/json");
                assert_eq!(content, br#"{"key":"value"}"#.to_vec());
            }
            _ => panic!("Expected encoded body"),
        }
    }

    #[tokio::test]
    async fn test_build_form_urlencoded() {
        let mut fields = BTreeMap::new();
        fields.insert("username".to_string(), "john doe".to_string());
        fields.insert("password".to_string(), "s&cret".to_string());
        let request = post().with_body(RequestBody::Form(fields));

        let built = build_body(&request).await.unwrap();
        assert_eq!(built.content_type(), Some("application/x-www-form-urlencoded"));
        match built {
            BuiltBody::Bytes { content, .. } => {
                let text = String::from_utf8(content).unwrap();
                assert_eq!(text, "password=s%26cret&username=john+doe");
            }
            _ => panic!("Expected encoded body"),
        }
    }

    #[tokio::test]
    async fn test_no_body() {
        let built = build_body(&TestRequest::get("http://api.test/")).await.unwrap();
        assert!(built.is_none());
    }

    #[tokio::test]
    async fn test_files_switch_to_multipart() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"col1,col2\n").unwrap();
        let request = post().with_file("upload", FileAttachment::new(file.path()));

        let built = build_body(&request).await.unwrap();
        assert!(built.is_multipart());
        assert_eq!(built.content_type(), None);
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let request = post().with_file("upload", FileAttachment::new("/definitely/not/here.bin"));
        assert!(matches!(
            build_body(&request).await,
            Err(BodyBuildError::FileRead { .. })
        ));
    }
}
