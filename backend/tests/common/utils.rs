use axum::response::Response;
use http_body_util::BodyExt;

/// Boundary used by every hand-built multipart body
pub const BOUNDARY: &str = "instabytes-test-boundary";

/// A single part of a `multipart/form-data` body
pub enum Part {
    File {
        name: &'static str,
        file_name: Option<&'static str>,
        content: Vec<u8>,
    },
    Text {
        name: &'static str,
        value: &'static str,
    },
}

impl Part {
    pub fn file(name: &'static str, file_name: &'static str, content: &[u8]) -> Self {
        Self::File {
            name,
            file_name: Some(file_name),
            content: content.to_vec(),
        }
    }

    /// A file part sent without a `filename` parameter
    pub fn unnamed_file(name: &'static str, content: &[u8]) -> Self {
        Self::File {
            name,
            file_name: None,
            content: content.to_vec(),
        }
    }

    pub fn text(name: &'static str, value: &'static str) -> Self {
        Self::Text { name, value }
    }
}

pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={BOUNDARY}")
}

/// Encodes `parts` as a `multipart/form-data` body delimited by [`BOUNDARY`]
pub fn multipart_body(parts: &[Part]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::File {
                name,
                file_name,
                content,
            } => {
                let disposition = match file_name {
                    Some(file_name) => format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n"
                    ),
                    None => format!("Content-Disposition: form-data; name=\"{name}\"\r\n"),
                };
                body.extend_from_slice(disposition.as_bytes());
                body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
                body.extend_from_slice(content);
            }
            Part::Text { name, value } => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

/// Parse response body to JSON
pub async fn parse_response_body(response: Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

/// Whether `value` looks like a store-assigned post id
pub fn is_post_id(value: &serde_json::Value) -> bool {
    value
        .as_str()
        .is_some_and(|id| id.len() == 24 && id.chars().all(|c| c.is_ascii_hexdigit()))
}
