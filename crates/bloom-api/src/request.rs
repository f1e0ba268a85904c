//! Outgoing request descriptors.

use crate::error::ApiResult;
use reqwest::multipart;
use reqwest::Method;
use serde_json::Value;

/// A single logical request.
///
/// The `retried` marker starts false and is set true at most once, which is
/// the mechanism preventing more than one renewal cycle per request.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
    pub retried: bool,
}

impl RequestDescriptor {
    /// Create a descriptor with no query or body.
    pub fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            path: path.to_string(),
            query: Vec::new(),
            body: RequestBody::Empty,
            retried: false,
        }
    }

    /// Attach query parameters (keys are expected to be unique).
    pub fn with_query(mut self, query: &[(&str, &str)]) -> Self {
        self.query = query
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self
    }

    /// Attach a JSON body.
    pub fn with_json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    /// Attach a multipart form body.
    pub fn with_form(mut self, form: UploadForm) -> Self {
        self.body = RequestBody::Multipart(form);
        self
    }
}

/// Request body payload.
#[derive(Debug, Clone)]
pub enum RequestBody {
    Empty,
    Json(Value),
    Multipart(UploadForm),
}

/// Multipart form description.
///
/// Parts are held as owned bytes so the form can be recomposed if the
/// request is retried after a session renewal (a `reqwest` multipart form
/// is consumed on send).
#[derive(Debug, Clone, Default)]
pub struct UploadForm {
    parts: Vec<UploadPart>,
}

#[derive(Debug, Clone)]
enum UploadPart {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        file_name: String,
        mime: String,
        bytes: Vec<u8>,
    },
}

impl UploadForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a text field.
    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.parts.push(UploadPart::Text {
            name: name.to_string(),
            value: value.to_string(),
        });
        self
    }

    /// Add an in-memory file field.
    pub fn file(mut self, name: &str, file_name: &str, mime: &str, bytes: Vec<u8>) -> Self {
        self.parts.push(UploadPart::File {
            name: name.to_string(),
            file_name: file_name.to_string(),
            mime: mime.to_string(),
            bytes,
        });
        self
    }

    /// Compose a fresh `reqwest` multipart form from the stored parts.
    pub(crate) fn to_multipart(&self) -> ApiResult<multipart::Form> {
        let mut form = multipart::Form::new();
        for part in &self.parts {
            form = match part {
                UploadPart::Text { name, value } => form.text(name.clone(), value.clone()),
                UploadPart::File {
                    name,
                    file_name,
                    mime,
                    bytes,
                } => {
                    let part = multipart::Part::bytes(bytes.clone())
                        .file_name(file_name.clone())
                        .mime_str(mime)?;
                    form.part(name.clone(), part)
                }
            };
        }
        Ok(form)
    }
}
