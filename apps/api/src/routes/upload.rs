use std::collections::HashMap;

use axum::extract::Multipart;

use crate::errors::AppError;
use crate::storage::Upload;

/// A multipart form with one `file` part and any number of text parts.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub file: Option<Upload>,
    pub fields: HashMap<String, String>,
}

impl UploadForm {
    pub async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = UploadForm::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
        {
            let name = field.name().unwrap_or_default().to_string();
            if name == "file" {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Could not read uploaded file: {e}")))?;
                form.file = Some(Upload {
                    file_name,
                    content_type,
                    bytes,
                });
            } else {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Could not read field {name}: {e}")))?;
                form.fields.insert(name, value);
            }
        }
        Ok(form)
    }

    /// The uploaded file; a form without a non-empty one is a validation error.
    pub fn require_file(&mut self) -> Result<Upload, AppError> {
        self.file
            .take()
            .filter(|upload| !upload.bytes.is_empty())
            .ok_or_else(|| AppError::Validation("A non-empty 'file' part is required".to_string()))
    }

    /// Trimmed text field, `None` when absent or blank.
    pub fn text(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }
}
