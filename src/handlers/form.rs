//! Multipart form reading shared by the upload endpoints.

use crate::{
    errors::AppError,
    services::spool::{SpooledFile, UploadSpool},
};
use axum::extract::Multipart;
use futures::StreamExt;
use std::{collections::HashMap, io};

/// A parsed multipart body: spooled files plus plain text fields.
#[derive(Debug, Default)]
pub struct UploadForm {
    files: HashMap<String, SpooledFile>,
    fields: HashMap<String, String>,
}

impl UploadForm {
    /// Take ownership of a spooled file field.
    pub fn take_file(&mut self, name: &str) -> Option<SpooledFile> {
        self.files.remove(name)
    }

    /// Trimmed text value, `None` when absent or blank.
    pub fn text(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }
}

/// Drain `multipart`, spooling the parts named in `file_fields` to disk.
///
/// Only the first non-empty part per file field is kept. Other named parts
/// are read as text; unnamed parts are skipped.
pub async fn read_upload_form(
    spool: &UploadSpool,
    mut multipart: Multipart,
    file_fields: &[&str],
) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(format!("Multipart error: {}", e)))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if file_fields.contains(&name.as_str()) {
            if form.files.contains_key(&name) {
                continue;
            }
            let file_name = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(str::to_string);
            let stream = field.map(|chunk| chunk.map_err(io::Error::other));
            if let Some(spooled) = spool.spool_stream(file_name, content_type, stream).await? {
                form.files.insert(name, spooled);
            }
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| AppError::bad_request(format!("Failed to read `{}`: {}", name, e)))?;
            form.fields.entry(name).or_insert(value);
        }
    }

    Ok(form)
}
