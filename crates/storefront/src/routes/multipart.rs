//! Collects a `multipart/form-data` body into text fields and file parts.

use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::Multipart;

use crate::error::{AppError, Result};

/// A fully read multipart form.
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    files: Vec<(String, Bytes)>,
}

impl MultipartForm {
    /// Read every part. Parts with a file name are files, even when empty.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for a malformed or oversized body.
    pub async fn read(mut multipart: Multipart) -> Result<Self> {
        let mut form = Self::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(format!("Invalid form data: {e}")))?
        {
            let name = field.name().unwrap_or_default().to_owned();
            let is_file = field.file_name().is_some();
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(format!("Invalid form data: {e}")))?;

            if is_file {
                form.files.push((name, data));
            } else {
                form.fields
                    .insert(name, String::from_utf8_lossy(&data).into_owned());
            }
        }
        Ok(form)
    }

    /// A text field, trimmed. Missing fields are empty.
    #[must_use]
    pub fn text(&self, name: &str) -> &str {
        self.fields.get(name).map_or("", |v| v.trim())
    }

    /// Non-empty uploads sent under `name`, in order.
    pub fn files<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Bytes> + 'a {
        self.files
            .iter()
            .filter(move |(field, data)| field == name && !data.is_empty())
            .map(|(_, data)| data)
    }
}
