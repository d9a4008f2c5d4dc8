//! `multipart/form-data` request bodies.
//!
//! Build a [`Form`] from text fields and file [`Part`]s and hand it to
//! [`RequestBuilder::multipart`](crate::RequestBuilder::multipart). The wire
//! encoding is done by `common-multipart-rfc7578` when the request is sent.
//!
//! ```ignore
//! let form = Form::new()
//!     .text("category", "company")
//!     .text("subcategory", "marks")
//!     .part("file", Part::bytes(contents).file_name("mark.png").mime_str("image/png")?);
//! ```

use crate::error::HttpError;
use bytes::{Bytes, BytesMut};
use common_multipart_rfc7578::client::multipart as rfc7578;
use futures::TryStreamExt;
use mime::Mime;
use std::io::Cursor;

/// A file field of a multipart form
#[derive(Debug, Clone)]
pub struct Part {
    body: Bytes,
    file_name: Option<String>,
    mime: Option<Mime>,
}

impl Part {
    #[must_use]
    pub fn bytes(data: impl Into<Bytes>) -> Self {
        Self {
            body: data.into(),
            file_name: None,
            mime: None,
        }
    }

    /// Filename reported in `Content-Disposition`
    #[must_use]
    pub fn file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    /// Content type of the part
    #[must_use]
    pub fn mime(mut self, mime: Mime) -> Self {
        self.mime = Some(mime);
        self
    }

    /// # Errors
    /// `HttpError::InvalidContentType` if `mime` does not parse.
    pub fn mime_str(self, mime: &str) -> Result<Self, HttpError> {
        Ok(self.mime(mime.parse()?))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.body.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

#[derive(Debug, Clone)]
enum Field {
    Text(String),
    File(Part),
}

/// A `multipart/form-data` body under construction
#[derive(Debug, Clone, Default)]
pub struct Form {
    fields: Vec<(String, Field)>,
}

impl Form {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), Field::Text(value.into())));
        self
    }

    /// Append a file part; repeated names are sent as repeated fields
    #[must_use]
    pub fn part(mut self, name: impl Into<String>, part: Part) -> Self {
        self.fields.push((name.into(), Field::File(part)));
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Encode the form, returning the `Content-Type` (with boundary) and the body
    ///
    /// # Errors
    /// `HttpError::MultipartEncode` if the encoder fails to write a part.
    pub async fn encode(self) -> Result<(String, Bytes), HttpError> {
        let mut form = rfc7578::Form::default();
        for (name, field) in self.fields {
            match field {
                Field::Text(value) => form.add_text(name, value),
                Field::File(part) => {
                    let reader = Cursor::new(part.body);
                    match (part.file_name, part.mime) {
                        (Some(file_name), Some(mime)) => {
                            form.add_reader_file_with_mime(name, reader, file_name, mime);
                        }
                        (Some(file_name), None) => form.add_reader_file(name, reader, file_name),
                        (None, _) => form.add_reader(name, reader),
                    }
                }
            }
        }

        let content_type = form.content_type();
        let body = rfc7578::Body::from(form)
            .try_fold(BytesMut::new(), |mut buf, chunk| {
                buf.extend_from_slice(&chunk);
                futures::future::ready(Ok(buf))
            })
            .await
            .map_err(|e| HttpError::MultipartEncode(Box::new(e)))?;
        Ok((content_type, body.freeze()))
    }
}
