use thiserror::Error;

/// A completed fetch. Non-success statuses are still responses, not errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
	pub ok: bool,
	pub status: u16,
	pub status_text: String,
	/// The body read as text, or [`None`] if it couldn't be.
	pub body: Option<String>,
}

impl Response {
	/// A `200 OK` with `body`.
	pub fn ok(body: impl Into<String>) -> Self {
		Self {
			ok: true,
			status: 200,
			status_text: "OK".to_owned(),
			body: Some(body.into()),
		}
	}

	/// A non-success response. `ok` is derived from `status`.
	pub fn status(status: u16, status_text: impl Into<String>, body: Option<String>) -> Self {
		Self {
			ok: (200..300).contains(&status),
			status,
			status_text: status_text.into(),
			body,
		}
	}
}

/// The request never produced a response.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct FetchError(pub String);

/// The network read used for settings and views.
#[allow(async_fn_in_trait)]
pub trait Fetch {
	/// # Errors
	///
	/// Only for transport failures. HTTP error statuses are reported through [`Response::ok`].
	async fn fetch(&self, url: &str) -> Result<Response, FetchError>;
}
