//! Error taxonomy and the per-cycle [`ErrorLog`].
//!
//! Structural problems (a missing container, a missing reconciliation target, an absent registry) are returned immediately.
//! Transient content problems are [pushed](`ErrorLog::push`) instead, so that one navigation cycle can collect several of them
//! before [`ErrorLog::flush`] turns them into a single [`Error::Fatal`].

use core::fmt::{self, Display, Formatter};
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum Error {
	/// The fragment could not be turned into route components.
	#[error("APPLICATION ERROR ~>> Unable to display view (no route for fragment {0:?})")]
	Routing(String),

	#[error("APPLICATION ERROR ~>> Unable to retrieve settings: {0}")]
	Settings(#[from] SettingsError),

	#[error("{0}")]
	View(#[from] ViewError),

	/// The configured container is not present in the live document.
	#[error("APPLICATION ERROR ~>> Unable to render page (container {0:?} not found)")]
	Render(String),

	/// No shadow document node matches the reconciliation target.
	#[error("APPLICATION ERROR ~>> Unable to update DOM (no node matches {0:?})")]
	Update(String),

	#[error("APPLICATION ERROR ~>> Initialization error ({0})")]
	Init(&'static str),

	#[error("APPLICATION ERROR ~>> Live document operation failed: {0}")]
	Dom(#[from] DomError),

	/// Raised by [`ErrorLog::flush`] with everything that was drained from the log.
	#[error("APPLICATION ERROR ~>> An error has occurred. Application has stopped ({} error(s) logged)", .0.len())]
	Fatal(Vec<Error>),
}

impl Error {
	/// Whether this is a [`Error::View`] (directly or within a [`Error::Fatal`]) matching `predicate`.
	#[must_use]
	pub fn has_view_error(&self, predicate: impl Fn(&ViewError) -> bool + Copy) -> bool {
		match self {
			Self::View(view_error) => predicate(view_error),
			Self::Fatal(errors) => errors.iter().any(|e| e.has_view_error(predicate)),
			_ => false,
		}
	}
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ViewError {
	/// The content fetch completed with a non-success status.
	#[error("PAGE ERROR ~>> [{status}] {reason}")]
	Status { status: u16, reason: String },

	#[error("PAGE ERROR ~>> {0}")]
	Transport(String),

	/// Nothing textual was obtained for the view.
	#[error("APPLICATION ERROR ~>> Unable to display view")]
	NotText,

	#[error("PAGE ERROR ~>> Invalid requested page ({0})")]
	InvalidPage(&'static str),
}

#[derive(Debug, Error)]
pub enum SettingsError {
	#[error("[{status}] {reason}")]
	Status { status: u16, reason: String },

	#[error("{0}")]
	Transport(String),

	#[error("settings response had no text body")]
	NotText,

	#[error("malformed settings")]
	Json(#[from] serde_json::Error),
}

/// Failure reported by a [`Dom`](`crate::dom::Dom`) implementation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct DomError(pub String);

impl DomError {
	pub fn new(message: impl Display) -> Self {
		Self(message.to_string())
	}
}

/// Ordered list of recoverable errors, drained once per navigation cycle.
#[derive(Debug, Default)]
pub struct ErrorLog(Vec<Error>);

impl ErrorLog {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	pub fn push(&mut self, error: impl Into<Error>) {
		self.0.push(error.into());
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.0.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = &Error> {
		self.0.iter()
	}

	/// Logs every recorded error and empties the log, handing the records back.
	pub fn drain_logged(&mut self) -> Vec<Error> {
		let errors = core::mem::take(&mut self.0);
		for error in &errors {
			error!("{}", error);
		}
		errors
	}

	/// Logs and drains every recorded error.
	///
	/// # Errors
	///
	/// [`Error::Fatal`] carrying the drained records if there were any.
	pub fn flush(&mut self) -> Result<(), Error> {
		let errors = self.drain_logged();
		if errors.is_empty() {
			Ok(())
		} else {
			Err(Error::Fatal(errors))
		}
	}
}

impl Display for ErrorLog {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		for (i, error) in self.0.iter().enumerate() {
			if i > 0 {
				writeln!(f)?;
			}
			write!(f, "{}", error)?;
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn flush_is_silent_when_empty() {
		let mut log = ErrorLog::new();
		assert!(log.flush().is_ok());
	}

	#[test]
	fn flush_drains_in_order() {
		let mut log = ErrorLog::new();
		log.push(ViewError::Status { status: 404, reason: "Not Found".to_owned() });
		log.push(ViewError::NotText);
		assert_eq!(log.len(), 2);

		match log.flush() {
			Err(Error::Fatal(errors)) => {
				assert_eq!(errors.len(), 2);
				assert!(matches!(errors[0], Error::View(ViewError::Status { status: 404, .. })));
				assert!(matches!(errors[1], Error::View(ViewError::NotText)));
			}
			other => panic!("expected fatal error, got {:?}", other),
		}
		assert!(log.is_empty());
		assert!(log.flush().is_ok());
	}

	#[test]
	fn drain_logged_empties_without_failing() {
		let mut log = ErrorLog::new();
		assert!(log.drain_logged().is_empty());

		log.push(ViewError::Transport("offline".to_owned()));
		let drained = log.drain_logged();
		assert_eq!(drained.len(), 1);
		assert!(matches!(drained[0], Error::View(ViewError::Transport(_))));
		assert!(log.is_empty());
		assert!(log.flush().is_ok());
	}

	#[test]
	fn status_message_names_code_and_reason() {
		let message = ViewError::Status { status: 404, reason: "Not Found".to_owned() }.to_string();
		assert!(message.contains("404"));
		assert!(message.contains("Not Found"));
	}
}
