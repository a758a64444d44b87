use crate::{
	config::ConfigError,
	store::{FileId, StoreError, TagId},
	suggestion::OracleError,
};

use std::{
	fmt::{self, Display},
	path::Path,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
	#[error("directory not found: <id='{0}'>")]
	DirectoryNotFound(FileId),
	#[error("tag not found: <id='{0}'>")]
	TagNotFound(TagId),
	#[error("no image file was found: <ids={0:?}>")]
	ImageFileNotFound(Vec<FileId>),
	#[error("library has no file records to build a directory tree from")]
	EmptyLibrary,
	#[error("already exists: {0}")]
	AlreadyExists(String),
	#[error("invalid argument: {0}")]
	InvalidArgument(String),

	#[error(transparent)]
	Store(#[from] StoreError),
	#[error(transparent)]
	Oracle(#[from] OracleError),
	#[error(transparent)]
	Config(#[from] ConfigError),
	#[error(transparent)]
	Batch(#[from] ErrorList),
}

/// Coarse classification callers use to pick a user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
	NotFound,
	AlreadyExists,
	InvalidArgument,
	Internal,
	Batch,
}

impl Error {
	#[must_use]
	pub const fn kind(&self) -> ErrorKind {
		match self {
			Self::DirectoryNotFound(_)
			| Self::TagNotFound(_)
			| Self::ImageFileNotFound(_)
			| Self::EmptyLibrary => ErrorKind::NotFound,
			Self::AlreadyExists(_) => ErrorKind::AlreadyExists,
			Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
			Self::Batch(_) => ErrorKind::Batch,
			Self::Store(_) | Self::Oracle(_) | Self::Config(_) => ErrorKind::Internal,
		}
	}

	#[must_use]
	pub const fn is_not_found(&self) -> bool {
		matches!(self.kind(), ErrorKind::NotFound)
	}
}

/// Every independent failure of a batch operation, kept in the order they happened.
#[derive(Error, Debug, Default)]
pub struct ErrorList(Vec<Error>);

impl ErrorList {
	#[must_use]
	pub const fn new() -> Self {
		Self(Vec::new())
	}

	pub fn push(&mut self, error: impl Into<Error>) {
		self.0.push(error.into());
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn iter(&self) -> impl Iterator<Item = &Error> {
		self.0.iter()
	}

	#[must_use]
	pub fn into_inner(self) -> Vec<Error> {
		self.0
	}

	/// `Ok(value)` when nothing failed, otherwise every collected error.
	pub fn into_result<T>(self, value: T) -> Result<T, Error> {
		if self.0.is_empty() {
			Ok(value)
		} else {
			Err(Error::Batch(self))
		}
	}
}

impl Display for ErrorList {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} error(s) occurred:", self.0.len())?;
		for e in &self.0 {
			write!(f, "\n\t- {e}")?;
		}
		Ok(())
	}
}

impl IntoIterator for ErrorList {
	type Item = Error;
	type IntoIter = std::vec::IntoIter<Error>;

	fn into_iter(self) -> Self::IntoIter {
		self.0.into_iter()
	}
}

impl FromIterator<Error> for ErrorList {
	fn from_iter<I: IntoIterator<Item = Error>>(iter: I) -> Self {
		Self(iter.into_iter().collect())
	}
}

/// File I/O error that includes the path that caused the error
#[derive(Error, Debug)]
pub struct FileIOError {
	pub path: Box<Path>,
	#[source]
	pub source: std::io::Error,
	pub maybe_context: Option<String>,
}

impl Display for FileIOError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"file I/O error{}: {}; path: '{}'",
			self.maybe_context
				.as_ref()
				.map(|ctx| format!(" ({ctx})"))
				.unwrap_or_default(),
			self.source,
			self.path.display()
		)
	}
}

impl FileIOError {
	pub fn from_std_io_err(path: impl AsRef<Path>, source: std::io::Error) -> Self {
		Self {
			path: path.as_ref().into(),
			source,
			maybe_context: None,
		}
	}

	pub fn from_std_io_err_with_msg(
		path: impl AsRef<Path>,
		source: std::io::Error,
		msg: impl Into<String>,
	) -> Self {
		Self {
			path: path.as_ref().into(),
			source,
			maybe_context: Some(msg.into()),
		}
	}
}

impl<P: AsRef<Path>> From<(P, std::io::Error)> for FileIOError {
	fn from((path, source): (P, std::io::Error)) -> Self {
		Self::from_std_io_err(path, source)
	}
}
