#![doc(html_root_url = "https://docs.rs/hashview/0.0.1")]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! A fragment router for single-page apps.
//!
//! `location.hash` is resolved against a [`PageRegistry`], the matching view is reconciled into an owned shadow
//! document, and that document is spliced into the page as a whole new container.
//!
//! The browser is reached only through the [`Dom`], [`History`], [`Location`] and [`Fetch`] traits.
//! [`web`] implements them with [`web_sys`], [`headless`] (and [`MemoryHistory`]) without a browser.

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

pub mod dom;
pub mod error;
pub mod fetch;
pub mod headless;
pub mod history;
pub mod listeners;
pub mod location;
pub mod markup;
pub mod registry;
pub mod route;
pub mod router;
pub mod selector;
pub mod settings;
pub mod shadow;
pub mod tree;
mod view;
pub mod web;

pub use dom::Dom;
pub use error::{Error, ViewError};
pub use fetch::{Fetch, Response};
pub use history::{History, MemoryHistory, PageState};
pub use listeners::Subscription;
pub use location::{Location, NavigationTrigger};
pub use registry::{PageEntry, PageRegistry};
pub use router::{load_settings, Rendered, Router};
pub use settings::{Config, Settings};
