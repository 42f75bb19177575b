//! Loading views into the shadow document and rendering it.

use crate::{
	dom::Dom,
	error::{Error, ViewError},
	fetch::Fetch,
	history::History,
	location::Location,
	markup,
	router::{Rendered, Router},
	route::resolve_requested_page,
	settings::Config,
};
use tracing::{debug, instrument, trace, trace_span};

impl<D: Dom, H: History, L: Location, F: Fetch> Router<D, H, L, F> {
	/// Loads `page` into the shadow document's content region and renders it.
	///
	/// The home page is served from the embedded default content if so configured; every other page is fetched from
	/// `{base_path}{view_directory}/{page}?{query}`. Content problems are logged, not returned right away, and turn into a
	/// single [`Error::Fatal`] once loading is done. In that case nothing is rendered, though the shadow document may
	/// already hold the new content.
	///
	/// # Errors
	///
	/// [`Error::Fatal`] for logged content errors, structural errors ([`Error::Init`], [`Error::Update`],
	/// [`Error::Render`], [`Error::Dom`]) as they occur.
	#[instrument(skip(self))]
	pub async fn load_view(&mut self, page: Option<&str>, query: &str) -> Result<(), Error> {
		if let Err(structural) = self.fill_content(page, query).await {
			// Don't let this cycle's diagnostics leak into the next one.
			let discarded = self.context.error_log.drain_logged();
			debug!(discarded = discarded.len(), "Cycle aborted.");
			return Err(structural);
		}

		self.context.error_log.flush()?;

		if self.context.config.debug {
			return Ok(());
		}
		self.render()
	}

	async fn fill_content(&mut self, page: Option<&str>, query: &str) -> Result<(), Error> {
		let page = resolve_requested_page(page, &self.context.registry, &mut self.context.error_log);

		if !self.context.shadow.is_hydrated() {
			self.context.shadow.hydrate_from_default(&mut self.dom, self.container.as_ref(), self.default_content.as_ref())?;
			self.default_content = None;
		}

		let Some(page) = page else {
			return Ok(());
		};

		let is_index = self.context.registry.index().map_or(false, |index| index.source == page);
		if is_index && self.context.config.use_default_content {
			self.reconcile_default()
		} else {
			self.reconcile_fetched(&page, query).await
		}
	}

	fn reconcile_default(&mut self) -> Result<(), Error> {
		let selector = self.context.config.selectors.content.clone();
		let content = {
			let snapshot = self.context.shadow.default_snapshot().ok_or(Error::Init("default content not hydrated"))?;
			let region = snapshot
				.select(&selector)
				.map_err(|_| Error::Update(selector.clone()))?
				.ok_or_else(|| Error::Update(selector.clone()))?;
			snapshot.subtree(region).ok_or_else(|| Error::Update(selector.clone()))?
		};
		let outcome = self.context.shadow.reconcile(&selector, &content, content.root())?;
		debug!(?outcome, "Reconciled default content.");
		Ok(())
	}

	async fn reconcile_fetched(&mut self, page: &str, query: &str) -> Result<(), Error> {
		let config = &self.context.config;
		let mut url = format!("{}{}/{}", config.base_path, config.view_directory, page);
		if !query.is_empty() {
			url.push('?');
			url.push_str(query);
		}

		let body = match self.fetch.fetch(&url).await {
			Ok(response) => {
				if !response.ok {
					self.context.error_log.push(ViewError::Status {
						status: response.status,
						reason: response.status_text,
					});
				}
				response.body
			}
			Err(fetch_error) => {
				self.context.error_log.push(ViewError::Transport(fetch_error.to_string()));
				None
			}
		};

		let Some(body) = body else {
			self.context.error_log.push(ViewError::NotText);
			return Ok(());
		};
		if cfg!(feature = "dangerous-logging") {
			trace!(%url, %body, "Fetched view.");
		} else {
			trace!(%url, len = body.len(), "Fetched view.");
		}

		let content = markup::parse(&body);
		let selector = self.context.config.selectors.content.clone();
		let outcome = self.context.shadow.reconcile(&selector, &content, content.root())?;
		debug!(%url, ?outcome, "Reconciled fetched content.");
		Ok(())
	}

	/// Splices the shadow document into the live document as a new container, then re-binds links, marks the active
	/// navigation items, scrolls to the anchor and notifies [`Router::on_rendered`] subscribers.
	///
	/// # Errors
	///
	/// [`Error::Render`] if there is no container, [`Error::Dom`] if the live document refuses an operation.
	#[instrument(skip(self))]
	pub fn render(&mut self) -> Result<(), Error> {
		let container = self.container.clone().ok_or_else(|| Error::Render(self.context.config.container_selector.clone()))?;

		let new_container = self.context.shadow.materialize(&mut self.dom, &container)?;
		self.dom.replace(&container, &new_container)?;
		self.container = Some(new_container);

		self.bind_links()?;
		self.mark_active_nav_items()?;
		self.scroll_to_anchor()?;

		let (view, anchor) = self.active_page();
		self.context.rendered.emit(&Rendered { view, anchor });
		Ok(())
	}

	/// The page and anchor as last recorded in history, falling back to the latest route.
	fn active_page(&self) -> (String, String) {
		match (self.context.history.current(), &self.context.route) {
			(Some(state), _) => (state.page.clone(), state.anchor.clone()),
			(None, Some(route)) => (self.context.active_view.clone(), route.anchor.clone()),
			(None, None) => (self.context.active_view.clone(), String::new()),
		}
	}

	fn bind_links(&mut self) -> Result<(), Error> {
		for selector in &self.context.config.selectors.links {
			let span = trace_span!("bind_links", selector = selector.as_str());
			let _enter = span.enter();

			for link in self.dom.query_selector_all(selector)? {
				// A lone `#` would navigate to the page top instead of routing.
				if self.dom.attribute(&link, "href").map_or(false, |href| href.ends_with('#')) {
					self.dom.set_attribute(&link, "href", "")?;
				}
				self.dom.bind_link(&link, &self.sink);
			}
		}
		Ok(())
	}

	fn mark_active_nav_items(&mut self) -> Result<(), Error> {
		let selector = &self.context.config.selectors.nav_items;
		if selector.is_empty() {
			return Ok(());
		}

		let (page, anchor) = self.active_page();
		let anchor = anchor.trim_start_matches('#');
		for item in self.dom.query_selector_all(selector)? {
			let active = self.dom.attributes(&item).iter().any(|(_, value)| value.contains(&page) || (!anchor.is_empty() && value.contains(anchor)));
			self.dom.set_class(&item, Config::ACTIVE_CLASS, active);
		}
		Ok(())
	}

	fn scroll_to_anchor(&mut self) -> Result<(), Error> {
		let anchor = self.context.route.as_ref().map_or("", |route| route.anchor.as_str()).trim_start_matches('#');
		if anchor.is_empty() {
			self.dom.scroll_to(0.0, 0.0);
			return Ok(());
		}

		let selector = format!("[{}=\"{}\"]", self.context.config.anchor_attribute, anchor);
		if let Some(target) = self.dom.query_selector(&selector)? {
			let top = self.dom.offset_top(&target);
			trace!(anchor, top, "Scrolling to anchor.");
			self.dom.scroll_to(0.0, top);
		}
		Ok(())
	}
}
