//! The router entry point and the application context it owns.

use crate::{
	dom::Dom,
	error::{Error, ErrorLog, SettingsError},
	fetch::Fetch,
	history::{History, HistorySync},
	listeners::{Listeners, Subscription},
	location::{effective_fragment, Location, NavigationSink, NavigationTrigger},
	registry::PageRegistry,
	route::{parse_fragment, RouteComponents},
	settings::{Config, Settings},
	shadow::ShadowStore,
};
use futures::{
	channel::mpsc::{self, UnboundedReceiver},
	FutureExt as _, StreamExt as _,
};
use tracing::{debug, error, info, instrument};

/// Emitted to [`Router::on_rendered`] subscribers after each render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
	pub view: String,
	pub anchor: String,
}

/// Everything a navigation cycle reads and writes, apart from the collaborators.
#[derive(Debug)]
pub struct Context {
	pub config: Config,
	pub registry: PageRegistry,
	pub shadow: ShadowStore,
	pub error_log: ErrorLog,
	pub history: HistorySync,
	pub active_view: String,
	/// Components of the most recent navigation.
	pub route: Option<RouteComponents>,
	pub(crate) rendered: Listeners<Rendered>,
}

impl Context {
	#[must_use]
	pub fn new(config: Config, registry: PageRegistry) -> Self {
		Self {
			config,
			registry,
			shadow: ShadowStore::new(),
			error_log: ErrorLog::new(),
			history: HistorySync::new(),
			active_view: String::new(),
			route: None,
			rendered: Listeners::new(),
		}
	}
}

/// Fetches and parses the settings document at `url`.
///
/// # Errors
///
/// [`Error::Settings`] (after logging it) if the response is not a success, has no body or does not parse.
#[instrument(skip(fetch))]
pub async fn load_settings<F: Fetch>(fetch: &F, url: &str) -> Result<Settings, Error> {
	let result = match fetch.fetch(url).await {
		Ok(response) if !response.ok => Err(SettingsError::Status {
			status: response.status,
			reason: response.status_text,
		}),
		Ok(response) => response.body.ok_or(SettingsError::NotText).and_then(|body| Settings::from_json(&body)),
		Err(fetch_error) => Err(SettingsError::Transport(fetch_error.to_string())),
	};
	result.map_err(|settings_error| {
		let settings_error = Error::Settings(settings_error);
		error!("{}", settings_error);
		settings_error
	})
}

/// Maps fragments to views and keeps the live document and history in step with them.
///
/// Navigations requested while a cycle is in progress are queued and handled one at a time by [`Router::run`].
pub struct Router<D: Dom, H, L, F> {
	pub(crate) context: Context,
	pub(crate) dom: D,
	pub(crate) history: H,
	pub(crate) location: L,
	pub(crate) fetch: F,
	pub(crate) container: Option<D::Node>,
	pub(crate) default_content: Option<D::Node>,
	fragment_watch: Option<Subscription>,
	pub(crate) sink: NavigationSink,
	inbox: UnboundedReceiver<String>,
}

impl<D: Dom, H: History, L: Location, F: Fetch> Router<D, H, L, F> {
	/// Looks up the container and default content in `dom` and sets up the context from `settings`.
	///
	/// Missing nodes are not an error here; they surface when the first view is loaded or rendered.
	///
	/// # Errors
	///
	/// [`Error::Dom`] iff a configured selector is invalid.
	pub fn new(settings: &Settings, dom: D, history: H, location: L, fetch: F) -> Result<Self, Error> {
		let config = Config::from_settings(settings, location.pathname());
		Self::with_config(config, settings.registry(), dom, history, location, fetch)
	}

	/// # Errors
	///
	/// [`Error::Dom`] iff a configured selector is invalid.
	pub fn with_config(config: Config, registry: PageRegistry, dom: D, history: H, location: L, fetch: F) -> Result<Self, Error> {
		let container = dom.query_selector(&config.container_selector)?;
		let default_content = dom.query_selector(&config.default_content_selector)?;
		let (sink, inbox) = mpsc::unbounded();
		info!(pages = registry.pages().count(), container = container.is_some(), default_content = default_content.is_some(), "Router initialized.");

		Ok(Self {
			context: Context::new(config, registry),
			dom,
			history,
			location,
			fetch,
			container,
			default_content,
			fragment_watch: None,
			sink,
			inbox,
		})
	}

	#[must_use]
	pub fn context(&self) -> &Context {
		&self.context
	}

	pub fn config_mut(&mut self) -> &mut Config {
		&mut self.context.config
	}

	#[must_use]
	pub fn dom(&self) -> &D {
		&self.dom
	}

	#[must_use]
	pub fn history(&self) -> &H {
		&self.history
	}

	#[must_use]
	pub fn location(&self) -> &L {
		&self.location
	}

	#[must_use]
	pub fn fetch(&self) -> &F {
		&self.fetch
	}

	/// The live container as of the last render.
	#[must_use]
	pub fn container(&self) -> Option<&D::Node> {
		self.container.as_ref()
	}

	/// A sender for fragments to navigate to, e.g. for link handlers. Navigations are processed in order by [`Router::run`].
	#[must_use]
	pub fn navigation_sink(&self) -> NavigationSink {
		self.sink.clone()
	}

	/// Calls `callback` after every completed render.
	pub fn on_rendered(&self, callback: impl FnMut(&Rendered) + 'static) -> Subscription {
		self.context.rendered.subscribe(callback)
	}

	/// Whether fragment changes are currently being watched.
	#[must_use]
	pub fn is_watching(&self) -> bool {
		self.fragment_watch.is_some()
	}

	/// Stops watching fragment changes. The next [`Router::route`] resumes.
	pub fn unwatch(&mut self) {
		self.fragment_watch = None;
	}

	/// Routes to the current location, or to where `trigger` points.
	///
	/// On first use this also starts watching the location for fragment changes.
	///
	/// # Errors
	///
	/// [`Error::Routing`] if the fragment can't be resolved, otherwise whatever [`Router::navigate`] fails with.
	#[instrument(skip_all)]
	pub async fn route(&mut self, trigger: Option<&dyn NavigationTrigger>) -> Result<(), Error> {
		if self.fragment_watch.is_none() {
			self.fragment_watch = Some(self.location.watch_fragment(self.sink.clone()));
			debug!("Watching fragment changes.");
		}

		let fragment = effective_fragment(trigger, &self.location.host(), self.location.hash());
		self.navigate(&fragment).await
	}

	/// Runs one navigation cycle for `fragment`.
	///
	/// # Errors
	///
	/// [`Error::Routing`] if the registry can't resolve anything, [`Error::Fatal`] if the cycle logged errors, or a
	/// structural error from loading and rendering.
	#[instrument(skip(self))]
	pub async fn navigate(&mut self, fragment: &str) -> Result<(), Error> {
		let components = parse_fragment(fragment, &self.context.registry).ok_or_else(|| Error::Routing(fragment.to_owned()))?;
		self.context.active_view.clone_from(&components.view);
		self.context.route = Some(components.clone());

		if self.context.config.debug {
			return Ok(());
		}

		let title = self.dom.title();
		let context = &mut self.context;
		context.history.synchronize(&components, &context.active_view, &context.registry, &context.config.base_path, &mut self.history, &title);

		self.load_view(Some(&components.request_source), &components.query).await
	}

	/// Handles queued navigations one at a time for as long as the router lives, logging failed cycles.
	pub async fn run(&mut self) {
		while let Some(fragment) = self.inbox.next().await {
			if let Err(navigation_error) = self.navigate(&fragment).await {
				error!("{}", navigation_error);
			}
		}
	}

	/// Handles the navigations queued so far without waiting for more.
	pub async fn run_pending(&mut self) -> Vec<Result<(), Error>> {
		let mut results = Vec::new();
		while let Some(Some(fragment)) = self.inbox.next().now_or_never() {
			results.push(self.navigate(&fragment).await);
		}
		results
	}
}
