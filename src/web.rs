//! Browser implementations of the collaborator traits, and [`start`] to wire them up.

use crate::{
	dom::Dom,
	error::{DomError, Error},
	fetch::{Fetch, FetchError, Response},
	history::{History, PageState},
	listeners::Subscription,
	location::{effective_fragment, LinkTarget, Location, NavigationSink, NavigationTrigger},
	router::{load_settings, Router},
};
use tracing::{error, info, instrument, trace, trace_span, warn};
use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use wasm_bindgen_futures::{spawn_local, JsFuture};

/// Dispatched on the window after each render.
pub const RENDERED_EVENT: &str = "hashview:rendered";

/// Global the host page may define before [`start`] to pass options, e.g. `window.__HASHVIEW_APP__ = { debug: true }`.
pub const HOST_OBJECT: &str = "__HASHVIEW_APP__";

/// Whether the [host object](`HOST_OBJECT`) asks for [debug mode](`crate::settings::Config::debug`).
///
/// Like in JavaScript, any truthy `debug` value counts. A missing host object means `false`.
#[must_use]
pub fn host_debug(window: &web_sys::Window) -> bool {
	js_sys::Reflect::get(window, &JsValue::from_str(HOST_OBJECT))
		.ok()
		.filter(|host| host.is_object())
		.and_then(|host| js_sys::Reflect::get(&host, &JsValue::from_str("debug")).ok())
		.map_or(false, |debug| debug.is_truthy())
}

fn describe(value: &JsValue) -> String {
	value.as_string().unwrap_or_else(|| format!("{:?}", value))
}

fn window() -> Result<web_sys::Window, Error> {
	web_sys::window().ok_or(Error::Init("no global `window`"))
}

/// A link click as seen by the shared link handler.
struct LinkEvent {
	event: web_sys::Event,
	event_type: String,
}

impl NavigationTrigger for LinkEvent {
	fn event_type(&self) -> &str {
		&self.event_type
	}

	fn link(&self) -> Option<LinkTarget> {
		let anchor = self.event.current_target()?.dyn_into::<web_sys::HtmlAnchorElement>().ok()?;
		Some(LinkTarget { host: anchor.host(), hash: anchor.hash() })
	}

	fn prevent_default(&self) {
		self.event.prevent_default();
	}
}

/// The live document of the current window.
///
/// Every bound link shares a single listener, so binding the same element again after a render is harmless.
/// Links stop routing once this instance is dropped.
#[derive(Debug)]
pub struct WebDom {
	window: web_sys::Window,
	document: web_sys::Document,
	link_handler: Option<Closure<dyn Fn(web_sys::Event)>>,
}

impl WebDom {
	/// # Errors
	///
	/// [`Error::Init`] iff `window` has no document.
	pub fn new(window: web_sys::Window) -> Result<Self, Error> {
		let document = window.document().ok_or(Error::Init("no document"))?;
		Ok(Self { window, document, link_handler: None })
	}

	fn element(node: &web_sys::Node) -> Result<&web_sys::Element, DomError> {
		node.dyn_ref::<web_sys::Element>().ok_or_else(|| DomError::new(format_args!("{:?} is not an element", node)))
	}

	fn link_handler(&mut self, sink: &NavigationSink) -> &Closure<dyn Fn(web_sys::Event)> {
		let location = self.window.location();
		let sink = sink.clone();
		self.link_handler.get_or_insert_with(move || {
			Closure::wrap(Box::new(move |event: web_sys::Event| {
				let trigger = LinkEvent { event_type: event.type_(), event };
				let span = trace_span!("link_handler", event_type = trigger.event_type.as_str());
				let _enter = span.enter();

				let fragment = effective_fragment(Some(&trigger), &location.host().unwrap_or_default(), location.hash().unwrap_or_default());
				if sink.unbounded_send(fragment).is_err() {
					warn!("Link activated after the router was dropped.");
				}
			}) as Box<dyn Fn(web_sys::Event)>)
		})
	}
}

impl Dom for WebDom {
	type Node = web_sys::Node;

	fn query_selector(&self, selector: &str) -> Result<Option<web_sys::Node>, DomError> {
		self.document
			.query_selector(selector)
			.map(|element| element.map(Into::into))
			.map_err(|error| DomError::new(describe(&error)))
	}

	fn query_selector_all(&self, selector: &str) -> Result<Vec<web_sys::Node>, DomError> {
		let list = self.document.query_selector_all(selector).map_err(|error| DomError::new(describe(&error)))?;
		Ok((0..list.length()).filter_map(|i| list.item(i)).collect())
	}

	fn tag_name(&self, node: &web_sys::Node) -> String {
		node.dyn_ref::<web_sys::Element>().map(web_sys::Element::tag_name).unwrap_or_default()
	}

	fn inner_html(&self, node: &web_sys::Node) -> String {
		node.dyn_ref::<web_sys::Element>().map(web_sys::Element::inner_html).unwrap_or_default()
	}

	fn first_child_value(&self, node: &web_sys::Node) -> Option<String> {
		node.first_child()?.node_value()
	}

	fn is_same_node(&self, a: &web_sys::Node, b: &web_sys::Node) -> bool {
		a.is_same_node(Some(b))
	}

	fn attributes(&self, node: &web_sys::Node) -> Vec<(String, String)> {
		let Some(element) = node.dyn_ref::<web_sys::Element>() else {
			return Vec::new();
		};
		element
			.get_attribute_names()
			.iter()
			.filter_map(|name| name.as_string())
			.filter_map(|name| element.get_attribute(&name).map(|value| (name, value)))
			.collect()
	}

	fn attribute(&self, node: &web_sys::Node, name: &str) -> Option<String> {
		node.dyn_ref::<web_sys::Element>()?.get_attribute(name)
	}

	fn set_attribute(&mut self, node: &web_sys::Node, name: &str, value: &str) -> Result<(), DomError> {
		Self::element(node)?.set_attribute(name, value).map_err(|error| DomError::new(describe(&error)))
	}

	fn set_class(&mut self, node: &web_sys::Node, class: &str, on: bool) {
		if let Some(element) = node.dyn_ref::<web_sys::Element>() {
			if let Err(error) = element.class_list().toggle_with_force(class, on) {
				warn!("Failed to toggle class {:?}: {}", class, describe(&error));
			}
		}
	}

	fn create_element(&mut self, tag: &str) -> Result<web_sys::Node, DomError> {
		self.document.create_element(tag).map(Into::into).map_err(|error| DomError::new(describe(&error)))
	}

	fn create_text(&mut self, text: &str) -> web_sys::Node {
		self.document.create_text_node(text).into()
	}

	fn create_comment(&mut self, comment: &str) -> web_sys::Node {
		self.document.create_comment(comment).into()
	}

	fn clone_empty(&mut self, node: &web_sys::Node) -> Result<web_sys::Node, DomError> {
		node.clone_node().map_err(|error| DomError::new(describe(&error)))
	}

	fn append_child(&mut self, parent: &web_sys::Node, child: &web_sys::Node) -> Result<(), DomError> {
		parent.append_child(child).map(drop).map_err(|error| DomError::new(describe(&error)))
	}

	fn remove(&mut self, node: &web_sys::Node) -> Result<(), DomError> {
		let parent = node.parent_node().ok_or_else(|| DomError::new(format_args!("{:?} has no parent", node)))?;
		parent.remove_child(node).map(drop).map_err(|error| DomError::new(describe(&error)))
	}

	fn replace(&mut self, old: &web_sys::Node, new: &web_sys::Node) -> Result<(), DomError> {
		let parent = old.parent_node().ok_or_else(|| DomError::new(format_args!("{:?} has no parent", old)))?;
		parent.replace_child(new, old).map(drop).map_err(|error| DomError::new(describe(&error)))
	}

	#[instrument(skip(self, sink))]
	fn bind_link(&mut self, link: &web_sys::Node, sink: &NavigationSink) {
		let handler = self.link_handler(sink).as_ref().unchecked_ref::<js_sys::Function>().clone();
		if let Err(error) = link.add_event_listener_with_callback("click", &handler) {
			error!("Failed to bind link: {}", describe(&error));
		}
	}

	fn offset_top(&self, node: &web_sys::Node) -> f64 {
		node.dyn_ref::<web_sys::HtmlElement>().map_or(0.0, |element| f64::from(element.offset_top()))
	}

	fn scroll_to(&mut self, x: f64, y: f64) {
		self.window.scroll_to_with_x_and_y(x, y);
	}

	fn title(&self) -> String {
		self.document.title()
	}
}

#[derive(Debug)]
pub struct WebHistory(web_sys::History);

impl WebHistory {
	/// # Errors
	///
	/// [`Error::Init`] iff `window.history` is unavailable.
	pub fn new(window: &web_sys::Window) -> Result<Self, Error> {
		window.history().map(Self).map_err(|_| Error::Init("no history"))
	}

	fn state(state: &PageState) -> JsValue {
		serde_json::to_string(state).ok().and_then(|json| js_sys::JSON::parse(&json).ok()).unwrap_or(JsValue::NULL)
	}
}

impl History for WebHistory {
	fn push_state(&mut self, state: &PageState, title: &str, url: &str) {
		if let Err(error) = self.0.push_state_with_url(&Self::state(state), title, Some(url)) {
			error!("Failed to push history state: {}", describe(&error));
		}
	}

	fn replace_state(&mut self, state: &PageState, title: &str, url: &str) {
		if let Err(error) = self.0.replace_state_with_url(&Self::state(state), title, Some(url)) {
			error!("Failed to replace history state: {}", describe(&error));
		}
	}
}

#[derive(Debug, Clone)]
pub struct WebLocation {
	window: web_sys::Window,
}

impl WebLocation {
	#[must_use]
	pub fn new(window: web_sys::Window) -> Self {
		Self { window }
	}
}

impl Location for WebLocation {
	fn hash(&self) -> String {
		self.window.location().hash().unwrap_or_default()
	}

	fn host(&self) -> String {
		self.window.location().host().unwrap_or_default()
	}

	fn pathname(&self) -> String {
		self.window.location().pathname().unwrap_or_default()
	}

	/// Listens for `hashchange` on the window.
	fn watch_fragment(&mut self, sink: NavigationSink) -> Subscription {
		let location = self.window.location();
		let handler = Closure::wrap(Box::new(move |_: web_sys::Event| {
			if sink.unbounded_send(location.hash().unwrap_or_default()).is_err() {
				trace!("Navigation sink closed.");
			}
		}) as Box<dyn Fn(web_sys::Event)>);

		if let Err(error) = self.window.add_event_listener_with_callback("hashchange", handler.as_ref().unchecked_ref()) {
			error!("Failed to watch `hashchange`: {}", describe(&error));
		}

		let window = self.window.clone();
		Subscription::new(move || {
			if let Err(error) = window.remove_event_listener_with_callback("hashchange", handler.as_ref().unchecked_ref()) {
				error!("Failed to stop watching `hashchange`: {}", describe(&error));
			}
		})
	}
}

#[derive(Debug, Clone)]
pub struct WebFetch {
	window: web_sys::Window,
}

impl WebFetch {
	#[must_use]
	pub fn new(window: web_sys::Window) -> Self {
		Self { window }
	}
}

impl Fetch for WebFetch {
	async fn fetch(&self, url: &str) -> Result<Response, FetchError> {
		let response = JsFuture::from(self.window.fetch_with_str(url)).await.map_err(|error| FetchError(describe(&error)))?;
		let response: web_sys::Response = response.dyn_into().map_err(|value| FetchError(describe(&value)))?;

		let body = match response.text() {
			Ok(text) => JsFuture::from(text).await.ok().and_then(|text| text.as_string()),
			Err(_) => None,
		};
		Ok(Response {
			ok: response.ok(),
			status: response.status(),
			status_text: response.status_text(),
			body,
		})
	}
}

/// Loads the settings at `settings_url`, routes to the current location and keeps serving navigations in the
/// background.
///
/// Debug mode is taken from [`host_debug`]. Also installs [`tracing_wasm`] as global default subscriber.
pub fn start(settings_url: impl Into<String>) {
	let settings_url = settings_url.into();
	tracing_wasm::set_as_global_default();
	spawn_local(async move {
		if let Err(start_error) = serve(&settings_url).await {
			error!("{}", start_error);
		}
	});
}

#[instrument]
async fn serve(settings_url: &str) -> Result<(), Error> {
	let window = window()?;
	let fetch = WebFetch::new(window.clone());
	let settings = load_settings(&fetch, settings_url).await?;

	let mut router = Router::new(&settings, WebDom::new(window.clone())?, WebHistory::new(&window)?, WebLocation::new(window.clone()), fetch)?;
	router.config_mut().debug = host_debug(&window);

	let target = window;
	router
		.on_rendered(move |rendered| {
			trace!(?rendered, "Dispatching {}.", RENDERED_EVENT);
			let dispatched = web_sys::Event::new(RENDERED_EVENT).and_then(|event| target.dispatch_event(&event));
			if let Err(error) = dispatched {
				warn!("Failed to dispatch {}: {}", RENDERED_EVENT, describe(&error));
			}
		})
		.forget();

	if let Err(route_error) = router.route(None).await {
		error!("{}", route_error);
	}
	info!("Serving navigations.");
	router.run().await;
	Ok(())
}
