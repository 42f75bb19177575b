#![cfg(target_arch = "wasm32")]

use futures::{channel::mpsc, FutureExt as _, StreamExt as _};
use hashview::{
	fetch::{Fetch, FetchError, Response},
	web::{host_debug, WebDom, WebHistory, WebLocation, HOST_OBJECT},
	Dom, Location, Router, Settings,
};
use std::sync::Once;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};
use web_sys::{window, HtmlElement};

wasm_bindgen_test_configure!(run_in_browser);

static LOG_INITIALIZED: Once = Once::new();

fn init() -> web_sys::Window {
	LOG_INITIALIZED.call_once(tracing_wasm::set_as_global_default);
	window().unwrap()
}

fn mount(window: &web_sys::Window, markup: &str) {
	let body = window.document().unwrap().body().unwrap();
	body.set_inner_html(markup);
}

struct Offline;

impl Fetch for Offline {
	async fn fetch(&self, url: &str) -> Result<Response, FetchError> {
		Err(FetchError(format!("offline: {}", url)))
	}
}

#[wasm_bindgen_test]
fn debug_flag_comes_from_the_host_object() {
	let window = init();
	let key = JsValue::from_str(HOST_OBJECT);

	js_sys::Reflect::delete_property(&window, &key).unwrap();
	assert!(!host_debug(&window));

	let host = js_sys::Object::new();
	js_sys::Reflect::set(&host, &JsValue::from_str("debug"), &JsValue::from_f64(1.0)).unwrap();
	js_sys::Reflect::set(&window, &key, &host).unwrap();
	assert!(host_debug(&window));

	js_sys::Reflect::set(&host, &JsValue::from_str("debug"), &JsValue::FALSE).unwrap();
	assert!(!host_debug(&window));

	js_sys::Reflect::delete_property(&window, &key).unwrap();
}

#[wasm_bindgen_test]
fn intercepted_click_reaches_the_sink() {
	let window = init();
	mount(&window, r##"<a id="about" href="#/about">About</a>"##);
	let hash_before = window.location().hash().unwrap();

	let mut dom = WebDom::new(window.clone()).unwrap();
	let (sink, mut inbox) = mpsc::unbounded();
	let link = dom.query_selector("#about").unwrap().unwrap();
	dom.bind_link(&link, &sink);
	dom.bind_link(&link, &sink);

	link.dyn_into::<HtmlElement>().unwrap().click();

	assert_eq!(inbox.next().now_or_never(), Some(Some("#/about".to_owned())));
	assert!(inbox.next().now_or_never().is_none());
	assert_eq!(window.location().hash().unwrap(), hash_before);
}

#[wasm_bindgen_test]
async fn default_content_is_rendered_into_a_new_container() {
	let window = init();
	mount(
		&window,
		r##"<div id="app"><nav><a href="#/">Home</a><a href="#">Top</a></nav><main id="content"><h1>Home</h1></main></div>"##,
	);

	let settings = Settings::from_json(
		r##"{
			"app-selectors": { "links": ["nav a"], "nav-items": "nav a", "content": "#content" },
			"container-selector": "#app",
			"default-content-selector": "#app",
			"view-directory": "views",
			"views": { "defaults": { "index": { "route": "", "source": "home.html" }, "noroute": { "route": "404", "source": "404.html" } } }
		}"##,
	)
	.unwrap();
	let location = WebLocation::new(window.clone());
	let hash = location.hash();
	let mut router = Router::new(&settings, WebDom::new(window.clone()).unwrap(), WebHistory::new(&window).unwrap(), location, Offline).unwrap();
	let old = router.container().cloned().unwrap();

	router.navigate("#/").await.unwrap();

	let document = window.document().unwrap();
	let app = document.query_selector("#app").unwrap().unwrap();
	assert!(!old.is_same_node(Some(&*app)));
	assert_eq!(document.query_selector("#app #content").unwrap().unwrap().inner_html(), "<h1>Home</h1>");
	assert_eq!(document.query_selector("nav a:last-child").unwrap().unwrap().get_attribute("href").as_deref(), Some(""));

	window.history().unwrap().replace_state_with_url(&wasm_bindgen::JsValue::NULL, "", Some(&format!("{}{}", window.location().pathname().unwrap(), hash))).unwrap();
}
