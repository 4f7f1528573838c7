/// Per-navigation context
///
/// A fresh [`Context`] is created for every `show`/`replace` call and shared
/// as `Rc<Context>` through the dispatch walk. Fields fixed at creation are
/// plain public fields; what middleware may change (params, state, handled
/// flag, matched pattern) lives behind interior mutability so a context can
/// be handed to the exit chain of a nested navigation while its own entry
/// handler is still running.

use std::borrow::Cow;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use serde_json::Value;

use crate::path::{decode_component, split_query, strip_base};

/// Parameters extracted from matched routes
pub type Params = HashMap<String, String>;

/// History state payload
pub type State = serde_json::Map<String, Value>;

/// Router settings a context is created under
#[derive(Debug, Clone, Default)]
pub struct ContextSettings {
    /// Effective base path (already resolved by the router)
    pub base: String,
    pub hashbang: bool,
    pub decode_url_components: bool,
}

#[derive(Debug)]
pub struct Context {
    /// Requested path including base prefix and `#!` marker
    pub canonical_path: String,
    /// Canonical path without base (and without `#!`); keeps the query string
    pub path: String,
    /// Decoded path portion, without query string or fragment
    pub pathname: String,
    /// Decoded fragment (always empty in hashbang mode)
    pub hash: String,
    /// Document title at creation
    pub title: String,
    raw_querystring: String,
    decode_url_components: bool,
    init: Cell<bool>,
    params: RefCell<Params>,
    state: RefCell<State>,
    handled: Cell<Option<bool>>,
    route_path: RefCell<Option<String>>,
}

impl Context {
    /// Creates a context for a requested path
    ///
    /// # Examples
    ///
    /// ```
    /// use waymark_router::{Context, ContextSettings};
    ///
    /// let settings = ContextSettings {
    ///     base: "/app".to_string(),
    ///     hashbang: false,
    ///     decode_url_components: true,
    /// };
    /// let ctx = Context::new("/user/42?tab=info#bio", None, &settings, String::new());
    ///
    /// assert_eq!(ctx.canonical_path, "/app/user/42?tab=info#bio");
    /// assert_eq!(ctx.path, "/user/42?tab=info");
    /// assert_eq!(ctx.querystring(), "tab=info");
    /// assert_eq!(ctx.hash, "bio");
    /// ```
    pub fn new(path: &str, state: Option<State>, settings: &ContextSettings, title: String) -> Self {
        let base = settings.base.as_str();
        let decode = settings.decode_url_components;

        let canonical_path = if path.starts_with('/') && !path.starts_with(base) {
            let marker = if settings.hashbang { "#!" } else { "" };
            format!("{base}{marker}{path}")
        } else {
            path.to_string()
        };

        let mut ctx_path = strip_base(&canonical_path, base).to_string();
        if settings.hashbang {
            ctx_path = ctx_path.replacen("#!", "", 1);
            if ctx_path.is_empty() {
                ctx_path = "/".to_string();
            }
        }

        let (before_query, query) = split_query(&canonical_path);
        let mut raw_querystring = query.unwrap_or("").to_string();
        let mut pathname = decode_component(before_query, decode).into_owned();
        let mut hash = String::new();

        if !settings.hashbang {
            let split = ctx_path
                .split_once('#')
                .map(|(head, fragment)| (head.to_string(), fragment.to_string()));
            if let Some((without_fragment, fragment)) = split {
                let fragment = fragment.split('#').next().unwrap_or("");
                hash = decode_component(fragment, decode).into_owned();
                pathname = decode_component(split_query(&without_fragment).0, decode).into_owned();
                ctx_path = without_fragment;
                if let Some((query, _)) = raw_querystring.split_once('#') {
                    raw_querystring = query.to_string();
                }
            }
        }

        let mut state = state.unwrap_or_default();
        state.insert("path".to_string(), Value::String(canonical_path.clone()));

        Self {
            canonical_path,
            path: ctx_path,
            pathname,
            hash,
            title,
            raw_querystring,
            decode_url_components: decode,
            init: Cell::new(false),
            params: RefCell::new(Params::new()),
            state: RefCell::new(state),
            handled: Cell::new(None),
            route_path: RefCell::new(None),
        }
    }

    /// Query string, decoded on access
    pub fn querystring(&self) -> Cow<'_, str> {
        decode_component(&self.raw_querystring, self.decode_url_components)
    }

    pub fn raw_querystring(&self) -> &str {
        &self.raw_querystring
    }

    // ========================================================================
    // Params
    // ========================================================================

    pub fn params(&self) -> Params {
        self.params.borrow().clone()
    }

    pub fn param(&self, name: &str) -> Option<String> {
        self.params.borrow().get(name).cloned()
    }

    pub fn set_param(&self, name: impl Into<String>, value: impl Into<String>) {
        self.params.borrow_mut().insert(name.into(), value.into());
    }

    /// Merges params from a route match
    ///
    /// Only defined values are ever present in a match, so a parameter the
    /// match left undefined never clobbers a value set earlier in the chain.
    /// The positional `"0"` capture is the exception: it belongs to the latest
    /// match only and is dropped before merging.
    pub fn merge_params(&self, params: Params) {
        let mut current = self.params.borrow_mut();
        current.remove("0");
        current.extend(params);
    }

    // ========================================================================
    // State
    // ========================================================================

    pub fn state(&self) -> State {
        self.state.borrow().clone()
    }

    pub fn state_value(&self, key: &str) -> Option<Value> {
        self.state.borrow().get(key).cloned()
    }

    pub fn set_state(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.state.borrow_mut().insert(key.into(), value.into());
    }

    // ========================================================================
    // Dispatch status
    // ========================================================================

    /// `None` while undecided, `Some(true)` once a handler claimed the
    /// navigation, `Some(false)` when it was superseded or escalated
    pub fn handled(&self) -> Option<bool> {
        self.handled.get()
    }

    pub fn set_handled(&self, handled: bool) {
        self.handled.set(Some(handled));
    }

    pub(crate) fn clear_handled(&self) {
        self.handled.set(None);
    }

    /// Pattern of the route whose handler received this context
    pub fn route_path(&self) -> Option<String> {
        self.route_path.borrow().clone()
    }

    pub(crate) fn set_route_path(&self, pattern: &str) {
        *self.route_path.borrow_mut() = Some(pattern.to_string());
    }

    /// Whether this context came from the router's start-up navigation
    pub fn is_init(&self) -> bool {
        self.init.get()
    }

    pub(crate) fn set_init(&self, init: bool) {
        self.init.set(init);
    }

    /// URL written to the history stack for this context
    pub fn history_url(&self, hashbang: bool) -> String {
        if hashbang && self.path != "/" {
            format!("#!{}", self.path)
        } else {
            self.canonical_path.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn settings() -> ContextSettings {
        ContextSettings {
            base: String::new(),
            hashbang: false,
            decode_url_components: true,
        }
    }

    #[test]
    fn test_context_plain_path() {
        let ctx = Context::new("/user/42?tab=info", None, &settings(), String::new());
        assert_eq!(ctx.canonical_path, "/user/42?tab=info");
        assert_eq!(ctx.path, "/user/42?tab=info");
        assert_eq!(ctx.pathname, "/user/42");
        assert_eq!(ctx.querystring(), "tab=info");
        assert_eq!(ctx.hash, "");
        assert_eq!(ctx.handled(), None);
    }

    #[test]
    fn test_context_state_carries_path() {
        let mut state = State::new();
        state.insert("scroll".to_string(), json!(120));

        let ctx = Context::new("/a", Some(state), &settings(), String::new());
        assert_eq!(ctx.state_value("scroll"), Some(json!(120)));
        assert_eq!(ctx.state_value("path"), Some(json!("/a")));
    }

    #[test]
    fn test_context_fragment() {
        let ctx = Context::new("/docs?q=a%20b#sec%201", None, &settings(), String::new());
        assert_eq!(ctx.path, "/docs?q=a%20b");
        assert_eq!(ctx.pathname, "/docs");
        assert_eq!(ctx.hash, "sec 1");
        assert_eq!(ctx.raw_querystring(), "q=a%20b");
        assert_eq!(ctx.querystring(), "q=a b");
    }

    #[test]
    fn test_context_base_is_prefixed_and_stripped() {
        let settings = ContextSettings {
            base: "/app".to_string(),
            ..settings()
        };
        let ctx = Context::new("/", None, &settings, String::new());
        assert_eq!(ctx.canonical_path, "/app/");
        assert_eq!(ctx.path, "/");

        let ctx = Context::new("/app/users", None, &settings, String::new());
        assert_eq!(ctx.canonical_path, "/app/users");
        assert_eq!(ctx.path, "/users");
    }

    #[test]
    fn test_context_hashbang() {
        let settings = ContextSettings {
            base: "/app".to_string(),
            hashbang: true,
            decode_url_components: true,
        };
        let ctx = Context::new("/users#top", None, &settings, String::new());
        assert_eq!(ctx.canonical_path, "/app#!/users#top");
        assert_eq!(ctx.path, "/users#top");
        assert_eq!(ctx.hash, "");
        assert_eq!(ctx.history_url(true), "#!/users#top");
    }

    #[test]
    fn test_context_hashbang_root_history_url() {
        let settings = ContextSettings {
            hashbang: true,
            ..settings()
        };
        let ctx = Context::new("/", None, &settings, String::new());
        assert_eq!(ctx.path, "/");
        assert_eq!(ctx.history_url(true), "/");
    }

    #[test]
    fn test_context_without_decoding() {
        let settings = ContextSettings {
            decode_url_components: false,
            ..settings()
        };
        let ctx = Context::new("/a%20b?x=1+2", None, &settings, String::new());
        assert_eq!(ctx.pathname, "/a%20b");
        assert_eq!(ctx.querystring(), "x=1+2");
    }

    #[test]
    fn test_merge_params_keeps_existing_keys() {
        let ctx = Context::new("/", None, &settings(), String::new());
        ctx.set_param("a", "1");

        let mut incoming = Params::new();
        incoming.insert("b".to_string(), "2".to_string());
        ctx.merge_params(incoming);

        assert_eq!(ctx.param("a"), Some("1".to_string()));
        assert_eq!(ctx.param("b"), Some("2".to_string()));
    }

    #[test]
    fn test_merge_params_drops_previous_positional() {
        let ctx = Context::new("/", None, &settings(), String::new());
        ctx.set_param("0", "x");

        let mut incoming = Params::new();
        incoming.insert("id".to_string(), "7".to_string());
        ctx.merge_params(incoming);

        assert_eq!(ctx.param("0"), None);
        assert_eq!(ctx.param("id"), Some("7".to_string()));

        let mut incoming = Params::new();
        incoming.insert("0".to_string(), "rest".to_string());
        ctx.merge_params(incoming);

        assert_eq!(ctx.param("0"), Some("rest".to_string()));
        assert_eq!(ctx.param("id"), Some("7".to_string()));
    }
}
