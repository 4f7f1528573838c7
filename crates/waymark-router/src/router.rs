/// Router instance: middleware lists, current path and history bookkeeping
///
/// [`Router`] is a cheap clone handle. Clones share one set of lists, one
/// current path and one [`Platform`]. All state sits behind `Cell`/`RefCell`
/// and no borrow is held while a handler runs, so handlers may register
/// routes or start nested navigations.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use serde_json::Value;
use tracing::debug;

use crate::dispatch;
use crate::pattern::PatternSource;
use crate::{
    Context, ContextSettings, MemoryPlatform, Middleware, Next, PatternError, Platform, Route,
    RouterConfig, State,
};

/// Options for [`Router::navigate`]
#[derive(Debug, Clone)]
pub struct ShowOptions {
    pub state: Option<State>,
    /// Run the dispatch walk (default: true)
    pub dispatch: bool,
    /// Push a history entry afterwards (default: true)
    pub push: bool,
}

impl Default for ShowOptions {
    fn default() -> Self {
        Self {
            state: None,
            dispatch: true,
            push: true,
        }
    }
}

/// Options for [`Router::replace_with`]
#[derive(Debug, Clone)]
pub struct ReplaceOptions {
    pub state: Option<State>,
    /// Marks the context as the start-up navigation
    pub init: bool,
    /// Run the dispatch walk (default: true)
    pub dispatch: bool,
}

impl Default for ReplaceOptions {
    fn default() -> Self {
        Self {
            state: None,
            init: false,
            dispatch: true,
        }
    }
}

/// Options for [`Router::start`]
#[derive(Debug, Clone, Copy)]
pub struct StartOptions {
    /// Dispatch the current location (default: true)
    pub dispatch: bool,
}

impl Default for StartOptions {
    fn default() -> Self {
        Self { dispatch: true }
    }
}

impl From<&RouterConfig> for StartOptions {
    fn from(config: &RouterConfig) -> Self {
        Self {
            dispatch: config.dispatch,
        }
    }
}

struct RouterInner {
    entries: RefCell<Vec<Middleware>>,
    exits: RefCell<Vec<Middleware>>,
    current: RefCell<String>,
    len: Cell<usize>,
    prev_context: RefCell<Option<Rc<Context>>>,
    running: Cell<bool>,
    config: RefCell<RouterConfig>,
    platform: Rc<dyn Platform>,
}

#[derive(Clone)]
pub struct Router {
    inner: Rc<RouterInner>,
}

/// Non-owning handle, held by callbacks the router stores itself
#[derive(Clone)]
pub struct WeakRouter {
    inner: Weak<RouterInner>,
}

impl WeakRouter {
    pub fn upgrade(&self) -> Option<Router> {
        self.inner.upgrade().map(|inner| Router { inner })
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("current", &*self.inner.current.borrow())
            .field("len", &self.inner.len.get())
            .field("running", &self.inner.running.get())
            .field("entries", &self.inner.entries.borrow().len())
            .field("exits", &self.inner.exits.borrow().len())
            .field("config", &*self.inner.config.borrow())
            .finish()
    }
}

impl Router {
    /// Router over an in-memory platform located at `/`
    pub fn new() -> Self {
        Self::with_platform(Rc::new(MemoryPlatform::at("/")))
    }

    pub fn with_platform(platform: Rc<dyn Platform>) -> Self {
        Self::with_config(RouterConfig::default(), platform)
    }

    pub fn with_config(config: RouterConfig, platform: Rc<dyn Platform>) -> Self {
        Self {
            inner: Rc::new(RouterInner {
                entries: RefCell::new(Vec::new()),
                exits: RefCell::new(Vec::new()),
                current: RefCell::new(String::new()),
                len: Cell::new(0),
                prev_context: RefCell::new(None),
                running: Cell::new(false),
                config: RefCell::new(config),
                platform,
            }),
        }
    }

    pub fn downgrade(&self) -> WeakRouter {
        WeakRouter {
            inner: Rc::downgrade(&self.inner),
        }
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    /// Replaces the configuration
    ///
    /// Routes already registered keep the matching options they were
    /// compiled with.
    pub fn configure(&self, config: RouterConfig) {
        debug!(?config, "router configured");
        *self.inner.config.borrow_mut() = config;
    }

    pub fn config(&self) -> RouterConfig {
        self.inner.config.borrow().clone()
    }

    pub fn platform(&self) -> Rc<dyn Platform> {
        Rc::clone(&self.inner.platform)
    }

    /// Configured base path
    pub fn base(&self) -> String {
        self.inner.config.borrow().base.clone()
    }

    pub fn set_base(&self, base: impl Into<String>) {
        self.inner.config.borrow_mut().base = base.into();
    }

    pub fn strict(&self) -> bool {
        self.inner.config.borrow().strict
    }

    /// Applies to routes registered afterwards
    pub fn set_strict(&self, strict: bool) {
        self.inner.config.borrow_mut().strict = strict;
    }

    pub fn hashbang(&self) -> bool {
        self.inner.config.borrow().hashbang
    }

    /// Base used to build contexts
    ///
    /// Without a configured base, a hashbang router served from `file:`
    /// uses the document's own pathname.
    pub fn effective_base(&self) -> String {
        let (base, hashbang) = {
            let config = self.inner.config.borrow();
            (config.base.clone(), config.hashbang)
        };
        if !base.is_empty() || !hashbang {
            return base;
        }

        let location = self.inner.platform.location();
        if location.protocol == "file:" {
            location.pathname
        } else {
            base
        }
    }

    // ========================================================================
    // Status
    // ========================================================================

    /// Path of the most recent navigation; empty before the first one
    pub fn current(&self) -> String {
        self.inner.current.borrow().clone()
    }

    /// History entries pushed by this router
    pub fn len(&self) -> usize {
        self.inner.len.get()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.get()
    }

    // ========================================================================
    // Registration
    // ========================================================================

    fn compile(&self, pattern: impl Into<PatternSource>) -> Result<Route, PatternError> {
        let (options, decode) = {
            let config = self.inner.config.borrow();
            (config.pattern_options(), config.decode_url_components)
        };
        Ok(Route::new(pattern, options)?.with_decoding(decode))
    }

    /// Appends a handler to the entry chain for a pattern
    ///
    /// # Examples
    ///
    /// ```
    /// use waymark_router::Router;
    ///
    /// let router = Router::new();
    /// router
    ///     .route("/user/:id", |ctx, _next| {
    ///         assert_eq!(ctx.param("id").as_deref(), Some("42"));
    ///     })
    ///     .unwrap();
    ///
    /// let ctx = router.show("/user/42");
    /// assert_eq!(ctx.handled(), Some(true));
    /// ```
    pub fn route<F>(&self, pattern: impl Into<PatternSource>, handler: F) -> Result<(), PatternError>
    where
        F: Fn(Rc<Context>, Next) + 'static,
    {
        let route = self.compile(pattern)?;
        debug!(pattern = %route.path, "registered route");
        let middleware = route.middleware(handler);
        self.inner.entries.borrow_mut().push(middleware);
        Ok(())
    }

    /// Appends several handlers for one pattern, in order
    pub fn register_route(
        &self,
        pattern: impl Into<PatternSource>,
        handlers: Vec<Middleware>,
    ) -> Result<(), PatternError> {
        let route = self.compile(pattern)?;
        debug!(pattern = %route.path, handlers = handlers.len(), "registered route");
        let wrapped = wrap_all(&route, handlers);
        self.inner.entries.borrow_mut().extend(wrapped);
        Ok(())
    }

    /// Handler for every path, typically registered last
    pub fn fallback<F>(&self, handler: F) -> Result<(), PatternError>
    where
        F: Fn(Rc<Context>, Next) + 'static,
    {
        self.route("*", handler)
    }

    /// Appends a handler to the exit chain for a pattern
    ///
    /// Exit handlers receive the context being navigated away from.
    pub fn exit<F>(&self, pattern: impl Into<PatternSource>, handler: F) -> Result<(), PatternError>
    where
        F: Fn(Rc<Context>, Next) + 'static,
    {
        let route = self.compile(pattern)?;
        debug!(pattern = %route.path, "registered exit");
        let middleware = route.middleware(handler);
        self.inner.exits.borrow_mut().push(middleware);
        Ok(())
    }

    pub fn register_exit(
        &self,
        pattern: impl Into<PatternSource>,
        handlers: Vec<Middleware>,
    ) -> Result<(), PatternError> {
        let route = self.compile(pattern)?;
        debug!(pattern = %route.path, handlers = handlers.len(), "registered exit");
        let wrapped = wrap_all(&route, handlers);
        self.inner.exits.borrow_mut().extend(wrapped);
        Ok(())
    }

    /// Registers a route on `from` that replaces the navigation with `to`
    ///
    /// The replacement is deferred through the platform scheduler so the
    /// running dispatch finishes first.
    pub fn redirect(&self, from: impl Into<PatternSource>, to: &str) -> Result<(), PatternError> {
        let router = self.downgrade();
        let to = to.to_string();
        self.route(from, move |_ctx, _next| {
            if let Some(router) = router.upgrade() {
                router.redirect_now(&to);
            }
        })
    }

    /// Schedules `replace(to)`
    pub fn redirect_now(&self, to: &str) {
        debug!(to, "redirect scheduled");
        let router = self.downgrade();
        let to = to.to_string();
        self.inner.platform.defer(Box::new(move || {
            if let Some(router) = router.upgrade() {
                router.replace(&to);
            }
        }));
    }

    pub(crate) fn entry_at(&self, index: usize) -> Option<Middleware> {
        self.inner.entries.borrow().get(index).cloned()
    }

    pub(crate) fn exit_at(&self, index: usize) -> Option<Middleware> {
        self.inner.exits.borrow().get(index).cloned()
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    /// Builds a context under this router's current settings
    pub fn context(&self, path: &str, state: Option<State>) -> Context {
        let (hashbang, decode_url_components) = {
            let config = self.inner.config.borrow();
            (config.hashbang, config.decode_url_components)
        };
        let settings = ContextSettings {
            base: self.effective_base(),
            hashbang,
            decode_url_components,
        };
        Context::new(path, state, &settings, self.inner.platform.title())
    }

    /// Navigates to `path` and pushes a history entry
    pub fn show(&self, path: &str) -> Rc<Context> {
        self.navigate(path, ShowOptions::default())
    }

    pub fn navigate(&self, path: &str, options: ShowOptions) -> Rc<Context> {
        let ctx = Rc::new(self.context(path, options.state));
        let prev = self.inner.prev_context.replace(Some(Rc::clone(&ctx)));
        *self.inner.current.borrow_mut() = ctx.path.clone();
        debug!(path = %ctx.path, canonical = %ctx.canonical_path, "show");

        if options.dispatch {
            self.dispatch(Rc::clone(&ctx), prev);
        }

        if ctx.handled() != Some(false) && options.push {
            self.push_state(&ctx);
        }

        ctx
    }

    /// Navigates to `path`, replacing the current history entry
    pub fn replace(&self, path: &str) -> Rc<Context> {
        self.replace_with(path, ReplaceOptions::default())
    }

    /// The history entry is written before the dispatch runs
    pub fn replace_with(&self, path: &str, options: ReplaceOptions) -> Rc<Context> {
        let ctx = Rc::new(self.context(path, options.state));
        let prev = self.inner.prev_context.replace(Some(Rc::clone(&ctx)));
        *self.inner.current.borrow_mut() = ctx.path.clone();
        ctx.set_init(options.init);
        debug!(path = %ctx.path, init = options.init, "replace");

        self.save(&ctx);
        if options.dispatch {
            self.dispatch(Rc::clone(&ctx), prev);
        }

        ctx
    }

    /// Runs the exit chain for `prev` then the entry chain for `ctx`
    pub fn dispatch(&self, ctx: Rc<Context>, prev: Option<Rc<Context>>) {
        dispatch::dispatch(self, ctx, prev);
    }

    /// Steps back through history pushed by this router
    ///
    /// With nothing to go back to, schedules a `show` of `path` (or of the
    /// base when no path is given).
    pub fn back(&self, path: Option<&str>, state: Option<State>) {
        let len = self.inner.len.get();
        if len > 0 {
            debug!(len, "history back");
            self.inner.platform.back();
            self.inner.len.set(len - 1);
            return;
        }

        let target = path.map(str::to_string);
        let router = self.downgrade();
        self.inner.platform.defer(Box::new(move || {
            if let Some(router) = router.upgrade() {
                let target = target.unwrap_or_else(|| router.effective_base());
                router.navigate(
                    &target,
                    ShowOptions {
                        state,
                        ..ShowOptions::default()
                    },
                );
            }
        }));
    }

    /// Marks the router running and dispatches the platform location
    pub fn start(&self, options: StartOptions) {
        if !options.dispatch {
            return;
        }
        self.inner.running.set(true);

        let location = self.inner.platform.location();
        let url = if self.hashbang() {
            match location.hash.strip_prefix("#!") {
                Some(path) => format!("{}{}", path, location.search),
                None => format!("{}{}", location.search, location.hash),
            }
        } else {
            location.href()
        };

        debug!(url = %url, "router started");
        self.replace_with(
            &url,
            ReplaceOptions {
                init: true,
                ..ReplaceOptions::default()
            },
        );
    }

    /// Stops the router; a no-op when it is not running
    pub fn stop(&self) {
        if !self.inner.running.get() {
            return;
        }
        debug!("router stopped");
        self.inner.current.borrow_mut().clear();
        self.inner.len.set(0);
        self.inner.running.set(false);
    }

    /// Handles a history traversal reported by the platform
    ///
    /// A state carrying a `path` replays that path; anything else shows the
    /// platform location without pushing a new entry.
    pub fn pop_state(&self, state: Option<State>) {
        let path = state
            .as_ref()
            .and_then(|state| state.get("path"))
            .and_then(Value::as_str)
            .map(str::to_string);

        match path {
            Some(path) => {
                self.replace_with(
                    &path,
                    ReplaceOptions {
                        state,
                        ..ReplaceOptions::default()
                    },
                );
            }
            None => {
                let location = self.inner.platform.location();
                self.navigate(
                    &location.href(),
                    ShowOptions {
                        push: false,
                        ..ShowOptions::default()
                    },
                );
            }
        }
    }

    fn push_state(&self, ctx: &Context) {
        self.inner.len.set(self.inner.len.get() + 1);
        let url = ctx.history_url(self.hashbang());
        self.inner.platform.push_state(&ctx.state(), &ctx.title, &url);
    }

    fn save(&self, ctx: &Context) {
        let url = ctx.history_url(self.hashbang());
        self.inner.platform.replace_state(&ctx.state(), &ctx.title, &url);
    }
}

fn wrap_all(route: &Route, handlers: Vec<Middleware>) -> Vec<Middleware> {
    handlers
        .into_iter()
        .map(|handler| route.middleware(move |ctx, next| handler(ctx, next)))
        .collect()
}

thread_local! {
    static DEFAULT_ROUTER: Router = Router::new();
}

/// Runs `f` with this thread's default router
///
/// # Examples
///
/// ```
/// use waymark_router::with_default_router;
///
/// with_default_router(|router| {
///     router.route("/about", |_ctx, _next| {}).unwrap();
/// });
/// let current = with_default_router(|router| router.show("/about").path.clone());
/// assert_eq!(current, "/about");
/// ```
pub fn with_default_router<R>(f: impl FnOnce(&Router) -> R) -> R {
    DEFAULT_ROUTER.with(f)
}
