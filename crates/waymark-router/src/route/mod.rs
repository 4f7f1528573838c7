/// Compiled routes and their middleware adapters
///
/// A [`Route`] owns one compiled pattern. Matching is a pure function of the
/// requested path: it never touches a context. [`Route::middleware`] is the
/// only place where a match is merged into a [`Context`].

use std::rc::Rc;

use regex::Regex;
use tracing::trace;

use crate::path::{decode_component, decode_uri_component, split_query};
use crate::pattern::{compile_pattern, CompiledPattern, ParamToken, PatternOptions, PatternSource};
use crate::{Context, Middleware, Next, Params, PatternError};

/// Result of a successful [`Route::matches`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    /// Decoded values of every capture that participated in the match
    pub params: Params,
    /// Pattern of the route that matched
    pub pattern: String,
}

#[derive(Debug, Clone)]
pub struct Route {
    /// Pattern text as registered (`*` already rewritten to `(.*)`)
    pub path: String,
    compiled: CompiledPattern,
    decode_url_components: bool,
}

impl Route {
    /// Compiles a route
    ///
    /// A bare `*` matches any path and is stored as `(.*)`.
    ///
    /// # Examples
    ///
    /// ```
    /// use waymark_router::Route;
    /// use waymark_router::pattern::PatternOptions;
    ///
    /// let route = Route::new("/user/:id", PatternOptions::default()).unwrap();
    /// let found = route.matches("/user/42?tab=info").unwrap();
    /// assert_eq!(found.params.get("id"), Some(&"42".to_string()));
    /// ```
    pub fn new(
        pattern: impl Into<PatternSource>,
        options: PatternOptions,
    ) -> Result<Self, PatternError> {
        let source = match pattern.into() {
            PatternSource::Path(text) if text == "*" => PatternSource::Path("(.*)".to_string()),
            other => other,
        };

        let compiled = compile_pattern(source, options)?;
        Ok(Self {
            path: compiled.source.clone(),
            compiled,
            decode_url_components: true,
        })
    }

    /// Toggles `+`-as-space and percent decoding of captured values
    pub fn with_decoding(mut self, decode_url_components: bool) -> Self {
        self.decode_url_components = decode_url_components;
        self
    }

    pub fn regex(&self) -> &Regex {
        &self.compiled.regex
    }

    pub fn keys(&self) -> &[ParamToken] {
        &self.compiled.keys
    }

    /// Tests a path against this route
    ///
    /// The query string is ignored and the pathname is percent-decoded before
    /// matching. Captures that did not participate are left out of the
    /// returned params.
    pub fn matches(&self, path: &str) -> Option<RouteMatch> {
        let (pathname, _) = split_query(path);
        let pathname = decode_uri_component(pathname);
        let captures = self.compiled.regex.captures(&pathname)?;

        let params = self
            .compiled
            .keys
            .iter()
            .enumerate()
            .filter_map(|(index, key)| {
                captures.get(index + 1).map(|value| {
                    let value = decode_component(value.as_str(), self.decode_url_components);
                    (key.name.as_key(), value.into_owned())
                })
            })
            .collect();

        trace!(pattern = %self.path, path, "route matched");

        Some(RouteMatch {
            params,
            pattern: self.path.clone(),
        })
    }

    /// Wraps a handler so it only runs for paths this route matches
    ///
    /// On a match the params are merged into the context, the route pattern
    /// is recorded and the handler receives the continuation. Otherwise the
    /// continuation is called right away.
    pub fn middleware<F>(&self, handler: F) -> Middleware
    where
        F: Fn(Rc<Context>, Next) + 'static,
    {
        let route = self.clone();
        Rc::new(move |ctx: Rc<Context>, next: Next| match route.matches(&ctx.path) {
            Some(found) => {
                ctx.merge_params(found.params);
                ctx.set_route_path(&found.pattern);
                handler(ctx, next);
            }
            None => next.call(),
        })
    }
}
