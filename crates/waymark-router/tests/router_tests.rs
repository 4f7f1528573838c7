//! Integration tests for the router over an in-memory platform
//!
//! Tests are organized by feature area and cover:
//! - Exit/entry dispatch ordering
//! - Supersession by nested navigations
//! - Unhandled fallback to a full page load
//! - History bookkeeping (show, replace, back, pop_state)
//! - Redirects and deferred continuations
//! - Start/stop and configuration

use std::cell::RefCell;
use std::rc::Rc;

use pretty_assertions::assert_eq;
use serde_json::json;
use waymark_router::*;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::TRACE)
        .try_init();
}

fn router_at(url: &str) -> (Router, Rc<MemoryPlatform>) {
    init_tracing();
    let platform = Rc::new(MemoryPlatform::at(url));
    let router = Router::with_platform(platform.clone());
    (router, platform)
}

type Log = Rc<RefCell<Vec<String>>>;

fn new_log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

/// Middleware that records its name and hands off
fn step(log: &Log, name: &str) -> Middleware {
    let log = Rc::clone(log);
    let name = name.to_string();
    Rc::new(move |_ctx: Rc<Context>, next: Next| {
        log.borrow_mut().push(name.clone());
        next.call();
    })
}

/// Middleware that records its name and claims the navigation
fn stop(log: &Log, name: &str) -> Middleware {
    let log = Rc::clone(log);
    let name = name.to_string();
    Rc::new(move |_ctx: Rc<Context>, _next: Next| {
        log.borrow_mut().push(name.clone());
    })
}

// ============================================================================
// Dispatch ordering
// ============================================================================

#[test]
fn test_exit_chain_runs_before_entry_chain() {
    let (router, _platform) = router_at("/");
    let log = new_log();

    router.register_route("/a", vec![stop(&log, "A")]).unwrap();
    router
        .register_exit("/a", vec![step(&log, "E1"), step(&log, "E2")])
        .unwrap();
    router
        .register_route("/b", vec![step(&log, "N1"), stop(&log, "N2")])
        .unwrap();

    router.show("/a");
    log.borrow_mut().clear();

    router.show("/b");
    assert_eq!(*log.borrow(), vec!["E1", "E2", "N1", "N2"]);
}

#[test]
fn test_exit_handler_receives_previous_context() {
    let (router, _platform) = router_at("/");
    let left = new_log();

    router.route("/user/:id", |_ctx, _next| {}).unwrap();
    router.route("/home", |_ctx, _next| {}).unwrap();
    {
        let left = Rc::clone(&left);
        router
            .exit("/user/:id", move |ctx, next| {
                left.borrow_mut().push(ctx.param("id").unwrap_or_default());
                next.call();
            })
            .unwrap();
    }

    router.show("/user/7");
    router.show("/home");
    assert_eq!(*left.borrow(), vec!["7"]);
}

#[test]
fn test_first_navigation_skips_exit_chain() {
    let (router, _platform) = router_at("/");
    let log = new_log();

    router.register_exit("*", vec![step(&log, "exit")]).unwrap();
    router.register_route("/a", vec![stop(&log, "enter")]).unwrap();

    router.show("/a");
    assert_eq!(*log.borrow(), vec!["enter"]);
}

#[test]
fn test_params_merge_across_routes() {
    let (router, _platform) = router_at("/");
    let seen = Rc::new(RefCell::new(None));

    router
        .route("/org/:org/*", |ctx, next| {
            ctx.set_state("scope", "org");
            next.call();
        })
        .unwrap();
    {
        let seen = Rc::clone(&seen);
        router
            .route("/org/:org/repo/:repo", move |ctx, _next| {
                *seen.borrow_mut() = Some((
                    ctx.param("org"),
                    ctx.param("repo"),
                    ctx.param("0"),
                    ctx.route_path(),
                ));
            })
            .unwrap();
    }

    let ctx = router.show("/org/acme/repo/site");
    assert_eq!(
        seen.borrow().clone(),
        Some((
            Some("acme".to_string()),
            Some("site".to_string()),
            None,
            Some("/org/:org/repo/:repo".to_string())
        ))
    );
    assert_eq!(ctx.state_value("scope"), Some(json!("org")));
}

#[test]
fn test_routes_registered_during_dispatch_are_seen() {
    let (router, _platform) = router_at("/");
    let log = new_log();

    {
        let router_handle = router.downgrade();
        let log = Rc::clone(&log);
        router
            .route("/lazy", move |_ctx, next| {
                if let Some(router) = router_handle.upgrade() {
                    let log = Rc::clone(&log);
                    router
                        .route("/lazy", move |_ctx, _next| {
                            log.borrow_mut().push("late".to_string());
                        })
                        .unwrap();
                }
                next.call();
            })
            .unwrap();
    }

    router.show("/lazy");
    assert_eq!(*log.borrow(), vec!["late"]);
}

// ============================================================================
// Supersession
// ============================================================================

#[test]
fn test_nested_navigation_supersedes_running_dispatch() {
    let (router, platform) = router_at("/");
    let log = new_log();

    {
        let router_handle = router.downgrade();
        let log = Rc::clone(&log);
        router
            .route("/a", move |_ctx, next| {
                log.borrow_mut().push("N1".to_string());
                if let Some(router) = router_handle.upgrade() {
                    router.show("/b");
                }
                next.call();
            })
            .unwrap();
    }
    router.register_route("/a", vec![stop(&log, "N2")]).unwrap();
    router.register_route("/b", vec![stop(&log, "B")]).unwrap();

    let first = router.show("/a");

    assert_eq!(*log.borrow(), vec!["N1", "B"]);
    assert_eq!(first.handled(), Some(false));
    assert_eq!(router.current(), "/b");
    assert_eq!(router.len(), 1);
    assert_eq!(platform.history(), vec!["/", "/b"]);
}

#[test]
fn test_nested_navigation_without_next_is_superseded() {
    let (router, platform) = router_at("/");
    let log = new_log();

    {
        let router_handle = router.downgrade();
        let log = Rc::clone(&log);
        router
            .route("/a", move |_ctx, _next| {
                log.borrow_mut().push("N1".to_string());
                if let Some(router) = router_handle.upgrade() {
                    router.show("/b");
                }
            })
            .unwrap();
    }
    router.register_route("/b", vec![stop(&log, "B")]).unwrap();

    let first = router.show("/a");

    assert_eq!(*log.borrow(), vec!["N1", "B"]);
    assert_eq!(first.handled(), Some(false));
    assert_eq!(router.current(), "/b");
    assert_eq!(router.len(), 1);
    assert_eq!(platform.history(), vec!["/", "/b"]);
}

#[test]
fn test_deferred_next_through_platform_queue() {
    let (router, platform) = router_at("/");
    let log = new_log();

    {
        let platform = Rc::clone(&platform);
        let log = Rc::clone(&log);
        router
            .route("/load", move |_ctx, next| {
                log.borrow_mut().push("fetch".to_string());
                platform.defer(Box::new(move || next.call()));
            })
            .unwrap();
    }
    router.register_route("/load", vec![stop(&log, "render")]).unwrap();

    let ctx = router.show("/load");
    assert_eq!(*log.borrow(), vec!["fetch"]);
    assert_eq!(ctx.handled(), Some(true));

    assert_eq!(platform.run_pending(), 1);
    assert_eq!(*log.borrow(), vec!["fetch", "render"]);
    assert_eq!(ctx.handled(), Some(true));
}

// ============================================================================
// Unhandled fallback
// ============================================================================

#[test]
fn test_unhandled_path_triggers_one_hard_navigation() {
    let (router, platform) = router_at("/");

    let ctx = router.show("/missing?x=1");
    assert_eq!(platform.hard_navigations(), vec!["/missing?x=1"]);
    assert_eq!(ctx.handled(), Some(false));
    assert_eq!(router.len(), 0);
}

#[test]
fn test_unhandled_path_at_current_location_is_left_alone() {
    let (router, platform) = router_at("/here?x=1");

    let ctx = router.show("/here?x=1");
    assert!(platform.hard_navigations().is_empty());
    assert_eq!(ctx.handled(), None);
}

#[test]
fn test_unhandled_with_base_compares_full_path() {
    let (router, platform) = router_at("/app/x");
    router.set_base("/app");

    router.show("/x");
    assert!(platform.hard_navigations().is_empty());

    router.show("/y");
    assert_eq!(platform.hard_navigations(), vec!["/app/y"]);
}

#[test]
fn test_unhandled_stops_running_router() {
    let (router, platform) = router_at("/start");
    router.route("/start", |_ctx, _next| {}).unwrap();
    router.start(StartOptions::default());
    assert!(router.is_running());

    router.show("/nowhere");
    assert!(!router.is_running());
    assert_eq!(router.current(), "");
    assert_eq!(platform.hard_navigations(), vec!["/nowhere"]);
}

// ============================================================================
// History bookkeeping
// ============================================================================

#[test]
fn test_replace_does_not_grow_history() {
    let (router, platform) = router_at("/");
    router.fallback(|_ctx, _next| {}).unwrap();

    router.show("/a");
    router.replace("/b");
    assert_eq!(router.len(), 1);
    assert_eq!(platform.history(), vec!["/", "/b"]);
}

#[test]
fn test_back_with_history() {
    let (router, platform) = router_at("/");
    router.fallback(|_ctx, _next| {}).unwrap();

    router.show("/a");
    router.show("/b");
    assert_eq!(router.len(), 2);

    router.back(None, None);
    assert_eq!(router.len(), 1);
    assert_eq!(platform.location().pathname, "/a");
    assert_eq!(platform.events().last(), Some(&PlatformEvent::Back));
}

#[test]
fn test_back_without_history_defers_show() {
    let (router, platform) = router_at("/");
    router.fallback(|_ctx, _next| {}).unwrap();

    router.back(Some("/home"), None);
    assert_eq!(router.current(), "");
    assert_eq!(platform.pending_len(), 1);

    platform.run_pending();
    assert_eq!(router.current(), "/home");
    assert_eq!(router.len(), 1);
}

#[test]
fn test_back_without_history_defaults_to_base() {
    let (router, platform) = router_at("/app");
    router.set_base("/app");
    router.fallback(|_ctx, _next| {}).unwrap();

    router.back(None, None);
    platform.run_pending();
    assert_eq!(router.current(), "/");
}

#[test]
fn test_pop_state_with_path_replays_it() {
    let (router, platform) = router_at("/");
    let seen = new_log();
    {
        let seen = Rc::clone(&seen);
        router
            .fallback(move |ctx, _next| {
                let scroll = ctx.state_value("scroll").unwrap_or(json!(null));
                seen.borrow_mut().push(format!("{} {}", ctx.path, scroll));
            })
            .unwrap();
    }

    let mut state = State::new();
    state.insert("path".to_string(), json!("/a"));
    state.insert("scroll".to_string(), json!(40));
    router.pop_state(Some(state));

    assert_eq!(*seen.borrow(), vec!["/a 40"]);
    assert!(matches!(
        platform.events().as_slice(),
        [PlatformEvent::Replace { url, .. }] if url == "/a"
    ));
}

#[test]
fn test_pop_state_without_path_shows_location() {
    let (router, platform) = router_at("/");
    router.fallback(|_ctx, _next| {}).unwrap();

    platform.set_location("/typed?q=1");
    router.pop_state(None);

    assert_eq!(router.current(), "/typed?q=1");
    assert_eq!(router.len(), 0);
    assert!(platform.events().is_empty());
}

// ============================================================================
// Redirects
// ============================================================================

#[test]
fn test_redirect_replaces_after_deferred_tasks() {
    let (router, platform) = router_at("/");
    let log = new_log();
    router.redirect("/old", "/new").unwrap();
    router.register_route("/new", vec![stop(&log, "new")]).unwrap();

    router.show("/old");
    assert_eq!(router.current(), "/old");
    assert!(log.borrow().is_empty());

    platform.run_pending();
    assert_eq!(router.current(), "/new");
    assert_eq!(*log.borrow(), vec!["new"]);
    assert_eq!(platform.history(), vec!["/", "/new"]);
}

#[test]
fn test_redirect_now_from_handler() {
    let (router, platform) = router_at("/");
    {
        let router_handle = router.downgrade();
        router
            .route("/guarded", move |_ctx, _next| {
                if let Some(router) = router_handle.upgrade() {
                    router.redirect_now("/login");
                }
            })
            .unwrap();
    }
    router.route("/login", |_ctx, _next| {}).unwrap();

    router.show("/guarded");
    platform.run_pending();
    assert_eq!(router.current(), "/login");
}

// ============================================================================
// Start / stop
// ============================================================================

#[test]
fn test_start_dispatches_platform_location() {
    let (router, platform) = router_at("/users/5?x=1#top");
    let captured = Rc::new(RefCell::new(None));
    {
        let captured = Rc::clone(&captured);
        router
            .route("/users/:id", move |ctx, _next| {
                *captured.borrow_mut() = Some(Rc::clone(&ctx));
            })
            .unwrap();
    }

    router.start(StartOptions::default());
    assert!(router.is_running());

    let ctx = captured.borrow().clone().unwrap();
    assert!(ctx.is_init());
    assert_eq!(ctx.param("id").as_deref(), Some("5"));
    assert_eq!(ctx.path, "/users/5?x=1");
    assert_eq!(ctx.querystring(), "x=1");
    assert_eq!(ctx.hash, "top");
    assert!(matches!(
        platform.events().as_slice(),
        [PlatformEvent::Replace { url, .. }] if url == "/users/5?x=1#top"
    ));

    router.stop();
    assert!(!router.is_running());
    assert_eq!(router.current(), "");
}

#[test]
fn test_start_without_dispatch_does_nothing() {
    let (router, platform) = router_at("/a");
    router.start(StartOptions { dispatch: false });
    assert!(!router.is_running());
    assert!(platform.events().is_empty());
}

#[test]
fn test_start_in_hashbang_mode() {
    init_tracing();
    let platform = Rc::new(MemoryPlatform::at("/app?x=1#!/users"));
    let config = RouterConfig::from_toml_str(
        r#"
        [router]
        base = "/app"
        hashbang = true
        "#,
    )
    .unwrap();
    let router = Router::with_config(config, platform.clone());
    router.route("/users", |_ctx, _next| {}).unwrap();
    router.fallback(|_ctx, _next| {}).unwrap();

    router.start(StartOptions::default());
    assert_eq!(router.current(), "/users?x=1");
    assert_eq!(platform.location().hash, "#!/users?x=1");

    let ctx = router.show("/about");
    assert_eq!(ctx.canonical_path, "/app#!/about");
    assert_eq!(platform.location().hash, "#!/about");
    assert!(platform.hard_navigations().is_empty());
}

#[test]
fn test_stop_when_not_running_keeps_state() {
    let (router, _platform) = router_at("/");
    router.fallback(|_ctx, _next| {}).unwrap();
    router.show("/a");

    router.stop();
    assert_eq!(router.current(), "/a");
    assert_eq!(router.len(), 1);
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_case_sensitive_config() {
    init_tracing();
    let platform = Rc::new(MemoryPlatform::at("/About"));
    let config = RouterConfig {
        case_sensitive: true,
        ..RouterConfig::default()
    };
    let router = Router::with_config(config, platform.clone());
    router.route("/about", |_ctx, _next| {}).unwrap();

    let ctx = router.show("/About");
    assert_eq!(ctx.handled(), None);
    assert!(platform.hard_navigations().is_empty());

    let ctx = router.show("/about");
    assert_eq!(ctx.handled(), Some(true));
}

#[test]
fn test_decoding_can_be_disabled() {
    init_tracing();
    let platform = Rc::new(MemoryPlatform::at("/"));
    let config = RouterConfig {
        decode_url_components: false,
        ..RouterConfig::default()
    };
    let router = Router::with_config(config, platform);
    let seen = new_log();
    {
        let seen = Rc::clone(&seen);
        router
            .route("/q/:term", move |ctx, _next| {
                seen.borrow_mut().push(ctx.param("term").unwrap_or_default());
            })
            .unwrap();
    }

    router.show("/q/a+b");
    assert_eq!(*seen.borrow(), vec!["a+b"]);
}
