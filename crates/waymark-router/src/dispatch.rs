/// Two-phase dispatch walk
///
/// A dispatch runs the exit chain against the previous context, then the
/// entry chain against the new one. Each middleware receives a one-shot
/// [`Next`] continuation; calling it advances the cursor, not calling it
/// stops the walk. `Next` may be called during the middleware's own
/// invocation or kept and called later.
///
/// The walk is a trampoline: a `Next` called while the walk is already
/// driving only flags the advance and the running loop picks it up, so long
/// chains never recurse. A deferred `Next` restarts the loop.
///
/// Before every entry step the context path is compared with the router's
/// current path. A mismatch means a newer navigation superseded this one;
/// the context is marked unhandled and the walk ends.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace, warn};

use crate::{Context, Router};

/// Middleware in an entry or exit chain
pub type Middleware = Rc<dyn Fn(Rc<Context>, Next)>;

/// One-shot continuation handed to every middleware
pub struct Next {
    walk: Rc<Walk>,
}

impl Next {
    /// Advances the walk to the next middleware
    pub fn call(self) {
        self.walk.advance();
    }
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("path", &self.walk.ctx.path)
            .field("phase", &self.walk.phase.get())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Exit,
    Entry,
    Done,
}

enum Step {
    /// A middleware was invoked in the given phase
    Invoked(Phase),
    Finished,
}

struct Walk {
    router: Router,
    ctx: Rc<Context>,
    prev: Option<Rc<Context>>,
    phase: Cell<Phase>,
    exit_index: Cell<usize>,
    entry_index: Cell<usize>,
    /// Set while the trampoline loop runs
    driving: Cell<bool>,
    /// Set when the current middleware called its `Next`
    advanced: Cell<bool>,
    /// Set when the walk itself marked the context handled
    claimed: Cell<bool>,
}

impl Walk {
    fn next(self: &Rc<Self>) -> Next {
        Next {
            walk: Rc::clone(self),
        }
    }

    fn advance(self: &Rc<Self>) {
        if self.claimed.replace(false) {
            self.ctx.clear_handled();
        }

        if self.driving.get() {
            self.advanced.set(true);
        } else {
            self.drive();
        }
    }

    fn drive(self: &Rc<Self>) {
        self.driving.set(true);

        loop {
            self.advanced.set(false);

            match self.step() {
                Step::Finished => break,
                Step::Invoked(_) if self.advanced.get() => continue,
                Step::Invoked(Phase::Entry) if self.ctx.path != self.router.current() => {
                    debug!(path = %self.ctx.path, "navigation superseded by its own handler");
                    self.ctx.set_handled(false);
                    self.phase.set(Phase::Done);
                    break;
                }
                Step::Invoked(phase) => {
                    if phase == Phase::Entry && self.ctx.handled().is_none() {
                        self.ctx.set_handled(true);
                        self.claimed.set(true);
                    }
                    break;
                }
            }
        }

        self.driving.set(false);
    }

    fn step(self: &Rc<Self>) -> Step {
        match self.phase.get() {
            Phase::Exit => {
                let index = self.exit_index.get();
                self.exit_index.set(index + 1);

                match (self.router.exit_at(index), &self.prev) {
                    (Some(middleware), Some(prev)) => {
                        trace!(index, path = %prev.path, "exit middleware");
                        middleware(Rc::clone(prev), self.next());
                        Step::Invoked(Phase::Exit)
                    }
                    _ => {
                        self.phase.set(Phase::Entry);
                        self.step()
                    }
                }
            }
            Phase::Entry => {
                let index = self.entry_index.get();
                self.entry_index.set(index + 1);

                if self.ctx.path != self.router.current() {
                    debug!(path = %self.ctx.path, "navigation superseded, stopping dispatch");
                    self.ctx.set_handled(false);
                    self.phase.set(Phase::Done);
                    return Step::Finished;
                }

                match self.router.entry_at(index) {
                    Some(middleware) => {
                        trace!(index, path = %self.ctx.path, "entry middleware");
                        middleware(Rc::clone(&self.ctx), self.next());
                        Step::Invoked(Phase::Entry)
                    }
                    None => {
                        self.phase.set(Phase::Done);
                        unhandled(&self.router, &self.ctx);
                        Step::Finished
                    }
                }
            }
            Phase::Done => Step::Finished,
        }
    }
}

/// Runs one full exit-then-entry walk
///
/// The exit phase only runs when a previous context exists.
pub fn dispatch(router: &Router, ctx: Rc<Context>, prev: Option<Rc<Context>>) {
    debug!(
        path = %ctx.path,
        prev = prev.as_ref().map(|p| p.path.as_str()).unwrap_or(""),
        "dispatching navigation"
    );

    let phase = if prev.is_some() {
        Phase::Exit
    } else {
        Phase::Entry
    };

    let walk = Rc::new(Walk {
        router: router.clone(),
        ctx,
        prev,
        phase: Cell::new(phase),
        exit_index: Cell::new(0),
        entry_index: Cell::new(0),
        driving: Cell::new(false),
        advanced: Cell::new(false),
        claimed: Cell::new(false),
    });

    walk.drive();
}

/// Fallback for a walk that ran out of entry middleware
///
/// When the platform location already shows the canonical path there is
/// nothing to correct. Otherwise the router stops and the platform performs a
/// full page load, so the server answers for paths no route claims.
fn unhandled(router: &Router, ctx: &Context) {
    if ctx.handled() == Some(true) {
        return;
    }

    let location = router.platform().location();
    let current = if router.hashbang() {
        format!(
            "{}{}",
            router.effective_base(),
            location.hash.replacen("#!", "", 1)
        )
    } else {
        format!("{}{}", location.pathname, location.search)
    };

    if current == ctx.canonical_path {
        debug!(path = %ctx.canonical_path, "unhandled navigation already at location");
        return;
    }

    warn!(
        path = %ctx.canonical_path,
        location = %current,
        "no route handled navigation, falling back to full page load"
    );
    router.stop();
    ctx.set_handled(false);
    router.platform().navigate_hard(&ctx.canonical_path);
}
