/// Collaborator interface for the navigation host
///
/// The router never touches a browser directly. Everything it needs from the
/// host (current location, history stack writes, full page loads, a task
/// scheduler) goes through [`Platform`]. [`MemoryPlatform`] is a headless
/// implementation that records every call.

use std::cell::RefCell;
use std::collections::VecDeque;

use tracing::debug;

use crate::State;

/// Deferred unit of work
pub type Task = Box<dyn FnOnce()>;

/// Snapshot of the host location
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    pub pathname: String,
    /// Query string including its leading `?`, or empty
    pub search: String,
    /// Fragment including its leading `#`, or empty
    pub hash: String,
    pub protocol: String,
}

impl Location {
    /// Parses an absolute path such as `/a/b?x=1#top`
    ///
    /// # Examples
    ///
    /// ```
    /// use waymark_router::Location;
    ///
    /// let location = Location::parse("/docs?page=2#intro");
    /// assert_eq!(location.pathname, "/docs");
    /// assert_eq!(location.search, "?page=2");
    /// assert_eq!(location.hash, "#intro");
    /// ```
    pub fn parse(url: &str) -> Self {
        let (rest, hash) = match url.find('#') {
            Some(at) => (&url[..at], &url[at..]),
            None => (url, ""),
        };
        let (pathname, search) = match rest.find('?') {
            Some(at) => (&rest[..at], &rest[at..]),
            None => (rest, ""),
        };

        Self {
            pathname: if pathname.is_empty() { "/" } else { pathname }.to_string(),
            search: search.to_string(),
            hash: hash.to_string(),
            protocol: "http:".to_string(),
        }
    }

    /// Resolves a history URL against this location
    ///
    /// Fragment-only URLs (`#!/users`) keep the pathname and query string,
    /// query-only URLs keep the pathname.
    pub fn resolve(&self, url: &str) -> Self {
        if url.starts_with('#') {
            Self {
                hash: url.to_string(),
                ..self.clone()
            }
        } else if url.starts_with('?') {
            let parsed = Location::parse(&format!("{}{}", self.pathname, url));
            Self {
                protocol: self.protocol.clone(),
                ..parsed
            }
        } else {
            Self {
                protocol: self.protocol.clone(),
                ..Location::parse(url)
            }
        }
    }

    /// Path, query string and fragment joined back together
    pub fn href(&self) -> String {
        format!("{}{}{}", self.pathname, self.search, self.hash)
    }
}

/// Host services the router relies on
pub trait Platform {
    fn location(&self) -> Location;

    /// Full page load of `href`, leaving the router behind
    fn navigate_hard(&self, href: &str);

    fn push_state(&self, state: &State, title: &str, url: &str);

    fn replace_state(&self, state: &State, title: &str, url: &str);

    /// Steps one entry back in the host history
    fn back(&self);

    fn title(&self) -> String {
        String::new()
    }

    /// Runs `task` after the current call stack unwinds
    fn defer(&self, task: Task);
}

/// One recorded call on a [`MemoryPlatform`]
#[derive(Debug, Clone, PartialEq)]
pub enum PlatformEvent {
    Push { url: String, state: State },
    Replace { url: String, state: State },
    Back,
    Hard(String),
}

/// In-memory [`Platform`]
///
/// Keeps a simulated location and history stack, records every call and
/// queues deferred tasks until [`MemoryPlatform::run_pending`] drains them.
#[derive(Default)]
pub struct MemoryPlatform {
    location: RefCell<Location>,
    title: RefCell<String>,
    history: RefCell<Vec<Location>>,
    events: RefCell<Vec<PlatformEvent>>,
    pending: RefCell<VecDeque<Task>>,
}

impl MemoryPlatform {
    /// Starts at `url`
    pub fn at(url: &str) -> Self {
        let location = Location::parse(url);
        Self {
            history: RefCell::new(vec![location.clone()]),
            location: RefCell::new(location),
            ..Self::default()
        }
    }

    /// Replaces the protocol of the simulated location (`"file:"` for instance)
    pub fn with_protocol(self, protocol: &str) -> Self {
        self.location.borrow_mut().protocol = protocol.to_string();
        self
    }

    pub fn set_title(&self, title: &str) {
        *self.title.borrow_mut() = title.to_string();
    }

    /// Moves the simulated location without recording a history entry
    ///
    /// Stands in for the user editing the address bar or a `hashchange`.
    pub fn set_location(&self, url: &str) {
        let location = self.location.borrow().resolve(url);
        *self.location.borrow_mut() = location;
    }

    pub fn events(&self) -> Vec<PlatformEvent> {
        self.events.borrow().clone()
    }

    /// URLs of every full page load requested so far
    pub fn hard_navigations(&self) -> Vec<String> {
        self.events
            .borrow()
            .iter()
            .filter_map(|event| match event {
                PlatformEvent::Hard(href) => Some(href.clone()),
                _ => None,
            })
            .collect()
    }

    /// Simulated history stack, oldest first
    pub fn history(&self) -> Vec<String> {
        self.history.borrow().iter().map(Location::href).collect()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Runs deferred tasks until the queue is empty
    ///
    /// Tasks queued by a running task are drained too. Returns how many ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        loop {
            let task = self.pending.borrow_mut().pop_front();
            match task {
                Some(task) => {
                    task();
                    ran += 1;
                }
                None => return ran,
            }
        }
    }

    fn record(&self, event: PlatformEvent) {
        self.events.borrow_mut().push(event);
    }
}

impl Platform for MemoryPlatform {
    fn location(&self) -> Location {
        self.location.borrow().clone()
    }

    fn navigate_hard(&self, href: &str) {
        debug!(href, "hard navigation");
        let location = self.location.borrow().resolve(href);
        *self.location.borrow_mut() = location.clone();
        self.history.borrow_mut().push(location);
        self.record(PlatformEvent::Hard(href.to_string()));
    }

    fn push_state(&self, state: &State, _title: &str, url: &str) {
        let location = self.location.borrow().resolve(url);
        *self.location.borrow_mut() = location.clone();
        self.history.borrow_mut().push(location);
        self.record(PlatformEvent::Push {
            url: url.to_string(),
            state: state.clone(),
        });
    }

    fn replace_state(&self, state: &State, _title: &str, url: &str) {
        let location = self.location.borrow().resolve(url);
        *self.location.borrow_mut() = location.clone();
        {
            let mut history = self.history.borrow_mut();
            match history.last_mut() {
                Some(last) => *last = location,
                None => history.push(location),
            }
        }
        self.record(PlatformEvent::Replace {
            url: url.to_string(),
            state: state.clone(),
        });
    }

    fn back(&self) {
        {
            let mut history = self.history.borrow_mut();
            if history.len() > 1 {
                history.pop();
            }
            if let Some(last) = history.last() {
                *self.location.borrow_mut() = last.clone();
            }
        }
        self.record(PlatformEvent::Back);
    }

    fn title(&self) -> String {
        self.title.borrow().clone()
    }

    fn defer(&self, task: Task) {
        self.pending.borrow_mut().push_back(task);
    }
}
