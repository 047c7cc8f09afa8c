//! Method and path routing.
//!
//! Routes are registered into a [`RouteBuilder`] and compiled once, when
//! the server starts, into an immutable [`RouteTable`]. Patterns are
//! regular expressions matched against the whole request path.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use regex::Regex;

use crate::http::request::Request;
use crate::http::response::Response;

/// Application callback producing a response for a request.
///
/// Returning an error abandons the connection without sending anything.
pub type Handler = Arc<dyn Fn(&mut Response, &Request) -> anyhow::Result<()> + Send + Sync>;

/// Mutable registration structure: method -> path pattern -> handler.
///
/// Methods keep the order in which they were first registered, and
/// patterns keep their registration order within a method. Registering
/// the same (method, pattern) pair again replaces the handler in place.
#[derive(Default, Clone)]
pub struct RouteBuilder {
    resources: Vec<(String, Vec<(String, Handler)>)>,
    defaults: HashMap<String, Handler>,
}

impl RouteBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, pattern: impl Into<String>, method: impl Into<String>, handler: Handler) {
        let pattern = pattern.into();
        let method = method.into();

        let index = match self.resources.iter().position(|(m, _)| *m == method) {
            Some(index) => index,
            None => {
                self.resources.push((method, Vec::new()));
                self.resources.len() - 1
            }
        };
        let paths = &mut self.resources[index].1;

        match paths.iter().position(|(p, _)| *p == pattern) {
            Some(existing) => paths[existing].1 = handler,
            None => paths.push((pattern, handler)),
        }
    }

    /// Sets the handler used for `method` when no pattern matches.
    pub fn add_default(&mut self, method: impl Into<String>, handler: Handler) {
        self.defaults.insert(method.into(), handler);
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty() && self.defaults.is_empty()
    }

    /// Compiles every pattern, failing on the first invalid one.
    pub fn compile(self) -> anyhow::Result<RouteTable> {
        let mut routes = Vec::with_capacity(self.resources.len());

        for (method, paths) in self.resources {
            let mut compiled = Vec::with_capacity(paths.len());
            for (pattern, handler) in paths {
                // Anchored: the pattern must cover the whole path.
                let regex = Regex::new(&format!("^(?:{pattern})$"))
                    .with_context(|| format!("invalid route pattern {pattern:?} for {method}"))?;
                compiled.push(Route { pattern: regex, handler });
            }
            routes.push((method, compiled));
        }

        Ok(RouteTable {
            routes,
            defaults: self.defaults,
        })
    }
}

struct Route {
    pattern: Regex,
    handler: Handler,
}

/// Immutable, order-preserving route table shared by all connections.
pub struct RouteTable {
    routes: Vec<(String, Vec<Route>)>,
    defaults: HashMap<String, Handler>,
}

/// Outcome of a successful lookup.
#[derive(Clone)]
pub enum RouteMatch {
    /// A registered pattern matched; holds its capture groups.
    Route { handler: Handler, captures: Vec<String> },
    /// No pattern matched but the method has a default handler.
    Default { handler: Handler },
}

impl RouteMatch {
    pub fn handler(&self) -> &Handler {
        match self {
            RouteMatch::Route { handler, .. } | RouteMatch::Default { handler } => handler,
        }
    }

    pub fn captures(&self) -> &[String] {
        match self {
            RouteMatch::Route { captures, .. } => captures,
            RouteMatch::Default { .. } => &[],
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self, RouteMatch::Default { .. })
    }
}

impl RouteTable {
    /// Finds the handler for `method` and `path`.
    ///
    /// The first matching pattern in registration order wins, then the
    /// method's default handler. `None` means nothing should run.
    pub fn resolve(&self, method: &str, path: &str) -> Option<RouteMatch> {
        let routes = self
            .routes
            .iter()
            .find(|(m, _)| m == method)
            .map(|(_, routes)| routes.as_slice())
            .unwrap_or_default();

        for route in routes {
            if let Some(caps) = route.pattern.captures(path) {
                let captures = caps
                    .iter()
                    .map(|group| group.map(|m| m.as_str().to_string()).unwrap_or_default())
                    .collect();
                return Some(RouteMatch::Route {
                    handler: route.handler.clone(),
                    captures,
                });
            }
        }

        self.defaults
            .get(method)
            .map(|handler| RouteMatch::Default { handler: handler.clone() })
    }

    /// Methods with at least one pattern, in compiled order.
    pub fn methods(&self) -> impl Iterator<Item = &str> {
        self.routes.iter().map(|(m, _)| m.as_str())
    }

    pub fn len(&self) -> usize {
        self.routes.iter().map(|(_, r)| r.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0 && self.defaults.is_empty()
    }
}

impl std::fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut list = f.debug_list();
        for (method, routes) in &self.routes {
            for route in routes {
                list.entry(&(method, route.pattern.as_str()));
            }
        }
        list.finish()
    }
}
