//! # Post-Authentication Router
//!
//! Decides where a user goes once the session state and the group lookup are
//! known. All functions here are pure: the caller performs the lookup and
//! hands in its outcome.
//!
//! | session | group lookup | destination      |
//! |---------|--------------|------------------|
//! | none    | (not run)    | `/login`         |
//! | yes     | found        | `/visualizacao`  |
//! | yes     | missing      | `/cadastro`      |
//! | yes     | failed       | lookup failure   |
//!
//! A failed lookup is its own outcome. It is never folded into "missing",
//! since that would send a user who already registered back to an empty form.

use crate::primitives::{ROUTE_CADASTRO, ROUTE_LOGIN, ROUTE_ROOT, ROUTE_VISUALIZACAO};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

// =============================================================================
// DESTINATION
// =============================================================================

/// A client-side page. Serialized as its route path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Destination {
    /// `/login` (also served at `/`).
    Login,
    /// `/cadastro`: no group yet, show the registration form.
    Cadastro,
    /// `/visualizacao`: a group exists, show it.
    Visualizacao,
}

impl Destination {
    /// The route path for this destination.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Login => ROUTE_LOGIN,
            Self::Cadastro => ROUTE_CADASTRO,
            Self::Visualizacao => ROUTE_VISUALIZACAO,
        }
    }

    /// Resolve a route path. `/` is the login page.
    #[must_use]
    pub fn from_path(path: &str) -> Option<Self> {
        match path {
            ROUTE_ROOT | ROUTE_LOGIN => Some(Self::Login),
            ROUTE_CADASTRO => Some(Self::Cadastro),
            ROUTE_VISUALIZACAO => Some(Self::Visualizacao),
            _ => None,
        }
    }

    /// Pages that require an authenticated session.
    #[must_use]
    pub const fn is_protected(self) -> bool {
        matches!(self, Self::Cadastro | Self::Visualizacao)
    }
}

impl Serialize for Destination {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.path())
    }
}

impl<'de> Deserialize<'de> for Destination {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let path = String::deserialize(deserializer)?;
        Self::from_path(&path)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown route: {path}")))
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

// =============================================================================
// GROUP LOOKUP
// =============================================================================

/// Outcome of "does a group exist for this user".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupLookup<T> {
    /// At least one row came back; holds the first.
    Found(T),
    /// The query succeeded and returned no rows.
    Missing,
    /// The query itself failed.
    Failed(String),
}

impl<T> GroupLookup<T> {
    /// Build a lookup outcome from a query result, taking the first row.
    pub fn from_rows<E: fmt::Display>(rows: Result<Vec<T>, E>) -> Self {
        match rows {
            Ok(rows) => first_group(rows).map_or(Self::Missing, Self::Found),
            Err(e) => Self::Failed(e.to_string()),
        }
    }

    /// True when a group was found.
    #[must_use]
    pub const fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}

/// Tie-break for multiple group rows: the first returned wins.
pub fn first_group<T>(rows: Vec<T>) -> Option<T> {
    rows.into_iter().next()
}

// =============================================================================
// ROUTE DECISIONS
// =============================================================================

/// Destination for an authenticated user, given whether a group exists.
#[must_use]
pub const fn route_for_group(group_exists: bool) -> Destination {
    if group_exists {
        Destination::Visualizacao
    } else {
        Destination::Cadastro
    }
}

/// Result of the post-authentication routing step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RouteDecision {
    /// Navigate to the given page.
    Navigate { destination: Destination },
    /// The group lookup failed; stay put and offer a retry.
    LookupFailed { reason: String },
}

impl RouteDecision {
    /// Shorthand for a navigation decision.
    #[must_use]
    pub const fn navigate(destination: Destination) -> Self {
        Self::Navigate { destination }
    }

    /// The destination, if this decision navigates.
    #[must_use]
    pub const fn destination(&self) -> Option<Destination> {
        match self {
            Self::Navigate { destination } => Some(*destination),
            Self::LookupFailed { .. } => None,
        }
    }
}

/// Decide where to go after authentication.
pub fn route_after_auth<T>(authenticated: bool, lookup: &GroupLookup<T>) -> RouteDecision {
    if !authenticated {
        return RouteDecision::navigate(Destination::Login);
    }
    match lookup {
        GroupLookup::Found(_) => RouteDecision::navigate(route_for_group(true)),
        GroupLookup::Missing => RouteDecision::navigate(route_for_group(false)),
        GroupLookup::Failed(reason) => RouteDecision::LookupFailed {
            reason: reason.clone(),
        },
    }
}

/// Gate a requested page on the session.
///
/// Protected pages redirect to login without a session; everything else is
/// returned unchanged.
#[must_use]
pub const fn guard_protected(authenticated: bool, requested: Destination) -> Destination {
    if requested.is_protected() && !authenticated {
        Destination::Login
    } else {
        requested
    }
}

/// Gate the view page on the group lookup.
///
/// `None` means the view can render; `Some` is the redirect to take.
pub fn guard_view<T>(lookup: &GroupLookup<T>) -> Option<RouteDecision> {
    match lookup {
        GroupLookup::Found(_) => None,
        GroupLookup::Missing => Some(RouteDecision::navigate(Destination::Cadastro)),
        GroupLookup::Failed(reason) => Some(RouteDecision::LookupFailed {
            reason: reason.clone(),
        }),
    }
}

// =============================================================================
// TESTS
// =============================================================================
