// ============================
// crates/backend-lib/src/auth/policy.rs
// ============================
//! Route access policy.
//!
//! A policy is an ordered list of `(pattern, requirement)` rules. The first
//! rule whose pattern matches the request path decides; a path no rule
//! matches is denied.
//!
//! Patterns are ant-style:
//! - literal segments (`/result`)
//! - `*` matches exactly one segment (`/users/*/profile`)
//! - a trailing `/**` matches the prefix itself and anything below it
use serde::Deserialize;
use std::fmt;

/// What a request must present to reach a route
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessRequirement {
    Public,
    AuthenticatedOnly,
    RoleRequired(String),
}

/// Outcome of evaluating a request against the policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    Deny,
    RedirectToLogin,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Wildcard,
}

/// Compiled path pattern
#[derive(Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
    match_descendants: bool,
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

impl PathPattern {
    pub fn parse(raw: &str) -> Result<Self, String> {
        if !raw.starts_with('/') {
            return Err(format!("pattern must start with '/': {raw}"));
        }

        let (body, match_descendants) = match raw.strip_suffix("/**") {
            Some(prefix) => (prefix, true),
            None => (raw, false),
        };

        let segments = split_path(body)
            .map(|segment| match segment {
                "*" => Ok(Segment::Wildcard),
                s if s.contains('*') => Err(format!("unsupported wildcard in pattern: {raw}")),
                s => Ok(Segment::Literal(s.to_string())),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            raw: raw.to_string(),
            segments,
            match_descendants,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn matches(&self, path: &str) -> bool {
        let path: Vec<&str> = split_path(path).collect();

        let len_ok = if self.match_descendants {
            path.len() >= self.segments.len()
        } else {
            path.len() == self.segments.len()
        };

        len_ok
            && self
                .segments
                .iter()
                .zip(&path)
                .all(|(segment, part)| match segment {
                    Segment::Wildcard => true,
                    Segment::Literal(lit) => lit == part,
                })
    }
}

impl fmt::Debug for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PathPattern").field(&self.raw).finish()
    }
}

/// Access kind as written in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
enum AccessKind {
    Public,
    Authenticated,
    Role,
}

#[derive(Debug, Deserialize)]
struct RawRouteRule {
    pattern: String,
    access: AccessKind,
    #[serde(default)]
    role: Option<String>,
}

/// One `(pattern, requirement)` entry of the policy.
///
/// Deserializes from `{ pattern = "/admin/**", access = "role", role = "ADMIN" }`;
/// `access` is one of `public`, `authenticated`, `role`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawRouteRule")]
pub struct RouteRule {
    pub pattern: PathPattern,
    pub requirement: AccessRequirement,
}

impl RouteRule {
    pub fn new(pattern: &str, requirement: AccessRequirement) -> Result<Self, String> {
        Ok(Self {
            pattern: PathPattern::parse(pattern)?,
            requirement,
        })
    }

    pub fn public(pattern: &str) -> Result<Self, String> {
        Self::new(pattern, AccessRequirement::Public)
    }

    pub fn authenticated(pattern: &str) -> Result<Self, String> {
        Self::new(pattern, AccessRequirement::AuthenticatedOnly)
    }

    pub fn role(pattern: &str, role: impl Into<String>) -> Result<Self, String> {
        Self::new(pattern, AccessRequirement::RoleRequired(role.into()))
    }
}

impl TryFrom<RawRouteRule> for RouteRule {
    type Error = String;

    fn try_from(raw: RawRouteRule) -> Result<Self, Self::Error> {
        let requirement = match (raw.access, raw.role) {
            (AccessKind::Public, _) => AccessRequirement::Public,
            (AccessKind::Authenticated, _) => AccessRequirement::AuthenticatedOnly,
            (AccessKind::Role, Some(role)) if !role.trim().is_empty() => {
                AccessRequirement::RoleRequired(role)
            },
            (AccessKind::Role, _) => {
                return Err(format!("rule for {} requires a role", raw.pattern));
            },
        };
        Self::new(&raw.pattern, requirement)
    }
}

/// Ordered, first-match-wins route policy
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutePolicy {
    rules: Vec<RouteRule>,
}

impl RoutePolicy {
    pub fn new(rules: Vec<RouteRule>) -> Self {
        Self { rules }
    }

    /// Rules for the demo site: landing pages and the login/logout endpoints
    /// are open, `/result` needs a login.
    pub fn demo(login_path: &str, logout_path: &str) -> Result<Self, String> {
        Ok(Self::new(vec![
            RouteRule::public("/")?,
            RouteRule::public("/index")?,
            RouteRule::public(login_path)?,
            RouteRule::public(logout_path)?,
            RouteRule::authenticated("/result")?,
        ]))
    }

    pub fn rules(&self) -> &[RouteRule] {
        &self.rules
    }

    /// Requirement of the first rule matching `path`, if any
    pub fn requirement_for(&self, path: &str) -> Option<&AccessRequirement> {
        self.rules
            .iter()
            .find(|rule| rule.pattern.matches(path))
            .map(|rule| &rule.requirement)
    }
}
