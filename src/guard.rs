// guard.rs
//! Role-gated routing decisions.

use serde::Serialize;

use crate::{models::usermodel::UserRole, session::LANDING_ROUTE};

pub const LOGIN_ROUTE: &str = "/auth/login";
pub const SIGNUP_ROUTE: &str = "/auth/signup";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "access", content = "role", rename_all = "snake_case")]
pub enum RouteAccess {
    /// Landing and auth pages; signed-in users are sent home.
    PublicOnly,
    Authenticated,
    Role(UserRole),
}

#[derive(Debug, Clone, Copy)]
pub struct GuardInput<'a> {
    pub loading: bool,
    pub authenticated: bool,
    pub role: Option<UserRole>,
    pub path: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", content = "to", rename_all = "snake_case")]
pub enum GuardDecision {
    /// Session still resolving; render nothing.
    Pending,
    Render,
    Redirect(String),
}

/// Drops the query string and any trailing slash.
pub fn normalize_path(path: &str) -> &str {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/"
    } else {
        trimmed
    }
}

fn under(path: &str, prefix: &str) -> bool {
    path == prefix
        || path
            .strip_prefix(prefix)
            .map_or(false, |rest| rest.starts_with('/'))
}

pub fn route_access(path: &str) -> RouteAccess {
    let path = normalize_path(path);
    match path {
        LANDING_ROUTE | LOGIN_ROUTE | SIGNUP_ROUTE => RouteAccess::PublicOnly,
        _ if under(path, "/client") => RouteAccess::Role(UserRole::Client),
        _ if under(path, "/employee") => RouteAccess::Role(UserRole::Employee),
        _ => RouteAccess::Authenticated,
    }
}

fn home_for(role: Option<UserRole>) -> &'static str {
    role.map_or(LANDING_ROUTE, |role| role.home_route())
}

pub fn decide(input: &GuardInput<'_>) -> GuardDecision {
    if input.loading {
        return GuardDecision::Pending;
    }

    let path = normalize_path(input.path);
    let target = match (route_access(path), input.authenticated) {
        (RouteAccess::PublicOnly, false) => None,
        (_, false) => Some(LOGIN_ROUTE),
        (RouteAccess::Role(required), true) if input.role != Some(required) => Some(home_for(input.role)),
        (RouteAccess::PublicOnly, true) => Some(home_for(input.role)),
        _ => None,
    };

    match target {
        Some(target) if target != path => GuardDecision::Redirect(target.to_string()),
        _ => GuardDecision::Render,
    }
}
