//! Edge route guard. Decides from the `auth` cookie alone.

use crate::cookie::{is_authenticated, CookieJar};

const PROTECTED_PREFIXES: &[&str] = &[
    "/dashboard",
    "/skills-and-experiences",
    "/my-cover-letters",
    "/generate-cover-letter",
];
const AUTH_PAGES: &[&str] = &["/login", "/signup"];
const HOME: &str = "/dashboard";
const LOGIN: &str = "/login";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Proceed,
    Redirect(&'static str),
}

pub fn check_route(path: &str, cookies: &dyn CookieJar) -> GuardDecision {
    decide(path, is_authenticated(cookies))
}

pub fn decide(path: &str, authenticated: bool) -> GuardDecision {
    if !authenticated && PROTECTED_PREFIXES.iter().any(|p| matches_prefix(path, p)) {
        return GuardDecision::Redirect(LOGIN);
    }
    if authenticated && AUTH_PAGES.iter().any(|p| matches_prefix(path, p)) {
        return GuardDecision::Redirect(HOME);
    }
    GuardDecision::Proceed
}

fn matches_prefix(path: &str, prefix: &str) -> bool {
    path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/') || rest.starts_with('?'))
}
