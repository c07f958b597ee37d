//! The `auth` cookie that edge routing reads. It carries no credentials.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Duration;

pub const AUTH_COOKIE: &str = "auth";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub path: String,
    pub max_age: Duration,
    pub same_site: SameSite,
}

impl Cookie {
    /// `auth=true`, valid for seven days.
    pub fn auth() -> Self {
        Cookie {
            name: AUTH_COOKIE.to_string(),
            value: "true".to_string(),
            path: "/".to_string(),
            max_age: Duration::days(7),
            same_site: SameSite::Strict,
        }
    }

    pub fn to_header_value(&self) -> String {
        let same_site = match self.same_site {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
        };
        format!(
            "{}={}; Path={}; Max-Age={}; SameSite={}",
            self.name,
            self.value,
            self.path,
            self.max_age.num_seconds(),
            same_site
        )
    }
}

pub trait CookieJar: Send + Sync {
    fn set(&self, cookie: Cookie);
    fn get(&self, name: &str) -> Option<Cookie>;
    fn remove(&self, name: &str);
}

#[derive(Default)]
pub struct MemoryCookieJar {
    cookies: Mutex<HashMap<String, Cookie>>,
}

impl MemoryCookieJar {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CookieJar for MemoryCookieJar {
    fn set(&self, cookie: Cookie) {
        let mut cookies = self.cookies.lock().unwrap_or_else(|e| e.into_inner());
        cookies.insert(cookie.name.clone(), cookie);
    }

    fn get(&self, name: &str) -> Option<Cookie> {
        let cookies = self.cookies.lock().unwrap_or_else(|e| e.into_inner());
        cookies.get(name).cloned()
    }

    fn remove(&self, name: &str) {
        let mut cookies = self.cookies.lock().unwrap_or_else(|e| e.into_inner());
        cookies.remove(name);
    }
}

/// True when the jar holds `auth=true`.
pub fn is_authenticated(jar: &dyn CookieJar) -> bool {
    jar.get(AUTH_COOKIE).is_some_and(|c| c.value == "true")
}
