//! One-shot user messages carried across a redirect in the `flash` cookie.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const FLASH_COOKIE: &str = "flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Success,
    Error,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Success => "success",
            Level::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub level: Level,
    pub message: String,
}

fn read(jar: &CookieJar) -> Vec<Flash> {
    let Some(cookie) = jar.get(FLASH_COOKIE) else {
        return Vec::new();
    };
    let decoded = match urlencoding::decode(cookie.value()) {
        Ok(s) => s,
        Err(e) => {
            debug!(error = %e, "dropping undecodable flash cookie");
            return Vec::new();
        }
    };
    serde_json::from_str(&decoded).unwrap_or_default()
}

/// Appends a message to whatever the jar already carries.
pub fn push(jar: CookieJar, level: Level, message: impl Into<String>) -> CookieJar {
    let mut pending = read(&jar);
    pending.push(Flash {
        level,
        message: message.into(),
    });
    let json = serde_json::to_string(&pending).unwrap_or_else(|_| "[]".into());
    let cookie = Cookie::build((FLASH_COOKIE, urlencoding::encode(&json).into_owned()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();
    jar.add(cookie)
}

/// Returns pending messages and a jar that clears them.
pub fn take(jar: CookieJar) -> (CookieJar, Vec<Flash>) {
    let pending = read(&jar);
    if pending.is_empty() && jar.get(FLASH_COOKIE).is_none() {
        return (jar, pending);
    }
    (jar.remove(Cookie::build(FLASH_COOKIE).path("/")), pending)
}
