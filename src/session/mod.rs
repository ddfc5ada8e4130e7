//! Session guard with lazy idle expiry.
//!
//! The session lives in the local cache. Expiry is checked when the session is
//! read: an idle session past the deadline stays on disk until the next
//! inspection, which discards it.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::auth;
use crate::cache::LocalCache;
use crate::errors::AppError;

/// Default inactivity window.
pub const IDLE_TIMEOUT_SECS: i64 = 10 * 60;

/// An authenticated session as stored in the cache.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user: String,
    pub login_time: DateTime<Utc>,
    pub last_activity_time: DateTime<Utc>,
}

impl Session {
    /// Expired once strictly more than `idle_timeout` passed since the last activity.
    pub fn is_expired_at(&self, now: DateTime<Utc>, idle_timeout: Duration) -> bool {
        now - self.last_activity_time > idle_timeout
    }
}

#[derive(Clone)]
pub struct SessionGuard {
    cache: LocalCache,
    idle_timeout: Duration,
}

impl SessionGuard {
    pub fn new(cache: LocalCache, idle_timeout: Duration) -> Self {
        Self {
            cache,
            idle_timeout,
        }
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// Check the static credentials and open a session.
    pub fn login(&self, username: &str, password: &str) -> Result<Session, AppError> {
        self.login_at(username, password, Utc::now())
    }

    pub fn login_at(
        &self,
        username: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<Session, AppError> {
        let user = auth::verify_admin(username, password)
            .ok_or_else(|| AppError::Unauthorized("Invalid username or password".to_string()))?;

        let session = Session {
            user: user.to_string(),
            login_time: now,
            last_activity_time: now,
        };
        self.cache.save_session(&session)?;
        tracing::info!("Session opened for {}", session.user);
        Ok(session)
    }

    /// The live session, if any.
    pub fn current(&self) -> Option<Session> {
        self.current_at(Utc::now())
    }

    pub fn current_at(&self, now: DateTime<Utc>) -> Option<Session> {
        let session = self.cache.load_session()?;
        if session.is_expired_at(now, self.idle_timeout) {
            tracing::info!("Session for {} expired after inactivity", session.user);
            if let Err(e) = self.cache.clear_session() {
                tracing::warn!("Failed to discard expired session: {}", e);
            }
            return None;
        }
        Some(session)
    }

    pub fn is_authenticated(&self) -> bool {
        self.current().is_some()
    }

    /// Record user activity. Returns false when there is no live session.
    pub fn touch(&self) -> bool {
        self.touch_at(Utc::now())
    }

    pub fn touch_at(&self, now: DateTime<Utc>) -> bool {
        let Some(mut session) = self.current_at(now) else {
            return false;
        };
        session.last_activity_time = now;
        match self.cache.save_session(&session) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Failed to record activity: {}", e);
                false
            }
        }
    }

    /// Drop the session immediately.
    pub fn logout(&self) -> Result<(), AppError> {
        self.cache.clear_session()
    }
}
