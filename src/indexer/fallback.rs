//! Primary/mirror routing for TVDB calls.
//!
//! Every remote call goes through [`Session::call`]. When thetvdb.com fails the
//! session switches to the mirror host and repeats the call there once. After
//! `timeout_hours` on the mirror the next call is routed back to thetvdb.com.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, info, warn};

use crate::config::FallbackConfig;
use crate::error::{FailureKind, Result};
use crate::notify::NotificationSink;
use crate::tvdb::TvdbApi;

const NOTICE_TITLE: &str = "TVDB mirror fallback";

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Host {
    Primary,
    Mirror,
}

/// What to do before issuing a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    Primary,
    /// `minutes_left` is `None` when the mirror period never ends.
    Mirror { minutes_left: Option<i64> },
    /// The mirror period expired and the route moved back to primary.
    Reverted,
}

/// What to do after a failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureDecision {
    Propagate,
    /// Retry once on the mirror. `activated` is set when this failure caused the switch.
    RetryOnMirror { activated: bool },
}

/// Shared routing state, one per session. Invariant: when `current` is
/// [`Host::Mirror`], `mirror_activated_at` holds the latest activation time.
#[derive(Debug, Clone)]
pub struct RoutingState {
    current: Host,
    mirror_activated_at: Option<DateTime<Utc>>,
    mirror_timeout_hours: f64,
    mirror_enabled: bool,
    notify_on_mirror: bool,
}

impl RoutingState {
    pub fn new(config: FallbackConfig) -> Self {
        Self {
            current: Host::Primary,
            mirror_activated_at: None,
            mirror_timeout_hours: config.timeout_hours,
            mirror_enabled: config.enabled,
            notify_on_mirror: config.notifications,
        }
    }

    pub fn current(&self) -> Host {
        self.current
    }

    pub fn mirror_activated_at(&self) -> Option<DateTime<Utc>> {
        self.mirror_activated_at
    }

    pub fn mirror_enabled(&self) -> bool {
        self.mirror_enabled
    }

    pub fn notify_on_mirror(&self) -> bool {
        self.notify_on_mirror
    }

    fn reconfigure(&mut self, config: FallbackConfig) {
        self.mirror_timeout_hours = config.timeout_hours;
        self.mirror_enabled = config.enabled;
        self.notify_on_mirror = config.notifications;
    }

    /// End of the mirror period started at `activated_at`. `None` when the
    /// timeout is too large to represent, so the mirror is kept.
    fn mirror_deadline(&self, activated_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let timeout_ms = self.mirror_timeout_hours * 3_600_000.0;
        if timeout_ms.is_nan() || timeout_ms <= 0.0 {
            return Some(activated_at);
        }
        if timeout_ms >= i64::MAX as f64 {
            return None;
        }

        TimeDelta::try_milliseconds(timeout_ms.round() as i64)
            .and_then(|timeout| activated_at.checked_add_signed(timeout))
    }

    fn minutes_left(&self, now: DateTime<Utc>) -> Option<i64> {
        let deadline = self.mirror_deadline(self.mirror_activated_at?)?;
        let ms = (deadline - now).num_milliseconds().max(0);
        Some((ms as f64 / 60_000.0).ceil() as i64)
    }

    pub fn before_call(&mut self, now: DateTime<Utc>) -> RouteDecision {
        if !self.mirror_enabled || self.current == Host::Primary {
            return RouteDecision::Primary;
        }

        let expired = match self.mirror_activated_at {
            Some(activated_at) => self
                .mirror_deadline(activated_at)
                .is_some_and(|deadline| now >= deadline),
            None => true,
        };

        if expired {
            self.current = Host::Primary;
            RouteDecision::Reverted
        } else {
            RouteDecision::Mirror {
                minutes_left: self.minutes_left(now),
            }
        }
    }

    pub fn on_failure(&mut self, used: Host, kind: FailureKind, now: DateTime<Utc>) -> FailureDecision {
        if !self.mirror_enabled || kind == FailureKind::AuthFailed {
            return FailureDecision::Propagate;
        }

        // Already failed on the mirror and nobody moved the route since.
        if used == Host::Mirror && self.current == Host::Mirror {
            return FailureDecision::Propagate;
        }

        let activated = self.current == Host::Primary;
        if activated {
            self.current = Host::Mirror;
            self.mirror_activated_at = Some(now);
        }
        FailureDecision::RetryOnMirror { activated }
    }
}

/// One logical TVDB connection: both hosts, routing state, and where notices go.
pub struct Session {
    primary: Arc<dyn TvdbApi>,
    mirror: Arc<dyn TvdbApi>,
    routing: Mutex<RoutingState>,
    notifier: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
}

impl Session {
    pub fn new(
        primary: Arc<dyn TvdbApi>,
        mirror: Arc<dyn TvdbApi>,
        config: FallbackConfig,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            primary,
            mirror,
            routing: Mutex::new(RoutingState::new(config)),
            notifier,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn routing(&self) -> MutexGuard<'_, RoutingState> {
        self.routing.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Refresh the fallback settings, keeping the current route.
    pub fn reconfigure(&self, config: FallbackConfig) {
        self.routing().reconfigure(config);
    }

    pub fn state(&self) -> RoutingState {
        self.routing().clone()
    }

    pub fn host(&self) -> Host {
        self.routing().current()
    }

    fn api(&self, host: Host) -> Arc<dyn TvdbApi> {
        match host {
            Host::Primary => Arc::clone(&self.primary),
            Host::Mirror => Arc::clone(&self.mirror),
        }
    }

    /// Run `op` against the current host, falling back to the mirror once on failure.
    pub async fn call<T, F, Fut>(&self, operation: &str, op: F) -> Result<T>
    where
        F: Fn(Arc<dyn TvdbApi>) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let (decision, notify) = {
            let mut routing = self.routing();
            (routing.before_call(self.clock.now()), routing.notify_on_mirror())
        };

        let used = match decision {
            RouteDecision::Primary => Host::Primary,
            RouteDecision::Mirror { minutes_left } => {
                debug!(operation, ?minutes_left, "Mirror fallback still enabled");
                if notify {
                    let notice = format!(
                        "You are currently using the {} fallback as TVDB source.",
                        self.mirror.base_url()
                    );
                    self.notifier
                        .notify(NOTICE_TITLE, &with_countdown(notice, minutes_left));
                }
                Host::Mirror
            }
            RouteDecision::Reverted => {
                info!(operation, "Mirror fallback period expired, moving back to thetvdb.com");
                self.mirror.clear_credentials();
                if notify {
                    self.notifier.notify(
                        NOTICE_TITLE,
                        "The fallback period expired. Moving back to thetvdb.com.",
                    );
                }
                Host::Primary
            }
        };

        let err = match op(self.api(used)).await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        let (decision, minutes_left) = {
            let mut routing = self.routing();
            let now = self.clock.now();
            (routing.on_failure(used, err.kind(), now), routing.minutes_left(now))
        };

        match decision {
            FailureDecision::Propagate => Err(err),
            FailureDecision::RetryOnMirror { activated } => {
                warn!(operation, "Could not connect to TheTVDB.com, reason '{}'", err);
                if activated {
                    info!(mirror = %self.mirror.base_url(), "Switched to TVDB mirror");
                    let notice = format!(
                        "Could not reach thetvdb.com, using the {} fallback as TVDB source.",
                        self.mirror.base_url()
                    );
                    self.notifier
                        .notify(NOTICE_TITLE, &with_countdown(notice, minutes_left));
                }
                op(self.api(Host::Mirror)).await
            }
        }
    }
}

fn with_countdown(notice: String, minutes_left: Option<i64>) -> String {
    match minutes_left {
        Some(minutes) => format!("{} Moving back to thetvdb.com in {} minutes.", notice, minutes),
        None => notice,
    }
}
