//! Notification Dispatcher — fan-out payloadu na konkrétní příjemce.
//!
//! Broadcast: všichni s tokenem, filtr podle preferencí a oblíbených týmů.
//! Per-user: jeden příjemce, bez tokenu se tiše přeskočí.
//! Nevalidní tokeny se vyhodí před batchováním, batche běží souběžně a pád
//! jednoho neruší ostatní.

use futures_util::future::join_all;
use logger::{now_iso, EventLogger, NotificationDispatchEvent};
use regex::Regex;
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

use crate::payload::{Audience, NotificationPayload};
use crate::recipients::{Recipient, RecipientDirectory};
use crate::sink::{PushMessage, PushSink, EXPO_MAX_BATCH};

pub const FAVORITE_MARKER: &str = "⭐ ";

fn token_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^Expo(nent)?PushToken\[[A-Za-z0-9_\-]+\]$").ok())
        .as_ref()
}

pub fn is_valid_push_token(token: &str) -> bool {
    token_pattern().is_some_and(|re| re.is_match(token.trim()))
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub recipients:      usize,
    pub filtered_out:    usize,
    pub invalid_dropped: usize,
    pub batches_ok:      usize,
    pub batches_failed:  usize,
}

pub struct Dispatcher {
    sink:       Arc<dyn PushSink>,
    directory:  Arc<dyn RecipientDirectory>,
    batch_size: usize,
    logger:     Option<EventLogger>,
}

impl Dispatcher {
    pub fn new(
        sink: Arc<dyn PushSink>,
        directory: Arc<dyn RecipientDirectory>,
        batch_size: usize,
        logger: Option<EventLogger>,
    ) -> Self {
        Self {
            sink,
            directory,
            batch_size: batch_size.clamp(1, EXPO_MAX_BATCH),
            logger,
        }
    }

    /// Never fails: directory and delivery problems are logged and counted.
    pub async fn dispatch(&self, payload: &NotificationPayload) -> DispatchReport {
        let mut report = DispatchReport::default();

        let candidates = match self.resolve(&payload.audience) {
            Ok(c) => c,
            Err(e) => {
                warn!(kind = payload.kind.as_str(), "recipient lookup failed: {e}");
                return report;
            }
        };

        let mut messages = Vec::with_capacity(candidates.len());
        for r in candidates {
            let Some(title) = personalized_title(payload, &r) else {
                report.filtered_out += 1;
                continue;
            };
            if !is_valid_push_token(&r.push_token) {
                debug!(user = %r.user_id, "dropping malformed push token");
                report.invalid_dropped += 1;
                continue;
            }
            messages.push(PushMessage {
                to: r.push_token.trim().to_string(),
                title,
                body: payload.body.clone(),
                data: payload.data.clone(),
                sound: "default",
            });
        }
        report.recipients = messages.len();

        if !messages.is_empty() {
            let sends = messages.chunks(self.batch_size).map(|batch| self.sink.send_batch(batch));
            for (i, result) in join_all(sends).await.into_iter().enumerate() {
                match result {
                    Ok(()) => report.batches_ok += 1,
                    Err(e) => {
                        report.batches_failed += 1;
                        warn!(kind = payload.kind.as_str(), batch = i, "push batch failed: {e}");
                    }
                }
            }
        }

        self.log(payload, &report);
        report
    }

    fn resolve(&self, audience: &Audience) -> Result<Vec<Recipient>, crate::sink::DeliveryError> {
        match audience {
            Audience::Broadcast => self.directory.broadcast_recipients(),
            Audience::User(user_id) => Ok(self.directory.recipient(user_id)?.into_iter().collect()),
        }
    }

    fn log(&self, payload: &NotificationPayload, report: &DispatchReport) {
        let Some(logger) = &self.logger else { return };
        let ev = NotificationDispatchEvent {
            ts: now_iso(),
            event: "NOTIFICATION_DISPATCH",
            kind: payload.kind.as_str().to_string(),
            recipients: report.recipients,
            invalid_dropped: report.invalid_dropped,
            batches_ok: report.batches_ok,
            batches_failed: report.batches_failed,
        };
        if let Err(e) = logger.log(&ev) {
            warn!("event log write failed: {e}");
        }
    }
}

/// `None` = recipient filtered out by preferences.
fn personalized_title(payload: &NotificationPayload, r: &Recipient) -> Option<String> {
    if !r.prefs.allows(payload.kind) {
        return None;
    }
    if payload.audience != Audience::Broadcast {
        return Some(payload.title.clone());
    }

    let favorite = r.prefs.involves_favorite(&payload.teams);
    if r.prefs.favorites_only && !favorite {
        return None;
    }
    Some(if favorite {
        format!("{FAVORITE_MARKER}{}", payload.title)
    } else {
        payload.title.clone()
    })
}
