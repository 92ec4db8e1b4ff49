//! Provider status vocabulary → coarse `MatchStatus`.
//!
//! Provider je nekonzistentní: krátký kód (`state`, `status.short`) a slovní
//! popis (`description`, `status.long`) si občas odporují, typicky když kód ještě
//! hlásí "in" a popis už "Full Time". Finished proto vyhrává nad Live.
//!
//! ESPN dává `state: "post"` i odloženým/zrušeným zápasům. Ty nikdy nesmí
//! projít jako Finished (skóre je jen placeholder 0-0), takže void stavy
//! mají přednost před vším ostatním a mapují se na Scheduled.

use crate::model::MatchStatus;

const LIVE_CODES: &[&str] = &["IN", "1H", "2H", "HT", "ET", "BT", "P", "LIVE", "INT"];
const FINISHED_CODES: &[&str] = &["POST", "FT", "AET", "PEN", "FINAL", "AWD", "WO"];

const VOID_CODES: &[&str] = &["PST", "CANC", "ABD", "SUSP", "TBD"];

const VOID_PHRASES: &[&str] = &["postponed", "canceled", "cancelled", "abandoned", "suspended"];

const LIVE_PHRASES: &[&str] = &[
    "first half",
    "second half",
    "1st half",
    "2nd half",
    "halftime",
    "half time",
    "in progress",
    "live",
    "extra time",
    "shootout",
    "break",
];
const FINISHED_PHRASES: &[&str] = &[
    "full time",
    "fulltime",
    "final",
    "finished",
    "ended",
    "match over",
    "after extra time",
    "after penalties",
];

pub fn map_status(short_code: Option<&str>, verbose: Option<&str>) -> MatchStatus {
    let code = short_code.map(|c| c.trim().to_uppercase()).unwrap_or_default();
    let text = verbose.map(|v| v.to_lowercase()).unwrap_or_default();

    if is_void(&code, &text) {
        return MatchStatus::Scheduled;
    }

    let finished = FINISHED_CODES.contains(&code.as_str())
        || FINISHED_PHRASES.iter().any(|p| text.contains(p));
    if finished {
        return MatchStatus::Finished;
    }

    let live = LIVE_CODES.contains(&code.as_str())
        || LIVE_PHRASES.iter().any(|p| text.contains(p));
    if live {
        return MatchStatus::Live;
    }

    MatchStatus::Scheduled
}

/// Postponed, cancelled, abandoned or suspended. Never has a final score.
fn is_void(code: &str, text: &str) -> bool {
    VOID_CODES.contains(&code) || VOID_PHRASES.iter().any(|p| text.contains(p))
}
