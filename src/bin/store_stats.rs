//! Přehled prediction store + ruční údržba.
//!
//!   store-stats                         souhrn (stavy tipů, top 10, achievementy)
//!   store-stats register <user> <token> uloží/aktualizuje push token
//!   store-stats predict <user> <match_id> <home> <away> <kickoff_rfc3339> <h>-<a>

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use kickoff_live::store::SqliteStore;
use prediction_engine::{Prediction, PredictionStore};
use push_notifier::{is_valid_push_token, Preferences, Recipient, RecipientDirectory};

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let db_path = std::env::var("DB_PATH").unwrap_or_else(|_| "data/kickoff.db".to_string());
    let store = SqliteStore::open(&db_path)?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        None => summary(&store, &db_path),
        Some("register") => register(&store, &args[1..]),
        Some("predict") => predict(&store, &args[1..]),
        Some(other) => bail!("unknown command {other:?} (expected: register | predict)"),
    }
}

fn summary(store: &SqliteStore, db_path: &str) -> Result<()> {
    println!("db_path={db_path}");

    for (status, count) in store.status_counts()? {
        println!("predictions[{status}]: {count}");
    }

    let recipients = store.broadcast_recipients()?;
    let valid = recipients.iter().filter(|r| is_valid_push_token(&r.push_token)).count();
    println!("recipients: {} ({} valid tokens)", recipients.len(), valid);

    let mut stats = store.all_user_stats()?;
    stats.sort_by(|a, b| b.total_points.cmp(&a.total_points).then_with(|| a.user_id.cmp(&b.user_id)));
    println!("top users:");
    for s in stats.iter().take(10) {
        let rank = s.global_rank.map(|r| format!("#{r}")).unwrap_or_else(|| "-".to_string());
        let achievements: Vec<&str> = s.achievements.iter().map(|a| a.kind.as_str()).collect();
        println!(
            "  {rank:>4} {:<20} pts={:<5} week={:<4} month={:<4} streak={}/{} exact={} partial={} result={} miss={} pending={} [{}]",
            s.user_id,
            s.total_points,
            s.weekly_points,
            s.monthly_points,
            s.current_streak,
            s.best_streak,
            s.exact,
            s.partial,
            s.result,
            s.miss,
            s.pending,
            achievements.join(",")
        );
    }

    Ok(())
}

fn register(store: &SqliteStore, args: &[String]) -> Result<()> {
    let [user_id, token] = args else {
        bail!("usage: store-stats register <user_id> <push_token>");
    };
    if !is_valid_push_token(token) {
        println!("warning: {token} is not an Expo push token, it will be skipped on dispatch");
    }
    let prefs = store.recipient(user_id)?.map(|r| r.prefs).unwrap_or_else(Preferences::default);
    store.upsert_recipient(&Recipient { user_id: user_id.clone(), push_token: token.clone(), prefs })?;
    println!("registered {user_id}");
    Ok(())
}

fn predict(store: &SqliteStore, args: &[String]) -> Result<()> {
    let [user_id, match_id, home, away, kickoff, score] = args else {
        bail!("usage: store-stats predict <user> <match_id> <home> <away> <kickoff_rfc3339> <h>-<a>");
    };
    let kickoff = DateTime::parse_from_rfc3339(kickoff)
        .with_context(|| format!("bad kickoff {kickoff:?}"))?
        .with_timezone(&Utc);
    let (h, a) = score.split_once('-').context("score must look like 2-1")?;

    let prediction = Prediction {
        id: format!("{user_id}:{match_id}"),
        user_id: user_id.clone(),
        match_id: match_id.clone(),
        home_team: home.clone(),
        away_team: away.clone(),
        kickoff,
        predicted_home: h.trim().parse().context("home score")?,
        predicted_away: a.trim().parse().context("away score")?,
        created_at: Utc::now(),
        result: None,
    };
    store.insert_prediction(&prediction)?;
    println!("stored prediction {} ({} {}-{} {})", prediction.id, home, h, a, away);
    Ok(())
}
