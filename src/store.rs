//! SQLite store — predikce, user stats, příjemci notifikací.
//!
//! One connection behind a mutex; WAL so `store-stats` can read alongside
//! the running pipeline. Schema is created on open.

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use prediction_engine::{
    Achievement, Outcome, Prediction, PredictionResult, PredictionStore, RankAssignment, ScoreFn, StoreError, UserStats,
};
use push_notifier::{DeliveryError, Preferences, Recipient, RecipientDirectory};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row, TransactionBehavior};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: &str) -> Result<Self> {
        let db_path = Path::new(path);
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).ok();
        }

        let conn = Connection::open(db_path).with_context(|| format!("open sqlite db {path}"))?;
        conn.pragma_update(None, "journal_mode", "WAL").ok();
        conn.pragma_update(None, "synchronous", "NORMAL").ok();
        // store-stats píše ze druhého procesu
        conn.busy_timeout(Duration::from_secs(5)).ok();
        init_schema(&conn)?;

        Ok(Self { conn: Mutex::new(conn) })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory sqlite")?;
        init_schema(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Backend("sqlite connection mutex poisoned".to_string()))
    }

    pub fn upsert_recipient(&self, recipient: &Recipient) -> Result<(), StoreError> {
        let prefs = serde_json::to_string(&recipient.prefs).map_err(backend)?;
        self.lock()?
            .execute(
                "INSERT INTO recipients(user_id, push_token, prefs_json) VALUES (?1, ?2, ?3)
                 ON CONFLICT(user_id) DO UPDATE SET push_token = excluded.push_token, prefs_json = excluded.prefs_json",
                params![recipient.user_id, recipient.push_token, prefs],
            )
            .map_err(backend)?;
        Ok(())
    }

    pub fn prediction(&self, id: &str) -> Result<Option<Prediction>, StoreError> {
        let conn = self.lock()?;
        conn.query_row(&format!("SELECT {PREDICTION_COLS} FROM predictions WHERE id = ?1"), params![id], |row| {
            Ok(prediction_from_row(row))
        })
        .optional()
        .map_err(backend)?
        .transpose()
    }

    /// (status, count) pairs for the stats binary.
    pub fn status_counts(&self) -> Result<Vec<(String, i64)>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT status, COUNT(*) FROM predictions GROUP BY status ORDER BY status")
            .map_err(backend)?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))
            .map_err(backend)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(backend)
    }
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS predictions (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            match_id TEXT NOT NULL,
            home_team TEXT NOT NULL,
            away_team TEXT NOT NULL,
            kickoff TEXT NOT NULL,
            predicted_home INTEGER NOT NULL,
            predicted_away INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            actual_home INTEGER,
            actual_away INTEGER,
            points INTEGER,
            processed_at TEXT,
            last_attempt_at TEXT,
            UNIQUE(user_id, match_id)
        );

        CREATE INDEX IF NOT EXISTS idx_pred_pending ON predictions(status, kickoff);

        CREATE TABLE IF NOT EXISTS user_stats (
            user_id TEXT PRIMARY KEY,
            total_predictions INTEGER NOT NULL DEFAULT 0,
            pending INTEGER NOT NULL DEFAULT 0,
            exact INTEGER NOT NULL DEFAULT 0,
            partial INTEGER NOT NULL DEFAULT 0,
            result INTEGER NOT NULL DEFAULT 0,
            miss INTEGER NOT NULL DEFAULT 0,
            total_points INTEGER NOT NULL DEFAULT 0,
            weekly_points INTEGER NOT NULL DEFAULT 0,
            monthly_points INTEGER NOT NULL DEFAULT 0,
            current_streak INTEGER NOT NULL DEFAULT 0,
            best_streak INTEGER NOT NULL DEFAULT 0,
            global_rank INTEGER,
            weekly_rank INTEGER,
            achievements_json TEXT NOT NULL DEFAULT '[]'
        );

        CREATE TABLE IF NOT EXISTS recipients (
            user_id TEXT PRIMARY KEY,
            push_token TEXT NOT NULL,
            prefs_json TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS markers (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
        "#,
    )
    .context("init schema")?;

    // DB z dřívější verze nemá sloupec; "duplicate column" ignorujeme
    conn.execute("ALTER TABLE predictions ADD COLUMN last_attempt_at TEXT", []).ok();

    Ok(())
}

const PREDICTION_COLS: &str = "id, user_id, match_id, home_team, away_team, kickoff, predicted_home, predicted_away, \
     created_at, status, actual_home, actual_away, points, processed_at";

const STATS_COLS: &str = "user_id, total_predictions, pending, exact, partial, result, miss, total_points, \
     weekly_points, monthly_points, current_streak, best_streak, global_rank, weekly_rank, achievements_json";

fn backend(e: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(e.to_string())
}

fn ts(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_ts(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::Backend(format!("bad timestamp {raw:?}: {e}")))
}

fn prediction_from_row(row: &Row<'_>) -> Result<Prediction, StoreError> {
    let status: String = row.get(9).map_err(backend)?;
    let result = match Outcome::parse(&status) {
        Some(outcome) => {
            let processed: Option<String> = row.get(13).map_err(backend)?;
            Some(PredictionResult {
                actual_home: row.get::<_, Option<u32>>(10).map_err(backend)?.unwrap_or(0),
                actual_away: row.get::<_, Option<u32>>(11).map_err(backend)?.unwrap_or(0),
                points: row.get::<_, Option<u32>>(12).map_err(backend)?.unwrap_or(0),
                outcome,
                processed_at: match processed {
                    Some(p) => parse_ts(&p)?,
                    None => Utc::now(),
                },
            })
        }
        None => None,
    };

    Ok(Prediction {
        id: row.get(0).map_err(backend)?,
        user_id: row.get(1).map_err(backend)?,
        match_id: row.get(2).map_err(backend)?,
        home_team: row.get(3).map_err(backend)?,
        away_team: row.get(4).map_err(backend)?,
        kickoff: parse_ts(&row.get::<_, String>(5).map_err(backend)?)?,
        predicted_home: row.get(6).map_err(backend)?,
        predicted_away: row.get(7).map_err(backend)?,
        created_at: parse_ts(&row.get::<_, String>(8).map_err(backend)?)?,
        result,
    })
}

fn stats_from_row(row: &Row<'_>) -> Result<UserStats, StoreError> {
    let achievements_json: String = row.get(14).map_err(backend)?;
    let achievements: Vec<Achievement> = serde_json::from_str(&achievements_json).unwrap_or_default();
    Ok(UserStats {
        user_id: row.get(0).map_err(backend)?,
        total_predictions: row.get(1).map_err(backend)?,
        pending: row.get(2).map_err(backend)?,
        exact: row.get(3).map_err(backend)?,
        partial: row.get(4).map_err(backend)?,
        result: row.get(5).map_err(backend)?,
        miss: row.get(6).map_err(backend)?,
        total_points: row.get(7).map_err(backend)?,
        weekly_points: row.get(8).map_err(backend)?,
        monthly_points: row.get(9).map_err(backend)?,
        current_streak: row.get(10).map_err(backend)?,
        best_streak: row.get(11).map_err(backend)?,
        global_rank: row.get(12).map_err(backend)?,
        weekly_rank: row.get(13).map_err(backend)?,
        achievements,
    })
}

impl PredictionStore for SqliteStore {
    fn insert_prediction(&self, p: &Prediction) -> Result<(), StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(backend)?;

        let inserted = tx.execute(
            "INSERT INTO predictions(id, user_id, match_id, home_team, away_team, kickoff, predicted_home, predicted_away, created_at, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 'pending')",
            params![
                p.id,
                p.user_id,
                p.match_id,
                p.home_team,
                p.away_team,
                ts(p.kickoff),
                p.predicted_home,
                p.predicted_away,
                ts(p.created_at)
            ],
        );
        match inserted {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(err, _)) if err.code == ErrorCode::ConstraintViolation => {
                return Err(StoreError::DuplicatePrediction {
                    user_id: p.user_id.clone(),
                    match_id: p.match_id.clone(),
                });
            }
            Err(e) => return Err(backend(e)),
        }

        tx.execute(
            "INSERT INTO user_stats(user_id, total_predictions, pending) VALUES (?1, 1, 1)
             ON CONFLICT(user_id) DO UPDATE SET total_predictions = total_predictions + 1, pending = pending + 1",
            params![p.user_id],
        )
        .map_err(backend)?;

        tx.commit().map_err(backend)
    }

    fn pending_predictions(&self, kickoff_before: DateTime<Utc>, limit: usize) -> Result<Vec<Prediction>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {PREDICTION_COLS} FROM predictions
                 WHERE status = 'pending' AND kickoff < ?1
                 ORDER BY COALESCE(last_attempt_at, '') ASC, kickoff ASC LIMIT ?2"
            ))
            .map_err(backend)?;
        let rows = stmt
            .query_map(params![ts(kickoff_before), limit as i64], |row| Ok(prediction_from_row(row)))
            .map_err(backend)?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(backend)??);
        }
        Ok(out)
    }

    fn user_stats(&self, user_id: &str) -> Result<UserStats, StoreError> {
        let conn = self.lock()?;
        let found = conn
            .query_row(&format!("SELECT {STATS_COLS} FROM user_stats WHERE user_id = ?1"), params![user_id], |row| {
                Ok(stats_from_row(row))
            })
            .optional()
            .map_err(backend)?
            .transpose()?;
        Ok(found.unwrap_or_else(|| UserStats::new(user_id)))
    }

    fn all_user_stats(&self) -> Result<Vec<UserStats>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!("SELECT {STATS_COLS} FROM user_stats ORDER BY user_id"))
            .map_err(backend)?;
        let rows = stmt.query_map([], |row| Ok(stats_from_row(row))).map_err(backend)?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(backend)??);
        }
        Ok(out)
    }

    fn mark_attempted(&self, prediction_id: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.lock()?
            .execute(
                "UPDATE predictions SET last_attempt_at = ?2 WHERE id = ?1 AND status = 'pending'",
                params![prediction_id, ts(at)],
            )
            .map_err(backend)?;
        Ok(())
    }

    fn resolve_prediction(&self, p: &Prediction, score: &mut ScoreFn<'_>) -> Result<Prediction, StoreError> {
        let mut conn = self.lock()?;
        // IMMEDIATE: zápisový zámek hned, ať mezi čtením stats a zápisem nikdo nepřipíše
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate).map_err(backend)?;

        let stored = tx
            .query_row(&format!("SELECT {PREDICTION_COLS} FROM predictions WHERE id = ?1"), params![p.id], |row| {
                Ok(prediction_from_row(row))
            })
            .optional()
            .map_err(backend)?
            .transpose()?
            .ok_or_else(|| StoreError::UnknownPrediction(p.id.clone()))?;
        if !stored.is_pending() {
            return Err(StoreError::AlreadyResolved(p.id.clone()));
        }

        let mut stats = tx
            .query_row(&format!("SELECT {STATS_COLS} FROM user_stats WHERE user_id = ?1"), params![stored.user_id], |row| {
                Ok(stats_from_row(row))
            })
            .optional()
            .map_err(backend)?
            .transpose()?
            .unwrap_or_else(|| UserStats::new(stored.user_id.clone()));

        let r = score(&mut stats);
        let achievements = serde_json::to_string(&stats.achievements).map_err(backend)?;

        tx.execute(
            "UPDATE predictions SET status = ?2, actual_home = ?3, actual_away = ?4, points = ?5, processed_at = ?6
             WHERE id = ?1 AND status = 'pending'",
            params![p.id, r.outcome.as_str(), r.actual_home, r.actual_away, r.points, ts(r.processed_at)],
        )
        .map_err(backend)?;

        // jen sloupce, které patří scoringu; total_predictions a pořadí píšou jiní
        tx.execute(
            "INSERT INTO user_stats(user_id, pending, exact, partial, result, miss, total_points, weekly_points,
                                    monthly_points, current_streak, best_streak, achievements_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
             ON CONFLICT(user_id) DO UPDATE SET
                pending = excluded.pending, exact = excluded.exact, partial = excluded.partial,
                result = excluded.result, miss = excluded.miss, total_points = excluded.total_points,
                weekly_points = excluded.weekly_points, monthly_points = excluded.monthly_points,
                current_streak = excluded.current_streak, best_streak = excluded.best_streak,
                achievements_json = excluded.achievements_json",
            params![
                stats.user_id,
                stats.pending,
                stats.exact,
                stats.partial,
                stats.result,
                stats.miss,
                stats.total_points,
                stats.weekly_points,
                stats.monthly_points,
                stats.current_streak,
                stats.best_streak,
                achievements
            ],
        )
        .map_err(backend)?;

        tx.commit().map_err(backend)?;

        Ok(Prediction { result: Some(r), ..stored })
    }

    fn save_ranks(&self, ranks: &[RankAssignment]) -> Result<(), StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(backend)?;
        {
            let mut stmt = tx
                .prepare("UPDATE user_stats SET global_rank = ?2, weekly_rank = ?3 WHERE user_id = ?1")
                .map_err(backend)?;
            for r in ranks {
                stmt.execute(params![r.user_id, r.global_rank, r.weekly_rank]).map_err(backend)?;
            }
        }
        tx.commit().map_err(backend)
    }

    fn reset_weekly_points(&self) -> Result<usize, StoreError> {
        self.lock()?.execute("UPDATE user_stats SET weekly_points = 0", []).map_err(backend)
    }

    fn reset_monthly_points(&self) -> Result<usize, StoreError> {
        self.lock()?.execute("UPDATE user_stats SET monthly_points = 0", []).map_err(backend)
    }

    fn marker(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.lock()?
            .query_row("SELECT value FROM markers WHERE key = ?1", params![key], |row| row.get(0))
            .optional()
            .map_err(backend)
    }

    fn set_marker(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.lock()?
            .execute(
                "INSERT INTO markers(key, value) VALUES (?1, ?2) ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )
            .map_err(backend)?;
        Ok(())
    }
}

fn recipient_from_row(row: &Row<'_>) -> rusqlite::Result<Recipient> {
    let prefs_json: String = row.get(2)?;
    Ok(Recipient {
        user_id: row.get(0)?,
        push_token: row.get(1)?,
        prefs: serde_json::from_str(&prefs_json).unwrap_or_else(|_| Preferences::default()),
    })
}

fn directory_err(e: impl std::fmt::Display) -> DeliveryError {
    DeliveryError::Directory(e.to_string())
}

impl RecipientDirectory for SqliteStore {
    fn broadcast_recipients(&self) -> Result<Vec<Recipient>, DeliveryError> {
        let conn = self.lock().map_err(directory_err)?;
        let mut stmt = conn
            .prepare("SELECT user_id, push_token, prefs_json FROM recipients WHERE push_token <> '' ORDER BY user_id")
            .map_err(directory_err)?;
        let rows = stmt.query_map([], recipient_from_row).map_err(directory_err)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(directory_err)
    }

    fn recipient(&self, user_id: &str) -> Result<Option<Recipient>, DeliveryError> {
        self.lock()
            .map_err(directory_err)?
            .query_row(
                "SELECT user_id, push_token, prefs_json FROM recipients WHERE user_id = ?1 AND push_token <> ''",
                params![user_id],
                recipient_from_row,
            )
            .optional()
            .map_err(directory_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use prediction_engine::{compute_ranks, ScoringRules};

    fn prediction(id: &str, user: &str, match_id: &str, kickoff_hour: u32) -> Prediction {
        Prediction {
            id: id.to_string(),
            user_id: user.to_string(),
            match_id: match_id.to_string(),
            home_team: "Palmeiras".to_string(),
            away_team: "Flamengo".to_string(),
            kickoff: Utc.with_ymd_and_hms(2024, 5, 19, kickoff_hour, 0, 0).unwrap(),
            predicted_home: 2,
            predicted_away: 1,
            created_at: Utc.with_ymd_and_hms(2024, 5, 18, 10, 0, 0).unwrap(),
            result: None,
        }
    }

    #[test]
    fn insert_enforces_uniqueness_and_counts_pending() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert_prediction(&prediction("p1", "u1", "m1", 15)).unwrap();
        let err = store.insert_prediction(&prediction("p2", "u1", "m1", 15)).unwrap_err();
        assert!(matches!(err, StoreError::DuplicatePrediction { .. }));

        let s = store.user_stats("u1").unwrap();
        assert_eq!((s.total_predictions, s.pending), (1, 1));
        assert_eq!(store.user_stats("nobody").unwrap(), UserStats::new("nobody"));
    }

    #[test]
    fn pending_query_orders_by_kickoff() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert_prediction(&prediction("late", "u1", "m1", 20)).unwrap();
        store.insert_prediction(&prediction("early", "u1", "m2", 12)).unwrap();
        store.insert_prediction(&prediction("future", "u1", "m3", 23)).unwrap();

        let cutoff = Utc.with_ymd_and_hms(2024, 5, 19, 22, 0, 0).unwrap();
        let ids: Vec<String> = store.pending_predictions(cutoff, 10).unwrap().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["early", "late"]);
    }

    fn score_with(rules: ScoringRules, actual: (u32, u32), predicted: (u32, u32)) -> impl FnMut(&mut UserStats) -> PredictionResult {
        move |stats: &mut UserStats| {
            let award = rules.score(predicted.0, predicted.1, actual.0, actual.1);
            let applied = rules.apply_result(stats, &award, Utc::now());
            PredictionResult {
                actual_home: actual.0,
                actual_away: actual.1,
                points: applied.total,
                outcome: award.outcome,
                processed_at: Utc::now(),
            }
        }
    }

    fn fixed_points(points: u32) -> impl FnMut(&mut UserStats) -> PredictionResult {
        move |stats: &mut UserStats| {
            stats.partial += 1;
            stats.pending = stats.pending.saturating_sub(1);
            stats.total_points += points;
            stats.weekly_points += points;
            PredictionResult {
                actual_home: 0,
                actual_away: 0,
                points,
                outcome: Outcome::Partial,
                processed_at: Utc::now(),
            }
        }
    }

    #[test]
    fn pending_query_rotates_attempted_predictions_to_the_back() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert_prediction(&prediction("stuck-a", "u1", "m1", 10)).unwrap();
        store.insert_prediction(&prediction("stuck-b", "u1", "m2", 11)).unwrap();
        store.insert_prediction(&prediction("newer", "u1", "m3", 12)).unwrap();

        let cutoff = Utc.with_ymd_and_hms(2024, 5, 19, 22, 0, 0).unwrap();
        let ids = |store: &SqliteStore| -> Vec<String> {
            store.pending_predictions(cutoff, 2).unwrap().into_iter().map(|p| p.id).collect()
        };
        assert_eq!(ids(&store), vec!["stuck-a", "stuck-b"]);

        let t = Utc.with_ymd_and_hms(2024, 5, 20, 9, 0, 0).unwrap();
        store.mark_attempted("stuck-a", t).unwrap();
        store.mark_attempted("stuck-b", t + Duration::minutes(1)).unwrap();
        assert_eq!(ids(&store), vec!["newer", "stuck-a"]);
    }

    #[test]
    fn resolve_round_trip_is_guarded() {
        let store = SqliteStore::open_in_memory().unwrap();
        let p = prediction("p1", "u1", "m1", 15);
        store.insert_prediction(&p).unwrap();

        let resolved = store
            .resolve_prediction(&p, &mut score_with(ScoringRules::default(), (2, 1), (2, 1)))
            .unwrap();
        assert_eq!(resolved.result.as_ref().map(|r| r.points), Some(5));

        let loaded = store.prediction("p1").unwrap().unwrap();
        assert_eq!(loaded.status_str(), "exact");
        let s = store.user_stats("u1").unwrap();
        assert_eq!((s.exact, s.pending, s.total_points), (1, 0, 5));
        assert_eq!(s.achievements.len(), 1);

        let again = store.resolve_prediction(&p, &mut score_with(ScoringRules::default(), (2, 1), (2, 1)));
        assert!(matches!(again, Err(StoreError::AlreadyResolved(_))));
        assert_eq!(store.user_stats("u1").unwrap().total_points, 5);
        assert!(store.pending_predictions(Utc::now() + Duration::days(1), 10).unwrap().is_empty());

        let ghost = prediction("ghost", "u1", "m9", 15);
        assert!(matches!(store.resolve_prediction(&ghost, &mut fixed_points(1)), Err(StoreError::UnknownPrediction(_))));
    }

    #[test]
    fn resolve_keeps_counters_and_ranks_written_by_others() {
        let store = SqliteStore::open_in_memory().unwrap();
        let p1 = prediction("p1", "u1", "m1", 15);
        store.insert_prediction(&p1).unwrap();

        // mezitím: nový tip a přepočet žebříčku
        store.insert_prediction(&prediction("p2", "u1", "m2", 16)).unwrap();
        store
            .save_ranks(&[RankAssignment { user_id: "u1".into(), global_rank: Some(4), weekly_rank: Some(2) }])
            .unwrap();

        store.resolve_prediction(&p1, &mut fixed_points(3)).unwrap();

        let s = store.user_stats("u1").unwrap();
        assert_eq!((s.total_predictions, s.pending), (2, 1));
        assert_eq!((s.partial, s.total_points), (1, 3));
        assert_eq!((s.global_rank, s.weekly_rank), (Some(4), Some(2)));
    }

    #[test]
    fn ranks_resets_and_markers() {
        let store = SqliteStore::open_in_memory().unwrap();
        for (i, pts) in [(1, 10u32), (2, 0), (3, 7)] {
            let user = format!("u{i}");
            let p = prediction(&format!("p{i}"), &user, "m1", 15);
            store.insert_prediction(&p).unwrap();
            store.resolve_prediction(&p, &mut fixed_points(pts)).unwrap();
        }

        store.save_ranks(&compute_ranks(&store.all_user_stats().unwrap())).unwrap();
        assert_eq!(store.user_stats("u1").unwrap().global_rank, Some(1));
        assert_eq!(store.user_stats("u3").unwrap().global_rank, Some(2));
        assert_eq!(store.user_stats("u2").unwrap().global_rank, None);

        assert_eq!(store.reset_weekly_points().unwrap(), 3);
        assert_eq!(store.user_stats("u1").unwrap().weekly_points, 0);
        assert_eq!(store.user_stats("u1").unwrap().total_points, 10);

        assert_eq!(store.marker("week").unwrap(), None);
        store.set_marker("week", "2024-W20").unwrap();
        store.set_marker("week", "2024-W21").unwrap();
        assert_eq!(store.marker("week").unwrap().as_deref(), Some("2024-W21"));
    }

    #[test]
    fn directory_reads_registered_tokens() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .upsert_recipient(&Recipient {
                user_id: "u1".into(),
                push_token: "ExponentPushToken[abc]".into(),
                prefs: Preferences { favorites_only: true, ..Preferences::default() },
            })
            .unwrap();
        store
            .upsert_recipient(&Recipient { user_id: "u2".into(), push_token: String::new(), prefs: Preferences::default() })
            .unwrap();

        let all = store.broadcast_recipients().unwrap();
        assert_eq!(all.len(), 1);
        assert!(all[0].prefs.favorites_only);
        assert!(store.recipient("u2").unwrap().is_none());
        assert!(store.recipient("u1").unwrap().is_some());
    }
}
