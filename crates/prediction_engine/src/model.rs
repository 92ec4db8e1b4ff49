use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Klasifikace vyhodnoceného tipu
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Exact score.
    Exact,
    /// Same goal difference, sign included.
    Partial,
    /// Same win/draw/loss.
    Result,
    Miss,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Exact => "exact",
            Outcome::Partial => "partial",
            Outcome::Result => "result",
            Outcome::Miss => "miss",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "exact" => Some(Outcome::Exact),
            "partial" => Some(Outcome::Partial),
            "result" => Some(Outcome::Result),
            "miss" => Some(Outcome::Miss),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub actual_home:  u32,
    pub actual_away:  u32,
    /// Base + streak bonus
    pub points:       u32,
    pub outcome:      Outcome,
    pub processed_at: DateTime<Utc>,
}

/// One user's tip for one match. Team names and kickoff are captured at
/// submission so correlation works even if the fixture metadata changes later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub id:             String,
    pub user_id:        String,
    pub match_id:       String,
    pub home_team:      String,
    pub away_team:      String,
    pub kickoff:        DateTime<Utc>,
    pub predicted_home: u32,
    pub predicted_away: u32,
    pub created_at:     DateTime<Utc>,
    /// `None` = pending. Once set it never goes back.
    pub result:         Option<PredictionResult>,
}

impl Prediction {
    pub fn is_pending(&self) -> bool {
        self.result.is_none()
    }

    pub fn status_str(&self) -> &'static str {
        self.result.as_ref().map(|r| r.outcome.as_str()).unwrap_or("pending")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementKind {
    FirstExact,
    Sharpshooter,
    HotStreak,
    Unstoppable,
    Centurion,
}

impl AchievementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AchievementKind::FirstExact => "first_exact",
            AchievementKind::Sharpshooter => "sharpshooter",
            AchievementKind::HotStreak => "hot_streak",
            AchievementKind::Unstoppable => "unstoppable",
            AchievementKind::Centurion => "centurion",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "first_exact" => Some(AchievementKind::FirstExact),
            "sharpshooter" => Some(AchievementKind::Sharpshooter),
            "hot_streak" => Some(AchievementKind::HotStreak),
            "unstoppable" => Some(AchievementKind::Unstoppable),
            "centurion" => Some(AchievementKind::Centurion),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Achievement {
    pub kind:       AchievementKind,
    pub granted_at: DateTime<Utc>,
}

/// Running per-user aggregates. Points/streak fields belong to the scoring
/// engine, rank fields to the leaderboard aggregator.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UserStats {
    pub user_id:           String,
    pub total_predictions: u32,
    pub pending:           u32,
    pub exact:             u32,
    pub partial:           u32,
    pub result:            u32,
    pub miss:              u32,
    pub total_points:      u32,
    pub weekly_points:     u32,
    pub monthly_points:    u32,
    pub current_streak:    u32,
    pub best_streak:       u32,
    pub global_rank:       Option<u32>,
    pub weekly_rank:       Option<u32>,
    pub achievements:      Vec<Achievement>,
}

impl UserStats {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Default::default()
        }
    }

    pub fn has_achievement(&self, kind: AchievementKind) -> bool {
        self.achievements.iter().any(|a| a.kind == kind)
    }

    /// Append-only; returns false if already granted.
    pub fn grant(&mut self, kind: AchievementKind, at: DateTime<Utc>) -> bool {
        if self.has_achievement(kind) {
            return false;
        }
        self.achievements.push(Achievement { kind, granted_at: at });
        true
    }
}
