use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

use crate::payload::NotificationKind;
use crate::sink::DeliveryError;

/// Per-user notification switches. Everything on by default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    pub match_start:        bool,
    pub goals:              bool,
    pub cards:              bool,
    pub var:                bool,
    pub substitutions:      bool,
    pub prediction_results: bool,
    /// Only matches involving a favorite team.
    pub favorites_only:     bool,
    pub favorite_teams:     Vec<String>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            match_start: true,
            goals: true,
            cards: true,
            var: true,
            substitutions: true,
            prediction_results: true,
            favorites_only: false,
            favorite_teams: vec![],
        }
    }
}

impl Preferences {
    pub fn allows(&self, kind: NotificationKind) -> bool {
        match kind {
            NotificationKind::MatchStart => self.match_start,
            NotificationKind::Goal | NotificationKind::Penalty => self.goals,
            NotificationKind::Card => self.cards,
            NotificationKind::Var => self.var,
            NotificationKind::Substitution => self.substitutions,
            NotificationKind::PredictionResult => self.prediction_results,
        }
    }

    /// Case-insensitive exact name match against the favorites list.
    pub fn involves_favorite(&self, teams: &[String]) -> bool {
        teams.iter().any(|team| {
            let team = team.trim().to_lowercase();
            self.favorite_teams.iter().any(|f| f.trim().to_lowercase() == team)
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipient {
    pub user_id:    String,
    pub push_token: String,
    pub prefs:      Preferences,
}

/// Read-only view of registered users. Registration itself happens elsewhere.
pub trait RecipientDirectory: Send + Sync {
    /// All users with a registered push token.
    fn broadcast_recipients(&self) -> Result<Vec<Recipient>, DeliveryError>;
    /// `None` if the user has no registered token.
    fn recipient(&self, user_id: &str) -> Result<Option<Recipient>, DeliveryError>;
}

/// Directory held in memory; handy for tests and for running without a database.
#[derive(Default)]
pub struct InMemoryDirectory {
    users: RwLock<HashMap<String, Recipient>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&self, recipient: Recipient) -> Result<(), DeliveryError> {
        self.users
            .write()
            .map_err(|_| DeliveryError::Directory("directory lock poisoned".to_string()))?
            .insert(recipient.user_id.clone(), recipient);
        Ok(())
    }
}

impl RecipientDirectory for InMemoryDirectory {
    fn broadcast_recipients(&self) -> Result<Vec<Recipient>, DeliveryError> {
        let users = self
            .users
            .read()
            .map_err(|_| DeliveryError::Directory("directory lock poisoned".to_string()))?;
        let mut all: Vec<Recipient> = users.values().filter(|r| !r.push_token.is_empty()).cloned().collect();
        all.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        Ok(all)
    }

    fn recipient(&self, user_id: &str) -> Result<Option<Recipient>, DeliveryError> {
        let users = self
            .users
            .read()
            .map_err(|_| DeliveryError::Directory("directory lock poisoned".to_string()))?;
        Ok(users.get(user_id).filter(|r| !r.push_token.is_empty()).cloned())
    }
}
