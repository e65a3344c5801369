use chrono::{DateTime, TimeDelta, Utc};

use crate::dates::to_eastern_date;
use crate::models::StoredFighter;

/// Which fighters a refresh pass should visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPolicy {
    /// Flagged fighters, fighters never fully scraped, and anyone who
    /// fought within the last `recent_days` days.
    FlaggedOrRecent { recent_days: i64 },
    AllFighters,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        RefreshPolicy::FlaggedOrRecent { recent_days: 30 }
    }
}

impl RefreshPolicy {
    pub fn selects(&self, fighter: &StoredFighter, now: DateTime<Utc>) -> bool {
        match *self {
            RefreshPolicy::AllFighters => true,
            RefreshPolicy::FlaggedOrRecent { recent_days } => {
                if fighter.needs_update || fighter.content_hash.is_none() {
                    return true;
                }
                let cutoff = TimeDelta::try_days(recent_days)
                    .and_then(|span| now.checked_sub_signed(span))
                    .map(to_eastern_date);
                fighter
                    .last_fight_date
                    .is_some_and(|d| cutoff.is_none_or(|cutoff| d >= cutoff))
            }
        }
    }
}
