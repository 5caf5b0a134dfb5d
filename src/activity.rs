//! Recent-activity feed for the dashboard: a merged, reverse-chronological
//! snapshot over quiz attempts, roadmap creations and progress updates.
//! Recomputed fully on every call.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Pool, Sqlite};
use tracing::instrument;

use crate::db::{get_roadmap, recent_progress, recent_quiz_attempts, recent_roadmaps};
use crate::error::AppError;

pub const FEED_LIMIT: usize = 5;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Quiz,
    Roadmap,
    Progress,
}

#[derive(Serialize, Debug, Clone)]
pub struct Activity {
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub title: String,
    pub timestamp: DateTime<Utc>,
    pub icon: &'static str,
}

/// Sorts candidates newest-first and keeps the top [`FEED_LIMIT`].
pub fn merge_activities(mut candidates: Vec<Activity>) -> Vec<Activity> {
    candidates.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    candidates.truncate(FEED_LIMIT);
    candidates
}

#[instrument(skip(pool))]
pub async fn build_feed(pool: &Pool<Sqlite>, user_id: i64) -> Result<Vec<Activity>, AppError> {
    let mut candidates = Vec::new();

    for quiz in recent_quiz_attempts(pool, user_id, 3).await? {
        candidates.push(Activity {
            kind: ActivityKind::Quiz,
            title: format!("Completed quiz (Score: {}%)", quiz.score),
            timestamp: quiz.completed_at,
            icon: "BookOpen",
        });
    }

    for roadmap in recent_roadmaps(pool, user_id, 2).await? {
        candidates.push(Activity {
            kind: ActivityKind::Roadmap,
            title: format!("Started \"{}\" roadmap", roadmap.title),
            timestamp: roadmap.created_at,
            icon: "Target",
        });
    }

    for record in recent_progress(pool, user_id, 2).await? {
        // The roadmap reference is a plain string; records whose roadmap
        // is gone or unparsable are silently skipped.
        let Ok(roadmap_id) = record.roadmap_id.parse::<i64>() else {
            continue;
        };
        let roadmap = match get_roadmap(pool, user_id, roadmap_id).await {
            Ok(roadmap) => roadmap,
            Err(AppError::NotFound(_)) => continue,
            Err(err) => return Err(err),
        };

        candidates.push(Activity {
            kind: ActivityKind::Progress,
            title: format!(
                "Made progress on \"{}\" ({} skills completed)",
                roadmap.title,
                record.completed_count()
            ),
            timestamp: record.updated_at,
            icon: "CheckCircle",
        });
    }

    Ok(merge_activities(candidates))
}
