use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// One external reading resource inside a phase.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Reference {
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub link: String,
}

/// One video resource inside a phase.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct VideoLink {
    pub title: String,
    pub platform: String,
    pub link: String,
}

/// An ordered stage of a roadmap. Phases are addressed by position only,
/// never by their own identifier.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Phase {
    #[serde(rename = "phase_name")]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "skills_to_acquire", default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub references: Vec<Reference>,
    #[serde(default)]
    pub video_links: Vec<VideoLink>,
    #[serde(default)]
    pub practice_questions: Vec<String>,
}

impl Phase {
    /// Checkable items in this phase: skills, references and videos.
    /// Practice questions are not checkable and never count.
    pub fn countable_items(&self) -> usize {
        self.skills.len() + self.references.len() + self.video_links.len()
    }
}

/// The structured payload the generator returns, and the shape the
/// roadmap content keeps for its whole life.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RoadmapContent {
    #[serde(rename = "roadmap_title")]
    pub title: String,
    #[serde(default)]
    pub goal: String,
    pub phases: Vec<Phase>,
    #[serde(default)]
    pub general_tips: Vec<String>,
}

#[derive(Serialize, Clone, Debug)]
pub struct Roadmap {
    pub id: i64,
    pub user_id: i64,
    #[serde(rename = "roadmap_title")]
    pub title: String,
    pub goal: String,
    pub phases: Vec<Phase>,
    pub general_tips: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Roadmap {
    pub fn total_items(&self) -> usize {
        self.phases.iter().map(Phase::countable_items).sum()
    }

    pub fn total_skills(&self) -> usize {
        self.phases.iter().map(|p| p.skills.len()).sum()
    }
}

#[derive(sqlx::FromRow, Clone, Default)]
pub struct DbRoadmap {
    pub id: Option<i64>,
    pub user_id: Option<i64>,
    pub title: Option<String>,
    pub goal: Option<String>,
    pub phases: Option<String>,
    pub general_tips: Option<String>,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

impl From<DbRoadmap> for Roadmap {
    fn from(db: DbRoadmap) -> Self {
        Self {
            id: db.id.unwrap_or_default(),
            user_id: db.user_id.unwrap_or_default(),
            title: db.title.unwrap_or_default(),
            goal: db.goal.unwrap_or_default(),
            phases: db
                .phases
                .as_deref()
                .and_then(|json| serde_json::from_str(json).ok())
                .unwrap_or_default(),
            general_tips: db
                .general_tips
                .as_deref()
                .and_then(|json| serde_json::from_str(json).ok())
                .unwrap_or_default(),
            created_at: utc_or_now(db.created_at),
            updated_at: utc_or_now(db.updated_at),
        }
    }
}

/// One checkmark in a progress record. `resource_id` is the synthetic
/// identifier the UI derives from the phase/item position, e.g.
/// "skill-0-2" or "ref-1-0".
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ProgressEntry {
    #[serde(rename = "resourceId")]
    pub resource_id: String,
    pub completed: bool,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbProgressEntry {
    pub resource_id: Option<String>,
    pub completed: Option<bool>,
}

impl From<DbProgressEntry> for ProgressEntry {
    fn from(db: DbProgressEntry) -> Self {
        Self {
            resource_id: db.resource_id.unwrap_or_default(),
            completed: db.completed.unwrap_or_default(),
        }
    }
}

/// Per-(user, roadmap) completion state. Entries are unbounded and never
/// pruned: resource ids that no longer exist in the roadmap stay inert.
#[derive(Serialize, Clone, Debug)]
pub struct RoadmapProgress {
    pub id: i64,
    pub user_id: i64,
    #[serde(rename = "roadmapId")]
    pub roadmap_id: String,
    #[serde(rename = "progress")]
    pub entries: Vec<ProgressEntry>,
    #[serde(rename = "certificateIssued")]
    pub certificate_issued: bool,
    #[serde(rename = "startedAt")]
    pub started_at: DateTime<Utc>,
    #[serde(rename = "completedAt")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl RoadmapProgress {
    pub fn completed_count(&self) -> usize {
        self.entries.iter().filter(|e| e.completed).count()
    }
}

#[derive(sqlx::FromRow, Clone, Default)]
pub struct DbRoadmapProgress {
    pub id: Option<i64>,
    pub user_id: Option<i64>,
    pub roadmap_id: Option<String>,
    pub certificate_issued: Option<bool>,
    pub started_at: Option<NaiveDateTime>,
    pub completed_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

impl DbRoadmapProgress {
    pub fn into_progress(self, entries: Vec<ProgressEntry>) -> RoadmapProgress {
        RoadmapProgress {
            id: self.id.unwrap_or_default(),
            user_id: self.user_id.unwrap_or_default(),
            roadmap_id: self.roadmap_id.unwrap_or_default(),
            entries,
            certificate_issued: self.certificate_issued.unwrap_or_default(),
            started_at: utc_or_now(self.started_at),
            completed_at: self
                .completed_at
                .map(|dt| DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc)),
            updated_at: utc_or_now(self.updated_at),
        }
    }
}

/// Append-only quiz result. Created by quiz submission, which lives
/// outside this service; read here for stats and the activity feed.
#[derive(Serialize, Clone, Debug)]
pub struct QuizAttempt {
    pub id: i64,
    pub user_id: i64,
    #[serde(rename = "quizId")]
    pub quiz_id: String,
    pub score: i64,
    #[serde(rename = "completedAt")]
    pub completed_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbQuizAttempt {
    pub id: Option<i64>,
    pub user_id: Option<i64>,
    pub quiz_id: Option<String>,
    pub score: Option<i64>,
    pub completed_at: Option<NaiveDateTime>,
}

impl From<DbQuizAttempt> for QuizAttempt {
    fn from(db: DbQuizAttempt) -> Self {
        Self {
            id: db.id.unwrap_or_default(),
            user_id: db.user_id.unwrap_or_default(),
            quiz_id: db.quiz_id.unwrap_or_default(),
            score: db.score.unwrap_or_default(),
            completed_at: utc_or_now(db.completed_at),
        }
    }
}

fn utc_or_now(dt: Option<NaiveDateTime>) -> DateTime<Utc> {
    dt.map(|dt| DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc))
        .unwrap_or_else(Utc::now)
}
