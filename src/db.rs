use crate::{
    auth::{DbUser, DbUserSession, User, UserSession},
    error::AppError,
    models::{
        DbProgressEntry, DbQuizAttempt, DbRoadmap, DbRoadmapProgress, ProgressEntry, QuizAttempt,
        Roadmap, RoadmapContent, RoadmapProgress,
    },
};
use chrono::{NaiveDateTime, Utc};
use sqlx::{Pool, Sqlite};
use tracing::{info, instrument};

const USER_COLUMNS: &str = "id, email, fname, lname, profile_pic, provider, password";
const PROGRESS_COLUMNS: &str =
    "id, user_id, roadmap_id, certificate_issued, started_at, completed_at, updated_at";

// ---- users ----

#[instrument]
pub async fn get_user(pool: &Pool<Sqlite>, id: i64) -> Result<User, AppError> {
    info!("Fetching user by ID");
    let row = sqlx::query_as::<_, DbUser>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(user) => Ok(User::from(user)),
        _ => Err(AppError::NotFound(format!(
            "User with id {} not found in database",
            id
        ))),
    }
}

#[instrument]
pub async fn find_user_by_email(
    pool: &Pool<Sqlite>,
    email: &str,
) -> Result<Option<User>, AppError> {
    info!("Fetching user by email");
    let row = sqlx::query_as::<_, DbUser>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE email = ?"
    ))
    .bind(email)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(User::from))
}

#[instrument(skip_all, fields(email))]
pub async fn create_user(
    pool: &Pool<Sqlite>,
    email: &str,
    password: Option<&str>,
    fname: &str,
    lname: Option<&str>,
    profile_pic: Option<&str>,
    provider: Option<&str>,
) -> Result<i64, AppError> {
    info!("Creating new user");

    let existing = sqlx::query("SELECT id FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(pool)
        .await?;

    if existing.is_some() {
        return Err(AppError::Validation("User already registered".to_string()));
    }

    let hashed_password = match password {
        Some(password) => Some(bcrypt::hash(password, bcrypt::DEFAULT_COST)?),
        None => None,
    };

    let res = sqlx::query(
        "INSERT INTO users (email, password, fname, lname, profile_pic, provider)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(email)
    .bind(hashed_password)
    .bind(fname)
    .bind(lname)
    .bind(profile_pic)
    .bind(provider)
    .execute(pool)
    .await?;

    Ok(res.last_insert_rowid())
}

/// Checks the credentials against the stored bcrypt hash. Accounts
/// created through an OAuth provider have no hash and never match.
#[instrument(skip_all, fields(email))]
pub async fn authenticate_user(
    pool: &Pool<Sqlite>,
    email: &str,
    password: &str,
) -> Result<Option<User>, AppError> {
    info!("Authenticating user");

    let user = match find_user_by_email(pool, email).await? {
        Some(user) => user,
        None => return Ok(None),
    };

    let Some(hash) = user.password_hash.as_deref() else {
        return Ok(None);
    };

    match bcrypt::verify(password, hash) {
        Ok(true) => Ok(Some(user)),
        _ => Ok(None),
    }
}

// ---- sessions ----

#[instrument(skip(pool, token))]
pub async fn create_user_session(
    pool: &Pool<Sqlite>,
    user_id: i64,
    token: &str,
    expires_at: NaiveDateTime,
) -> Result<i64, AppError> {
    info!("Creating user session");

    let res = sqlx::query("INSERT INTO user_sessions (user_id, token, expires_at) VALUES (?, ?, ?)")
        .bind(user_id)
        .bind(token)
        .bind(expires_at)
        .execute(pool)
        .await?;

    Ok(res.last_insert_rowid())
}

#[instrument(skip(pool, token))]
pub async fn get_session_by_token(
    pool: &Pool<Sqlite>,
    token: &str,
) -> Result<UserSession, AppError> {
    info!("Getting session by token");

    let session = sqlx::query_as::<_, DbUserSession>(
        "SELECT id, user_id, token, created_at, expires_at FROM user_sessions WHERE token = ?",
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;

    match session {
        Some(session) => Ok(UserSession::from(session)),
        _ => Err(AppError::Authentication(
            "Invalid session token".to_string(),
        )),
    }
}

#[instrument(skip(pool, token))]
pub async fn invalidate_session(pool: &Pool<Sqlite>, token: &str) -> Result<(), AppError> {
    info!("Invalidating session");

    sqlx::query("DELETE FROM user_sessions WHERE token = ?")
        .bind(token)
        .execute(pool)
        .await?;

    Ok(())
}

#[instrument(skip(pool))]
pub async fn clean_expired_sessions(pool: &Pool<Sqlite>) -> Result<u64, AppError> {
    info!("Cleaning expired sessions");

    let now = Utc::now().naive_utc();

    let result = sqlx::query("DELETE FROM user_sessions WHERE expires_at < ?")
        .bind(now)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

// ---- roadmaps ----

#[instrument(skip(pool, content, raw_response))]
pub async fn insert_roadmap(
    pool: &Pool<Sqlite>,
    user_id: i64,
    content: &RoadmapContent,
    raw_response: &serde_json::Value,
) -> Result<Roadmap, AppError> {
    info!("Persisting generated roadmap");

    let phases_json = serde_json::to_string(&content.phases)
        .map_err(|e| AppError::Internal(format!("Failed to serialize phases: {}", e)))?;
    let tips_json = serde_json::to_string(&content.general_tips)
        .map_err(|e| AppError::Internal(format!("Failed to serialize tips: {}", e)))?;

    let res = sqlx::query(
        "INSERT INTO roadmaps (user_id, title, goal, phases, general_tips, raw_response)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(user_id)
    .bind(&content.title)
    .bind(&content.goal)
    .bind(phases_json)
    .bind(tips_json)
    .bind(raw_response.to_string())
    .execute(pool)
    .await?;

    get_roadmap(pool, user_id, res.last_insert_rowid()).await
}

#[instrument]
pub async fn get_roadmap(
    pool: &Pool<Sqlite>,
    user_id: i64,
    roadmap_id: i64,
) -> Result<Roadmap, AppError> {
    info!("Fetching roadmap");

    let row = sqlx::query_as::<_, DbRoadmap>(
        "SELECT id, user_id, title, goal, phases, general_tips, created_at, updated_at
         FROM roadmaps WHERE id = ? AND user_id = ?",
    )
    .bind(roadmap_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(roadmap) => Ok(Roadmap::from(roadmap)),
        _ => Err(AppError::NotFound(format!(
            "Roadmap {} not found",
            roadmap_id
        ))),
    }
}

#[instrument]
pub async fn get_roadmaps_for_user(
    pool: &Pool<Sqlite>,
    user_id: i64,
) -> Result<Vec<Roadmap>, AppError> {
    info!("Fetching all roadmaps for user");

    let rows = sqlx::query_as::<_, DbRoadmap>(
        "SELECT id, user_id, title, goal, phases, general_tips, created_at, updated_at
         FROM roadmaps WHERE user_id = ? ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Roadmap::from).collect())
}

#[instrument]
pub async fn recent_roadmaps(
    pool: &Pool<Sqlite>,
    user_id: i64,
    limit: i64,
) -> Result<Vec<Roadmap>, AppError> {
    info!("Fetching recent roadmaps");

    let rows = sqlx::query_as::<_, DbRoadmap>(
        "SELECT id, user_id, title, goal, phases, general_tips, created_at, updated_at
         FROM roadmaps WHERE user_id = ? ORDER BY created_at DESC LIMIT ?",
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Roadmap::from).collect())
}

// ---- progress ----

async fn load_entries(
    pool: &Pool<Sqlite>,
    progress_id: i64,
) -> Result<Vec<ProgressEntry>, AppError> {
    let rows = sqlx::query_as::<_, DbProgressEntry>(
        "SELECT resource_id, completed FROM progress_entries WHERE progress_id = ?",
    )
    .bind(progress_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(ProgressEntry::from).collect())
}

async fn find_progress_row(
    pool: &Pool<Sqlite>,
    user_id: i64,
    roadmap_id: &str,
) -> Result<Option<DbRoadmapProgress>, AppError> {
    let row = sqlx::query_as::<_, DbRoadmapProgress>(&format!(
        "SELECT {PROGRESS_COLUMNS} FROM roadmap_progress WHERE user_id = ? AND roadmap_id = ?"
    ))
    .bind(user_id)
    .bind(roadmap_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Returns the progress record for (user, roadmap), creating an empty one
/// on first access. Missing records are never a not-found condition.
#[instrument]
pub async fn get_or_create_progress(
    pool: &Pool<Sqlite>,
    user_id: i64,
    roadmap_id: &str,
) -> Result<RoadmapProgress, AppError> {
    info!("Fetching progress record");

    if let Some(row) = find_progress_row(pool, user_id, roadmap_id).await? {
        let id = row.id.unwrap_or_default();
        let entries = load_entries(pool, id).await?;
        return Ok(row.into_progress(entries));
    }

    info!("No progress record yet, creating one");
    // OR IGNORE keeps concurrent first accesses idempotent: whoever loses
    // the UNIQUE(user_id, roadmap_id) race falls through to the re-fetch.
    sqlx::query("INSERT OR IGNORE INTO roadmap_progress (user_id, roadmap_id) VALUES (?, ?)")
        .bind(user_id)
        .bind(roadmap_id)
        .execute(pool)
        .await?;

    let row = find_progress_row(pool, user_id, roadmap_id)
        .await?
        .ok_or_else(|| AppError::Internal("Progress record vanished after insert".to_string()))?;

    let id = row.id.unwrap_or_default();
    let entries = load_entries(pool, id).await?;
    Ok(row.into_progress(entries))
}

/// Upserts one checkmark. The UNIQUE(progress_id, resource_id) index makes
/// this a single atomic statement: repeated toggles converge to the last
/// written value and duplicates cannot arise.
#[instrument]
pub async fn set_resource_status(
    pool: &Pool<Sqlite>,
    user_id: i64,
    roadmap_id: &str,
    resource_id: &str,
    completed: bool,
) -> Result<ProgressEntry, AppError> {
    info!("Updating resource completion status");

    let progress = get_or_create_progress(pool, user_id, roadmap_id).await?;

    sqlx::query(
        "INSERT INTO progress_entries (progress_id, resource_id, completed)
         VALUES (?, ?, ?)
         ON CONFLICT (progress_id, resource_id) DO UPDATE SET completed = excluded.completed",
    )
    .bind(progress.id)
    .bind(resource_id)
    .bind(completed)
    .execute(pool)
    .await?;

    let now = Utc::now().naive_utc();
    sqlx::query("UPDATE roadmap_progress SET updated_at = ? WHERE id = ?")
        .bind(now)
        .bind(progress.id)
        .execute(pool)
        .await?;

    Ok(ProgressEntry {
        resource_id: resource_id.to_string(),
        completed,
    })
}

#[instrument]
pub async fn get_progress_for_user(
    pool: &Pool<Sqlite>,
    user_id: i64,
) -> Result<Vec<RoadmapProgress>, AppError> {
    info!("Fetching all progress records for user");

    let rows = sqlx::query_as::<_, DbRoadmapProgress>(&format!(
        "SELECT {PROGRESS_COLUMNS} FROM roadmap_progress WHERE user_id = ?"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        let id = row.id.unwrap_or_default();
        let entries = load_entries(pool, id).await?;
        records.push(row.into_progress(entries));
    }

    Ok(records)
}

#[instrument]
pub async fn recent_progress(
    pool: &Pool<Sqlite>,
    user_id: i64,
    limit: i64,
) -> Result<Vec<RoadmapProgress>, AppError> {
    info!("Fetching recent progress records");

    let rows = sqlx::query_as::<_, DbRoadmapProgress>(&format!(
        "SELECT {PROGRESS_COLUMNS} FROM roadmap_progress
         WHERE user_id = ? ORDER BY updated_at DESC LIMIT ?"
    ))
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        let id = row.id.unwrap_or_default();
        let entries = load_entries(pool, id).await?;
        records.push(row.into_progress(entries));
    }

    Ok(records)
}

/// Stamps `completed_at` on a fully checked-off roadmap. Runs after each
/// toggle so the stats read path stays free of writes. A roadmap id that
/// does not parse or no longer resolves is ignored: the progress record's
/// roadmap reference is deliberately unenforced.
#[instrument]
pub async fn reconcile_completion(
    pool: &Pool<Sqlite>,
    user_id: i64,
    roadmap_id: &str,
) -> Result<(), AppError> {
    let Ok(numeric_id) = roadmap_id.parse::<i64>() else {
        return Ok(());
    };

    let roadmap = match get_roadmap(pool, user_id, numeric_id).await {
        Ok(roadmap) => roadmap,
        Err(AppError::NotFound(_)) => return Ok(()),
        Err(err) => return Err(err),
    };

    let total_items = roadmap.total_items();
    if total_items == 0 {
        return Ok(());
    }

    let Some(row) = find_progress_row(pool, user_id, roadmap_id).await? else {
        return Ok(());
    };

    if row.completed_at.is_some() {
        return Ok(());
    }

    let progress_id = row.id.unwrap_or_default();
    let entries = load_entries(pool, progress_id).await?;
    let completed_items = entries.iter().filter(|e| e.completed).count();

    if completed_items == total_items {
        info!("All roadmap items completed, stamping completion");
        let now = Utc::now().naive_utc();
        sqlx::query(
            "UPDATE roadmap_progress SET completed_at = ? WHERE id = ? AND completed_at IS NULL",
        )
        .bind(now)
        .bind(progress_id)
        .execute(pool)
        .await?;
    }

    Ok(())
}

// ---- quiz attempts ----

#[instrument]
pub async fn quiz_attempts_for_user(
    pool: &Pool<Sqlite>,
    user_id: i64,
) -> Result<Vec<QuizAttempt>, AppError> {
    info!("Fetching quiz attempts");

    let rows = sqlx::query_as::<_, DbQuizAttempt>(
        "SELECT id, user_id, quiz_id, score, completed_at FROM quiz_attempts
         WHERE user_id = ? ORDER BY completed_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(QuizAttempt::from).collect())
}

#[instrument]
pub async fn recent_quiz_attempts(
    pool: &Pool<Sqlite>,
    user_id: i64,
    limit: i64,
) -> Result<Vec<QuizAttempt>, AppError> {
    info!("Fetching recent quiz attempts");

    let rows = sqlx::query_as::<_, DbQuizAttempt>(
        "SELECT id, user_id, quiz_id, score, completed_at FROM quiz_attempts
         WHERE user_id = ? ORDER BY completed_at DESC LIMIT ?",
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(QuizAttempt::from).collect())
}

/// Quiz submission itself lives outside this service; attempts are
/// inserted here only by fixtures and tests.
#[instrument]
pub async fn record_quiz_attempt(
    pool: &Pool<Sqlite>,
    user_id: i64,
    quiz_id: &str,
    score: i64,
    completed_at: NaiveDateTime,
) -> Result<i64, AppError> {
    info!("Recording quiz attempt");

    let res = sqlx::query(
        "INSERT INTO quiz_attempts (user_id, quiz_id, score, completed_at) VALUES (?, ?, ?, ?)",
    )
    .bind(user_id)
    .bind(quiz_id)
    .bind(score)
    .bind(completed_at)
    .execute(pool)
    .await?;

    Ok(res.last_insert_rowid())
}
