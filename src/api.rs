use chrono::{DateTime, Local, Utc};
use rocket::State;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::{Deserialize, Serialize, json::Json};
use sqlx::{Pool, Sqlite};
use validator::{Validate, ValidationError};

use crate::activity::{Activity, build_feed};
use crate::auth::{User, UserSession};
use crate::db::{
    authenticate_user, create_user, create_user_session, find_user_by_email,
    get_or_create_progress, get_progress_for_user, get_roadmap, get_roadmaps_for_user,
    insert_roadmap, invalidate_session, quiz_attempts_for_user, recent_roadmaps,
    reconcile_completion, set_resource_status,
};
use crate::generator::RoadmapGenerator;
use crate::models::{ProgressEntry, Roadmap, RoadmapProgress};
use crate::stats::{DashboardStats, compute_stats};
use crate::validation::AppErrorExt;
use crate::validation::JsonValidateExt;
use crate::validation::ValidationResponse;

#[derive(Serialize, Deserialize, Debug)]
pub struct UserData {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub image: Option<String>,
}

impl From<User> for UserData {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.full_name(),
            image: user.profile_pic.clone(),
        }
    }
}

fn validate_profile_pic(value: &str) -> Result<(), ValidationError> {
    // Empty is allowed; anything else must be a URL.
    if value.is_empty() || value.starts_with("http://") || value.starts_with("https://") {
        Ok(())
    } else {
        Err(ValidationError::new("url")
            .with_message("Profile picture must be a valid URL".into()))
    }
}

#[derive(Deserialize, Validate, Clone)]
pub struct RegistrationRequest {
    #[validate(email(message = "Invalid email format"))]
    email: String,
    #[validate(length(min = 6, max = 18, message = "Password must be 6 to 18 characters"))]
    password: String,
    #[validate(length(min = 1, message = "First name is required"))]
    fname: String,
    lname: Option<String>,
    #[validate(custom(function = validate_profile_pic))]
    #[serde(default)]
    profile_pic: String,
}

#[post("/register", data = "<registration>")]
pub async fn api_register(
    registration: Json<RegistrationRequest>,
    db: &State<Pool<Sqlite>>,
) -> Result<Status, Custom<Json<ValidationResponse>>> {
    let validated = registration.validate_custom()?;

    let existing_user = find_user_by_email(db, &validated.email)
        .await
        .validate_custom()?;

    if existing_user.is_some() {
        return Err(Custom(
            Status::Conflict,
            Json(ValidationResponse::with_error(
                "email",
                "User already registered",
            )),
        ));
    }

    let profile_pic = match validated.profile_pic.as_str() {
        "" => None,
        url => Some(url),
    };

    create_user(
        db,
        &validated.email,
        Some(&validated.password),
        &validated.fname,
        validated.lname.as_deref(),
        profile_pic,
        None,
    )
    .await
    .validate_custom()?;

    Ok(Status::Created)
}

#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    password: String,
}

#[derive(Serialize, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
    pub user: Option<UserData>,
    pub error: Option<String>,
}

#[post("/login", data = "<login>")]
pub async fn api_login(
    login: Json<LoginRequest>,
    cookies: &rocket::http::CookieJar<'_>,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<LoginResponse>, Custom<Json<ValidationResponse>>> {
    use rocket::http::{Cookie, SameSite};

    let validated = login.validate_custom()?;

    match authenticate_user(db, &validated.email, &validated.password)
        .await
        .validate_custom()?
    {
        Some(user) => {
            let token = UserSession::generate_token();
            let expires_at = Utc::now() + chrono::Duration::hours(1);

            create_user_session(db, user.id, &token, expires_at.naive_utc())
                .await
                .validate_custom()?;

            let cookie = Cookie::build(("session_token", token))
                .same_site(SameSite::Lax)
                .http_only(true)
                .max_age(rocket::time::Duration::hours(1));
            cookies.add_private(cookie);

            cookies.add_private(
                Cookie::build(("user_id", user.id.to_string()))
                    .same_site(SameSite::Lax)
                    .http_only(true)
                    .max_age(rocket::time::Duration::hours(1)),
            );

            cookies.add_private(
                Cookie::build(("logged_in", validated.email))
                    .same_site(SameSite::Lax)
                    .max_age(rocket::time::Duration::hours(1)),
            );

            Ok(Json(LoginResponse {
                success: true,
                user: Some(UserData::from(user)),
                error: None,
            }))
        }
        None => Ok(Json(LoginResponse {
            success: false,
            user: None,
            error: Some("Wrong email or password".to_string()),
        })),
    }
}

#[post("/logout")]
pub async fn api_logout(
    cookies: &rocket::http::CookieJar<'_>,
    db: &State<Pool<Sqlite>>,
) -> Status {
    let token = cookies
        .get_private("session_token")
        .map(|cookie| cookie.value().to_string());

    if let Some(token) = token {
        let _ = invalidate_session(db, &token).await;
    }

    cookies.remove_private(rocket::http::Cookie::build("session_token"));
    cookies.remove_private(rocket::http::Cookie::build("user_id"));
    cookies.remove_private(rocket::http::Cookie::build("logged_in"));

    Status::Ok
}

#[get("/me")]
pub async fn api_me(user: User) -> Json<UserData> {
    Json(UserData::from(user))
}

#[get("/me", rank = 2)]
pub async fn api_me_unauthorized() -> Status {
    Status::Unauthorized
}

#[derive(Deserialize, Validate)]
pub struct GenerateRequest {
    #[validate(length(min = 1, message = "Prompt is required"))]
    prompt: String,
}

#[derive(Serialize, Deserialize)]
pub struct RoadmapResponse<T> {
    pub roadmap: T,
}

#[post("/roadmap/generate", data = "<request>")]
pub async fn api_generate_roadmap(
    request: Json<GenerateRequest>,
    user: User,
    generator: &State<RoadmapGenerator>,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<RoadmapResponse<Roadmap>>, Custom<Json<ValidationResponse>>> {
    let validated = request.validate_custom()?;

    // Nothing persists unless the generator output validated cleanly.
    let (content, raw) = generator.generate(&validated.prompt).await.validate_custom()?;

    let roadmap = insert_roadmap(db, user.id, &content, &raw)
        .await
        .validate_custom()?;

    Ok(Json(RoadmapResponse { roadmap }))
}

#[get("/roadmaps/<id>")]
pub async fn api_get_roadmap(
    id: i64,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Roadmap>, Status> {
    let roadmap = get_roadmap(db, user.id, id).await?;
    Ok(Json(roadmap))
}

#[derive(Serialize, Deserialize)]
pub struct RoadmapSummary {
    pub id: i64,
    pub title: String,
    #[serde(rename = "currentPhase")]
    pub current_phase: String,
    pub progress: i64,
    #[serde(rename = "isCompleted")]
    pub is_completed: bool,
    #[serde(rename = "startedAt")]
    pub started_at: DateTime<Utc>,
}

#[get("/dashboard/roadmaps")]
pub async fn api_dashboard_roadmaps(
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<RoadmapSummary>>, Status> {
    let roadmaps = recent_roadmaps(db, user.id, 5).await?;
    let progress = get_progress_for_user(db, user.id).await?;

    let summaries = roadmaps
        .into_iter()
        .map(|roadmap| {
            let record = progress
                .iter()
                .find(|rp| rp.roadmap_id == roadmap.id.to_string());

            let total_skills = roadmap.total_skills();
            let completed = record.map(RoadmapProgress::completed_count).unwrap_or(0);
            let percentage = if total_skills > 0 {
                ((completed as f64 / total_skills as f64) * 100.0).round() as i64
            } else {
                0
            };

            let mut current_phase = roadmap
                .phases
                .first()
                .map(|p| p.name.clone())
                .unwrap_or_else(|| "Getting Started".to_string());
            if record.is_some() && percentage > 0 && !roadmap.phases.is_empty() {
                let phase_index =
                    ((percentage as f64 / 100.0) * roadmap.phases.len() as f64) as usize;
                let phase_index = phase_index.min(roadmap.phases.len() - 1);
                current_phase = roadmap.phases[phase_index].name.clone();
            }

            RoadmapSummary {
                id: roadmap.id,
                title: roadmap.title,
                current_phase,
                progress: percentage,
                is_completed: record.is_some_and(|rp| rp.completed_at.is_some()),
                started_at: record
                    .map(|rp| rp.started_at)
                    .unwrap_or(roadmap.created_at),
            }
        })
        .collect();

    Ok(Json(summaries))
}

#[get("/progress/<roadmap_id>")]
pub async fn api_get_progress(
    roadmap_id: &str,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<RoadmapProgress>, Status> {
    let progress = get_or_create_progress(db, user.id, roadmap_id).await?;
    Ok(Json(progress))
}

#[derive(Deserialize, Validate)]
pub struct ToggleRequest {
    #[validate(length(min = 1, message = "resourceId is required"))]
    #[serde(rename = "resourceId")]
    resource_id: String,
    completed: bool,
}

#[derive(Serialize, Deserialize)]
pub struct ToggleResponse {
    pub success: bool,
    pub progress: ProgressEntry,
}

#[post("/progress/<roadmap_id>", data = "<request>")]
pub async fn api_toggle_progress(
    roadmap_id: &str,
    request: Json<ToggleRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<ToggleResponse>, Custom<Json<ValidationResponse>>> {
    let validated = request.validate_custom()?;

    let entry = set_resource_status(
        db,
        user.id,
        roadmap_id,
        &validated.resource_id,
        validated.completed,
    )
    .await
    .validate_custom()?;

    // Completion stamping is an explicit step of the toggle path, never a
    // side effect of a stats read.
    reconcile_completion(db, user.id, roadmap_id)
        .await
        .validate_custom()?;

    Ok(Json(ToggleResponse {
        success: true,
        progress: entry,
    }))
}

#[get("/dashboard/stats")]
pub async fn api_dashboard_stats(
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<DashboardStats>, Status> {
    let roadmaps = get_roadmaps_for_user(db, user.id).await?;
    let progress = get_progress_for_user(db, user.id).await?;
    let attempts = quiz_attempts_for_user(db, user.id).await?;

    let today = Local::now().date_naive();
    Ok(Json(compute_stats(&roadmaps, &progress, &attempts, today)))
}

#[get("/dashboard/activity")]
pub async fn api_dashboard_activity(
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<Activity>>, Status> {
    let feed = build_feed(db, user.id).await?;
    Ok(Json(feed))
}

#[get("/health")]
pub fn health() -> &'static str {
    "OK"
}
