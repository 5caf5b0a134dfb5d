#[cfg(test)]
pub mod test_utils {
    use crate::db::{create_user, insert_roadmap, record_quiz_attempt, set_resource_status};
    use crate::error::AppError;
    use crate::generator::RoadmapGenerator;
    use crate::init_rocket;
    use crate::models::{Phase, Reference, RoadmapContent, VideoLink};
    use chrono::NaiveDateTime;
    use rocket::http::{Cookie, ContentType};
    use rocket::local::asynchronous::Client;
    use serde_json::json;
    use sqlx::{Pool, Sqlite, SqlitePool};
    use std::collections::HashMap;
    use std::sync::Once;

    static INIT: Once = Once::new();
    pub static STANDARD_PASSWORD: &str = "password123";

    /// Builds a phase with `skills` skills, `refs` references and `videos`
    /// video links, so item-count arithmetic in tests stays readable.
    pub fn phase(name: &str, skills: usize, refs: usize, videos: usize) -> Phase {
        Phase {
            name: name.to_string(),
            description: format!("{} description", name),
            skills: (0..skills).map(|i| format!("{} skill {}", name, i)).collect(),
            references: (0..refs)
                .map(|i| Reference {
                    title: format!("{} reference {}", name, i),
                    kind: "article".to_string(),
                    link: format!("https://example.com/{}/{}", name, i),
                })
                .collect(),
            video_links: (0..videos)
                .map(|i| VideoLink {
                    title: format!("{} video {}", name, i),
                    platform: "YouTube".to_string(),
                    link: format!("https://youtube.com/{}/{}", name, i),
                })
                .collect(),
            practice_questions: vec![format!("{} question", name)],
        }
    }

    pub fn roadmap_content(title: &str, phases: Vec<Phase>) -> RoadmapContent {
        RoadmapContent {
            title: title.to_string(),
            goal: format!("Become great at {}", title),
            phases,
            general_tips: vec!["Practice daily".to_string()],
        }
    }

    struct TestUser {
        email: String,
        fname: String,
        password: String,
    }

    struct TestRoadmap {
        owner_email: String,
        content: RoadmapContent,
    }

    struct TestToggle {
        owner_email: String,
        roadmap_title: String,
        resource_id: String,
        completed: bool,
    }

    struct TestQuiz {
        owner_email: String,
        quiz_id: String,
        score: i64,
        completed_at: NaiveDateTime,
    }

    #[derive(Default)]
    pub struct TestDbBuilder {
        users: Vec<TestUser>,
        roadmaps: Vec<TestRoadmap>,
        toggles: Vec<TestToggle>,
        quizzes: Vec<TestQuiz>,
    }

    impl TestDbBuilder {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn user(mut self, email: &str, fname: &str) -> Self {
            self.users.push(TestUser {
                email: email.to_string(),
                fname: fname.to_string(),
                password: STANDARD_PASSWORD.to_string(),
            });
            self
        }

        pub fn roadmap(mut self, owner_email: &str, content: RoadmapContent) -> Self {
            self.roadmaps.push(TestRoadmap {
                owner_email: owner_email.to_string(),
                content,
            });
            self
        }

        pub fn toggle(
            mut self,
            owner_email: &str,
            roadmap_title: &str,
            resource_id: &str,
            completed: bool,
        ) -> Self {
            self.toggles.push(TestToggle {
                owner_email: owner_email.to_string(),
                roadmap_title: roadmap_title.to_string(),
                resource_id: resource_id.to_string(),
                completed,
            });
            self
        }

        pub fn quiz_attempt(
            mut self,
            owner_email: &str,
            quiz_id: &str,
            score: i64,
            completed_at: NaiveDateTime,
        ) -> Self {
            self.quizzes.push(TestQuiz {
                owner_email: owner_email.to_string(),
                quiz_id: quiz_id.to_string(),
                score,
                completed_at,
            });
            self
        }

        pub async fn build(self) -> Result<TestDb, AppError> {
            INIT.call_once(|| {
                let _ = env_logger::builder()
                    .parse_filters("debug")
                    .is_test(true)
                    .try_init();
            });

            let pool = SqlitePool::connect("sqlite::memory:").await?;

            sqlx::migrate!("./migrations").run(&pool).await?;

            let mut user_id_map: HashMap<String, i64> = HashMap::new();
            let mut roadmap_id_map: HashMap<String, i64> = HashMap::new();

            for user in &self.users {
                let user_id = create_user(
                    &pool,
                    &user.email,
                    Some(&user.password),
                    &user.fname,
                    None,
                    None,
                    None,
                )
                .await?;

                user_id_map.insert(user.email.clone(), user_id);
            }

            for roadmap in &self.roadmaps {
                let user_id = user_id_map[&roadmap.owner_email];
                let raw = serde_json::to_value(&roadmap.content)
                    .map_err(|e| AppError::Internal(e.to_string()))?;
                let created = insert_roadmap(&pool, user_id, &roadmap.content, &raw).await?;

                roadmap_id_map.insert(roadmap.content.title.clone(), created.id);
            }

            for toggle in &self.toggles {
                let user_id = user_id_map[&toggle.owner_email];
                let roadmap_id = roadmap_id_map[&toggle.roadmap_title].to_string();

                set_resource_status(
                    &pool,
                    user_id,
                    &roadmap_id,
                    &toggle.resource_id,
                    toggle.completed,
                )
                .await?;
            }

            for quiz in &self.quizzes {
                let user_id = user_id_map[&quiz.owner_email];
                record_quiz_attempt(&pool, user_id, &quiz.quiz_id, quiz.score, quiz.completed_at)
                    .await?;
            }

            Ok(TestDb {
                pool,
                user_id_map,
                roadmap_id_map,
            })
        }
    }

    pub struct TestDb {
        pub pool: Pool<Sqlite>,
        pub user_id_map: HashMap<String, i64>,
        pub roadmap_id_map: HashMap<String, i64>,
    }

    impl TestDb {
        pub fn user_id(&self, email: &str) -> Option<i64> {
            self.user_id_map.get(email).copied()
        }

        pub fn roadmap_id(&self, title: &str) -> Option<i64> {
            self.roadmap_id_map.get(title).copied()
        }
    }

    pub fn test_generator() -> RoadmapGenerator {
        // Points at a closed port; tests never reach the network.
        RoadmapGenerator::new("http://127.0.0.1:9".to_string(), "test-key".to_string())
    }

    pub async fn setup_test_client(test_db: TestDb) -> (Client, TestDb) {
        let rocket = init_rocket(test_db.pool.clone(), test_generator()).await;
        let client = Client::tracked(rocket)
            .await
            .expect("Failed to build test client");

        (client, test_db)
    }

    pub async fn login_test_user(client: &Client, email: &str, password: &str) -> Vec<Cookie<'static>> {
        let response = client
            .post("/api/login")
            .header(ContentType::JSON)
            .body(
                json!({
                    "email": email,
                    "password": password
                })
                .to_string(),
            )
            .dispatch()
            .await;

        response
            .cookies()
            .iter()
            .map(|c| c.clone().into_owned())
            .collect()
    }

    pub fn standard_test_db() -> TestDbBuilder {
        TestDbBuilder::new()
            .user("learner@example.com", "Learner")
            .roadmap(
                "learner@example.com",
                roadmap_content(
                    "Backend Engineer",
                    vec![phase("Foundations", 3, 1, 0), phase("Systems", 2, 0, 1)],
                ),
            )
    }
}
