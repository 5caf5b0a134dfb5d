use serde::Serialize;

/// An authenticated account. `password_hash` is absent for identities
/// created through an OAuth provider; `provider` records which one.
#[derive(Debug, Serialize, Clone)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub fname: String,
    pub lname: Option<String>,
    pub profile_pic: Option<String>,
    pub provider: Option<String>,
    #[serde(skip)]
    pub password_hash: Option<String>,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbUser {
    pub id: Option<i64>,
    pub email: Option<String>,
    pub fname: Option<String>,
    pub lname: Option<String>,
    pub profile_pic: Option<String>,
    pub provider: Option<String>,
    pub password: Option<String>,
}

impl From<DbUser> for User {
    fn from(user: DbUser) -> Self {
        Self {
            id: user.id.unwrap_or_default(),
            email: user.email.unwrap_or_default(),
            fname: user.fname.unwrap_or_default(),
            lname: user.lname,
            profile_pic: user.profile_pic,
            provider: user.provider,
            password_hash: user.password,
        }
    }
}

impl User {
    pub fn full_name(&self) -> String {
        match &self.lname {
            Some(lname) if !lname.is_empty() => format!("{} {}", self.fname, lname),
            _ => self.fname.clone(),
        }
    }
}
