use argon2::{
    password_hash::{Encoding, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use chrono::{Duration, Utc};
use rand::rngs::OsRng;
use thiserror::Error;

use crate::{
    util::random_string, DatabaseError, NewSession, NewUser, PrimaryKey, SessionData,
    TuckshopContext, UserData, UserKind, UserRole,
};

/// The password every fresh or reset account starts with
pub const DEFAULT_PASSWORD: &str = "1234";

pub struct Auth {
    context: TuckshopContext,
    argon: Argon2<'static>,
}

#[derive(Debug, Error)]
pub enum AuthError {
    /// No account with this login id exists within the role
    #[error("No {role} account with login id {login_id}")]
    UnknownUser { role: UserRole, login_id: String },
    /// Password is incorrect
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("A teacher account already exists")]
    TeacherExists,
    /// Something else went wrong with the database
    #[error(transparent)]
    Db(DatabaseError),
    #[error("HashError: {0}")]
    HashError(String),
}

impl Auth {
    const SESSION_DURATION_IN_DAYS: usize = 7;

    pub fn new(context: &TuckshopContext) -> Self {
        Self {
            context: context.clone(),
            argon: Argon2::default(),
        }
    }

    /// Logs in a user, returning a new session
    pub async fn login(&self, credentials: Credentials) -> Result<SessionData, AuthError> {
        self.clear_expired().await;

        let user = self
            .context
            .database
            .user_by_login(credentials.role, &credentials.login_id)
            .await
            .map_err(|e| match e {
                DatabaseError::NotFound { .. } => AuthError::UnknownUser {
                    role: credentials.role,
                    login_id: credentials.login_id.clone(),
                },
                err => AuthError::Db(err),
            })?;

        verify_password(&self.argon, &credentials.password, &user.password)?;

        let expires_at = Utc::now() + Duration::days(Self::SESSION_DURATION_IN_DAYS as i64);

        let new_session = NewSession {
            token: random_string(32),
            user_id: user.id,
            expires_at,
        };

        self.context
            .database
            .create_session(new_session)
            .await
            .map_err(AuthError::Db)
    }

    /// Deletes the associated session, if it exists
    pub async fn logout(&self, token: &str) -> Result<(), DatabaseError> {
        self.context.database.delete_session_by_token(token).await
    }

    /// Returns the session for a token, if it exists and hasn't expired
    pub async fn session(&self, token: &str) -> Result<SessionData, DatabaseError> {
        let session = self.context.database.session_by_token(token).await?;

        if session.expires_at < Utc::now() {
            return Err(DatabaseError::NotFound {
                resource: "session",
                identifier: "token",
            });
        }

        Ok(session)
    }

    /// Creates the first teacher account, as long as none exists yet.
    /// Every later account is created by staff through the user manager.
    pub async fn register_first_teacher(
        &self,
        new_teacher: NewTeacherAccount,
    ) -> Result<UserData, AuthError> {
        let teachers = self
            .context
            .database
            .count_users(UserRole::Teacher)
            .await
            .map_err(AuthError::Db)?;

        if teachers > 0 {
            return Err(AuthError::TeacherExists);
        }

        let hashed_password = hash_password(&self.argon, &new_teacher.password)?;

        self.context
            .database
            .create_user(NewUser {
                login_id: new_teacher.login_id,
                password: hashed_password,
                display_name: new_teacher.display_name,
                kind: UserKind::Teacher {
                    category: new_teacher.category,
                    department: new_teacher.department,
                },
            })
            .await
            .map_err(AuthError::Db)
    }

    /// Changes a user's own password, verifying the current one first
    pub async fn change_password(
        &self,
        user_id: PrimaryKey,
        current_password: &str,
        new_password: &str,
    ) -> Result<UserData, AuthError> {
        let user = self
            .context
            .database
            .user_by_id(user_id)
            .await
            .map_err(AuthError::Db)?;

        verify_password(&self.argon, current_password, &user.password)?;

        let hashed_password = hash_password(&self.argon, new_password)?;

        self.context
            .database
            .set_password(user_id, hashed_password)
            .await
            .map_err(AuthError::Db)
    }

    async fn clear_expired(&self) {
        self.context
            .database
            .clear_expired_sessions()
            .await
            .expect("sessions are cleared")
    }
}

/// Hashes a password with a fresh salt
pub(crate) fn hash_password(argon: &Argon2<'_>, password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);

    argon
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::HashError(e.to_string()))
}

/// Checks a password attempt against a stored hash
pub(crate) fn verify_password(
    argon: &Argon2<'_>,
    attempt: &str,
    stored: &str,
) -> Result<(), AuthError> {
    let stored_password =
        PasswordHash::parse(stored, Encoding::default()).map_err(|e| AuthError::HashError(e.to_string()))?;

    argon
        .verify_password(attempt.as_bytes(), &stored_password)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[derive(Debug)]
pub struct Credentials {
    pub role: UserRole,
    pub login_id: String,
    pub password: String,
}

#[derive(Debug)]
pub struct NewTeacherAccount {
    pub login_id: String,
    pub password: String,
    pub display_name: String,
    pub category: String,
    pub department: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, EventBus, MemoryDatabase, NewAccount, Tuckshop};
    use std::sync::Arc;

    fn tuckshop() -> Tuckshop {
        Tuckshop::new(MemoryDatabase::new())
    }

    async fn seed_student(tuckshop: &Tuckshop, login_id: &str, name: &str) -> UserData {
        tuckshop
            .users
            .create(NewAccount {
                login_id: login_id.to_string(),
                password: Some("secret".to_string()),
                display_name: name.to_string(),
                kind: UserKind::Student {
                    category: "게임개발".to_string(),
                    grade: 2,
                    class_no: 7,
                },
            })
            .await
            .expect("student is created")
    }

    #[tokio::test]
    async fn login_returns_session_for_valid_credentials() {
        let tuckshop = tuckshop();
        let student = seed_student(&tuckshop, "s1002", "홍길동").await;

        let session = tuckshop
            .auth
            .login(Credentials {
                role: UserRole::Student,
                login_id: "s1002".to_string(),
                password: "secret".to_string(),
            })
            .await
            .expect("login succeeds");

        assert_eq!(session.user.id, student.id);
        assert_eq!(session.token.len(), 32);
        assert!(session.expires_at > Utc::now());
    }

    #[tokio::test]
    async fn login_rejects_wrong_password() {
        let tuckshop = tuckshop();
        seed_student(&tuckshop, "s1002", "홍길동").await;

        let result = tuckshop
            .auth
            .login(Credentials {
                role: UserRole::Student,
                login_id: "s1002".to_string(),
                password: "nope".to_string(),
            })
            .await;

        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn login_rejects_unknown_login_id() {
        let tuckshop = tuckshop();

        let result = tuckshop
            .auth
            .login(Credentials {
                role: UserRole::Student,
                login_id: "nobody".to_string(),
                password: "1234".to_string(),
            })
            .await;

        assert!(matches!(result, Err(AuthError::UnknownUser { .. })));
    }

    #[tokio::test]
    async fn login_is_scoped_to_the_role_collection() {
        let tuckshop = tuckshop();
        seed_student(&tuckshop, "s1002", "홍길동").await;

        // Same login id, wrong role
        let result = tuckshop
            .auth
            .login(Credentials {
                role: UserRole::Teacher,
                login_id: "s1002".to_string(),
                password: "secret".to_string(),
            })
            .await;

        assert!(matches!(result, Err(AuthError::UnknownUser { .. })));
    }

    #[tokio::test]
    async fn stored_passwords_are_hashed() {
        let tuckshop = tuckshop();
        let student = seed_student(&tuckshop, "s1002", "홍길동").await;

        assert_ne!(student.password, "secret");
        assert!(student.password.starts_with("$argon2"));
    }

    #[tokio::test]
    async fn change_password_verifies_the_current_one() {
        let tuckshop = tuckshop();
        let student = seed_student(&tuckshop, "s1002", "홍길동").await;

        let rejected = tuckshop
            .auth
            .change_password(student.id, "wrong", "new-password")
            .await;

        assert!(matches!(rejected, Err(AuthError::InvalidCredentials)));

        tuckshop
            .auth
            .change_password(student.id, "secret", "new-password")
            .await
            .expect("password changes");

        tuckshop
            .auth
            .login(Credentials {
                role: UserRole::Student,
                login_id: "s1002".to_string(),
                password: "new-password".to_string(),
            })
            .await
            .expect("new password logs in");
    }

    #[tokio::test]
    async fn first_teacher_registration_is_one_shot() {
        let tuckshop = tuckshop();

        let new_teacher = || NewTeacherAccount {
            login_id: "t1001".to_string(),
            password: "secret".to_string(),
            display_name: "김선생".to_string(),
            category: "교무".to_string(),
            department: "정보기술".to_string(),
        };

        tuckshop
            .auth
            .register_first_teacher(new_teacher())
            .await
            .expect("first registration succeeds");

        let second = tuckshop.auth.register_first_teacher(new_teacher()).await;
        assert!(matches!(second, Err(AuthError::TeacherExists)));
    }

    #[tokio::test]
    async fn expired_sessions_are_rejected() {
        let database = Arc::new(MemoryDatabase::new());
        let context = TuckshopContext {
            database: database.clone(),
            events: EventBus::default(),
        };
        let auth = Auth::new(&context);

        let user = database
            .create_user(NewUser {
                login_id: "s1002".to_string(),
                password: hash_password(&Argon2::default(), "secret").unwrap(),
                display_name: "홍길동".to_string(),
                kind: UserKind::Student {
                    category: "게임개발".to_string(),
                    grade: 2,
                    class_no: 7,
                },
            })
            .await
            .unwrap();

        database
            .create_session(NewSession {
                token: "stale-token-stale-token-stale-to".to_string(),
                user_id: user.id,
                expires_at: Utc::now() - Duration::days(1),
            })
            .await
            .unwrap();

        let result = auth.session("stale-token-stale-token-stale-to").await;
        assert!(matches!(result, Err(DatabaseError::NotFound { .. })));
    }
}
