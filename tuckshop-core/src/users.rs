use argon2::Argon2;
use log::info;

use crate::{
    auth::{hash_password, AuthError, DEFAULT_PASSWORD},
    DatabaseError, NewUser, PrimaryKey, TuckshopContext, UpdatedUser, UserData, UserKind, UserRole,
};

/// Staff-side account management: registering, editing, and removing
/// students and teachers, and resetting forgotten passwords.
pub struct UserManager {
    context: TuckshopContext,
    argon: Argon2<'static>,
}

/// A new account as staff enters it. Without a password the account starts
/// with the default one.
#[derive(Debug)]
pub struct NewAccount {
    pub login_id: String,
    pub password: Option<String>,
    pub display_name: String,
    pub kind: UserKind,
}

impl UserManager {
    pub fn new(context: &TuckshopContext) -> Self {
        Self {
            context: context.clone(),
            argon: Argon2::default(),
        }
    }

    /// Lists accounts of one role, sorted by login id
    pub async fn list(&self, role: UserRole) -> Result<Vec<UserData>, DatabaseError> {
        self.context.database.list_users(role).await
    }

    pub async fn by_id(&self, user_id: PrimaryKey) -> Result<UserData, DatabaseError> {
        self.context.database.user_by_id(user_id).await
    }

    pub async fn create(&self, new_account: NewAccount) -> Result<UserData, AuthError> {
        let password = new_account
            .password
            .unwrap_or_else(|| DEFAULT_PASSWORD.to_string());

        let hashed_password = hash_password(&self.argon, &password)?;

        let user = self
            .context
            .database
            .create_user(NewUser {
                login_id: new_account.login_id,
                password: hashed_password,
                display_name: new_account.display_name,
                kind: new_account.kind,
            })
            .await
            .map_err(AuthError::Db)?;

        info!(
            "Registered {} account {} ({})",
            user.role(),
            user.login_id,
            user.display_name
        );

        Ok(user)
    }

    pub async fn update(&self, updated_user: UpdatedUser) -> Result<UserData, DatabaseError> {
        self.context.database.update_user(updated_user).await
    }

    pub async fn delete(&self, user_id: PrimaryKey) -> Result<(), DatabaseError> {
        self.context.database.delete_user(user_id).await
    }

    /// Puts an account back on the default password
    pub async fn reset_password(&self, user_id: PrimaryKey) -> Result<UserData, AuthError> {
        let hashed_password = hash_password(&self.argon, DEFAULT_PASSWORD)?;

        let user = self
            .context
            .database
            .set_password(user_id, hashed_password)
            .await
            .map_err(AuthError::Db)?;

        info!("Password reset for {} account {}", user.role(), user.login_id);

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Credentials, MemoryDatabase, Tuckshop};

    fn tuckshop() -> Tuckshop {
        Tuckshop::new(MemoryDatabase::new())
    }

    fn student_account(login_id: &str, name: &str) -> NewAccount {
        NewAccount {
            login_id: login_id.to_string(),
            password: None,
            display_name: name.to_string(),
            kind: UserKind::Student {
                category: "게임개발".to_string(),
                grade: 2,
                class_no: 7,
            },
        }
    }

    #[tokio::test]
    async fn accounts_without_a_password_get_the_default_one() {
        let tuckshop = tuckshop();
        tuckshop
            .users
            .create(student_account("s1002", "홍길동"))
            .await
            .unwrap();

        tuckshop
            .auth
            .login(Credentials {
                role: UserRole::Student,
                login_id: "s1002".to_string(),
                password: DEFAULT_PASSWORD.to_string(),
            })
            .await
            .expect("default password logs in");
    }

    #[tokio::test]
    async fn login_ids_are_unique_within_a_role() {
        let tuckshop = tuckshop();

        tuckshop
            .users
            .create(student_account("s1002", "홍길동"))
            .await
            .unwrap();

        let duplicate = tuckshop.users.create(student_account("s1002", "임꺽정")).await;
        assert!(matches!(
            duplicate,
            Err(AuthError::Db(DatabaseError::Conflict { .. }))
        ));

        // The same login id is fine in the other role collection
        tuckshop
            .users
            .create(NewAccount {
                login_id: "s1002".to_string(),
                password: None,
                display_name: "김선생".to_string(),
                kind: UserKind::Teacher {
                    category: "교무".to_string(),
                    department: "정보기술".to_string(),
                },
            })
            .await
            .expect("roles are separate collections");
    }

    #[tokio::test]
    async fn listing_is_per_role_and_sorted_by_login_id() {
        let tuckshop = tuckshop();

        tuckshop.users.create(student_account("s2001", "이몽룡")).await.unwrap();
        tuckshop.users.create(student_account("s1002", "홍길동")).await.unwrap();

        let students = tuckshop.users.list(UserRole::Student).await.unwrap();
        let logins: Vec<_> = students.iter().map(|u| u.login_id.as_str()).collect();
        assert_eq!(logins, ["s1002", "s2001"]);

        let teachers = tuckshop.users.list(UserRole::Teacher).await.unwrap();
        assert!(teachers.is_empty());
    }

    #[tokio::test]
    async fn reset_puts_an_account_back_on_the_default_password() {
        let tuckshop = tuckshop();

        let user = tuckshop
            .users
            .create(NewAccount {
                password: Some("their-own".to_string()),
                ..student_account("s1002", "홍길동")
            })
            .await
            .unwrap();

        tuckshop.users.reset_password(user.id).await.unwrap();

        tuckshop
            .auth
            .login(Credentials {
                role: UserRole::Student,
                login_id: "s1002".to_string(),
                password: DEFAULT_PASSWORD.to_string(),
            })
            .await
            .expect("reset password logs in");
    }
}
