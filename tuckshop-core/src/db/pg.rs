use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, query, query_as, Error as SqlxError, FromRow, PgPool};

use crate::{
    CheerData, Database, DatabaseError, DatabaseResult, IntoDatabaseError, ItemCategory, ItemData,
    NewCheer, NewItem, NewOrder, NewSession, NewUser, OrderData, OrderStatus, PopularMenu,
    PrimaryKey, Result, SessionData, UpdatedItem, UpdatedUser, UserData, UserKind, UserRole,
};

/// A postgres database implementation for tuckshop
pub struct PgDatabase {
    pool: PgPool,
}

/// Applied on connect. Queries are checked at runtime, so the schema has to
/// exist before the first request comes in.
const SCHEMA: [&str; 5] = [
    "CREATE TABLE IF NOT EXISTS items (
        id SERIAL PRIMARY KEY,
        name TEXT NOT NULL,
        category TEXT NOT NULL,
        image TEXT NOT NULL DEFAULT '',
        in_stock BOOLEAN NOT NULL DEFAULT TRUE
    )",
    "CREATE TABLE IF NOT EXISTS orders (
        id SERIAL PRIMARY KEY,
        requester_name TEXT NOT NULL,
        requester_role TEXT NOT NULL,
        menu TEXT NOT NULL,
        quantity INTEGER NOT NULL,
        image TEXT NOT NULL DEFAULT '',
        status TEXT NOT NULL DEFAULT 'pending',
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
    "CREATE TABLE IF NOT EXISTS users (
        id SERIAL PRIMARY KEY,
        role TEXT NOT NULL,
        login_id TEXT NOT NULL,
        password TEXT NOT NULL,
        display_name TEXT NOT NULL,
        category TEXT NOT NULL DEFAULT '',
        grade INTEGER,
        class_no INTEGER,
        department TEXT,
        UNIQUE (role, login_id)
    )",
    "CREATE TABLE IF NOT EXISTS sessions (
        id SERIAL PRIMARY KEY,
        token TEXT NOT NULL UNIQUE,
        user_id INTEGER NOT NULL REFERENCES users (id) ON DELETE CASCADE,
        expires_at TIMESTAMPTZ NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS cheers (
        id SERIAL PRIMARY KEY,
        message TEXT NOT NULL,
        target TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
];

impl PgDatabase {
    pub async fn new(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await
            .map_err(|e| DatabaseError::Internal(Box::new(e)))?;

        for statement in SCHEMA {
            query(statement)
                .execute(&pool)
                .await
                .map_err(|e| e.any())?;
        }

        Ok(Self { pool })
    }
}

#[derive(FromRow)]
struct ItemRow {
    id: PrimaryKey,
    name: String,
    category: String,
    image: String,
    in_stock: bool,
}

#[derive(FromRow)]
struct OrderRow {
    id: PrimaryKey,
    requester_name: String,
    requester_role: String,
    menu: String,
    quantity: i32,
    image: String,
    status: String,
    created_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct UserRow {
    id: PrimaryKey,
    role: String,
    login_id: String,
    password: String,
    display_name: String,
    category: String,
    grade: Option<i32>,
    class_no: Option<i32>,
    department: Option<String>,
}

#[derive(FromRow)]
struct SessionRow {
    id: PrimaryKey,
    token: String,
    expires_at: DateTime<Utc>,
    user_id: PrimaryKey,
    role: String,
    login_id: String,
    password: String,
    display_name: String,
    category: String,
    grade: Option<i32>,
    class_no: Option<i32>,
    department: Option<String>,
}

#[derive(FromRow)]
struct PopularRow {
    menu: String,
    total_quantity: i64,
}

#[derive(FromRow)]
struct CheerRow {
    id: PrimaryKey,
    message: String,
    target: String,
    created_at: DateTime<Utc>,
}

/// A stored enum column no longer parses, which means the row was edited
/// outside the application
fn corrupt(resource: &'static str, value: &str) -> DatabaseError {
    DatabaseError::Internal(format!("{resource} holds unknown value {value}").into())
}

impl TryFrom<ItemRow> for ItemData {
    type Error = DatabaseError;

    fn try_from(row: ItemRow) -> Result<Self> {
        let category =
            ItemCategory::parse(&row.category).ok_or_else(|| corrupt("item category", &row.category))?;

        Ok(Self {
            id: row.id,
            name: row.name,
            category,
            image: row.image,
            in_stock: row.in_stock,
        })
    }
}

impl TryFrom<OrderRow> for OrderData {
    type Error = DatabaseError;

    fn try_from(row: OrderRow) -> Result<Self> {
        let status =
            OrderStatus::parse(&row.status).ok_or_else(|| corrupt("order status", &row.status))?;

        Ok(Self {
            id: row.id,
            requester_name: row.requester_name,
            requester_role: row.requester_role,
            menu: row.menu,
            quantity: row.quantity,
            image: row.image,
            status,
            created_at: row.created_at,
        })
    }
}

fn user_kind(
    role: &str,
    category: String,
    grade: Option<i32>,
    class_no: Option<i32>,
    department: Option<String>,
) -> Result<UserKind> {
    match UserRole::parse(role) {
        Some(UserRole::Student) => Ok(UserKind::Student {
            category,
            grade: grade.unwrap_or_default(),
            class_no: class_no.unwrap_or_default(),
        }),
        Some(UserRole::Teacher) => Ok(UserKind::Teacher {
            category,
            department: department.unwrap_or_default(),
        }),
        None => Err(corrupt("user role", role)),
    }
}

impl TryFrom<UserRow> for UserData {
    type Error = DatabaseError;

    fn try_from(row: UserRow) -> Result<Self> {
        let kind = user_kind(
            &row.role,
            row.category,
            row.grade,
            row.class_no,
            row.department,
        )?;

        Ok(Self {
            id: row.id,
            login_id: row.login_id,
            password: row.password,
            display_name: row.display_name,
            kind,
        })
    }
}

impl TryFrom<SessionRow> for SessionData {
    type Error = DatabaseError;

    fn try_from(row: SessionRow) -> Result<Self> {
        let kind = user_kind(
            &row.role,
            row.category,
            row.grade,
            row.class_no,
            row.department,
        )?;

        Ok(Self {
            id: row.id,
            token: row.token,
            expires_at: row.expires_at,
            user: UserData {
                id: row.user_id,
                login_id: row.login_id,
                password: row.password,
                display_name: row.display_name,
                kind,
            },
        })
    }
}

impl TryFrom<CheerRow> for CheerData {
    type Error = DatabaseError;

    fn try_from(row: CheerRow) -> Result<Self> {
        let target =
            UserRole::parse(&row.target).ok_or_else(|| corrupt("cheer target", &row.target))?;

        Ok(Self {
            id: row.id,
            message: row.message,
            target,
            created_at: row.created_at,
        })
    }
}

/// Binds the role-specific columns of a [UserKind]
struct KindColumns {
    role: &'static str,
    category: String,
    grade: Option<i32>,
    class_no: Option<i32>,
    department: Option<String>,
}

impl From<UserKind> for KindColumns {
    fn from(kind: UserKind) -> Self {
        match kind {
            UserKind::Student {
                category,
                grade,
                class_no,
            } => Self {
                role: UserRole::Student.as_str(),
                category,
                grade: Some(grade),
                class_no: Some(class_no),
                department: None,
            },
            UserKind::Teacher {
                category,
                department,
            } => Self {
                role: UserRole::Teacher.as_str(),
                category,
                grade: None,
                class_no: None,
                department: Some(department),
            },
        }
    }
}

const SESSION_COLUMNS: &str = "
    sessions.id, sessions.token, sessions.expires_at,
    users.id AS user_id,
    users.role, users.login_id, users.password, users.display_name,
    users.category, users.grade, users.class_no, users.department";

#[async_trait]
impl Database for PgDatabase {
    async fn list_items(&self) -> Result<Vec<ItemData>> {
        query_as::<_, ItemRow>("SELECT * FROM items ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| e.any())?
            .into_iter()
            .map(TryInto::try_into)
            .collect()
    }

    async fn item_by_id(&self, item_id: PrimaryKey) -> Result<ItemData> {
        query_as::<_, ItemRow>("SELECT * FROM items WHERE id = $1")
            .bind(item_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("item", "id"))?
            .try_into()
    }

    async fn create_item(&self, new_item: NewItem) -> Result<ItemData> {
        new_item.ensure_required()?;

        query_as::<_, ItemRow>(
            "INSERT INTO items (name, category, image, in_stock)
             VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(&new_item.name)
        .bind(new_item.category.as_str())
        .bind(&new_item.image)
        .bind(new_item.in_stock)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())?
        .try_into()
    }

    async fn update_item(&self, updated_item: UpdatedItem) -> Result<ItemData> {
        let item = self.item_by_id(updated_item.id).await?;

        query(
            "UPDATE items SET
                name = $1,
                category = $2,
                image = $3,
                in_stock = $4
            WHERE id = $5",
        )
        .bind(updated_item.name.unwrap_or(item.name))
        .bind(updated_item.category.unwrap_or(item.category).as_str())
        .bind(updated_item.image.unwrap_or(item.image))
        .bind(updated_item.in_stock.unwrap_or(item.in_stock))
        .bind(updated_item.id)
        .execute(&self.pool)
        .await
        .map_err(|e| e.any())?;

        self.item_by_id(updated_item.id).await
    }

    async fn delete_item(&self, item_id: PrimaryKey) -> Result<()> {
        // Ensure item exists
        let _ = self.item_by_id(item_id).await?;

        query("DELETE FROM items WHERE id = $1")
            .bind(item_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn list_orders(&self, requester_name: Option<&str>) -> Result<Vec<OrderData>> {
        let rows = match requester_name {
            Some(name) => {
                query_as::<_, OrderRow>(
                    "SELECT * FROM orders WHERE requester_name = $1
                     ORDER BY created_at DESC, id DESC",
                )
                .bind(name)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                query_as::<_, OrderRow>("SELECT * FROM orders ORDER BY created_at DESC, id DESC")
                    .fetch_all(&self.pool)
                    .await
            }
        };

        rows.map_err(|e| e.any())?
            .into_iter()
            .map(TryInto::try_into)
            .collect()
    }

    async fn order_by_id(&self, order_id: PrimaryKey) -> Result<OrderData> {
        query_as::<_, OrderRow>("SELECT * FROM orders WHERE id = $1")
            .bind(order_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("order", "id"))?
            .try_into()
    }

    async fn create_order(&self, new_order: NewOrder) -> Result<OrderData> {
        new_order.ensure_required()?;

        query_as::<_, OrderRow>(
            "INSERT INTO orders (requester_name, requester_role, menu, quantity, image)
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(&new_order.requester_name)
        .bind(&new_order.requester_role)
        .bind(&new_order.menu)
        .bind(new_order.quantity)
        .bind(&new_order.image)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())?
        .try_into()
    }

    async fn finalize_order(
        &self,
        order_id: PrimaryKey,
        status: OrderStatus,
    ) -> Result<Option<OrderData>> {
        let row = query_as::<_, OrderRow>(
            "UPDATE orders SET status = $2
             WHERE id = $1 AND status = 'pending'
             RETURNING *",
        )
        .bind(order_id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| e.any())?;

        match row {
            Some(row) => row.try_into().map(Some),
            // Either decided already or missing entirely, let the lookup decide
            None => self.order_by_id(order_id).await.map(|_| None),
        }
    }

    async fn popular_menus(&self, limit: i64) -> Result<Vec<PopularMenu>> {
        let rows = query_as::<_, PopularRow>(
            "SELECT menu, SUM(quantity) AS total_quantity FROM orders
             GROUP BY menu
             ORDER BY total_quantity DESC, menu ASC
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?;

        Ok(rows
            .into_iter()
            .map(|r| PopularMenu {
                menu: r.menu,
                total_quantity: r.total_quantity,
            })
            .collect())
    }

    async fn list_users(&self, role: UserRole) -> Result<Vec<UserData>> {
        query_as::<_, UserRow>("SELECT * FROM users WHERE role = $1 ORDER BY login_id")
            .bind(role.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| e.any())?
            .into_iter()
            .map(TryInto::try_into)
            .collect()
    }

    async fn user_by_id(&self, user_id: PrimaryKey) -> Result<UserData> {
        query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("user", "id"))?
            .try_into()
    }

    async fn user_by_login(&self, role: UserRole, login_id: &str) -> Result<UserData> {
        query_as::<_, UserRow>("SELECT * FROM users WHERE role = $1 AND login_id = $2")
            .bind(role.as_str())
            .bind(login_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("user", "login id"))?
            .try_into()
    }

    async fn count_users(&self, role: UserRole) -> Result<i64> {
        let row: (i64,) = query_as("SELECT COUNT(*) FROM users WHERE role = $1")
            .bind(role.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.any())?;

        Ok(row.0)
    }

    async fn create_user(&self, new_user: NewUser) -> Result<UserData> {
        new_user.ensure_required()?;

        let role = new_user.kind.role();
        let columns = KindColumns::from(new_user.kind);

        self.user_by_login(role, &new_user.login_id)
            .await
            .conflict_or_ok("user", "login id", &new_user.login_id)?;

        query_as::<_, UserRow>(
            "INSERT INTO users
                (role, login_id, password, display_name, category, grade, class_no, department)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING *",
        )
        .bind(columns.role)
        .bind(&new_user.login_id)
        .bind(&new_user.password)
        .bind(&new_user.display_name)
        .bind(&columns.category)
        .bind(columns.grade)
        .bind(columns.class_no)
        .bind(&columns.department)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())?
        .try_into()
    }

    async fn update_user(&self, updated_user: UpdatedUser) -> Result<UserData> {
        let user = self.user_by_id(updated_user.id).await?;
        let columns = KindColumns::from(updated_user.kind.unwrap_or(user.kind));

        query(
            "UPDATE users SET
                display_name = $1,
                role = $2,
                category = $3,
                grade = $4,
                class_no = $5,
                department = $6
            WHERE id = $7",
        )
        .bind(updated_user.display_name.unwrap_or(user.display_name))
        .bind(columns.role)
        .bind(&columns.category)
        .bind(columns.grade)
        .bind(columns.class_no)
        .bind(&columns.department)
        .bind(updated_user.id)
        .execute(&self.pool)
        .await
        .map_err(|e| e.any())?;

        self.user_by_id(updated_user.id).await
    }

    async fn delete_user(&self, user_id: PrimaryKey) -> Result<()> {
        // Ensure user exists
        let _ = self.user_by_id(user_id).await?;

        query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn set_password(&self, user_id: PrimaryKey, password: String) -> Result<UserData> {
        let _ = self.user_by_id(user_id).await?;

        query("UPDATE users SET password = $1 WHERE id = $2")
            .bind(&password)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())?;

        self.user_by_id(user_id).await
    }

    async fn session_by_token(&self, token: &str) -> Result<SessionData> {
        query_as::<_, SessionRow>(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions
                INNER JOIN users ON sessions.user_id = users.id
             WHERE token = $1"
        ))
        .bind(token)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.not_found_or("session", "token"))?
        .try_into()
    }

    async fn create_session(&self, new_session: NewSession) -> Result<SessionData> {
        self.session_by_token(&new_session.token)
            .await
            .conflict_or_ok("session", "token", &new_session.token)?;

        let record: (String,) = query_as(
            "INSERT INTO sessions (token, user_id, expires_at)
             VALUES ($1, $2, $3) RETURNING token",
        )
        .bind(&new_session.token)
        .bind(new_session.user_id)
        .bind(new_session.expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())?;

        self.session_by_token(&record.0).await
    }

    async fn delete_session_by_token(&self, token: &str) -> Result<()> {
        // Ensure session exists
        let _ = self.session_by_token(token).await?;

        query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn clear_expired_sessions(&self) -> Result<()> {
        query("DELETE FROM sessions WHERE now() > expires_at")
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn create_cheer(&self, new_cheer: NewCheer) -> Result<CheerData> {
        new_cheer.ensure_required()?;

        query_as::<_, CheerRow>(
            "INSERT INTO cheers (message, target) VALUES ($1, $2) RETURNING *",
        )
        .bind(&new_cheer.message)
        .bind(new_cheer.target.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())?
        .try_into()
    }

    async fn cheers_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        target: Option<UserRole>,
    ) -> Result<Vec<CheerData>> {
        let rows = match target {
            Some(target) => {
                query_as::<_, CheerRow>(
                    "SELECT * FROM cheers
                     WHERE created_at BETWEEN $1 AND $2 AND target = $3
                     ORDER BY created_at DESC, id DESC",
                )
                .bind(start)
                .bind(end)
                .bind(target.as_str())
                .fetch_all(&self.pool)
                .await
            }
            None => {
                query_as::<_, CheerRow>(
                    "SELECT * FROM cheers
                     WHERE created_at BETWEEN $1 AND $2
                     ORDER BY created_at DESC, id DESC",
                )
                .bind(start)
                .bind(end)
                .fetch_all(&self.pool)
                .await
            }
        };

        rows.map_err(|e| e.any())?
            .into_iter()
            .map(TryInto::try_into)
            .collect()
    }
}

impl IntoDatabaseError for SqlxError {
    fn any(self) -> DatabaseError {
        DatabaseError::Internal(Box::new(self))
    }

    fn not_found_or(self, resource: &'static str, identifier: &'static str) -> DatabaseError {
        match self {
            SqlxError::RowNotFound => DatabaseError::NotFound {
                resource,
                identifier,
            },
            e => Self::any(e),
        }
    }
}
