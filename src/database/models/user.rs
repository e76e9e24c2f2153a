use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use crate::database::manager::DatabaseError;
use crate::database::partial_update::{sql_for_partial_update, FieldNameTable, UpdatePayload};
use crate::database::query_builder::{bind_param_query_as, update_statement};

/// API field -> column for user updates
pub const USER_COLUMNS: &[(&str, &str)] = &[
    ("firstName", "first_name"),
    ("lastName", "last_name"),
    ("isAdmin", "is_admin"),
];

const USER_FIELDS: &str = "username, first_name, last_name, email, is_admin";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub is_admin: bool,
}

/// A user with the ids of the jobs they applied to
#[derive(Debug, Clone, Serialize)]
pub struct UserDetail {
    #[serde(flatten)]
    pub user: User,
    pub jobs: Vec<i32>,
}

/// Row used during login; never serialized
#[derive(FromRow)]
struct UserCredentials {
    #[sqlx(flatten)]
    user: User,
    password: String,
}

/// Validated registration data. `password_hash` is already bcrypt-hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub is_admin: bool,
}

impl User {
    /// Look up a user with the stored password hash, for credential checks
    pub async fn find_with_password(
        pool: &PgPool,
        username: &str,
    ) -> Result<Option<(User, String)>, DatabaseError> {
        let sql = format!("SELECT {}, password FROM users WHERE username = $1", USER_FIELDS);
        let row = sqlx::query_as::<_, UserCredentials>(&sql)
            .bind(username)
            .fetch_optional(pool)
            .await?;
        Ok(row.map(|r| (r.user, r.password)))
    }

    pub async fn register(pool: &PgPool, data: &NewUser) -> Result<User, DatabaseError> {
        let sql = format!(
            "INSERT INTO users (username, password, first_name, last_name, email, is_admin)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {}",
            USER_FIELDS
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(&data.username)
            .bind(&data.password_hash)
            .bind(&data.first_name)
            .bind(&data.last_name)
            .bind(&data.email)
            .bind(data.is_admin)
            .fetch_one(pool)
            .await
            .map_err(|e| {
                DatabaseError::from_insert(e, format!("Duplicate username: {}", data.username))
            })
    }

    pub async fn find_all(pool: &PgPool) -> Result<Vec<User>, DatabaseError> {
        let sql = format!("SELECT {} FROM users ORDER BY username", USER_FIELDS);
        Ok(sqlx::query_as::<_, User>(&sql).fetch_all(pool).await?)
    }

    pub async fn get(pool: &PgPool, username: &str) -> Result<UserDetail, DatabaseError> {
        let sql = format!("SELECT {} FROM users WHERE username = $1", USER_FIELDS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("No user: {}", username)))?;

        let jobs: Vec<i32> = sqlx::query_scalar(
            "SELECT job_id FROM applications WHERE username = $1 ORDER BY job_id",
        )
        .bind(username)
        .fetch_all(pool)
        .await?;

        Ok(UserDetail { user, jobs })
    }

    /// Apply a partial update. A `password` entry must already hold a hash.
    pub async fn update(
        pool: &PgPool,
        username: &str,
        payload: &UpdatePayload,
    ) -> Result<User, DatabaseError> {
        let fragment = sql_for_partial_update(payload, &FieldNameTable::from_pairs(USER_COLUMNS))?;
        let sql = update_statement("users", &fragment, "username", USER_FIELDS);

        let mut q = sqlx::query_as::<_, User>(&sql);
        for v in fragment.values.iter() {
            q = bind_param_query_as(q, v);
        }
        q.bind(username)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("No user: {}", username)))
    }

    pub async fn remove(pool: &PgPool, username: &str) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM users WHERE username = $1")
            .bind(username)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("No user: {}", username)));
        }
        Ok(())
    }

    /// Record an application from `username` to job `job_id`
    pub async fn apply_to_job(
        pool: &PgPool,
        username: &str,
        job_id: i32,
    ) -> Result<(), DatabaseError> {
        let job_exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM jobs WHERE id = $1)")
                .bind(job_id)
                .fetch_one(pool)
                .await?;
        if !job_exists {
            return Err(DatabaseError::NotFound(format!("No job: {}", job_id)));
        }

        let user_exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE username = $1)")
                .bind(username)
                .fetch_one(pool)
                .await?;
        if !user_exists {
            return Err(DatabaseError::NotFound(format!("No user: {}", username)));
        }

        sqlx::query(
            "INSERT INTO applications (username, job_id) VALUES ($1, $2)
             ON CONFLICT (username, job_id) DO NOTHING",
        )
        .bind(username)
        .bind(job_id)
        .execute(pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn detail_flattens_user_and_lists_jobs() {
        let detail = UserDetail {
            user: User {
                username: "u1".into(),
                first_name: "U1F".into(),
                last_name: "U1L".into(),
                email: "user1@user.com".into(),
                is_admin: false,
            },
            jobs: vec![3, 7],
        };
        let v = serde_json::to_value(detail).unwrap();
        assert_eq!(v["firstName"], json!("U1F"));
        assert_eq!(v["isAdmin"], json!(false));
        assert_eq!(v["jobs"], json!([3, 7]));
        assert!(v.get("password").is_none());
    }

    #[test]
    fn user_columns_cover_camel_case_fields() {
        let names = FieldNameTable::from_pairs(USER_COLUMNS);
        assert_eq!(names.column_for("firstName"), "first_name");
        assert_eq!(names.column_for("email"), "email");
    }
}
