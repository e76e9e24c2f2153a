use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{FromRow, PgPool};

use crate::database::manager::DatabaseError;
use crate::database::partial_update::{sql_for_partial_update, FieldNameTable, UpdatePayload};
use crate::database::query_builder::{bind_param_query_as, update_statement, WhereClause};

// equity is NUMERIC; read it back as text so "0.1" stays "0.1"
const JOB_FIELDS: &str = "id, title, salary, equity::text AS equity, company_handle";
const JOB_SUMMARY_FIELDS: &str = "id, title, salary, equity::text AS equity";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: i32,
    pub title: String,
    pub salary: Option<i32>,
    pub equity: Option<String>,
    pub company_handle: String,
}

/// Job as listed under its company
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct JobSummary {
    pub id: i32,
    pub title: String,
    pub salary: Option<i32>,
    pub equity: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewJob {
    pub title: String,
    pub salary: Option<i32>,
    pub equity: Option<String>,
    pub company_handle: String,
}

/// Search filters accepted by `GET /jobs`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct JobFilter {
    pub title: Option<String>,
    pub min_salary: Option<i32>,
    pub has_equity: Option<bool>,
}

impl JobFilter {
    pub fn to_where(&self) -> WhereClause {
        let mut w = WhereClause::new();
        if let Some(title) = &self.title {
            w.push("title ILIKE {}", json!(format!("%{}%", title)));
        }
        if let Some(min) = self.min_salary {
            w.push("salary >= {}", json!(min));
        }
        // hasEquity=false means "don't filter", not "no equity"
        if self.has_equity == Some(true) {
            w.push_raw("equity > 0");
        }
        w
    }
}

impl Job {
    pub async fn create(pool: &PgPool, data: &NewJob) -> Result<Job, DatabaseError> {
        let sql = format!(
            "INSERT INTO jobs (title, salary, equity, company_handle)
             VALUES ($1, $2, $3::numeric, $4)
             RETURNING {}",
            JOB_FIELDS
        );
        sqlx::query_as::<_, Job>(&sql)
            .bind(&data.title)
            .bind(data.salary)
            .bind(&data.equity)
            .bind(&data.company_handle)
            .fetch_one(pool)
            .await
            .map_err(|e| {
                DatabaseError::from_reference(e, format!("No company: {}", data.company_handle))
            })
    }

    pub async fn find_all(pool: &PgPool, filter: &JobFilter) -> Result<Vec<Job>, DatabaseError> {
        let w = filter.to_where();
        let sql = format!("SELECT {} FROM jobs{} ORDER BY title, id", JOB_FIELDS, w.to_sql());
        let mut q = sqlx::query_as::<_, Job>(&sql);
        for p in w.params() {
            q = bind_param_query_as(q, p);
        }
        Ok(q.fetch_all(pool).await?)
    }

    pub async fn get(pool: &PgPool, id: i32) -> Result<Job, DatabaseError> {
        let sql = format!("SELECT {} FROM jobs WHERE id = $1", JOB_FIELDS);
        sqlx::query_as::<_, Job>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("No job: {}", id)))
    }

    /// Apply a partial update. Job fields map to columns one-to-one.
    pub async fn update(
        pool: &PgPool,
        id: i32,
        payload: &UpdatePayload,
    ) -> Result<Job, DatabaseError> {
        let fragment = sql_for_partial_update(payload, &FieldNameTable::new())?;
        let sql = update_statement("jobs", &fragment, "id", JOB_FIELDS);

        let mut q = sqlx::query_as::<_, Job>(&sql);
        for v in fragment.values.iter() {
            q = bind_param_query_as(q, v);
        }
        q.bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("No job: {}", id)))
    }

    pub async fn remove(pool: &PgPool, id: i32) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM jobs WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("No job: {}", id)));
        }
        Ok(())
    }
}

impl JobSummary {
    pub async fn for_company(
        pool: &PgPool,
        handle: &str,
    ) -> Result<Vec<JobSummary>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM jobs WHERE company_handle = $1 ORDER BY id",
            JOB_SUMMARY_FIELDS
        );
        Ok(sqlx::query_as::<_, JobSummary>(&sql)
            .bind(handle)
            .fetch_all(pool)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_equity_false_does_not_filter() {
        let filter = JobFilter {
            has_equity: Some(false),
            ..Default::default()
        };
        assert!(filter.to_where().is_empty());
    }

    #[test]
    fn filter_combines_title_salary_and_equity() {
        let filter = JobFilter {
            title: Some("eng".into()),
            min_salary: Some(60000),
            has_equity: Some(true),
        };
        let w = filter.to_where();
        assert_eq!(w.to_sql(), " WHERE title ILIKE $1 AND salary >= $2 AND equity > 0");
        assert_eq!(w.params(), &[json!("%eng%"), json!(60000)]);
    }

    #[test]
    fn serializes_company_handle_in_camel_case() {
        let job = Job {
            id: 1,
            title: "Job1".into(),
            salary: Some(50000),
            equity: Some("0.1".into()),
            company_handle: "c1".into(),
        };
        let v = serde_json::to_value(job).unwrap();
        assert_eq!(v["companyHandle"], json!("c1"));
        assert_eq!(v["equity"], json!("0.1"));
    }
}
