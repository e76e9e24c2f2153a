use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{FromRow, PgPool};

use super::job::JobSummary;
use crate::database::manager::DatabaseError;
use crate::database::partial_update::{sql_for_partial_update, FieldNameTable, UpdatePayload};
use crate::database::query_builder::{bind_param_query_as, update_statement, WhereClause};

/// API field -> column for company updates
pub const COMPANY_COLUMNS: &[(&str, &str)] = &[
    ("numEmployees", "num_employees"),
    ("logoUrl", "logo_url"),
];

const COMPANY_FIELDS: &str = "handle, name, description, num_employees, logo_url";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub handle: String,
    pub name: String,
    pub description: String,
    pub num_employees: Option<i32>,
    pub logo_url: Option<String>,
}

/// A company together with the jobs it offers
#[derive(Debug, Clone, Serialize)]
pub struct CompanyDetail {
    #[serde(flatten)]
    pub company: Company,
    pub jobs: Vec<JobSummary>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewCompany {
    pub handle: String,
    pub name: String,
    pub description: String,
    pub num_employees: Option<i32>,
    pub logo_url: Option<String>,
}

/// Search filters accepted by `GET /companies`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CompanyFilter {
    pub name_like: Option<String>,
    pub min_employees: Option<i32>,
    pub max_employees: Option<i32>,
}

impl CompanyFilter {
    pub fn to_where(&self) -> WhereClause {
        let mut w = WhereClause::new();
        if let Some(name) = &self.name_like {
            w.push("name ILIKE {}", json!(format!("%{}%", name)));
        }
        if let Some(min) = self.min_employees {
            w.push("num_employees >= {}", json!(min));
        }
        if let Some(max) = self.max_employees {
            w.push("num_employees <= {}", json!(max));
        }
        w
    }
}

impl Company {
    pub async fn create(pool: &PgPool, data: &NewCompany) -> Result<Company, DatabaseError> {
        let sql = format!(
            "INSERT INTO companies (handle, name, description, num_employees, logo_url)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {}",
            COMPANY_FIELDS
        );
        sqlx::query_as::<_, Company>(&sql)
            .bind(&data.handle)
            .bind(&data.name)
            .bind(&data.description)
            .bind(data.num_employees)
            .bind(&data.logo_url)
            .fetch_one(pool)
            .await
            .map_err(|e| {
                DatabaseError::from_insert(e, format!("Duplicate company: {}", data.handle))
            })
    }

    pub async fn find_all(
        pool: &PgPool,
        filter: &CompanyFilter,
    ) -> Result<Vec<Company>, DatabaseError> {
        let w = filter.to_where();
        let sql = format!("SELECT {} FROM companies{} ORDER BY name", COMPANY_FIELDS, w.to_sql());
        let mut q = sqlx::query_as::<_, Company>(&sql);
        for p in w.params() {
            q = bind_param_query_as(q, p);
        }
        Ok(q.fetch_all(pool).await?)
    }

    pub async fn get(pool: &PgPool, handle: &str) -> Result<CompanyDetail, DatabaseError> {
        let sql = format!("SELECT {} FROM companies WHERE handle = $1", COMPANY_FIELDS);
        let company = sqlx::query_as::<_, Company>(&sql)
            .bind(handle)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("No company: {}", handle)))?;

        let jobs = JobSummary::for_company(pool, handle).await?;
        Ok(CompanyDetail { company, jobs })
    }

    /// Apply a partial update. Keys are API field names (see `COMPANY_COLUMNS`).
    pub async fn update(
        pool: &PgPool,
        handle: &str,
        payload: &UpdatePayload,
    ) -> Result<Company, DatabaseError> {
        let names = FieldNameTable::from_pairs(COMPANY_COLUMNS);
        let fragment = sql_for_partial_update(payload, &names)?;
        let sql = update_statement("companies", &fragment, "handle", COMPANY_FIELDS);

        let mut q = sqlx::query_as::<_, Company>(&sql);
        for v in fragment.values.iter() {
            q = bind_param_query_as(q, v);
        }
        // name is UNIQUE, so a rename can collide like an insert does
        let name = payload.get("name").and_then(|v| v.as_str()).unwrap_or(handle);
        q.bind(handle)
            .fetch_optional(pool)
            .await
            .map_err(|e| {
                DatabaseError::from_insert(e, format!("Duplicate company name: {}", name))
            })?
            .ok_or_else(|| DatabaseError::NotFound(format!("No company: {}", handle)))
    }

    pub async fn remove(pool: &PgPool, handle: &str) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM companies WHERE handle = $1")
            .bind(handle)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("No company: {}", handle)));
        }
        Ok(())
    }
}
