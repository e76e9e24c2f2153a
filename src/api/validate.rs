//! Request body validation.
//!
//! Bodies are first deserialized into a typed request struct (unknown
//! fields and wrong types are refused by serde), then checked against the
//! field constraints. Update bodies keep their original key order and are
//! handed to the partial-update builder as-is once they pass.

use std::str::FromStr;

use bigdecimal::{BigDecimal, ToPrimitive};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Number, Value};

use crate::auth::password::MAX_PASSWORD_LENGTH;
use crate::database::models::{CompanyFilter, NewCompany, NewJob};
use crate::database::partial_update::UpdatePayload;
use crate::error::{ApiError, FieldErrors};

/// Accumulates per-field problems so the client sees all of them at once
#[derive(Debug, Default)]
pub struct FieldChecks {
    errors: FieldErrors,
}

impl FieldChecks {
    pub fn new() -> Self {
        Self::default()
    }

    fn fail(&mut self, field: &str, message: impl Into<String>) {
        self.errors.entry(field.to_string()).or_insert_with(|| message.into());
    }

    pub fn length(&mut self, field: &str, value: &str, min: usize, max: usize) -> &mut Self {
        let len = value.chars().count();
        if len < min || len > max {
            self.fail(field, format!("must be between {} and {} characters", min, max));
        }
        self
    }

    pub fn at_least(&mut self, field: &str, value: i64, min: i64) -> &mut Self {
        if value < min {
            self.fail(field, format!("must be >= {}", min));
        }
        self
    }

    pub fn lowercase(&mut self, field: &str, value: &str) -> &mut Self {
        if value.chars().any(|c| c.is_uppercase()) {
            self.fail(field, "must be lowercase");
        }
        self
    }

    pub fn email(&mut self, field: &str, value: &str) -> &mut Self {
        let valid = match value.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
            }
            None => false,
        };
        if !valid {
            self.fail(field, "must be an email address");
        }
        self
    }

    pub fn uri(&mut self, field: &str, value: &str) -> &mut Self {
        if url::Url::parse(value).is_err() {
            self.fail(field, "must be a URI");
        }
        self
    }

    /// Equity must be a decimal string between 0 and 1
    pub fn equity(&mut self, field: &str, value: &str) -> Option<BigDecimal> {
        match BigDecimal::from_str(value.trim()) {
            Ok(d) if d >= BigDecimal::from(0) && d <= BigDecimal::from(1) => Some(d),
            _ => {
                self.fail(field, "must be a decimal between 0 and 1");
                None
            }
        }
    }

    /// Fields that may be omitted from an update but not set to null
    pub fn not_null(&mut self, payload: &UpdatePayload, fields: &[&str]) -> &mut Self {
        for field in fields {
            if matches!(payload.get(field), Some(Value::Null)) {
                self.fail(field, "cannot be null");
            }
        }
        self
    }

    pub fn finish(self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::validation_error("Invalid request body", Some(self.errors)))
        }
    }
}

/// Deserialize a body into `T`, turning serde errors into a 400
pub fn parse_body<T: DeserializeOwned>(body: &Value) -> Result<T, ApiError> {
    serde_json::from_value(body.clone())
        .map_err(|e| ApiError::validation_error(format!("Invalid request body: {}", e), None))
}

fn update_payload(body: Value) -> Result<UpdatePayload, ApiError> {
    UpdatePayload::try_from(body).map_err(|e| ApiError::invalid_json(e.to_string()))
}

// ---- companies ----

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct CompanyUpdate {
    name: Option<String>,
    description: Option<String>,
    num_employees: Option<i32>,
    logo_url: Option<String>,
}

pub fn new_company(body: &Value) -> Result<NewCompany, ApiError> {
    let company: NewCompany = parse_body(body)?;

    let mut checks = FieldChecks::new();
    checks
        .length("handle", &company.handle, 1, 25)
        .lowercase("handle", &company.handle)
        .length("name", &company.name, 1, 255);
    if let Some(n) = company.num_employees {
        checks.at_least("numEmployees", n.into(), 0);
    }
    if let Some(logo) = &company.logo_url {
        checks.uri("logoUrl", logo);
    }
    checks.finish()?;

    Ok(company)
}

pub fn company_update(body: Value) -> Result<UpdatePayload, ApiError> {
    let update: CompanyUpdate = parse_body(&body)?;
    let payload = update_payload(body)?;

    let mut checks = FieldChecks::new();
    checks.not_null(&payload, &["name", "description"]);
    if let Some(name) = &update.name {
        checks.length("name", name, 1, 255);
    }
    if let Some(description) = &update.description {
        checks.length("description", description, 0, 10_000);
    }
    if let Some(n) = update.num_employees {
        checks.at_least("numEmployees", n.into(), 0);
    }
    if let Some(logo) = &update.logo_url {
        checks.uri("logoUrl", logo);
    }
    checks.finish()?;

    Ok(payload)
}

pub fn company_filter(filter: &CompanyFilter) -> Result<(), ApiError> {
    if let (Some(min), Some(max)) = (filter.min_employees, filter.max_employees) {
        if min > max {
            return Err(ApiError::bad_request(
                "minEmployees cannot be greater than maxEmployees",
            ));
        }
    }
    Ok(())
}

// ---- jobs ----

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct JobUpdate {
    title: Option<String>,
    salary: Option<i32>,
    equity: Option<String>,
}

pub fn new_job(body: &Value) -> Result<NewJob, ApiError> {
    let job: NewJob = parse_body(body)?;

    let mut checks = FieldChecks::new();
    checks
        .length("title", &job.title, 1, 255)
        .length("companyHandle", &job.company_handle, 1, 25);
    if let Some(salary) = job.salary {
        checks.at_least("salary", salary.into(), 0);
    }
    if let Some(equity) = &job.equity {
        checks.equity("equity", equity);
    }
    checks.finish()?;

    Ok(job)
}

/// Validate a job update. `equity` arrives as a decimal string and leaves
/// as a JSON number so it binds as a numeric parameter.
pub fn job_update(body: Value) -> Result<UpdatePayload, ApiError> {
    let update: JobUpdate = parse_body(&body)?;
    let mut payload = update_payload(body)?;

    let mut checks = FieldChecks::new();
    checks.not_null(&payload, &["title"]);
    if let Some(title) = &update.title {
        checks.length("title", title, 1, 255);
    }
    if let Some(salary) = update.salary {
        checks.at_least("salary", salary.into(), 0);
    }
    let equity = update.equity.as_deref().and_then(|e| checks.equity("equity", e));
    checks.finish()?;

    if let Some(equity) = equity {
        let number = equity
            .to_f64()
            .and_then(Number::from_f64)
            .ok_or_else(|| ApiError::bad_request("equity is out of range"))?;
        if let Some(slot) = payload.get_mut("equity") {
            *slot = Value::Number(number);
        }
    }

    Ok(payload)
}

// ---- users ----

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Self-service registration; cannot grant admin
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Registration {
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

/// Admin-created user; may grant admin
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewUserRequest {
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub is_admin: bool,
}

impl From<Registration> for NewUserRequest {
    fn from(r: Registration) -> Self {
        Self {
            username: r.username,
            password: r.password,
            first_name: r.first_name,
            last_name: r.last_name,
            email: r.email,
            is_admin: false,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct UserUpdate {
    first_name: Option<String>,
    last_name: Option<String>,
    password: Option<String>,
    email: Option<String>,
}

fn check_new_user(user: &NewUserRequest) -> Result<(), ApiError> {
    let mut checks = FieldChecks::new();
    checks
        .length("username", &user.username, 1, 25)
        .length("password", &user.password, 5, 20)
        .length("firstName", &user.first_name, 1, 30)
        .length("lastName", &user.last_name, 1, 30)
        .length("email", &user.email, 6, 60)
        .email("email", &user.email);
    checks.finish()
}

pub fn login(body: &Value) -> Result<LoginRequest, ApiError> {
    let login: LoginRequest = parse_body(body)?;
    let mut checks = FieldChecks::new();
    checks
        .length("username", &login.username, 1, 25)
        .length("password", &login.password, 1, MAX_PASSWORD_LENGTH);
    checks.finish()?;
    Ok(login)
}

pub fn registration(body: &Value) -> Result<NewUserRequest, ApiError> {
    let user: NewUserRequest = parse_body::<Registration>(body)?.into();
    check_new_user(&user)?;
    Ok(user)
}

pub fn new_user(body: &Value) -> Result<NewUserRequest, ApiError> {
    let user: NewUserRequest = parse_body(body)?;
    check_new_user(&user)?;
    Ok(user)
}

/// Validate a user update. A `password` entry is still plain text here.
pub fn user_update(body: Value) -> Result<UpdatePayload, ApiError> {
    let update: UserUpdate = parse_body(&body)?;
    let payload = update_payload(body)?;

    let mut checks = FieldChecks::new();
    checks.not_null(&payload, &["firstName", "lastName", "password", "email"]);
    if let Some(first) = &update.first_name {
        checks.length("firstName", first, 1, 30);
    }
    if let Some(last) = &update.last_name {
        checks.length("lastName", last, 1, 30);
    }
    if let Some(password) = &update.password {
        checks.length("password", password, 5, 20);
    }
    if let Some(email) = &update.email {
        checks.length("email", email, 6, 60).email("email", email);
    }
    checks.finish()?;

    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::partial_update::{sql_for_partial_update, FieldNameTable};
    use serde_json::json;

    fn field_errors(err: ApiError) -> FieldErrors {
        match err {
            ApiError::ValidationError { field_errors: Some(f), .. } => f,
            other => panic!("expected field errors, got {:?}", other),
        }
    }

    #[test]
    fn new_company_accepts_valid_body() {
        let company = new_company(&json!({
            "handle": "c3",
            "name": "C3",
            "description": "Desc3",
            "numEmployees": 3,
            "logoUrl": "http://c3.img"
        }))
        .unwrap();
        assert_eq!(company.handle, "c3");
        assert_eq!(company.num_employees, Some(3));
    }

    #[test]
    fn new_company_rejects_unknown_and_mistyped_fields() {
        let base = json!({"handle": "c3", "name": "C3", "description": "d"});
        let with = |key: &str, value: Value| {
            let mut body = base.clone();
            body[key] = value;
            body
        };
        assert!(new_company(&with("ceo", json!("x"))).is_err());
        assert!(new_company(&with("numEmployees", json!("3"))).is_err());
        assert!(new_company(&json!({"name": "C3", "description": "d"})).is_err());
    }

    #[test]
    fn new_company_collects_constraint_failures() {
        let err = new_company(&json!({
            "handle": "BadHandle",
            "name": "C3",
            "description": "d",
            "numEmployees": -1,
            "logoUrl": "not a uri"
        }))
        .unwrap_err();
        let fields = field_errors(err);
        assert!(fields.contains_key("handle"));
        assert!(fields.contains_key("numEmployees"));
        assert!(fields.contains_key("logoUrl"));
    }

    #[test]
    fn company_update_keeps_body_order() {
        let body: Value =
            serde_json::from_str(r#"{"logoUrl": "http://new.img", "name": "New"}"#).unwrap();
        let payload = company_update(body).unwrap();
        let names = FieldNameTable::from_pairs(crate::database::models::company::COMPANY_COLUMNS);
        let fragment = sql_for_partial_update(&payload, &names).unwrap();
        assert_eq!(fragment.set_clause, r#""logo_url"=$1, "name"=$2"#);
    }

    #[test]
    fn company_update_rejects_handle_change_and_null_name() {
        assert!(company_update(json!({"handle": "c9"})).is_err());
        let fields = field_errors(company_update(json!({"name": null})).unwrap_err());
        assert!(fields.contains_key("name"));
    }

    #[test]
    fn company_update_allows_clearing_optional_columns() {
        let payload = company_update(json!({"logoUrl": null})).unwrap();
        assert_eq!(payload.get("logoUrl"), Some(&Value::Null));
    }

    #[test]
    fn empty_update_body_passes_validation() {
        // emptiness is reported by the statement builder, not here
        assert!(company_update(json!({})).unwrap().is_empty());
    }

    #[test]
    fn non_object_update_body_is_refused() {
        assert!(company_update(json!([1])).is_err());
    }

    #[test]
    fn company_filter_rejects_inverted_range() {
        let filter = CompanyFilter {
            min_employees: Some(10),
            max_employees: Some(1),
            ..Default::default()
        };
        assert!(company_filter(&filter).is_err());
        assert!(company_filter(&CompanyFilter::default()).is_ok());
    }

    #[test]
    fn job_update_turns_equity_into_number() {
        let payload = job_update(json!({"salary": 1000, "equity": "0.5"})).unwrap();
        assert_eq!(payload.get("salary"), Some(&json!(1000)));
        assert_eq!(payload.get("equity"), Some(&json!(0.5)));
    }

    #[test]
    fn job_update_refuses_out_of_range_equity_and_company_change() {
        assert!(job_update(json!({"equity": "1.5"})).is_err());
        assert!(job_update(json!({"equity": "lots"})).is_err());
        assert!(job_update(json!({"companyHandle": "c2"})).is_err());
    }

    #[test]
    fn new_job_checks_salary_and_equity() {
        let job = new_job(&json!({
            "title": "New Job",
            "salary": 60000,
            "equity": "0.05",
            "companyHandle": "c1"
        }))
        .unwrap();
        assert_eq!(job.equity.as_deref(), Some("0.05"));

        let fields = field_errors(
            new_job(&json!({"title": "J", "salary": -5, "companyHandle": "c1"})).unwrap_err(),
        );
        assert!(fields.contains_key("salary"));
        let mistyped = json!({"title": "J", "salary": "not-a-number", "companyHandle": "c1"});
        assert!(new_job(&mistyped).is_err());
    }

    #[test]
    fn registration_cannot_grant_admin() {
        let body = json!({
            "username": "new",
            "password": "password",
            "firstName": "F",
            "lastName": "L",
            "email": "new@email.com",
            "isAdmin": true
        });
        assert!(registration(&body).is_err());
        let user = new_user(&body).unwrap();
        assert!(user.is_admin);
    }

    #[test]
    fn registration_checks_email_and_password() {
        let fields = field_errors(
            registration(&json!({
                "username": "new",
                "password": "pw",
                "firstName": "F",
                "lastName": "L",
                "email": "not-an-email"
            }))
            .unwrap_err(),
        );
        assert!(fields.contains_key("password"));
        assert!(fields.contains_key("email"));
    }

    #[test]
    fn user_update_rejects_username_and_admin_changes() {
        assert!(user_update(json!({"username": "other"})).is_err());
        assert!(user_update(json!({"isAdmin": true})).is_err());
        assert!(user_update(json!({"firstName": "New"})).is_ok());
    }

    #[test]
    fn login_requires_both_fields() {
        assert!(login(&json!({"username": "u1"})).is_err());
        assert!(login(&json!({"username": "u1", "password": "password1"})).is_ok());
    }
}
