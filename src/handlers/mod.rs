// handlers/mod.rs - route handlers
//
// Public:    /, /health, /auth/token, /auth/register, GET /companies*, GET /jobs*
// Guarded:   everything else, see `app` in lib.rs for the chain on each route

pub mod auth;
pub mod companies;
pub mod jobs;
pub mod system;
pub mod users;
