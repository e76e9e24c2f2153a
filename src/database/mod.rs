pub mod manager;
pub mod models;
pub mod partial_update;
pub mod query_builder;

pub use manager::{DatabaseError, DatabaseManager};
pub use partial_update::{
    sql_for_partial_update, FieldNameTable, SqlError, StatementFragment, UpdatePayload,
};
