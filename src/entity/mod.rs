//! SeaORM entity definitions for PostgreSQL database.

pub mod print_job;
pub mod printer;
