//! Flows against a real Postgres. `#[sqlx::test]` creates a fresh database
//! per test from `DATABASE_URL`.

mod completion_flows;
mod fixtures;
