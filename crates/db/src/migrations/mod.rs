//! Database migrations.
//!
//! Schema migrations for the database. The unique indexes created here
//! back the engine's per-ordered-pair uniqueness guarantees.

#![allow(missing_docs)]

use sea_orm_migration::prelude::*;

mod m20250101_000001_create_student_table;
mod m20250101_000002_create_following_table;
mod m20250101_000003_create_blocking_table;
mod m20250101_000004_create_friend_request_table;
mod m20250101_000005_create_story_tables;
mod m20250101_000006_create_post_tables;
mod m20250101_000007_create_interaction_tables;
mod m20250101_000008_create_notification_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_student_table::Migration),
            Box::new(m20250101_000002_create_following_table::Migration),
            Box::new(m20250101_000003_create_blocking_table::Migration),
            Box::new(m20250101_000004_create_friend_request_table::Migration),
            Box::new(m20250101_000005_create_story_tables::Migration),
            Box::new(m20250101_000006_create_post_tables::Migration),
            Box::new(m20250101_000007_create_interaction_tables::Migration),
            Box::new(m20250101_000008_create_notification_table::Migration),
        ]
    }
}
