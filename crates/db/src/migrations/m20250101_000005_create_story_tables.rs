//! Create story, featured story and story viewer tables migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(FeaturedStory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(FeaturedStory::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(FeaturedStory::AuthorId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FeaturedStory::Title)
                            .string_len(256)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FeaturedStory::CoverMediaUrl)
                            .string_len(1024)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FeaturedStory::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_featured_story_author")
                            .from(FeaturedStory::Table, FeaturedStory::AuthorId)
                            .to(Student::Table, Student::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Story::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Story::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Story::AuthorId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(Story::MediaUrl)
                            .string_len(1024)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Story::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Story::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Story::IsFeatured)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Story::FeaturedStoryId).string_len(32))
                    .col(ColumnDef::new(Story::ArchivedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Story::Score)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_story_author")
                            .from(Story::Table, Story::AuthorId)
                            .to(Student::Table, Student::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_story_featured_story")
                            .from(Story::Table, Story::FeaturedStoryId)
                            .to(FeaturedStory::Table, FeaturedStory::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: author_id (for per-student listings)
        manager
            .create_index(
                Index::create()
                    .name("idx_story_author_id")
                    .table(Story::Table)
                    .col(Story::AuthorId)
                    .to_owned(),
            )
            .await?;

        // Index: expires_at (for the archive sweep)
        manager
            .create_index(
                Index::create()
                    .name("idx_story_expires_at")
                    .table(Story::Table)
                    .col(Story::ExpiresAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(StoryViewer::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(StoryViewer::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(StoryViewer::StoryId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StoryViewer::ViewerId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StoryViewer::ViewedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_story_viewer_story")
                            .from(StoryViewer::Table, StoryViewer::StoryId)
                            .to(Story::Table, Story::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_story_viewer_viewer")
                            .from(StoryViewer::Table, StoryViewer::ViewerId)
                            .to(Student::Table, Student::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (story_id, viewer_id) - one view record per viewer
        manager
            .create_index(
                Index::create()
                    .name("idx_story_viewer_story_viewer")
                    .table(StoryViewer::Table)
                    .col(StoryViewer::StoryId)
                    .col(StoryViewer::ViewerId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(StoryViewer::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Story::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(FeaturedStory::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Story {
    Table,
    Id,
    AuthorId,
    MediaUrl,
    CreatedAt,
    ExpiresAt,
    IsFeatured,
    FeaturedStoryId,
    ArchivedAt,
    Score,
}

#[derive(Iden)]
enum FeaturedStory {
    Table,
    Id,
    AuthorId,
    Title,
    CoverMediaUrl,
    CreatedAt,
}

#[derive(Iden)]
enum StoryViewer {
    Table,
    Id,
    StoryId,
    ViewerId,
    ViewedAt,
}

#[derive(Iden)]
enum Student {
    Table,
    Id,
}
