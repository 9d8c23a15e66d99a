//! Create friend request table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(FriendRequest::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(FriendRequest::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(FriendRequest::SenderId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FriendRequest::ReceiverId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FriendRequest::Status)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FriendRequest::SentAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_friend_request_sender")
                            .from(FriendRequest::Table, FriendRequest::SenderId)
                            .to(Student::Table, Student::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_friend_request_receiver")
                            .from(FriendRequest::Table, FriendRequest::ReceiverId)
                            .to(Student::Table, Student::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: (sender_id, receiver_id) for pair lookups. Not unique:
        // rejected rows are retained for audit and must not collide with a
        // later re-send.
        manager
            .create_index(
                Index::create()
                    .name("idx_friend_request_sender_receiver")
                    .table(FriendRequest::Table)
                    .col(FriendRequest::SenderId)
                    .col(FriendRequest::ReceiverId)
                    .to_owned(),
            )
            .await?;

        // Index: receiver_id (for incoming request listings)
        manager
            .create_index(
                Index::create()
                    .name("idx_friend_request_receiver_id")
                    .table(FriendRequest::Table)
                    .col(FriendRequest::ReceiverId)
                    .to_owned(),
            )
            .await?;

        // Partial unique index: at most one PENDING request per ordered
        // pair, even under concurrent sends. sea-query has no builder for
        // partial indexes, so this one is raw SQL.
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE UNIQUE INDEX idx_friend_request_pending_pair \
                 ON friend_request (sender_id, receiver_id) \
                 WHERE status = 'pending'",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(FriendRequest::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum FriendRequest {
    Table,
    Id,
    SenderId,
    ReceiverId,
    Status,
    SentAt,
}

#[derive(Iden)]
enum Student {
    Table,
    Id,
}
