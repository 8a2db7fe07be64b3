use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Set};
use serde_json::Value;
use uuid::Uuid;

use crate::{entity::audit_logs::ActiveModel as AuditActive, error::AppResult};

/// Append one audit row for an admin mutating action.
///
/// Takes any connection so moderation handlers can pass their open
/// transaction: the audit write commits or rolls back with the mutation it
/// records, so a failed mutation never leaves an orphan entry.
pub async fn record_audit<C: ConnectionTrait>(
    conn: &C,
    admin_id: Uuid,
    action: &str,
    entity_type: &str,
    entity_id: Uuid,
    details: Option<Value>,
) -> AppResult<()> {
    AuditActive {
        id: Set(Uuid::new_v4()),
        admin_id: Set(admin_id),
        action: Set(action.to_string()),
        entity_type: Set(entity_type.to_string()),
        entity_id: Set(entity_id),
        details: Set(details),
        created_at: NotSet,
    }
    .insert(conn)
    .await?;

    Ok(())
}
