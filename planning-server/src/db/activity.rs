//! Activity log (audit trail)

use shared::models::{ActivityCategory, ActivityLog, ActivityLogQuery, Paginated};
use sqlx::{PgPool, Postgres, QueryBuilder};

/// Who did something and from where
#[derive(Debug, Clone, Default)]
pub struct ActivityContext {
    pub user_id: Option<i64>,
    pub station_id: Option<i64>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Write an audit entry. Never fails the caller: errors are logged and dropped.
pub async fn log_activity(
    pool: &PgPool,
    ctx: &ActivityContext,
    category: ActivityCategory,
    action: &str,
    details: Option<&str>,
) {
    let result = sqlx::query(
        r#"
        INSERT INTO activity_logs (user_id, station_id, category, action, details, ip_address, user_agent, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(ctx.user_id)
    .bind(ctx.station_id)
    .bind(category)
    .bind(action)
    .bind(details)
    .bind(ctx.ip_address.as_deref())
    .bind(ctx.user_agent.as_deref())
    .bind(shared::util::now_millis())
    .execute(pool)
    .await;

    if let Err(e) = result {
        tracing::warn!(error = %e, action, "Failed to write activity log");
    }
}

fn push_filters<'a>(qb: &mut QueryBuilder<'a, Postgres>, query: &'a ActivityLogQuery) {
    qb.push(" WHERE TRUE");
    if let Some(station_id) = query.station_id {
        qb.push(" AND station_id = ").push_bind(station_id);
    }
    if let Some(user_id) = query.user_id {
        qb.push(" AND user_id = ").push_bind(user_id);
    }
    if let Some(category) = query.category {
        qb.push(" AND category = ").push_bind(category);
    }
    if let Some(start) = query.start {
        qb.push(" AND created_at >= ").push_bind(start);
    }
    if let Some(end) = query.end {
        qb.push(" AND created_at < ").push_bind(end);
    }
}

/// Filtered, newest first, with the total count for paging
pub async fn query(pool: &PgPool, query: &ActivityLogQuery) -> Result<Paginated<ActivityLog>, sqlx::Error> {
    let (limit, offset) = query.limit_offset();

    let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM activity_logs");
    push_filters(&mut count_qb, query);
    let total: i64 = count_qb.build_query_scalar().fetch_one(pool).await?;

    let mut qb = QueryBuilder::new(
        "SELECT id, user_id, station_id, category, action, details, ip_address, user_agent, created_at FROM activity_logs",
    );
    push_filters(&mut qb, query);
    qb.push(" ORDER BY created_at DESC, id DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);
    let items = qb.build_query_as().fetch_all(pool).await?;

    Ok(Paginated { items, total })
}
