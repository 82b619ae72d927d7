use anyhow::Result;
use sqlx::AnyPool;

pub async fn get_value(pool: &AnyPool, key: &str) -> Result<Option<String>> {
    let row = sqlx::query_scalar::<_, String>("SELECT value FROM kv_store WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn put_value(pool: &AnyPool, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        "INSERT INTO kv_store(key, value) VALUES(?, ?)\n         ON CONFLICT(key) DO UPDATE SET value=excluded.value, updated_at=CURRENT_TIMESTAMP",
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn delete_value(pool: &AnyPool, key: &str) -> Result<u64> {
    let res = sqlx::query("DELETE FROM kv_store WHERE key = ?")
        .bind(key)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}
