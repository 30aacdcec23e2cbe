use anyhow::Result;
use sqlx::PgPool;

/// Create the account table if it does not exist yet
pub async fn init_schema(pool: &PgPool) -> Result<()> {
    tracing::info!("Initializing PostgreSQL schema...");

    sqlx::query(CREATE_ACCOUNTS_TABLE)
        .execute(pool)
        .await
        .map_err(|e| anyhow::anyhow!("{}: {}", "Failed to create accounts_tb", e))?;

    match check_balance_constraint(pool).await {
        Ok(true) => tracing::info!("accounts_tb balance constraint present"),
        Ok(false) => {
            tracing::error!(
                "accounts_tb exists without the non-negative balance CHECK. \
                 Add it with: ALTER TABLE accounts_tb ADD CONSTRAINT \
                 accounts_tb_balance_non_negative CHECK (balance >= 0);"
            );
            return Err(anyhow::anyhow!(
                "accounts_tb is missing the balance >= 0 constraint"
            ));
        }
        Err(e) => tracing::warn!("Could not verify balance constraint: {}", e),
    }

    tracing::info!("PostgreSQL schema initialized successfully");
    Ok(())
}

/// An older `accounts_tb` created by hand may lack the CHECK, and
/// `CREATE TABLE IF NOT EXISTS` will not add it.
async fn check_balance_constraint(pool: &PgPool) -> Result<bool> {
    let found = sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM pg_constraint
            WHERE conrelid = 'accounts_tb'::regclass
              AND contype = 'c'
              AND pg_get_constraintdef(oid) ILIKE '%balance >=%'
        )
        "#,
    )
    .fetch_one(pool)
    .await?;
    Ok(found)
}

// =============================================================================
// accounts_tb
// =============================================================================
//
// balance is NUMERIC(15,2): exact fixed point, never float. The CHECK is the
// last line of defense for the non-negative invariant; the transfer service
// rejects overdrafts before it is ever reached.
//
// version is bumped on every UPDATE by the application (see store::postgres).
// =============================================================================
const CREATE_ACCOUNTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS accounts_tb (
    id          BIGSERIAL PRIMARY KEY,
    name        VARCHAR(100) NOT NULL CHECK (char_length(name) >= 3),
    description VARCHAR(255),
    balance     NUMERIC(15, 2) NOT NULL DEFAULT 0
                CONSTRAINT accounts_tb_balance_non_negative CHECK (balance >= 0),
    active      BOOLEAN NOT NULL DEFAULT TRUE,
    version     BIGINT NOT NULL DEFAULT 0,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;
