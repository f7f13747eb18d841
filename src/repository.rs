use crate::models::{Plan, PlanDraft, PlanRow};
use async_trait::async_trait;
use sqlx::{PgPool, types::Json};
use std::sync::Arc;
use thiserror::Error;

/// StoreError
///
/// Failure of the persistence layer. Surfaces to clients as a generic 500; the detail
/// is only logged.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Repository Trait
///
/// The persistence contract shared by the flat-file and the relational adapters.
/// Handlers only see `Arc<dyn Repository>`, so the adapter is chosen once at startup.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Admin listing: every plan, newest first.
    async fn list_plans(&self) -> Result<Vec<Plan>, StoreError>;

    /// Public listing: plans with `activo = true`, newest first.
    async fn list_active_plans(&self) -> Result<Vec<Plan>, StoreError>;

    /// Looks a plan up by id. With `active_only` an inactive plan reads as missing.
    async fn get_plan(&self, id: &str, active_only: bool) -> Result<Option<Plan>, StoreError>;

    /// Stores a new plan under `id`; the store assigns the timestamps.
    async fn insert_plan(&self, id: &str, draft: &PlanDraft) -> Result<Plan, StoreError>;

    /// Replaces every mutable field and refreshes `updated_at`. `None` if the id is unknown.
    async fn update_plan(&self, id: &str, draft: &PlanDraft)
    -> Result<Option<Plan>, StoreError>;

    /// Removes a plan, returning what was removed. `None` if the id is unknown.
    async fn delete_plan(&self, id: &str) -> Result<Option<Plan>, StoreError>;

    /// Shutdown hook, called once after the server stopped serving requests.
    async fn close(&self) {}
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

// JSON columns go through `to_jsonb` so TEXT-typed columns decode as JSON strings.
const PLAN_COLUMNS: &str = r#"
    id, nombre, descripcion_corta,
    to_jsonb(incluye) AS incluye,
    to_jsonb(ataudes) AS ataudes,
    precio,
    to_jsonb(tags) AS tags,
    activo,
    to_jsonb(foto_principal) AS foto_principal,
    to_jsonb(galeria) AS galeria,
    created_at, updated_at
"#;

/// PostgresRepository
///
/// The relational adapter: one row per plan in the `planes` table.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the bundled migrations in `migrations/`.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    async fn fetch_all(&self, sql: &str) -> Result<Vec<Plan>, StoreError> {
        let rows = sqlx::query_as::<_, PlanRow>(sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Plan::from).collect())
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn list_plans(&self) -> Result<Vec<Plan>, StoreError> {
        self.fetch_all(&format!(
            "SELECT {PLAN_COLUMNS} FROM planes ORDER BY created_at DESC"
        ))
        .await
    }

    async fn list_active_plans(&self) -> Result<Vec<Plan>, StoreError> {
        self.fetch_all(&format!(
            "SELECT {PLAN_COLUMNS} FROM planes WHERE activo = true ORDER BY created_at DESC"
        ))
        .await
    }

    async fn get_plan(&self, id: &str, active_only: bool) -> Result<Option<Plan>, StoreError> {
        let sql = if active_only {
            format!("SELECT {PLAN_COLUMNS} FROM planes WHERE id = $1 AND activo = true")
        } else {
            format!("SELECT {PLAN_COLUMNS} FROM planes WHERE id = $1")
        };

        let row = sqlx::query_as::<_, PlanRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Plan::from))
    }

    /// insert_plan
    ///
    /// `created_at`/`updated_at` come from the column defaults.
    async fn insert_plan(&self, id: &str, draft: &PlanDraft) -> Result<Plan, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO planes
                (id, nombre, descripcion_corta, incluye, ataudes, precio, tags, activo,
                 foto_principal, galeria)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {PLAN_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, PlanRow>(&sql)
            .bind(id)
            .bind(&draft.nombre)
            .bind(&draft.descripcion_corta)
            .bind(Json(&draft.incluye))
            .bind(Json(&draft.ataudes))
            .bind(draft.precio)
            .bind(Json(&draft.tags))
            .bind(draft.activo)
            .bind(Json(&draft.foto_principal))
            .bind(Json(&draft.galeria))
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into())
    }

    async fn update_plan(
        &self,
        id: &str,
        draft: &PlanDraft,
    ) -> Result<Option<Plan>, StoreError> {
        let sql = format!(
            r#"
            UPDATE planes
            SET nombre = $2,
                descripcion_corta = $3,
                incluye = $4,
                ataudes = $5,
                precio = $6,
                tags = $7,
                activo = $8,
                foto_principal = $9,
                galeria = $10,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {PLAN_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, PlanRow>(&sql)
            .bind(id)
            .bind(&draft.nombre)
            .bind(&draft.descripcion_corta)
            .bind(Json(&draft.incluye))
            .bind(Json(&draft.ataudes))
            .bind(draft.precio)
            .bind(Json(&draft.tags))
            .bind(draft.activo)
            .bind(Json(&draft.foto_principal))
            .bind(Json(&draft.galeria))
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Plan::from))
    }

    async fn delete_plan(&self, id: &str) -> Result<Option<Plan>, StoreError> {
        let sql = format!("DELETE FROM planes WHERE id = $1 RETURNING {PLAN_COLUMNS}");
        let row = sqlx::query_as::<_, PlanRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Plan::from))
    }

    /// close
    ///
    /// Drains the pool: waits for checked-out connections to return, then closes them.
    async fn close(&self) {
        tracing::info!("closing Postgres pool");
        self.pool.close().await;
    }
}
