use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::normalize::{MAX_SAFE_INTEGER, coerce_number, coerce_string, coerce_text};

/// Length of generated plan ids.
pub const PLAN_ID_LEN: usize = 10;

// --- Core Schemas ---

/// Foto
///
/// An image reference: the URL (or `/uploads/...` path) and a caption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct Foto {
    #[serde(default)]
    pub src: String,
    #[serde(default)]
    pub titulo: String,
}

/// PlanDraft
///
/// The mutable part of a plan, in canonical form. This is what normalization produces
/// and what the persistence adapters write; id and timestamps are owned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PlanDraft {
    pub nombre: String,
    pub descripcion_corta: String,
    pub incluye: Vec<String>,
    pub ataudes: Vec<String>,
    #[serde(serialize_with = "serialize_precio")]
    pub precio: Option<f64>,
    pub tags: Vec<String>,
    pub activo: bool,
    pub foto_principal: Foto,
    pub galeria: Vec<Foto>,
}

/// Plan
///
/// A catalog entry as returned by the API and as stored in the flat-file store.
///
/// Every field has a serde default so that hand-edited or legacy records still load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Plan {
    pub id: String,
    #[serde(default)]
    pub nombre: String,
    #[serde(default)]
    pub descripcion_corta: String,
    #[serde(default)]
    pub incluye: Vec<String>,
    #[serde(default)]
    pub ataudes: Vec<String>,
    #[serde(default, serialize_with = "serialize_precio")]
    pub precio: Option<f64>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_activo")]
    pub activo: bool,
    #[serde(default)]
    pub foto_principal: Foto,
    #[serde(default)]
    pub galeria: Vec<Foto>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_activo() -> bool {
    true
}

/// Whole prices are written as JSON integers (`1500`, not `1500.0`).
fn serialize_precio<S>(precio: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match precio {
        Some(p) if p.fract() == 0.0 && p.abs() < MAX_SAFE_INTEGER => {
            serializer.serialize_i64(*p as i64)
        }
        Some(p) => serializer.serialize_f64(*p),
        None => serializer.serialize_none(),
    }
}

impl Plan {
    /// Builds a stored record from a draft. Timestamps are left to the caller.
    pub fn from_draft(id: String, draft: PlanDraft) -> Self {
        Self {
            id,
            nombre: draft.nombre,
            descripcion_corta: draft.descripcion_corta,
            incluye: draft.incluye,
            ataudes: draft.ataudes,
            precio: draft.precio,
            tags: draft.tags,
            activo: draft.activo,
            foto_principal: draft.foto_principal,
            galeria: draft.galeria,
            created_at: None,
            updated_at: None,
        }
    }

    /// Overwrites every mutable field with the draft, keeping id and timestamps.
    pub fn apply(&mut self, draft: PlanDraft) {
        self.nombre = draft.nombre;
        self.descripcion_corta = draft.descripcion_corta;
        self.incluye = draft.incluye;
        self.ataudes = draft.ataudes;
        self.precio = draft.precio;
        self.tags = draft.tags;
        self.activo = draft.activo;
        self.foto_principal = draft.foto_principal;
        self.galeria = draft.galeria;
    }

    /// The mutable fields of this record, used as the base of an update overlay.
    pub fn draft(&self) -> PlanDraft {
        PlanDraft {
            nombre: self.nombre.clone(),
            descripcion_corta: self.descripcion_corta.clone(),
            incluye: self.incluye.clone(),
            ataudes: self.ataudes.clone(),
            precio: self.precio,
            tags: self.tags.clone(),
            activo: self.activo,
            foto_principal: self.foto_principal.clone(),
            galeria: self.galeria.clone(),
        }
    }
}

/// Generates a new opaque plan id: 10 lowercase hex characters from a random UUID.
pub fn new_plan_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(PLAN_ID_LEN);
    id
}

// --- Relational Row Mapping ---

/// PlanRow
///
/// Raw row of the `planes` table. JSON columns are selected through `to_jsonb(...)`, so
/// they arrive either as parsed JSON (JSONB columns) or as a JSON string holding the raw
/// text (TEXT columns). `From<PlanRow> for Plan` accepts both.
#[derive(Debug, Clone, FromRow)]
pub struct PlanRow {
    pub id: String,
    pub nombre: Option<String>,
    pub descripcion_corta: Option<String>,
    pub incluye: Option<Value>,
    pub ataudes: Option<Value>,
    pub precio: Option<f64>,
    pub tags: Option<Value>,
    pub activo: Option<bool>,
    pub foto_principal: Option<Value>,
    pub galeria: Option<Value>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<PlanRow> for Plan {
    fn from(row: PlanRow) -> Self {
        Plan {
            id: row.id,
            nombre: row.nombre.unwrap_or_default(),
            descripcion_corta: row.descripcion_corta.unwrap_or_default(),
            incluye: json_column(row.incluye),
            ataudes: json_column(row.ataudes),
            precio: row.precio,
            tags: json_column(row.tags),
            activo: row.activo.unwrap_or(true),
            foto_principal: json_column(row.foto_principal),
            galeria: json_column(row.galeria),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// json_column
///
/// Decodes a JSON-typed column. Raw text is parsed first; null, unparsable text, or a
/// value of the wrong shape all fall back to `T::default()`.
pub fn json_column<T>(value: Option<Value>) -> T
where
    T: serde::de::DeserializeOwned + Default,
{
    let parsed = match value {
        None | Some(Value::Null) => return T::default(),
        Some(Value::String(text)) => match serde_json::from_str::<Value>(&text) {
            Ok(v) => v,
            Err(_) => return T::default(),
        },
        Some(v) => v,
    };

    serde_json::from_value(parsed).unwrap_or_default()
}

// --- Flat-File Record Mapping ---

impl Plan {
    /// from_stored
    ///
    /// Lenient decoding of one stored record, for entries that do not match the
    /// canonical shape (hand edits, older writers). Only a string `id` is required;
    /// `precio` goes through numeric coercion, `activo` is true unless literally `false`,
    /// and fields of the wrong shape take their defaults.
    pub fn from_stored(entry: &Value) -> Option<Plan> {
        let record = entry.as_object()?;
        let id = record.get("id")?.as_str()?.to_string();

        let text = |key: &str| record.get(key).map(coerce_text).unwrap_or_default();
        let list = |key: &str| -> Vec<String> {
            record
                .get(key)
                .and_then(Value::as_array)
                .map(|items| items.iter().map(coerce_string).collect())
                .unwrap_or_default()
        };
        let timestamp = |key: &str| {
            record
                .get(key)
                .and_then(|v| serde_json::from_value::<DateTime<Utc>>(v.clone()).ok())
        };

        Some(Plan {
            id,
            nombre: text("nombre"),
            descripcion_corta: text("descripcionCorta"),
            incluye: list("incluye"),
            ataudes: list("ataudes"),
            precio: record.get("precio").and_then(coerce_number),
            tags: list("tags"),
            activo: record.get("activo") != Some(&Value::Bool(false)),
            foto_principal: record
                .get("fotoPrincipal")
                .and_then(Value::as_object)
                .map(stored_foto)
                .unwrap_or_default(),
            galeria: record
                .get("galeria")
                .and_then(Value::as_array)
                .map(|entries| {
                    entries
                        .iter()
                        .filter_map(Value::as_object)
                        .map(stored_foto)
                        .collect()
                })
                .unwrap_or_default(),
            created_at: timestamp("createdAt"),
            updated_at: timestamp("updatedAt"),
        })
    }
}

fn stored_foto(entry: &serde_json::Map<String, Value>) -> Foto {
    let field = |key: &str| entry.get(key).map(coerce_text).unwrap_or_default();
    Foto {
        src: field("src"),
        titulo: field("titulo"),
    }
}

// --- Request/Response Schemas ---

/// LoginRequest
///
/// Documented shape of the login body. The handler reads it leniently from raw JSON.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginRequest {
    pub user: String,
    pub pass: String,
}

/// LoginResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginResponse {
    pub ok: bool,
    pub token: String,
}

/// DeleteResponse
///
/// Returned by the admin delete endpoint, echoing the removed record.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct DeleteResponse {
    pub ok: bool,
    pub removed: Plan,
}

/// UploadResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UploadResponse {
    pub ok: bool,
    /// Public path of the stored file, e.g. `/uploads/<name>`.
    pub url: String,
    pub filename: String,
}

/// HealthResponse
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub ok: bool,
}
