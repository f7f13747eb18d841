//! Payload normalization.
//!
//! Admin create/update bodies are arbitrary JSON. Everything that turns them into a
//! canonical [`PlanDraft`] lives here, so both paths share one set of coercion rules:
//!
//! - strings: falsy values (`null`, `false`, `0`, `""`) become `""`, the rest is coerced
//!   and trimmed;
//! - string lists: only JSON arrays are accepted, every element is coerced (`null` reads
//!   as `"null"`), trimmed and empty ones dropped;
//! - `galeria`: only arrays, only object entries, entries without `src` dropped;
//! - `fotoPrincipal`: objects are read field by field, an array counts as an object
//!   without fields;
//! - `precio`: null or `""` become `None`, everything else goes through numeric coercion;
//! - `activo`: truthiness.
//!
//! On update a field that is absent from the body (or has the wrong shape for list and
//! object fields) keeps the value of the stored record.

use serde_json::{Map, Value};

use crate::{
    errors::AppError,
    models::{Foto, Plan, PlanDraft},
};

// 2^53, the largest float range where every whole number is exact.
pub(crate) const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Validation failure raised when `nombre` is empty after trimming.
pub const MISSING_NOMBRE: &str = "Field 'nombre' is required";

/// Normalizes the body of an admin create request.
pub fn normalize_new(body: &Value) -> Result<PlanDraft, AppError> {
    let fields = Fields::of(body);

    let draft = PlanDraft {
        nombre: fields.string("nombre").unwrap_or_default(),
        descripcion_corta: fields.string("descripcionCorta").unwrap_or_default(),
        incluye: fields.string_list("incluye").unwrap_or_default(),
        ataudes: fields.string_list("ataudes").unwrap_or_default(),
        precio: fields.precio().unwrap_or(None),
        tags: fields.string_list("tags").unwrap_or_default(),
        activo: fields.boolean("activo").unwrap_or(true),
        foto_principal: fields.foto_principal().unwrap_or_default(),
        galeria: fields.galeria().unwrap_or_default(),
    };

    validate(draft)
}

/// Normalizes the body of an admin update request as an overlay onto `current`.
pub fn normalize_update(body: &Value, current: &Plan) -> Result<PlanDraft, AppError> {
    let fields = Fields::of(body);
    let base = current.draft();

    let draft = PlanDraft {
        nombre: fields.string("nombre").unwrap_or(base.nombre),
        descripcion_corta: fields
            .string("descripcionCorta")
            .unwrap_or(base.descripcion_corta),
        incluye: fields.string_list("incluye").unwrap_or(base.incluye),
        ataudes: fields.string_list("ataudes").unwrap_or(base.ataudes),
        precio: fields.precio().unwrap_or(base.precio),
        tags: fields.string_list("tags").unwrap_or(base.tags),
        activo: fields.boolean("activo").unwrap_or(base.activo),
        foto_principal: fields.foto_principal().unwrap_or(base.foto_principal),
        galeria: fields.galeria().unwrap_or(base.galeria),
    };

    validate(draft)
}

fn validate(draft: PlanDraft) -> Result<PlanDraft, AppError> {
    if draft.nombre.is_empty() {
        return Err(AppError::Validation(MISSING_NOMBRE.to_string()));
    }
    Ok(draft)
}

/// Field accessor over a request body. Each getter returns `None` when the field should
/// fall back (absent, or wrong shape for list/object fields).
struct Fields<'a> {
    map: Option<&'a Map<String, Value>>,
}

impl<'a> Fields<'a> {
    fn of(body: &'a Value) -> Self {
        Self {
            map: body.as_object(),
        }
    }

    fn get(&self, key: &str) -> Option<&'a Value> {
        self.map.and_then(|m| m.get(key))
    }

    fn string(&self, key: &str) -> Option<String> {
        self.get(key).map(|v| coerce_text(v).trim().to_string())
    }

    fn string_list(&self, key: &str) -> Option<Vec<String>> {
        let items = self.get(key)?.as_array()?;
        Some(
            items
                .iter()
                .map(|item| coerce_string(item).trim().to_string())
                .filter(|item| !item.is_empty())
                .collect(),
        )
    }

    fn boolean(&self, key: &str) -> Option<bool> {
        self.get(key).map(coerce_bool)
    }

    fn precio(&self) -> Option<Option<f64>> {
        self.get("precio").map(coerce_number)
    }

    fn foto_principal(&self) -> Option<Foto> {
        match self.get("fotoPrincipal")? {
            Value::Object(entry) => Some(foto(entry)),
            Value::Array(_) => Some(Foto::default()),
            _ => None,
        }
    }

    fn galeria(&self) -> Option<Vec<Foto>> {
        let entries = self.get("galeria")?.as_array()?;
        Some(
            entries
                .iter()
                .filter_map(Value::as_object)
                .map(foto)
                .filter(|f| !f.src.is_empty())
                .collect(),
        )
    }
}

fn foto(entry: &Map<String, Value>) -> Foto {
    let field = |key: &str| entry.get(key).map(coerce_text).unwrap_or_default();
    Foto {
        src: field("src"),
        titulo: field("titulo"),
    }
}

/// Coerces any JSON value to text: `null` is `"null"`, booleans and numbers print as
/// themselves (whole floats without a fraction), arrays and objects as compact JSON.
pub fn coerce_string(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < MAX_SAFE_INTEGER => {
                (f as i64).to_string()
            }
            _ => n.to_string(),
        },
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Text of a scalar field: falsy values become empty, anything else goes through
/// [`coerce_string`].
pub fn coerce_text(value: &Value) -> String {
    if coerce_bool(value) {
        coerce_string(value)
    } else {
        String::new()
    }
}

/// Truthiness of a JSON value.
pub fn coerce_bool(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Numeric coercion for `precio`. Null, blank and non-numeric input yield `None`.
pub fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                None
            } else {
                s.parse::<f64>().ok().filter(|f| f.is_finite())
            }
        }
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
