use chrono::Utc;
use planes_catalog::models::{Foto, Plan, PlanRow, json_column, new_plan_id, PLAN_ID_LEN};
use serde_json::{Value, json};

fn row() -> PlanRow {
    PlanRow {
        id: "p1".to_string(),
        nombre: Some("Plan Básico".to_string()),
        descripcion_corta: None,
        incluye: None,
        ataudes: None,
        precio: None,
        tags: None,
        activo: None,
        foto_principal: None,
        galeria: None,
        created_at: None,
        updated_at: None,
    }
}

// --- JSON Column Decoding ---

#[test]
fn test_json_column_accepts_parsed_json() {
    let tags: Vec<String> = json_column(Some(json!(["a", "b"])));
    assert_eq!(tags, vec!["a", "b"]);
}

#[test]
fn test_json_column_parses_raw_text() {
    let tags: Vec<String> = json_column(Some(Value::String(r#"["a","b"]"#.to_string())));
    assert_eq!(tags, vec!["a", "b"]);

    let foto: Foto = json_column(Some(Value::String(
        r#"{"src":"x.jpg","titulo":"t"}"#.to_string(),
    )));
    assert_eq!(foto.src, "x.jpg");
}

#[test]
fn test_json_column_defaults_on_null_or_garbage() {
    let from_none: Vec<String> = json_column(None);
    let from_null: Vec<String> = json_column(Some(Value::Null));
    let from_garbage: Vec<String> = json_column(Some(Value::String("{not json".to_string())));
    let wrong_shape: Vec<String> = json_column(Some(json!({ "a": 1 })));
    let foto: Foto = json_column(Some(json!("plain text")));

    assert!(from_none.is_empty());
    assert!(from_null.is_empty());
    assert!(from_garbage.is_empty());
    assert!(wrong_shape.is_empty());
    assert_eq!(foto, Foto::default());
}

// --- Row To Record ---

#[test]
fn test_sparse_row_maps_to_defaults() {
    let plan = Plan::from(row());

    assert_eq!(plan.id, "p1");
    assert_eq!(plan.nombre, "Plan Básico");
    assert_eq!(plan.descripcion_corta, "");
    assert!(plan.incluye.is_empty());
    assert!(plan.galeria.is_empty());
    assert!(plan.activo);
    assert_eq!(plan.foto_principal, Foto::default());
}

#[test]
fn test_row_with_mixed_column_encodings() {
    let now = Utc::now();
    let plan = Plan::from(PlanRow {
        incluye: Some(json!(["Traslado"])),
        ataudes: Some(Value::String(r#"["Cedro"]"#.to_string())),
        galeria: Some(Value::String(r#"[{"src":"g.jpg","titulo":"G"}]"#.to_string())),
        precio: Some(990.0),
        activo: Some(false),
        created_at: Some(now),
        updated_at: Some(now),
        ..row()
    });

    assert_eq!(plan.incluye, vec!["Traslado"]);
    assert_eq!(plan.ataudes, vec!["Cedro"]);
    assert_eq!(plan.galeria.len(), 1);
    assert_eq!(plan.galeria[0].titulo, "G");
    assert_eq!(plan.precio, Some(990.0));
    assert!(!plan.activo);
    assert_eq!(plan.created_at, Some(now));
}

// --- Wire Shape ---

#[test]
fn test_plan_serializes_with_camel_case_keys() {
    let plan = Plan::from(PlanRow {
        descripcion_corta: Some("d".to_string()),
        ..row()
    });
    let value = serde_json::to_value(&plan).unwrap();

    assert_eq!(value["descripcionCorta"], "d");
    assert_eq!(value["fotoPrincipal"], json!({ "src": "", "titulo": "" }));
    assert_eq!(value["precio"], Value::Null);
    assert!(value.get("descripcion_corta").is_none());
    // No timestamps, no keys.
    assert!(value.get("createdAt").is_none());
    assert!(value.get("updatedAt").is_none());
}

#[test]
fn test_legacy_record_without_optional_fields_loads() {
    let plan: Plan = serde_json::from_value(json!({ "id": "old", "nombre": "Antiguo" })).unwrap();

    assert!(plan.activo);
    assert!(plan.tags.is_empty());
    assert_eq!(plan.created_at, None);
}

#[test]
fn test_new_plan_ids_are_short_and_unique() {
    let a = new_plan_id();
    let b = new_plan_id();

    assert_eq!(a.len(), PLAN_ID_LEN);
    assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
    assert_ne!(a, b);
}

#[test]
fn test_whole_prices_serialize_as_integers() {
    let precio = |p: Option<f64>| {
        let plan = Plan::from(PlanRow { precio: p, ..row() });
        serde_json::to_value(&plan).unwrap()["precio"].clone()
    };

    assert_eq!(precio(Some(10.0)), json!(10));
    assert_eq!(precio(Some(1500.5)), json!(1500.5));
    assert_eq!(precio(None), Value::Null);

    let raw = serde_json::to_string(&Plan::from(PlanRow {
        precio: Some(2500.0),
        ..row()
    }))
    .unwrap();
    assert!(raw.contains(r#""precio":2500,"#));
}

// --- Stored Record Decoding ---

#[test]
fn test_stored_record_with_loose_fields_is_decoded() {
    let plan = Plan::from_stored(&json!({
        "id": "legacy1",
        "nombre": "Viejo",
        "precio": "1500",
        "activo": null,
        "incluye": ["Sala", 3],
        "tags": "suelto",
        "fotoPrincipal": { "src": "a.jpg", "titulo": null },
        "galeria": [{ "src": "g.jpg" }, "x"],
        "createdAt": "2024-05-01T10:00:00Z",
        "updatedAt": "not a date"
    }))
    .unwrap();

    assert_eq!(plan.id, "legacy1");
    assert_eq!(plan.precio, Some(1500.0));
    assert!(plan.activo);
    assert_eq!(plan.incluye, vec!["Sala", "3"]);
    assert!(plan.tags.is_empty());
    assert_eq!(plan.foto_principal.src, "a.jpg");
    assert_eq!(plan.foto_principal.titulo, "");
    assert_eq!(plan.galeria.len(), 1);
    assert!(plan.created_at.is_some());
    assert_eq!(plan.updated_at, None);
}

#[test]
fn test_stored_record_only_hides_on_literal_false() {
    let activo = |v: Value| Plan::from_stored(&json!({ "id": "x", "activo": v })).unwrap().activo;

    assert!(!activo(json!(false)));
    assert!(activo(json!(0)));
    assert!(activo(json!("no")));
}

#[test]
fn test_stored_record_without_string_id_is_rejected() {
    assert!(Plan::from_stored(&json!({ "nombre": "sin id" })).is_none());
    assert!(Plan::from_stored(&json!({ "id": 7 })).is_none());
    assert!(Plan::from_stored(&json!("plan")).is_none());
}
