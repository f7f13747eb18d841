use planes_catalog::{
    errors::AppError,
    models::{Foto, Plan, PlanDraft},
    normalize::{MISSING_NOMBRE, coerce_bool, coerce_number, coerce_string, coerce_text, normalize_new, normalize_update},
};
use serde_json::json;

// --- Test Data Helpers ---

fn stored_plan() -> Plan {
    Plan::from_draft(
        "abc123def4".to_string(),
        PlanDraft {
            nombre: "Plan Familiar".to_string(),
            descripcion_corta: "Servicio completo".to_string(),
            incluye: vec!["Sala de velación".to_string(), "Traslado".to_string()],
            ataudes: vec!["Roble".to_string()],
            precio: Some(1500.0),
            tags: vec!["familiar".to_string(), "premium".to_string()],
            activo: true,
            foto_principal: Foto {
                src: "/uploads/main.jpg".to_string(),
                titulo: "Portada".to_string(),
            },
            galeria: vec![Foto {
                src: "/uploads/g1.jpg".to_string(),
                titulo: "Sala".to_string(),
            }],
        },
    )
}

fn assert_validation_error(result: Result<PlanDraft, AppError>) {
    match result {
        Err(AppError::Validation(msg)) => assert_eq!(msg, MISSING_NOMBRE),
        other => panic!("expected a validation error, got {:?}", other),
    }
}

// --- Create ---

#[test]
fn test_minimal_body_gets_defaults() {
    let draft = normalize_new(&json!({ "nombre": " A " })).unwrap();

    assert_eq!(draft.nombre, "A");
    assert_eq!(draft.descripcion_corta, "");
    assert!(draft.incluye.is_empty());
    assert!(draft.ataudes.is_empty());
    assert!(draft.tags.is_empty());
    assert!(draft.galeria.is_empty());
    assert_eq!(draft.precio, None);
    assert!(draft.activo);
    assert_eq!(draft.foto_principal, Foto::default());
}

#[test]
fn test_blank_nombre_is_rejected_regardless_of_other_fields() {
    let rich = json!({
        "descripcionCorta": "desc",
        "incluye": ["x"],
        "precio": 100,
        "activo": true,
        "fotoPrincipal": { "src": "a.jpg", "titulo": "t" }
    });

    assert_validation_error(normalize_new(&rich));

    for nombre in [json!(""), json!("   "), json!(null), json!(false), json!(0)] {
        let mut body = rich.clone();
        body["nombre"] = nombre;
        assert_validation_error(normalize_new(&body));
    }
}

#[test]
fn test_non_object_body_is_treated_as_empty() {
    assert_validation_error(normalize_new(&json!(["nombre", "A"])));
    assert_validation_error(normalize_new(&json!("A")));
}

#[test]
fn test_string_lists_are_trimmed_and_filtered() {
    let draft = normalize_new(&json!({
        "nombre": "A",
        "incluye": ["  Cafetería ", "", "   ", "Flores"],
        "ataudes": [12, true, null, " Pino "],
        "tags": "not-a-list"
    }))
    .unwrap();

    assert_eq!(draft.incluye, vec!["Cafetería", "Flores"]);
    assert_eq!(draft.ataudes, vec!["12", "true", "null", "Pino"]);
    assert!(draft.tags.is_empty());
}

#[test]
fn test_galeria_drops_entries_without_src() {
    let draft = normalize_new(&json!({
        "nombre": "A",
        "galeria": [
            { "src": "x", "titulo": "t" },
            { "titulo": "no-src" }
        ]
    }))
    .unwrap();

    assert_eq!(
        draft.galeria,
        vec![Foto {
            src: "x".to_string(),
            titulo: "t".to_string()
        }]
    );
}

#[test]
fn test_galeria_ignores_non_object_entries() {
    let draft = normalize_new(&json!({
        "nombre": "A",
        "galeria": ["x.jpg", null, 3, { "src": "y.jpg" }, { "src": "" }]
    }))
    .unwrap();

    assert_eq!(
        draft.galeria,
        vec![Foto {
            src: "y.jpg".to_string(),
            titulo: String::new()
        }]
    );
}

#[test]
fn test_foto_principal_requires_an_object() {
    for foto in [json!(null), json!("x.jpg"), json!(["x.jpg"])] {
        let draft = normalize_new(&json!({ "nombre": "A", "fotoPrincipal": foto })).unwrap();
        assert_eq!(draft.foto_principal, Foto::default());
    }

    let draft =
        normalize_new(&json!({ "nombre": "A", "fotoPrincipal": { "src": "m.jpg" } })).unwrap();
    assert_eq!(draft.foto_principal.src, "m.jpg");
    assert_eq!(draft.foto_principal.titulo, "");
}

#[test]
fn test_precio_coercion() {
    let precio = |v: serde_json::Value| {
        normalize_new(&json!({ "nombre": "A", "precio": v }))
            .unwrap()
            .precio
    };

    assert_eq!(precio(json!(null)), None);
    assert_eq!(precio(json!("")), None);
    assert_eq!(precio(json!(2500)), Some(2500.0));
    assert_eq!(precio(json!("1999.5")), Some(1999.5));
    assert_eq!(precio(json!(" 10 ")), Some(10.0));
    assert_eq!(precio(json!("abc")), None);
}

#[test]
fn test_activo_coercion_on_create() {
    let activo = |body: serde_json::Value| normalize_new(&body).unwrap().activo;

    assert!(activo(json!({ "nombre": "A" })));
    assert!(!activo(json!({ "nombre": "A", "activo": false })));
    assert!(!activo(json!({ "nombre": "A", "activo": null })));
    assert!(!activo(json!({ "nombre": "A", "activo": 0 })));
    assert!(activo(json!({ "nombre": "A", "activo": "yes" })));
}

// --- Update Overlay ---

#[test]
fn test_update_only_precio_preserves_everything_else() {
    let current = stored_plan();
    let draft = normalize_update(&json!({ "precio": 10 }), &current).unwrap();

    assert_eq!(draft.precio, Some(10.0));
    assert_eq!(draft.nombre, current.nombre);
    assert_eq!(draft.descripcion_corta, current.descripcion_corta);
    assert_eq!(draft.incluye, current.incluye);
    assert_eq!(draft.ataudes, current.ataudes);
    assert_eq!(draft.tags, current.tags);
    assert_eq!(draft.activo, current.activo);
    assert_eq!(draft.foto_principal, current.foto_principal);
    assert_eq!(draft.galeria, current.galeria);
}

#[test]
fn test_update_with_empty_body_is_identity() {
    let current = stored_plan();
    let draft = normalize_update(&json!({}), &current).unwrap();
    assert_eq!(draft, current.draft());
}

#[test]
fn test_update_wrong_shapes_keep_previous_values() {
    let current = stored_plan();
    let draft = normalize_update(
        &json!({
            "incluye": "a,b",
            "tags": { "0": "x" },
            "galeria": null,
            "fotoPrincipal": "new.jpg"
        }),
        &current,
    )
    .unwrap();

    assert_eq!(draft.incluye, current.incluye);
    assert_eq!(draft.tags, current.tags);
    assert_eq!(draft.galeria, current.galeria);
    assert_eq!(draft.foto_principal, current.foto_principal);
}

#[test]
fn test_update_with_array_foto_principal_resets_it() {
    let current = stored_plan();
    let draft = normalize_update(&json!({ "fotoPrincipal": ["x.jpg"] }), &current).unwrap();
    assert_eq!(draft.foto_principal, Foto::default());
}

#[test]
fn test_falsy_scalars_read_as_empty_text() {
    let draft = normalize_new(&json!({
        "nombre": 7,
        "descripcionCorta": 0,
        "fotoPrincipal": { "src": false, "titulo": 0 }
    }))
    .unwrap();

    assert_eq!(draft.nombre, "7");
    assert_eq!(draft.descripcion_corta, "");
    assert_eq!(draft.foto_principal, Foto::default());
}

#[test]
fn test_update_explicit_values_replace() {
    let current = stored_plan();
    let draft = normalize_update(
        &json!({
            "precio": null,
            "activo": false,
            "tags": [],
            "descripcionCorta": null
        }),
        &current,
    )
    .unwrap();

    assert_eq!(draft.precio, None);
    assert!(!draft.activo);
    assert!(draft.tags.is_empty());
    assert_eq!(draft.descripcion_corta, "");
    assert_eq!(draft.nombre, "Plan Familiar");
}

#[test]
fn test_update_clearing_nombre_is_rejected() {
    let current = stored_plan();
    assert_validation_error(normalize_update(&json!({ "nombre": "  " }), &current));
    assert_validation_error(normalize_update(&json!({ "nombre": null }), &current));
}

// --- Coercion Primitives ---

#[test]
fn test_coercion_primitives() {
    assert_eq!(coerce_string(&json!(null)), "null");
    assert_eq!(coerce_string(&json!(false)), "false");
    assert_eq!(coerce_string(&json!(42)), "42");
    assert_eq!(coerce_string(&json!(0)), "0");
    assert_eq!(coerce_string(&json!(2.0)), "2");
    assert_eq!(coerce_string(&json!(2.5)), "2.5");
    assert_eq!(coerce_string(&json!(["a", 1])), r#"["a",1]"#);

    assert_eq!(coerce_text(&json!(null)), "");
    assert_eq!(coerce_text(&json!(false)), "");
    assert_eq!(coerce_text(&json!(0)), "");
    assert_eq!(coerce_text(&json!("")), "");
    assert_eq!(coerce_text(&json!(true)), "true");
    assert_eq!(coerce_text(&json!(12)), "12");

    assert!(!coerce_bool(&json!("")));
    assert!(coerce_bool(&json!({})));
    assert!(coerce_bool(&json!(-1)));

    assert_eq!(coerce_number(&json!(true)), Some(1.0));
    assert_eq!(coerce_number(&json!([1])), None);
}
