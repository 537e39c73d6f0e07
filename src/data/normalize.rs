//! Record normalization: one raw upstream line -> one `DpeResult`.
//!
//! ADEME datasets name the same concept differently depending on their
//! generation (`etiquette_dpe` vs `classe_consommation_energie`, ...). Each
//! logical field has an ordered alias list; the first "truthy" value wins
//! (null, empty strings, `false` and `0` are skipped, so a later alias can
//! still supply the value). Every field has its own default, so the output
//! shape never depends on which schema supplied the line.

use rand::Rng;
use rand::distributions::Alphanumeric;
use serde_json::{Map, Value};

use crate::domain::{ADDRESS_PLACEHOLDER, DpeResult, NOT_AVAILABLE};

const ID: &[&str] = &["n_dpe", "identifiant_dpe", "numero_dpe", "_id"];
const DATE: &[&str] = &["date_etablissement_dpe"];
const ETIQUETTE_DPE: &[&str] = &["etiquette_dpe", "classe_consommation_energie", "classe_bilan_dpe"];
const ETIQUETTE_GES: &[&str] = &["etiquette_ges", "classe_estimation_ges"];
const CONSO: &[&str] = &[
    "conso_5_usages_par_m2_ep",
    "conso_kwhe_m2_an",
    "consommation_energie",
    "consommation_energie_primaire_indicedpe",
];
const GES: &[&str] = &[
    "emission_ges_5_usages_par_m2",
    "emission_ges_kg_co2_m2_an",
    "estimation_ges",
    "estimation_ges_indicedpe",
];
const UBAT: &[&str] = &["ubat_w_m2_k", "ubat"];
const COUT: &[&str] = &["cout_total_5_usages"];
const SURFACE: &[&str] = &["surface_habitable_logement", "surface_habitable", "surface_thermique"];
const ADRESSE: &[&str] = &["adresse_ban", "adresse_brut", "adresse_brute", "adresse_bien"];
const CODE_POSTAL: &[&str] = &["code_postal_ban", "code_postal_brut", "code_postal_bien", "code_postal"];
const COMMUNE: &[&str] = &["nom_commune_ban", "nom_commune_brut", "nom_commune"];
const ANNEE: &[&str] = &["annee_construction", "periode_construction"];
const TYPE_BATIMENT: &[&str] = &["type_batiment", "tr002_type_batiment_description"];
const TYPE_CHAUFFAGE: &[&str] = &[
    "type_energie_principale_chauffage",
    "type_installation_chauffage",
    "type_energie",
];
const LATITUDE: &[&str] = &["latitude", "lat"];
const LONGITUDE: &[&str] = &["longitude", "lon"];
/// data-fair's computed location, `"lat,lon"`.
const GEOPOINT: &str = "_geopoint";

const RANDOM_ID_LEN: usize = 11;

/// Normalize one raw line. `commune` is the town that was queried; it is
/// used when the line itself names no town.
///
/// Non-object input yields a record made entirely of defaults.
pub fn normalize_record(raw: &Value, commune: &str) -> DpeResult {
    let empty = Map::new();
    let item = raw.as_object().unwrap_or(&empty);

    let id = first_text(item, ID).unwrap_or_else(random_id);
    let (latitude, longitude) = coordinates(item);

    DpeResult {
        id: id.clone(),
        n_dpe: id,
        date_etablissement_dpe: first_text(item, DATE).unwrap_or_default(),
        etiquette_dpe: grade(item, ETIQUETTE_DPE),
        etiquette_ges: grade(item, ETIQUETTE_GES),
        conso_5_usages_m2_an: number(item, CONSO),
        emission_ges_5_usages_m2_an: number(item, GES),
        ubat: number(item, UBAT),
        cout_total_5_usages: number(item, COUT),
        surface_habitable: number(item, SURFACE),
        adresse_brut: first_text(item, ADRESSE).unwrap_or_else(|| ADDRESS_PLACEHOLDER.to_string()),
        commune_brut: first_text(item, COMMUNE).unwrap_or_else(|| commune.to_string()),
        code_postal: first_text(item, CODE_POSTAL).unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        latitude,
        longitude,
        annee_construction: first_text(item, ANNEE).unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        type_batiment: first_text(item, TYPE_BATIMENT).unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        type_chauffage: first_text(item, TYPE_CHAUFFAGE).unwrap_or_else(|| NOT_AVAILABLE.to_string()),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn first_truthy<'a>(item: &'a Map<String, Value>, aliases: &[&str]) -> Option<&'a Value> {
    aliases
        .iter()
        .filter_map(|key| item.get(*key))
        .find(|v| is_truthy(v))
}

fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(match n.as_i64() {
            Some(i) => i.to_string(),
            None => match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
                _ => n.to_string(),
            },
        }),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn first_text(item: &Map<String, Value>, aliases: &[&str]) -> Option<String> {
    first_truthy(item, aliases).and_then(value_to_text)
}

fn value_to_number(value: &Value) -> Option<f64> {
    let v = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    v.is_finite().then_some(v)
}

/// First truthy alias parsed as a number; 0 when absent or not numeric.
fn number(item: &Map<String, Value>, aliases: &[&str]) -> f64 {
    first_truthy(item, aliases)
        .and_then(value_to_number)
        .unwrap_or(0.0)
}

/// Single uppercase letter. Some datasets store longer labels ("d (191)"),
/// only the first character is kept.
fn grade(item: &Map<String, Value>, aliases: &[&str]) -> String {
    first_text(item, aliases)
        .and_then(|s| s.chars().next())
        .map(|c| c.to_uppercase().collect())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// Latitude/longitude, passed through without projection.
///
/// Unlike the other fields, a literal `0` is kept: only missing, null, blank
/// or non-numeric values count as "no coordinate".
fn coordinates(item: &Map<String, Value>) -> (Option<f64>, Option<f64>) {
    let lat = first_coordinate(item, LATITUDE);
    let lon = first_coordinate(item, LONGITUDE);
    if lat.is_some() || lon.is_some() {
        return (lat, lon);
    }

    item.get(GEOPOINT)
        .and_then(Value::as_str)
        .and_then(parse_geopoint)
        .map_or((None, None), |(lat, lon)| (Some(lat), Some(lon)))
}

fn first_coordinate(item: &Map<String, Value>, aliases: &[&str]) -> Option<f64> {
    aliases
        .iter()
        .filter_map(|key| item.get(*key))
        .find_map(value_to_number)
}

fn parse_geopoint(raw: &str) -> Option<(f64, f64)> {
    let (lat, lon) = raw.split_once(',')?;
    let lat = lat.trim().parse::<f64>().ok()?;
    let lon = lon.trim().parse::<f64>().ok()?;
    (lat.is_finite() && lon.is_finite()).then_some((lat, lon))
}

fn random_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(RANDOM_ID_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn ban_schema_line_is_mapped() {
        let raw = json!({
            "n_dpe": "2354E0123456X",
            "date_etablissement_dpe": "2024-03-01",
            "etiquette_dpe": "d",
            "etiquette_ges": "B",
            "conso_5_usages_par_m2_ep": 191.4,
            "emission_ges_5_usages_par_m2": "12.5",
            "ubat_w_m2_k": 0.62,
            "cout_total_5_usages": 1430,
            "surface_habitable_logement": 74,
            "adresse_ban": "12 Rue de la Paix 54400 Longwy",
            "nom_commune_ban": "Longwy",
            "code_postal_ban": "54400",
            "annee_construction": 1962,
            "type_batiment": "appartement",
            "type_energie_principale_chauffage": "Gaz naturel",
            "_geopoint": "49.5197,5.7661"
        });

        let r = normalize_record(&raw, "Longwy");
        assert_eq!(r.id, "2354E0123456X");
        assert_eq!(r.n_dpe, r.id);
        assert_eq!(r.etiquette_dpe, "D");
        assert_eq!(r.etiquette_ges, "B");
        assert_eq!(r.conso_5_usages_m2_an, 191.4);
        assert_eq!(r.emission_ges_5_usages_m2_an, 12.5);
        assert_eq!(r.ubat, 0.62);
        assert_eq!(r.cout_total_5_usages, 1430.0);
        assert_eq!(r.surface_habitable, 74.0);
        assert_eq!(r.code_postal, "54400");
        assert_eq!(r.annee_construction, "1962");
        assert_eq!(r.type_chauffage, "Gaz naturel");
        assert_eq!(r.coordinates(), Some((49.5197, 5.7661)));
    }

    #[test]
    fn legacy_schema_line_is_mapped() {
        let raw = json!({
            "numero_dpe": "1354V1000123A",
            "date_etablissement_dpe": "2019-06-12",
            "classe_consommation_energie": "E",
            "classe_estimation_ges": "f",
            "consommation_energie": 298,
            "estimation_ges": 61,
            "surface_thermique": 95.5,
            "adresse_brut": "3 rue Foch",
            "nom_commune": "Villerupt",
            "code_postal_brut": 54190,
            "latitude": "49.4678",
            "longitude": 5.9286
        });

        let r = normalize_record(&raw, "Villerupt");
        assert_eq!(r.id, "1354V1000123A");
        assert_eq!(r.etiquette_dpe, "E");
        assert_eq!(r.etiquette_ges, "F");
        assert_eq!(r.conso_5_usages_m2_an, 298.0);
        assert_eq!(r.emission_ges_5_usages_m2_an, 61.0);
        assert_eq!(r.surface_habitable, 95.5);
        assert_eq!(r.adresse_brut, "3 rue Foch");
        assert_eq!(r.code_postal, "54190");
        assert_eq!(r.coordinates(), Some((49.4678, 5.9286)));
    }

    #[test]
    fn empty_line_gets_every_default() {
        let r = normalize_record(&json!({}), "Thil");
        assert!(!r.id.is_empty());
        assert_eq!(r.id, r.n_dpe);
        assert_eq!(r.date_etablissement_dpe, "");
        assert_eq!(r.etiquette_dpe, NOT_AVAILABLE);
        assert_eq!(r.etiquette_ges, NOT_AVAILABLE);
        assert_eq!(r.conso_5_usages_m2_an, 0.0);
        assert_eq!(r.emission_ges_5_usages_m2_an, 0.0);
        assert_eq!(r.ubat, 0.0);
        assert_eq!(r.cout_total_5_usages, 0.0);
        assert_eq!(r.surface_habitable, 0.0);
        assert_eq!(r.adresse_brut, ADDRESS_PLACEHOLDER);
        assert_eq!(r.commune_brut, "Thil");
        assert_eq!(r.code_postal, NOT_AVAILABLE);
        assert_eq!(r.latitude, None);
        assert_eq!(r.longitude, None);
        assert_eq!(r.annee_construction, NOT_AVAILABLE);
    }

    #[test]
    fn non_object_line_is_all_defaults() {
        let r = normalize_record(&json!("garbage"), "Lexy");
        assert_eq!(r.commune_brut, "Lexy");
        assert_eq!(r.etiquette_dpe, NOT_AVAILABLE);
    }

    #[test]
    fn non_numeric_values_become_zero() {
        let raw = json!({
            "conso_5_usages_par_m2_ep": "n/c",
            "emission_ges_5_usages_par_m2": {"nested": true},
            "surface_habitable_logement": "NaN",
        });
        let r = normalize_record(&raw, "Lexy");
        assert_eq!(r.conso_5_usages_m2_an, 0.0);
        assert_eq!(r.emission_ges_5_usages_m2_an, 0.0);
        assert_eq!(r.surface_habitable, 0.0);
    }

    #[test]
    fn zero_falls_through_to_next_alias() {
        let raw = json!({"surface_habitable_logement": 0, "surface_habitable": 61});
        assert_eq!(normalize_record(&raw, "Lexy").surface_habitable, 61.0);
    }

    #[test]
    fn coordinate_at_origin_is_kept_but_garbage_is_not() {
        let raw = json!({"latitude": 0, "longitude": 0.0});
        assert_eq!(normalize_record(&raw, "Lexy").coordinates(), Some((0.0, 0.0)));

        let raw = json!({"latitude": "north", "_geopoint": "oops"});
        let r = normalize_record(&raw, "Lexy");
        assert_eq!(r.latitude, None);
        assert_eq!(r.longitude, None);
    }

    #[test]
    fn random_ids_differ() {
        let a = normalize_record(&json!({}), "Lexy");
        let b = normalize_record(&json!({}), "Lexy");
        assert_eq!(a.id.len(), RANDOM_ID_LEN);
        assert_ne!(a.id, b.id);
    }

    proptest! {
        #[test]
        fn long_grades_keep_first_letter_uppercased(label in "[a-gA-G][a-zA-Z0-9 ()]{1,12}") {
            let r = normalize_record(&json!({"etiquette_dpe": label.clone(), "etiquette_ges": label.clone()}), "Lexy");
            let expected = label.chars().next().unwrap().to_ascii_uppercase().to_string();
            prop_assert_eq!(&r.etiquette_dpe, &expected);
            prop_assert_eq!(&r.etiquette_ges, &expected);
        }

        #[test]
        fn numeric_fields_are_always_finite(raw in prop_oneof![
            Just(json!(null)),
            Just(json!("")),
            Just(json!("abc")),
            Just(json!("1e400")),
            any::<f64>().prop_map(|v| json!(v.to_string())),
            any::<i32>().prop_map(|v| json!(v)),
        ]) {
            let r = normalize_record(&json!({
                "conso_5_usages_par_m2_ep": raw.clone(),
                "ubat_w_m2_k": raw.clone(),
                "cout_total_5_usages": raw,
            }), "Lexy");
            prop_assert!(r.conso_5_usages_m2_an.is_finite());
            prop_assert!(r.ubat.is_finite());
            prop_assert!(r.cout_total_5_usages.is_finite());
        }

        #[test]
        fn missing_fields_never_leak_blanks(keep_address in any::<bool>(), keep_grade in any::<bool>()) {
            let mut raw = serde_json::Map::new();
            if keep_address {
                raw.insert("adresse_ban".into(), json!("1 place Darche"));
            }
            if keep_grade {
                raw.insert("etiquette_dpe".into(), json!("c"));
            }
            let r = normalize_record(&Value::Object(raw), "Longwy");
            prop_assert!(!r.adresse_brut.is_empty());
            prop_assert_eq!(r.etiquette_dpe.chars().count() == 1, keep_grade);
            prop_assert_eq!(r.etiquette_dpe == NOT_AVAILABLE, !keep_grade);
        }
    }
}
