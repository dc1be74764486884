use super::Router;
use crate::spec::{load_contract_from_str, DocumentFormat};
use http::Method;

const SPEC: &str = r#"
openapi: 3.0.3
info:
  title: Router Test
  version: "1.0"
servers:
  - url: https://api.example.com/api/v1
paths:
  /pets:
    get:
      responses: {}
    post:
      responses: {}
  /pets/{petId}:
    get:
      parameters:
        - name: petId
          in: path
          schema: {type: integer}
      responses: {}
  /pets/mine:
    get:
      responses: {}
  /pets/{petId}/owner:
    put:
      parameters:
        - name: petId
          in: path
          schema: {type: integer}
      responses: {}
  /{kind}/mine:
    delete:
      parameters:
        - name: kind
          in: path
          schema: {type: string}
      responses: {}
  /reports/{name}.json:
    get:
      parameters:
        - name: name
          in: path
          schema: {type: string}
      responses: {}
  /:
    get:
      responses: {}
"#;

fn router() -> Router {
    let contract = load_contract_from_str(SPEC, DocumentFormat::Yaml).unwrap();
    Router::new(&contract)
}

#[test]
fn test_literal_path() {
    let m = router().resolve(&Method::GET, "/api/v1/pets").unwrap();
    assert_eq!(&*m.template, "/pets");
    assert!(m.path_params.is_empty());
}

#[test]
fn test_parameterized_path_captures_raw_value() {
    let m = router().resolve(&Method::GET, "/api/v1/pets/a%20b").unwrap();
    assert_eq!(&*m.template, "/pets/{petId}");
    assert_eq!(m.get_path_param("petId"), Some("a%20b"));
}

#[test]
fn test_literal_beats_parameter() {
    let m = router().resolve(&Method::GET, "/api/v1/pets/mine").unwrap();
    assert_eq!(&*m.template, "/pets/mine");
}

#[test]
fn test_falls_back_to_less_specific_template_with_method() {
    let m = router().resolve(&Method::DELETE, "/api/v1/pets/mine").unwrap();
    assert_eq!(&*m.template, "/{kind}/mine");
    assert_eq!(m.get_path_param("kind"), Some("pets"));
}

#[test]
fn test_missing_operation_names_most_specific_template() {
    let err = router().resolve(&Method::PATCH, "/api/v1/pets/mine").unwrap_err();
    assert!(err.is_operation_missing_error());
    assert!(err.is_retrieval_error());
    assert_eq!(err.spec_path, "/pets/mine");
    assert!(err.spec_line > 0);
}

#[test]
fn test_unknown_path() {
    let err = router().resolve(&Method::GET, "/api/v1/nonexistent").unwrap_err();
    assert!(err.is_path_missing_error());
    assert!(err.is_retrieval_error());
}

#[test]
fn test_base_path_is_optional() {
    let m = router().resolve(&Method::PUT, "/pets/5/owner").unwrap();
    assert_eq!(&*m.template, "/pets/{petId}/owner");
    assert_eq!(m.get_path_param("petId"), Some("5"));
}

#[test]
fn test_root_and_trailing_slash() {
    let r = router();
    assert_eq!(&*r.resolve(&Method::GET, "/api/v1").unwrap().template, "/");
    assert_eq!(&*r.resolve(&Method::GET, "/api/v1/pets/").unwrap().template, "/pets");
}

#[test]
fn test_mixed_segment() {
    let m = router().resolve(&Method::GET, "/api/v1/reports/q3.json").unwrap();
    assert_eq!(&*m.template, "/reports/{name}.json");
    assert_eq!(m.get_path_param("name"), Some("q3"));
}

#[test]
fn test_query_string_is_ignored() {
    let m = router().resolve(&Method::GET, "/api/v1/pets?limit=3").unwrap();
    assert_eq!(&*m.template, "/pets");
}

#[test]
fn test_case_sensitive_literals() {
    assert!(router().resolve(&Method::GET, "/api/v1/PETS").is_err());
}

#[test]
fn test_route_lines() {
    let lines = router().route_lines();
    assert_eq!(lines[0], "GET /api/v1/pets");
    assert_eq!(lines[1], "POST /api/v1/pets");
    assert_eq!(lines.len(), 8);
}
