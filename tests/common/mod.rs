#![allow(dead_code)]

use brrtvalidator::{load_contract_from_str, DocumentFormat, Validator, ValidatorOptions};
use http::{Request, Response};

pub const PETSTORE: &str = r#"openapi: 3.0.3
info:
  title: Swagger Petstore
  version: "1.0.0"
servers:
  - url: https://petstore.example.com/api/v3
paths:
  /pets:
    get:
      operationId: listPets
      parameters:
        - name: status
          in: query
          required: true
          schema:
            type: string
            enum: [available, pending, sold]
        - name: limit
          in: query
          schema: {type: integer, minimum: 1, maximum: 100}
        - name: tags
          in: query
          style: form
          explode: false
          schema:
            type: array
            items: {type: string}
      responses:
        '200':
          description: A list of pets
          content:
            application/json:
              schema:
                type: array
                items:
                  $ref: '#/components/schemas/Pet'
        default:
          $ref: '#/components/responses/Problem'
    post:
      operationId: addPet
      requestBody:
        $ref: '#/components/requestBodies/NewPet'
      responses:
        '201':
          description: Created
          content:
            application/json:
              schema:
                $ref: '#/components/schemas/Pet'
  /pets/{petId}:
    parameters:
      - $ref: '#/components/parameters/PetId'
    get:
      operationId: getPet
      parameters:
        - name: X-Request-Id
          in: header
          schema: {type: string, format: uuid}
      responses:
        '200':
          description: A pet
          content:
            application/json:
              schema:
                $ref: '#/components/schemas/Pet'
        4XX:
          $ref: '#/components/responses/Problem'
    delete:
      operationId: deletePet
      responses:
        '204':
          description: Deleted
components:
  parameters:
    PetId:
      name: petId
      in: path
      required: true
      schema: {type: integer, format: int64}
  requestBodies:
    NewPet:
      required: true
      content:
        application/json:
          schema:
            $ref: '#/components/schemas/NewPet'
  responses:
    Problem:
      description: Error
      content:
        application/problem+json:
          schema:
            type: object
            required: [title]
            properties:
              title: {type: string}
              status: {type: integer}
  schemas:
    NewPet:
      type: object
      required: [name, status]
      properties:
        name: {type: string, minLength: 1}
        status:
          type: string
          enum: [available, pending, sold]
        tag:
          type: string
          nullable: true
        owner:
          $ref: '#/components/schemas/Owner'
    Pet:
      allOf:
        - $ref: '#/components/schemas/NewPet'
        - type: object
          required: [id]
          properties:
            id: {type: integer, format: int64}
    Owner:
      type: object
      required: [name]
      properties:
        name: {type: string}
        email: {type: string, format: email}
        referrer:
          $ref: '#/components/schemas/Owner'
"#;

pub fn petstore() -> Validator {
    petstore_with(ValidatorOptions::default())
}

pub fn petstore_with(options: ValidatorOptions) -> Validator {
    let contract = load_contract_from_str(PETSTORE, DocumentFormat::Yaml).unwrap();
    Validator::with_options(contract, options)
}

pub fn get(uri: &str) -> Request<Vec<u8>> {
    Request::get(uri).body(Vec::new()).unwrap()
}

pub fn json_request(method: &str, uri: &str, body: &str) -> Request<Vec<u8>> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.as_bytes().to_vec())
        .unwrap()
}

pub fn response(status: u16, content_type: &str, body: &str) -> Response<Vec<u8>> {
    Response::builder()
        .status(status)
        .header("content-type", content_type)
        .body(body.as_bytes().to_vec())
        .unwrap()
}
