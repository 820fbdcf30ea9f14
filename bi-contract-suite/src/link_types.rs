//! Ontology link types.
//!
//! Needs the `leftObjectTypeId` and `rightObjectTypeId` fixtures: the object
//! types a link type connects belong to the project and are never created here.

use crate::schemas;
use contract_harness::{Expectation, RequestDescriptor, Result, Scenario, Step};
use serde::Serialize;

pub const SUBSYSTEM: &str = "ontology";

pub const LINK_TYPE_NAME: &str = "Test Linktype";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkEnd {
    pub object_type_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkTypeDraft {
    pub name: String,
    pub left: LinkEnd,
    pub right: LinkEnd,
}

impl LinkTypeDraft {
    pub fn new<S1: Into<String>, S2: Into<String>, S3: Into<String>>(
        name: S1,
        left_object_type_id: S2,
        right_object_type_id: S3,
    ) -> Self {
        Self {
            name: name.into(),
            left: LinkEnd {
                object_type_id: left_object_type_id.into(),
            },
            right: LinkEnd {
                object_type_id: right_object_type_id.into(),
            },
        }
    }
}

/// create -> get -> delete -> get again.
///
/// The id returned by the create step is captured as `linkTypeId` and sent
/// verbatim as the `id` query parameter of the later steps.
pub fn crud_scenario() -> Result<Scenario> {
    let link_type_schema = schemas::link_type()?;

    Ok(Scenario::new("Link types: create, read and delete")
        .label("subsystem", SUBSYSTEM)
        .step(
            Step::new(
                "create link type",
                |fixtures| {
                    let draft = LinkTypeDraft::new(
                        LINK_TYPE_NAME,
                        fixtures.get_str("leftObjectTypeId")?,
                        fixtures.get_str("rightObjectTypeId")?,
                    );
                    RequestDescriptor::post("/LinkType")
                        .json(serde_json::to_value(&draft)?)
                        .build()
                },
                move |_, _| {
                    Ok(Expectation::status(200)
                        .schema(link_type_schema.clone())
                        .equals("/name", LINK_TYPE_NAME))
                },
            )
            .capture("/id", "linkTypeId"),
        )
        .step(Step::new(
            "get created link type",
            |_| {
                RequestDescriptor::get("/LinkType")
                    .query("id", "{linkTypeId}")
                    .build()
            },
            |_, fixtures| {
                Ok(Expectation::status(200)
                    .equals("/id", fixtures.get("linkTypeId")?.clone())
                    .equals("/name", LINK_TYPE_NAME)
                    .equals("/left/objectTypeId", fixtures.get("leftObjectTypeId")?.clone()))
            },
        ))
        .step(Step::new(
            "delete link type",
            |_| {
                RequestDescriptor::delete("/LinkType")
                    .query("id", "{linkTypeId}")
                    .build()
            },
            |_, _| Ok(Expectation::status_in([200, 204])),
        ))
        .step(Step::new(
            "get deleted link type",
            |_| {
                RequestDescriptor::get("/LinkType")
                    .query("id", "{linkTypeId}")
                    .build()
            },
            |_, _| Ok(Expectation::status_in([404, 204])),
        )))
}

/// A malformed id is rejected with a validation error on the `id` field.
pub fn invalid_id_scenario() -> Result<Scenario> {
    let validation_error = schemas::validation_error()?;

    Ok(Scenario::new("Link types: invalid id")
        .label("subsystem", SUBSYSTEM)
        .step(Step::fixed(
            "get link type with malformed id",
            RequestDescriptor::get("/LinkType")
                .query("id", "not-a-guid")
                .build()?,
            Expectation::status(400)
                .schema(validation_error)
                .exists("/errors/id"),
        )))
}

pub fn scenarios() -> Result<Vec<Scenario>> {
    Ok(vec![crud_scenario()?, invalid_id_scenario()?])
}

#[cfg(test)]
mod tests {
    use super::*;
    use contract_harness::{
        ClientConfig, FixtureStore, Method, ReqwestHttpClient, ScenarioRunner, ScenarioState,
        StepStatus, StubResponse, StubRoutes, StubServer,
    };
    use serde_json::json;
    use std::sync::Arc;

    const LINK_TYPE_ID: &str = "6c1f0b4e-8a51-4a43-9d0e-3a1f7a0c2b11";

    fn runner_for(server: &StubServer) -> ScenarioRunner {
        let client = ReqwestHttpClient::with_config(ClientConfig {
            base_url: Some(server.url()),
            ..ClientConfig::default()
        })
        .unwrap();
        let fixtures: FixtureStore = vec![
            ("leftObjectTypeId", "customer"),
            ("rightObjectTypeId", "order"),
        ]
        .into_iter()
        .collect();
        ScenarioRunner::new(Arc::new(client)).with_seed_fixtures(fixtures)
    }

    fn link_type() -> serde_json::Value {
        json!({
            "id": LINK_TYPE_ID,
            "name": LINK_TYPE_NAME,
            "left": { "objectTypeId": "customer" },
            "right": { "objectTypeId": "order" }
        })
    }

    #[tokio::test]
    async fn crud_scenario_passes_against_a_conforming_service() {
        let server = StubServer::start(
            StubRoutes::new()
                .route(Method::Post, "/LinkType", StubResponse::json(200, link_type()))
                .route(Method::Get, "/LinkType", StubResponse::json(200, link_type()))
                .route(Method::Get, "/LinkType", StubResponse::empty(204))
                .route(Method::Delete, "/LinkType", StubResponse::json(200, json!(true))),
        )
        .await
        .unwrap();

        let report = runner_for(&server).run(&crud_scenario().unwrap()).await;

        assert!(report.passed(), "{}", report);
        let requests = server.requests();
        let sent: serde_json::Value = serde_json::from_str(&requests[0].body).unwrap();
        assert_eq!(sent["right"]["objectTypeId"], "order");
        for request in &requests[1..] {
            assert_eq!(request.query.as_deref(), Some(&*format!("id={}", LINK_TYPE_ID)));
        }
    }

    #[tokio::test]
    async fn missing_object_type_fixture_errors_the_scenario() {
        let server = StubServer::start(StubRoutes::new()).await.unwrap();
        let client = ReqwestHttpClient::with_config(ClientConfig {
            base_url: Some(server.url()),
            ..ClientConfig::default()
        })
        .unwrap();

        let report = ScenarioRunner::new(Arc::new(client))
            .run(&crud_scenario().unwrap())
            .await;

        assert_eq!(report.state, ScenarioState::Errored);
        assert!(server.requests().is_empty());
    }

    #[tokio::test]
    async fn link_type_still_present_after_delete_fails_the_last_step() {
        let server = StubServer::start(
            StubRoutes::new()
                .route(Method::Post, "/LinkType", StubResponse::json(200, link_type()))
                .route(Method::Get, "/LinkType", StubResponse::json(200, link_type()))
                .route(Method::Delete, "/LinkType", StubResponse::json(200, json!(true))),
        )
        .await
        .unwrap();

        let report = runner_for(&server).run(&crud_scenario().unwrap()).await;

        assert_eq!(report.state, ScenarioState::Failed);
        assert_eq!(
            report.first_failure().map(|step| step.name.as_str()),
            Some("get deleted link type")
        );
    }

    #[tokio::test]
    async fn invalid_id_scenario_expects_a_validation_envelope() {
        let server = StubServer::start(StubRoutes::new().route(
            Method::Get,
            "/LinkType",
            StubResponse::json(
                400,
                json!({
                    "title": "One or more validation errors occurred.",
                    "status": 400,
                    "errors": { "id": ["The value 'not-a-guid' is not valid."] }
                }),
            ),
        ))
        .await
        .unwrap();

        let report = runner_for(&server).run(&invalid_id_scenario().unwrap()).await;

        assert!(report.passed(), "{}", report);
    }

    #[tokio::test]
    async fn plain_text_error_is_a_contract_violation() {
        let server = StubServer::start(StubRoutes::new().route(
            Method::Get,
            "/LinkType",
            StubResponse::text(400, "Bad Request"),
        ))
        .await
        .unwrap();

        let report = runner_for(&server).run(&invalid_id_scenario().unwrap()).await;

        assert_eq!(report.steps[0].status, StepStatus::Failed);
    }
}
