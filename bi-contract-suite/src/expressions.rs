//! Semantic model expression validation.
//!
//! Expressions are validated against the dataset named by the `datasetId`
//! fixture.

use crate::schemas;
use contract_harness::{Expectation, RequestDescriptor, Result, Scenario, Step};
use serde_json::json;

pub const SUBSYSTEM: &str = "semantic-model";

pub const VALID_EXPRESSIONS: &[&str] = &[
    "Year([Date])",
    "Sum([Amount])",
    "DatePart('quarter', [Date])",
    "If([Amount] > 100, 'large', 'small')",
];

pub const MALFORMED_EXPRESSIONS: &[&str] = &[
    "Year([Date]",
    "Sum(",
    "[Amount] +",
    "DatePart('quarter')",
];

fn validate_step<S: Into<String>>(
    name: S,
    expression: &'static str,
    expectation: Expectation,
) -> Step {
    Step::new(
        name,
        move |fixtures| {
            let dataset_id = fixtures.get("datasetId")?.clone();
            RequestDescriptor::post("/Expression/validate")
                .json(json!({ "expression": expression, "datasetId": dataset_id }))
                .build()
        },
        move |_, _| Ok(expectation.clone()),
    )
}

/// Every well-formed expression is accepted.
pub fn valid_expressions_scenario() -> Scenario {
    VALID_EXPRESSIONS.iter().fold(
        Scenario::new("Expressions: valid expressions are accepted")
            .label("subsystem", SUBSYSTEM),
        |scenario, expression| {
            scenario.step(validate_step(
                format!("validate {}", expression),
                *expression,
                Expectation::status(200),
            ))
        },
    )
}

/// Every malformed expression is rejected with a validation error envelope.
pub fn malformed_expressions_scenario() -> Result<Scenario> {
    let validation_error = schemas::validation_error()?;

    Ok(MALFORMED_EXPRESSIONS.iter().fold(
        Scenario::new("Expressions: malformed expressions are rejected")
            .label("subsystem", SUBSYSTEM),
        |scenario, expression| {
            scenario.step(validate_step(
                format!("reject {}", expression),
                *expression,
                Expectation::status(400)
                    .schema(validation_error.clone())
                    .exists("/errors"),
            ))
        },
    ))
}

pub fn scenarios() -> Result<Vec<Scenario>> {
    Ok(vec![valid_expressions_scenario(), malformed_expressions_scenario()?])
}
