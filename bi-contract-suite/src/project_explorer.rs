//! Project explorer folders and files.

use crate::schemas;
use contract_harness::{
    Expectation, MultipartForm, PollPolicy, RequestDescriptor, Result, Scenario, Step,
};
use serde_json::json;
use std::time::Duration;

pub const SUBSYSTEM: &str = "project-explorer";

pub const FOLDER_NAME: &str = "contract-tests";

pub const SAMPLE_FILE_NAME: &str = "contract-sample.csv";

pub const SAMPLE_FILE: &[u8] = b"region,amount\nnorth,10\nsouth,32\n";

/// Deletion is asynchronous on the storage side.
pub fn deletion_poll_policy() -> PollPolicy {
    PollPolicy {
        interval: Duration::from_millis(500),
        max_attempts: 10,
        timeout: Duration::from_secs(10),
    }
}

fn create_folder_step() -> Result<Step> {
    let folder_schema = schemas::folder()?;

    Ok(Step::new(
        "create folder",
        |_| {
            RequestDescriptor::post("/Folder")
                .json(json!({ "name": FOLDER_NAME, "parentId": null }))
                .build()
        },
        move |_, _| {
            Ok(Expectation::status(200)
                .schema(folder_schema.clone())
                .equals("/name", FOLDER_NAME))
        },
    )
    .capture("/id", "folderId"))
}

fn delete_folder_step() -> Step {
    Step::new(
        "delete folder",
        |_| RequestDescriptor::delete("/Folder/{folderId}").build(),
        |_, _| Ok(Expectation::status_in([200, 204])),
    )
}

/// create folder -> upload file -> get file -> delete file -> file is gone -> delete folder.
pub fn file_lifecycle_scenario() -> Result<Scenario> {
    let file_schema = schemas::file_resource()?;
    let uploaded_schema = file_schema.clone();

    Ok(Scenario::new("Project explorer: file lifecycle")
        .label("subsystem", SUBSYSTEM)
        .step(create_folder_step()?)
        .step(
            Step::new(
                "upload file",
                |fixtures| {
                    let form = MultipartForm::new()
                        .text("folderId", fixtures.render("folderId")?)
                        .file_bytes("file", SAMPLE_FILE_NAME, SAMPLE_FILE.to_vec())
                        .require_part("file");
                    RequestDescriptor::post("/File/upload").multipart(form).build()
                },
                move |_, fixtures| {
                    Ok(Expectation::status(200)
                        .schema(uploaded_schema.clone())
                        .equals("/name", SAMPLE_FILE_NAME)
                        .equals("/parentId", fixtures.get("folderId")?.clone()))
                },
            )
            .capture("/id", "fileId"),
        )
        .step(Step::new(
            "get file",
            |_| RequestDescriptor::get("/File/{fileId}").build(),
            move |_, fixtures| {
                Ok(Expectation::status(200)
                    .schema(file_schema.clone())
                    .equals("/id", fixtures.get("fileId")?.clone())
                    .equals("/name", SAMPLE_FILE_NAME))
            },
        ))
        .step(Step::new(
            "delete file",
            |_| RequestDescriptor::delete("/File/{fileId}").build(),
            |_, _| Ok(Expectation::status_in([200, 204])),
        ))
        .step(
            Step::new(
                "file is gone",
                |_| RequestDescriptor::get("/File/{fileId}").build(),
                |_, _| Ok(Expectation::status_in([404, 204])),
            )
            .poll_until(
                |envelope| matches!(envelope.status_code(), Some(404) | Some(204)),
                deletion_poll_policy(),
            ),
        )
        .step(delete_folder_step()))
}

/// The form declares no required part, so the missing file is left for the
/// service to reject with `errors.file`.
pub fn upload_without_file_scenario() -> Result<Scenario> {
    let validation_error = schemas::validation_error()?;

    Ok(Scenario::new("Project explorer: upload without a file")
        .label("subsystem", SUBSYSTEM)
        .step(create_folder_step()?)
        .step(Step::new(
            "upload without file part",
            |fixtures| {
                let form = MultipartForm::new().text("folderId", fixtures.render("folderId")?);
                RequestDescriptor::post("/File/upload").multipart(form).build()
            },
            move |_, _| {
                Ok(Expectation::status(400)
                    .schema(validation_error.clone())
                    .exists("/errors/file"))
            },
        ))
        .step(delete_folder_step()))
}

/// Deleting a folder that does not exist is a resource level validation error.
pub fn delete_missing_folder_scenario() -> Result<Scenario> {
    Ok(Scenario::new("Project explorer: delete missing folder")
        .label("subsystem", SUBSYSTEM)
        .step(Step::fixed(
            "delete missing folder",
            RequestDescriptor::delete("/Folder/00000000-0000-0000-0000-000000000000").build()?,
            Expectation::status(400)
                .schema(schemas::validation_error()?)
                .exists("/errors/"),
        )))
}

pub fn scenarios() -> Result<Vec<Scenario>> {
    Ok(vec![
        file_lifecycle_scenario()?,
        upload_without_file_scenario()?,
        delete_missing_folder_scenario()?,
    ])
}
