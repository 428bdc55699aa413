//! API routes

use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::extractors::AppState;
use crate::handlers::{applications, inventory, tools};

/// Create the complete API router
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/applications", applications_router())
        .nest("/tools", tools_router())
        .nest("/inventory", inventory_router())
}

fn applications_router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(applications::list_applications).post(applications::create_application),
        )
        .route("/counts", get(applications::count_applications))
        .route("/my", get(applications::my_applications))
        .route("/assigned", get(applications::assigned_applications))
        .route(
            "/:id",
            get(applications::get_application).patch(applications::update_application),
        )
        .route("/:id/assign", patch(applications::assign_application))
        .route("/:id/status", patch(applications::update_status))
        .route("/:id/deadline", patch(applications::extend_deadline))
        .route("/:id/complete", post(applications::complete_application))
}

fn tools_router() -> Router<AppState> {
    Router::new()
        .route("/", get(tools::list_tools).post(tools::create_tool))
        .route("/tag/:tag", get(tools::list_tools_by_tag))
        .route("/tag/:tag/count", get(tools::count_tools_by_tag))
        .route("/:id", get(tools::get_tool).patch(tools::update_tool))
        .route("/:id/count", get(tools::tool_availability))
        .route("/:id/deduction", patch(tools::deduct_tool))
        .route("/:id/deactivate", patch(tools::deactivate_tool))
}

fn inventory_router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(inventory::list_inventory).post(inventory::create_inventory),
        )
        .route("/qr/:number", get(inventory::get_inventory_by_number))
        .route(
            "/:id",
            get(inventory::get_inventory).patch(inventory::update_inventory),
        )
        .route("/:id/repair-history", get(inventory::repair_history))
        .route("/:id/assign", patch(inventory::assign_inventory))
        .route("/:id/status", patch(inventory::change_inventory_status))
        .route("/:id/deduction", patch(inventory::deduct_inventory_tools))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::request::Builder;
    use axum::http::{header, Request, Response, StatusCode};
    use sd_attachments::{MemoryStorage, UploadPolicy};
    use sd_db::{MemoryApplicationStore, MemoryInventoryStore, MemoryToolStore};
    use sd_notifications::Notifier;
    use sd_services::{ApplicationWorkflow, InventoryAssignmentLedger, ToolStockLedger};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;

    const BOUNDARY: &str = "sd-test-boundary";

    fn app() -> Router {
        app_with(Arc::new(MemoryStorage::new("/uploads")))
    }

    fn app_with(storage: Arc<MemoryStorage>) -> Router {
        let tools = ToolStockLedger::new(Arc::new(MemoryToolStore::new()));
        let applications = ApplicationWorkflow::new(
            Arc::new(MemoryApplicationStore::new()),
            tools.clone(),
            Notifier::disabled(),
        );
        let inventory = InventoryAssignmentLedger::new(
            Arc::new(MemoryInventoryStore::new()),
            tools,
            "https://desk.example/qr",
        );
        let state = AppState::new(
            applications,
            inventory,
            storage,
            UploadPolicy::default(),
        );
        router().with_state(state)
    }

    fn as_actor(builder: Builder, kind: &str, id: i64) -> Builder {
        builder
            .header("x-actor-id", id.to_string())
            .header("x-actor-kind", kind)
            .header("x-actor-name", format!("{} {}", kind, id))
    }

    fn json_request(method: &str, uri: &str, kind: &str, body: Value) -> Request<Body> {
        as_actor(Request::builder().method(method).uri(uri), kind, 1)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn multipart_request(
        uri: &str,
        kind: &str,
        id: i64,
        data: Value,
        files: &[(&str, &str, &[u8])],
    ) -> Request<Body> {
        multipart("POST", uri, kind, id, data, files)
    }

    /// `files`: (file name, content type, bytes)
    fn multipart(
        method: &str,
        uri: &str,
        kind: &str,
        id: i64,
        data: Value,
        files: &[(&str, &str, &[u8])],
    ) -> Request<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"data\"\r\n\r\n{}\r\n",
                data
            )
            .as_bytes(),
        );
        for (name, content_type, bytes) in files {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"images\"; filename=\"{name}\"\r\nContent-Type: {content_type}\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        as_actor(Request::builder().method(method).uri(uri), kind, id)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn get(uri: &str, kind: &str, id: i64) -> Request<Body> {
        as_actor(Request::builder().uri(uri), kind, id)
            .body(Body::empty())
            .unwrap()
    }

    async fn body_json(response: Response<Body>) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn application_data() -> Value {
        json!({
            "branchId": 1,
            "departmentId": 3,
            "room": "115",
            "issue": "Monitor flickers"
        })
    }

    #[tokio::test]
    async fn test_missing_actor_is_unauthorized() {
        let response = app()
            .oneshot(Request::builder().uri("/applications").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["error"], "unauthorized");
    }

    #[tokio::test]
    async fn test_create_application_with_image() {
        let response = app()
            .oneshot(multipart_request(
                "/applications",
                "user",
                7,
                application_data(),
                &[("screen.jpg", "image/jpeg", &b"\xff\xd8\xff"[..])],
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = body_json(response).await;
        assert_eq!(body["status"], "new");
        assert_eq!(body["userId"], 7);
        assert!(body["index"].as_str().unwrap().starts_with("00001-"));
        let image = body["images"][0].as_str().unwrap();
        assert!(image.starts_with("/uploads/"));
        assert!(image.ends_with("screen.jpg"));
    }

    #[tokio::test]
    async fn test_non_image_upload_is_rejected() {
        let response = app()
            .oneshot(multipart_request(
                "/applications",
                "user",
                7,
                application_data(),
                &[("notes.txt", "text/plain", &b"hello"[..])],
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body_json(response).await["error"], "validation_failed");
    }

    #[tokio::test]
    async fn test_deadline_extension_on_new_application_conflicts() {
        let app = app();
        let response = app
            .clone()
            .oneshot(multipart_request(
                "/applications",
                "user",
                7,
                application_data(),
                &[],
            ))
            .await
            .unwrap();
        let id = body_json(response).await["id"].as_i64().unwrap();

        let response = app
            .clone()
            .oneshot(json_request(
                "PATCH",
                &format!("/applications/{}/deadline", id),
                "admin",
                json!({"deadline": "2026-12-01T10:00:00Z", "reason": "Parts"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(body_json(response).await["error"], "invalid_transition");

        let response = app
            .oneshot(
                as_actor(
                    Request::builder().uri(format!("/applications/{}", id)),
                    "admin",
                    1,
                )
                .body(Body::empty())
                .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(body_json(response).await["deadline"], Value::Null);
    }

    #[tokio::test]
    async fn test_over_deduction_reports_stock() {
        let app = app();
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/tools",
                "employee",
                json!({"name": "Patch cord", "toolNumber": "PC-2", "quantity": 5}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let id = body_json(response).await["id"].as_i64().unwrap();

        let response = app
            .clone()
            .oneshot(json_request(
                "PATCH",
                &format!("/tools/{}/deduction", id),
                "employee",
                json!({"quantity": 10}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_json(response).await;
        assert_eq!(body["error"], "insufficient_stock");
        assert_eq!(
            body["message"],
            "Not enough quantity for tool \"Patch cord\". Available: 5, Requested: 10"
        );

        let response = app
            .oneshot(
                as_actor(
                    Request::builder().uri(format!("/tools/{}/count", id)),
                    "employee",
                    1,
                )
                .body(Body::empty())
                .unwrap(),
            )
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["writtenOff"], 0);
        assert_eq!(body["available"], 5);
    }

    #[tokio::test]
    async fn test_role_scoped_listings() {
        let app = app();
        let response = app
            .clone()
            .oneshot(
                as_actor(Request::builder().uri("/applications/my"), "employee", 4)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app
            .oneshot(
                as_actor(Request::builder().uri("/applications/counts"), "admin", 1)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["total"], 0);
        assert_eq!(body["inProgress"], 0);
    }

    #[tokio::test]
    async fn test_inventory_lookup_by_qr_number() {
        let app = app();
        let response = app
            .clone()
            .oneshot(multipart_request(
                "/inventory",
                "employee",
                3,
                json!({"name": "Laptop", "inventoryNumber": "INV-0042"}),
                &[],
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = body_json(response).await;
        assert_eq!(created["qrCodeUrl"], "https://desk.example/qr/INV-0042");

        let response = app
            .oneshot(
                as_actor(Request::builder().uri("/inventory/qr/INV-0042"), "user", 9)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["id"], created["id"]);
    }

    #[tokio::test]
    async fn test_rejected_application_leaves_no_uploads() {
        let storage = Arc::new(MemoryStorage::new("/uploads"));
        let mut data = application_data();
        data["room"] = json!("   ");

        let response = app_with(storage.clone())
            .oneshot(multipart_request(
                "/applications",
                "user",
                7,
                data,
                &[("screen.jpg", "image/jpeg", &b"\xff\xd8\xff"[..])],
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(storage.len().await, 0);
    }

    #[tokio::test]
    async fn test_failed_completion_removes_report_photos() {
        let storage = Arc::new(MemoryStorage::new("/uploads"));
        let app = app_with(storage.clone());
        let response = app
            .clone()
            .oneshot(multipart_request(
                "/applications",
                "user",
                7,
                application_data(),
                &[("screen.jpg", "image/jpeg", &b"\xff\xd8\xff"[..])],
            ))
            .await
            .unwrap();
        let id = body_json(response).await["id"].as_i64().unwrap();
        assert_eq!(storage.len().await, 1);

        let response = app
            .oneshot(multipart_request(
                &format!("/applications/{}/complete", id),
                "employee",
                4,
                json!({"workDone": "Replaced cable"}),
                &[("after.png", "image/png", &b"\x89PNG"[..])],
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(storage.len().await, 1);
    }

    #[tokio::test]
    async fn test_only_the_filer_edits_an_application() {
        let app = app();
        let response = app
            .clone()
            .oneshot(multipart_request(
                "/applications",
                "user",
                7,
                application_data(),
                &[],
            ))
            .await
            .unwrap();
        let id = body_json(response).await["id"].as_i64().unwrap();
        let uri = format!("/applications/{}", id);

        let edit = json!({"room": "118"});
        let response = app
            .clone()
            .oneshot(
                as_actor(Request::builder().method("PATCH").uri(&uri), "user", 8)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(edit.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app
            .clone()
            .oneshot(
                as_actor(Request::builder().method("PATCH").uri(&uri), "user", 7)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(edit.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["room"], "118");
        assert_eq!(body["issue"], "Monitor flickers");

        let response = app
            .oneshot(json_request("PATCH", &uri, "admin", json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_inventory_listing_and_edit() {
        let storage = Arc::new(MemoryStorage::new("/uploads"));
        let app = app_with(storage.clone());
        for (name, number) in [("Laptop", "INV-0001"), ("Printer", "INV-0002")] {
            let response = app
                .clone()
                .oneshot(multipart_request(
                    "/inventory",
                    "employee",
                    3,
                    json!({"name": name, "inventoryNumber": number, "branchId": 2}),
                    &[],
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::CREATED);
        }

        let response = app
            .clone()
            .oneshot(get("/inventory?search=print&branchId=2", "employee", 3))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let page = body_json(response).await;
        assert_eq!(page["total"], 1);
        let printer = page["elements"][0].clone();
        assert_eq!(printer["name"], "Printer");

        let response = app
            .clone()
            .oneshot(get("/inventory", "user", 9))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let uri = format!("/inventory/{}", printer["id"]);
        let response = app
            .clone()
            .oneshot(multipart(
                "PATCH",
                &uri,
                "employee",
                3,
                json!({"serial": "HP-4021"}),
                &[("front.jpg", "image/jpeg", &b"\xff\xd8\xff"[..])],
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["serial"], "HP-4021");
        assert_eq!(body["name"], "Printer");
        assert!(body["images"][0].as_str().unwrap().ends_with("front.jpg"));
        assert_eq!(body["history"][0]["action"], "updated");
        assert_eq!(storage.len().await, 1);

        let response = app
            .oneshot(multipart(
                "PATCH",
                &uri,
                "employee",
                3,
                json!({"name": ""}),
                &[("back.jpg", "image/jpeg", &b"\xff\xd8\xff"[..])],
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(storage.len().await, 1);
    }
}
