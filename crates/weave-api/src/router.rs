use axum::{
    Router,
    extract::State,
    middleware,
    routing::{delete, get, post},
};

use crate::error::{ApiError, run_blocking};
use crate::middleware::require_auth;
use crate::state::AppState;
use crate::{activities, collaborators, documents};

/// All routes. CORS and request tracing are layered on by the binary.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/invite/{document_id}", get(collaborators::invite_link))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/documents", get(documents::dashboard).post(documents::create_document))
        .route(
            "/documents/{document_id}",
            get(documents::show_document).delete(documents::delete_document),
        )
        .route("/documents/{document_id}/invite", post(collaborators::invite))
        .route("/documents/{document_id}/accept", post(collaborators::accept))
        .route("/documents/{document_id}/reject", post(collaborators::reject))
        .route("/documents/{document_id}/leave", post(collaborators::leave))
        .route("/documents/{document_id}/collaborators", get(collaborators::list_collaborators))
        .route(
            "/documents/{document_id}/collaborators/{user_id}",
            delete(collaborators::remove),
        )
        .route(
            "/documents/{document_id}/activities",
            get(activities::list_activities).post(activities::append_activity),
        )
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state);

    Router::new().merge(public_routes).merge(protected_routes)
}

async fn health(State(state): State<AppState>) -> Result<&'static str, ApiError> {
    run_blocking(move || {
        state
            .db
            .with_conn(|conn| Ok(conn.query_row("SELECT 1", [], |r| r.get::<_, i64>(0))?))?;
        Ok(())
    })
    .await?;
    Ok("ok")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{HeaderMap, Method, Request, StatusCode, header};
    use chrono::Utc;
    use http_body_util::BodyExt;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use uuid::Uuid;

    use weave_collab::LogNotifier;
    use weave_db::Database;
    use weave_gateway::{Dispatcher, HttpPublisher, Publisher};
    use weave_types::api::Claims;
    use weave_types::events::RoomEvent;
    use weave_types::models::RoomId;

    use super::*;
    use crate::state::AppStateInner;

    const SECRET: &str = "test-secret";

    struct User {
        id: Uuid,
        token: String,
    }

    struct Harness {
        app: Router,
        db: Arc<Database>,
        owner: User,
        guest: User,
        stranger: User,
    }

    impl Harness {
        fn new(publisher: Arc<dyn Publisher>) -> Self {
            let db = Arc::new(Database::open_in_memory().unwrap());
            let owner = seed_user(&db, "Olga", "olga@example.com");
            let guest = seed_user(&db, "Ana", "ana@example.com");
            let stranger = seed_user(&db, "Bruno", "bruno@example.com");
            let state = Arc::new(AppStateInner::new(
                db.clone(),
                publisher,
                Arc::new(LogNotifier),
                "http://localhost:3000",
                SECRET.into(),
            ));

            Self {
                app: router(state),
                db,
                owner,
                guest,
                stranger,
            }
        }

        async fn send(
            &self,
            method: Method,
            uri: &str,
            token: Option<&str>,
            body: Option<Value>,
        ) -> (StatusCode, HeaderMap, Value) {
            let mut builder = Request::builder().method(method).uri(uri);
            if let Some(token) = token {
                builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
            }
            let request = match body {
                Some(body) => builder
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
                None => builder.body(Body::empty()).unwrap(),
            };

            let response = self.app.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let headers = response.headers().clone();
            let bytes = response.into_body().collect().await.unwrap().to_bytes();
            let json = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap_or(Value::Null)
            };
            (status, headers, json)
        }

        async fn create_document(&self, name: &str) -> Uuid {
            let (status, _, body) = self
                .send(Method::POST, "/documents", Some(&self.owner.token), Some(json!({ "name": name })))
                .await;
            assert_eq!(status, StatusCode::CREATED);
            body["id"].as_str().unwrap().parse().unwrap()
        }

        async fn invite_guest(&self, document_id: Uuid) -> StatusCode {
            let (status, _, _) = self
                .send(
                    Method::POST,
                    &format!("/documents/{}/invite", document_id),
                    Some(&self.owner.token),
                    Some(json!({ "email": "ana@example.com" })),
                )
                .await;
            status
        }

        fn rows_for(&self, document_id: Uuid, user_id: Uuid) -> i64 {
            self.db
                .with_conn(|conn| {
                    Ok(conn.query_row(
                        "SELECT COUNT(*) FROM collaborations WHERE document_id = ?1 AND user_id = ?2",
                        [document_id.to_string(), user_id.to_string()],
                        |r| r.get(0),
                    )?)
                })
                .unwrap()
        }
    }

    fn seed_user(db: &Database, name: &str, email: &str) -> User {
        let id = Uuid::new_v4();
        db.create_user(&id.to_string(), name, email, &Utc::now().to_rfc3339())
            .unwrap();
        let claims = Claims {
            sub: id,
            name: name.into(),
            email: email.into(),
            exp: (Utc::now().timestamp() + 3600) as usize,
        };
        let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_bytes())).unwrap();
        User { id, token }
    }

    fn location(headers: &HeaderMap) -> &str {
        headers.get(header::LOCATION).unwrap().to_str().unwrap()
    }

    #[tokio::test]
    async fn health_is_public() {
        let h = Harness::new(Arc::new(Dispatcher::new()));
        let (status, _, _) = h.send(Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_or_invalid_token_is_rejected_without_body() {
        let h = Harness::new(Arc::new(Dispatcher::new()));

        let (status, _, body) = h.send(Method::GET, "/documents", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, Value::Null);

        let (status, _, _) = h.send(Method::GET, "/documents", Some("not-a-jwt"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn invite_accept_flow_notifies_room() {
        let dispatcher = Dispatcher::new();
        let h = Harness::new(Arc::new(dispatcher.clone()));
        let doc = h.create_document("Checkout form").await;
        let mut room = dispatcher.join(RoomId::for_document(doc));

        assert_eq!(h.invite_guest(doc).await, StatusCode::CREATED);

        let accept = format!("/documents/{}/accept", doc);
        let (status, _, body) = h.send(Method::POST, &accept, Some(&h.guest.token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "accepted");

        let msg = room.try_recv().expect("collaboratorAccepted event");
        assert_eq!(msg.room_id.as_str(), format!("room-{}", doc));
        assert!(matches!(
            msg.event,
            RoomEvent::CollaboratorAccepted { user_id, .. } if user_id == h.guest.id
        ));

        let (status, _, body) = h.send(Method::POST, &accept, Some(&h.guest.token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["message"].as_str().unwrap().contains("not found"));
    }

    #[tokio::test]
    async fn double_invite_is_unprocessable() {
        let h = Harness::new(Arc::new(Dispatcher::new()));
        let doc = h.create_document("Survey").await;

        assert_eq!(h.invite_guest(doc).await, StatusCode::CREATED);
        assert_eq!(h.invite_guest(doc).await, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(h.rows_for(doc, h.guest.id), 1);
    }

    #[tokio::test]
    async fn invite_by_non_owner_or_unknown_email() {
        let h = Harness::new(Arc::new(Dispatcher::new()));
        let doc = h.create_document("Survey").await;
        let uri = format!("/documents/{}/invite", doc);

        let (status, _, _) = h
            .send(Method::POST, &uri, Some(&h.stranger.token), Some(json!({ "email": "ana@example.com" })))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _, _) = h
            .send(Method::POST, &uri, Some(&h.owner.token), Some(json!({ "email": "ghost@example.com" })))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn stranger_cannot_list_collaborators() {
        let h = Harness::new(Arc::new(Dispatcher::new()));
        let doc = h.create_document("Survey").await;
        let uri = format!("/documents/{}/collaborators", doc);

        let (status, _, _) = h.send(Method::GET, &uri, Some(&h.stranger.token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _, body) = h.send(Method::GET, &uri, Some(&h.owner.token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn invite_link_redirects() {
        let h = Harness::new(Arc::new(Dispatcher::new()));
        let doc = h.create_document("Survey").await;
        let uri = format!("/invite/{}", doc);

        let (status, headers, _) = h.send(Method::GET, &uri, None, None).await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(location(&headers), format!("/login?redirect=/invite/{}", doc));

        for _ in 0..2 {
            let (status, headers, _) = h.send(Method::GET, &uri, Some(&h.guest.token), None).await;
            assert_eq!(status, StatusCode::SEE_OTHER);
            assert_eq!(
                location(&headers),
                format!("/documents?highlight={}&notice=invitation_pending", doc)
            );
        }
        assert_eq!(h.rows_for(doc, h.guest.id), 1);

        let (_, headers, _) = h.send(Method::GET, &uri, Some(&h.owner.token), None).await;
        assert_eq!(
            location(&headers),
            format!("/documents?highlight={}&notice=already_owner", doc)
        );

        let (status, _, _) = h
            .send(Method::GET, &format!("/invite/{}", Uuid::new_v4()), Some(&h.guest.token), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn activities_require_access_and_valid_input() {
        let h = Harness::new(Arc::new(Dispatcher::new()));
        let doc = h.create_document("Survey").await;
        let uri = format!("/documents/{}/activities", doc);

        let (status, _, _) = h
            .send(Method::POST, &uri, Some(&h.owner.token), Some(json!({ "action_type": "" })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _, _) = h
            .send(Method::POST, &uri, Some(&h.stranger.token), Some(json!({ "action_type": "add" })))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _, body) = h
            .send(
                Method::POST,
                &uri,
                Some(&h.owner.token),
                Some(json!({ "action_type": "add", "action_data": { "element": "checkbox" } })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["user"]["email"], "olga@example.com");

        let (status, _, body) = h.send(Method::GET, &uri, Some(&h.owner.token), None).await;
        assert_eq!(status, StatusCode::OK);
        let records = body.as_array().unwrap();
        assert_eq!(records.last().unwrap()["action_type"], "add");

        let (status, _, _) = h.send(Method::GET, &uri, Some(&h.stranger.token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn delete_is_owner_only() {
        let h = Harness::new(Arc::new(Dispatcher::new()));
        let doc = h.create_document("Survey").await;
        let uri = format!("/documents/{}", doc);

        let (status, _, _) = h.send(Method::DELETE, &uri, Some(&h.guest.token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _, _) = h.send(Method::DELETE, &uri, Some(&h.owner.token), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _, _) = h.send(Method::GET, &uri, Some(&h.owner.token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn unreachable_socket_server_does_not_fail_accept() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let dead = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let publisher = HttpPublisher::spawn(&dead, Duration::from_millis(200)).unwrap();
        let h = Harness::new(Arc::new(publisher));
        let doc = h.create_document("Survey").await;
        assert_eq!(h.invite_guest(doc).await, StatusCode::CREATED);

        let (status, _, body) = h
            .send(Method::POST, &format!("/documents/{}/accept", doc), Some(&h.guest.token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "accepted");

        let (_, _, detail) = h
            .send(Method::GET, &format!("/documents/{}", doc), Some(&h.guest.token), None)
            .await;
        assert_eq!(detail["is_owner"], false);
        assert_eq!(detail["collaborators"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn malformed_bodies_are_bad_requests_with_message() {
        let h = Harness::new(Arc::new(Dispatcher::new()));
        let doc = h.create_document("Survey").await;

        let cases = [
            ("/documents".to_string(), json!({ "title": "Survey" })),
            (format!("/documents/{}/invite", doc), json!({ "mail": "ana@example.com" })),
            (format!("/documents/{}/activities", doc), json!({ "description": "x" })),
        ];
        for (uri, body) in cases {
            let (status, _, body) = h.send(Method::POST, &uri, Some(&h.owner.token), Some(body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
            assert!(body["message"].is_string(), "{} answered {}", uri, body);
        }
        assert_eq!(h.rows_for(doc, h.guest.id), 0);
    }

    #[tokio::test]
    async fn body_without_json_content_type_is_bad_request() {
        let h = Harness::new(Arc::new(Dispatcher::new()));
        let request = Request::builder()
            .method(Method::POST)
            .uri("/documents")
            .header(header::AUTHORIZATION, format!("Bearer {}", h.owner.token))
            .body(Body::from("name=Survey"))
            .unwrap();

        let response = h.app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body["message"].is_string());
    }

    #[tokio::test]
    async fn reject_route_only_applies_to_pending_invitations() {
        let h = Harness::new(Arc::new(Dispatcher::new()));
        let doc = h.create_document("Survey").await;
        let reject = format!("/documents/{}/reject", doc);

        let (status, _, _) = h.send(Method::POST, &reject, Some(&h.guest.token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        assert_eq!(h.invite_guest(doc).await, StatusCode::CREATED);
        let (status, _, body) = h.send(Method::POST, &reject, Some(&h.guest.token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "rejected");

        let (status, _, _) = h.send(Method::POST, &reject, Some(&h.guest.token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn leave_route_removes_own_row_and_announces() {
        let dispatcher = Dispatcher::new();
        let h = Harness::new(Arc::new(dispatcher.clone()));
        let doc = h.create_document("Survey").await;
        let mut room = dispatcher.join(RoomId::for_document(doc));
        let leave = format!("/documents/{}/leave", doc);

        assert_eq!(h.invite_guest(doc).await, StatusCode::CREATED);
        let (status, _, body) = h.send(Method::POST, &leave, Some(&h.guest.token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["message"].is_string());
        assert_eq!(h.rows_for(doc, h.guest.id), 0);
        assert!(matches!(
            room.try_recv().map(|m| m.event),
            Some(RoomEvent::CollaboratorLeft { user_id, .. }) if user_id == h.guest.id
        ));

        let (status, _, _) = h.send(Method::POST, &leave, Some(&h.guest.token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn remove_route_is_owner_only() {
        let h = Harness::new(Arc::new(Dispatcher::new()));
        let doc = h.create_document("Survey").await;
        let remove = format!("/documents/{}/collaborators/{}", doc, h.guest.id);

        let (status, _, _) = h.send(Method::DELETE, &remove, Some(&h.owner.token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        assert_eq!(h.invite_guest(doc).await, StatusCode::CREATED);
        let (status, _, _) = h.send(Method::DELETE, &remove, Some(&h.stranger.token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(h.rows_for(doc, h.guest.id), 1);

        let (status, _, body) = h.send(Method::DELETE, &remove, Some(&h.owner.token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["message"].is_string());
        assert_eq!(h.rows_for(doc, h.guest.id), 0);

        let (status, _, _) = h
            .send(Method::DELETE, &format!("/documents/{}/collaborators/not-a-uuid", doc), Some(&h.owner.token), None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
