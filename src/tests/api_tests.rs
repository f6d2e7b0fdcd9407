#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
    };
    use serde_json::json;

    use crate::security::{hash_token, new_token};
    use crate::tests::setup;
    use crate::types::now_unix;

    #[tokio::test]
    async fn test_root_without_token_is_unauthorized() {
        let app = setup().await;

        let (status, headers, body) =
            app.send(Request::builder().uri("/api").body(Body::empty()).unwrap()).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(headers.get(header::WWW_AUTHENTICATE).unwrap(), "Bearer");
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");
        assert!(body.get("Message").is_none());
    }

    #[tokio::test]
    async fn test_root_rejects_malformed_and_unknown_tokens() {
        let app = setup().await;

        for auth in ["Basic abc", "Bearer", "Bearer ", "fai_token_without_scheme"] {
            let req = Request::builder().uri("/api").header(header::AUTHORIZATION, auth).body(Body::empty()).unwrap();
            let (status, _, _) = app.send(req).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "header {:?}", auth);
        }

        let (status, _) = app.request(Method::GET, "/api", Some(&new_token()), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_root_with_valid_token_returns_greeting() {
        let app = setup().await;
        let token = app.admin_token().await;

        let (status, body) = app.request(Method::GET, "/api", Some(&token), None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "Message": "Hello World!" }));
    }

    #[tokio::test]
    async fn test_regular_user_token_also_reaches_root() {
        let app = setup().await;
        let (_, token) = app.user("Ada", "ada@example.com").await;

        let (status, body) = app.request(Method::GET, "/api", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["Message"], "Hello World!");
    }

    #[tokio::test]
    async fn test_expired_token_is_rejected() {
        let app = setup().await;
        let admin = crate::db::find_user_by_email(&app.state.db, crate::tests::ADMIN_EMAIL)
            .await
            .unwrap()
            .unwrap();
        let token = new_token();
        crate::db::insert_session(&app.state.db, &hash_token(&token), admin.id, now_unix() - 1)
            .await
            .unwrap();

        let (status, _) = app.request(Method::GET, "/api", Some(&token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_cors_preflight_mirrors_any_origin_with_credentials() {
        let app = setup().await;

        let req = Request::builder()
            .method(Method::OPTIONS)
            .uri("/api")
            .header(header::ORIGIN, "https://brand.example.org")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "authorization,x-custom")
            .body(Body::empty())
            .unwrap();
        let (status, headers, _) = app.send(req).await;

        assert!(status.is_success());
        assert_eq!(headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), "https://brand.example.org");
        assert_eq!(headers.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(), "true");
        let allowed_headers = headers.get(header::ACCESS_CONTROL_ALLOW_HEADERS).unwrap().to_str().unwrap();
        assert!(allowed_headers.contains("authorization"));
        assert!(headers.get(header::ACCESS_CONTROL_ALLOW_METHODS).unwrap().to_str().unwrap().contains("GET"));
    }

    #[tokio::test]
    async fn test_cors_headers_on_simple_request() {
        let app = setup().await;

        let req = Request::builder()
            .uri("/healthz")
            .header(header::ORIGIN, "http://localhost:5173")
            .body(Body::empty())
            .unwrap();
        let (status, headers, _) = app.send(req).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), "http://localhost:5173");
    }

    #[tokio::test]
    async fn test_healthz_and_readyz() {
        let app = setup().await;

        let (status, body) = app.request(Method::GET, "/healthz", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!("ok"));

        let (status, body) = app.request(Method::GET, "/readyz", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!("ready"));
    }

    #[tokio::test]
    async fn test_version_endpoint() {
        let app = setup().await;

        let (status, body) = app.request(Method::GET, "/version", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["title"], "Feed AI API");
        assert_eq!(body["name"], env!("CARGO_PKG_NAME"));
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_metrics_count_logins() {
        let app = setup().await;
        app.admin_token().await;
        let (status, _) = app
            .request(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "email": crate::tests::ADMIN_EMAIL, "password": "nope-nope" })),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = app.request(Method::GET, "/metrics", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["logins_succeeded"], 1);
        assert_eq!(body["logins_failed"], 1);

        let req = Request::builder().uri("/metrics/prometheus").body(Body::empty()).unwrap();
        let (status, headers, body) = app.send(req).await;
        assert_eq!(status, StatusCode::OK);
        assert!(headers.get(header::CONTENT_TYPE).unwrap().to_str().unwrap().starts_with("text/plain"));
        assert!(body.as_str().unwrap().contains("feedai_logins_succeeded 1"));
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let app = setup().await;
        let (status, _) = app.request(Method::GET, "/api/nope", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
