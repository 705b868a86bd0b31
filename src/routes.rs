use actix_web::{error, web};
use crate::auth_stores::SharedUserStore;
use crate::error::AppError;
use crate::handlers;
use crate::middleware::{RequireRole, SecureAuthentication};
use crate::services::auth::JwtManager;

/// Configures public authentication routes.
/// Mounted under the "/auth" scope in main.rs.
pub fn configure_public_auth_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/login", web::post().to(handlers::auth::login))
        .route("/refresh", web::post().to(handlers::auth::refresh))
        .route("/logout", web::post().to(handlers::auth::logout))
        .route("/register", web::post().to(handlers::auth::register));
}

/// Configures the "/api" scope: every route needs a valid access token.
///
/// `/api/me` is a read path and trusts the role claim, so a role change can
/// lag by at most one access-token lifetime. `/api/admin/*` re-reads the role
/// from the store on every request.
pub fn configure_api_routes(
    jwt: JwtManager,
    store: SharedUserStore,
) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        cfg.service(
            web::scope("/api")
                .wrap(SecureAuthentication::new(jwt))
                .service(
                    web::resource("/me")
                        .wrap(RequireRole::user())
                        .route(web::get().to(handlers::auth::get_user_info)),
                )
                .service(
                    web::scope("/admin")
                        .wrap(RequireRole::admin(store))
                        .route("/session", web::get().to(handlers::admin_handlers::get_admin_session)),
                ),
        );
    }
}

/// JSON extractor settings: malformed bodies become `BadRequest` in the
/// usual error shape.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(16 * 1024)
        .error_handler(|err, _req| {
            let message = match &err {
                error::JsonPayloadError::ContentType => "Expected a JSON body".to_string(),
                other => format!("Invalid request payload: {}", other),
            };
            AppError::BadRequest(message).into()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth_stores::{InMemoryUserStore, NewUser, UserStore};
    use crate::config::AuthConfig;
    use crate::models::auth_requests::TokenPair;
    use crate::models::role::{Role, UserId};
    use crate::security::password::hash_password;
    use crate::services::auth::SessionService;
    use actix_web::body::to_bytes;
    use actix_web::http::{header::AUTHORIZATION, StatusCode};
    use actix_web::{test, App};
    use chrono::{Duration, Utc};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use std::sync::Arc;

    // Runs a request and returns status + JSON body, whether the response
    // came from a handler or from a middleware error.
    macro_rules! send {
        ($app:expr, $req:expr) => {{
            match test::try_call_service(&$app, $req.to_request()).await {
                Ok(resp) => {
                    let status = resp.status();
                    let body = test::read_body(resp).await;
                    (status, serde_json::from_slice::<Value>(&body).unwrap_or(Value::Null))
                }
                Err(err) => {
                    let resp = err.error_response();
                    let status = resp.status();
                    let body = to_bytes(resp.into_body()).await.unwrap();
                    (status, serde_json::from_slice::<Value>(&body).unwrap_or(Value::Null))
                }
            }
        }};
    }

    fn jwt() -> JwtManager {
        JwtManager::new(&AuthConfig {
            jwt_secret: "routes-test-secret-routes-test-secret".to_string(),
            access_token_ttl_minutes: 15,
            refresh_token_ttl_days: 7,
        })
        .unwrap()
    }

    async fn seed(store: &InMemoryUserStore, email: &str, password: &str, role: Role) -> UserId {
        store
            .create_user(NewUser {
                email: email.to_string(),
                username: email.to_string(),
                password_hash: hash_password(password).unwrap(),
                role,
            })
            .await
            .unwrap()
            .id
    }

    macro_rules! app {
        ($jwt:expr, $store:expr) => {{
            let shared: SharedUserStore = $store.clone();
            test::init_service(
                App::new()
                    .app_data(json_config())
                    .app_data(web::Data::new(SessionService::new($jwt.clone(), shared.clone())))
                    .app_data(web::Data::from(shared.clone()))
                    .route("/health", web::get().to(handlers::health::health_check))
                    .service(web::scope("/auth").configure(configure_public_auth_routes))
                    .configure(configure_api_routes($jwt.clone(), shared)),
            )
            .await
        }};
    }

    fn bearer(token: &str) -> (actix_web::http::header::HeaderName, String) {
        (AUTHORIZATION, format!("Bearer {}", token))
    }

    fn pair_of(body: Value) -> TokenPair {
        serde_json::from_value(body).unwrap()
    }

    #[actix_web::test]
    async fn health_is_public() {
        let jwt = jwt();
        let store = Arc::new(InMemoryUserStore::new());
        let app = app!(jwt, store);

        let (status, body) = send!(app, test::TestRequest::get().uri("/health"));
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[actix_web::test]
    async fn admin_login_yields_admin_claims_and_wrong_secret_yields_nothing() {
        let jwt = jwt();
        let store = Arc::new(InMemoryUserStore::new());
        seed(&store, "a@x.com", "right-secret", Role::Admin).await;
        let app = app!(jwt, store);

        let (status, body) = send!(
            app,
            test::TestRequest::post()
                .uri("/auth/login")
                .set_json(json!({"identifier": "a@x.com", "secret": "right-secret"}))
        );
        assert_eq!(status, StatusCode::OK);
        let pair = pair_of(body);
        assert_eq!(jwt.parse_access_token(&pair.access_token).unwrap().role, Role::Admin);

        let (status, body) = send!(
            app,
            test::TestRequest::post()
                .uri("/auth/login")
                .set_json(json!({"email": "a@x.com", "password": "wrong-secret"}))
        );
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error_type"], "invalid_credentials");
        assert!(body.get("access_token").is_none());
    }

    #[actix_web::test]
    async fn user_token_on_admin_endpoint_is_forbidden() {
        let jwt = jwt();
        let store = Arc::new(InMemoryUserStore::new());
        let id = seed(&store, "u@x.com", "pw", Role::User).await;
        let app = app!(jwt, store);

        let token = jwt.issue_access_token(id, "u@x.com", Role::User).unwrap();
        let (status, body) = send!(
            app,
            test::TestRequest::get().uri("/api/admin/session").insert_header(bearer(&token))
        );
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error_type"], "forbidden");
    }

    #[actix_web::test]
    async fn admin_demotion_takes_effect_on_admin_routes_immediately() {
        let jwt = jwt();
        let store = Arc::new(InMemoryUserStore::new());
        let id = seed(&store, "a@x.com", "pw", Role::Admin).await;
        let app = app!(jwt, store);
        let token = jwt.issue_access_token(id, "a@x.com", Role::Admin).unwrap();

        let (status, body) = send!(
            app,
            test::TestRequest::get().uri("/api/admin/session").insert_header(bearer(&token))
        );
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["verified_role"], "admin");

        store.set_role(id, Role::User);
        let (status, _) = send!(
            app,
            test::TestRequest::get().uri("/api/admin/session").insert_header(bearer(&token))
        );
        assert_eq!(status, StatusCode::FORBIDDEN);

        // The claim-trusting read path still admits the token; the profile itself is current
        let (status, body) = send!(app, test::TestRequest::get().uri("/api/me").insert_header(bearer(&token)));
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["role"], "user");
    }

    #[actix_web::test]
    async fn admin_route_fails_closed_when_store_is_down() {
        let jwt = jwt();
        let store = Arc::new(InMemoryUserStore::new());
        let id = seed(&store, "a@x.com", "pw", Role::Admin).await;
        let app = app!(jwt, store);
        let token = jwt.issue_access_token(id, "a@x.com", Role::Admin).unwrap();

        store.set_unavailable(true);
        let (status, body) = send!(
            app,
            test::TestRequest::get().uri("/api/admin/session").insert_header(bearer(&token))
        );
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Internal server error");
    }

    #[actix_web::test]
    async fn expired_access_token_then_refresh() {
        let jwt = jwt();
        let store = Arc::new(InMemoryUserStore::new());
        let id = seed(&store, "a@x.com", "pw", Role::User).await;
        let app = app!(jwt, store);

        let expired = jwt
            .issue_access_token_at(id, "a@x.com", Role::User, Utc::now() - Duration::hours(1))
            .unwrap();
        let refresh_token = jwt.issue_refresh_token(id).unwrap();

        let (status, body) = send!(app, test::TestRequest::get().uri("/api/me").insert_header(bearer(&expired)));
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error_type"], "token_expired");

        let (status, body) = send!(
            app,
            test::TestRequest::post()
                .uri("/auth/refresh")
                .set_json(json!({"refresh_token": refresh_token}))
        );
        assert_eq!(status, StatusCode::OK);
        let pair = pair_of(body);

        let (status, body) = send!(
            app,
            test::TestRequest::get().uri("/api/me").insert_header(bearer(&pair.access_token))
        );
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["email"], "a@x.com");
    }

    #[actix_web::test]
    async fn refresh_reflects_promotion() {
        let jwt = jwt();
        let store = Arc::new(InMemoryUserStore::new());
        let id = seed(&store, "a@x.com", "pw", Role::User).await;
        let app = app!(jwt, store);

        let (_, body) = send!(
            app,
            test::TestRequest::post()
                .uri("/auth/login")
                .set_json(json!({"email": "a@x.com", "password": "pw"}))
        );
        let pair = pair_of(body);
        assert_eq!(jwt.parse_access_token(&pair.access_token).unwrap().role, Role::User);

        store.set_role(id, Role::Admin);
        let (status, body) = send!(
            app,
            test::TestRequest::post()
                .uri("/auth/refresh")
                .set_json(json!({"refresh_token": pair.refresh_token}))
        );
        assert_eq!(status, StatusCode::OK);
        assert_eq!(jwt.parse_access_token(&pair_of(body).access_token).unwrap().role, Role::Admin);
    }

    #[actix_web::test]
    async fn refresh_rejects_garbage_and_access_tokens() {
        let jwt = jwt();
        let store = Arc::new(InMemoryUserStore::new());
        let id = seed(&store, "a@x.com", "pw", Role::User).await;
        let app = app!(jwt, store);
        let access = jwt.issue_access_token(id, "a@x.com", Role::User).unwrap();

        for token in ["not-a-token".to_string(), access] {
            let (status, body) = send!(
                app,
                test::TestRequest::post()
                    .uri("/auth/refresh")
                    .set_json(json!({"refresh_token": token}))
            );
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(body["error_type"], "invalid_token");
        }
    }

    #[actix_web::test]
    async fn refresh_token_is_not_a_bearer_credential() {
        let jwt = jwt();
        let store = Arc::new(InMemoryUserStore::new());
        let id = seed(&store, "a@x.com", "pw", Role::User).await;
        let app = app!(jwt, store);
        let refresh_token = jwt.issue_refresh_token(id).unwrap();

        let (status, body) = send!(
            app,
            test::TestRequest::get().uri("/api/me").insert_header(bearer(&refresh_token))
        );
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error_type"], "invalid_token");
    }

    #[actix_web::test]
    async fn missing_bearer_is_unauthorized() {
        let jwt = jwt();
        let store = Arc::new(InMemoryUserStore::new());
        let app = app!(jwt, store);

        let (status, body) = send!(app, test::TestRequest::get().uri("/api/me"));
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error_type"], "unauthorized");
    }

    #[actix_web::test]
    async fn register_creates_plain_users_only() {
        let jwt = jwt();
        let store = Arc::new(InMemoryUserStore::new());
        let app = app!(jwt, store);

        let (status, body) = send!(
            app,
            test::TestRequest::post().uri("/auth/register").set_json(json!({
                "email": "new@x.com", "username": "newbie", "password": "pw", "role": "admin"
            }))
        );
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["role"], "user");
        assert!(body.get("password_hash").is_none());

        let (status, body) = send!(
            app,
            test::TestRequest::post().uri("/auth/register").set_json(json!({
                "email": "new@x.com", "username": "again", "password": "pw"
            }))
        );
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error_type"], "conflict");

        let (status, _) = send!(
            app,
            test::TestRequest::post()
                .uri("/auth/login")
                .set_json(json!({"email": "new@x.com", "password": "pw"}))
        );
        assert_eq!(status, StatusCode::OK);
    }

    #[actix_web::test]
    async fn malformed_body_is_bad_request() {
        let jwt = jwt();
        let store = Arc::new(InMemoryUserStore::new());
        let app = app!(jwt, store);

        let (status, body) = send!(
            app,
            test::TestRequest::post()
                .uri("/auth/login")
                .insert_header(("content-type", "application/json"))
                .set_payload("{not json")
        );
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error_type"], "bad_request");
    }

    #[actix_web::test]
    async fn logout_is_acknowledged() {
        let jwt = jwt();
        let store = Arc::new(InMemoryUserStore::new());
        let app = app!(jwt, store);

        let (status, body) = send!(app, test::TestRequest::post().uri("/auth/logout"));
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Logged out successfully");
    }
}
