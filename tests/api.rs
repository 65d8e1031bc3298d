//! Router-level tests that never reach the database: auth rejection,
//! fallbacks and the storage-free variant endpoints.

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use secrecy::ExposeSecret;
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;
use uuid::Uuid;

use marketplace::auth::{Role, TokenKeys};
use marketplace::{routes, AppState, Config};

const SECRET: &str = "integration-test-secret";

fn build_app() -> axum::Router {
    let config = Config::from_lookup(|key| match key {
        "DATABASE_URL" => Some("postgres://marketplace@localhost/unused".into()),
        "JWT_SECRET" => Some(SECRET.into()),
        _ => None,
    })
    .unwrap();
    let db = PgPoolOptions::new().connect_lazy(config.database_url.expose_secret()).unwrap();
    routes::router(AppState::new(db, config, None))
}

fn token(role: Role) -> String {
    TokenKeys::new(SECRET).issue(Uuid::now_v7(), role, vec![]).unwrap()
}

async fn body_json(resp: axum::http::Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, token: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header("authorization", format!("Bearer {token}"))
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn size_and_color() -> Value {
    json!([
        { "type": "Size", "options": [
            { "name": "S", "price": 0, "stock": 5 },
            { "name": "M", "price": 2, "stock": 3 },
        ]},
        { "type": "Color", "options": [
            { "name": "Red", "price": 1, "stock": 4 },
            { "name": "Blue", "price": 0, "stock": 1 },
        ]},
    ])
}

#[tokio::test]
async fn health_is_public() {
    let resp = build_app().oneshot(Request::get("/health").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["status"], "healthy");
}

#[tokio::test]
async fn unknown_route_is_json_404() {
    let resp = build_app().oneshot(Request::get("/api/nope").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body = body_json(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Route not found");
}

const ID: &str = "0190c2a4-7b1e-7000-8000-000000000001";

/// Every method and path that needs a bearer token.
fn protected_routes() -> Vec<(Method, String)> {
    let id = ID;
    vec![
        (Method::GET, "/api/users/profile".into()),
        (Method::PUT, "/api/users/profile".into()),
        (Method::PUT, "/api/users/change-password".into()),
        (Method::GET, "/api/admin/stats".into()),
        (Method::GET, "/api/admin/users".into()),
        (Method::POST, "/api/admin/users".into()),
        (Method::PUT, format!("/api/admin/users/{id}")),
        (Method::DELETE, format!("/api/admin/users/{id}")),
        (Method::GET, "/api/products/vendor".into()),
        (Method::POST, "/api/products".into()),
        (Method::PUT, format!("/api/products/{id}")),
        (Method::DELETE, format!("/api/products/{id}")),
        (Method::POST, format!("/api/products/{id}/rating")),
        (Method::POST, format!("/api/products/{id}/variants")),
        (Method::POST, "/api/variants/combinations".into()),
        (Method::POST, "/api/variants/skus".into()),
        (Method::POST, "/api/variants/export".into()),
        (Method::POST, "/api/variants/import".into()),
        (Method::POST, "/api/variants/options/parse".into()),
        (Method::POST, "/api/variants/shipping/quote".into()),
        (Method::GET, "/api/vendors/profile".into()),
        (Method::POST, "/api/orders".into()),
        (Method::GET, "/api/orders/vendor".into()),
        (Method::GET, "/api/orders/stats/overview".into()),
        (Method::GET, "/api/orders/recent".into()),
        (Method::GET, format!("/api/orders/{id}")),
        (Method::PATCH, format!("/api/orders/{id}/status")),
        (Method::POST, "/api/categories".into()),
        (Method::PUT, format!("/api/categories/{id}")),
        (Method::DELETE, format!("/api/categories/{id}")),
        (Method::POST, "/api/upload".into()),
        (Method::GET, "/ws".into()),
    ]
}

fn request(method: &Method, uri: &str, bearer: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method.clone()).uri(uri).header("content-type", "application/json");
    if let Some(token) = bearer {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::from("{}")).unwrap()
}

#[tokio::test]
async fn protected_routes_reject_missing_token() {
    let app = build_app();
    for (method, uri) in protected_routes() {
        let resp = app.clone().oneshot(request(&method, &uri, None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{method} {uri}");
        let body = body_json(resp).await;
        assert_eq!(body["success"], false, "{method} {uri}");
        assert_eq!(body["message"], "No token, authorization denied", "{method} {uri}");
    }
}

#[tokio::test]
async fn protected_routes_reject_bad_token() {
    let app = build_app();
    let forged = TokenKeys::new("some-other-secret").issue(Uuid::now_v7(), Role::Admin, vec![]).unwrap();
    for bad in ["garbage", forged.as_str()] {
        for (method, uri) in protected_routes() {
            let resp = app.clone().oneshot(request(&method, &uri, Some(bad))).await.unwrap();
            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{method} {uri}");
            assert_eq!(body_json(resp).await["message"], "Token is not valid", "{method} {uri}");
        }
    }

    let resp = app.oneshot(Request::get("/ws?token=garbage").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_routes_reject_non_admins() {
    let app = build_app();
    for role in [Role::User, Role::Vendor] {
        let req = Request::get("/api/admin/users")
            .header("authorization", format!("Bearer {}", token(role)))
            .body(Body::empty())
            .unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    let resp = app.oneshot(post_json("/api/categories", &token(Role::Vendor), json!({ "name": "Toys" }))).await.unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_without_permission_is_forbidden() {
    // a plain admin token with no permissions
    let req = Request::get("/api/admin/stats")
        .header("authorization", format!("Bearer {}", token(Role::Admin)))
        .body(Body::empty())
        .unwrap();
    let resp = build_app().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(resp).await["message"], "Access denied");
}

#[tokio::test]
async fn customers_cannot_create_products() {
    let body = json!({ "name": "Mug", "description": "Stoneware", "price": 12, "category": "Kitchen" });
    let resp = build_app().oneshot(post_json("/api/products", &token(Role::User), body)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn combinations_endpoint() {
    let body = json!({ "productName": "Tee", "types": size_and_color() });
    let resp = build_app().oneshot(post_json("/api/variants/combinations", &token(Role::Vendor), body)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["count"], 4);
    let first = &body["combinations"][0];
    assert_eq!(first["selections"], json!([{ "type": "Size", "option": "S" }, { "type": "Color", "option": "Red" }]));
    assert_eq!(first["price"], 1.0);
    assert_eq!(first["stock"], 4);
    let last = &body["combinations"][3];
    assert_eq!(last["price"], 2.0);
    assert_eq!(last["stock"], 1);
}

#[tokio::test]
async fn too_many_combinations_is_unprocessable() {
    let options: Vec<Value> = (0..101).map(|i| json!({ "name": format!("o{i}"), "price": 0, "stock": 1 })).collect();
    let types = json!([{ "type": "A", "options": options }, { "type": "B", "options": options }]);
    let resp = build_app()
        .oneshot(post_json("/api/variants/combinations", &token(Role::Vendor), json!({ "types": types })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn csv_export_then_import() {
    let app = build_app();
    let vendor = token(Role::Vendor);
    let resp = app
        .clone()
        .oneshot(post_json("/api/variants/export?format=csv", &vendor, json!({ "types": size_and_color() })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers()["content-type"].to_str().unwrap().starts_with("text/csv"));
    let csv = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();

    let req = Request::post("/api/variants/import?format=csv")
        .header("authorization", format!("Bearer {vendor}"))
        .header("content-type", "text/csv")
        .body(Body::from(csv))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let types = &body_json(resp).await["types"];
    assert_eq!(types[0]["type"], "Size");
    assert_eq!(types[1]["type"], "Color");
    assert_eq!(types[0]["options"][1]["name"], "M");
    assert_eq!(types[1]["options"][0]["stock"], 4);
}

#[tokio::test]
async fn malformed_import_names_the_row() {
    let req = Request::post("/api/variants/import?format=csv")
        .header("authorization", format!("Bearer {}", token(Role::Vendor)))
        .body(Body::from("type,name,price,stock\nSize,S,1,2\nSize,,1,2\n"))
        .unwrap();
    let resp = build_app().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let message = body_json(resp).await["message"].as_str().unwrap().to_string();
    assert!(message.starts_with("Row 2"), "{message}");
}

#[tokio::test]
async fn sku_modes() {
    let body = json!({ "productName": "Mug", "types": size_and_color() });
    let resp = build_app()
        .oneshot(post_json("/api/variants/skus?mode=numbered", &token(Role::Vendor), body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["assigned"], 4);
    assert_eq!(body["types"][1]["options"][1]["sku"], "mug-var004");
    assert_eq!(body["types"][1]["options"][1]["barcode"], "mug-var004");
}

#[tokio::test]
async fn oversized_shipping_quote_is_bad_request() {
    let body = json!({ "zone": "zone1", "weight": 1e28, "additionalCost": 7.9e28 });
    let resp = build_app()
        .oneshot(post_json("/api/variants/shipping/quote", &token(Role::User), body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["message"], "Shipping cost is too large");
}
