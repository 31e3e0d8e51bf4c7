mod common;

use actix_web::http::{header, StatusCode};
use actix_web::{test, App};
use serde_json::{json, Value};

use common::{session_cookie, MultipartBody, TestEnv, PASSWORD, PNG};
use staffdesk_backend::configure;
use staffdesk_backend::db::SessionStore;
use staffdesk_backend::models::session::Session;
use staffdesk_backend::models::user::Role;

#[actix_web::test]
async fn employee_can_register_but_not_login() {
    let env = TestEnv::new();
    let app = test::init_service(App::new().app_data(env.state.clone()).configure(configure)).await;

    let req = test::TestRequest::post()
        .uri("/api/register")
        .set_json(json!({
            "name": "Evan Employee",
            "email": "evan@staffdesk.test",
            "password": "long-enough",
            "role": "employee",
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "success");
    assert_eq!(body["user"]["role"], "employee");
    assert!(body["user"].get("password").is_none());

    let req = test::TestRequest::post()
        .uri("/api/login")
        .set_json(json!({ "email": "evan@staffdesk.test", "password": "long-enough" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert!(session_cookie(&resp).is_none());
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Access denied. Only admin accounts can login.");
}

#[actix_web::test]
async fn register_validates_role_and_unique_email() {
    let env = TestEnv::new();
    env.seed_user("taken@staffdesk.test", Role::Client).await;
    let app = test::init_service(App::new().app_data(env.state.clone()).configure(configure)).await;

    let req = test::TestRequest::post()
        .uri("/api/register")
        .set_json(json!({
            "name": "Sneaky",
            "email": "root@staffdesk.test",
            "password": "long-enough",
            "role": "superadmin",
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Validation failed");
    assert_eq!(body["errors"]["role"][0], "The selected role is invalid.");

    let req = test::TestRequest::post()
        .uri("/api/register")
        .set_json(json!({
            "name": "Copy",
            "email": "taken@staffdesk.test",
            "password": "long-enough",
            "role": "client",
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["errors"]["email"][0], "The email has already been taken.");

    let req = test::TestRequest::post()
        .uri("/api/register")
        .set_json(json!({ "email": "not-an-email", "password": "short" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["errors"]["name"][0], "The name field is required.");
    assert_eq!(body["errors"]["email"][0], "The email field must be a valid email address.");
    assert_eq!(body["errors"]["password"][0], "The password field must be at least 8 characters.");
    assert_eq!(body["errors"]["role"][0], "The role field is required.");
}

#[actix_web::test]
async fn register_stores_avatar_and_serves_it() {
    let env = TestEnv::new();
    let app = test::init_service(App::new().app_data(env.state.clone()).configure(configure)).await;

    let (content_type, payload) = MultipartBody::new()
        .text("name", "Ava Admin")
        .text("email", "ava@staffdesk.test")
        .text("password", "long-enough")
        .text("role", "admin")
        .file("avatar", "me.png", "image/png", PNG)
        .finish();
    let req = test::TestRequest::post()
        .uri("/api/register")
        .insert_header((header::CONTENT_TYPE, content_type))
        .set_payload(payload)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;

    let avatar = body["user"]["avatar"].as_str().expect("avatar url").to_string();
    assert!(avatar.contains("/storage/avatars/"), "{avatar}");
    assert!(avatar.ends_with(".png"), "{avatar}");
    assert!(env.file_for(&avatar).exists());

    let path = url::Url::parse(&avatar).expect("absolute url").path().to_string();
    let req = test::TestRequest::get().uri(&path).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers().get(header::CONTENT_TYPE).unwrap(), "image/png");
    assert_eq!(test::read_body(resp).await.as_ref(), PNG);
}

#[actix_web::test]
async fn register_rejects_non_image_avatar() {
    let env = TestEnv::new();
    let app = test::init_service(App::new().app_data(env.state.clone()).configure(configure)).await;

    // A text file renamed to .png is judged by its content.
    for (file_name, mime, bytes) in [
        ("notes.txt", "text/plain", &b"just text"[..]),
        ("evil.png", "image/png", &b"this is just plain text, not an image"[..]),
    ] {
        let (content_type, payload) = MultipartBody::new()
            .text("name", "Ava Admin")
            .text("email", "ava@staffdesk.test")
            .text("password", "long-enough")
            .text("role", "admin")
            .file("avatar", file_name, mime, bytes)
            .finish();
        let req = test::TestRequest::post()
            .uri("/api/register")
            .insert_header((header::CONTENT_TYPE, content_type))
            .set_payload(payload)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY, "{file_name}");
        let body: Value = test::read_body_json(resp).await;
        assert!(body["errors"]["avatar"][0]
            .as_str()
            .unwrap()
            .starts_with("The avatar field must be a file of type"));
    }
    assert!(!env.storage_root().join("avatars").exists());
}

#[actix_web::test]
async fn bad_credentials_are_unauthorized() {
    let env = TestEnv::new();
    env.seed_user("admin@staffdesk.test", Role::Admin).await;
    let app = test::init_service(App::new().app_data(env.state.clone()).configure(configure)).await;

    for (email, password) in [
        ("admin@staffdesk.test", "wrong-password"),
        ("nobody@staffdesk.test", PASSWORD),
    ] {
        let req = test::TestRequest::post()
            .uri("/api/login")
            .set_json(json!({ "email": email, "password": password }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Invalid credentials");
    }

    let req = test::TestRequest::post()
        .uri("/api/login")
        .set_json(json!({ "password": PASSWORD }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[actix_web::test]
async fn login_regenerates_the_session() {
    let env = TestEnv::new();
    let admin = env.seed_user("admin@staffdesk.test", Role::Admin).await;
    let old = env.sign_in(&admin).await;
    let app = test::init_service(App::new().app_data(env.state.clone()).configure(configure)).await;

    let req = test::TestRequest::post()
        .uri("/api/login")
        .cookie(old.clone())
        .set_json(json!({ "email": "admin@staffdesk.test", "password": PASSWORD }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let fresh = session_cookie(&resp).expect("session cookie");
    assert_ne!(fresh.value(), old.value());
    assert!(fresh.http_only().unwrap_or(false));
    assert!(fresh.max_age().is_none());
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["user"]["email"], "admin@staffdesk.test");
    assert!(body["user"].get("password").is_none());

    let req = test::TestRequest::get().uri("/api/user").cookie(old).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::get().uri("/api/user").cookie(fresh).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["user"]["id"], admin.id);
}

#[actix_web::test]
async fn login_sweeps_expired_sessions() {
    let env = TestEnv::new();
    let admin = env.seed_user("admin@staffdesk.test", Role::Admin).await;
    let now = chrono::Utc::now();
    env.state
        .store
        .insert_session(&Session {
            token: "long-gone".into(),
            user_id: admin.id,
            created_at: now - chrono::Duration::days(3),
            expires_at: now - chrono::Duration::days(1),
        })
        .await
        .unwrap();
    let app = test::init_service(App::new().app_data(env.state.clone()).configure(configure)).await;

    let req = test::TestRequest::post()
        .uri("/api/login")
        .set_json(json!({ "email": "admin@staffdesk.test", "password": PASSWORD }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let fresh = session_cookie(&resp).expect("session cookie");

    assert!(env.state.store.find_session("long-gone").await.unwrap().is_none());
    assert!(env.state.store.find_session(fresh.value()).await.unwrap().is_some());
}

#[actix_web::test]
async fn remember_me_makes_the_cookie_persistent() {
    let env = TestEnv::new();
    env.seed_user("client@staffdesk.test", Role::Client).await;
    let app = test::init_service(App::new().app_data(env.state.clone()).configure(configure)).await;

    let req = test::TestRequest::post()
        .uri("/api/login")
        .set_json(json!({ "email": "client@staffdesk.test", "password": PASSWORD, "remember": true }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let cookie = session_cookie(&resp).expect("session cookie");
    assert_eq!(cookie.max_age(), Some(time::Duration::days(30)));
}

#[actix_web::test]
async fn logout_invalidates_the_session() {
    let env = TestEnv::new();
    let admin = env.seed_user("admin@staffdesk.test", Role::Admin).await;
    let cookie = env.sign_in(&admin).await;
    let app = test::init_service(App::new().app_data(env.state.clone()).configure(configure)).await;

    let req = test::TestRequest::post().uri("/api/logout").cookie(cookie.clone()).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::get().uri("/api/user").cookie(cookie).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn protected_routes_require_a_session() {
    let env = TestEnv::new();
    let app = test::init_service(App::new().app_data(env.state.clone()).configure(configure)).await;

    for uri in ["/api/user", "/api/employees", "/api/projects", "/api/projects/1"] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{uri}");
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Not authenticated");
    }

    let req = test::TestRequest::get()
        .uri("/api/user")
        .cookie(actix_web::cookie::Cookie::new("staffdesk_session", "forged-token"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn profile_update_changes_only_supplied_fields() {
    let env = TestEnv::new();
    env.seed_user("other@staffdesk.test", Role::Client).await;
    let me = env.seed_user("me@staffdesk.test", Role::Client).await;
    let cookie = env.sign_in(&me).await;
    let app = test::init_service(App::new().app_data(env.state.clone()).configure(configure)).await;

    let req = test::TestRequest::post()
        .uri("/api/user/update")
        .cookie(cookie.clone())
        .set_json(json!({ "name": "Renamed", "password": "" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["user"]["name"], "Renamed");
    assert_eq!(body["user"]["email"], "me@staffdesk.test");

    // An empty password leaves the old one in place.
    let req = test::TestRequest::post()
        .uri("/api/login")
        .set_json(json!({ "email": "me@staffdesk.test", "password": PASSWORD }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::post()
        .uri("/api/user/update")
        .cookie(cookie.clone())
        .set_json(json!({ "email": "other@staffdesk.test", "password": "short" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["errors"]["password"][0], "The password field must be at least 8 characters.");

    let req = test::TestRequest::post()
        .uri("/api/user/update")
        .cookie(cookie)
        .set_json(json!({ "email": "other@staffdesk.test" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["errors"]["email"][0], "The email has already been taken.");
}

#[actix_web::test]
async fn replacing_the_avatar_keeps_the_old_file() {
    let env = TestEnv::new();
    let me = env.seed_user("me@staffdesk.test", Role::Client).await;
    let cookie = env.sign_in(&me).await;
    let app = test::init_service(App::new().app_data(env.state.clone()).configure(configure)).await;

    let mut urls = Vec::new();
    for _ in 0..2 {
        let (content_type, payload) = MultipartBody::new()
            .file("avatar", "me.png", "image/png", PNG)
            .finish();
        let req = test::TestRequest::post()
            .uri("/api/user/update")
            .cookie(cookie.clone())
            .insert_header((header::CONTENT_TYPE, content_type))
            .set_payload(payload)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        urls.push(body["user"]["avatar"].as_str().expect("avatar url").to_string());
    }

    assert_ne!(urls[0], urls[1]);
    for url in &urls {
        assert!(env.file_for(url).exists(), "{url}");
    }
}
