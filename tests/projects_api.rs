mod common;

use actix_web::http::{header, StatusCode};
use actix_web::{test, App};
use serde_json::{json, Value};

use common::{MultipartBody, TestEnv, PDF, PNG};
use staffdesk_backend::configure;
use staffdesk_backend::models::user::Role;

fn project_form() -> MultipartBody {
    MultipartBody::new()
        .text("client_name", "Acme Corp")
        .text("project_name", "Rocket Skates")
        .text("client_email", "wile@acme.test")
        .text("link", "https://acme.test/skates")
        .text("client_password", "roadrunner")
}

#[actix_web::test]
async fn project_lifecycle_with_documents() {
    let env = TestEnv::new();
    let client = env.seed_user("client@staffdesk.test", Role::Client).await;
    let cookie = env.sign_in(&client).await;
    let app = test::init_service(App::new().app_data(env.state.clone()).configure(configure)).await;

    let (content_type, payload) = project_form()
        .file("documents[]", "brief.pdf", "application/pdf", PDF)
        .file("documents[]", "mockup.png", "image/png", PNG)
        .finish();
    let req = test::TestRequest::post()
        .uri("/api/projects")
        .cookie(cookie.clone())
        .insert_header((header::CONTENT_TYPE, content_type))
        .set_payload(payload)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    let project = &body["project"];
    assert_eq!(project["project_name"], "Rocket Skates");
    assert_eq!(project["creator"]["id"], client.id);
    assert!(project.get("client_password").is_none());

    let documents = project["documents"].as_array().unwrap();
    assert_eq!(documents.len(), 2);
    let mut files = Vec::new();
    for document in documents {
        let url = document["file_path"].as_str().unwrap().to_string();
        assert!(url.contains("/storage/project_documents/"), "{url}");
        assert!(env.file_for(&url).exists());
        files.push(env.file_for(&url));
    }
    let pdf = documents.iter().find(|d| d["file_name"] == "brief.pdf").unwrap();
    assert_eq!(pdf["file_type"], "pdf");
    assert_eq!(pdf["mime_type"], "application/pdf");
    assert_eq!(pdf["file_size"], PDF.len());
    assert!(pdf["file_path"].as_str().unwrap().ends_with("_brief.pdf"));
    let png = documents.iter().find(|d| d["file_name"] == "mockup.png").unwrap();
    assert_eq!(png["file_type"], "image");

    let uri = format!("/api/projects/{}", project["id"]);
    let req = test::TestRequest::delete().uri(&uri).cookie(cookie.clone()).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    for file in &files {
        assert!(!file.exists(), "{} survived", file.display());
    }

    let req = test::TestRequest::get().uri(&uri).cookie(cookie.clone()).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Project not found");

    let req = test::TestRequest::get().uri("/api/projects").cookie(cookie).to_request();
    let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert!(body["projects"].as_array().unwrap().is_empty());
}

#[actix_web::test]
async fn update_appends_documents_and_clears_link() {
    let env = TestEnv::new();
    let admin = env.seed_user("admin@staffdesk.test", Role::Admin).await;
    let cookie = env.sign_in(&admin).await;
    let app = test::init_service(App::new().app_data(env.state.clone()).configure(configure)).await;

    let (content_type, payload) = project_form()
        .file("documents[]", "brief.pdf", "application/pdf", PDF)
        .finish();
    let req = test::TestRequest::post()
        .uri("/api/projects")
        .cookie(cookie.clone())
        .insert_header((header::CONTENT_TYPE, content_type))
        .set_payload(payload)
        .to_request();
    let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
    let uri = format!("/api/projects/{}", body["project"]["id"]);

    let (content_type, payload) = MultipartBody::new()
        .text("project_name", "Rocket Skates II")
        .text("link", "")
        .file("documents[]", "sketch.png", "image/png", PNG)
        .finish();
    let req = test::TestRequest::put()
        .uri(&uri)
        .cookie(cookie.clone())
        .insert_header((header::CONTENT_TYPE, content_type))
        .set_payload(payload)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    let project = &body["project"];
    assert_eq!(project["project_name"], "Rocket Skates II");
    assert_eq!(project["client_name"], "Acme Corp");
    assert_eq!(project["link"], Value::Null);
    assert_eq!(project["documents"].as_array().unwrap().len(), 2);

    let req = test::TestRequest::put()
        .uri(&uri)
        .cookie(cookie)
        .set_json(json!({ "link": "not a url", "client_password": "abc", "client_email": "" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["errors"]["link"][0], "The link field must be a valid URL.");
    assert_eq!(body["errors"]["client_password"][0], "The client password field must be at least 6 characters.");
    assert!(body["errors"]["client_email"]
        .as_array()
        .unwrap()
        .contains(&json!("The client email field is required.")));
}

#[actix_web::test]
async fn create_rejects_bad_input_and_file_types() {
    let env = TestEnv::new();
    let admin = env.seed_user("admin@staffdesk.test", Role::Admin).await;
    let cookie = env.sign_in(&admin).await;
    let app = test::init_service(App::new().app_data(env.state.clone()).configure(configure)).await;

    let (content_type, payload) = MultipartBody::new()
        .text("client_name", "Acme Corp")
        .text("client_email", "nope")
        .text("client_password", "abc")
        .file("documents[]", "brief.pdf", "application/pdf", PDF)
        .file("documents[]", "script.sh", "text/x-shellscript", b"#!/bin/sh\nrm -rf /\n")
        .finish();
    let req = test::TestRequest::post()
        .uri("/api/projects")
        .cookie(cookie.clone())
        .insert_header((header::CONTENT_TYPE, content_type))
        .set_payload(payload)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = test::read_body_json(resp).await;
    let errors = &body["errors"];
    assert_eq!(errors["project_name"][0], "The project name field is required.");
    assert_eq!(errors["client_email"][0], "The client email field must be a valid email address.");
    assert_eq!(errors["client_password"][0], "The client password field must be at least 6 characters.");
    assert!(errors.get("documents.0").is_none());
    assert!(errors["documents.1"][0].as_str().unwrap().contains("must be a file of type"));

    // Nothing was written.
    assert!(!env.storage_root().join("project_documents").exists());
    let req = test::TestRequest::get().uri("/api/projects").cookie(cookie).to_request();
    let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert!(body["projects"].as_array().unwrap().is_empty());
}

#[actix_web::test]
async fn documents_are_deleted_individually() {
    let env = TestEnv::new();
    let admin = env.seed_user("admin@staffdesk.test", Role::Admin).await;
    let cookie = env.sign_in(&admin).await;
    let app = test::init_service(App::new().app_data(env.state.clone()).configure(configure)).await;

    let (content_type, payload) = project_form()
        .file("documents[]", "brief.pdf", "application/pdf", PDF)
        .file("documents[]", "mockup.png", "image/png", PNG)
        .finish();
    let req = test::TestRequest::post()
        .uri("/api/projects")
        .cookie(cookie.clone())
        .insert_header((header::CONTENT_TYPE, content_type))
        .set_payload(payload)
        .to_request();
    let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
    let project_id = body["project"]["id"].as_i64().unwrap();
    let document = body["project"]["documents"][0].clone();
    let document_id = document["id"].as_i64().unwrap();
    let file = env.file_for(document["file_path"].as_str().unwrap());
    assert!(file.exists());

    let wrong_project = format!("/api/projects/{}/documents/{}", project_id + 1, document_id);
    let req = test::TestRequest::delete().uri(&wrong_project).cookie(cookie.clone()).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Document not found");

    let uri = format!("/api/projects/{project_id}/documents/{document_id}");
    let req = test::TestRequest::delete().uri(&uri).cookie(cookie.clone()).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    assert!(!file.exists());

    let req = test::TestRequest::delete().uri(&uri).cookie(cookie.clone()).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::get()
        .uri(&format!("/api/projects/{project_id}"))
        .cookie(cookie)
        .to_request();
    let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
    let remaining = body["project"]["documents"].as_array().unwrap();
    assert_eq!(remaining.len(), 1);
    assert_ne!(remaining[0]["id"], document_id);
}

#[actix_web::test]
async fn every_role_may_manage_projects() {
    let env = TestEnv::new();
    let app = test::init_service(App::new().app_data(env.state.clone()).configure(configure)).await;

    for (n, role) in [Role::Admin, Role::SuperAdmin, Role::Employee, Role::Client].into_iter().enumerate() {
        let user = env.seed_user(&format!("u{n}@staffdesk.test"), role).await;
        let cookie = env.sign_in(&user).await;
        let req = test::TestRequest::post()
            .uri("/api/projects")
            .cookie(cookie)
            .set_json(json!({
                "client_name": "Acme Corp",
                "project_name": format!("Project {n}"),
                "client_email": "wile@acme.test",
                "client_password": "roadrunner",
            }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED, "{role}");
    }
}

#[actix_web::test]
async fn storage_refuses_traversal_and_missing_files() {
    let env = TestEnv::new();
    std::fs::create_dir_all(env.storage_root()).unwrap();
    std::fs::write(env.dir.path().join("secret.txt"), b"top secret").unwrap();
    let app = test::init_service(App::new().app_data(env.state.clone()).configure(configure)).await;

    for uri in [
        "/storage/../secret.txt",
        "/storage/avatars/../../secret.txt",
        "/storage/avatars/missing.png",
    ] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{uri}");
    }
}
