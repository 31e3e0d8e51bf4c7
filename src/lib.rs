pub mod allocator;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod state;
pub mod storage;
pub mod utils;

use actix_web::web;

/// Registers every route. Shared by the server binary and the HTTP tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(web::resource("/register").route(web::post().to(handlers::auth::register)))
            .service(web::resource("/login").route(web::post().to(handlers::auth::login)))
            .service(web::resource("/logout").route(web::post().to(handlers::auth::logout)))
            .service(web::resource("/user").route(web::get().to(handlers::user::me)))
            .service(web::resource("/user/update").route(web::post().to(handlers::user::update_profile)))
            .service(
                web::resource("/employees")
                    .route(web::get().to(handlers::employee::list_employees))
                    .route(web::post().to(handlers::employee::create_employee)),
            )
            .service(
                web::resource("/employees/{id}")
                    .route(web::get().to(handlers::employee::get_employee))
                    .route(web::put().to(handlers::employee::update_employee))
                    .route(web::delete().to(handlers::employee::delete_employee)),
            )
            .service(
                web::resource("/projects")
                    .route(web::get().to(handlers::project::list_projects))
                    .route(web::post().to(handlers::project::create_project)),
            )
            .service(
                web::resource("/projects/{id}")
                    .route(web::get().to(handlers::project::get_project))
                    .route(web::put().to(handlers::project::update_project))
                    .route(web::delete().to(handlers::project::delete_project)),
            )
            .service(
                web::resource("/projects/{project_id}/documents/{document_id}")
                    .route(web::delete().to(handlers::project::delete_document)),
            ),
    )
    .service(web::resource("/storage/{path:.*}").route(web::get().to(handlers::storage::serve_file)));
}
