//! HTTP front end for a single user.
//!
//! The session behind `/session` and `/clear` belongs to the running process, not to
//! a client: every browser talking to the same server shares one conversation.
//! Run one server per user.

use actix_web::{get, post, web, App, HttpResponse, HttpServer, Responder};
use serde::{Deserialize, Serialize};

use crate::conversation::ConversationTurn;
use crate::engine::ChatEngine;
use crate::settings::ServerSettings;

#[derive(Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Serialize)]
struct HistoryResponse {
    turns: Vec<ConversationTurn>,
    total: usize,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[get("/")]
async fn index() -> impl Responder {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(include_str!("index.html"))
}

#[post("/chat")]
async fn chat_endpoint(
    req: web::Json<ChatRequest>,
    engine: web::Data<ChatEngine>,
) -> impl Responder {
    HttpResponse::Ok().json(engine.chat(&req.message))
}

#[get("/session")]
async fn session_endpoint(engine: web::Data<ChatEngine>) -> impl Responder {
    HttpResponse::Ok().json(engine.session())
}

#[get("/history")]
async fn history_endpoint(engine: web::Data<ChatEngine>) -> impl Responder {
    match engine.history() {
        Ok(turns) => HttpResponse::Ok().json(HistoryResponse {
            total: turns.len(),
            turns,
        }),
        Err(e) => {
            log::error!("Cannot read conversation history: {}", e);
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: e.to_string(),
            })
        }
    }
}

#[post("/clear")]
async fn clear_endpoint(engine: web::Data<ChatEngine>) -> impl Responder {
    match engine.clear_history() {
        Ok(()) => HttpResponse::NoContent().finish(),
        Err(e) => {
            log::error!("Cannot clear conversation history: {}", e);
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: e.to_string(),
            })
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(index)
        .service(chat_endpoint)
        .service(session_endpoint)
        .service(history_endpoint)
        .service(clear_endpoint);
}

pub async fn run(engine: ChatEngine, settings: &ServerSettings) -> std::io::Result<()> {
    let data = web::Data::new(engine);
    log::info!("Starting server at http://{}:{}", settings.host, settings.port);
    HttpServer::new(move || App::new().app_data(data.clone()).configure(configure))
        .bind((settings.host.as_str(), settings.port))?
        .run()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{record, Catalog};
    use crate::conversation::MemoryConversationLog;
    use crate::model::{IntentModel, ModelConfig};
    use actix_web::http::StatusCode;
    use actix_web::test;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn engine() -> web::Data<ChatEngine> {
        let catalog = Catalog::from_records(vec![
            record("greeting", &["hi", "hello"], &["Hey there!"]),
            record("fallback", &["??"], &["I don't understand."]),
        ])
        .unwrap();
        let model = IntentModel::train(&catalog, &ModelConfig::default()).unwrap();
        web::Data::new(ChatEngine::new(
            catalog,
            model,
            StdRng::seed_from_u64(0),
            Box::new(MemoryConversationLog::new()),
        ))
    }

    #[actix_web::test]
    async fn chat_then_history() {
        let engine = engine();
        let app =
            test::init_service(App::new().app_data(engine.clone()).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/chat")
            .set_json(serde_json::json!({ "message": "hello" }))
            .to_request();
        let reply: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(reply["response"], "Hey there!");
        assert_eq!(reply["persisted"], true);

        let req = test::TestRequest::get().uri("/history").to_request();
        let history: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(history["total"], 1);
        assert_eq!(history["turns"][0]["input"], "hello");

        let req = test::TestRequest::get().uri("/session").to_request();
        let session: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(session.as_array().unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn clear_empties_history() {
        let engine = engine();
        engine.chat("hi");
        let app =
            test::init_service(App::new().app_data(engine.clone()).configure(configure)).await;

        let req = test::TestRequest::post().uri("/clear").to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert!(engine.session().is_empty());
        assert!(engine.history().unwrap().is_empty());
    }

    #[actix_web::test]
    async fn every_client_shares_the_process_session() {
        let engine = engine();
        let app =
            test::init_service(App::new().app_data(engine.clone()).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/chat")
            .peer_addr("10.0.0.1:5000".parse().unwrap())
            .set_json(serde_json::json!({ "message": "hello" }))
            .to_request();
        test::call_service(&app, req).await;

        let req = test::TestRequest::get()
            .uri("/session")
            .peer_addr("10.0.0.2:5000".parse().unwrap())
            .to_request();
        let session: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(session[0]["input"], "hello");

        let req = test::TestRequest::post()
            .uri("/clear")
            .peer_addr("10.0.0.2:5000".parse().unwrap())
            .to_request();
        test::call_service(&app, req).await;
        assert!(engine.session().is_empty());
    }

    #[actix_web::test]
    async fn index_serves_html() {
        let app = test::init_service(App::new().app_data(engine()).configure(configure)).await;

        let req = test::TestRequest::get().uri("/").to_request();
        let resp = test::call_service(&app, req).await;

        assert!(resp.status().is_success());
    }
}
