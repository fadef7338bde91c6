use actix_web::{get, post, web, HttpResponse, HttpServer};
use bytes::Bytes;
use charla_core::{ChatError, ChatStream, Message, OllamaClient};
use futures_util::stream::{self, Stream};
use serde::Deserialize;
use serde_json::json;
use std::io::Write;

pub struct AppState {
    pub ollama: OllamaClient,
}

#[get("/health")]
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().body("Ok")
}

#[get("/api/models")]
pub async fn models(app_state: web::Data<AppState>) -> HttpResponse {
    match app_state.ollama.list_models().await {
        Ok(models) => HttpResponse::Ok().json(json!({ "models": models })),
        Err(err) => {
            log::error!("model listing failed: {}", err);
            HttpResponse::InternalServerError().json(json!({ "error": err.to_string() }))
        }
    }
}

/// Both fields are validated by hand so an incomplete body yields the JSON
/// error shape the client expects instead of the extractor's default reply.
#[derive(Deserialize)]
pub struct ChatApiRequest {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    messages: Option<Vec<Message>>,
}

#[post("/api/chat")]
pub async fn chat(
    req: web::Json<ChatApiRequest>,
    app_state: web::Data<AppState>,
) -> HttpResponse {
    let (model, messages) = match (req.0.model, req.0.messages) {
        (Some(model), Some(messages)) if !model.is_empty() && !messages.is_empty() => {
            (model, messages)
        }
        _ => {
            return HttpResponse::BadRequest()
                .json(json!({ "error": "model and messages are required" }));
        }
    };

    match app_state.ollama.chat_stream(&model, &messages).await {
        Ok(deltas) => HttpResponse::Ok()
            .content_type("text/plain; charset=utf-8")
            .streaming(delta_body(deltas)),
        Err(err @ ChatError::InvalidInput(_)) => {
            HttpResponse::BadRequest().json(json!({ "error": err.to_string() }))
        }
        Err(err) => {
            log::error!("chat relay failed: {}", err);
            HttpResponse::InternalServerError().json(json!({ "error": err.to_string() }))
        }
    }
}

/// Re-emit decoded deltas as a plain text body. A mid-stream upstream error
/// aborts the transfer; deltas already written to the socket stand.
fn delta_body(deltas: ChatStream) -> impl Stream<Item = Result<Bytes, actix_web::Error>> {
    stream::unfold(Some(deltas), |state| async move {
        let mut deltas = state?;
        match deltas.next_delta().await {
            Some(Ok(delta)) => Some((Ok(Bytes::from(delta)), Some(deltas))),
            Some(Err(err)) => {
                log::warn!("upstream stream interrupted: {}", err);
                Some((Err(actix_web::error::ErrorInternalServerError(err)), None))
            }
            None => None,
        }
    })
}

pub async fn startup(host: &str, port: u16, ollama_url: &str) -> std::io::Result<()> {
    let app_state = web::Data::new(AppState {
        ollama: OllamaClient::new(ollama_url),
    });

    // default level is info
    env_logger::Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} - {} - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter(None, log::LevelFilter::Info)
        .init();

    log::info!("listening on {}:{}, relaying to {}", host, port, ollama_url);

    HttpServer::new(move || {
        actix_web::App::new()
            .wrap(actix_web::middleware::Logger::default())
            .app_data(app_state.clone())
            .service(health)
            .service(models)
            .service(chat)
    })
    .bind((host, port))?
    .run()
    .await
}
