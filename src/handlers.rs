// src/handlers.rs
use crate::{
    AppContext,
    errors::SnapcodeError,
    models::*,
    prompts,
    services::{DebugFileWriter, debug_writer::extract_html_content},
};
use actix_web::{Error, HttpResponse, web};
use bytes::Bytes;
use log::{error, info};
use serde::Deserialize;
use std::path::Path;
use std::time::Instant;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Screenshots arrive inline as data URLs.
const MAX_JSON_BYTES: usize = 20 * 1024 * 1024;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateCodeRequest {
    #[serde(flatten)]
    pub generation: FullGenerationSettings,
    #[serde(default)]
    pub code_generation_model: Option<String>,
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .limit(MAX_JSON_BYTES)
            .error_handler(|err, _req| SnapcodeError::Validation(err.to_string()).into()),
    )
    // A generation id that is not a uuid cannot name a stored generation
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _req| SnapcodeError::NotFound(err.to_string()).into()),
    )
    .service(
        web::scope("/api/v1")
            .route("/generate-code", web::post().to(generate_code))
            .route("/generations", web::get().to(list_generations))
            .route("/generations/{generation_id}", web::get().to(get_generation)),
    )
    .route("/health", web::get().to(health_check));
}

pub async fn generate_code(
    body: web::Json<GenerateCodeRequest>,
    data: web::Data<AppContext>,
) -> Result<HttpResponse, Error> {
    let request = body.into_inner();
    let model = match &request.code_generation_model {
        Some(name) => name
            .parse::<Llm>()
            .map_err(|e| SnapcodeError::InvalidModel(e.to_string()))?,
        None => data.config.default_model,
    };
    let (params, settings) = request.generation.into_parts();

    // Reject bad input before any bytes are streamed back
    data.image_processor.validate_data_url(&params.image)?;
    if let Some(result_image) = &params.result_image {
        data.image_processor.validate_data_url(result_image)?;
    }
    let stack = settings.generated_code_config;
    let messages = prompts::assemble_prompt(&params, stack)?;
    let provider = data.llm_service.provider_for(model, &settings)?;

    let generation_id = Uuid::new_v4();
    let generation_type = params.generation_type;
    info!(
        "Generation {} started: {} {} via {} ({})",
        generation_id,
        generation_type,
        stack,
        provider.name(),
        model
    );

    let (tx, rx) = mpsc::unbounded_channel::<Result<Bytes, SnapcodeError>>();
    let ctx = data.clone();

    actix_web::rt::spawn(async move {
        let start = Instant::now();
        let on_chunk = |chunk: &str| {
            // The client may have gone away; keep generating so the result is stored.
            let _ = tx.send(Ok(Bytes::copy_from_slice(chunk.as_bytes())));
        };

        let completion = match provider.stream_completion(model, &messages, &on_chunk).await {
            Ok(completion) => completion,
            Err(e) => {
                error!("Generation {} failed: {}", generation_id, e);
                let _ = tx.send(Err(e));
                return;
            }
        };

        let record = GenerationRecord {
            id: generation_id,
            generation_type,
            stack,
            model,
            code: extract_html_content(&completion),
            processing_time_ms: start.elapsed().as_millis() as u64,
            created_at: chrono::Utc::now(),
        };

        if ctx.config.debug_enabled {
            if let Err(e) =
                write_debug_artifacts(&ctx.config.debug_dir, &record, &completion).await
            {
                error!("Generation {}: {}", generation_id, e);
            }
        }

        match ctx.redis_service.store_generation(&record).await {
            Ok(()) => info!(
                "Generation {} finished in {}ms",
                generation_id, record.processing_time_ms
            ),
            Err(e) => error!("Generation {} could not be stored: {}", generation_id, e),
        }
    });

    let body = futures_util::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|item| (item, rx))
    });

    Ok(HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .insert_header(("x-generation-id", generation_id.to_string()))
        .streaming(body))
}

async fn write_debug_artifacts(
    dir: &Path,
    record: &GenerationRecord,
    completion: &str,
) -> Result<(), SnapcodeError> {
    let writer = DebugFileWriter::new(dir).await?;
    writer
        .write_to_file(&format!("{}.html", record.id), &record.code)
        .await?;
    writer.write_to_file("full_stream.txt", completion).await
}

pub async fn get_generation(
    path: web::Path<Uuid>,
    data: web::Data<AppContext>,
) -> Result<HttpResponse, Error> {
    let generation_id = path.into_inner();

    let record = data.redis_service.get_generation(&generation_id).await?;

    Ok(HttpResponse::Ok().json(&record))
}

pub async fn list_generations(data: web::Data<AppContext>) -> Result<HttpResponse, Error> {
    let generations = data.redis_service.recent_generations().await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "count": generations.len(),
        "generations": generations
    })))
}

pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "snapcode",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::services::image_processor::tests::png_data_url;
    use crate::services::{ImageProcessor, LLMService, RedisService};
    use actix_web::{App, http::StatusCode, test};
    use serde_json::{Value, json};
    use std::sync::Arc;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn context(config: Config) -> AppContext {
        AppContext {
            redis_service: Arc::new(RedisService::open("redis://127.0.0.1:1").unwrap()),
            llm_service: Arc::new(LLMService::new(&config)),
            image_processor: Arc::new(ImageProcessor::new()),
            config: Arc::new(config),
        }
    }

    fn request_body(image: &str, extra: Value) -> Value {
        let mut body = serde_json::to_value(FullGenerationSettings::new(
            CodeGenerationParams::create(image),
            Settings::default(),
        ))
        .unwrap();
        if let (Some(body), Some(extra)) = (body.as_object_mut(), extra.as_object()) {
            body.extend(extra.clone());
        }
        body
    }

    async fn post(config: Config, body: Value) -> (StatusCode, Bytes) {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(context(config)))
                .configure(routes),
        )
        .await;
        let req = test::TestRequest::post()
            .uri("/api/v1/generate-code")
            .set_json(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        let status = resp.status();
        (status, test::read_body(resp).await)
    }

    #[actix_web::test]
    async fn health_reports_service_name() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(context(Config::default())))
                .configure(routes),
        )
        .await;
        let req = test::TestRequest::get().uri("/health").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "snapcode");
    }

    #[actix_web::test]
    async fn malformed_generation_id_is_not_found() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(context(Config::default())))
                .configure(routes),
        )
        .await;
        let req = test::TestRequest::get()
            .uri("/api/v1/generations/not-a-uuid")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let error: Value = test::read_body_json(resp).await;
        assert_eq!(error["error"], "Not found");
    }

    #[actix_web::test]
    async fn unknown_model_is_rejected() {
        let body = request_body(
            &png_data_url(4, 4),
            json!({"codeGenerationModel": "gpt-2"}),
        );
        let (status, bytes) = post(Config::default(), body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let error: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(error["error"], "Invalid model");
    }

    #[actix_web::test]
    async fn malformed_screenshot_is_rejected() {
        let (status, bytes) =
            post(Config::default(), request_body("https://example.com/x.png", json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let error: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(error["error"], "Image processing error");
    }

    #[actix_web::test]
    async fn unknown_generation_type_is_a_validation_error() {
        let mut body = request_body(&png_data_url(4, 4), json!({}));
        body["generationType"] = json!("delete");
        let (status, bytes) = post(Config::default(), body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let error: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(error["error"], "Validation error");
    }

    #[actix_web::test]
    async fn missing_api_key_is_unauthorized() {
        let (status, _) = post(Config::default(), request_body(&png_data_url(4, 4), json!({}))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn streams_completion_text_to_the_client() {
        let server = MockServer::start().await;
        let sse = concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"<html>\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"</html>\"}}]}\n\n",
            "data: [DONE]\n\n"
        );
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(sse, "text/event-stream"))
            .mount(&server)
            .await;

        let body = request_body(
            &png_data_url(4, 4),
            json!({
                "openAiApiKey": "sk-user",
                "openAiBaseURL": server.uri(),
                "codeGenerationModel": "gpt_4_vision"
            }),
        );
        let (status, bytes) = post(Config::default(), body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(bytes, Bytes::from_static(b"<html></html>"));
    }
}
