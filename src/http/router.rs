use crate::features::attachments::AttachmentCandidate;
use crate::features::auth::gate::extract_bearer_token;
use crate::features::auth::models::Principal;
use crate::features::bills::models::{CreateBillDto, UpdateBillDto};
use crate::http::AppContext;
use crate::shared::errors::AppError;
use base64::{engine::general_purpose, Engine as _};
use http_body_util::{BodyExt, Full};
use hyper::body::{Body, Bytes};
use hyper::{header, Method, Request, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;

/// 申請作成リクエストのワイヤ形式
///
/// 添付ファイルは`file`フィールドにBase64で同梱される
#[derive(Debug, Deserialize)]
struct CreateBillRequest {
    #[serde(flatten)]
    dto: CreateBillDto,
    file: Option<FilePart>,
}

/// リクエストに同梱されるファイル
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FilePart {
    name: String,
    content_type: String,
    /// Base64エンコードされたファイル内容
    data: String,
}

impl FilePart {
    fn into_candidate(self) -> Result<AttachmentCandidate, AppError> {
        let data = general_purpose::STANDARD
            .decode(&self.data)
            .map_err(|_| AppError::validation("ファイル内容のBase64デコードに失敗しました"))?;

        Ok(AttachmentCandidate {
            file_name: self.name,
            content_type: self.content_type,
            data,
        })
    }
}

/// HTTPリクエストを処理する
///
/// # 引数
/// * `req` - HTTPリクエスト
/// * `ctx` - 共有コンテキスト
pub async fn route<B>(
    req: Request<B>,
    ctx: Arc<AppContext>,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body,
    B::Error: std::fmt::Display,
{
    log::debug!("リクエストを受信: {} {}", req.method(), req.uri());

    let (parts, body) = req.into_parts();

    // トークンが添えられていれば主体を解決する。不正なトークンは
    // ここで弾き、トークンなしは各操作の認証要求に委ねる
    let auth_header = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    let principal = match extract_bearer_token(auth_header) {
        Some(token) => match ctx.gate.resolve(token) {
            Ok(principal) => Some(principal),
            Err(e) => return Ok(error_response(&e)),
        },
        None => None,
    };

    let path = parts.uri.path().trim_end_matches('/').to_string();
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    let response = match (&parts.method, segments.as_slice()) {
        (&Method::GET, ["health"]) => json_response(StatusCode::OK, &json!({"status": "ok"})),

        (&Method::POST, ["bills"]) => {
            match read_json::<CreateBillRequest, _>(body).await {
                Ok(request) => {
                    let file = match request.file.map(FilePart::into_candidate).transpose() {
                        Ok(file) => file,
                        Err(e) => return Ok(error_response(&e)),
                    };
                    handle_create(&ctx, principal.as_ref(), request.dto, file).await
                }
                Err(e) => error_response(&e),
            }
        }

        (&Method::GET, ["bills"]) => match ctx.bills.list(principal.as_ref()) {
            Ok(views) => json_response(StatusCode::OK, &views),
            Err(e) => error_response(&e),
        },

        (&Method::GET, ["bills", key]) => match ctx.bills.get(principal.as_ref(), key) {
            Ok(view) => json_response(StatusCode::OK, &view),
            Err(e) => error_response(&e),
        },

        (&Method::PUT, ["bills", key]) | (&Method::PATCH, ["bills", key]) => {
            match read_json::<UpdateBillDto, _>(body).await {
                Ok(dto) => match ctx.bills.update(principal.as_ref(), key, dto) {
                    Ok(bill) => json_response(StatusCode::OK, &bill),
                    Err(e) => error_response(&e),
                },
                Err(e) => error_response(&e),
            }
        }

        (&Method::DELETE, ["bills", key]) => match ctx.bills.remove(principal.as_ref(), key) {
            Ok(()) => json_response(
                StatusCode::OK,
                &json!({"message": format!("bill #{key} deleted")}),
            ),
            Err(e) => error_response(&e),
        },

        (&Method::GET, ["public", name]) => serve_public_file(&ctx, name).await,

        _ => {
            log::debug!("未対応のリクエスト: {} {}", parts.method, path);
            not_found_response()
        }
    };

    Ok(response)
}

/// 申請作成を処理する
async fn handle_create(
    ctx: &AppContext,
    principal: Option<&Principal>,
    dto: CreateBillDto,
    file: Option<AttachmentCandidate>,
) -> Response<Full<Bytes>> {
    match ctx.bills.create(principal, dto, file).await {
        Ok(created) => json_response(StatusCode::CREATED, &created),
        Err(e) => error_response(&e),
    }
}

/// ローカルストレージの保存ファイルを配信する
async fn serve_public_file(ctx: &AppContext, name: &str) -> Response<Full<Bytes>> {
    let Some(store) = &ctx.local_store else {
        return not_found_response();
    };

    match store.read(name).await {
        Ok(Some(data)) => Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, guess_content_type(name))
            .body(Full::new(Bytes::from(data)))
            .unwrap_or_else(|_| fallback_response()),
        Ok(None) => not_found_response(),
        Err(e) => error_response(&e),
    }
}

/// ファイル名の拡張子からContent-Typeを推定する
fn guess_content_type(name: &str) -> &'static str {
    let extension = std::path::Path::new(name)
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        _ => "application/octet-stream",
    }
}

/// リクエストボディをJSONとして読み取る
async fn read_json<T, B>(body: B) -> Result<T, AppError>
where
    T: serde::de::DeserializeOwned,
    B: Body,
    B::Error: std::fmt::Display,
{
    let bytes = body
        .collect()
        .await
        .map_err(|e| AppError::validation(format!("リクエストボディの読み取りに失敗しました: {e}")))?
        .to_bytes();

    serde_json::from_slice(&bytes)
        .map_err(|e| AppError::validation(format!("リクエストボディの解析に失敗しました: {e}")))
}

/// JSONレスポンスを構築する
fn json_response<T: serde::Serialize>(status: StatusCode, value: &T) -> Response<Full<Bytes>> {
    let body = serde_json::to_vec(value).unwrap_or_else(|e| {
        log::error!("レスポンスのシリアライズに失敗しました: {e}");
        b"{}".to_vec()
    });

    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json; charset=utf-8")
        .body(Full::new(Bytes::from(body)))
        .unwrap_or_else(|_| fallback_response())
}

/// エラーをHTTPレスポンスへ写像する
fn error_response(error: &AppError) -> Response<Full<Bytes>> {
    let status = match error {
        AppError::Validation(_) => StatusCode::BAD_REQUEST,
        AppError::Unauthenticated | AppError::Unauthorized => StatusCode::UNAUTHORIZED,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        log::error!("リクエスト処理エラー: {}", error.details());
    } else {
        log::warn!("リクエストを拒否しました: {}", error.details());
    }

    json_response(status, &json!({"message": error.user_message()}))
}

fn not_found_response() -> Response<Full<Bytes>> {
    json_response(StatusCode::NOT_FOUND, &json!({"message": "Not Found"}))
}

/// Response構築自体が失敗した場合の最終手段
fn fallback_response() -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
}
