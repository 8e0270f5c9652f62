use axum::{
    body::{Bytes, to_bytes},
    extract::Request,
    http::{HeaderMap, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{
    error::AppError,
    response::{JsonApiResponse, log_app_error},
};

const MAX_ERROR_BODY_BYTES: usize = 16 * 1024;

/// Rewrites plain-text error responses (router 404/405, extractor
/// rejections) into the JSON envelope. Browsers asking for HTML and
/// responses that already carry JSON or HTML pass through untouched.
pub async fn json_error_middleware(req: Request, next: Next) -> Response {
    let wants_html = header_contains(req.headers(), header::ACCEPT, &["text/html"]);
    let response = next.run(req).await;

    let status = response.status();
    if !status.is_client_error() && !status.is_server_error() {
        return response;
    }
    if wants_html
        || header_contains(
            response.headers(),
            header::CONTENT_TYPE,
            &["application/json", "+json", "text/html"],
        )
    {
        return response;
    }

    let (parts, body) = response.into_parts();
    let message = match to_bytes(body, MAX_ERROR_BODY_BYTES).await {
        Ok(bytes) => message_from_body(status, bytes),
        Err(_) => default_message(status),
    };
    let app_error = app_error_for(status, message);
    if status.is_server_error() {
        log_app_error(&app_error, status);
    }

    let mut rewritten = JsonApiResponse::from_error(&app_error).into_response();
    copy_headers(&parts.headers, &mut rewritten);
    rewritten
}

fn header_contains(headers: &HeaderMap, name: header::HeaderName, needles: &[&str]) -> bool {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(|value| {
            let value = value.to_ascii_lowercase();
            needles.iter().any(|needle| value.contains(needle))
        })
        .unwrap_or(false)
}

fn message_from_body(status: StatusCode, bytes: Bytes) -> String {
    let message = String::from_utf8_lossy(&bytes).trim().to_string();
    if message.is_empty() {
        default_message(status)
    } else {
        message
    }
}

fn default_message(status: StatusCode) -> String {
    status
        .canonical_reason()
        .unwrap_or("Request failed")
        .to_string()
}

// Body rejections (415, 422) collapse into 400 so clients see one status for bad input.
fn app_error_for(status: StatusCode, message: String) -> AppError {
    match status {
        StatusCode::UNAUTHORIZED => AppError::unauthorized(message),
        StatusCode::FORBIDDEN => AppError::forbidden(message),
        StatusCode::NOT_FOUND => AppError::not_found(message),
        StatusCode::CONFLICT => AppError::conflict(message),
        _ if status.is_client_error() => AppError::bad_request(message),
        _ => AppError::internal(message),
    }
}

fn copy_headers(src: &HeaderMap, dest: &mut Response) {
    for (name, value) in src {
        if name == header::CONTENT_TYPE || name == header::CONTENT_LENGTH {
            continue;
        }
        dest.headers_mut().insert(name.clone(), value.clone());
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use super::app_error_for;
    use crate::response::status_for;

    #[test]
    fn unprocessable_body_becomes_bad_request() {
        let err = app_error_for(StatusCode::UNPROCESSABLE_ENTITY, "missing field".to_string());
        assert_eq!(status_for(&err), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn gateway_errors_stay_internal() {
        let err = app_error_for(StatusCode::BAD_GATEWAY, "upstream".to_string());
        assert_eq!(status_for(&err), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
