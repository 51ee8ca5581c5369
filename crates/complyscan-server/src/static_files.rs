//! Embedded landing page and static assets

use axum::{
    extract::Path,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
};
use rust_embed::Embed;

#[derive(Embed)]
#[folder = "web"]
struct WebAssets;

/// `GET /`
pub async fn index() -> Response {
    match <WebAssets as Embed>::get("index.html") {
        Some(content) => Html(String::from_utf8_lossy(&content.data).to_string()).into_response(),
        None => Html(FALLBACK_HTML.to_string()).into_response(),
    }
}

/// `GET /static/*path`
pub async fn serve_static(Path(path): Path<String>) -> Response {
    let path = format!("static/{}", path.trim_start_matches('/'));

    match <WebAssets as Embed>::get(&path) {
        Some(content) => {
            let mime = mime_guess::from_path(&path).first_or_octet_stream();
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, mime.as_ref())],
                content.data.into_owned(),
            )
                .into_response()
        }
        None => (StatusCode::NOT_FOUND, "Not Found").into_response(),
    }
}

const FALLBACK_HTML: &str = r#"<!DOCTYPE html>
<html lang="zh-CN">
<head><meta charset="UTF-8"><title>企业合规风险分析</title></head>
<body>
    <h1>企业合规风险分析</h1>
    <p>页面资源缺失，请通过 POST /analyze 提交 {"input": "..."} 进行分析。</p>
</body>
</html>
"#;
