//! Demo ingest page served next to the Swagger UI

use axum::response::Html;

const DEMO_PAGE: &str = include_str!("../../../../../static/demo.html");

/// `GET /demo`
pub async fn demo_page() -> Html<&'static str> {
    Html(DEMO_PAGE)
}
