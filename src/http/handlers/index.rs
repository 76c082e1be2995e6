//! Landing page pointing scrapers at `/metrics`.

use axum::response::Html;

const REDIRECT_PAGE: &str = r#"<html>
    <head>
        <meta http-equiv="refresh" content="0; URL='/metrics'" />
    </head>
    <body>
        <p>Redirecting to <a href="/metrics">/metrics</a>!</p>
    </body>
</html>"#;

/// Handler for `/`.
pub async fn index() -> Html<&'static str> {
    Html(REDIRECT_PAGE)
}
