use axum::extract::State;
use axum::response::Html;

use crate::api::response::index_page;
use crate::api::AppState;

/// `GET /`
pub async fn index(State(state): State<AppState>) -> Html<String> {
    Html(index_page(state.config.port))
}
