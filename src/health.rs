pub const LIVENESS: &str = "🟢 Sleep API is active.";

/// Handler for GET /
pub async fn health() -> &'static str {
    LIVENESS
}
