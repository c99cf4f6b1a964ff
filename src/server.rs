use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use log::{info, warn};

use crate::config::{AppConfig, SolverConfig};
use crate::data::{DistributionInput, DistributionOutput};
use crate::error::AppError;
use crate::solver;

async fn solve_handler(
    State(config): State<SolverConfig>,
    Json(input): Json<DistributionInput>,
) -> Result<Json<DistributionOutput>, (StatusCode, String)> {
    match solver::solve(&input, &config) {
        Ok(output) => Ok(Json(output)),
        Err(e) => {
            warn!("Rejected distribution request: {}", e);
            Err((StatusCode::BAD_REQUEST, e.to_string()))
        }
    }
}

pub fn router(config: SolverConfig) -> Router {
    Router::new()
        .route("/v1/distribution/solve", post(solve_handler))
        .with_state(config)
}

pub async fn run_server(config: &AppConfig) -> Result<(), AppError> {
    let app = router(config.solver);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Server running at http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
