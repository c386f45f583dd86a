use crate::api::AppState;
use crate::engine::ParamValues;
use axum::extract::State;
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParamsResponse {
    pub owner: String,
    #[serde(flatten)]
    pub values: ParamValues,
}

pub async fn get_params(State(state): State<AppState>) -> Json<ParamsResponse> {
    let (owner, values) = state
        .market
        .read(|m| {
            (
                m.params().ownable().owner().to_string(),
                *m.params().values(),
            )
        })
        .await;
    Json(ParamsResponse { owner, values })
}
