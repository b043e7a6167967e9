use serde::Deserialize;

use crate::ai::AiGateway;
use crate::store::AssessmentStore;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub store: AssessmentStore,
    pub gateway: AiGateway,
}
