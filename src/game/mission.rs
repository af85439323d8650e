use actix_web::{post, web, HttpResponse};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use crate::{
    lib::{Ack, Result},
    AppState,
};

/// Mission metadata the content backend publishes for each mission name.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct MissionData {
    pub map: String,
    pub mode: String,
}

pub type MissionCatalog = HashMap<String, MissionData>;

#[derive(Deserialize)]
struct MissionDocument {
    missions: MissionCatalog,
}

/// Fetches the mission catalog from the content endpoint.
pub async fn fetch_mission_catalog(client: &reqwest::Client, url: &str) -> Result<MissionCatalog> {
    let response = client.get(url).send().await?.error_for_status()?;
    let document: MissionDocument = response.json().await?;
    Ok(document.missions)
}

/// Refreshes the in-process catalog cell; on failure the previous catalog
/// stays in place and the error is only logged.
pub async fn refresh_mission_catalog(state: &AppState) {
    match fetch_mission_catalog(state.http_client(), state.mission_data_url()).await {
        Ok(catalog) => {
            log::debug!("Mission catalog refreshed with {} missions", catalog.len());
            state.set_missions(catalog);
        }
        Err(e) => log::error!("Mission catalog refresh failed: {:?}", e),
    }
}

#[post("/update_mission_data")]
pub async fn update_mission_data(state: web::Data<AppState>) -> Result<HttpResponse> {
    actix_web::rt::spawn(async move {
        refresh_mission_catalog(&state).await;
    });
    Ok(HttpResponse::Ok().json(Ack::success("Acknowledged")))
}
