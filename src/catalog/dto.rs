use serde::{Deserialize, Serialize};

use super::repo_types::{Service, ServicePatch};

#[derive(Debug, Deserialize)]
pub struct ServiceFilter {
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateServiceRequest {
    pub name: String,
    pub slug: Option<String>,
    pub category: String,
    pub description: Option<String>,
    pub price_cents: i64,
    #[serde(default)]
    pub features: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateServiceRequest {
    pub name: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub price_cents: Option<i64>,
    pub features: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

impl From<UpdateServiceRequest> for ServicePatch {
    fn from(r: UpdateServiceRequest) -> Self {
        Self {
            name: r.name,
            category: r.category,
            description: r.description,
            price_cents: r.price_cents,
            features: r.features,
            is_active: r.is_active,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ServiceResponse {
    pub success: bool,
    pub service: Service,
}

#[derive(Debug, Serialize)]
pub struct ServicesResponse {
    pub success: bool,
    pub services: Vec<Service>,
}
