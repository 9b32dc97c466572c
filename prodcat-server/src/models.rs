//! Response bodies for the catalog API.

use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ProductListResponse {
    pub status: &'static str,
    pub prod_ids: Vec<i64>,
}

impl ProductListResponse {
    pub fn new(prod_ids: Vec<i64>) -> Self {
        Self {
            status: "1",
            prod_ids,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Current connection-manager state: connecting, connected, or failed.
    pub db: &'static str,
}
