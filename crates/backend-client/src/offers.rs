//! Off-chain offer records

use serde_json::Value;

use crate::{ApiResponse, BackendClient, NewOffer};

impl BackendClient {
    pub async fn list_offers(&self) -> ApiResponse<Vec<Value>> {
        self.get("/offers").await
    }

    pub async fn get_offer(&self, offer_id: &str) -> ApiResponse<Value> {
        self.get(&format!("/offers/{}", offer_id)).await
    }

    pub async fn create_offer(&self, offer: &NewOffer) -> ApiResponse<Value> {
        self.post("/offers", Some(offer)).await
    }

    pub async fn cancel_offer(&self, offer_id: &str) -> ApiResponse<Value> {
        self.delete(&format!("/offers/{}", offer_id)).await
    }

    pub async fn offers_by_lender(&self, lender: &str) -> ApiResponse<Vec<Value>> {
        self.get(&format!("/offers/lender/{}", lender)).await
    }
}
