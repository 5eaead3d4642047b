//! User profiles, roles and credit score

use crate::{Activity, ApiResponse, BackendClient, CreditScore, ProfileUpdate, UserProfile};

impl BackendClient {
    pub async fn get_profile(&self, address: &str) -> ApiResponse<UserProfile> {
        self.get(&format!("/users/{}", address)).await
    }

    pub async fn update_profile(
        &self,
        address: &str,
        update: &ProfileUpdate,
    ) -> ApiResponse<UserProfile> {
        self.put(&format!("/users/{}", address), update).await
    }

    pub async fn register_lender(
        &self,
        address: &str,
        profile: &ProfileUpdate,
    ) -> ApiResponse<UserProfile> {
        self.post(&format!("/users/{}/register-lender", address), Some(profile))
            .await
    }

    pub async fn register_borrower(
        &self,
        address: &str,
        profile: &ProfileUpdate,
    ) -> ApiResponse<UserProfile> {
        self.post(&format!("/users/{}/register-borrower", address), Some(profile))
            .await
    }

    pub async fn credit_score(&self, address: &str) -> ApiResponse<CreditScore> {
        self.get(&format!("/users/{}/credit-score", address)).await
    }

    pub async fn activity(&self, address: &str) -> ApiResponse<Vec<Activity>> {
        self.get(&format!("/users/{}/activity", address)).await
    }
}
