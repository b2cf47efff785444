use crate::domain::model::{
    Listing, RatingDistribution, RatingEntry, RatingSubmission, Report, ReportPayload, TargetRef,
};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

pub trait ConfigProvider: Send + Sync {
    fn api_base_url(&self) -> &str;
    fn request_timeout(&self) -> Duration;
    fn auth_token(&self) -> Option<&str>;
}

/// The remote catalog service. Listings, ratings and reports all live there.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    async fn list_listings(&self, query: Option<&str>) -> Result<Vec<Listing>>;
    async fn get_rating_summary(&self, target: &TargetRef) -> Result<RatingDistribution>;
    async fn get_rating_entries(&self, target: &TargetRef) -> Result<Vec<RatingEntry>>;
    async fn submit_rating(
        &self,
        target: &TargetRef,
        submission: &RatingSubmission,
    ) -> Result<RatingEntry>;
    async fn create_report(&self, payload: &ReportPayload) -> Result<Report>;
}

#[async_trait]
impl<T: CatalogApi + ?Sized> CatalogApi for std::sync::Arc<T> {
    async fn list_listings(&self, query: Option<&str>) -> Result<Vec<Listing>> {
        (**self).list_listings(query).await
    }

    async fn get_rating_summary(&self, target: &TargetRef) -> Result<RatingDistribution> {
        (**self).get_rating_summary(target).await
    }

    async fn get_rating_entries(&self, target: &TargetRef) -> Result<Vec<RatingEntry>> {
        (**self).get_rating_entries(target).await
    }

    async fn submit_rating(
        &self,
        target: &TargetRef,
        submission: &RatingSubmission,
    ) -> Result<RatingEntry> {
        (**self).submit_rating(target, submission).await
    }

    async fn create_report(&self, payload: &ReportPayload) -> Result<Report> {
        (**self).create_report(payload).await
    }
}
