use crate::app::render;
use crate::config::{Command, OutputFormat};
use crate::core::aggregation::AggregationController;
use crate::core::filter::FilterEngine;
use crate::domain::model::{
    FilterState, Listing, RatingSubmission, ReportPayload, TargetKind, TargetRef,
};
use crate::domain::ports::CatalogApi;
use crate::utils::error::{CatalogError, Result};
use crate::utils::validation::Validate;
use std::io::Write;

async fn find_listing<A: CatalogApi>(api: &A, listing_id: &str) -> Result<Option<Listing>> {
    let listings = api.list_listings(None).await?;
    Ok(listings.into_iter().find(|l| l.id == listing_id))
}

pub async fn run<A, W>(api: A, command: &Command, preset: FilterState, out: &mut W) -> Result<()>
where
    A: CatalogApi,
    W: Write,
{
    match command {
        Command::List { filters, format } => {
            let state = filters.apply_to(preset);
            let listings = api.list_listings(None).await?;
            tracing::info!("Fetched {} listings", listings.len());

            let engine = FilterEngine::new();
            let admitted = engine.apply(&listings, &state);

            match format {
                OutputFormat::Table => render::write_table(out, &admitted),
                OutputFormat::Csv => render::write_csv(out, &admitted),
                OutputFormat::Json => render::write_json(out, &admitted),
            }
        }
        Command::Show { listing_id } => {
            let listing = find_listing(&api, listing_id)
                .await?
                .ok_or_else(|| CatalogError::ValidationError {
                    message: format!("No listing with id {}", listing_id),
                })?;

            let controller = AggregationController::new(api);
            controller.select(Some(&listing)).await;
            render::write_aggregation(out, &listing, &controller.snapshot())
        }
        Command::Rate {
            kind,
            id,
            stars,
            feedback,
            public,
            listing,
        } => {
            let target = TargetRef::new(*kind, id.as_str());
            let submission = RatingSubmission::new(*stars, feedback.clone(), *public);
            submission.validate()?;

            let view_id = listing.clone().or_else(|| match kind {
                TargetKind::Listing => Some(id.clone()),
                TargetKind::User => None,
            });
            let view_listing = match &view_id {
                Some(view_id) => {
                    let found = find_listing(&api, view_id).await?;
                    if found.is_none() {
                        tracing::warn!("Listing {} not found, skipping rating view", view_id);
                    }
                    found
                }
                None => None,
            };

            let controller = AggregationController::new(api);
            controller.select(view_listing.as_ref()).await;

            let entry = controller.submit_rating(&target, &submission).await?;
            writeln!(out, "Saved {}-star rating {} for {}", entry.stars, entry.id, target)?;

            if let Some(view_listing) = &view_listing {
                render::write_aggregation(out, view_listing, &controller.snapshot())?;
            }
            Ok(())
        }
        Command::Report {
            kind,
            id,
            reason,
            details,
        } => {
            let payload = ReportPayload {
                target: TargetRef::new(*kind, id.as_str()),
                reason: reason.trim().to_string(),
                details: details.clone(),
            };
            payload.validate()?;

            let report = api.create_report(&payload).await?;
            tracing::info!("Report {} filed for {}", report.id, payload.target);
            writeln!(
                out,
                "Report {} filed ({})",
                report.id,
                report.status.as_deref().unwrap_or("received")
            )?;
            Ok(())
        }
    }
}
