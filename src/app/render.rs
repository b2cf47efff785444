use crate::core::aggregation::{AggregationResult, Organizer, Phase};
use crate::core::filter::{delivery_mode, group_size};
use crate::core::ratings::RatingSummary;
use crate::domain::model::{DeliveryMode, GroupSize, Listing, RatingEntry};
use crate::utils::error::Result;
use serde::Serialize;
use std::io::Write;

/// One flattened output row per listing, shared by the table and CSV writers.
#[derive(Debug, Serialize)]
struct ListingRow<'a> {
    id: &'a str,
    name: &'a str,
    date: &'a str,
    mode: &'static str,
    price: &'a str,
    group_size: &'static str,
    category: &'a str,
    provider: &'a str,
}

fn mode_label(mode: DeliveryMode) -> &'static str {
    match mode {
        DeliveryMode::Online => "online",
        DeliveryMode::InPerson => "in-person",
    }
}

fn group_size_label(size: GroupSize) -> &'static str {
    match size {
        GroupSize::Solo => "solo",
        GroupSize::SmallGroup => "small-group",
        GroupSize::LargeGroup => "large-group",
    }
}

impl<'a> ListingRow<'a> {
    fn from_listing(listing: &'a Listing) -> Self {
        Self {
            id: &listing.id,
            name: &listing.name,
            date: listing.date.as_deref().unwrap_or(""),
            mode: mode_label(delivery_mode(listing)),
            price: listing.price.as_deref().unwrap_or(""),
            group_size: group_size_label(group_size(listing.attendee_limit.as_deref())),
            category: listing.category.as_deref().unwrap_or(""),
            provider: listing.provider_display_name().unwrap_or(""),
        }
    }

    fn cells(&self) -> [&str; 8] {
        [
            self.id,
            self.name,
            self.date,
            self.mode,
            self.price,
            self.group_size,
            self.category,
            self.provider,
        ]
    }
}

const HEADERS: [&str; 8] = [
    "id", "name", "date", "mode", "price", "group_size", "category", "provider",
];

pub fn write_table<W: Write>(out: &mut W, listings: &[&Listing]) -> Result<()> {
    let rows: Vec<ListingRow> = listings.iter().map(|l| ListingRow::from_listing(l)).collect();

    let mut widths = HEADERS.map(|h| h.chars().count());
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row.cells()) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let format_line = |cells: [&str; 8]| {
        cells
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = width))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    writeln!(out, "{}", format_line(HEADERS))?;
    for row in &rows {
        writeln!(out, "{}", format_line(row.cells()))?;
    }
    writeln!(out, "({} listings)", rows.len())?;
    Ok(())
}

pub fn write_csv<W: Write>(out: &mut W, listings: &[&Listing]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    for listing in listings {
        writer.serialize(ListingRow::from_listing(listing))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_json<W: Write>(out: &mut W, listings: &[&Listing]) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, listings)?;
    writeln!(out)?;
    Ok(())
}

fn summary_line(summary: &RatingSummary) -> String {
    if summary.rating_count == 0 {
        "no ratings yet".to_string()
    } else {
        format!("{:.2} / 5 ({} ratings)", summary.avg, summary.rating_count)
    }
}

fn write_entries<W: Write>(out: &mut W, entries: &[RatingEntry]) -> Result<()> {
    for entry in entries {
        let stars = "*".repeat(usize::from(entry.stars.min(5)));
        match &entry.feedback {
            Some(feedback) => writeln!(
                out,
                "    {:<5}  {}  {}",
                stars,
                entry.created_at.format("%Y-%m-%d"),
                feedback
            )?,
            None => writeln!(out, "    {:<5}  {}", stars, entry.created_at.format("%Y-%m-%d"))?,
        }
    }
    Ok(())
}

pub fn write_aggregation<W: Write>(
    out: &mut W,
    listing: &Listing,
    result: &AggregationResult,
) -> Result<()> {
    writeln!(out, "{} ({})", listing.name, listing.id)?;

    if result.phase == Phase::Failed {
        writeln!(
            out,
            "  ratings unavailable: {}",
            result.error.as_deref().unwrap_or("unknown error")
        )?;
        return Ok(());
    }

    writeln!(out, "  listing rating: {}", summary_line(&result.listing_summary))?;
    write_entries(out, &result.listing_entries)?;

    match &result.organizer {
        Organizer::Ratable { user_id } => {
            writeln!(
                out,
                "  organizer {} rating: {}",
                user_id,
                summary_line(&result.organizer_summary)
            )?;
            write_entries(out, &result.organizer_entries)?;
        }
        Organizer::Unratable { display_name } => {
            writeln!(
                out,
                "  organizer: {}",
                display_name.as_deref().unwrap_or("unknown")
            )?;
        }
        Organizer::Unknown => {}
    }
    Ok(())
}
