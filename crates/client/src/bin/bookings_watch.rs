//! Follow one booking list against a live API and log every change.
//!
//! Usage: `bookings-watch [YYYY-MM]`. Configuration comes from the
//! `BOOKINGS_*` environment variables.

use std::sync::Arc;

use anyhow::Context;
use bookingsync_client::{
    BookingFilter, BookingsHook, BookingsView, HookOptions, HttpTransport, SyncConfig, SyncContext,
};
use chrono::NaiveDate;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    bookingsync_observability::init_pretty();

    let filter = match std::env::args().nth(1) {
        Some(month) => {
            NaiveDate::parse_from_str(&format!("{month}-01"), "%Y-%m-%d")
                .with_context(|| format!("expected a YYYY-MM month, got {month:?}"))?;
            BookingFilter::month(month)
        }
        None => BookingFilter::all(),
    };

    let config = SyncConfig::from_env();
    tracing::info!(api = %config.api_base_url, "connecting");
    let transport = Arc::new(HttpTransport::from_config(&config));
    let ctx = SyncContext::new(transport, config);

    let hook = BookingsHook::mount(&ctx, HookOptions::new(filter)).await;
    let mut changes = hook.watch();
    report(&hook.request_key(), &hook.view());

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for ctrl-c")?;
                break;
            }
            changed = changes.changed() => {
                changed.context("hook view channel closed")?;
                let view = changes.borrow_and_update().clone();
                report(&hook.request_key(), &view);
            }
        }
    }

    hook.unmount().await;
    Ok(())
}

fn report(key: &str, view: &BookingsView) {
    if let Some(err) = &view.error {
        tracing::error!(key, error = %err, "booking list unavailable");
        return;
    }

    let total = view.pagination.map(|p| p.total);
    tracing::info!(
        key,
        status = ?view.status,
        count = view.bookings.len(),
        total,
        mutating = view.is_mutating,
        "booking list"
    );
    for booking in &view.bookings {
        tracing::info!(
            id = %booking.id,
            number = %booking.booking_number,
            customer = %booking.customer_name,
            start = %booking.start_date,
            end = %booking.end_date,
            pax = booking.pax_count,
            status = booking.status.as_str(),
        );
    }
}
