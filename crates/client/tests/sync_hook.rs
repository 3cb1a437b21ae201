//! Black-box scenarios: a mounted hook against the in-memory booking API and
//! push channel.

use std::sync::Arc;
use std::time::Duration;

use bookingsync_client::{
    BookingFilter, BookingsHook, BookingsView, CacheProvider, HookOptions, HookStatus,
    InMemoryTransport, PaginationInfo, ResponseShape, SyncConfig, SyncContext, TransportError,
    Verb,
};
use bookingsync_core::{Booking, BookingId, BookingStatus, BookingType, CreateBookingDto, UpdateBookingDto};
use bookingsync_events::InMemoryPushChannel;
use serde_json::json;

const JUNE: &str = "/api/bookings?month=2025-06&take=1000";
const JULY: &str = "/api/bookings?month=2025-07&take=1000";

struct Harness {
    api: Arc<InMemoryTransport>,
    push: Arc<InMemoryPushChannel>,
    ctx: SyncContext,
}

impl Harness {
    fn new(bookings: Vec<Booking>) -> Self {
        Self::with_config(bookings, SyncConfig::default())
    }

    fn with_config(bookings: Vec<Booking>, config: SyncConfig) -> Self {
        let api = Arc::new(InMemoryTransport::with_bookings(bookings));
        let push = Arc::new(InMemoryPushChannel::new());
        let ctx = SyncContext::new(api.clone(), config).with_push(push.clone());
        Self { api, push, ctx }
    }

    async fn mount(&self, filter: BookingFilter) -> BookingsHook {
        BookingsHook::mount(&self.ctx, HookOptions::new(filter)).await
    }

    fn cached_ids(&self, key: &str) -> Vec<String> {
        self.ctx
            .cache
            .get(key)
            .map(|page| page.data.iter().map(|b| b.id.to_string()).collect())
            .unwrap_or_default()
    }
}

fn booking(id: &str, start: &str, end: &str) -> Booking {
    serde_json::from_value(json!({
        "id": id,
        "bookingNumber": format!("BK-{id}"),
        "customerName": "Choi Yuna",
        "teamName": "Danang Family",
        "bookingType": "PACKAGE",
        "destination": "Da Nang",
        "startDate": start,
        "endDate": end,
        "paxCount": 3,
        "status": "CONFIRMED",
        "totalPrice": 2_700_000,
        "createdBy": "agent@example.test"
    }))
    .unwrap()
}

fn june_bookings() -> Vec<Booking> {
    vec![
        booking("a", "2025-06-03", "2025-06-07"),
        booking("b", "2025-06-14", "2025-06-18"),
    ]
}

fn create_dto(start: &str, end: &str, pax: u32) -> CreateBookingDto {
    CreateBookingDto {
        customer_name: "Lee Seojun".to_string(),
        team_name: "Jeju Golf".to_string(),
        booking_type: BookingType::Package,
        destination: "Jeju".to_string(),
        start_date: start.parse().unwrap(),
        end_date: end.parse().unwrap(),
        pax_count: pax,
        nights: 4,
        days: 5,
        total_price: 3_200_000,
        deposit_amount: None,
        currency: None,
        notes: Some("window seats".to_string()),
    }
}

fn ids(view: &BookingsView) -> Vec<String> {
    view.bookings.iter().map(|b| b.id.to_string()).collect()
}

fn temporary_count(view: &BookingsView) -> usize {
    view.bookings.iter().filter(|b| b.id.is_temporary()).count()
}

#[tokio::test]
async fn mount_loads_the_filtered_list() {
    let mut seed = june_bookings();
    seed.push(booking("c", "2025-07-01", "2025-07-03"));
    let h = Harness::new(seed);

    let hook = h.mount(BookingFilter::month("2025-06")).await;
    let view = hook.view();

    assert_eq!(hook.request_key(), JUNE);
    assert_eq!(hook.status(), HookStatus::Ready);
    assert_eq!(ids(&view), vec!["a", "b"]);
    assert!(!view.is_error());
    assert_eq!(view.pagination.map(|p| p.total), Some(2));

    hook.unmount().await;
}

#[tokio::test(start_paused = true)]
async fn create_shows_temporary_record_then_server_record() {
    let h = Harness::new(Vec::new());
    let hook = h.mount(BookingFilter::month("2025-06")).await;
    h.api.set_latency(Verb::Post, Duration::from_millis(100));
    let mut rx = hook.watch();

    let (created, interim) = tokio::join!(
        hook.create(create_dto("2025-06-01", "2025-06-05", 4)),
        async {
            rx.wait_for(|v| temporary_count(v) > 0)
                .await
                .unwrap()
                .clone()
        }
    );

    let temp = &interim.bookings[0];
    assert!(temp.id.is_temporary());
    assert!(temp.booking_number.starts_with("TEMP-"));
    assert_eq!(temp.start_date.to_string(), "2025-06-01");
    assert_eq!(temp.end_date.to_string(), "2025-06-05");
    assert_eq!(temp.pax_count, 4);
    assert_eq!(temp.status, BookingStatus::Pending);
    assert!(interim.is_mutating);

    let created = created.unwrap();
    assert!(!created.id.is_temporary());
    assert_ne!(created.id, temp.id);

    let view = hook.view();
    assert_eq!(ids(&view), vec![created.id.to_string()]);
    assert_eq!(temporary_count(&view), 0);
    assert_eq!(h.cached_ids(JUNE), vec![created.id.to_string()]);
    assert!(!hook.is_mutating());

    hook.unmount().await;
}

#[tokio::test]
async fn reversed_dates_are_rejected_without_side_effects() {
    let h = Harness::new(june_bookings());
    let hook = h.mount(BookingFilter::month("2025-06")).await;
    let cached = h.ctx.cache.get(JUNE);
    let calls = h.api.calls().len();
    let view = hook.view();

    let err = hook
        .create(create_dto("2025-06-05", "2025-06-01", 4))
        .await
        .unwrap_err();

    assert!(err.is_validation());
    assert_eq!(h.api.calls().len(), calls);
    assert_eq!(h.ctx.cache.get(JUNE), cached);
    assert_eq!(hook.view(), view);
    assert!(!hook.is_mutating());

    hook.unmount().await;
}

#[tokio::test(start_paused = true)]
async fn failed_bulk_delete_restores_true_state() {
    let h = Harness::new(june_bookings());
    let hook = h.mount(BookingFilter::month("2025-06")).await;
    h.api.set_latency(Verb::Delete, Duration::from_millis(100));
    h.api.fail_next(Verb::Delete, TransportError::api(500, "bulk delete failed"));
    let mut rx = hook.watch();

    let (result, emptied) = tokio::join!(
        hook.bulk_delete(vec![BookingId::from("a"), BookingId::from("b")]),
        async {
            rx.wait_for(|v| v.bookings.is_empty())
                .await
                .unwrap()
                .clone()
        }
    );

    assert!(emptied.bookings.is_empty());
    let err = result.unwrap_err();
    assert_eq!(err.as_transport().and_then(TransportError::status), Some(500));

    assert_eq!(ids(&hook.view()), vec!["a", "b"]);
    assert_eq!(h.cached_ids(JUNE), vec!["a", "b"]);
    assert_eq!(h.api.bookings().len(), 2);

    hook.unmount().await;
}

#[tokio::test]
async fn failed_create_leaves_no_temporary_record() {
    let h = Harness::new(june_bookings());
    let hook = h.mount(BookingFilter::month("2025-06")).await;
    h.api.fail_next(Verb::Post, TransportError::Offline);

    let err = hook
        .create(create_dto("2025-06-20", "2025-06-22", 2))
        .await
        .unwrap_err();

    assert_eq!(err.as_transport(), Some(&TransportError::Offline));
    assert_eq!(temporary_count(&hook.view()), 0);
    assert_eq!(h.cached_ids(JUNE), vec!["a", "b"]);

    hook.unmount().await;
}

#[tokio::test]
async fn offline_create_rolls_back_without_server_truth() {
    let h = Harness::new(june_bookings());
    let hook = h.mount(BookingFilter::month("2025-06")).await;
    h.api.fail_next(Verb::Post, TransportError::Offline);
    h.api.fail_next(Verb::Get, TransportError::Offline);

    let err = hook
        .create(create_dto("2025-06-20", "2025-06-22", 2))
        .await
        .unwrap_err();

    assert_eq!(err.as_transport(), Some(&TransportError::Offline));
    assert_eq!(temporary_count(&hook.view()), 0);
    assert_eq!(ids(&hook.view()), vec!["a", "b"]);
    assert_eq!(h.cached_ids(JUNE), vec!["a", "b"]);

    hook.unmount().await;
}

#[tokio::test]
async fn offline_delete_puts_the_record_back() {
    let h = Harness::new(june_bookings());
    let hook = h.mount(BookingFilter::month("2025-06")).await;
    h.api.fail_next(Verb::Delete, TransportError::Offline);
    h.api.fail_next(Verb::Get, TransportError::Offline);

    assert!(hook.delete(&BookingId::from("a")).await.is_err());

    assert_eq!(ids(&hook.view()), vec!["a", "b"]);
    assert_eq!(h.cached_ids(JUNE), vec!["a", "b"]);

    hook.unmount().await;
}

#[tokio::test(start_paused = true)]
async fn update_is_applied_locally_then_confirmed() {
    let h = Harness::new(june_bookings());
    let hook = h.mount(BookingFilter::month("2025-06")).await;
    h.api.set_latency(Verb::Put, Duration::from_millis(100));
    let mut rx = hook.watch();

    let patch = UpdateBookingDto {
        pax_count: Some(5),
        status: Some(BookingStatus::Cancelled),
        ..Default::default()
    };
    let id_a = BookingId::from("a");
    let (updated, interim) = tokio::join!(
        hook.update(&id_a, patch),
        async {
            rx.wait_for(|v| v.bookings.iter().any(|b| b.pax_count == 5))
                .await
                .unwrap()
                .clone()
        }
    );

    assert!(interim.is_mutating);
    let updated = updated.unwrap();
    assert_eq!(updated.pax_count, 5);

    let a = hook.find_by_id("a").unwrap();
    assert_eq!(a.pax_count, 5);
    assert_eq!(a.status, BookingStatus::Cancelled);

    hook.unmount().await;
}

#[tokio::test]
async fn delete_and_restore_round_trip_through_the_server() {
    let h = Harness::new(june_bookings());
    let hook = h.mount(BookingFilter::month("2025-06")).await;
    let removed = hook.filter(|b| b.id.as_str() == "b");

    hook.delete(&BookingId::from("a")).await.unwrap();
    assert_eq!(ids(&hook.view()), vec!["b"]);

    let outcome = hook.bulk_delete(vec![BookingId::from("b")]).await.unwrap();
    assert_eq!(outcome.count(), 1);
    assert!(hook.view().bookings.is_empty());

    let outcome = hook.bulk_restore(removed).await.unwrap();
    assert_eq!(outcome.count(), 1);
    assert_eq!(ids(&hook.view()), vec!["b"]);

    hook.unmount().await;
}

#[tokio::test]
async fn empty_bulk_operations_fail_fast() {
    let h = Harness::new(june_bookings());
    let hook = h.mount(BookingFilter::month("2025-06")).await;
    let calls = h.api.calls().len();

    assert!(hook.bulk_delete(Vec::new()).await.unwrap_err().is_validation());
    assert!(hook.bulk_restore(Vec::new()).await.unwrap_err().is_validation());
    assert_eq!(h.api.calls().len(), calls);

    hook.unmount().await;
}

#[tokio::test(start_paused = true)]
async fn optimistic_writes_can_be_disabled() {
    let h = Harness::new(Vec::new());
    let options = HookOptions::new(BookingFilter::month("2025-06")).with_optimistic_updates(false);
    let hook = BookingsHook::mount(&h.ctx, options).await;
    h.api.set_latency(Verb::Post, Duration::from_millis(100));

    let (created, interim) = tokio::join!(
        hook.create(create_dto("2025-06-01", "2025-06-05", 4)),
        async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            hook.view()
        }
    );

    assert!(interim.bookings.is_empty());
    assert!(interim.is_mutating);
    let created = created.unwrap();
    assert_eq!(ids(&hook.view()), vec![created.id.to_string()]);

    hook.unmount().await;
}

#[tokio::test(start_paused = true)]
async fn push_update_triggers_exactly_one_refetch() {
    let h = Harness::new(june_bookings());
    let hook = h.mount(BookingFilter::month("2025-06")).await;
    assert_eq!(h.api.calls_to(Verb::Get, JUNE), 1);

    // Another client changed the server.
    h.api.seed(booking("remote", "2025-06-25", "2025-06-28"));
    h.push
        .publish("booking:update", json!({ "id": "remote" }))
        .unwrap();
    tokio::time::sleep(Duration::from_secs(2)).await;

    assert_eq!(h.api.calls_to(Verb::Get, JUNE), 2);
    assert!(hook.find_by_id("remote").is_some());

    hook.unmount().await;
}

#[tokio::test(start_paused = true)]
async fn push_bursts_are_coalesced() {
    let h = Harness::new(june_bookings());
    let hook = h.mount(BookingFilter::month("2025-06")).await;

    for name in [
        "booking:create",
        "booking:create",
        "booking:bulk-create",
        "booking:update",
        "booking:delete",
    ] {
        h.push.publish(name, json!({})).unwrap();
    }
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(h.api.calls_to(Verb::Get, JUNE), 2);

    h.push.publish("booking:bulk-delete", json!({})).unwrap();
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(h.api.calls_to(Verb::Get, JUNE), 3);

    hook.unmount().await;
}

#[tokio::test(start_paused = true)]
async fn every_mounted_filter_refetches_its_own_key() {
    let mut seed = june_bookings();
    seed.push(booking("c", "2025-07-01", "2025-07-03"));
    let h = Harness::new(seed);
    let june = h.mount(BookingFilter::month("2025-06")).await;
    let july = h.mount(BookingFilter::month("2025-07")).await;

    h.push.publish("booking:create", json!({})).unwrap();
    tokio::time::sleep(Duration::from_secs(2)).await;

    assert_eq!(h.api.calls_to(Verb::Get, JUNE), 2);
    assert_eq!(h.api.calls_to(Verb::Get, JULY), 2);

    june.unmount().await;
    july.unmount().await;
}

#[tokio::test(start_paused = true)]
async fn hooks_on_the_same_key_share_one_push_refetch() {
    let h = Harness::new(june_bookings());
    let first = h.mount(BookingFilter::month("2025-06")).await;
    let second = h.mount(BookingFilter::month("2025-06")).await;
    let before = h.api.calls_to(Verb::Get, JUNE);

    h.api.seed(booking("remote", "2025-06-25", "2025-06-28"));
    h.push.publish("booking:update", json!({})).unwrap();
    tokio::time::sleep(Duration::from_secs(2)).await;

    assert_eq!(h.api.calls_to(Verb::Get, JUNE) - before, 1);
    assert!(first.find_by_id("remote").is_some());
    assert!(second.find_by_id("remote").is_some());

    first.unmount().await;
    second.unmount().await;
}

#[tokio::test(start_paused = true)]
async fn push_refetch_is_not_repeated_without_a_dedup_window() {
    let config = SyncConfig::default().with_dedup_interval(Duration::ZERO);
    let h = Harness::with_config(june_bookings(), config);
    let hook = h.mount(BookingFilter::month("2025-06")).await;

    h.push.publish("booking:create", json!({})).unwrap();
    tokio::time::sleep(Duration::from_secs(2)).await;

    assert_eq!(h.api.calls_to(Verb::Get, JUNE), 2);

    hook.unmount().await;
}

#[tokio::test(start_paused = true)]
async fn unmount_unsubscribes() {
    let h = Harness::new(june_bookings());
    let hook = h.mount(BookingFilter::month("2025-06")).await;
    assert_eq!(h.push.subscriber_count(), 1);

    hook.unmount().await;
    assert_eq!(h.push.subscriber_count(), 0);

    assert_eq!(h.push.publish("booking:update", json!({})).unwrap(), 0);
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(h.api.calls_to(Verb::Get, JUNE), 1);
}

#[tokio::test]
async fn no_subscription_without_a_live_channel() {
    let h = Harness::new(june_bookings());
    h.push.set_connected(false);
    let offline = h.mount(BookingFilter::month("2025-06")).await;
    assert_eq!(h.push.subscriber_count(), 0);

    h.push.set_connected(true);
    let opted_out = BookingsHook::mount(
        &h.ctx,
        HookOptions::new(BookingFilter::month("2025-06")).without_live_updates(),
    )
    .await;
    assert_eq!(h.push.subscriber_count(), 0);

    offline.unmount().await;
    opted_out.unmount().await;
}

#[tokio::test]
async fn changing_the_filter_moves_to_a_new_key() {
    let mut seed = june_bookings();
    seed.push(booking("c", "2025-07-01", "2025-07-03"));
    let h = Harness::new(seed);
    let hook = h.mount(BookingFilter::month("2025-06")).await;

    let page = hook.set_filter(BookingFilter::month("2025-07")).await.unwrap();

    assert_eq!(hook.request_key(), JULY);
    assert_eq!(page.len(), 1);
    assert_eq!(ids(&hook.view()), vec!["c"]);
    assert_eq!(h.ctx.cache.keys(), vec![JUNE.to_string(), JULY.to_string()]);
    assert_eq!(h.cached_ids(JUNE), vec!["a", "b"]);

    hook.unmount().await;
}

#[tokio::test]
async fn hooks_on_the_same_key_share_reads() {
    let h = Harness::new(june_bookings());
    let first = h.mount(BookingFilter::month("2025-06")).await;
    let second = h.mount(BookingFilter::month("2025-06")).await;

    assert_eq!(h.api.calls_to(Verb::Get, JUNE), 1);
    assert_eq!(first.view().bookings, second.view().bookings);

    first.unmount().await;
    second.unmount().await;
}

#[tokio::test(start_paused = true)]
async fn hooks_on_the_same_key_see_each_others_optimistic_writes() {
    let h = Harness::new(june_bookings());
    let writer = h.mount(BookingFilter::month("2025-06")).await;
    let reader = h.mount(BookingFilter::month("2025-06")).await;
    h.api.set_latency(Verb::Post, Duration::from_millis(100));
    let mut rx = reader.watch();

    let (created, seen) = tokio::join!(
        writer.create(create_dto("2025-06-20", "2025-06-24", 2)),
        async {
            rx.wait_for(|v| temporary_count(v) == 1)
                .await
                .unwrap()
                .clone()
        }
    );

    assert_eq!(seen.bookings.len(), 3);
    let created = created.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(reader.find_by_id(created.id.as_str()).is_some());
    assert_eq!(temporary_count(&reader.view()), 0);

    writer.unmount().await;
    reader.unmount().await;
}

#[tokio::test(start_paused = true)]
async fn stale_data_stays_visible_while_loading() {
    let h = Harness::new(june_bookings());
    let hook = h.mount(BookingFilter::month("2025-06")).await;
    h.api.set_latency(Verb::Get, Duration::from_millis(100));
    let mut rx = hook.watch();

    let (refreshed, loading) = tokio::join!(hook.refresh(), async {
        rx.wait_for(|v| v.is_loading()).await.unwrap().clone()
    });

    assert_eq!(ids(&loading), vec!["a", "b"]);
    assert_eq!(refreshed.unwrap().len(), 2);
    assert_eq!(hook.status(), HookStatus::Ready);

    hook.unmount().await;
}

#[tokio::test]
async fn initial_read_failure_is_reported_in_the_view() {
    let h = Harness::new(june_bookings());
    h.api.fail_next(Verb::Get, TransportError::Offline);

    let hook = h.mount(BookingFilter::month("2025-06")).await;
    let view = hook.view();
    assert!(view.is_error());
    assert_eq!(view.error, Some(TransportError::Offline));
    assert!(view.bookings.is_empty());

    hook.refresh().await.unwrap();
    let view = hook.view();
    assert!(!view.is_error());
    assert_eq!(ids(&view), vec!["a", "b"]);

    hook.unmount().await;
}

#[tokio::test]
async fn legacy_responses_are_normalized() {
    let h = Harness::new(june_bookings());
    h.api.set_shape(ResponseShape::Legacy);

    let hook = h.mount(BookingFilter::month("2025-06")).await;
    let view = hook.view();

    assert_eq!(ids(&view), vec!["a", "b"]);
    assert_eq!(
        view.pagination,
        Some(PaginationInfo { page: 1, limit: 1000, total: 2, total_pages: 1 })
    );

    hook.unmount().await;
}

#[tokio::test(start_paused = true)]
async fn polling_revalidates_on_interval() {
    let config = SyncConfig::default().with_refresh_interval(Duration::from_secs(1));
    let h = Harness::with_config(june_bookings(), config);
    let hook = h.mount(BookingFilter::month("2025-06")).await;

    tokio::time::sleep(Duration::from_millis(3500)).await;
    assert_eq!(h.api.calls_to(Verb::Get, JUNE), 4);

    hook.unmount().await;
}

#[tokio::test]
async fn focus_revalidation_is_opt_in() {
    let h = Harness::new(june_bookings());
    let hook = h.mount(BookingFilter::month("2025-06")).await;
    assert!(!hook.on_focus().await);
    assert!(!hook.on_reconnect().await);
    assert_eq!(h.api.calls_to(Verb::Get, JUNE), 1);
    hook.unmount().await;

    let config = SyncConfig::default().with_focus_revalidation(true, false);
    let h = Harness::with_config(june_bookings(), config);
    let hook = h.mount(BookingFilter::month("2025-06")).await;
    assert!(hook.on_focus().await);
    assert!(!hook.on_reconnect().await);
    assert_eq!(h.api.calls_to(Verb::Get, JUNE), 2);
    hook.unmount().await;
}

#[tokio::test]
async fn view_helpers() {
    let h = Harness::new(june_bookings());
    let hook = h.mount(BookingFilter::month("2025-06")).await;

    assert_eq!(hook.find_by_id("b").map(|b| b.id.to_string()), Some("b".to_string()));
    assert!(hook.find_by_id("zzz").is_none());

    let late_june = hook.filter(|b| b.start_date.to_string() > "2025-06-10".to_string());
    assert_eq!(late_june.len(), 1);

    let newest_first: Vec<String> = hook
        .sorted_by(|x, y| y.start_date.cmp(&x.start_date))
        .into_iter()
        .map(|b| b.id.to_string())
        .collect();
    assert_eq!(newest_first, vec!["b", "a"]);
    assert_eq!(ids(&hook.view()), vec!["a", "b"]);

    hook.unmount().await;
}
