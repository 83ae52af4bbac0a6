//! End-to-end booking, cancellation and trip deletion flows
//!
//! Runs the services against `MemoryBookingStore`, which commits or discards
//! whole transactions exactly like the PostgreSQL store.

#[cfg(test)]
mod tests {
    use busline_core::{
        config::{BookingConfig, DiscountAllocation},
        models::{BusType, Coupon, DisplayStatus, Itinerary, Requester, TicketStatus, Trip},
        AppError,
    };
    use busline_db::MemoryBookingStore;
    use busline_services::{BookingOrchestrator, CancellationFlow, CatalogService};
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use uuid::Uuid;

    struct Fixture {
        store: Arc<MemoryBookingStore>,
        company: Uuid,
        booking: Arc<BookingOrchestrator<MemoryBookingStore>>,
        cancellation: CancellationFlow<MemoryBookingStore>,
        catalog: CatalogService<MemoryBookingStore>,
    }

    async fn fixture_with(config: BookingConfig) -> Fixture {
        let store = Arc::new(MemoryBookingStore::new());
        let company = store.add_company("Kamil Koc").await;
        Fixture {
            booking: Arc::new(BookingOrchestrator::new(store.clone(), &config)),
            cancellation: CancellationFlow::new(store.clone()),
            catalog: CatalogService::new(store.clone()),
            store,
            company,
        }
    }

    async fn fixture() -> Fixture {
        fixture_with(BookingConfig::default()).await
    }

    impl Fixture {
        async fn trip(&self, company_id: Uuid, price: Decimal, departs_in: Duration) -> Uuid {
            let now = Utc::now();
            self.store
                .add_trip(Trip {
                    id: Uuid::new_v4(),
                    company_id,
                    departure_city: "Istanbul".to_string(),
                    destination_city: "Ankara".to_string(),
                    departure_time: now + departs_in,
                    arrival_time: now + departs_in + Duration::hours(6),
                    bus_type: BusType::TwoPlusTwo,
                    capacity: 40,
                    price,
                    created_at: now,
                })
                .await
        }

        async fn coupon(&self, code: &str, company_id: Option<Uuid>, usage_limit: i32) -> Uuid {
            let now = Utc::now();
            self.store
                .add_coupon(Coupon {
                    id: Uuid::new_v4(),
                    code: code.to_string(),
                    discount: dec!(20),
                    company_id,
                    usage_limit,
                    expire_date: now + Duration::days(7),
                    created_at: now,
                })
                .await
        }
    }

    fn one_way(trip_id: Uuid, seats: Vec<i32>) -> Itinerary {
        Itinerary::OneWay { trip_id, seats }
    }

    #[tokio::test]
    async fn test_coupon_booking_scenario() {
        let f = fixture().await;
        let trip = f.trip(f.company, dec!(50), Duration::days(2)).await;
        let coupon = f.coupon("SAVE20", None, 10).await;
        let rider = f.store.add_rider(dec!(100)).await;

        let result = f
            .booking
            .book(rider, &one_way(trip, vec![1, 2]), Some("save20"))
            .await
            .unwrap();

        assert_eq!(result.subtotal, dec!(100));
        assert_eq!(result.discount_applied, dec!(20));
        assert_eq!(result.amount_paid, dec!(80));
        assert_eq!(result.new_balance, dec!(20));
        assert_eq!(result.coupon_used.as_deref(), Some("SAVE20"));
        assert_eq!(result.ticket_ids.len(), 1);

        assert_eq!(f.store.balance(rider).await, Some(dec!(20)));
        assert_eq!(f.store.coupon_redemptions(coupon).await, 1);
        let ticket = f.store.ticket(result.ticket_ids[0]).await.unwrap();
        assert_eq!(ticket.total_price, dec!(80));
        assert_eq!(ticket.discount, dec!(20));
        assert_eq!(f.store.taken_seats(trip).await, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_money_conservation_without_coupon() {
        let f = fixture().await;
        let trip = f.trip(f.company, dec!(37.50), Duration::days(1)).await;
        let rider = f.store.add_rider(dec!(800)).await;

        let result = f
            .booking
            .book(rider, &one_way(trip, vec![10, 11, 12]), None)
            .await
            .unwrap();

        assert_eq!(result.amount_paid, dec!(112.50));
        assert_eq!(dec!(800) - f.store.balance(rider).await.unwrap(), result.amount_paid);
        assert_eq!(result.coupon_used, None);

        let entries = f.store.balance_transactions(rider).await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].amount, dec!(-112.50));
    }

    #[tokio::test]
    async fn test_insufficient_balance_writes_nothing() {
        let f = fixture().await;
        let trip = f.trip(f.company, dec!(60), Duration::days(1)).await;
        let coupon = f.coupon("SAVE20", None, 10).await;
        let rider = f.store.add_rider(dec!(50)).await;

        let err = f
            .booking
            .book(rider, &one_way(trip, vec![1, 2]), Some("SAVE20"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::InsufficientBalance { .. }));
        assert_eq!(f.store.balance(rider).await, Some(dec!(50)));
        assert!(f.store.taken_seats(trip).await.is_empty());
        assert_eq!(f.store.coupon_redemptions(coupon).await, 0);
    }

    #[tokio::test]
    async fn test_unknown_trip_and_departed_trip() {
        let f = fixture().await;
        let rider = f.store.add_rider(dec!(500)).await;

        assert!(matches!(
            f.booking.book(rider, &one_way(Uuid::new_v4(), vec![1]), None).await,
            Err(AppError::TripNotFound(_))
        ));

        let gone = f.trip(f.company, dec!(50), Duration::hours(-1)).await;
        assert!(f.booking.book(rider, &one_way(gone, vec![1]), None).await.is_err());
        assert_eq!(f.store.balance(rider).await, Some(dec!(500)));
    }

    #[tokio::test]
    async fn test_round_trip_is_all_or_nothing() {
        let f = fixture().await;
        let out = f.trip(f.company, dec!(50), Duration::days(1)).await;
        let back = f.trip(f.company, dec!(50), Duration::days(3)).await;
        let first = f.store.add_rider(dec!(500)).await;
        let second = f.store.add_rider(dec!(500)).await;

        f.booking
            .book(first, &one_way(back, vec![7]), None)
            .await
            .unwrap();

        let round = Itinerary::RoundTrip {
            departure_trip: out,
            return_trip: back,
            departure_seats: vec![3, 4],
            return_seats: vec![7],
        };
        let err = f.booking.book(second, &round, None).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Seat 7 is no longer available. Please select different seats."
        );

        let map = f.catalog.seat_map(out).await.unwrap();
        assert!(map.booked_seats.is_empty());
        assert_eq!(f.store.balance(second).await, Some(dec!(500)));
    }

    #[tokio::test]
    async fn test_round_trip_prorates_discount() {
        let f = fixture().await;
        let out = f.trip(f.company, dec!(100), Duration::days(1)).await;
        let back = f.trip(f.company, dec!(50), Duration::days(2)).await;
        f.coupon("ROUND20", Some(f.company), 5).await;
        let rider = f.store.add_rider(dec!(500)).await;

        let round = Itinerary::RoundTrip {
            departure_trip: out,
            return_trip: back,
            departure_seats: vec![1],
            return_seats: vec![1],
        };
        let result = f.booking.book(rider, &round, Some("ROUND20")).await.unwrap();

        assert_eq!(result.amount_paid, dec!(120));
        let departure = f.store.ticket(result.ticket_ids[0]).await.unwrap();
        let ret = f.store.ticket(result.ticket_ids[1]).await.unwrap();
        assert_eq!(departure.trip_id, out);
        assert_eq!(departure.total_price, dec!(80));
        assert_eq!(ret.total_price, dec!(40));
        assert_eq!(departure.total_price + ret.total_price, result.amount_paid);
    }

    #[tokio::test]
    async fn test_leg_subtotal_allocation_keeps_undiscounted_prices() {
        let f = fixture_with(BookingConfig {
            discount_allocation: DiscountAllocation::LegSubtotal,
            ..BookingConfig::default()
        })
        .await;
        let out = f.trip(f.company, dec!(100), Duration::days(1)).await;
        let back = f.trip(f.company, dec!(50), Duration::days(2)).await;
        f.coupon("ROUND20", None, 5).await;
        let rider = f.store.add_rider(dec!(500)).await;

        let round = Itinerary::RoundTrip {
            departure_trip: out,
            return_trip: back,
            departure_seats: vec![2],
            return_seats: vec![2],
        };
        let result = f.booking.book(rider, &round, Some("ROUND20")).await.unwrap();

        assert_eq!(result.amount_paid, dec!(120));
        let departure = f.store.ticket(result.ticket_ids[0]).await.unwrap();
        assert_eq!(departure.total_price, dec!(100));
        assert_eq!(departure.discount, dec!(0));
    }

    #[tokio::test]
    async fn test_coupon_single_use_per_rider() {
        let f = fixture().await;
        let trip = f.trip(f.company, dec!(10), Duration::days(1)).await;
        let coupon = f.coupon("ONCE", None, 2).await;
        let a = f.store.add_rider(dec!(100)).await;
        let b = f.store.add_rider(dec!(100)).await;
        let c = f.store.add_rider(dec!(100)).await;

        f.booking.book(a, &one_way(trip, vec![1]), Some("ONCE")).await.unwrap();
        assert!(matches!(
            f.booking.book(a, &one_way(trip, vec![2]), Some("ONCE")).await,
            Err(AppError::CouponAlreadyUsed)
        ));

        f.booking.book(b, &one_way(trip, vec![3]), Some("ONCE")).await.unwrap();
        assert!(matches!(
            f.booking.book(c, &one_way(trip, vec![4]), Some("ONCE")).await,
            Err(AppError::CouponUsageLimitReached)
        ));

        assert_eq!(f.store.coupon_redemptions(coupon).await, 2);
        assert_eq!(f.store.balance(c).await, Some(dec!(100)));
    }

    #[tokio::test]
    async fn test_coupon_of_other_company_rejected() {
        let f = fixture().await;
        let other = f.store.add_company("Pamukkale").await;
        let trip = f.trip(f.company, dec!(40), Duration::days(1)).await;
        f.coupon("PAMUK", Some(other), 10).await;
        let rider = f.store.add_rider(dec!(100)).await;

        let err = f
            .booking
            .book(rider, &one_way(trip, vec![1]), Some("PAMUK"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "This coupon is only valid for Pamukkale trips.");
        assert!(f.store.taken_seats(trip).await.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_racing_riders_for_the_same_seat() {
        let f = fixture().await;
        let trip = f.trip(f.company, dec!(50), Duration::days(1)).await;
        let a = f.store.add_rider(dec!(100)).await;
        let b = f.store.add_rider(dec!(100)).await;

        let handles: Vec<_> = [a, b]
            .into_iter()
            .map(|rider| {
                let booking = f.booking.clone();
                tokio::spawn(async move {
                    booking.book(rider, &one_way(trip, vec![5]), None).await
                })
            })
            .collect();

        let results: Vec<_> = futures::future::join_all(handles)
            .await
            .into_iter()
            .map(|joined| joined.unwrap())
            .collect();

        let winners = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(winners, 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(AppError::SeatConflict { seat: 5 }))));

        let balances = [
            f.store.balance(a).await.unwrap(),
            f.store.balance(b).await.unwrap(),
        ];
        assert!(balances.contains(&dec!(50)));
        assert!(balances.contains(&dec!(100)));
        assert_eq!(f.store.taken_seats(trip).await, vec![5]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_contended_seats_are_sold_once() {
        let f = fixture().await;
        let trip = f.trip(f.company, dec!(10), Duration::days(1)).await;

        // Every seat of the bus is requested by two different riders at once
        let mut handles = Vec::new();
        for seat in 1..=40 {
            for _ in 0..2 {
                let rider = f.store.add_rider(dec!(100)).await;
                let booking = f.booking.clone();
                handles.push(tokio::spawn(async move {
                    booking.book(rider, &one_way(trip, vec![seat]), None).await
                }));
            }
        }

        let results = futures::future::join_all(handles).await;
        let booked = results
            .iter()
            .filter(|r| matches!(r, Ok(Ok(_))))
            .count();
        let conflicts = results
            .iter()
            .filter(|r| matches!(r, Ok(Err(AppError::SeatConflict { .. }))))
            .count();

        assert_eq!(booked, 40);
        assert_eq!(conflicts, 40);
        assert_eq!(f.store.taken_seats(trip).await, (1..=40).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_cancel_refunds_once() {
        let f = fixture().await;
        let trip = f.trip(f.company, dec!(50), Duration::days(1)).await;
        let rider = f.store.add_rider(dec!(100)).await;

        let booked = f
            .booking
            .book(rider, &one_way(trip, vec![8, 9]), None)
            .await
            .unwrap();
        let ticket_id = booked.ticket_ids[0];

        let cancelled = f
            .cancellation
            .cancel(ticket_id, Requester::Rider(rider))
            .await
            .unwrap();
        assert_eq!(cancelled.refund_amount, dec!(100));
        assert_eq!(cancelled.new_balance, dec!(100));

        assert!(matches!(
            f.cancellation.cancel(ticket_id, Requester::Rider(rider)).await,
            Err(AppError::AlreadyCancelled)
        ));
        assert_eq!(f.store.balance(rider).await, Some(dec!(100)));
        assert!(f.store.taken_seats(trip).await.is_empty());

        // The freed seat can be sold again
        let other = f.store.add_rider(dec!(100)).await;
        assert!(f.booking.book(other, &one_way(trip, vec![9]), None).await.is_ok());
    }

    #[tokio::test]
    async fn test_cancel_inside_cutoff_changes_nothing() {
        let f = fixture().await;
        let trip = f.trip(f.company, dec!(50), Duration::minutes(30)).await;
        let rider = f.store.add_rider(dec!(100)).await;

        let booked = f.booking.book(rider, &one_way(trip, vec![1]), None).await.unwrap();
        let err = f
            .cancellation
            .cancel(booked.ticket_ids[0], Requester::Rider(rider))
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Cannot cancel ticket within 1 hour of departure time."
        );
        assert_eq!(f.store.balance(rider).await, Some(dec!(50)));
        let ticket = f.store.ticket(booked.ticket_ids[0]).await.unwrap();
        assert_eq!(ticket.status, TicketStatus::Active);
    }

    #[tokio::test]
    async fn test_cancel_permissions() {
        let f = fixture().await;
        let other_company = f.store.add_company("Metro").await;
        let trip = f.trip(f.company, dec!(50), Duration::days(1)).await;
        let rider = f.store.add_rider(dec!(100)).await;
        let stranger = f.store.add_rider(dec!(100)).await;

        let booked = f.booking.book(rider, &one_way(trip, vec![1]), None).await.unwrap();
        let ticket_id = booked.ticket_ids[0];

        assert!(matches!(
            f.cancellation.cancel(ticket_id, Requester::Rider(stranger)).await,
            Err(AppError::PermissionDenied(_))
        ));
        assert!(matches!(
            f.cancellation
                .cancel(ticket_id, Requester::CompanyOperator { company_id: other_company })
                .await,
            Err(AppError::PermissionDenied(_))
        ));
        assert!(matches!(
            f.cancellation.cancel(Uuid::new_v4(), Requester::Rider(rider)).await,
            Err(AppError::TicketNotFound(_))
        ));

        let cancelled = f
            .cancellation
            .cancel(ticket_id, Requester::CompanyOperator { company_id: f.company })
            .await
            .unwrap();
        assert_eq!(cancelled.rider_id, rider);
        assert_eq!(f.store.balance(rider).await, Some(dec!(100)));
    }

    #[tokio::test]
    async fn test_delete_trip_refunds_every_active_ticket() {
        let f = fixture().await;
        let trip = f.trip(f.company, dec!(25), Duration::days(1)).await;
        let keep = f.trip(f.company, dec!(25), Duration::days(2)).await;
        let a = f.store.add_rider(dec!(100)).await;
        let b = f.store.add_rider(dec!(100)).await;

        f.booking.book(a, &one_way(trip, vec![1, 2]), None).await.unwrap();
        let b_first = f.booking.book(b, &one_way(trip, vec![3]), None).await.unwrap();
        f.booking.book(b, &one_way(keep, vec![3]), None).await.unwrap();
        f.booking.book(b, &one_way(trip, vec![4]), None).await.unwrap();

        // Already cancelled tickets are not refunded a second time
        f.cancellation
            .cancel(b_first.ticket_ids[0], Requester::Rider(b))
            .await
            .unwrap();

        assert!(matches!(
            f.cancellation.delete_trip(trip, Uuid::new_v4()).await,
            Err(AppError::PermissionDenied(_))
        ));

        let deletion = f.cancellation.delete_trip(trip, f.company).await.unwrap();
        assert_eq!(deletion.cancelled_tickets, 2);
        assert_eq!(deletion.refunded_total, dec!(75));

        assert_eq!(f.store.balance(a).await, Some(dec!(100)));
        assert_eq!(f.store.balance(b).await, Some(dec!(75)));
        assert!(f.store.trip(trip).await.is_none());
        assert!(f.store.trip(keep).await.is_some());
        assert!(matches!(
            f.cancellation.delete_trip(trip, f.company).await,
            Err(AppError::TripNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_trip_ignores_departure_cutoff() {
        let f = fixture().await;
        let trip = f.trip(f.company, dec!(30), Duration::minutes(20)).await;
        let rider = f.store.add_rider(dec!(100)).await;

        let booked = f.booking.book(rider, &one_way(trip, vec![6]), None).await.unwrap();
        assert!(matches!(
            f.cancellation
                .cancel(booked.ticket_ids[0], Requester::CompanyOperator { company_id: f.company })
                .await,
            Err(AppError::CancellationWindowClosed)
        ));

        let deletion = f.cancellation.delete_trip(trip, f.company).await.unwrap();
        assert_eq!(deletion.cancelled_tickets, 1);
        assert_eq!(f.store.balance(rider).await, Some(dec!(100)));
    }

    #[tokio::test]
    async fn test_preview_has_no_side_effects() {
        let f = fixture().await;
        let trip = f.trip(f.company, dec!(50), Duration::days(1)).await;
        let coupon = f.coupon("SAVE20", Some(f.company), 1).await;
        let rider = f.store.add_rider(dec!(100)).await;

        let preview = f
            .booking
            .preview_coupon(rider, &one_way(trip, vec![1, 2]), "save20")
            .await
            .unwrap();
        assert_eq!(preview.original_amount, dec!(100));
        assert_eq!(preview.discount_amount, dec!(20));
        assert_eq!(preview.final_amount, dec!(80));
        assert_eq!(preview.discount_type, "percentage");

        assert_eq!(f.store.coupon_redemptions(coupon).await, 0);
        assert_eq!(f.store.balance(rider).await, Some(dec!(100)));
        assert!(f.store.taken_seats(trip).await.is_empty());

        assert!(matches!(
            f.booking
                .preview_coupon(rider, &one_way(trip, vec![1]), "MISSING")
                .await,
            Err(AppError::InvalidCoupon)
        ));
    }

    #[tokio::test]
    async fn test_rider_tickets_show_derived_status() {
        let f = fixture().await;
        let soon = f.trip(f.company, dec!(20), Duration::days(1)).await;
        let later = f.trip(f.company, dec!(20), Duration::days(2)).await;
        let rider = f.store.add_rider(dec!(100)).await;

        let first = f.booking.book(rider, &one_way(soon, vec![1]), None).await.unwrap();
        f.booking.book(rider, &one_way(later, vec![2]), None).await.unwrap();
        f.cancellation
            .cancel(first.ticket_ids[0], Requester::Rider(rider))
            .await
            .unwrap();

        let tickets = f.catalog.tickets_for_rider(rider).await.unwrap();
        assert_eq!(tickets.len(), 2);
        assert_eq!(tickets[0].trip_id, later);
        assert_eq!(tickets[0].status, DisplayStatus::Active);
        assert_eq!(tickets[1].status, DisplayStatus::Cancelled);
        assert_eq!(tickets[1].company_name, "Kamil Koc");
    }
}
