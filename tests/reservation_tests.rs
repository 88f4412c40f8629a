mod common;

use chrono::{Duration, Utc};
use ride_engine::error::AppError;
use ride_engine::models::ReservationStatus;
use ride_engine::repositories::ReservationStore;
use rust_decimal_macros::dec;

#[tokio::test]
async fn test_reservation_countdown_starts_at_five_minutes() {
    let engine = common::engine();
    let user = engine.register_user();
    let vehicle = engine.register_vehicle();

    let reservation = engine
        .reservations
        .create(user, vehicle)
        .await
        .expect("create reservation");

    let remaining = engine
        .reservations
        .remaining_seconds(reservation.id, user)
        .await
        .expect("countdown");
    assert!(remaining > 290 && remaining <= 300, "got {}", remaining);
}

#[tokio::test]
async fn test_convert_just_before_deadline_succeeds() {
    let engine = common::engine();
    let user = engine.register_user();
    let vehicle = engine.register_vehicle();

    let reservation = engine.reservations.create(user, vehicle).await.unwrap();
    // One second left on the hold.
    engine
        .set_reservation_deadline(reservation.id, Utc::now() + Duration::seconds(1))
        .await;

    let trip = engine
        .trips
        .start_from_reservation(reservation.id, user)
        .await
        .expect("convert within window");
    assert_eq!(trip.vehicle_id, vehicle);

    let stored = engine
        .reservation_store
        .find_by_id(reservation.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, ReservationStatus::Converted);
}

#[tokio::test]
async fn test_convert_after_deadline_fails_expired() {
    let engine = common::engine();
    let user = engine.register_user();
    let vehicle = engine.register_vehicle();

    let reservation = engine.reservations.create(user, vehicle).await.unwrap();
    engine
        .set_reservation_deadline(reservation.id, Utc::now() - Duration::seconds(1))
        .await;

    let err = engine
        .trips
        .start_from_reservation(reservation.id, user)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Expired));

    // No trip came into existence.
    assert!(engine
        .trips
        .list_for_user(user)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creates_for_same_vehicle_one_winner() {
    for _ in 0..25 {
        let engine = common::engine();
        let user_a = engine.register_user();
        let user_b = engine.register_user();
        let vehicle = engine.register_vehicle();

        let service_a = engine.reservations.clone();
        let service_b = engine.reservations.clone();
        let a = tokio::spawn(async move { service_a.create(user_a, vehicle).await });
        let b = tokio::spawn(async move { service_b.create(user_b, vehicle).await });

        let a = a.await.expect("join");
        let b = b.await.expect("join");

        let winners = [&a, &b].iter().filter(|r| r.is_ok()).count();
        assert_eq!(winners, 1, "exactly one reservation must win the vehicle");

        let loser = if a.is_err() { a } else { b };
        assert!(matches!(loser.unwrap_err(), AppError::VehicleUnavailable));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creates_for_same_user_one_winner() {
    for _ in 0..25 {
        let engine = common::engine();
        let user = engine.register_user();
        let vehicle_a = engine.register_vehicle();
        let vehicle_b = engine.register_vehicle();

        let service_a = engine.reservations.clone();
        let service_b = engine.reservations.clone();
        let a = tokio::spawn(async move { service_a.create(user, vehicle_a).await });
        let b = tokio::spawn(async move { service_b.create(user, vehicle_b).await });

        let a = a.await.expect("join");
        let b = b.await.expect("join");

        let winners = [&a, &b].iter().filter(|r| r.is_ok()).count();
        assert_eq!(winners, 1, "a user holds at most one reservation");

        let loser = if a.is_err() { a } else { b };
        assert!(matches!(loser.unwrap_err(), AppError::AlreadyReserved));
    }
}

#[tokio::test]
async fn test_second_reservation_for_held_vehicle_rejected() {
    let engine = common::engine();
    let user_a = engine.register_user();
    let user_b = engine.register_user();
    let vehicle = engine.register_vehicle();

    engine.reservations.create(user_a, vehicle).await.unwrap();
    let err = engine.reservations.create(user_b, vehicle).await.unwrap_err();
    assert!(matches!(err, AppError::VehicleUnavailable));
}

#[tokio::test]
async fn test_cancel_never_charges() {
    let engine = common::engine();
    let user = engine.register_user();
    let vehicle = engine.register_vehicle();

    engine
        .settlement
        .top_up(user, dec!(50), "CARD ****4242")
        .await
        .unwrap();

    let reservation = engine.reservations.create(user, vehicle).await.unwrap();
    // Hold for a while before releasing; still free of charge.
    engine
        .set_reservation_deadline(reservation.id, Utc::now() + Duration::seconds(10))
        .await;
    let cancelled = engine.reservations.cancel(reservation.id, user).await.unwrap();

    assert_eq!(cancelled.status, ReservationStatus::Cancelled);
    assert_eq!(engine.settlement.balance(user).await.unwrap(), dec!(50));
    // Only the top-up is on the ledger.
    assert_eq!(engine.settlement.transactions(user).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_cancelled_reservation_cannot_convert() {
    let engine = common::engine();
    let user = engine.register_user();
    let vehicle = engine.register_vehicle();

    let reservation = engine.reservations.create(user, vehicle).await.unwrap();
    engine.reservations.cancel(reservation.id, user).await.unwrap();

    let err = engine
        .trips
        .start_from_reservation(reservation.id, user)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));
}

#[tokio::test]
async fn test_sweep_releases_vehicle_for_new_hold() {
    let engine = common::engine();
    let user_a = engine.register_user();
    let user_b = engine.register_user();
    let vehicle = engine.register_vehicle();

    let stale = engine.reservations.create(user_a, vehicle).await.unwrap();
    engine
        .set_reservation_deadline(stale.id, Utc::now() - Duration::seconds(30))
        .await;

    let transitioned = engine.reservations.sweep_expired().await.unwrap();
    assert_eq!(transitioned, 1);

    let stored = engine
        .reservation_store
        .find_by_id(stale.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, ReservationStatus::Expired);

    engine
        .reservations
        .create(user_b, vehicle)
        .await
        .expect("vehicle slot released by sweep");
}

#[tokio::test]
async fn test_stale_hold_releases_slot_without_sweep() {
    let engine = common::engine();
    let user_a = engine.register_user();
    let user_b = engine.register_user();
    let vehicle = engine.register_vehicle();

    let stale = engine.reservations.create(user_a, vehicle).await.unwrap();
    engine
        .set_reservation_deadline(stale.id, Utc::now() - Duration::seconds(30))
        .await;

    // No sweep ran; expiry is evaluated lazily at create time.
    engine
        .reservations
        .create(user_b, vehicle)
        .await
        .expect("lapsed hold must not block a new reservation");
}

#[tokio::test]
async fn test_foreign_reservation_access_denied() {
    let engine = common::engine();
    let user = engine.register_user();
    let stranger = engine.register_user();
    let vehicle = engine.register_vehicle();

    let reservation = engine.reservations.create(user, vehicle).await.unwrap();

    let err = engine
        .reservations
        .get(reservation.id, stranger)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));

    let err = engine
        .reservations
        .cancel(reservation.id, stranger)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));
}
