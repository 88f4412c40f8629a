use chrono::Duration;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;
use uuid::Uuid;

use ride_engine::fare::FareSchedule;
use ride_engine::models::Reservation;
use ride_engine::repositories::{InMemoryReservationStore, ReservationStore};
use ride_engine::services::ReceiptService;

fn benchmark_fare_calculation(c: &mut Criterion) {
    let mut group = c.benchmark_group("fare");
    let schedule = FareSchedule::default();

    for minutes in [1i64, 20, 240].iter() {
        group.bench_with_input(
            BenchmarkId::new("breakdown", minutes),
            minutes,
            |b, &minutes| {
                let elapsed = Duration::minutes(minutes);
                b.iter(|| black_box(schedule.breakdown(black_box(elapsed))));
            },
        );
    }

    group.finish();
}

fn benchmark_reservation_store(c: &mut Criterion) {
    let mut group = c.benchmark_group("reservation_store");
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("runtime");

    group.bench_function("create_exclusive_disjoint", |b| {
        let store = Arc::new(InMemoryReservationStore::new());
        b.to_async(&rt).iter(|| {
            let store = store.clone();
            async move {
                let reservation =
                    Reservation::new(Uuid::new_v4(), Uuid::new_v4(), Duration::minutes(5));
                black_box(store.create_exclusive(reservation).await.unwrap())
            }
        });
    });

    group.finish();
}

fn benchmark_receipt_numbering(c: &mut Criterion) {
    c.bench_function("receipt_number", |b| {
        let trip_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        let ended_at = chrono::Utc::now();
        b.iter(|| {
            black_box(ReceiptService::receipt_number(
                black_box(trip_id),
                black_box(user_id),
                black_box(ended_at),
            ))
        });
    });
}

criterion_group!(
    benches,
    benchmark_fare_calculation,
    benchmark_reservation_store,
    benchmark_receipt_numbering
);
criterion_main!(benches);
