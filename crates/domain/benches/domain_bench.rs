use chrono::Utc;
use common::{ArticleId, LocationId, OrderId, OrderLineId};
use criterion::{Criterion, criterion_group, criterion_main};
use domain::delivery::metadata;
use domain::invoice::{format_number, last_sequence};
use domain::{
    DeliveryStatus, FeeSnapshot, LocationCategory, Money, OrderLine, OrderTotals,
    TransitionRequest,
};

fn make_lines(count: u32) -> Vec<OrderLine> {
    let order_id = OrderId::new();
    (0..count)
        .map(|i| OrderLine {
            id: OrderLineId::new(),
            order_id,
            article_id: ArticleId::new(),
            quantity: i % 5 + 1,
            unit_price: Money::from_units(i64::from(i) * 100 + 500),
            created_at: Utc::now(),
        })
        .collect()
}

fn bench_order_totals(c: &mut Criterion) {
    let lines = make_lines(50);
    let fee = FeeSnapshot::capture(LocationId::new(), LocationCategory::Peripherie, None, Utc::now());

    c.bench_function("domain/order_totals_50_lines", |b| {
        b.iter(|| OrderTotals::compute(&lines, Some(&fee)).unwrap());
    });
}

fn bench_invoice_sequence_scan(c: &mut Criterion) {
    let numbers: Vec<String> = (1..=5_000).map(|i| format_number(2025, i)).collect();

    c.bench_function("domain/invoice_last_sequence_5000", |b| {
        b.iter(|| last_sequence(numbers.iter().map(String::as_str), 2025));
    });
}

fn bench_transition_checks(c: &mut Criterion) {
    c.bench_function("domain/delivery_transition_table", |b| {
        b.iter(|| {
            DeliveryStatus::ALL
                .iter()
                .flat_map(|from| DeliveryStatus::ALL.iter().map(move |to| from.check_transition(*to).is_ok()))
                .filter(|ok| *ok)
                .count()
        });
    });
}

fn bench_metadata_coercion(c: &mut Criterion) {
    let request = TransitionRequest {
        reason: Some("client absent".into()),
        comment: Some("rappeler demain".into()),
        date_prevue: Utc::now().date_naive().succ_opt(),
    };

    c.bench_function("domain/metadata_coerce", |b| {
        b.iter(|| metadata::coerce(&serde_json::json!({ "payload": &request })).unwrap());
    });
}

criterion_group!(
    benches,
    bench_order_totals,
    bench_invoice_sequence_scan,
    bench_transition_checks,
    bench_metadata_coercion
);
criterion_main!(benches);
