use std::sync::Arc;

use backoffice::{
    Backoffice, CancelPaymentRequest, ClientInput, CreateDelivery, CreateOrder, LocationInput,
    NewArticle, NewLocation, NewPurchase, OrderQuery, PayRequest, PaymentQuery, ScheduleRequest,
    ServiceError, StatusChange, UpdateOrder, UpdatePurchase,
};
use chrono::{NaiveDate, TimeZone, Utc};
use common::{Actor, ArticleId, FixedClock, LocationId, UserId};
use domain::{
    DeliveryStatus, InvoiceKind, LineRequest, LocationCategory, Money, OrderStatus, PaymentMode,
    PaymentStatus, PurchaseLineRequest, TransitionRequest,
};
use store::MemoryStore;

fn clock() -> FixedClock {
    FixedClock::new(Utc.with_ymd_and_hms(2025, 5, 20, 9, 0, 0).unwrap())
}

fn service() -> (Backoffice<MemoryStore>, FixedClock) {
    let clock = clock();
    let service = Backoffice::new(MemoryStore::new()).with_clock(Arc::new(clock.clone()));
    (service, clock)
}

fn cashier() -> Actor {
    Actor::user(UserId::new(1))
}

async fn article(service: &Backoffice<MemoryStore>, reference: &str, price: i64, stock: i64) -> ArticleId {
    service
        .create_article(NewArticle {
            name: format!("Article {reference}"),
            reference: reference.to_string(),
            purchase_price: Money::from_units(price / 2),
            sale_price: Money::from_units(price),
            description: String::new(),
            stock,
        })
        .await
        .unwrap()
        .id
}

async fn ville(service: &Backoffice<MemoryStore>) -> LocationId {
    service
        .create_location(NewLocation {
            name: "Analakely".to_string(),
            category: LocationCategory::Ville,
            active: true,
        })
        .await
        .unwrap()
        .id
}

fn order_input(location: LocationId, lines: &[(ArticleId, i64)]) -> CreateOrder {
    CreateOrder {
        client_input: ClientInput::named("Rabe", Some("034 00 000 01")),
        lieu_input: LocationInput::existing(location),
        lignes: lines
            .iter()
            .map(|(article_id, quantity)| LineRequest {
                article_id: *article_id,
                quantity: *quantity,
            })
            .collect(),
        ..Default::default()
    }
}

async fn stock(service: &Backoffice<MemoryStore>, id: ArticleId) -> i64 {
    service.get_article(id).await.unwrap().stock
}

#[tokio::test]
async fn full_order_lifecycle() {
    let (service, _) = service();
    let a = article(&service, "A", 1000, 10).await;
    let b = article(&service, "B", 500, 5).await;
    let lieu = ville(&service).await;

    let order = service
        .create_order(order_input(lieu, &[(a, 3), (b, 1)]), &cashier())
        .await
        .unwrap();
    assert_eq!(order.totals.total_articles, 3500);
    assert_eq!(order.totals.frais_final, 3000);
    assert_eq!(order.totals.total_commande, 6500);
    assert_eq!(order.order.status, OrderStatus::Pending);
    assert_eq!(stock(&service, a).await, 7);
    assert_eq!(stock(&service, b).await, 4);

    let invoice = service.invoice_details(order.id()).await.unwrap();
    assert_eq!(invoice.type_facture, InvoiceKind::Proforma);
    assert_eq!(invoice.numero, "202500001");

    let paid = service
        .pay(
            order.id(),
            &PayRequest {
                mode: PaymentMode::Cash,
                reference: None,
                note: None,
            },
            &cashier(),
        )
        .await
        .unwrap();
    assert_eq!(paid.paiement_statut, PaymentStatus::Paid);

    let invoice_after = service.invoice_details(order.id()).await.unwrap();
    assert_eq!(invoice_after.type_facture, InvoiceKind::Final);
    assert_eq!(invoice_after.numero, invoice.numero);
    assert_eq!(invoice_after.numero_affiche, "F-202500001");

    let synced = service.reconcile_deliveries(&cashier()).await.unwrap();
    assert_eq!(synced, 1);
    let delivery = service
        .delivery_for_order(order.id())
        .await
        .unwrap()
        .unwrap();

    service
        .transition_delivery(
            delivery.id,
            DeliveryStatus::OutForDelivery,
            &TransitionRequest::default(),
            &cashier(),
        )
        .await
        .unwrap();
    let delivered = service
        .transition_delivery(
            delivery.id,
            DeliveryStatus::Delivered,
            &TransitionRequest::default(),
            &cashier(),
        )
        .await
        .unwrap();
    let today = NaiveDate::from_ymd_opt(2025, 5, 20).unwrap();
    assert_eq!(delivered.delivery.date_prevue, Some(today));
    assert!(delivered.delivery.date_reelle.is_some());
    let order_after = service.get_order(order.id()).await.unwrap();
    assert_eq!(order_after.order.status, OrderStatus::Delivered);
    assert_eq!(order_after.order.date_livraison, Some(today));

    let err = service
        .transition_delivery(
            delivery.id,
            DeliveryStatus::Postponed,
            &TransitionRequest::default(),
            &cashier(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), "delivery_finalized");
    let history = service.delivery_history(delivery.id).await.unwrap();
    assert_eq!(history.delivery.status, DeliveryStatus::Delivered);
    assert_eq!(history.events.len(), 3);
}

#[tokio::test]
async fn create_then_delete_leaves_stock_unchanged() {
    let (service, _) = service();
    let a = article(&service, "A", 1000, 10).await;
    let lieu = ville(&service).await;

    let order = service
        .create_order(order_input(lieu, &[(a, 4)]), &cashier())
        .await
        .unwrap();
    assert_eq!(stock(&service, a).await, 6);

    service.delete_order(order.id()).await.unwrap();
    assert_eq!(stock(&service, a).await, 10);
    let err = service.get_order(order.id()).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { .. }));
}

#[tokio::test]
async fn update_replaces_lines_and_resets_status() {
    let (service, _) = service();
    let a = article(&service, "A", 1000, 10).await;
    let b = article(&service, "B", 500, 10).await;
    let lieu = ville(&service).await;

    let order = service
        .create_order(order_input(lieu, &[(a, 3)]), &cashier())
        .await
        .unwrap();
    let delivery = service
        .create_delivery(
            &CreateDelivery {
                order_id: order.id(),
                date_prevue: None,
            },
            &cashier(),
        )
        .await
        .unwrap();
    service
        .transition_delivery(
            delivery.delivery.id,
            DeliveryStatus::OutForDelivery,
            &TransitionRequest::default(),
            &cashier(),
        )
        .await
        .unwrap();

    let updated = service
        .update_order(
            order.id(),
            UpdateOrder {
                lignes: Some(vec![LineRequest {
                    article_id: b,
                    quantity: 2,
                }]),
                note: Some("  sonner deux fois ".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.order.status, OrderStatus::Pending);
    assert_eq!(updated.order.note, "sonner deux fois");
    assert_eq!(updated.lignes_detail.len(), 1);
    assert_eq!(updated.totals.total_articles, 1000);
    assert_eq!(stock(&service, a).await, 10);
    assert_eq!(stock(&service, b).await, 8);

    service.delete_order(order.id()).await.unwrap();
    assert_eq!(stock(&service, b).await, 10);
}

#[tokio::test]
async fn line_price_is_captured_at_creation() {
    let (service, _) = service();
    let a = article(&service, "A", 1000, 10).await;
    let lieu = ville(&service).await;
    let order = service
        .create_order(order_input(lieu, &[(a, 1)]), &cashier())
        .await
        .unwrap();

    service
        .create_purchase(
            NewPurchase {
                supplier: "Grossiste".to_string(),
                lignes: vec![PurchaseLineRequest {
                    article_id: a,
                    quantity: 5,
                    unit_cost: Money::from_units(800),
                    unit_sale_price: Money::from_units(1500),
                    update_article_prices: true,
                }],
                ..Default::default()
            },
            &cashier(),
        )
        .await
        .unwrap();
    assert_eq!(service.get_article(a).await.unwrap().sale_price, Money::from_units(1500));

    let detail = service.get_order(order.id()).await.unwrap();
    assert_eq!(detail.totals.total_articles, 1000);
}

#[tokio::test]
async fn unknown_article_rolls_back_everything() {
    let (service, _) = service();
    let a = article(&service, "A", 1000, 10).await;
    let lieu = ville(&service).await;

    let err = service
        .create_order(order_input(lieu, &[(a, 2), (ArticleId::new(), 1)]), &cashier())
        .await
        .unwrap_err();
    assert_eq!(err.field(), Some("lignes[1].article"));
    assert_eq!(stock(&service, a).await, 10);
    let listed = service.list_orders(&OrderQuery::default()).await.unwrap();
    assert_eq!(listed.count, 0);
    assert!(service.list_clients(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn oversized_line_total_is_a_validation_error() {
    let (service, _) = service();
    let small = article(&service, "A", 1000, 10).await;
    let dear = article(&service, "GEN", 9_999_999_999, 0).await;
    let lieu = ville(&service).await;

    let err = service
        .create_order(
            order_input(lieu, &[(small, 1), (dear, 1_000_000_000)]),
            &cashier(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), "validation_error");
    assert_eq!(err.field(), Some("lignes[1].quantite"));
    assert_eq!(stock(&service, small).await, 10);
    let listed = service.list_orders(&OrderQuery::default()).await.unwrap();
    assert_eq!(listed.count, 0);
}

#[tokio::test]
async fn repeated_articles_in_any_order_debit_each_line() {
    let (service, _) = service();
    let a = article(&service, "A", 1000, 20).await;
    let b = article(&service, "B", 500, 20).await;
    let lieu = ville(&service).await;

    service
        .create_order(order_input(lieu, &[(a, 1), (b, 2), (a, 3)]), &cashier())
        .await
        .unwrap();
    let order = service
        .create_order(order_input(lieu, &[(b, 1), (a, 1)]), &cashier())
        .await
        .unwrap();
    assert_eq!(stock(&service, a).await, 15);
    assert_eq!(stock(&service, b).await, 17);

    service.delete_order(order.id()).await.unwrap();
    assert_eq!(stock(&service, a).await, 16);
    assert_eq!(stock(&service, b).await, 18);
}

#[tokio::test]
async fn oversell_is_clamped_not_rejected() {
    let (service, _) = service();
    let a = article(&service, "A", 1000, 2).await;
    let lieu = ville(&service).await;

    service
        .create_order(order_input(lieu, &[(a, 5)]), &cashier())
        .await
        .unwrap();
    assert_eq!(stock(&service, a).await, 0);
}

#[tokio::test]
async fn fee_override_and_location_change_create_new_snapshots() {
    let (service, _) = service();
    let a = article(&service, "A", 1000, 10).await;
    let lieu = ville(&service).await;
    let mut input = order_input(lieu, &[(a, 1)]);
    input.frais_override = Some(4500);
    let order = service.create_order(input, &cashier()).await.unwrap();
    assert_eq!(order.totals.frais_final, 4500);

    let moved = service
        .update_order(
            order.id(),
            UpdateOrder {
                lieu_input: Some(LocationInput::named("Tamatave")),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_ne!(moved.order.fee_id, order.order.fee_id);
    assert_eq!(moved.totals.frais_final, 0);
    assert_eq!(moved.lieu_detail.unwrap().categorie, LocationCategory::Autre);

    let untouched = service
        .update_order(order.id(), UpdateOrder::default())
        .await
        .unwrap();
    assert_eq!(untouched.order.fee_id, moved.order.fee_id);
}

#[tokio::test]
async fn pay_twice_fails_once() {
    let (service, clock) = service();
    let a = article(&service, "A", 1000, 10).await;
    let lieu = ville(&service).await;
    let order = service
        .create_order(order_input(lieu, &[(a, 1)]), &cashier())
        .await
        .unwrap();

    let request = PayRequest {
        mode: PaymentMode::Mvola,
        reference: Some("MP250520.1234".to_string()),
        note: None,
    };
    service.pay(order.id(), &request, &cashier()).await.unwrap();
    let first = service.payment_for_order(order.id()).await.unwrap().unwrap();

    clock.set(Utc.with_ymd_and_hms(2025, 5, 21, 9, 0, 0).unwrap());
    let second = PayRequest {
        mode: PaymentMode::Cash,
        reference: None,
        note: None,
    };
    let err = service.pay(order.id(), &second, &cashier()).await.unwrap_err();
    assert_eq!(err.code(), "already_paid");

    let after = service.payment_for_order(order.id()).await.unwrap().unwrap();
    assert_eq!(after.mode, Some(PaymentMode::Mvola));
    assert_eq!(after.collected_at, first.collected_at);

    let err = service
        .cancel_payment(order.id(), &CancelPaymentRequest::default(), &cashier())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "payment_completed");
}

#[tokio::test]
async fn concurrent_payments_succeed_once() {
    let (service, _) = service();
    let a = article(&service, "A", 1000, 10).await;
    let lieu = ville(&service).await;
    let order = service
        .create_order(order_input(lieu, &[(a, 1)]), &cashier())
        .await
        .unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let service = service.clone();
            let order_id = order.id();
            tokio::spawn(async move {
                let request = PayRequest {
                    mode: PaymentMode::Cash,
                    reference: None,
                    note: None,
                };
                service.pay(order_id, &request, &cashier()).await
            })
        })
        .collect();

    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(err) => assert_eq!(err.code(), "already_paid"),
        }
    }
    assert_eq!(successes, 1);
}

#[tokio::test]
async fn mobile_money_requires_reference() {
    let (service, _) = service();
    let a = article(&service, "A", 1000, 10).await;
    let lieu = ville(&service).await;
    let order = service
        .create_order(order_input(lieu, &[(a, 1)]), &cashier())
        .await
        .unwrap();

    let err = service
        .pay(
            order.id(),
            &PayRequest {
                mode: PaymentMode::OrangeMoney,
                reference: None,
                note: None,
            },
            &cashier(),
        )
        .await
        .unwrap_err();
    assert!(err.field().is_some());
    assert!(service.payment_for_order(order.id()).await.unwrap().is_none());
}

#[tokio::test]
async fn cancelled_order_cannot_be_paid() {
    let (service, _) = service();
    let a = article(&service, "A", 1000, 10).await;
    let lieu = ville(&service).await;
    let order = service
        .create_order(order_input(lieu, &[(a, 1)]), &cashier())
        .await
        .unwrap();
    let delivery = service
        .create_delivery(
            &CreateDelivery {
                order_id: order.id(),
                date_prevue: None,
            },
            &cashier(),
        )
        .await
        .unwrap();
    service
        .change_delivery_status(
            delivery.delivery.id,
            &StatusChange {
                statut: "annulee".to_string(),
                request: TransitionRequest::default(),
            },
            &cashier(),
        )
        .await
        .unwrap();

    let err = service
        .pay(
            order.id(),
            &PayRequest {
                mode: PaymentMode::Cash,
                reference: None,
                note: None,
            },
            &cashier(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), "order_cancelled");
}

#[tokio::test]
async fn postponing_reverts_order_in_delivery() {
    let (service, _) = service();
    let a = article(&service, "A", 1000, 10).await;
    let lieu = ville(&service).await;
    let order = service
        .create_order(order_input(lieu, &[(a, 1)]), &cashier())
        .await
        .unwrap();
    let delivery = service
        .create_delivery(
            &CreateDelivery {
                order_id: order.id(),
                date_prevue: None,
            },
            &cashier(),
        )
        .await
        .unwrap()
        .delivery;

    service
        .transition_delivery(
            delivery.id,
            DeliveryStatus::OutForDelivery,
            &TransitionRequest::default(),
            &cashier(),
        )
        .await
        .unwrap();
    let postponed = service
        .transition_delivery(
            delivery.id,
            DeliveryStatus::Postponed,
            &TransitionRequest {
                reason: Some("client absent".to_string()),
                comment: None,
                date_prevue: NaiveDate::from_ymd_opt(2025, 5, 22),
            },
            &cashier(),
        )
        .await
        .unwrap();
    assert_eq!(postponed.delivery.reason, "client absent");
    assert_eq!(postponed.delivery.date_prevue, NaiveDate::from_ymd_opt(2025, 5, 22));
    assert_eq!(
        postponed.commande_detail.unwrap().order.status,
        OrderStatus::Pending
    );
    let last = postponed.events.last().unwrap();
    assert_eq!(last.meta["payload"]["date_prevue"], "2025-05-22");

    let err = service
        .create_delivery(
            &CreateDelivery {
                order_id: order.id(),
                date_prevue: None,
            },
            &cashier(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), "already_exists");
}

#[tokio::test]
async fn scheduling_creates_then_updates_the_tracker() {
    let (service, _) = service();
    let a = article(&service, "A", 1000, 10).await;
    let lieu = ville(&service).await;
    let order = service
        .create_order(order_input(lieu, &[(a, 1)]), &cashier())
        .await
        .unwrap();

    let first_date = NaiveDate::from_ymd_opt(2025, 5, 23).unwrap();
    let created = service
        .schedule_order(
            &ScheduleRequest {
                order_id: order.id(),
                date_livraison: first_date,
            },
            &cashier(),
        )
        .await
        .unwrap();
    assert!(created.livraison_created);

    let second_date = NaiveDate::from_ymd_opt(2025, 5, 24).unwrap();
    let updated = service
        .schedule_order(
            &ScheduleRequest {
                order_id: order.id(),
                date_livraison: second_date,
            },
            &cashier(),
        )
        .await
        .unwrap();
    assert!(!updated.livraison_created);
    assert_eq!(updated.livraison_id, created.livraison_id);

    let history = service.delivery_history(created.livraison_id).await.unwrap();
    assert_eq!(history.delivery.date_prevue, Some(second_date));
    assert_eq!(history.events.len(), 2);
    let detail = history.commande_detail.unwrap();
    assert_eq!(detail.order.date_livraison, Some(second_date));
    assert_eq!(detail.order.status, OrderStatus::Pending);

    assert_eq!(service.reconcile_deliveries(&cashier()).await.unwrap(), 0);
}

#[tokio::test]
async fn finalized_order_cannot_be_scheduled() {
    let (service, _) = service();
    let a = article(&service, "A", 1000, 10).await;
    let lieu = ville(&service).await;
    let order = service
        .create_order(order_input(lieu, &[(a, 1)]), &cashier())
        .await
        .unwrap();
    let delivery = service
        .create_delivery(
            &CreateDelivery {
                order_id: order.id(),
                date_prevue: None,
            },
            &cashier(),
        )
        .await
        .unwrap()
        .delivery;
    service
        .transition_delivery(
            delivery.id,
            DeliveryStatus::Cancelled,
            &TransitionRequest::default(),
            &cashier(),
        )
        .await
        .unwrap();

    let err = service
        .schedule_order(
            &ScheduleRequest {
                order_id: order.id(),
                date_livraison: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            },
            &cashier(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), "order_finalized");
}

#[tokio::test]
async fn reconcile_respects_batch_size() {
    let (service, _) = service();
    let service = service.with_reconcile_batch(2);
    let a = article(&service, "A", 1000, 100).await;
    let lieu = ville(&service).await;
    for _ in 0..3 {
        service
            .create_order(order_input(lieu, &[(a, 1)]), &cashier())
            .await
            .unwrap();
    }
    assert_eq!(service.reconcile_deliveries(&cashier()).await.unwrap(), 2);
    assert_eq!(service.reconcile_deliveries(&cashier()).await.unwrap(), 1);
    assert_eq!(service.reconcile_deliveries(&cashier()).await.unwrap(), 0);
}

#[tokio::test]
async fn payment_list_treats_missing_record_as_pending() {
    let (service, _) = service();
    let a = article(&service, "A", 1000, 10).await;
    let lieu = ville(&service).await;
    let paid = service
        .create_order(order_input(lieu, &[(a, 1)]), &cashier())
        .await
        .unwrap();
    service
        .create_order(order_input(lieu, &[(a, 1)]), &cashier())
        .await
        .unwrap();
    service
        .pay(
            paid.id(),
            &PayRequest {
                mode: PaymentMode::Cash,
                reference: None,
                note: None,
            },
            &cashier(),
        )
        .await
        .unwrap();

    let pending = service
        .list_payments(&PaymentQuery {
            paiement_statut: Some(PaymentStatus::Pending),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(pending.count, 1);
    assert_eq!(pending.results[0].paiement_statut, PaymentStatus::Pending);

    let all = service.list_payments(&PaymentQuery::default()).await.unwrap();
    assert_eq!(all.count, 2);
}

#[tokio::test]
async fn purchase_update_and_delete_roll_back_stock() {
    let (service, _) = service();
    let a = article(&service, "A", 1000, 1).await;
    let line = |quantity| PurchaseLineRequest {
        article_id: a,
        quantity,
        unit_cost: Money::from_units(600),
        unit_sale_price: Money::zero(),
        update_article_prices: false,
    };

    let purchase = service
        .create_purchase(
            NewPurchase {
                lignes: vec![line(10)],
                ..Default::default()
            },
            &cashier(),
        )
        .await
        .unwrap();
    assert_eq!(purchase.total, Money::from_units(6000));
    assert_eq!(stock(&service, a).await, 11);

    service
        .update_purchase(
            purchase.purchase.id,
            UpdatePurchase {
                lignes: Some(vec![line(4)]),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(stock(&service, a).await, 5);
    assert_eq!(service.get_article(a).await.unwrap().sale_price, Money::from_units(1000));

    service.delete_purchase(purchase.purchase.id).await.unwrap();
    assert_eq!(stock(&service, a).await, 1);
}

#[tokio::test]
async fn order_list_paginates_and_filters() {
    let (service, _) = service();
    let a = article(&service, "A", 1000, 100).await;
    let lieu = ville(&service).await;
    for _ in 0..3 {
        service
            .create_order(order_input(lieu, &[(a, 1)]), &cashier())
            .await
            .unwrap();
    }
    let mut other = order_input(lieu, &[(a, 1)]);
    other.client_input = ClientInput::named("Soa", None);
    service.create_order(other, &cashier()).await.unwrap();

    let page = service
        .list_orders(&OrderQuery {
            page: Some(2),
            page_size: Some(3),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.count, 4);
    assert_eq!(page.results.len(), 1);

    let soa = service
        .list_orders(&OrderQuery {
            client: Some("soa".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(soa.count, 1);

    let client_id = soa.results[0].order.client_id;
    let last = service.last_location(client_id).await.unwrap().unwrap();
    assert_eq!(last.lieu_id, lieu);
    assert_eq!(last.frais_auto, 3000);
}

#[tokio::test]
async fn order_date_follows_the_business_day_near_midnight() {
    let (service, clock) = service();
    let a = article(&service, "A", 1000, 10).await;
    let lieu = ville(&service).await;
    clock.set(Utc.with_ymd_and_hms(2025, 5, 31, 22, 30, 0).unwrap());
    let late = service
        .create_order(order_input(lieu, &[(a, 1)]), &cashier())
        .await
        .unwrap();
    clock.set(Utc.with_ymd_and_hms(2025, 5, 31, 20, 30, 0).unwrap());
    service
        .create_order(order_input(lieu, &[(a, 1)]), &cashier())
        .await
        .unwrap();

    let june_first = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
    assert_eq!(late.date_commande, june_first);

    let listed = service
        .list_orders(&OrderQuery {
            date_commande: Some(june_first),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(listed.count, 1);
    assert_eq!(listed.results[0].id(), late.id());

    let may_last = service
        .list_orders(&OrderQuery {
            date_commande: NaiveDate::from_ymd_opt(2025, 5, 31),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(may_last.count, 1);
    assert_ne!(may_last.results[0].id(), late.id());
}

#[tokio::test]
async fn invoice_numbers_restart_each_year() {
    let (service, clock) = service();
    let a = article(&service, "A", 1000, 100).await;
    let lieu = ville(&service).await;
    let first = service
        .create_order(order_input(lieu, &[(a, 1)]), &cashier())
        .await
        .unwrap();
    clock.set(Utc.with_ymd_and_hms(2026, 1, 2, 8, 0, 0).unwrap());
    let second = service
        .create_order(order_input(lieu, &[(a, 1)]), &cashier())
        .await
        .unwrap();

    let first = service.invoice_details(first.id()).await.unwrap();
    let second = service.invoice_details(second.id()).await.unwrap();
    assert_eq!(first.numero, "202500001");
    assert_eq!(second.numero, "202600001");
}
