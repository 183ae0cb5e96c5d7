//! Scenario: purchase creation freezes line items and aggregates per seller.
//!
//! # Invariants under test
//! - `total_price == Σ obligations == Σ qty × unit_price`
//! - one obligation per distinct seller, each summing only its own lines
//! - new purchases start unpaid and do not touch stock
//! - later catalog edits never reach an existing purchase
//! - a failing or empty bank lookup blanks the obligation instead of aborting

use bzr_purchase::PurchaseStore;
use bzr_schemas::{PurchaseStatus, PurchaseView};
use bzr_testkit::Harness;

fn assert_totals_consistent(view: &PurchaseView) {
    let by_obligations: i64 = view.payment_details.iter().map(|o| o.total_price).sum();
    let by_lines: i64 = view
        .purchased_items
        .iter()
        .map(|i| i.snapshot.quantity * i.snapshot.unit_price)
        .sum();
    assert_eq!(view.total_price, by_obligations);
    assert_eq!(view.total_price, by_lines);
}

// ---------------------------------------------------------------------------
// A. Two items, one seller
// ---------------------------------------------------------------------------

#[tokio::test]
async fn two_items_same_seller_yield_one_obligation() {
    let h = Harness::new();
    let seller = h.seller("Toko Makmur");
    let rice = h.product(seller, "Beras 5kg", 75_000, 10).await;
    let oil = h.product(seller, "Minyak 2L", 38_000, 10).await;

    let view = h
        .service
        .create_purchase(&bzr_testkit::fixtures::raw_request(&[(rice, 2), (oil, 1)]))
        .await
        .unwrap();

    assert_eq!(view.status, PurchaseStatus::Unpaid);
    assert_eq!(view.purchased_items.len(), 2);
    assert_eq!(view.payment_details.len(), 1);
    assert_eq!(view.payment_details[0].seller_id, seller);
    assert_eq!(view.payment_details[0].bank_account_holder, "Toko Makmur");
    assert_eq!(view.total_price, 2 * 75_000 + 38_000);
    assert_totals_consistent(&view);

    // Stock is checked but not deducted until payment.
    assert_eq!(h.store.stock(rice).await, Some(10));
    assert_eq!(h.store.stock(oil).await, Some(10));

    let stored = h.store.purchase(view.purchase_id).await.unwrap();
    assert_eq!(stored.status, PurchaseStatus::Unpaid);
    assert_eq!(stored.total_price, view.total_price);
}

// ---------------------------------------------------------------------------
// B. Two sellers
// ---------------------------------------------------------------------------

#[tokio::test]
async fn two_sellers_yield_two_obligations_each_with_own_lines() {
    let h = Harness::new();
    let s1 = h.seller("Toko Satu");
    let s2 = h.seller("Toko Dua");
    let a = h.product(s1, "Sabun", 5_000, 20).await;
    let b = h.product(s2, "Sampo", 22_000, 20).await;
    let c = h.product(s1, "Sikat Gigi", 9_000, 20).await;

    let view = h
        .service
        .create_purchase(&bzr_testkit::fixtures::raw_request(&[(a, 3), (b, 1), (c, 2)]))
        .await
        .unwrap();

    assert_eq!(view.payment_details.len(), 2);
    let owed = |seller: uuid::Uuid| {
        view.payment_details
            .iter()
            .find(|o| o.seller_id == seller)
            .map(|o| o.total_price)
            .unwrap()
    };
    assert_eq!(owed(s1), 3 * 5_000 + 2 * 9_000);
    assert_eq!(owed(s2), 22_000);
    assert_totals_consistent(&view);
}

#[tokio::test]
async fn obligations_are_ordered_by_seller_id() {
    let h = Harness::new();
    let sellers = [h.seller("A"), h.seller("B"), h.seller("C")];
    let mut lines = Vec::new();
    for s in sellers {
        lines.push((h.product(s, "Barang", 1_000, 5).await, 1));
    }

    let view = h
        .service
        .create_purchase(&bzr_testkit::fixtures::raw_request(&lines))
        .await
        .unwrap();

    let ids: Vec<_> = view.payment_details.iter().map(|o| o.seller_id).collect();
    let mut sorted = ids.clone();
    sorted.sort();
    assert_eq!(ids, sorted);
}

// ---------------------------------------------------------------------------
// Snapshot immunity
// ---------------------------------------------------------------------------

#[tokio::test]
async fn later_catalog_edits_do_not_change_purchase() {
    let h = Harness::new();
    let seller = h.seller("Toko Tetap");
    let p = h.product(seller, "Kopi Bubuk", 30_000, 5).await;

    let view = h
        .service
        .create_purchase(&bzr_testkit::fixtures::raw_request(&[(p, 1)]))
        .await
        .unwrap();

    h.store.edit_product(p, "Kopi Bubuk Premium", 45_000).await;

    let again = h
        .service
        .get_purchase(&view.purchase_id.to_string())
        .await
        .unwrap();
    assert_eq!(again.purchased_items[0].snapshot.name, "Kopi Bubuk");
    assert_eq!(again.purchased_items[0].snapshot.unit_price, 30_000);
    assert_eq!(again.total_price, 30_000);
}

// ---------------------------------------------------------------------------
// Lenient bank lookup
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failing_bank_lookup_blanks_obligation_but_creates_purchase() {
    let h = Harness::new();
    let seller = h.seller("Toko Hilang");
    let p = h.product(seller, "Teh Celup", 12_000, 5).await;
    h.store.fail_bank_lookups(true);

    let view = h
        .service
        .create_purchase(&bzr_testkit::fixtures::raw_request(&[(p, 2)]))
        .await
        .unwrap();

    let o = &view.payment_details[0];
    assert!(o.bank_account_name.is_empty());
    assert!(o.bank_account_holder.is_empty());
    assert!(o.bank_account_number.is_empty());
    assert_eq!(o.total_price, 24_000);
    assert_eq!(h.store.purchase_count().await, 1);
}

#[tokio::test]
async fn seller_without_profile_gets_blank_obligation() {
    let h = Harness::new();
    let unknown_seller = uuid::Uuid::new_v4();
    let p = h.product(unknown_seller, "Garam", 4_000, 5).await;

    let view = h
        .service
        .create_purchase(&bzr_testkit::fixtures::raw_request(&[(p, 1)]))
        .await
        .unwrap();
    assert_eq!(view.payment_details[0].seller_id, unknown_seller);
    assert!(view.payment_details[0].bank_account_number.is_empty());
}

// ---------------------------------------------------------------------------
// Bounded connection pool
// ---------------------------------------------------------------------------

#[tokio::test]
async fn bank_lookup_shares_the_creation_connection() {
    let h = Harness::new().with_timeout(std::time::Duration::from_millis(500));
    let s1 = h.seller("Toko Pagi");
    let s2 = h.seller("Toko Sore");
    let a = h.product(s1, "Roti", 8_000, 4).await;
    let b = h.product(s2, "Susu", 12_000, 4).await;
    h.store.limit_connections(1);

    let view = h
        .service
        .create_purchase(&bzr_testkit::fixtures::raw_request(&[(a, 1), (b, 1)]))
        .await
        .expect("creation must not wait for a second connection");

    let holders: Vec<_> = view
        .payment_details
        .iter()
        .map(|o| o.bank_account_holder.as_str())
        .collect();
    assert!(holders.contains(&"Toko Pagi"));
    assert!(holders.contains(&"Toko Sore"));
}

#[tokio::test]
async fn concurrent_creations_fill_the_pool_without_stalling() {
    let h = Harness::new().with_timeout(std::time::Duration::from_secs(2));
    let seller = h.seller("Toko Ramai");
    let p = h.product(seller, "Air Mineral", 3_000, 100).await;
    h.store.limit_connections(2);

    let req = bzr_testkit::fixtures::raw_request(&[(p, 1)]);
    let (r1, r2, r3, r4) = tokio::join!(
        h.service.create_purchase(&req),
        h.service.create_purchase(&req),
        h.service.create_purchase(&req),
        h.service.create_purchase(&req),
    );
    for r in [r1, r2, r3, r4] {
        let view = r.unwrap();
        assert_eq!(view.payment_details[0].bank_account_holder, "Toko Ramai");
    }
    assert_eq!(h.store.purchase_count().await, 4);
}

// ---------------------------------------------------------------------------
// File URI enrichment
// ---------------------------------------------------------------------------

#[tokio::test]
async fn file_uris_are_attached_and_resolved_once_per_file() {
    let h = Harness::new();
    let seller = h.seller("Toko Foto");
    let (p, file_id) = h.product_with_file(seller, "Kaos", 60_000, 5).await;
    let plain = h.product(seller, "Topi", 25_000, 5).await;

    let view = h
        .service
        .create_purchase(&bzr_testkit::fixtures::raw_request(&[(p, 1), (plain, 1), (p, 1)]))
        .await
        .unwrap();

    let with_file = &view.purchased_items[0];
    assert_eq!(with_file.snapshot.file_id, Some(file_id));
    assert_eq!(with_file.file_uri, format!("https://files.test/{file_id}.png"));
    assert!(view.purchased_items[1].file_uri.is_empty());
    assert_eq!(view.purchased_items[2].file_uri, with_file.file_uri);
    assert_eq!(h.files.resolve_calls(), 1);
}

#[tokio::test]
async fn file_service_outage_leaves_uris_empty() {
    let h = Harness::new();
    let seller = h.seller("Toko Foto");
    let (p, _) = h.product_with_file(seller, "Kemeja", 90_000, 5).await;
    h.files.set_unavailable(true);

    let view = h
        .service
        .create_purchase(&bzr_testkit::fixtures::raw_request(&[(p, 1)]))
        .await
        .unwrap();
    assert!(view.purchased_items[0].file_uri.is_empty());
    assert!(view.purchased_items[0].file_thumbnail_uri.is_empty());
}

#[tokio::test]
async fn purchase_ids_are_v7_and_distinct() {
    let h = Harness::new();
    let seller = h.seller("Toko Urut");
    let p = h.product(seller, "Pensil", 2_000, 1).await;

    let first = h
        .service
        .create_purchase(&bzr_testkit::fixtures::raw_request(&[(p, 1)]))
        .await
        .unwrap();
    let second = h
        .service
        .create_purchase(&bzr_testkit::fixtures::raw_request(&[(p, 1)]))
        .await
        .unwrap();

    assert_eq!(first.purchase_id.get_version_num(), 7);
    assert_ne!(first.purchase_id, second.purchase_id);
    assert!(h.store.ping().await.is_ok());
}
