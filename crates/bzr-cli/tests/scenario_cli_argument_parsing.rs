//! Argument parsing for catalog seeding happens before any DB access.

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn product_add_rejects_non_uuid_seller() {
    Command::cargo_bin("bzr")
        .unwrap()
        .args([
            "product", "add", "--seller-id", "nope", "--name", "Teh", "--price", "1000", "--sku",
            "T-1", "--stock", "3",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--seller-id"));
}

#[test]
fn purchase_show_requires_id() {
    Command::cargo_bin("bzr")
        .unwrap()
        .args(["purchase", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--id"));
}
