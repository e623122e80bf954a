//! CLI demo of the full payment lifecycle against a simulated gateway.
//!
//! Walks through request construction, the redirect URL the customer
//! would follow, the gateway's signed callback, verification,
//! settlement, and a replayed delivery bouncing off the idempotent
//! tracker.
//!
//! Run with:
//!   cargo run --example demo

use vanpay_protocol::collaborators::{settle_return, CollaboratorError, WalletLedger};
use vanpay_protocol::config::GatewayConfig;
use vanpay_protocol::crypto::mac;
use vanpay_protocol::gateway::request::RequestBuilder;
use vanpay_protocol::transaction::tracker::TransactionTracker;
use vanpay_protocol::wire::canonical::canonicalize;
use vanpay_protocol::wire::params::{
    ParameterSet, FIELD_AMOUNT, FIELD_PAY_DATE, FIELD_RESPONSE_CODE, FIELD_SECURE_HASH,
    FIELD_TRANSACTION_NO, FIELD_TXN_REF,
};

/// Ledger double that narrates credits to stdout.
struct NarratingLedger;

#[async_trait::async_trait]
impl WalletLedger for NarratingLedger {
    async fn credit(&self, order_id: &str, amount_minor: u64) -> Result<(), CollaboratorError> {
        println!("  [ledger] credited order {order_id}: {amount_minor} minor units");
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vanpay_protocol=debug".into()),
        )
        .init();

    let config = GatewayConfig::sandbox(
        "DEMOTMN1",
        "demo-shared-secret",
        "https://shop.example/payment/return",
    );
    let tracker = TransactionTracker::new();
    let ledger = NarratingLedger;

    println!("== 1. Build a signed payment request");
    let request = RequestBuilder::new(&config)
        .amount(150_000.0)
        .order_info("Top-up 150k credits")
        .client_ip("203.0.113.7")
        .build()
        .expect("valid request");
    tracker
        .create(&request.order_id, request.amount_minor, "Top-up 150k credits")
        .expect("fresh order id");
    println!("  order id : {}", request.order_id);
    println!("  redirect : {}", request.redirect_url);

    println!("== 2. Customer pays; the gateway calls back");
    let mut callback = ParameterSet::new();
    callback.insert(FIELD_TXN_REF, request.order_id.as_str());
    callback.insert(FIELD_AMOUNT, request.amount_minor.to_string());
    callback.insert(FIELD_RESPONSE_CODE, "00");
    callback.insert(FIELD_TRANSACTION_NO, "14422574");
    callback.insert(FIELD_PAY_DATE, "20231115051320");
    let signature = mac::sign(&canonicalize(&callback), &config.secret);
    callback.insert(FIELD_SECURE_HASH, signature);

    let report = settle_return(&tracker, &ledger, &config, &callback)
        .await
        .expect("settles");
    println!(
        "  settled  : {} (credited: {})",
        report.disposition.outcome().status,
        report.credited
    );

    println!("== 3. The gateway retries the notification");
    let replay = settle_return(&tracker, &ledger, &config, &callback)
        .await
        .expect("replays");
    println!(
        "  replayed : fresh={} credited={}",
        replay.disposition.is_fresh(),
        replay.credited
    );
}
