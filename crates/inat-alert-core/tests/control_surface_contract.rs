//! Contract Test: Control Surface & Subscription State
//!
//! Constraints verified:
//! - update() validates before mutating anything
//! - update() resets the count so a positive total notifies immediately
//! - unsubscribe() is idempotent and disarms the armed job
//! - update() while unsubscribed rearms the daily job

mod common;

use common::*;
use inat_alert_core::{FilterSet, SubscriptionState, UnsubscribeOutcome};
use serde_json::json;

#[tokio::test]
async fn first_update_notifies_and_records_total() {
    // Scenario A
    let h = Harness::new([Reply::Total(5)]).await;

    h.control.update(&monarch_body()).await.expect("valid update");

    let sent = h.transport.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].starts_with("<p>5 New observations"));
    assert_eq!(h.store.observation_count().await, Some(5));
    assert_eq!(h.store.filters().await, Some(monarch()));
    assert_eq!(h.source.queries(), vec![monarch()]);
}

#[tokio::test]
async fn update_always_resets_count_before_checking() {
    // Same total as before still notifies because the baseline is reset
    let h = Harness::new([Reply::Total(7), Reply::Total(7)]).await;

    h.control.update(&monarch_body()).await.unwrap();
    h.control.update(&monarch_body()).await.unwrap();

    assert_eq!(h.transport.sent_count(), 2);
    assert_eq!(h.store.observation_count().await, Some(7));
}

#[tokio::test]
async fn update_with_zero_total_does_not_notify() {
    let h = Harness::new([Reply::Total(0)]).await;

    h.control.update(&monarch_body()).await.unwrap();

    assert_eq!(h.transport.sent_count(), 0);
    assert_eq!(h.store.observation_count().await, Some(0));
}

#[tokio::test]
async fn update_succeeds_even_if_immediate_check_fails() {
    let h = Harness::new([Reply::TransportFailure]).await;

    h.control.update(&monarch_body()).await.expect("check failures are not surfaced");

    assert_eq!(h.store.filters().await, Some(monarch()));
    assert_eq!(h.store.observation_count().await, Some(0));
}

#[tokio::test]
async fn update_with_missing_field_changes_nothing() {
    let h = Harness::new([Reply::Total(3), Reply::Total(9)]).await;
    h.control.update(&monarch_body()).await.unwrap();
    h.control.unsubscribe().await.unwrap();

    let before = h.store.snapshot().await;
    let calls_before = h.scheduler.calls();

    for missing in ["acc", "identified", "photos", "taxon_name"] {
        let mut body = json!({
            "acc": false,
            "identified": false,
            "photos": false,
            "taxon_name": "Bombus terrestris"
        });
        body.as_object_mut().unwrap().remove(missing);

        let err = h.control.update(&body).await.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(err.to_string(), format!("Missing parameter: {}", missing));
    }

    assert_eq!(h.store.snapshot().await, before);
    assert_eq!(h.scheduler.calls(), calls_before);
    assert_eq!(h.source.call_count(), 1);
}

#[tokio::test]
async fn unsubscribe_is_idempotent() {
    // Scenario D
    let h = Harness::new(Vec::<Reply>::new()).await;
    let startup_job = h.scheduler.armed().expect("startup job armed");

    let first = h.control.unsubscribe().await.unwrap();
    assert_eq!(first, UnsubscribeOutcome::Unsubscribed);
    assert_eq!(h.store.subscription().await, SubscriptionState::Unsubscribed);
    assert_eq!(h.scheduler.armed(), None);

    let second = h.control.unsubscribe().await.unwrap();
    assert_eq!(second, UnsubscribeOutcome::AlreadyUnsubscribed);
    assert_eq!(h.scheduler.armed(), None);

    assert_eq!(
        h.scheduler.calls(),
        vec![
            SchedulerCall::ArmInterval(std::time::Duration::from_secs(15)),
            SchedulerCall::Disarm(startup_job),
        ],
        "second unsubscribe must not touch the scheduler"
    );
}

#[tokio::test]
async fn update_after_unsubscribe_rearms_daily_job() {
    // Scenario E
    let h = Harness::new([Reply::Total(1)]).await;
    h.control.unsubscribe().await.unwrap();

    h.control.update(&monarch_body()).await.unwrap();

    let rearmed = h.scheduler.armed().expect("daily job armed");
    assert_eq!(
        h.store.subscription().await,
        SubscriptionState::Subscribed(rearmed)
    );
    assert_eq!(h.scheduler.calls().last(), Some(&SchedulerCall::RearmCron));

    // And it can be unsubscribed again
    assert_eq!(
        h.control.unsubscribe().await.unwrap(),
        UnsubscribeOutcome::Unsubscribed
    );
}

#[tokio::test]
async fn update_while_subscribed_keeps_existing_job() {
    let h = Harness::new([Reply::Total(1)]).await;
    let startup_job = h.scheduler.armed().unwrap();

    h.control.update(&monarch_body()).await.unwrap();

    assert_eq!(
        h.store.subscription().await,
        SubscriptionState::Subscribed(startup_job)
    );
    assert!(!h.scheduler.calls().contains(&SchedulerCall::RearmCron));
}

#[tokio::test]
async fn update_replaces_filters() {
    let h = Harness::new([Reply::Total(1), Reply::Total(2)]).await;
    h.control.update(&monarch_body()).await.unwrap();

    h.control
        .update(&json!({
            "acc": false,
            "identified": true,
            "photos": false,
            "taxon_name": "Bombus terrestris"
        }))
        .await
        .unwrap();

    let expected = FilterSet::new(false, true, false, "Bombus terrestris");
    assert_eq!(h.store.filters().await, Some(expected.clone()));
    assert_eq!(h.source.queries().last(), Some(&expected));
}
