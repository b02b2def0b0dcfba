// SPDX-FileCopyrightText: 2026 Licensor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end engine tests over a real SQLite database.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use licensor_config::model::LicensorConfig;
use licensor_core::{
    ActivationPayload, CredentialConfig, CredentialKind, FilterList, FilterToggles,
    LicensorError, NewLicense, Notifier, RequestLimits, ResponseCode, SnIssuedNotice,
};
use licensor_engine::{ActivationOutcome, LicenseService, SnRequest, SnRequestOutcome};
use licensor_storage::Database;
use licensor_storage::queries::{credentials, filters, licenses, settings};
use tempfile::TempDir;

#[derive(Default)]
struct Recorder {
    sent: Mutex<Vec<SnIssuedNotice>>,
    fail: bool,
}

#[async_trait]
impl Notifier for Recorder {
    async fn send_sn_issued(&self, notice: &SnIssuedNotice) -> Result<(), LicensorError> {
        self.sent.lock().unwrap().push(notice.clone());
        if self.fail {
            return Err(LicensorError::Notify {
                message: "smtp down".into(),
                source: None,
            });
        }
        Ok(())
    }
}

struct Env {
    db: Database,
    service: LicenseService,
    notifier: Arc<Recorder>,
    _dir: TempDir,
}

async fn env_with(notifier: Recorder) -> Env {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path().join("engine.db").to_str().unwrap())
        .await
        .unwrap();
    let notifier = Arc::new(notifier);
    let service = LicenseService::new(db.clone(), notifier.clone(), &LicensorConfig::default());
    Env {
        db,
        service,
        notifier,
        _dir: dir,
    }
}

async fn env() -> Env {
    env_with(Recorder::default()).await
}

fn day(d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 4, d, 9, 30, 0).unwrap()
}

fn new_license(sn: &str) -> NewLicense {
    NewLicense {
        sn: sn.to_string(),
        description: String::new(),
        valid_days: 30,
        daily_analysis: 20,
        license_group_id: String::new(),
        llm_group_id: String::new(),
        search_group_id: String::new(),
        product_id: 0,
    }
}

async fn stock(db: &Database, sns: &[&str], created: DateTime<Utc>) {
    let batch = sns.iter().map(|sn| new_license(sn)).collect();
    licenses::insert_batch(db, batch, created).await.unwrap();
}

fn request(email: &str, ip: &str) -> SnRequest {
    SnRequest {
        email: email.to_string(),
        product_id: 0,
        ip: ip.to_string(),
    }
}

fn llm_config(id: &str, group: &str, start: &str, active: bool) -> CredentialConfig {
    CredentialConfig {
        id: id.to_string(),
        name: id.to_string(),
        provider_type: "openai".to_string(),
        base_url: "https://llm.example.com/v1".to_string(),
        api_key: format!("sk-{id}"),
        model: "model-x".to_string(),
        is_active: active,
        start_date: start.to_string(),
        end_date: String::new(),
        group_id: group.to_string(),
    }
}

#[tokio::test]
async fn oldest_sn_is_allocated_first() {
    let env = env().await;
    stock(&env.db, &["SN-T3"], day(3)).await;
    stock(&env.db, &["SN-T1"], day(1)).await;
    stock(&env.db, &["SN-T2"], day(2)).await;

    let outcome = env
        .service
        .request_sn(request("first@example.com", "10.0.0.1"), day(5))
        .await
        .unwrap();
    assert_eq!(outcome.code(), ResponseCode::Success);
    assert_eq!(outcome.sn(), Some("SN-T1"));

    let outcome = env
        .service
        .request_sn(request("second@example.com", "10.0.0.1"), day(5))
        .await
        .unwrap();
    assert_eq!(outcome.sn(), Some("SN-T2"));
}

#[tokio::test]
async fn repeated_request_returns_same_sn() {
    let env = env().await;
    stock(&env.db, &["SN-A", "SN-B"], day(1)).await;

    let first = env
        .service
        .request_sn(request("Repeat@Example.com ", "10.0.0.1"), day(2))
        .await
        .unwrap();
    let second = env
        .service
        .request_sn(request("repeat@example.com", "10.0.0.2"), day(2))
        .await
        .unwrap();

    assert_eq!(first.code(), ResponseCode::Success);
    assert_eq!(second.code(), ResponseCode::EmailAlreadyUsed);
    assert!(second.code().is_success());
    assert_eq!(first.sn(), second.sn());

    let bound = licenses::get(&env.db, "SN-A").await.unwrap().unwrap();
    assert_eq!(bound.description, "requested by repeat@example.com");
    assert_eq!(bound.bound_email.as_deref(), Some("repeat@example.com"));
    assert!(bound.expires_at.is_some());
}

#[tokio::test]
async fn deleted_sn_is_replaced_on_re_request() {
    let env = env().await;
    stock(&env.db, &["SN-OLD", "SN-NEW"], day(1)).await;

    let first = env
        .service
        .request_sn(request("user@example.com", "10.0.0.1"), day(2))
        .await
        .unwrap();
    assert_eq!(first.sn(), Some("SN-OLD"));
    licenses::delete(&env.db, "SN-OLD").await.unwrap();

    let second = env
        .service
        .request_sn(request("user@example.com", "10.0.0.1"), day(2))
        .await
        .unwrap();
    assert_eq!(second.code(), ResponseCode::Success);
    assert_eq!(second.sn(), Some("SN-NEW"));
}

#[tokio::test]
async fn sixth_request_is_rate_limited_until_next_day() {
    let env = env().await;
    let sns: Vec<String> = (0..10).map(|i| format!("SN-{i:02}")).collect();
    let refs: Vec<&str> = sns.iter().map(String::as_str).collect();
    stock(&env.db, &refs, day(1)).await;

    for i in 0..5 {
        let outcome = env
            .service
            .request_sn(request(&format!("u{i}@example.com"), "192.0.2.7"), day(10))
            .await
            .unwrap();
        assert_eq!(outcome.code(), ResponseCode::Success, "request {i}");
    }

    let sixth = env
        .service
        .request_sn(request("u5@example.com", "192.0.2.7"), day(10))
        .await
        .unwrap();
    assert_eq!(sixth.code(), ResponseCode::RateLimitExceeded);

    let other_ip = env
        .service
        .request_sn(request("u6@example.com", "192.0.2.8"), day(10))
        .await
        .unwrap();
    assert_eq!(other_ip.code(), ResponseCode::Success);

    let tomorrow = env
        .service
        .request_sn(request("u5@example.com", "192.0.2.7"), day(11))
        .await
        .unwrap();
    assert_eq!(tomorrow.code(), ResponseCode::Success);
}

#[tokio::test]
async fn distinct_email_gate() {
    let env = env().await;
    stock(&env.db, &["SN-1", "SN-2", "SN-3"], day(1)).await;
    settings::set_request_limits(
        &env.db,
        RequestLimits {
            daily_request_limit: 10,
            daily_email_limit: 2,
        },
    )
    .await
    .unwrap();

    for email in ["a@example.com", "b@example.com"] {
        let outcome = env
            .service
            .request_sn(request(email, "198.51.100.1"), day(3))
            .await
            .unwrap();
        assert_eq!(outcome.code(), ResponseCode::Success);
    }
    let third = env
        .service
        .request_sn(request("c@example.com", "198.51.100.1"), day(3))
        .await
        .unwrap();
    assert_eq!(third.code(), ResponseCode::EmailLimitExceeded);

    // A returning requester is answered before the gates run.
    let again = env
        .service
        .request_sn(request("a@example.com", "198.51.100.1"), day(3))
        .await
        .unwrap();
    assert_eq!(again.code(), ResponseCode::EmailAlreadyUsed);
}

#[tokio::test]
async fn policy_denials_and_invalid_email() {
    let env = env().await;
    stock(&env.db, &["SN-1"], day(1)).await;
    filters::add(&env.db, FilterList::Blacklist, "@spam.com").await.unwrap();
    filters::add(&env.db, FilterList::Whitelist, "@spam.com").await.unwrap();
    filters::add(&env.db, FilterList::Whitelist, "@corp.com").await.unwrap();
    settings::set_filter_toggles(
        &env.db,
        FilterToggles {
            blacklist_enabled: true,
            whitelist_enabled: true,
            conditions_enabled: false,
        },
    )
    .await
    .unwrap();

    let cases = [
        ("x@SPAM.com", ResponseCode::EmailBlacklisted),
        ("x@other.com", ResponseCode::EmailNotWhitelisted),
        ("not-an-email", ResponseCode::InvalidEmail),
        ("", ResponseCode::InvalidEmail),
    ];
    for (email, code) in cases {
        let outcome = env
            .service
            .request_sn(request(email, "10.1.1.1"), day(2))
            .await
            .unwrap();
        assert_eq!(outcome.code(), code, "{email}");
    }

    let ok = env
        .service
        .request_sn(request("x@corp.com", "10.1.1.1"), day(2))
        .await
        .unwrap();
    assert_eq!(ok.code(), ResponseCode::Success);
}

#[tokio::test]
async fn conditions_route_to_groups_and_unmatched_prefer_ungrouped() {
    let env = env().await;
    let mut grouped = new_license("SN-PREMIUM");
    grouped.llm_group_id = "premium".into();
    licenses::insert(&env.db, grouped, day(1)).await.unwrap();
    stock(&env.db, &["SN-PLAIN"], day(2)).await;

    filters::upsert_condition(&env.db, "@vip.com", "premium", "").await.unwrap();
    settings::set_filter_toggles(
        &env.db,
        FilterToggles {
            blacklist_enabled: true,
            whitelist_enabled: false,
            conditions_enabled: true,
        },
    )
    .await
    .unwrap();

    // Older grouped stock is skipped while ungrouped stock remains.
    let plain = env
        .service
        .request_sn(request("someone@else.com", "10.2.0.1"), day(3))
        .await
        .unwrap();
    assert_eq!(plain.sn(), Some("SN-PLAIN"));

    let vip = env
        .service
        .request_sn(request("boss@vip.com", "10.2.0.2"), day(3))
        .await
        .unwrap();
    assert_eq!(vip.sn(), Some("SN-PREMIUM"));

    let none_left = env
        .service
        .request_sn(request("other@vip.com", "10.2.0.3"), day(3))
        .await
        .unwrap();
    assert_eq!(none_left.code(), ResponseCode::NoAvailableSn);
}

#[tokio::test]
async fn product_requests_only_see_their_product() {
    let env = env().await;
    let mut product = new_license("SN-P7");
    product.product_id = 7;
    licenses::insert(&env.db, product, day(1)).await.unwrap();

    let unclassified = env
        .service
        .request_sn(request("a@example.com", "10.3.0.1"), day(2))
        .await
        .unwrap();
    assert_eq!(unclassified.code(), ResponseCode::NoAvailableSn);

    let outcome = env
        .service
        .request_sn(
            SnRequest {
                email: "a@example.com".into(),
                product_id: 7,
                ip: "10.3.0.1".into(),
            },
            day(2),
        )
        .await
        .unwrap();
    assert_eq!(outcome.sn(), Some("SN-P7"));
}

fn product_request(email: &str, product_id: i64) -> SnRequest {
    SnRequest {
        email: email.to_string(),
        product_id,
        ip: "10.3.1.1".to_string(),
    }
}

#[tokio::test]
async fn one_email_holds_one_sn_per_product() {
    let env = env().await;
    stock(&env.db, &["SN-U1", "SN-U2"], day(1)).await;
    let mut product = new_license("SN-P7");
    product.product_id = 7;
    licenses::insert(&env.db, product, day(1)).await.unwrap();

    let unclassified = env
        .service
        .request_sn(product_request("multi@example.com", 0), day(2))
        .await
        .unwrap();
    assert_eq!(unclassified.code(), ResponseCode::Success);
    assert_eq!(unclassified.sn(), Some("SN-U1"));

    let seven = env
        .service
        .request_sn(product_request("multi@example.com", 7), day(2))
        .await
        .unwrap();
    assert_eq!(seven.code(), ResponseCode::Success);
    assert_eq!(seven.sn(), Some("SN-P7"));

    let again = env
        .service
        .request_sn(product_request("multi@example.com", 0), day(3))
        .await
        .unwrap();
    assert_eq!(again.code(), ResponseCode::EmailAlreadyUsed);
    assert_eq!(again.sn(), Some("SN-U1"));
}

#[tokio::test]
async fn negative_product_ids_share_the_unclassified_binding() {
    let env = env().await;
    stock(&env.db, &["SN-U1", "SN-U2", "SN-U3"], day(1)).await;

    let mut codes = Vec::new();
    for product_id in [0, -1, -2] {
        let outcome = env
            .service
            .request_sn(product_request("neg@example.com", product_id), day(2))
            .await
            .unwrap();
        assert_eq!(outcome.sn(), Some("SN-U1"));
        codes.push(outcome.code());
    }
    assert_eq!(
        codes,
        [
            ResponseCode::Success,
            ResponseCode::EmailAlreadyUsed,
            ResponseCode::EmailAlreadyUsed,
        ]
    );
    let free = licenses::get(&env.db, "SN-U2").await.unwrap().unwrap();
    assert!(free.bound_email.is_none());
}

#[tokio::test]
async fn product_lookup_failure_after_claim_still_issues() {
    let env = env().await;
    let mut product = new_license("SN-P7");
    product.product_id = 7;
    licenses::insert(&env.db, product, day(1)).await.unwrap();
    env.db
        .connection()
        .call(|conn| conn.execute("DROP TABLE product_types", []))
        .await
        .unwrap();

    let outcome = env
        .service
        .request_sn(product_request("lookup@example.com", 7), day(2))
        .await
        .unwrap();
    assert_eq!(outcome.code(), ResponseCode::Success);
    assert_eq!(outcome.sn(), Some("SN-P7"));

    let sent = wait_for_notices(&env.notifier, 1).await;
    assert_eq!(sent[0].product_name, "Licensor");
}

#[tokio::test]
async fn unreadable_stored_expiry_still_issues() {
    let env = env().await;
    stock(&env.db, &["SN-ODD"], day(1)).await;
    env.db
        .connection()
        .call(|conn| {
            conn.execute(
                "UPDATE licenses SET expires_at = 'someday' WHERE sn = 'SN-ODD'",
                [],
            )
        })
        .await
        .unwrap();

    let outcome = env
        .service
        .request_sn(request("odd@example.com", "10.3.2.1"), day(2))
        .await
        .unwrap();
    assert_eq!(
        outcome,
        SnRequestOutcome::Issued {
            sn: "SN-ODD".into(),
            expires_at: "2026-04-02".into(),
            days_left: 0,
        }
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_bind_a_single_sn_once() {
    let env = env().await;
    stock(&env.db, &["SN-ONLY"], day(1)).await;

    let mut handles = Vec::new();
    for i in 0..12 {
        let service = env.service.clone();
        handles.push(tokio::spawn(async move {
            service
                .request_sn(
                    request(&format!("racer{i}@example.com"), &format!("10.9.0.{i}")),
                    day(2),
                )
                .await
                .unwrap()
        }));
    }

    let mut winners = Vec::new();
    for handle in handles {
        match handle.await.unwrap() {
            SnRequestOutcome::Issued { sn, .. } => winners.push(sn),
            SnRequestOutcome::NoAvailableSn => {}
            other => panic!("unexpected outcome {other:?}"),
        }
    }
    assert_eq!(winners, vec!["SN-ONLY".to_string()]);

    let (records, total) =
        licensor_storage::queries::email_records::list(&env.db, None, 100, 0)
            .await
            .unwrap();
    assert_eq!(total, 1);
    let emails: HashSet<_> = records.iter().map(|r| r.email.clone()).collect();
    assert_eq!(emails.len(), 1);
}

#[tokio::test]
async fn activation_returns_sealed_credentials() {
    let env = env().await;
    stock(&env.db, &["ABCD-EFGH-IJKL-MNOP"], day(1)).await;
    credentials::save(&env.db, CredentialKind::Llm, llm_config("old", "", "2026-01-01", true))
        .await
        .unwrap();
    credentials::save(&env.db, CredentialKind::Llm, llm_config("new", "", "2026-04-01", false))
        .await
        .unwrap();

    let outcome = env
        .service
        .activate(" abcd-efgh-ijkl-mnop ", day(2))
        .await
        .unwrap();
    let ActivationOutcome::Activated {
        encrypted_data,
        expires_at,
    } = outcome
    else {
        panic!("expected activation, got {outcome:?}");
    };
    assert_eq!(expires_at, "2026-05-02");

    let plain = licensor_crypto::decrypt_for_sn("ABCD-EFGH-IJKL-MNOP", &encrypted_data).unwrap();
    let payload: ActivationPayload = serde_json::from_slice(&plain).unwrap();
    assert_eq!(payload.llm_api_key, "sk-new");
    assert_eq!(payload.llm_model, "model-x");
    assert_eq!(payload.search_api_key, "");
    assert_eq!(payload.product_name, "Licensor");
    assert_eq!(payload.daily_analysis, 20);
    assert_eq!(payload.expires_at, "2026-05-02T09:30:00Z");

    assert!(licensor_crypto::decrypt_for_sn("ABCD-EFGH-IJKL-MNOQ", &encrypted_data).is_err());

    let license = licenses::get(&env.db, "ABCD-EFGH-IJKL-MNOP").await.unwrap().unwrap();
    assert_eq!(license.usage_count, 1);
    assert!(license.last_used_at.is_some());
}

#[tokio::test]
async fn activation_state_order() {
    let env = env().await;
    stock(&env.db, &["SN-X"], day(1)).await;

    assert_eq!(
        env.service.activate("SN-MISSING", day(2)).await.unwrap(),
        ActivationOutcome::InvalidSn
    );

    // First activation starts the 30-day clock.
    assert!(matches!(
        env.service.activate("SN-X", day(2)).await.unwrap(),
        ActivationOutcome::Activated { .. }
    ));
    let later = day(2) + chrono::Duration::days(31);
    assert_eq!(
        env.service.activate("SN-X", later).await.unwrap(),
        ActivationOutcome::Expired
    );

    licenses::set_active(&env.db, "SN-X", false).await.unwrap();
    assert_eq!(
        env.service.activate("SN-X", later).await.unwrap(),
        ActivationOutcome::Disabled
    );
    assert_eq!(
        env.service.activate("SN-X", later).await.unwrap().code(),
        ResponseCode::SnDisabled
    );
}

#[tokio::test]
async fn activated_sn_is_no_longer_allocatable() {
    let env = env().await;
    stock(&env.db, &["SN-USED"], day(1)).await;
    env.service.activate("SN-USED", day(2)).await.unwrap();

    let outcome = env
        .service
        .request_sn(request("late@example.com", "10.4.0.1"), day(2))
        .await
        .unwrap();
    assert_eq!(outcome.code(), ResponseCode::NoAvailableSn);
}

async fn wait_for_notices(notifier: &Recorder, count: usize) -> Vec<SnIssuedNotice> {
    for _ in 0..100 {
        let sent = notifier.sent.lock().unwrap().clone();
        if sent.len() >= count {
            return sent;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    notifier.sent.lock().unwrap().clone()
}

#[tokio::test]
async fn issuing_spawns_a_notification() {
    let env = env().await;
    stock(&env.db, &["SN-MAIL"], day(1)).await;

    env.service
        .request_sn(request("mail@example.com", "10.5.0.1"), day(2))
        .await
        .unwrap();
    let sent = wait_for_notices(&env.notifier, 1).await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].sn, "SN-MAIL");
    assert_eq!(sent[0].email, "mail@example.com");
    assert_eq!(sent[0].days_left, 30);
    assert_eq!(sent[0].product_name, "Licensor");
}

#[tokio::test]
async fn notification_failure_does_not_fail_allocation() {
    let env = env_with(Recorder {
        fail: true,
        ..Recorder::default()
    })
    .await;
    stock(&env.db, &["SN-MAIL"], day(1)).await;

    let outcome = env
        .service
        .request_sn(request("mail@example.com", "10.5.0.1"), day(2))
        .await
        .unwrap();
    assert_eq!(outcome.code(), ResponseCode::Success);
    assert_eq!(wait_for_notices(&env.notifier, 1).await.len(), 1);
}
