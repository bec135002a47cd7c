//! Concurrent actions on one form, forced to interleave by slow adapters

mod common;

use common::{form, responses, seed, Harness};
use formsync::mutation::{CollaboratorMutator, SettingsMutator};
use formsync::{
    Answer, DocumentStore, FormSettings, FormsApi, MutationError, MutationKind, SearchIndex,
};
use serde_json::json;
use std::time::Duration;
use tokio::time::sleep;
use tokio_test::{assert_err, assert_ok};

const SLOW: Duration = Duration::from_millis(60);
const HEAD_START: Duration = Duration::from_millis(10);

// === Scenario: a sweep running over a record does not undo a settings update ===
#[tokio::test]
async fn sweep_never_reverts_concurrent_settings_update() {
    let harness = Harness::new();
    let current = form("f1", "A");
    seed(&harness, &current).await;
    let api = FormsApi::new(harness.context());
    assert_ok!(api.get_form(&current.id).await);
    harness.index.read_latency.set(SLOW);

    let (report, submitted) = tokio::join!(api.reconcile(), async {
        sleep(HEAD_START).await;
        api.submit_settings(&current.id, FormSettings::new("B", "d", "#fff"))
            .await
    });

    let report = assert_ok!(report);
    assert!(report.is_clean());
    assert_ok!(submitted);
    let stored = harness.store.read("forms", "f1").await.unwrap().unwrap();
    let indexed = harness.index.get_object("f1").await.unwrap().unwrap();
    assert_eq!(stored["name"], json!("B"));
    assert_eq!(indexed["name"], json!("B"));
}

// === Scenario: a settings write in flight keeps a later toggle in the snapshot ===
#[tokio::test]
async fn slow_settings_write_keeps_later_toggle() {
    let harness = Harness::new();
    harness.register(&["bob"]).await;
    let current = form("f1", "A");
    seed(&harness, &current).await;
    let ctx = harness.context();
    let settings = SettingsMutator::new(ctx.clone());
    let collaborators = CollaboratorMutator::new(ctx.clone());
    harness.store.update_latency.set(SLOW);

    let (submitted, toggled) = tokio::join!(
        settings.submit(&current, FormSettings::new("B", "d", "#fff")),
        async {
            sleep(HEAD_START).await;
            collaborators.toggle(&current, "bob").await
        }
    );

    assert_ok!(submitted);
    let (after_toggle, _) = assert_ok!(toggled);
    assert_eq!(after_toggle.name(), "B");
    assert_eq!(after_toggle.collaborators, vec!["bob"]);

    let snapshot = ctx.snapshots.get(&current.id).unwrap();
    assert_eq!(snapshot, after_toggle);
    let stored = harness.store.read("forms", "f1").await.unwrap().unwrap();
    assert_eq!(stored["collaborators"], json!(["bob"]));
    assert_eq!(stored["name"], json!("B"));
}

#[tokio::test]
async fn settings_and_response_submission_both_reach_snapshot() {
    let harness = Harness::new();
    let current = form("f1", "A");
    seed(&harness, &current).await;
    let api = FormsApi::new(harness.context());
    assert_ok!(api.get_form(&current.id).await);
    harness.store.update_latency.set(SLOW);

    let (submitted, recorded) = tokio::join!(
        api.submit_settings(&current.id, FormSettings::new("B", "d", "#fff")),
        async {
            sleep(HEAD_START).await;
            api.record_response(&current.id, vec![Answer::new("Q", "yes")])
                .await
        }
    );

    assert_ok!(submitted);
    let response = assert_ok!(recorded);
    let snapshot = assert_ok!(api.get_form(&current.id).await);
    assert_eq!(snapshot.name(), "B");
    assert_eq!(snapshot.responses, vec![response]);

    let indexed = harness.index.get_object("f1").await.unwrap().unwrap();
    assert_eq!(indexed["name"], json!("B"));
    assert_eq!(indexed["responses"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn recording_and_deleting_responses_both_land() {
    let harness = Harness::new();
    let mut current = form("f1", "A");
    current.responses = responses(&["r1", "r2"]);
    seed(&harness, &current).await;
    let api = FormsApi::new(harness.context());
    assert_ok!(api.get_form(&current.id).await);
    harness.store.update_latency.set(SLOW);

    let (recorded, deleted) = tokio::join!(
        api.record_response(&current.id, vec![Answer::new("Q", "late")]),
        async {
            sleep(HEAD_START).await;
            api.delete_response(&current.id, "r1").await
        }
    );

    let late = assert_ok!(recorded);
    let after_delete = assert_ok!(deleted);
    let ids: Vec<_> = after_delete
        .responses
        .iter()
        .map(|r| r.id_response.clone())
        .collect();
    assert_eq!(ids, vec!["r2".to_string(), late.id_response.clone()]);
    assert_eq!(assert_ok!(api.get_form(&current.id).await), after_delete);

    let stored = harness.store.read("forms", "f1").await.unwrap().unwrap();
    let indexed = harness.index.get_object("f1").await.unwrap().unwrap();
    assert_eq!(stored["responses"], indexed["responses"]);
}

// === Scenario: settings and collaborator edits are not in flight together ===
#[tokio::test]
async fn collaborator_toggle_refused_while_settings_outstanding() {
    let harness = Harness::new();
    harness.register(&["bob"]).await;
    let current = form("f1", "A");
    seed(&harness, &current).await;
    let api = FormsApi::new(harness.context());
    assert_ok!(api.get_form(&current.id).await);
    harness.store.update_latency.set(SLOW);

    let (submitted, toggled) = tokio::join!(
        api.submit_settings(&current.id, FormSettings::new("B", "d", "#fff")),
        async {
            sleep(HEAD_START).await;
            api.toggle_collaborator(&current.id, "bob").await
        }
    );

    assert_ok!(submitted);
    let err = assert_err!(toggled);
    assert!(matches!(err, MutationError::Busy(MutationKind::Settings)));
    let status = api.status(MutationKind::Collaborators, &current.id);
    assert!(!status.is_loading());
    assert!(!status.is_error());

    let stored = harness.store.read("forms", "f1").await.unwrap().unwrap();
    assert_eq!(stored["collaborators"], json!([]));
    assert_ok!(api.toggle_collaborator(&current.id, "bob").await);
}

#[tokio::test]
async fn refresh_during_write_does_not_clobber_its_result() {
    let harness = Harness::new();
    let current = form("f1", "A");
    seed(&harness, &current).await;
    let api = FormsApi::new(harness.context());
    assert_ok!(api.get_form(&current.id).await);
    harness.store.update_latency.set(SLOW);

    let (submitted, refreshed) = tokio::join!(
        api.submit_settings(&current.id, FormSettings::new("B", "d", "#fff")),
        async {
            sleep(HEAD_START).await;
            api.refresh(&current.id).await
        }
    );

    assert_ok!(submitted);
    assert_eq!(assert_ok!(refreshed).name(), "A");
    assert_eq!(assert_ok!(api.get_form(&current.id).await).name(), "B");
}
