//! Lifecycle engine properties: creation rules, the combined update gate,
//! broadcast accept/decline semantics, and the invariants the lead record
//! must keep through every transition.

mod common;

use common::{draft, qualified_draft, Harness};
use uuid::Uuid;

use leadflow_core::constants::events;
use leadflow_core::models::{ActorRole, BroadcastAction, LeadUpdate};
use leadflow_core::notify::{Notification, NotifyTarget};
use leadflow_core::store::LeadStore;
use leadflow_core::LeadError;

fn drain(rx: &mut tokio::sync::broadcast::Receiver<Notification>) -> Vec<Notification> {
    let mut collected = Vec::new();
    while let Ok(notification) = rx.try_recv() {
        collected.push(notification);
    }
    collected
}

fn broadcast_update() -> LeadUpdate {
    LeadUpdate {
        assigned_to: Some("all".to_string()),
        ..LeadUpdate::default()
    }
}

#[tokio::test]
async fn test_create_rejects_duplicate_email() {
    let h = Harness::new();
    let admin = h.admin();

    h.engine.create(&admin, draft("dup@example.com")).await.unwrap();
    let err = h
        .engine
        .create(&admin, draft("dup@example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, LeadError::Conflict(_)));
}

#[tokio::test]
async fn test_partner_create_with_unresolvable_assignee_persists_nothing() {
    let h = Harness::new();
    let partner = h.seed_partner("Vikram");

    let mut payload = qualified_draft("ghost@example.com");
    payload.assigned_to = Some(Uuid::new_v4().to_string());

    let err = h.engine.create(&partner, payload).await.unwrap_err();
    assert!(matches!(err, LeadError::Validation(_)));

    let persisted = h.store.find_by_email("ghost@example.com").await.unwrap();
    assert!(persisted.is_none());
}

#[tokio::test]
async fn test_agent_create_self_assigns_and_strips_target() {
    let h = Harness::new();
    let agent = h.seed_agent("Meera");

    let mut payload = qualified_draft("self@example.com");
    payload.assigned_to = Some(Uuid::new_v4().to_string());

    let view = h.engine.create(&agent, payload).await.unwrap();
    assert_eq!(view.lead.assigned_to, Some(agent.id));
    assert_eq!(view.lead.assigned_to_name.as_deref(), Some("Meera"));
    assert_eq!(view.lead.status, "new");
    assert!(view.lead.status_history.is_empty());
}

#[tokio::test]
async fn test_interest_resolution() {
    let h = Harness::new();
    let admin = h.admin();

    // A resolvable project reference renders as its title
    let project_id = Uuid::new_v4();
    h.projects.add(project_id, "Lakeside Towers");
    let mut payload = draft("project@example.com");
    payload.interested_in = project_id.to_string();
    let view = h.engine.create(&admin, payload).await.unwrap();
    assert_eq!(view.interested_in, "Lakeside Towers");

    // An id that matches no project is an error, not free text
    let mut payload = draft("badref@example.com");
    payload.interested_in = Uuid::new_v4().to_string();
    let err = h.engine.create(&admin, payload).await.unwrap_err();
    assert!(matches!(err, LeadError::Validation(_)));

    // Free text below the minimum length is rejected
    let mut payload = draft("short@example.com");
    payload.interested_in = "ab".to_string();
    let err = h.engine.create(&admin, payload).await.unwrap_err();
    assert!(matches!(err, LeadError::Validation(_)));
}

#[tokio::test]
async fn test_concurrent_accepts_have_exactly_one_winner() {
    let h = Harness::new();
    let admin = h.admin();
    let a1 = h.seed_agent("Meera");
    let a2 = h.seed_agent("Noor");

    let lead = h.engine.create(&admin, draft("race@example.com")).await.unwrap();
    h.engine
        .update(&admin, ActorRole::Admin, lead.lead.lead_id, broadcast_update())
        .await
        .unwrap();

    let (r1, r2) = tokio::join!(
        h.engine.accept(&a1, lead.lead.lead_id),
        h.engine.accept(&a2, lead.lead.lead_id)
    );

    let (winner, loser_err) = match (r1, r2) {
        (Ok(view), Err(err)) => ((a1.clone(), view), err),
        (Err(err), Ok(view)) => ((a2.clone(), view), err),
        other => panic!("exactly one accept must succeed, got {other:?}"),
    };

    match &loser_err {
        LeadError::Conflict(message) => assert!(
            message.contains(&winner.0.name),
            "conflict must name the winner: {message}"
        ),
        other => panic!("loser must see a conflict, got {other:?}"),
    }

    let settled = winner.1.lead;
    assert!(!settled.is_broadcasted);
    assert!(settled.broadcasted_to.is_empty());
    assert_eq!(settled.accepted_by, Some(winner.0.id));
    assert_eq!(settled.assigned_to, Some(winner.0.id));
    assert!(settled.broadcast_invariant_holds());
}

#[tokio::test]
async fn test_broadcast_decline_accept_scenario() {
    let h = Harness::new();
    let admin = h.admin();
    let a1 = h.seed_agent("Meera");
    let a2 = h.seed_agent("Noor");
    let a3 = h.seed_agent("Tara");

    let mut rx = h.engine.notifier().subscribe();

    let lead = h
        .engine
        .create(&admin, draft("scenario@example.com"))
        .await
        .unwrap();
    let lead_id = lead.lead.lead_id;

    h.engine
        .update(&admin, ActorRole::Admin, lead_id, broadcast_update())
        .await
        .unwrap();

    let offered = drain(&mut rx);
    let broadcast_targets: Vec<_> = offered
        .iter()
        .filter(|n| n.event == events::LEAD_BROADCASTED)
        .map(|n| n.target)
        .collect();
    assert_eq!(broadcast_targets.len(), 3);
    for agent in [&a1, &a2, &a3] {
        assert!(broadcast_targets.contains(&NotifyTarget::Actor(agent.id)));
    }

    h.engine.decline(&a2, lead_id).await.unwrap();
    h.engine.accept(&a1, lead_id).await.unwrap();

    let settled = h.store.find_by_id(lead_id).await.unwrap().unwrap();
    assert_eq!(settled.assigned_to, Some(a1.id));
    assert!(!settled.is_broadcasted);
    assert!(settled.broadcasted_to.is_empty());
    assert_eq!(settled.declined_by, vec![a2.id]);
    assert!(settled.broadcast_invariant_holds());

    let after = drain(&mut rx);

    let taken_targets: Vec<_> = after
        .iter()
        .filter(|n| n.event == events::LEAD_TAKEN)
        .map(|n| n.target)
        .collect();
    assert!(taken_targets.contains(&NotifyTarget::Actor(a2.id)));
    assert!(taken_targets.contains(&NotifyTarget::Actor(a3.id)));
    assert!(!taken_targets.contains(&NotifyTarget::Actor(a1.id)));

    assert!(after
        .iter()
        .any(|n| n.event == events::LEAD_ACCEPTED && n.target == NotifyTarget::Admins));
    assert!(after
        .iter()
        .any(|n| n.event == events::LEAD_DECLINED && n.target == NotifyTarget::Admins));
}

#[tokio::test]
async fn test_decline_is_idempotent() {
    let h = Harness::new();
    let admin = h.admin();
    let a1 = h.seed_agent("Meera");
    let _a2 = h.seed_agent("Noor");

    let lead = h
        .engine
        .create(&admin, draft("declines@example.com"))
        .await
        .unwrap();
    h.engine
        .update(&admin, ActorRole::Admin, lead.lead.lead_id, broadcast_update())
        .await
        .unwrap();

    h.engine.decline(&a1, lead.lead.lead_id).await.unwrap();
    h.engine.decline(&a1, lead.lead.lead_id).await.unwrap();

    let current = h.store.find_by_id(lead.lead.lead_id).await.unwrap().unwrap();
    assert_eq!(
        current.declined_by.iter().filter(|id| **id == a1.id).count(),
        1
    );
    assert!(!current.broadcasted_to.contains(&a1.id));
    assert!(current.is_broadcasted);
}

#[tokio::test]
async fn test_status_updates_append_history_in_order() {
    let h = Harness::new();
    let admin = h.admin();

    let lead = h
        .engine
        .create(&admin, draft("history@example.com"))
        .await
        .unwrap();
    let lead_id = lead.lead.lead_id;

    let sequence = [
        h.status_contacted.clone(),
        h.status_closed.clone(),
        h.status_contacted.clone(),
    ];
    for entry in &sequence {
        h.engine
            .update(
                &admin,
                ActorRole::Admin,
                lead_id,
                LeadUpdate {
                    status: Some(entry.id.to_string()),
                    ..LeadUpdate::default()
                },
            )
            .await
            .unwrap();
    }

    let current = h.store.find_by_id(lead_id).await.unwrap().unwrap();
    assert_eq!(current.status_history.len(), sequence.len());
    let recorded: Vec<_> = current
        .status_history
        .iter()
        .map(|entry| entry.status.clone())
        .collect();
    assert_eq!(recorded, vec!["contacted", "closed", "contacted"]);
    assert_eq!(current.status, "contacted");
}

#[tokio::test]
async fn test_deleted_status_is_not_applicable() {
    let h = Harness::new();
    let admin = h.admin();
    let lead = h
        .engine
        .create(&admin, draft("deadstatus@example.com"))
        .await
        .unwrap();

    h.catalog.soft_delete(h.status_closed.id);
    let err = h
        .engine
        .update(
            &admin,
            ActorRole::Admin,
            lead.lead.lead_id,
            LeadUpdate {
                status: Some(h.status_closed.id.to_string()),
                ..LeadUpdate::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LeadError::NotFound(_)));
}

#[tokio::test]
async fn test_unrelated_agent_cannot_update_status() {
    let h = Harness::new();
    let admin = h.admin();
    let outsider = h.seed_agent("Outsider");

    let lead = h
        .engine
        .create(&admin, draft("gated@example.com"))
        .await
        .unwrap();

    let err = h
        .engine
        .update(
            &outsider,
            ActorRole::Agent,
            lead.lead.lead_id,
            LeadUpdate {
                status: Some(h.status_contacted.id.to_string()),
                ..LeadUpdate::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LeadError::Authorization(_)));

    let current = h.store.find_by_id(lead.lead.lead_id).await.unwrap().unwrap();
    assert!(current.status_history.is_empty());
    assert_eq!(current.status, "new");
}

#[tokio::test]
async fn test_channel_role_mismatch_is_rejected() {
    let h = Harness::new();
    let admin = h.admin();
    let agent = h.seed_agent("Meera");

    let lead = h
        .engine
        .create(&admin, draft("channel@example.com"))
        .await
        .unwrap();

    // An agent hitting the admin-partitioned endpoint is denied even if the
    // ownership gate would pass.
    let err = h
        .engine
        .update(
            &agent,
            ActorRole::Admin,
            lead.lead.lead_id,
            LeadUpdate {
                status: Some(h.status_contacted.id.to_string()),
                ..LeadUpdate::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LeadError::Authorization(_)));
}

#[tokio::test]
async fn test_direct_reassignment_supersedes_broadcast_and_keeps_declines() {
    let h = Harness::new();
    let admin = h.admin();
    let a1 = h.seed_agent("Meera");
    let a2 = h.seed_agent("Noor");

    let lead = h
        .engine
        .create(&admin, draft("supersede@example.com"))
        .await
        .unwrap();
    let lead_id = lead.lead.lead_id;

    h.engine
        .update(&admin, ActorRole::Admin, lead_id, broadcast_update())
        .await
        .unwrap();
    h.engine.decline(&a2, lead_id).await.unwrap();

    h.engine
        .update(
            &admin,
            ActorRole::Admin,
            lead_id,
            LeadUpdate {
                assigned_to: Some(a1.id.to_string()),
                ..LeadUpdate::default()
            },
        )
        .await
        .unwrap();

    let current = h.store.find_by_id(lead_id).await.unwrap().unwrap();
    assert_eq!(current.assigned_to, Some(a1.id));
    assert!(!current.is_broadcasted);
    assert!(current.broadcasted_to.is_empty());
    assert!(current.accepted_by.is_none());
    // decline history accumulates across reassignments
    assert_eq!(current.declined_by, vec![a2.id]);
    assert!(current.broadcast_invariant_holds());
}

#[tokio::test]
async fn test_late_accept_conflicts_with_winner_name() {
    let h = Harness::new();
    let admin = h.admin();
    let a1 = h.seed_agent("Meera");
    let a2 = h.seed_agent("Noor");

    let lead = h.engine.create(&admin, draft("late@example.com")).await.unwrap();
    h.engine
        .update(&admin, ActorRole::Admin, lead.lead.lead_id, broadcast_update())
        .await
        .unwrap();

    h.engine.accept(&a1, lead.lead.lead_id).await.unwrap();
    let err = h.engine.accept(&a2, lead.lead.lead_id).await.unwrap_err();
    match err {
        LeadError::Conflict(message) => assert!(message.contains("Meera")),
        other => panic!("expected conflict, got {other:?}"),
    }
}

#[tokio::test]
async fn test_accept_by_non_candidate_is_denied() {
    let h = Harness::new();
    let admin = h.admin();
    let _a1 = h.seed_agent("Meera");

    let lead = h
        .engine
        .create(&admin, draft("outsider@example.com"))
        .await
        .unwrap();
    h.engine
        .update(&admin, ActorRole::Admin, lead.lead.lead_id, broadcast_update())
        .await
        .unwrap();

    // Joined the directory after the broadcast: not in the candidate pool
    let late_joiner = h.seed_agent("Tara");
    let err = h
        .engine
        .accept(&late_joiner, lead.lead.lead_id)
        .await
        .unwrap_err();
    assert!(matches!(err, LeadError::Authorization(_)));
}

#[tokio::test]
async fn test_pending_candidate_must_accept_or_decline() {
    let h = Harness::new();
    let admin = h.admin();
    let a1 = h.seed_agent("Meera");

    let lead = h
        .engine
        .create(&admin, draft("pending@example.com"))
        .await
        .unwrap();
    h.engine
        .update(&admin, ActorRole::Admin, lead.lead.lead_id, broadcast_update())
        .await
        .unwrap();

    // A pending candidate cannot slip a status change through the combined
    // update; only accept/decline applies.
    let err = h
        .engine
        .update(
            &a1,
            ActorRole::Agent,
            lead.lead.lead_id,
            LeadUpdate {
                status: Some(h.status_contacted.id.to_string()),
                ..LeadUpdate::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LeadError::Validation(_)));

    // Accept through the combined update works and settles the lead.
    let view = h
        .engine
        .update(
            &a1,
            ActorRole::Agent,
            lead.lead.lead_id,
            LeadUpdate {
                action: Some(BroadcastAction::Accept),
                ..LeadUpdate::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(view.lead.accepted_by, Some(a1.id));
}

#[tokio::test]
async fn test_stray_action_is_rejected() {
    let h = Harness::new();
    let admin = h.admin();

    let lead = h.engine.create(&admin, draft("stray@example.com")).await.unwrap();
    let err = h
        .engine
        .update(
            &admin,
            ActorRole::Admin,
            lead.lead.lead_id,
            LeadUpdate {
                action: Some(BroadcastAction::Accept),
                ..LeadUpdate::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LeadError::Validation(_)));
}

#[tokio::test]
async fn test_status_and_reassignment_combine_in_one_call() {
    let h = Harness::new();
    let admin = h.admin();
    let a1 = h.seed_agent("Meera");

    let lead = h
        .engine
        .create(&admin, draft("combined@example.com"))
        .await
        .unwrap();

    let view = h
        .engine
        .update(
            &admin,
            ActorRole::Admin,
            lead.lead.lead_id,
            LeadUpdate {
                status: Some(h.status_contacted.id.to_string()),
                assigned_to: Some(a1.id.to_string()),
                action: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(view.lead.status, "contacted");
    assert_eq!(view.lead.status_history.len(), 1);
    assert_eq!(view.lead.assigned_to, Some(a1.id));
}

#[tokio::test]
async fn test_broadcast_with_no_active_agents_fails() {
    let h = Harness::new();
    let admin = h.admin();

    let lead = h.engine.create(&admin, draft("noagents@example.com")).await.unwrap();
    let err = h
        .engine
        .update(&admin, ActorRole::Admin, lead.lead.lead_id, broadcast_update())
        .await
        .unwrap_err();
    assert!(matches!(err, LeadError::Validation(_)));

    let current = h.store.find_by_id(lead.lead.lead_id).await.unwrap().unwrap();
    assert!(!current.is_broadcasted);
}
