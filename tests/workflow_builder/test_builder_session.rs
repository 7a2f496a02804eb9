use chrono::{DateTime, Duration, TimeZone, Utc};
use flowbuilder::core::clock::ManualClock;
use flowbuilder::core::ids::SequentialIdGenerator;
use flowbuilder::core::workflow_builder::{
    reduce_builder_state, BuilderEvent, BuilderSession, BuilderState, ReducerContext, Selection,
};
use flowbuilder_types::{
    AuthoringStep, BranchCondition, BranchOperator, BranchStep, BranchTrack, StandardStep,
    WorkflowDefinition,
};
use insta::assert_json_snapshot;
use serde_json::json;

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
}

fn branch(id: &str, nested: &[&str]) -> AuthoringStep {
    AuthoringStep::Branch(BranchStep {
        id: id.into(),
        name: "Tier".into(),
        condition: BranchCondition {
            variable_ref: "var-contact.tier".into(),
            operator: BranchOperator::Equals,
            compare_value: json!("vip"),
        },
        tracks: vec![
            BranchTrack {
                id: "track-a".into(),
                name: "VIP".into(),
                steps: nested
                    .iter()
                    .map(|id| StandardStep::new(*id, format!("Nested {}", id)))
                    .collect(),
            },
            BranchTrack {
                id: "track-b".into(),
                name: "Regular".into(),
                steps: vec![StandardStep::new("regular-1", "Regular")],
            },
        ],
        description: None,
    })
}

fn definition(steps: Vec<AuthoringStep>) -> WorkflowDefinition {
    let mut definition = WorkflowDefinition::new("wf-1", "Onboarding", start());
    definition.steps = steps;
    definition
}

fn session(steps: Vec<AuthoringStep>) -> BuilderSession {
    BuilderSession::new(
        definition(steps),
        Box::new(SequentialIdGenerator::new()),
        Box::new(ManualClock::new(start(), Duration::seconds(1))),
    )
}

#[test]
fn deleting_the_selected_step_falls_back_to_the_first_remaining_step() {
    let mut session = session(vec![
        StandardStep::new("a", "A").into(),
        StandardStep::new("b", "B").into(),
    ]);
    assert_eq!(session.builder().selection, Selection::step("a"));

    session.dispatch(&BuilderEvent::StepDeleted {
        step_id: "a".into(),
        fallback_step_id: None,
    });
    assert_eq!(session.builder().selection, Selection::step("b"));

    session.dispatch(&BuilderEvent::StepDeleted {
        step_id: "b".into(),
        fallback_step_id: None,
    });
    assert_eq!(session.builder().selection, Selection::None);
}

#[test]
fn deleting_the_selected_step_prefers_an_explicit_fallback() {
    let mut session = session(vec![
        StandardStep::new("a", "A").into(),
        StandardStep::new("b", "B").into(),
        StandardStep::new("c", "C").into(),
    ]);
    session.dispatch(&BuilderEvent::StepSelected {
        step_id: "b".into(),
    });
    session.dispatch(&BuilderEvent::StepDeleted {
        step_id: "b".into(),
        fallback_step_id: Some("c".into()),
    });
    assert_eq!(session.builder().selection, Selection::step("c"));
}

#[test]
fn deleting_the_selected_track_step_selects_the_parent_branch() {
    let mut session = session(vec![
        StandardStep::new("a", "A").into(),
        branch("branch-1", &["vip-1", "vip-2"]),
    ]);
    session.dispatch(&BuilderEvent::TrackStepSelected {
        branch_id: "branch-1".into(),
        track_id: "track-a".into(),
        step_id: "vip-2".into(),
    });
    assert!(session.builder().selection.is_track_step());

    session.dispatch(&BuilderEvent::TrackStepDeleted {
        branch_id: "branch-1".into(),
        track_id: "track-a".into(),
        step_id: "vip-2".into(),
    });
    assert_eq!(session.builder().selection, Selection::step("branch-1"));
    let remaining = session.definition().steps[1].as_branch().unwrap();
    assert_eq!(remaining.tracks[0].steps.len(), 1);
}

#[test]
fn replaying_an_event_from_the_same_state_is_deterministic() {
    let state = BuilderState::new(definition(vec![
        StandardStep::new("a", "A").into(),
        StandardStep::new("b", "B").into(),
    ]));
    let events = [
        BuilderEvent::StepDuplicated {
            step_id: "a".into(),
        },
        BuilderEvent::StepsReordered {
            step_ids: vec!["b".into(), "a".into()],
        },
        BuilderEvent::TriggerSelected,
    ];

    for event in &events {
        let first = {
            let mut ids = SequentialIdGenerator::new();
            let clock = ManualClock::frozen(start());
            let mut ctx = ReducerContext::new(&mut ids, &clock);
            reduce_builder_state(&state, event, &mut ctx)
        };
        let second = {
            let mut ids = SequentialIdGenerator::new();
            let clock = ManualClock::frozen(start());
            let mut ctx = ReducerContext::new(&mut ids, &clock);
            reduce_builder_state(&state, event, &mut ctx)
        };
        assert_eq!(first, second, "event {} diverged", event.type_name());
    }
}

#[test]
fn selection_events_never_touch_the_document() {
    let mut session = session(vec![branch("branch-1", &["vip-1"])]);
    let before = session.definition().clone();
    session.dispatch(&BuilderEvent::TriggerSelected);
    session.dispatch(&BuilderEvent::TrackStepSelected {
        branch_id: "branch-1".into(),
        track_id: "track-a".into(),
        step_id: "vip-1".into(),
    });
    session.dispatch(&BuilderEvent::JsonExportToggled);
    session.dispatch(&BuilderEvent::StepSelected {
        step_id: "missing".into(),
    });

    assert_eq!(session.definition(), &before);
    assert!(session.command_log().is_empty());
    assert!(session.builder().json_export_open);
    assert_eq!(
        session.builder().selection,
        Selection::track_step("branch-1", "track-a", "vip-1")
    );
}

#[test]
fn step_updated_is_addressed_by_the_previous_selection() {
    let mut session = session(vec![
        StandardStep::new("a", "A").into(),
        branch("branch-1", &["vip-1"]),
    ]);

    let command = session
        .dispatch(&BuilderEvent::StepUpdated {
            step: StandardStep::new("a", "Renamed").into(),
        })
        .cloned()
        .expect("update_step command");
    assert_eq!(command.command_type.as_str(), "update_step");

    session.dispatch(&BuilderEvent::TrackStepSelected {
        branch_id: "branch-1".into(),
        track_id: "track-a".into(),
        step_id: "vip-1".into(),
    });
    let command = session
        .dispatch(&BuilderEvent::StepUpdated {
            step: StandardStep::new("vip-1", "VIP welcome").into(),
        })
        .cloned()
        .expect("update_track_step command");

    assert_json_snapshot!(command, @r###"
    {
      "type": "update_track_step",
      "definitionId": "wf-1",
      "definitionVersion": "2024-03-01T09:00:01Z",
      "payload": {
        "branchId": "branch-1",
        "trackId": "track-a",
        "step": {
          "kind": "standard",
          "id": "vip-1",
          "name": "VIP welcome",
          "actions": [],
          "advancement": {
            "type": "automatic"
          }
        }
      }
    }
    "###);
    let nested = &session.definition().steps[1].as_branch().unwrap().tracks[0].steps[0];
    assert_eq!(nested.name, "VIP welcome");
}

#[test]
fn duplicate_command_names_the_new_step() {
    let mut session = session(vec![
        StandardStep::new("a", "Welcome").into(),
        StandardStep::new("b", "Follow up").into(),
    ]);
    let command = session
        .dispatch(&BuilderEvent::StepDuplicated {
            step_id: "a".into(),
        })
        .cloned()
        .expect("duplicate_step command");

    assert_eq!(session.definition().step_ids(), vec!["a", "step-1", "b"]);
    assert_eq!(
        session.definition().steps[1].name(),
        "Welcome (Copy)"
    );
    assert_eq!(session.builder().selection, Selection::step("step-1"));
    let payload = serde_json::to_value(&command.payload).unwrap();
    assert_eq!(
        payload,
        json!({"sourceStepId": "a", "duplicatedStepId": "step-1"})
    );
}

#[test]
fn document_versions_strictly_increase() {
    let mut session = BuilderSession::new(
        definition(Vec::new()),
        Box::new(SequentialIdGenerator::new()),
        Box::new(ManualClock::frozen(start())),
    );
    for name in ["a", "b", "c"] {
        session.dispatch(&BuilderEvent::StepAdded {
            step: StandardStep::new(name, name).into(),
            index: None,
        });
    }
    let versions: Vec<_> = session
        .command_log()
        .iter()
        .map(|command| command.definition_version)
        .collect();
    assert!(versions.windows(2).all(|pair| pair[0] < pair[1]));
    assert!(versions[0] > start());
}
