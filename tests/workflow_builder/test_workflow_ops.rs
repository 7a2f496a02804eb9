use flowbuilder::core::ids::{RandomIdGenerator, SequentialIdGenerator};
use flowbuilder::core::workflow_builder::ops::{
    add_track_step_to_branch, clone_step, duplicate_action_in_list, duplicate_step_in_list,
    find_selected_step, remove_track_step_from_branch, reorder_steps, update_workflow_step,
};
use flowbuilder::core::workflow_builder::{StepRef, TrackAddress, COPY_SUFFIX};
use flowbuilder_types::{
    AdvancementCondition, AuthoringStep, BranchCondition, BranchOperator, BranchStep, BranchTrack,
    CreateTaskConfig, NotificationConfig, StandardStep, WorkflowAction,
};
use serde_json::json;
use std::collections::HashSet;

fn task(id: &str) -> WorkflowAction {
    WorkflowAction::CreateTask {
        id: id.into(),
        config: CreateTaskConfig {
            title: "Call {{var-contact.firstName}}".into(),
            description: None,
            assignee: None,
            due_days: Some(3),
            links: Vec::new(),
        },
    }
}

fn note(id: &str) -> WorkflowAction {
    WorkflowAction::Notification {
        id: id.into(),
        config: NotificationConfig {
            title: "Heads up".into(),
            message: "New lead".into(),
            recipient: None,
        },
    }
}

fn task_step(id: &str, action_id: &str) -> StandardStep {
    let mut step = StandardStep::new(id, "Call");
    step.actions = vec![task(action_id), note(&format!("{}-note", action_id))];
    step.advancement = AdvancementCondition::WhenTaskCompleted {
        task_action_id: action_id.into(),
    };
    step
}

fn branch() -> AuthoringStep {
    BranchStep {
        id: "branch-1".into(),
        name: "Tier".into(),
        condition: BranchCondition {
            variable_ref: "var-contact.tier".into(),
            operator: BranchOperator::NotEquals,
            compare_value: json!("vip"),
        },
        tracks: vec![
            BranchTrack {
                id: "track-a".into(),
                name: "Yes".into(),
                steps: vec![task_step("nested-1", "task-nested")],
            },
            BranchTrack {
                id: "track-b".into(),
                name: "No".into(),
                steps: Vec::new(),
            },
        ],
        description: None,
    }
    .into()
}

fn standard_ids(step: &StandardStep, ids: &mut Vec<String>) {
    ids.push(step.id.clone());
    ids.extend(step.actions.iter().map(|action| action.id().to_string()));
}

fn every_id(step: &AuthoringStep) -> Vec<String> {
    let mut ids = Vec::new();
    match step {
        AuthoringStep::Standard(standard) => standard_ids(standard, &mut ids),
        AuthoringStep::Branch(branch) => {
            ids.push(branch.id.clone());
            for track in &branch.tracks {
                ids.push(track.id.clone());
                for nested in &track.steps {
                    standard_ids(nested, &mut ids);
                }
            }
        }
    }
    ids
}

#[test]
fn cloned_branch_shares_no_ids_with_its_source() {
    let source = branch();
    let mut ids = RandomIdGenerator::new();
    let copy = clone_step(&source, &mut ids, Some(COPY_SUFFIX));

    let original: HashSet<String> = every_id(&source).into_iter().collect();
    let cloned: HashSet<String> = every_id(&copy).into_iter().collect();
    assert_eq!(original.len(), cloned.len());
    assert!(original.is_disjoint(&cloned));
    assert_eq!(copy.name(), "Tier (Copy)");

    let nested = &copy.as_branch().unwrap().tracks[0].steps[0];
    assert_eq!(nested.name, "Call");
}

#[test]
fn cloned_step_follows_its_renamed_task() {
    let source: AuthoringStep = task_step("s1", "task-1").into();
    let mut ids = SequentialIdGenerator::new();
    let copy = clone_step(&source, &mut ids, None);
    let copy = copy.as_standard().unwrap();

    assert_eq!(copy.id, "step-1");
    assert_eq!(copy.actions[0].id(), "action-1");
    assert_eq!(copy.actions[1].id(), "action-2");
    assert_eq!(
        copy.advancement,
        AdvancementCondition::WhenTaskCompleted {
            task_action_id: "action-1".into()
        }
    );
}

#[test]
fn duplicate_inserts_the_copy_after_its_source() {
    let steps: Vec<AuthoringStep> = vec![
        StandardStep::new("a", "Welcome").into(),
        StandardStep::new("b", "Follow up").into(),
    ];
    let mut ids = SequentialIdGenerator::new();
    let duplicated = duplicate_step_in_list(&steps, "a", &mut ids, COPY_SUFFIX);

    let order: Vec<&str> = duplicated.items.iter().map(AuthoringStep::id).collect();
    assert_eq!(order, vec!["a", "step-1", "b"]);
    assert_eq!(duplicated.items[1].name(), "Welcome (Copy)");
    assert_eq!(duplicated.duplicated_id.as_deref(), Some("step-1"));
}

#[test]
fn duplicate_of_a_missing_id_changes_nothing() {
    let steps: Vec<AuthoringStep> = vec![StandardStep::new("a", "Welcome").into()];
    let mut ids = SequentialIdGenerator::new();
    let duplicated = duplicate_step_in_list(&steps, "ghost", &mut ids, COPY_SUFFIX);
    assert_eq!(duplicated.items, steps);
    assert!(duplicated.duplicated_id.is_none());

    let actions = vec![note("n1")];
    let duplicated = duplicate_action_in_list(&actions, "ghost", &mut ids);
    assert_eq!(duplicated.items, actions);
    assert!(duplicated.duplicated_id.is_none());
}

#[test]
fn duplicate_action_gets_a_fresh_id() {
    let actions = vec![note("n1"), task("t1")];
    let mut ids = SequentialIdGenerator::new();
    let duplicated = duplicate_action_in_list(&actions, "n1", &mut ids);
    let order: Vec<&str> = duplicated.items.iter().map(WorkflowAction::id).collect();
    assert_eq!(order, vec!["n1", "action-1", "t1"]);
}

#[test]
fn top_level_ids_win_over_track_addresses() {
    let mut steps = vec![branch()];
    steps.push(StandardStep::new("nested-1", "Shadow").into());
    let address = TrackAddress::new("branch-1", "track-a");

    let found = find_selected_step(&steps, "nested-1", Some(&address)).unwrap();
    assert!(matches!(found, StepRef::TopLevel(_)));

    steps.pop();
    match find_selected_step(&steps, "nested-1", Some(&address)).unwrap() {
        StepRef::Track { branch, track, step } => {
            assert_eq!(branch.id, "branch-1");
            assert_eq!(track.id, "track-a");
            assert_eq!(step.id, "nested-1");
        }
        other => panic!("expected a track step, got {:?}", other),
    }
    assert!(find_selected_step(&steps, "nested-1", None).is_none());
}

#[test]
fn track_steps_are_added_updated_and_removed_in_place() {
    let steps = vec![branch()];
    let address = TrackAddress::new("branch-1", "track-b");

    let added = add_track_step_to_branch(&steps, &address, StandardStep::new("late", "Late"));
    let track = &added[0].as_branch().unwrap().tracks[1];
    assert_eq!(track.steps.len(), 1);

    let updated = update_workflow_step(
        &added,
        "late",
        StandardStep::new("late", "Later").into(),
        Some(&address),
    );
    assert_eq!(updated[0].as_branch().unwrap().tracks[1].steps[0].name, "Later");

    let removed = remove_track_step_from_branch(&updated, &address, "late");
    assert_eq!(removed, steps);

    let unknown = TrackAddress::new("branch-1", "track-z");
    assert_eq!(
        add_track_step_to_branch(&steps, &unknown, StandardStep::new("x", "X")),
        steps
    );
}

#[test]
fn reorder_keeps_unnamed_steps_after_named_ones() {
    let steps: Vec<AuthoringStep> = vec![
        StandardStep::new("a", "A").into(),
        StandardStep::new("b", "B").into(),
        StandardStep::new("c", "C").into(),
    ];
    let reordered = reorder_steps(&steps, &["c".into(), "ghost".into(), "a".into()]);
    let order: Vec<&str> = reordered.iter().map(AuthoringStep::id).collect();
    assert_eq!(order, vec!["c", "a", "b"]);
}
