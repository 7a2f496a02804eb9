use flowbuilder::core::{
    compile_workflow_definition, CompileOptions, ValidationIssueCode, WorkflowCompiler,
};
use flowbuilder_types::{RuntimeStep, RuntimeStepKind, WorkflowDefinition, WORKFLOW_END_STEP_ID};
use insta::assert_json_snapshot;
use serde_json::{json, Value};

fn document(steps: Value) -> WorkflowDefinition {
    serde_json::from_value(json!({
        "id": "wf-onboarding",
        "metadata": {"name": "Onboarding"},
        "trigger": {"type": "contact_created", "initialStatus": "new"},
        "statuses": [
            {"id": "new", "name": "New", "order": 1},
            {"id": "active", "name": "Active", "order": 2}
        ],
        "steps": steps,
        "createdAt": "2024-03-01T09:00:00Z",
        "updatedAt": "2024-03-01T09:00:00Z"
    }))
    .expect("valid authoring document")
}

fn standard(id: &str, actions: Value) -> Value {
    json!({"kind": "standard", "id": id, "name": id, "actions": actions})
}

fn note(id: &str) -> Value {
    json!({"type": "notification", "id": id, "config": {"title": "Heads up", "message": "New lead"}})
}

fn branch(operator: &str) -> Value {
    json!({
        "kind": "branch",
        "id": "tier",
        "name": "Tier",
        "condition": {
            "variableRef": "var-contact.tier",
            "operator": operator,
            "compareValue": "vip"
        },
        "tracks": [
            {"id": "yes", "name": "VIP", "steps": [standard("vip", json!([note("vip-note")]))]},
            {"id": "no", "name": "Regular", "steps": [standard("regular", json!([note("regular-note")]))]}
        ]
    })
}

fn ids(steps: &[RuntimeStep]) -> Vec<&str> {
    steps.iter().map(|step| step.id.as_str()).collect()
}

fn step<'a>(steps: &'a [RuntimeStep], id: &str) -> &'a RuntimeStep {
    steps
        .iter()
        .find(|step| step.id == id)
        .unwrap_or_else(|| panic!("runtime step '{}' missing", id))
}

#[test]
fn each_action_becomes_one_runtime_step() {
    let definition = document(json!([
        standard("two", json!([note("n1"), note("n2")])),
        standard("empty", json!([])),
    ]));
    let steps = compile_workflow_definition(&definition, None).expect("compiles");

    assert_eq!(ids(&steps), vec!["trigger", "n1", "n2", "empty", WORKFLOW_END_STEP_ID]);
    assert!(matches!(step(&steps, "n1").kind, RuntimeStepKind::Notification(_)));
    let anchor = step(&steps, "empty").condition().expect("anchor is a condition");
    assert!(anchor.branches.is_empty());
    assert!(anchor.default_goto.is_none());
}

#[test]
fn task_advancement_lowers_to_assign_and_wait() {
    let mut call = standard(
        "call",
        json!([{
            "type": "create_task",
            "id": "task-1",
            "config": {"title": "Call var-contact.firstName", "dueDays": 2}
        }]),
    );
    call["advancement"] = json!({"type": "when_task_completed", "taskActionId": "task-1"});
    let definition = document(json!([call]));

    let steps = compile_workflow_definition(&definition, None).expect("compiles");
    assert_json_snapshot!(steps, @r###"
    [
      {
        "id": "trigger",
        "name": "Trigger",
        "type": "trigger",
        "trigger": "contact_created",
        "initialStatus": "new"
      },
      {
        "id": "task-1",
        "name": "call",
        "type": "assign_task",
        "title": "Call {{contact.firstName}}",
        "dueDays": 2
      },
      {
        "id": "call__wait",
        "name": "call: wait for task",
        "type": "wait_for_task",
        "taskStepId": "task-1",
        "timeoutDays": 2
      },
      {
        "id": "workflow_end",
        "name": "End",
        "type": "condition",
        "branches": []
      }
    ]
    "###);
}

#[test]
fn missing_due_days_wait_the_configured_default() {
    let mut call = standard(
        "call",
        json!([{"type": "create_task", "id": "task-1", "config": {"title": "Call"}}]),
    );
    call["advancement"] = json!({"type": "when_task_completed", "taskActionId": "task-1"});
    let definition = document(json!([call]));

    let compiler = WorkflowCompiler::new(CompileOptions {
        default_task_wait_days: 3,
    });
    let steps = compiler.compile(&definition, None).expect("compiles");
    match &step(&steps, "call__wait").kind {
        RuntimeStepKind::WaitForTask(wait) => {
            assert_eq!(wait.task_step_id, "task-1");
            assert_eq!(wait.timeout_days, 3);
        }
        other => panic!("expected wait_for_task, got {}", other.type_name()),
    }
}

#[test]
fn equals_branch_matches_into_the_first_track() {
    let definition = document(json!([branch("equals")]));
    let steps = compile_workflow_definition(&definition, None).expect("compiles");

    assert_eq!(
        ids(&steps),
        vec!["trigger", "tier", "vip-note", "tier__merge", "regular-note", "workflow_end"]
    );
    let condition = step(&steps, "tier").condition().unwrap();
    let test = condition.branches[0].when.as_ref().unwrap();
    assert_eq!(test.variable, "{{contact.tier}}");
    assert_eq!(test.value, "vip");
    assert_eq!(condition.branches[0].goto, "vip-note");
    assert_eq!(condition.default_goto.as_deref(), Some("regular-note"));

    let merge = step(&steps, "tier__merge").condition().unwrap();
    assert_eq!(merge.branches[0].goto, WORKFLOW_END_STEP_ID);
}

#[test]
fn not_equals_branch_swaps_targets_and_merges_into_the_next_step() {
    let definition = document(json!([
        branch("not_equals"),
        standard("after", json!([note("after-note")])),
    ]));
    let steps = compile_workflow_definition(&definition, None).expect("compiles");

    let condition = step(&steps, "tier").condition().unwrap();
    assert_eq!(condition.branches[0].goto, "regular-note");
    assert_eq!(condition.default_goto.as_deref(), Some("vip-note"));
    let merge = step(&steps, "tier__merge").condition().unwrap();
    assert_eq!(merge.branches[0].goto, "after-note");
}

#[test]
fn every_goto_resolves_to_an_emitted_step() {
    let definition = document(json!([
        branch("equals"),
        branch_with_id("second"),
    ]));
    let steps = compile_workflow_definition(&definition, None).expect("compiles");
    let known: Vec<&str> = ids(&steps);
    for step in &steps {
        for target in step.goto_targets() {
            assert!(known.contains(&target), "{} points at unknown {}", step.id, target);
        }
    }
    let merge = step(&steps, "tier__merge").condition().unwrap();
    assert_eq!(merge.branches[0].goto, "second");
}

fn branch_with_id(id: &str) -> Value {
    let mut value = branch("equals");
    value["id"] = json!(id);
    value["tracks"][0]["id"] = json!(format!("{}-yes", id));
    value["tracks"][1]["id"] = json!(format!("{}-no", id));
    value["tracks"][0]["steps"] = json!([standard(&format!("{}-vip", id), json!([]))]);
    value["tracks"][1]["steps"] = json!([standard(&format!("{}-regular", id), json!([]))]);
    value
}

#[test]
fn weeks_are_normalized_to_days() {
    let mut pause = standard("pause", json!([]));
    pause["advancement"] = json!({"type": "when_duration_passes", "duration": 2, "unit": "weeks"});
    let definition = document(json!([pause]));
    let steps = compile_workflow_definition(&definition, None).expect("compiles");

    assert_eq!(ids(&steps), vec!["trigger", "pause__delay", "workflow_end"]);
    match &step(&steps, "pause__delay").kind {
        RuntimeStepKind::Delay(delay) => assert_eq!(delay.days, 14.0),
        other => panic!("expected delay, got {}", other.type_name()),
    }
}

#[test]
fn invalid_documents_do_not_compile() {
    let mut step = standard("call", json!([note("n1")]));
    step["advancement"] = json!({"type": "when_approved"});
    let definition = document(json!([step]));

    let error = compile_workflow_definition(&definition, None).unwrap_err();
    assert!(error.has_code(ValidationIssueCode::UnsupportedAdvancement));
    assert!(error.to_string().starts_with("workflow definition failed to compile"));
}

#[test]
fn week_delays_too_large_for_a_day_count_do_not_compile() {
    let mut pause = standard("pause", json!([]));
    pause["advancement"] = json!({"type": "when_duration_passes", "duration": 1e308, "unit": "weeks"});
    let definition = document(json!([pause]));

    let error = compile_workflow_definition(&definition, None).unwrap_err();
    assert_eq!(error.issues.len(), 1);
    assert_eq!(error.issues[0].code, ValidationIssueCode::InvalidAdvancement);
    assert_eq!(error.issues[0].path, "steps[0].advancement.duration");
}
