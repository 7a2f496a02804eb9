use chrono::{TimeZone, Utc};
use flowbuilder::core::{
    compile_workflow_definition, load_definition, read_envelope, write_envelope, ManualClock,
    SequentialIdGenerator, AUTHORING_KEY,
};
use flowbuilder_types::{AdvancementCondition, WorkflowDefinition, WorkflowTrigger};
use serde_json::{json, Value};

fn clock() -> ManualClock {
    ManualClock::frozen(Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap())
}

fn authoring() -> Value {
    json!({
        "id": "wf-renewal",
        "metadata": {"name": "Renewal"},
        "trigger": {"type": "contact_created", "initialStatus": "new"},
        "statuses": [{"id": "new", "name": "New", "order": 1}],
        "steps": [
            {
                "kind": "standard",
                "id": "call",
                "name": "Call",
                "actions": [{
                    "type": "create_task",
                    "id": "task-1",
                    "config": {"title": "Call var-contact.firstName", "dueDays": 4}
                }],
                "advancement": {"type": "when_task_completed", "taskActionId": "task-1"}
            },
            {
                "kind": "standard",
                "id": "mail",
                "name": "Mail",
                "actions": [{
                    "type": "send_email",
                    "id": "mail-1",
                    "config": {"to": "var-contact.email", "subject": "Renewal", "body": "Hi var-contact.firstName"}
                }],
                "advancement": {"type": "when_duration_passes", "duration": 3, "unit": "days"}
            }
        ],
        "createdAt": "2024-06-01T08:00:00Z",
        "updatedAt": "2024-06-01T08:00:00Z"
    })
}

#[test]
fn envelope_round_trip_keeps_storage_fields() {
    let definition: WorkflowDefinition = serde_json::from_value(authoring()).unwrap();
    let mut record = json!({"id": "row-9", "owner": "ops", "steps": []});
    write_envelope(&mut record, &definition).unwrap();

    assert_eq!(record["owner"], "ops");
    assert!(record.get(AUTHORING_KEY).is_some());

    let mut ids = SequentialIdGenerator::new();
    let loaded = load_definition(record, &mut ids, &clock()).unwrap();
    assert_eq!(loaded, definition);
}

#[test]
fn legacy_trigger_under_the_key_is_upgraded_in_place() {
    let mut document = authoring();
    document["trigger"] = json!({
        "type": "form_submission",
        "config": {"formId": "signup", "initialStatus": "new"}
    });
    let mut record = json!({ AUTHORING_KEY: document });

    let mut ids = SequentialIdGenerator::new();
    let definition = read_envelope(&mut record, &mut ids, &clock()).unwrap();
    assert_eq!(
        definition.trigger,
        WorkflowTrigger::FormSubmission {
            form_id: "signup".into(),
            initial_status: Some("new".into()),
        }
    );
    assert!(record[AUTHORING_KEY]["trigger"].get("config").is_none());
    assert_eq!(record[AUTHORING_KEY]["trigger"]["formId"], "signup");
}

#[test]
fn bare_documents_with_a_string_trigger_load() {
    let mut document = authoring();
    document["trigger"] = json!("manual");
    let mut ids = SequentialIdGenerator::new();
    let definition = load_definition(document, &mut ids, &clock()).unwrap();
    assert_eq!(
        definition.trigger,
        WorkflowTrigger::Manual {
            initial_status: None
        }
    );
}

#[test]
fn compiled_records_without_the_key_are_rebuilt() {
    let definition: WorkflowDefinition = serde_json::from_value(authoring()).unwrap();
    let runtime = compile_workflow_definition(&definition, None).unwrap();
    let mut record = json!({
        "id": "wf-renewal",
        "name": "Renewal",
        "statuses": definition.statuses,
        "steps": runtime,
    });

    let mut ids = SequentialIdGenerator::new();
    let rebuilt = read_envelope(&mut record, &mut ids, &clock()).unwrap();

    assert_eq!(rebuilt.id, "wf-renewal");
    assert_eq!(rebuilt.metadata.name, "Renewal");
    assert_eq!(rebuilt.trigger, definition.trigger);
    assert_eq!(rebuilt.step_ids(), vec!["step-1", "step-2"]);

    let call = rebuilt.steps[0].as_standard().unwrap();
    assert_eq!(call.actions[0].id(), "task-1");
    assert_eq!(
        call.advancement,
        AdvancementCondition::WhenTaskCompleted {
            task_action_id: "task-1".into()
        }
    );
    let rebuilt_json = serde_json::to_value(&call.actions[0]).unwrap();
    assert_eq!(rebuilt_json["config"]["title"], "Call var-contact.firstName");

    let mail = rebuilt.steps[1].as_standard().unwrap();
    assert_eq!(mail.name, "Mail");
    assert!(matches!(
        mail.advancement,
        AdvancementCondition::WhenDurationPasses { duration, .. } if duration == 3.0
    ));

    // the rebuilt document compiles back to the same runtime shape
    let recompiled = compile_workflow_definition(&rebuilt, None).unwrap();
    let kinds = |steps: &[flowbuilder_types::RuntimeStep]| -> Vec<&'static str> {
        steps.iter().map(|step| step.kind.type_name()).collect()
    };
    assert_eq!(kinds(&recompiled), kinds(&runtime));
}

#[test]
fn empty_steps_survive_reconstruction_with_generated_ids() {
    let mut document = authoring();
    document["steps"] = json!([
        {"kind": "standard", "id": "checkpoint", "name": "Checkpoint", "actions": []},
        document["steps"][1].clone()
    ]);
    let definition: WorkflowDefinition = serde_json::from_value(document).unwrap();
    let runtime = compile_workflow_definition(&definition, None).unwrap();
    let mut record = json!({"steps": runtime});

    let mut ids = SequentialIdGenerator::new();
    let rebuilt = read_envelope(&mut record, &mut ids, &clock()).unwrap();

    assert_eq!(rebuilt.id, "workflow-1");
    assert_eq!(rebuilt.step_ids(), vec!["step-1", "step-2"]);
    let checkpoint = rebuilt.steps[0].as_standard().unwrap();
    assert_eq!(checkpoint.name, "Checkpoint");
    assert!(checkpoint.actions.is_empty());
    assert_eq!(checkpoint.advancement, AdvancementCondition::Automatic);
    assert_eq!(rebuilt.steps[1].name(), "Mail");
}

#[test]
fn records_that_are_not_objects_are_rejected() {
    let mut ids = SequentialIdGenerator::new();
    let mut record = json!(["not", "an", "object"]);
    assert!(read_envelope(&mut record, &mut ids, &clock()).is_err());
    assert!(write_envelope(&mut record, &serde_json::from_value(authoring()).unwrap()).is_err());
}
