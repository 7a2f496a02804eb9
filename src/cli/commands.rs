use crate::{
    cli::args::{CompileArgs, ImportArgs, ReplayArgs, ValidateArgs},
    core::{
        ids::generator_for, load_definition, read_envelope, AppError, BuilderEvent,
        BuilderSession, Clock, ConfigLoader, FlowbuilderConfig, IdGenerator, SystemClock,
        WorkflowCompiler,
    },
    utils::serialization::{FileSerializer, FileUtils, JsonSerializer, Serializer},
    Result,
};
use anyhow::{anyhow, Context};
use flowbuilder_types::{WorkflowDefinition, WorkflowStatus};
use serde::Serialize;
use serde_json::Value;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::{env, io};

/// Handles `flowbuilder validate`.
pub fn validate(args: ValidateArgs) -> Result<()> {
    let workspace = workspace_root(args.workspace.as_deref())?;
    let config = ConfigLoader::load_from_workspace(&workspace)?;
    let mut ids = generator_for(config.ids.strategy);
    let definition = read_definition(&args.definition, ids.as_mut(), &SystemClock)?;
    let statuses = load_statuses(args.statuses.as_deref(), &config, &workspace)?;

    let compiler = WorkflowCompiler::new(config.compile_options());
    let issues = compiler.validate(&definition, statuses.as_deref());
    emit(&issues, None)?;

    if issues.is_empty() {
        tracing::info!(definition_id = %definition.id, "workflow definition is valid");
        Ok(())
    } else {
        Err(anyhow!(
            "workflow definition '{}' has {} validation issue(s)",
            definition.id,
            issues.len()
        ))
    }
}

/// Handles `flowbuilder compile`.
pub fn compile(args: CompileArgs) -> Result<()> {
    let workspace = workspace_root(args.workspace.as_deref())?;
    let config = ConfigLoader::load_from_workspace(&workspace)?;
    let mut ids = generator_for(config.ids.strategy);
    let definition = read_definition(&args.definition, ids.as_mut(), &SystemClock)?;
    let statuses = load_statuses(args.statuses.as_deref(), &config, &workspace)?;

    let compiler = WorkflowCompiler::new(config.compile_options());
    match compiler.compile(&definition, statuses.as_deref()) {
        Ok(steps) => emit(&steps, args.output.as_deref()),
        Err(err) => {
            emit(&err.issues, None)?;
            Err(AppError::from(err).into())
        }
    }
}

/// Handles `flowbuilder replay`.
pub fn replay(args: ReplayArgs) -> Result<()> {
    let workspace = workspace_root(args.workspace.as_deref())?;
    let config = ConfigLoader::load_from_workspace(&workspace)?;
    let mut ids = generator_for(config.ids.strategy);
    let definition = read_definition(&args.definition, ids.as_mut(), &SystemClock)?;
    let events: Vec<BuilderEvent> = FileUtils.load_json_lines(&args.events)?;

    let mut session = BuilderSession::new(definition, ids, Box::new(SystemClock))
        .with_copy_suffix(config.session.copy_suffix);
    for event in &events {
        session.dispatch(event);
    }
    tracing::info!(
        events = events.len(),
        commands = session.command_log().len(),
        "replayed builder events"
    );

    if let Some(path) = args.state_output.as_deref() {
        emit(session.builder(), Some(path))?;
    }
    emit(&session.command_log(), None)
}

/// Handles `flowbuilder import`.
pub fn import(args: ImportArgs) -> Result<()> {
    let workspace = workspace_root(args.workspace.as_deref())?;
    let config = ConfigLoader::load_from_workspace(&workspace)?;
    let mut ids = generator_for(config.ids.strategy);
    let mut record: Value = FileUtils.load_from_file(&args.record, &JsonSerializer::default())?;
    let definition = read_envelope(&mut record, ids.as_mut(), &SystemClock)?;
    emit(&definition, args.output.as_deref())
}

fn workspace_root(requested: Option<&Path>) -> Result<PathBuf> {
    match requested {
        Some(path) => Ok(path.to_path_buf()),
        None => env::current_dir().context("failed to resolve current directory"),
    }
}

fn read_definition(
    path: &Path,
    ids: &mut dyn IdGenerator,
    clock: &dyn Clock,
) -> Result<WorkflowDefinition> {
    let value: Value = FileUtils.load_from_file(path, &JsonSerializer::default())?;
    let definition = load_definition(value, ids, clock)
        .map_err(|err| anyhow!("{}: {}", path.display(), err.message))?;
    Ok(definition)
}

/// `--statuses` wins over `compiler.statuses_file`; a relative config path is anchored at the
/// workspace.
fn load_statuses(
    flag: Option<&Path>,
    config: &FlowbuilderConfig,
    workspace: &Path,
) -> Result<Option<Vec<WorkflowStatus>>> {
    let path = match (flag, &config.compiler.statuses_file) {
        (Some(path), _) => path.to_path_buf(),
        (None, Some(configured)) => workspace.join(configured),
        (None, None) => return Ok(None),
    };
    let statuses: Vec<WorkflowStatus> =
        FileUtils.load_from_file(&path, &JsonSerializer::default())?;
    tracing::debug!(path = %path.display(), count = statuses.len(), "loaded external statuses");
    Ok(Some(statuses))
}

fn emit<T: Serialize + ?Sized>(data: &T, output: Option<&Path>) -> Result<()> {
    let serializer = JsonSerializer::pretty();
    match output {
        Some(path) => {
            FileUtils.save_to_file(path, &data, &serializer)?;
            tracing::info!(path = %path.display(), "wrote output");
        }
        None => {
            let bytes = serializer.serialize(&data)?;
            io::stdout()
                .lock()
                .write_all(&bytes)
                .context("failed to write to stdout")?;
        }
    }
    Ok(())
}
