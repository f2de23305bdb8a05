// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The step scheduler
//!
//! Drives a recipe to completion: resolves step targets against the
//! configuration tree, prevalidates, then executes steps in declaration
//! order — honoring selection, tags, skip flags and `skip_if_outputs` —
//! binding parameters through the namespace stack, dispatching cabs to
//! their backend, recursing into sub-recipes, and propagating outputs
//! back up through aliases. For-loops re-evaluate assignments per
//! iteration and may scatter across bounded concurrent workers.

use crate::{info::step_info, outputs, run_cab, CabStatus, RunError, RunLog, RunOptions,
    ScriptHost, StepSelection};
use convoy_backend::{BackendPrefs, BackendRegistry};
use convoy_config::{reparent_top_level, resolve_includes, Loader, Value};
use convoy_recipe::{
    apply_assign_based_on, apply_assignments, prevalidate, recipe_scope, Bindings, Cab, Policies,
    Prevalidated, Recipe, RecipeError, SkipIfOutputs, Step, StepIo, StepTarget,
};
use convoy_schema::typecheck;
use convoy_subst::{evaluate_string, evaluate_value, Evaluated, NsStack, SubstError};
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

/// Step lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Pending,
    PreValidated,
    Bound,
    Running,
    Succeeded,
    Failed,
    Skipped,
}

/// The record a step leaves behind, retained for alias
/// back-propagation and the final report.
#[derive(Debug, Clone)]
pub struct StepRecord {
    pub label: String,
    pub fqname: String,
    pub status: StepStatus,
    pub params: Bindings,
    pub outputs: Bindings,
    pub warnings: Vec<String>,
}

/// The result of a whole run.
#[derive(Debug)]
pub struct RunOutcome {
    /// Recipe-level outputs gathered through output aliases.
    pub outputs: Bindings,
    pub steps: Vec<StepRecord>,
    pub warnings: Vec<String>,
}

/// Load one or more documents, resolve their includes, merge them in
/// order and reparent stray top-level keys. The entry point the run
/// surface hands to [`Engine::run`].
pub fn load_documents(loader: &Loader, paths: &[PathBuf]) -> Result<Value, RunError> {
    let mut merged = Value::empty_map();
    for path in paths {
        let mut tree = loader.load_file(path)?;
        let dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        resolve_includes(&mut tree, loader, &dir)?;
        convoy_config::merge(&mut merged, tree)?;
    }
    reparent_top_level(&mut merged);
    Ok(merged)
}

/// The pipeline engine.
pub struct Engine {
    registry: Arc<BackendRegistry>,
    script_host: Option<Arc<dyn ScriptHost>>,
    log: RunLog,
    cancel: CancellationToken,
}

impl Default for Engine {
    fn default() -> Self {
        Engine {
            registry: Arc::new(BackendRegistry::new()),
            script_host: None,
            log: RunLog::new(),
            cancel: CancellationToken::new(),
        }
    }
}

/// State shared by every step and scatter worker of one run.
#[derive(Clone)]
struct RunShared {
    config: Arc<Value>,
    registry: Arc<BackendRegistry>,
    script_host: Option<Arc<dyn ScriptHost>>,
    log: RunLog,
    cancel: CancellationToken,
    options: Arc<RunOptions>,
}

/// A step's resolved target: the cab to invoke or the sub-recipe to
/// recurse into.
#[derive(Clone)]
enum Target {
    Cab(Box<Cab>),
    Recipe(Box<Recipe>),
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_registry(mut self, registry: BackendRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    pub fn with_script_host(mut self, host: Arc<dyn ScriptHost>) -> Self {
        self.script_host = Some(host);
        self
    }

    pub fn with_log(mut self, log: RunLog) -> Self {
        self.log = log;
        self
    }

    /// The token an embedding application cancels on operator
    /// interrupt; every outstanding child process receives an interrupt
    /// and the run unwinds with [`RunError::Cancelled`].
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run a recipe from the merged configuration tree.
    pub async fn run(
        &self,
        config: &Value,
        recipe_name: &str,
        params: Bindings,
        selection: &StepSelection,
    ) -> Result<RunOutcome, RunError> {
        let mut config = config.clone();
        // Expose the process environment under config.run.env
        for (key, value) in std::env::vars() {
            if !key.contains('.') {
                config.set_path(&format!("run.env.{key}"), Value::from(value));
            }
        }

        let options = RunOptions::parse(config.get("opts"));
        if let Some(limit) = options.nofile_limit {
            convoy_backend::apply_nofile_limit(limit)?;
        }

        // opts.log routes output to a file; otherwise the engine's own
        // sink (tracing-only by default) is shared by every step.
        let log = match &options.log_dir {
            Some(dir) => {
                let template = options
                    .log_name
                    .clone()
                    .unwrap_or_else(|| "{name}.log".to_string());
                let file_name = template.replace("{name}", recipe_name);
                RunLog::to_file(&Path::new(dir).join(file_name))?
            }
            None => self.log.clone(),
        };

        let recipe = find_recipe(&config, recipe_name)?;
        let shared = RunShared {
            config: Arc::new(config),
            registry: Arc::clone(&self.registry),
            script_host: self.script_host.clone(),
            log,
            cancel: self.cancel.clone(),
            options: Arc::new(options),
        };

        let result = run_recipe(
            shared,
            recipe,
            recipe_name.to_string(),
            params,
            selection.clone(),
            None,
        )
        .await?;
        Ok(RunOutcome {
            outputs: result.outputs,
            steps: result.steps,
            warnings: result.warnings,
        })
    }

    /// Walk every cab a recipe references (recursively) and build its
    /// image on the cab's selected backend. The build surface.
    pub async fn build_images(
        &self,
        config: &Value,
        recipe_name: &str,
    ) -> Result<Vec<String>, RunError> {
        let options = RunOptions::parse(config.get("opts"));
        let mut built = Vec::new();
        let mut pending = vec![find_recipe(config, recipe_name)?];
        while let Some(recipe) = pending.pop() {
            for step in &recipe.steps {
                match resolve_target(config, step)? {
                    Target::Recipe(sub) => pending.push(*sub),
                    Target::Cab(cab) => {
                        let Some(image) = &cab.image else { continue };
                        let prefs = BackendPrefs::from_layers(&[
                            options.backend.as_ref(),
                            recipe.backend.as_ref(),
                            cab.backend.as_ref(),
                            step.backend.as_ref(),
                        ])?;
                        let backend = self.registry.select(&prefs)?;
                        built.push(backend.build(image).await?);
                    }
                }
            }
        }
        Ok(built)
    }
}

fn find_recipe(config: &Value, name: &str) -> Result<Recipe, RunError> {
    let def = config
        .get_path(&format!("lib.recipes.{name}"))
        .ok_or_else(|| RunError::RecipeNotFound {
            name: name.to_string(),
        })?;
    Ok(Recipe::parse(name, def)?)
}

fn resolve_target(config: &Value, step: &Step) -> Result<Target, RunError> {
    match &step.target {
        StepTarget::Cab(name) => {
            let def = config
                .get_path(&format!("cabs.{name}"))
                .ok_or_else(|| RunError::CabNotFound { name: name.clone() })?;
            Ok(Target::Cab(Box::new(Cab::parse(name, def)?)))
        }
        StepTarget::InlineCab(cab) => Ok(Target::Cab(cab.clone())),
        StepTarget::Recipe(name) => {
            let def = config
                .get_path(&format!("lib.recipes.{name}"))
                .ok_or_else(|| RunError::RecipeNotFound { name: name.clone() })?;
            Ok(Target::Recipe(Box::new(Recipe::parse(name, def)?)))
        }
        StepTarget::InlineRecipe(recipe) => Ok(Target::Recipe(recipe.clone())),
    }
}

struct RecipeResult {
    outputs: Bindings,
    steps: Vec<StepRecord>,
    warnings: Vec<String>,
}

/// Execute one recipe: prevalidate, then run its body once, or once
/// per for-loop element (possibly scattered).
fn run_recipe(
    shared: RunShared,
    recipe: Recipe,
    fqname: String,
    params: Bindings,
    selection: StepSelection,
    root_values: Option<Value>,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<RecipeResult, RunError>> + Send>> {
    Box::pin(run_recipe_inner(
        shared,
        recipe,
        fqname,
        params,
        selection,
        root_values,
    ))
}

async fn run_recipe_inner(
    shared: RunShared,
    recipe: Recipe,
    fqname: String,
    params: Bindings,
    selection: StepSelection,
    root_values: Option<Value>,
) -> Result<RecipeResult, RunError> {
    let mut targets: IndexMap<String, Target> = IndexMap::new();
    let mut step_io: IndexMap<String, StepIo> = IndexMap::new();
    for step in &recipe.steps {
        let target = resolve_target(&shared.config, step)?;
        let io = match &target {
            Target::Cab(cab) => StepIo {
                inputs: cab.inputs.clone(),
                outputs: cab.outputs.clone(),
                cab_name: Some(cab.name.clone()),
            },
            Target::Recipe(sub) => StepIo {
                inputs: sub.inputs.clone(),
                outputs: sub.outputs.clone(),
                cab_name: None,
            },
        };
        step_io.insert(step.label.clone(), io);
        targets.insert(step.label.clone(), target);
    }

    let mut base_ns = NsStack::new();
    base_ns.push("config", (*shared.config).clone());
    let prevalidated = prevalidate(&recipe, &params, &step_io, &base_ns)?;

    // Resolve the loop item list
    let iterations: Vec<Option<Value>> = match &recipe.for_loop {
        None => vec![None],
        Some(for_loop) => {
            let items = match &for_loop.over {
                Value::List(items) => items.clone(),
                Value::Str(input_name) => match prevalidated.values.get(input_name) {
                    Some(Value::List(items)) => items.clone(),
                    Some(other) => vec![other.clone()],
                    None => {
                        return Err(RecipeError::Definition {
                            name: recipe.name.clone(),
                            message: format!("for_loop.over input '{input_name}' has no value"),
                        }
                        .into())
                    }
                },
                other => vec![other.clone()],
            };
            items.into_iter().map(Some).collect()
        }
    };
    let total = iterations.len();

    let scatter = recipe.for_loop.as_ref().map_or(0, |l| l.scatter);
    let concurrent = match scatter {
        -1 => total.max(1),
        0 | 1 => 1,
        n if n > 1 => (n as usize).min(total.max(1)),
        _ => 1,
    };

    if concurrent <= 1 || total <= 1 {
        let mut merged = RecipeResult {
            outputs: Bindings::new(),
            steps: Vec::new(),
            warnings: Vec::new(),
        };
        for (index, item) in iterations.into_iter().enumerate() {
            let result = run_iteration(
                shared.clone(),
                recipe.clone(),
                fqname.clone(),
                prevalidated.clone(),
                targets.clone(),
                step_io.clone(),
                selection.clone(),
                item.map(|value| (index, value)),
                total,
                root_values.clone(),
            )
            .await?;
            merge_iteration(&mut merged, result);
        }
        return Ok(merged);
    }

    // Scattered: bounded concurrent iterations, each with a private
    // view of the recipe state.
    tracing::info!(recipe = %fqname, workers = concurrent, total, "scattering loop");
    let semaphore = Arc::new(Semaphore::new(concurrent));
    let mut joins = Vec::with_capacity(total);
    for (index, item) in iterations.into_iter().enumerate() {
        let semaphore = Arc::clone(&semaphore);
        let shared = shared.clone();
        let recipe = recipe.clone();
        let fqname = fqname.clone();
        let prevalidated = prevalidated.clone();
        let targets = targets.clone();
        let step_io = step_io.clone();
        let selection = selection.clone();
        let root_values = root_values.clone();
        joins.push(tokio::spawn(async move {
            let _permit = semaphore.acquire_owned().await.map_err(|e| {
                RunError::Internal {
                    message: e.to_string(),
                }
            })?;
            run_iteration(
                shared,
                recipe,
                fqname,
                prevalidated,
                targets,
                step_io,
                selection,
                item.map(|value| (index, value)),
                total,
                root_values,
            )
            .await
        }));
    }

    let mut merged = RecipeResult {
        outputs: Bindings::new(),
        steps: Vec::new(),
        warnings: Vec::new(),
    };
    let mut first_error = None;
    for join in joins {
        match join.await {
            Ok(Ok(result)) => merge_iteration(&mut merged, result),
            Ok(Err(e)) => {
                // Sibling iterations already running are not cancelled;
                // the overall result is failure if any iteration fails.
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
            Err(join_error) => {
                if first_error.is_none() {
                    first_error = Some(RunError::Internal {
                        message: join_error.to_string(),
                    });
                }
            }
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => Ok(merged),
    }
}

fn merge_iteration(into: &mut RecipeResult, from: RecipeResult) {
    for (k, v) in from.outputs {
        into.outputs.insert(k, v);
    }
    into.steps.extend(from.steps);
    into.warnings.extend(from.warnings);
}

/// One pass over the recipe body with an optional loop binding.
#[allow(clippy::too_many_arguments)]
async fn run_iteration(
    shared: RunShared,
    recipe: Recipe,
    fqname: String,
    prevalidated: Prevalidated,
    targets: IndexMap<String, Target>,
    step_io: IndexMap<String, StepIo>,
    selection: StepSelection,
    loop_item: Option<(usize, Value)>,
    loop_total: usize,
    root_values: Option<Value>,
) -> Result<RecipeResult, RunError> {
    let mut values = prevalidated.values.clone();
    let mut vars = prevalidated.vars.clone();
    let aliases = &prevalidated.aliases;

    let mut base_ns = NsStack::new();
    base_ns.push("config", (*shared.config).clone());

    // Bind the loop variable and re-evaluate assignments for this
    // iteration.
    if let (Some(for_loop), Some((index, item))) = (&recipe.for_loop, &loop_item) {
        vars.insert(for_loop.var.clone(), item.clone());
        apply_assignments(
            &recipe,
            &recipe.assign,
            &mut values,
            &mut vars,
            &prevalidated.immune,
            &base_ns,
        )?;
        apply_assign_based_on(
            &recipe,
            &mut values,
            &mut vars,
            &prevalidated.immune,
            &base_ns,
        )?;
        if let Some(template) = &for_loop.display_status {
            let mut ns = base_ns.clone();
            ns.push("recipe", recipe_scope(&values, &vars));
            if let Ok(Evaluated::Value(status)) = evaluate_string(template, &ns) {
                shared.log.line(
                    &fqname,
                    convoy_recipe::Severity::Info,
                    &format!("[{}/{}] {}", index + 1, loop_total, status),
                );
            }
        }
    }

    let ordered_labels: Vec<String> = recipe.steps.iter().map(|s| s.label.clone()).collect();
    let selected = selection.selected_labels(&ordered_labels);

    let mut previous = Value::empty_map();
    let mut steps_scope = Value::empty_map();
    let mut records = Vec::new();
    let mut warnings = Vec::new();

    for step in &recipe.steps {
        let task_suffix = match &loop_item {
            Some((index, _)) => format!("{}.{}", step.label, index + 1),
            None => step.label.clone(),
        };
        let step_fqname = format!("{fqname}.{}", step.label);
        let taskname = format!("{fqname}.{task_suffix}");

        let mut record = StepRecord {
            label: step.label.clone(),
            fqname: step_fqname.clone(),
            status: StepStatus::Pending,
            params: Bindings::new(),
            outputs: Bindings::new(),
            warnings: Vec::new(),
        };

        // Explicit selection forces steps on; everything unselected is
        // skipped outright.
        let has_sub_selection = !selection.for_substep(&step.label).steps.is_empty();
        let forced = !selection.steps.is_empty()
            && (selected.iter().any(|l| l == &step.label) || has_sub_selection);
        if !selection.steps.is_empty() && !forced {
            record.status = StepStatus::Skipped;
            update_previous_with_defaults(step, &step_io, &mut previous);
            records.push(record);
            continue;
        }

        if !forced {
            if let Some(reason) = tag_skip_reason(step, &selection) {
                tracing::debug!(step = %step_fqname, reason, "skipped by tags");
                record.status = StepStatus::Skipped;
                update_previous_with_defaults(step, &step_io, &mut previous);
                records.push(record);
                continue;
            }
        }
        record.status = StepStatus::PreValidated;

        // Recipe-level assignments re-evaluate before every step; step
        // assignments apply to a step-scoped copy only.
        let mut ns = base_ns.clone();
        ns.push(
            "root",
            root_values
                .clone()
                .unwrap_or_else(|| recipe_scope(&values, &vars)),
        );
        ns.push("steps", steps_scope.clone());
        ns.push("previous", previous.clone());
        ns.push("recipe", recipe_scope(&values, &vars));
        apply_assignments(
            &recipe,
            &recipe.assign,
            &mut values,
            &mut vars,
            &prevalidated.immune,
            &ns,
        )?;
        let mut step_values = values.clone();
        let mut step_vars = vars.clone();
        if !step.assign.is_empty() {
            apply_assignments(
                &recipe,
                &step.assign,
                &mut step_values,
                &mut step_vars,
                &prevalidated.immune,
                &ns,
            )?;
        }
        ns.set("recipe", recipe_scope(&step_values, &step_vars));
        ns.push("info", step_info(&step.label, &step_fqname, &taskname));

        // The skip flag (explicitly selected steps ignore it)
        if !forced {
            if let Some(skip) = &step.skip {
                if skip_flag_truthy(skip, &ns)? {
                    tracing::debug!(step = %step_fqname, "skipped by skip flag");
                    record.status = StepStatus::Skipped;
                    update_previous_with_defaults(step, &step_io, &mut previous);
                    records.push(record);
                    continue;
                }
            }
        }

        let Some(target) = targets.get(&step.label).cloned() else {
            continue;
        };

        // Assemble parameters: step params, alias push-down, schema
        // defaults, implicit templates, then substitution evaluation.
        let io = step_io.get(&step.label).cloned().unwrap_or_default();
        let mut params = step.params.clone();
        for alias in aliases.values() {
            if alias.is_output {
                continue;
            }
            let Some(value) = step_values.get(&alias.name) else {
                continue;
            };
            for target in &alias.targets {
                if target.step_label == step.label {
                    params.insert(target.param.clone(), value.clone());
                }
            }
        }
        for (name, schema) in io.inputs.iter().chain(io.outputs.iter()) {
            if !params.contains_key(name) {
                if let Some(default) = &schema.default {
                    params.insert(name.clone(), default.clone());
                }
            }
        }

        ns.push("current", Value::Map(params.clone()));
        for (name, schema) in io.inputs.iter().chain(io.outputs.iter()) {
            let Some(template) = &schema.implicit else {
                continue;
            };
            match evaluate_string(template, &ns) {
                Ok(Evaluated::Value(value)) => {
                    params.insert(name.clone(), value);
                    ns.set("current", Value::Map(params.clone()));
                }
                // An implicit that cannot resolve yet stays unbound
                Ok(Evaluated::Unset { .. }) | Err(SubstError::Unresolved { .. }) => {}
                Err(e) => return Err(e.into()),
            }
        }

        params = evaluate_step_params(&params, &io, &ns)?;
        ns.set("current", Value::Map(params.clone()));
        record.params = params.clone();
        record.status = StepStatus::Bound;

        match target {
            Target::Recipe(sub) => {
                let child_selection = selection.for_substep(&step.label);
                let result = run_recipe(
                    shared.clone(),
                    *sub,
                    step_fqname.clone(),
                    params.clone(),
                    child_selection,
                    Some(
                        root_values
                            .clone()
                            .unwrap_or_else(|| recipe_scope(&values, &vars)),
                    ),
                )
                .await?;
                record.outputs = result.outputs.clone();
                record.warnings = result.warnings.clone();
                warnings.extend(result.warnings);
                records.extend(result.steps);
                record.status = StepStatus::Succeeded;
                finish_step(
                    step,
                    &record,
                    aliases,
                    &mut values,
                    &mut steps_scope,
                    &mut previous,
                )?;
                records.push(record);
            }
            Target::Cab(cab) => {
                let mut cab = *cab;
                // Dynamic schemas revise the cab's io before validation
                if let Some(reference) = cab.dynamic_schema.clone() {
                    let Some(host) = &shared.script_host else {
                        return Err(RunError::DynamicSchemaUnsupported {
                            cab: cab.name.clone(),
                        });
                    };
                    let (inputs, outputs) =
                        host.dynamic_schema(&reference, &cab, &params).await?;
                    cab.inputs = inputs;
                    cab.outputs = outputs;
                }

                // Validation runs against the (possibly revised) schemas
                let params = validate_cab_params(&step_fqname, &cab, params)?;
                record.params = params.clone();

                let workdir: Option<PathBuf> = None;
                if let Some((param, path)) =
                    outputs::missing_must_exist(&cab.inputs, &params, workdir.as_deref())
                {
                    return Err(RunError::MissingInput {
                        step: step_fqname,
                        param,
                        path,
                    });
                }
                outputs::prepare_outputs(&cab.outputs, &params, workdir.as_deref())?;
                let mut plan = cab.invocation_plan(&taskname, &params, workdir.clone())?;
                // Environment values undergo substitution like params do
                for value in plan.env.values_mut() {
                    if let Ok(Evaluated::Value(evaluated)) = evaluate_string(value, &ns) {
                        *value = evaluated.to_string();
                    }
                }

                // Output-based skipping needs the bound output paths
                if !forced {
                    let skip = match step.skip_if_outputs {
                        Some(SkipIfOutputs::Exist) => {
                            outputs::outputs_exist(&plan.outputs, workdir.as_deref())
                        }
                        Some(SkipIfOutputs::Fresh) => outputs::outputs_fresh(
                            &plan.outputs,
                            &cab.inputs,
                            &params,
                            workdir.as_deref(),
                        ),
                        None => false,
                    };
                    if skip {
                        tracing::info!(step = %step_fqname, "outputs up to date, skipping");
                        record.status = StepStatus::Skipped;
                        record.outputs = plan
                            .outputs
                            .iter()
                            .map(|o| (o.param.clone(), Value::from(o.path.clone())))
                            .collect();
                        finish_step(
                            step,
                            &record,
                            aliases,
                            &mut values,
                            &mut steps_scope,
                            &mut previous,
                        )?;
                        records.push(record);
                        continue;
                    }
                }

                if let Some(text) = &step.info {
                    shared
                        .log
                        .line(&taskname, convoy_recipe::Severity::Info, text);
                }

                let prefs = BackendPrefs::from_layers(&[
                    shared.options.backend.as_ref(),
                    recipe.backend.as_ref(),
                    cab.backend.as_ref(),
                    step.backend.as_ref(),
                ])?;
                let backend = shared.registry.select(&prefs)?;

                record.status = StepStatus::Running;
                tracing::info!(step = %taskname, backend = %backend.name(), "running");
                let outcome = run_cab(
                    &cab,
                    plan,
                    backend,
                    &shared.log,
                    &shared.cancel,
                    shared.options.step_timeout,
                )
                .await
                .map_err(|e| match e {
                    RunError::Timeout { .. } => RunError::Timeout {
                        step: step_fqname.clone(),
                    },
                    other => other,
                })?;

                record.warnings = outcome.warnings.clone();
                warnings.extend(outcome.warnings);

                match outcome.status {
                    CabStatus::Failed { message } => {
                        record.status = StepStatus::Failed;
                        shared.log.line(
                            &taskname,
                            convoy_recipe::Severity::Error,
                            &message,
                        );
                        records.push(record);
                        return Err(RunError::CabFailure {
                            step: step_fqname,
                            message,
                            stderr_tail: outcome.stderr_tail,
                        });
                    }
                    CabStatus::Succeeded => {
                        let mut checked = Bindings::new();
                        for (name, value) in outcome.outputs {
                            match cab.outputs.get(&name) {
                                Some(schema) => {
                                    checked.insert(name.clone(), typecheck(&name, &value, schema)?);
                                }
                                None => {
                                    checked.insert(name, value);
                                }
                            }
                        }
                        record.outputs = checked;
                        record.status = StepStatus::Succeeded;
                        finish_step(
                            step,
                            &record,
                            aliases,
                            &mut values,
                            &mut steps_scope,
                            &mut previous,
                        )?;
                        records.push(record);
                    }
                }
            }
        }
    }

    // Gather recipe-level outputs
    let mut recipe_outputs = Bindings::new();
    for (name, schema) in &recipe.outputs {
        match values.get(name) {
            Some(value) => {
                recipe_outputs.insert(name.clone(), value.clone());
            }
            None if schema.required => {
                return Err(RunError::MissingRequiredOutput {
                    step: fqname.clone(),
                    output: name.clone(),
                });
            }
            None => {}
        }
    }

    Ok(RecipeResult {
        outputs: recipe_outputs,
        steps: records,
        warnings,
    })
}

/// Why tag-based filtering skips a step, if it does.
fn tag_skip_reason(step: &Step, selection: &StepSelection) -> Option<&'static str> {
    if selection
        .skip_tags
        .iter()
        .any(|tag| step.has_tag(tag))
    {
        return Some("tag in skip list");
    }
    let tag_selected = selection.tags.iter().any(|tag| step.has_tag(tag));
    if step.has_tag("never") && !tag_selected {
        return Some("tagged never");
    }
    if !selection.tags.is_empty() && !tag_selected && !step.has_tag("always") {
        return Some("no selected tag");
    }
    None
}

/// Truthiness of the `skip` flag: booleans as-is; strings evaluate
/// through the substitution engine first.
fn skip_flag_truthy(skip: &Value, ns: &NsStack) -> Result<bool, RunError> {
    match skip {
        Value::Str(text) => match evaluate_string(text, ns) {
            Ok(Evaluated::Value(value)) => Ok(value.truthy()),
            Ok(Evaluated::Unset { .. }) => Ok(false),
            Err(SubstError::Unresolved { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        },
        other => Ok(other.truthy()),
    }
}

/// A skipped step still contributes its declared defaults and implicit
/// values to `previous`.
fn update_previous_with_defaults(
    step: &Step,
    step_io: &IndexMap<String, StepIo>,
    previous: &mut Value,
) {
    let Some(io) = step_io.get(&step.label) else {
        return;
    };
    let mut scope = Bindings::new();
    for (name, schema) in io.inputs.iter().chain(io.outputs.iter()) {
        if let Some(value) = step.params.get(name) {
            scope.insert(name.clone(), value.clone());
        } else if let Some(default) = &schema.default {
            scope.insert(name.clone(), default.clone());
        } else if let Some(template) = &schema.implicit {
            scope.insert(name.clone(), Value::from(template.clone()));
        }
    }
    *previous = Value::Map(scope);
}

/// Evaluate substitutions and formulas in bound parameters, honoring
/// `disable_substitutions` policies. Parameters may reference each
/// other through `current.*`; referencing parameters wait until their
/// referents have evaluated, so declaration order does not matter.
fn evaluate_step_params(
    params: &Bindings,
    io: &StepIo,
    ns: &NsStack,
) -> Result<Bindings, RunError> {
    let mut resolved = Bindings::new();
    let mut pending: Vec<(String, Value)> = Vec::new();

    for (name, raw) in params {
        let no_subst = io
            .inputs
            .get(name)
            .or_else(|| io.outputs.get(name))
            .and_then(|schema| schema.policies.as_ref())
            .map(|raw_policies| {
                Policies::parse(raw_policies)
                    .map(|p| p.disable_substitutions.unwrap_or(false))
            })
            .transpose()?
            .unwrap_or(false);
        if no_subst {
            resolved.insert(name.clone(), raw.clone());
        } else {
            pending.push((name.clone(), raw.clone()));
        }
    }

    while !pending.is_empty() {
        let mut progressed = false;
        let mut deferred = Vec::new();
        for (name, raw) in pending {
            let blocked = current_refs(&raw).iter().any(|referent| {
                referent != &name
                    && params.contains_key(referent)
                    && !resolved.contains_key(referent)
            });
            if blocked {
                deferred.push((name, raw));
                continue;
            }
            let mut scoped = ns.clone();
            scoped.set("current", Value::Map(resolved.clone()));
            if let Some(value) = evaluate_value(&raw, &scoped)? {
                resolved.insert(name, value);
            }
            progressed = true;
        }
        if !progressed {
            // Mutually-referencing parameters: fall back to declaration
            // order with whatever has resolved so far.
            for (name, raw) in deferred.drain(..) {
                let mut scoped = ns.clone();
                scoped.set("current", Value::Map(resolved.clone()));
                if let Some(value) = evaluate_value(&raw, &scoped)? {
                    resolved.insert(name, value);
                }
            }
            break;
        }
        pending = deferred;
    }

    // Restore schema/declaration order
    let mut out = Bindings::new();
    for name in params.keys() {
        if let Some(value) = resolved.shift_remove(name) {
            out.insert(name.clone(), value);
        }
    }
    Ok(out)
}

/// Parameter names referenced through `current.<name>` anywhere in a
/// value's strings. A cheap textual scan; only the first path segment
/// matters for ordering.
fn current_refs(value: &Value) -> Vec<String> {
    fn scan(text: &str, refs: &mut Vec<String>) {
        for (at, _) in text.match_indices("current.") {
            let rest = &text[at + "current.".len()..];
            let name: String = rest
                .chars()
                .take_while(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
                .collect();
            if !name.is_empty() {
                refs.push(name);
            }
        }
    }
    fn walk(value: &Value, refs: &mut Vec<String>) {
        match value {
            Value::Str(s) => scan(s, refs),
            Value::List(items) => items.iter().for_each(|v| walk(v, refs)),
            Value::Map(map) => map.values().for_each(|v| walk(v, refs)),
            _ => {}
        }
    }
    let mut refs = Vec::new();
    walk(value, &mut refs);
    refs
}

/// Typecheck bound parameters against the cab's schemas and enforce
/// required inputs.
fn validate_cab_params(
    step_fqname: &str,
    cab: &Cab,
    params: Bindings,
) -> Result<Bindings, RunError> {
    let mut checked = Bindings::new();
    for (name, value) in &params {
        let schema = cab.inputs.get(name).or_else(|| cab.outputs.get(name));
        match schema {
            Some(schema) => {
                checked.insert(name.clone(), typecheck(name, value, schema)?);
            }
            None => {
                // Unknown parameters pass through untouched; the cab's
                // policies decide whether they reach the command line.
                checked.insert(name.clone(), value.clone());
            }
        }
    }
    for (name, schema) in &cab.inputs {
        if schema.required && !checked.contains_key(name) {
            return Err(RecipeError::UnresolvedParameter {
                step: step_fqname.to_string(),
                param: name.clone(),
            }
            .into());
        }
    }
    Ok(checked)
}

/// Post-step bookkeeping: expose params and outputs under
/// `steps.<label>` and `previous`, and back-propagate output aliases
/// into recipe values.
fn finish_step(
    step: &Step,
    record: &StepRecord,
    aliases: &IndexMap<String, convoy_recipe::Alias>,
    values: &mut Bindings,
    steps_scope: &mut Value,
    previous: &mut Value,
) -> Result<(), RunError> {
    let mut scope = record.params.clone();
    for (name, value) in &record.outputs {
        scope.insert(name.clone(), value.clone());
    }
    let scope = Value::Map(scope);
    steps_scope.set_path(&step.label, scope.clone());
    *previous = scope;

    for alias in aliases.values() {
        if !alias.is_output {
            continue;
        }
        for target in &alias.targets {
            if target.step_label != step.label {
                continue;
            }
            if let Some(value) = record.outputs.get(&target.param) {
                values.insert(alias.name.clone(), value.clone());
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
