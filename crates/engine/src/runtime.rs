// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The cab runtime
//!
//! Launches an invocation plan on its backend, pumps both output
//! streams through the wrangler pipeline into the run log, and collects
//! outputs and final status once the child exits.

use crate::{outputs, process_line, RunError, RunLog, WrangleState};
use convoy_backend::Backend;
use convoy_config::Value;
use convoy_recipe::{Bindings, Cab, CabFlavour, InvocationPlan, Severity, RESULT_MARKER};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

/// Terminal status of one cab invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CabStatus {
    Succeeded,
    Failed { message: String },
}

/// Everything a finished cab reports back to the scheduler.
#[derive(Debug)]
pub struct CabOutcome {
    pub status: CabStatus,
    /// Captured outputs, already merged by precedence.
    pub outputs: Bindings,
    pub warnings: Vec<String>,
    pub stderr_tail: Vec<String>,
}

/// How many trailing standard-error lines are kept for error reports.
const STDERR_TAIL: usize = 10;

struct PumpShared {
    wrangle: WrangleState,
    stderr_tail: Vec<String>,
    /// Result payloads printed by scripting drivers under
    /// [`RESULT_MARKER`].
    marker_payloads: Vec<serde_json::Value>,
}

/// Run one bound cab invocation to completion.
pub async fn run_cab(
    cab: &Cab,
    plan: InvocationPlan,
    backend: Arc<dyn Backend>,
    log: &RunLog,
    cancel: &CancellationToken,
    timeout: Option<Duration>,
) -> Result<CabOutcome, RunError> {
    let fqname = plan.fqname.clone();
    let workdir = plan.workdir.clone();
    let plan = backend.prepare(plan)?;
    let mut handle = backend.spawn(&plan).await?;

    let shared = Arc::new(Mutex::new(PumpShared {
        wrangle: WrangleState::default(),
        stderr_tail: Vec::new(),
        marker_payloads: Vec::new(),
    }));

    let stdout = handle.take_stdout();
    let stderr = handle.take_stderr();
    let pumps = async {
        let (out, err) = tokio::join!(
            pump_stream(stdout, cab, log, &fqname, &shared, false),
            pump_stream(stderr, cab, log, &fqname, &shared, true),
        );
        out?;
        err
    };
    tokio::pin!(pumps);

    let deadline = async {
        match timeout {
            Some(t) => tokio::time::sleep(t).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);

    let mut interrupted = false;
    let mut timed_out = false;
    let status = loop {
        tokio::select! {
            pumped = &mut pumps => {
                pumped?;
                break handle.wait().await?;
            }
            _ = cancel.cancelled(), if !interrupted => {
                tracing::info!(task = %fqname, "cancellation requested, interrupting child");
                interrupted = true;
                handle.interrupt();
            }
            _ = &mut deadline, if !timed_out => {
                tracing::warn!(task = %fqname, "step timeout, killing child");
                timed_out = true;
                handle.kill().await?;
            }
        }
    };

    outputs::apply_cleanup(&cab.management.cleanup, workdir.as_deref());

    if interrupted {
        return Err(RunError::Cancelled);
    }
    if timed_out {
        return Err(RunError::Timeout {
            step: fqname.clone(),
        });
    }

    let (wrangled_outputs, warnings, declared_error, declared_success, stderr_tail, marker_payloads) = {
        let mut guard = shared.lock();
        (
            guard.wrangle.outputs(),
            std::mem::take(&mut guard.wrangle.warnings),
            guard.wrangle.declared_error.take(),
            guard.wrangle.declared_success,
            std::mem::take(&mut guard.stderr_tail),
            std::mem::take(&mut guard.marker_payloads),
        )
    };

    // Collect outputs, lowest precedence first: file params already
    // bound, then flavour results, then wrangler captures.
    let mut collected = Bindings::new();
    for output in &plan.outputs {
        collected.insert(output.param.clone(), Value::Str(output.path.clone()));
    }
    for payload in marker_payloads {
        merge_marker_payload(cab, payload, &mut collected);
    }
    for (name, value) in wrangled_outputs {
        collected.insert(name, value);
    }

    // Status per the error-handling rules: a declared error wins, then
    // declared success, then the exit code, then required outputs.
    let status = if let Some(message) = declared_error {
        CabStatus::Failed { message }
    } else if declared_success {
        CabStatus::Succeeded
    } else if !status.success() {
        CabStatus::Failed {
            message: match status.code() {
                Some(code) => format!("exit code {code}"),
                None => "killed by signal".to_string(),
            },
        }
    } else if let Some(missing) = missing_required_output(&plan, workdir.as_deref()) {
        return Err(RunError::MissingRequiredOutput {
            step: fqname.clone(),
            output: missing,
        });
    } else {
        CabStatus::Succeeded
    };

    Ok(CabOutcome {
        status,
        outputs: collected,
        warnings,
        stderr_tail,
    })
}

async fn pump_stream(
    stream: Option<impl tokio::io::AsyncRead + Unpin>,
    cab: &Cab,
    log: &RunLog,
    fqname: &str,
    shared: &Arc<Mutex<PumpShared>>,
    is_stderr: bool,
) -> Result<(), RunError> {
    let Some(stream) = stream else {
        return Ok(());
    };
    pump_lines(BufReader::new(stream), cab, log, fqname, shared, is_stderr).await
}

async fn pump_lines(
    mut reader: impl AsyncBufRead + Unpin,
    cab: &Cab,
    log: &RunLog,
    fqname: &str,
    shared: &Arc<Mutex<PumpShared>>,
    is_stderr: bool,
) -> Result<(), RunError> {
    let mut line = String::new();
    loop {
        line.clear();
        let read = reader.read_line(&mut line).await?;
        if read == 0 {
            return Ok(());
        }
        let text = line.trim_end_matches(['\n', '\r']);

        // Scripting drivers report results on marked stdout lines;
        // these are internal and never displayed.
        if !is_stderr && scripting_flavour(cab) {
            if let Some(payload) = text.strip_prefix(RESULT_MARKER) {
                if let Ok(json) = serde_json::from_str(payload) {
                    shared.lock().marker_payloads.push(json);
                }
                continue;
            }
        }

        let disposition = {
            let mut guard = shared.lock();
            if is_stderr {
                guard.stderr_tail.push(text.to_string());
                let excess = guard.stderr_tail.len().saturating_sub(STDERR_TAIL);
                if excess > 0 {
                    guard.stderr_tail.drain(..excess);
                }
            }
            process_line(text, &cab.management.wranglers, &mut guard.wrangle)?
        };

        if let Some(display) = disposition.display {
            let severity = if is_stderr && disposition.severity == Severity::Info {
                Severity::Warning
            } else {
                disposition.severity
            };
            log.line(fqname, severity, &display);
        }
    }
}

fn scripting_flavour(cab: &Cab) -> bool {
    matches!(
        cab.flavour,
        CabFlavour::Callable { .. } | CabFlavour::InlineCode { .. }
    )
}

/// Map a driver result payload onto declared outputs: a dict maps by
/// name; a single value goes to the sole declared output.
fn merge_marker_payload(cab: &Cab, payload: serde_json::Value, collected: &mut Bindings) {
    let result = match payload {
        serde_json::Value::Object(mut object) => match object.remove("_result") {
            Some(result) => result,
            None => serde_json::Value::Object(object),
        },
        other => other,
    };
    match result {
        serde_json::Value::Object(object) => {
            let named: Vec<(String, serde_json::Value)> = object.into_iter().collect();
            let all_known = named.iter().all(|(k, _)| cab.outputs.contains_key(k));
            if all_known && !named.is_empty() {
                for (name, json) in named {
                    collected.insert(name, crate::json_to_value(json));
                }
            } else if let Some(name) = cab.outputs.keys().next() {
                let mut map = serde_json::Map::new();
                for (k, v) in named {
                    map.insert(k, v);
                }
                collected.insert(
                    name.clone(),
                    crate::json_to_value(serde_json::Value::Object(map)),
                );
            }
        }
        single => {
            if let Some(name) = cab.outputs.keys().next() {
                collected.insert(name.clone(), crate::json_to_value(single));
            }
        }
    }
}

fn missing_required_output(plan: &InvocationPlan, workdir: Option<&std::path::Path>) -> Option<String> {
    for output in &plan.outputs {
        if !output.required {
            continue;
        }
        let path = std::path::Path::new(&output.path);
        let full = match workdir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        };
        if !full.exists() {
            return Some(output.param.clone());
        }
    }
    None
}

#[cfg(test)]
#[path = "runtime_tests.rs"]
mod tests;
