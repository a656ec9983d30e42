//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use super::script::load_script;
use crate::api;
use crate::config::Config;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use vault_wizard_core::{
    MachineDefinition, MachineRegistry, MAX_SNAPSHOT_SIZE, WizardController, WizardError,
    current_feature_progress, plan_minutes, progress_bar, state_from_bytes, state_to_bytes,
    tutorial_progress,
};

// =============================================================================
// FILE HELPERS
// =============================================================================

/// Read a regular file no larger than `max_size`.
///
/// The path is canonicalized first, so `..` and symlinks are resolved
/// before the size check.
pub fn read_bounded(path: &Path, max_size: u64) -> Result<Vec<u8>, WizardError> {
    let canonical = path.canonicalize().map_err(|e| {
        WizardError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;
    if !canonical.is_file() {
        return Err(WizardError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    let metadata = std::fs::metadata(&canonical)
        .map_err(|e| WizardError::IoError(format!("Cannot read file metadata: {}", e)))?;
    if metadata.len() > max_size {
        return Err(WizardError::IoError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }

    std::fs::read(&canonical).map_err(|e| WizardError::IoError(format!("Read file: {}", e)))
}

/// Resolve an output path against its (existing) parent directory.
fn validate_output_path(path: &Path) -> Result<PathBuf, WizardError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let canonical_parent = parent.canonicalize().map_err(|e| {
        WizardError::IoError(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;
    let filename = path
        .file_name()
        .ok_or_else(|| WizardError::IoError("Output path has no filename".to_string()))?;
    Ok(canonical_parent.join(filename))
}

fn builtin_registry() -> Result<Arc<MachineRegistry>, WizardError> {
    MachineRegistry::builtin().map(Arc::new)
}

fn print_json(value: &serde_json::Value) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_default()
    );
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_server(
    mut config: Config,
    host: Option<String>,
    port: Option<u16>,
) -> Result<(), WizardError> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    let registry = builtin_registry()?;

    println!("Vault Wizard Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Host:         {}", config.server.host);
    println!("  Port:         {}", config.server.port);
    println!("  Max sessions: {}", config.api.max_sessions);
    println!();
    println!("Endpoints:");
    println!("  GET  /health                  - Health check");
    println!("  GET  /machines                - Machine table");
    println!("  POST /sessions                - Open a session");
    println!("  POST /sessions/{{id}}/tutorial  - Tutorial event");
    println!("  POST /sessions/{{id}}/feature   - Feature event");
    println!("  GET  /sessions/{{id}}/progress  - Progress");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let addr = format!("{}:{}", config.server.host, config.server.port);
    api::run_server(&addr, registry, &config).await
}

// =============================================================================
// MACHINES & VALIDATE
// =============================================================================

fn machine_json(machine: &MachineDefinition) -> serde_json::Value {
    let states: Vec<serde_json::Value> = machine
        .states()
        .map(|(id, node)| {
            serde_json::json!({
                "name": id.as_str(),
                "events": node.events().map(|e| e.as_str()).collect::<Vec<_>>(),
                "terminal": node.is_terminal(),
            })
        })
        .collect();
    serde_json::json!({
        "key": machine.key(),
        "initial": machine.initial().as_str(),
        "global_events": machine.global_events().map(|e| e.as_str()).collect::<Vec<_>>(),
        "states": states,
    })
}

fn print_machine(machine: &MachineDefinition) {
    println!("{} (initial: {})", machine.key(), machine.initial());
    let globals: Vec<&str> = machine.global_events().map(|e| e.as_str()).collect();
    if !globals.is_empty() {
        println!("  global: {}", globals.join(", "));
    }
    for (id, node) in machine.states() {
        let events: Vec<&str> = node.events().map(|e| e.as_str()).collect();
        let marker = if node.is_terminal() { " [terminal]" } else { "" };
        println!("  {}{}: {}", id, marker, events.join(", "));
    }
}

/// Print the machine table.
pub fn cmd_machines(json_mode: bool) -> Result<(), WizardError> {
    let registry = builtin_registry()?;

    if json_mode {
        let features: Vec<serde_json::Value> =
            registry.features().map(|(_, m)| machine_json(m)).collect();
        print_json(&serde_json::json!({
            "tutorial": machine_json(registry.tutorial()),
            "features": features,
        }));
        return Ok(());
    }

    print_machine(registry.tutorial());
    for (_, machine) in registry.features() {
        println!();
        print_machine(machine);
    }
    Ok(())
}

/// Build the machine table; any inconsistency is returned as an error.
pub fn cmd_validate(json_mode: bool) -> Result<(), WizardError> {
    let registry = builtin_registry()?;
    let machines = 1 + registry.features().count();
    let states: usize = std::iter::once(registry.tutorial())
        .chain(registry.features().map(|(_, m)| m))
        .map(|m| m.states().count())
        .sum();

    if json_mode {
        print_json(&serde_json::json!({
            "valid": true,
            "machines": machines,
            "states": states,
        }));
    } else {
        println!("Machine table OK: {} machines, {} states", machines, states);
    }
    Ok(())
}

// =============================================================================
// REPLAY COMMAND
// =============================================================================

fn load_snapshot(
    registry: Arc<MachineRegistry>,
    path: &Path,
) -> Result<WizardController, WizardError> {
    let bytes = read_bounded(path, MAX_SNAPSHOT_SIZE as u64)?;
    let state = state_from_bytes(&bytes)?;
    WizardController::restore(registry, state)
}

/// Replay a script against a fresh or resumed session.
pub fn cmd_replay(
    json_mode: bool,
    verbose: bool,
    script: &Path,
    resume: Option<&Path>,
    save: Option<&Path>,
) -> Result<(), WizardError> {
    let registry = builtin_registry()?;
    let steps = load_script(script)?;
    let mut wizard = match resume {
        Some(path) => load_snapshot(Arc::clone(&registry), path)?,
        None => WizardController::new(registry),
    };

    tracing::info!(steps = steps.len(), "replaying script");

    let mut log = Vec::with_capacity(steps.len());
    for (index, step) in steps.iter().enumerate() {
        let result = step.apply(&mut wizard);
        let intents = wizard.take_intents();

        if json_mode {
            log.push(serde_json::json!({
                "step": index + 1,
                "input": step,
                "result": result,
                "tutorial_state": wizard.tutorial_state().as_str(),
                "current_state": wizard.current_state().map(|s| s.as_str()),
                "intents": intents,
            }));
            continue;
        }

        let outcome = match &result {
            Some(r) if r.handled => format!("-> {}", r.value),
            Some(_) => "(no-op)".to_string(),
            None => "ok".to_string(),
        };
        println!("[{:>3}] {:?} {}", index + 1, step, outcome);
        if verbose {
            for intent in &intents {
                println!("      intent: {:?}", intent);
            }
        }
    }

    if let Some(path) = save {
        let output = validate_output_path(path)?;
        let bytes = state_to_bytes(wizard.state())?;
        std::fs::write(&output, bytes)
            .map_err(|e| WizardError::IoError(format!("Write snapshot: {}", e)))?;
        tracing::info!(path = %output.display(), "snapshot saved");
    }

    if json_mode {
        print_json(&serde_json::json!({
            "steps": log,
            "final": wizard.state(),
        }));
    } else {
        println!();
        print_progress(&wizard);
    }
    Ok(())
}

// =============================================================================
// PROGRESS COMMAND
// =============================================================================

fn print_progress(wizard: &WizardController) {
    let state = wizard.state();
    println!("Tutorial: {}", state.tutorial_state);
    if let Some(progress) = tutorial_progress(state) {
        println!("  Initialization: {}", progress.text);
    }
    match current_feature_progress(state) {
        Some(progress) => println!(
            "Feature:  {} ({}, {}%)",
            progress.feature, progress.text, progress.percentage
        ),
        None => println!("Feature:  none"),
    }
    for segment in progress_bar(state) {
        println!(
            "  {:<15} {:>3}% {:?}",
            segment.label, segment.percentage, segment.status
        );
    }
    println!("Estimated time: {} min", plan_minutes(state));
}

/// Show progress stored in a snapshot.
pub fn cmd_progress(json_mode: bool, snapshot: &Path) -> Result<(), WizardError> {
    let wizard = load_snapshot(builtin_registry()?, snapshot)?;

    if json_mode {
        let state = wizard.state();
        print_json(&serde_json::json!({
            "tutorial_state": state.tutorial_state.as_str(),
            "feature": current_feature_progress(state),
            "bar": progress_bar(state),
            "tutorial": tutorial_progress(state),
            "plan_minutes": plan_minutes(state),
        }));
        return Ok(());
    }

    print_progress(&wizard);
    Ok(())
}
