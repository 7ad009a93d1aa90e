//! Command dispatch

use std::io::Read as _;
use std::path::Path;

use clap::CommandFactory;
use tracing::{debug, instrument};

use crate::cli::args::{Cli, Commands, ConfigCommands, PolicyCommands};
use crate::cli::output;
use crate::cli::{CliError, CliResult};
use crate::config::{global_config_path, Settings};
use crate::domain::forest::render_forest;
use crate::domain::{
    HierarchyNode, ManualId, NewSection, OrderedForest, PolicyId, SectionId, SectionPatch,
};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::InfraError;

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    let Some(command) = &cli.command else {
        return Err(CliError::Usage("no command given, see `sectree --help`".into()));
    };

    match command {
        Commands::Config { command } => return cmd_config(command),
        Commands::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(*shell, &mut cmd, "sectree", &mut std::io::stdout());
            return Ok(());
        }
        _ => {}
    }

    let container = ServiceContainer::new(load_settings(cli)?)?;
    match command {
        Commands::List { manual, json } => cmd_list(&container, *manual, *json),
        Commands::Hierarchy { manual, payload } => cmd_hierarchy(&container, *manual, *payload),
        Commands::Tree { manual } => cmd_tree(&container, *manual),
        Commands::Create {
            manual,
            title,
            parent,
            description,
        } => cmd_create(&container, *manual, title, *parent, description.clone()),
        Commands::Update {
            section,
            title,
            description,
            clear_description,
            collapsed,
        } => {
            let patch = SectionPatch {
                title: title.clone(),
                description: if *clear_description {
                    Some(None)
                } else {
                    description.clone().map(Some)
                },
                is_collapsed: *collapsed,
            };
            cmd_update(&container, *section, patch)
        }
        Commands::Move {
            section,
            parent,
            index,
        } => cmd_move(&container, *section, *parent, *index),
        Commands::Reorder { manual, payload } => cmd_reorder(&container, *manual, payload),
        Commands::Renumber { manual } => cmd_renumber(&container, *manual),
        Commands::Delete { section } => cmd_delete(&container, *section),
        Commands::Policy { command } => cmd_policy(&container, command),
        Commands::Verify { manual } => cmd_verify(&container, *manual),
        Commands::Config { .. } | Commands::Completion { .. } => Ok(()),
    }
}

/// Settings from config files and env, with global CLI flags on top.
fn load_settings(cli: &Cli) -> CliResult<Settings> {
    let mut settings = Settings::load()?;
    if let Some(store) = &cli.store {
        settings.store_file = store.clone();
    }
    if let Some(actor) = &cli.actor {
        settings.actor = actor.clone();
    }
    debug!("store file: {}", settings.store_file.display());
    Ok(settings)
}

fn to_json(value: &impl serde::Serialize) -> CliResult<String> {
    Ok(serde_json::to_string_pretty(value).map_err(InfraError::from)?)
}

fn cmd_list(container: &ServiceContainer, manual: ManualId, json: bool) -> CliResult<()> {
    let listings = container.sections.list_sections(manual)?;
    if json {
        output::info(&to_json(&listings)?);
        return Ok(());
    }
    output::header(&format!("Manual {manual}"));
    if listings.is_empty() {
        output::detail("(no sections)");
    }
    for listing in &listings {
        let s = &listing.section;
        output::detail(&format!(
            "{:<10} {:<5} L{} {}",
            s.section_number,
            format!("[{}]", s.id),
            s.level,
            s.title
        ));
        for policy in &listing.policies {
            output::detail(&format!("{:<10} policy {}: {}", "", policy.id, policy.title));
        }
    }
    Ok(())
}

fn cmd_hierarchy(container: &ServiceContainer, manual: ManualId, payload: bool) -> CliResult<()> {
    let forest = container.sections.hierarchy(manual)?;
    let json = if payload {
        let payload: Vec<HierarchyNode> = forest.iter().map(|t| t.to_payload()).collect();
        to_json(&payload)?
    } else {
        to_json(&forest)?
    };
    output::info(&json);
    Ok(())
}

fn cmd_tree(container: &ServiceContainer, manual: ManualId) -> CliResult<()> {
    let forest = container.sections.hierarchy(manual)?;
    output::info(&render_forest(&format!("Manual {manual}"), &forest));
    Ok(())
}

#[instrument(level = "debug", skip(container))]
fn cmd_create(
    container: &ServiceContainer,
    manual: ManualId,
    title: &str,
    parent: Option<SectionId>,
    description: Option<String>,
) -> CliResult<()> {
    let new = NewSection {
        manual_id: manual,
        parent_section_id: parent,
        title: title.to_string(),
        description,
    };
    let section = container.sections.create_section(&container.actor(), new)?;
    output::success(&format!(
        "Created section {} {} [{}]",
        section.section_number, section.title, section.id
    ));
    Ok(())
}

fn cmd_update(container: &ServiceContainer, section: SectionId, patch: SectionPatch) -> CliResult<()> {
    let updated = container
        .sections
        .update_section(&container.actor(), section, patch)?;
    output::success(&format!(
        "Updated section {} {} [{}]",
        updated.section_number, updated.title, updated.id
    ));
    Ok(())
}

#[instrument(level = "debug", skip(container))]
fn cmd_move(
    container: &ServiceContainer,
    section: SectionId,
    parent: Option<SectionId>,
    index: u32,
) -> CliResult<()> {
    let plan = container
        .reorder
        .move_section(&container.actor(), section, parent, index)?;
    if plan.writes.is_empty() {
        output::info(&format!("Section {section} already at {}", plan.old_number));
        return Ok(());
    }
    output::action(
        "Moved",
        &format!("{} -> {}", plan.old_number, plan.new_number),
    );
    output::detail(&format!("{} section(s) renumbered", plan.writes.len()));
    Ok(())
}

fn read_payload(path: &Path) -> CliResult<OrderedForest> {
    let text = if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| InfraError::io("read payload from stdin", e))?;
        buf
    } else {
        std::fs::read_to_string(path)
            .map_err(|e| InfraError::io(format!("read payload {}", path.display()), e))?
    };
    Ok(serde_json::from_str(&text).map_err(InfraError::from)?)
}

#[instrument(level = "debug", skip(container))]
fn cmd_reorder(container: &ServiceContainer, manual: ManualId, payload: &Path) -> CliResult<()> {
    let forest = read_payload(payload)?;
    if let Some(target) = container.reorder.target_manual(&forest)? {
        if target != manual {
            return Err(CliError::InvalidArgs(format!(
                "payload sections belong to manual {target}, not {manual}"
            )));
        }
    }
    let changed = container
        .reorder
        .apply_hierarchy(&container.actor(), &forest)?;
    output::success(&format!("Applied hierarchy to manual {manual}"));
    output::detail(&format!("{changed} section(s) renumbered"));
    Ok(())
}

fn cmd_renumber(container: &ServiceContainer, manual: ManualId) -> CliResult<()> {
    let changed = container
        .sections
        .renumber_all(&container.actor(), manual)?;
    if changed == 0 {
        output::success(&format!("Manual {manual} already consistent"));
    } else {
        output::success(&format!("Renumbered {changed} section(s) in manual {manual}"));
    }
    Ok(())
}

fn cmd_delete(container: &ServiceContainer, section: SectionId) -> CliResult<()> {
    let report = container
        .cascade
        .delete_section(&container.actor(), section)?;
    output::action(
        "Deleted",
        &format!(
            "{} section(s), {} policy(ies)",
            report.sections.len(),
            report.policies.len()
        ),
    );
    if report.dependent_rows() > 0 {
        output::detail(&format!(
            "{} version(s), {} acknowledgement(s), {} annotation(s), {} workflow(s), {} signature(s)",
            report.policy_versions,
            report.acknowledgements,
            report.annotations,
            report.approval_workflows,
            report.signatures
        ));
    }
    Ok(())
}

fn cmd_policy(container: &ServiceContainer, command: &PolicyCommands) -> CliResult<()> {
    let actor = container.actor();
    match command {
        PolicyCommands::Add { section, title } => {
            let policy = container.policies.add_policy(&actor, *section, title)?;
            output::success(&format!(
                "Added policy {} '{}' to section {}",
                policy.id, policy.title, section
            ));
        }
        PolicyCommands::Ack { policy } => {
            let ack = container.policies.acknowledge(&actor, *policy)?;
            output::success(&format!(
                "{} acknowledged policy {} (version {})",
                ack.user_id, policy, ack.policy_version_id
            ));
        }
        PolicyCommands::Delete { policy } => cmd_delete_policy(container, *policy)?,
    }
    Ok(())
}

fn cmd_delete_policy(container: &ServiceContainer, policy: PolicyId) -> CliResult<()> {
    let report = container
        .cascade
        .delete_policy(&container.actor(), policy)?;
    output::action(
        "Deleted",
        &format!("policy {policy} and {} dependent row(s)", report.dependent_rows()),
    );
    Ok(())
}

fn cmd_verify(container: &ServiceContainer, manual: ManualId) -> CliResult<()> {
    let violations = container.sections.verify(manual)?;
    if violations.is_empty() {
        output::success(&format!("Manual {manual} is consistent"));
        return Ok(());
    }
    output::header(&format!("Manual {manual}"));
    for violation in &violations {
        output::failure(violation);
    }
    output::warning("run `sectree renumber` to repair numbering and sibling order");
    Err(CliError::Inconsistent(violations.len()))
}

fn cmd_config(command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            let settings = Settings::load()?;
            output::info(&settings.to_toml()?);
        }
        ConfigCommands::Path => match global_config_path() {
            Some(path) => {
                let state = if path.exists() { "exists" } else { "not found" };
                output::action("Global", &format!("{} ({state})", path.display()));
            }
            None => output::warning("no config directory available on this platform"),
        },
        ConfigCommands::Template => output::info(&Settings::template()),
    }
    Ok(())
}
