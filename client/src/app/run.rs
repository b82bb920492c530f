//! Command execution

use std::future::Future;

use colored::Colorize;
use openapi_client::DeploymentStatus;
use tracing::{error, info};

use crate::app::options::{AppOptions, Command};
use crate::app::state::AppState;
use crate::errors::ClientError;
use crate::filesys::file::File;
use crate::models::task::{TaskRecord, TaskStatus};
use crate::tasks::tracker::RefreshOutcome;
use crate::wizard::draft::LATEST;
use crate::wizard::plan::{CanonicalId, DraftPlan};
use crate::wizard::session::WizardSession;
use crate::wizard::variables::VariableResolver;
use crate::workers::poller;

/// Run one command against the backend
pub async fn run(
    command: Command,
    options: AppOptions,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<(), ClientError> {
    let state = AppState::init(&options).await?;
    info!("Running {:?} against {}", command, state.http_client.base_url());

    match command {
        Command::Templates => list_templates(&state).await,
        Command::Variables { app_id, release } => {
            show_variables(&state, &app_id, release.as_deref().unwrap_or(LATEST)).await
        }
        Command::Preview { plan } => preview(&state, &File::new(plan)).await,
        Command::Deploy { plan, watch } => {
            let deployment_id = deploy(&state, &File::new(plan)).await?;
            if watch {
                watch_deployments(&state, &options, vec![deployment_id], shutdown_signal).await;
            }
            Ok(())
        }
        Command::Status { deployment_ids } => {
            let outcomes = state.tracker.refresh_all(&deployment_ids).await;
            print_outcomes(&outcomes);
            Ok(())
        }
        Command::Watch { deployment_ids } => {
            watch_deployments(&state, &options, deployment_ids, shutdown_signal).await;
            Ok(())
        }
        Command::Deployments { deployment_id } => {
            show_deployments(&state, deployment_id.as_deref()).await
        }
        Command::Task { task_id } => show_task(&state, &task_id).await,
    }
}

// =============================== CATALOG ================================== //

async fn list_templates(state: &AppState) -> Result<(), ClientError> {
    let token = state.bearer().await?;
    state
        .caches
        .templates
        .refresh(&state.http_client, &token.raw)
        .await?;

    let templates = state.caches.templates.list();
    if templates.is_empty() {
        println!("{}", "No templates available".yellow());
        return Ok(());
    }

    println!("{}", "Templates:".cyan().bold());
    for template in templates {
        println!(
            "  {}  {} ({})",
            template.template_id.bold(),
            template.name,
            template.release_tag
        );
        if let Some(description) = &template.description {
            println!("      {}", description.dimmed());
        }
    }
    Ok(())
}

async fn show_variables(state: &AppState, app_id: &str, release: &str) -> Result<(), ClientError> {
    let declarations = state.resolver.resolve(app_id, release).await?;

    println!("{} {}@{}", "Variables of".cyan().bold(), app_id, release);
    if declarations.is_empty() {
        println!("  {}", "none".dimmed());
    }
    for decl in declarations {
        let required = if decl.required { "required".red() } else { "optional".normal() };
        let default = decl
            .default
            .as_ref()
            .map(|d| format!(" = {}", d))
            .unwrap_or_default();
        println!(
            "  {}: {:?} [{:?}, {}]{}",
            decl.name.bold(),
            decl.var_type,
            decl.source,
            required,
            default
        );
    }
    Ok(())
}

// =============================== WIZARD ================================== //

/// Load a plan and walk a fresh session through it up to the review step
async fn prepare_session(state: &AppState, plan_file: &File) -> Result<WizardSession, ClientError> {
    let mut plan = DraftPlan::load(plan_file).await?;
    let token = state.bearer().await?;

    let template = state
        .caches
        .templates
        .refresh_one(&state.http_client, plan.template_id()?, &token.raw)
        .await?;

    // Students come from the selected courses unless listed explicitly
    let rosters = &state.caches.rosters;
    let course_ids = plan.course_ids();
    if !course_ids.is_empty() {
        let students = rosters
            .students_for_courses(state.http_client.as_ref(), &course_ids, &token.raw)
            .await?;
        if plan.student_ids.is_empty() {
            plan.student_ids = students
                .iter()
                .map(|user| CanonicalId::from(user.user_id.as_str()))
                .collect();
        }
    }

    let mut session = WizardSession::new();
    plan.apply(&mut session, &template, state.resolver.as_ref(), |id| {
        rosters.display_name(id)
    })
    .await?;
    Ok(session)
}

async fn preview(state: &AppState, plan_file: &File) -> Result<(), ClientError> {
    let session = prepare_session(state, plan_file).await?;
    let template = session
        .draft()
        .template_id
        .as_deref()
        .and_then(|id| state.caches.templates.get(id));
    let summary = session.summary(template.as_ref());
    let payload = session.preview()?;

    println!("{}", "Deployment preview".cyan().bold());
    println!("  Name:      {}", summary.deployment_name);
    println!(
        "  Template:  {} ({})",
        summary.template_name.as_deref().unwrap_or("?"),
        summary.release_tag
    );
    println!("  Students:  {}", summary.total_students);
    println!("  Groups:    {}", summary.total_groups);
    println!("  Variables: {}", summary.variable_count);
    println!();
    println!("{}", serde_json::to_string_pretty(&payload.to_request())?);
    Ok(())
}

async fn deploy(state: &AppState, plan_file: &File) -> Result<String, ClientError> {
    let mut session = prepare_session(state, plan_file).await?;

    println!("{}", "Submitting deployment...".cyan());
    match session
        .submit(state.http_client.as_ref(), state.tokens.as_ref())
        .await
    {
        Ok(deployment) => {
            println!("{}", "Deployment created".green().bold());
            println!("  Id:     {}", deployment.deployment_id);
            println!("  Name:   {}", deployment.name);
            println!("  Status: {:?}", deployment.status);
            Ok(deployment.deployment_id)
        }
        Err(e) => {
            if state.handle_rejection(&e).await? {
                println!("{}", "Please sign in again".red().bold());
            } else if matches!(e, ClientError::Forbidden(_)) {
                println!("{}", "Your account may not create deployments".red().bold());
            }
            Err(e)
        }
    }
}

// =============================== STATUS ================================== //

async fn show_deployments(state: &AppState, deployment_id: Option<&str>) -> Result<(), ClientError> {
    let token = state.bearer().await?;
    let deployments = match deployment_id {
        Some(id) => vec![state.http_client.get_deployment(id, &token.raw).await?],
        None => state.http_client.list_deployments(&token.raw).await?,
    };

    if deployments.is_empty() {
        println!("{}", "No deployments".dimmed());
    }
    for deployment in &deployments {
        let status = match deployment.status {
            DeploymentStatus::Success => "success".green().bold(),
            DeploymentStatus::Failed => "failed".red().bold(),
            DeploymentStatus::Running => "running".cyan(),
            DeploymentStatus::Pending => "pending".yellow(),
            DeploymentStatus::Unknown => "unknown".dimmed(),
        };
        println!(
            "{}  {} [{}@{}] {}",
            deployment.deployment_id.bold(),
            deployment.name,
            deployment.app_id,
            deployment.release_tag.as_deref().unwrap_or(LATEST),
            status
        );
    }
    Ok(())
}

async fn show_task(state: &AppState, task_id: &str) -> Result<(), ClientError> {
    let token = state.bearer().await?;
    let task = state.http_client.get_task(task_id, &token.raw).await?;
    let record = TaskRecord::from_wire(task, "?");
    print_record(&record.deployment_id, &record);
    if !record.logs.is_null() {
        println!("{}", serde_json::to_string_pretty(&record.logs)?);
    }
    Ok(())
}

async fn watch_deployments(
    state: &AppState,
    options: &AppOptions,
    deployment_ids: Vec<String>,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) {
    if deployment_ids.is_empty() {
        error!("No deployment to watch");
        return;
    }

    let poller_options = poller::Options {
        stop_when_settled: true,
        ..options.poller.clone()
    };
    let rounds = poller::run(
        &poller_options,
        state.tracker.as_ref(),
        &deployment_ids,
        tokio::time::sleep,
        |outcomes| print_outcomes(outcomes),
        Box::pin(shutdown_signal),
    )
    .await;
    info!("Stopped watching after {} round(s)", rounds);
}

fn print_outcomes(outcomes: &[(String, RefreshOutcome)]) {
    for (deployment_id, outcome) in outcomes {
        match outcome {
            RefreshOutcome::Updated(record) => print_record(deployment_id, record),
            RefreshOutcome::NoDeployTasks => {
                println!("{}  {}", deployment_id.bold(), "no deploy task yet".dimmed())
            }
            RefreshOutcome::Unauthenticated => {
                println!("{}  {}", deployment_id.bold(), "not signed in".yellow())
            }
            RefreshOutcome::Failed(e) => println!("{}  {}", deployment_id.bold(), e.red()),
        }
    }
}

fn print_record(deployment_id: &str, record: &TaskRecord) {
    let status = match record.status {
        TaskStatus::Success => "success".green().bold(),
        TaskStatus::Failed => "failed".red().bold(),
        TaskStatus::Running => "running".cyan(),
        TaskStatus::Pending => "pending".yellow(),
        TaskStatus::Unknown => "unknown".dimmed(),
    };
    let finished = record
        .finished_at
        .map(|ts| format!(" finished {}", ts.format("%Y-%m-%d %H:%M:%S")))
        .unwrap_or_default();
    println!(
        "{}  task {} {}{}",
        deployment_id.bold(),
        record.task_id,
        status,
        finished
    );
}
