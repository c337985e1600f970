use std::path::PathBuf;

use anyhow::Context;
use chrono::{Duration, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod anomaly;
mod assignment;
mod config;
mod db;
mod error;
mod escalation;
mod invitations;
mod models;
mod pipeline;
mod providers;
mod report;
mod scoring;

use error::CareError;
use invitations::InvitationAction;
use models::{Availability, CareRole, Urgency, VitalsReading};
use report::ExportFormat;

#[derive(Parser)]
#[command(name = "care-engine")]
#[command(about = "Care-team matching and vitals alerting engine for VitalWatch", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Record one vitals reading and run the alerting pipeline
    Ingest {
        #[arg(long)]
        patient: Uuid,
        #[arg(long)]
        heart_rate: Option<f64>,
        #[arg(long)]
        systolic: Option<f64>,
        #[arg(long)]
        diastolic: Option<f64>,
        #[arg(long)]
        oxygen: Option<f64>,
        #[arg(long)]
        temperature: Option<f64>,
        #[arg(long)]
        glucose: Option<f64>,
        #[arg(long)]
        respiration: Option<f64>,
        #[arg(long, default_value = "manual-entry")]
        device: String,
    },
    /// Import vitals readings from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Score providers and assign the best match to a patient
    Assign {
        #[arg(long)]
        actor: Uuid,
        #[arg(long)]
        patient: Uuid,
        #[arg(long, value_parser = parse_role)]
        role: CareRole,
        #[arg(long)]
        preferred_specialization: Option<String>,
        #[arg(long, value_parser = parse_urgency, default_value = "routine")]
        urgency: Urgency,
        #[arg(long)]
        auto_escalate: bool,
    },
    /// Escalate a patient to doctor supervision
    Escalate {
        #[arg(long)]
        actor: Uuid,
        #[arg(long)]
        patient: Uuid,
        #[arg(long)]
        reason: Option<String>,
    },
    /// Send a care-team invitation
    Invite {
        #[arg(long)]
        actor: Uuid,
        #[arg(long)]
        recipient_email: String,
        #[arg(long, value_parser = parse_role)]
        invite_type: CareRole,
        #[arg(long)]
        message: Option<String>,
    },
    /// Accept or decline an invitation
    Respond {
        #[arg(long)]
        actor: Uuid,
        #[arg(long)]
        invitation: Uuid,
        #[arg(long, value_parser = parse_action)]
        action: InvitationAction,
    },
    /// Update the calling provider's availability
    Availability {
        #[arg(long)]
        actor: Uuid,
        #[arg(long, value_parser = parse_availability)]
        availability: Availability,
    },
    /// Export a patient's vitals history
    Export {
        #[arg(long)]
        actor: Uuid,
        #[arg(long)]
        patient: Uuid,
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
        #[arg(long, value_parser = parse_format, default_value = "json")]
        format: ExportFormat,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Print a patient's care-team and escalation state
    Show {
        #[arg(long)]
        patient: Uuid,
    },
    /// Run a scheduled maintenance job
    Sweep {
        #[command(subcommand)]
        task: SweepTask,
    },
}

#[derive(Subcommand)]
enum SweepTask {
    /// Remove expired invitations that are still pending
    Invitations,
    /// Remove read notifications past the retention window
    Notifications,
    /// Generate per-patient daily reports (defaults to yesterday)
    Reports {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

fn parse_role(value: &str) -> Result<CareRole, String> {
    CareRole::parse(value).ok_or_else(|| format!("'{value}' is not 'doctor' or 'caretaker'"))
}

fn parse_urgency(value: &str) -> Result<Urgency, String> {
    Urgency::parse(value).ok_or_else(|| format!("'{value}' is not 'routine' or 'urgent'"))
}

fn parse_availability(value: &str) -> Result<Availability, String> {
    Availability::parse(value)
        .ok_or_else(|| format!("'{value}' is not 'available', 'busy', or 'offline'"))
}

fn parse_action(value: &str) -> Result<InvitationAction, String> {
    InvitationAction::parse(value).ok_or_else(|| format!("'{value}' is not 'accept' or 'decline'"))
}

fn parse_format(value: &str) -> Result<ExportFormat, String> {
    ExportFormat::parse(value).ok_or_else(|| format!("'{value}' is not 'json' or 'csv'"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    if let Err(err) = run(cli.command, &pool).await {
        // Domain failures surface their stable code alongside the message.
        if let Some(care) = err.downcast_ref::<CareError>() {
            eprintln!("error [{}]: {care}", care.code());
            std::process::exit(1);
        }
        return Err(err);
    }

    Ok(())
}

async fn run(command: Commands, pool: &PgPool) -> anyhow::Result<()> {
    match command {
        Commands::InitDb => {
            db::init_db(pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Ingest {
            patient,
            heart_rate,
            systolic,
            diastolic,
            oxygen,
            temperature,
            glucose,
            respiration,
            device,
        } => {
            let reading = VitalsReading {
                heart_rate,
                blood_pressure_systolic: systolic,
                blood_pressure_diastolic: diastolic,
                oxygen_level: oxygen,
                temperature,
                glucose,
                respiration,
                recorded_at: Utc::now(),
                device_id: device,
            };
            let summary = pipeline::ingest_reading(
                pool,
                patient,
                reading,
                &config::AnomalyThresholds::default(),
            )
            .await?;

            if summary.alerts.is_empty() {
                println!("Reading recorded; no alerts.");
            } else {
                println!("Reading recorded; {} alert(s):", summary.alerts.len());
                for alert in &summary.alerts {
                    println!(
                        "- [{}] {}: {}",
                        alert.severity.as_str(),
                        alert.title,
                        alert.message
                    );
                }
            }
            println!("Patient status: {}", summary.status.as_str());
            if let Some(escalation) = summary.escalation {
                println!("{}", escalation.message);
            }
        }
        Commands::Import { csv } => {
            let (readings, alerts) =
                pipeline::import_csv(pool, &csv, &config::AnomalyThresholds::default()).await?;
            println!(
                "Imported {readings} readings ({alerts} alerts) from {}.",
                csv.display()
            );
        }
        Commands::Assign {
            actor,
            patient,
            role,
            preferred_specialization,
            urgency,
            auto_escalate,
        } => {
            let outcome = assignment::assign_care_team_member(
                pool,
                actor,
                patient,
                role,
                preferred_specialization,
                urgency,
                auto_escalate,
            )
            .await?;
            println!(
                "Assigned {} ({}) as {} with score {:.0}.",
                outcome.assigned_name, outcome.assigned_id, outcome.role, outcome.score
            );
            if !outcome.matched_conditions.is_empty() {
                println!(
                    "Matched conditions: {}",
                    outcome.matched_conditions.join(", ")
                );
            }
        }
        Commands::Escalate {
            actor,
            patient,
            reason,
        } => {
            let outcome = escalation::escalate_to_doctor(pool, actor, patient, reason).await?;
            println!("{}", outcome.message);
            println!("Doctor: {} ({})", outcome.doctor_name, outcome.doctor_id);
        }
        Commands::Invite {
            actor,
            recipient_email,
            invite_type,
            message,
        } => {
            let invitation_id =
                invitations::send_invitation(pool, actor, &recipient_email, invite_type, message)
                    .await?;
            println!("Invitation {invitation_id} sent to {recipient_email}.");
        }
        Commands::Respond {
            actor,
            invitation,
            action,
        } => {
            invitations::respond_to_invitation(pool, actor, invitation, action).await?;
            println!("Invitation updated.");
        }
        Commands::Availability {
            actor,
            availability,
        } => {
            let updated = providers::update_availability(pool, actor, availability).await?;
            println!("Availability set to {}.", updated.as_str());
        }
        Commands::Export {
            actor,
            patient,
            start,
            end,
            format,
            out,
        } => {
            let export = report::export_vitals(pool, actor, patient, start, end, format).await?;
            match out {
                Some(path) => {
                    std::fs::write(&path, &export.data)?;
                    println!(
                        "Exported {} readings for {} to {}.",
                        export.count,
                        export.patient_name,
                        path.display()
                    );
                }
                None => {
                    println!("{}", export.data);
                }
            }
        }
        Commands::Show { patient } => {
            let p = db::fetch_patient(pool, patient).await?;
            println!("{} <{}>", p.full_name, p.email);
            println!("Status: {}", p.status.as_str());
            if !p.chronic_conditions.is_empty() {
                println!("Conditions: {}", p.chronic_conditions.join(", "));
            }
            match p.assigned_doctor_id {
                Some(id) => println!("Doctor: {id}"),
                None => println!("Doctor: none"),
            }
            match p.assigned_caretaker_id {
                Some(id) => println!("Caretaker: {id}"),
                None => println!("Caretaker: none"),
            }
            println!("Auto-escalate to doctor: {}", p.auto_escalate_to_doctor);
            if let Some(reason) = &p.assignment_reason {
                println!("Assignment reason: {reason}");
            }
            if let Some(at) = p.escalated_at {
                println!("Escalated at {at}");
                if let Some(from) = p.escalated_from {
                    println!("Escalated from caretaker {from}");
                }
                if let Some(reason) = &p.escalation_reason {
                    println!("Escalation reason: {reason}");
                }
            }
        }
        Commands::Sweep { task } => match task {
            SweepTask::Invitations => {
                let removed = invitations::sweep_expired(pool).await?;
                println!("Removed {removed} expired invitations.");
            }
            SweepTask::Notifications => {
                let removed = report::sweep_stale_notifications(pool).await?;
                println!("Removed {removed} stale notifications.");
            }
            SweepTask::Reports { date } => {
                let date = date.unwrap_or_else(|| Utc::now().date_naive() - Duration::days(1));
                let patients = report::generate_daily_reports(pool, date).await?;
                println!("Generated {patients} daily reports for {date}.");
            }
        },
    }

    Ok(())
}
