use std::sync::Arc;

use chrono::{Duration, Utc};
use clap::Args;

use crate::infra::{seed_directory, InMemoryIntakeStore, InMemoryRoomRepository, LoggingNotifier};
use grantflow::error::AppError;
use grantflow::workflows::intake::{
    ActivityKind, ActivityMeta, ActorId, ApplicationDraft, ApplicationStatus, IntakeConfig,
    IntakeService,
};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Print the full assignment history for each application.
    #[arg(long)]
    pub(crate) show_history: bool,
}

/// End-to-end walkthrough of the intake engine against seeded in-memory
/// adapters: submission, auto-assignment, room activity, review, and
/// reassignment.
pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let store = Arc::new(InMemoryIntakeStore::default());
    let rooms = Arc::new(InMemoryRoomRepository::default());
    let notifier = Arc::new(LoggingNotifier::default());
    let service = IntakeService::new(
        store,
        rooms,
        Arc::new(seed_directory()),
        notifier.clone(),
        IntakeConfig::default(),
    );

    println!("== Grant intake walkthrough ==\n");

    let submissions = [
        ("owner-ada", "Clinic digitization", Some(40_000)),
        ("owner-chiara", "Telehealth pilot", Some(85_000)),
        ("owner-bjorn", "Export readiness program", Some(25_000)),
    ];

    let mut created = Vec::new();
    for (owner, title, amount) in submissions {
        let outcome = service.create_application(
            ActorId(owner.to_string()),
            ApplicationDraft {
                title: title.to_string(),
                summary: "Submitted through the CLI demo".to_string(),
                requested_amount: amount,
                priority: None,
            },
        )?;
        match &outcome.assignment {
            Some(entry) => println!(
                "{} ({owner}, sector {}) -> assigned to {}",
                outcome.application.id.0, outcome.application.sector.0, entry.consultant_id.0
            ),
            None => println!(
                "{} ({owner}, sector {}) -> unassigned: {}",
                outcome.application.id.0,
                outcome.application.sector.0,
                outcome.no_match_reason.as_deref().unwrap_or("no reason")
            ),
        }
        created.push(outcome);
    }

    // The two health applications land on different desks because load is
    // recomputed between submissions.
    let first = &created[0];
    let id = first.application.id.clone();
    let reviewer = first
        .application
        .assigned_consultant
        .clone()
        .map(|consultant| ActorId(consultant.0))
        .unwrap_or_else(|| ActorId("admin-demo".to_string()));

    println!("\n-- Room activity on {} --", id.0);
    let base = Utc::now();
    service.record_room_activity(
        &id,
        ActivityKind::Message,
        ActivityMeta {
            is_consultant: false,
            occurred_at: Some(base),
        },
    )?;
    let room = service.record_room_activity(
        &id,
        ActivityKind::Message,
        ActivityMeta {
            is_consultant: true,
            occurred_at: Some(base + Duration::minutes(12)),
        },
    )?;
    println!(
        "messages: {}, response time: {}s",
        room.stats.message_count,
        room.stats.response_time_seconds.unwrap_or_default()
    );

    println!("\n-- Review flow on {} --", id.0);
    service.transition_application(&id, ApplicationStatus::UnderReview, &reviewer)?;
    let approved = service.transition_application(&id, ApplicationStatus::Approved, &reviewer)?;
    println!(
        "status: {}, room: {}",
        approved.status.label(),
        service
            .application_status(&id)?
            .room_status
            .unwrap_or("missing")
    );

    let second = &created[1];
    println!("\n-- Reassignment on {} --", second.application.id.0);
    let moved = service.reassign_consultant(
        &second.application.id,
        first
            .application
            .assigned_consultant
            .clone()
            .unwrap_or_else(|| grantflow::workflows::intake::ConsultantId("cons-ingrid".to_string())),
        ActorId("admin-demo".to_string()),
        "workload rebalancing after approval",
    )?;
    println!(
        "{} -> {} (previously {})",
        second.application.id.0,
        moved.consultant_id.0,
        moved
            .previous_consultant
            .map(|consultant| consultant.0)
            .unwrap_or_else(|| "nobody".to_string())
    );

    if args.show_history {
        println!("\n-- Assignment history --");
        for outcome in &created {
            for entry in service.assignment_history(&outcome.application.id)? {
                println!(
                    "{} | {} | {} | open: {}",
                    entry.application_id.0,
                    entry.consultant_id.0,
                    entry.reason,
                    entry.is_open()
                );
            }
        }
    }

    println!("\n{} notification(s) dispatched", notifier.events().len());
    Ok(())
}
