use super::common::*;
use crate::workflows::intake::domain::{
    ActorId, ApplicationStatus, RoomStatus,
};
use crate::workflows::intake::lifecycle::TransitionError;
use crate::workflows::intake::repository::{ApplicationStore, RoomRepository};
use crate::workflows::intake::service::IntakeServiceError;

fn reviewer() -> ActorId {
    ActorId("cons-2".to_string())
}

#[test]
fn pending_application_cannot_jump_to_approved() {
    let (service, store, _, _) = build_service(health_directory());
    let outcome = service
        .create_application(ActorId("owner-1".to_string()), draft("Health audit"))
        .expect("intake succeeds");
    let before = store
        .fetch_application(&outcome.application.id)
        .expect("fetch succeeds")
        .expect("application present");

    match service.transition_application(
        &outcome.application.id,
        ApplicationStatus::Approved,
        &reviewer(),
    ) {
        Err(IntakeServiceError::Transition(TransitionError::InvalidTransition { from, to })) => {
            assert_eq!(from, ApplicationStatus::Pending);
            assert_eq!(to, ApplicationStatus::Approved);
        }
        other => panic!("expected InvalidTransition, got {other:?}"),
    }

    let after = store
        .fetch_application(&outcome.application.id)
        .expect("fetch succeeds")
        .expect("application present");
    assert_eq!(before, after, "rejected transition must leave no trace");
}

#[test]
fn approval_stamps_and_completes_the_room() {
    let (service, _, rooms, _) = build_service(health_directory());
    let outcome = service
        .create_application(ActorId("owner-1".to_string()), draft("Health audit"))
        .expect("intake succeeds");
    let id = outcome.application.id.clone();

    service
        .transition_application(&id, ApplicationStatus::UnderReview, &reviewer())
        .expect("review starts");
    let approved = service
        .transition_application(&id, ApplicationStatus::Approved, &reviewer())
        .expect("approval succeeds");

    assert!(approved.approved_at.is_some());
    assert_eq!(approved.approved_by, Some(reviewer()));

    let room = rooms
        .fetch_room(&id)
        .expect("fetch succeeds")
        .expect("room present");
    assert_eq!(room.status, RoomStatus::Completed);
}

#[test]
fn review_start_stamps_reviewer_and_maps_room() {
    let (service, _, rooms, _) = build_service(health_directory());
    let outcome = service
        .create_application(ActorId("owner-1".to_string()), draft("Health audit"))
        .expect("intake succeeds");
    let id = outcome.application.id.clone();

    let reviewed = service
        .transition_application(&id, ApplicationStatus::UnderReview, &reviewer())
        .expect("review starts");
    assert!(reviewed.reviewed_at.is_some());
    assert_eq!(reviewed.reviewed_by, Some(reviewer()));

    let room = rooms
        .fetch_room(&id)
        .expect("fetch succeeds")
        .expect("room present");
    assert_eq!(room.status, RoomStatus::UnderReview);
}

#[test]
fn same_status_transition_is_a_noop_success() {
    let (service, store, _, _) = build_service(health_directory());
    let outcome = service
        .create_application(ActorId("owner-1".to_string()), draft("Health audit"))
        .expect("intake succeeds");
    let id = outcome.application.id.clone();
    let before = store
        .fetch_application(&id)
        .expect("fetch succeeds")
        .expect("application present");

    let result = service
        .transition_application(&id, ApplicationStatus::Pending, &reviewer())
        .expect("noop transition succeeds");
    assert_eq!(result, before);
}

#[test]
fn rejection_stamps_and_completes_the_room() {
    let (service, _, rooms, _) = build_service(health_directory());
    let outcome = service
        .create_application(ActorId("owner-1".to_string()), draft("Health audit"))
        .expect("intake succeeds");
    let id = outcome.application.id.clone();

    service
        .transition_application(&id, ApplicationStatus::UnderReview, &reviewer())
        .expect("review starts");
    let rejected = service
        .transition_application(&id, ApplicationStatus::Rejected, &reviewer())
        .expect("rejection succeeds");
    assert!(rejected.rejected_at.is_some());

    let room = rooms
        .fetch_room(&id)
        .expect("fetch succeeds")
        .expect("room present");
    assert_eq!(room.status, RoomStatus::Completed);
}

#[test]
fn additional_info_loops_back_to_review() {
    let (service, _, rooms, _) = build_service(health_directory());
    let outcome = service
        .create_application(ActorId("owner-1".to_string()), draft("Health audit"))
        .expect("intake succeeds");
    let id = outcome.application.id.clone();

    service
        .transition_application(&id, ApplicationStatus::UnderReview, &reviewer())
        .expect("review starts");
    let waiting = service
        .transition_application(&id, ApplicationStatus::AdditionalInfoRequired, &reviewer())
        .expect("info request succeeds");
    assert_eq!(waiting.status, ApplicationStatus::AdditionalInfoRequired);

    // The status map leaves the room as it was; only review/terminal map.
    let room = rooms
        .fetch_room(&id)
        .expect("fetch succeeds")
        .expect("room present");
    assert_eq!(room.status, RoomStatus::UnderReview);

    let resumed = service
        .transition_application(&id, ApplicationStatus::UnderReview, &reviewer())
        .expect("review resumes");
    assert_eq!(resumed.status, ApplicationStatus::UnderReview);
}

#[test]
fn cancellation_is_reachable_from_open_statuses_only() {
    let (service, _, _, _) = build_service(health_directory());
    let outcome = service
        .create_application(ActorId("owner-1".to_string()), draft("Health audit"))
        .expect("intake succeeds");
    let id = outcome.application.id.clone();

    let cancelled = service
        .transition_application(&id, ApplicationStatus::Cancelled, &reviewer())
        .expect("cancellation succeeds");
    assert!(cancelled.cancelled_at.is_some());

    match service.transition_application(&id, ApplicationStatus::UnderReview, &reviewer()) {
        Err(IntakeServiceError::Transition(TransitionError::InvalidTransition { from, .. })) => {
            assert_eq!(from, ApplicationStatus::Cancelled);
        }
        other => panic!("expected InvalidTransition, got {other:?}"),
    }
}

#[test]
fn approved_application_can_be_completed() {
    let (service, _, _, _) = build_service(health_directory());
    let outcome = service
        .create_application(ActorId("owner-1".to_string()), draft("Health audit"))
        .expect("intake succeeds");
    let id = outcome.application.id.clone();

    service
        .transition_application(&id, ApplicationStatus::UnderReview, &reviewer())
        .expect("review starts");
    service
        .transition_application(&id, ApplicationStatus::Approved, &reviewer())
        .expect("approval succeeds");
    let completed = service
        .transition_application(&id, ApplicationStatus::Completed, &reviewer())
        .expect("completion succeeds");
    assert_eq!(completed.status, ApplicationStatus::Completed);

    match service.transition_application(&id, ApplicationStatus::Cancelled, &reviewer()) {
        Err(IntakeServiceError::Transition(TransitionError::InvalidTransition { .. })) => {}
        other => panic!("expected InvalidTransition, got {other:?}"),
    }
}

#[test]
fn draft_application_gains_a_room_when_submitted() {
    let (service, store, rooms, _) = build_service(health_directory());
    let mut staged = pending_application("app-draft", "owner-1", "health");
    staged.status = ApplicationStatus::Draft;
    store
        .insert_application(staged)
        .expect("staged draft inserts");
    let id = crate::workflows::intake::domain::ApplicationId("app-draft".to_string());

    assert!(rooms.fetch_room(&id).expect("fetch succeeds").is_none());
    service
        .transition_application(&id, ApplicationStatus::Submitted, &reviewer())
        .expect("submission succeeds");
    let room = rooms
        .fetch_room(&id)
        .expect("fetch succeeds")
        .expect("room created by the cascade");
    assert_eq!(room.status, RoomStatus::Active);
}

#[test]
fn transitions_emit_status_change_notifications() {
    let (service, _, _, notifier) = build_service(health_directory());
    let outcome = service
        .create_application(ActorId("owner-1".to_string()), draft("Health audit"))
        .expect("intake succeeds");
    let id = outcome.application.id.clone();

    service
        .transition_application(&id, ApplicationStatus::UnderReview, &reviewer())
        .expect("review starts");

    let events = notifier.events();
    assert!(events.iter().any(|event| matches!(
        event,
        crate::workflows::intake::repository::NotificationEvent::ApplicationStatusChanged {
            from: ApplicationStatus::Pending,
            to: ApplicationStatus::UnderReview,
            ..
        }
    )));
}
