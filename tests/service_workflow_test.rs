//! End-to-end tests for the service request workflow.
//!
//! Tests cover:
//! - request creation and the initial history entry
//! - the employee requirement and the transition table
//! - assignment and reassignment, including terminal statuses
//! - the client and staff sub-protocols (dates, plan, payment, pickup)
//! - atomicity and optimistic locking
//! - admin deletion and the staff dashboard counts

mod common;

use assert_matches::assert_matches;
use carservice_api::{
    commands::services::{
        ApprovePlanCommand, AssignEmployeeCommand, CancelServiceCommand, ConfirmDateCommand,
        ConfirmPickupCommand, CreateServiceCommand, DeleteServiceCommand, ProposeDateCommand,
        RecordPaymentCommand, RejectDateCommand, RejectServiceCommand, RequestChangesCommand,
        RequestDateChangeCommand, UpdateServiceDetailsCommand, UpdateStatusCommand,
    },
    entities::{
        service::{self, ServicePriority, ServiceStatus},
        user::UserRole,
    },
    errors::ServiceError,
    repositories::{history_repository::HistoryOrder, service_repository::ServiceFilter},
    workflow::{CostField, DetailsUpdate, WorkflowError},
};
use chrono::{TimeZone, Utc};
use common::{Shop, TestApp};

async fn create_request(app: &TestApp, shop: &Shop) -> service::Model {
    app.state
        .services
        .service_requests
        .create(CreateServiceCommand {
            actor_id: shop.client.id,
            vehicle_id: shop.vehicle.id,
            description: "Brakes squeal when stopping".to_string(),
            priority: ServicePriority::Normal,
            preferred_date: None,
        })
        .await
        .expect("create service request")
}

async fn assign(app: &TestApp, service_id: i32, actor_id: i32, employee_id: i32) -> Result<service::Model, ServiceError> {
    app.state
        .services
        .service_requests
        .assign_employee(AssignEmployeeCommand {
            service_id,
            actor_id,
            employee_id,
            expected_version: None,
        })
        .await
}

async fn set_status(
    app: &TestApp,
    service_id: i32,
    actor_id: i32,
    new_status: ServiceStatus,
) -> Result<service::Model, ServiceError> {
    app.state
        .services
        .service_requests
        .update_status(UpdateStatusCommand {
            service_id,
            actor_id,
            new_status,
            note: None,
            expected_version: None,
        })
        .await
}

async fn client_cancel(
    app: &TestApp,
    service_id: i32,
    actor_id: i32,
    reason: Option<&str>,
) -> Result<service::Model, ServiceError> {
    app.state
        .services
        .service_requests
        .cancel(CancelServiceCommand {
            service_id,
            actor_id,
            reason: reason.map(String::from),
            expected_version: None,
        })
        .await
}

// ==================== Creation ====================

#[tokio::test]
async fn creating_a_request_starts_pending_with_one_history_entry() {
    let (app, shop) = TestApp::with_shop().await;

    let created = create_request(&app, &shop).await;

    assert_eq!(created.status, ServiceStatus::Pending);
    assert_eq!(created.client_id, shop.client.id);
    assert_eq!(created.employee_id, None);
    assert_eq!(created.version, 1);

    let history = app.history(created.id).await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].description, "Service request created");
    assert_eq!(history[0].user_id, shop.client.id);
}

#[tokio::test]
async fn staff_create_requests_on_behalf_of_the_vehicle_owner() {
    let (app, shop) = TestApp::with_shop().await;

    let created = app
        .state
        .services
        .service_requests
        .create(CreateServiceCommand {
            actor_id: shop.employee.id,
            vehicle_id: shop.vehicle.id,
            description: "Walk-in oil change".to_string(),
            priority: ServicePriority::High,
            preferred_date: None,
        })
        .await
        .expect("staff create");

    assert_eq!(created.client_id, shop.client.id);
    assert_eq!(created.priority, ServicePriority::High);
}

#[tokio::test]
async fn clients_cannot_open_requests_for_someone_elses_vehicle() {
    let (app, shop) = TestApp::with_shop().await;

    let result = app
        .state
        .services
        .service_requests
        .create(CreateServiceCommand {
            actor_id: shop.other_client.id,
            vehicle_id: shop.vehicle.id,
            description: "Not my car at all".to_string(),
            priority: ServicePriority::Low,
            preferred_date: None,
        })
        .await;

    assert_matches!(result, Err(ServiceError::Forbidden(_)));
}

#[tokio::test]
async fn short_descriptions_fail_validation() {
    let (app, shop) = TestApp::with_shop().await;

    let result = app
        .state
        .services
        .service_requests
        .create(CreateServiceCommand {
            actor_id: shop.client.id,
            vehicle_id: shop.vehicle.id,
            description: "noise".to_string(),
            priority: ServicePriority::Normal,
            preferred_date: None,
        })
        .await;

    assert_matches!(result, Err(ServiceError::ValidationError(_)));
}

// ==================== Status changes ====================

#[tokio::test]
async fn scheduling_without_an_employee_is_refused_and_leaves_no_trace() {
    let (app, shop) = TestApp::with_shop().await;
    let created = create_request(&app, &shop).await;

    let result = set_status(&app, created.id, shop.employee.id, ServiceStatus::Scheduled).await;

    assert_matches!(
        result,
        Err(ServiceError::Workflow(WorkflowError::MissingEmployee {
            to: ServiceStatus::Scheduled
        }))
    );
    let reloaded = app.service(created.id).await;
    assert_eq!(reloaded.status, ServiceStatus::Pending);
    assert_eq!(reloaded.version, created.version);
    assert_eq!(app.history_count(created.id).await, 1);
}

#[tokio::test]
async fn assign_then_schedule_writes_two_history_entries() {
    let (app, shop) = TestApp::with_shop().await;
    let created = create_request(&app, &shop).await;

    let accepted = assign(&app, created.id, shop.employee.id, shop.employee.id)
        .await
        .expect("self assignment");
    assert_eq!(accepted.status, ServiceStatus::Accepted);
    assert_eq!(accepted.employee_id, Some(shop.employee.id));

    let scheduled = set_status(&app, created.id, shop.employee.id, ServiceStatus::Scheduled)
        .await
        .expect("schedule");
    assert_eq!(scheduled.status, ServiceStatus::Scheduled);
    assert_eq!(scheduled.version, created.version + 2);

    let history = app.history(created.id).await;
    assert_eq!(history.len(), 3);
    assert_eq!(history[1].description, "Service assigned to Carl Nowak");
    assert_eq!(
        history[2].description,
        "Status changed from accepted to scheduled"
    );
    assert_eq!(history[2].author.as_deref(), Some("Carl Nowak"));
}

#[tokio::test]
async fn status_notes_are_appended_to_the_history_line() {
    let (app, shop) = TestApp::with_shop().await;
    let created = create_request(&app, &shop).await;
    assign(&app, created.id, shop.admin.id, shop.employee.id)
        .await
        .expect("assign");

    app.state
        .services
        .service_requests
        .update_status(UpdateStatusCommand {
            service_id: created.id,
            actor_id: shop.employee.id,
            new_status: ServiceStatus::WaitingForVehicle,
            note: Some("Client drops the car off tomorrow".to_string()),
            expected_version: None,
        })
        .await
        .expect("status with note");

    let history = app.history(created.id).await;
    assert_eq!(
        history.last().map(|h| h.description.as_str()),
        Some("Status changed from accepted to waiting_for_vehicle: Client drops the car off tomorrow")
    );
}

#[tokio::test]
async fn transitions_outside_the_table_are_rejected() {
    let (app, shop) = TestApp::with_shop().await;
    let created = create_request(&app, &shop).await;
    assign(&app, created.id, shop.admin.id, shop.employee.id)
        .await
        .expect("assign");

    let result = set_status(&app, created.id, shop.employee.id, ServiceStatus::Completed).await;

    assert_matches!(
        result,
        Err(ServiceError::Workflow(WorkflowError::InvalidTransition {
            from: ServiceStatus::Accepted,
            to: ServiceStatus::Completed
        }))
    );
    assert_eq!(app.service(created.id).await.status, ServiceStatus::Accepted);
    assert_eq!(app.history_count(created.id).await, 2);
}

#[tokio::test]
async fn clients_cannot_move_the_status() {
    let (app, shop) = TestApp::with_shop().await;
    let created = create_request(&app, &shop).await;

    let result = set_status(&app, created.id, shop.client.id, ServiceStatus::Cancelled).await;

    assert_matches!(
        result,
        Err(ServiceError::Workflow(WorkflowError::NotPermitted(_)))
    );
}

#[tokio::test]
async fn terminal_statuses_have_no_way_out() {
    let (app, shop) = TestApp::with_shop().await;
    let created = create_request(&app, &shop).await;
    app.force_status(created.id, ServiceStatus::Finished, Some(shop.employee.id))
        .await;

    let result = set_status(&app, created.id, shop.admin.id, ServiceStatus::Cancelled).await;

    assert_matches!(
        result,
        Err(ServiceError::Workflow(WorkflowError::InvalidTransition { .. }))
    );
}

// ==================== Assignment ====================

#[tokio::test]
async fn reassignment_keeps_the_status_and_names_both_employees() {
    let (app, shop) = TestApp::with_shop().await;
    let created = create_request(&app, &shop).await;
    assign(&app, created.id, shop.admin.id, shop.employee.id)
        .await
        .expect("first assignment");

    let reassigned = assign(&app, created.id, shop.admin.id, shop.other_employee.id)
        .await
        .expect("reassignment");

    assert_eq!(reassigned.status, ServiceStatus::Accepted);
    assert_eq!(reassigned.employee_id, Some(shop.other_employee.id));
    let history = app.history(created.id).await;
    assert_eq!(
        history.last().map(|h| h.description.as_str()),
        Some("Service reassigned from Carl Nowak to Dana Kowalska")
    );
}

#[tokio::test]
async fn reassignment_is_allowed_on_terminal_services() {
    let (app, shop) = TestApp::with_shop().await;
    let created = create_request(&app, &shop).await;
    app.force_status(created.id, ServiceStatus::Cancelled, None)
        .await;

    let reassigned = assign(&app, created.id, shop.admin.id, shop.employee.id)
        .await
        .expect("assignment on a cancelled service");

    assert_eq!(reassigned.status, ServiceStatus::Cancelled);
    let history = app.history(created.id).await;
    assert_eq!(
        history.last().map(|h| h.description.as_str()),
        Some("Service reassigned from None to Carl Nowak")
    );
}

#[tokio::test]
async fn employees_may_only_assign_themselves() {
    let (app, shop) = TestApp::with_shop().await;
    let created = create_request(&app, &shop).await;

    let result = assign(&app, created.id, shop.employee.id, shop.other_employee.id).await;

    assert_matches!(
        result,
        Err(ServiceError::Workflow(WorkflowError::NotPermitted(_)))
    );
    assert_eq!(app.service(created.id).await.employee_id, None);
}

#[tokio::test]
async fn only_employees_can_be_assigned() {
    let (app, shop) = TestApp::with_shop().await;
    let created = create_request(&app, &shop).await;

    let result = assign(&app, created.id, shop.admin.id, shop.client.id).await;

    assert_matches!(result, Err(ServiceError::Workflow(WorkflowError::Rejected(_))));
}

#[tokio::test]
async fn assigning_the_same_employee_twice_is_rejected() {
    let (app, shop) = TestApp::with_shop().await;
    let created = create_request(&app, &shop).await;
    assign(&app, created.id, shop.employee.id, shop.employee.id)
        .await
        .expect("assign");

    let result = assign(&app, created.id, shop.employee.id, shop.employee.id).await;

    assert_matches!(result, Err(ServiceError::Workflow(WorkflowError::Rejected(_))));
    assert_eq!(app.history_count(created.id).await, 2);
}

// ==================== Cancellation ====================

#[tokio::test]
async fn clients_cancel_only_before_the_car_is_in_the_shop() {
    let (app, shop) = TestApp::with_shop().await;

    let allowed = [
        ServiceStatus::Pending,
        ServiceStatus::Scheduled,
        ServiceStatus::ClientConfirmed,
    ];
    for status in carservice_api::workflow::ALL_STATUSES {
        let created = create_request(&app, &shop).await;
        app.force_status(created.id, status, Some(shop.employee.id))
            .await;

        let result = client_cancel(&app, created.id, shop.client.id, Some("Changed my mind")).await;

        if allowed.contains(&status) {
            let cancelled = result.expect("client cancel");
            assert_eq!(cancelled.status, ServiceStatus::Cancelled);
            let history = app.history(created.id).await;
            assert_eq!(
                history.last().map(|h| h.description.as_str()),
                Some("Service cancelled by client. Reason: Changed my mind")
            );
        } else {
            assert_matches!(
                result,
                Err(ServiceError::Workflow(WorkflowError::InvalidTransition { .. })),
                "client cancel from {} should be refused",
                status
            );
            assert_eq!(app.service(created.id).await.status, status);
        }
    }
}

#[tokio::test]
async fn client_cancel_requires_a_reason() {
    let (app, shop) = TestApp::with_shop().await;
    let created = create_request(&app, &shop).await;

    let result = client_cancel(&app, created.id, shop.client.id, Some("   ")).await;

    assert_matches!(result, Err(ServiceError::Workflow(WorkflowError::Rejected(_))));
    assert_eq!(app.service(created.id).await.status, ServiceStatus::Pending);
}

#[tokio::test]
async fn other_clients_cannot_cancel() {
    let (app, shop) = TestApp::with_shop().await;
    let created = create_request(&app, &shop).await;

    let result = client_cancel(&app, created.id, shop.other_client.id, Some("Prank")).await;

    assert_matches!(
        result,
        Err(ServiceError::Workflow(WorkflowError::NotPermitted(_)))
    );
}

#[tokio::test]
async fn staff_cancel_mid_repair_with_optional_reason() {
    let (app, shop) = TestApp::with_shop().await;
    let created = create_request(&app, &shop).await;
    app.force_status(created.id, ServiceStatus::InProgress, Some(shop.employee.id))
        .await;

    let cancelled = client_cancel(&app, created.id, shop.employee.id, None)
        .await
        .expect("staff cancel");

    assert_eq!(cancelled.status, ServiceStatus::Cancelled);
    let history = app.history(created.id).await;
    assert_eq!(
        history.last().map(|h| h.description.as_str()),
        Some("Service cancelled")
    );
}

#[tokio::test]
async fn employees_reject_pending_requests_only() {
    let (app, shop) = TestApp::with_shop().await;
    let created = create_request(&app, &shop).await;

    let rejected = app
        .state
        .services
        .service_requests
        .reject(RejectServiceCommand {
            service_id: created.id,
            actor_id: shop.employee.id,
            reason: "We do not service hybrids".to_string(),
            expected_version: None,
        })
        .await
        .expect("reject pending request");
    assert_eq!(rejected.status, ServiceStatus::Cancelled);
    assert_eq!(
        app.history(created.id).await.last().map(|h| h.description.clone()),
        Some("Service rejected by employee. Reason: We do not service hybrids".to_string())
    );

    let again = app
        .state
        .services
        .service_requests
        .reject(RejectServiceCommand {
            service_id: created.id,
            actor_id: shop.employee.id,
            reason: "Twice".to_string(),
            expected_version: None,
        })
        .await;
    assert_matches!(
        again,
        Err(ServiceError::Workflow(WorkflowError::InvalidTransition {
            from: ServiceStatus::Cancelled,
            to: ServiceStatus::Cancelled
        }))
    );
}

// ==================== Dates ====================

#[tokio::test]
async fn date_negotiation_round_trip() {
    let (app, shop) = TestApp::with_shop().await;
    let requests = app.state.services.service_requests.clone();
    let created = create_request(&app, &shop).await;
    assign(&app, created.id, shop.employee.id, shop.employee.id)
        .await
        .expect("assign");

    let proposed_at = Utc.with_ymd_and_hms(2030, 5, 1, 9, 30, 0).unwrap();
    let scheduled = requests
        .propose_date(ProposeDateCommand {
            service_id: created.id,
            actor_id: shop.employee.id,
            scheduled_date: proposed_at,
            expected_version: None,
        })
        .await
        .expect("propose date");
    assert_eq!(scheduled.status, ServiceStatus::Scheduled);
    assert_eq!(scheduled.scheduled_date, Some(proposed_at));

    let confirmed = requests
        .confirm_date(ConfirmDateCommand {
            service_id: created.id,
            actor_id: shop.client.id,
            expected_version: Some(scheduled.version),
        })
        .await
        .expect("confirm date");
    assert_eq!(confirmed.status, ServiceStatus::ClientConfirmed);

    let preferred = Utc.with_ymd_and_hms(2030, 6, 2, 14, 0, 0).unwrap();
    let back_to_pending = requests
        .request_date_change(RequestDateChangeCommand {
            service_id: created.id,
            actor_id: shop.client.id,
            preferred_date: preferred,
            reason: Some("Traveling".to_string()),
            expected_version: None,
        })
        .await
        .expect("request date change");
    assert_eq!(back_to_pending.status, ServiceStatus::Pending);
    assert_eq!(back_to_pending.preferred_date, Some(preferred));

    let lines: Vec<String> = app
        .history(created.id)
        .await
        .into_iter()
        .map(|h| h.description)
        .collect();
    assert_eq!(
        &lines[2..],
        &[
            "Employee proposed new date: 2030-05-01 09:30".to_string(),
            "Client confirmed the scheduled date".to_string(),
            "Client requested date change to 2030-06-02 14:00. Reason: Traveling".to_string(),
        ]
    );
}

#[tokio::test]
async fn proposing_a_date_needs_an_assigned_employee() {
    let (app, shop) = TestApp::with_shop().await;
    let created = create_request(&app, &shop).await;

    let result = app
        .state
        .services
        .service_requests
        .propose_date(ProposeDateCommand {
            service_id: created.id,
            actor_id: shop.employee.id,
            scheduled_date: Utc.with_ymd_and_hms(2030, 1, 1, 8, 0, 0).unwrap(),
            expected_version: None,
        })
        .await;

    assert_matches!(
        result,
        Err(ServiceError::Workflow(WorkflowError::MissingEmployee { .. }))
    );
}

#[tokio::test]
async fn rejecting_a_proposed_date_returns_to_pending() {
    let (app, shop) = TestApp::with_shop().await;
    let created = create_request(&app, &shop).await;
    app.force_status(created.id, ServiceStatus::Scheduled, Some(shop.employee.id))
        .await;

    let rejected = app
        .state
        .services
        .service_requests
        .reject_date(RejectDateCommand {
            service_id: created.id,
            actor_id: shop.client.id,
            reason: Some("Too early".to_string()),
            expected_version: None,
        })
        .await
        .expect("reject date");

    assert_eq!(rejected.status, ServiceStatus::Pending);
    assert_eq!(
        app.history(created.id).await.last().map(|h| h.description.clone()),
        Some("Client rejected the scheduled date: Too early".to_string())
    );
}

// ==================== Plan, payment and pickup ====================

#[tokio::test]
async fn client_decisions_follow_the_diagnosis() {
    let (app, shop) = TestApp::with_shop().await;
    let requests = app.state.services.service_requests.clone();
    let created = create_request(&app, &shop).await;
    app.force_status(
        created.id,
        ServiceStatus::DiagnosisCompleted,
        Some(shop.employee.id),
    )
    .await;

    let consultation = requests
        .request_changes(RequestChangesCommand {
            service_id: created.id,
            actor_id: shop.client.id,
            changes: "Use OEM pads only".to_string(),
            expected_version: None,
        })
        .await
        .expect("request changes");
    assert_eq!(consultation.status, ServiceStatus::ClientConsultation);

    set_status(
        &app,
        created.id,
        shop.employee.id,
        ServiceStatus::DiagnosisCompleted,
    )
    .await
    .expect("back to diagnosis completed");

    let approved = requests
        .approve_plan(ApprovePlanCommand {
            service_id: created.id,
            actor_id: shop.client.id,
            expected_version: None,
        })
        .await
        .expect("approve plan");
    assert_eq!(approved.status, ServiceStatus::ClientApproved);

    let lines: Vec<String> = app
        .history(created.id)
        .await
        .into_iter()
        .map(|h| h.description)
        .collect();
    assert!(lines.contains(&"Client requested changes: Use OEM pads only".to_string()));
    assert_eq!(
        lines.last().map(String::as_str),
        Some("Client approved the service plan")
    );
}

#[tokio::test]
async fn full_lifecycle_reaches_finished() {
    let (app, shop) = TestApp::with_shop().await;
    let requests = app.state.services.service_requests.clone();
    let created = create_request(&app, &shop).await;
    let employee = shop.employee.id;

    assign(&app, created.id, employee, employee)
        .await
        .expect("assign");
    for status in [
        ServiceStatus::WaitingForVehicle,
        ServiceStatus::VehicleReceived,
        ServiceStatus::DiagnosisPending,
        ServiceStatus::DiagnosisCompleted,
    ] {
        set_status(&app, created.id, employee, status)
            .await
            .expect("advance before approval");
    }
    requests
        .approve_plan(ApprovePlanCommand {
            service_id: created.id,
            actor_id: shop.client.id,
            expected_version: None,
        })
        .await
        .expect("approve");
    for status in [
        ServiceStatus::InProgress,
        ServiceStatus::Completed,
        ServiceStatus::ReadyForPayment,
    ] {
        set_status(&app, created.id, employee, status)
            .await
            .expect("advance to payment");
    }
    requests
        .record_payment(RecordPaymentCommand {
            service_id: created.id,
            actor_id: shop.client.id,
            payment_method: "card".to_string(),
            expected_version: None,
        })
        .await
        .expect("pay");
    set_status(&app, created.id, employee, ServiceStatus::ReadyForPickup)
        .await
        .expect("ready for pickup");
    let finished = requests
        .confirm_pickup(ConfirmPickupCommand {
            service_id: created.id,
            actor_id: shop.client.id,
            expected_version: None,
        })
        .await
        .expect("pickup");

    assert_eq!(finished.status, ServiceStatus::Finished);
    // create + assign + 4 + approve + 3 + payment + ready + pickup
    assert_eq!(app.history_count(created.id).await, 13);
    assert_eq!(finished.version, 13);

    let newest = requests
        .history(&shop.client, created.id, HistoryOrder::NewestFirst)
        .await
        .expect("history");
    assert_eq!(newest[0].description, "Client confirmed vehicle pickup");
    assert!(newest
        .iter()
        .any(|h| h.description == "Payment received via card"));
}

// ==================== Details ====================

#[tokio::test]
async fn cost_edits_parse_clear_and_reject() {
    let (app, shop) = TestApp::with_shop().await;
    let requests = app.state.services.service_requests.clone();
    let created = create_request(&app, &shop).await;
    app.force_status(
        created.id,
        ServiceStatus::VehicleReceived,
        Some(shop.employee.id),
    )
    .await;

    let priced = requests
        .update_details(UpdateServiceDetailsCommand {
            service_id: created.id,
            actor_id: shop.employee.id,
            update: DetailsUpdate {
                estimated_cost: Some("150.5".to_string()),
                ..Default::default()
            },
            expected_version: None,
        })
        .await
        .expect("set cost");
    assert_eq!(priced.estimated_cost, Some(150.5));
    assert_eq!(
        app.history(created.id).await.last().map(|h| h.description.clone()),
        Some("Service details updated: estimated cost".to_string())
    );

    let malformed = requests
        .update_details(UpdateServiceDetailsCommand {
            service_id: created.id,
            actor_id: shop.employee.id,
            update: DetailsUpdate {
                estimated_cost: Some("abc".to_string()),
                diagnosis: Some("Worn pads".to_string()),
                ..Default::default()
            },
            expected_version: None,
        })
        .await;
    assert_matches!(
        malformed,
        Err(ServiceError::Workflow(WorkflowError::CostFormat {
            field: CostField::Estimated
        }))
    );
    let unchanged = app.service(created.id).await;
    assert_eq!(unchanged.estimated_cost, Some(150.5));
    assert_eq!(unchanged.diagnosis, None);

    let cleared = requests
        .update_details(UpdateServiceDetailsCommand {
            service_id: created.id,
            actor_id: shop.employee.id,
            update: DetailsUpdate {
                estimated_cost: Some("  ".to_string()),
                ..Default::default()
            },
            expected_version: None,
        })
        .await
        .expect("clear cost");
    assert_eq!(cleared.estimated_cost, None);
}

#[tokio::test]
async fn bulk_edits_with_a_status_change_record_every_field() {
    let (app, shop) = TestApp::with_shop().await;
    let created = create_request(&app, &shop).await;
    app.force_status(created.id, ServiceStatus::Accepted, Some(shop.employee.id))
        .await;

    let edited = app
        .state
        .services
        .service_requests
        .update_details(UpdateServiceDetailsCommand {
            service_id: created.id,
            actor_id: shop.admin.id,
            update: DetailsUpdate {
                status: Some(ServiceStatus::WaitingForVehicle),
                estimated_cost: Some("500".to_string()),
                priority: Some(ServicePriority::High),
                ..Default::default()
            },
            expected_version: None,
        })
        .await
        .expect("bulk edit");

    assert_eq!(edited.status, ServiceStatus::WaitingForVehicle);
    assert_eq!(edited.estimated_cost, Some(500.0));
    assert_eq!(edited.priority, ServicePriority::High);
    assert_eq!(
        app.history(created.id).await.last().map(|h| h.description.clone()),
        Some(
            "Status changed from accepted to waiting_for_vehicle: estimated cost, priority"
                .to_string()
        )
    );
}

#[tokio::test]
async fn details_are_frozen_on_pending_and_terminal_services() {
    let (app, shop) = TestApp::with_shop().await;
    let created = create_request(&app, &shop).await;

    let result = app
        .state
        .services
        .service_requests
        .update_details(UpdateServiceDetailsCommand {
            service_id: created.id,
            actor_id: shop.admin.id,
            update: DetailsUpdate {
                notes: Some("Customer waiting".to_string()),
                ..Default::default()
            },
            expected_version: None,
        })
        .await;

    assert_matches!(result, Err(ServiceError::Workflow(WorkflowError::Rejected(_))));
    assert_eq!(app.history_count(created.id).await, 1);
}

#[tokio::test]
async fn details_can_only_move_to_another_vehicle_of_the_same_client() {
    let (app, shop) = TestApp::with_shop().await;
    let created = create_request(&app, &shop).await;
    app.force_status(
        created.id,
        ServiceStatus::VehicleReceived,
        Some(shop.employee.id),
    )
    .await;
    let foreign = app
        .seed_vehicle(shop.other_client.id, "JH4KA7561PC008269", "KR55555")
        .await;

    let result = app
        .state
        .services
        .service_requests
        .update_details(UpdateServiceDetailsCommand {
            service_id: created.id,
            actor_id: shop.employee.id,
            update: DetailsUpdate {
                vehicle_id: Some(foreign.id),
                ..Default::default()
            },
            expected_version: None,
        })
        .await;

    assert_matches!(result, Err(ServiceError::InvalidOperation(_)));
    assert_eq!(app.service(created.id).await.vehicle_id, shop.vehicle.id);
}

// ==================== Deletion ====================

#[tokio::test]
async fn admins_delete_a_service_with_its_history() {
    let (app, shop) = TestApp::with_shop().await;
    let requests = app.state.services.service_requests.clone();
    let created = create_request(&app, &shop).await;
    assign(&app, created.id, shop.employee.id, shop.employee.id)
        .await
        .expect("assign");
    assert_eq!(app.history_count(created.id).await, 2);

    let refused = requests
        .delete(DeleteServiceCommand {
            service_id: created.id,
            actor_id: shop.employee.id,
        })
        .await;
    assert_matches!(refused, Err(ServiceError::Forbidden(_)));
    assert_eq!(app.history_count(created.id).await, 2);

    requests
        .delete(DeleteServiceCommand {
            service_id: created.id,
            actor_id: shop.admin.id,
        })
        .await
        .expect("admin delete");

    assert_eq!(app.history_count(created.id).await, 0);
    assert_matches!(
        requests.get(&shop.admin, created.id).await,
        Err(ServiceError::NotFound(_))
    );
    app.state
        .services
        .vehicles
        .get(&shop.client, shop.vehicle.id)
        .await
        .expect("the vehicle stays");

    let again = requests
        .delete(DeleteServiceCommand {
            service_id: created.id,
            actor_id: shop.admin.id,
        })
        .await;
    assert_matches!(again, Err(ServiceError::NotFound(_)));
}

#[tokio::test]
async fn deleting_one_service_leaves_the_others_alone() {
    let (app, shop) = TestApp::with_shop().await;
    let doomed = create_request(&app, &shop).await;
    let kept = create_request(&app, &shop).await;

    app.state
        .services
        .service_requests
        .delete(DeleteServiceCommand {
            service_id: doomed.id,
            actor_id: shop.admin.id,
        })
        .await
        .expect("delete");

    assert_eq!(app.history_count(kept.id).await, 1);
    assert_eq!(app.service(kept.id).await.status, ServiceStatus::Pending);
}

// ==================== Concurrency ====================

#[tokio::test]
async fn stale_versions_are_refused() {
    let (app, shop) = TestApp::with_shop().await;
    let created = create_request(&app, &shop).await;
    assign(&app, created.id, shop.employee.id, shop.employee.id)
        .await
        .expect("assign");

    // A second staff member still holds version 1.
    let result = app
        .state
        .services
        .service_requests
        .update_status(UpdateStatusCommand {
            service_id: created.id,
            actor_id: shop.admin.id,
            new_status: ServiceStatus::Cancelled,
            note: None,
            expected_version: Some(created.version),
        })
        .await;

    assert_matches!(result, Err(ServiceError::ConcurrentModification(id)) if id == created.id);
    let reloaded = app.service(created.id).await;
    assert_eq!(reloaded.status, ServiceStatus::Accepted);
    assert_eq!(app.history_count(created.id).await, 2);
}

// ==================== Queries ====================

#[tokio::test]
async fn clients_only_list_their_own_requests() {
    let (app, shop) = TestApp::with_shop().await;
    let requests = app.state.services.service_requests.clone();
    let mine = create_request(&app, &shop).await;
    let other_vehicle = app
        .seed_vehicle(shop.other_client.id, "JH4KA7561PC008269", "KR55555")
        .await;
    requests
        .create(CreateServiceCommand {
            actor_id: shop.other_client.id,
            vehicle_id: other_vehicle.id,
            description: "Check engine light is on".to_string(),
            priority: ServicePriority::Normal,
            preferred_date: None,
        })
        .await
        .expect("second request");

    let page = requests
        .list(&shop.client, ServiceFilter::default(), 1, 20)
        .await
        .expect("client list");
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].id, mine.id);

    // Asking for someone else's requests is silently narrowed.
    let narrowed = requests
        .list(
            &shop.client,
            ServiceFilter {
                client_id: Some(shop.other_client.id),
                ..Default::default()
            },
            1,
            20,
        )
        .await
        .expect("narrowed list");
    assert!(narrowed.items.iter().all(|s| s.client_id == shop.client.id));

    let everything = requests
        .list(&shop.employee, ServiceFilter::default(), 1, 20)
        .await
        .expect("staff list");
    assert_eq!(everything.total, 2);

    assert_matches!(
        requests.get(&shop.other_client, mine.id).await,
        Err(ServiceError::Forbidden(_))
    );
}

#[tokio::test]
async fn unassigned_filter_finds_the_queue() {
    let (app, shop) = TestApp::with_shop().await;
    let requests = app.state.services.service_requests.clone();
    let first = create_request(&app, &shop).await;
    let second = create_request(&app, &shop).await;
    assign(&app, first.id, shop.employee.id, shop.employee.id)
        .await
        .expect("assign");

    let queue = requests
        .list(
            &shop.employee,
            ServiceFilter {
                unassigned: true,
                ..Default::default()
            },
            1,
            20,
        )
        .await
        .expect("queue");

    assert_eq!(queue.total, 1);
    assert_eq!(queue.items[0].id, second.id);
}

#[tokio::test]
async fn dashboard_counts_group_by_status_and_role() {
    let (app, shop) = TestApp::with_shop().await;
    let dashboard = app.state.services.dashboard.clone();
    let first = create_request(&app, &shop).await;
    create_request(&app, &shop).await;
    assign(&app, first.id, shop.employee.id, shop.employee.id)
        .await
        .expect("assign");

    assert_matches!(
        dashboard.stats(&shop.client).await,
        Err(ServiceError::Forbidden(_))
    );

    let stats = dashboard.stats(&shop.employee).await.expect("stats");
    assert_eq!(stats.total_users, 5);
    assert_eq!(stats.total_vehicles, 1);
    assert_eq!(stats.total_services, 2);
    assert_eq!(stats.services_by_status.len(), 18);

    let count_for = |status: ServiceStatus| {
        stats
            .services_by_status
            .iter()
            .find(|row| row.status == status)
            .map(|row| row.count)
    };
    assert_eq!(count_for(ServiceStatus::Pending), Some(1));
    assert_eq!(count_for(ServiceStatus::Accepted), Some(1));
    assert_eq!(count_for(ServiceStatus::Finished), Some(0));

    let roles: Vec<(UserRole, i64)> = stats
        .users_by_role
        .iter()
        .map(|row| (row.role, row.count))
        .collect();
    assert_eq!(
        roles,
        vec![
            (UserRole::Client, 2),
            (UserRole::Employee, 2),
            (UserRole::Admin, 1)
        ]
    );
}
