mod common;

use assert_matches::assert_matches;
use carservice_api::{
    commands::{
        services::CreateServiceCommand,
        users::{ChangeRoleCommand, CreateUserCommand, SetUserActiveCommand, UpdateUserCommand},
    },
    entities::{service::ServicePriority, user::UserRole},
    errors::ServiceError,
};
use common::TestApp;

fn account(actor_id: Option<i32>, username: &str, email: &str, role: UserRole) -> CreateUserCommand {
    CreateUserCommand {
        actor_id,
        username: username.to_string(),
        email: email.to_string(),
        password_hash: "$argon2id$v=19$stub".to_string(),
        role,
        first_name: Some("Eve".to_string()),
        last_name: Some("Novak".to_string()),
        phone: None,
        address: None,
    }
}

#[tokio::test]
async fn self_registration_creates_an_active_client() {
    let app = TestApp::new().await;

    let created = app
        .state
        .services
        .users
        .create(account(None, "eve_n", "Eve@Example.COM", UserRole::Client))
        .await
        .expect("register");

    assert_eq!(created.role, UserRole::Client);
    assert!(created.active);
    assert_eq!(created.email, "eve@example.com");
    assert_eq!(created.full_name(), "Eve Novak");
}

#[tokio::test]
async fn staff_accounts_need_an_admin() {
    let (app, shop) = TestApp::with_shop().await;
    let users = app.state.services.users.clone();

    assert_matches!(
        users
            .create(account(None, "sneaky", "sneaky@example.com", UserRole::Admin))
            .await,
        Err(ServiceError::Forbidden(_))
    );
    assert_matches!(
        users
            .create(account(
                Some(shop.employee.id),
                "helper",
                "helper@example.com",
                UserRole::Employee
            ))
            .await,
        Err(ServiceError::Forbidden(_))
    );

    let hired = users
        .create(account(
            Some(shop.admin.id),
            "helper",
            "helper@example.com",
            UserRole::Employee,
        ))
        .await
        .expect("admin creates employee");
    assert_eq!(hired.role, UserRole::Employee);
}

#[tokio::test]
async fn usernames_and_emails_are_unique() {
    let (app, shop) = TestApp::with_shop().await;
    let users = app.state.services.users.clone();

    assert_matches!(
        users
            .create(account(None, &shop.client.username, "fresh@example.com", UserRole::Client))
            .await,
        Err(ServiceError::Uniqueness { field: "Username", .. })
    );
    // Stored emails are lowercase, so case variants collide.
    assert_matches!(
        users
            .create(account(None, "fresh", "ALICE@example.com", UserRole::Client))
            .await,
        Err(ServiceError::Uniqueness { field: "Email", .. })
    );
}

#[tokio::test]
async fn malformed_usernames_fail_validation() {
    let app = TestApp::new().await;

    let result = app
        .state
        .services
        .users
        .create(account(None, "bad name!", "bad@example.com", UserRole::Client))
        .await;

    assert_matches!(result, Err(ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn profile_edits_respect_role_hierarchy() {
    let (app, shop) = TestApp::with_shop().await;
    let users = app.state.services.users.clone();
    let edit = |user_id: i32, actor_id: i32| UpdateUserCommand {
        user_id,
        actor_id,
        email: None,
        first_name: None,
        last_name: None,
        phone: Some("+48 600 100 200".to_string()),
        address: None,
    };

    users
        .update(edit(shop.client.id, shop.client.id))
        .await
        .expect("edit own profile");
    users
        .update(edit(shop.client.id, shop.employee.id))
        .await
        .expect("employee edits a client");
    assert_matches!(
        users.update(edit(shop.other_employee.id, shop.employee.id)).await,
        Err(ServiceError::Forbidden(_))
    );
    assert_matches!(
        users.update(edit(shop.other_client.id, shop.client.id)).await,
        Err(ServiceError::Forbidden(_))
    );

    let mut taken = edit(shop.client.id, shop.client.id);
    taken.email = Some(shop.other_client.email.clone());
    assert_matches!(
        users.update(taken).await,
        Err(ServiceError::Uniqueness { field: "Email", .. })
    );
}

#[tokio::test]
async fn only_admins_change_roles() {
    let (app, shop) = TestApp::with_shop().await;
    let users = app.state.services.users.clone();

    assert_matches!(
        users
            .change_role(ChangeRoleCommand {
                user_id: shop.client.id,
                actor_id: shop.employee.id,
                role: UserRole::Employee,
            })
            .await,
        Err(ServiceError::Forbidden(_))
    );
    assert_matches!(
        users
            .change_role(ChangeRoleCommand {
                user_id: shop.admin.id,
                actor_id: shop.admin.id,
                role: UserRole::Client,
            })
            .await,
        Err(ServiceError::InvalidOperation(_))
    );

    let promoted = users
        .change_role(ChangeRoleCommand {
            user_id: shop.client.id,
            actor_id: shop.admin.id,
            role: UserRole::Employee,
        })
        .await
        .expect("promote");
    assert_eq!(promoted.role, UserRole::Employee);
}

#[tokio::test]
async fn deactivated_accounts_can_no_longer_act() {
    let (app, shop) = TestApp::with_shop().await;
    let users = app.state.services.users.clone();

    assert_matches!(
        users
            .set_active(SetUserActiveCommand {
                user_id: shop.client.id,
                actor_id: shop.employee.id,
                active: false,
            })
            .await,
        Err(ServiceError::Forbidden(_))
    );

    let disabled = users
        .set_active(SetUserActiveCommand {
            user_id: shop.client.id,
            actor_id: shop.admin.id,
            active: false,
        })
        .await
        .expect("deactivate");
    assert!(!disabled.active);

    let result = app
        .state
        .services
        .service_requests
        .create(CreateServiceCommand {
            actor_id: shop.client.id,
            vehicle_id: shop.vehicle.id,
            description: "Rattling exhaust pipe".to_string(),
            priority: ServicePriority::Normal,
            preferred_date: None,
        })
        .await;
    assert_matches!(result, Err(ServiceError::Unauthorized(_)));

    assert_matches!(
        users
            .set_active(SetUserActiveCommand {
                user_id: shop.admin.id,
                actor_id: shop.admin.id,
                active: false,
            })
            .await,
        Err(ServiceError::InvalidOperation(_))
    );
}

#[tokio::test]
async fn account_listing_is_for_staff() {
    let (app, shop) = TestApp::with_shop().await;
    let users = app.state.services.users.clone();

    assert_matches!(
        users.list(&shop.client, None, 1, 20).await,
        Err(ServiceError::Forbidden(_))
    );

    let employees = users
        .list(&shop.admin, Some(UserRole::Employee), 1, 20)
        .await
        .expect("list employees");
    assert_eq!(employees.total, 2);
    assert!(employees.items.iter().all(|u| u.role == UserRole::Employee));

    let first_page = users.list(&shop.admin, None, 1, 2).await.expect("page");
    assert_eq!(first_page.items.len(), 2);
    assert_eq!(first_page.total, 5);
    assert_eq!(first_page.total_pages(), 3);
}
