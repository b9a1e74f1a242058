#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Method, Request},
    response::Response,
    Router,
};
use carservice_api::{
    config::AppConfig,
    db,
    entities::{
        service::{self, ServiceStatus},
        user::{self, UserRole},
        vehicle,
    },
    events::{self, EventSender},
    repositories::history_repository::{self, HistoryEntry, HistoryOrder},
    AppState,
};
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;

/// Helper harness for spinning up an application state backed by an in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    _event_task: tokio::task::JoinHandle<()>,
}

/// Accounts and a vehicle most workflow tests start from.
pub struct Shop {
    pub client: user::Model,
    pub other_client: user::Model,
    pub employee: user::Model,
    pub other_employee: user::Model,
    pub admin: user::Model,
    pub vehicle: vehicle::Model,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            0,
            "test".to_string(),
        );
        // One connection keeps every query on the same in-memory database.
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        cfg.max_vehicles_per_owner = 3;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = Arc::new(EventSender::new(event_tx));
        let event_task = tokio::spawn(events::process_events(event_rx));

        let state = AppState::new(Arc::new(pool), Arc::new(cfg), event_sender);
        let router = carservice_api::app(state.clone());

        Self {
            router,
            state,
            _event_task: event_task,
        }
    }

    /// Fresh application with two clients, two employees, an admin and one
    /// vehicle owned by the first client.
    pub async fn with_shop() -> (Self, Shop) {
        let app = Self::new().await;
        let client = app
            .seed_user("alice", UserRole::Client, Some(("Alice", "Martin")))
            .await;
        let other_client = app.seed_user("bob", UserRole::Client, None).await;
        let employee = app
            .seed_user("carl", UserRole::Employee, Some(("Carl", "Nowak")))
            .await;
        let other_employee = app
            .seed_user("dana", UserRole::Employee, Some(("Dana", "Kowalska")))
            .await;
        let admin = app.seed_user("root", UserRole::Admin, None).await;
        let vehicle = app
            .seed_vehicle(client.id, "1HGCM82633A004352", "WX12345")
            .await;

        let shop = Shop {
            client,
            other_client,
            employee,
            other_employee,
            admin,
            vehicle,
        };
        (app, shop)
    }

    pub fn db(&self) -> &db::DbPool {
        self.state.db.as_ref()
    }

    /// Inserts an account directly, bypassing the role checks of the
    /// registration command.
    pub async fn seed_user(
        &self,
        username: &str,
        role: UserRole,
        names: Option<(&str, &str)>,
    ) -> user::Model {
        user::ActiveModel {
            username: Set(username.to_string()),
            email: Set(format!("{}@example.com", username)),
            password_hash: Set("$argon2id$test".to_string()),
            role: Set(role),
            first_name: Set(names.map(|(first, _)| first.to_string())),
            last_name: Set(names.map(|(_, last)| last.to_string())),
            phone: Set(None),
            address: Set(None),
            active: Set(true),
            ..Default::default()
        }
        .insert(self.db())
        .await
        .expect("seed user")
    }

    pub async fn seed_vehicle(&self, owner_id: i32, vin: &str, plate: &str) -> vehicle::Model {
        vehicle::ActiveModel {
            owner_id: Set(owner_id),
            make: Set("Honda".to_string()),
            model: Set("Accord".to_string()),
            year: Set(2018),
            vin: Set(vin.to_string()),
            license_plate: Set(plate.to_string()),
            color: Set(None),
            mileage: Set(Some(42_000)),
            ..Default::default()
        }
        .insert(self.db())
        .await
        .expect("seed vehicle")
    }

    /// Forces a service into a status without going through the workflow,
    /// for tests that start mid-lifecycle.
    pub async fn force_status(
        &self,
        service_id: i32,
        status: ServiceStatus,
        employee_id: Option<i32>,
    ) -> service::Model {
        let current = self.service(service_id).await;
        let mut active: service::ActiveModel = current.into();
        active.status = Set(status);
        active.employee_id = Set(employee_id);
        active.update(self.db()).await.expect("force status")
    }

    pub async fn service(&self, id: i32) -> service::Model {
        service::Entity::find_by_id(id)
            .one(self.db())
            .await
            .expect("load service")
            .expect("service exists")
    }

    pub async fn history(&self, service_id: i32) -> Vec<HistoryEntry> {
        history_repository::get_ordered(self.db(), service_id, HistoryOrder::OldestFirst)
            .await
            .expect("load history")
    }

    pub async fn history_count(&self, service_id: i32) -> u64 {
        history_repository::count_for_service(self.db(), service_id)
            .await
            .expect("count history")
    }

    /// Send a request against the router, optionally acting as a user.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        actor: Option<i32>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(id) = actor {
            builder = builder.header("x-actor-id", id.to_string());
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}
