use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{entity::prelude::*, ActiveValue::Set};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Lifecycle status of a service request. The allowed edges between these
/// values live in [`crate::workflow::transitions`].
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ServiceStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "accepted")]
    Accepted,
    #[sea_orm(string_value = "scheduled")]
    Scheduled,
    #[sea_orm(string_value = "client_confirmed")]
    ClientConfirmed,
    #[sea_orm(string_value = "waiting_for_vehicle")]
    WaitingForVehicle,
    #[sea_orm(string_value = "vehicle_received")]
    VehicleReceived,
    #[sea_orm(string_value = "diagnosis_pending")]
    DiagnosisPending,
    #[sea_orm(string_value = "diagnosis_completed")]
    DiagnosisCompleted,
    #[sea_orm(string_value = "client_consultation")]
    ClientConsultation,
    #[sea_orm(string_value = "client_approved")]
    ClientApproved,
    #[sea_orm(string_value = "waiting_for_parts")]
    WaitingForParts,
    #[sea_orm(string_value = "in_progress")]
    InProgress,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "ready_for_payment")]
    ReadyForPayment,
    #[sea_orm(string_value = "payment_received")]
    PaymentReceived,
    #[sea_orm(string_value = "ready_for_pickup")]
    ReadyForPickup,
    #[sea_orm(string_value = "finished")]
    Finished,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

/// Request priority. Older forms submitted "medium"; it is read as `Normal`
/// and never written back.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
#[strum(ascii_case_insensitive)]
pub enum ServicePriority {
    #[sea_orm(string_value = "low")]
    #[strum(to_string = "low")]
    Low,
    #[default]
    #[sea_orm(string_value = "normal")]
    #[serde(alias = "medium")]
    #[strum(to_string = "normal", serialize = "medium")]
    Normal,
    #[sea_orm(string_value = "high")]
    #[strum(to_string = "high")]
    High,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = Service)]
#[sea_orm(table_name = "services")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub vehicle_id: i32,
    pub client_id: i32,
    pub employee_id: Option<i32>,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub priority: ServicePriority,
    pub status: ServiceStatus,
    pub preferred_date: Option<DateTime<Utc>>,
    pub scheduled_date: Option<DateTime<Utc>>,
    #[sea_orm(column_type = "Text", nullable)]
    pub diagnosis: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub service_plan: Option<String>,
    pub estimated_cost: Option<f64>,
    pub actual_cost: Option<f64>,
    #[sea_orm(column_type = "Text", nullable)]
    pub parts_needed: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub additional_notes: Option<String>,
    /// Bumped on every write; guards against lost updates.
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::vehicle::Entity",
        from = "Column::VehicleId",
        to = "super::vehicle::Column::Id",
        on_delete = "Cascade"
    )]
    Vehicle,
    #[sea_orm(has_many = "super::service_history::Entity")]
    History,
}

impl Related<super::vehicle::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Vehicle.def()
    }
}

impl Related<super::service_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::History.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        let now = Utc::now();

        if insert {
            active_model.created_at = Set(now);
            active_model.version = Set(1);
        }
        active_model.updated_at = Set(now);

        Ok(active_model)
    }
}
