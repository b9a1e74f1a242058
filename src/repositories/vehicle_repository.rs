use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
};

use crate::entities::vehicle;
use crate::errors::ServiceError;

pub async fn find<C>(conn: &C, id: i32) -> Result<vehicle::Model, ServiceError>
where
    C: ConnectionTrait,
{
    vehicle::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found("Vehicle", id))
}

/// Fails with a uniqueness error when another vehicle already uses the VIN
/// or the plate. `exclude_id` is the vehicle being edited, if any.
pub async fn ensure_unique<C>(
    conn: &C,
    vin: &str,
    license_plate: &str,
    exclude_id: Option<i32>,
) -> Result<(), ServiceError>
where
    C: ConnectionTrait,
{
    let others = |cond: Condition| match exclude_id {
        Some(id) => cond.add(vehicle::Column::Id.ne(id)),
        None => cond,
    };

    let vin_taken = vehicle::Entity::find()
        .filter(others(Condition::all().add(vehicle::Column::Vin.eq(vin))))
        .count(conn)
        .await?;
    if vin_taken > 0 {
        return Err(ServiceError::Uniqueness {
            field: "VIN",
            value: vin.to_string(),
        });
    }

    let plate_taken = vehicle::Entity::find()
        .filter(others(
            Condition::all().add(vehicle::Column::LicensePlate.eq(license_plate)),
        ))
        .count(conn)
        .await?;
    if plate_taken > 0 {
        return Err(ServiceError::Uniqueness {
            field: "License plate",
            value: license_plate.to_string(),
        });
    }

    Ok(())
}

pub async fn count_by_owner<C>(conn: &C, owner_id: i32) -> Result<u64, ServiceError>
where
    C: ConnectionTrait,
{
    Ok(vehicle::Entity::find()
        .filter(vehicle::Column::OwnerId.eq(owner_id))
        .count(conn)
        .await?)
}

pub async fn list_by_owner<C>(conn: &C, owner_id: i32) -> Result<Vec<vehicle::Model>, ServiceError>
where
    C: ConnectionTrait,
{
    Ok(vehicle::Entity::find()
        .filter(vehicle::Column::OwnerId.eq(owner_id))
        .order_by_asc(vehicle::Column::Id)
        .all(conn)
        .await?)
}

pub async fn list_all<C>(conn: &C) -> Result<Vec<vehicle::Model>, ServiceError>
where
    C: ConnectionTrait,
{
    Ok(vehicle::Entity::find()
        .order_by_asc(vehicle::Column::Id)
        .all(conn)
        .await?)
}

pub async fn count_all<C>(conn: &C) -> Result<u64, ServiceError>
where
    C: ConnectionTrait,
{
    Ok(vehicle::Entity::find().count(conn).await?)
}
