//! Vehicle registry commands.

pub mod create_vehicle_command;
pub mod delete_vehicle_command;
pub mod update_vehicle_command;

pub use create_vehicle_command::CreateVehicleCommand;
pub use delete_vehicle_command::DeleteVehicleCommand;
pub use update_vehicle_command::UpdateVehicleCommand;

use chrono::{Datelike, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use sea_orm::{DbErr, SqlErr};
use tracing::{error, warn};
use validator::ValidationError;

use crate::{
    entities::{user, vehicle},
    errors::ServiceError,
    metrics,
};

pub const MIN_VEHICLE_YEAR: i32 = 1900;

lazy_static! {
    /// 17 characters, digits and capitals except I, O and Q.
    static ref VIN_PATTERN: Regex =
        Regex::new(r"^[A-HJ-NPR-Z0-9]{17}$").expect("VIN pattern compiles");
}

pub(crate) fn validate_vin(vin: &str) -> Result<(), ValidationError> {
    if VIN_PATTERN.is_match(vin) {
        Ok(())
    } else {
        let mut err = ValidationError::new("vin");
        err.message = Some(
            "VIN must be 17 characters of digits and capital letters (no I, O or Q)".into(),
        );
        Err(err)
    }
}

pub(crate) fn validate_year(year: i32) -> Result<(), ValidationError> {
    let max = Utc::now().year() + 1;
    if (MIN_VEHICLE_YEAR..=max).contains(&year) {
        Ok(())
    } else {
        let mut err = ValidationError::new("year");
        err.message = Some(format!("Year must be between {} and {}", MIN_VEHICLE_YEAR, max).into());
        Err(err)
    }
}

/// Owner or vehicle staff.
pub(crate) fn ensure_can_manage(
    actor: &user::Model,
    vehicle: &vehicle::Model,
) -> Result<(), ServiceError> {
    if actor.id == vehicle.owner_id || actor.role.can_manage_vehicles() {
        Ok(())
    } else {
        Err(ServiceError::Forbidden(
            "only the owner or staff may manage this vehicle".into(),
        ))
    }
}

/// Turns a unique index hit that slipped past the pre-checks into the same
/// error the pre-checks raise.
pub(crate) fn map_insert_error(err: DbErr, vin: &str, license_plate: &str) -> ServiceError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => {
            if detail.contains("license_plate") {
                ServiceError::Uniqueness {
                    field: "License plate",
                    value: license_plate.to_string(),
                }
            } else {
                ServiceError::Uniqueness {
                    field: "VIN",
                    value: vin.to_string(),
                }
            }
        }
        _ => ServiceError::DatabaseError(err),
    }
}

pub(crate) fn failed(operation: &'static str, err: ServiceError) -> ServiceError {
    metrics::record_registry_failure("vehicle", operation, &err);
    match &err {
        ServiceError::DatabaseError(_) | ServiceError::InternalError(_) => {
            error!(operation, error = %err, "Vehicle operation failed")
        }
        _ => warn!(operation, error = %err, "Vehicle operation rejected"),
    }
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("1HGCM82633A004352", true)]
    #[case("WVWZZZ1JZXW000001", true)]
    #[case("1HGCM82633A00435", false)]
    #[case("1HGCM82633A0043521", false)]
    #[case("1HGCM82633I004352", false)]
    #[case("1hgcm82633a004352", false)]
    fn vin_format(#[case] vin: &str, #[case] ok: bool) {
        assert_eq!(validate_vin(vin).is_ok(), ok);
    }

    #[test]
    fn year_bounds_follow_the_calendar() {
        let next = Utc::now().year() + 1;
        assert!(validate_year(1900).is_ok());
        assert!(validate_year(next).is_ok());
        assert!(validate_year(1899).is_err());
        assert!(validate_year(next + 1).is_err());
    }
}
