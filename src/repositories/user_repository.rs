use sea_orm::{
    sea_query::Expr, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect,
};

use super::Page;
use crate::entities::user::{self, UserRole};
use crate::errors::ServiceError;

pub async fn find<C>(conn: &C, id: i32) -> Result<user::Model, ServiceError>
where
    C: ConnectionTrait,
{
    user::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found("User", id))
}

/// Loads the acting user, refusing unknown or deactivated accounts.
pub async fn find_actor<C>(conn: &C, id: i32) -> Result<user::Model, ServiceError>
where
    C: ConnectionTrait,
{
    match user::Entity::find_by_id(id).one(conn).await? {
        Some(user) if user.active => Ok(user),
        Some(_) => Err(ServiceError::Unauthorized(format!(
            "account {} is deactivated",
            id
        ))),
        None => Err(ServiceError::Unauthorized(format!("unknown user {}", id))),
    }
}

/// Fails with a uniqueness error when another account already uses the
/// username or email. Emails are stored lowercase; pass the normalised value.
pub async fn ensure_unique<C>(
    conn: &C,
    username: Option<&str>,
    email: Option<&str>,
    exclude_id: Option<i32>,
) -> Result<(), ServiceError>
where
    C: ConnectionTrait,
{
    let others = |cond: Condition| match exclude_id {
        Some(id) => cond.add(user::Column::Id.ne(id)),
        None => cond,
    };

    if let Some(username) = username {
        let taken = user::Entity::find()
            .filter(others(
                Condition::all().add(user::Column::Username.eq(username)),
            ))
            .count(conn)
            .await?;
        if taken > 0 {
            return Err(ServiceError::Uniqueness {
                field: "Username",
                value: username.to_string(),
            });
        }
    }

    if let Some(email) = email {
        let taken = user::Entity::find()
            .filter(others(Condition::all().add(user::Column::Email.eq(email))))
            .count(conn)
            .await?;
        if taken > 0 {
            return Err(ServiceError::Uniqueness {
                field: "Email",
                value: email.to_string(),
            });
        }
    }

    Ok(())
}

pub async fn list<C>(
    conn: &C,
    role: Option<UserRole>,
    page: u64,
    per_page: u64,
) -> Result<Page<user::Model>, ServiceError>
where
    C: ConnectionTrait,
{
    let page = page.max(1);
    let mut query = user::Entity::find();
    if let Some(role) = role {
        query = query.filter(user::Column::Role.eq(role));
    }
    let paginator = query.order_by_asc(user::Column::Id).paginate(conn, per_page);

    let total = paginator.num_items().await?;
    let items = paginator.fetch_page(page - 1).await?;

    Ok(Page {
        items,
        total,
        page,
        per_page,
    })
}

pub async fn count_all<C>(conn: &C) -> Result<u64, ServiceError>
where
    C: ConnectionTrait,
{
    Ok(user::Entity::find().count(conn).await?)
}

/// Number of accounts per role, active or not.
pub async fn count_by_role<C>(conn: &C) -> Result<Vec<(UserRole, i64)>, ServiceError>
where
    C: ConnectionTrait,
{
    let rows = user::Entity::find()
        .select_only()
        .column(user::Column::Role)
        .column_as(Expr::col(user::Column::Id).count(), "count")
        .group_by(user::Column::Role)
        .into_tuple::<(UserRole, i64)>()
        .all(conn)
        .await?;
    Ok(rows)
}
