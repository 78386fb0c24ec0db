use axum::{
    Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Basic},
};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

use std::sync::Arc;

use crate::{balances, expenses, notifications, payments, reminders};
use engine::{Engine, users};

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
    pub db: DatabaseConnection,
}

async fn auth(
    auth_header: TypedHeader<Authorization<Basic>>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if auth_header.username().is_empty() || auth_header.password().is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let user: Option<users::Model> = users::Entity::find()
        .filter(users::Column::Username.eq(auth_header.username()))
        .filter(users::Column::Password.eq(auth_header.password()))
        .one(&state.db)
        .await
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    let Some(user) = user else {
        return Err(StatusCode::UNAUTHORIZED);
    };

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/households/{household_id}/balances", get(balances::list))
        .route(
            "/households/{household_id}/expenses",
            get(expenses::list).post(expenses::create),
        )
        .route(
            "/households/{household_id}/payments",
            get(payments::list).post(payments::create),
        )
        .route(
            "/households/{household_id}/payments/{payment_id}",
            get(payments::get)
                .put(payments::edit)
                .delete(payments::remove),
        )
        .route(
            "/households/{household_id}/payments/{payment_id}/accept",
            put(payments::accept),
        )
        .route(
            "/households/{household_id}/payments/{payment_id}/reject",
            put(payments::reject),
        )
        .route(
            "/households/{household_id}/payments/{payment_id}/comments",
            post(payments::add_comment),
        )
        .route("/users/notifications", get(notifications::list))
        .route(
            "/users/notifications/{notification_id}",
            axum::routing::delete(notifications::remove),
        )
        .route(
            "/users/reminders",
            get(reminders::list).post(reminders::create),
        )
        .route(
            "/users/reminders/{reminder_id}",
            axum::routing::delete(reminders::remove),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth))
        .with_state(state)
}

pub async fn run(engine: Engine, db: DatabaseConnection) {
    let listener = match tokio::net::TcpListener::bind("127.0.0.1:3000").await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(engine, db, listener).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener(
    engine: Engine,
    db: DatabaseConnection,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    let state = ServerState {
        engine: Arc::new(engine),
        db,
    };

    axum::serve(listener, router(state)).await
}
