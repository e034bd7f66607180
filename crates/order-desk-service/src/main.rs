use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use clap::Parser;
use order_desk_api::OrderDeskApi;
use order_desk_core::{
    CustomerDraft, CustomerId, CustomerPatch, CustomerRecord, DeskError, ItemDraft, ItemId,
    ItemPatch, ItemRecord, OrderDraft, OrderId, OrderPatch, OrderView,
};
use order_desk_store_sqlite::StoreError;
use serde::Serialize;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
struct ServiceState {
    api: OrderDeskApi,
}

#[derive(Debug, Clone, Serialize)]
struct MessageResponse {
    message: String,
}

#[derive(Debug, Clone, Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Debug)]
struct ServiceError {
    status: StatusCode,
    error: String,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.error });
        (self.status, Json(body)).into_response()
    }
}

fn service_error(err: StoreError) -> ServiceError {
    let status = match &err {
        StoreError::Desk(DeskError::NotFound { .. }) => StatusCode::NOT_FOUND,
        StoreError::Desk(DeskError::Validation(_)) => StatusCode::BAD_REQUEST,
        _ => {
            tracing::error!(error = %err, "internal server error");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    ServiceError { status, error: err.to_string() }
}

fn message(text: impl Into<String>) -> Json<MessageResponse> {
    Json(MessageResponse { message: text.into() })
}

#[derive(Debug, Parser)]
#[command(name = "order-desk-service")]
#[command(about = "HTTP service for OrderDesk")]
struct Args {
    #[arg(long, default_value = "./order_desk.sqlite3")]
    db: PathBuf,
    #[arg(long, default_value = "127.0.0.1:4020")]
    bind: SocketAddr,
}

fn app(state: ServiceState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/customers", post(create_customer))
        .route(
            "/customers/:id",
            get(read_customer).put(update_customer).delete(delete_customer),
        )
        .route("/items", post(create_item))
        .route("/items/:id", get(read_item).put(update_item).delete(delete_item))
        .route("/orders", post(create_order))
        .route("/orders/:id", get(read_order).put(update_order).delete(delete_order))
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let state = ServiceState { api: OrderDeskApi::new(args.db) };
    let listener = tokio::net::TcpListener::bind(args.bind).await?;
    tracing::info!(bind = %args.bind, "starting order-desk service");
    axum::serve(listener, app(state)).await?;
    Ok(())
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn create_customer(
    State(state): State<ServiceState>,
    Json(draft): Json<CustomerDraft>,
) -> Result<Json<MessageResponse>, ServiceError> {
    state.api.create_customer(draft).map_err(service_error)?;
    Ok(message("Customer created successfully"))
}

async fn read_customer(
    State(state): State<ServiceState>,
    Path(id): Path<i64>,
) -> Result<Json<CustomerRecord>, ServiceError> {
    let record = state.api.get_customer(CustomerId(id)).map_err(service_error)?;
    Ok(Json(record))
}

async fn update_customer(
    State(state): State<ServiceState>,
    Path(id): Path<i64>,
    Json(patch): Json<CustomerPatch>,
) -> Result<Json<MessageResponse>, ServiceError> {
    state.api.update_customer(CustomerId(id), patch).map_err(service_error)?;
    Ok(message(format!("Customer with ID {id} updated successfully")))
}

async fn delete_customer(
    State(state): State<ServiceState>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ServiceError> {
    state.api.delete_customer(CustomerId(id)).map_err(service_error)?;
    Ok(message("Customer deleted successfully"))
}

async fn create_item(
    State(state): State<ServiceState>,
    Json(draft): Json<ItemDraft>,
) -> Result<Json<MessageResponse>, ServiceError> {
    state.api.create_item(draft).map_err(service_error)?;
    Ok(message("Item created successfully"))
}

async fn read_item(
    State(state): State<ServiceState>,
    Path(id): Path<i64>,
) -> Result<Json<ItemRecord>, ServiceError> {
    let record = state.api.get_item(ItemId(id)).map_err(service_error)?;
    Ok(Json(record))
}

async fn update_item(
    State(state): State<ServiceState>,
    Path(id): Path<i64>,
    Json(patch): Json<ItemPatch>,
) -> Result<Json<MessageResponse>, ServiceError> {
    state.api.update_item(ItemId(id), patch).map_err(service_error)?;
    Ok(message(format!("Item with ID {id} updated successfully")))
}

async fn delete_item(
    State(state): State<ServiceState>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ServiceError> {
    state.api.delete_item(ItemId(id)).map_err(service_error)?;
    Ok(message("Item deleted successfully"))
}

async fn create_order(
    State(state): State<ServiceState>,
    Json(draft): Json<OrderDraft>,
) -> Result<Json<MessageResponse>, ServiceError> {
    state.api.create_order(draft).map_err(service_error)?;
    Ok(message("Order created successfully"))
}

async fn read_order(
    State(state): State<ServiceState>,
    Path(id): Path<i64>,
) -> Result<Json<OrderView>, ServiceError> {
    let view = state.api.get_order(OrderId(id)).map_err(service_error)?;
    Ok(Json(view))
}

async fn update_order(
    State(state): State<ServiceState>,
    Path(id): Path<i64>,
    Json(patch): Json<OrderPatch>,
) -> Result<Json<MessageResponse>, ServiceError> {
    state.api.update_order(OrderId(id), patch).map_err(service_error)?;
    Ok(message(format!("Order with ID {id} updated successfully")))
}

async fn delete_order(
    State(state): State<ServiceState>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ServiceError> {
    state.api.delete_order(OrderId(id)).map_err(service_error)?;
    Ok(message("Order deleted successfully"))
}
