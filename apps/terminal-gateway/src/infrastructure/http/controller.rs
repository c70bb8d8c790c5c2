//! HTTP Controller (Driver Adapter)
//!
//! Axum REST API over the datafeed and broker ports.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::sse::{Event, KeepAlive, KeepAliveStream, Sse},
    routing::{get, post, put},
};
use futures::StreamExt;
use futures::stream::BoxStream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::application::ports::{
    BrokerApi, DatafeedApi, DatafeedConfiguration, HistoryResult, ModifyOrderResult,
    OnRealtimeBar, PeriodParams, PlaceOrderResult, QuoteSnapshot, SymbolDescriptor, SymbolInfo,
};
use crate::application::services::{LastQuoteCache, SubscriptionRegistry};
use crate::domain::market_data::Bar;
use crate::domain::shared::{AccountId, OrderId, PositionId, SubscriberId};
use crate::domain::trading::{
    AccountMetainfo, AccountState, CanonicalOrder, CanonicalPosition, PreOrder,
};
use crate::error::GatewayError;
use crate::infrastructure::realtime::BroadcastPriceChannel;

use super::request::{
    BarStreamQuery, BarsQuery, PlaceOrderRequest, PriceUpdateRequest, QuotesQuery, SearchQuery,
};
use super::response::{
    ApiError, CommandResponse, HealthResponse, PriceIngestResponse, ServerTimeResponse,
};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Charting datafeed.
    pub datafeed: Arc<dyn DatafeedApi>,
    /// Trading broker.
    pub broker: Arc<dyn BrokerApi>,
    /// Subscription registry, for health reporting.
    pub registry: Arc<SubscriptionRegistry>,
    /// Push channel fed by the price ingest endpoint.
    pub prices: Arc<BroadcastPriceChannel>,
    /// Last-known quotes, refreshed by pushed prices.
    pub last_quotes: Arc<LastQuoteCache>,
    /// Application version.
    pub version: String,
}

/// Create the HTTP router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/datafeed/config", get(datafeed_config))
        .route("/api/v1/datafeed/time", get(server_time))
        .route("/api/v1/datafeed/search", get(search_symbols))
        .route("/api/v1/datafeed/symbols/{name}", get(resolve_symbol))
        .route("/api/v1/datafeed/bars", get(get_bars))
        .route("/api/v1/datafeed/bars/stream", get(stream_bars))
        .route("/api/v1/datafeed/quotes", get(get_quotes))
        .route("/api/v1/prices", post(ingest_price))
        .route("/api/v1/accounts", get(accounts))
        .route("/api/v1/accounts/{id}/state", get(account_state))
        .route("/api/v1/accounts/{id}/positions", get(positions))
        .route("/api/v1/accounts/{id}/orders", get(orders).post(place_order))
        .route(
            "/api/v1/accounts/{id}/orders/{order_id}",
            put(modify_order).delete(cancel_order),
        )
        .route(
            "/api/v1/accounts/{id}/positions/{position_id}/close",
            post(close_position),
        )
        .route(
            "/api/v1/accounts/{id}/positions/{position_id}/reverse",
            post(reverse_position),
        )
        .with_state(state)
}

/// Health check endpoint.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
        bar_subscriptions: state.registry.bar_subscriptions(),
        quote_subscriptions: state.registry.quote_subscriptions(),
    })
}

// ============================================
// Datafeed
// ============================================

async fn datafeed_config(State(state): State<AppState>) -> Json<DatafeedConfiguration> {
    Json(state.datafeed.on_ready().await)
}

async fn server_time(State(state): State<AppState>) -> Json<ServerTimeResponse> {
    Json(ServerTimeResponse {
        time: state.datafeed.server_time(),
    })
}

async fn search_symbols(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Json<Vec<SymbolDescriptor>> {
    Json(
        state
            .datafeed
            .search_symbols(&query.query, &query.exchange, &query.symbol_type),
    )
}

async fn resolve_symbol(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<SymbolInfo>, ApiError> {
    Ok(Json(state.datafeed.resolve_symbol(&name)?))
}

async fn get_bars(
    State(state): State<AppState>,
    Query(query): Query<BarsQuery>,
) -> Result<Json<HistoryResult>, ApiError> {
    let info = state.datafeed.resolve_symbol(&query.symbol)?;
    let period = PeriodParams {
        from: query.from,
        to: query.to,
        count_back: query.countback,
    };
    let result = state
        .datafeed
        .get_bars(&info, query.resolution, period)
        .await?;
    Ok(Json(result))
}

/// Unsubscribes its listener when the event stream is dropped.
struct SubscriptionGuard {
    datafeed: Arc<dyn DatafeedApi>,
    id: SubscriberId,
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        tracing::debug!(subscriber = %self.id, "Bar stream closed");
        self.datafeed.unsubscribe_bars(&self.id);
    }
}

/// Bars buffered per event stream before new updates are skipped.
const BAR_STREAM_BUFFER: usize = 64;

type BarEvents = BoxStream<'static, Result<Event, Infallible>>;

/// Bounded bridge from a bar callback to a receiver.
///
/// A full buffer skips the update instead of growing: every bar update
/// carries the whole bar, so the next delivery catches a slow reader up.
fn bar_channel(capacity: usize) -> (OnRealtimeBar, mpsc::Receiver<Bar>) {
    let (tx, rx) = mpsc::channel(capacity);
    let on_bar: OnRealtimeBar = Arc::new(move |bar: Bar| {
        if let Err(mpsc::error::TrySendError::Full(bar)) = tx.try_send(bar) {
            tracing::debug!(time = bar.time, "Bar stream lagging, update skipped");
        }
    });
    (on_bar, rx)
}

/// Realtime bars as server-sent `bar` events.
async fn stream_bars(
    State(state): State<AppState>,
    Query(query): Query<BarStreamQuery>,
) -> Result<Sse<KeepAliveStream<BarEvents>>, ApiError> {
    let info = state.datafeed.resolve_symbol(&query.symbol)?;
    let id = query
        .subscriber_id
        .map_or_else(SubscriberId::generate, SubscriberId::new);

    let (on_bar, rx) = bar_channel(BAR_STREAM_BUFFER);
    state
        .datafeed
        .subscribe_bars(&info, query.resolution, on_bar, id.clone())?;

    let guard = SubscriptionGuard {
        datafeed: Arc::clone(&state.datafeed),
        id,
    };
    let events: BarEvents = ReceiverStream::new(rx)
        .filter_map(move |bar| {
            let _subscription = &guard;
            let event = Event::default().event("bar").json_data(bar).ok();
            futures::future::ready(event.map(Ok))
        })
        .boxed();

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

async fn get_quotes(
    State(state): State<AppState>,
    Query(query): Query<QuotesQuery>,
) -> Json<Vec<QuoteSnapshot>> {
    Json(state.datafeed.get_quotes(&query.names()).await)
}

/// Push ingest: validate, remember and fan out one price update.
async fn ingest_price(
    State(state): State<AppState>,
    Json(request): Json<PriceUpdateRequest>,
) -> Result<Json<PriceIngestResponse>, ApiError> {
    let tick = request.into_tick();
    tick.validate().map_err(GatewayError::from)?;

    state.last_quotes.store(tick.clone());
    let listeners = state.prices.publish(tick);
    Ok(Json(PriceIngestResponse { listeners }))
}

// ============================================
// Broker
// ============================================

async fn accounts(State(state): State<AppState>) -> Json<Vec<AccountMetainfo>> {
    Json(state.broker.accounts_metainfo().await)
}

async fn account_state(
    State(state): State<AppState>,
    Path(id): Path<AccountId>,
) -> Json<AccountState> {
    Json(state.broker.account_state(&id).await)
}

async fn positions(
    State(state): State<AppState>,
    Path(id): Path<AccountId>,
) -> Json<Vec<CanonicalPosition>> {
    Json(state.broker.positions(&id).await)
}

async fn orders(
    State(state): State<AppState>,
    Path(id): Path<AccountId>,
) -> Json<Vec<CanonicalOrder>> {
    Json(state.broker.orders(&id).await)
}

async fn place_order(
    State(state): State<AppState>,
    Path(id): Path<AccountId>,
    Json(request): Json<PlaceOrderRequest>,
) -> Result<Json<PlaceOrderResult>, ApiError> {
    let result = state
        .broker
        .place_order(&id, request.order, request.parent_id)
        .await?;
    Ok(Json(result))
}

async fn modify_order(
    State(state): State<AppState>,
    Path((id, order_id)): Path<(AccountId, OrderId)>,
    Json(order): Json<PreOrder>,
) -> Result<Json<ModifyOrderResult>, ApiError> {
    Ok(Json(state.broker.modify_order(&id, &order_id, order).await?))
}

async fn cancel_order(
    State(state): State<AppState>,
    Path((id, order_id)): Path<(AccountId, OrderId)>,
) -> Result<Json<CommandResponse>, ApiError> {
    let ok = state.broker.cancel_order(&id, &order_id).await?;
    Ok(Json(CommandResponse { ok }))
}

async fn close_position(
    State(state): State<AppState>,
    Path((id, position_id)): Path<(AccountId, PositionId)>,
) -> Result<Json<CommandResponse>, ApiError> {
    let ok = state.broker.close_position(&id, &position_id).await?;
    Ok(Json(CommandResponse { ok }))
}

async fn reverse_position(
    State(state): State<AppState>,
    Path((id, position_id)): Path<(AccountId, PositionId)>,
) -> Result<Json<CommandResponse>, ApiError> {
    let ok = state.broker.reverse_position(&id, &position_id).await?;
    Ok(Json(CommandResponse { ok }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn bar(time: i64) -> Bar {
        Bar {
            time,
            open: dec!(10),
            high: dec!(11),
            low: dec!(9),
            close: dec!(10.5),
            volume: dec!(0),
        }
    }

    #[test]
    fn bar_channel_skips_updates_once_full() {
        let (on_bar, mut rx) = bar_channel(2);
        for time in 0..5 {
            on_bar(bar(time * 60));
        }

        assert_eq!(rx.try_recv().unwrap().time, 0);
        assert_eq!(rx.try_recv().unwrap().time, 60);
        assert!(rx.try_recv().is_err());

        on_bar(bar(300));
        assert_eq!(rx.try_recv().unwrap().time, 300);
    }

    #[test]
    fn bar_channel_tolerates_a_closed_stream() {
        let (on_bar, rx) = bar_channel(1);
        drop(rx);
        on_bar(bar(0));
    }
}
