use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{MarketError, TradingError};
use crate::market::{MarketState, StockSnapshot};
use crate::session::Session;

pub type AppState = Arc<Session>;

pub fn router(session: AppState) -> Router {
    Router::new()
        .route("/state", get(get_state))
        .route("/stocks", get(get_stocks))
        .route("/stocks/{symbol}", get(get_stock))
        .route("/portfolio", get(get_portfolio))
        .route("/day/begin", post(begin_day))
        .route("/day/next", post(next_day))
        .route("/active/{symbol}", post(set_active))
        .route("/active", delete(clear_active))
        .route("/buy", post(buy))
        .route("/sell", post(sell))
        .route("/sell_all", post(sell_all))
        .route("/short", post(short))
        .route("/cover", post(cover))
        .route("/affords", get(affords))
        .with_state(session)
}

pub async fn run_server(session: AppState, bind: &str) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("🌐 [API] Listening on {}", listener.local_addr()?);
    axum::serve(listener, router(session)).await
}

/// Command failure rendered as `{"error": ...}` with a 4xx status.
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl From<TradingError> for ApiError {
    fn from(e: TradingError) -> Self {
        let status = match &e {
            TradingError::InvalidQuantity { .. } => StatusCode::BAD_REQUEST,
            TradingError::UnknownSymbol { .. } => StatusCode::NOT_FOUND,
            TradingError::InsufficientFunds { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            TradingError::MechanicLocked { .. } => StatusCode::FORBIDDEN,
            TradingError::NoPosition { .. }
            | TradingError::PositionOpen { .. }
            | TradingError::MarketClosed { .. } => StatusCode::CONFLICT,
        };
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl From<MarketError> for ApiError {
    fn from(e: MarketError) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            message: e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        debug!("[API] {} {}", self.status, self.message);
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct TradeRequest {
    pub symbol: String,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct SymbolRequest {
    pub symbol: String,
}

#[derive(Debug, Serialize)]
pub struct StateView {
    pub state: MarketState,
    pub time: String,
    pub day: i64,
    pub level: usize,
    pub balance_target: Option<f64>,
    pub active_symbol: Option<String>,
    pub news_running: bool,
}

#[derive(Debug, Serialize)]
pub struct StockView {
    #[serde(flatten)]
    pub snapshot: StockSnapshot,
    pub price_history: Vec<f64>,
    pub volume_history: Vec<f64>,
    pub trend_history: Vec<f64>,
}

#[derive(Debug, Serialize)]
pub struct PositionView {
    pub symbol: String,
    pub quantity: i64,
}

#[derive(Debug, Serialize)]
pub struct PortfolioView {
    pub balance: f64,
    pub profit: f64,
    pub positions: Vec<PositionView>,
    pub positions_value: f64,
    pub net_worth: f64,
}

async fn get_state(State(session): State<AppState>) -> Json<StateView> {
    let market = session.market();
    Json(StateView {
        state: market.state(),
        time: market.current_time().format("%H:%M").to_string(),
        day: session.data().day_count(),
        level: session.gate().current_level(),
        balance_target: session.gate().balance_target(),
        active_symbol: market.active_symbol(),
        news_running: session.news().is_running(),
    })
}

async fn get_stocks(State(session): State<AppState>) -> Json<Vec<StockSnapshot>> {
    Json(session.market().snapshots())
}

async fn get_stock(State(session): State<AppState>, Path(symbol): Path<String>) -> Result<Json<StockView>, ApiError> {
    let stock = session
        .market()
        .get_stock(&symbol)
        .ok_or(TradingError::UnknownSymbol { symbol })?;
    let stock = stock.lock().unwrap();
    Ok(Json(StockView {
        snapshot: stock.snapshot(),
        price_history: stock.price_history().to_vec(),
        volume_history: stock.volume_history().to_vec(),
        trend_history: stock.trend_history().to_vec(),
    }))
}

async fn get_portfolio(State(session): State<AppState>) -> Json<PortfolioView> {
    let portfolio = session.portfolio();
    Json(PortfolioView {
        balance: portfolio.balance(),
        profit: portfolio.account().profit(),
        positions: portfolio
            .positions()
            .into_iter()
            .map(|(symbol, quantity)| PositionView { symbol, quantity })
            .collect(),
        positions_value: portfolio.positions_value(),
        net_worth: portfolio.net_worth(),
    })
}

async fn begin_day(State(session): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    session.begin_day()?;
    Ok(Json(json!({ "status": "day_started" })))
}

async fn next_day(State(session): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    session.next_day()?;
    Ok(Json(json!({ "status": "idle", "day": session.data().day_count() })))
}

async fn set_active(State(session): State<AppState>, Path(symbol): Path<String>) -> Result<impl IntoResponse, ApiError> {
    session.desk().set_active(&symbol)?;
    Ok(Json(json!({ "active_symbol": symbol })))
}

async fn clear_active(State(session): State<AppState>) -> impl IntoResponse {
    session.desk().clear_active();
    StatusCode::NO_CONTENT
}

async fn buy(State(session): State<AppState>, Json(req): Json<TradeRequest>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(session.desk().buy(&req.symbol, req.quantity)?))
}

async fn sell(State(session): State<AppState>, Json(req): Json<TradeRequest>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(session.desk().sell(&req.symbol, req.quantity)?))
}

async fn sell_all(State(session): State<AppState>, Json(req): Json<SymbolRequest>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(session.desk().sell_all(&req.symbol)?))
}

async fn short(State(session): State<AppState>, Json(req): Json<TradeRequest>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(session.desk().short(&req.symbol, req.quantity)?))
}

async fn cover(State(session): State<AppState>, Json(req): Json<SymbolRequest>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(session.desk().cover(&req.symbol)?))
}

async fn affords(State(session): State<AppState>, Query(req): Query<TradeRequest>) -> Result<impl IntoResponse, ApiError> {
    let affordable = session.desk().affords(&req.symbol, req.quantity)?;
    Ok(Json(json!({
        "symbol": req.symbol,
        "quantity": req.quantity,
        "affords": affordable,
    })))
}
