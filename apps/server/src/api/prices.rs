use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;

use fincache_core::prices::{Currency, GetPricesRequest, PricePoint};

use crate::error::{ApiError, ApiResult};
use crate::main_lib::AppState;
use crate::models::ApiResponse;

const DATE_FORMAT: &str = "%Y-%m-%d";

pub async fn list_sources(State(state): State<Arc<AppState>>) -> Json<ApiResponse<Vec<String>>> {
    ApiResponse::ok(state.price_service.list_sources())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricesQuery {
    source: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
    currency: Option<String>,
    format: Option<String>,
}

pub async fn get_prices(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
    Query(query): Query<PricesQuery>,
) -> ApiResult<Response> {
    let source = query
        .source
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::BadRequest("source query parameter is required".to_string()))?;

    let start_date = query
        .start_date
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::BadRequest("startDate is required".to_string()))?;
    let start_date = NaiveDate::parse_from_str(&start_date, DATE_FORMAT).map_err(|_| {
        ApiError::BadRequest("invalid startDate format, expected YYYY-MM-DD".to_string())
    })?;

    let end_date = match query.end_date.filter(|s| !s.is_empty()) {
        Some(value) => Some(NaiveDate::parse_from_str(&value, DATE_FORMAT).map_err(|_| {
            ApiError::BadRequest("invalid endDate format, expected YYYY-MM-DD".to_string())
        })?),
        None => None,
    };

    let currency = query
        .currency
        .filter(|c| !c.is_empty())
        .map(|c| c.to_uppercase())
        .unwrap_or_else(|| "TRY".to_string());
    let currency = Currency::from_code(&currency)
        .ok_or_else(|| ApiError::BadRequest("currency must be TRY or USD".to_string()))?;

    let format = query.format.unwrap_or_default();

    let request = GetPricesRequest {
        source,
        symbol: symbol.to_uppercase(),
        currency,
        start_date,
        end_date,
        format: format.clone(),
    };

    let response = state.price_service.get_prices(&state.cancel, request).await?;

    if format == "csv" {
        return csv_response(&response.prices);
    }
    Ok(ApiResponse::ok(response).into_response())
}

fn csv_response(prices: &[PricePoint]) -> ApiResult<Response> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer
        .write_record([
            "Symbol",
            "Date",
            "Currency",
            "Source",
            "Close",
            "NativePrice",
            "NativeCurrency",
            "Rate",
        ])
        .map_err(csv_error)?;

    for point in prices {
        let date = point.date.format(DATE_FORMAT).to_string();
        let close = format!("{:.6}", point.close_price);
        let native_price = format!("{:.6}", point.native_price);
        let rate = format!("{:.6}", point.rate);
        writer
            .write_record([
                point.symbol.as_str(),
                date.as_str(),
                point.currency.as_str(),
                point.source.as_str(),
                close.as_str(),
                native_price.as_str(),
                point.native_currency.as_str(),
                rate.as_str(),
            ])
            .map_err(csv_error)?;
    }

    let body = writer
        .into_inner()
        .map_err(|e| ApiError::Internal(format!("encode csv: {e}")))?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=prices.csv",
            ),
        ],
        body,
    )
        .into_response())
}

fn csv_error(err: csv::Error) -> ApiError {
    ApiError::Internal(format!("encode csv: {err}"))
}
