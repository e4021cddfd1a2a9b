use thiserror::Error;

/// Errors raised by scraper adapters and the FX chart client.
///
/// Only [`Validation`](Self::Validation) and [`Auth`](Self::Auth) abort a
/// whole scrape; everything else surfaces per chunk, where the caller logs
/// it and keeps the results of the remaining chunks.
#[derive(Error, Debug)]
pub enum ScrapeError {
    /// Bad scrape input (empty symbol, inverted range). Fatal.
    #[error("{0}")]
    Validation(String),

    /// Session/crumb handshake failed. Fatal for the whole scrape.
    #[error("{provider} auth: {message}")]
    Auth { provider: &'static str, message: String },

    /// The HTTP request itself failed (connect, timeout, body read).
    #[error("{provider} request failed: {source}")]
    Transport {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The provider answered with a non-success status code.
    #[error("{provider} returned HTTP {status} for {symbol}")]
    Status {
        provider: &'static str,
        status: u16,
        symbol: String,
    },

    /// The response body did not match the expected shape.
    #[error("failed to parse {provider} response: {message}")]
    Parse { provider: &'static str, message: String },

    /// The chart API reported an application-level error.
    #[error("{provider} chart error: {code}: {description}")]
    Chart {
        provider: &'static str,
        code: String,
        description: String,
    },

    /// The ambient cancellation token fired mid-request.
    #[error("scrape cancelled")]
    Cancelled,
}
