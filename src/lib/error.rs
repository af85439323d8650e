use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use redis::RedisError;
use reqwest::Error as HttpClientError;
use serde::Serialize;
use serde_json::Error as JsonError;
use std::fmt::{Display, Error as FmtError, Formatter};
use std::io::Error as IoError;

/// This is the global server error type implemented as a convenient wrapper around all kind of
/// errors we could encounter using external libraries.
///
/// Please, try to use this type of error instead of specific ones at least at the front-end of the
/// server, as it will be updated to handle more error cases as we add more libraries or more
/// crate-specific errors.
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum ServerError {
    RedisError(
        #[serde(skip_serializing)]
        RedisError
    ),
    HttpClientError(
        #[serde(skip_serializing)]
        HttpClientError
    ),
    JsonError(
        #[serde(skip_serializing)]
        JsonError
    ),
    IoError(
        #[serde(skip_serializing)]
        IoError
    ),
    InternalError(
        #[serde(rename(serialize = "reason"))]
        InternalError
    ),
}

impl From<RedisError> for ServerError {
    fn from(error: RedisError) -> Self { Self::RedisError(error) }
}

impl From<HttpClientError> for ServerError {
    fn from(error: HttpClientError) -> Self { Self::HttpClientError(error) }
}

impl From<JsonError> for ServerError {
    fn from(error: JsonError) -> Self { Self::JsonError(error) }
}

impl From<IoError> for ServerError {
    fn from(error: IoError) -> Self { Self::IoError(error) }
}

impl From<InternalError> for ServerError {
    fn from(error: InternalError) -> Self { Self::InternalError(error) }
}

impl Display for ServerError {
    fn fmt(&self, f: &mut Formatter) -> Result<(), FmtError> {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for ServerError {}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        use InternalError::*;

        match self {
            ServerError::InternalError(e) => match e {
                NotQueued | InvalidFaction | InvalidGameVersion | PartyTooLarge => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        log::error!("{:?}", self);
        HttpResponse::build(self.status_code())
            .json(self)
    }
}

/// This enum represent all kinds of errors this specific server can encounter.
#[derive(Debug, Serialize)]
pub enum InternalError {
    /// A player heartbeats a queue it never entered and gives no entry data
    NotQueued,
    /// A player declared a faction outside the configured faction list
    InvalidFaction,
    /// The game version field does not follow the four-number scheme
    InvalidGameVersion,
    /// A party exceeds the maximum size, leader included
    PartyTooLarge,
    /// A pool id names a pool with no formation rules
    UnknownPool,
    /// The matchmaking configuration lacks an entry the match needs
    IncompleteConfig,
    /// The caller's network address could not be determined
    UnknownCaller,
}
