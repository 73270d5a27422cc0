use actix_web::error::{BlockingError, ResponseError};
use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use argon2::password_hash::Error as HashError;
use diesel::r2d2;
use diesel::result::Error as DieselError;
use std::convert::From;

use super::validation::FieldErrors;

pub type Result<T> = ::std::result::Result<T, Error>;

#[derive(Debug, Display)]
pub enum Error {
    #[display(fmt = "Not found.")]
    NotFound,

    #[display(fmt = "Authentication credentials were not provided.")]
    NotAuthenticated,

    #[display(fmt = "You do not have permission to perform this action.")]
    PermissionDenied,

    #[display(fmt = "Invalid input.")]
    Validation(FieldErrors),

    #[display(fmt = "{}", _0)]
    BadRequest(String),

    #[display(fmt = "Configuration error: {}", _0)]
    Config(String),

    #[display(fmt = "Database error: {}", _0)]
    DieselError(DieselError),

    #[display(fmt = "Connection pool error: {}", _0)]
    PoolError(r2d2::PoolError),

    #[display(fmt = "Cannot reverse route {}", _0)]
    Route(String),

    #[display(fmt = "Migration failed: {}", _0)]
    MigrationError(String),

    #[display(fmt = "Password hashing failed: {}", _0)]
    HashError(HashError),

    #[display(fmt = "Session token generation failed: {}", _0)]
    TokenError(String),

    #[display(fmt = "Blocking task was canceled")]
    Canceled,

    #[display(fmt = "Store lock poisoned")]
    Poisoned,

    #[display(fmt = "I/O error: {}", _0)]
    Io(std::io::Error),
}

impl Error {
    fn is_internal(&self) -> bool {
        self.status_code() == StatusCode::INTERNAL_SERVER_ERROR
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::DieselError(e) => Some(e),
            Self::PoolError(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

#[derive(Serialize)]
struct Detail {
    detail: String,
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::NotAuthenticated | Self::PermissionDenied => StatusCode::FORBIDDEN,
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut builder = HttpResponse::build(self.status_code());

        match self {
            Self::Validation(errors) => builder.json(errors),
            e if e.is_internal() => {
                error!("{}", e);
                builder.json(Detail {
                    detail: "A server error occurred.".to_owned(),
                })
            }
            e => builder.json(Detail {
                detail: e.to_string(),
            }),
        }
    }
}

impl From<DieselError> for Error {
    fn from(e: DieselError) -> Error {
        match e {
            DieselError::NotFound => Error::NotFound,
            e => Error::DieselError(e),
        }
    }
}

impl From<r2d2::PoolError> for Error {
    fn from(e: r2d2::PoolError) -> Error {
        Error::PoolError(e)
    }
}

impl From<BlockingError> for Error {
    fn from(_: BlockingError) -> Error {
        Error::Canceled
    }
}

impl From<HashError> for Error {
    fn from(e: HashError) -> Error {
        Error::HashError(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Error {
        Error::Io(e)
    }
}

impl From<FieldErrors> for Error {
    fn from(e: FieldErrors) -> Error {
        Error::Validation(e)
    }
}
