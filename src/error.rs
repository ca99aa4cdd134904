use rocket::http::Status;
use rocket::response::{self, Responder, Response};
use rocket::serde::json::Json;
use rocket::Request;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt document {path}: {source}")]
    CorruptDocument {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> Status {
        match self {
            AppError::MalformedInput(_) => Status::BadRequest,
            AppError::NotFound(_) => Status::NotFound,
            AppError::Io(_) | AppError::CorruptDocument { .. } | AppError::Internal(_) => {
                Status::InternalServerError
            }
        }
    }
}

impl<'r> Responder<'r, 'static> for AppError {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        let status = self.status();
        if status.code >= 500 {
            log::error!("{} {} failed: {}", req.method(), req.uri(), self);
        } else {
            log::warn!("{} {} rejected: {}", req.method(), req.uri(), self);
        }

        let body = Json(serde_json::json!({ "error": self.to_string() }));
        Response::build_from(body.respond_to(req)?)
            .status(status)
            .ok()
    }
}
