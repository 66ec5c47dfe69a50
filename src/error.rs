use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

const INTERNAL_MESSAGE: &str = "Something went wrong. Please try again later.";

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<sea_orm::DbErr> for AppError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Internal(anyhow::Error::new(err))
    }
}

impl From<sea_orm::TransactionError<sea_orm::DbErr>> for AppError {
    fn from(err: sea_orm::TransactionError<sea_orm::DbErr>) -> Self {
        Self::Internal(anyhow::Error::new(err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::NotFound(what) => {
                let body = crate::templates::not_found_page(what);
                (StatusCode::NOT_FOUND, Html(body)).into_response()
            },
            AppError::Internal(err) => {
                tracing::error!(error = ?err, "request failed");
                let body = crate::templates::error_page(INTERNAL_MESSAGE.to_string());
                (StatusCode::INTERNAL_SERVER_ERROR, Html(body)).into_response()
            },
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;

    use super::*;

    #[tokio::test]
    async fn internal_errors_hide_details() {
        let err = AppError::from(sea_orm::DbErr::Custom("FOREIGN KEY constraint failed".to_string()));
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(body.contains(INTERNAL_MESSAGE));
        assert!(!body.contains("FOREIGN KEY"));
    }

    #[tokio::test]
    async fn not_found_names_the_missing_thing() {
        let resp = AppError::NotFound("movie").into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8(bytes.to_vec()).unwrap().contains("requested movie"));
    }
}
