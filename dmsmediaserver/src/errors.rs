//! Taxonomie d'erreurs du handler protocolaire.
//!
//! Toutes les défaillances d'une requête sont portées par un unique signal
//! [`HandlerError`], levé n'importe où sous le handler et traduit en
//! réponse wire à la frontière de dispatch : rien ne se propage au-delà.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Signal de défaillance d'une requête.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// Id inconnu, chemin non mappé, ou capacité absente de la ressource.
    #[error("not found: {0}")]
    NotFound(String),

    /// Refus de l'autorisateur pour une requête non-loopback.
    #[error("access denied")]
    Denied,

    /// Enveloppe SOAP malformée. Traduit en SOAP Fault sur le chemin de
    /// contrôle, jamais en erreur HTTP nue.
    #[error("malformed SOAP request: {0}")]
    BadProtocol(String),

    /// Défaillance inattendue en construisant une réponse.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        let status = match &self {
            HandlerError::NotFound(what) => {
                tracing::debug!(what = %what, "resource not found");
                StatusCode::NOT_FOUND
            }
            HandlerError::Denied => StatusCode::FORBIDDEN,
            HandlerError::BadProtocol(reason) => {
                tracing::debug!(reason = %reason, "malformed request outside control path");
                StatusCode::BAD_REQUEST
            }
            HandlerError::Internal(e) => {
                tracing::error!("internal error building response: {:#}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        status.into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let r = HandlerError::NotFound("x".into()).into_response();
        assert_eq!(r.status(), StatusCode::NOT_FOUND);

        let r = HandlerError::Denied.into_response();
        assert_eq!(r.status(), StatusCode::FORBIDDEN);

        let r = HandlerError::Internal(anyhow::anyhow!("boom")).into_response();
        assert_eq!(r.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
