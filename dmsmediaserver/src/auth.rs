//! Capacité d'autorisation.
//!
//! La politique (listes d'adresses, user-agents, comptes) appartient à un
//! collaborateur externe : le cœur ne connaît que le contrat
//! `authorize(headers, remote) -> bool` et court-circuite toute requête
//! refusée avant la moindre résolution de contenu. Les requêtes loopback
//! ne sont jamais soumises à l'autorisateur.

use axum::http::HeaderMap;
use std::net::SocketAddr;

/// Contrat d'autorisation injecté dans chaque montage.
pub trait Authorizer: Send + Sync {
    /// Décide si la requête est admise. `remote` est absent quand le
    /// transport n'a pas fourni d'adresse distante.
    fn authorize(&self, headers: &HeaderMap, remote: Option<SocketAddr>) -> bool;
}

/// Autorisateur par défaut : tout le monde est admis.
#[derive(Debug, Default, Clone)]
pub struct AllowAll;

impl Authorizer for AllowAll {
    fn authorize(&self, _headers: &HeaderMap, _remote: Option<SocketAddr>) -> bool {
        true
    }
}

/// Vrai si la requête échappe au contrôle d'autorisation (loopback).
pub fn is_loopback(remote: Option<SocketAddr>) -> bool {
    remote.is_some_and(|addr| addr.ip().is_loopback())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loopback_detection() {
        let local: SocketAddr = "127.0.0.1:5000".parse().unwrap();
        let lan: SocketAddr = "10.0.0.17:5000".parse().unwrap();
        assert!(is_loopback(Some(local)));
        assert!(!is_loopback(Some(lan)));
        assert!(!is_loopback(None));
    }

    #[test]
    fn test_allow_all() {
        let lan: SocketAddr = "10.0.0.17:5000".parse().unwrap();
        assert!(AllowAll.authorize(&HeaderMap::new(), Some(lan)));
    }
}
