//! Couche de réponse ressource : du média résolu à la réponse HTTP.
//!
//! L'accès aux octets passe par le collaborateur [`MediaStreams`]; le cœur
//! se charge de la sémantique HTTP (Range, en-têtes, 206/416) et stream le
//! corps paresseusement via `ReaderStream` : un gros fichier n'est jamais
//! bufferisé en entier, la contre-pression est déléguée au transport.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use std::io::SeekFrom;
use std::path::PathBuf;
use tokio::io::{AsyncRead, AsyncSeekExt};
use tokio_util::io::ReaderStream;

use dmsmodel::Resource;

use crate::errors::HandlerError;

/// Corps ouvert par le fournisseur d'octets.
pub struct MediaBody {
    /// Lecteur positionné à l'offset demandé.
    pub reader: Box<dyn AsyncRead + Send + Unpin>,
    /// Taille totale de l'objet complet, si connue.
    pub total_len: Option<u64>,
    /// Type MIME du corps.
    pub mime_type: String,
}

/// Fournisseur d'octets pour les corps principaux, pochettes et sous-titres.
#[async_trait]
pub trait MediaStreams: Send + Sync {
    /// Ouvre le corps principal à partir de `offset`.
    ///
    /// Un offset au-delà de la fin retourne un lecteur vide, `total_len`
    /// restant celle de l'objet complet : l'appelant décide du 416.
    async fn open(&self, resource: &Resource, offset: u64) -> std::io::Result<MediaBody>;

    /// Ouvre la pochette, `None` si la ressource n'en a pas.
    async fn open_cover(&self, resource: &Resource) -> std::io::Result<Option<MediaBody>>;

    /// Ouvre les sous-titres, `None` si la ressource n'en a pas.
    async fn open_subtitle(&self, resource: &Resource) -> std::io::Result<Option<MediaBody>>;
}

/// Fournisseur par défaut : fichiers locaux désignés par les propriétés
/// `location`, `cover_location` et `subtitle_location` de la ressource.
#[derive(Debug, Default, Clone)]
pub struct FsMediaStreams;

impl FsMediaStreams {
    async fn open_path(path: PathBuf, offset: u64, mime_type: String) -> std::io::Result<MediaBody> {
        let mut file = tokio::fs::File::open(path).await?;
        let total = file.metadata().await?.len();
        file.seek(SeekFrom::Start(offset.min(total))).await?;
        Ok(MediaBody {
            reader: Box::new(file),
            total_len: Some(total),
            mime_type,
        })
    }
}

#[async_trait]
impl MediaStreams for FsMediaStreams {
    async fn open(&self, resource: &Resource, offset: u64) -> std::io::Result<MediaBody> {
        let location = resource.location().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "resource has no location")
        })?;
        Self::open_path(PathBuf::from(location), offset, resource.mime_type.clone()).await
    }

    async fn open_cover(&self, resource: &Resource) -> std::io::Result<Option<MediaBody>> {
        match resource.properties.get("cover_location") {
            Some(path) => {
                let mime = resource
                    .properties
                    .get("cover_mime")
                    .cloned()
                    .unwrap_or_else(|| "image/jpeg".to_string());
                Self::open_path(PathBuf::from(path), 0, mime).await.map(Some)
            }
            None => Ok(None),
        }
    }

    async fn open_subtitle(&self, resource: &Resource) -> std::io::Result<Option<MediaBody>> {
        match resource.properties.get("subtitle_location") {
            Some(path) => Self::open_path(PathBuf::from(path), 0, "text/srt".to_string())
                .await
                .map(Some),
            None => Ok(None),
        }
    }
}

/// Fenêtre demandée par un en-tête `Range: bytes=...`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeSpec {
    /// `bytes=a-b` inclusif
    FromTo(u64, u64),
    /// `bytes=a-`
    From(u64),
    /// `bytes=-n` : les n derniers octets
    Suffix(u64),
}

impl RangeSpec {
    /// Parse un en-tête Range. `None` pour toute forme non comprise : le
    /// serveur sert alors l'objet entier, comme l'autorise HTTP.
    pub fn parse(header: &str) -> Option<RangeSpec> {
        let spec = header.strip_prefix("bytes=")?.trim();
        // Une seule plage supportée.
        if spec.contains(',') {
            return None;
        }
        let (start, end) = spec.split_once('-')?;
        match (start.is_empty(), end.is_empty()) {
            (true, false) => end.parse().ok().map(RangeSpec::Suffix),
            (false, true) => start.parse().ok().map(RangeSpec::From),
            (false, false) => {
                let s: u64 = start.parse().ok()?;
                let e: u64 = end.parse().ok()?;
                (s <= e).then_some(RangeSpec::FromTo(s, e))
            }
            (true, true) => None,
        }
    }

    /// Résout la fenêtre en (offset, longueur) dans un objet de `total`
    /// octets. `None` si la plage est insatisfaisable.
    pub fn resolve(&self, total: u64) -> Option<(u64, u64)> {
        match *self {
            RangeSpec::FromTo(start, end) => {
                (start < total).then(|| (start, end.min(total - 1) - start + 1))
            }
            RangeSpec::From(start) => (start < total).then(|| (start, total - start)),
            RangeSpec::Suffix(n) => {
                if n == 0 {
                    None
                } else {
                    let len = n.min(total);
                    Some((total - len, len))
                }
            }
        }
    }
}

/// Construit la réponse HTTP d'un corps média, plage comprise.
///
/// Sans Range : 200 avec l'objet complet. Avec Range satisfaisable : 206 et
/// `Content-Range`. Plage insatisfaisable : 416 avec `Content-Range: bytes */total`.
pub async fn resource_response(
    streams: &dyn MediaStreams,
    resource: &Resource,
    range_header: Option<&str>,
) -> Result<Response, HandlerError> {
    let range = range_header.and_then(RangeSpec::parse);

    // Premier accès pour connaître la taille totale.
    let probe = streams
        .open(resource, 0)
        .await
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => HandlerError::NotFound(resource.id.clone()),
            _ => HandlerError::Internal(e.into()),
        })?;

    let mut headers = HeaderMap::new();
    headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&probe.mime_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );
    if let Some(modified) = resource.modified {
        let value = modified.format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        if let Ok(value) = HeaderValue::from_str(&value) {
            headers.insert(header::LAST_MODIFIED, value);
        }
    }

    match (range, probe.total_len) {
        (Some(range), Some(total)) => match range.resolve(total) {
            Some((offset, len)) => {
                let body = if offset == 0 {
                    probe
                } else {
                    streams
                        .open(resource, offset)
                        .await
                        .map_err(|e| HandlerError::Internal(e.into()))?
                };
                headers.insert(
                    header::CONTENT_RANGE,
                    HeaderValue::from_str(&format!(
                        "bytes {}-{}/{}",
                        offset,
                        offset + len - 1,
                        total
                    ))
                    .map_err(|e| HandlerError::Internal(e.into()))?,
                );
                headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
                let window = tokio::io::AsyncReadExt::take(body.reader, len);
                Ok((
                    StatusCode::PARTIAL_CONTENT,
                    headers,
                    Body::from_stream(ReaderStream::new(window)),
                )
                    .into_response())
            }
            None => {
                headers.insert(
                    header::CONTENT_RANGE,
                    HeaderValue::from_str(&format!("bytes */{}", total))
                        .map_err(|e| HandlerError::Internal(e.into()))?,
                );
                Ok((StatusCode::RANGE_NOT_SATISFIABLE, headers).into_response())
            }
        },
        _ => {
            if let Some(total) = probe.total_len {
                headers.insert(header::CONTENT_LENGTH, HeaderValue::from(total));
            }
            Ok((
                StatusCode::OK,
                headers,
                Body::from_stream(ReaderStream::new(probe.reader)),
            )
                .into_response())
        }
    }
}
