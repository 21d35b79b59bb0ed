//! Error taxonomy for the compose/publish flow
//!
//! Display strings are the messages shown to the user.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::Platform;

/// Message shown when a request fails without a server-supplied reason
pub const GENERIC_ERROR_MESSAGE: &str = "Une erreur est survenue. Vérifiez votre connexion et réessayez.";

/// Input rejected before any request is made
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Caption missing where the platform requires one
    #[error("Ajoutez une légende avant de continuer.")]
    EmptyCaption,
    /// No image or video picked
    #[error("Sélectionnez une image ou une vidéo.")]
    NoMedia,
    /// Caption (plus hashtags where counted) over the platform cap
    #[error("Votre texte dépasse la limite de {limit} caractères ({over} en trop).")]
    OverLimit {
        /// Platform cap
        limit: usize,
        /// Characters over the cap
        over: usize,
    },
    /// Media type the platform does not take
    #[error("{platform} n'accepte pas ce type de contenu ({media_type}).")]
    UnsupportedMedia {
        /// Target platform
        platform: Platform,
        /// Rejected media type
        media_type: &'static str,
    },
    /// TikTok source is a still image with no generated video
    #[error("TikTok n'accepte que des vidéos. Convertissez d'abord votre image en vidéo.")]
    VideoRequired,
    /// Hashtag empty after normalization
    #[error("Le hashtag est vide.")]
    EmptyHashtag,
    /// Hashtag cap reached
    #[error("Maximum {max} hashtags.")]
    TooManyHashtags {
        /// Platform cap
        max: usize,
    },
    /// Narration script missing
    #[error("Écrivez un script de narration.")]
    EmptyScript,
    /// Scheduling without a target platform
    #[error("Sélectionnez au moins une plateforme.")]
    NoPlatform,
    /// Scheduling in the past
    #[error("Choisissez une date dans le futur.")]
    PastSchedule,
}

/// Technical details of a failed publish, meant to be pasted to support
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportTicket {
    /// Platform the publish targeted
    pub platform: Platform,
    /// Failed action
    pub action: String,
    /// Error text
    pub error: String,
    /// Request context (media URL, caption length, ...)
    pub context: serde_json::Value,
    /// When the failure happened
    pub occurred_at: DateTime<Utc>,
}

impl SupportTicket {
    /// JSON payload for copy-paste into a support channel
    pub fn technical_details(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| self.error.clone())
    }
}

/// Error returned by the server with a message meant for the user
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ServerError {
    /// HTTP status
    pub status: u16,
    /// Server-supplied message
    pub message: String,
}

/// Errors of the compose/publish flow, each scoped to one user action
#[derive(Debug, Clone, thiserror::Error)]
pub enum FlowError {
    /// Blocked before any request
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Platform not linked; the user should go through the connect flow
    #[error("Connectez votre compte {platform} pour continuer.")]
    NotConnected {
        /// Platform to connect
        platform: Platform,
        /// Where the OAuth flow starts
        connect_url: Option<String>,
    },
    /// Guest tried something reserved to accounts
    #[error("{message}")]
    GuestUpsell {
        /// Platform involved
        platform: Platform,
        /// Upsell text
        message: String,
    },
    /// User declined the confirmation step
    #[error("Publication annulée.")]
    Cancelled,
    /// Audio was requested but the merged video is missing or stale
    #[error("La vidéo avec narration n'est pas prête. Relancez la fusion ou désactivez la narration.")]
    NarrationPending,
    /// Action not allowed in the current narration state
    #[error("Action « {action} » impossible à l'étape « {state} ».")]
    InvalidTransition {
        /// Current state
        state: &'static str,
        /// Attempted action
        action: &'static str,
    },
    /// External service failed
    #[error("{message}")]
    Service {
        /// Action that failed
        action: String,
        /// Message shown to the user
        message: String,
        /// Full error chain for logs
        detail: String,
    },
    /// Publish failed; details routed to support
    #[error("La publication sur {} a échoué. Contactez le support avec les détails techniques.", .0.platform)]
    Support(Box<SupportTicket>),
}

impl FlowError {
    /// Wrap a collaborator error, keeping the server message when there is one
    pub fn service(action: impl Into<String>, err: &anyhow::Error) -> Self {
        let message = err
            .downcast_ref::<ServerError>()
            .map_or_else(|| GENERIC_ERROR_MESSAGE.to_string(), |e| e.message.clone());
        Self::Service {
            action: action.into(),
            message,
            detail: format!("{err:#}"),
        }
    }

    /// Whether this error was raised before any network call
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
