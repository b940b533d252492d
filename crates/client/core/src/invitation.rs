//! Out-of-band invitation handshake.
//!
//! Player 1 signs a partial authorization offline and hands the encoded
//! token to Player 2 over any channel (chat, URL, clipboard). Decoding is
//! pure and local so the counterparty can inspect the session id,
//! proposer, and stake before deciding to finalize. The embedded stake is
//! advisory: the counterparty supplies its own stake at finalize time and
//! the contract enforces any required relationship.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use game_core::{PlayerAddress, SessionId};

/// Query parameter carrying an invitation in a share URL.
const AUTH_PARAM: &str = "auth=";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvitationError {
    /// The decoder is the proposer: playing against yourself is refused
    /// before any remote call is attempted.
    #[error("this invitation was created by you; you cannot play against yourself")]
    SelfPlay,

    #[error("invitation is malformed: {0}")]
    Malformed(String),
}

/// Portable token letting a counterparty finalize session creation while
/// the proposer is offline.
///
/// Created once by Player 1, consumed exactly once by Player 2.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invitation {
    pub session_id: SessionId,
    pub proposer: PlayerAddress,
    pub proposer_stake: i128,
    /// Opaque offline-signed authorization produced by the wallet layer.
    pub authorization: String,
}

impl Invitation {
    pub fn new(
        session_id: SessionId,
        proposer: PlayerAddress,
        proposer_stake: i128,
        authorization: impl Into<String>,
    ) -> Self {
        Self {
            session_id,
            proposer,
            proposer_stake,
            authorization: authorization.into(),
        }
    }

    /// Encode to a copy-pasteable token.
    ///
    /// URL-safe base64 over JSON: survives clipboards and query strings
    /// without escaping.
    pub fn encode(&self) -> String {
        let json = serde_json::to_vec(self).expect("invitation serialization is infallible");
        URL_SAFE_NO_PAD.encode(json)
    }

    /// Decode a token, rejecting self-play.
    ///
    /// Pure and local; no network access, so the counterparty can
    /// inspect before committing anything.
    pub fn decode(raw: &str, local: &PlayerAddress) -> Result<Self, InvitationError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(raw.trim())
            .map_err(|e| InvitationError::Malformed(format!("base64: {e}")))?;
        let invitation: Invitation = serde_json::from_slice(&bytes)
            .map_err(|e| InvitationError::Malformed(format!("payload: {e}")))?;

        if &invitation.proposer == local {
            return Err(InvitationError::SelfPlay);
        }
        Ok(invitation)
    }

    /// Build a shareable deep link embedding this invitation.
    pub fn to_share_url(&self, origin: &str) -> String {
        format!("{origin}?game=pass&{AUTH_PARAM}{}", self.encode())
    }

    /// Extract and decode an invitation from a share URL.
    pub fn from_share_url(url: &str, local: &PlayerAddress) -> Result<Self, InvitationError> {
        // Anchored on the separator so a parameter merely ending in
        // "auth" (oauth=...) is never mistaken for ours.
        let start = url
            .find(&format!("?{AUTH_PARAM}"))
            .or_else(|| url.find(&format!("&{AUTH_PARAM}")))
            .ok_or_else(|| InvitationError::Malformed("missing auth parameter".to_string()))?
            + 1
            + AUTH_PARAM.len();
        let token = url[start..].split('&').next().unwrap_or_default();
        Self::decode(token, local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invitation() -> Invitation {
        Invitation::new(
            SessionId::new(77).unwrap(),
            PlayerAddress::new("alice"),
            10_000_000,
            "signed-auth-entry-xdr",
        )
    }

    #[test]
    fn round_trips_through_encode_decode() {
        let original = invitation();
        let decoded = Invitation::decode(&original.encode(), &PlayerAddress::new("bob")).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn token_is_query_string_safe() {
        // URL-safe alphabet, no padding: the token must embed in a query
        // string and come back out unchanged.
        let token = invitation().encode();
        assert!(
            token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn round_trips_through_a_share_url() {
        let original = invitation();
        let url = original.to_share_url("https://example.test/play");
        let decoded = Invitation::from_share_url(&url, &PlayerAddress::new("bob")).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn similarly_named_parameters_do_not_shadow_the_token() {
        let original = invitation();
        let bob = PlayerAddress::new("bob");

        // A parameter ending in "auth" before the real one must not be
        // picked up as the token.
        let url = format!(
            "https://example.test/play?oauth=zzz&auth={}",
            original.encode()
        );
        let decoded = Invitation::from_share_url(&url, &bob).unwrap();
        assert_eq!(decoded, original);

        // And with no real parameter at all, decoding fails cleanly.
        let err =
            Invitation::from_share_url("https://example.test/play?oauth=zzz", &bob).unwrap_err();
        assert!(matches!(err, InvitationError::Malformed(_)));
    }

    #[test]
    fn proposer_cannot_decode_own_invitation() {
        // Self-play is refused at decode time, before any remote call.
        let original = invitation();
        let err = Invitation::decode(&original.encode(), &PlayerAddress::new("alice")).unwrap_err();
        assert_eq!(err, InvitationError::SelfPlay);
    }

    #[test]
    fn garbage_is_rejected_as_malformed() {
        let bob = PlayerAddress::new("bob");
        assert!(matches!(
            Invitation::decode("not base64 at all!!!", &bob),
            Err(InvitationError::Malformed(_))
        ));
        let valid_b64 = URL_SAFE_NO_PAD.encode(b"{\"not\":\"an invitation\"}");
        assert!(matches!(
            Invitation::decode(&valid_b64, &bob),
            Err(InvitationError::Malformed(_))
        ));
    }

    #[test]
    fn whitespace_from_copy_paste_is_tolerated() {
        let original = invitation();
        let padded = format!("  {}\n", original.encode());
        let decoded = Invitation::decode(&padded, &PlayerAddress::new("bob")).unwrap();
        assert_eq!(decoded, original);
    }
}
