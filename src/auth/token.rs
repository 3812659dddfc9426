use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};

type HmacSha256 = Hmac<Sha256>;

const TOKEN_EXPIRY_SECONDS: u64 = 86400; // 24 hours

/// What a valid seat token proves
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeatClaims {
    pub game_id: String,
    pub player_id: String,
    pub expiry: u64,
}

fn unix_now() -> Result<u64, String> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|e| format!("System time error: {}", e))
}

fn sign(payload: &str, secret_key: &str) -> Result<HmacSha256, String> {
    let mut mac = HmacSha256::new_from_slice(secret_key.as_bytes())
        .map_err(|e| format!("HMAC initialization error: {}", e))?;
    mac.update(payload.as_bytes());
    Ok(mac)
}

/// Issue a signed token binding a player to their seat in a game
///
/// # Returns
///
/// Token string in format: `game_id:player_id:expiry.signature`
pub fn issue_seat_token(
    game_id: &str,
    player_id: &str,
    secret_key: &str,
) -> Result<String, String> {
    let expiry = unix_now()? + TOKEN_EXPIRY_SECONDS;
    let payload = format!("{}:{}:{}", game_id, player_id, expiry);

    let signature = sign(&payload, secret_key)?.finalize().into_bytes();

    Ok(format!("{}.{}", payload, URL_SAFE_NO_PAD.encode(signature)))
}

/// Verify a seat token against the current time
pub fn verify_seat_token(token: &str, secret_key: &str) -> Option<SeatClaims> {
    verify_seat_token_at(token, secret_key, unix_now().ok()?)
}

/// Verify a seat token as of `now` (unix seconds)
///
/// Signature comparison is constant-time (`verify_slice`).
pub fn verify_seat_token_at(token: &str, secret_key: &str, now: u64) -> Option<SeatClaims> {
    let (payload, signature_b64) = token.split_once('.')?;
    if signature_b64.contains('.') {
        return None;
    }

    let mut parts = payload.split(':');
    let (game_id, player_id, expiry) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() || game_id.is_empty() || player_id.is_empty() {
        return None;
    }

    let expiry: u64 = expiry.parse().ok()?;
    if now > expiry {
        return None;
    }

    let provided_signature = URL_SAFE_NO_PAD.decode(signature_b64).ok()?;
    sign(payload, secret_key)
        .ok()?
        .verify_slice(&provided_signature)
        .ok()?;

    Some(SeatClaims {
        game_id: game_id.to_string(),
        player_id: player_id.to_string(),
        expiry,
    })
}
