use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Payload of the signed session cookie. Only the session id travels to the
/// client; everything else lives in the server-side session store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sid: Uuid,   // session ID
    pub iat: usize,  // issued at (unix timestamp)
    pub exp: usize,  // expires at (unix timestamp)
    pub iss: String, // issuer
}
