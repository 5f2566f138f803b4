//! Token wallet display rules.
//!
//! No operation in this service moves tokens, so the authoritative balance is
//! the `users.token_balance` column and the session copy is a cache. Protected
//! views call [`resync_balance`] so the cache is corrected on every load.

use tracing::{debug, warn};

use crate::{auth::repo_types::Session, state::AppState};

/// Balance granted at registration, and shown when no session balance exists.
pub const STARTING_TOKENS: i64 = 120;

pub fn wallet_balance(session: Option<&Session>) -> i64 {
    session
        .map(|s| s.cached_token_balance)
        .unwrap_or(STARTING_TOKENS)
}

/// Re-read the balance from the user record and refresh the session cache
/// when it has drifted. Returns the session with the live balance.
pub async fn resync_balance(state: &AppState, mut session: Session) -> anyhow::Result<Session> {
    let Some(user) = state.users.find_by_id(session.user_id).await? else {
        warn!(user_id = %session.user_id, "session refers to a missing user");
        return Ok(session);
    };
    if user.token_balance != session.cached_token_balance {
        debug!(
            session_id = %session.id,
            cached = session.cached_token_balance,
            live = user.token_balance,
            "session balance resynchronised"
        );
        state
            .sessions
            .update_balance(session.id, user.token_balance)
            .await?;
        session.cached_token_balance = user.token_balance;
    }
    Ok(session)
}
