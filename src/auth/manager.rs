use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::Arc;

use super::credentials::CredentialProvider;
use super::refresh;
use super::types::{Challenge, RefreshState, Session};
use crate::config::{ClientConfig, VerificationMode};
use crate::error::{AuthError, Result};
use crate::transport::{Host, Transport};

/// Outcome of a call to [`AuthManager::refresh`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// This thread performed the refresh
    Refreshed,
    /// Another thread renewed the token after our request was sent
    AlreadyRefreshed,
    /// Another thread was refreshing; we waited for it to finish
    Waited,
}

/// Authentication manager
/// Owns the session and coordinates token renewal across threads
///
/// Lock order: `refresh_gate` is only ever taken before `session`, and no
/// thread holding a `session` read guard touches `refresh_gate`.
pub struct AuthManager {
    /// Current credentials; readers attach tokens, writers renew or clear them
    session: RwLock<Session>,

    /// Elects a single refresher; guards the coordinator state
    refresh_gate: Mutex<RefreshState>,

    /// Long token acquisition strategy
    provider: Arc<dyn CredentialProvider>,

    /// Host serving the login and token endpoints
    token_host: Host,

    mode: VerificationMode,
}

impl AuthManager {
    pub fn new(config: &ClientConfig) -> Self {
        let mode = config.verification_mode;
        Self {
            session: RwLock::new(Session::new()),
            refresh_gate: Mutex::new(RefreshState::Idle),
            provider: config.credential_source.clone().into_provider(mode),
            token_host: config.token_host().clone(),
            mode,
        }
    }

    /// Shared access for attaching the current short token
    pub fn read(&self) -> RwLockReadGuard<'_, Session> {
        self.session.read()
    }

    /// Exclusive access, blocking ordinary requests and refresh
    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, Session> {
        self.session.write()
    }

    pub(crate) fn provider(&self) -> &dyn CredentialProvider {
        self.provider.as_ref()
    }

    pub fn token_host(&self) -> &Host {
        &self.token_host
    }

    /// Current coordinator state; `Refreshing` while a refresh holds the gate
    ///
    /// Advisory only: a waiter briefly holds the gate after the refresh it
    /// waited on has finished, and is reported as `Refreshing` meanwhile.
    pub fn refresh_state(&self) -> RefreshState {
        self.refresh_gate
            .try_lock()
            .map(|state| *state)
            .unwrap_or(RefreshState::Refreshing)
    }

    /// React to a challenge observed on a request sent under `observed_generation`
    ///
    /// Exactly one thread of a concurrent burst performs the network refresh.
    /// Every other thread blocks until it is done and then returns without
    /// refreshing, whatever challenge type it saw.
    pub fn refresh(
        &self,
        transport: &dyn Transport,
        challenge: Challenge,
        observed_generation: u64,
    ) -> Result<RefreshOutcome> {
        let Some(mut state) = self.refresh_gate.try_lock() else {
            tracing::debug!("Token refresh in progress, waiting for it to finish");
            let state = self.refresh_gate.lock();
            tracing::debug!(state = ?*state, "Token refresh finished, retrying");
            return Ok(RefreshOutcome::Waited);
        };

        *state = RefreshState::Refreshing;
        let mut session = self.session.write();

        if session.generation() != observed_generation {
            tracing::debug!("Short token already renewed by another request");
            *state = RefreshState::Idle;
            return Ok(RefreshOutcome::AlreadyRefreshed);
        }

        match self.renew(transport, challenge, &mut session) {
            Ok(()) => {
                *state = RefreshState::Idle;
                Ok(RefreshOutcome::Refreshed)
            }
            Err(e) => {
                tracing::error!("Token refresh failed: {}", e);
                *state = RefreshState::Failed;
                Err(e)
            }
        }
    }

    fn renew(
        &self,
        transport: &dyn Transport,
        challenge: Challenge,
        session: &mut Session,
    ) -> Result<()> {
        if challenge == Challenge::ShortTokenExpired {
            if let Some(long_token) = session.long_token().map(str::to_string) {
                match refresh::renew_short_token(transport, &self.token_host, &long_token, self.mode)? {
                    Some(short_token) => {
                        session.renew_short_token(short_token);
                        return Ok(());
                    }
                    None => tracing::info!("Long token rejected, obtaining a new one"),
                }
            }
        }

        let long_token = self.provider.obtain_long_token(transport, &self.token_host)?;
        session.replace_long_token(long_token.clone());

        match refresh::renew_short_token(transport, &self.token_host, &long_token, self.mode)? {
            Some(short_token) => {
                session.renew_short_token(short_token);
                Ok(())
            }
            None => Err(AuthError::new(
                "unable to renew short-lived token after renewing long-lived token",
            )
            .with_status(401)
            .into()),
        }
    }
}
