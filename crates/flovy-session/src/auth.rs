//! Auth-state binding.
//!
//! Couples the identity provider's auth-state stream to the session
//! manager: the inactivity clock runs exactly while a user is signed in.
//! A sign-out (including the one the timeout itself triggers) fires the
//! cascade hook so per-user state, like stored calendar tokens, gets
//! cleared.
//!
//! Only observed edges act. In particular, a stream that starts out with
//! no user - the page-transition case - must not trigger the sign-out
//! cascade; the cascade requires a present-to-absent transition.

use flovy_core::UserId;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::manager::SessionManager;

type Hook = Box<dyn FnMut(&UserId) + Send>;

/// Binds an auth-state stream to a [`SessionManager`].
pub struct AuthBinding {
    session: SessionManager,
    on_sign_in: Option<Hook>,
    on_sign_out: Option<Hook>,
}

impl AuthBinding {
    /// Creates a binding for the given session manager.
    pub fn new(session: SessionManager) -> Self {
        Self {
            session,
            on_sign_in: None,
            on_sign_out: None,
        }
    }

    /// Hook invoked when a user signs in.
    pub fn on_sign_in(mut self, hook: impl FnMut(&UserId) + Send + 'static) -> Self {
        self.on_sign_in = Some(Box::new(hook));
        self
    }

    /// Hook invoked when the signed-in user signs out.
    ///
    /// This is where per-user cleanup (clearing stored calendar
    /// accounts) belongs.
    pub fn on_sign_out(mut self, hook: impl FnMut(&UserId) + Send + 'static) -> Self {
        self.on_sign_out = Some(Box::new(hook));
        self
    }

    /// Consumes the auth-state stream until the sender goes away.
    ///
    /// A user already present when the stream is first observed starts
    /// the session; an initial absence does nothing.
    pub async fn run(mut self, mut rx: watch::Receiver<Option<UserId>>) {
        let mut current: Option<UserId> = rx.borrow_and_update().clone();
        if let Some(ref user) = current {
            self.handle_sign_in(user.clone());
        }

        while rx.changed().await.is_ok() {
            let next = rx.borrow_and_update().clone();
            match (current.take(), next) {
                (None, Some(user)) => {
                    self.handle_sign_in(user.clone());
                    current = Some(user);
                }
                (Some(user), None) => {
                    self.handle_sign_out(&user);
                    current = None;
                }
                (Some(previous), Some(user)) => {
                    if previous != user {
                        // User switched identities in one step: cascade
                        // for the old user, fresh clock for the new one.
                        self.handle_sign_out(&previous);
                        self.handle_sign_in(user.clone());
                    }
                    current = Some(user);
                }
                (None, None) => {}
            }
        }

        debug!("auth-state stream closed");
    }

    fn handle_sign_in(&mut self, user: UserId) {
        info!(user = %user, "user signed in - starting session clock");
        self.session.start();
        if let Some(ref mut hook) = self.on_sign_in {
            hook(&user);
        }
    }

    fn handle_sign_out(&mut self, user: &UserId) {
        info!(user = %user, "user signed out - stopping session clock");
        self.session.stop();
        if let Some(ref mut hook) = self.on_sign_out {
            hook(user);
        }
    }
}
