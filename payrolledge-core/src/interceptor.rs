// src/interceptor.rs

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, warn};

use crate::route::Route;
use crate::session::SessionContext;

/// Hook the API client runs when the backend answers 401.
#[async_trait]
pub trait ResponseInterceptor: Send + Sync {
    async fn on_unauthorized(&self, session: &SessionContext);
}

pub type RedirectCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Clears the session and hands the login path to the registered callback.
pub struct UnauthorizedRedirect {
    redirect: RedirectCallback,
}

impl UnauthorizedRedirect {
    pub fn new<F>(redirect: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        Self {
            redirect: Arc::new(redirect),
        }
    }

    /// For terminal use: there is no page to move to, so tell the user where to go.
    pub fn logging() -> Self {
        Self::new(|path| {
            warn!(
                "Session expired or invalid. Sign in again ({}), then run `payrolledge session set-token <TOKEN>`.",
                path
            )
        })
    }
}

#[async_trait]
impl ResponseInterceptor for UnauthorizedRedirect {
    async fn on_unauthorized(&self, session: &SessionContext) {
        if let Err(e) = session.clear() {
            error!("Failed to clear session after 401: {}", e);
        }
        (self.redirect)(Route::Login.path());
    }
}
