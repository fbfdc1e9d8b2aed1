use paydesk_session::CookieJar;

/// Session cookies of an authenticated request.
///
/// Inserted by [`crate::middleware::require_session`]; a bearer token sent
/// without cookies is folded in as the `access_token` cookie.
#[derive(Debug, Clone)]
pub struct SessionContext {
    jar: CookieJar,
}

impl SessionContext {
    pub fn new(jar: CookieJar) -> Self {
        Self { jar }
    }

    pub fn into_jar(self) -> CookieJar {
        self.jar
    }
}
