//! Login and per-session request plumbing.
//!
//! A [`SessionState`] is one provider plus one member's cookies. It is created
//! by [`SessionManager::login`], lives only for the enclosing engine call, and
//! is deliberately not serializable. Requests sent through it carry the
//! session cookies and race the session's [`AbortHandle`].

use std::sync::Arc;

use courtside_core::{Credential, Region};
use tracing::{debug, info, warn};

use crate::abort::AbortHandle;
use crate::config::ProviderConfig;
use crate::cookies::CookieJar;
use crate::error::{ProviderError, ProviderResult};
use crate::transport::{
    HttpRequest, HttpResponse, HttpTransport, check_status, form_body, resolve_location,
};

/// An authenticated session with one provider.
#[derive(Debug)]
pub struct SessionState {
    region: Region,
    jar: CookieJar,
    member_id: String,
    abort: AbortHandle,
}

impl SessionState {
    /// Wraps an already-populated cookie jar.
    pub fn new(region: Region, member_id: impl Into<String>, jar: CookieJar, abort: AbortHandle) -> Self {
        Self {
            region,
            jar,
            member_id: member_id.into(),
            abort,
        }
    }

    pub fn region(&self) -> Region {
        self.region
    }

    /// Site login id the session is bound to.
    pub fn member_id(&self) -> &str {
        &self.member_id
    }

    pub fn cookies(&self) -> &CookieJar {
        &self.jar
    }

    pub fn abort_handle(&self) -> &AbortHandle {
        &self.abort
    }

    /// Sends a read-only request. Cookies set by the response are not kept.
    pub async fn send(
        &self,
        transport: &dyn HttpTransport,
        what: &str,
        request: HttpRequest,
    ) -> ProviderResult<HttpResponse> {
        let request = with_cookies(request, &self.jar);
        let response = self.abort.guard(what, transport.send(request)).await?;
        check_status(response)
    }

    /// Sends a request and merges any cookies it sets into the session.
    pub async fn send_and_merge(
        &mut self,
        transport: &dyn HttpTransport,
        what: &str,
        request: HttpRequest,
    ) -> ProviderResult<HttpResponse> {
        let request = with_cookies(request, &self.jar);
        let response = self.abort.guard(what, transport.send(request)).await?;
        self.jar.absorb(&response);
        check_status(response)
    }
}

fn with_cookies(request: HttpRequest, jar: &CookieJar) -> HttpRequest {
    match jar.header_value() {
        Some(cookie) => request.with_header("Cookie", cookie),
        None => request,
    }
}

/// Describes one site's login form.
#[derive(Debug, Clone)]
pub struct LoginFlow {
    /// Page fetched first to seed cookies.
    pub login_page: &'static str,
    /// Form action receiving the credential.
    pub login_action: &'static str,
    pub id_field: &'static str,
    pub password_field: &'static str,
    /// Fixed hidden fields the form also posts.
    pub extra_fields: &'static [(&'static str, &'static str)],
    /// Page that only renders for a logged-in member.
    pub landing: &'static str,
    /// Text present on the landing page when logged in.
    pub success_marker: &'static str,
    /// Text in the login response that means the credential was refused.
    pub failure_markers: &'static [&'static str],
}

/// Authenticates against one provider.
pub struct SessionManager {
    transport: Arc<dyn HttpTransport>,
    config: ProviderConfig,
    flow: LoginFlow,
    region: Region,
}

impl SessionManager {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        config: ProviderConfig,
        flow: LoginFlow,
        region: Region,
    ) -> Self {
        Self {
            transport,
            config,
            flow,
            region,
        }
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Logs in with `credential`.
    ///
    /// On failure no session is returned and every cookie collected along
    /// the way is dropped.
    pub async fn login(
        &self,
        credential: &Credential,
        abort: AbortHandle,
    ) -> ProviderResult<SessionState> {
        let provider = self.region.provider_name();
        self.run_login(credential, abort)
            .await
            .map_err(|e| e.with_provider(provider))
    }

    async fn run_login(
        &self,
        credential: &Credential,
        abort: AbortHandle,
    ) -> ProviderResult<SessionState> {
        abort.check("login")?;
        debug!(region = %self.region, member_id = %credential.id, "Logging in");

        let mut jar = CookieJar::new();
        let login_page = self.config.url(self.flow.login_page);

        let (_, seeded) = self
            .follow(&mut jar, &abort, HttpRequest::get(&login_page))
            .await?;
        check_status(seeded)?;

        let mut fields = vec![
            (self.flow.id_field, credential.id.as_str()),
            (self.flow.password_field, credential.password()),
        ];
        fields.extend(self.flow.extra_fields.iter().copied());
        let post = HttpRequest::post_form(self.config.url(self.flow.login_action), form_body(&fields))
            .with_header("Referer", login_page.as_str());

        let (after_post, response) = self.follow(&mut jar, &abort, post).await?;
        let response = check_status(response)?;

        if let Some(marker) = self
            .flow
            .failure_markers
            .iter()
            .find(|m| response.body.contains(**m))
        {
            warn!(region = %self.region, member_id = %credential.id, marker, "Login refused");
            return Err(ProviderError::authentication("the site refused the login"));
        }
        if self.is_login_page(&after_post) {
            warn!(region = %self.region, member_id = %credential.id, "Login bounced back to the login page");
            return Err(ProviderError::authentication("the site refused the login"));
        }

        let (landed_at, landing) = self
            .follow(&mut jar, &abort, HttpRequest::get(self.config.url(self.flow.landing)))
            .await?;
        let landing = check_status(landing)?;

        if self.is_login_page(&landed_at) || !landing.body.contains(self.flow.success_marker) {
            warn!(region = %self.region, member_id = %credential.id, "Landing page is not authenticated");
            return Err(ProviderError::authentication(
                "login did not produce an authenticated session",
            ));
        }

        info!(region = %self.region, member_id = %credential.id, cookies = jar.len(), "Logged in");
        Ok(SessionState::new(self.region, credential.id.clone(), jar, abort))
    }

    /// Sends `request`, following redirects by hand and absorbing cookies
    /// from every hop. Returns the final URL and response.
    async fn follow(
        &self,
        jar: &mut CookieJar,
        abort: &AbortHandle,
        request: HttpRequest,
    ) -> ProviderResult<(String, HttpResponse)> {
        let mut current = request;
        for hop in 0..=self.config.max_redirects {
            let url = current.url.clone();
            let response = abort
                .guard("login", self.transport.send(with_cookies(current, jar)))
                .await?;
            let stored = jar.absorb(&response);
            debug!(hop, url = %url, status = response.status, stored, "Login hop");

            if !response.is_redirect() {
                return Ok((url, response));
            }
            let Some(location) = response.location() else {
                return Err(ProviderError::invalid_response(format!(
                    "redirect from {} has no Location header",
                    url
                )));
            };
            current = HttpRequest::get(resolve_location(&url, location)?);
        }

        Err(ProviderError::invalid_response(format!(
            "more than {} redirects during login",
            self.config.max_redirects
        )))
    }

    fn is_login_page(&self, url: &str) -> bool {
        let path = self.flow.login_page.trim_start_matches('/');
        url::Url::parse(url)
            .map(|u| u.path().trim_start_matches('/').ends_with(path))
            .unwrap_or(false)
    }
}
