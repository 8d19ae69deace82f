//! HTTP adapter for the portal: fixed header profile, explicit session, no retries.

use crate::portal::errors::PortalError;
use crate::portal::session::{SESSION_COOKIE, Session};
use rand::seq::IndexedRandom;
use reqwest::header::{self, HeaderMap};
use reqwest::{Method, Response};
use std::time::Duration;
use tracing::trace;

/// Landing page; issues the anonymous session id.
pub const INDEX_PATH: &str = "/index.php";
/// Authenticated home page, also used as the `Referer` for API calls.
pub const MEDIA_PATH: &str = "/media.php";

const ACCEPT_JSON: &str = "application/json, text/javascript, */*; q=0.01";
const CONTENT_TYPE_FORM: &str = "application/x-www-form-urlencoded; charset=UTF-8";

/// Desktop browser user agents rotated per request.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64) Gecko/20100101 Firefox/130.0",
    "Mozilla/5.0 (X11; Arch Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/129.0.6065.0 Safari/537.36",
    "Mozilla/5.0 (X11; Arch Linux x86_64; rv:129.0) Gecko/20100101 Firefox/129.0",
    "Mozilla/5.0 (X11; Fedora; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/128.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Fedora; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 13_5_1) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.7 Safari/605.1.15",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 13_5_1) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36",
];

/// Pick a user agent uniformly at random.
pub fn random_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

/// Encode `fields` as an `application/x-www-form-urlencoded` body, keeping order.
pub fn form_body(fields: &[(&str, &str)]) -> String {
    fields
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Value of the last usable portal session cookie set by `resp`.
pub fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|raw| cookie::Cookie::parse(raw).ok())
        .filter(|c| c.name() == SESSION_COOKIE && !c.value().is_empty() && c.value() != "deleted")
        .last()
        .map(|c| c.value().to_string())
}

/// Thin wrapper over `reqwest` that speaks to one portal instance.
///
/// The client never stores cookies itself; the caller passes the [`Session`]
/// to attach on every call.
#[derive(Debug, Clone)]
pub struct PortalClient {
    http: reqwest::Client,
    base_url: String,
}

impl PortalClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, PortalError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Underlying HTTP client, for calls that do not go to the portal.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Send a request with the portal header profile and return the raw response.
    ///
    /// Only transport failures are errors here; status is left to the caller.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<String>,
        session: &Session,
        referer_path: &str,
    ) -> Result<Response, PortalError> {
        let url = self.url(path);
        let mut req = self
            .http
            .request(method.clone(), &url)
            .header(header::USER_AGENT, random_user_agent())
            .header("X-Requested-With", "XMLHttpRequest")
            .header(header::REFERER, self.url(referer_path))
            .header(header::ORIGIN, &self.base_url)
            .header(header::ACCEPT, ACCEPT_JSON);

        if let Some(body) = body {
            req = req
                .header(header::CONTENT_TYPE, CONTENT_TYPE_FORM)
                .body(body);
        }
        if !session.is_empty() {
            req = req.header(header::COOKIE, session.header_value());
        }

        trace!(%method, url = %url, "portal request");
        Ok(req.send().await?)
    }

    /// Issue a request and return the body of a `200 OK` response.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<String>,
        session: &Session,
    ) -> Result<Vec<u8>, PortalError> {
        let resp = self.send(method, path, body, session, MEDIA_PATH).await?;
        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            return Err(PortalError::Status {
                status: status.as_u16(),
                url: self.url(path),
            });
        }
        Ok(resp.bytes().await?.to_vec())
    }

    /// POST an encoded form and return the body of a `200 OK` response.
    pub async fn post_form(
        &self,
        path: &str,
        fields: &[(&str, &str)],
        session: &Session,
    ) -> Result<Vec<u8>, PortalError> {
        self.request(Method::POST, path, Some(form_body(fields)), session)
            .await
    }

    /// POST a pre-encoded body and decode the JSON reply.
    pub async fn post_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: Option<String>,
        session: &Session,
    ) -> Result<T, PortalError> {
        let bytes = self.request(Method::POST, path, body, session).await?;
        crate::portal::json::decode(&bytes).map_err(|source| PortalError::Malformed {
            url: self.url(path),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_form_body_encodes_and_keeps_order() {
        let body = form_body(&[("username", "a b"), ("password", "p&w=1"), ("x", "")]);
        assert_eq!(body, "username=a%20b&password=p%26w%3D1&x=");
    }

    #[test]
    fn test_session_cookie_picks_last_valid() {
        let mut headers = HeaderMap::new();
        headers.append(
            header::SET_COOKIE,
            HeaderValue::from_static("PHPSESSID=first; path=/"),
        );
        headers.append(
            header::SET_COOKIE,
            HeaderValue::from_static("other=1; path=/"),
        );
        headers.append(
            header::SET_COOKIE,
            HeaderValue::from_static("PHPSESSID=second; path=/; HttpOnly"),
        );
        headers.append(
            header::SET_COOKIE,
            HeaderValue::from_static("PHPSESSID=deleted; expires=Thu, 01 Jan 1970 00:00:01 GMT"),
        );
        assert_eq!(session_cookie(&headers).as_deref(), Some("second"));
    }

    #[test]
    fn test_session_cookie_absent() {
        let mut headers = HeaderMap::new();
        headers.append(header::SET_COOKIE, HeaderValue::from_static("lang=id"));
        assert_eq!(session_cookie(&headers), None);
    }

    #[test]
    fn test_random_user_agent_from_pool() {
        for _ in 0..32 {
            assert!(USER_AGENTS.contains(&random_user_agent()));
        }
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = PortalClient::new("https://siakad.example.ac.id/", Duration::from_secs(5)).unwrap();
        assert_eq!(client.url(INDEX_PATH), "https://siakad.example.ac.id/index.php");
    }
}
