//! Keystone v3 password authentication
//!
//! Exchanges a [`Profile`] for a [`Session`]: the token comes from the
//! `X-Subject-Token` header, the storage URL from the public `object-store`
//! endpoint of the service catalog, with its `AUTH_` account rewritten to the
//! scoped project.

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use swc_core::{Error, Profile, Result, Session, TimeoutConfig};

use crate::{http_client, map_transport};

const SUBJECT_TOKEN: &str = "X-Subject-Token";
const OBJECT_STORE: &str = "object-store";
const PUBLIC_INTERFACE: &str = "public";
const ACCOUNT_PREFIX: &str = "AUTH_";
const DEFAULT_DOMAIN: &str = "Default";

/// Client for the identity service
pub struct KeystoneClient {
    http: Client,
}

impl KeystoneClient {
    pub fn new(timeout: &TimeoutConfig) -> Result<Self> {
        Ok(Self {
            http: http_client(timeout)?,
        })
    }

    /// Authenticate with a password grant scoped to the profile's project
    #[tracing::instrument(skip_all, fields(auth_url = %profile.auth_url, user = %profile.username))]
    pub async fn authenticate(&self, profile: &Profile) -> Result<Session> {
        if profile.auth_url.trim().is_empty() {
            return Err(Error::Auth("no identity service URL".into()));
        }
        let url = format!("{}/auth/tokens", profile.auth_url.trim_end_matches('/'));
        tracing::debug!(%url, "requesting token");

        let response = self
            .http
            .post(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&TokenRequest::password(profile))
            .send()
            .await
            .map_err(map_transport)?;

        let status = response.status();
        if status != StatusCode::CREATED {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Auth(format!(
                "identity service answered {}: {}",
                status.as_u16(),
                body.trim()
            )));
        }

        let token = response
            .headers()
            .get(SUBJECT_TOKEN)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| Error::Auth(format!("response carries no {SUBJECT_TOKEN} header")))?;

        let endpoint = match &profile.storage_url {
            Some(url) => url.clone(),
            None => {
                let body = response.text().await.map_err(map_transport)?;
                storage_url(&body)?
            }
        };
        tracing::debug!(%endpoint, "resolved storage endpoint");

        Session::new(token, endpoint)
    }
}

/// Public object-store URL from a token response, bound to its project
fn storage_url(body: &str) -> Result<String> {
    let response: TokenResponse = serde_json::from_str(body)
        .map_err(|e| Error::Decode(format!("identity response: {e}")))?;
    let token = response.token;

    let project = token
        .project
        .ok_or_else(|| Error::Auth("token is not scoped to a project".into()))?;

    let url = token
        .catalog
        .iter()
        .find(|service| service.kind == OBJECT_STORE)
        .and_then(|service| {
            service
                .endpoints
                .iter()
                .find(|e| e.interface == PUBLIC_INTERFACE)
        })
        .map(|e| e.url.as_str())
        .ok_or_else(|| Error::Auth("no public object-store endpoint in the catalog".into()))?;

    Ok(rewrite_account(url, &project.id))
}

/// Replace the `AUTH_` account of `url` with `project_id`
fn rewrite_account(url: &str, project_id: &str) -> String {
    let base = match url.find(ACCOUNT_PREFIX) {
        Some(pos) => &url[..pos],
        None => url,
    };
    format!("{}/{ACCOUNT_PREFIX}{project_id}", base.trim_end_matches('/'))
}

#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    auth: AuthRequest<'a>,
}

#[derive(Debug, Serialize)]
struct AuthRequest<'a> {
    identity: Identity<'a>,
    scope: Scope<'a>,
}

#[derive(Debug, Serialize)]
struct Identity<'a> {
    methods: [&'static str; 1],
    password: PasswordMethod<'a>,
}

#[derive(Debug, Serialize)]
struct PasswordMethod<'a> {
    user: User<'a>,
}

#[derive(Debug, Serialize)]
struct User<'a> {
    name: &'a str,
    password: &'a str,
    domain: Domain<'a>,
}

#[derive(Debug, Serialize)]
struct Scope<'a> {
    project: Project<'a>,
}

#[derive(Debug, Serialize)]
struct Project<'a> {
    name: &'a str,
    domain: Domain<'a>,
}

#[derive(Debug, Serialize)]
struct Domain<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

impl<'a> Domain<'a> {
    /// Domain by id and/or name, falling back to the default domain
    fn new(id: Option<&'a str>, name: Option<&'a str>) -> Self {
        match (id, name) {
            (None, None) => Self {
                id: None,
                name: Some(DEFAULT_DOMAIN),
            },
            (id, name) => Self { id, name },
        }
    }
}

impl<'a> TokenRequest<'a> {
    fn password(profile: &'a Profile) -> Self {
        Self {
            auth: AuthRequest {
                identity: Identity {
                    methods: ["password"],
                    password: PasswordMethod {
                        user: User {
                            name: &profile.username,
                            password: &profile.password,
                            domain: Domain::new(
                                profile.user_domain_id.as_deref(),
                                profile.user_domain_name.as_deref(),
                            ),
                        },
                    },
                },
                scope: Scope {
                    project: Project {
                        name: &profile.project_name,
                        domain: Domain::new(
                            profile.project_domain_id.as_deref(),
                            profile.project_domain_name.as_deref(),
                        ),
                    },
                },
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: TokenBody,
}

#[derive(Debug, Deserialize)]
struct TokenBody {
    #[serde(default)]
    project: Option<ProjectRef>,
    #[serde(default)]
    catalog: Vec<CatalogEntry>,
}

#[derive(Debug, Deserialize)]
struct ProjectRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct CatalogEntry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    endpoints: Vec<CatalogEndpoint>,
}

#[derive(Debug, Deserialize)]
struct CatalogEndpoint {
    interface: String,
    url: String,
}
