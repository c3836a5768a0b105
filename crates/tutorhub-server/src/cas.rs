//! CAS 2.0 identity verifier.
//!
//! Login sends the browser to `{base}/login?service={callback}`. The ticket
//! the provider hands back is checked with `{base}/serviceValidate`, whose
//! XML body is parsed here.

use std::{collections::HashMap, time::Duration};

use quick_xml::events::Event;
use reqwest::{Client, Url};
use thiserror::Error;
use tracing::debug;
use tutorhub_core::identity::{Identity, IdentityVerifier};

#[derive(Debug, Error)]
pub enum CasError {
  #[error("invalid CAS url: {0}")]
  Url(String),

  #[error("CAS request failed: {0}")]
  Http(#[from] reqwest::Error),

  #[error("malformed CAS response: {0}")]
  Xml(String),

  #[error("CAS rejected ticket ({code}): {message}")]
  Rejected { code: String, message: String },

  #[error("CAS response is missing `{0}`")]
  MissingAttribute(&'static str),

  #[error("CAS npm is not numeric: {0:?}")]
  InvalidNpm(String),
}

/// The fields of a successful `serviceValidate` response that tutorhub uses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CasSuccess {
  pub user:   String,
  pub nama:   Option<String>,
  pub npm:    Option<String>,
  pub kd_org: Option<String>,
}

// ─── Verifier ────────────────────────────────────────────────────────────────

pub struct CasVerifier {
  client:        Client,
  login:         Url,
  logout:        Url,
  validate:      Url,
  org_faculties: HashMap<String, String>,
}

impl CasVerifier {
  /// `base_url` is the CAS root (e.g. `https://sso.ui.ac.id/cas2`);
  /// `service_url` is this server's callback.
  pub fn new(
    base_url: &str,
    service_url: &str,
    org_faculties: HashMap<String, String>,
  ) -> Result<Self, CasError> {
    let base = base_url.trim_end_matches('/');
    let service = [("service", service_url)];

    let login = Url::parse_with_params(&format!("{base}/login"), &service)
      .map_err(|e| CasError::Url(e.to_string()))?;
    let validate =
      Url::parse_with_params(&format!("{base}/serviceValidate"), &service)
        .map_err(|e| CasError::Url(e.to_string()))?;
    let logout = Url::parse(&format!("{base}/logout"))
      .map_err(|e| CasError::Url(e.to_string()))?;

    let client = Client::builder().timeout(Duration::from_secs(15)).build()?;

    Ok(Self { client, login, logout, validate, org_faculties })
  }

  fn identity(&self, success: CasSuccess) -> Result<Identity, CasError> {
    let npm = success.npm.ok_or(CasError::MissingAttribute("npm"))?;
    let npm = npm
      .trim()
      .parse::<i64>()
      .map_err(|_| CasError::InvalidNpm(npm.clone()))?;

    let faculty = success
      .kd_org
      .as_ref()
      .and_then(|code| self.org_faculties.get(code))
      .cloned();

    Ok(Identity {
      npm,
      username: success.user,
      name: success.nama.unwrap_or_default(),
      org_code: success.kd_org,
      faculty,
    })
  }
}

impl IdentityVerifier for CasVerifier {
  type Error = CasError;

  fn login_url(&self) -> String { self.login.to_string() }

  fn logout_url(&self, redirect: Option<&str>) -> String {
    let mut url = self.logout.clone();
    if let Some(redirect) = redirect {
      url.query_pairs_mut().append_pair("url", redirect);
    }
    url.to_string()
  }

  async fn verify(&self, ticket: &str) -> Result<Identity, CasError> {
    let body = self
      .client
      .get(self.validate.clone())
      .query(&[("ticket", ticket)])
      .send()
      .await?
      .error_for_status()?
      .text()
      .await?;

    let success = parse_service_response(&body)?;
    debug!(user = %success.user, "CAS ticket validated");
    self.identity(success)
  }
}

// ─── Response parsing ────────────────────────────────────────────────────────

/// Parse a CAS 2.0 `serviceResponse` document.
pub fn parse_service_response(xml: &str) -> Result<CasSuccess, CasError> {
  let mut reader = quick_xml::Reader::from_str(xml);
  reader.config_mut().trim_text(true);

  let mut path: Vec<String> = Vec::new();
  let mut success: Option<CasSuccess> = None;
  let mut failure: Option<(String, String)> = None;

  loop {
    match reader.read_event() {
      Ok(Event::Start(ref e)) => {
        let name = local_name(e.name().as_ref());
        match name.as_str() {
          "authenticationSuccess" => success = Some(CasSuccess::default()),
          "authenticationFailure" => {
            let code = e
              .attributes()
              .flatten()
              .find(|a| local_name(a.key.as_ref()) == "code")
              .map(|a| String::from_utf8_lossy(&a.value).into_owned())
              .unwrap_or_default();
            failure = Some((code, String::new()));
          }
          _ => {}
        }
        path.push(name);
      }
      Ok(Event::Empty(ref e)) => {
        if local_name(e.name().as_ref()) == "authenticationFailure" {
          failure = Some((String::new(), String::new()));
        }
      }
      Ok(Event::Text(ref e)) => {
        let text = e
          .unescape()
          .map_err(|e| CasError::Xml(e.to_string()))?
          .into_owned();
        let in_attributes = path.iter().any(|p| p == "attributes");

        match (path.last().map(String::as_str), success.as_mut()) {
          (Some("user"), Some(s)) if !in_attributes => s.user = text,
          (Some("nama"), Some(s)) if in_attributes => s.nama = Some(text),
          (Some("npm"), Some(s)) if in_attributes => s.npm = Some(text),
          (Some("kd_org"), Some(s)) if in_attributes => s.kd_org = Some(text),
          (Some("authenticationFailure"), _) => {
            if let Some((_, message)) = failure.as_mut() {
              message.push_str(&text);
            }
          }
          _ => {}
        }
      }
      Ok(Event::End(_)) => {
        path.pop();
      }
      Ok(Event::Eof) => break,
      Err(e) => return Err(CasError::Xml(e.to_string())),
      _ => {}
    }
  }

  if let Some((code, message)) = failure {
    return Err(CasError::Rejected { code, message });
  }
  let success =
    success.ok_or_else(|| CasError::Xml("no authentication result".into()))?;
  if success.user.is_empty() {
    return Err(CasError::MissingAttribute("user"));
  }
  Ok(success)
}

fn local_name(name: &[u8]) -> String {
  let local = match name.iter().rposition(|&b| b == b':') {
    Some(pos) => &name[pos + 1..],
    None => name,
  };
  String::from_utf8_lossy(local).into_owned()
}
