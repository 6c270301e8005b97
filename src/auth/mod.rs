use actix_web::http::header;
use actix_web::HttpRequest;
use anyhow::{bail, ensure};
use constant_time_eq::constant_time_eq;
use thiserror::Error;

const USER_SEPARATOR: char = ',';
const FIELD_SEPARATOR: char = ':';
const BASIC_AUTH_PREFIX: &str = "Basic ";

/// The authenticated caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Principal {
    pub display_name: String,
    // The name the backend sees in `user.name`.
    pub backend_username: String,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing credentials")]
    MissingCredentials,
    #[error("malformed authorization header")]
    MalformedHeader,
    #[error("invalid credentials")]
    InvalidCredentials,
}

pub trait AuthProvider: Send + Sync {
    fn authenticate(&self, req: &HttpRequest) -> Result<Principal, AuthError>;
}

#[derive(Clone)]
pub struct UserEntry {
    pub name: String,
    pub secret: String,
    pub backend_user: String,
}

impl std::fmt::Debug for UserEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserEntry")
            .field("name", &self.name)
            .field("backend_user", &self.backend_user)
            .finish()
    }
}

/// Parses a `name:secret:backend_user,...` table. An empty string yields no users.
pub fn parse_users(s: &str) -> anyhow::Result<Vec<UserEntry>> {
    let mut users: Vec<UserEntry> = Vec::new();
    for entry in s.split(USER_SEPARATOR) {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let fields: Vec<&str> = entry.splitn(3, FIELD_SEPARATOR).collect();
        if fields.len() != 3 {
            bail!("invalid user entry '{}', expected name:secret:backend_user", entry);
        }
        let (name, secret, backend_user) = (fields[0], fields[1], fields[2]);
        ensure!(!name.is_empty(), "user name should not be empty");
        ensure!(!secret.is_empty(), "secret of user {} should not be empty", name);
        ensure!(
            !backend_user.is_empty(),
            "backend user of {} should not be empty",
            name
        );
        if users.iter().any(|u| u.name == name) {
            bail!("duplicate user {}", name);
        }
        users.push(UserEntry {
            name: name.to_owned(),
            secret: secret.to_owned(),
            backend_user: backend_user.to_owned(),
        });
    }
    Ok(users)
}

/// HTTP Basic authentication against a fixed user table.
pub struct StaticUserProvider {
    users: Vec<UserEntry>,
}

impl StaticUserProvider {
    pub fn new(users: Vec<UserEntry>) -> Self {
        StaticUserProvider { users }
    }

    pub fn verify(&self, name: &str, secret: &str) -> Result<Principal, AuthError> {
        // Every entry is compared so the lookup time does not depend on the match.
        let mut found: Option<&UserEntry> = None;
        for user in &self.users {
            let name_eq = constant_time_eq(user.name.as_bytes(), name.as_bytes());
            let secret_eq = constant_time_eq(user.secret.as_bytes(), secret.as_bytes());
            if name_eq && secret_eq && found.is_none() {
                found = Some(user);
            }
        }
        found
            .map(|user| Principal {
                display_name: user.name.clone(),
                backend_username: user.backend_user.clone(),
            })
            .ok_or(AuthError::InvalidCredentials)
    }
}

impl AuthProvider for StaticUserProvider {
    fn authenticate(&self, req: &HttpRequest) -> Result<Principal, AuthError> {
        let value = req
            .headers()
            .get(header::AUTHORIZATION)
            .ok_or(AuthError::MissingCredentials)?;
        let (name, secret) = parse_basic_auth(value.as_bytes())?;
        self.verify(&name, &secret)
    }
}

fn parse_basic_auth(value: &[u8]) -> Result<(String, String), AuthError> {
    let value = std::str::from_utf8(value).map_err(|_| AuthError::MalformedHeader)?;
    if value.len() < BASIC_AUTH_PREFIX.len()
        || !value[..BASIC_AUTH_PREFIX.len()].eq_ignore_ascii_case(BASIC_AUTH_PREFIX)
    {
        return Err(AuthError::MalformedHeader);
    }
    let decoded = base64::decode(value[BASIC_AUTH_PREFIX.len()..].trim())
        .map_err(|_| AuthError::MalformedHeader)?;
    let decoded = String::from_utf8(decoded).map_err(|_| AuthError::MalformedHeader)?;
    match decoded.split_once(FIELD_SEPARATOR) {
        Some((name, secret)) => Ok((name.to_owned(), secret.to_owned())),
        None => Err(AuthError::MalformedHeader),
    }
}

#[cfg(test)]
mod tests {
    use actix_web::test::TestRequest;

    use super::*;

    fn provider() -> StaticUserProvider {
        StaticUserProvider::new(parse_users("alice:s3cret:hdfs_alice, bob:pw:bob").unwrap())
    }

    fn basic(name: &str, secret: &str) -> String {
        format!("Basic {}", base64::encode(format!("{}:{}", name, secret)))
    }

    #[test]
    fn test_parse_users() {
        assert!(parse_users("").unwrap().is_empty());

        let users = parse_users("alice:s3:cret:hdfs").unwrap();
        assert_eq!(users[0].secret, "s3");
        assert_eq!(users[0].backend_user, "cret:hdfs");

        assert!(parse_users("alice:s3cret").is_err());
        assert!(parse_users("alice::hdfs").is_err());
        assert!(parse_users("a:b:c,a:d:e").is_err());
    }

    #[test]
    fn test_debug_hides_secret() {
        let users = parse_users("alice:s3cret:hdfs_alice").unwrap();
        assert!(!format!("{:?}", users[0]).contains("s3cret"));
    }

    #[test]
    fn test_authenticate() {
        let p = provider();

        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, basic("alice", "s3cret")))
            .to_http_request();
        assert_eq!(
            p.authenticate(&req).unwrap(),
            Principal {
                display_name: "alice".to_owned(),
                backend_username: "hdfs_alice".to_owned(),
            }
        );

        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, basic("alice", "wrong")))
            .to_http_request();
        assert_eq!(p.authenticate(&req), Err(AuthError::InvalidCredentials));

        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, basic("carol", "pw")))
            .to_http_request();
        assert_eq!(p.authenticate(&req), Err(AuthError::InvalidCredentials));

        let req = TestRequest::default().to_http_request();
        assert_eq!(p.authenticate(&req), Err(AuthError::MissingCredentials));

        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Bearer abc"))
            .to_http_request();
        assert_eq!(p.authenticate(&req), Err(AuthError::MalformedHeader));
    }
}
