//! Optional authentication/authorization configuration for the management
//! gateway.
//!
//! When [`SecurityConfig`] is absent the gateway serves every request with no
//! behavior change beyond skipping enforcement; the conformance harness runs
//! with it disabled. When present, a tonic interceptor requires a bearer
//! token accepted by one of the per-issuer authenticators and records an
//! audit line per authenticated request.

use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use tonic::service::Interceptor;
use tonic::Request;
use tonic::Status;

use crate::KvStore;
use crate::LogSink;
use crate::Result;

const ROLE_KEY_PREFIX: &str = "role/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    pub username: String,
    pub issuer: String,
}

pub trait Authenticator: Send + Sync {
    fn authenticate(
        &self,
        token: &str,
    ) -> std::result::Result<Claims, String>;
}

/// Authenticator comparing the presented token against a shared secret.
pub struct SharedSecretAuthenticator {
    secret: String,
    issuer: String,
    username: String,
}

impl SharedSecretAuthenticator {
    pub fn new(
        secret: &str,
        issuer: &str,
        username: &str,
    ) -> Self {
        Self {
            secret: secret.to_string(),
            issuer: issuer.to_string(),
            username: username.to_string(),
        }
    }
}

impl Authenticator for SharedSecretAuthenticator {
    fn authenticate(
        &self,
        token: &str,
    ) -> std::result::Result<Claims, String> {
        if token == self.secret {
            Ok(Claims {
                username: self.username.clone(),
                issuer: self.issuer.clone(),
            })
        } else {
            Err("invalid token".to_string())
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SdkRole {
    pub name: String,
    pub rules: Vec<String>,
}

/// Role definitions persisted in the kv store, seeded with the built-in
/// admin and view roles.
pub struct RoleManager {
    kv: Arc<KvStore>,
}

impl RoleManager {
    pub fn new(kv: Arc<KvStore>) -> Result<Self> {
        let rm = Self { kv };
        for role in [
            SdkRole {
                name: "system.admin".to_string(),
                rules: vec!["*".to_string()],
            },
            SdkRole {
                name: "system.view".to_string(),
                rules: vec!["enumerate".to_string(), "inspect".to_string()],
            },
        ] {
            rm.update(&role)?;
        }
        Ok(rm)
    }

    pub fn update(
        &self,
        role: &SdkRole,
    ) -> Result<()> {
        self.kv.put(&format!("{}{}", ROLE_KEY_PREFIX, role.name), role)
    }

    pub fn inspect(
        &self,
        name: &str,
    ) -> Result<Option<SdkRole>> {
        self.kv.get(&format!("{}{}", ROLE_KEY_PREFIX, name))
    }
}

/// Security configuration of the management gateway. Absent by default.
pub struct SecurityConfig {
    pub role: Arc<RoleManager>,
    pub authenticators: HashMap<String, Arc<dyn Authenticator>>,
}

/// Request interceptor mounted on the management gateway's services.
///
/// Pass-through when no security configuration is present.
#[derive(Clone)]
pub struct AuthInterceptor {
    security: Option<Arc<SecurityConfig>>,
    audit: LogSink,
}

impl AuthInterceptor {
    pub fn new(
        security: Option<Arc<SecurityConfig>>,
        audit: LogSink,
    ) -> Self {
        Self { security, audit }
    }
}

impl Interceptor for AuthInterceptor {
    fn call(
        &mut self,
        request: Request<()>,
    ) -> std::result::Result<Request<()>, Status> {
        let Some(security) = &self.security else {
            return Ok(request);
        };

        let token = request
            .metadata()
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("bearer "))
            .ok_or_else(|| Status::unauthenticated("missing bearer token"))?;

        for (issuer, authenticator) in &security.authenticators {
            if let Ok(claims) = authenticator.authenticate(token) {
                let mut audit = self.audit.lock();
                let _ = writeln!(audit, "audit: issuer={} username={}", issuer, claims.username);
                return Ok(request);
            }
        }

        Err(Status::unauthenticated("no authenticator accepted the token"))
    }
}
