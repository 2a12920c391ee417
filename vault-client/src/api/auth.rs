//! Auth methods: tokens, AppRole, userpass and Kubernetes.

use super::{KeyList, join};
use crate::{
    client::VaultClient,
    codec::{
        AuthInfo, LeasedResponse, WrapInfo, comma_list, duration, epoch_or_timestamp, option_duration,
        option_epoch_or_timestamp, string_or_object,
    },
    error::VaultResult,
    request::VaultRequest,
    transport::Method,
};
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{collections::HashMap, fmt, time::Duration};

type LoginRequest = VaultRequest<LeasedResponse<Value, AuthInfo>>;

#[derive(Serialize)]
struct AppRoleLogin<'b> {
    role_id: &'b str,
    secret_id: &'b str,
}

#[derive(Serialize)]
struct PasswordLogin<'b> {
    password: &'b str,
}

#[derive(Serialize)]
struct JwtLogin<'b> {
    role: &'b str,
    jwt: &'b str,
}

#[derive(Serialize)]
struct Increment {
    #[serde(with = "option_duration", skip_serializing_if = "Option::is_none")]
    increment: Option<Duration>,
}

pub(crate) fn approle_login(mount: &str, role_id: &str, secret_id: &SecretString) -> VaultResult<LoginRequest> {
    Ok(LoginRequest::leased(Method::Post, join(&["auth", mount, "login"]))
        .with_operation("approle.login")
        .with_body(&AppRoleLogin {
            role_id,
            secret_id: secret_id.expose_secret(),
        })?
        .unauthenticated())
}

pub(crate) fn userpass_login(mount: &str, username: &str, password: &SecretString) -> VaultResult<LoginRequest> {
    Ok(LoginRequest::leased(Method::Post, join(&["auth", mount, "login", username]))
        .with_operation("userpass.login")
        .with_body(&PasswordLogin {
            password: password.expose_secret(),
        })?
        .unauthenticated())
}

pub(crate) fn kubernetes_login(mount: &str, role: &str, jwt: &SecretString) -> VaultResult<LoginRequest> {
    Ok(LoginRequest::leased(Method::Post, join(&["auth", mount, "login"]))
        .with_operation("kubernetes.login")
        .with_body(&JwtLogin {
            role,
            jwt: jwt.expose_secret(),
        })?
        .unauthenticated())
}

pub(crate) fn token_renew_self(increment: Option<Duration>) -> VaultResult<LoginRequest> {
    LoginRequest::leased(Method::Post, "auth/token/renew-self")
        .with_operation("token.renew_self")
        .with_body(&Increment { increment })
}

/// `data` of `auth/token/lookup-self`.
#[derive(Clone, Deserialize)]
pub struct TokenLookup {
    /// Token accessor
    #[serde(default)]
    pub accessor: String,
    /// Creation time
    #[serde(with = "epoch_or_timestamp")]
    pub creation_time: DateTime<Utc>,
    /// TTL at creation
    #[serde(default, with = "duration")]
    pub creation_ttl: Duration,
    /// Display name
    #[serde(default)]
    pub display_name: String,
    /// Identity entity id
    #[serde(default)]
    pub entity_id: String,
    /// Expiry, `None` for tokens without TTL
    #[serde(default, with = "option_epoch_or_timestamp")]
    pub expire_time: Option<DateTime<Utc>>,
    /// Hard TTL ceiling
    #[serde(default, with = "duration")]
    pub explicit_max_ttl: Duration,
    /// The token itself
    #[serde(default)]
    pub id: String,
    /// Attached policies
    #[serde(default)]
    pub policies: Vec<String>,
    /// Whether the token can be renewed
    #[serde(default)]
    pub renewable: bool,
    /// Remaining TTL
    #[serde(default, with = "duration")]
    pub ttl: Duration,
    /// `service` or `batch`
    #[serde(default, rename = "type")]
    pub token_type: String,
}

impl fmt::Debug for TokenLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenLookup")
            .field("accessor", &self.accessor)
            .field("id", &"[REDACTED]")
            .field("display_name", &self.display_name)
            .field("policies", &self.policies)
            .field("ttl", &self.ttl)
            .field("expire_time", &self.expire_time)
            .finish_non_exhaustive()
    }
}

/// Parameters of `auth/token/create`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TokenCreateRequest {
    /// Policies of the new token
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub policies: Vec<String>,
    /// Initial TTL
    #[serde(with = "option_duration", skip_serializing_if = "Option::is_none")]
    pub ttl: Option<Duration>,
    /// Hard TTL ceiling
    #[serde(with = "option_duration", skip_serializing_if = "Option::is_none")]
    pub explicit_max_ttl: Option<Duration>,
    /// Display name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Number of uses, 0 for unlimited
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_uses: Option<u32>,
    /// Whether the token can be renewed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub renewable: Option<bool>,
    /// Create an orphan token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_parent: Option<bool>,
    /// Token metadata
    #[serde(rename = "meta", skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

/// The token auth method.
#[derive(Debug, Clone, Copy)]
pub struct Token<'a> {
    client: &'a VaultClient,
}

impl<'a> Token<'a> {
    pub(crate) const fn new(client: &'a VaultClient) -> Self {
        Self { client }
    }

    /// Look up the client's own token.
    ///
    /// # Errors
    ///
    /// Any error of the call.
    pub async fn lookup_self(&self) -> VaultResult<TokenLookup> {
        let request = VaultRequest::<LeasedResponse<TokenLookup>>::leased(Method::Get, "auth/token/lookup-self")
            .with_operation("token.lookup_self");
        self.client.execute(request).await?.into_data()
    }

    /// Renew the client's own token.
    ///
    /// # Errors
    ///
    /// Any error of the call.
    pub async fn renew_self(&self, increment: Option<Duration>) -> VaultResult<AuthInfo> {
        self.client.execute(token_renew_self(increment)?).await?.into_auth()
    }

    /// Create a child token.
    ///
    /// # Errors
    ///
    /// Any error of the call.
    pub async fn create(&self, params: &TokenCreateRequest) -> VaultResult<AuthInfo> {
        let request = LoginRequest::leased(Method::Post, "auth/token/create")
            .with_operation("token.create")
            .with_body(params)?;
        self.client.execute(request).await?.into_auth()
    }

    /// Create a child token and return it wrapped for `wrap_ttl`.
    ///
    /// # Errors
    ///
    /// Any error of the call.
    pub async fn create_wrapped(&self, params: &TokenCreateRequest, wrap_ttl: Duration) -> VaultResult<WrapInfo> {
        let request = LoginRequest::leased(Method::Post, "auth/token/create")
            .with_operation("token.create")
            .with_wrap_ttl(wrap_ttl)
            .with_body(params)?;
        self.client.execute(request).await?.into_wrap_info()
    }
}

/// Parameters of `auth/approle/role/:name/secret-id`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SecretIdRequest {
    /// Metadata attached to the secret id
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "metadata_as_text")]
    pub metadata: Option<HashMap<String, String>>,
    /// CIDR blocks allowed to use the secret id
    #[serde(with = "comma_list", skip_serializing_if = "Vec::is_empty")]
    pub cidr_list: Vec<String>,
    /// CIDR blocks allowed to use tokens issued for it
    #[serde(with = "comma_list", skip_serializing_if = "Vec::is_empty")]
    pub token_bound_cidrs: Vec<String>,
    /// Secret id lifetime
    #[serde(with = "option_duration", skip_serializing_if = "Option::is_none")]
    pub ttl: Option<Duration>,
    /// Number of uses, 0 for unlimited
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_uses: Option<u32>,
}

// Vault takes secret-id metadata as JSON text
#[allow(clippy::ref_option)]
fn metadata_as_text<S: serde::Serializer>(
    value: &Option<HashMap<String, String>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(map) => {
            let text = serde_json::to_string(map).map_err(serde::ser::Error::custom)?;
            serializer.serialize_str(&text)
        }
        None => serializer.serialize_none(),
    }
}

/// A freshly generated secret id.
#[derive(Clone, Deserialize)]
pub struct SecretIdResponse {
    /// The secret id
    pub secret_id: String,
    /// Its accessor
    #[serde(default)]
    pub secret_id_accessor: String,
    /// Lifetime
    #[serde(default, with = "duration")]
    pub secret_id_ttl: Duration,
    /// Number of uses, 0 for unlimited
    #[serde(default)]
    pub secret_id_num_uses: u32,
}

impl fmt::Debug for SecretIdResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretIdResponse")
            .field("secret_id", &"[REDACTED]")
            .field("secret_id_accessor", &self.secret_id_accessor)
            .field("secret_id_ttl", &self.secret_id_ttl)
            .finish_non_exhaustive()
    }
}

/// Properties of an existing secret id.
#[derive(Debug, Clone, Deserialize)]
pub struct SecretIdInfo {
    /// Its accessor
    #[serde(default)]
    pub secret_id_accessor: String,
    /// Creation time
    #[serde(default, with = "option_epoch_or_timestamp")]
    pub creation_time: Option<DateTime<Utc>>,
    /// Expiry, `None` when it never expires
    #[serde(default, with = "option_epoch_or_timestamp")]
    pub expiration_time: Option<DateTime<Utc>>,
    /// Metadata, sent by Vault either as an object or as JSON text
    #[serde(default, with = "string_or_object")]
    pub metadata: HashMap<String, String>,
    /// CIDR restrictions
    #[serde(default, with = "comma_list")]
    pub cidr_list: Vec<String>,
    /// Remaining uses
    #[serde(default)]
    pub secret_id_num_uses: u32,
    /// Lifetime
    #[serde(default, with = "duration")]
    pub secret_id_ttl: Duration,
}

#[derive(Deserialize)]
struct RoleId {
    role_id: String,
}

/// The AppRole auth method mounted at `mount`.
#[derive(Debug, Clone)]
pub struct AppRole<'a> {
    client: &'a VaultClient,
    mount: String,
}

impl<'a> AppRole<'a> {
    pub(crate) fn new(client: &'a VaultClient, mount: impl Into<String>) -> Self {
        Self {
            client,
            mount: mount.into(),
        }
    }

    /// Log in with a role id and secret id.
    ///
    /// # Errors
    ///
    /// Any error of the call; a decode error when no `auth` comes back.
    pub async fn login(&self, role_id: &str, secret_id: &SecretString) -> VaultResult<AuthInfo> {
        let request = approle_login(&self.mount, role_id, secret_id)?;
        self.client.execute(request).await?.into_auth()
    }

    /// Role id of `role`.
    ///
    /// # Errors
    ///
    /// Any error of the call.
    pub async fn read_role_id(&self, role: &str) -> VaultResult<String> {
        let request = VaultRequest::<LeasedResponse<RoleId>>::leased(
            Method::Get,
            join(&["auth", self.mount.as_str(), "role", role, "role-id"]),
        )
        .with_operation("approle.read_role_id");
        Ok(self.client.execute(request).await?.into_data()?.role_id)
    }

    /// Roles defined on this mount.
    ///
    /// # Errors
    ///
    /// [`VaultError::NotFound`](crate::VaultError::NotFound) when there are none.
    pub async fn list_roles(&self) -> VaultResult<Vec<String>> {
        let request = VaultRequest::<LeasedResponse<KeyList>>::leased(Method::List, join(&["auth", self.mount.as_str(), "role"]))
            .with_operation("approle.list_roles");
        Ok(self.client.execute(request).await?.into_data()?.keys)
    }

    fn secret_id_request(&self, role: &str, params: &SecretIdRequest) -> VaultResult<VaultRequest<LeasedResponse<SecretIdResponse>>> {
        VaultRequest::leased(Method::Post, join(&["auth", self.mount.as_str(), "role", role, "secret-id"]))
            .with_operation("approle.generate_secret_id")
            .with_body(params)
    }

    /// Generate a new secret id for `role`.
    ///
    /// # Errors
    ///
    /// Any error of the call.
    pub async fn generate_secret_id(&self, role: &str, params: &SecretIdRequest) -> VaultResult<SecretIdResponse> {
        let request = self.secret_id_request(role, params)?;
        self.client.execute(request).await?.into_data()
    }

    /// Generate a new secret id for `role`, returned wrapped for `wrap_ttl`.
    ///
    /// # Errors
    ///
    /// Any error of the call.
    pub async fn generate_wrapped_secret_id(
        &self,
        role: &str,
        params: &SecretIdRequest,
        wrap_ttl: Duration,
    ) -> VaultResult<WrapInfo> {
        let request = self.secret_id_request(role, params)?.with_wrap_ttl(wrap_ttl);
        self.client.execute(request).await?.into_wrap_info()
    }

    /// Properties of `secret_id`.
    ///
    /// # Errors
    ///
    /// Any error of the call.
    pub async fn lookup_secret_id(&self, role: &str, secret_id: &SecretString) -> VaultResult<SecretIdInfo> {
        #[derive(Serialize)]
        struct Body<'b> {
            secret_id: &'b str,
        }

        let request = VaultRequest::<LeasedResponse<SecretIdInfo>>::leased(
            Method::Post,
            join(&["auth", self.mount.as_str(), "role", role, "secret-id", "lookup"]),
        )
        .with_operation("approle.lookup_secret_id")
        .with_body(&Body {
            secret_id: secret_id.expose_secret(),
        })?;
        self.client.execute(request).await?.into_data()
    }
}

/// The userpass auth method mounted at `mount`.
#[derive(Debug, Clone)]
pub struct UserPass<'a> {
    client: &'a VaultClient,
    mount: String,
}

impl<'a> UserPass<'a> {
    pub(crate) fn new(client: &'a VaultClient, mount: impl Into<String>) -> Self {
        Self {
            client,
            mount: mount.into(),
        }
    }

    /// Log in as `username`.
    ///
    /// # Errors
    ///
    /// Any error of the call; a decode error when no `auth` comes back.
    pub async fn login(&self, username: &str, password: &SecretString) -> VaultResult<AuthInfo> {
        let request = userpass_login(&self.mount, username, password)?;
        self.client.execute(request).await?.into_auth()
    }
}

/// The Kubernetes auth method mounted at `mount`.
#[derive(Debug, Clone)]
pub struct Kubernetes<'a> {
    client: &'a VaultClient,
    mount: String,
}

impl<'a> Kubernetes<'a> {
    pub(crate) fn new(client: &'a VaultClient, mount: impl Into<String>) -> Self {
        Self {
            client,
            mount: mount.into(),
        }
    }

    /// Log in as `role` with a service account JWT.
    ///
    /// # Errors
    ///
    /// Any error of the call; a decode error when no `auth` comes back.
    pub async fn login(&self, role: &str, jwt: &SecretString) -> VaultResult<AuthInfo> {
        let request = kubernetes_login(&self.mount, role, jwt)?;
        self.client.execute(request).await?.into_auth()
    }
}
