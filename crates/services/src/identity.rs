//! Session and identity provider.
//!
//! The backing auth service is an external collaborator; this module
//! models it as the [`SessionProvider`] trait so components receive
//! identity as injected context instead of reading ambient globals.
//! State changes fan out to subscribed [`AuthObserver`]s.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use async_trait::async_trait;
use chrono::Utc;
use common::UserId;
use domain::Role;
use serde::{Deserialize, Serialize};
use store::{
    DeliveryProfileRecord, FarmProfileRecord, MarketStore, ProfileRecord, StoreError,
};
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Opaque bearer token identifying a live session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(Uuid);

impl SessionToken {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for SessionToken {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A signed-in identity, passed explicitly to every service call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub token: SessionToken,
    pub user_id: UserId,
    pub email: String,
    pub full_name: String,
    pub role: Role,
}

/// Auth state transitions delivered to subscribers.
#[derive(Debug, Clone)]
pub enum AuthEvent {
    SignedIn { session: Session },
    SignedOut { session: Session },
}

/// Callback contract for auth state changes.
pub trait AuthObserver: Send + Sync {
    fn on_auth_event(&self, event: &AuthEvent);
}

/// Farm fields collected at farmer sign-up.
#[derive(Debug, Clone, Deserialize)]
pub struct FarmDetails {
    pub farm_name: String,
    pub farm_address: String,
    pub farm_description: Option<String>,
    pub farm_size: Option<String>,
    pub organic_certified: bool,
}

/// Delivery fields collected at consumer sign-up.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeliveryPreferences {
    pub delivery_address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub preferences: Option<String>,
}

/// Everything needed to create an account.
#[derive(Debug, Clone, Deserialize)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub role: Role,
    pub farm: Option<FarmDetails>,
    pub delivery: Option<DeliveryPreferences>,
}

/// Errors raised by the session provider.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// A required field is blank.
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    /// The email is already registered.
    #[error("email is already registered")]
    EmailTaken,

    /// Farmer accounts must include farm details.
    #[error("farm details are required for farmer sign-up")]
    MissingFarmDetails,

    /// Unknown email or wrong password.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// Password hashing failed.
    #[error("password hashing failed: {0}")]
    Hashing(String),

    /// The backing store reported a failure.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// The external identity collaborator's contract.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Creates an account, its profile rows, and a first session.
    async fn sign_up(&self, request: SignUpRequest) -> Result<Session, IdentityError>;

    /// Exchanges credentials for a session.
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, IdentityError>;

    /// Ends a session. Unknown tokens are a no-op.
    async fn sign_out(&self, token: SessionToken) -> Result<(), IdentityError>;

    /// Resolves a token to its live session, if any.
    async fn current_session(&self, token: SessionToken) -> Option<Session>;

    /// Registers an observer for subsequent auth state changes.
    fn subscribe(&self, observer: Arc<dyn AuthObserver>);
}

struct Credentials {
    user_id: UserId,
    password_hash: String,
}

/// In-process session provider backed by the market store's profile rows.
///
/// Stands in for the hosted auth service: it keeps credentials and live
/// sessions in memory while profiles (and farm/delivery rows) land in the
/// store at sign-up.
pub struct InMemorySessions<S> {
    store: Arc<S>,
    credentials: RwLock<HashMap<String, Credentials>>,
    sessions: RwLock<HashMap<SessionToken, Session>>,
    observers: Mutex<Vec<Arc<dyn AuthObserver>>>,
}

impl<S: MarketStore> InMemorySessions<S> {
    /// Creates a provider on top of the given store.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            credentials: RwLock::new(HashMap::new()),
            sessions: RwLock::new(HashMap::new()),
            observers: Mutex::new(Vec::new()),
        }
    }

    fn notify(&self, event: &AuthEvent) {
        let observers = self.observers.lock().unwrap_or_else(|e| e.into_inner());
        for observer in observers.iter() {
            observer.on_auth_event(event);
        }
    }

    async fn open_session(&self, profile: &ProfileRecord) -> Session {
        let session = Session {
            token: SessionToken::new(),
            user_id: profile.id,
            email: profile.email.clone(),
            full_name: profile.full_name.clone(),
            role: profile.role,
        };
        self.sessions
            .write()
            .await
            .insert(session.token, session.clone());
        session
    }
}

fn validate_sign_up(request: &SignUpRequest) -> Result<(), IdentityError> {
    for (field, value) in [
        ("email", &request.email),
        ("password", &request.password),
        ("full_name", &request.full_name),
    ] {
        if value.trim().is_empty() {
            return Err(IdentityError::MissingField { field });
        }
    }
    if request.role == Role::Farmer && request.farm.is_none() {
        return Err(IdentityError::MissingFarmDetails);
    }
    Ok(())
}

fn hash_password(password: &str) -> Result<String, IdentityError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| IdentityError::Hashing(e.to_string()))
}

fn verify_password(stored_hash: &str, password: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[async_trait]
impl<S: MarketStore> SessionProvider for InMemorySessions<S> {
    #[tracing::instrument(skip(self, request), fields(email = %request.email, role = %request.role))]
    async fn sign_up(&self, request: SignUpRequest) -> Result<Session, IdentityError> {
        validate_sign_up(&request)?;

        {
            let credentials = self.credentials.read().await;
            if credentials.contains_key(&request.email) {
                return Err(IdentityError::EmailTaken);
            }
        }

        let now = Utc::now();
        let profile = ProfileRecord {
            id: UserId::new(),
            email: request.email.clone(),
            full_name: request.full_name.clone(),
            phone: request.phone.clone(),
            avatar_url: None,
            role: request.role,
            created_at: now,
            updated_at: now,
        };

        self.store
            .insert_profile(profile.clone())
            .await
            .map_err(|e| match e {
                StoreError::Constraint { ref constraint } if constraint.contains("email") => {
                    IdentityError::EmailTaken
                }
                other => IdentityError::Store(other),
            })?;

        match request.role {
            Role::Farmer => {
                let Some(farm) = request.farm.as_ref() else {
                    return Err(IdentityError::MissingFarmDetails);
                };
                self.store
                    .upsert_farm_profile(FarmProfileRecord {
                        farmer_id: profile.id,
                        farm_name: farm.farm_name.clone(),
                        farm_address: farm.farm_address.clone(),
                        farm_description: farm.farm_description.clone(),
                        farm_size: farm.farm_size.clone(),
                        organic_certified: farm.organic_certified,
                        rating: 0.0,
                        total_ratings: 0,
                        created_at: now,
                        updated_at: now,
                    })
                    .await?;
            }
            Role::Consumer => {
                let delivery = request.delivery.clone().unwrap_or_default();
                self.store
                    .upsert_delivery_profile(DeliveryProfileRecord {
                        consumer_id: profile.id,
                        delivery_address: delivery.delivery_address,
                        city: delivery.city,
                        postal_code: delivery.postal_code,
                        preferences: delivery.preferences,
                        created_at: now,
                        updated_at: now,
                    })
                    .await?;
            }
            Role::Admin => {}
        }

        let password_hash = hash_password(&request.password)?;
        self.credentials.write().await.insert(
            request.email.clone(),
            Credentials {
                user_id: profile.id,
                password_hash,
            },
        );

        let session = self.open_session(&profile).await;
        self.notify(&AuthEvent::SignedIn {
            session: session.clone(),
        });
        tracing::info!(user_id = %profile.id, "account created");
        Ok(session)
    }

    #[tracing::instrument(skip(self, password))]
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, IdentityError> {
        let user_id = {
            let credentials = self.credentials.read().await;
            let entry = credentials
                .get(email)
                .ok_or(IdentityError::InvalidCredentials)?;
            if !verify_password(&entry.password_hash, password) {
                return Err(IdentityError::InvalidCredentials);
            }
            entry.user_id
        };

        let profile = self
            .store
            .get_profile(user_id)
            .await?
            .ok_or(IdentityError::InvalidCredentials)?;

        let session = self.open_session(&profile).await;
        self.notify(&AuthEvent::SignedIn {
            session: session.clone(),
        });
        Ok(session)
    }

    async fn sign_out(&self, token: SessionToken) -> Result<(), IdentityError> {
        let removed = self.sessions.write().await.remove(&token);
        if let Some(session) = removed {
            self.notify(&AuthEvent::SignedOut { session });
        }
        Ok(())
    }

    async fn current_session(&self, token: SessionToken) -> Option<Session> {
        self.sessions.read().await.get(&token).cloned()
    }

    fn subscribe(&self, observer: Arc<dyn AuthObserver>) {
        self.observers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(observer);
    }
}
