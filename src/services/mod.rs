pub mod clock;
pub mod credentials;
pub mod maintenance;
pub mod password;
pub mod password_reset;
pub mod session_registry;
pub mod token_codec;
pub mod token_generator;

pub use clock::{Clock, ManualClock, SystemClock};
pub use credentials::{CredentialStore, InMemoryCredentialStore, UserRecord};
pub use maintenance::{MaintenanceScheduler, SweepReport};
pub use password_reset::{PasswordResetToken, PasswordResetTokenManager};
pub use session_registry::{Session, SessionRegistry};
pub use token_codec::{JwtTokenCodec, TokenCodec};
pub use token_generator::{SecureTokenGenerator, TokenGenerator};

pub mod auth_service;
pub mod auth_service_impl;
pub use auth_service::{
    AuthError, AuthSessionService, ClientContext, LoginResult, RefreshResult, SessionInfo,
    SessionStats, TokenPolicy, UserProfile, ValidatedSession,
};
pub use auth_service_impl::DefaultAuthSessionService;

pub mod password_reset_service;
pub mod password_reset_service_impl;
pub use password_reset_service::{PasswordResetError, PasswordResetService};
pub use password_reset_service_impl::SeaOrmPasswordResetService;

pub mod account_service;
pub mod account_service_impl;
pub use account_service::{AccountError, AccountService, AccountSummary};
pub use account_service_impl::SeaOrmAccountService;
