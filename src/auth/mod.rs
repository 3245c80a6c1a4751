//! Credentials: password hashing, JWT pairs, API tokens and the request
//! extractor that turns an `Authorization` header into an [`AuthContext`].

mod context;
pub mod jwt;
mod middleware;
mod password;
pub mod token;

pub use context::{AuthContext, AuthType};
pub use jwt::{Claims, JwtIssuer, TokenPair, TokenType};
pub use middleware::{AuthError, RequireAuth};
pub use password::PasswordManager;
