pub mod api_key;
pub mod jwt;
pub mod password;

pub use api_key::generate_api_key;
pub use jwt::{create_token, verify_token, JwtConfig, TokenClaims};
pub use password::{hash_password, verify_password};
