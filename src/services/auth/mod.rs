pub mod credentials;
pub mod factory;
pub mod jwt;
pub mod scope;
pub mod session;

pub use factory::build_session_validator;
pub use jwt::JwtSessionValidator;
pub use session::{Session, SessionConfigError, SessionResult, SessionValidator};
