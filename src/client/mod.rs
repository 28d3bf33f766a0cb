//! Client half of the auth flow.
//!
//! [`SessionHolder`] keeps the signed-in `{user, token}` pair in durable
//! storage under the `cw_token` and `cw_user` keys so a session survives
//! reloads. [`AuthClient`] talks to the `/api/auth/*` endpoints.

mod http;
mod session;
mod storage;

pub use http::{AuthClient, ClientError};
pub use session::{SessionHolder, TOKEN_KEY, USER_KEY};
pub use storage::{FileStorage, MemoryStorage, SessionStorage, StorageError};
