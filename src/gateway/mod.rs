pub mod backend;
pub mod fixture;
pub mod http;
pub mod traits;
pub mod types;

pub use backend::Backend;
pub use traits::{AdminGateway, AuthGateway, ChatGateway, ResearchGateway};
pub use types::{ChatReply, ErrorKind, GatewayError};
