pub mod auth;
pub mod delivery;

pub use auth::{
    AuthService, ClientFactory, CredentialsProvider, DefaultClientFactory, StdinCredentialsProvider,
};
pub use delivery::{DeliveryService, IssueSender};
