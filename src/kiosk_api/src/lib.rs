pub mod client;
pub mod constants;
pub mod mail;
pub mod types;

#[cfg(not(tarpaulin_include))]
pub fn get_client() -> anyhow::Result<client::KioskWebClient> {
    client::KioskWebClient::new()
}
