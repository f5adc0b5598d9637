use reqwest::blocking::Client;

use crate::config::StatsConfig;
use crate::error::Result;

const USER_AGENT: &str = "Mozilla/5.0 (compatible; stat_tables)";

pub fn build_http_client(config: &StatsConfig) -> Result<Client> {
    let client = Client::builder()
        .timeout(config.request_timeout)
        .user_agent(USER_AGENT)
        .build()?;
    Ok(client)
}
