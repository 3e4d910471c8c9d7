//! Test helpers for the Cloud Avenue API

use super::{Client, ConnectionConfig};

pub fn create_test_client(url: &str) -> Client {
    Client::with_token(url, "test-token", "org1", &ConnectionConfig::default()).unwrap()
}
