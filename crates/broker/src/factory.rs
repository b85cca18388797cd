//! Construction of platform client handles
//!
//! The pool calls a `ClientFactory` on a cold key. The default builds a
//! `PlatformClient` directly; tests wrap it to count constructions.

use common::Secret;
use oauth::BoxFuture;
use platform::{ClientError, Platform, PlatformClient};

/// Builds a ready handle for one credential.
pub trait ClientFactory: Send + Sync {
    fn build<'a>(
        &'a self,
        platform: Platform,
        api_base: &'a str,
        credential: Secret<String>,
    ) -> BoxFuture<'a, Result<PlatformClient, ClientError>>;
}

/// Builds `PlatformClient`s over a fresh reqwest client per credential.
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpClientFactory;

impl ClientFactory for HttpClientFactory {
    fn build<'a>(
        &'a self,
        platform: Platform,
        api_base: &'a str,
        credential: Secret<String>,
    ) -> BoxFuture<'a, Result<PlatformClient, ClientError>> {
        Box::pin(async move { PlatformClient::new(platform, api_base, credential) })
    }
}
