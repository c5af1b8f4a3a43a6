//! Caller identity resolution.

use super::request::RequestMetadata;

/// Identity used when no usable metadata is present.
pub const UNKNOWN_IDENTITY: &str = "unknown";

/// Trait for deriving a stable caller identity from request metadata.
///
/// Resolution never fails: implementations fall back to a sentinel rather
/// than erroring, so the request path stays free of exceptional control flow.
pub trait IdentityResolver: Send + Sync {
    /// Produce the identity string for this request.
    fn resolve(&self, request: &RequestMetadata) -> String;
}

/// The default resolver.
///
/// Prefers the first entry of the `X-Forwarded-For` chain, then the direct
/// peer address. The forwarded-for header is forgeable, so identities are
/// stable but not cryptographically unique; that is an accepted property of
/// address-based limiting, not a defect.
#[derive(Debug, Clone, Copy, Default)]
pub struct ForwardedForResolver;

impl IdentityResolver for ForwardedForResolver {
    fn resolve(&self, request: &RequestMetadata) -> String {
        if let Some(forwarded) = request.header("x-forwarded-for") {
            if let Some(first) = forwarded.split(',').next() {
                let first = first.trim();
                if !first.is_empty() {
                    return first.to_string();
                }
            }
        }

        if let Some(addr) = request.peer_addr() {
            // The port changes per connection; only the address is stable.
            return addr.ip().to_string();
        }

        UNKNOWN_IDENTITY.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;

    #[test]
    fn test_forwarded_for_takes_first_entry() {
        let request = RequestMetadata::new("/")
            .with_header("X-Forwarded-For", "203.0.113.9 , 10.0.0.2, 10.0.0.3");

        assert_eq!(ForwardedForResolver.resolve(&request), "203.0.113.9");
    }

    #[test]
    fn test_forwarded_for_preferred_over_peer() {
        let addr: SocketAddr = "192.0.2.7:49152".parse().unwrap();
        let request = RequestMetadata::new("/")
            .with_peer_addr(addr)
            .with_header("x-forwarded-for", "203.0.113.9");

        assert_eq!(ForwardedForResolver.resolve(&request), "203.0.113.9");
    }

    #[test]
    fn test_peer_addr_fallback_drops_port() {
        let addr: SocketAddr = "192.0.2.7:49152".parse().unwrap();
        let request = RequestMetadata::new("/").with_peer_addr(addr);

        assert_eq!(ForwardedForResolver.resolve(&request), "192.0.2.7");
    }

    #[test]
    fn test_empty_forwarded_entry_falls_through() {
        let addr: SocketAddr = "192.0.2.7:49152".parse().unwrap();
        let request = RequestMetadata::new("/")
            .with_peer_addr(addr)
            .with_header("x-forwarded-for", " , 10.0.0.2");

        assert_eq!(ForwardedForResolver.resolve(&request), "192.0.2.7");
    }

    #[test]
    fn test_sentinel_when_nothing_usable() {
        let request = RequestMetadata::new("/");

        assert_eq!(ForwardedForResolver.resolve(&request), UNKNOWN_IDENTITY);
    }

    #[test]
    fn test_custom_resolver_substitutes() {
        struct ApiKeyResolver;

        impl IdentityResolver for ApiKeyResolver {
            fn resolve(&self, request: &RequestMetadata) -> String {
                request
                    .header("x-api-key")
                    .unwrap_or(UNKNOWN_IDENTITY)
                    .to_string()
            }
        }

        let request = RequestMetadata::new("/").with_header("X-Api-Key", "key-123");
        assert_eq!(ApiKeyResolver.resolve(&request), "key-123");
    }
}
