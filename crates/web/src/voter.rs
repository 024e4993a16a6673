//! Voter identity for vote deduplication.
//!
//! Clients should send a stable `voter_id`. Without one the token is a
//! UUIDv5 of the caller's forwarded address and user agent, which keeps one
//! browser to one vote per match without storing either value.

use axum::http::{HeaderMap, header::USER_AGENT};
use uuid::Uuid;

const VOTER_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_3b0e_52a4_4c8e_9d2f_7a61_e0b8_c4d3);

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// First hop of `X-Forwarded-For`, else `X-Real-IP`
fn client_address(headers: &HeaderMap) -> Option<&str> {
    header(headers, "x-forwarded-for")
        .and_then(|chain| chain.split(',').next())
        .map(str::trim)
        .filter(|address| !address.is_empty())
        .or_else(|| header(headers, "x-real-ip"))
}

pub fn voter_token(voter_id: Option<&str>, headers: &HeaderMap) -> String {
    if let Some(id) = voter_id.map(str::trim).filter(|id| !id.is_empty()) {
        return id.to_string();
    }

    let address = client_address(headers).unwrap_or("unknown");
    let agent = headers
        .get(USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    Uuid::new_v5(&VOTER_NAMESPACE, format!("{address}|{agent}").as_bytes()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(forwarded: &str, agent: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_str(forwarded).unwrap());
        headers.insert(USER_AGENT, HeaderValue::from_str(agent).unwrap());
        headers
    }

    #[test]
    fn test_explicit_voter_id_wins() {
        let token = voter_token(Some(" device-42 "), &headers("10.0.0.1", "Firefox"));
        assert_eq!(token, "device-42");
    }

    #[test]
    fn test_derived_token_is_stable_per_client() {
        let first = voter_token(None, &headers("10.0.0.1, 172.16.0.1", "Firefox"));
        let again = voter_token(Some("  "), &headers("10.0.0.1", "Firefox"));
        let other_agent = voter_token(None, &headers("10.0.0.1", "Safari"));
        let other_address = voter_token(None, &headers("10.0.0.2", "Firefox"));

        assert_eq!(first, again);
        assert_ne!(first, other_agent);
        assert_ne!(first, other_address);
        assert!(Uuid::parse_str(&first).is_ok());
    }

    #[test]
    fn test_real_ip_is_used_without_forwarded_chain() {
        let mut real_ip = HeaderMap::new();
        real_ip.insert("x-real-ip", HeaderValue::from_static("10.0.0.1"));
        real_ip.insert(USER_AGENT, HeaderValue::from_static("Firefox"));

        assert_eq!(
            voter_token(None, &real_ip),
            voter_token(None, &headers("10.0.0.1", "Firefox"))
        );
    }
}
