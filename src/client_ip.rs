use std::{
    convert::Infallible,
    net::{IpAddr, Ipv4Addr, SocketAddr},
};

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{header::FORWARDED, request::Parts, HeaderMap},
};
use forwarded_header_value::{ForwardedHeaderValue, ForwardedHeaderValueParseError};
use tracing::debug;

const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// The IP address of the client making a request.
///
/// Proxy headers are preferred over the socket address since the API is
/// expected to run behind a load balancer. Used to key rate limits.
#[derive(Clone, Copy, Debug)]
pub struct ClientIp(pub IpAddr);

#[async_trait::async_trait]
impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let forwarded_ip = forwarded_ip(&parts.headers, FORWARDED.as_str(), |value| {
            ForwardedHeaderValue::from_forwarded(value)
        })
        .or_else(|| {
            forwarded_ip(&parts.headers, X_FORWARDED_FOR, |value| {
                ForwardedHeaderValue::from_x_forwarded_for(value)
            })
        });

        if let Some(ip) = forwarded_ip {
            return Ok(Self(ip));
        }

        let socket_ip = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(address)| address.ip());

        Ok(Self(
            socket_ip.unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED)),
        ))
    }
}

fn forwarded_ip<F>(headers: &HeaderMap, name: &str, parse: F) -> Option<IpAddr>
where
    F: Fn(&str) -> Result<ForwardedHeaderValue, ForwardedHeaderValueParseError>,
{
    let raw = headers.get(name)?.to_str().ok()?;

    match parse(raw) {
        Ok(value) => value.remotest_forwarded_for_ip(),
        Err(error) => {
            debug!(?error, header = name, "Ignoring malformed proxy header.");

            None
        }
    }
}
