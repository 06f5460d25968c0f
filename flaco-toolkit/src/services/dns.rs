//! DNS resolution probe

use std::net::IpAddr;
use std::time::Duration;

use hickory_resolver::{
    ResolveError, TokioResolver,
    proto::{
        ProtoErrorKind,
        rr::{Name, RecordType},
    },
};
use log::debug;
use tokio::time::timeout;

use crate::error::{ProbeError, ProbeResult};
use crate::types::DnsQueryType;

use super::resolver::{DNS_PORT, build_resolver, parse_nameservers};

/// Resolve `name` against `nameservers` and return the record values as strings.
///
/// A single attempt is made; the caller owns joining/formatting the list.
pub async fn resolve<S: AsRef<str>>(
    name: &str,
    nameservers: &[S],
    query_type: DnsQueryType,
    query_timeout: Duration,
) -> ProbeResult<Vec<String>> {
    let servers = parse_nameservers(nameservers)?;
    resolve_on(name, &servers, DNS_PORT, query_type, query_timeout).await
}

/// [`resolve`] against already-parsed servers listening on `port`.
pub(crate) async fn resolve_on(
    name: &str,
    servers: &[IpAddr],
    port: u16,
    query_type: DnsQueryType,
    query_timeout: Duration,
) -> ProbeResult<Vec<String>> {
    // PTR targets must be addresses; convert before touching the network.
    let reverse = match query_type {
        DnsQueryType::Ptr => Some(reverse_name(name)?),
        _ => None,
    };
    debug!("[DNS] {query_type} {name} via {servers:?}");

    let resolver = build_resolver(servers, port, query_timeout);
    // The resolver may fall through several servers; bound the whole call.
    let overall = query_timeout.saturating_mul(2);

    let lookup = async move {
        match query_type {
            DnsQueryType::A => lookup_a(&resolver, name).await,
            DnsQueryType::Cname => lookup_cname(&resolver, name).await,
            DnsQueryType::Mx => lookup_mx(&resolver, name).await,
            DnsQueryType::Ptr => match reverse {
                Some(reverse) => lookup_ptr(&resolver, reverse).await,
                None => Ok(Vec::new()),
            },
        }
    };

    let values = timeout(overall, lookup)
        .await
        .map_err(|_| {
            ProbeError::Timeout(format!(
                "{query_type} query for {name} timed out ({}s)",
                overall.as_secs()
            ))
        })?
        .map_err(|e| map_resolve_error(&e, name, query_type))?;

    if values.is_empty() {
        return Err(ProbeError::NoAnswer {
            name: name.to_string(),
            record_type: query_type.to_string(),
        });
    }

    debug!("[DNS] {query_type} {name} -> {} record(s)", values.len());
    Ok(values)
}

/// Reverse-lookup name for a dotted IPv4 or IPv6 address.
pub fn reverse_name(address: &str) -> ProbeResult<Name> {
    let ip: IpAddr = address
        .trim()
        .parse()
        .map_err(|_| ProbeError::InvalidAddress(format!("check IP address: {address}")))?;
    Ok(Name::from(ip))
}

fn map_resolve_error(err: &ResolveError, name: &str, query_type: DnsQueryType) -> ProbeError {
    if err.is_nx_domain() {
        return ProbeError::NameNotFound(name.to_string());
    }
    if err.is_no_records_found() {
        return ProbeError::NoAnswer {
            name: name.to_string(),
            record_type: query_type.to_string(),
        };
    }
    if let Some(proto) = err.proto()
        && matches!(proto.kind(), ProtoErrorKind::Timeout)
    {
        return ProbeError::Timeout(format!("{query_type} query for {name}: {err}"));
    }
    ProbeError::ResolverError(err.to_string())
}

fn trim_root(name: &Name) -> String {
    name.to_string().trim_end_matches('.').to_string()
}

async fn lookup_a(resolver: &TokioResolver, name: &str) -> Result<Vec<String>, ResolveError> {
    let response = resolver.ipv4_lookup(name).await?;
    Ok(response.iter().map(ToString::to_string).collect())
}

async fn lookup_cname(resolver: &TokioResolver, name: &str) -> Result<Vec<String>, ResolveError> {
    let response = resolver.lookup(name, RecordType::CNAME).await?;
    Ok(response
        .record_iter()
        .filter_map(|record| record.data().as_cname())
        .map(|cname| trim_root(&cname.0))
        .collect())
}

async fn lookup_mx(resolver: &TokioResolver, name: &str) -> Result<Vec<String>, ResolveError> {
    let response = resolver.mx_lookup(name).await?;
    Ok(response
        .iter()
        .map(|mx| {
            format!(
                "Host {} preference {}",
                trim_root(mx.exchange()),
                mx.preference()
            )
        })
        .collect())
}

async fn lookup_ptr(resolver: &TokioResolver, reverse: Name) -> Result<Vec<String>, ResolveError> {
    let response = resolver.lookup(reverse, RecordType::PTR).await?;
    Ok(response
        .record_iter()
        .filter_map(|record| record.data().as_ptr())
        .map(|ptr| trim_root(&ptr.0))
        .collect())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use hickory_resolver::proto::op::{Message, MessageType, ResponseCode};
    use tokio::net::UdpSocket;

    use super::*;

    #[test]
    fn test_reverse_name_ipv4() {
        let name = reverse_name("8.8.4.4").unwrap();
        assert_eq!(
            name.to_string().trim_end_matches('.'),
            "4.4.8.8.in-addr.arpa"
        );
    }

    #[test]
    fn test_reverse_name_ipv6() {
        let name = reverse_name("2001:db8::1").unwrap();
        let text = name.to_string();
        assert!(text.starts_with("1.0.0.0."), "got {text}");
        assert!(text.trim_end_matches('.').ends_with("8.b.d.0.1.0.0.2.ip6.arpa"));
    }

    #[test]
    fn test_reverse_name_invalid() {
        assert!(matches!(
            reverse_name("yahoo.com"),
            Err(ProbeError::InvalidAddress(_))
        ));
        assert!(matches!(
            reverse_name("256.1.1.1"),
            Err(ProbeError::InvalidAddress(_))
        ));
    }

    #[tokio::test]
    async fn test_resolve_ptr_rejects_hostname_before_network() {
        let result = resolve(
            "not-an-ip",
            &["8.8.8.8"],
            DnsQueryType::Ptr,
            Duration::from_secs(1),
        )
        .await;
        assert!(matches!(result, Err(ProbeError::InvalidAddress(_))));
    }

    #[tokio::test]
    async fn test_resolve_invalid_nameserver() {
        let result = resolve(
            "example.com",
            &["not-a-server"],
            DnsQueryType::A,
            Duration::from_secs(1),
        )
        .await;
        assert!(matches!(result, Err(ProbeError::InvalidAddress(_))));
    }

    #[tokio::test]
    async fn test_resolve_unreachable_nameserver_times_out() {
        // TEST-NET-1 is guaranteed unroutable, nothing answers there.
        let result = resolve(
            "example.com",
            &["192.0.2.1"],
            DnsQueryType::A,
            Duration::from_millis(300),
        )
        .await;
        assert!(
            matches!(result, Err(ProbeError::Timeout(_) | ProbeError::ResolverError(_))),
            "unexpected result: {result:?}"
        );
    }

    /// Answer every query on a loopback UDP port with `rcode` and no records.
    async fn serve_empty_answers(rcode: ResponseCode) -> u16 {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = socket.local_addr().unwrap().port();
        tokio::spawn(async move {
            let mut buf = vec![0u8; 4096];
            loop {
                let Ok((len, peer)) = socket.recv_from(&mut buf).await else {
                    return;
                };
                let Ok(query) = Message::from_vec(&buf[..len]) else {
                    continue;
                };
                let mut response = Message::new();
                response
                    .set_id(query.id())
                    .set_message_type(MessageType::Response)
                    .set_op_code(query.op_code())
                    .set_recursion_desired(query.recursion_desired())
                    .set_recursion_available(true)
                    .set_response_code(rcode);
                response.add_queries(query.queries().to_vec());
                if let Ok(bytes) = response.to_vec() {
                    let _ = socket.send_to(&bytes, peer).await;
                }
            }
        });
        port
    }

    const LOOPBACK: [IpAddr; 1] = [IpAddr::V4(std::net::Ipv4Addr::LOCALHOST)];

    #[tokio::test]
    async fn test_resolve_nxdomain_is_name_not_found() {
        let port = serve_empty_answers(ResponseCode::NXDomain).await;
        for query_type in [DnsQueryType::A, DnsQueryType::Cname, DnsQueryType::Mx] {
            let result = resolve_on(
                "nope.example",
                &LOOPBACK,
                port,
                query_type,
                Duration::from_secs(2),
            )
            .await;
            assert_eq!(
                result,
                Err(ProbeError::NameNotFound("nope.example".to_string())),
                "{query_type}"
            );
        }

        let result = resolve_on(
            "10.1.2.3",
            &LOOPBACK,
            port,
            DnsQueryType::Ptr,
            Duration::from_secs(2),
        )
        .await;
        assert_eq!(result, Err(ProbeError::NameNotFound("10.1.2.3".to_string())));
    }

    #[tokio::test]
    async fn test_resolve_empty_noerror_is_no_answer() {
        let port = serve_empty_answers(ResponseCode::NoError).await;
        for (name, query_type) in [
            ("nope.example", DnsQueryType::A),
            ("nope.example", DnsQueryType::Cname),
            ("nope.example", DnsQueryType::Mx),
            ("10.1.2.3", DnsQueryType::Ptr),
        ] {
            let result =
                resolve_on(name, &LOOPBACK, port, query_type, Duration::from_secs(2)).await;
            assert_eq!(
                result,
                Err(ProbeError::NoAnswer {
                    name: name.to_string(),
                    record_type: query_type.to_string(),
                }),
                "{query_type}"
            );
        }
    }

    // NOTE: depends on external networks; failures may be network issues, not code bugs

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_resolve_a_real() {
        let records = resolve(
            "example.com",
            &["8.8.8.8"],
            DnsQueryType::A,
            Duration::from_secs(5),
        )
        .await
        .unwrap();
        assert!(records.iter().all(|r| r.parse::<std::net::Ipv4Addr>().is_ok()));
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_resolve_mx_real() {
        let records = resolve(
            "gmail.com",
            &["8.8.8.8"],
            DnsQueryType::Mx,
            Duration::from_secs(5),
        )
        .await
        .unwrap();
        assert!(records.iter().all(|r| r.starts_with("Host ") && r.contains(" preference ")));
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_resolve_ptr_real() {
        let records = resolve(
            "8.8.8.8",
            &["8.8.8.8"],
            DnsQueryType::Ptr,
            Duration::from_secs(5),
        )
        .await
        .unwrap();
        assert!(records.iter().any(|r| r == "dns.google"));
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_resolve_nxdomain_real() {
        for query_type in [DnsQueryType::A, DnsQueryType::Cname, DnsQueryType::Mx] {
            let result = resolve(
                "definitely-not-registered-flaco.invalid",
                &["8.8.8.8"],
                query_type,
                Duration::from_secs(5),
            )
            .await;
            assert!(
                matches!(
                    result,
                    Err(ProbeError::NameNotFound(_) | ProbeError::NoAnswer { .. })
                ),
                "{query_type}: {result:?}"
            );
        }
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_resolve_cname_no_answer_real() {
        let result = resolve(
            "example.com",
            &["8.8.8.8"],
            DnsQueryType::Cname,
            Duration::from_secs(5),
        )
        .await;
        assert!(matches!(result, Err(ProbeError::NoAnswer { .. })), "{result:?}");
    }
}
