//! URI parser (spec §3 "URI is a structured value", §4.B).

use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use nom::branch::alt;
use nom::bytes::complete::{tag_no_case, take_while, take_while1};
use nom::character::complete::{char, digit1};
use nom::combinator::{map, map_res, opt, value};
use nom::multi::many0;
use nom::sequence::{pair, preceded, tuple};
use nom::IResult;

use sip_types::param::Param;
use sip_types::uri::{Host, Scheme, Uri};

use crate::error::{Error, Result};

fn is_unreserved(c: char) -> bool {
    c.is_ascii_alphanumeric() || "-_.!~*'()".contains(c)
}

fn user_chars(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| is_unreserved(c) || "&=+$,;?/%".contains(c))(input)
}

fn hostname_chars(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || c == '-' || c == '.')(input)
}

fn scheme(input: &str) -> IResult<&str, Scheme> {
    alt((
        value(Scheme::Sips, tag_no_case("sips")),
        value(Scheme::Sip, tag_no_case("sip")),
        value(Scheme::Tel, tag_no_case("tel")),
    ))(input)
}

fn ipv4(input: &str) -> IResult<&str, Host> {
    map_res(
        take_while1(|c: char| c.is_ascii_digit() || c == '.'),
        |s: &str| Ipv4Addr::from_str(s).map(Host::Ipv4),
    )(input)
}

fn ipv6(input: &str) -> IResult<&str, Host> {
    map_res(
        nom::sequence::delimited(char('['), take_while1(|c: char| c != ']'), char(']')),
        |s: &str| Ipv6Addr::from_str(s).map(Host::Ipv6),
    )(input)
}

pub(crate) fn host_value(input: &str) -> IResult<&str, Host> {
    alt((
        ipv6,
        |i| match ipv4(i) {
            ok @ Ok((rest, _)) if rest.is_empty() || !rest.starts_with(|c: char| c.is_ascii_alphabetic()) => ok,
            _ => Err(nom::Err::Error(nom::error::Error::new(i, nom::error::ErrorKind::Tag))),
        },
        map(hostname_chars, |s: &str| Host::Hostname(s.to_string())),
    ))(input)
}

fn port(input: &str) -> IResult<&str, u16> {
    map_res(digit1, |s: &str| s.parse::<u16>())(input)
}

fn param(input: &str) -> IResult<&str, Param> {
    map(
        pair(
            take_while1(|c: char| is_unreserved(c)),
            opt(preceded(char('='), take_while(|c: char| is_unreserved(c) || c == ':' || c == '/')))
        ),
        |(name, value): (&str, Option<&str>)| Param::new(name, value.map(str::to_string)),
    )(input)
}

fn uri_param(input: &str) -> IResult<&str, Param> {
    preceded(char(';'), param)(input)
}

fn uri_header(input: &str) -> IResult<&str, (String, String)> {
    map(
        tuple((
            take_while1(|c: char| is_unreserved(c)),
            char('='),
            take_while(|c: char| is_unreserved(c) || c == ':' || c == '/'),
        )),
        |(k, _, v): (&str, char, &str)| (k.to_string(), v.to_string()),
    )(input)
}

fn uri_headers(input: &str) -> IResult<&str, Vec<(String, String)>> {
    preceded(
        char('?'),
        nom::multi::separated_list0(char('&'), uri_header),
    )(input)
}

/// Parses a full `scheme:[user@]host[:port][;params][?headers]` URI.
pub fn parse_uri(input: &str) -> Result<Uri> {
    let result: IResult<&str, Uri> = nom::combinator::all_consuming(map(
        tuple((
            scheme,
            char(':'),
            opt(nom::sequence::terminated(user_chars, char('@'))),
            host_value,
            opt(preceded(char(':'), port)),
            many0(uri_param),
            opt(uri_headers),
        )),
        |(scheme, _, user, host, port, params, headers)| Uri {
            scheme,
            user: user.map(str::to_string),
            host,
            port,
            params,
            headers: headers.unwrap_or_default(),
        },
    ))(input);

    result
        .map(|(_, uri)| uri)
        .map_err(|_| Error::BadUri(input.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_sip_uri() {
        let uri = parse_uri("sip:bob@biloxi.com").unwrap();
        assert_eq!(uri.scheme, Scheme::Sip);
        assert_eq!(uri.user.as_deref(), Some("bob"));
        assert_eq!(uri.host, Host::Hostname("biloxi.com".into()));
    }

    #[test]
    fn parses_port_and_params() {
        let uri = parse_uri("sip:alice@example.com:5060;transport=udp").unwrap();
        assert_eq!(uri.port, Some(5060));
        assert_eq!(sip_types::param::find_value(&uri.params, "transport"), Some("udp"));
    }

    #[test]
    fn parses_ipv4_host() {
        let uri = parse_uri("sip:10.0.0.1:5060").unwrap();
        assert_eq!(uri.host, Host::Ipv4("10.0.0.1".parse().unwrap()));
    }

    #[test]
    fn round_trips_format_then_parse() {
        let original = parse_uri("sip:alice@example.com:5060;transport=udp").unwrap();
        let formatted = original.to_string();
        let reparsed = parse_uri(&formatted).unwrap();
        assert_eq!(original, reparsed);
    }

    #[test]
    fn rejects_unknown_scheme() {
        assert!(parse_uri("ftp://example.com").is_err());
    }
}
