//! Via header parsing (spec §4.B: "Multi-value headers: split on commas not
//! inside quoted strings or angle brackets").

use nom::bytes::complete::take_while1;
use nom::character::complete::{char, digit1, space0, space1};
use nom::combinator::{map, map_res, opt};
use nom::multi::many0;
use nom::sequence::{preceded, separated_pair, tuple};
use nom::IResult;

use sip_types::param::Param;
use sip_types::via::Via;

use crate::error::{Error, Result};
use crate::uri::host_value;

fn token(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || "-.!%*_+`'~".contains(c))(input)
}

fn sent_protocol(input: &str) -> IResult<&str, (String, String, String)> {
    map(
        tuple((
            token,
            char('/'),
            token,
            char('/'),
            token,
        )),
        |(name, _, version, _, transport)| (name.to_string(), version.to_string(), transport.to_string()),
    )(input)
}

fn via_param(input: &str) -> IResult<&str, Param> {
    map(
        separated_pair(token, opt(char('=')), opt(take_while1(|c: char| !c.is_whitespace() && c != ';' && c != ','))),
        |(name, value)| Param::new(name, value.map(str::to_string)),
    )(input)
}

fn one_via(input: &str) -> IResult<&str, Via> {
    map(
        tuple((
            sent_protocol,
            space1,
            host_value,
            opt(preceded(char(':'), map_res(digit1, |s: &str| s.parse::<u16>()))),
            many0(preceded(tuple((space0, char(';'), space0)), via_param)),
        )),
        |((name, version, transport), _, host, port, params)| {
            let mut via = Via::new(transport, host, port, params);
            via.protocol_name = name;
            via.protocol_version = version;
            via
        },
    )(input)
}

/// Parses a (possibly comma-joined) Via header value into its entries,
/// top-of-stack first.
pub fn parse_via_list(input: &str) -> Result<Vec<Via>> {
    let mut vias = Vec::new();
    for part in split_unquoted_commas(input) {
        let trimmed = part.trim();
        let (_, via) = nom::combinator::all_consuming(nom::sequence::terminated(one_via, space0))(trimmed)
            .map_err(|_| Error::BadVia(trimmed.to_string()))?;
        vias.push(via);
    }
    if vias.is_empty() {
        return Err(Error::BadVia(input.to_string()));
    }
    Ok(vias)
}

/// Splits a header value on commas that are not inside a quoted string or
/// angle-bracket URI (spec §4.B).
pub fn split_unquoted_commas(input: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth_angle = 0i32;
    let mut in_quotes = false;
    let mut start = 0usize;
    for (i, c) in input.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            '<' if !in_quotes => depth_angle += 1,
            '>' if !in_quotes => depth_angle -= 1,
            ',' if !in_quotes && depth_angle <= 0 => {
                parts.push(&input[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_via() {
        let vias = parse_via_list("SIP/2.0/UDP pc33.atlanta.com:5060;branch=z9hG4bK776asdhds").unwrap();
        assert_eq!(vias.len(), 1);
        assert_eq!(vias[0].transport, "UDP");
        assert_eq!(vias[0].port, Some(5060));
        assert_eq!(vias[0].branch(), Some("z9hG4bK776asdhds"));
    }

    #[test]
    fn parses_comma_joined_list() {
        let vias = parse_via_list(
            "SIP/2.0/UDP a.example.com;branch=z9hG4bK1, SIP/2.0/UDP b.example.com;branch=z9hG4bK2",
        )
        .unwrap();
        assert_eq!(vias.len(), 2);
        assert_eq!(vias[0].host, Host::Hostname("a.example.com".into()));
        assert_eq!(vias[1].host, Host::Hostname("b.example.com".into()));
    }

    #[test]
    fn round_trips_format_then_parse() {
        let original = parse_via_list("SIP/2.0/UDP pc33.atlanta.com:5060;branch=z9hG4bK776asdhds;rport").unwrap();
        let formatted = original[0].to_string();
        let reparsed = parse_via_list(&formatted).unwrap();
        assert_eq!(original, reparsed);
    }
}
