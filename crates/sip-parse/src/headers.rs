//! Typed header value parsers (spec §4.B "apply the typed parser").

use nom::branch::alt;
use nom::bytes::complete::{take_while, take_while1};
use nom::character::complete::{char, space0};
use nom::combinator::{map, opt};
use nom::multi::many0;
use nom::sequence::{delimited, preceded, tuple};
use nom::IResult;

use sip_types::headers::{CSeq, ContentType, NamedAddress};
use sip_types::method::Method;
use sip_types::param::Param;

use crate::error::{Error, Result};
use crate::uri::parse_uri;
use crate::via::split_unquoted_commas;

fn quoted_string(input: &str) -> IResult<&str, &str> {
    delimited(char('"'), take_while(|c: char| c != '"'), char('"'))(input)
}

fn display_name_token(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || c == ' ' || c == '-' || c == '.')(input)
}

fn addr_param(input: &str) -> IResult<&str, Param> {
    map(
        tuple((
            take_while1(|c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_'),
            opt(preceded(char('='), take_while(|c: char| c.is_ascii_alphanumeric() || "-._~".contains(c)))),
        )),
        |(name, value): (&str, Option<&str>)| Param::new(name, value.map(str::to_string)),
    )(input)
}

fn named_address_raw(input: &str) -> IResult<&str, (Option<&str>, &str, Vec<Param>)> {
    alt((
        map(
            tuple((
                opt(alt((quoted_string, display_name_token))),
                space0,
                delimited(char('<'), take_while1(|c: char| c != '>'), char('>')),
                many0(preceded(tuple((space0, char(';'), space0)), addr_param)),
            )),
            |(name, _, uri, params)| (name, uri, params),
        ),
        map(
            tuple((
                take_while1(|c: char| c != ';' && !c.is_whitespace()),
                many0(preceded(tuple((space0, char(';'), space0)), addr_param)),
            )),
            |(uri, params)| (None, uri, params),
        ),
    ))(input)
}

/// Parses a From/To/Contact/Route/Record-Route address value.
pub fn parse_named_address(input: &str) -> Result<NamedAddress> {
    let (_, (name, uri_raw, params)) =
        nom::combinator::all_consuming(nom::sequence::terminated(named_address_raw, space0))(input.trim())
            .map_err(|_| Error::BadHeader { name: "address".into(), value: input.to_string() })?;
    let uri = parse_uri(uri_raw.trim())?;
    let mut addr = NamedAddress::new(name.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()), uri);
    addr.params = params;
    Ok(addr)
}

/// `CSeq: <seq> <method>`.
pub fn parse_cseq(input: &str) -> Result<CSeq> {
    let parts: Vec<&str> = input.trim().splitn(2, char::is_whitespace).collect();
    let [seq_str, method_str] = parts[..] else {
        return Err(Error::BadCSeq(input.to_string()));
    };
    let seq: u32 = seq_str.parse().map_err(|_| Error::BadCSeq(input.to_string()))?;
    let method: Method = method_str.trim().parse().map_err(|_| Error::BadCSeq(input.to_string()))?;
    Ok(CSeq { seq, method })
}

pub fn parse_content_length(input: &str) -> Result<u32> {
    input.trim().parse().map_err(|_| Error::BadHeader { name: "Content-Length".into(), value: input.to_string() })
}

pub fn parse_max_forwards(input: &str) -> Result<u8> {
    input.trim().parse().map_err(|_| Error::BadHeader { name: "Max-Forwards".into(), value: input.to_string() })
}

pub fn parse_expires(input: &str) -> Result<u32> {
    input.trim().parse().map_err(|_| Error::BadHeader { name: "Expires".into(), value: input.to_string() })
}

pub fn parse_content_type(input: &str) -> Result<ContentType> {
    let (type_sub, params) = match input.split_once(';') {
        Some((a, b)) => (a, b),
        None => (input, ""),
    };
    let (media_type, media_subtype) = type_sub
        .trim()
        .split_once('/')
        .ok_or_else(|| Error::BadHeader { name: "Content-Type".into(), value: input.to_string() })?;
    let params = params
        .split(';')
        .filter(|p| !p.trim().is_empty())
        .map(|p| match p.split_once('=') {
            Some((k, v)) => Param::new(k.trim(), Some(v.trim().to_string())),
            None => Param::flag(p.trim()),
        })
        .collect();
    Ok(ContentType { media_type: media_type.to_string(), media_subtype: media_subtype.to_string(), params })
}

/// Splits a comma-joined multi-value header into its raw segments (used for
/// Route/Record-Route/Contact which may also repeat as distinct header
/// lines; the transport-facing parser folds both forms to calls of this).
pub fn split_list(input: &str) -> Vec<&str> {
    split_unquoted_commas(input)
}
