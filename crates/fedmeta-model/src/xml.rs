//! XML parsing adapter.
//!
//! Turns raw metadata bytes into the object model, checking well-formedness
//! along the way. Namespace prefixes are ignored; elements are matched by
//! local name. Unrecognized elements are skipped.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, NaiveDateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::document::{DocumentRoot, MetadataDocument};
use crate::entity::{Endpoint, EntityDescriptor, KeyDescriptor, KeyUse, RoleDescriptor, RoleKind};
use crate::error::{ModelError, ModelResult};

/// Endpoint element local names recognized inside a role descriptor.
const ENDPOINT_ELEMENTS: &[&[u8]] = &[
    b"SingleSignOnService",
    b"SingleLogoutService",
    b"ArtifactResolutionService",
    b"AssertionConsumerService",
    b"AttributeService",
    b"ManageNameIDService",
    b"NameIDMappingService",
    b"AssertionIDRequestService",
];

/// Parses a metadata document from raw bytes.
///
/// The root must be an `EntityDescriptor` or an `EntitiesDescriptor`;
/// nested `EntitiesDescriptor` groups are flattened into the root group.
///
/// ## Errors
///
/// Returns [`ModelError::Malformed`] for XML or invariant violations and
/// [`ModelError::UnsupportedRoot`] for unrecognized root elements.
pub fn parse_metadata(bytes: &[u8]) -> ModelResult<MetadataDocument> {
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(start) => {
                let start = start.into_owned();
                return parse_root(&mut reader, &start);
            }
            Event::Empty(start) => {
                let start = start.into_owned();
                return parse_empty_root(&start);
            }
            Event::Eof => return Err(ModelError::malformed("document contains no elements")),
            _ => {}
        }
        buf.clear();
    }
}

fn parse_root(reader: &mut Reader<&[u8]>, start: &BytesStart<'_>) -> ModelResult<MetadataDocument> {
    match start.local_name().as_ref() {
        b"EntitiesDescriptor" => {
            let valid_until = instant_attr(start, b"validUntil")?;
            let cache_duration = duration_attr(start, b"cacheDuration")?;
            let entities = parse_group(reader)?;
            Ok(MetadataDocument {
                root: DocumentRoot::Group(entities),
                valid_until,
                cache_duration,
            })
        }
        b"EntityDescriptor" => {
            let entity = parse_entity(reader, start)?;
            Ok(MetadataDocument {
                valid_until: entity.valid_until,
                cache_duration: entity.cache_duration,
                root: DocumentRoot::Entity(entity),
            })
        }
        other => Err(ModelError::UnsupportedRoot(
            String::from_utf8_lossy(other).into_owned(),
        )),
    }
}

fn parse_empty_root(start: &BytesStart<'_>) -> ModelResult<MetadataDocument> {
    match start.local_name().as_ref() {
        b"EntitiesDescriptor" => Ok(MetadataDocument {
            root: DocumentRoot::Group(Vec::new()),
            valid_until: instant_attr(start, b"validUntil")?,
            cache_duration: duration_attr(start, b"cacheDuration")?,
        }),
        b"EntityDescriptor" => {
            let entity = entity_from_attrs(start)?;
            Ok(MetadataDocument {
                valid_until: entity.valid_until,
                cache_duration: entity.cache_duration,
                root: DocumentRoot::Entity(entity),
            })
        }
        other => Err(ModelError::UnsupportedRoot(
            String::from_utf8_lossy(other).into_owned(),
        )),
    }
}

/// Parses the children of an `EntitiesDescriptor`, flattening nested groups.
fn parse_group(reader: &mut Reader<&[u8]>) -> ModelResult<Vec<EntityDescriptor>> {
    let mut entities = Vec::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(start) => {
                let start = start.into_owned();
                match start.local_name().as_ref() {
                    b"EntityDescriptor" => entities.push(parse_entity(reader, &start)?),
                    b"EntitiesDescriptor" => entities.extend(parse_group(reader)?),
                    _ => skip_element(reader, &start)?,
                }
            }
            Event::Empty(start) => {
                if start.local_name().as_ref() == b"EntityDescriptor" {
                    entities.push(entity_from_attrs(&start)?);
                }
            }
            Event::End(end) => {
                if end.local_name().as_ref() == b"EntitiesDescriptor" {
                    return Ok(entities);
                }
            }
            Event::Eof => return Err(ModelError::malformed("unterminated EntitiesDescriptor")),
            _ => {}
        }
        buf.clear();
    }
}

fn entity_from_attrs(start: &BytesStart<'_>) -> ModelResult<EntityDescriptor> {
    let entity_id = attr(start, b"entityID")?
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ModelError::malformed("EntityDescriptor without entityID"))?;

    Ok(EntityDescriptor {
        entity_id,
        valid_until: instant_attr(start, b"validUntil")?,
        cache_duration: duration_attr(start, b"cacheDuration")?,
        roles: Vec::new(),
    })
}

fn parse_entity(
    reader: &mut Reader<&[u8]>,
    start: &BytesStart<'_>,
) -> ModelResult<EntityDescriptor> {
    let mut entity = entity_from_attrs(start)?;

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(child) => {
                let child = child.into_owned();
                match role_kind(child.local_name().as_ref()) {
                    Some(kind) => entity.roles.push(parse_role(reader, &child, kind)?),
                    None => {
                        tracing::debug!(
                            element = %String::from_utf8_lossy(child.local_name().as_ref()),
                            entity_id = %entity.entity_id,
                            "skipping unrecognized entity child element"
                        );
                        skip_element(reader, &child)?;
                    }
                }
            }
            Event::Empty(child) => {
                if let Some(kind) = role_kind(child.local_name().as_ref()) {
                    entity.roles.push(role_from_attrs(&child, kind)?);
                }
            }
            Event::End(end) => {
                if end.local_name().as_ref() == b"EntityDescriptor" {
                    return Ok(entity);
                }
            }
            Event::Eof => return Err(ModelError::malformed("unterminated EntityDescriptor")),
            _ => {}
        }
        buf.clear();
    }
}

fn role_kind(local: &[u8]) -> Option<RoleKind> {
    match local {
        b"IDPSSODescriptor" => Some(RoleKind::IdentityProvider),
        b"SPSSODescriptor" => Some(RoleKind::ServiceProvider),
        b"AttributeAuthorityDescriptor" => Some(RoleKind::AttributeAuthority),
        _ => None,
    }
}

fn role_from_attrs(start: &BytesStart<'_>, kind: RoleKind) -> ModelResult<RoleDescriptor> {
    let mut role = RoleDescriptor::new(kind);
    if let Some(protocols) = attr(start, b"protocolSupportEnumeration")? {
        role.protocols = protocols.split_whitespace().map(str::to_owned).collect();
    }
    Ok(role)
}

fn parse_role(
    reader: &mut Reader<&[u8]>,
    start: &BytesStart<'_>,
    kind: RoleKind,
) -> ModelResult<RoleDescriptor> {
    let role_name = start.local_name().as_ref().to_vec();
    let mut role = role_from_attrs(start, kind)?;

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(child) => {
                let child = child.into_owned();
                let local = child.local_name().as_ref().to_vec();
                if ENDPOINT_ELEMENTS.contains(&local.as_slice()) {
                    role.endpoints.push(endpoint_from_attrs(&child)?);
                    skip_element(reader, &child)?;
                } else if local == b"KeyDescriptor" {
                    role.keys.push(parse_key_descriptor(reader, &child)?);
                } else {
                    skip_element(reader, &child)?;
                }
            }
            Event::Empty(child) => {
                let local = child.local_name().as_ref().to_vec();
                if ENDPOINT_ELEMENTS.contains(&local.as_slice()) {
                    role.endpoints.push(endpoint_from_attrs(&child)?);
                }
            }
            Event::End(end) => {
                if end.local_name().as_ref() == role_name.as_slice() {
                    return Ok(role);
                }
            }
            Event::Eof => return Err(ModelError::malformed("unterminated role descriptor")),
            _ => {}
        }
        buf.clear();
    }
}

fn endpoint_from_attrs(start: &BytesStart<'_>) -> ModelResult<Endpoint> {
    let element = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
    let binding = attr(start, b"Binding")?
        .ok_or_else(|| ModelError::malformed(format!("{element} without Binding")))?;
    let location = attr(start, b"Location")?
        .ok_or_else(|| ModelError::malformed(format!("{element} without Location")))?;

    let index = match attr(start, b"index")? {
        Some(value) => Some(
            value
                .parse::<u16>()
                .map_err(|_| ModelError::malformed(format!("invalid endpoint index '{value}'")))?,
        ),
        None => None,
    };

    let is_default = match attr(start, b"isDefault")? {
        Some(value) => Some(value == "true" || value == "1"),
        None => None,
    };

    Ok(Endpoint {
        binding,
        location,
        response_location: attr(start, b"ResponseLocation")?,
        index,
        is_default,
    })
}

/// Parses a `KeyDescriptor`, collecting any `X509Certificate` blobs found
/// at any depth inside it.
fn parse_key_descriptor(
    reader: &mut Reader<&[u8]>,
    start: &BytesStart<'_>,
) -> ModelResult<KeyDescriptor> {
    let usage = match attr(start, b"use")?.as_deref() {
        None => KeyUse::Both,
        Some("signing") => KeyUse::Signing,
        Some("encryption") => KeyUse::Encryption,
        Some(other) => {
            return Err(ModelError::malformed(format!(
                "invalid KeyDescriptor use '{other}'"
            )))
        }
    };

    let mut certificates = Vec::new();
    let mut depth = 1usize;
    let mut in_certificate = false;
    let mut text = String::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(child) => {
                depth += 1;
                if child.local_name().as_ref() == b"X509Certificate" {
                    in_certificate = true;
                    text.clear();
                }
            }
            Event::Text(t) => {
                if in_certificate {
                    text.push_str(&t.unescape()?);
                }
            }
            Event::End(end) => {
                if in_certificate && end.local_name().as_ref() == b"X509Certificate" {
                    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
                    let der = BASE64.decode(compact.as_bytes()).map_err(|e| {
                        ModelError::malformed(format!("invalid certificate encoding: {e}"))
                    })?;
                    certificates.push(der);
                    in_certificate = false;
                }
                depth -= 1;
                if depth == 0 {
                    return Ok(KeyDescriptor { usage, certificates });
                }
            }
            Event::Eof => return Err(ModelError::malformed("unterminated KeyDescriptor")),
            _ => {}
        }
        buf.clear();
    }
}

/// Skips the element opened by `start`, including all of its children.
fn skip_element(reader: &mut Reader<&[u8]>, start: &BytesStart<'_>) -> ModelResult<()> {
    let end = start.to_end().into_owned();
    let mut buf = Vec::new();
    reader.read_to_end_into(end.name(), &mut buf)?;
    Ok(())
}

fn attr(start: &BytesStart<'_>, name: &[u8]) -> ModelResult<Option<String>> {
    for attribute in start.attributes() {
        let attribute = attribute?;
        if attribute.key.local_name().as_ref() == name {
            return Ok(Some(attribute.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

fn instant_attr(start: &BytesStart<'_>, name: &[u8]) -> ModelResult<Option<DateTime<Utc>>> {
    attr(start, name)?.map(|v| parse_instant(&v)).transpose()
}

fn duration_attr(start: &BytesStart<'_>, name: &[u8]) -> ModelResult<Option<std::time::Duration>> {
    attr(start, name)?.map(|v| parse_xml_duration(&v)).transpose()
}

/// Parses an `xsd:dateTime` value. Values without a timezone are taken as
/// UTC.
fn parse_instant(value: &str) -> ModelResult<DateTime<Utc>> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(value) {
        return Ok(instant.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| ModelError::malformed(format!("invalid dateTime '{value}': {e}")))
}

/// Parses an `xsd:duration` value (`PnYnMnDTnHnMnS`).
///
/// Calendar components use fixed-length approximations (a year is 365 days,
/// a month 30). Negative durations are rejected; a negative re-fetch hint
/// has no meaning here.
fn parse_xml_duration(value: &str) -> ModelResult<std::time::Duration> {
    let malformed = || ModelError::malformed(format!("invalid duration '{value}'"));

    let rest = value.strip_prefix('P').ok_or_else(malformed)?;
    if value.starts_with('-') || rest.is_empty() {
        return Err(malformed());
    }

    let (date_part, time_part) = match rest.split_once('T') {
        Some((date, time)) if !time.is_empty() => (date, time),
        Some(_) => return Err(malformed()),
        None => (rest, ""),
    };

    let mut seconds = 0f64;
    for (part, designators) in [(date_part, "YMD"), (time_part, "HMS")] {
        let mut number = String::new();
        for c in part.chars() {
            if c.is_ascii_digit() || c == '.' {
                number.push(c);
            } else if designators.contains(c) {
                let n: f64 = number.parse().map_err(|_| malformed())?;
                seconds += n * match (c, designators) {
                    ('Y', _) => 365.0 * 86_400.0,
                    ('M', "YMD") => 30.0 * 86_400.0,
                    ('D', _) => 86_400.0,
                    ('H', _) => 3_600.0,
                    ('M', _) => 60.0,
                    ('S', _) => 1.0,
                    _ => return Err(malformed()),
                };
                number.clear();
            } else {
                return Err(malformed());
            }
        }
        if !number.is_empty() {
            return Err(malformed());
        }
    }

    Ok(std::time::Duration::from_secs_f64(seconds))
}
