//! Bind DN handling. The protocol layer hands us the DN string as typed by
//! the directory client; everything we need from it is the short username
//! held in the first cn attribute, and proof that it sits under the base DN
//! this outpost serves.

use crate::error::BindError;

/// Derive the canonical short username from a bind DN.
///
/// The DN must be a case-insensitive suffix match against `base_dn`; a DN
/// outside the base is a hard failure, never a fallback. The username is the
/// value of the first cn attribute, scanning RDNs left to right and
/// attributes within a multi-valued RDN in their written order.
pub fn resolve_username(dn: &str, base_dn: &str) -> Result<String, BindError> {
    if !dn.to_lowercase().ends_with(&base_dn.to_lowercase()) {
        return Err(BindError::InvalidBase);
    }
    for rdn in parse_dn(dn)? {
        for (atype, value) in rdn {
            if atype.eq_ignore_ascii_case("cn") {
                return Ok(value);
            }
        }
    }
    Err(BindError::MissingCn)
}

/// Parse a DN into its RDN components, each a list of (type, value)
/// attributes. Handles `+` multi-valued RDNs and backslash escapes.
fn parse_dn(dn: &str) -> Result<Vec<Vec<(String, String)>>, BindError> {
    if dn.trim().is_empty() {
        return Err(BindError::MalformedDn("empty dn".to_string()));
    }

    let mut rdns: Vec<Vec<(String, String)>> = Vec::new();
    let mut attrs: Vec<(String, String)> = Vec::new();
    let mut atype = String::new();
    let mut value = String::new();
    let mut seen_eq = false;
    let mut chars = dn.chars();

    loop {
        match chars.next() {
            Some('\\') => {
                let esc = chars
                    .next()
                    .ok_or_else(|| BindError::MalformedDn("dn ends in an escape".to_string()))?;
                if seen_eq {
                    value.push(esc)
                } else {
                    atype.push(esc)
                }
            }
            Some('=') if !seen_eq => seen_eq = true,
            Some(sep @ (',' | '+')) => {
                finish_attribute(&mut attrs, &mut atype, &mut value, &mut seen_eq)?;
                if sep == ',' {
                    rdns.push(std::mem::take(&mut attrs));
                }
            }
            Some(c) => {
                if seen_eq {
                    value.push(c)
                } else {
                    atype.push(c)
                }
            }
            None => {
                finish_attribute(&mut attrs, &mut atype, &mut value, &mut seen_eq)?;
                rdns.push(attrs);
                break;
            }
        }
    }

    Ok(rdns)
}

fn finish_attribute(
    attrs: &mut Vec<(String, String)>,
    atype: &mut String,
    value: &mut String,
    seen_eq: &mut bool,
) -> Result<(), BindError> {
    if !*seen_eq {
        return Err(BindError::MalformedDn(format!(
            "attribute '{atype}' has no value"
        )));
    }
    let t = std::mem::take(atype).trim().to_string();
    let v = std::mem::take(value).trim().to_string();
    *seen_eq = false;
    if t.is_empty() {
        return Err(BindError::MalformedDn("empty attribute type".to_string()));
    }
    attrs.push((t, v));
    Ok(())
}
