//! Extract AWS role grants from a SAML assertion

pub const ROLE_ATTRIBUTE_NAME: &str = "https://aws.amazon.com/SAML/Attributes/Role";

/// `(role ARN, principal ARN)` pair the asserted subject may assume
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct RoleGrant {
    pub role_arn: String,
    pub principal_arn: String,
}

fn malformed(message: impl Into<String>) -> crate::error::Error {
    crate::error::Error::MalformedAssertion(message.into())
}

impl RoleGrant {
    /// Parse a role attribute value `<role arn>,<saml-provider arn>` (either order).
    pub fn parse(entry: &str) -> Result<Self, crate::error::Error> {
        let tokens: Vec<&str> = entry.split(',').map(|t| t.trim()).collect();
        if tokens.len() != 2 {
            return Err(malformed(format!(
                "role entry must have 2 comma separated ARNs but has {} tokens",
                tokens.len()
            )));
        }

        let mut principal_arn = None;
        let mut role_arn = None;
        for token in tokens {
            if token.contains(":saml-provider/") {
                principal_arn = Some(token);
            } else if token.contains(":role/") {
                role_arn = Some(token);
            }
        }

        match (role_arn, principal_arn) {
            (Some(r), Some(p)) => Ok(Self {
                role_arn: r.to_owned(),
                principal_arn: p.to_owned(),
            }),
            (None, _) => Err(malformed("role entry is missing a role ARN")),
            (_, None) => Err(malformed("role entry is missing a saml-provider ARN")),
        }
    }
}

/// Decode the base64 transport encoding. Line breaks are tolerated.
pub fn decode(assertion: &crate::idp::Assertion) -> Result<Vec<u8>, crate::error::Error> {
    use base64ct::Encoding;

    let compact: String = assertion
        .as_str()
        .chars()
        .filter(|c| !matches!(c, '\r' | '\n'))
        .collect();
    base64ct::Base64::decode_vec(&compact).map_err(|e| malformed(format!("invalid base64: {e}")))
}

/// Collect raw values of the AWS role attribute, in document order.
pub fn extract_role_entries(document: &[u8]) -> Result<Vec<String>, crate::error::Error> {
    let text =
        std::str::from_utf8(document).map_err(|_| malformed("document is not valid utf-8"))?;
    let doc = roxmltree::Document::parse(text).map_err(|e| malformed(e.to_string()))?;

    let attributes: Vec<_> = doc
        .descendants()
        .filter(|n| {
            n.is_element()
                && n.tag_name().name() == "Attribute"
                && n.attribute("Name") == Some(ROLE_ATTRIBUTE_NAME)
        })
        .collect();
    if attributes.is_empty() {
        return Err(malformed("no AWS role attribute in assertion"));
    }

    Ok(attributes
        .iter()
        .flat_map(|a| a.children())
        .filter(|n| n.is_element() && n.tag_name().name() == "AttributeValue")
        .map(|n| n.text().unwrap_or_default().trim().to_owned())
        .collect())
}

pub fn parse_role_grants(entries: &[String]) -> Result<Vec<RoleGrant>, crate::error::Error> {
    entries.iter().map(|e| RoleGrant::parse(e)).collect()
}

/// First grant whose role ARN equals `role_arn`. Duplicates resolve to the earliest one.
pub fn locate_role<'a>(
    grants: &'a [RoleGrant],
    role_arn: &str,
) -> Result<&'a RoleGrant, crate::error::Error> {
    grants
        .iter()
        .find(|g| g.role_arn == role_arn)
        .ok_or_else(|| crate::error::Error::RoleNotGranted(role_arn.to_owned()))
}

/// All role grants carried by `assertion`, in document order.
pub fn grants(assertion: &crate::idp::Assertion) -> Result<Vec<RoleGrant>, crate::error::Error> {
    let document = decode(assertion)?;
    let entries = extract_role_entries(&document)?;
    parse_role_grants(&entries)
}

/// Resolve `role_arn` against the grants carried by `assertion`.
pub fn resolve(
    assertion: &crate::idp::Assertion,
    role_arn: &str,
) -> Result<RoleGrant, crate::error::Error> {
    let grants = grants(assertion)?;
    tracing::debug!(message = "Parsed role grants from assertion", grants = grants.len());
    locate_role(&grants, role_arn).cloned()
}
