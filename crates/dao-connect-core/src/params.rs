//! Deep-link parameter validation.
//!
//! A quest link must name the organization, the onboarding entity and the
//! quest before a wallet connection is offered.

use std::str::FromStr;

use alloy::primitives::Address;
use url::{form_urlencoded, Url};

pub const ORGANIZATION_ADDRESS: &str = "organizationAddress";
pub const ONBOARDING_ENTITY_ADDRESS: &str = "onboardingEntityAddress";
pub const QUEST_ID: &str = "questId";
pub const RETURN_URL: &str = "returnUrl";
pub const RETURN_URL_LINK_NAME: &str = "returnUrlLinkName";

pub const ORGANIZATION_MISSING: &str = "organization address not provided or not valid";
pub const ONBOARDING_ENTITY_MISSING: &str = "onboarding entity address not provided or not valid";
pub const QUEST_ID_MISSING: &str = "quest id not provided or not valid";
pub const PARAMETERS_INVALID: &str = "required parameters invalid";

/// Parameters of one navigation. Only [`RequiredParameterValidator`] builds
/// these, so holding one proves the connect action may be offered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredParameters {
    organization_address: Address,
    onboarding_entity_address: Address,
    quest_id: String,
    return_url: Option<String>,
    return_url_link_name: Option<String>,
}

impl RequiredParameters {
    pub fn organization_address(&self) -> Address {
        self.organization_address
    }

    pub fn onboarding_entity_address(&self) -> Address {
        self.onboarding_entity_address
    }

    pub fn quest_id(&self) -> &str {
        &self.quest_id
    }

    pub fn return_url(&self) -> Option<&str> {
        self.return_url.as_deref()
    }

    pub fn return_url_link_name(&self) -> Option<&str> {
        self.return_url_link_name.as_deref()
    }

    /// Query string carrying the same parameters, for navigation into the
    /// protected area.
    pub fn to_query_string(&self) -> String {
        let mut out = form_urlencoded::Serializer::new(String::new());
        out.append_pair(ORGANIZATION_ADDRESS, &self.organization_address.to_string());
        out.append_pair(
            ONBOARDING_ENTITY_ADDRESS,
            &self.onboarding_entity_address.to_string(),
        );
        out.append_pair(QUEST_ID, &self.quest_id);
        if let Some(url) = &self.return_url {
            out.append_pair(RETURN_URL, url);
        }
        if let Some(name) = &self.return_url_link_name {
            out.append_pair(RETURN_URL_LINK_NAME, name);
        }
        out.finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Valid(RequiredParameters),
    Missing(String),
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationOutcome::Valid(_))
    }

    pub fn parameters(&self) -> Option<&RequiredParameters> {
        match self {
            ValidationOutcome::Valid(params) => Some(params),
            ValidationOutcome::Missing(_) => None,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            ValidationOutcome::Valid(_) => None,
            ValidationOutcome::Missing(reason) => Some(reason),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RequiredParameterValidator;

impl RequiredParameterValidator {
    /// Validates a raw query string, with or without the leading `?`.
    pub fn validate(query: &str) -> ValidationOutcome {
        let query = query.strip_prefix('?').unwrap_or(query);
        Self::validate_pairs(
            form_urlencoded::parse(query.as_bytes()).map(|(k, v)| (k.into_owned(), v.into_owned())),
        )
    }

    /// Validates the query of a full deep link.
    pub fn validate_url(link: &str) -> ValidationOutcome {
        match Url::parse(link) {
            Ok(url) => Self::validate(url.query().unwrap_or_default()),
            Err(e) => {
                tracing::debug!(error = %e, "deep link did not parse");
                ValidationOutcome::Missing(PARAMETERS_INVALID.to_owned())
            }
        }
    }

    pub fn validate_pairs<I>(pairs: I) -> ValidationOutcome
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut organization = None;
        let mut onboarding_entity = None;
        let mut quest_id = None;
        let mut return_url = None;
        let mut return_url_link_name = None;

        // First occurrence wins, as with URLSearchParams.get.
        for (key, value) in pairs {
            let slot = match key.as_str() {
                ORGANIZATION_ADDRESS => &mut organization,
                ONBOARDING_ENTITY_ADDRESS => &mut onboarding_entity,
                QUEST_ID => &mut quest_id,
                RETURN_URL => &mut return_url,
                RETURN_URL_LINK_NAME => &mut return_url_link_name,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }

        let Some(organization_address) = organization.as_deref().and_then(parse_chain_address)
        else {
            return ValidationOutcome::Missing(ORGANIZATION_MISSING.to_owned());
        };
        let Some(onboarding_entity_address) =
            onboarding_entity.as_deref().and_then(parse_chain_address)
        else {
            return ValidationOutcome::Missing(ONBOARDING_ENTITY_MISSING.to_owned());
        };
        let quest_id = match quest_id {
            Some(id) if !id.is_empty() => id,
            _ => return ValidationOutcome::Missing(QUEST_ID_MISSING.to_owned()),
        };

        ValidationOutcome::Valid(RequiredParameters {
            organization_address,
            onboarding_entity_address,
            quest_id,
            return_url: return_url.filter(|s| !s.is_empty()),
            return_url_link_name: return_url_link_name.filter(|s| !s.is_empty()),
        })
    }
}

pub fn is_chain_address(raw: &str) -> bool {
    parse_chain_address(raw).is_some()
}

/// `0x` plus 40 hex digits (prefix optional). Single-case input is accepted
/// as is; mixed case must carry a valid EIP-55 checksum.
pub fn parse_chain_address(raw: &str) -> Option<Address> {
    let digits = raw.strip_prefix("0x").unwrap_or(raw);
    if digits.len() != 40 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let address = Address::from_str(&format!("0x{digits}")).ok()?;

    let has_upper = digits.bytes().any(|b| b.is_ascii_uppercase());
    let has_lower = digits.bytes().any(|b| b.is_ascii_lowercase());
    if has_upper && has_lower {
        let checksummed = address.to_checksum(None);
        if checksummed.get(2..) != Some(digits) {
            return None;
        }
    }
    Some(address)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORG: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";

    #[test]
    fn checksum_is_enforced_only_for_mixed_case() {
        assert!(is_chain_address(ORG));
        assert!(is_chain_address(&ORG.to_lowercase()));
        assert!(is_chain_address(&format!("0x{}", ORG[2..].to_uppercase())));
        assert!(is_chain_address(&ORG[2..]));
        // flip the case of one checksummed letter
        assert!(!is_chain_address("0x5AAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"));
    }

    #[test]
    fn rejects_wrong_length_and_non_hex() {
        assert!(!is_chain_address(""));
        assert!(!is_chain_address("0x"));
        assert!(!is_chain_address("0x1234"));
        assert!(!is_chain_address("0xzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzz"));
        assert!(!is_chain_address("0X5aaeb6053f3e94c9b9a09f33669435e7ef1beaed"));
    }

    #[test]
    fn first_occurrence_of_a_key_wins() {
        let query = format!(
            "organizationAddress={ORG}&organizationAddress=bogus&onboardingEntityAddress={ORG}&questId=7"
        );
        let outcome = RequiredParameterValidator::validate(&query);
        assert!(outcome.is_valid());
    }
}
