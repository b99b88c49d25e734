// Path: crates/services/src/ton/rules.rs
//! Pure validation rules for the Action Gateway.
//!
//! None of these functions perform I/O, so every rejection here happens
//! before the RPC client is touched.

use aether_types::error::{AddressError, GatewayError};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;

/// Length of every accepted address, in characters.
pub const ADDRESS_LEN: usize = 48;

/// The user-friendly variant tags (bounceable/non-bounceable, mainnet/testnet).
pub const FRIENDLY_PREFIXES: [&str; 8] = ["EQ", "UQ", "Ef", "Uf", "kQ", "0Q", "kf", "0f"];

/// Which branch of the grammar an address matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressForm {
    /// Starts with one of [`FRIENDLY_PREFIXES`].
    Friendly,
    /// Any other 48-character base64url string.
    Raw,
}

/// An address that passed the structural grammar. Checksums are not verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TonAddress {
    inner: String,
    form: AddressForm,
}

fn is_base64url(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

impl TonAddress {
    /// Validates `input` against the grammar. Facets are checked in the order
    /// length, alphabet, prefix, and the first failing facet is reported.
    pub fn parse(input: &str, allow_raw: bool) -> Result<Self, AddressError> {
        let len = input.chars().count();
        if len != ADDRESS_LEN {
            return Err(AddressError::MalformedLength(len));
        }
        if let Some((position, found)) = input.chars().enumerate().find(|(_, c)| !is_base64url(*c))
        {
            return Err(AddressError::InvalidAlphabet { position, found });
        }
        // All characters are ASCII at this point, so byte slicing is safe.
        let prefix = input.get(..2).unwrap_or_default();
        let form = if FRIENDLY_PREFIXES.contains(&prefix) {
            AddressForm::Friendly
        } else if allow_raw {
            AddressForm::Raw
        } else {
            return Err(AddressError::MalformedPrefix(prefix.to_string()));
        };
        Ok(Self {
            inner: input.to_string(),
            form,
        })
    }

    /// The address as supplied.
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    pub fn form(&self) -> AddressForm {
        self.form
    }
}

impl fmt::Display for TonAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner)
    }
}

/// The closed set of get-methods the gateway will execute.
///
/// Built once from configuration; there is no way to mutate it afterwards.
#[derive(Debug, Clone)]
pub struct MethodWhitelist {
    methods: HashSet<String>,
}

impl MethodWhitelist {
    pub fn new<I, S>(methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            methods: methods.into_iter().map(Into::into).collect(),
        }
    }

    /// Exact, case-sensitive membership. No trimming or prefix matching.
    pub fn check(&self, method: &str) -> Result<(), GatewayError> {
        if self.methods.contains(method) {
            Ok(())
        } else {
            Err(GatewayError::UnauthorizedMethod(method.to_string()))
        }
    }
}

/// Rejects parameter lists longer than `max`. Element types are not inspected.
pub fn check_param_count(params: &[Value], max: usize) -> Result<(), GatewayError> {
    if params.len() > max {
        return Err(GatewayError::TooManyParams {
            count: params.len(),
            max,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    const VALID: &str = "EQAAFhjXzKuQ5N0c96nsdZQWATcJm909LYSaCAvWFxVJP80D";

    #[test]
    fn accepts_friendly_address() {
        assert_eq!(VALID.len(), ADDRESS_LEN);
        let addr = TonAddress::parse(VALID, false).unwrap();
        assert_eq!(addr.form(), AddressForm::Friendly);
        assert_eq!(addr.as_str(), VALID);
    }

    #[test]
    fn reports_length_first() {
        assert_eq!(
            TonAddress::parse("EQ!", true),
            Err(AddressError::MalformedLength(3))
        );
        assert_eq!(TonAddress::parse("", true), Err(AddressError::MalformedLength(0)));
    }

    #[test]
    fn reports_offending_character() {
        let bad = format!("EQ{}+{}", "A".repeat(20), "B".repeat(25));
        assert_eq!(
            TonAddress::parse(&bad, true),
            Err(AddressError::InvalidAlphabet {
                position: 22,
                found: '+'
            })
        );
    }

    #[test]
    fn multibyte_input_is_measured_in_characters() {
        let bad = format!("EQ{}é", "A".repeat(45));
        assert_eq!(
            TonAddress::parse(&bad, true),
            Err(AddressError::InvalidAlphabet {
                position: 47,
                found: 'é'
            })
        );
    }

    #[test]
    fn raw_form_is_opt_in() {
        let raw = format!("XY{}", "a".repeat(46));
        assert_eq!(
            TonAddress::parse(&raw, true).unwrap().form(),
            AddressForm::Raw
        );
        assert_eq!(
            TonAddress::parse(&raw, false),
            Err(AddressError::MalformedPrefix("XY".into()))
        );
    }

    #[test]
    fn whitelist_is_exact_match() {
        let wl = MethodWhitelist::new(["get_balance", "seqno"]);
        assert!(wl.check("seqno").is_ok());
        for probe in ["Seqno", "seqno ", " seqno", "seq", "seqno2", "get_balance\0", ""] {
            assert_eq!(
                wl.check(probe),
                Err(GatewayError::UnauthorizedMethod(probe.to_string()))
            );
        }
    }

    #[test]
    fn param_count_boundary() {
        let ten: Vec<Value> = (0..10).map(|i| json!(i)).collect();
        assert!(check_param_count(&ten, 10).is_ok());
        let eleven: Vec<Value> = (0..11).map(|i| json!(i)).collect();
        assert_eq!(
            check_param_count(&eleven, 10),
            Err(GatewayError::TooManyParams { count: 11, max: 10 })
        );
    }

    proptest! {
        #[test]
        fn any_friendly_prefix_with_valid_body_parses(
            idx in 0usize..FRIENDLY_PREFIXES.len(),
            body in "[A-Za-z0-9_-]{46}",
        ) {
            let input = format!("{}{}", FRIENDLY_PREFIXES[idx], body);
            let addr = TonAddress::parse(&input, false).unwrap();
            prop_assert_eq!(addr.form(), AddressForm::Friendly);
        }

        #[test]
        fn wrong_length_is_always_rejected(body in "[A-Za-z0-9_-]{0,100}") {
            prop_assume!(body.len() != ADDRESS_LEN);
            prop_assert_eq!(
                TonAddress::parse(&body, true),
                Err(AddressError::MalformedLength(body.len()))
            );
        }

        #[test]
        fn non_members_never_pass(method in "\\PC{0,24}") {
            let wl = MethodWhitelist::new(["get_balance", "seqno"]);
            prop_assume!(method != "get_balance" && method != "seqno");
            prop_assert!(wl.check(&method).is_err());
        }
    }
}
