//! Geographic and locale context
//!
//! Inferred entirely from the ambient locale environment (`LC_ALL` /
//! `LC_MESSAGES` / `LANG`), never from location services. Accuracy of the
//! individual fields is explicitly best-effort; unavailable facts degrade to
//! sentinel values without errors.

use serde::{Deserialize, Serialize};

// ----------------------------------------------------------------------------
// Geo Context
// ----------------------------------------------------------------------------

/// Geographic and locale context attached to an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoContext {
    /// ISO-3166 alpha-2 country code, or "unknown".
    pub country_code: String,
    /// Geographic region bucket derived from the country code.
    pub region: String,
    /// Locale identifier (e.g. "en_US"), or "unknown".
    pub locale_identifier: String,
    /// ISO currency code derived from the country code.
    pub currency_code: String,
    /// ISO language code, or "en".
    pub language_code: String,
}

impl GeoContext {
    /// Capture the geo context from the process locale environment.
    pub fn capture() -> GeoContext {
        Self::from_locale(ambient_locale().as_deref())
    }

    /// Build the geo context from a POSIX locale string such as
    /// `en_US.UTF-8`. `None` or unparseable input yields sentinel values.
    pub fn from_locale(locale: Option<&str>) -> GeoContext {
        let parsed = locale.and_then(parse_posix_locale);

        match parsed {
            Some((language, country)) => GeoContext {
                region: region_for_country(&country).to_string(),
                currency_code: currency_for_country(&country).to_string(),
                locale_identifier: format!("{language}_{country}"),
                country_code: country,
                language_code: language,
            },
            None => GeoContext {
                country_code: "unknown".to_string(),
                region: "Other".to_string(),
                locale_identifier: "unknown".to_string(),
                currency_code: "USD".to_string(),
                language_code: "en".to_string(),
            },
        }
    }

    /// Sentinel context used when geo capture is disabled.
    pub fn empty() -> GeoContext {
        GeoContext {
            country_code: "unknown".to_string(),
            region: "unknown".to_string(),
            locale_identifier: "unknown".to_string(),
            currency_code: "unknown".to_string(),
            language_code: "unknown".to_string(),
        }
    }
}

/// First locale environment variable that is set and non-empty, in POSIX
/// precedence order.
fn ambient_locale() -> Option<String> {
    ["LC_ALL", "LC_MESSAGES", "LANG"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|value| !value.is_empty() && value != "C" && value != "POSIX")
}

/// Split `ll_CC[.encoding]` into (language, country).
fn parse_posix_locale(locale: &str) -> Option<(String, String)> {
    let base = locale.split('.').next()?;
    let (language, country) = base.split_once('_')?;
    if language.is_empty() || country.is_empty() {
        return None;
    }
    Some((language.to_lowercase(), country.to_uppercase()))
}

/// Static country → region bucket table. Unlisted countries fall into
/// "Other".
fn region_for_country(country: &str) -> &'static str {
    match country {
        "CN" | "JP" | "KR" | "TW" | "HK" | "SG" | "TH" | "VN" | "ID" | "MY" | "PH" | "IN"
        | "AU" | "NZ" => "Asia-Pacific",
        "GB" | "DE" | "FR" | "IT" | "ES" | "NL" | "SE" | "NO" | "DK" | "FI" | "PL" | "CH"
        | "AT" | "BE" | "IE" | "PT" | "CZ" | "GR" | "RO" | "HU" => "Europe",
        "US" | "CA" | "MX" => "North America",
        "BR" | "AR" | "CL" | "CO" | "PE" | "VE" | "EC" | "BO" | "PY" | "UY" => "South America",
        "AE" | "SA" | "IL" | "TR" | "EG" | "QA" | "KW" | "BH" | "OM" | "JO" | "LB" => {
            "Middle East"
        }
        "ZA" | "NG" | "KE" | "GH" | "TZ" | "UG" | "ZW" | "ET" | "MA" | "DZ" | "TN" => "Africa",
        _ => "Other",
    }
}

/// Static country → currency table for common markets; USD is the documented
/// fallback.
fn currency_for_country(country: &str) -> &'static str {
    match country {
        "DE" | "FR" | "IT" | "ES" | "NL" | "AT" | "BE" | "IE" | "PT" | "FI" | "GR" => "EUR",
        "GB" => "GBP",
        "JP" => "JPY",
        "CN" => "CNY",
        "KR" => "KRW",
        "IN" => "INR",
        "AU" => "AUD",
        "NZ" => "NZD",
        "CA" => "CAD",
        "CH" => "CHF",
        "SE" => "SEK",
        "NO" => "NOK",
        "DK" => "DKK",
        "PL" => "PLN",
        "BR" => "BRL",
        "MX" => "MXN",
        "SG" => "SGD",
        "HK" => "HKD",
        "ZA" => "ZAR",
        "TR" => "TRY",
        _ => "USD",
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
