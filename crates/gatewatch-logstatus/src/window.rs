//! Gateway window-title parsing.
//!
//! The gateway's main window title packs a version, a five-digit hospital
//! code, the hospital name, and sometimes a vendor name into one line, e.g.
//! `LIS Gateway XE 2.5 - 10777 Central General Hospital Company Acme Ltd`.

use once_cell::sync::Lazy;
use regex::Regex;

use gatewatch_core::WindowInfo;

const GATEWAY_NAME_KEYWORDS: [&str; 4] = ["lis", "gateway", "hl7", "his"];

/// Version patterns tried in order from most to least specific.
static VERSION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\d+\.\d+\.\d+\.\d+",
        r"(?i)XE\s*(\d+\.\d+)",
        r"(?i)\bV\s*(\d+\.\d+\.\d+)\b",
        r"\b(\d+\.\d+(?:\.\d+)?)\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("invalid version pattern"))
    .collect()
});

static CODE_AFTER_SEP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[-:]\s*(\d{5})\s").expect("invalid hospital code pattern"));
static CODE_BARE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s(\d{5})\s").expect("invalid hospital code pattern"));
static NAME_AFTER_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d{5}\s+(.+)$").expect("invalid hospital name pattern"));
static NAME_COMPANY_SPLIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(.+?)\s+Company\s+(.+)$").expect("invalid company pattern"));

/// Whether a process looks like a gateway, by executable name or window title.
pub fn is_gateway_process(name: &str, window_title: Option<&str>) -> bool {
    let lower = name.to_lowercase();
    if GATEWAY_NAME_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
        return true;
    }
    if let Some(title) = window_title {
        let upper = title.to_uppercase();
        if upper.contains("GATEWAY") || upper.contains("HL7") {
            return true;
        }
    }
    false
}

/// Parse deployment details out of a gateway window title. Titles that do not
/// look like a gateway's yield None.
pub fn parse_window_title(title: &str) -> Option<WindowInfo> {
    let upper = title.to_uppercase();
    if !upper.contains("GATEWAY") && !upper.contains("HL7") && !upper.contains("LIS") {
        return None;
    }

    let mut info = WindowInfo {
        version: None,
        hospital_code: None,
        hospital_name: None,
        company: None,
        window_title: Some(title.to_string()),
    };

    for pattern in VERSION_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(title) {
            let version = caps
                .get(1)
                .map(|m| m.as_str())
                .unwrap_or_else(|| caps.get(0).map(|m| m.as_str()).unwrap_or_default());
            info.version = Some(version.to_string());
            break;
        }
    }

    info.hospital_code = CODE_AFTER_SEP
        .captures(title)
        .or_else(|| CODE_BARE.captures(title))
        .map(|caps| caps[1].to_string());

    if let Some(caps) = NAME_AFTER_CODE.captures(title) {
        let rest = caps[1].trim();
        if let Some(split) = NAME_COMPANY_SPLIT.captures(rest) {
            info.hospital_name = Some(split[1].trim().to_string());
            info.company = Some(split[2].trim().to_string());
        } else if !rest.is_empty() {
            info.hospital_name = Some(rest.to_string());
        }
    }

    Some(info)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_gateway_process_by_name() {
        assert!(is_gateway_process("LISGateway.exe", None));
        assert!(is_gateway_process("hl7router", None));
        assert!(!is_gateway_process("notepad.exe", None));
    }

    #[test]
    fn test_is_gateway_process_by_title() {
        assert!(is_gateway_process(
            "app.exe",
            Some("HL7 Message Router v1.2")
        ));
        assert!(!is_gateway_process("app.exe", Some("Untitled - Notepad")));
    }

    #[test]
    fn test_parse_full_title() {
        let title = "LIS Gateway XE 2.5 - 10777 Central General Hospital Company Acme Ltd";
        let info = parse_window_title(title).unwrap();
        assert_eq!(info.version.as_deref(), Some("2.5"));
        assert_eq!(info.hospital_code.as_deref(), Some("10777"));
        assert_eq!(
            info.hospital_name.as_deref(),
            Some("Central General Hospital")
        );
        assert_eq!(info.company.as_deref(), Some("Acme Ltd"));
    }

    #[test]
    fn test_parse_four_part_version() {
        let info = parse_window_title("LIS Gateway 3.1.4.2 - 12345 Provincial Hospital").unwrap();
        assert_eq!(info.version.as_deref(), Some("3.1.4.2"));
        assert_eq!(info.hospital_code.as_deref(), Some("12345"));
        assert_eq!(info.hospital_name.as_deref(), Some("Provincial Hospital"));
        assert!(info.company.is_none());
    }

    #[test]
    fn test_non_gateway_title_rejected() {
        assert!(parse_window_title("Document1 - Word").is_none());
    }

    #[test]
    fn test_title_without_code() {
        let info = parse_window_title("HL7 Gateway v2.0.1").unwrap();
        assert_eq!(info.version.as_deref(), Some("2.0.1"));
        assert!(info.hospital_code.is_none());
        assert!(info.hospital_name.is_none());
    }
}
