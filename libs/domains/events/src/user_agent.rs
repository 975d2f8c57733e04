//! User-agent enrichment.
//!
//! A user-agent string is a list of product sections, each shaped like
//! `name/version (comment; comment)`. Platform and OS come from the first
//! section's comment, the browser from the product names, and the mobile
//! flag from `Mobile`/`Mobi` markers or a handheld platform.
//!
//! Parsing is best-effort. Nothing here fails: unknown or empty input gives
//! empty strings and `mobile = false`.

/// Fields derived from the `User-Agent` header
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserAgentInfo {
    pub mobile: bool,
    pub platform: String,
    pub os: String,
    pub browser: String,
    pub version: String,
}

#[derive(Debug, Default)]
struct Section<'a> {
    name: &'a str,
    version: &'a str,
    comment: Vec<&'a str>,
}

const HANDHELD_PLATFORMS: [&str; 4] = ["iPhone", "iPod", "BlackBerry", "Windows Phone"];

/// Parse a raw user-agent string.
pub fn enrich(raw: &str) -> UserAgentInfo {
    let sections = split_sections(raw);
    let Some(first) = sections.first().filter(|s| !s.name.is_empty()) else {
        return UserAgentInfo::default();
    };

    let platform = platform(&first.comment);
    let (browser, version) = browser(&sections);
    let mobile = has_mobile_marker(&sections) || HANDHELD_PLATFORMS.contains(&platform.as_str());

    UserAgentInfo {
        mobile,
        os: os(&first.comment),
        platform,
        browser: browser.to_string(),
        version: version.to_string(),
    }
}

fn split_sections(raw: &str) -> Vec<Section<'_>> {
    let mut sections = Vec::new();
    let mut rest = raw.trim();

    while !rest.is_empty() {
        let end = rest
            .find(|c: char| c == ' ' || c == '(')
            .unwrap_or(rest.len());
        let token = &rest[..end];
        rest = rest[end..].trim_start();

        let (name, version) = token.split_once('/').unwrap_or((token, ""));
        let mut section = Section {
            name,
            version,
            comment: Vec::new(),
        };

        if let Some(inner) = rest.strip_prefix('(') {
            let close = inner.find(')').unwrap_or(inner.len());
            section.comment = inner[..close]
                .split(';')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .collect();
            rest = inner.get(close + 1..).unwrap_or("").trim_start();
        }

        sections.push(section);
    }

    sections
}

fn platform(comment: &[&str]) -> String {
    let token = match comment.first() {
        Some(&"compatible") => comment.iter().skip(1).find(|t| t.starts_with("Windows")),
        first => first,
    };

    let Some(token) = token else {
        return String::new();
    };

    let family = [
        ("Windows Phone", "Windows Phone"),
        ("Windows", "Windows"),
        ("Symbian", "Symbian"),
        ("webOS", "webOS"),
        ("BB10", "BlackBerry"),
        ("Android", "Android"),
    ]
    .into_iter()
    .find_map(|(prefix, name)| token.starts_with(prefix).then_some(name));

    family.unwrap_or(*token).to_string()
}

fn os(comment: &[&str]) -> String {
    let find = |prefix: &str| comment.iter().find(|t| t.starts_with(prefix)).copied();

    if let Some(android) = find("Android") {
        return android.to_string();
    }
    if let Some(phone) = find("Windows Phone") {
        return phone.to_string();
    }
    if let Some(nt) = find("Windows NT") {
        return windows_name(nt.trim_start_matches("Windows NT").trim());
    }
    if let Some(version) = comment.iter().find_map(|t| ios_version(t)) {
        return format!("iOS {}", version);
    }
    if let Some(mac) = comment.iter().find_map(|t| t.find("Mac OS X").map(|i| &t[i..])) {
        return mac.replace('_', ".");
    }
    if find("CrOS").is_some() {
        return "Chrome OS".to_string();
    }
    if let Some(linux) = find("Linux") {
        return linux.to_string();
    }

    String::new()
}

fn windows_name(nt_version: &str) -> String {
    let name = match nt_version {
        "10.0" => "Windows 10",
        "6.3" => "Windows 8.1",
        "6.2" => "Windows 8",
        "6.1" => "Windows 7",
        "6.0" => "Windows Vista",
        "5.1" | "5.2" => "Windows XP",
        "5.0" => "Windows 2000",
        "" => "Windows NT",
        other => return format!("Windows NT {}", other),
    };
    name.to_string()
}

/// `CPU iPhone OS 17_1 like Mac OS X` -> `17.1`
fn ios_version(token: &str) -> Option<String> {
    let after_cpu = token.strip_prefix("CPU ")?;
    let at = after_cpu.find("OS ")?;
    let version = after_cpu[at + 3..].split_whitespace().next()?;
    Some(version.replace('_', "."))
}

fn browser<'a>(sections: &[Section<'a>]) -> (&'a str, &'a str) {
    let product = |names: &[&str]| {
        sections
            .iter()
            .find(|s| names.contains(&s.name))
            .map(|s| s.version)
    };
    let safari_version = || product(&["Version"]);

    if let Some(v) = product(&["Edg", "EdgA", "EdgiOS", "Edge"]) {
        return ("Edge", v);
    }
    if let Some(v) = product(&["OPR"]) {
        return ("Opera", v);
    }
    if let Some(v) = product(&["Opera"]) {
        return ("Opera", safari_version().unwrap_or(v));
    }
    if let Some(v) = product(&["SamsungBrowser"]) {
        return ("Samsung Internet", v);
    }
    if let Some(v) = product(&["Chrome", "CriOS"]) {
        return ("Chrome", v);
    }
    if let Some(v) = product(&["Firefox", "FxiOS"]) {
        return ("Firefox", v);
    }
    if let Some(v) = internet_explorer_version(sections) {
        return ("Internet Explorer", v);
    }
    if product(&["Safari"]).is_some() {
        return ("Safari", safari_version().unwrap_or(""));
    }

    sections
        .first()
        .map(|s| (s.name, s.version))
        .unwrap_or(("", ""))
}

fn internet_explorer_version<'a>(sections: &[Section<'a>]) -> Option<&'a str> {
    let tokens = || sections.iter().flat_map(|s| s.comment.iter().copied());

    if let Some(msie) = tokens().find_map(|t| t.strip_prefix("MSIE ")) {
        return Some(msie.trim());
    }
    if tokens().any(|t| t.starts_with("Trident/")) {
        return tokens().find_map(|t| t.strip_prefix("rv:")).map(str::trim);
    }
    None
}

fn has_mobile_marker(sections: &[Section<'_>]) -> bool {
    let is_marker = |t: &str| t == "Mobile" || t == "Mobi";
    sections
        .iter()
        .any(|s| is_marker(s.name) || s.comment.iter().any(|t| is_marker(*t)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHROME_WINDOWS: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
        (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
    const SAFARI_IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_1 like Mac OS X) \
        AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Mobile/15E148 Safari/604.1";
    const CHROME_ANDROID: &str = "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 \
        (KHTML, like Gecko) Chrome/120.0.6099.144 Mobile Safari/537.36";
    const FIREFOX_ANDROID: &str = "Mozilla/5.0 (Android 14; Mobile; rv:121.0) Gecko/121.0 Firefox/121.0";
    const SAFARI_MAC: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 \
        (KHTML, like Gecko) Version/17.1 Safari/605.1.15";
    const EDGE: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
        (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.2210.91";
    const OPERA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
        (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 OPR/106.0.0.0";
    const SAMSUNG: &str = "Mozilla/5.0 (Linux; Android 13; SM-S911B) AppleWebKit/537.36 \
        (KHTML, like Gecko) SamsungBrowser/23.0 Chrome/115.0.0.0 Mobile Safari/537.36";
    const IE11: &str = "Mozilla/5.0 (Windows NT 6.1; WOW64; Trident/7.0; rv:11.0) like Gecko";
    const IE8: &str = "Mozilla/4.0 (compatible; MSIE 8.0; Windows NT 6.1)";

    #[test]
    fn test_bare_iphone() {
        let info = enrich("Mozilla/5.0 (iPhone)");
        assert!(info.mobile);
        assert_eq!(info.platform, "iPhone");
        assert_eq!(info.os, "");
        assert_eq!(info.browser, "Mozilla");
        assert_eq!(info.version, "5.0");
    }

    #[test]
    fn test_chrome_windows() {
        let info = enrich(CHROME_WINDOWS);
        assert!(!info.mobile);
        assert_eq!(info.platform, "Windows");
        assert_eq!(info.os, "Windows 10");
        assert_eq!(info.browser, "Chrome");
        assert_eq!(info.version, "120.0.0.0");
    }

    #[test]
    fn test_safari_iphone() {
        let info = enrich(SAFARI_IPHONE);
        assert!(info.mobile);
        assert_eq!(info.platform, "iPhone");
        assert_eq!(info.os, "iOS 17.1");
        assert_eq!(info.browser, "Safari");
        assert_eq!(info.version, "17.1");
    }

    #[test]
    fn test_chrome_android() {
        let info = enrich(CHROME_ANDROID);
        assert!(info.mobile);
        assert_eq!(info.platform, "Linux");
        assert_eq!(info.os, "Android 14");
        assert_eq!(info.browser, "Chrome");
        assert_eq!(info.version, "120.0.6099.144");
    }

    #[test]
    fn test_firefox_android() {
        let info = enrich(FIREFOX_ANDROID);
        assert!(info.mobile);
        assert_eq!(info.platform, "Android");
        assert_eq!(info.os, "Android 14");
        assert_eq!(info.browser, "Firefox");
        assert_eq!(info.version, "121.0");
    }

    #[test]
    fn test_safari_mac() {
        let info = enrich(SAFARI_MAC);
        assert!(!info.mobile);
        assert_eq!(info.platform, "Macintosh");
        assert_eq!(info.os, "Mac OS X 10.15.7");
        assert_eq!(info.browser, "Safari");
        assert_eq!(info.version, "17.1");
    }

    #[test]
    fn test_chromium_derivatives_win_over_chrome() {
        assert_eq!(
            (enrich(EDGE).browser.as_str(), enrich(EDGE).version.as_str()),
            ("Edge", "120.0.2210.91")
        );
        assert_eq!(enrich(OPERA).browser, "Opera");
        assert_eq!(enrich(OPERA).version, "106.0.0.0");

        let samsung = enrich(SAMSUNG);
        assert_eq!(samsung.browser, "Samsung Internet");
        assert_eq!(samsung.version, "23.0");
        assert!(samsung.mobile);
    }

    #[test]
    fn test_internet_explorer() {
        let ie11 = enrich(IE11);
        assert_eq!(ie11.browser, "Internet Explorer");
        assert_eq!(ie11.version, "11.0");
        assert_eq!(ie11.os, "Windows 7");

        let ie8 = enrich(IE8);
        assert_eq!(ie8.browser, "Internet Explorer");
        assert_eq!(ie8.version, "8.0");
        assert_eq!(ie8.platform, "Windows");
        assert_eq!(ie8.os, "Windows 7");
    }

    #[test]
    fn test_plain_product() {
        let info = enrich("curl/8.4.0");
        assert!(!info.mobile);
        assert_eq!(info.platform, "");
        assert_eq!(info.os, "");
        assert_eq!(info.browser, "curl");
        assert_eq!(info.version, "8.4.0");
    }

    #[test]
    fn test_empty_and_garbage_degrade() {
        assert_eq!(enrich(""), UserAgentInfo::default());
        assert_eq!(enrich("   "), UserAgentInfo::default());
        assert_eq!(enrich("(((("), UserAgentInfo::default());
        // Unclosed comment must not panic.
        assert_eq!(enrich("Mozilla/5.0 (iPhone").platform, "iPhone");
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(enrich(SAFARI_IPHONE), enrich(SAFARI_IPHONE));
    }

    #[test]
    fn test_windows_names() {
        assert_eq!(windows_name("6.3"), "Windows 8.1");
        assert_eq!(windows_name("5.1"), "Windows XP");
        assert_eq!(windows_name("11.0"), "Windows NT 11.0");
    }
}
